//! Stream subscription tracking for an image-displaying UI node.
//!
//! [`ImageStreamTracker`] owns the node's view of one resolved image
//! stream: the latest decoded frame, loading progress, and the
//! subscription itself. The host drives it through explicit lifecycle
//! hooks; the tracker guarantees at most one live listener at any time and
//! that an abandoned stream never calls back into this state again.
//!
//! State machine: Unresolved -> Subscribed <-> Unsubscribed -> Detached
//! (terminal).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::error::ImageStreamError;
use crate::image::provider::{ImageConfiguration, ImageProvider};
use crate::image::stream::{
    ImageChunkEvent, ImageFrame, ImageStream, ImageStreamListener, ListenerId,
};

/// Read-only snapshot of the tracked state, consumed by the renderer.
#[derive(Clone, Debug)]
pub struct TrackedImage {
    pub current_frame: Option<ImageFrame>,
    pub loading_progress: Option<ImageChunkEvent>,
    /// `None` until the first frame of the current stream arrives; then 0,
    /// incrementing per frame. Resets when the stream identity changes.
    pub frame_index: Option<u32>,
    /// Whether the current stream's first visible frame was available
    /// without waiting. Sticky for the stream's lifetime; consumers use it
    /// to skip fade-in animation for cached images.
    pub was_ever_synchronous: bool,
    pub is_subscribed: bool,
}

type ChangedCallback = Rc<RefCell<Box<dyn FnMut()>>>;
type ErrorCallback = Rc<RefCell<Box<dyn FnMut(&ImageStreamError)>>>;

struct TrackerInner {
    stream: Option<ImageStream>,
    listener_id: Option<ListenerId>,
    subscribed: bool,
    detached: bool,
    want_progress: bool,
    gapless_playback: bool,
    current_frame: Option<ImageFrame>,
    loading_progress: Option<ImageChunkEvent>,
    frame_index: Option<u32>,
    was_ever_synchronous: bool,
    on_changed: Option<ChangedCallback>,
    error_handler: Option<ErrorCallback>,
}

/// Tracks one UI node's subscription to a resolved image stream.
pub struct ImageStreamTracker {
    inner: Rc<RefCell<TrackerInner>>,
}

impl Default for ImageStreamTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStreamTracker {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TrackerInner {
                stream: None,
                listener_id: None,
                subscribed: false,
                detached: false,
                want_progress: false,
                gapless_playback: false,
                current_frame: None,
                loading_progress: None,
                frame_index: None,
                was_ever_synchronous: false,
                on_changed: None,
                error_handler: None,
            })),
        }
    }

    /// Retain the previous frame across a source change instead of clearing
    /// to empty until the new stream's first frame arrives.
    pub fn set_gapless_playback(&self, gapless: bool) {
        self.inner.borrow_mut().gapless_playback = gapless;
    }

    /// Host repaint hook, fired after every observable state mutation.
    pub fn set_on_changed(&self, on_changed: impl FnMut() + 'static) {
        self.inner.borrow_mut().on_changed = Some(Rc::new(RefCell::new(Box::new(on_changed))));
    }

    /// Caller-supplied error handler. Without one, stream errors go to the
    /// default log sink and are swallowed.
    pub fn set_error_handler(&self, handler: impl FnMut(&ImageStreamError) + 'static) {
        self.inner.borrow_mut().error_handler = Some(Rc::new(RefCell::new(Box::new(handler))));
    }

    pub fn snapshot(&self) -> TrackedImage {
        let inner = self.inner.borrow();
        TrackedImage {
            current_frame: inner.current_frame.clone(),
            loading_progress: inner.loading_progress,
            frame_index: inner.frame_index,
            was_ever_synchronous: inner.was_ever_synchronous,
            is_subscribed: inner.subscribed,
        }
    }

    /// Key of the currently tracked stream, if any.
    pub fn stream_key(&self) -> Option<crate::image::stream::ImageStreamKey> {
        self.inner.borrow().stream.as_ref().map(|s| s.key())
    }

    /// Resolve `source` under `config` and adopt the resulting stream.
    ///
    /// If the provider returns a stream identity-equal to the one already
    /// tracked this is a complete no-op: no unsubscribe/resubscribe cycle,
    /// no state reset. Otherwise the old subscription is removed first,
    /// per-stream state (progress, frame index, sync flag) resets, the
    /// current frame clears unless gapless playback is on, and a
    /// subscription to the new stream is established if the tracker was in
    /// subscribed mode.
    pub fn resolve(
        &self,
        provider: &mut dyn ImageProvider,
        source: &str,
        config: &ImageConfiguration,
    ) {
        if self.inner.borrow().detached {
            warn!("resolve called on detached image tracker");
            return;
        }
        let new_stream = provider.resolve(source, config);

        let (old_stream, old_id, resubscribe) = {
            let mut inner = self.inner.borrow_mut();
            if let Some(current) = &inner.stream {
                if current.key() == new_stream.key() {
                    return;
                }
            }
            debug!(
                old = ?inner.stream.as_ref().map(|s| s.key()),
                new = %new_stream.key(),
                "image stream identity changed"
            );
            let old_stream = inner.stream.take();
            let old_id = inner.listener_id.take();
            let resubscribe = inner.subscribed;

            // Per-stream state resets before the new stream can deliver.
            inner.loading_progress = None;
            inner.frame_index = None;
            inner.was_ever_synchronous = false;
            if !inner.gapless_playback {
                inner.current_frame = None;
            }
            inner.stream = Some(new_stream.clone());
            (old_stream, old_id, resubscribe)
        };

        if let (Some(stream), Some(id)) = (old_stream, old_id) {
            stream.remove_listener(id);
        }
        if resubscribe {
            attach_listener(&self.inner, &new_stream);
        }
        notify_changed(&self.inner);
    }

    /// Begin listening to the tracked stream. Idempotent. A progress
    /// listener is registered only if progress listening is enabled.
    pub fn subscribe(&self) {
        let stream = {
            let mut inner = self.inner.borrow_mut();
            if inner.detached {
                warn!("subscribe called on detached image tracker");
                return;
            }
            if inner.subscribed {
                return;
            }
            inner.subscribed = true;
            inner.stream.clone()
        };
        if let Some(stream) = stream {
            attach_listener(&self.inner, &stream);
        }
    }

    /// Stop listening. Idempotent. Afterwards no callback for the
    /// previously tracked stream reaches this state, even if the provider
    /// completes work for it.
    pub fn unsubscribe(&self) {
        let (stream, id) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.subscribed {
                return;
            }
            inner.subscribed = false;
            (inner.stream.clone(), inner.listener_id.take())
        };
        if let (Some(stream), Some(id)) = (stream, id) {
            stream.remove_listener(id);
        }
    }

    /// Enable or disable progress delivery. While subscribed, the stream
    /// listener is swapped in place - there is no window with zero or two
    /// listeners registered.
    pub fn set_progress_listening(&self, want: bool) {
        let (stream, old_id, subscribed) = {
            let mut inner = self.inner.borrow_mut();
            if inner.want_progress == want {
                return;
            }
            inner.want_progress = want;
            if !want {
                inner.loading_progress = None;
            }
            (inner.stream.clone(), inner.listener_id, inner.subscribed)
        };
        if !subscribed {
            return;
        }
        if let (Some(stream), Some(old_id)) = (stream, old_id) {
            let listener = build_listener(Rc::downgrade(&self.inner), want);
            if let Some(new_id) = stream.replace_listener(old_id, listener) {
                self.inner.borrow_mut().listener_id = Some(new_id);
            }
        }
    }

    // Lifecycle hooks. The host UI framework calls these from its own
    // node lifecycle; the tracker never discovers state changes implicitly.

    /// Node entered the tree with its initial request.
    pub fn on_attach(
        &self,
        provider: &mut dyn ImageProvider,
        source: &str,
        config: &ImageConfiguration,
    ) {
        self.resolve(provider, source, config);
    }

    /// Node became visible / entered a ticking context.
    pub fn on_become_active(&self) {
        self.subscribe();
    }

    /// Node became invisible; stop paying decode and animation cost.
    pub fn on_become_inactive(&self) {
        self.unsubscribe();
    }

    /// The request or the host-supplied configuration changed.
    pub fn on_configuration_changed(
        &self,
        provider: &mut dyn ImageProvider,
        source: &str,
        config: &ImageConfiguration,
    ) {
        self.resolve(provider, source, config);
    }

    /// Node is being torn down. Terminal: all further operations no-op.
    pub fn on_detach(&self) {
        self.unsubscribe();
        let mut inner = self.inner.borrow_mut();
        inner.detached = true;
        inner.stream = None;
    }
}

impl Drop for ImageStreamTracker {
    fn drop(&mut self) {
        // Hosts are expected to call on_detach; this covers the ones that
        // drop the tracker directly so the stream holds no dangling
        // listener.
        self.on_detach();
    }
}

fn attach_listener(inner: &Rc<RefCell<TrackerInner>>, stream: &ImageStream) {
    let want_progress = inner.borrow().want_progress;
    let listener = build_listener(Rc::downgrade(inner), want_progress);
    // add_listener may replay the current frame synchronously; no borrow is
    // held across it.
    let id = stream.add_listener(listener);
    inner.borrow_mut().listener_id = Some(id);
}

fn build_listener(weak: Weak<RefCell<TrackerInner>>, want_progress: bool) -> ImageStreamListener {
    let frame_weak = weak.clone();
    let mut listener = ImageStreamListener::new(move |frame, sync| {
        if let Some(inner) = frame_weak.upgrade() {
            handle_frame(&inner, frame, sync);
        }
    });
    if want_progress {
        let progress_weak = weak.clone();
        listener = listener.with_progress(move |event| {
            if let Some(inner) = progress_weak.upgrade() {
                handle_progress(&inner, event);
            }
        });
    }
    listener.with_error(move |err| {
        if let Some(inner) = weak.upgrade() {
            handle_error(&inner, err);
        }
    })
}

fn handle_frame(inner: &Rc<RefCell<TrackerInner>>, frame: &ImageFrame, sync: bool) {
    {
        let mut inner = inner.borrow_mut();
        inner.current_frame = Some(frame.clone());
        inner.loading_progress = None;
        inner.frame_index = Some(inner.frame_index.map_or(0, |i| i + 1));
        inner.was_ever_synchronous |= sync;
    }
    notify_changed(inner);
}

fn handle_progress(inner: &Rc<RefCell<TrackerInner>>, event: &ImageChunkEvent) {
    inner.borrow_mut().loading_progress = Some(*event);
    notify_changed(inner);
}

fn handle_error(inner: &Rc<RefCell<TrackerInner>>, err: &ImageStreamError) {
    // Tracked state stays as it was; a failed load never clears a frame
    // already onscreen.
    let handler = inner.borrow().error_handler.clone();
    match handler {
        Some(handler) => (handler.borrow_mut())(err),
        None => error!(error = %err, "image stream failed"),
    }
}

fn notify_changed(inner: &Rc<RefCell<TrackerInner>>) {
    let callback = inner.borrow().on_changed.clone();
    if let Some(callback) = callback {
        (callback.borrow_mut())();
    }
}
