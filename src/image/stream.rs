//! Decoded-image streams: keyed identity plus a frame/progress/error
//! listener registry.
//!
//! A stream is a cheaply cloneable handle; all clones share one registry.
//! Providers drive the emission side on the single UI thread, listeners are
//! invoked in registration order, and a removed listener is guaranteed to
//! see no further callbacks - even for an emission already in flight when
//! the removal happened.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::error;

use crate::error::ImageStreamError;

/// Identity of a logical decoded-image sequence.
///
/// Derived from the image source plus the resolved configuration; equal keys
/// denote the same resource, which is what makes the tracker's
/// no-op-on-resolve optimization sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageStreamKey(pub u64);

impl fmt::Display for ImageStreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One decoded frame.
#[derive(Clone)]
pub struct ImageFrame {
    pub pixels: Rc<image::RgbaImage>,
    /// How long an animation frame should stay onscreen; `None` for still
    /// images.
    pub duration: Option<Duration>,
}

impl ImageFrame {
    pub fn still(pixels: image::RgbaImage) -> Self {
        Self {
            pixels: Rc::new(pixels),
            duration: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl fmt::Debug for ImageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("duration", &self.duration)
            .finish()
    }
}

/// Cumulative byte-level loading progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageChunkEvent {
    pub cumulative_bytes_loaded: u64,
    pub expected_total_bytes: Option<u64>,
}

/// Handle for removing a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Callbacks registered on a stream.
///
/// The frame callback is mandatory; progress and error callbacks are
/// registered only when the consumer wants them, which is what lets the
/// tracker honour "progress listener only if a progress consumer is
/// configured".
pub struct ImageStreamListener {
    on_frame: Box<dyn FnMut(&ImageFrame, bool)>,
    on_progress: Option<Box<dyn FnMut(&ImageChunkEvent)>>,
    on_error: Option<Box<dyn FnMut(&ImageStreamError)>>,
}

impl ImageStreamListener {
    /// `on_frame` receives each decoded frame plus whether it was delivered
    /// synchronously (already available at subscription time).
    pub fn new(on_frame: impl FnMut(&ImageFrame, bool) + 'static) -> Self {
        Self {
            on_frame: Box::new(on_frame),
            on_progress: None,
            on_error: None,
        }
    }

    pub fn with_progress(mut self, on_progress: impl FnMut(&ImageChunkEvent) + 'static) -> Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    pub fn with_error(mut self, on_error: impl FnMut(&ImageStreamError) + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn wants_progress(&self) -> bool {
        self.on_progress.is_some()
    }
}

struct Registered {
    id: ListenerId,
    listener: Rc<RefCell<ImageStreamListener>>,
}

struct StreamInner {
    key: ImageStreamKey,
    next_listener: u64,
    listeners: Vec<Registered>,
    /// Latest delivered frame, replayed synchronously to fresh listeners.
    current: Option<ImageFrame>,
}

/// A handle onto one logical decoded-image sequence.
#[derive(Clone)]
pub struct ImageStream {
    inner: Rc<RefCell<StreamInner>>,
}

impl ImageStream {
    pub fn new(key: ImageStreamKey) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StreamInner {
                key,
                next_listener: 0,
                listeners: Vec::new(),
                current: None,
            })),
        }
    }

    pub fn key(&self) -> ImageStreamKey {
        self.inner.borrow().key
    }

    /// Two handles are the same stream iff their keys are equal.
    pub fn same_stream(&self, other: &ImageStream) -> bool {
        self.key() == other.key()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Register a listener. If a frame has already been delivered on this
    /// stream it is replayed to the new listener immediately, flagged as a
    /// synchronous delivery.
    pub fn add_listener(&self, listener: ImageStreamListener) -> ListenerId {
        let (id, registered, replay) = {
            let mut inner = self.inner.borrow_mut();
            let id = ListenerId(inner.next_listener);
            inner.next_listener += 1;
            let registered = Rc::new(RefCell::new(listener));
            inner.listeners.push(Registered {
                id,
                listener: registered.clone(),
            });
            (id, registered, inner.current.clone())
        };
        if let Some(frame) = replay {
            (registered.borrow_mut().on_frame)(&frame, true);
        }
        id
    }

    /// Remove a listener. Idempotent; unknown ids are ignored. After this
    /// returns, the listener observes no further callbacks.
    pub fn remove_listener(&self, id: ListenerId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|registered| registered.id != id);
    }

    /// Swap the callbacks behind `old` for `listener` in one step, keeping
    /// the listener's position and performing no replay. There is no window
    /// in which the slot is empty or doubled; returns the replacement's id,
    /// or `None` if `old` was not registered.
    pub fn replace_listener(
        &self,
        old: ListenerId,
        listener: ImageStreamListener,
    ) -> Option<ListenerId> {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        let slot = inner.listeners.iter_mut().find(|r| r.id == old)?;
        slot.id = id;
        slot.listener = Rc::new(RefCell::new(listener));
        inner.next_listener += 1;
        Some(id)
    }

    /// Deliver a frame to every listener, in registration order, and retain
    /// it for synchronous replay to future listeners.
    pub fn emit_frame(&self, frame: ImageFrame) {
        self.inner.borrow_mut().current = Some(frame.clone());
        for (id, listener) in self.snapshot() {
            if !self.still_registered(id) {
                continue;
            }
            (listener.borrow_mut().on_frame)(&frame, false);
        }
    }

    /// Deliver loading progress to listeners that registered a progress
    /// callback.
    pub fn emit_progress(&self, event: ImageChunkEvent) {
        for (id, listener) in self.snapshot() {
            if !self.still_registered(id) {
                continue;
            }
            if let Some(on_progress) = listener.borrow_mut().on_progress.as_mut() {
                on_progress(&event);
            }
        }
    }

    /// Deliver a failure. If no listener registered an error callback the
    /// error is reported to the default log sink and swallowed.
    pub fn emit_error(&self, err: &ImageStreamError) {
        let mut handled = false;
        for (id, listener) in self.snapshot() {
            if !self.still_registered(id) {
                continue;
            }
            if let Some(on_error) = listener.borrow_mut().on_error.as_mut() {
                on_error(err);
                handled = true;
            }
        }
        if !handled {
            error!(stream = %self.key(), error = %err, "unhandled image stream error");
        }
    }

    // Callbacks run without the registry borrow held, so a listener may
    // add or remove listeners re-entrantly.
    fn snapshot(&self) -> Vec<(ListenerId, Rc<RefCell<ImageStreamListener>>)> {
        self.inner
            .borrow()
            .listeners
            .iter()
            .map(|r| (r.id, r.listener.clone()))
            .collect()
    }

    fn still_registered(&self, id: ListenerId) -> bool {
        self.inner.borrow().listeners.iter().any(|r| r.id == id)
    }
}

impl fmt::Debug for ImageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStream")
            .field("key", &self.key())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn frame(px: u32) -> ImageFrame {
        ImageFrame::still(image::RgbaImage::new(px, px))
    }

    #[test]
    fn frames_deliver_in_registration_order() {
        let stream = ImageStream::new(ImageStreamKey(1));
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = order.clone();
            stream.add_listener(ImageStreamListener::new(move |_, _| {
                order.borrow_mut().push(tag);
            }));
        }

        stream.emit_frame(frame(1));
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn removed_listener_sees_nothing_more() {
        let stream = ImageStream::new(ImageStreamKey(1));
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let id = stream.add_listener(ImageStreamListener::new(move |_, _| {
            counter.set(counter.get() + 1);
        }));

        stream.emit_frame(frame(1));
        stream.remove_listener(id);
        stream.emit_frame(frame(2));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let stream = ImageStream::new(ImageStreamKey(1));
        let id = stream.add_listener(ImageStreamListener::new(|_, _| {}));
        stream.remove_listener(id);
        stream.remove_listener(id);
        assert_eq!(stream.listener_count(), 0);
    }

    #[test]
    fn late_listener_gets_synchronous_replay() {
        let stream = ImageStream::new(ImageStreamKey(1));
        stream.emit_frame(frame(3));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        stream.add_listener(ImageStreamListener::new(move |f, sync| {
            sink.borrow_mut().push((f.width(), sync));
        }));
        assert_eq!(*seen.borrow(), vec![(3, true)]);
    }

    #[test]
    fn progress_goes_only_to_progress_listeners() {
        let stream = ImageStream::new(ImageStreamKey(1));
        let progress_seen = Rc::new(Cell::new(0u64));

        stream.add_listener(ImageStreamListener::new(|_, _| {}));
        let sink = progress_seen.clone();
        stream.add_listener(
            ImageStreamListener::new(|_, _| {}).with_progress(move |event| {
                sink.set(event.cumulative_bytes_loaded);
            }),
        );

        stream.emit_progress(ImageChunkEvent {
            cumulative_bytes_loaded: 512,
            expected_total_bytes: Some(1024),
        });
        assert_eq!(progress_seen.get(), 512);
    }

    #[test]
    fn replace_listener_keeps_count_and_skips_replay() {
        let stream = ImageStream::new(ImageStreamKey(1));
        stream.emit_frame(frame(1));

        let id = stream.add_listener(ImageStreamListener::new(|_, _| {}));
        assert_eq!(stream.listener_count(), 1);

        let replayed = Rc::new(Cell::new(false));
        let flag = replayed.clone();
        let new_id = stream
            .replace_listener(
                id,
                ImageStreamListener::new(move |_, _| flag.set(true)),
            )
            .unwrap();
        assert_eq!(stream.listener_count(), 1);
        assert!(!replayed.get());
        assert_ne!(new_id, id);

        // Old id is gone; new callbacks receive subsequent frames.
        stream.emit_frame(frame(2));
        assert!(replayed.get());
    }

    #[test]
    fn error_without_handler_is_swallowed() {
        let stream = ImageStream::new(ImageStreamKey(1));
        stream.add_listener(ImageStreamListener::new(|_, _| {}));
        // Must not panic or deliver anywhere.
        stream.emit_error(&ImageStreamError::SourceNotFound("ghost.png".into()));
    }

    #[test]
    fn listener_removed_mid_emission_is_skipped() {
        let stream = ImageStream::new(ImageStreamKey(1));
        let second_calls = Rc::new(Cell::new(0));

        // First listener removes the second during delivery.
        let stream_handle = stream.clone();
        let victim: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let victim_slot = victim.clone();
        stream.add_listener(ImageStreamListener::new(move |_, _| {
            if let Some(id) = victim_slot.take() {
                stream_handle.remove_listener(id);
            }
        }));

        let counter = second_calls.clone();
        let second = stream.add_listener(ImageStreamListener::new(move |_, _| {
            counter.set(counter.get() + 1);
        }));
        victim.set(Some(second));

        stream.emit_frame(frame(1));
        assert_eq!(second_calls.get(), 0);
    }
}
