//! Image providers: resolving a source plus configuration to a keyed
//! stream.
//!
//! The contract every provider upholds: equal source + configuration pairs
//! resolve to identity-equal streams (same [`ImageStreamKey`]), so a
//! tracker re-resolving an unchanged request can detect the no-op. Live
//! streams are interned in an LRU cache; the key itself is a stable hash,
//! so identity comparison stays correct even across eviction.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use crate::error::ImageStreamError;
use crate::image::stream::{ImageChunkEvent, ImageFrame, ImageStream, ImageStreamKey};

const DEFAULT_STREAM_CACHE_CAP: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Host-supplied context an image request is resolved against.
///
/// The widget layer never computes these; the host owns locale, scale and
/// platform and passes them down at resolve time. All fields participate in
/// stream identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageConfiguration {
    pub bundle: Option<String>,
    pub locale: Option<String>,
    pub text_direction: TextDirection,
    /// Device pixel ratio in hundredths (100 = 1x, 150 = 1.5x).
    pub pixel_ratio_hundredths: u32,
    pub target_size: Option<(u32, u32)>,
    pub platform: Option<String>,
}

impl Default for ImageConfiguration {
    fn default() -> Self {
        Self {
            bundle: None,
            locale: None,
            text_direction: TextDirection::Ltr,
            pixel_ratio_hundredths: 100,
            target_size: None,
            platform: None,
        }
    }
}

/// Stable stream identity for a source resolved under a configuration.
pub fn stream_key(source: &str, config: &ImageConfiguration) -> ImageStreamKey {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    config.hash(&mut hasher);
    ImageStreamKey(hasher.finish())
}

/// Resolves an abstract image request to a concrete stream handle.
pub trait ImageProvider {
    fn resolve(&mut self, source: &str, config: &ImageConfiguration) -> ImageStream;
}

/// LRU-bounded intern table from stream key to live stream.
struct StreamInterner {
    cache: LruCache<ImageStreamKey, ImageStream>,
}

impl StreamInterner {
    fn new() -> Self {
        let cap = NonZeroUsize::new(DEFAULT_STREAM_CACHE_CAP).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(cap),
        }
    }

    /// Returns the interned stream for `key` and whether it was just
    /// created.
    fn get_or_create(&mut self, key: ImageStreamKey) -> (ImageStream, bool) {
        if let Some(stream) = self.cache.get(&key) {
            return (stream.clone(), false);
        }
        let stream = ImageStream::new(key);
        self.cache.put(key, stream.clone());
        (stream, true)
    }
}

/// Provider over preloaded frame sequences.
///
/// The first frame of a sequence is delivered at resolve time, so a
/// subscriber attached in the same turn sees a synchronous delivery -
/// the cached-image fast path. Remaining frames are advanced explicitly by
/// the host via [`MemoryImageProvider::emit_next`], standing in for an
/// animation ticker.
pub struct MemoryImageProvider {
    sources: HashMap<String, Vec<ImageFrame>>,
    streams: StreamInterner,
    cursors: HashMap<ImageStreamKey, usize>,
}

impl Default for MemoryImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryImageProvider {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            streams: StreamInterner::new(),
            cursors: HashMap::new(),
        }
    }

    pub fn insert(&mut self, source: impl Into<String>, frames: Vec<ImageFrame>) {
        self.sources.insert(source.into(), frames);
    }

    /// Emit the next frame of an already-resolved sequence, if any remains.
    pub fn emit_next(&mut self, source: &str, config: &ImageConfiguration) -> bool {
        let key = stream_key(source, config);
        let (stream, _) = self.streams.get_or_create(key);
        let Some(frames) = self.sources.get(source) else {
            return false;
        };
        let cursor = self.cursors.entry(key).or_insert(0);
        let Some(frame) = frames.get(*cursor) else {
            return false;
        };
        *cursor += 1;
        stream.emit_frame(frame.clone());
        true
    }
}

impl ImageProvider for MemoryImageProvider {
    fn resolve(&mut self, source: &str, config: &ImageConfiguration) -> ImageStream {
        let key = stream_key(source, config);
        let (stream, created) = self.streams.get_or_create(key);
        if created {
            debug!(source, key = %key, "resolved in-memory image stream");
            match self.sources.get(source) {
                Some(frames) => {
                    if let Some(first) = frames.first() {
                        self.cursors.insert(key, 1);
                        stream.emit_frame(first.clone());
                    }
                }
                None => {
                    stream.emit_error(&ImageStreamError::SourceNotFound(source.to_string()));
                }
            }
        }
        stream
    }
}

struct PendingDecode {
    source: String,
    stream: ImageStream,
}

/// Provider that decodes registered PNG byte buffers.
///
/// `resolve` returns immediately; decode work queues until the host grants
/// a turn via [`PngImageProvider::pump`], which emits chunk progress, then
/// the frame - or a stream error for missing or malformed sources. This is
/// the asynchronous-delivery path of the provider contract.
pub struct PngImageProvider {
    sources: HashMap<String, Vec<u8>>,
    streams: StreamInterner,
    pending: Vec<PendingDecode>,
}

impl Default for PngImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PngImageProvider {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            streams: StreamInterner::new(),
            pending: Vec::new(),
        }
    }

    pub fn insert(&mut self, source: impl Into<String>, png_bytes: Vec<u8>) {
        self.sources.insert(source.into(), png_bytes);
    }

    /// Run all queued decode jobs. Returns how many jobs completed
    /// (successfully or with an emitted error).
    pub fn pump(&mut self) -> usize {
        let jobs = std::mem::take(&mut self.pending);
        let count = jobs.len();
        for job in jobs {
            match self.sources.get(&job.source) {
                None => {
                    job.stream
                        .emit_error(&ImageStreamError::SourceNotFound(job.source.clone()));
                }
                Some(bytes) => {
                    job.stream.emit_progress(ImageChunkEvent {
                        cumulative_bytes_loaded: bytes.len() as u64,
                        expected_total_bytes: Some(bytes.len() as u64),
                    });
                    match image::load_from_memory_with_format(bytes, image::ImageFormat::Png) {
                        Ok(decoded) => {
                            job.stream.emit_frame(ImageFrame::still(decoded.to_rgba8()));
                        }
                        Err(e) => {
                            job.stream.emit_error(&ImageStreamError::Decode {
                                source_name: job.source.clone(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
        count
    }
}

impl ImageProvider for PngImageProvider {
    fn resolve(&mut self, source: &str, config: &ImageConfiguration) -> ImageStream {
        let key = stream_key(source, config);
        let (stream, created) = self.streams.get_or_create(key);
        if created {
            debug!(source, key = %key, "queued png decode");
            self.pending.push(PendingDecode {
                source: source.to_string(),
                stream: stream.clone(),
            });
        }
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::stream::ImageStreamListener;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn equal_configurations_yield_identity_equal_streams() {
        let mut provider = MemoryImageProvider::new();
        provider.insert("logo", vec![ImageFrame::still(image::RgbaImage::new(2, 2))]);

        let config = ImageConfiguration::default();
        let a = provider.resolve("logo", &config);
        let b = provider.resolve("logo", &config.clone());
        assert!(a.same_stream(&b));
        assert_eq!(a.listener_count(), b.listener_count());
    }

    #[test]
    fn different_configuration_yields_new_stream() {
        let mut provider = MemoryImageProvider::new();
        provider.insert("logo", vec![ImageFrame::still(image::RgbaImage::new(2, 2))]);

        let a = provider.resolve("logo", &ImageConfiguration::default());
        let hidpi = ImageConfiguration {
            pixel_ratio_hundredths: 200,
            ..Default::default()
        };
        let b = provider.resolve("logo", &hidpi);
        assert!(!a.same_stream(&b));
    }

    #[test]
    fn memory_provider_replays_first_frame_synchronously() {
        let mut provider = MemoryImageProvider::new();
        provider.insert("logo", vec![ImageFrame::still(image::RgbaImage::new(4, 4))]);

        let stream = provider.resolve("logo", &ImageConfiguration::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        stream.add_listener(ImageStreamListener::new(move |frame, sync| {
            sink.borrow_mut().push((frame.width(), sync));
        }));
        assert_eq!(*seen.borrow(), vec![(4, true)]);
    }

    #[test]
    fn png_provider_emits_progress_then_frame_on_pump() {
        let mut provider = PngImageProvider::new();
        provider.insert("icon", png_bytes(8, 8));

        let stream = provider.resolve("icon", &ImageConfiguration::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let frame_sink = events.clone();
        let progress_sink = events.clone();
        stream.add_listener(
            ImageStreamListener::new(move |frame, sync| {
                frame_sink
                    .borrow_mut()
                    .push(format!("frame {}x{} sync={}", frame.width(), frame.height(), sync));
            })
            .with_progress(move |event| {
                progress_sink
                    .borrow_mut()
                    .push(format!("progress {}", event.cumulative_bytes_loaded));
            }),
        );

        // Nothing before the host grants a turn.
        assert!(events.borrow().is_empty());
        assert_eq!(provider.pump(), 1);

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("progress "));
        assert_eq!(events[1], "frame 8x8 sync=false");
    }

    #[test]
    fn png_provider_reports_decode_failure_via_stream() {
        let mut provider = PngImageProvider::new();
        provider.insert("broken", vec![0xde, 0xad, 0xbe, 0xef]);

        let stream = provider.resolve("broken", &ImageConfiguration::default());
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        stream.add_listener(
            ImageStreamListener::new(|_, _| panic!("no frame expected"))
                .with_error(move |e| sink.borrow_mut().push(e.to_string())),
        );

        provider.pump();
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("broken"));
    }

    #[test]
    fn png_provider_reports_missing_source() {
        let mut provider = PngImageProvider::new();
        let stream = provider.resolve("ghost", &ImageConfiguration::default());
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        stream.add_listener(
            ImageStreamListener::new(|_, _| {})
                .with_error(move |e| sink.borrow_mut().push(e.to_string())),
        );

        provider.pump();
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("ghost"));
    }

    #[test]
    fn decode_queues_once_per_stream() {
        let mut provider = PngImageProvider::new();
        provider.insert("icon", png_bytes(2, 2));
        let config = ImageConfiguration::default();
        provider.resolve("icon", &config);
        provider.resolve("icon", &config);
        assert_eq!(provider.pump(), 1);
        assert_eq!(provider.pump(), 0);
    }
}
