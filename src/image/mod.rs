//! Image stream resolution and lifecycle tracking.
//!
//! This module provides:
//! - [`ImageStream`] - keyed handle onto a decoded-frame sequence with a
//!   frame/progress/error listener registry
//! - [`ImageProvider`] - resolving a source + [`ImageConfiguration`] to a
//!   stream, with the identity guarantee that equal requests yield
//!   identity-equal streams
//! - [`ImageStreamTracker`] - per-UI-node subscription tracking: at most
//!   one live listener, request switching, gapless playback, and explicit
//!   lifecycle hooks driven by the host
//!
//! Everything runs on the host's single UI thread; "asynchronous" delivery
//! means a later turn of the host event loop (see
//! [`PngImageProvider::pump`]).

mod provider;
mod stream;
mod tracker;


pub use provider::{
    stream_key, ImageConfiguration, ImageProvider, MemoryImageProvider, PngImageProvider,
    TextDirection,
};
pub use stream::{
    ImageChunkEvent, ImageFrame, ImageStream, ImageStreamKey, ImageStreamListener, ListenerId,
};
pub use tracker::{ImageStreamTracker, TrackedImage};
