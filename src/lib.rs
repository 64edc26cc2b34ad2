//! Tapestry UI - widget-layer kernel for a retained-mode UI host.
//!
//! Two independently usable cores:
//!
//! - [`image`] - resolves an abstract image request to a keyed decoded-frame
//!   stream and tracks one UI node's subscription to it across lifecycle
//!   changes (visibility, request switches, teardown).
//! - [`shortcuts`] - maps unordered pressed-key chords to opaque intents and
//!   dispatches raw key-down events against that table, with synonym
//!   fallback for side-specific modifier keys.
//!
//! The host owns layout, paint, focus, and the event loop; this crate only
//! answers "what is the current state" and "was this event consumed". All
//! state lives on the host's single UI thread.

pub mod error;
pub mod image;
pub mod logging;
pub mod shortcuts;

pub use error::{ImageStreamError, KeySetError, ResultExt};
