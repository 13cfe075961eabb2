//! tileplot: axis tick generation and versioned selection sync for tiled,
//! zoomable plot canvases.
//!
//! `core` holds pure value types and tick algorithms, `api` coordinates
//! per-canvas state and the front end message protocol, and `render` is the
//! seam to whatever backend produces tile bitmaps.

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use error::{PlotError, PlotResult};
