mod recording_renderer;
mod tile_request;

pub use recording_renderer::{RecordingRenderer, RendererEvent};
pub use tile_request::TileRenderRequest;

use crate::error::PlotResult;

/// Contract implemented by any tile rendering backend.
///
/// Backends receive fully resolved requests: selection versions are already
/// satisfied and tile coordinates are flattened `[row, col, seq, ...]`
/// triples, so drawing code stays isolated from the message protocol.
///
/// Methods take `&self` because one backend instance is shared by every
/// handler thread of a canvas.
pub trait TileRenderer: Send + Sync {
    /// Marks previously sent tiles as received by the front end.
    fn acknowledge_seqs(&self, seqs: &[i64]) -> PlotResult<()>;

    fn render_tiles(&self, request: &TileRenderRequest) -> PlotResult<()>;
}
