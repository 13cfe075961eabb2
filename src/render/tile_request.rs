use serde::{Deserialize, Serialize};

use crate::core::CanvasConfig;
use crate::error::{PlotError, PlotResult};

/// One batch of tiles to render for a canvas.
///
/// `item_id` is set when the front end asks for a single highlighted item;
/// otherwise the tiles show every selected item as of `selection_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRenderRequest {
    pub canvas: CanvasConfig,
    pub item_id: Option<usize>,
    pub selection_version: u64,
    /// Flattened `[row, col, seq, ...]` triples rendered first.
    pub priority: Vec<i32>,
    pub regular: Vec<i32>,
}

impl TileRenderRequest {
    #[must_use]
    pub fn tile_count(&self) -> usize {
        (self.priority.len() + self.regular.len()) / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.regular.is_empty()
    }

    /// Checks that both coordinate lists hold whole triples inside the
    /// canvas tile grid.
    pub fn validate(&self) -> PlotResult<()> {
        let (rows, cols) = self.canvas.tile_grid();
        for (name, coords) in [("priority", &self.priority), ("regular", &self.regular)] {
            if coords.len() % 3 != 0 {
                return Err(PlotError::InvalidData(format!(
                    "{name} tile list length {} is not a multiple of 3",
                    coords.len()
                )));
            }
            for triple in coords.chunks_exact(3) {
                let (row, col) = (triple[0], triple[1]);
                let in_grid = u32::try_from(row).is_ok_and(|row| row < rows)
                    && u32::try_from(col).is_ok_and(|col| col < cols);
                if !in_grid {
                    return Err(PlotError::InvalidData(format!(
                        "tile ({row}, {col}) is outside the {rows}x{cols} grid"
                    )));
                }
            }
        }
        Ok(())
    }
}
