use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::CanvasConfig;
use crate::error::{PlotError, PlotResult};
use crate::render::{TileRenderRequest, TileRenderer};

/// Sequence number used for tiles the backend pushes on its own, e.g. the
/// full grid sent after a new canvas config.
pub const UNSOLICITED_TILE_SEQ: i32 = -1;

/// Position of one tile plus the front end's sequence number for it.
///
/// Encoded on the wire as `"row:col:seq"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub row: i32,
    pub col: i32,
    pub seq: i32,
}

impl TileCoord {
    #[must_use]
    pub fn new(row: i32, col: i32, seq: i32) -> Self {
        Self { row, col, seq }
    }
}

impl FromStr for TileCoord {
    type Err = PlotError;

    fn from_str(encoded: &str) -> PlotResult<Self> {
        let parts: SmallVec<[&str; 3]> = encoded.split(':').collect();
        let [row, col, seq] = parts.as_slice() else {
            return Err(PlotError::MalformedMessage(format!(
                "tile coordinate `{encoded}` is not `row:col:seq`"
            )));
        };
        let parse = |part: &str| {
            part.trim().parse::<i32>().map_err(|err| {
                PlotError::MalformedMessage(format!("tile coordinate `{encoded}`: {err}"))
            })
        };
        Ok(Self::new(parse(*row)?, parse(*col)?, parse(*seq)?))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.row, self.col, self.seq)
    }
}

impl Serialize for TileCoord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TileCoord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// `[row, col, seq, row, col, seq, ...]`, the layout renderers consume.
#[must_use]
pub fn flatten_coords(coords: &[TileCoord]) -> Vec<i32> {
    coords
        .iter()
        .flat_map(|coord| [coord.row, coord.col, coord.seq])
        .collect()
}

/// Tile request whose selection-version prerequisite has been checked (or is
/// still waiting, while parked in the selection controller).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTileRequest {
    pub canvas: CanvasConfig,
    pub item_id: Option<usize>,
    pub selection_version: u64,
    pub priority: Vec<TileCoord>,
    pub regular: Vec<TileCoord>,
}

impl PendingTileRequest {
    fn to_render_request(&self) -> TileRenderRequest {
        TileRenderRequest {
            canvas: self.canvas,
            item_id: self.item_id,
            selection_version: self.selection_version,
            priority: flatten_coords(&self.priority),
            regular: flatten_coords(&self.regular),
        }
    }
}

/// Forwards resolved tile requests to the renderer.
#[derive(Clone)]
pub struct TileRequestRouter {
    renderer: Arc<dyn TileRenderer>,
}

impl fmt::Debug for TileRequestRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileRequestRouter").finish_non_exhaustive()
    }
}

impl TileRequestRouter {
    #[must_use]
    pub fn new(renderer: Arc<dyn TileRenderer>) -> Self {
        Self { renderer }
    }

    /// Confirms receipt of earlier tiles. Must run before any dispatch from
    /// the same batch.
    pub fn acknowledge(&self, seqs: &[i64]) -> PlotResult<()> {
        if seqs.is_empty() {
            return Ok(());
        }
        trace!(count = seqs.len(), "acknowledging tile seqs");
        self.renderer.acknowledge_seqs(seqs)
    }

    pub fn dispatch(&self, request: &PendingTileRequest) -> PlotResult<()> {
        let render_request = request.to_render_request();
        if render_request.is_empty() {
            return Ok(());
        }
        debug!(
            config_id = request.canvas.id(),
            item_id = ?request.item_id,
            version = request.selection_version,
            tiles = render_request.tile_count(),
            "dispatching tile request"
        );
        self.renderer.render_tiles(&render_request)
    }

    /// Every tile of `canvas`, row-major, as priority work.
    pub fn dispatch_full_grid(&self, canvas: CanvasConfig, selection_version: u64) -> PlotResult<()> {
        let (rows, cols) = canvas.tile_grid();
        let priority = (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .filter_map(|(row, col)| {
                Some(TileCoord::new(
                    i32::try_from(row).ok()?,
                    i32::try_from(col).ok()?,
                    UNSOLICITED_TILE_SEQ,
                ))
            })
            .collect();
        self.dispatch(&PendingTileRequest {
            canvas,
            item_id: None,
            selection_version,
            priority,
            regular: Vec::new(),
        })
    }
}
