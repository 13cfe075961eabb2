use serde::{Deserialize, Serialize};

use crate::error::{PlotError, PlotResult};

/// Zoom multiplier applied per zoom step by the front end.
pub const ZOOM_FACTOR: f64 = 1.5;

/// Edge length of one rendered tile, in pixels.
pub const TILE_SIZE: u32 = 256;

/// Data-space bounding box of everything plotted on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataRange {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl DataRange {
    #[must_use]
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    /// Range used when a canvas is reset: 5% margin on each side, or a unit
    /// margin when the data is flat along that axis.
    #[must_use]
    pub fn initial_view(self) -> ((f64, f64), (f64, f64)) {
        (
            padded_range(self.xmin, self.xmax),
            padded_range(self.ymin, self.ymax),
        )
    }
}

fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let diff = max - min;
    let margin = if diff == 0.0 { 1.0 } else { diff * 0.05 };
    (min - margin, max + margin)
}

/// Point in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// One canvas viewport: size, data corners, zoom level and pan offset.
///
/// The data-to-pixel mapping keeps the midpoint of the range at the middle of
/// the canvas while zooming:
///
/// `px = (w-1) * (Z * (x - (x0+x1)/2) / (x1-x0) + 1/2)` with
/// `Z = ZOOM_FACTOR^zoom_level`.
///
/// The y axis is inverted (`y1` sits on the top pixel row).
///
/// Values are immutable once built; every resize, zoom or pan produces a new
/// config. On the wire the struct uses the front end's field names
/// (`config_id`, `w`, `h`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CanvasConfigWire", into = "CanvasConfigWire")]
pub struct CanvasConfig {
    id: i64,
    width: u32,
    height: u32,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    zoom_level: f64,
    x_offset: i32,
    y_offset: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CanvasConfigWire {
    config_id: i64,
    w: u32,
    h: u32,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    #[serde(default)]
    zoom_level: f64,
    #[serde(default)]
    x_offset: i32,
    #[serde(default)]
    y_offset: i32,
}

impl TryFrom<CanvasConfigWire> for CanvasConfig {
    type Error = PlotError;

    fn try_from(wire: CanvasConfigWire) -> PlotResult<Self> {
        Self::new(wire.config_id, wire.w, wire.h, (wire.x0, wire.y0), (wire.x1, wire.y1))?
            .with_view_state(wire.zoom_level, wire.x_offset, wire.y_offset)
    }
}

impl From<CanvasConfig> for CanvasConfigWire {
    fn from(config: CanvasConfig) -> Self {
        Self {
            config_id: config.id,
            w: config.width,
            h: config.height,
            x0: config.x0,
            y0: config.y0,
            x1: config.x1,
            y1: config.y1,
            zoom_level: config.zoom_level,
            x_offset: config.x_offset,
            y_offset: config.y_offset,
        }
    }
}

impl CanvasConfig {
    /// Builds a config at zoom level zero with no pan offset.
    ///
    /// Corners may be given in any order; they are normalized so that
    /// `x0 <= x1` and `y0 <= y1`.
    pub fn new(
        id: i64,
        width: u32,
        height: u32,
        corner_a: (f64, f64),
        corner_b: (f64, f64),
    ) -> PlotResult<Self> {
        if width == 0 || height == 0 {
            return Err(PlotError::InvalidViewport { width, height });
        }
        let coords = [corner_a.0, corner_a.1, corner_b.0, corner_b.1];
        if coords.iter().any(|value| !value.is_finite()) {
            return Err(PlotError::InvalidData(
                "canvas corners must be finite".to_owned(),
            ));
        }

        Ok(Self {
            id,
            width,
            height,
            x0: corner_a.0.min(corner_b.0),
            y0: corner_a.1.min(corner_b.1),
            x1: corner_a.0.max(corner_b.0),
            y1: corner_a.1.max(corner_b.1),
            zoom_level: 0.0,
            x_offset: 0,
            y_offset: 0,
        })
    }

    /// Returns a copy carrying the front end's current zoom level and pan
    /// offset. These do not change the config id.
    pub fn with_view_state(mut self, zoom_level: f64, x_offset: i32, y_offset: i32) -> PlotResult<Self> {
        if !zoom_level.is_finite() {
            return Err(PlotError::InvalidData(
                "zoom level must be finite".to_owned(),
            ));
        }
        self.zoom_level = zoom_level;
        self.x_offset = x_offset;
        self.y_offset = y_offset;
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn x_range(&self) -> (f64, f64) {
        (self.x0, self.x1)
    }

    #[must_use]
    pub fn y_range(&self) -> (f64, f64) {
        (self.y0, self.y1)
    }

    #[must_use]
    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    #[must_use]
    pub fn x_offset(&self) -> i32 {
        self.x_offset
    }

    #[must_use]
    pub fn y_offset(&self) -> i32 {
        self.y_offset
    }

    #[must_use]
    pub fn zoom_factor(&self) -> f64 {
        ZOOM_FACTOR.powf(self.zoom_level)
    }

    /// Horizontal data range visible at the current zoom level (pan ignored).
    #[must_use]
    pub fn visible_x_range(&self) -> (f64, f64) {
        zoomed_range(self.x0, self.x1, self.zoom_factor())
    }

    /// Vertical data range visible at the current zoom level (pan ignored).
    #[must_use]
    pub fn visible_y_range(&self) -> (f64, f64) {
        zoomed_range(self.y0, self.y1, self.zoom_factor())
    }

    /// Maps a pixel position of this config (before pan) to data space.
    #[must_use]
    pub fn data_coord(&self, px: f64, py: f64) -> DataPoint {
        let inv_zoom = 1.0 / self.zoom_factor();
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        DataPoint {
            x: (self.x0 + self.x1) * 0.5
                + (self.x1 - self.x0) * inv_zoom * (px / (w - 1.0) - 0.5),
            y: (self.y0 + self.y1) * 0.5
                + (self.y0 - self.y1) * inv_zoom * (py / (h - 1.0) - 0.5),
        }
    }

    /// Maps a data point to fractional pixel coordinates of this config
    /// (before pan). Inverse of [`CanvasConfig::data_coord`].
    #[must_use]
    pub fn pixel_coord(&self, point: DataPoint) -> (f64, f64) {
        let zoom = self.zoom_factor();
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        (
            (w - 1.0) * (zoom * (point.x - (self.x0 + self.x1) * 0.5) / (self.x1 - self.x0) + 0.5),
            (h - 1.0) * (zoom * (point.y - (self.y0 + self.y1) * 0.5) / (self.y0 - self.y1) + 0.5),
        )
    }

    /// Number of tile rows and columns needed to cover the canvas.
    #[must_use]
    pub fn tile_grid(&self) -> (u32, u32) {
        (
            self.height.div_ceil(TILE_SIZE),
            self.width.div_ceil(TILE_SIZE),
        )
    }

    /// Config for a freshly reset canvas showing the whole data range.
    pub fn reset(id: i64, width: u32, height: u32, data: DataRange) -> PlotResult<Self> {
        let ((x0, x1), (y0, y1)) = data.initial_view();
        Self::new(id, width, height, (x0, y0), (x1, y1))
    }

    /// Config that keeps the area currently visible in `self` (including
    /// zoom and pan) but with a new canvas size.
    pub fn resized(&self, id: i64, width: u32, height: u32) -> PlotResult<Self> {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let x_offset = f64::from(self.x_offset);
        let y_offset = f64::from(self.y_offset);
        self.derive(
            id,
            width,
            height,
            (-x_offset, (h - 1.0) - y_offset),
            ((w - 1.0) - x_offset, -y_offset),
        )
    }

    /// Config covering the pixel rectangle `(px0, py0)..(px1, py1)` of `self`.
    pub fn zoomed(
        &self,
        id: i64,
        width: u32,
        height: u32,
        region: (f64, f64, f64, f64),
    ) -> PlotResult<Self> {
        let (px0, py0, px1, py1) = region;
        self.derive(id, width, height, (px0, py0), (px1, py1))
    }

    fn derive(
        &self,
        id: i64,
        width: u32,
        height: u32,
        pixel_a: (f64, f64),
        pixel_b: (f64, f64),
    ) -> PlotResult<Self> {
        let a = self.data_coord(pixel_a.0, pixel_a.1);
        let b = self.data_coord(pixel_b.0, pixel_b.1);
        Self::new(id, width, height, (a.x, a.y), (b.x, b.y))
    }
}

fn zoomed_range(lo: f64, hi: f64, zoom: f64) -> (f64, f64) {
    let mid = (lo + hi) / 2.0;
    let half = (hi - lo) / (2.0 * zoom);
    (mid - half, mid + half)
}
