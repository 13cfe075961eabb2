use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{
    CanvasConfig, LinearCandidates, TickCandidate, TickCoord, TickSpacing, TickSpec,
    TimestampCandidates, ZOOM_FACTOR, format_general, format_timestamp, select_best,
};
use crate::error::{PlotError, PlotResult};

use super::{AxisConfig, AxisKind, AxisOrientation};

/// A tick ready for display: integer pixel position plus label text.
///
/// Serialized as a `[pixel_position, text]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, String)", into = "(i64, String)")]
pub struct AxisLabel {
    pub pixel_position: i64,
    pub text: String,
}

impl From<(i64, String)> for AxisLabel {
    fn from((pixel_position, text): (i64, String)) -> Self {
        Self {
            pixel_position,
            text,
        }
    }
}

impl From<AxisLabel> for (i64, String) {
    fn from(label: AxisLabel) -> Self {
        (label.pixel_position, label.text)
    }
}

/// Labels for both axes of one canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisLabels {
    pub x: Vec<AxisLabel>,
    pub y: Vec<AxisLabel>,
}

/// Visible extent of one axis.
///
/// `offset` is how far the canvas was panned along the axis, in pixels: with
/// `width == 500` and `offset == 100` the ticks must cover pixels
/// `[-100, 399]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisWindow {
    pub orientation: AxisOrientation,
    pub x0: f64,
    pub x1: f64,
    pub width: u32,
    pub zoom_level: f64,
    pub offset: i32,
}

impl AxisWindow {
    /// Data range after normalizing endpoint order and applying zoom.
    #[must_use]
    pub fn zoomed_range(&self) -> (f64, f64) {
        let (lo, hi) = (self.x0.min(self.x1), self.x0.max(self.x1));
        let zoom = ZOOM_FACTOR.powf(self.zoom_level);
        let mid = (lo + hi) / 2.0;
        let half = (hi - lo) / (2.0 * zoom);
        (mid - half, mid + half)
    }

    fn data_offset(&self, lo: f64, hi: f64) -> f64 {
        let span = match self.orientation {
            AxisOrientation::X => hi - lo,
            AxisOrientation::Y => lo - hi,
        };
        span / f64::from(self.width) * f64::from(self.offset)
    }

    /// Maps a data value to a pixel index along this axis. The y axis grows
    /// downward, so larger values sit closer to pixel zero.
    #[must_use]
    pub fn pixel_of(&self, value: f64) -> i64 {
        let (lo, hi) = self.zoomed_range();
        let scale = (f64::from(self.width) - 1.0) / (hi - lo);
        let raw = match self.orientation {
            AxisOrientation::X => (value - lo) * scale,
            AxisOrientation::Y => (hi - value) * scale,
        };
        raw.round_ties_even() as i64
    }
}

/// Tick generator bound to one axis kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickGenerator {
    Linear,
    Timestamp { timezone: FixedOffset },
}

impl TickGenerator {
    /// Best-scoring tick set for the data window `lo..hi`, or an empty list
    /// when no acceptable spacing exists.
    #[must_use]
    pub fn best_ticks(&self, lo: f64, hi: f64, width: u32, spacing: TickSpacing) -> Vec<TickCoord> {
        let picked = match self {
            Self::Linear => {
                select_best(LinearCandidates::new(lo, hi, width, spacing), width, spacing)
                    .map(|list| (list.spec(), list.coords()))
            }
            Self::Timestamp { timezone } => select_best(
                TimestampCandidates::new(lo, hi, width, spacing, *timezone),
                width,
                spacing,
            )
            .map(|list| (list.spec(), list.coords())),
        };

        match picked {
            Some((spec, coords)) => {
                log_spec(spec, width);
                coords
            }
            None => Vec::new(),
        }
    }

    /// Human-readable data coordinate: `%8g` on linear axes, a local
    /// date-time on timestamp axes.
    #[must_use]
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::Linear => format!("{:>8}", format_general(value, 6)),
            Self::Timestamp { timezone } => format_timestamp(value, *timezone)
                .unwrap_or_else(|| format_general(value, 6)),
        }
    }

    /// Ticks for one axis window, mapped to pixels.
    #[must_use]
    pub fn labels(&self, window: &AxisWindow, spacing: TickSpacing) -> Vec<AxisLabel> {
        let (lo, hi) = window.zoomed_range();
        if !lo.is_finite() || !hi.is_finite() || lo == hi || window.width == 0 {
            return Vec::new();
        }

        let data_offset = window.data_offset(lo, hi);
        self.best_ticks(lo - data_offset, hi - data_offset, window.width, spacing)
            .into_iter()
            .map(|(value, text)| AxisLabel {
                pixel_position: window.pixel_of(value),
                text,
            })
            .collect()
    }
}

fn log_spec(spec: TickSpec, width: u32) {
    trace!(
        step = spec.step,
        unit = ?spec.unit,
        tick_count = spec.tick_count,
        width,
        "selected tick spacing"
    );
}

/// Produces axis labels for canvas configs.
///
/// Axis kinds are resolved into generators once, at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLabelEngine {
    x: TickGenerator,
    y: TickGenerator,
    spacing: TickSpacing,
}

impl AxisLabelEngine {
    pub fn new(config: AxisConfig) -> PlotResult<Self> {
        let spacing = config.spacing;
        if !(spacing.min_dist_px.is_finite() && spacing.min_dist_px > 0.0) {
            return Err(PlotError::InvalidConfig(
                "minimum tick distance must be finite and > 0".to_owned(),
            ));
        }
        if !(spacing.best_dist_px.is_finite() && spacing.best_dist_px > 0.0) {
            return Err(PlotError::InvalidConfig(
                "best tick distance must be finite and > 0".to_owned(),
            ));
        }

        let timezone = config.timezone.fixed_offset()?;
        let resolve = |kind: AxisKind| match kind {
            AxisKind::Linear => TickGenerator::Linear,
            AxisKind::Timestamp => TickGenerator::Timestamp { timezone },
        };

        Ok(Self {
            x: resolve(config.x),
            y: resolve(config.y),
            spacing,
        })
    }

    #[must_use]
    pub fn generator(&self, orientation: AxisOrientation) -> TickGenerator {
        match orientation {
            AxisOrientation::X => self.x,
            AxisOrientation::Y => self.y,
        }
    }

    /// Labels for one axis of an arbitrary window.
    #[must_use]
    pub fn axis_labels(&self, window: &AxisWindow) -> Vec<AxisLabel> {
        self.generator(window.orientation).labels(window, self.spacing)
    }

    /// Labels for both axes of `canvas`, honoring its zoom level and pan
    /// offsets.
    #[must_use]
    pub fn labels(&self, canvas: &CanvasConfig) -> AxisLabels {
        let (x0, x1) = canvas.x_range();
        let (y0, y1) = canvas.y_range();
        AxisLabels {
            x: self.axis_labels(&AxisWindow {
                orientation: AxisOrientation::X,
                x0,
                x1,
                width: canvas.width(),
                zoom_level: canvas.zoom_level(),
                offset: canvas.x_offset(),
            }),
            y: self.axis_labels(&AxisWindow {
                orientation: AxisOrientation::Y,
                x0: y0,
                x1: y1,
                width: canvas.height(),
                zoom_level: canvas.zoom_level(),
                offset: canvas.y_offset(),
            }),
        }
    }
}
