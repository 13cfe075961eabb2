use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::core::TickSpacing;
use crate::error::{PlotError, PlotResult};

/// How values along an axis are interpreted.
///
/// Only these two kinds exist; anything else is rejected when options are
/// parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    #[default]
    Linear,
    /// Unix timestamps in seconds, labeled on calendar boundaries.
    Timestamp,
}

/// Which canvas edge an axis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrientation {
    X,
    Y,
}

/// Timezone used to compute calendar fields on timestamp axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeAxisTimeZone {
    #[default]
    Utc,
    FixedOffsetMinutes {
        minutes: i16,
    },
}

impl TimeAxisTimeZone {
    #[must_use]
    pub fn offset_minutes(self) -> i16 {
        match self {
            Self::Utc => 0,
            Self::FixedOffsetMinutes { minutes } => minutes,
        }
    }

    pub fn fixed_offset(self) -> PlotResult<FixedOffset> {
        let seconds = i32::from(self.offset_minutes()) * 60;
        FixedOffset::east_opt(seconds).ok_or_else(|| {
            PlotError::InvalidConfig(format!(
                "timezone offset of {} minutes is out of range",
                self.offset_minutes()
            ))
        })
    }
}

/// Per-canvas axis setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub x: AxisKind,
    pub y: AxisKind,
    pub timezone: TimeAxisTimeZone,
    pub spacing: TickSpacing,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            x: AxisKind::Linear,
            y: AxisKind::Linear,
            timezone: TimeAxisTimeZone::Utc,
            spacing: TickSpacing::default(),
        }
    }
}

impl AxisConfig {
    #[must_use]
    pub fn new(x: AxisKind, y: AxisKind) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: TimeAxisTimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_spacing(mut self, spacing: TickSpacing) -> Self {
        self.spacing = spacing;
        self
    }

    #[must_use]
    pub fn kind(&self, orientation: AxisOrientation) -> AxisKind {
        match orientation {
            AxisOrientation::X => self.x,
            AxisOrientation::Y => self.y,
        }
    }
}
