use serde::{Deserialize, Serialize};

use crate::core::{BEST_DIST_PX, MIN_DIST_PX, TickSpacing};
use crate::error::{PlotError, PlotResult};

use super::{AxisConfig, AxisKind, SelectionSyncConfig, TimeAxisTimeZone};

const MAX_TIMEZONE_OFFSET_MINUTES: i32 = 14 * 60;

/// Public per-plot configuration.
///
/// Every legal option is listed here; unknown keys and axis kinds other than
/// `linear`/`timestamp` are rejected when parsing, before any canvas exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotOptions {
    #[serde(default)]
    pub x_axis: AxisKind,
    #[serde(default)]
    pub y_axis: AxisKind,
    #[serde(default)]
    pub timezone: TimeAxisTimeZone,
    #[serde(default = "default_min_tick_distance_px")]
    pub min_tick_distance_px: f64,
    #[serde(default = "default_best_tick_distance_px")]
    pub best_tick_distance_px: f64,
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,
    #[serde(default)]
    pub sync: SelectionSyncConfig,
    #[serde(default)]
    pub debug: bool,
}

fn default_min_tick_distance_px() -> f64 {
    MIN_DIST_PX
}

fn default_best_tick_distance_px() -> f64 {
    BEST_DIST_PX
}

fn default_search_result_limit() -> usize {
    200
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            x_axis: AxisKind::Linear,
            y_axis: AxisKind::Linear,
            timezone: TimeAxisTimeZone::Utc,
            min_tick_distance_px: default_min_tick_distance_px(),
            best_tick_distance_px: default_best_tick_distance_px(),
            search_result_limit: default_search_result_limit(),
            sync: SelectionSyncConfig::default(),
            debug: false,
        }
    }
}

impl PlotOptions {
    #[must_use]
    pub fn new(x_axis: AxisKind, y_axis: AxisKind) -> Self {
        Self {
            x_axis,
            y_axis,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: TimeAxisTimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_tick_distances(mut self, min_px: f64, best_px: f64) -> Self {
        self.min_tick_distance_px = min_px;
        self.best_tick_distance_px = best_px;
        self
    }

    #[must_use]
    pub fn with_search_result_limit(mut self, limit: usize) -> Self {
        self.search_result_limit = limit;
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: SelectionSyncConfig) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Parses and validates options from JSON.
    pub fn from_json_str(input: &str) -> PlotResult<Self> {
        let options: Self = serde_json::from_str(input)
            .map_err(|e| PlotError::InvalidConfig(format!("failed to parse plot options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_json_pretty(&self) -> PlotResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PlotError::InvalidData(format!("failed to serialize plot options: {e}")))
    }

    pub fn validate(&self) -> PlotResult<()> {
        if !self.min_tick_distance_px.is_finite() || self.min_tick_distance_px <= 0.0 {
            return Err(PlotError::InvalidConfig(
                "min_tick_distance_px must be finite and > 0".to_owned(),
            ));
        }
        if !self.best_tick_distance_px.is_finite() || self.best_tick_distance_px <= 0.0 {
            return Err(PlotError::InvalidConfig(
                "best_tick_distance_px must be finite and > 0".to_owned(),
            ));
        }
        if self.search_result_limit == 0 {
            return Err(PlotError::InvalidConfig(
                "search_result_limit must be > 0".to_owned(),
            ));
        }
        if self.sync.max_pending_updates == 0 || self.sync.max_pending_tile_requests == 0 {
            return Err(PlotError::InvalidConfig(
                "pending buffer limits must be > 0".to_owned(),
            ));
        }

        let offset_minutes = i32::from(self.timezone.offset_minutes());
        if !(-MAX_TIMEZONE_OFFSET_MINUTES..=MAX_TIMEZONE_OFFSET_MINUTES).contains(&offset_minutes) {
            return Err(PlotError::InvalidConfig(
                "timezone offset must be between -840 and 840 minutes".to_owned(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn tick_spacing(&self) -> TickSpacing {
        TickSpacing {
            min_dist_px: self.min_tick_distance_px,
            best_dist_px: self.best_tick_distance_px,
        }
    }

    #[must_use]
    pub fn axis_config(&self) -> AxisConfig {
        AxisConfig::new(self.x_axis, self.y_axis)
            .with_timezone(self.timezone)
            .with_spacing(self.tick_spacing())
    }
}

#[cfg(test)]
mod tests {
    use super::PlotOptions;
    use crate::api::{AxisKind, TimeAxisTimeZone};

    #[test]
    fn empty_object_yields_defaults() {
        let options = PlotOptions::from_json_str("{}").expect("defaults");
        assert_eq!(options, PlotOptions::default());
        assert_eq!(options.search_result_limit, 200);
    }

    #[test]
    fn rejects_unknown_axis_kind_and_keys() {
        assert!(PlotOptions::from_json_str(r#"{"x_axis":"log"}"#).is_err());
        assert!(PlotOptions::from_json_str(r#"{"labels":["a"]}"#).is_err());
    }

    #[test]
    fn timezone_offset_is_bounded() {
        let options = PlotOptions::new(AxisKind::Timestamp, AxisKind::Linear)
            .with_timezone(TimeAxisTimeZone::FixedOffsetMinutes { minutes: 900 });
        assert!(options.validate().is_err());
    }
}
