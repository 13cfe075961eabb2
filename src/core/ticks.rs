use serde::{Deserialize, Serialize};

/// Preferred distance between neighboring ticks, in pixels.
pub const BEST_DIST_PX: f64 = 100.0;
/// Generation stops once ticks would be closer than this, in pixels.
pub const MIN_DIST_PX: f64 = 50.0;

const SCORE_EPSILON: f64 = 1e-6;

/// Calendar unit paired with a tick step. `None` marks plain numeric steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickUnit {
    None,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// One candidate tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSpec {
    pub step: f64,
    pub unit: TickUnit,
    pub tick_count: i64,
}

/// Pixel distances steering candidate generation and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSpacing {
    pub min_dist_px: f64,
    pub best_dist_px: f64,
}

impl Default for TickSpacing {
    fn default() -> Self {
        Self {
            min_dist_px: MIN_DIST_PX,
            best_dist_px: BEST_DIST_PX,
        }
    }
}

impl TickSpacing {
    /// Larger is worse.
    #[must_use]
    pub fn score(self, spec: TickSpec, width: u32) -> f64 {
        (f64::from(width) / (spec.tick_count as f64 + SCORE_EPSILON) - self.best_dist_px).abs()
    }

    /// True once a candidate is dense enough that finer steps are pointless.
    #[must_use]
    pub fn is_too_dense(self, spec: TickSpec, width: u32) -> bool {
        spec.tick_count >= 2 && (spec.tick_count as f64) > f64::from(width) / self.min_dist_px
    }

    /// Two ticks are required, except on very narrow axes where one is fine.
    #[must_use]
    pub fn is_eligible(spec: TickSpec, width: u32) -> bool {
        spec.tick_count >= 2 || (spec.tick_count == 1 && width < 100)
    }
}

/// Tick value in data space paired with its label.
pub type TickCoord = (f64, String);

/// A candidate produced by a tick generator.
pub trait TickCandidate {
    fn spec(&self) -> TickSpec;
    fn coords(&self) -> Vec<TickCoord>;
}

/// Picks the eligible candidate with the lowest score. Ties keep the one
/// generated first.
pub fn select_best<C, I>(candidates: I, width: u32, spacing: TickSpacing) -> Option<C>
where
    C: TickCandidate,
    I: IntoIterator<Item = C>,
{
    let mut best: Option<(f64, C)> = None;
    for candidate in candidates {
        let spec = candidate.spec();
        if !TickSpacing::is_eligible(spec, width) {
            continue;
        }
        let score = spacing.score(spec, width);
        if best.as_ref().is_none_or(|(best_score, _)| score < *best_score) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
