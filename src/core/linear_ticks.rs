use std::collections::HashSet;

use super::ticks::{TickCandidate, TickCoord, TickSpacing, TickSpec, TickUnit};

/// Multipliers tried for every power-of-ten step, largest first.
pub const STEP_MULTIPLIERS: [f64; 3] = [1.0, 0.5, 0.2];

/// Multiples beyond this are printed in scientific notation.
const MAX_PLAIN_MULTIPLE: i64 = 100_000_000;
const MIN_FIXED_POINT_STEP: f64 = 0.000_001;
// Seventeen significant digits tell any two distinct f64 values apart.
const MAX_SCIENTIFIC_PRECISION: usize = 16;
// Neighbouring tick values must stay distinct after rounding.
const MAX_TICK_INDEX: f64 = 1.0e15;
// Absorbs log10 noise for steps that sit exactly on a power of ten.
const EXPONENT_SLACK: f64 = 1e-6;

/// Ticks at `cmin * step, (cmin + 1) * step, ..., cmax * step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTickList {
    step: f64,
    cmin: i64,
    cmax: i64,
}

impl LinearTickList {
    /// Returns `None` when the tick indices would not be exact integers.
    #[must_use]
    pub fn new(x0: f64, x1: f64, step: f64) -> Option<Self> {
        let cmin = (x0 / step).ceil();
        let cmax = (x1 / step).floor();
        if !cmin.is_finite()
            || !cmax.is_finite()
            || cmin.abs() > MAX_TICK_INDEX
            || cmax.abs() > MAX_TICK_INDEX
        {
            return None;
        }

        Some(Self {
            step,
            cmin: cmin as i64,
            cmax: cmax as i64,
        })
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[must_use]
    pub fn tick_count(&self) -> i64 {
        self.cmax - self.cmin + 1
    }

    /// Tick values in data space.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        (self.cmin..=self.cmax)
            .map(|index| index as f64 * self.step)
            .collect()
    }

    fn max_multiple(&self) -> i64 {
        self.cmin.saturating_abs().max(self.cmax.saturating_abs())
    }
}

impl TickCandidate for LinearTickList {
    fn spec(&self) -> TickSpec {
        TickSpec {
            step: self.step,
            unit: TickUnit::None,
            tick_count: self.tick_count(),
        }
    }

    fn coords(&self) -> Vec<TickCoord> {
        let values = self.values();
        let plain = self.max_multiple() < MAX_PLAIN_MULTIPLE;

        if self.step >= 1.0 && plain {
            return values
                .into_iter()
                .map(|value| (value, format!("{:.0}", normalize_zero(value.round()))))
                .collect();
        }

        if (MIN_FIXED_POINT_STEP..1.0).contains(&self.step) && plain {
            let digits = fixed_point_digits(self.step);
            return values
                .into_iter()
                .map(|value| (value, format!("{:.*}", digits, normalize_zero(value))))
                .collect();
        }

        // Start with enough digits to print every multiple of the step
        // exactly, then widen until no two ticks share a label.
        let mut labels = Vec::new();
        for precision in scientific_precision(&values, self.step)..=MAX_SCIENTIFIC_PRECISION {
            labels = values
                .iter()
                .map(|value| format_scientific(*value, precision))
                .collect();
            let distinct: HashSet<&String> = labels.iter().collect();
            if distinct.len() == values.len() {
                break;
            }
        }
        values.into_iter().zip(labels).collect()
    }
}

/// Lazy sequence of linear candidates with shrinking step.
///
/// Starts at the smallest power of ten covering the range and ends as soon as
/// a candidate becomes too dense for the pixel width.
#[derive(Debug, Clone)]
pub struct LinearCandidates {
    lo: f64,
    hi: f64,
    width: u32,
    spacing: TickSpacing,
    decade: f64,
    multiplier_index: usize,
    finished: bool,
}

impl LinearCandidates {
    /// `lo..hi` is the data window to place ticks in. Degenerate or
    /// non-finite windows produce no candidates.
    #[must_use]
    pub fn new(lo: f64, hi: f64, width: u32, spacing: TickSpacing) -> Self {
        let range = (hi - lo).abs();
        let decade = 10f64.powf(range.log10().ceil());
        let finished = range == 0.0 || !range.is_finite() || !decade.is_finite();
        Self {
            lo,
            hi,
            width,
            spacing,
            decade,
            multiplier_index: 0,
            finished,
        }
    }
}

impl Iterator for LinearCandidates {
    type Item = LinearTickList;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let step = self.decade * STEP_MULTIPLIERS[self.multiplier_index];
            self.multiplier_index += 1;
            if self.multiplier_index == STEP_MULTIPLIERS.len() {
                self.multiplier_index = 0;
                self.decade *= 0.1;
            }

            if !step.is_finite() || step <= 0.0 {
                self.finished = true;
                break;
            }
            let Some(list) = LinearTickList::new(self.lo, self.hi, step) else {
                self.finished = true;
                break;
            };
            if self.spacing.is_too_dense(list.spec(), self.width) {
                self.finished = true;
                break;
            }
            if list.tick_count() >= 1 {
                return Some(list);
            }
        }
        None
    }
}

fn decimal_exponent(value: f64) -> f64 {
    (value.abs().log10() + EXPONENT_SLACK).floor()
}

fn fixed_point_digits(step: f64) -> usize {
    let digits = -decimal_exponent(step);
    if digits > 0.0 { digits as usize } else { 0 }
}

fn scientific_precision(values: &[f64], step: f64) -> usize {
    let magnitude = values.iter().fold(0.0f64, |acc, value| acc.max(value.abs()));
    if magnitude == 0.0 {
        return 1;
    }
    let digits = decimal_exponent(magnitude) - decimal_exponent(step);
    if digits >= MAX_SCIENTIFIC_PRECISION as f64 {
        MAX_SCIENTIFIC_PRECISION
    } else if digits > 1.0 {
        digits as usize
    } else {
        1
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

/// `%.{precision}e` formatting: explicit exponent sign, at least two exponent
/// digits (`2.235e-05`, `1.2345678e+07`).
#[must_use]
pub fn format_scientific(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, normalize_zero(value));
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    if digits.len() < 2 {
        format!("{mantissa}e{sign}0{digits}")
    } else {
        format!("{mantissa}e{sign}{digits}")
    }
}

/// `%.{precision}g` formatting: `precision` significant digits in fixed or
/// scientific notation, whichever C would pick, trailing zeros removed.
#[must_use]
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let precision = precision.max(1);
    // Exponent after rounding to `precision` digits (9.9999995 -> 1e1).
    let rounded = format!("{:.*e}", precision - 1, value);
    let exponent = rounded
        .split_once('e')
        .and_then(|(_, exponent)| exponent.parse::<i32>().ok())
        .unwrap_or(0);
    let digits = i32::try_from(precision).unwrap_or(i32::MAX);

    if exponent < -4 || exponent >= digits {
        let raw = format_scientific(value, precision - 1);
        return match raw.split_once('e') {
            Some((mantissa, exponent)) => format!("{}e{exponent}", trim_fraction(mantissa)),
            None => raw,
        };
    }
    let decimals = usize::try_from(digits - 1 - exponent).unwrap_or(0);
    trim_fraction(&format!("{value:.decimals$}")).to_owned()
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LinearCandidates, LinearTickList, fixed_point_digits, format_general, format_scientific,
        scientific_precision,
    };
    use crate::core::ticks::{TickCandidate, TickSpacing};

    #[test]
    fn scientific_format_pads_exponent() {
        assert_eq!(format_scientific(2.235e-5, 3), "2.235e-05");
        assert_eq!(format_scientific(12_345_678.05, 9), "1.234567805e+07");
        assert_eq!(format_scientific(1.5e123, 1), "1.5e+123");
        assert_eq!(format_scientific(0.0, 2), "0.00e+00");
    }

    #[test]
    fn general_format_matches_c_g_conversion() {
        assert_eq!(format_general(1_234_567.0, 6), "1.23457e+06");
        assert_eq!(format_general(123_456.0, 6), "123456");
        assert_eq!(format_general(0.0001, 6), "0.0001");
        assert_eq!(format_general(0.000_012_5, 6), "1.25e-05");
        assert_eq!(format_general(2.5, 6), "2.5");
        assert_eq!(format_general(-40.0, 6), "-40");
        assert_eq!(format_general(9.999_999_7, 6), "10");
        assert_eq!(format_general(0.0, 6), "0");
    }

    #[test]
    fn step_exact_precision_beats_shortest_distinct_precision() {
        // Eight digits already tell 1000000004 and 1000000006 apart, but
        // would print the second one as 1000000010.
        assert_eq!(format_scientific(1_000_000_004.0, 8), "1.00000000e+09");
        assert_eq!(format_scientific(1_000_000_006.0, 8), "1.00000001e+09");

        let list = LinearTickList::new(1_000_000_003.0, 1_000_000_007.0, 2.0).expect("finite indices");
        let labels: Vec<String> = list.coords().into_iter().map(|(_, label)| label).collect();
        assert_eq!(labels, vec!["1.000000004e+09", "1.000000006e+09"]);
    }

    #[test]
    fn fixed_point_digits_follow_step_magnitude() {
        assert_eq!(fixed_point_digits(0.5), 1);
        assert_eq!(fixed_point_digits(0.02), 2);
        assert_eq!(fixed_point_digits(0.000_02), 5);
    }

    #[test]
    fn scientific_precision_covers_the_step() {
        assert_eq!(scientific_precision(&[12_345_678.0, 12_345_679.0], 0.05), 9);
        assert_eq!(scientific_precision(&[2.23e-5, 2.24e-5], 1e-8), 3);
        assert_eq!(scientific_precision(&[0.0], 1e-9), 1);
    }

    #[test]
    fn tick_list_counts_inclusive_multiples() {
        let list = LinearTickList::new(-0.5, 2.5, 1.0).expect("finite indices");
        assert_eq!(list.tick_count(), 3);
        assert_eq!(list.values(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn zero_tick_is_never_negative_zero() {
        let list = LinearTickList::new(-0.3, 0.3, 0.1).expect("finite indices");
        let labels: Vec<String> = list.coords().into_iter().map(|(_, label)| label).collect();
        assert!(labels.contains(&"0.0".to_owned()));
        assert!(!labels.iter().any(|label| label == "-0.0"));
    }

    #[test]
    fn degenerate_range_yields_nothing() {
        assert_eq!(LinearCandidates::new(1.0, 1.0, 500, TickSpacing::default()).count(), 0);
        assert_eq!(
            LinearCandidates::new(0.0, f64::NAN, 500, TickSpacing::default()).count(),
            0
        );
    }

    #[test]
    fn candidates_shrink_until_too_dense() {
        let specs: Vec<(f64, i64)> = LinearCandidates::new(0.0, 100.0, 300, TickSpacing::default())
            .map(|list| (list.step(), list.tick_count()))
            .collect();
        assert_eq!(specs, vec![(100.0, 2), (50.0, 3), (20.0, 6)]);
    }
}
