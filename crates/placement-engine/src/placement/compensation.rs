//! Compensation values and the legacy string parser.
//!
//! Jobs written by the engine carry a structured [`Compensation`]. Older documents only hold
//! free-form strings such as `"12.5 LPA"` under `salary`, `package`, `ctc`, or `stipend`; those
//! are converted once at read time through [`try_parse_compensation`], which is a compatibility
//! shim and not the representation new data should use.

use serde::{Deserialize, Serialize};

const UNIT_SUFFIX: &str = "lpa";

/// Parses a legacy compensation string into lakhs per annum.
///
/// Returns `None` for empty or malformed input so callers can tell "unknown" from a
/// legitimate zero offer.
pub fn try_parse_compensation(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let number = strip_unit(trimmed).trim();
    if number.is_empty() {
        return None;
    }

    number
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

/// Total variant of [`try_parse_compensation`]: malformed input degrades to `0.0`.
///
/// A zero from this function means "unknown" unless the source text itself was a zero amount;
/// aggregate code should prefer the `Option` form.
pub fn parse_compensation(text: &str) -> f64 {
    try_parse_compensation(text).unwrap_or(0.0)
}

fn strip_unit(text: &str) -> &str {
    let split = text.len().saturating_sub(UNIT_SUFFIX.len());
    match (text.get(..split), text.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(UNIT_SUFFIX) => head,
        _ => text,
    }
}

/// Whether the offer is a full-time salary or an internship stipend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationKind {
    Salary,
    Stipend,
}

/// Structured compensation expressed in lakhs per annum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    pub amount_lpa: f64,
    pub kind: CompensationKind,
}

impl Compensation {
    pub fn salary(amount_lpa: f64) -> Self {
        Self {
            amount_lpa,
            kind: CompensationKind::Salary,
        }
    }

    pub fn stipend(amount_lpa: f64) -> Self {
        Self {
            amount_lpa,
            kind: CompensationKind::Stipend,
        }
    }

    /// Imports a legacy string, returning `None` when it cannot be understood.
    pub fn from_legacy(text: &str, kind: CompensationKind) -> Option<Self> {
        try_parse_compensation(text).map(|amount_lpa| Self { amount_lpa, kind })
    }

    pub fn bucket(&self) -> CompensationBucket {
        CompensationBucket::for_amount(self.amount_lpa)
    }

    pub fn label(&self) -> String {
        format!("{} LPA", self.amount_lpa)
    }
}

/// Fixed histogram ranges, lower bound inclusive and upper bound exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationBucket {
    UpToFive,
    FiveToTen,
    TenToFifteen,
    FifteenToTwenty,
    TwentyToThirty,
    ThirtyPlus,
}

impl CompensationBucket {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::UpToFive,
            Self::FiveToTen,
            Self::TenToFifteen,
            Self::FifteenToTwenty,
            Self::TwentyToThirty,
            Self::ThirtyPlus,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::UpToFive => "0-5 LPA",
            Self::FiveToTen => "5-10 LPA",
            Self::TenToFifteen => "10-15 LPA",
            Self::FifteenToTwenty => "15-20 LPA",
            Self::TwentyToThirty => "20-30 LPA",
            Self::ThirtyPlus => "30+ LPA",
        }
    }

    pub const fn lower_bound(self) -> f64 {
        match self {
            Self::UpToFive => 0.0,
            Self::FiveToTen => 5.0,
            Self::TenToFifteen => 10.0,
            Self::FifteenToTwenty => 15.0,
            Self::TwentyToThirty => 20.0,
            Self::ThirtyPlus => 30.0,
        }
    }

    pub fn for_amount(amount_lpa: f64) -> Self {
        Self::ordered()
            .into_iter()
            .rev()
            .find(|bucket| amount_lpa >= bucket.lower_bound())
            .unwrap_or(Self::UpToFive)
    }
}

/// Running min/avg/max over known compensation values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationSummary {
    pub known: usize,
    pub total: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CompensationSummary {
    pub fn record(&mut self, amount_lpa: f64) {
        self.known += 1;
        self.total += amount_lpa;
        self.min = Some(self.min.map_or(amount_lpa, |min| min.min(amount_lpa)));
        self.max = Some(self.max.map_or(amount_lpa, |max| max.max(amount_lpa)));
    }

    pub fn record_optional(&mut self, compensation: Option<&Compensation>) {
        if let Some(compensation) = compensation {
            self.record(compensation.amount_lpa);
        }
    }

    pub fn average(&self) -> Option<f64> {
        if self.known == 0 {
            None
        } else {
            Some(round2(self.total / self.known as f64))
        }
    }
}

/// Rounds to two decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_examples() {
        assert_eq!(parse_compensation("12 LPA"), 12.0);
        assert_eq!(parse_compensation("12.5 LPA"), 12.5);
        assert_eq!(parse_compensation("  8.25lpa "), 8.25);
        assert_eq!(parse_compensation("6 Lpa"), 6.0);
        assert_eq!(parse_compensation("14"), 14.0);
    }

    #[test]
    fn malformed_input_degrades_to_zero() {
        assert_eq!(parse_compensation(""), 0.0);
        assert_eq!(parse_compensation("abc"), 0.0);
        assert_eq!(parse_compensation("LPA"), 0.0);
        assert_eq!(parse_compensation("-4 LPA"), 0.0);
        assert_eq!(parse_compensation("inf LPA"), 0.0);
        assert_eq!(parse_compensation("₹ 12 LPA"), 0.0);
    }

    #[test]
    fn option_form_separates_unknown_from_zero() {
        assert_eq!(try_parse_compensation("0 LPA"), Some(0.0));
        assert_eq!(try_parse_compensation("   "), None);
        assert_eq!(try_parse_compensation("competitive"), None);
    }

    #[test]
    fn formatted_amounts_round_trip() {
        for amount in [0.0, 3.6, 7.0, 12.5, 19.99, 44.0, 120.75] {
            assert_eq!(parse_compensation(&format!("{amount} LPA")), amount);
        }
    }

    #[test]
    fn buckets_use_inclusive_lower_bounds() {
        assert_eq!(CompensationBucket::for_amount(0.0), CompensationBucket::UpToFive);
        assert_eq!(CompensationBucket::for_amount(4.99), CompensationBucket::UpToFive);
        assert_eq!(CompensationBucket::for_amount(5.0), CompensationBucket::FiveToTen);
        assert_eq!(CompensationBucket::for_amount(6.5), CompensationBucket::FiveToTen);
        assert_eq!(
            CompensationBucket::for_amount(20.0),
            CompensationBucket::TwentyToThirty
        );
        assert_eq!(
            CompensationBucket::for_amount(29.9),
            CompensationBucket::TwentyToThirty
        );
        assert_eq!(CompensationBucket::for_amount(30.0), CompensationBucket::ThirtyPlus);
    }

    #[test]
    fn summary_tracks_extrema_and_average() {
        let mut summary = CompensationSummary::default();
        assert_eq!(summary.average(), None);

        summary.record(6.5);
        summary.record(22.0);
        summary.record_optional(None);
        summary.record_optional(Some(&Compensation::salary(10.0)));

        assert_eq!(summary.known, 3);
        assert_eq!(summary.min, Some(6.5));
        assert_eq!(summary.max, Some(22.0));
        assert_eq!(summary.average(), Some(12.83));
    }
}
