//! Simulation records and win-rate arithmetic.

use serde::{Deserialize, Serialize};

use crate::codec::Deck;

/// Parse the simulator's percentage text (`"57.31%"`) into a win rate.
///
/// Anything that is not a finite number in `[0, 100]` is treated as absent.
#[must_use]
pub fn parse_win_rate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && (0.0..=100.0).contains(&value)).then_some(value)
}

/// One requested simulation and what came back. `raw` is `None` when the
/// oracle produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    pub attack: Deck,
    pub defense: Deck,
    pub raw: Option<String>,
}

impl SimRecord {
    #[must_use]
    pub fn win_rate(&self) -> Option<f64> {
        self.raw.as_deref().and_then(parse_win_rate)
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.win_rate().is_none()
    }
}

/// Denominator used when averaging a candidate's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    /// Mean over results that actually came back.
    #[default]
    PresentOnly,
    /// Sum over results that came back, divided by the number requested.
    /// Absent results therefore count as 0%.
    Requested,
}

/// Mean win rate plus the sample counts behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRateSummary {
    pub mean: f64,
    pub present: usize,
    pub requested: usize,
}

impl WinRateSummary {
    /// Summarise `requested` results, of which `rates` came back.
    ///
    /// An empty denominator yields 0.
    #[must_use]
    pub fn from_rates(rates: &[f64], requested: usize, averaging: Averaging) -> Self {
        let present = rates.len();
        let denominator = match averaging {
            Averaging::PresentOnly => present,
            Averaging::Requested => requested,
        };
        #[allow(clippy::cast_precision_loss)]
        let mean = if denominator == 0 {
            0.0
        } else {
            rates.iter().sum::<f64>() / denominator as f64
        };
        Self {
            mean,
            present,
            requested,
        }
    }

    /// Summarise a batch of records.
    #[must_use]
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a SimRecord>,
        averaging: Averaging,
    ) -> Self {
        let mut requested = 0;
        let mut rates = Vec::new();
        for record in records {
            requested += 1;
            if let Some(rate) = record.win_rate() {
                rates.push(rate);
            }
        }
        Self::from_rates(&rates, requested, averaging)
    }

    #[must_use]
    pub const fn absent(&self) -> usize {
        self.requested.saturating_sub(self.present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(raw: Option<&str>) -> SimRecord {
        SimRecord {
            attack: Deck::from("ATK"),
            defense: Deck::from("DEF"),
            raw: raw.map(str::to_string),
        }
    }

    #[test]
    fn parses_percentages_and_bare_numbers() {
        assert_eq!(parse_win_rate("57.31%"), Some(57.31));
        assert_eq!(parse_win_rate("  12.5 % "), Some(12.5));
        assert_eq!(parse_win_rate("100"), Some(100.0));
        assert_eq!(parse_win_rate("0.00%"), Some(0.0));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range_text() {
        assert_eq!(parse_win_rate(""), None);
        assert_eq!(parse_win_rate("%"), None);
        assert_eq!(parse_win_rate("Simulating..."), None);
        assert_eq!(parse_win_rate("NaN%"), None);
        assert_eq!(parse_win_rate("inf"), None);
        assert_eq!(parse_win_rate("-3%"), None);
        assert_eq!(parse_win_rate("140%"), None);
    }

    #[test]
    fn present_only_excludes_absences() {
        let records = [record(Some("40%")), record(None), record(Some("60%"))];
        let summary = WinRateSummary::from_records(&records, Averaging::PresentOnly);
        assert!((summary.mean - 50.0).abs() < 1e-9);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.requested, 3);
        assert_eq!(summary.absent(), 1);
    }

    #[test]
    fn requested_counts_absences_as_zero() {
        let records = [record(Some("40%")), record(None), record(Some("60%"))];
        let summary = WinRateSummary::from_records(&records, Averaging::Requested);
        assert!((summary.mean - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_samples_average_to_zero() {
        for averaging in [Averaging::PresentOnly, Averaging::Requested] {
            let summary = WinRateSummary::from_rates(&[], 0, averaging);
            assert!(summary.mean.abs() < f64::EPSILON);
        }
        let all_absent = [record(None), record(Some("error"))];
        let summary = WinRateSummary::from_records(&all_absent, Averaging::PresentOnly);
        assert!(summary.mean.abs() < f64::EPSILON);
        assert_eq!(summary.present, 0);
    }

    #[test]
    fn zero_percent_is_a_result_not_an_absence() {
        assert!(!record(Some("0.00%")).is_absent());
        assert!(record(None).is_absent());
    }
}
