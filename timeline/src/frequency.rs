//! Sampling frequency inference

use crate::date::{normalize, CanonicalTimestamp, RawDateValue};
use crate::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Number of leading sorted dates used to measure the sampling gap
const GAP_SAMPLE_SIZE: usize = 5;

/// How often a series is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencyKind {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Default for FrequencyKind {
    fn default() -> Self {
        FrequencyKind::Monthly
    }
}

impl FrequencyKind {
    /// Seasonal cycle length used by seasonal model families
    pub fn period_length(self) -> usize {
        match self {
            FrequencyKind::Daily => 7,
            FrequencyKind::Weekly => 52,
            FrequencyKind::Monthly => 12,
            FrequencyKind::Quarterly => 4,
            FrequencyKind::Yearly => 1,
        }
    }

    /// Human label shown next to the series
    pub fn label(self) -> &'static str {
        match self {
            FrequencyKind::Daily => "Diária",
            FrequencyKind::Weekly => "Semanal",
            FrequencyKind::Monthly => "Mensal",
            FrequencyKind::Quarterly => "Trimestral",
            FrequencyKind::Yearly => "Anual",
        }
    }

    /// Classify an average gap between observations, in days
    pub fn from_average_gap(days: f64) -> Self {
        if days <= 2.0 {
            FrequencyKind::Daily
        } else if days <= 10.0 {
            FrequencyKind::Weekly
        } else if days <= 40.0 {
            FrequencyKind::Monthly
        } else if days <= 120.0 {
            FrequencyKind::Quarterly
        } else {
            FrequencyKind::Yearly
        }
    }

    fn english_name(self) -> &'static str {
        match self {
            FrequencyKind::Daily => "daily",
            FrequencyKind::Weekly => "weekly",
            FrequencyKind::Monthly => "monthly",
            FrequencyKind::Quarterly => "quarterly",
            FrequencyKind::Yearly => "yearly",
        }
    }

    const ALL: [FrequencyKind; 5] = [
        FrequencyKind::Daily,
        FrequencyKind::Weekly,
        FrequencyKind::Monthly,
        FrequencyKind::Quarterly,
        FrequencyKind::Yearly,
    ];
}

impl fmt::Display for FrequencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrequencyKind {
    type Err = TimelineError;

    /// Accepts the human label (`"Mensal"`) or the English name (`"monthly"`)
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        FrequencyKind::ALL
            .into_iter()
            .find(|kind| kind.label().to_lowercase() == wanted || kind.english_name() == wanted)
            .ok_or_else(|| TimelineError::InvalidParameter(format!("Unknown frequency: {}", s)))
    }
}

/// Frequency of a series, derived once per series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyProfile {
    pub kind: FrequencyKind,
    pub period_length: usize,
    pub label: String,
}

impl FrequencyProfile {
    pub fn new(kind: FrequencyKind) -> Self {
        Self {
            kind,
            period_length: kind.period_length(),
            label: kind.label().to_string(),
        }
    }
}

impl Default for FrequencyProfile {
    fn default() -> Self {
        Self::new(FrequencyKind::default())
    }
}

impl From<FrequencyKind> for FrequencyProfile {
    fn from(kind: FrequencyKind) -> Self {
        Self::new(kind)
    }
}

impl FromStr for FrequencyProfile {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<FrequencyKind>().map(FrequencyProfile::new)
    }
}

/// Outcome of frequency inference over a column of raw dates
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReport {
    pub profile: FrequencyProfile,
    /// Latest distinct date, if any row could be parsed
    pub last_date: Option<CanonicalTimestamp>,
    /// Distinct dates, ascending
    pub distinct_dates: usize,
    /// Indices of rows whose date could not be parsed
    pub excluded_rows: Vec<usize>,
}

/// Infer the sampling frequency of a column of raw dates
pub fn infer(raw_dates: &[RawDateValue]) -> FrequencyProfile {
    infer_detailed(raw_dates).profile
}

/// Infer the sampling frequency, reporting excluded rows and the last date
///
/// Unparseable rows are logged and left out. With fewer than two distinct
/// dates the profile defaults to monthly.
pub fn infer_detailed(raw_dates: &[RawDateValue]) -> InferenceReport {
    let mut excluded_rows = Vec::new();
    let mut timeline: Vec<CanonicalTimestamp> = Vec::with_capacity(raw_dates.len());

    for (index, raw) in raw_dates.iter().enumerate() {
        match normalize(raw) {
            Ok(ts) => timeline.push(ts),
            Err(err) => {
                warn!(row = index, error = %err, "Excluding row from frequency inference");
                excluded_rows.push(index);
            }
        }
    }

    timeline.sort();
    timeline.dedup_by_key(|ts| ts.epoch_millis());

    let kind = if timeline.len() < 2 {
        debug!(
            distinct = timeline.len(),
            "Too few distinct dates, assuming monthly frequency"
        );
        FrequencyKind::default()
    } else {
        let sample = &timeline[..timeline.len().min(GAP_SAMPLE_SIZE)];
        let gaps: Vec<f64> = sample
            .windows(2)
            .map(|w| (w[1].epoch_millis() - w[0].epoch_millis()) as f64 / MILLIS_PER_DAY)
            .collect();
        let average_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
        let kind = FrequencyKind::from_average_gap(average_gap);
        debug!(average_gap, frequency = %kind, "Inferred sampling frequency");
        kind
    };

    InferenceReport {
        profile: FrequencyProfile::new(kind),
        distinct_dates: timeline.len(),
        last_date: timeline.pop(),
        excluded_rows,
    }
}
