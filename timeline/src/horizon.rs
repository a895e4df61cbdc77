//! Forecast horizon generation
//!
//! Enumerates the periods that follow the last observation of a series,
//! at the series' own frequency. Monthly, quarterly and yearly periods are
//! anchored to the start of the calendar period; daily and weekly periods
//! step from the last observed day.

use crate::date::{normalize, RawDateValue};
use crate::frequency::{FrequencyKind, FrequencyProfile};
use crate::{Result, TimelineError};
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// One selectable forecast start point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonCandidate {
    /// Machine key (`MM/YYYY` for monthly periods)
    pub key: String,
    /// Human label (`Março de 2025` for monthly periods)
    pub label: String,
    /// Number of periods after the last observation
    pub offset_from_last: u32,
    /// First calendar day of the period
    pub starts_on: NaiveDate,
}

/// Maximum number of candidates enumerated per call, by frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonLimits {
    #[serde(default = "default_daily")]
    pub daily: usize,
    #[serde(default = "default_weekly")]
    pub weekly: usize,
    #[serde(default = "default_monthly")]
    pub monthly: usize,
    #[serde(default = "default_quarterly")]
    pub quarterly: usize,
    #[serde(default = "default_yearly")]
    pub yearly: usize,
}

impl Default for HorizonLimits {
    fn default() -> Self {
        Self {
            daily: default_daily(),
            weekly: default_weekly(),
            monthly: default_monthly(),
            quarterly: default_quarterly(),
            yearly: default_yearly(),
        }
    }
}

impl HorizonLimits {
    pub fn limit_for(&self, kind: FrequencyKind) -> usize {
        match kind {
            FrequencyKind::Daily => self.daily,
            FrequencyKind::Weekly => self.weekly,
            FrequencyKind::Monthly => self.monthly,
            FrequencyKind::Quarterly => self.quarterly,
            FrequencyKind::Yearly => self.yearly,
        }
    }
}

fn default_daily() -> usize {
    30
}
fn default_weekly() -> usize {
    52
}
fn default_monthly() -> usize {
    12
}
fn default_quarterly() -> usize {
    8
}
fn default_yearly() -> usize {
    10
}

/// Generates forecast start candidates and period labels
#[derive(Debug, Clone, Default)]
pub struct HorizonGenerator {
    limits: HorizonLimits,
}

impl HorizonGenerator {
    pub fn new(limits: HorizonLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &HorizonLimits {
        &self.limits
    }

    /// Enumerate up to `count` successive periods after `last_date`
    ///
    /// `count` is capped by the limit configured for the profile's
    /// frequency. Candidates are strictly increasing and never fall on
    /// `last_date` itself.
    pub fn candidates(
        &self,
        profile: &FrequencyProfile,
        last_date: &RawDateValue,
        count: usize,
    ) -> Result<Vec<HorizonCandidate>> {
        if count == 0 {
            return Err(TimelineError::InvalidParameter(
                "Candidate count must be greater than zero".to_string(),
            ));
        }
        let last = normalize(last_date)?.date();
        let count = count.min(self.limits.limit_for(profile.kind));

        (1..=count as u32)
            .map(|offset| candidate_at(profile.kind, last, offset))
            .collect()
    }

    /// Human label of the period `offset` steps after `last_date`
    pub fn label_for(
        &self,
        profile: &FrequencyProfile,
        last_date: &RawDateValue,
        offset: u32,
    ) -> Result<String> {
        Ok(self.candidate(profile, last_date, offset)?.label)
    }

    /// The period `offset` (≥ 1) steps after `last_date`, without any limit
    pub fn candidate(
        &self,
        profile: &FrequencyProfile,
        last_date: &RawDateValue,
        offset: u32,
    ) -> Result<HorizonCandidate> {
        let last = normalize(last_date)?.date();
        candidate_at(profile.kind, last, offset)
    }

    /// `length` consecutive periods beginning `start_offset` steps after `last_date`
    pub fn periods(
        &self,
        profile: &FrequencyProfile,
        last_date: &RawDateValue,
        start_offset: u32,
        length: usize,
    ) -> Result<Vec<HorizonCandidate>> {
        let last = normalize(last_date)?.date();
        let length = u32::try_from(length).map_err(|_| {
            TimelineError::InvalidParameter(format!("Horizon length {} is too large", length))
        })?;
        (0..length)
            .map(|step| {
                let offset = start_offset.checked_add(step).ok_or_else(|| {
                    TimelineError::InvalidParameter("Horizon offset overflow".to_string())
                })?;
                candidate_at(profile.kind, last, offset)
            })
            .collect()
    }
}

fn candidate_at(kind: FrequencyKind, last: NaiveDate, offset: u32) -> Result<HorizonCandidate> {
    if offset == 0 {
        return Err(TimelineError::InvalidParameter(
            "Period offset must be greater than zero".to_string(),
        ));
    }
    let starts_on = period_start(kind, last, offset).ok_or_else(|| {
        TimelineError::InvalidParameter(format!(
            "Period {} after {} is outside the supported calendar",
            offset, last
        ))
    })?;

    let (key, label) = match kind {
        FrequencyKind::Daily => (
            starts_on.format("%Y-%m-%d").to_string(),
            starts_on.format("%d/%m/%Y").to_string(),
        ),
        FrequencyKind::Weekly => (
            starts_on.format("%Y-%m-%d").to_string(),
            format!("Semana de {}", starts_on.format("%d/%m/%Y")),
        ),
        FrequencyKind::Monthly => (
            starts_on.format("%m/%Y").to_string(),
            format!("{} de {}", month_name(starts_on.month()), starts_on.year()),
        ),
        FrequencyKind::Quarterly => (
            starts_on.format("%m/%Y").to_string(),
            format!(
                "{}º trimestre de {}",
                (starts_on.month() - 1) / 3 + 1,
                starts_on.year()
            ),
        ),
        FrequencyKind::Yearly => {
            let year = starts_on.year().to_string();
            (year.clone(), year)
        }
    };

    Ok(HorizonCandidate {
        key,
        label,
        offset_from_last: offset,
        starts_on,
    })
}

fn period_start(kind: FrequencyKind, last: NaiveDate, offset: u32) -> Option<NaiveDate> {
    match kind {
        FrequencyKind::Daily => last.checked_add_signed(Duration::days(offset as i64)),
        FrequencyKind::Weekly => last.checked_add_signed(Duration::weeks(offset as i64)),
        FrequencyKind::Monthly => {
            last.with_day(1)?.checked_add_months(Months::new(offset))
        }
        FrequencyKind::Quarterly => {
            let first_month = (last.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(last.year(), first_month, 1)?
                .checked_add_months(Months::new(offset.checked_mul(3)?))
        }
        FrequencyKind::Yearly => {
            let year = last.year().checked_add(i32::try_from(offset).ok()?)?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
    }
}

/// Portuguese name of a month (1-based)
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[((month.clamp(1, 12)) - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_start_per_frequency() {
        let last = day(2024, 2, 28);
        assert_eq!(period_start(FrequencyKind::Daily, last, 1), Some(day(2024, 2, 29)));
        assert_eq!(period_start(FrequencyKind::Weekly, last, 1), Some(day(2024, 3, 6)));
        assert_eq!(period_start(FrequencyKind::Monthly, last, 11), Some(day(2025, 1, 1)));
        assert_eq!(period_start(FrequencyKind::Quarterly, last, 1), Some(day(2024, 4, 1)));
        assert_eq!(period_start(FrequencyKind::Yearly, last, 2), Some(day(2026, 1, 1)));
    }

    #[test]
    fn test_quarter_labels() {
        let c = candidate_at(FrequencyKind::Quarterly, day(2024, 11, 15), 1).unwrap();
        assert_eq!(c.key, "01/2025");
        assert_eq!(c.label, "1º trimestre de 2025");
    }

    #[test]
    fn test_zero_count_is_rejected() {
        let generator = HorizonGenerator::default();
        let profile = FrequencyProfile::new(FrequencyKind::Daily);
        assert!(generator
            .candidates(&profile, &"2024-01-01".into(), 0)
            .is_err());
    }

    #[test]
    fn test_zero_offset_is_rejected() {
        let generator = HorizonGenerator::default();
        let profile = FrequencyProfile::new(FrequencyKind::Monthly);
        let last: RawDateValue = "2024-06-15".into();
        assert!(matches!(
            generator.candidate(&profile, &last, 0),
            Err(TimelineError::InvalidParameter(_))
        ));
        assert!(generator.label_for(&profile, &last, 0).is_err());
        assert!(generator.periods(&profile, &last, 0, 3).is_err());
        assert_eq!(generator.label_for(&profile, &last, 1).unwrap(), "Julho de 2024");
    }

    #[test]
    fn test_oversized_length_is_rejected() {
        let generator = HorizonGenerator::default();
        let profile = FrequencyProfile::new(FrequencyKind::Daily);
        let length = u32::MAX as usize + 3;
        assert!(matches!(
            generator.periods(&profile, &"2024-01-01".into(), 1, length),
            Err(TimelineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_month_name_bounds() {
        assert_eq!(month_name(1), "Janeiro");
        assert_eq!(month_name(12), "Dezembro");
    }
}
