//! # Timepoint Labels
//!
//! Time dimensions carry ISO dates (`2016-03-01`) as category ids. This
//! module turns them into the labels shown to readers, depending on the
//! periodicity of the series.
//!
//! | Periodicity | `2016-03-01` |
//! |---|---|
//! | monthly | `Mar 2016` |
//! | quarterly | `Q1 2016` |
//! | yearly | `2016` |
//! | rolling_quarter | `Jan 2016-Mar 2016` |
//! | rolling_year | `Apr 2015-Mar 2016` |

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// How often a series is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Monthly,
    Quarterly,
    Yearly,
    /// Three-month window ending at the timepoint.
    RollingQuarter,
    /// Twelve-month window ending at the timepoint.
    RollingYear,
}

impl Periodicity {
    /// The lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::RollingQuarter => "rolling_quarter",
            Self::RollingYear => "rolling_year",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodicity {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "rolling_quarter" => Ok(Self::RollingQuarter),
            "rolling_year" => Ok(Self::RollingYear),
            other => Err(DatasetError::UnsupportedPolicy {
                kind: "periodicity",
                value: other.to_string(),
            }),
        }
    }
}

/// Label an ISO date (`YYYY-MM-DD`) for the given periodicity.
///
/// # Errors
///
/// [`DatasetError::InvalidTimepoint`] if `date` is not an ISO date.
pub fn timepoint_label(date: &str, periodicity: Periodicity) -> Result<String, DatasetError> {
    let timepoint = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        DatasetError::InvalidTimepoint {
            value: date.to_string(),
            reason: e.to_string(),
        }
    })?;

    let label = match periodicity {
        Periodicity::Monthly => month_label(timepoint),
        Periodicity::Quarterly => format!("Q{} {}", (timepoint.month() - 1) / 3 + 1, timepoint.year()),
        Periodicity::Yearly => timepoint.year().to_string(),
        Periodicity::RollingQuarter => window_label(date, timepoint, 2)?,
        Periodicity::RollingYear => window_label(date, timepoint, 11)?,
    };
    Ok(label)
}

fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

fn window_label(raw: &str, end: NaiveDate, months_back: u32) -> Result<String, DatasetError> {
    let start = end
        .checked_sub_months(Months::new(months_back))
        .ok_or_else(|| DatasetError::InvalidTimepoint {
            value: raw.to_string(),
            reason: format!("cannot step {months_back} months back"),
        })?;
    Ok(format!("{}-{}", month_label(start), month_label(end)))
}
