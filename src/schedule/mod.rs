// dbbackup/src/schedule/mod.rs
//! Recurring backups: a fixed interval or a fixed local time each day.

pub(crate) mod logic;

use chrono::NaiveTime;
use std::fmt;
use std::time::Duration;

use crate::errors::{BackupError, Result};
use crate::utils::duration::{parse_daily_time, parse_duration};

pub use logic::run_schedule;

/// When scheduled runs happen. Exactly one mode applies per schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run, then sleep this long, forever.
    Every(Duration),
    /// Sleep until the next occurrence of this local time, then run.
    DailyAt(NaiveTime),
}

impl Schedule {
    /// Builds a schedule from the `--every` / `--daily` arguments. Blank
    /// values count as absent.
    pub fn from_args(every: Option<&str>, daily: Option<&str>) -> Result<Self> {
        let every = every.filter(|s| !s.trim().is_empty());
        let daily = daily.filter(|s| !s.trim().is_empty());

        match (every, daily) {
            (Some(_), Some(_)) => Err(BackupError::Config(
                "specify only one of --every or --daily".to_string(),
            )),
            (None, None) => Err(BackupError::Config(
                "either --every or --daily is required".to_string(),
            )),
            (Some(every), None) => Ok(Schedule::Every(parse_duration(every)?)),
            (None, Some(daily)) => Ok(Schedule::DailyAt(parse_daily_time(daily)?)),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Every(interval) => write!(f, "every {interval:?}"),
            Schedule::DailyAt(at) => write!(f, "daily at {}", at.format("%H:%M")),
        }
    }
}
