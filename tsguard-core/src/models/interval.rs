//! Interval time configuration used for detection intervals and window delays.
//!
//! An interval is a magnitude plus a time unit. Only units on the supported
//! allow-list can be used; the sign of the magnitude is checked separately
//! by the configuration validator because detection intervals and window
//! delays have different sign requirements.

use crate::{Result, error::TsGuardError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Time units, named the way detector documents spell them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Nanoseconds
    Nanos,
    /// Microseconds
    Micros,
    /// Milliseconds
    Millis,
    /// Seconds
    Seconds,
    /// Minutes, the only unit accepted for detector intervals
    Minutes,
    /// Hours
    Hours,
    /// Twelve hours
    HalfDays,
    /// Days
    Days,
    /// Weeks
    Weeks,
    /// Months
    Months,
    /// Years
    Years,
    /// Decades
    Decades,
    /// Centuries
    Centuries,
    /// Millennia
    Millennia,
    /// A billion years
    Eras,
    /// Unbounded duration
    Forever,
}

/// Units an interval may be expressed in.
pub const SUPPORTED_UNITS: &[TimeUnit] = &[TimeUnit::Minutes];

impl TimeUnit {
    /// Returns the unit name as it appears in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Nanos => "Nanos",
            TimeUnit::Micros => "Micros",
            TimeUnit::Millis => "Millis",
            TimeUnit::Seconds => "Seconds",
            TimeUnit::Minutes => "Minutes",
            TimeUnit::Hours => "Hours",
            TimeUnit::HalfDays => "HalfDays",
            TimeUnit::Days => "Days",
            TimeUnit::Weeks => "Weeks",
            TimeUnit::Months => "Months",
            TimeUnit::Years => "Years",
            TimeUnit::Decades => "Decades",
            TimeUnit::Centuries => "Centuries",
            TimeUnit::Millennia => "Millennia",
            TimeUnit::Eras => "Eras",
            TimeUnit::Forever => "Forever",
        }
    }

    /// Whether intervals may be expressed in this unit.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_UNITS.contains(self)
    }

    /// Length of one unit in milliseconds, `None` for sub-millisecond units
    /// and for units too long to express (`Eras`, `Forever`).
    ///
    /// Month and longer units use the estimated durations of the ISO calendar
    /// (a month is 31556952 / 12 seconds).
    fn millis(&self) -> Option<i64> {
        const YEAR_MS: i64 = 31_556_952_000;
        match self {
            TimeUnit::Nanos | TimeUnit::Micros | TimeUnit::Eras | TimeUnit::Forever => None,
            TimeUnit::Millis => Some(1),
            TimeUnit::Seconds => Some(1_000),
            TimeUnit::Minutes => Some(60_000),
            TimeUnit::Hours => Some(3_600_000),
            TimeUnit::HalfDays => Some(43_200_000),
            TimeUnit::Days => Some(86_400_000),
            TimeUnit::Weeks => Some(604_800_000),
            TimeUnit::Months => Some(YEAR_MS / 12),
            TimeUnit::Years => Some(YEAR_MS),
            TimeUnit::Decades => Some(YEAR_MS * 10),
            TimeUnit::Centuries => Some(YEAR_MS * 100),
            TimeUnit::Millennia => Some(YEAR_MS * 1_000),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = TsGuardError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s {
            "Nanos" => TimeUnit::Nanos,
            "Micros" => TimeUnit::Micros,
            "Millis" => TimeUnit::Millis,
            "Seconds" => TimeUnit::Seconds,
            "Minutes" => TimeUnit::Minutes,
            "Hours" => TimeUnit::Hours,
            "HalfDays" => TimeUnit::HalfDays,
            "Days" => TimeUnit::Days,
            "Weeks" => TimeUnit::Weeks,
            "Months" => TimeUnit::Months,
            "Years" => TimeUnit::Years,
            "Decades" => TimeUnit::Decades,
            "Centuries" => TimeUnit::Centuries,
            "Millennia" => TimeUnit::Millennia,
            "Eras" => TimeUnit::Eras,
            "Forever" => TimeUnit::Forever,
            other => return Err(TsGuardError::invalid_time_unit(other)),
        };
        Ok(unit)
    }
}

/// A validated interval: a magnitude in a supported unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalTimeConfiguration {
    interval: i64,
    unit: TimeUnit,
}

impl IntervalTimeConfiguration {
    /// Creates an interval.
    ///
    /// # Errors
    /// Returns `TsGuardError::InvalidTimeUnit` when `unit` is not on the
    /// supported allow-list.
    pub fn new(interval: i64, unit: TimeUnit) -> Result<Self> {
        if !unit.is_supported() {
            return Err(TsGuardError::invalid_time_unit(unit));
        }
        Ok(Self { interval, unit })
    }

    /// Creates an interval from a unit name such as `"Minutes"`.
    ///
    /// # Errors
    /// Returns `TsGuardError::InvalidTimeUnit` naming the unit when it is
    /// unknown or not supported.
    pub fn parse(interval: i64, unit: &str) -> Result<Self> {
        Self::new(interval, unit.parse()?)
    }

    /// Creates an interval of `minutes` minutes.
    pub fn minutes(minutes: i64) -> Self {
        Self {
            interval: minutes,
            unit: TimeUnit::Minutes,
        }
    }

    /// Returns the magnitude.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Returns the unit.
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Interval length in milliseconds, saturating at the `i64` range.
    pub fn to_millis(&self) -> i64 {
        match (self.unit, self.unit.millis()) {
            (_, Some(unit_ms)) => self.interval.saturating_mul(unit_ms),
            (TimeUnit::Nanos, None) => self.interval / 1_000_000,
            (TimeUnit::Micros, None) => self.interval / 1_000,
            (_, None) => self.interval.saturating_mul(i64::MAX),
        }
    }

    /// Interval length in whole minutes (truncated).
    pub fn to_minutes(&self) -> i64 {
        if self.unit == TimeUnit::Minutes {
            return self.interval;
        }
        self.to_millis() / 60_000
    }
}

impl std::fmt::Display for IntervalTimeConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.interval, self.unit)
    }
}
