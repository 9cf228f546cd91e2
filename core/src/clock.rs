//! Reference-date sources.
//!
//! RULE: the engine never reads the wall clock. Jobs ask a `Clock` for
//! "today" once and pass that date explicitly into every engine call.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

pub trait Clock {
    /// The reference date for classification arithmetic.
    fn today(&self) -> NaiveDate;

    /// Timestamp used for call records and upload history.
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone. Used by the runner binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A frozen clock. Tests and replays use this so results never depend
/// on the day they happen to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl FixedClock {
    pub fn at(date: NaiveDate) -> Self {
        Self { date, time: NaiveTime::default() }
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.time = time;
        self
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn now(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let clock = FixedClock::at(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().date(), date);
        assert_eq!(clock.today(), clock.today());
    }
}
