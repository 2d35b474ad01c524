//! Sprint calendar.
//!
//! A planning horizon (Program Increment) is a run of equal-length sprints
//! starting at a fixed date. Sprints are totally ordered by index `0..count`.
//!
//! # Time Model
//! Dates are calendar days. Sprint `i` covers the closed range
//! `[start + i*len, start + (i+1)*len - 1]`.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One sprint of the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    /// Position in the calendar.
    pub index: usize,
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl Sprint {
    /// Display name, 1-based.
    pub fn name(&self) -> String {
        format!("Sprint {}", self.index + 1)
    }

    /// Whether a date falls within this sprint.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Fixed-length sprint sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintCalendar {
    /// First day of sprint 0.
    pub start: NaiveDate,
    /// Sprint length in days.
    pub length_days: u32,
    /// Number of sprints.
    pub count: usize,
}

impl SprintCalendar {
    /// Creates a calendar of `count` sprints of `length_days` each.
    pub fn new(start: NaiveDate, length_days: u32, count: usize) -> Self {
        Self {
            start,
            length_days,
            count,
        }
    }

    /// Returns sprint `index`, if inside the calendar.
    pub fn sprint(&self, index: usize) -> Option<Sprint> {
        if index >= self.count {
            return None;
        }
        let len = i64::from(self.length_days);
        let start = self.start + Duration::days(index as i64 * len);
        let end = start + Duration::days((len - 1).max(0));
        Some(Sprint { index, start, end })
    }

    /// All sprints in order.
    pub fn sprints(&self) -> Vec<Sprint> {
        (0..self.count).filter_map(|i| self.sprint(i)).collect()
    }

    /// Last day of sprint `index`.
    pub fn sprint_end(&self, index: usize) -> Option<NaiveDate> {
        self.sprint(index).map(|s| s.end)
    }

    /// Last day of the whole calendar.
    pub fn end(&self) -> Option<NaiveDate> {
        self.count.checked_sub(1).and_then(|last| self.sprint_end(last))
    }

    /// Index of the sprint containing `date`, if any.
    pub fn sprint_of_date(&self, date: NaiveDate) -> Option<usize> {
        if date < self.start || self.length_days == 0 {
            return None;
        }
        let offset = (date - self.start).num_days() / i64::from(self.length_days);
        let index = usize::try_from(offset).ok()?;
        (index < self.count).then_some(index)
    }

    /// How many sprint lengths `late` is after `target`, rounded up.
    ///
    /// Zero when `late` is on or before `target`.
    pub fn sprints_late(&self, target: NaiveDate, late: NaiveDate) -> usize {
        let days = (late - target).num_days();
        if days <= 0 || self.length_days == 0 {
            return 0;
        }
        let len = i64::from(self.length_days);
        ((days + len - 1) / len) as usize
    }
}
