//! Collection calendar: the fiscal periods payments are scheduled against.
//!
//! Periods are kept sorted by `(calendar_year, calendar_month)`. The calendar
//! tracks which period is "active" (the one currently being collected) but does
//! not enforce that exactly one period is active at a time.
//!
//! # Activation
//!
//! - [`CollectionCalendar::activate_period`] with `active = true` makes the named
//!   period the only active one.
//! - With `active = false` it clears the named period and nothing else, so the
//!   calendar can end up with no active period at all. Callers pair the two
//!   calls when moving from one period to the next.
//! - An unknown `(year, period_number)` is ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// A single fiscal collection period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPeriod {
    /// Period number within the academic year (R01..R12)
    pub period_number: u8,
    /// Calendar month the period covers (1-12)
    pub calendar_month: u8,
    /// Calendar year the period covers
    pub calendar_year: i16,
    /// Academic year the period belongs to (e.g. 2021 for AY 2020/21)
    pub academic_year: i16,
    /// First date payments can be scheduled into this period
    pub open_date: NaiveDate,
    /// Date the period's collection completed, once it has
    pub completed_date: Option<NaiveDate>,
    /// Whether this is the period currently being collected
    pub active: bool,
}

impl CollectionPeriod {
    /// Creates a new, inactive, not yet completed period.
    #[must_use]
    pub const fn new(
        period_number: u8,
        calendar_month: u8,
        calendar_year: i16,
        academic_year: i16,
        open_date: NaiveDate,
    ) -> Self {
        Self {
            period_number,
            calendar_month,
            calendar_year,
            academic_year,
            open_date,
            completed_date: None,
            active: false,
        }
    }

    /// Marks the period active.
    #[must_use]
    pub const fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    /// Sets the completion date.
    #[must_use]
    pub const fn completed_on(mut self, date: NaiveDate) -> Self {
        self.completed_date = Some(date);
        self
    }

    const fn ordering_key(&self) -> (i16, u8) {
        (self.calendar_year, self.calendar_month)
    }

    fn is(&self, calendar_year: i16, period_number: u8) -> bool {
        self.calendar_year == calendar_year && self.period_number == period_number
    }
}

/// Ordered, non-empty set of collection periods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCalendar {
    periods: Vec<CollectionPeriod>,
}

impl CollectionCalendar {
    /// Builds a calendar from an unordered list of periods.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidCalendar`] if the list is empty or two periods
    /// share the same `(period_number, calendar_year)`.
    pub fn new(mut periods: Vec<CollectionPeriod>) -> Result<Self> {
        if periods.is_empty() {
            return Err(DomainError::InvalidCalendar(
                "a calendar needs at least one period".to_string(),
            ));
        }

        periods.sort_by_key(CollectionPeriod::ordering_key);

        for (index, period) in periods.iter().enumerate() {
            if periods[index + 1..]
                .iter()
                .any(|other| other.is(period.calendar_year, period.period_number))
            {
                return Err(DomainError::InvalidCalendar(format!(
                    "period {} of {} appears more than once",
                    period.period_number, period.calendar_year
                )));
            }
        }

        Ok(Self { periods })
    }

    /// Exact lookup by calendar year and period number.
    #[must_use]
    pub fn get_period(&self, calendar_year: i16, period_number: u8) -> Option<&CollectionPeriod> {
        self.periods
            .iter()
            .find(|p| p.is(calendar_year, period_number))
    }

    /// The period currently flagged active.
    ///
    /// If more than one period is flagged, the chronologically first is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NoActivePeriod`] when no period is active.
    pub fn get_active_period(&self) -> Result<&CollectionPeriod> {
        self.periods
            .iter()
            .find(|p| p.active)
            .ok_or(DomainError::NoActivePeriod)
    }

    /// The period a payment due on `date` is collected in: the one with the
    /// latest open date on or before `date`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::PeriodNotFound`] when every period opens after `date`.
    pub fn get_period_for_date(&self, date: NaiveDate) -> Result<&CollectionPeriod> {
        self.periods
            .iter()
            .filter(|p| p.open_date <= date)
            .max_by_key(|p| p.open_date)
            .ok_or(DomainError::PeriodNotFound { date })
    }

    /// The chronologically following period.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NoSuchPeriod`] at the end of the known sequence, or if
    /// `period` is not part of this calendar.
    pub fn get_next_period(&self, period: &CollectionPeriod) -> Result<&CollectionPeriod> {
        let no_such_period = || DomainError::NoSuchPeriod {
            calendar_year: period.calendar_year,
            period_number: period.period_number,
        };

        let index = self
            .periods
            .iter()
            .position(|p| p.is(period.calendar_year, period.period_number))
            .ok_or_else(no_such_period)?;

        self.periods.get(index + 1).ok_or_else(no_such_period)
    }

    /// Sets the named period's active flag.
    ///
    /// Activating clears every other period's flag; deactivating touches only the
    /// named period. Silently does nothing when no period matches.
    pub fn activate_period(&mut self, calendar_year: i16, period_number: u8, active: bool) {
        if self.get_period(calendar_year, period_number).is_none() {
            return;
        }

        for period in &mut self.periods {
            if period.is(calendar_year, period_number) {
                period.active = active;
            } else if active {
                period.active = false;
            }
        }
    }

    /// All periods in chronological order.
    pub fn all_periods(&self) -> impl Iterator<Item = &CollectionPeriod> + '_ {
        self.periods.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> CollectionCalendar {
        CollectionCalendar::new(vec![
            CollectionPeriod::new(3, 10, 2020, 2021, date(2020, 10, 5)),
            CollectionPeriod::new(1, 8, 2020, 2021, date(2020, 8, 5)).activated(),
            CollectionPeriod::new(2, 9, 2020, 2021, date(2020, 9, 5)),
        ])
        .unwrap()
    }

    fn active_numbers(calendar: &CollectionCalendar) -> Vec<u8> {
        calendar
            .all_periods()
            .filter(|p| p.active)
            .map(|p| p.period_number)
            .collect()
    }

    #[test]
    fn periods_are_ordered_by_calendar_month() {
        let numbers: Vec<u8> = calendar().all_periods().map(|p| p.period_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn empty_and_duplicate_calendars_are_rejected() {
        assert!(matches!(
            CollectionCalendar::new(vec![]),
            Err(DomainError::InvalidCalendar(_))
        ));
        assert!(matches!(
            CollectionCalendar::new(vec![
                CollectionPeriod::new(1, 8, 2020, 2021, date(2020, 8, 5)),
                CollectionPeriod::new(1, 8, 2020, 2021, date(2020, 8, 6)),
            ]),
            Err(DomainError::InvalidCalendar(_))
        ));
    }

    #[test]
    fn the_initial_period_is_active() {
        let calendar = calendar();
        assert!(calendar.get_period(2020, 1).unwrap().active);
        assert_eq!(calendar.get_active_period().unwrap().period_number, 1);
    }

    #[test]
    fn activating_a_period_makes_it_the_only_active_one() {
        let mut calendar = calendar();
        calendar.activate_period(2020, 2, true);
        assert_eq!(active_numbers(&calendar), vec![2]);
    }

    #[test]
    fn unknown_period_leaves_the_calendar_untouched() {
        let mut calendar = calendar();
        calendar.activate_period(2020, 4, true);
        assert_eq!(active_numbers(&calendar), vec![1]);
    }

    #[test]
    fn deactivating_the_active_period_leaves_no_active_period() {
        let mut calendar = calendar();
        calendar.activate_period(2020, 1, false);
        assert!(active_numbers(&calendar).is_empty());
        assert_eq!(
            calendar.get_active_period(),
            Err(DomainError::NoActivePeriod)
        );
    }

    #[test]
    fn deactivating_one_period_does_not_activate_or_deactivate_others() {
        let mut calendar = calendar();
        calendar.activate_period(2020, 2, false);
        assert_eq!(active_numbers(&calendar), vec![1]);
    }

    #[test]
    fn due_dates_resolve_to_the_latest_period_already_open() {
        let calendar = calendar();
        assert_eq!(
            calendar.get_period_for_date(date(2020, 9, 5)).unwrap().period_number,
            2
        );
        assert_eq!(
            calendar.get_period_for_date(date(2020, 9, 4)).unwrap().period_number,
            1
        );
        assert_eq!(
            calendar.get_period_for_date(date(2021, 6, 1)).unwrap().period_number,
            3
        );
        assert_eq!(
            calendar.get_period_for_date(date(2020, 8, 4)),
            Err(DomainError::PeriodNotFound {
                date: date(2020, 8, 4)
            })
        );
    }

    #[test]
    fn next_period_follows_chronological_order() {
        let calendar = calendar();
        let first = calendar.get_period(2020, 1).unwrap().clone();
        let second = calendar.get_next_period(&first).unwrap().clone();
        assert_eq!(second.period_number, 2);

        let last = calendar.get_period(2020, 3).unwrap();
        assert_eq!(
            calendar.get_next_period(last),
            Err(DomainError::NoSuchPeriod {
                calendar_year: 2020,
                period_number: 3
            })
        );
    }
}
