use std::fmt;
use std::iter::successors;
use std::str::FromStr;
use thiserror::Error;
use time::{format_description::FormatItem, macros::format_description, Date, Month};

static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// The month the calendar is showing, stored as the first day of that month
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct MonthCursor(Date);

impl MonthCursor {
    pub(crate) fn new(year: i32, month: Month) -> Option<MonthCursor> {
        Date::from_calendar_date(year, month, 1).ok().map(MonthCursor)
    }

    pub(crate) fn containing(date: Date) -> MonthCursor {
        MonthCursor(
            date.replace_day(1)
                .expect("every month should have a first day"),
        )
    }

    pub(crate) fn year(self) -> i32 {
        self.0.year()
    }

    pub(crate) fn month(self) -> Month {
        self.0.month()
    }

    pub(crate) fn first_day(self) -> Date {
        self.0
    }

    /// Every date in the month, in order
    pub(crate) fn days(self) -> impl Iterator<Item = Date> {
        let month = self.0.month();
        successors(Some(self.0), |&d| d.next_day()).take_while(move |d| d.month() == month)
    }

    pub(crate) fn previous(self) -> Result<MonthCursor, OutOfTimeError> {
        self.0
            .previous_day()
            .map(MonthCursor::containing)
            .ok_or(OutOfTimeError)
    }

    pub(crate) fn next(self) -> Result<MonthCursor, OutOfTimeError> {
        self.days()
            .last()
            .and_then(Date::next_day)
            .map(MonthCursor::containing)
            .ok_or(OutOfTimeError)
    }
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month(), self.year())
    }
}

/// Parses `YYYY-MM`
impl FromStr for MonthCursor {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<MonthCursor, ParseMonthError> {
        Date::parse(&format!("{s}-01"), &YMD_FMT)
            .map(MonthCursor)
            .map_err(|_| ParseMonthError(s.to_owned()))
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid month {0:?}; expected YYYY-MM")]
pub(crate) struct ParseMonthError(String);

#[derive(Copy, Clone, Debug, Eq, Error, PartialEq)]
#[error("reached the end of time")]
pub(crate) struct OutOfTimeError;
