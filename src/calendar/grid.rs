use super::cursor::MonthCursor;
use crate::datekey::{normalize, DayKey, LocalNow};
use crate::record::AppointmentRecord;
use std::collections::HashMap;
use std::iter::repeat_n;
use time::Weekday;

pub(crate) const DAYS_IN_WEEK: usize = 7;

/// Number of appointments listed in a day cell before the rest are collapsed
/// into a "+N more" count
pub(crate) const DEFAULT_CAP: usize = 3;

pub(super) trait WeekdayExt {
    fn index0(&self) -> usize;
}

impl WeekdayExt for Weekday {
    fn index0(&self) -> usize {
        self.number_days_from_sunday().into()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DayCell<'a> {
    /// Padding before the first of the month
    Blank,
    Day(Day<'a>),
}

impl<'a> DayCell<'a> {
    pub(crate) fn as_day(&self) -> Option<&Day<'a>> {
        match self {
            DayCell::Blank => None,
            DayCell::Day(day) => Some(day),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Day<'a> {
    pub(crate) number: u8,
    pub(crate) is_today: bool,
    /// Every appointment on this day, in input order
    pub(crate) records: Vec<&'a AppointmentRecord>,
    cap: usize,
}

impl<'a> Day<'a> {
    pub(crate) fn visible(&self) -> &[&'a AppointmentRecord] {
        &self.records[..self.records.len().min(self.cap)]
    }

    pub(crate) fn overflow(&self) -> usize {
        self.records.len().saturating_sub(self.cap)
    }

    pub(crate) fn is_overflowed(&self) -> bool {
        self.overflow() > 0
    }
}

/// The cells of one month, Sunday-first, with appointments bucketed onto
/// their days
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MonthGrid<'a> {
    cursor: MonthCursor,
    cells: Vec<DayCell<'a>>,
}

impl<'a> MonthGrid<'a> {
    pub(crate) fn build(
        cursor: MonthCursor,
        records: &'a [AppointmentRecord],
        now: LocalNow,
        cap: usize,
    ) -> MonthGrid<'a> {
        let mut buckets: HashMap<DayKey, Vec<&'a AppointmentRecord>> = HashMap::new();
        for r in records {
            if let Some(key) = normalize(r, now) {
                buckets.entry(key).or_default().push(r);
            }
        }
        let showing_today = cursor == MonthCursor::containing(now.today);
        let leading = cursor.first_day().weekday().index0();
        let mut cells = Vec::with_capacity(leading + 31);
        cells.extend(repeat_n(DayCell::Blank, leading));
        for date in cursor.days() {
            cells.push(DayCell::Day(Day {
                number: date.day(),
                is_today: showing_today && date == now.today,
                records: buckets
                    .remove(&DayKey::for_date(date))
                    .unwrap_or_default(),
                cap,
            }));
        }
        MonthGrid { cursor, cells }
    }

    pub(crate) fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub(crate) fn cells(&self) -> &[DayCell<'a>] {
        &self.cells
    }

    pub(crate) fn weeks(&self) -> impl Iterator<Item = &[DayCell<'a>]> + '_ {
        self.cells().chunks(DAYS_IN_WEEK)
    }

    /// The appointments a user can pick, in grid order.  Appointments hidden
    /// behind a "+N more" count are not among them.
    pub(crate) fn selectable(&self) -> impl Iterator<Item = &'a AppointmentRecord> + '_ {
        self.cells
            .iter()
            .filter_map(DayCell::as_day)
            .flat_map(|d| d.visible().iter().copied())
    }
}
