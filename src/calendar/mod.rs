mod cursor;
mod grid;
mod widget;
pub(crate) use self::cursor::{MonthCursor, OutOfTimeError};
pub(crate) use self::grid::{MonthGrid, DEFAULT_CAP};
pub(crate) use self::widget::Calendar;
use crate::datekey::LocalNow;
use crate::record::AppointmentRecord;

/// View state of the calendar: which month is shown, which appointment has
/// keyboard focus, and which (if any) is open in the detail view.  The
/// appointments themselves are borrowed and never modified.
#[derive(Clone, Debug)]
pub(crate) struct CalendarView<'a> {
    records: &'a [AppointmentRecord],
    now: LocalNow,
    cursor: MonthCursor,
    cap: usize,
    read_only: bool,
    /// Index into the month's selectable appointments
    focus: usize,
    selected: Option<&'a AppointmentRecord>,
}

impl<'a> CalendarView<'a> {
    pub(crate) fn new(records: &'a [AppointmentRecord], now: LocalNow, cap: usize) -> Self {
        CalendarView {
            records,
            now,
            cursor: MonthCursor::containing(now.today),
            cap,
            read_only: false,
            focus: 0,
            selected: None,
        }
    }

    /// Calendar data is never written back either way; this only records
    /// that the host asked for a read-only calendar.
    pub(crate) fn read_only(mut self, flag: bool) -> Self {
        self.read_only = flag;
        self
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn now(&self) -> LocalNow {
        self.now
    }

    pub(crate) fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub(crate) fn cap(&self) -> usize {
        self.cap
    }

    pub(crate) fn grid(&self) -> MonthGrid<'a> {
        MonthGrid::build(self.cursor, self.records, self.now, self.cap)
    }

    /// Index into `grid().selectable()` of the focused appointment, if the
    /// month has any
    pub(crate) fn focus(&self) -> Option<usize> {
        (self.focus < self.grid().selectable().count()).then_some(self.focus)
    }

    pub(crate) fn selected(&self) -> Option<&'a AppointmentRecord> {
        self.selected
    }

    pub(crate) fn go_previous_month(&mut self) -> Result<(), OutOfTimeError> {
        let cursor = self.cursor.previous()?;
        self.set_cursor(cursor);
        Ok(())
    }

    pub(crate) fn go_next_month(&mut self) -> Result<(), OutOfTimeError> {
        let cursor = self.cursor.next()?;
        self.set_cursor(cursor);
        Ok(())
    }

    pub(crate) fn go_to_today(&mut self) {
        self.set_cursor(MonthCursor::containing(self.now.today));
    }

    pub(crate) fn jump_to(&mut self, cursor: MonthCursor) {
        self.set_cursor(cursor);
    }

    fn set_cursor(&mut self, cursor: MonthCursor) {
        tracing::debug!(month = %cursor, "showing month");
        self.cursor = cursor;
        self.focus = 0;
        self.selected = None;
    }

    // Returns `false` if there is nothing to focus
    pub(crate) fn focus_next(&mut self) -> bool {
        let qty = self.grid().selectable().count();
        if qty == 0 {
            return false;
        }
        self.focus = (self.focus + 1) % qty;
        true
    }

    // Returns `false` if there is nothing to focus
    pub(crate) fn focus_previous(&mut self) -> bool {
        let qty = self.grid().selectable().count();
        if qty == 0 {
            return false;
        }
        self.focus = self.focus.checked_sub(1).unwrap_or(qty - 1).min(qty - 1);
        true
    }

    // Returns `false` if there is nothing focused
    pub(crate) fn select_focused(&mut self) -> bool {
        match self.grid().selectable().nth(self.focus) {
            Some(r) => {
                self.select_record(r);
                true
            }
            None => false,
        }
    }

    pub(crate) fn select_record(&mut self, record: &'a AppointmentRecord) {
        self.selected = Some(record);
    }

    pub(crate) fn close_detail(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datekey::DayKey;
    use crate::record::DateSpec;
    use time::macros::{date, offset};
    use time::Month::*;

    const NOW: LocalNow = LocalNow::fixed(date!(2025 - 01 - 10), offset!(UTC));

    fn on(key: &str, purpose: &str) -> AppointmentRecord {
        AppointmentRecord {
            when: Some(DateSpec::Explicit(DayKey::verbatim(key.into()))),
            purpose: Some(purpose.into()),
            ..AppointmentRecord::default()
        }
    }

    fn selected_purpose<'a>(view: &CalendarView<'a>) -> Option<&'a str> {
        view.selected().and_then(|r| r.purpose.as_deref())
    }

    #[test]
    fn test_starts_on_current_month() {
        let view = CalendarView::new(&[], NOW, DEFAULT_CAP);
        assert_eq!(view.cursor(), MonthCursor::new(2025, January).unwrap());
        assert_eq!(view.selected(), None);
        assert_eq!(view.focus(), None);
    }

    #[test]
    fn test_navigation_wraps_years() {
        let mut view = CalendarView::new(&[], NOW, DEFAULT_CAP);
        view.go_previous_month().unwrap();
        assert_eq!(view.cursor(), MonthCursor::new(2024, December).unwrap());
        view.go_next_month().unwrap();
        view.go_next_month().unwrap();
        assert_eq!(view.cursor(), MonthCursor::new(2025, February).unwrap());
        view.go_to_today();
        assert_eq!(view.cursor(), MonthCursor::new(2025, January).unwrap());
    }

    #[test]
    fn test_navigation_at_end_of_time() {
        let mut view = CalendarView::new(&[], NOW, DEFAULT_CAP);
        let last = MonthCursor::new(9999, December).unwrap();
        view.jump_to(last);
        assert_eq!(view.go_next_month(), Err(OutOfTimeError));
        assert_eq!(view.cursor(), last);
    }

    #[test]
    fn test_focus_cycles() {
        let records = [
            on("2025-01-03", "a"),
            on("2025-01-03", "b"),
            on("2025-01-20", "c"),
        ];
        let mut view = CalendarView::new(&records, NOW, DEFAULT_CAP);
        assert_eq!(view.focus(), Some(0));
        assert!(view.focus_next());
        assert!(view.focus_next());
        assert_eq!(view.focus(), Some(2));
        assert!(view.focus_next());
        assert_eq!(view.focus(), Some(0));
        assert!(view.focus_previous());
        assert_eq!(view.focus(), Some(2));
    }

    #[test]
    fn test_focus_with_nothing_to_focus() {
        let mut view = CalendarView::new(&[], NOW, DEFAULT_CAP);
        assert!(!view.focus_next());
        assert!(!view.focus_previous());
        assert!(!view.select_focused());
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn test_focus_skips_overflowed_records() {
        let records = [
            on("2025-01-03", "a"),
            on("2025-01-03", "b"),
            on("2025-01-04", "c"),
        ];
        let mut view = CalendarView::new(&records, NOW, 1);
        assert!(view.focus_next());
        assert!(view.select_focused());
        assert_eq!(selected_purpose(&view), Some("c"));
    }

    #[test]
    fn test_select_and_close() {
        let records = [on("2025-01-03", "a"), on("2025-01-05", "b")];
        let mut view = CalendarView::new(&records, NOW, DEFAULT_CAP);
        assert!(view.focus_next());
        assert!(view.select_focused());
        assert_eq!(selected_purpose(&view), Some("b"));
        view.close_detail();
        assert_eq!(view.selected(), None);
        view.select_record(&records[0]);
        assert_eq!(selected_purpose(&view), Some("a"));
    }

    #[test]
    fn test_changing_month_resets_focus_and_selection() {
        let records = [on("2025-01-03", "a"), on("2025-01-05", "b")];
        let mut view = CalendarView::new(&records, NOW, DEFAULT_CAP);
        assert!(view.focus_next());
        assert!(view.select_focused());
        view.go_next_month().unwrap();
        assert_eq!(view.selected(), None);
        assert_eq!(view.focus(), None);
        view.go_previous_month().unwrap();
        assert_eq!(view.focus(), Some(0));
    }

    #[test]
    fn test_read_only_flag() {
        let view = CalendarView::new(&[], NOW, DEFAULT_CAP);
        assert!(!view.is_read_only());
        assert!(view.read_only(true).is_read_only());
    }
}
