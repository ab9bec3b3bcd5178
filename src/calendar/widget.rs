use super::grid::{Day, DAYS_IN_WEEK};
use super::CalendarView;
use crate::datekey::{format_display_time, truncate, LocalNow, ELLIPSIS};
use crate::record::AppointmentRecord;
use crate::theme::{
    FOCUS_STYLE, OVERFLOW_STYLE, RECORD_STYLE, TITLE_STYLE, TODAY_STYLE, WEEKDAY_STYLE,
};
use ratatui::{prelude::*, widgets::*};
use std::iter::zip;

static WEEKDAYS: [&str; DAYS_IN_WEEK] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Number of lines taken up by the month title, the weekday names, and the
/// rule beneath them
const HEADER_LINES: u16 = 3;

/// Lines in each week besides its appointment lines: the day numbers and the
/// rule beneath the week
const WEEK_FRAME_LINES: u16 = 2;

const MIN_DAY_WIDTH: u16 = 8;

const MAX_DAY_WIDTH: u16 = 20;

/// Width of a rendered day number, e.g. ` 15 ` or `[15]`
const DAY_NUMBER_WIDTH: u16 = 4;

/// Columns of space to the left and right of weekday names and appointment
/// lines within a cell
const CELL_PADDING: u16 = 1;

const ACS_HLINE: char = '─';

/// The month grid of a `CalendarView`
#[derive(Copy, Clone, Debug)]
pub(crate) struct Calendar<'v, 'a>(pub(crate) &'v CalendarView<'a>);

impl Widget for Calendar<'_, '_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.0;
        let grid = view.grid();
        let day_width = (area.width / 7).clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH);
        let main_width = day_width * 7;
        let left = area.width.saturating_sub(main_width) / 2;
        let [_, area, _] = Layout::horizontal([
            Constraint::Length(left),
            Constraint::Length(main_width.min(area.width)),
            Constraint::Min(0),
        ])
        .areas(area);
        let cap = u16::try_from(view.cap()).unwrap_or(u16::MAX);
        let mut canvas = BufferCanvas {
            area,
            buf,
            day_width,
            week_lines: cap.saturating_add(WEEK_FRAME_LINES),
        };
        let mut title = grid.cursor().to_string();
        if view.is_read_only() {
            title.push_str(" (read-only)");
        }
        canvas.draw_title(&title);
        canvas.draw_header();
        let now = view.now();
        let focus = view.focus();
        let mut selectable = 0;
        for (i, week) in zip(0u16.., grid.weeks()) {
            for (col, day) in zip(0u16.., week) {
                let Some(day) = day.as_day() else {
                    continue;
                };
                canvas.draw_day(i, col, day);
                for (line, &record) in zip(1u16.., day.visible()) {
                    let focused = focus == Some(selectable);
                    selectable += 1;
                    canvas.draw_record(i, col, line, &record_label(record, now), focused);
                }
            }
            canvas.draw_week_rule(i);
        }
    }
}

fn record_label(record: &AppointmentRecord, now: LocalNow) -> String {
    let time = format_display_time(record, now);
    if time.is_empty() {
        record.title()
    } else {
        format!("{time} {}", record.title())
    }
}

/// Shorten `s` with an ellipsis so that it fits in `width` columns
fn fit(s: &str, width: u16) -> String {
    let width = usize::from(width);
    if s.chars().count() <= width {
        s.to_owned()
    } else {
        truncate(s, width.saturating_sub(ELLIPSIS.len()))
    }
}

#[derive(Debug, Eq, PartialEq)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
    day_width: u16,
    week_lines: u16,
}

impl BufferCanvas<'_> {
    fn draw_title(&mut self, title: &str) {
        let x = self.area.width.saturating_sub(text_width(title)) / 2;
        self.mvprint(0, x, title, Some(TITLE_STYLE));
    }

    fn draw_header(&mut self) {
        for (col, name) in zip(0u16.., WEEKDAYS) {
            self.mvprint(1, col * self.day_width + CELL_PADDING, name, Some(WEEKDAY_STYLE));
        }
        self.hline(2, 0, ACS_HLINE, self.day_width * 7);
    }

    fn week_top(&self, week_no: u16) -> u16 {
        HEADER_LINES.saturating_add(week_no.saturating_mul(self.week_lines))
    }

    fn draw_day(&mut self, week_no: u16, col: u16, day: &Day<'_>) {
        let y = self.week_top(week_no);
        let x = col * self.day_width;
        if day.is_today {
            self.mvprint(y, x, format!("[{:2}]", day.number), Some(TODAY_STYLE));
        } else {
            self.mvprint(y, x, format!(" {:2} ", day.number), None);
        }
        if day.is_overflowed() {
            let n = day.overflow();
            let mut more = format!("+{n} more");
            if DAY_NUMBER_WIDTH + 1 + text_width(&more) > self.day_width {
                more = format!("+{n}");
            }
            let more_x = x + self.day_width.saturating_sub(text_width(&more));
            self.mvprint(y, more_x, more, Some(OVERFLOW_STYLE));
        }
    }

    // `line` counts from 1 for the first appointment under the day number
    fn draw_record(&mut self, week_no: u16, col: u16, line: u16, label: &str, focused: bool) {
        let y = self.week_top(week_no).saturating_add(line);
        let x = col * self.day_width + CELL_PADDING;
        let label = fit(label, self.day_width.saturating_sub(2 * CELL_PADDING));
        let style = if focused { FOCUS_STYLE } else { RECORD_STYLE };
        self.mvprint(y, x, label, Some(style));
    }

    fn draw_week_rule(&mut self, week_no: u16) {
        let y = self
            .week_top(week_no)
            .saturating_add(self.week_lines)
            .saturating_sub(1);
        self.hline(y, 0, ACS_HLINE, self.day_width * 7);
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Option<Style>) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style.unwrap_or_default());
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // calendar's area, though we need to be sure that the Rect passed
            // to the Paragraph is entirely within the frame lest a panic
            // result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }

    fn hline(&mut self, y: u16, x: u16, ch: char, length: u16) {
        self.mvprint(y, x, String::from(ch).repeat(length.into()), None);
    }
}

fn text_width(s: &str) -> u16 {
    u16::try_from(s.chars().count()).unwrap_or(u16::MAX)
}
