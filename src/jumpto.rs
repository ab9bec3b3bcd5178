use crate::calendar::MonthCursor;
use crate::help::render_popup;
use crate::theme::{
    jumpto::{READY_ENTER_STYLE, UNFILLED_CELL_STYLE},
    BASE_STYLE,
};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span, Text},
    widgets::StatefulWidget,
};
use std::iter::once;

const YEAR_DIGITS: usize = 4;
const ENTER_POS: usize = YEAR_DIGITS + 2;

/// Dialog for typing a month to jump to, drawn as a popup like the help
/// screen:
///
/// ```text
/// ┌ Jump To… ┐
/// │          │
/// │ -YYYY-MM │
/// │          │
/// │ [ENTER]  │
/// └──────────┘
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct JumpTo;

impl StatefulWidget for JumpTo {
    type State = JumpToState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        render_popup(state.to_text(), " Jump To… ", area, buf);
    }
}

/// Digits typed so far into the month-entry dialog
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct JumpToState {
    negative: bool,
    year: [Option<u8>; YEAR_DIGITS],
    month: [Option<u8>; 2],
    pos: usize,
}

impl JumpToState {
    pub(crate) fn new() -> JumpToState {
        JumpToState::default()
    }

    fn to_text(self) -> Text<'static> {
        Text::from_iter([
            Line::raw(""),
            self.to_line(),
            Line::raw(""),
            // Underline the span only, not the line's centering padding
            Line::from(Span::styled(
                "[ENTER]",
                if self.pos == ENTER_POS {
                    READY_ENTER_STYLE
                } else {
                    BASE_STYLE
                },
            )),
        ])
        .centered()
    }

    fn to_line(self) -> Line<'static> {
        let cell = |slot: Option<u8>, blank: &'static str| match slot {
            Some(d) => Span::raw(d.to_string()),
            None => Span::styled(blank, UNFILLED_CELL_STYLE),
        };
        let sign = Span::raw(if self.negative { "-" } else { " " });
        Line::from_iter(
            once(sign)
                .chain(self.year.into_iter().map(|d| cell(d, "Y")))
                .chain(once(Span::raw("-")))
                .chain(self.month.into_iter().map(|d| cell(d, "M"))),
        )
        .style(BASE_STYLE)
    }

    fn slot(&mut self, pos: usize) -> Option<&mut Option<u8>> {
        if pos < YEAR_DIGITS {
            self.year.get_mut(pos)
        } else {
            self.month.get_mut(pos - YEAR_DIGITS)
        }
    }

    pub(crate) fn handle_input(&mut self, input: JumpToInput) -> JumpToOutput {
        match (input, self.pos) {
            (JumpToInput::Negative, 0) => {
                self.negative = !self.negative;
                JumpToOutput::Ok
            }
            (JumpToInput::Positive, 0) => {
                self.negative = false;
                JumpToOutput::Ok
            }
            (JumpToInput::Digit(d), 0..ENTER_POS) => {
                if let Some(slot) = self.slot(self.pos) {
                    *slot = Some(d);
                }
                self.pos += 1;
                JumpToOutput::Ok
            }
            (JumpToInput::Backspace, 1..) => {
                self.pos -= 1;
                if let Some(slot) = self.slot(self.pos) {
                    *slot = None;
                }
                JumpToOutput::Ok
            }
            (JumpToInput::Enter, ENTER_POS) => match self.entered() {
                Some(cursor) => JumpToOutput::Jump(cursor),
                None => JumpToOutput::Invalid,
            },
            _ => JumpToOutput::Invalid,
        }
    }

    fn entered(&self) -> Option<MonthCursor> {
        let mut year = digits_value(&self.year)?;
        if self.negative {
            year = -year;
        }
        let month = u8::try_from(digits_value(&self.month)?).ok()?;
        MonthCursor::new(year, time::Month::try_from(month).ok()?)
    }
}

fn digits_value(digits: &[Option<u8>]) -> Option<i32> {
    digits
        .iter()
        .try_fold(0i32, |acc, d| d.map(|d| acc * 10 + i32::from(d)))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum JumpToInput {
    Negative,
    Positive,
    Digit(u8),
    Backspace,
    Enter,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum JumpToOutput {
    Ok,
    Invalid,
    Jump(MonthCursor),
}
