use crate::theme::BASE_STYLE;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Flex, Layout, Rect},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Widget},
};

static TEXT: &[&str] = &[
    "h, LEFT         Previous month",
    "l, RIGHT        Next month",
    "0, HOME         Jump to this month",
    "g               Input month to jump to",
    "j, TAB          Focus next appointment",
    "k, BACKTAB      Focus previous appointment",
    "ENTER           Show appointment details",
    "?               Show this help",
    "q, ESC          Quit",
    "",
    "Press the Any Key to dismiss.",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Help;

impl Widget for Help {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = TEXT.iter().map(|&s| Line::raw(s)).collect::<Vec<_>>();
        render_popup(Text::from(lines), " Commands ", area, buf);
    }
}

/// Draw `text` in a bordered box centered in `area`, blanking what lies
/// beneath it
pub(crate) fn render_popup(text: Text<'_>, title: &str, area: Rect, buf: &mut Buffer) {
    let height = u16::try_from(text.height())
        .unwrap_or(u16::MAX)
        .min(area.height)
        .saturating_add(2);
    let width = u16::try_from(text.width())
        .unwrap_or(u16::MAX)
        .max(u16::try_from(title.chars().count()).unwrap_or(u16::MAX))
        .min(area.width)
        .saturating_add(2);
    let para = Paragraph::new(text)
        .block(
            Block::bordered()
                .title(title)
                .title_alignment(Alignment::Center),
        )
        .style(BASE_STYLE);
    let [popup_area] = Layout::horizontal([width]).flex(Flex::Center).areas(area);
    let [popup_area] = Layout::vertical([height])
        .flex(Flex::Center)
        .areas(popup_area);
    let outer_area = Rect {
        x: popup_area.x.saturating_sub(1),
        y: popup_area.y,
        width: popup_area.width.saturating_add(2),
        height: popup_area.height,
    }
    .intersection(area);
    Clear.render(outer_area, buf);
    Block::new().style(BASE_STYLE).render(outer_area, buf);
    para.render(popup_area, buf);
}
