use ratatui::style::{Color, Modifier, Style};

pub(crate) const BASE_STYLE: Style = Style::new().fg(Color::White).bg(Color::Black);

pub(crate) const TITLE_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const WEEKDAY_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

pub(crate) const TODAY_STYLE: Style = Style::new()
    .fg(Color::LightYellow)
    .bg(Color::Black)
    .add_modifier(Modifier::BOLD);

pub(crate) const RECORD_STYLE: Style = Style::new().fg(Color::LightCyan).bg(Color::Black);

pub(crate) const FOCUS_STYLE: Style = RECORD_STYLE.add_modifier(Modifier::REVERSED);

pub(crate) const OVERFLOW_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

pub(crate) mod jumpto {
    use super::*;

    pub(crate) const UNFILLED_CELL_STYLE: Style = BASE_STYLE.fg(Color::DarkGray);

    pub(crate) const READY_ENTER_STYLE: Style = BASE_STYLE.add_modifier(Modifier::UNDERLINED);
}

pub(crate) mod detail {
    use super::*;

    pub(crate) const LABEL_STYLE: Style = BASE_STYLE.add_modifier(Modifier::BOLD);

    pub(crate) const LINK_STYLE: Style = BASE_STYLE
        .fg(Color::LightBlue)
        .add_modifier(Modifier::UNDERLINED);
}
