use crate::datekey::{
    format_display_time, local_start, normalize, to_local_iso_minutes, truncate, LocalNow,
};
use crate::help::render_popup;
use crate::record::{AppointmentRecord, Person};
use crate::theme::{
    detail::{LABEL_STYLE, LINK_STYLE},
    BASE_STYLE,
};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span, Text},
    widgets::Widget,
};

/// Width of the label column, including the gap after the label
const LABEL_WIDTH: usize = 12;

const MAX_TITLE_LEN: usize = 40;

const LINK_LABEL: &str = "Video link";

/// Overlay showing everything known about one appointment
#[derive(Clone, Copy, Debug)]
pub(crate) struct Detail<'a> {
    pub(crate) record: &'a AppointmentRecord,
    pub(crate) now: LocalNow,
}

impl Widget for Detail<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines = fields(self.record, self.now)
            .into_iter()
            .map(|(label, value)| {
                let value_style = if label == LINK_LABEL {
                    LINK_STYLE
                } else {
                    BASE_STYLE
                };
                Line::from_iter([
                    Span::styled(format!("{label:LABEL_WIDTH$}"), LABEL_STYLE),
                    Span::styled(value, value_style),
                ])
            })
            .collect::<Vec<_>>();
        lines.push(Line::raw(""));
        lines.push(Line::raw("Press ESC to close."));
        let mut title = truncate(&self.record.title(), MAX_TITLE_LEN);
        if let Some(id) = &self.record.id {
            title = format!("{title} #{id}");
        }
        render_popup(Text::from(lines), &format!(" {title} "), area, buf);
    }
}

/// The labelled fields shown for an appointment, omitting any it lacks
///
/// "Start" is the local start in the `YYYY-MM-DDTHH:MM` form the booking form
/// takes when rescheduling.
pub(crate) fn fields(record: &AppointmentRecord, now: LocalNow) -> Vec<(&'static str, String)> {
    [
        normalize(record, now).map(|day| ("Date", day.to_string())),
        Some(format_display_time(record, now))
            .filter(|t| !t.is_empty())
            .map(|t| ("Time", t)),
        local_start(record, now).map(|dt| ("Start", to_local_iso_minutes(dt))),
        record
            .status
            .as_ref()
            .map(|s| ("Status", s.label().to_owned())),
        record.specialization().map(|s| ("Specialty", s)),
        record
            .patient
            .as_ref()
            .and_then(Person::full_name)
            .map(|name| ("Patient", name)),
        record.purpose.clone().map(|p| ("Purpose", p)),
        record.symptoms.clone().map(|s| ("Symptoms", s)),
        record
            .meeting_link()
            .map(|link| (LINK_LABEL, link.to_owned())),
    ]
    .into_iter()
    .flatten()
    .collect()
}
