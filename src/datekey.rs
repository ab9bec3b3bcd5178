use crate::record::{AppointmentRecord, DateSpec};
use std::fmt;
use time::{
    format_description::{
        well_known::{Iso8601, Rfc3339},
        FormatItem,
    },
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

static LOCAL_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

static MINUTES_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");

static LOCAL_SUBSEC_FMT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Length of a local timestamp that stops at the minutes, e.g.
/// `2025-03-15T14:30`
const MINUTES_ISO_LEN: usize = 16;

pub(crate) const ELLIPSIS: &str = "...";

/// A canonical `YYYY-MM-DD` calendar-day key used to bucket appointments
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct DayKey(String);

impl DayKey {
    pub(crate) fn for_date(date: Date) -> DayKey {
        DayKey(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
    }

    /// Wrap a key supplied by the data source.  It is trusted as-is and never
    /// reformatted.
    pub(crate) fn verbatim(key: String) -> DayKey {
        DayKey(key)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The moment against which the calendar is drawn: the local date (for
/// highlighting today) and the local time zone's offset rules (for converting
/// instants to local calendar days)
#[derive(Clone, Copy, Debug)]
pub(crate) struct LocalNow {
    pub(crate) today: Date,
    /// Offset in effect at startup, used wherever `rules` cannot tell
    offset: UtcOffset,
    rules: fn(OffsetDateTime) -> Option<UtcOffset>,
}

impl LocalNow {
    /// Resolve offsets with the system's local time zone
    pub(crate) fn system(now: OffsetDateTime) -> LocalNow {
        LocalNow {
            today: now.date(),
            offset: now.offset(),
            rules: system_offset_at,
        }
    }

    /// Use one offset for every instant
    pub(crate) const fn fixed(today: Date, offset: UtcOffset) -> LocalNow {
        LocalNow {
            today,
            offset,
            rules: no_rules,
        }
    }

    /// The local UTC offset in effect at `instant`
    pub(crate) fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        (self.rules)(instant).unwrap_or(self.offset)
    }
}

fn system_offset_at(instant: OffsetDateTime) -> Option<UtcOffset> {
    UtcOffset::local_offset_at(instant).ok()
}

fn no_rules(_: OffsetDateTime) -> Option<UtcOffset> {
    None
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Timestamp {
    /// An instant carrying its own UTC offset
    Instant(OffsetDateTime),
    /// A wall-clock reading with no offset, taken to already be local time
    Local(PrimitiveDateTime),
}

impl Timestamp {
    /// Accepts RFC 3339 and the other ISO 8601 forms that carry an offset
    /// (`2025-03-15T14:30Z`, `+0100`, ...), then the local-naive forms of
    /// [`parse_local_datetime`]
    pub(crate) fn parse(s: &str) -> Option<Timestamp> {
        let s = s.trim();
        if let Some(dt) = OffsetDateTime::parse(s, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
            .ok()
        {
            return Some(Timestamp::Instant(dt));
        }
        parse_local_datetime(s).map(Timestamp::Local)
    }

    /// Local wall-clock reading of the timestamp.  Instants use the offset in
    /// effect at that instant, not the one in effect now.  Returns `None` if
    /// the conversion would leave the range of representable dates.
    pub(crate) fn to_local(self, now: LocalNow) -> Option<PrimitiveDateTime> {
        match self {
            Timestamp::Instant(dt) => {
                let local = dt.checked_to_offset(now.offset_at(dt))?;
                Some(PrimitiveDateTime::new(local.date(), local.time()))
            }
            Timestamp::Local(dt) => Some(dt),
        }
    }
}

/// Parse a timestamp without an offset: `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`,
/// `YYYY-MM-DDTHH:MM:SS`, or the latter with fractional seconds
pub(crate) fn parse_local_datetime(s: &str) -> Option<PrimitiveDateTime> {
    if let Ok(date) = Date::parse(s, &YMD_FMT) {
        return Some(date.midnight());
    }
    let s = ensure_seconds(s);
    [LOCAL_FMT, LOCAL_SUBSEC_FMT]
        .into_iter()
        .find_map(|fmt| PrimitiveDateTime::parse(&s, fmt).ok())
}

/// Format as `YYYY-MM-DDTHH:MM`, the form booking forms take
pub(crate) fn to_local_iso_minutes(dt: PrimitiveDateTime) -> String {
    dt.format(&MINUTES_FMT)
        .expect("a date-time should format as year, month, day, hour, and minute")
}

/// Append `:00` to a local timestamp that stops at the minutes
pub(crate) fn ensure_seconds(s: &str) -> String {
    if s.len() == MINUTES_ISO_LEN {
        format!("{s}:00")
    } else {
        s.to_owned()
    }
}

/// Compute the calendar day a record belongs on.
///
/// An explicit day key wins over a timestamp.  Timestamps are placed on the
/// *local* calendar day of the instant they denote.  Records whose timestamp
/// cannot be parsed, or that carry no date at all, belong on no day.
pub(crate) fn normalize(record: &AppointmentRecord, now: LocalNow) -> Option<DayKey> {
    match record.when.as_ref()? {
        DateSpec::Explicit(key) => Some(key.clone()),
        DateSpec::Timestamp(raw) => {
            let Some(local) = Timestamp::parse(raw).and_then(|ts| ts.to_local(now)) else {
                tracing::debug!(
                    timestamp = %raw,
                    "unusable appointment timestamp; record left off the calendar"
                );
                return None;
            };
            Some(DayKey::for_date(local.date()))
        }
    }
}

/// Local `HH:MM` start time of a record, falling back to its literal time
/// label, falling back to the empty string
pub(crate) fn format_display_time(record: &AppointmentRecord, now: LocalNow) -> String {
    local_start(record, now)
        .map(|dt| format!("{:02}:{:02}", dt.hour(), dt.minute()))
        .or_else(|| record.appointment_time.clone())
        .unwrap_or_default()
}

/// Local start of a record, if it has a usable start timestamp
pub(crate) fn local_start(record: &AppointmentRecord, now: LocalNow) -> Option<PrimitiveDateTime> {
    record
        .start_time
        .as_deref()
        .and_then(Timestamp::parse)
        .and_then(|ts| ts.to_local(now))
}

pub(crate) fn truncate(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((i, _)) => format!("{}{ELLIPSIS}", &text[..i]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    fn fixed(offset: UtcOffset) -> LocalNow {
        LocalNow::fixed(date!(2025 - 01 - 10), offset)
    }

    /// US Eastern time for 2025: EDT from March 9 to November 2
    fn new_york_2025(instant: OffsetDateTime) -> Option<UtcOffset> {
        let dst = datetime!(2025-03-09 7:00 UTC)..datetime!(2025-11-02 6:00 UTC);
        Some(if dst.contains(&instant) {
            offset!(-4)
        } else {
            offset!(-5)
        })
    }

    const NEW_YORK_IN_JANUARY: LocalNow = LocalNow {
        today: date!(2025 - 01 - 10),
        offset: offset!(-5),
        rules: new_york_2025,
    };

    fn explicit(key: &str) -> AppointmentRecord {
        AppointmentRecord {
            when: Some(DateSpec::Explicit(DayKey::verbatim(key.into()))),
            ..AppointmentRecord::default()
        }
    }

    fn stamped(ts: &str) -> AppointmentRecord {
        AppointmentRecord {
            when: Some(DateSpec::Timestamp(ts.into())),
            start_time: Some(ts.into()),
            ..AppointmentRecord::default()
        }
    }

    #[test]
    fn test_day_key_for_date() {
        assert_eq!(DayKey::for_date(date!(2025 - 03 - 05)).to_string(), "2025-03-05");
        assert_eq!(DayKey::for_date(date!(2024 - 12 - 31)).to_string(), "2024-12-31");
    }

    #[test]
    fn test_explicit_key_is_verbatim() {
        let r = explicit("2025-3-5");
        assert_eq!(
            normalize(&r, fixed(offset!(UTC))),
            Some(DayKey::verbatim("2025-3-5".into()))
        );
    }

    #[test]
    fn test_naive_timestamp_keeps_its_date() {
        let r = stamped("2025-03-15T23:30:00");
        assert_eq!(
            normalize(&r, fixed(offset!(+9))).map(|k| k.to_string()),
            Some(String::from("2025-03-15"))
        );
    }

    #[test]
    fn test_instant_uses_local_day_not_utc_day() {
        // 01:30 UTC on the 16th is still the evening of the 15th in New York
        let r = stamped("2025-03-16T01:30:00Z");
        assert_eq!(
            normalize(&r, fixed(offset!(-5))).map(|k| k.to_string()),
            Some(String::from("2025-03-15"))
        );
        assert_eq!(
            normalize(&r, fixed(offset!(UTC))).map(|k| k.to_string()),
            Some(String::from("2025-03-16"))
        );
        // 23:00 UTC on the 15th is already the 16th in Tokyo
        let r = stamped("2025-03-15T23:00:00+00:00");
        assert_eq!(
            normalize(&r, fixed(offset!(+9))).map(|k| k.to_string()),
            Some(String::from("2025-03-16"))
        );
    }

    #[test]
    fn test_instant_uses_offset_in_effect_at_that_instant() {
        // 04:30 UTC in July is 00:30 EDT, even though it is EST today
        let r = stamped("2025-07-16T04:30:00Z");
        assert_eq!(
            normalize(&r, NEW_YORK_IN_JANUARY).map(|k| k.to_string()),
            Some(String::from("2025-07-16"))
        );
        assert_eq!(format_display_time(&r, NEW_YORK_IN_JANUARY), "00:30");
        let r = stamped("2025-01-16T04:30:00Z");
        assert_eq!(
            normalize(&r, NEW_YORK_IN_JANUARY).map(|k| k.to_string()),
            Some(String::from("2025-01-15"))
        );
        assert_eq!(format_display_time(&r, NEW_YORK_IN_JANUARY), "23:30");
    }

    #[test]
    fn test_fixed_offset_ignores_dst() {
        let now = fixed(offset!(-5));
        assert_eq!(now.offset_at(datetime!(2025-07-16 4:30 UTC)), offset!(-5));
        assert_eq!(
            NEW_YORK_IN_JANUARY.offset_at(datetime!(2025-07-16 4:30 UTC)),
            offset!(-4)
        );
    }

    #[test]
    fn test_iso8601_instants() {
        for (ts, expected) in [
            ("2025-03-15T14:30Z", datetime!(2025-03-15 14:30 UTC)),
            ("2025-03-15T14:30+01:00", datetime!(2025-03-15 13:30 UTC)),
            ("2025-03-15T14:30:00+0100", datetime!(2025-03-15 13:30 UTC)),
            ("2025-03-15T14:30:15.5-05:00", datetime!(2025-03-15 19:30:15.5 UTC)),
        ] {
            match Timestamp::parse(ts) {
                Some(Timestamp::Instant(dt)) => assert_eq!(dt, expected, "{ts}"),
                other => panic!("{ts} parsed as {other:?}"),
            }
        }
        let r = stamped("2025-03-15T23:30+0100");
        assert_eq!(
            normalize(&r, fixed(offset!(UTC))).map(|k| k.to_string()),
            Some(String::from("2025-03-15"))
        );
        assert_eq!(format_display_time(&r, fixed(offset!(UTC))), "22:30");
    }

    #[test]
    fn test_naive_forms_stay_local() {
        assert_eq!(
            Timestamp::parse("2025-03-15T14:30"),
            Some(Timestamp::Local(datetime!(2025-03-15 14:30)))
        );
        assert_eq!(
            Timestamp::parse(" 2025-03-15 "),
            Some(Timestamp::Local(datetime!(2025-03-15 0:00)))
        );
    }

    #[test]
    fn test_bad_timestamp_is_excluded() {
        assert_eq!(normalize(&stamped("next Tuesday"), fixed(offset!(UTC))), None);
        assert_eq!(normalize(&stamped("2025-02-30T10:00"), fixed(offset!(UTC))), None);
    }

    #[test]
    fn test_no_date_is_excluded() {
        assert_eq!(normalize(&AppointmentRecord::default(), fixed(offset!(UTC))), None);
    }

    #[test]
    fn test_parse_local_datetime() {
        assert_eq!(
            parse_local_datetime("2025-03-15"),
            Some(datetime!(2025-03-15 0:00))
        );
        assert_eq!(
            parse_local_datetime("2025-03-15T14:30"),
            Some(datetime!(2025-03-15 14:30))
        );
        assert_eq!(
            parse_local_datetime("2025-03-15T14:30:15"),
            Some(datetime!(2025-03-15 14:30:15))
        );
        assert_eq!(
            parse_local_datetime("2025-03-15T14:30:15.250"),
            Some(datetime!(2025-03-15 14:30:15.25))
        );
        assert_eq!(parse_local_datetime("15/03/2025"), None);
    }

    #[test]
    fn test_to_local_iso_minutes() {
        assert_eq!(
            to_local_iso_minutes(datetime!(2025-03-05 09:07:59)),
            "2025-03-05T09:07"
        );
        let iso = to_local_iso_minutes(datetime!(2025-12-31 23:45));
        assert_eq!(ensure_seconds(&iso), "2025-12-31T23:45:00");
        assert_eq!(
            parse_local_datetime(&iso),
            Some(datetime!(2025-12-31 23:45))
        );
    }

    #[test]
    fn test_local_start() {
        let r = stamped("2025-07-16T04:30:00Z");
        assert_eq!(
            local_start(&r, NEW_YORK_IN_JANUARY).map(to_local_iso_minutes),
            Some(String::from("2025-07-16T00:30"))
        );
        assert_eq!(
            local_start(&explicit("2025-03-15"), fixed(offset!(UTC))),
            None
        );
    }

    #[test]
    fn test_ensure_seconds() {
        assert_eq!(ensure_seconds("2025-03-15T14:30"), "2025-03-15T14:30:00");
        assert_eq!(ensure_seconds("2025-03-15T14:30:00"), "2025-03-15T14:30:00");
        assert_eq!(ensure_seconds(""), "");
    }

    #[test]
    fn test_format_display_time() {
        let r = stamped("2025-03-16T01:30:00Z");
        assert_eq!(format_display_time(&r, fixed(offset!(-5))), "20:30");
        let r = AppointmentRecord {
            appointment_time: Some("10:00".into()),
            ..explicit("2025-03-15")
        };
        assert_eq!(format_display_time(&r, fixed(offset!(UTC))), "10:00");
        let r = AppointmentRecord {
            start_time: Some("garbage".into()),
            appointment_time: Some("09:15".into()),
            ..AppointmentRecord::default()
        };
        assert_eq!(format_display_time(&r, fixed(offset!(UTC))), "09:15");
        assert_eq!(
            format_display_time(&AppointmentRecord::default(), fixed(offset!(UTC))),
            ""
        );
    }

    #[test]
    fn test_display_time_uses_timestamp_even_with_explicit_key() {
        let r = AppointmentRecord {
            start_time: Some("2025-03-15T08:05:00".into()),
            appointment_time: Some("10:00".into()),
            ..explicit("2025-03-15")
        };
        assert_eq!(format_display_time(&r, fixed(offset!(UTC))), "08:05");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("hi", 5), "hi");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("", 5), "");
        assert_eq!(truncate("Müller-Lüdenscheidt", 6), "Müller...");
    }
}
