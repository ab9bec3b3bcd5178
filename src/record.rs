use crate::datekey::DayKey;
use anyhow::Context;
use serde::{de::Error as _, Deserialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

const FALLBACK_TITLE: &str = "Appointment";

const NOT_A_LIST: &str = "expected a list of appointments or an object with a \"data\" list";

/// How an appointment says which day it falls on, resolved once when the
/// record is loaded
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum DateSpec {
    /// A `YYYY-MM-DD` key precomputed by the data source
    Explicit(DayKey),
    /// A start timestamp, either RFC 3339 or local-naive
    Timestamp(String),
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(from = "RawAppointment")]
pub(crate) struct AppointmentRecord {
    pub(crate) id: Option<RecordId>,
    pub(crate) when: Option<DateSpec>,
    pub(crate) start_time: Option<String>,
    pub(crate) appointment_time: Option<String>,
    pub(crate) doctor: Option<Person>,
    pub(crate) doctor_name: Option<String>,
    pub(crate) patient: Option<Person>,
    pub(crate) purpose: Option<String>,
    pub(crate) symptoms: Option<String>,
    pub(crate) meeting_link: Option<String>,
    pub(crate) status: Option<Status>,
}

impl AppointmentRecord {
    /// The name shown for the appointment: the structured doctor name, else
    /// the free-text doctor name, else the purpose of the consultation
    pub(crate) fn title(&self) -> String {
        self.doctor
            .as_ref()
            .and_then(Person::full_name)
            .map(|name| format!("Dr. {name}"))
            .or_else(|| self.doctor_name.clone())
            .or_else(|| self.purpose.clone())
            .unwrap_or_else(|| String::from(FALLBACK_TITLE))
    }

    pub(crate) fn specialization(&self) -> Option<String> {
        self.doctor
            .as_ref()
            .and_then(|d| d.specialization.as_deref())
            .map(|s| s.replace('_', " "))
    }

    /// Only offered while the appointment is still scheduled
    pub(crate) fn meeting_link(&self) -> Option<&str> {
        if self.status.as_ref().is_some_and(Status::is_scheduled) {
            self.meeting_link.as_deref()
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub(crate) enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct Person {
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) specialization: Option<String>,
}

impl Person {
    pub(crate) fn full_name(&self) -> Option<String> {
        let parts = [&self.first_name, &self.last_name]
            .into_iter()
            .filter_map(|s| non_blank(s.clone()))
            .collect::<Vec<_>>();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(from = "String")]
pub(crate) enum Status {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Other(String),
}

impl Status {
    pub(crate) fn is_scheduled(&self) -> bool {
        *self == Status::Scheduled
    }

    pub(crate) fn label(&self) -> &str {
        match self {
            Status::Scheduled => "Scheduled",
            Status::InProgress => "In progress",
            Status::Completed => "Completed",
            Status::Cancelled => "Cancelled",
            Status::Other(s) => s,
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Status {
        match s.as_str() {
            "SCHEDULED" => Status::Scheduled,
            "IN_PROGRESS" => Status::InProgress,
            "COMPLETED" => Status::Completed,
            "CANCELLED" => Status::Cancelled,
            _ => Status::Other(s),
        }
    }
}

/// Appointment as served by the API, before its date fields are resolved
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAppointment {
    id: Option<RecordId>,
    appointment_date: Option<String>,
    start_time: Option<String>,
    appointment_time: Option<String>,
    doctor: Option<Person>,
    doctor_name: Option<String>,
    patient: Option<Person>,
    purpose_of_consultation: Option<String>,
    initial_symptoms: Option<String>,
    meeting_link: Option<String>,
    status: Option<Status>,
}

impl From<RawAppointment> for AppointmentRecord {
    fn from(raw: RawAppointment) -> AppointmentRecord {
        let start_time = non_blank(raw.start_time);
        let when = match non_blank(raw.appointment_date) {
            Some(key) => Some(DateSpec::Explicit(DayKey::verbatim(key))),
            None => start_time.clone().map(DateSpec::Timestamp),
        };
        AppointmentRecord {
            id: raw.id,
            when,
            start_time,
            appointment_time: non_blank(raw.appointment_time),
            doctor: raw.doctor,
            doctor_name: non_blank(raw.doctor_name),
            patient: raw.patient,
            purpose: non_blank(raw.purpose_of_consultation),
            symptoms: non_blank(raw.initial_symptoms),
            meeting_link: non_blank(raw.meeting_link),
            status: raw.status,
        }
    }
}

/// Parse an appointment list.  The API either returns a bare list or wraps it
/// in a response envelope's `data` field.  Records that cannot be read (e.g. a
/// field of the wrong type) are logged and skipped so that one bad record
/// never hides the rest.
pub(crate) fn from_json(s: &str) -> serde_json::Result<Vec<AppointmentRecord>> {
    let items = match serde_json::from_str::<Value>(s)? {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(serde_json::Error::custom(NOT_A_LIST)),
        },
        _ => return Err(serde_json::Error::custom(NOT_A_LIST)),
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match AppointmentRecord::deserialize(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed appointment");
                None
            }
        })
        .collect())
}

pub(crate) fn load(path: &Path) -> anyhow::Result<Vec<AppointmentRecord>> {
    let src = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records =
        from_json(&src).with_context(|| format!("failed to parse {}", path.display()))?;
    let undated = records.iter().filter(|r| r.when.is_none()).count();
    if undated > 0 {
        tracing::warn!(undated, "some appointments carry no date and will not be shown");
    }
    Ok(records)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
