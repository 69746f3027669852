use crate::errors::ClientError;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned identifier. The backend emits these as JSON numbers on
/// create and as strings when listing, so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => RecordId(text),
            Raw::Number(number) => RecordId(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum YearLevel {
    First,
    Second,
    Third,
    Fourth,
    Irregular,
    /// Anything the backend sends outside the canonical set, kept verbatim.
    Other(String),
}

impl YearLevel {
    pub const CANONICAL: [YearLevel; 5] = [
        YearLevel::First,
        YearLevel::Second,
        YearLevel::Third,
        YearLevel::Fourth,
        YearLevel::Irregular,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            YearLevel::First => "1st Year",
            YearLevel::Second => "2nd Year",
            YearLevel::Third => "3rd Year",
            YearLevel::Fourth => "4th Year",
            YearLevel::Irregular => "Irregular",
            YearLevel::Other(raw) => raw,
        }
    }

    /// Position in the canonical display order, `None` for unrecognized levels.
    pub fn canonical_rank(&self) -> Option<usize> {
        match self {
            YearLevel::First => Some(0),
            YearLevel::Second => Some(1),
            YearLevel::Third => Some(2),
            YearLevel::Fourth => Some(3),
            YearLevel::Irregular => Some(4),
            YearLevel::Other(_) => None,
        }
    }
}

impl From<&str> for YearLevel {
    fn from(value: &str) -> Self {
        match value {
            "1st Year" => YearLevel::First,
            "2nd Year" => YearLevel::Second,
            "3rd Year" => YearLevel::Third,
            "4th Year" => YearLevel::Fourth,
            "Irregular" => YearLevel::Irregular,
            other => YearLevel::Other(other.to_string()),
        }
    }
}

impl From<String> for YearLevel {
    fn from(value: String) -> Self {
        YearLevel::from(value.as_str())
    }
}

impl From<YearLevel> for String {
    fn from(value: YearLevel) -> Self {
        match value {
            YearLevel::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for YearLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 4] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::Excused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Excused => "Excused",
        }
    }

    /// Late arrivals still count towards the attendance rate.
    pub fn counts_as_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub year: YearLevel,
    pub section: String,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

/// Body of the create and update student requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInput {
    pub name: String,
    pub email: String,
    pub year: YearLevel,
    pub section: String,
}

impl StudentInput {
    /// Checked before any request is sent; a failure blocks the save.
    pub fn validate(&self) -> Result<(), ClientError> {
        let missing: Vec<&str> = [
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("year", self.year.as_str()),
            ("section", self.section.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientError::validation(format!(
                "Please fill in {}",
                missing.join(", ")
            )))
        }
    }
}

/// Denormalized name, year and section are copied at mark time and are not
/// kept in sync with later edits to the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    pub student_name: String,
    pub year: YearLevel,
    pub section: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceInput {
    pub student_id: RecordId,
    pub student_name: String,
    pub year: YearLevel,
    pub section: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: String,
}

impl AttendanceInput {
    pub fn for_student(student: &Student, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            year: student.year.clone(),
            section: student.section.clone(),
            date,
            status,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Student,
    Attendance,
}

/// Cross-context signal value. Only lives long enough to be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChangeNotification {
    pub fn now(kind: ChangeKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|notes| !notes.trim().is_empty()))
}

mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, FORMAT) {
            return Ok(Some(at));
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|at| Some(at.naive_utc()))
            .map_err(serde::de::Error::custom)
    }
}
