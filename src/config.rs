use crate::errors::ClientError;
use crate::filters::FilterState;
use crate::models::{RecordId, YearLevel};
use crate::notice::DEFAULT_NOTICE_TTL;
use crate::notifier::{DEFAULT_CLEAR_AFTER, DEFAULT_SYNC_KEY};
use chrono::NaiveDate;
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Students,
    Attendance,
    Reports,
    History,
}

impl View {
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "students" => Ok(View::Students),
            "attendance" => Ok(View::Attendance),
            "reports" => Ok(View::Reports),
            "history" => Ok(View::History),
            other => Err(ClientError::validation(format!(
                "unknown view '{other}', expected students, attendance, reports or history"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub sync_key: String,
    pub sync_clear_after: Duration,
    pub notice_ttl: Duration,
    pub http_timeout: Duration,
    pub view: View,
    pub student_id: Option<RecordId>,
    pub filter: FilterState,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            sync_key: DEFAULT_SYNC_KEY.to_string(),
            sync_clear_after: DEFAULT_CLEAR_AFTER,
            notice_ttl: DEFAULT_NOTICE_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            view: View::Students,
            student_id: None,
            filter: FilterState::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any variable source; unset and blank values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let view = match get("ATTENDANCE_VIEW") {
            Some(raw) => View::parse(&raw)?,
            None => defaults.view,
        };
        let student_id = get("ATTENDANCE_STUDENT_ID").map(|raw| RecordId::new(raw.trim()));
        if view == View::History && student_id.is_none() {
            return Err(ClientError::validation(
                "ATTENDANCE_STUDENT_ID is required for the history view",
            ));
        }

        let mut filter = FilterState::new();
        if let Some(raw) = get("ATTENDANCE_FILTER_DATE") {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
                ClientError::validation(format!("ATTENDANCE_FILTER_DATE must be YYYY-MM-DD: {err}"))
            })?;
            filter = filter.with_date(date);
        }
        if let Some(raw) = get("ATTENDANCE_FILTER_YEAR") {
            filter = filter.with_year(YearLevel::from(raw.trim()));
        }
        if let Some(raw) = get("ATTENDANCE_FILTER_SECTION") {
            filter = filter.with_section(raw);
        }

        Ok(Self {
            api_url: get("ATTENDANCE_API_URL").unwrap_or(defaults.api_url),
            sync_key: get("ATTENDANCE_SYNC_KEY").unwrap_or(defaults.sync_key),
            sync_clear_after: millis(&get, "ATTENDANCE_SYNC_CLEAR_MS", defaults.sync_clear_after),
            notice_ttl: millis(&get, "ATTENDANCE_NOTICE_MS", defaults.notice_ttl),
            http_timeout: millis(&get, "ATTENDANCE_HTTP_TIMEOUT_MS", defaults.http_timeout),
            view,
            student_id,
            filter,
        })
    }
}

fn millis(get: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    match get(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) => Duration::from_millis(value),
            Err(err) => {
                warn!("ignoring {key}={raw}: {err}");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig, ClientError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.sync_key, "bsit_data_updated");
        assert_eq!(config.sync_clear_after, Duration::from_millis(100));
        assert_eq!(config.notice_ttl, Duration::from_millis(3000));
        assert_eq!(config.view, View::Students);
        assert!(config.filter.is_empty());
    }

    #[test]
    fn filters_and_view_are_read() {
        let config = config(&[
            ("ATTENDANCE_VIEW", "Attendance"),
            ("ATTENDANCE_FILTER_DATE", "2024-03-01"),
            ("ATTENDANCE_FILTER_YEAR", "2nd Year"),
            ("ATTENDANCE_FILTER_SECTION", " B "),
            ("ATTENDANCE_SYNC_CLEAR_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.view, View::Attendance);
        assert_eq!(
            config.filter,
            FilterState::new()
                .with_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
                .with_year(YearLevel::Second)
                .with_section("B")
        );
        assert_eq!(config.sync_clear_after, Duration::from_millis(250));
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let config = config(&[("ATTENDANCE_NOTICE_MS", "soon")]).unwrap();
        assert_eq!(config.notice_ttl, DEFAULT_NOTICE_TTL);
    }

    #[test]
    fn history_requires_student() {
        let err = config(&[("ATTENDANCE_VIEW", "history")]).unwrap_err();
        assert!(err.is_validation());
        let ok = config(&[("ATTENDANCE_VIEW", "history"), ("ATTENDANCE_STUDENT_ID", "S123")]).unwrap();
        assert_eq!(ok.student_id, Some(RecordId::new("S123")));
    }

    #[test]
    fn unknown_view_is_rejected() {
        assert!(config(&[("ATTENDANCE_VIEW", "dashboard")]).is_err());
    }
}
