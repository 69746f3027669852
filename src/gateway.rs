use crate::errors::ClientError;
use crate::filters::FilterState;
use crate::models::{AttendanceInput, AttendanceRecord, RecordId, Student, StudentInput};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Which CSV export endpoint to point the browser at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Students,
    Attendance,
}

impl ExportKind {
    pub fn path(self) -> &'static str {
        match self {
            ExportKind::Students => "/api/export/students",
            ExportKind::Attendance => "/api/export/attendance",
        }
    }
}

/// The backend REST surface for students and attendance.
pub trait Gateway: Send + Sync {
    fn list_students(&self) -> impl Future<Output = Result<Vec<Student>, ClientError>> + Send;

    fn create_student(
        &self,
        input: &StudentInput,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn update_student(
        &self,
        id: &RecordId,
        input: &StudentInput,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn delete_student(&self, id: &RecordId) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn list_attendance(
        &self,
        filter: &FilterState,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, ClientError>> + Send;

    fn mark_attendance(
        &self,
        input: &AttendanceInput,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn delete_attendance(
        &self,
        id: &RecordId,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Location of a CSV download. Nothing is fetched or parsed.
    fn export_url(&self, kind: ExportKind) -> String;
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::load(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{collection}/{id}` with the id percent-encoded as a single segment.
    fn record_url(&self, collection: &str, id: &RecordId, what: &str) -> Result<Url, ClientError> {
        let invalid = |detail: String| ClientError::save(format!("Error saving {what}: {detail}"));
        let mut url = Url::parse(&self.url(collection)).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid(format!("{} cannot take a path", self.base_url)))?
            .push(id.as_str());
        Ok(url)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        what: &str,
    ) -> Result<T, ClientError> {
        debug!(path, ?query, "gateway fetch");
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|err| ClientError::load(format!("Error loading {what}: {err}")))?;
        let response = ensure_success(response)
            .map_err(|status| ClientError::load(format!("Error loading {what}: status {status}")))?;
        response
            .json()
            .await
            .map_err(|err| ClientError::load(format!("Error loading {what}: {err}")))
    }

    fn expect_saved(
        result: Result<Response, reqwest::Error>,
        what: &str,
    ) -> Result<(), ClientError> {
        let response =
            result.map_err(|err| ClientError::save(format!("Error saving {what}: {err}")))?;
        ensure_success(response)
            .map(|_| ())
            .map_err(|status| ClientError::save(format!("Error saving {what}: status {status}")))
    }
}

fn ensure_success(response: Response) -> Result<Response, reqwest::StatusCode> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status)
    }
}

impl Gateway for HttpGateway {
    async fn list_students(&self) -> Result<Vec<Student>, ClientError> {
        self.fetch_json("/api/students", &[], "students").await
    }

    async fn create_student(&self, input: &StudentInput) -> Result<(), ClientError> {
        let result = self
            .client
            .post(self.url("/api/students"))
            .json(input)
            .send()
            .await;
        Self::expect_saved(result, "student")
    }

    async fn update_student(&self, id: &RecordId, input: &StudentInput) -> Result<(), ClientError> {
        let result = self
            .client
            .put(self.record_url("/api/students", id, "student")?)
            .json(input)
            .send()
            .await;
        Self::expect_saved(result, "student")
    }

    async fn delete_student(&self, id: &RecordId) -> Result<(), ClientError> {
        let result = self
            .client
            .delete(self.record_url("/api/students", id, "student")?)
            .send()
            .await;
        Self::expect_saved(result, "student")
    }

    async fn list_attendance(&self, filter: &FilterState) -> Result<Vec<AttendanceRecord>, ClientError> {
        self.fetch_json("/api/attendance", &filter.query_pairs(), "attendance")
            .await
    }

    async fn mark_attendance(&self, input: &AttendanceInput) -> Result<(), ClientError> {
        let result = self
            .client
            .post(self.url("/api/attendance"))
            .json(input)
            .send()
            .await;
        Self::expect_saved(result, "attendance")
    }

    async fn delete_attendance(&self, id: &RecordId) -> Result<(), ClientError> {
        let result = self
            .client
            .delete(self.record_url("/api/attendance", id, "attendance")?)
            .send()
            .await;
        Self::expect_saved(result, "attendance")
    }

    fn export_url(&self, kind: ExportKind) -> String {
        self.url(kind.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = HttpGateway::with_client("http://localhost:5000/", Client::new());
        assert_eq!(gateway.base_url(), "http://localhost:5000");
        assert_eq!(
            gateway.export_url(ExportKind::Attendance),
            "http://localhost:5000/api/export/attendance"
        );
    }

    #[test]
    fn record_ids_are_encoded_as_one_segment() {
        let gateway = HttpGateway::with_client("http://localhost:5000/", Client::new());
        let url = gateway
            .record_url("/api/students", &RecordId::new("a/b?c"), "student")
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/students/a%2Fb%3Fc");

        let url = gateway
            .record_url("/api/attendance", &RecordId::new("42"), "attendance")
            .unwrap();
        assert_eq!(url.path(), "/api/attendance/42");
    }
}
