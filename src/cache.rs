use crate::errors::ClientError;
use crate::filters::FilterState;
use crate::gateway::Gateway;
use crate::models::{AttendanceRecord, RecordId, Student};
use tracing::debug;

/// Per-page snapshot of the backend collections.
///
/// Each refresh replaces a collection wholesale. A failed refresh leaves the
/// previous snapshot in place; nothing is ever patched locally.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn student(&self, id: &RecordId) -> Option<&Student> {
        self.students.iter().find(|student| &student.id == id)
    }

    pub async fn refresh_students<G: Gateway>(&mut self, gateway: &G) -> Result<usize, ClientError> {
        let students = gateway.list_students().await?;
        debug!(count = students.len(), "students snapshot replaced");
        self.students = students;
        Ok(self.students.len())
    }

    pub async fn refresh_attendance<G: Gateway>(
        &mut self,
        gateway: &G,
        filter: &FilterState,
    ) -> Result<usize, ClientError> {
        let records = gateway.list_attendance(filter).await?;
        debug!(count = records.len(), ?filter, "attendance snapshot replaced");
        self.attendance = records;
        Ok(self.attendance.len())
    }
}
