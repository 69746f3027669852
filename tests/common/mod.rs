#![allow(dead_code)]

use attendance_client::errors::ClientError;
use attendance_client::filters::FilterState;
use attendance_client::gateway::{ExportKind, Gateway};
use attendance_client::models::{
    AttendanceInput, AttendanceRecord, RecordId, Student, StudentInput, YearLevel,
};
use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Backend stand-in shared by every page in a test.
#[derive(Default)]
pub struct MemoryGateway {
    data: Mutex<Tables>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
}

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    attendance: Vec<AttendanceRecord>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId::new(self.next_id.to_string())
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_student(&self, id: &str, name: &str, year: &str, section: &str) -> Student {
        let student = Student {
            id: RecordId::new(id),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            year: YearLevel::from(year),
            section: section.to_string(),
            created_at: Some(Local::now().naive_local()),
        };
        self.data.lock().await.students.push(student.clone());
        student
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub async fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.data.lock().await.attendance.clone()
    }

    fn check(&self, what: &str, save: bool) -> Result<(), ClientError> {
        if !self.failing.load(Ordering::SeqCst) {
            return Ok(());
        }
        if save {
            Err(ClientError::save(format!("Error saving {what}: status 500")))
        } else {
            Err(ClientError::load(format!("Error loading {what}: status 500")))
        }
    }
}

impl Gateway for MemoryGateway {
    async fn list_students(&self) -> Result<Vec<Student>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check("students", false)?;
        Ok(self.data.lock().await.students.clone())
    }

    async fn create_student(&self, input: &StudentInput) -> Result<(), ClientError> {
        self.check("student", true)?;
        let mut data = self.data.lock().await;
        let id = data.next_id();
        data.students.push(Student {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            year: input.year.clone(),
            section: input.section.clone(),
            created_at: Some(Local::now().naive_local()),
        });
        Ok(())
    }

    async fn update_student(&self, id: &RecordId, input: &StudentInput) -> Result<(), ClientError> {
        self.check("student", true)?;
        let mut data = self.data.lock().await;
        let Some(student) = data.students.iter_mut().find(|s| &s.id == id) else {
            return Err(ClientError::save("Error saving student: status 404"));
        };
        student.name = input.name.clone();
        student.email = input.email.clone();
        student.year = input.year.clone();
        student.section = input.section.clone();
        Ok(())
    }

    async fn delete_student(&self, id: &RecordId) -> Result<(), ClientError> {
        self.check("student", true)?;
        self.data.lock().await.students.retain(|s| &s.id != id);
        Ok(())
    }

    async fn list_attendance(&self, filter: &FilterState) -> Result<Vec<AttendanceRecord>, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check("attendance", false)?;
        let data = self.data.lock().await;
        Ok(filter
            .apply_to_records(&data.attendance)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn mark_attendance(&self, input: &AttendanceInput) -> Result<(), ClientError> {
        self.check("attendance", true)?;
        let mut data = self.data.lock().await;
        let id = data.next_id();
        data.attendance.push(AttendanceRecord {
            id,
            student_id: input.student_id.clone(),
            student_name: input.student_name.clone(),
            year: input.year.clone(),
            section: input.section.clone(),
            date: input.date,
            status: input.status,
            notes: Some(input.notes.clone()).filter(|notes| !notes.is_empty()),
        });
        Ok(())
    }

    async fn delete_attendance(&self, id: &RecordId) -> Result<(), ClientError> {
        self.check("attendance", true)?;
        self.data.lock().await.attendance.retain(|r| &r.id != id);
        Ok(())
    }

    fn export_url(&self, kind: ExportKind) -> String {
        format!("memory://{}", kind.path())
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
