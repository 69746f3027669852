use crate::models::{AttendanceRecord, Student, YearLevel};
use chrono::NaiveDate;

/// Current filter selections. Every field is optional and an empty field
/// places no constraint; set fields combine conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub date: Option<NaiveDate>,
    pub year: Option<YearLevel>,
    pub section: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_year(mut self, year: YearLevel) -> Self {
        self.year = Some(year);
        self
    }

    /// Blank sections are treated as "no constraint".
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = non_blank(section.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.year.is_none() && self.section.is_none()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Query parameters for the server-side attendance fetch, in the fixed
    /// order date, year, section, skipping empty fields.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(year) = &self.year {
            pairs.push(("year", year.as_str().to_string()));
        }
        if let Some(section) = &self.section {
            pairs.push(("section", section.clone()));
        }
        pairs
    }

    pub fn matches_record(&self, record: &AttendanceRecord) -> bool {
        self.date.is_none_or(|date| record.date == date)
            && self.year.as_ref().is_none_or(|year| &record.year == year)
            && self
                .section
                .as_deref()
                .is_none_or(|section| record.section == section)
    }

    /// Students carry no date, so only year and section apply.
    pub fn matches_student(&self, student: &Student) -> bool {
        self.year.as_ref().is_none_or(|year| &student.year == year)
            && self
                .section
                .as_deref()
                .is_none_or(|section| student.section == section)
    }

    pub fn apply_to_students<'a>(&self, students: &'a [Student]) -> Vec<&'a Student> {
        students
            .iter()
            .filter(|student| self.matches_student(student))
            .collect()
    }

    pub fn apply_to_records<'a>(&self, records: &'a [AttendanceRecord]) -> Vec<&'a AttendanceRecord> {
        records
            .iter()
            .filter(|record| self.matches_record(record))
            .collect()
    }
}

/// Case-insensitive name search for the student picker. A blank term matches
/// everyone.
pub fn search_students<'a>(students: &[&'a Student], term: &str) -> Vec<&'a Student> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return students.to_vec();
    }
    students
        .iter()
        .copied()
        .filter(|student| student.name.to_lowercase().contains(&needle))
        .collect()
}

/// Distinct sections in first-seen order, for populating section pickers.
pub fn distinct_sections(students: &[Student]) -> Vec<&str> {
    let mut sections: Vec<&str> = Vec::new();
    for student in students {
        if !sections.contains(&student.section.as_str()) {
            sections.push(&student.section);
        }
    }
    sections
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
