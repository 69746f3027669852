use crate::models::{AttendanceRecord, AttendanceStatus, RecordId, Student, YearLevel};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub excused: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Excused => self.excused += 1,
        }
    }

    pub fn get(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::Late => self.late,
            AttendanceStatus::Excused => self.excused,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late + self.excused
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBand {
    Good,
    Warning,
    Poor,
}

impl RateBand {
    pub fn as_str(self) -> &'static str {
        match self {
            RateBand::Good => "good",
            RateBand::Warning => "warning",
            RateBand::Poor => "poor",
        }
    }
}

/// Thresholds are inclusive lower bounds.
pub fn rate_band(rate: f64) -> RateBand {
    if rate >= 90.0 {
        RateBand::Good
    } else if rate >= 75.0 {
        RateBand::Warning
    } else {
        RateBand::Poor
    }
}

/// (Present + Late) / total as a percentage, one decimal, 0 for no records.
pub fn attendance_rate(counts: &StatusCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    let attended: usize = AttendanceStatus::ALL
        .into_iter()
        .filter(|status| status.counts_as_attended())
        .map(|status| counts.get(status))
        .sum();
    round_one_decimal(attended as f64 / total as f64 * 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceHistory {
    pub student_id: RecordId,
    /// Newest first; records sharing a date keep their snapshot order.
    pub records: Vec<AttendanceRecord>,
    pub counts: StatusCounts,
    pub rate: f64,
}

impl AttendanceHistory {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn band(&self) -> RateBand {
        rate_band(self.rate)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn student_history(records: &[AttendanceRecord], student_id: &RecordId) -> AttendanceHistory {
    let mut own: Vec<AttendanceRecord> = records
        .iter()
        .filter(|record| &record.student_id == student_id)
        .cloned()
        .collect();
    own.sort_by(|a, b| b.date.cmp(&a.date));

    let mut counts = StatusCounts::default();
    for record in &own {
        counts.record(record.status);
    }

    AttendanceHistory {
        student_id: student_id.clone(),
        rate: attendance_rate(&counts),
        records: own,
        counts,
    }
}

#[derive(Debug, Clone)]
pub struct SectionGroup<'a> {
    pub section: &'a str,
    pub students: Vec<&'a Student>,
}

#[derive(Debug, Clone)]
pub struct YearGroup<'a> {
    pub year: &'a YearLevel,
    pub sections: Vec<SectionGroup<'a>>,
}

impl YearGroup<'_> {
    pub fn student_count(&self) -> usize {
        self.sections.iter().map(|group| group.students.len()).sum()
    }
}

/// Partitions students by year level in canonical order, unrecognized levels
/// last in first-seen order, then by section in first-seen order.
pub fn group_by_year_and_section<'a>(students: &[&'a Student]) -> Vec<YearGroup<'a>> {
    let mut years: Vec<YearGroup<'a>> = Vec::new();
    for &student in students {
        let position = match years.iter().position(|group| *group.year == student.year) {
            Some(position) => position,
            None => {
                years.push(YearGroup {
                    year: &student.year,
                    sections: Vec::new(),
                });
                years.len() - 1
            }
        };
        let sections = &mut years[position].sections;
        match sections
            .iter_mut()
            .find(|group| group.section == student.section)
        {
            Some(group) => group.students.push(student),
            None => sections.push(SectionGroup {
                section: &student.section,
                students: vec![student],
            }),
        }
    }
    years.sort_by_key(|group| group.year.canonical_rank().unwrap_or(usize::MAX));
    years
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub present: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub today: NaiveDate,
    pub total_students: usize,
    pub total_records: usize,
    pub today_counts: StatusCounts,
    pub year_distribution: Vec<DistributionEntry>,
    pub section_distribution: Vec<DistributionEntry>,
    pub weekly_trend: Vec<TrendPoint>,
}

pub fn build_report_at(
    today: NaiveDate,
    students: &[Student],
    attendance: &[AttendanceRecord],
) -> ReportSummary {
    const TREND_DAYS: i64 = 7;

    let mut today_counts = StatusCounts::default();
    for record in attendance.iter().filter(|record| record.date == today) {
        today_counts.record(record.status);
    }

    let all: Vec<&Student> = students.iter().collect();
    let year_distribution = group_by_year_and_section(&all)
        .iter()
        .map(|group| distribution_entry(group.year.as_str(), group.student_count(), students.len()))
        .collect();

    let mut section_counts: Vec<(&str, usize)> = Vec::new();
    for student in students {
        match section_counts
            .iter_mut()
            .find(|(section, _)| *section == student.section)
        {
            Some((_, count)) => *count += 1,
            None => section_counts.push((student.section.as_str(), 1)),
        }
    }
    section_counts.sort_by(|a, b| b.1.cmp(&a.1));
    let section_distribution = section_counts
        .into_iter()
        .map(|(section, count)| distribution_entry(section, count, students.len()))
        .collect();

    let mut weekly_trend = Vec::with_capacity(TREND_DAYS as usize);
    for offset in (0..TREND_DAYS).rev() {
        let date = today - Duration::days(offset);
        let present = attendance
            .iter()
            .filter(|record| record.date == date && record.status == AttendanceStatus::Present)
            .count();
        weekly_trend.push(TrendPoint { date, present });
    }

    ReportSummary {
        today,
        total_students: students.len(),
        total_records: attendance.len(),
        today_counts,
        year_distribution,
        section_distribution,
        weekly_trend,
    }
}

fn distribution_entry(label: &str, count: usize, total: usize) -> DistributionEntry {
    let percentage = if total == 0 {
        0.0
    } else {
        round_one_decimal(count as f64 / total as f64 * 100.0)
    };
    DistributionEntry {
        label: label.to_string(),
        count,
        percentage,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
