use crate::filters::FilterState;
use crate::models::{AttendanceRecord, AttendanceStatus, Student, YearLevel};
use crate::notice::Notice;
use crate::stats::{AttendanceHistory, DistributionEntry, ReportSummary, YearGroup, group_by_year_and_section};
use crate::view::{Element, Node};

/// Wraps rendered regions in the page shell.
pub fn render_document(title: &str, regions: &[Node]) -> String {
    let body: String = regions.iter().map(Node::to_html).collect();
    PAGE_HTML
        .replace("{{TITLE}}", &crate::view::escape(title))
        .replace("{{BODY}}", &body)
}

pub fn render_notice(notice: Option<&Notice>) -> Node {
    match notice {
        Some(notice) => Element::new("div")
            .id("notification")
            .class(format!("notification {}", notice.level.as_str()))
            .attr("role", "status")
            .child(Element::new("span").class("notification-message").text(&notice.message))
            .into(),
        None => Element::new("div")
            .id("notification")
            .class("notification")
            .attr("hidden", "hidden")
            .into(),
    }
}

pub fn empty_state(message: &str) -> Node {
    Element::new("div")
        .class("empty-state")
        .child(Element::new("div").class("empty-state-text").text(message))
        .into()
}

/// Students grouped by year level, then section.
pub fn render_roster(students: &[&Student]) -> Node {
    let container = Element::new("div").id("students-by-section");
    if students.is_empty() {
        return container.child(empty_state("No students found")).into();
    }
    container
        .children(group_by_year_and_section(students).iter().map(render_year_group))
        .into()
}

fn render_year_group(group: &YearGroup<'_>) -> Node {
    let header = Element::new("div")
        .class("card-header")
        .child(Element::new("h3").class("card-title").text(group.year.as_str()))
        .child(count_badge("badge badge-secondary", group.student_count()));

    let sections = group.sections.iter().map(|section| {
        Element::new("div")
            .class("section-block")
            .attr("data-section", section.section)
            .child(
                Element::new("div")
                    .class("section-header")
                    .child(Element::new("h4").text(format!("Section {}", section.section)))
                    .child(count_badge("badge badge-info", section.students.len())),
            )
            .child(student_table(&section.students))
    });

    Element::new("div")
        .class("content-card")
        .attr("data-year", group.year.as_str())
        .child(header)
        .child(Element::new("div").class("card-body").children(sections))
        .into()
}

fn count_badge(class: &str, count: usize) -> Element {
    Element::new("span")
        .class(class)
        .text(format!("{count} students"))
}

fn student_table(students: &[&Student]) -> Element {
    let head = Element::new("thead").child(header_row(&["ID", "Name", "Email", "Created At", "Actions"]));
    let rows = students.iter().map(|student| {
        let created = student
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        Element::new("tr")
            .attr("data-id", student.id.as_str())
            .child(Element::new("td").child(id_badge(student.id.as_str())))
            .child(Element::new("td").class("name").text(&student.name))
            .child(Element::new("td").text(&student.email))
            .child(Element::new("td").text(created))
            .child(
                Element::new("td")
                    .class("actions")
                    .child(action_button("edit", "btn btn-edit btn-sm", student.id.as_str(), "Edit"))
                    .child(action_button("delete", "btn btn-danger btn-sm", student.id.as_str(), "Delete")),
            )
    });
    Element::new("table")
        .child(head)
        .child(Element::new("tbody").children(rows))
}

fn header_row(labels: &[&str]) -> Element {
    Element::new("tr").children(labels.iter().map(|label| Element::new("th").text(*label)))
}

fn id_badge(id: &str) -> Element {
    Element::new("span")
        .class("badge badge-secondary")
        .text(format!("#{id}"))
}

fn action_button(action: &str, class: &str, id: &str, label: &str) -> Element {
    Element::new("button")
        .class(class)
        .attr("type", "button")
        .attr("data-action", action)
        .attr("data-id", id)
        .text(label)
}

pub fn status_badge_class(status: AttendanceStatus) -> &'static str {
    match status {
        AttendanceStatus::Present => "badge badge-success",
        AttendanceStatus::Absent => "badge badge-danger",
        AttendanceStatus::Late => "badge badge-warning",
        AttendanceStatus::Excused => "badge badge-info",
    }
}

fn status_badge(status: AttendanceStatus) -> Element {
    Element::new("span")
        .class(status_badge_class(status))
        .text(status.as_str())
}

pub fn render_attendance_table(records: &[AttendanceRecord]) -> Node {
    let count = Element::new("span")
        .id("record-count")
        .text(format!("{} records", records.len()));
    let container = Element::new("div").id("attendance").child(count);
    if records.is_empty() {
        return container
            .child(empty_state("No attendance records found"))
            .into();
    }

    let head = Element::new("thead").child(header_row(&[
        "ID", "Student", "Year", "Section", "Date", "Status", "Notes", "Actions",
    ]));
    let rows = records.iter().map(|record| {
        Element::new("tr")
            .attr("data-id", record.id.as_str())
            .child(Element::new("td").child(id_badge(record.id.as_str())))
            .child(Element::new("td").class("name").text(&record.student_name))
            .child(Element::new("td").text(record.year.as_str()))
            .child(Element::new("td").text(&record.section))
            .child(Element::new("td").text(record.date.format("%Y-%m-%d").to_string()))
            .child(Element::new("td").child(status_badge(record.status)))
            .child(Element::new("td").text(record.notes.as_deref().unwrap_or("-")))
            .child(
                Element::new("td")
                    .class("actions")
                    .child(action_button("delete", "btn btn-danger btn-sm", record.id.as_str(), "Delete")),
            )
    });
    container
        .child(
            Element::new("table")
                .child(head)
                .child(Element::new("tbody").children(rows)),
        )
        .into()
}

/// Student picker used when marking attendance.
pub fn render_student_options(students: &[&Student], selected: Option<&str>) -> Node {
    let placeholder = Element::new("option")
        .attr("value", "")
        .text("-- Select Student --");
    let options = students.iter().map(|student| {
        let option = Element::new("option")
            .attr("value", student.id.as_str())
            .attr("data-name", &student.name)
            .attr("data-year", student.year.as_str())
            .attr("data-section", &student.section);
        let option = if selected == Some(student.id.as_str()) {
            option.attr("selected", "selected")
        } else {
            option
        };
        option.text(format!(
            "{} - {} {}",
            student.name,
            student.year.as_str(),
            student.section
        ))
    });
    Element::new("select")
        .id("quick-student")
        .child(placeholder)
        .children(options)
        .into()
}

/// Year and section selects reflecting the active filters.
pub fn render_filter_bar(id: &str, filters: &FilterState, sections: &[&str]) -> Node {
    let selected_year = filters.year.as_ref().map(YearLevel::as_str);
    let years = YearLevel::CANONICAL
        .into_iter()
        .map(|year| option(year.as_str(), year.as_str(), selected_year));
    let selected_section = filters.section.as_deref();
    let sections = sections
        .iter()
        .map(|section| option(section, &format!("Section {section}"), selected_section));

    Element::new("div")
        .id(id)
        .class("filter-bar")
        .child(
            Element::new("select")
                .attr("name", "year")
                .child(option("", "All Years", selected_year))
                .children(years),
        )
        .child(
            Element::new("select")
                .attr("name", "section")
                .child(option("", "All Sections", selected_section))
                .children(sections),
        )
        .into()
}

fn option(value: &str, label: &str, selected: Option<&str>) -> Element {
    let option = Element::new("option").attr("value", value);
    let option = if selected.unwrap_or("") == value {
        option.attr("selected", "selected")
    } else {
        option
    };
    option.text(label)
}

pub fn render_history(history: &AttendanceHistory, student_name: Option<&str>) -> Node {
    let title = match student_name {
        Some(name) => format!("Attendance history: {name}"),
        None => format!("Attendance history: #{}", history.student_id),
    };
    let container = Element::new("div")
        .id("attendance-history")
        .child(Element::new("h3").text(title));
    if history.is_empty() {
        return container
            .child(empty_state("No attendance history for this student"))
            .into();
    }

    let mut summary = Element::new("div")
        .class("history-summary")
        .child(stat("Total", history.total().to_string()));
    for status in AttendanceStatus::ALL {
        summary = summary.child(stat(status.as_str(), history.counts.get(status).to_string()));
    }
    let rate = Element::new("div")
        .class(format!("stat rate rate-{}", history.band().as_str()))
        .child(Element::new("span").class("label").text("Attendance rate"))
        .child(Element::new("span").class("value").text(format!("{:.1}%", history.rate)));
    summary = summary.child(rate);

    let rows = history.records.iter().map(|record| {
        Element::new("tr")
            .child(Element::new("td").text(record.date.format("%Y-%m-%d").to_string()))
            .child(Element::new("td").child(status_badge(record.status)))
            .child(Element::new("td").text(record.notes.as_deref().unwrap_or("-")))
    });
    container
        .child(summary)
        .child(
            Element::new("table")
                .child(Element::new("thead").child(header_row(&["Date", "Status", "Notes"])))
                .child(Element::new("tbody").children(rows)),
        )
        .into()
}

fn stat(label: &str, value: String) -> Element {
    Element::new("div")
        .class("stat")
        .child(Element::new("span").class("label").text(label))
        .child(Element::new("span").class("value").text(value))
}

pub fn render_report(summary: &ReportSummary, students_export: &str, attendance_export: &str) -> Node {
    let totals = Element::new("div")
        .class("panel")
        .child(stat("Total students", summary.total_students.to_string()).id("total-students"))
        .child(stat("Total records", summary.total_records.to_string()).id("total-records"))
        .child(stat("Present today", summary.today_counts.present.to_string()).id("present-today"))
        .child(stat("Absent today", summary.today_counts.absent.to_string()).id("absent-today"))
        .child(stat("Late today", summary.today_counts.late.to_string()).id("late-today"));

    let trend = Element::new("ol").id("weekly-trend").children(summary.weekly_trend.iter().map(|point| {
        Element::new("li")
            .attr("data-date", point.date.format("%Y-%m-%d").to_string())
            .text(format!("{}: {} present", point.date.format("%m-%d"), point.present))
    }));

    let exports = Element::new("div")
        .class("exports")
        .child(
            Element::new("a")
                .class("btn")
                .attr("href", students_export)
                .text("Export students CSV"),
        )
        .child(
            Element::new("a")
                .class("btn")
                .attr("href", attendance_export)
                .text("Export attendance CSV"),
        );

    Element::new("div")
        .id("reports")
        .child(totals)
        .child(distribution("year-stats", &summary.year_distribution, |label| label.to_string()))
        .child(distribution("section-stats", &summary.section_distribution, |label| {
            format!("Section {label}")
        }))
        .child(trend)
        .child(exports)
        .into()
}

fn distribution(id: &str, entries: &[DistributionEntry], label: impl Fn(&str) -> String) -> Node {
    let container = Element::new("div").id(id);
    if entries.is_empty() {
        return container.child(empty_state("No student data available")).into();
    }
    container
        .children(entries.iter().map(|entry| {
            Element::new("div")
                .class("distribution-row")
                .child(Element::new("span").class("label").text(label(&entry.label)))
                .child(
                    Element::new("span")
                        .class("value")
                        .text(format!("{} students ({:.1}%)", entry.count, entry.percentage)),
                )
                .child(
                    Element::new("div")
                        .class("bar")
                        .attr("style", format!("width: {:.1}%", entry.percentage)),
                )
        }))
        .into()
}

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
</head>
<body>
  <main class="app">
{{BODY}}
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordId, YearLevel};
    use crate::stats::student_history;
    use chrono::NaiveDate;

    fn student(id: &str, name: &str, year: &str, section: &str) -> Student {
        Student {
            id: RecordId::new(id),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            year: YearLevel::from(year),
            section: section.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn empty_roster_renders_placeholder() {
        let html = render_roster(&[]).to_html();
        assert!(html.contains("No students found"));
        assert!(!html.contains("<table"));
    }

    #[test]
    fn roster_orders_year_cards_canonically() {
        let students = [
            student("1", "Zed", "Alumni", "A"),
            student("2", "Amy", "4th Year", "B"),
            student("3", "Bo", "1st Year", "A"),
        ];
        let refs: Vec<&Student> = students.iter().collect();
        let html = render_roster(&refs).to_html();
        let first = html.find("data-year=\"1st Year\"").unwrap();
        let fourth = html.find("data-year=\"4th Year\"").unwrap();
        let other = html.find("data-year=\"Alumni\"").unwrap();
        assert!(first < fourth && fourth < other);
        assert!(html.contains("Section A"));
    }

    #[test]
    fn attendance_rows_show_status_badge_and_dash_for_missing_notes() {
        let record = AttendanceRecord {
            id: RecordId::new("9"),
            student_id: RecordId::new("1"),
            student_name: "Bo <b>".to_string(),
            year: YearLevel::First,
            section: "A".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: AttendanceStatus::Late,
            notes: None,
        };
        let html = render_attendance_table(&[record]).to_html();
        assert!(html.contains("1 records"));
        assert!(html.contains("<span class=\"badge badge-warning\">Late</span>"));
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains("Bo &lt;b&gt;"));
    }

    #[test]
    fn picker_lists_placeholder_then_students() {
        let students = [student("4", "Cy", "2nd Year", "C")];
        let refs: Vec<&Student> = students.iter().collect();
        let node = render_student_options(&refs, Some("4"));
        let html = node.to_html();
        assert!(html.starts_with("<select id=\"quick-student\"><option value=\"\">-- Select Student --</option>"));
        assert!(html.contains("selected=\"selected\""));
        assert!(node.text_content().contains("Cy - 2nd Year C"));
    }

    #[test]
    fn filter_bar_marks_active_choices() {
        let filters = FilterState::new().with_year(YearLevel::Third).with_section("B");
        let html = render_filter_bar("student-filters", &filters, &["A", "B"]).to_html();
        assert!(html.contains("<option value=\"3rd Year\" selected=\"selected\">3rd Year</option>"));
        assert!(html.contains("<option value=\"B\" selected=\"selected\">Section B</option>"));
        assert!(html.contains("<option value=\"\">All Years</option>"));

        let html = render_filter_bar("student-filters", &FilterState::new(), &[]).to_html();
        assert!(html.contains("<option value=\"\" selected=\"selected\">All Sections</option>"));
    }

    #[test]
    fn empty_history_renders_placeholder() {
        let history = student_history(&[], &RecordId::new("S123"));
        let html = render_history(&history, None).to_html();
        assert!(html.contains("No attendance history for this student"));
        assert!(html.contains("#S123"));
    }

    #[test]
    fn document_embeds_regions() {
        let page = render_document("Students & Sections", &[empty_state("Nothing here")]);
        assert!(page.contains("<title>Students &amp; Sections</title>"));
        assert!(page.contains("Nothing here"));
    }
}
