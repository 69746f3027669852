use super::{Page, SYNCED_MESSAGE};
use crate::cache::StateCache;
use crate::filters::FilterState;
use crate::gateway::{ExportKind, Gateway};
use crate::models::{ChangeNotification, RecordId};
use crate::notice::NoticeBoard;
use crate::stats::{AttendanceHistory, ReportSummary, build_report_at, student_history};
use crate::ui;
use crate::view::{Element, Node, Region};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Read-only aggregate view over the unfiltered collections, plus the
/// per-student attendance history.
pub struct ReportsPage<G> {
    gateway: Arc<G>,
    cache: StateCache,
    today: Option<NaiveDate>,
    history_for: Option<RecordId>,
    notices: NoticeBoard,
    region: Region,
}

impl<G: Gateway> ReportsPage<G> {
    pub fn new(gateway: Arc<G>, notice_ttl: Duration) -> Self {
        Self {
            gateway,
            cache: StateCache::new(),
            today: None,
            history_for: None,
            notices: NoticeBoard::new(notice_ttl),
            region: Region::new(),
        }
    }

    /// Pins "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub async fn load(&mut self) {
        self.refresh().await;
        self.render();
    }

    pub fn summary(&self) -> ReportSummary {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        build_report_at(today, self.cache.students(), self.cache.attendance())
    }

    pub fn show_history(&mut self, student_id: RecordId) {
        self.history_for = Some(student_id);
        self.render();
    }

    pub fn clear_history(&mut self) {
        self.history_for = None;
        self.render();
    }

    pub fn history(&self) -> Option<AttendanceHistory> {
        self.history_for
            .as_ref()
            .map(|id| student_history(self.cache.attendance(), id))
    }

    /// Only the history panel, for callers that show it on its own.
    pub fn history_view(&self) -> Option<Node> {
        let history = self.history()?;
        let name = self
            .cache
            .student(&history.student_id)
            .map(|student| student.name.as_str());
        Some(ui::render_history(&history, name))
    }

    /// The history panel as its own document, keeping the current notice.
    pub fn history_document(&self) -> Option<String> {
        let history = self.history_view()?;
        let notice = ui::render_notice(self.notices.current());
        Some(ui::render_document("Attendance History", &[notice, history]))
    }

    /// The download itself is left to the browser; nothing is parsed.
    pub fn export(&mut self, kind: ExportKind) -> String {
        let message = match kind {
            ExportKind::Students => "Downloading students CSV...",
            ExportKind::Attendance => "Downloading attendance CSV...",
        };
        self.notices.success(message);
        self.gateway.export_url(kind)
    }

    async fn refresh(&mut self) {
        let students = self.cache.refresh_students(self.gateway.as_ref()).await;
        let attendance = self
            .cache
            .refresh_attendance(self.gateway.as_ref(), &FilterState::new())
            .await;
        if let Err(err) = students.and(attendance) {
            error!("error loading data: {err}");
            self.notices.error("Error loading data");
        }
    }
}

impl<G: Gateway> Page for ReportsPage<G> {
    fn title(&self) -> &'static str {
        "Reports"
    }

    fn content(&self) -> Node {
        let report = ui::render_report(
            &self.summary(),
            &self.gateway.export_url(ExportKind::Students),
            &self.gateway.export_url(ExportKind::Attendance),
        );
        let page = Element::new("div").class("reports-page").child(report);
        match self.history_view() {
            Some(history) => page.child(history).into(),
            None => page.into(),
        }
    }

    fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    async fn sync(&mut self, _notification: ChangeNotification) {
        self.notices.success(SYNCED_MESSAGE);
        self.refresh().await;
        self.render();
    }
}
