use super::{Page, SYNCED_MESSAGE};
use crate::cache::StateCache;
use crate::errors::ClientError;
use crate::filters::{FilterState, distinct_sections, search_students};
use crate::gateway::Gateway;
use crate::models::{
    AttendanceInput, AttendanceStatus, ChangeKind, ChangeNotification, RecordId, Student,
};
use crate::notice::NoticeBoard;
use crate::notifier::Notifier;
use crate::stats::{AttendanceHistory, student_history};
use crate::ui;
use crate::view::{Element, Node, Region};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Attendance marking and the filtered attendance table.
///
/// The table is filtered server-side; the student picker is filtered
/// client-side by its own year/section selection and a name search.
pub struct AttendancePage<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    cache: StateCache,
    filters: FilterState,
    picker_filters: FilterState,
    picker_search: String,
    selected: Option<RecordId>,
    mark_date: NaiveDate,
    notices: NoticeBoard,
    region: Region,
}

impl<G: Gateway> AttendancePage<G> {
    pub fn new(gateway: Arc<G>, notifier: Notifier, notice_ttl: Duration) -> Self {
        Self {
            gateway,
            notifier,
            cache: StateCache::new(),
            filters: FilterState::new(),
            picker_filters: FilterState::new(),
            picker_search: String::new(),
            selected: None,
            mark_date: Local::now().date_naive(),
            notices: NoticeBoard::new(notice_ttl),
            region: Region::new(),
        }
    }

    /// Initial filters, applied by the first `load`.
    pub fn with_filters(mut self, filters: FilterState) -> Self {
        self.filters = filters;
        self
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn selected(&self) -> Option<&RecordId> {
        self.selected.as_ref()
    }

    pub fn mark_date(&self) -> NaiveDate {
        self.mark_date
    }

    pub async fn load(&mut self) {
        self.refresh_students().await;
        self.reload_attendance().await;
        self.render();
    }

    /// Replaces the table filters and fetches the matching records.
    pub async fn apply_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.reload_attendance().await;
        self.render();
    }

    /// Date-only lookup; a missing date is rejected before any request.
    pub async fn filter_by_date(&mut self, date: Option<NaiveDate>) -> Result<(), ClientError> {
        let Some(date) = date else {
            let err = ClientError::validation("Please select a date");
            self.notices.error(err.message.clone());
            self.render();
            return Err(err);
        };
        self.apply_filters(FilterState::new().with_date(date)).await;
        Ok(())
    }

    pub async fn reset_filters(&mut self) {
        self.filters.reset();
        self.reload_attendance().await;
        self.render();
    }

    pub fn set_picker_filters(&mut self, filters: FilterState) {
        self.picker_filters = filters;
        self.render();
    }

    pub fn set_picker_search(&mut self, term: impl Into<String>) {
        self.picker_search = term.into();
        self.render();
    }

    pub fn picker_students(&self) -> Vec<&Student> {
        let filtered = self.picker_filters.apply_to_students(self.cache.students());
        search_students(&filtered, &self.picker_search)
    }

    pub fn select_student(&mut self, id: Option<RecordId>) {
        self.selected = id;
        self.render();
    }

    pub fn set_mark_date(&mut self, date: NaiveDate) {
        self.mark_date = date;
    }

    pub async fn quick_mark(&mut self, status: AttendanceStatus) -> Result<(), ClientError> {
        self.mark_selected(status, "").await
    }

    /// Marks the selected student. Name, year and section are copied from the
    /// student snapshot into the record.
    pub async fn mark_selected(
        &mut self,
        status: AttendanceStatus,
        notes: &str,
    ) -> Result<(), ClientError> {
        let student = self
            .selected
            .as_ref()
            .and_then(|id| self.cache.student(id));
        let Some(student) = student else {
            let err = ClientError::validation("Please select a student");
            self.notices.error(err.message.clone());
            self.render();
            return Err(err);
        };

        let input = AttendanceInput::for_student(student, self.mark_date, status).with_notes(notes);
        if let Err(err) = self.gateway.mark_attendance(&input).await {
            error!("error marking attendance: {err}");
            self.notices.error("Error marking attendance");
            self.render();
            return Err(err);
        }

        self.notices
            .success(format!("Marked {} as {}", input.student_name, status));
        self.selected = None;
        self.after_mutation().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: &RecordId) -> Result<(), ClientError> {
        if let Err(err) = self.gateway.delete_attendance(id).await {
            error!("error deleting attendance: {err}");
            self.notices.error("Error deleting attendance");
            self.render();
            return Err(err);
        }

        self.notices
            .success("Attendance record deleted successfully");
        self.after_mutation().await;
        Ok(())
    }

    /// History over the current snapshot, which may be filtered.
    pub fn history(&self, student_id: &RecordId) -> AttendanceHistory {
        student_history(self.cache.attendance(), student_id)
    }

    async fn after_mutation(&mut self) {
        self.reload_attendance().await;
        self.render();
        self.notifier.broadcast(ChangeKind::Attendance).await;
    }

    async fn refresh_students(&mut self) {
        if let Err(err) = self.cache.refresh_students(self.gateway.as_ref()).await {
            error!("error loading students: {err}");
            self.notices.error("Error loading students");
        }
    }

    async fn reload_attendance(&mut self) {
        let filters = self.filters.clone();
        if let Err(err) = self
            .cache
            .refresh_attendance(self.gateway.as_ref(), &filters)
            .await
        {
            error!("error loading attendance: {err}");
            self.notices.error("Error loading attendance");
        }
    }
}

impl<G: Gateway> Page for AttendancePage<G> {
    fn title(&self) -> &'static str {
        "Attendance"
    }

    fn content(&self) -> Node {
        let selected = self.selected.as_ref().map(RecordId::as_str);
        let sections = distinct_sections(self.cache.students());
        Element::new("div")
            .class("attendance-page")
            .child(ui::render_filter_bar("picker-filters", &self.picker_filters, &sections))
            .child(ui::render_student_options(&self.picker_students(), selected))
            .child(ui::render_filter_bar("attendance-filters", &self.filters, &sections))
            .child(ui::render_attendance_table(self.cache.attendance()))
            .into()
    }

    fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    async fn sync(&mut self, _notification: ChangeNotification) {
        self.notices.success(SYNCED_MESSAGE);
        self.refresh_students().await;
        self.reload_attendance().await;
        self.render();
    }
}
