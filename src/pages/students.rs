use super::{Page, SYNCED_MESSAGE};
use crate::cache::StateCache;
use crate::errors::ClientError;
use crate::filters::{FilterState, distinct_sections};
use crate::gateway::Gateway;
use crate::models::{ChangeKind, ChangeNotification, RecordId, Student, StudentInput};
use crate::notice::NoticeBoard;
use crate::notifier::Notifier;
use crate::ui;
use crate::view::{Element, Node, Region};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Roster of students grouped by year and section, with create, edit and
/// delete. Year/section filters apply client-side.
pub struct StudentsPage<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    cache: StateCache,
    filters: FilterState,
    editing: Option<RecordId>,
    notices: NoticeBoard,
    region: Region,
}

impl<G: Gateway> StudentsPage<G> {
    pub fn new(gateway: Arc<G>, notifier: Notifier, notice_ttl: Duration) -> Self {
        Self {
            gateway,
            notifier,
            cache: StateCache::new(),
            filters: FilterState::new(),
            editing: None,
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

    pub fn editing(&self) -> Option<&RecordId> {
        self.editing.as_ref()
    }

    pub async fn load(&mut self) {
        self.refresh_students().await;
        self.render();
    }

    pub fn visible_students(&self) -> Vec<&Student> {
        self.filters.apply_to_students(self.cache.students())
    }

    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.render();
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
        self.render();
    }

    pub fn begin_create(&mut self) {
        self.editing = None;
    }

    /// Starts editing a student from the snapshot; unknown ids are ignored.
    pub fn begin_edit(&mut self, id: &RecordId) -> Option<&Student> {
        let student = self.cache.student(id)?;
        self.editing = Some(id.clone());
        Some(student)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Creates or updates depending on whether an edit is in progress.
    pub async fn save(&mut self, input: StudentInput) -> Result<(), ClientError> {
        if let Err(err) = input.validate() {
            self.notices.error(err.message.clone());
            self.render();
            return Err(err);
        }

        let (result, success) = match &self.editing {
            Some(id) => (
                self.gateway.update_student(id, &input).await,
                "Student updated successfully",
            ),
            None => (
                self.gateway.create_student(&input).await,
                "Student created successfully",
            ),
        };
        if let Err(err) = result {
            error!("error saving student: {err}");
            self.notices.error("Error saving student");
            self.render();
            return Err(err);
        }

        self.notices.success(success);
        self.editing = None;
        self.after_mutation().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: &RecordId) -> Result<(), ClientError> {
        if let Err(err) = self.gateway.delete_student(id).await {
            error!("error deleting student: {err}");
            self.notices.error("Error deleting student");
            self.render();
            return Err(err);
        }

        self.notices.success("Student deleted successfully");
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        self.after_mutation().await;
        Ok(())
    }

    async fn after_mutation(&mut self) {
        self.refresh_students().await;
        self.render();
        self.notifier.broadcast(ChangeKind::Student).await;
    }

    async fn refresh_students(&mut self) {
        if let Err(err) = self.cache.refresh_students(self.gateway.as_ref()).await {
            error!("error loading students: {err}");
            self.notices.error("Error loading students");
        }
    }
}

impl<G: Gateway> Page for StudentsPage<G> {
    fn title(&self) -> &'static str {
        "Students"
    }

    fn content(&self) -> Node {
        let sections = distinct_sections(self.cache.students());
        Element::new("div")
            .class("students-page")
            .child(ui::render_filter_bar("student-filters", &self.filters, &sections))
            .child(ui::render_roster(&self.visible_students()))
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
        self.render();
    }
}
