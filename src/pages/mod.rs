//! Page components. Each page owns its own snapshot, filters, notices and
//! rendered region; pages in different contexts only meet through the
//! change signal.
//!
//! Every successful mutation runs the same cycle: gateway call, full refresh
//! of the affected collection, re-render, change signal. A signal from
//! another context runs the refresh and re-render without the gateway call.

mod attendance;
mod reports;
mod students;

pub use attendance::AttendancePage;
pub use reports::ReportsPage;
pub use students::StudentsPage;

use crate::models::ChangeNotification;
use crate::notice::NoticeBoard;
use crate::notifier::SyncListener;
use crate::ui;
use crate::view::{Element, Node, Patch, Region};
use std::future::Future;
use tracing::info;

pub const SYNCED_MESSAGE: &str = "Data synchronized from another tab";

pub trait Page {
    fn title(&self) -> &'static str;

    /// Main content for the current snapshot.
    fn content(&self) -> Node;

    fn notices(&self) -> &NoticeBoard;

    fn region_mut(&mut self) -> &mut Region;

    /// Refreshes whatever this page shows after another context changed data.
    fn sync(&mut self, notification: ChangeNotification) -> impl Future<Output = ()> + Send;

    fn view(&self) -> Node {
        Element::new("section")
            .class("page")
            .child(ui::render_notice(self.notices().current()))
            .child(self.content())
            .into()
    }

    fn render(&mut self) -> Vec<Patch> {
        let next = self.view();
        self.region_mut().update(next)
    }

    fn document(&self) -> String {
        ui::render_document(self.title(), &[self.view()])
    }
}

/// Applies every signal that is already pending. Returns how many were seen.
pub async fn drain_signals<P: Page>(page: &mut P, listener: &mut SyncListener) -> usize {
    let mut seen = 0;
    while let Some(notification) = listener.try_recv() {
        seen += 1;
        on_signal(page, notification).await;
    }
    seen
}

/// Follows signals until the channel closes.
pub async fn follow_signals<P: Page>(page: &mut P, listener: &mut SyncListener) {
    while let Some(notification) = listener.recv().await {
        on_signal(page, notification).await;
    }
}

async fn on_signal<P: Page>(page: &mut P, notification: ChangeNotification) {
    info!(
        kind = ?notification.kind,
        timestamp = notification.timestamp,
        "update detected from another tab"
    );
    page.sync(notification).await;
}
