use attendance_client::{
    AttendancePage, ClientConfig, HttpGateway, Notifier, Page, ReportsPage, StudentsPage,
    SyncChannel, View,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env()?;
    let gateway = Arc::new(HttpGateway::new(&config.api_url, config.http_timeout)?);
    let channel = SyncChannel::new();
    let notifier = Notifier::new(&channel, &config.sync_key, config.sync_clear_after);

    info!(api = %config.api_url, view = ?config.view, "rendering page");

    let document = match config.view {
        View::Students => {
            let mut page = StudentsPage::new(gateway, notifier, config.notice_ttl)
                .with_filters(config.filter.clone());
            page.load().await;
            page.document()
        }
        View::Attendance => {
            let mut page = AttendancePage::new(gateway, notifier, config.notice_ttl)
                .with_filters(config.filter.clone());
            page.load().await;
            page.document()
        }
        View::Reports | View::History => {
            let mut page = ReportsPage::new(gateway, config.notice_ttl);
            page.load().await;
            match (config.view, config.student_id.clone()) {
                (View::History, Some(student_id)) => {
                    page.show_history(student_id);
                    page.history_document().unwrap_or_else(|| page.document())
                }
                _ => page.document(),
            }
        }
    };

    println!("{document}");
    Ok(())
}
