mod common;

use attendance_client::models::{AttendanceStatus, ChangeKind, RecordId, StudentInput};
use attendance_client::notifier::{DEFAULT_SYNC_KEY, Notifier, SyncChannel};
use attendance_client::pages::{SYNCED_MESSAGE, drain_signals, follow_signals};
use attendance_client::{AttendancePage, Page, ReportsPage, StudentsPage};
use common::MemoryGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const TTL: Duration = Duration::from_secs(3);

fn notifier(channel: &SyncChannel) -> Notifier {
    Notifier::new(channel, DEFAULT_SYNC_KEY, Duration::from_millis(100))
}

#[tokio::test]
async fn marking_in_one_tab_refreshes_the_other() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed_student("S1", "Ana", "1st Year", "A").await;
    let channel = SyncChannel::new();

    let mut tab_a = AttendancePage::new(Arc::clone(&gateway), notifier(&channel), TTL);
    let notifier_b = notifier(&channel);
    let mut listener_b = notifier_b.listener();
    let mut tab_b = AttendancePage::new(Arc::clone(&gateway), notifier_b, TTL);
    tab_a.load().await;
    tab_b.load().await;

    tab_a.select_student(Some(RecordId::new("S1")));
    tab_a.quick_mark(AttendanceStatus::Present).await.unwrap();
    assert!(tab_b.cache().attendance().is_empty());

    let seen = drain_signals(&mut tab_b, &mut listener_b).await;
    assert_eq!(seen, 1);
    assert_eq!(tab_b.cache().attendance().len(), 1);
    assert_eq!(
        tab_b.notices().current().map(|n| n.message.as_str()),
        Some(SYNCED_MESSAGE)
    );
}

#[tokio::test]
async fn writer_does_not_refresh_itself() {
    let gateway = Arc::new(MemoryGateway::new());
    let channel = SyncChannel::new();
    let notifier_a = notifier(&channel);
    let mut listener_a = notifier_a.listener();
    let mut tab_a = StudentsPage::new(Arc::clone(&gateway), notifier_a, TTL);

    tab_a
        .save(StudentInput {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            year: "1st Year".into(),
            section: "A".to_string(),
        })
        .await
        .unwrap();

    let calls = gateway.list_calls();
    assert_eq!(drain_signals(&mut tab_a, &mut listener_a).await, 0);
    assert_eq!(gateway.list_calls(), calls);
    assert_eq!(
        tab_a.notices().current().map(|n| n.message.as_str()),
        Some("Student created successfully")
    );
}

#[tokio::test]
async fn every_other_tab_sees_the_change() {
    let gateway = Arc::new(MemoryGateway::new());
    let channel = SyncChannel::new();
    let writer = notifier(&channel);
    let mut readers: Vec<_> = (0..3).map(|_| notifier(&channel).listener()).collect();

    writer.broadcast(ChangeKind::Student).await.unwrap();

    for reader in &mut readers {
        let notification = reader.try_recv().unwrap();
        assert_eq!(notification.kind, ChangeKind::Student);
        assert!(reader.try_recv().is_none());
    }
    assert_eq!(gateway.list_calls(), 0);
}

#[tokio::test]
async fn reports_tab_follows_signals() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed_student("S1", "Ana", "1st Year", "A").await;
    let channel = SyncChannel::new();

    let mut writer = AttendancePage::new(Arc::clone(&gateway), notifier(&channel), TTL);
    writer.load().await;

    let mut reports = ReportsPage::new(Arc::clone(&gateway), TTL);
    reports.load().await;
    let mut listener = notifier(&channel).listener();

    writer.select_student(Some(RecordId::new("S1")));
    writer.quick_mark(AttendanceStatus::Late).await.unwrap();

    let follow = async {
        follow_signals(&mut reports, &mut listener).await;
    };
    // The channel stays open while any notifier lives, so the follower is cut
    // off by the timeout once the pending signal has been applied.
    let _ = timeout(Duration::from_millis(200), follow).await;

    assert_eq!(reports.cache().attendance().len(), 1);
    assert_eq!(reports.summary().total_records, 1);
}

#[tokio::test]
async fn signal_is_cleared_after_the_delay() {
    let channel = SyncChannel::new();
    let writer = Notifier::new(&channel, DEFAULT_SYNC_KEY, Duration::from_millis(20));
    let mut reader = notifier(&channel).listener();

    writer.broadcast(ChangeKind::Attendance).await.unwrap();
    assert!(channel.get_item(DEFAULT_SYNC_KEY).await.is_some());

    sleep(Duration::from_millis(80)).await;
    assert!(channel.get_item(DEFAULT_SYNC_KEY).await.is_none());

    // Removal is not a change signal.
    assert!(reader.try_recv().is_some());
    assert!(reader.try_recv().is_none());
}
