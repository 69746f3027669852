pub mod cache;
pub mod config;
pub mod errors;
pub mod filters;
pub mod gateway;
pub mod models;
pub mod notice;
pub mod notifier;
pub mod pages;
pub mod stats;
pub mod ui;
pub mod view;

pub use cache::StateCache;
pub use config::{ClientConfig, View};
pub use errors::{ClientError, ErrorKind};
pub use filters::FilterState;
pub use gateway::{ExportKind, Gateway, HttpGateway};
pub use notifier::{Notifier, SyncChannel, SyncListener};
pub use pages::{AttendancePage, Page, ReportsPage, StudentsPage};
