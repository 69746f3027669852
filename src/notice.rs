use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    posted_at: Instant,
}

/// Holds at most one transient notice; a new one replaces the old.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Option<Notice>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.post(NoticeLevel::Success, message.into(), Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.post(NoticeLevel::Error, message.into(), Instant::now());
    }

    pub fn post(&mut self, level: NoticeLevel, message: String, posted_at: Instant) {
        self.current = Some(Notice {
            level,
            message,
            posted_at,
        });
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|notice| now.saturating_duration_since(notice.posted_at) < self.ttl)
    }

    /// Latest notice regardless of expiry.
    pub fn last(&self) -> Option<&Notice> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_ttl() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        let posted = Instant::now();
        board.post(NoticeLevel::Success, "Saved".to_string(), posted);

        assert!(board.current_at(posted + Duration::from_millis(2999)).is_some());
        assert!(board.current_at(posted + Duration::from_secs(3)).is_none());
        assert_eq!(board.last().map(|n| n.message.as_str()), Some("Saved"));
    }

    #[test]
    fn newer_notice_replaces_older() {
        let mut board = NoticeBoard::default();
        board.success("first");
        board.error("second");
        let notice = board.current().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "second");
    }
}
