use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Progress,
    Destructive,
}

/// Action the embedder can attach to a notice's accept affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    /// Accepting starts display capture on the host session.
    StartSharing,
}

/// A local, synchronous UI notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub kind: NoticeKind,
    /// Keep the notice on screen until the user dismisses or accepts it.
    pub persistent: bool,
    /// Preferred display duration, e.g. the span of a retry delay.
    pub duration: Option<Duration>,
    pub action: Option<NoticeAction>,
}

impl Notice {
    fn new(title: impl Into<String>, body: impl Into<String>, kind: NoticeKind) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind,
            persistent: false,
            duration: None,
            action: None,
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, NoticeKind::Info)
    }

    pub fn progress(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, NoticeKind::Progress)
    }

    pub fn destructive(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, NoticeKind::Destructive)
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.action = Some(action);
        self
    }
}
