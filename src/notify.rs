use std::time::Duration;

/// Visual style of a user notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Info,
    Error,
}

/// UI side effects. Fire-and-forget; implementations must not block.
pub trait Notifier: Send + Sync {
    fn show_loading(&self, _label: &str) {}

    fn hide_loading(&self) {}

    fn show_notice(&self, _message: &str, _kind: NoticeKind, _duration: Duration) {}
}

/// Navigation side effect, used for the login redirect.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate_to(&self, _path: &str) {}
}
