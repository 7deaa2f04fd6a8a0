use chrono::Local;

/// `YYYY-MM-DD HH:MM:SS`, the layout the form host uses for local times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the timestamps stamped on rejection records.
pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

/// Wall clock in the host's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}
