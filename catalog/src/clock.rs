use chrono::Datelike;

/// Source of "now" for validation rules that depend on the calendar.
pub trait Clock: Send + Sync {
    fn current_year(&self) -> i32;
}

/// Reads the local calendar year on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_year(&self) -> i32 {
        chrono::Local::now().year()
    }
}

/// Always reports the same year. Used to make validation deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i32);

impl Clock for FixedClock {
    fn current_year(&self) -> i32 {
        self.0
    }
}
