//! Process-wide translation status, checked at round boundaries for cooperative stop.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Idle,
    Translating,
    Stopping,
}

impl WorkStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkStatus::Translating,
            2 => WorkStatus::Stopping,
            _ => WorkStatus::Idle,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            WorkStatus::Idle => 0,
            WorkStatus::Translating => 1,
            WorkStatus::Stopping => 2,
        }
    }
}

static WORK_STATUS: AtomicU8 = AtomicU8::new(0);

pub fn get() -> WorkStatus {
    WorkStatus::from_u8(WORK_STATUS.load(Ordering::SeqCst))
}

pub fn set(status: WorkStatus) {
    WORK_STATUS.store(status.to_u8(), Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_atomic() {
        set(WorkStatus::Translating);
        assert_eq!(get(), WorkStatus::Translating);
        set(WorkStatus::Stopping);
        assert_eq!(get(), WorkStatus::Stopping);
        set(WorkStatus::Idle);
        assert_eq!(get(), WorkStatus::Idle);
    }
}
