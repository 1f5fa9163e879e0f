use chrono::{DateTime, Local};

pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y, %H:%M:%S";

pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    /// Current time the way generated documents show it.
    fn stamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant, for reproducible output.
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_stamp() {
        let instant = Local.with_ymd_and_hms(2024, 2, 1, 9, 5, 7).unwrap();
        assert_eq!(FixedClock(instant).stamp(), "01.02.2024, 09:05:07");
    }
}
