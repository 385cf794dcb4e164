//! Repository records and their schema descriptors

mod object;
mod tag;
mod version;

pub use object::Object;
pub use tag::{ObjectTag, Tag, TagType, TagValue};
pub use version::{HealthRecord, HealthState, Version};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Current time at the store's millisecond resolution
pub fn now() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

/// Drop sub-millisecond precision so values survive a store round trip
pub fn truncate_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_truncate_millis() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + TimeDelta::nanoseconds(1_234_567);
        let cut = truncate_millis(t);
        assert_eq!(cut.nanosecond(), 1_000_000);
    }
}
