//! Timestamp helpers shared by writers and the merge policy.

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Next write timestamp for a record whose previous stamp is `previous`.
///
/// Returns the current time, bumped to `previous + 1` when the clock has
/// not advanced past it. Keeps `last_modified` strictly increasing per
/// record even for writes within one millisecond.
#[must_use]
pub fn next_timestamp(previous: i64) -> i64 {
    now_ms().max(previous + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ms_is_positive() {
        assert!(now_ms() > 0);
    }

    #[test]
    fn next_timestamp_advances_past_previous() {
        let now = now_ms();
        assert!(next_timestamp(now) > now);
        assert!(next_timestamp(now + 10_000) == now + 10_001);
    }

    #[test]
    fn next_timestamp_tracks_clock_for_old_records() {
        let stamp = next_timestamp(0);
        assert!(stamp >= now_ms() - 1_000);
    }
}
