// Elapsed-time derivation and display.
//
// Elapsed time is always recomputed from the captured start instant, so a
// late or skipped tick never accumulates drift.

use std::time::Instant;

/// Elapsed centiseconds between `start` and `now`, clamped to `cap_cs`.
///
/// Returns `(elapsed, capped)` where `capped` is true once the cap has been
/// reached. A `now` earlier than `start` yields zero.
pub fn derive_elapsed(start: Instant, now: Instant, cap_cs: u32) -> (u32, bool) {
    let millis = now.saturating_duration_since(start).as_millis();
    let cs = u32::try_from(millis / 10).unwrap_or(u32::MAX);
    if cs >= cap_cs {
        (cap_cs, true)
    } else {
        (cs, false)
    }
}

/// Format centiseconds as `MM:SS:CC`.
pub fn format_time(cs: u32) -> String {
    let minutes = cs / 6000;
    let seconds = (cs % 6000) / 100;
    let centis = cs % 100;
    format!("{minutes:02}:{seconds:02}:{centis:02}")
}

/// Centiseconds as fractional seconds, for score arithmetic.
pub fn as_seconds(cs: u32) -> f64 {
    f64::from(cs) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn derive_elapsed_truncates_to_centiseconds() {
        let start = Instant::now();
        let (cs, capped) = derive_elapsed(start, start + Duration::from_millis(1_239), 36_000);
        assert_eq!(cs, 123);
        assert!(!capped);
    }

    #[test]
    fn derive_elapsed_clamps_at_cap() {
        let start = Instant::now();
        let (cs, capped) = derive_elapsed(start, start + Duration::from_secs(360), 36_000);
        assert_eq!(cs, 36_000);
        assert!(capped);

        let (cs, capped) = derive_elapsed(start, start + Duration::from_secs(4_000), 36_000);
        assert_eq!(cs, 36_000);
        assert!(capped);
    }

    #[test]
    fn derive_elapsed_just_below_cap() {
        let start = Instant::now();
        let (cs, capped) = derive_elapsed(start, start + Duration::from_millis(359_999), 36_000);
        assert_eq!(cs, 35_999);
        assert!(!capped);
    }

    #[test]
    fn derive_elapsed_before_start_is_zero() {
        let now = Instant::now();
        let start = now + Duration::from_secs(5);
        assert_eq!(derive_elapsed(start, now, 36_000), (0, false));
    }

    #[test]
    fn format_time_pads_fields() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(30_000), "05:00:00");
        assert_eq!(format_time(6_123), "01:01:23");
        assert_eq!(format_time(60_000), "10:00:00");
    }

    #[test]
    fn as_seconds_converts() {
        assert!((as_seconds(35_999) - 359.99).abs() < 1e-9);
    }
}
