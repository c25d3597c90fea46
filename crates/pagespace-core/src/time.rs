//! Timezone-aware timestamp helpers used by the prompt assembler's
//! timestamp section (spec.md C8.4) and exercised directly by the
//! testable property in spec.md §8.3.

use chrono::{DateTime, Datelike, LocalResult, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{CoreError, CoreResult};

/// Coarse time-of-day bucket used in the prompt's timestamp section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    /// Local hour < 12.
    Morning,
    /// 12 <= local hour < 17.
    Afternoon,
    /// Local hour >= 17.
    Evening,
}

impl TimeOfDay {
    /// Classify an hour-of-day (0-23) into a bucket, per spec.md C8.4.
    #[must_use]
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Self::Morning
        } else if hour < 17 {
            Self::Afternoon
        } else {
            Self::Evening
        }
    }

    /// The word used in the assembled prompt.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}

/// Resolve an IANA timezone id, falling back to UTC per spec.md C8.4
/// ("current local time for the user's timezone (fallback UTC)").
///
/// Unlike a strict parse, this never fails: an unknown id is logged and
/// treated as UTC, because a bad timezone string stored against a user
/// account must never break prompt assembly.
#[must_use]
pub fn resolve_timezone_or_utc(tz_id: &str) -> Tz {
    tz_id.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(tz_id, "unknown timezone, falling back to UTC");
        Tz::UTC
    })
}

/// Parse a timezone id strictly, returning an error on an unknown id.
///
/// # Errors
/// Returns [`CoreError::UnknownTimezone`] if `tz_id` does not name a known
/// IANA timezone.
pub fn parse_timezone(tz_id: &str) -> CoreResult<Tz> {
    tz_id
        .parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimezone(tz_id.to_string()))
}

/// Compute local midnight "today" for `tz`, as observed from instant `now`.
///
/// Per spec.md C8.4: format `now` in `tz` to get the calendar date, then
/// reconstruct midnight on that date *in `tz`* rather than by subtracting a
/// fixed offset from `now` — so a DST transition occurring between midnight
/// and `now` does not shift the result away from local midnight.
///
/// `chrono_tz::Tz::from_local_datetime` resolves the correct UTC offset for
/// the target local instant directly, which is exactly this reconstruction.
/// A nonexistent local time (spring-forward gap) resolves to the later of
/// the two candidate offsets; an ambiguous local time (fall-back overlap)
/// resolves to the earlier one — both are conventional choices for "the
/// start of the day" and keep the result monotonic across the transition.
#[must_use]
pub fn start_of_today_in_timezone(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let date = local_now.date_naive();
    let midnight = date.and_hms_opt(0, 0, 0).expect("00:00:00 is always valid");

    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Spring-forward gap at local midnight: walk forward until the
            // wall clock re-exists, then take that instant.
            let mut probe = midnight;
            loop {
                probe += chrono::Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&probe) {
                    break dt.with_timezone(&Utc);
                }
            }
        }
    }
}

/// The fully-rendered timestamp section inputs for the prompt assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampContext {
    /// ISO-8601 local time, e.g. `2026-07-28T14:03:00-04:00`.
    pub local_iso: String,
    /// Coarse bucket for the local hour.
    pub time_of_day: TimeOfDay,
    /// The IANA timezone id used (post fallback-to-UTC).
    pub timezone_id: String,
}

/// Assemble the timestamp section inputs for `tz_id` as observed at `now`.
#[must_use]
pub fn timestamp_context(tz_id: &str, now: DateTime<Utc>) -> TimestampContext {
    let tz = resolve_timezone_or_utc(tz_id);
    let local = now.with_timezone(&tz);
    TimestampContext {
        local_iso: local.to_rfc3339(),
        time_of_day: TimeOfDay::from_hour(local.hour()),
        timezone_id: tz.name().to_string(),
    }
}
