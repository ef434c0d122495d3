//! Recurrence cycles and the next-occurrence calculator.
//!
//! A cycle is a closed description of a recurrence pattern. All date math
//! lives here as pure functions of (anchor, cycle, now); nothing in this
//! module reads the wall clock or keeps state.

use chrono::{DateTime, Datelike, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Inclusive bounds on a custom interval, in days.
pub const MIN_CUSTOM_INTERVAL_DAYS: u16 = 2;
pub const MAX_CUSTOM_INTERVAL_DAYS: u16 = 365;

// ─── Cycle ───────────────────────────────────────────────────────────────────

/// The recurrence pattern attached to a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cycle {
  Weekly,
  Monthly,
  Yearly,
  Custom { interval_days: u16 },
}

impl Cycle {
  /// Build a custom N-day cycle. Intervals outside
  /// [[`MIN_CUSTOM_INTERVAL_DAYS`], [`MAX_CUSTOM_INTERVAL_DAYS`]] are a
  /// construction error, never silently clamped.
  pub fn custom(interval_days: u16) -> Result<Self> {
    let cycle = Self::Custom { interval_days };
    cycle.validate()?;
    Ok(cycle)
  }

  /// Re-check the custom-interval bound. Serde deserialisation does not go
  /// through [`Cycle::custom`], so anything that accepts a cycle from the
  /// outside world (request bodies, database rows) calls this.
  pub fn validate(&self) -> Result<()> {
    if let Self::Custom { interval_days } = self
      && !(MIN_CUSTOM_INTERVAL_DAYS..=MAX_CUSTOM_INTERVAL_DAYS)
        .contains(interval_days)
    {
      return Err(Error::InvalidCycle(*interval_days));
    }
    Ok(())
  }

  /// The discriminant string stored in the `cycle` database column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Weekly => "weekly",
      Self::Monthly => "monthly",
      Self::Yearly => "yearly",
      Self::Custom { .. } => "custom",
    }
  }
}

// ─── Calculator ──────────────────────────────────────────────────────────────

/// The earliest occurrence of `cycle` anchored at `anchor` that is `>= now`.
///
/// An anchor in the future is its own first occurrence. Every occurrence is
/// `anchor` plus a whole number of periods; month and year periods are added
/// to the anchor in one step, so end-of-month clamping (Jan 31 → Feb 28/29,
/// Feb 29 → Feb 28 in non-leap years) never compounds across periods.
pub fn next_occurrence(
  anchor: DateTime<Utc>,
  cycle: Cycle,
  now: DateTime<Utc>,
) -> DateTime<Utc> {
  if anchor >= now {
    return anchor;
  }
  match cycle {
    Cycle::Weekly => next_by_days(anchor, 7, now),
    Cycle::Custom { interval_days } => {
      next_by_days(anchor, i64::from(interval_days), now)
    }
    Cycle::Monthly => next_by_months(anchor, 1, now),
    Cycle::Yearly => next_by_months(anchor, 12, now),
  }
}

/// Fixed-length periods: jump by the analytically computed period count,
/// then adjust. The loop body runs at most twice.
fn next_by_days(
  anchor: DateTime<Utc>,
  period_days: i64,
  now: DateTime<Utc>,
) -> DateTime<Utc> {
  let elapsed_days = (now - anchor).num_days();
  let mut periods = elapsed_days / period_days;
  loop {
    let candidate = anchor + TimeDelta::days(periods * period_days);
    if candidate >= now {
      return candidate;
    }
    periods += 1;
  }
}

/// Calendar-length periods (`stride` = 1 for monthly, 12 for yearly).
///
/// The starting period count is a lower bound: the candidate one period
/// below it always lands in an earlier calendar month than `now`, so the
/// first candidate `>= now` is the earliest occurrence. At most two
/// candidates are examined.
fn next_by_months(
  anchor: DateTime<Utc>,
  stride: u32,
  now: DateTime<Utc>,
) -> DateTime<Utc> {
  let elapsed_months = (now.year() - anchor.year()) * 12
    + now.month() as i32
    - anchor.month() as i32;
  let mut periods = elapsed_months.max(0) as u32 / stride;
  loop {
    let candidate = add_months(anchor, periods * stride);
    if candidate >= now {
      return candidate;
    }
    periods += 1;
  }
}

/// `anchor + n` calendar months with end-of-month clamping.
/// chrono's range runs out in year 262143; unreachable for stored dates.
pub(crate) fn add_months(anchor: DateTime<Utc>, n: u32) -> DateTime<Utc> {
  anchor.checked_add_months(Months::new(n)).unwrap_or(anchor)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
  }

  #[test]
  fn custom_interval_bounds() {
    assert!(Cycle::custom(1).is_err());
    assert!(Cycle::custom(366).is_err());
    assert!(matches!(
      Cycle::custom(0),
      Err(Error::InvalidCycle(0))
    ));
    assert_eq!(Cycle::custom(2).unwrap(), Cycle::Custom { interval_days: 2 });
    assert_eq!(
      Cycle::custom(365).unwrap(),
      Cycle::Custom { interval_days: 365 }
    );
  }

  #[test]
  fn future_anchor_is_its_own_first_occurrence() {
    let anchor = utc(2024, 6, 1);
    let now = utc(2024, 1, 1);
    assert_eq!(next_occurrence(anchor, Cycle::Weekly, now), anchor);
    assert_eq!(next_occurrence(anchor, Cycle::Monthly, now), anchor);
  }

  #[test]
  fn weekly_advances_in_whole_weeks() {
    let anchor = utc(2024, 1, 1); // a Monday
    let now = utc(2024, 1, 20);
    assert_eq!(next_occurrence(anchor, Cycle::Weekly, now), utc(2024, 1, 22));
  }

  #[test]
  fn weekly_occurrence_on_now_is_returned() {
    let anchor = utc(2024, 1, 1);
    let now = utc(2024, 1, 15); // exactly two weeks later
    assert_eq!(next_occurrence(anchor, Cycle::Weekly, now), now);
  }

  #[test]
  fn custom_fourteen_days() {
    // Anchor 2024-01-01, every 14 days, now 2024-01-20.
    let anchor = utc(2024, 1, 1);
    let cycle = Cycle::custom(14).unwrap();
    assert_eq!(
      next_occurrence(anchor, cycle, utc(2024, 1, 20)),
      utc(2024, 1, 29)
    );
  }

  #[test]
  fn custom_boundary_intervals() {
    let anchor = utc(2024, 1, 1);
    let two = Cycle::custom(2).unwrap();
    assert_eq!(next_occurrence(anchor, two, utc(2024, 1, 2)), utc(2024, 1, 3));

    let year = Cycle::custom(365).unwrap();
    assert_eq!(
      next_occurrence(anchor, year, utc(2024, 1, 2)),
      utc(2024, 12, 31) // 2024 is leap, so 365 days lands a day early
    );
  }

  #[test]
  fn monthly_clamps_to_short_months() {
    // Jan 31 anchor entering February of a leap year.
    let anchor = utc(2024, 1, 31);
    assert_eq!(
      next_occurrence(anchor, Cycle::Monthly, utc(2024, 2, 1)),
      utc(2024, 2, 29)
    );

    // Non-leap year clamps to Feb 28, not Mar 3.
    let anchor = utc(2023, 1, 31);
    assert_eq!(
      next_occurrence(anchor, Cycle::Monthly, utc(2023, 2, 1)),
      utc(2023, 2, 28)
    );
  }

  #[test]
  fn monthly_clamping_does_not_compound() {
    // After the clamped February occurrence, March returns to the 31st
    // because every occurrence is computed from the anchor.
    let anchor = utc(2024, 1, 31);
    assert_eq!(
      next_occurrence(anchor, Cycle::Monthly, utc(2024, 3, 1)),
      utc(2024, 3, 31)
    );
  }

  #[test]
  fn yearly_clamps_leap_day() {
    let anchor = utc(2024, 2, 29);
    assert_eq!(
      next_occurrence(anchor, Cycle::Yearly, utc(2024, 3, 1)),
      utc(2025, 2, 28)
    );
    // And lands back on Feb 29 in the next leap year.
    assert_eq!(
      next_occurrence(anchor, Cycle::Yearly, utc(2027, 3, 1)),
      utc(2028, 2, 29)
    );
  }

  #[test]
  fn far_past_anchor_terminates_quickly() {
    let anchor = utc(1970, 1, 1);
    let now = utc(2024, 6, 15);
    let next = next_occurrence(anchor, Cycle::Weekly, now);
    assert!(next >= now);
    assert_eq!((next - anchor).num_days() % 7, 0);

    let next = next_occurrence(anchor, Cycle::Monthly, now);
    assert!(next >= now);
    assert_eq!(next.day(), 1);
  }

  #[test]
  fn idempotent_for_identical_inputs() {
    let anchor = utc(2021, 5, 17);
    let now = utc(2024, 2, 2);
    for cycle in [
      Cycle::Weekly,
      Cycle::Monthly,
      Cycle::Yearly,
      Cycle::custom(90).unwrap(),
    ] {
      assert_eq!(
        next_occurrence(anchor, cycle, now),
        next_occurrence(anchor, cycle, now)
      );
    }
  }
}
