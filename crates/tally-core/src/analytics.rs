//! Derived read models over commitments — never stored, always computed.
//!
//! Everything here is a pure function over borrowed commitments. Inputs are
//! never mutated, and empty results are empty collections, not errors.

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  commitment::{Commitment, Status},
  cycle::{add_months, next_occurrence},
};

// ─── Projection ──────────────────────────────────────────────────────────────

/// Future occurrence dates for `commitment` within `months` calendar months
/// of `now`, in order. Only `Active` commitments project; anything else
/// yields no occurrences.
pub fn project(
  commitment: &Commitment,
  months: u32,
  now: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
  if commitment.status != Status::Active {
    return Vec::new();
  }

  let horizon = add_months(now, months);
  let mut occurrences = Vec::new();
  let mut cursor = now;
  loop {
    let next = next_occurrence(commitment.start_date, commitment.cycle, cursor);
    if next > horizon {
      return occurrences;
    }
    occurrences.push(next);
    // The shortest cycle is two days; one second is enough to move past
    // the occurrence just found.
    cursor = next + TimeDelta::seconds(1);
  }
}

// ─── Milestones ──────────────────────────────────────────────────────────────

/// Age thresholds that earn a milestone, in days since the anchor.
pub const MILESTONE_THRESHOLDS_DAYS: [i64; 5] = [7, 30, 90, 180, 365];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
  pub threshold_days: i64,
  /// `start_date + threshold_days`.
  pub reached_on:     DateTime<Utc>,
}

/// Milestones already reached as of `now`, ascending by date. Archived
/// commitments are not accruing active duration and yield none.
pub fn milestones(commitment: &Commitment, now: DateTime<Utc>) -> Vec<Milestone> {
  if commitment.status == Status::Archived {
    return Vec::new();
  }
  MILESTONE_THRESHOLDS_DAYS
    .iter()
    .map(|&threshold_days| Milestone {
      threshold_days,
      reached_on: commitment.start_date + TimeDelta::days(threshold_days),
    })
    .filter(|m| m.reached_on <= now)
    .collect()
}

// ─── Seasonal distribution ───────────────────────────────────────────────────

/// Meteorological seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
  Spring,
  Summer,
  Autumn,
  Winter,
}

impl Season {
  /// Stable enumeration order; ties for the mode break toward the first.
  pub const ALL: [Season; 4] =
    [Season::Spring, Season::Summer, Season::Autumn, Season::Winter];

  /// The season containing a calendar month (1–12).
  pub fn of_month(month: u32) -> Self {
    match month {
      3..=5 => Self::Spring,
      6..=8 => Self::Summer,
      9..=11 => Self::Autumn,
      _ => Self::Winter,
    }
  }

  fn index(self) -> usize {
    match self {
      Self::Spring => 0,
      Self::Summer => 1,
      Self::Autumn => 2,
      Self::Winter => 3,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalDistribution {
  /// Commitments anchored in each calendar month, January first.
  pub per_month:  [usize; 12],
  /// Counts in [`Season::ALL`] order.
  pub per_season: [usize; 4],
  /// The most populous season; `None` for an empty collection.
  pub mode:       Option<Season>,
}

/// Bucket `commitments` by the calendar month of their anchor.
pub fn seasonal(commitments: &[Commitment]) -> SeasonalDistribution {
  let mut per_month = [0usize; 12];
  for c in commitments {
    per_month[c.start_date.month0() as usize] += 1;
  }

  let mut per_season = [0usize; 4];
  for (month0, &count) in per_month.iter().enumerate() {
    per_season[Season::of_month(month0 as u32 + 1).index()] += count;
  }

  let mode = if commitments.is_empty() {
    None
  } else {
    let mut best = Season::Spring;
    for season in Season::ALL {
      if per_season[season.index()] > per_season[best.index()] {
        best = season;
      }
    }
    Some(best)
  };

  SeasonalDistribution { per_month, per_season, mode }
}

// ─── Relationship discovery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
  SameCategory,
  SameCycle,
  SimilarAmount,
  SharedTag,
}

/// One non-empty grouping of commitments related to a focal commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedGroup {
  pub kind:    RelationKind,
  pub members: Vec<Uuid>,
}

/// Commitments in `commitments` related to `focal`, grouped by relation
/// kind. Empty groupings are omitted entirely. Amount similarity is
/// focal-relative: `|other - focal| < 0.1 * focal`.
pub fn related(focal: &Commitment, commitments: &[Commitment]) -> Vec<RelatedGroup> {
  let others: Vec<&Commitment> =
    commitments.iter().filter(|c| c.id != focal.id).collect();

  let mut groups = Vec::new();

  push_group(&mut groups, RelationKind::SameCategory, &others, |c| {
    c.category_id == focal.category_id
  });
  push_group(&mut groups, RelationKind::SameCycle, &others, |c| {
    c.cycle == focal.cycle
  });
  if let Some(amount) = focal.amount
    && amount > Decimal::ZERO
  {
    let tolerance = amount * Decimal::new(1, 1); // 0.1
    push_group(&mut groups, RelationKind::SimilarAmount, &others, |c| {
      c.amount.is_some_and(|a| (a - amount).abs() < tolerance)
    });
  }
  push_group(&mut groups, RelationKind::SharedTag, &others, |c| {
    c.tags.intersection(&focal.tags).next().is_some()
  });

  groups
}

fn push_group(
  groups: &mut Vec<RelatedGroup>,
  kind: RelationKind,
  others: &[&Commitment],
  predicate: impl Fn(&Commitment) -> bool,
) {
  let members: Vec<Uuid> =
    others.iter().filter(|c| predicate(c)).map(|c| c.id).collect();
  if !members.is_empty() {
    groups.push(RelatedGroup { kind, members });
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
