//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Cycles and tags are stored
//! as compact JSON, amounts as exact decimal strings, and UUIDs as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_core::{
  category::Category,
  commitment::{Commitment, Currency, Status},
  cycle::Cycle,
  history::{ChangeKind, History, HistoryEntry},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

pub fn encode_cycle(cycle: &Cycle) -> Result<String> {
  Ok(serde_json::to_string(cycle)?)
}

pub fn decode_cycle(s: &str) -> Result<Cycle> {
  let cycle: Cycle = serde_json::from_str(s)?;
  // Serde does not enforce the custom-interval bound.
  cycle.validate()?;
  Ok(cycle)
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> &'static str { status.as_str() }

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str_opt(s)
    .ok_or_else(|| Error::Decode(format!("unknown status: {s:?}")))
}

// ─── Currency ────────────────────────────────────────────────────────────────

pub fn encode_currency(currency: &Currency) -> String {
  match currency {
    Currency::Other => "other".to_owned(),
    Currency::Code(code) => code.clone(),
  }
}

pub fn decode_currency(s: &str) -> Currency {
  match s {
    "other" => Currency::Other,
    code => Currency::Code(code.to_owned()),
  }
}

// ─── Amount ──────────────────────────────────────────────────────────────────

pub fn encode_amount(amount: Option<Decimal>) -> Option<String> {
  amount.map(|a| a.to_string())
}

pub fn decode_amount(s: Option<&str>) -> Result<Option<Decimal>> {
  s.map(|s| {
    s.parse()
      .map_err(|e| Error::Decode(format!("bad amount {s:?}: {e}")))
  })
  .transpose()
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &std::collections::BTreeSet<String>) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<std::collections::BTreeSet<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `commitments` row.
pub struct RawCommitment {
  pub commitment_id:   String,
  pub title:           String,
  pub start_date:      String,
  pub cycle:           String,
  pub status:          String,
  pub next_occurrence: String,
  pub amount:          Option<String>,
  pub currency:        String,
  pub notes:           Option<String>,
  pub tags:            String,
  pub category_id:     Option<String>,
  pub created_at:      String,
}

impl RawCommitment {
  /// Decode the row; the caller supplies the separately loaded ledger.
  pub fn into_commitment(self, history: History) -> Result<Commitment> {
    Ok(Commitment {
      id: decode_uuid(&self.commitment_id)?,
      title: self.title,
      start_date: decode_dt(&self.start_date)?,
      cycle: decode_cycle(&self.cycle)?,
      status: decode_status(&self.status)?,
      next_occurrence: decode_dt(&self.next_occurrence)?,
      amount: decode_amount(self.amount.as_deref())?,
      currency: decode_currency(&self.currency),
      notes: self.notes,
      tags: decode_tags(&self.tags)?,
      category_id: self.category_id.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      history,
    })
  }
}

/// Raw strings read directly from a `history` row.
pub struct RawHistoryEntry {
  pub at:             String,
  pub kind:           String,
  pub previous_value: Option<String>,
  pub new_value:      Option<String>,
}

impl RawHistoryEntry {
  /// Decode one ledger row. A malformed row (bad timestamp, unknown kind)
  /// yields `None` so the caller can skip it and keep the rest.
  pub fn into_entry(self) -> Option<HistoryEntry> {
    let at = decode_dt(&self.at).ok()?;
    let kind = ChangeKind::from_discriminant(&self.kind)?;
    Some(HistoryEntry {
      at,
      kind,
      previous: self.previous_value,
      new: self.new_value,
    })
  }
}

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub color:       String,
  pub is_system:   bool,
  pub is_hidden:   bool,
}

impl RawCategory {
  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:        decode_uuid(&self.category_id)?,
      name:      self.name,
      color:     self.color,
      is_system: self.is_system,
      is_hidden: self.is_hidden,
    })
  }
}
