//! [`SqliteStore`] — the SQLite implementation of [`CommitmentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use rust_decimal::Decimal;
use uuid::Uuid;

use tally_core::{
  category::{Category, FALLBACK_CATEGORY_NAME},
  commitment::{Commitment, NewCommitment, Status},
  cycle::Cycle,
  history::{ChangeKind, History, HistoryEntry},
  store::{CommitmentStore, HistoryPage},
};

use crate::{
  Error, Result,
  encode::{
    RawCategory, RawCommitment, RawHistoryEntry, encode_amount, encode_currency,
    encode_cycle, encode_dt, encode_status, encode_tags, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally commitment store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The
/// connection also serializes mutations, which is the single-writer
/// discipline the engine assumes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Row plumbing ──────────────────────────────────────────────────────────

  async fn load_raw_commitment(&self, id: Uuid) -> Result<Option<RawCommitment>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT commitment_id, title, start_date, cycle, status,
                      next_occurrence, amount, currency, notes, tags,
                      category_id, created_at
               FROM commitments WHERE commitment_id = ?1",
              rusqlite::params![id_str],
              map_commitment_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }

  /// Ledger rows for one commitment in `seq` order. Malformed rows are
  /// skipped and counted; the rest of the ledger is preserved.
  async fn load_history_rows(
    &self,
    id: Uuid,
    kind: Option<ChangeKind>,
  ) -> Result<(Vec<HistoryEntry>, usize)> {
    let id_str = encode_uuid(id);
    let kind_str = kind.map(|k| k.discriminant().to_owned());

    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(
            "SELECT at, kind, previous_value, new_value FROM history
             WHERE commitment_id = ?1 AND kind = ?2 ORDER BY seq",
          )?;
          stmt
            .query_map(rusqlite::params![id_str, k], map_history_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT at, kind, previous_value, new_value FROM history
             WHERE commitment_id = ?1 ORDER BY seq",
          )?;
          stmt
            .query_map(rusqlite::params![id_str], map_history_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    let mut entries = Vec::with_capacity(raws.len());
    let mut skipped = 0usize;
    for raw in raws {
      match raw.into_entry() {
        Some(entry) => entries.push(entry),
        None => skipped += 1,
      }
    }
    if skipped > 0 {
      tracing::warn!(commitment_id = %id, skipped, "skipped malformed ledger rows");
    }
    Ok((entries, skipped))
  }

  async fn load_commitment(&self, id: Uuid) -> Result<Option<Commitment>> {
    let Some(raw) = self.load_raw_commitment(id).await? else {
      return Ok(None);
    };
    let (entries, _skipped) = self.load_history_rows(id, None).await?;
    Ok(Some(raw.into_commitment(History::from_entries(entries))?))
  }

  /// Load, apply an engine operation, and persist the mutated fields plus
  /// whatever the operation appended to the ledger.
  async fn mutate<F>(&self, id: Uuid, op: F) -> Result<Commitment>
  where
    F: FnOnce(&mut Commitment) -> tally_core::Result<()> + Send,
  {
    let mut commitment = self
      .load_commitment(id)
      .await?
      .ok_or(Error::CommitmentNotFound(id))?;
    let base_len = commitment.history.len();

    op(&mut commitment)?;

    self.persist_mutation(&commitment, base_len).await?;
    Ok(commitment)
  }

  /// Write back the mutable columns and insert ledger rows with
  /// `seq >= base_len`. Existing ledger rows are never touched.
  async fn persist_mutation(
    &self,
    commitment: &Commitment,
    base_len: usize,
  ) -> Result<()> {
    let id_str = encode_uuid(commitment.id);
    let cycle_str = encode_cycle(&commitment.cycle)?;
    let status_str = encode_status(commitment.status).to_owned();
    let next_str = encode_dt(commitment.next_occurrence);
    let amount_str = encode_amount(commitment.amount);
    let notes = commitment.notes.clone();

    let new_rows: Vec<(i64, String, String, Option<String>, Option<String>)> =
      commitment.history.entries()[base_len..]
        .iter()
        .enumerate()
        .map(|(offset, e)| {
          (
            (base_len + offset) as i64,
            encode_dt(e.at),
            e.kind.discriminant().to_owned(),
            e.previous.clone(),
            e.new.clone(),
          )
        })
        .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE commitments
           SET cycle = ?2, status = ?3, next_occurrence = ?4,
               amount = ?5, notes = ?6
           WHERE commitment_id = ?1",
          rusqlite::params![
            id_str, cycle_str, status_str, next_str, amount_str, notes
          ],
        )?;
        for (seq, at, kind, previous, new) in &new_rows {
          tx.execute(
            "INSERT INTO history
               (commitment_id, seq, at, kind, previous_value, new_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id_str, seq, at, kind, previous, new],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Test hook for injecting rows the public API would never write.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fallback_category_id(&self) -> Result<Uuid> {
    let id_str: String = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT category_id FROM categories WHERE is_system = 1 AND name = ?1",
          rusqlite::params![FALLBACK_CATEGORY_NAME],
          |row| row.get(0),
        )?)
      })
      .await?;
    crate::encode::decode_uuid(&id_str)
  }
}

fn map_commitment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCommitment> {
  Ok(RawCommitment {
    commitment_id:   row.get(0)?,
    title:           row.get(1)?,
    start_date:      row.get(2)?,
    cycle:           row.get(3)?,
    status:          row.get(4)?,
    next_occurrence: row.get(5)?,
    amount:          row.get(6)?,
    currency:        row.get(7)?,
    notes:           row.get(8)?,
    tags:            row.get(9)?,
    category_id:     row.get(10)?,
    created_at:      row.get(11)?,
  })
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawHistoryEntry> {
  Ok(RawHistoryEntry {
    at:             row.get(0)?,
    kind:           row.get(1)?,
    previous_value: row.get(2)?,
    new_value:      row.get(3)?,
  })
}

// ─── CommitmentStore impl ────────────────────────────────────────────────────

impl CommitmentStore for SqliteStore {
  type Error = Error;

  // ── Commitments ───────────────────────────────────────────────────────────

  async fn add_commitment(&self, input: NewCommitment) -> Result<Commitment> {
    let commitment = Commitment::create(Uuid::new_v4(), input, Utc::now())?;

    let id_str = encode_uuid(commitment.id);
    let title = commitment.title.clone();
    let start_str = encode_dt(commitment.start_date);
    let cycle_str = encode_cycle(&commitment.cycle)?;
    let status_str = encode_status(commitment.status).to_owned();
    let next_str = encode_dt(commitment.next_occurrence);
    let amount_str = encode_amount(commitment.amount);
    let currency_str = encode_currency(&commitment.currency);
    let notes = commitment.notes.clone();
    let tags_str = encode_tags(&commitment.tags)?;
    let category_str = commitment.category_id.map(encode_uuid);
    let created_str = encode_dt(commitment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO commitments (
             commitment_id, title, start_date, cycle, status,
             next_occurrence, amount, currency, notes, tags,
             category_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str,
            title,
            start_str,
            cycle_str,
            status_str,
            next_str,
            amount_str,
            currency_str,
            notes,
            tags_str,
            category_str,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(commitment)
  }

  async fn get_commitment(&self, id: Uuid) -> Result<Option<Commitment>> {
    self.load_commitment(id).await
  }

  async fn list_commitments(&self, status: Option<Status>) -> Result<Vec<Commitment>> {
    let status_str = status.map(encode_status).map(str::to_owned);

    let raws: Vec<RawCommitment> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(
            "SELECT commitment_id, title, start_date, cycle, status,
                    next_occurrence, amount, currency, notes, tags,
                    category_id, created_at
             FROM commitments WHERE status = ?1 ORDER BY created_at",
          )?;
          stmt
            .query_map(rusqlite::params![s], map_commitment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT commitment_id, title, start_date, cycle, status,
                    next_occurrence, amount, currency, notes, tags,
                    category_id, created_at
             FROM commitments ORDER BY created_at",
          )?;
          stmt
            .query_map([], map_commitment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    // Per-commitment ledger fetch; collections are personal-scale.
    let mut commitments = Vec::with_capacity(raws.len());
    for raw in raws {
      let id = crate::encode::decode_uuid(&raw.commitment_id)?;
      let (entries, _skipped) = self.load_history_rows(id, None).await?;
      commitments.push(raw.into_commitment(History::from_entries(entries))?);
    }
    Ok(commitments)
  }

  // ── Status transitions ────────────────────────────────────────────────────

  async fn pause(&self, id: Uuid, now: DateTime<Utc>) -> Result<Commitment> {
    self.mutate(id, |c| c.pause(now)).await
  }

  async fn resume(&self, id: Uuid, now: DateTime<Utc>) -> Result<Commitment> {
    self.mutate(id, |c| c.resume(now)).await
  }

  async fn archive(&self, id: Uuid, now: DateTime<Utc>) -> Result<Commitment> {
    self.mutate(id, |c| c.archive(now)).await
  }

  async fn restore(&self, id: Uuid, now: DateTime<Utc>) -> Result<Commitment> {
    self.mutate(id, |c| c.restore(now)).await
  }

  // ── Field updates ─────────────────────────────────────────────────────────

  async fn set_amount(
    &self,
    id: Uuid,
    amount: Option<Decimal>,
    now: DateTime<Utc>,
  ) -> Result<Commitment> {
    self
      .mutate(id, |c| {
        c.change_amount(amount, now);
        Ok(())
      })
      .await
  }

  async fn set_notes(
    &self,
    id: Uuid,
    notes: Option<String>,
    now: DateTime<Utc>,
  ) -> Result<Commitment> {
    self
      .mutate(id, |c| {
        c.change_notes(notes, now);
        Ok(())
      })
      .await
  }

  async fn set_cycle(
    &self,
    id: Uuid,
    cycle: Cycle,
    now: DateTime<Utc>,
  ) -> Result<Commitment> {
    self.mutate(id, |c| c.reschedule(cycle, now)).await
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn history(
    &self,
    id: Uuid,
    kind: Option<ChangeKind>,
  ) -> Result<HistoryPage> {
    if self.load_raw_commitment(id).await?.is_none() {
      return Err(Error::CommitmentNotFound(id));
    }
    let (entries, skipped) = self.load_history_rows(id, kind).await?;
    Ok(HistoryPage { entries, skipped })
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn add_category(&self, name: String, color: String) -> Result<Category> {
    let category = Category {
      id: Uuid::new_v4(),
      name,
      color,
      is_system: false,
      is_hidden: false,
    };

    let id_str = encode_uuid(category.id);
    let name = category.name.clone();
    let color = category.color.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (category_id, name, color, is_system, is_hidden)
           VALUES (?1, ?2, ?3, 0, 0)",
          rusqlite::params![id_str, name, color],
        )?;
        Ok(())
      })
      .await?;

    Ok(category)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT category_id, name, color, is_system, is_hidden
           FROM categories ORDER BY is_system DESC, name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCategory {
              category_id: row.get(0)?,
              name:        row.get(1)?,
              color:       row.get(2)?,
              is_system:   row.get(3)?,
              is_hidden:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  async fn delete_category(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let is_system: Option<bool> = self
      .conn
      .call({
        let id_str = id_str.clone();
        move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT is_system FROM categories WHERE category_id = ?1",
                rusqlite::params![id_str],
                |row| row.get(0),
              )
              .optional()?,
          )
        }
      })
      .await?;

    match is_system {
      None => return Err(Error::CategoryNotFound(id)),
      Some(true) => return Err(Error::SystemCategory(id)),
      Some(false) => {}
    }

    let fallback_str = encode_uuid(self.fallback_category_id().await?);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Reassign referencing commitments to the fallback category.
        tx.execute(
          "UPDATE commitments SET category_id = ?2 WHERE category_id = ?1",
          rusqlite::params![id_str, fallback_str],
        )?;
        tx.execute(
          "DELETE FROM categories WHERE category_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
