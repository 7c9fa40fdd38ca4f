//! [`SqliteStore`]: the SQLite implementation of the Scribe store traits.

use std::{path::Path, sync::Arc};

use rusqlite::{OptionalExtension as _, params};
use tracing::debug;
use uuid::Uuid;

use scribe_core::{
  Document, ItemKind, ItemSummary, Operation, User,
  store::{FieldUpdate, ItemStore, OperationStore, UserDirectory},
};

use crate::{
  Result,
  encode::{ItemColumns, RawSummary, decode_uuid, encode_uuid, now},
  schema::{Tables, USERS_TABLE, schema},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Scribe store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  tables: Arc<Tables>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, tables: Tables) -> Result<Self> {
    tables.validate()?;
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, tables: Arc::new(tables) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store with the default table names; useful for
  /// testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, tables: Arc::new(Tables::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let ddl = schema(&self.tables);
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&ddl)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn tables(&self) -> &Tables { &self.tables }

  /// Delete every item and operation whose `delete_at` has passed. Returns
  /// the number of rows removed.
  pub async fn purge_expired(&self) -> Result<usize> {
    let now = now();
    let tables = [
      self.tables.report.clone(),
      self.tables.template.clone(),
      self.tables.operation.clone(),
    ];
    let removed = self
      .conn
      .call(move |conn| {
        let mut removed = 0;
        for table in &tables {
          removed += conn.execute(
            &format!("DELETE FROM {table} WHERE delete_at > 0 AND delete_at <= ?1"),
            params![now],
          )?;
        }
        Ok(removed)
      })
      .await?;
    if removed > 0 {
      debug!(removed, "purged expired rows");
    }
    Ok(removed)
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

impl ItemStore for SqliteStore {
  type Error = crate::Error;

  async fn get_item<D: Document>(&self, id: Uuid) -> Result<Option<D>> {
    let sql = format!(
      "SELECT body FROM {} WHERE item_id = ?1 AND (delete_at = 0 OR delete_at > ?2)",
      self.tables.for_kind(D::KIND)
    );
    let id = encode_uuid(id);
    let now = now();

    let body: Option<String> = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, params![id, now], |r| r.get(0)).optional()?))
      .await?;

    Ok(body.map(|b| serde_json::from_str(&b)).transpose()?)
  }

  async fn put_item<D: Document>(&self, item: D) -> Result<()> {
    let sql = format!(
      "INSERT INTO {} (item_id, owner_id, shared_with, is_deleted, delete_at, body)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT(item_id) DO UPDATE SET
         owner_id    = excluded.owner_id,
         shared_with = excluded.shared_with,
         is_deleted  = excluded.is_deleted,
         delete_at   = excluded.delete_at,
         body        = excluded.body",
      self.tables.for_kind(D::KIND)
    );
    let id      = encode_uuid(item.id());
    let columns = ItemColumns::from_meta(item.meta())?;
    let body    = serde_json::to_string(&item)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &sql,
          params![
            id,
            columns.owner_id,
            columns.shared_with,
            columns.is_deleted,
            columns.delete_at,
            body
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_fields(
    &self,
    kind: ItemKind,
    id: Uuid,
    fields: Vec<FieldUpdate>,
  ) -> Result<bool> {
    let table = self.tables.for_kind(kind).to_owned();
    let id = encode_uuid(id);
    let now = now();
    let assignments: Vec<(String, String)> = fields
      .into_iter()
      .map(|f| (format!("$.{}", f.attribute), f.value.to_string()))
      .collect();

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            &format!(
              "SELECT 1 FROM {table} WHERE item_id = ?1 AND (delete_at = 0 OR delete_at > ?2)"
            ),
            params![id, now],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(false);
        }

        let set_sql = format!("UPDATE {table} SET body = json_set(body, ?2, json(?3)) WHERE item_id = ?1");
        for (path, value) in &assignments {
          tx.execute(&set_sql, params![id, path, value])?;
        }

        // Keep the mirrored columns in step with the body.
        tx.execute(
          &format!(
            "UPDATE {table} SET
               owner_id    = COALESCE(json_extract(body, '$.OwnedBy.UserID'), owner_id),
               shared_with = COALESCE(json_extract(body, '$.SharedWithIDs'), '[]'),
               is_deleted  = COALESCE(json_extract(body, '$.IsDeleted'), 0),
               delete_at   = COALESCE(json_extract(body, '$.DeleteAt'), 0)
             WHERE item_id = ?1"
          ),
          params![id],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;
    Ok(updated)
  }

  async fn scan_metadata(
    &self,
    kind: ItemKind,
    user_id: String,
    deleted: bool,
  ) -> Result<Vec<ItemSummary>> {
    let sql = format!(
      "SELECT i.item_id, i.body FROM {} AS i
       WHERE (i.delete_at = 0 OR i.delete_at > ?2)
         AND i.is_deleted = ?3
         AND (i.owner_id = ?1
              OR (?3 = 0 AND EXISTS (
                    SELECT 1 FROM json_each(i.shared_with) WHERE json_each.value = ?1)))",
      self.tables.for_kind(kind)
    );
    let now = now();

    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![user_id, now, deleted], |r| {
            Ok(RawSummary { item_id: r.get(0)?, body: r.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut summaries =
      raws.into_iter().map(|raw| raw.decode(kind)).collect::<Result<Vec<_>>>()?;
    summaries.sort_by(|a, b| b.meta.last_modified_at.cmp(&a.meta.last_modified_at));
    Ok(summaries)
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

impl OperationStore for SqliteStore {
  type Error = crate::Error;

  async fn create_operation(&self, operation: Operation) -> Result<()> {
    let sql = format!(
      "INSERT OR REPLACE INTO {}
         (operation_id, completed, delete_at, report_id, requested_by, upload_deadline)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      self.tables.operation
    );
    let id = encode_uuid(operation.operation_id);
    let report_id = operation.report_id.map(encode_uuid);
    self
      .conn
      .call(move |conn| {
        conn.execute(&sql, params![
          id,
          operation.completed,
          operation.delete_at,
          report_id,
          operation.requested_by,
          operation.upload_deadline,
        ])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_operation_completed(&self, id: Uuid) -> Result<bool> {
    let sql = format!("UPDATE {} SET completed = 1 WHERE operation_id = ?1", self.tables.operation);
    let id = encode_uuid(id);
    let changed = self.conn.call(move |conn| Ok(conn.execute(&sql, params![id])?)).await?;
    Ok(changed > 0)
  }

  async fn get_operation(&self, id: Uuid) -> Result<Option<Operation>> {
    let sql = format!(
      "SELECT operation_id, completed, delete_at, report_id, requested_by, upload_deadline
       FROM {} WHERE operation_id = ?1 AND delete_at > ?2",
      self.tables.operation
    );
    let id = encode_uuid(id);
    let now = now();

    let raw: Option<RawOperation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params![id, now], |r| {
              Ok(RawOperation {
                operation_id:    r.get(0)?,
                completed:       r.get(1)?,
                delete_at:       r.get(2)?,
                report_id:       r.get(3)?,
                requested_by:    r.get(4)?,
                upload_deadline: r.get(5)?,
              })
            })
            .optional()?,
        )
      })
      .await?;

    raw.map(RawOperation::decode).transpose()
  }
}

struct RawOperation {
  operation_id:    String,
  completed:       bool,
  delete_at:       i64,
  report_id:       Option<String>,
  requested_by:    String,
  upload_deadline: i64,
}

impl RawOperation {
  fn decode(self) -> Result<Operation> {
    Ok(Operation {
      operation_id:    decode_uuid(&self.operation_id)?,
      completed:       self.completed,
      delete_at:       self.delete_at,
      report_id:       self.report_id.as_deref().map(decode_uuid).transpose()?,
      requested_by:    self.requested_by,
      upload_deadline: self.upload_deadline,
    })
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl UserDirectory for SqliteStore {
  type Error = crate::Error;

  async fn upsert_user(&self, user: User, username: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO {USERS_TABLE} (user_id, username, nickname) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               username = excluded.username,
               nickname = excluded.nickname"
          ),
          params![user.user_id, username, user.user_nickname],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>> {
    let user = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT user_id, nickname FROM {USERS_TABLE} WHERE user_id = ?1"),
              params![user_id],
              |r| Ok(User { user_id: r.get(0)?, user_nickname: r.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(user)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let users = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT user_id, nickname FROM {USERS_TABLE} ORDER BY nickname, user_id"))?;
        let users = stmt
          .query_map([], |r| Ok(User { user_id: r.get(0)?, user_nickname: r.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
      })
      .await?;
    Ok(users)
  }

  async fn disable_user(&self, username: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("UPDATE {USERS_TABLE} SET disabled = 1 WHERE username = ?1"),
          params![username],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}
