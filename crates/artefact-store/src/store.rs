use std::path::Path;

use artefact_types::{
    ArtefactRecord, ArtefactStatus, CalendarKey, GeneratedContent, RecentEntry, Translations,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::{Result, StoreError};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const COLUMNS: &str = "id, date, title, description, latitude, longitude, location_name, \
     model_prompt, source_event, asset_ref, pipeline_state, status, translations, created_at";

/// Thin repository over SQLite: one artefact row per calendar key.
///
/// Thread-safe via internal `Mutex<Connection>`. Every read observes every
/// earlier write made through the same store.
pub struct ArtefactStore {
    conn: Mutex<Connection>,
}

impl ArtefactStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        let conn = self.conn.get_mut();
        embedded::migrations::runner()
            .run(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Insert or overwrite the record for `key`, forcing status `generating`.
    ///
    /// The content fields and the checkpoint are replaced and translations of
    /// the previous content are dropped. Row identity and creation time are kept.
    pub fn upsert_pending(
        &self,
        key: CalendarKey,
        content: &GeneratedContent,
        state: Option<&str>,
    ) -> Result<ArtefactRecord> {
        let sql = format!(
            "INSERT INTO artefacts (date, title, description, latitude, longitude, location_name,
                                    model_prompt, source_event, asset_ref, pipeline_state, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, '', ?9, 'generating', ?10)
             ON CONFLICT(date) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                location_name = excluded.location_name,
                model_prompt = excluded.model_prompt,
                source_event = excluded.source_event,
                pipeline_state = excluded.pipeline_state,
                translations = NULL,
                status = 'generating'
             RETURNING {COLUMNS}"
        );
        let record = self.conn().query_row(
            &sql,
            params![
                key.as_string(),
                content.title,
                content.description,
                content.latitude,
                content.longitude,
                content.location_name,
                content.model_prompt,
                content.source_event,
                state,
                Utc::now().to_rfc3339(),
            ],
            row_to_record,
        )?;
        debug!(key = %key, has_state = state.is_some(), "Upserted pending artefact");
        Ok(record)
    }

    /// Replace only the checkpoint blob.
    pub fn update_state(&self, key: CalendarKey, state: &str) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE artefacts SET pipeline_state = ?1 WHERE date = ?2",
            params![state, key.as_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(key));
        }
        debug!(key = %key, "Checkpoint written");
        Ok(())
    }

    /// Move a non-completed record back to `generating`, keeping its checkpoint.
    pub fn reopen(&self, key: CalendarKey) -> Result<ArtefactRecord> {
        let sql = format!(
            "UPDATE artefacts SET status = 'generating'
             WHERE date = ?1 AND status != 'completed'
             RETURNING {COLUMNS}"
        );
        self.conn()
            .query_row(&sql, params![key.as_string()], row_to_record)
            .optional()?
            .ok_or(StoreError::NotFound(key))
    }

    /// Mark the record completed with its asset reference and drop the checkpoint.
    pub fn complete(&self, key: CalendarKey, asset_ref: &str) -> Result<ArtefactRecord> {
        let sql = format!(
            "UPDATE artefacts
             SET asset_ref = ?1, status = 'completed', pipeline_state = NULL
             WHERE date = ?2
             RETURNING {COLUMNS}"
        );
        let record = self
            .conn()
            .query_row(&sql, params![asset_ref, key.as_string()], row_to_record)
            .optional()?
            .ok_or(StoreError::NotFound(key))?;
        debug!(key = %key, asset_ref, "Artefact completed");
        Ok(record)
    }

    /// Best-effort failure marking.
    ///
    /// A missing or already failed record is not an error, and a completed
    /// record is never demoted. The checkpoint is kept so the key can resume.
    pub fn fail(&self, key: CalendarKey) -> Result<()> {
        let changed = self.conn().execute(
            "UPDATE artefacts SET status = 'failed' WHERE date = ?1 AND status != 'completed'",
            params![key.as_string()],
        )?;
        debug!(key = %key, changed, "Artefact marked failed");
        Ok(())
    }

    /// Delete the record for `key`. Returns whether a row was removed.
    pub fn delete(&self, key: CalendarKey) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM artefacts WHERE date = ?1",
            params![key.as_string()],
        )?;
        Ok(changed > 0)
    }

    /// Store translations without touching status.
    pub fn set_translations(&self, key: CalendarKey, translations: &Translations) -> Result<()> {
        let json = serde_json::to_string(translations)?;
        let changed = self.conn().execute(
            "UPDATE artefacts SET translations = ?1 WHERE date = ?2",
            params![json, key.as_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(key));
        }
        Ok(())
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn get_by_key(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM artefacts WHERE date = ?1"),
            params![key.as_string()],
        )
    }

    pub fn get_latest_completed(&self) -> Result<Option<ArtefactRecord>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM artefacts WHERE status = 'completed'
                 ORDER BY date DESC LIMIT 1"
            ),
            [],
        )
    }

    /// Closest completed record strictly before `key`.
    pub fn get_prev_completed(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM artefacts WHERE date < ?1 AND status = 'completed'
                 ORDER BY date DESC LIMIT 1"
            ),
            params![key.as_string()],
        )
    }

    /// Closest completed record strictly after `key`.
    pub fn get_next_completed(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.query_one(
            &format!(
                "SELECT {COLUMNS} FROM artefacts WHERE date > ?1 AND status = 'completed'
                 ORDER BY date ASC LIMIT 1"
            ),
            params![key.as_string()],
        )
    }

    /// The in-flight (`generating`) record for `key`, if any.
    pub fn get_pending(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.query_one(
            &format!("SELECT {COLUMNS} FROM artefacts WHERE date = ?1 AND status = 'generating'"),
            params![key.as_string()],
        )
    }

    /// Completed keys, newest first.
    pub fn list_completed_keys(&self) -> Result<Vec<CalendarKey>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT date FROM artefacts WHERE status = 'completed' ORDER BY date DESC")?;
        let iter = stmt.query_map([], |row| {
            let date: String = row.get(0)?;
            CalendarKey::parse(&date).map_err(|e| conversion_error(0, e))
        })?;

        let mut keys = Vec::new();
        for k in iter {
            keys.push(k?);
        }
        Ok(keys)
    }

    /// Up to `limit` completed-or-generating records strictly before `key`, newest first.
    pub fn list_recent_before(&self, key: CalendarKey, limit: usize) -> Result<Vec<RecentEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT date, title, source_event FROM artefacts
             WHERE date < ?1 AND (status = 'completed' OR status = 'generating')
             ORDER BY date DESC LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let iter = stmt.query_map(params![key.as_string(), limit], |row| {
            let date: String = row.get(0)?;
            Ok(RecentEntry {
                key: CalendarKey::parse(&date).map_err(|e| conversion_error(0, e))?,
                title: row.get(1)?,
                source_event: row.get(2)?,
            })
        })?;

        let mut entries = Vec::new();
        for e in iter {
            entries.push(e?);
        }
        Ok(entries)
    }

    /// Completed records that have no stored translations, newest first.
    pub fn list_missing_translations(&self) -> Result<Vec<ArtefactRecord>> {
        self.query_many(
            &format!(
                "SELECT {COLUMNS} FROM artefacts
                 WHERE status = 'completed'
                   AND (translations IS NULL OR translations = '' OR translations = '{{}}')
                 ORDER BY date DESC"
            ),
            [],
        )
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn query_one<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<ArtefactRecord>> {
        Ok(self
            .conn()
            .query_row(sql, params, row_to_record)
            .optional()?)
    }

    fn query_many<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ArtefactRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let iter = stmt.query_map(params, row_to_record)?;

        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtefactRecord> {
    let date: String = row.get(1)?;
    let status: String = row.get(11)?;
    let translations: Option<String> = row.get(12)?;

    let translations = match translations.as_deref() {
        None | Some("") => None,
        Some(json) => Some(
            serde_json::from_str::<Translations>(json).map_err(|e| conversion_error(12, e))?,
        ),
    };

    Ok(ArtefactRecord {
        id: row.get(0)?,
        key: CalendarKey::parse(&date).map_err(|e| conversion_error(1, e))?,
        title: row.get(2)?,
        description: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        location_name: row.get(6)?,
        model_prompt: row.get(7)?,
        source_event: row.get(8)?,
        asset_ref: row.get(9)?,
        pipeline_state: row.get(10)?,
        status: status
            .parse::<ArtefactStatus>()
            .map_err(|e| conversion_error(11, e))?,
        translations,
        created_at: parse_dt(&row.get::<_, String>(13)?),
    })
}
