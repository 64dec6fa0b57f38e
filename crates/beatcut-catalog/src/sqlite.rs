//! SQLite catalog with the reference clip schema.
//!
//! Filters are pushed into SQL; the seeded shuffle and semantic ranking run in
//! Rust so results do not depend on SQLite's `RANDOM()`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use beatcut_models::{ClipId, ClipQuery, ClipRecord, ClipSignals};

use crate::error::{CatalogError, CatalogResult};
use crate::filter::{order_candidates, rank_by_similarity};
use crate::memory::validate_record;
use crate::repository::{CandidateOrder, CandidateRequest, ClipRepository};
use crate::semantic::{decode_embedding, encode_embedding, TextEmbedder};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS clips (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    video_id TEXT,
    filepath TEXT NOT NULL,
    start_time REAL,
    end_time REAL,
    duration REAL NOT NULL,
    year INTEGER,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS clip_tags (
    clip_id TEXT NOT NULL REFERENCES clips(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    similarity_score REAL NOT NULL,
    PRIMARY KEY (clip_id, tag)
);

CREATE TABLE IF NOT EXISTS clip_entities (
    clip_id TEXT NOT NULL REFERENCES clips(id) ON DELETE CASCADE,
    entity TEXT NOT NULL,
    confidence REAL NOT NULL,
    PRIMARY KEY (clip_id, entity)
);

CREATE TABLE IF NOT EXISTS clip_signals (
    clip_id TEXT PRIMARY KEY REFERENCES clips(id) ON DELETE CASCADE,
    motion_score REAL,
    silence_ratio REAL,
    noise_level REAL,
    brightness_entropy REAL
);

CREATE TABLE IF NOT EXISTS clip_embeddings (
    clip_id TEXT PRIMARY KEY REFERENCES clips(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clips_source ON clips(source);
CREATE INDEX IF NOT EXISTS idx_clips_year ON clips(year);
CREATE INDEX IF NOT EXISTS idx_clip_tags_tag ON clip_tags(tag, similarity_score);
CREATE INDEX IF NOT EXISTS idx_clip_entities_entity ON clip_entities(entity, confidence);
";

const SELECT_COLUMNS: &str = "c.id, c.filepath, c.duration, c.source, c.video_id, c.year, \
     c.start_time, c.end_time, s.motion_score, s.silence_ratio, s.noise_level, s.brightness_entropy";

/// Clip catalog stored in a SQLite database.
pub struct SqliteCatalog {
    conn: Connection,
    embedder: Option<Arc<dyn TextEmbedder + Send + Sync>>,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("path", &self.conn.path())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl SqliteCatalog {
    /// Open an existing catalog. Errors if the file doesn't exist.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::DatabaseNotFound(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, true)
    }

    /// Open or create a catalog file with the full schema.
    pub fn open_or_create(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, true)
    }

    pub fn open_in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, false)
    }

    fn from_connection(conn: Connection, on_disk: bool) -> CatalogResult<Self> {
        if on_disk {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
        }
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn,
            embedder: None,
        })
    }

    /// Attach the embedder used for semantic queries.
    pub fn with_embedder(mut self, embedder: Arc<dyn TextEmbedder + Send + Sync>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Insert or update a clip along with its tags, entities and signals.
    ///
    /// An existing embedding is kept when `embedding` is `None`.
    pub fn insert_clip(&mut self, record: &ClipRecord, embedding: Option<&[f32]>) -> CatalogResult<()> {
        validate_record(record)?;
        let id = record.clip_id.as_str();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO clips
                (id, source, video_id, filepath, start_time, end_time, duration, year)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                video_id = excluded.video_id,
                filepath = excluded.filepath,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                duration = excluded.duration,
                year = excluded.year",
            params![
                id,
                record.source,
                record.video_id,
                record.filepath,
                record.start_time,
                record.end_time,
                record.duration,
                record.year
            ],
        )?;

        tx.execute("DELETE FROM clip_tags WHERE clip_id = ?1", [id])?;
        tx.execute("DELETE FROM clip_entities WHERE clip_id = ?1", [id])?;
        tx.execute("DELETE FROM clip_signals WHERE clip_id = ?1", [id])?;
        for (tag, score) in &record.tags {
            tx.execute(
                "INSERT INTO clip_tags (clip_id, tag, similarity_score) VALUES (?1, ?2, ?3)",
                params![id, tag, score],
            )?;
        }
        for (entity, confidence) in &record.entities {
            tx.execute(
                "INSERT INTO clip_entities (clip_id, entity, confidence) VALUES (?1, ?2, ?3)",
                params![id, entity, confidence],
            )?;
        }
        if let Some(signals) = &record.signals {
            tx.execute(
                "INSERT INTO clip_signals
                    (clip_id, motion_score, silence_ratio, noise_level, brightness_entropy)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    signals.motion_score,
                    signals.silence_ratio,
                    signals.noise_level,
                    signals.brightness_entropy
                ],
            )?;
        }
        if let Some(embedding) = embedding {
            tx.execute(
                "INSERT OR REPLACE INTO clip_embeddings (clip_id, embedding) VALUES (?1, ?2)",
                params![id, encode_embedding(embedding)],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Stored embedding for a clip, if any.
    pub fn embedding(&self, clip_id: &ClipId) -> CatalogResult<Option<Vec<f32>>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM clip_embeddings WHERE clip_id = ?1",
                [clip_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(bytes) => decode_embedding(&bytes).map(Some).ok_or_else(|| {
                CatalogError::CorruptEmbedding {
                    clip_id: clip_id.to_string(),
                    len: bytes.len(),
                }
            }),
            None => Ok(None),
        }
    }

    fn query_vector(&self, query: &ClipQuery) -> Option<Vec<f32>> {
        let text = query.semantic_text()?;
        let vector = self.embedder.as_ref().and_then(|e| e.embed(text));
        if vector.is_none() {
            tracing::debug!(text, "Semantic query ignored: no embedding available");
        }
        vector
    }

    /// Run the filtered SELECT. `limit` is pushed into SQL only when no
    /// reordering happens afterwards. Tag and entity maps are left empty;
    /// callers fill them with [`Self::with_names`] once the candidate set is final.
    fn select_rows(
        &self,
        query: &ClipQuery,
        order_by: &str,
        limit: Option<usize>,
    ) -> CatalogResult<Vec<ClipRecord>> {
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(source) = &query.source {
            bind_values.push(Box::new(source.clone()));
            conditions.push(format!("c.source = ?{}", bind_values.len()));
        }
        if let Some(year_min) = query.year_min {
            bind_values.push(Box::new(year_min));
            conditions.push(format!("c.year >= ?{}", bind_values.len()));
        }
        if let Some(year_max) = query.year_max {
            bind_values.push(Box::new(year_max));
            conditions.push(format!("c.year <= ?{}", bind_values.len()));
        }

        let signal_bounds = [
            ("s.motion_score >=", query.min_motion),
            ("s.motion_score <=", query.max_motion),
            ("s.silence_ratio <=", query.max_silence),
            ("s.brightness_entropy >=", query.min_brightness),
        ];
        for (clause, bound) in signal_bounds {
            if let Some(value) = bound {
                bind_values.push(Box::new(value));
                conditions.push(format!("{clause} ?{}", bind_values.len()));
            }
        }

        if !query.tags.is_empty() {
            let names = push_all(&mut bind_values, &query.tags);
            bind_values.push(Box::new(query.min_tag_score));
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM clip_tags t WHERE t.clip_id = c.id \
                 AND t.tag IN ({names}) AND t.similarity_score >= ?{})",
                bind_values.len()
            ));
        }
        if !query.entities.is_empty() {
            let names = push_all(&mut bind_values, &query.entities);
            bind_values.push(Box::new(query.min_entity_confidence));
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM clip_entities e WHERE e.clip_id = c.id \
                 AND e.entity IN ({names}) AND e.confidence >= ?{})",
                bind_values.len()
            ));
        }
        if !query.exclude_clip_ids.is_empty() {
            let ids: Vec<String> = query
                .exclude_clip_ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect();
            let placeholders = push_all(&mut bind_values, &ids);
            conditions.push(format!("c.id NOT IN ({placeholders})"));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit_clause = match limit {
            Some(limit) => {
                bind_values.push(Box::new(limit as i64));
                format!("LIMIT ?{}", bind_values.len())
            }
            None => String::new(),
        };

        let sql = format!(
            "SELECT {SELECT_COLUMNS}
             FROM clips c
             LEFT JOIN clip_signals s ON s.clip_id = c.id
             {where_clause}
             ORDER BY {order_by}
             {limit_clause}"
        );

        let bind_refs: Vec<&dyn ToSql> = bind_values.iter().map(|b| b.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(bind_refs.as_slice(), row_to_record)?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn with_names(&self, mut records: Vec<ClipRecord>) -> CatalogResult<Vec<ClipRecord>> {
        for record in &mut records {
            self.load_names(record)?;
        }
        Ok(records)
    }

    fn load_names(&self, record: &mut ClipRecord) -> CatalogResult<()> {
        record.tags = self.load_scores(
            "SELECT tag, similarity_score FROM clip_tags WHERE clip_id = ?1",
            &record.clip_id,
        )?;
        record.entities = self.load_scores(
            "SELECT entity, confidence FROM clip_entities WHERE clip_id = ?1",
            &record.clip_id,
        )?;
        Ok(())
    }

    fn load_scores(&self, sql: &str, clip_id: &ClipId) -> CatalogResult<BTreeMap<String, f64>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map([clip_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        let mut scores = BTreeMap::new();
        for row in rows {
            let (name, score) = row?;
            scores.insert(name, score);
        }
        Ok(scores)
    }
}

impl ClipRepository for SqliteCatalog {
    fn query_clips(&self, request: &CandidateRequest) -> CatalogResult<Vec<ClipRecord>> {
        if let Some(vector) = self.query_vector(&request.query) {
            let filtered = self.select_rows(&request.query, "c.id", None)?;
            let mut embeddings = std::collections::HashMap::new();
            for record in &filtered {
                if let Some(embedding) = self.embedding(&record.clip_id)? {
                    embeddings.insert(record.clip_id.clone(), embedding);
                }
            }
            let ranked = rank_by_similarity(
                filtered,
                &vector,
                |record| embeddings.get(&record.clip_id).map(Vec::as_slice),
                request.limit,
            );
            return self.with_names(ranked);
        }

        let candidates = match request.order {
            CandidateOrder::Random { .. } => {
                let filtered = self.select_rows(&request.query, "c.id", None)?;
                order_candidates(filtered, request.order, request.limit)
            }
            CandidateOrder::Newest => self.select_rows(
                &request.query,
                "c.created_at DESC, c.rowid DESC",
                Some(request.limit),
            )?,
        };
        self.with_names(candidates)
    }

    fn clip_count(&self) -> CatalogResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM clips", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Bind every value and return the comma-separated placeholders.
fn push_all(bind_values: &mut Vec<Box<dyn ToSql>>, values: &[String]) -> String {
    let mut placeholders = Vec::with_capacity(values.len());
    for value in values {
        bind_values.push(Box::new(value.clone()));
        placeholders.push(format!("?{}", bind_values.len()));
    }
    placeholders.join(", ")
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ClipRecord> {
    let duration: f64 = row.get(2)?;
    let start_time: Option<f64> = row.get(6)?;
    let end_time: Option<f64> = row.get(7)?;
    let motion_score: Option<f64> = row.get(8)?;

    let signals = match motion_score {
        Some(motion_score) => Some(ClipSignals {
            motion_score,
            silence_ratio: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
            noise_level: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
            brightness_entropy: row.get::<_, Option<f64>>(11)?.unwrap_or(0.0),
        }),
        None => None,
    };

    Ok(ClipRecord {
        clip_id: ClipId::from_string(row.get::<_, String>(0)?),
        filepath: row.get(1)?,
        duration,
        source: row.get(3)?,
        video_id: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        year: row.get(5)?,
        start_time: start_time.unwrap_or(0.0),
        end_time: end_time.unwrap_or(duration),
        tags: BTreeMap::new(),
        entities: BTreeMap::new(),
        signals,
        similarity: None,
    })
}
