//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecipeStore trait.

use crate::extract::NormalizedRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecipeStore, StorageError, StorageResult, UpsertOutcome};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteRecipeStore {
    conn: Connection,
}

impl SqliteRecipeStore {
    /// Opens or creates the database file and applies the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of ingredient rows stored for a recipe
    pub fn count_ingredients(&self, slug: &str) -> StorageResult<u64> {
        self.count_children("ingredients", slug)
    }

    /// Number of instruction rows stored for a recipe
    pub fn count_instructions(&self, slug: &str) -> StorageResult<u64> {
        self.count_children("instructions", slug)
    }

    fn count_children(&self, table: &str, slug: &str) -> StorageResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} c JOIN recipes r ON r.id = c.recipe_id WHERE r.slug = ?1",
            table
        );
        let count: i64 = self.conn.query_row(&sql, params![slug], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn slug_exists(conn: &Connection, slug: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM recipes WHERE slug = ?1",
        params![slug],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

fn insert_recipe(tx: &Transaction<'_>, record: &NormalizedRecord) -> StorageResult<()> {
    tx.execute(
        "INSERT INTO recipes (slug, name, description, source_url, prep_time_minutes,
                              cook_time_minutes, total_time_minutes, servings, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.slug,
            record.name,
            record.description,
            record.source_url,
            record.prep_time_minutes,
            record.cook_time_minutes,
            record.total_time_minutes,
            record.servings,
            Utc::now().to_rfc3339(),
        ],
    )?;
    let recipe_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO ingredients (recipe_id, position, name, quantity, unit, preparation,
                                      is_optional, original)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for (position, ing) in record.ingredients.iter().enumerate() {
            stmt.execute(params![
                recipe_id,
                position as i64,
                ing.name,
                ing.quantity,
                ing.unit,
                ing.preparation,
                ing.is_optional,
                ing.original,
            ])?;
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO instructions (recipe_id, step_number, text, variants, duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for step in &record.instructions {
            let variants = serde_json::to_string(&step.variants)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            stmt.execute(params![
                recipe_id,
                step.step_number,
                step.text,
                variants,
                step.duration_minutes,
            ])?;
        }
    }

    if let Some(n) = &record.nutrition {
        tx.execute(
            "INSERT INTO nutrition (recipe_id, calories, protein_g, carbs_g, fat_g,
                                    saturated_fat_g, fiber_g, sugar_g, salt_g, sodium_mg)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                recipe_id,
                n.calories,
                n.protein_g,
                n.carbs_g,
                n.fat_g,
                n.saturated_fat_g,
                n.fiber_g,
                n.sugar_g,
                n.salt_g,
                n.sodium_mg,
            ],
        )?;
    }

    {
        let mut stmt =
            tx.prepare("INSERT INTO images (recipe_id, position, url) VALUES (?1, ?2, ?3)")?;
        for (position, url) in record.image_urls.iter().enumerate() {
            stmt.execute(params![recipe_id, position as i64, url])?;
        }
    }

    Ok(())
}

impl RecipeStore for SqliteRecipeStore {
    // ===== Recipes =====

    fn exists(&self, slug: &str) -> StorageResult<bool> {
        Ok(slug_exists(&self.conn, slug)?)
    }

    fn upsert_recipe(&mut self, record: &NormalizedRecord) -> StorageResult<UpsertOutcome> {
        if record.slug.is_empty() {
            return Err(StorageError::MissingSlug(record.source_url.clone()));
        }

        let tx = self.conn.transaction()?;
        if slug_exists(&tx, &record.slug)? {
            return Ok(UpsertOutcome::AlreadyExists);
        }

        // Dropping the transaction on error rolls back every part
        insert_recipe(&tx, record)?;
        tx.commit()?;

        tracing::debug!("Stored recipe {}", record.slug);
        Ok(UpsertOutcome::Created)
    }

    fn count_recipes(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }
}
