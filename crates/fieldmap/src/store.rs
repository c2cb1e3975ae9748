//! SQLite-backed template persistence.
//!
//! The store owns the durable template records: created on successful
//! extraction+classification, read repeatedly for compilation, deleted
//! explicitly by an operator. Records are never mutated in place; a
//! re-extraction produces a new template with a new identity.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fieldmap_core::template::{CampiEstratti, Template};
use rusqlite::{params, Connection, OptionalExtension};

use crate::prelude::*;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT NOT NULL,
    fornitore TEXT,
    categoria TEXT,
    tipo_cliente TEXT,
    campi_estratti TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

pub struct TemplateStore {
    conn: Connection,
}

impl TemplateStore {
    /// Open (and initialize) a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| eyre!("Failed to open template database '{}': {}", path.display(), e))?;
        conn.execute(SCHEMA, [])
            .map_err(|e| eyre!("Failed to initialize template schema: {}", e))?;
        Ok(Self { conn })
    }

    /// Open the store at its default location under the user data dir.
    pub fn open_default() -> Result<Self> {
        Self::open(&default_db_path()?)
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }

    /// Persist a template and return its assigned id.
    pub fn insert(&self, template: &Template) -> Result<i64> {
        let campi = serde_json::to_string(&CampiEstratti {
            campi: template.campi.clone(),
        })?;

        self.conn
            .execute(
                "INSERT INTO templates (nome, fornitore, categoria, tipo_cliente, campi_estratti, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    template.nome,
                    template.fornitore,
                    template.categoria,
                    template.tipo_cliente,
                    campi,
                    template.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| eyre!("Failed to insert template: {}", e))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// All stored templates, newest first.
    pub fn list(&self) -> Result<Vec<Template>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, nome, fornitore, categoria, tipo_cliente, campi_estratti, created_at
             FROM templates ORDER BY id DESC",
        )?;

        let rows = stmt
            .query_map([], row_to_parts)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(parts_to_template).collect()
    }

    /// Fetch one template by id.
    pub fn get(&self, id: i64) -> Result<Template> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, nome, fornitore, categoria, tipo_cliente, campi_estratti, created_at
                 FROM templates WHERE id = ?1",
                params![id],
                row_to_parts,
            )
            .optional()?
            .ok_or_else(|| eyre!("Template {} not found", id))?;

        parts_to_template(parts)
    }

    /// Delete one template by id. Returns whether a record existed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

type RowParts = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parts_to_template(parts: RowParts) -> Result<Template> {
    let (id, nome, fornitore, categoria, tipo_cliente, campi_json, created_at) = parts;

    let campi: CampiEstratti = serde_json::from_str(&campi_json)
        .map_err(|e| eyre!("Template {} has a corrupt field mapping: {}", id, e))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| eyre!("Template {} has a corrupt timestamp: {}", id, e))?;

    Ok(Template {
        id: Some(id),
        nome,
        fornitore,
        categoria,
        tipo_cliente,
        campi: campi.campi,
        created_at,
    })
}

/// Default database path: `<data dir>/fieldmap/templates.db`.
fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs_next::data_dir().ok_or_else(|| eyre!("Unable to determine data directory"))?;
    Ok(data_dir.join("fieldmap").join("templates.db"))
}

/// Open the store honoring the global `--db` override.
pub fn open_store(global: &crate::Global) -> Result<TemplateStore> {
    match &global.db {
        Some(path) => TemplateStore::open(path),
        None => TemplateStore::open_default(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use fieldmap_core::classify::{AnalyzedField, Category, DataType};

    use super::*;

    fn sample_template(nome: &str) -> Template {
        let mut campi = BTreeMap::new();
        campi.insert(
            "cognome".to_string(),
            AnalyzedField {
                field_name: "cognome".to_string(),
                field_type: "text".to_string(),
                label: "Cognome".to_string(),
                data_type: DataType::Text,
                category: Category::Anagrafica,
                description: String::new(),
                required: true,
                mapping_suggestion: "cognome".to_string(),
            },
        );
        Template::new(
            nome.to_string(),
            Some("Enel".to_string()),
            Some("luce".to_string()),
            Some("domestico".to_string()),
            campi,
        )
    }

    #[test]
    fn insert_and_get_round_trip() {
        let store = TemplateStore::in_memory().unwrap();
        let id = store.insert(&sample_template("contratto-luce")).unwrap();

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.nome, "contratto-luce");
        assert_eq!(loaded.fornitore.as_deref(), Some("Enel"));
        assert_eq!(loaded.campi.len(), 1);
        assert!(loaded.campi["cognome"].required);
    }

    #[test]
    fn list_returns_newest_first() {
        let store = TemplateStore::in_memory().unwrap();
        store.insert(&sample_template("primo")).unwrap();
        store.insert(&sample_template("secondo")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].nome, "secondo");
        assert_eq!(all[1].nome, "primo");
    }

    #[test]
    fn delete_removes_record() {
        let store = TemplateStore::in_memory().unwrap();
        let id = store.insert(&sample_template("da-cancellare")).unwrap();

        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert!(store.get(id).is_err());
    }

    #[test]
    fn missing_template_is_an_error() {
        let store = TemplateStore::in_memory().unwrap();
        assert!(store.get(999).is_err());
    }

    #[test]
    fn open_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("templates.db");

        let store = TemplateStore::open(&path).unwrap();
        store.insert(&sample_template("su-disco")).unwrap();
        drop(store);

        let reopened = TemplateStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap().len(), 1);
    }
}
