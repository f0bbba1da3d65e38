//! Config, metadata, and type-schema operations for [`SqliteStore`].

use std::collections::HashMap;

use rusqlite::{Connection, params};

use beads_core::schema::TypeSchema;

use crate::error::{Result, StorageError};
use crate::sqlite::issues::type_schema_on_conn;
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn set_config_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_config_on_conn(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("config", key),
        other => StorageError::Query(other),
    })
}

pub(crate) fn set_metadata_on_conn(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn get_metadata_on_conn(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("metadata", key),
        other => StorageError::Query(other),
    })
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn set_config_impl(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        set_config_on_conn(&conn, key, value)
    }

    pub fn get_config_impl(&self, key: &str) -> Result<String> {
        let conn = self.lock_conn()?;
        get_config_on_conn(&conn, key)
    }

    pub fn get_all_config_impl(&self) -> Result<HashMap<String, String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (k, v) = row?;
            map.insert(k, v);
        }
        Ok(map)
    }

    pub fn set_metadata_impl(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        set_metadata_on_conn(&conn, key, value)
    }

    pub fn get_metadata_impl(&self, key: &str) -> Result<String> {
        let conn = self.lock_conn()?;
        get_metadata_on_conn(&conn, key)
    }

    /// Clears per-issue export hashes and drops the stored journal content
    /// hash so the next export is forced full.
    pub fn clear_all_export_hashes_impl(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("UPDATE issues SET export_hash = ''", [])?;
        conn.execute(
            "DELETE FROM metadata WHERE key = 'jsonl_content_hash'",
            [],
        )?;
        Ok(())
    }

    // -- Type schemas --------------------------------------------------------

    pub fn set_type_schema_impl(&self, issue_type: &str, schema: &TypeSchema) -> Result<()> {
        let conn = self.lock_conn()?;
        let json = serde_json::to_string(schema)?;
        conn.execute(
            "INSERT OR REPLACE INTO type_schemas (issue_type, schema) VALUES (?1, ?2)",
            params![issue_type, json],
        )?;
        Ok(())
    }

    pub fn get_type_schema_impl(&self, issue_type: &str) -> Result<Option<TypeSchema>> {
        let conn = self.lock_conn()?;
        type_schema_on_conn(&conn, issue_type)
    }

    pub fn list_type_schemas_impl(&self) -> Result<Vec<(String, TypeSchema)>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT issue_type, schema FROM type_schemas ORDER BY issue_type")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut schemas = Vec::new();
        for row in rows {
            let (t, json) = row?;
            schemas.push((t, serde_json::from_str(&json)?));
        }
        Ok(schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_set_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_config_impl("issue_prefix", "proj").unwrap();
        assert_eq!(store.get_config_impl("issue_prefix").unwrap(), "proj");

        // Overwrite.
        store.set_config_impl("issue_prefix", "other").unwrap();
        assert_eq!(store.get_config_impl("issue_prefix").unwrap(), "other");
    }

    #[test]
    fn config_missing_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get_config_impl("no.such.key").unwrap_err().is_not_found());
    }

    #[test]
    fn metadata_set_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_metadata_impl("repo_id", "abc123").unwrap();
        assert_eq!(store.get_metadata_impl("repo_id").unwrap(), "abc123");
    }

    #[test]
    fn all_config_includes_defaults() {
        let store = SqliteStore::open_in_memory().unwrap();
        let all = store.get_all_config_impl().unwrap();
        assert!(all.contains_key("types.custom"));
        assert!(all.contains_key("sync.mode"));
    }

    #[test]
    fn clear_export_hashes_drops_content_hash() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_metadata_impl("jsonl_content_hash", "deadbeef").unwrap();
        store.clear_all_export_hashes_impl().unwrap();
        assert!(store
            .get_metadata_impl("jsonl_content_hash")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn type_schema_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let schema = TypeSchema {
            required_fields: vec!["description".into()],
            required_labels: vec!["team:*".into()],
        };
        store.set_type_schema_impl("bug", &schema).unwrap();

        let got = store.get_type_schema_impl("bug").unwrap().unwrap();
        assert_eq!(got, schema);
        assert!(store.get_type_schema_impl("task").unwrap().is_none());

        let all = store.list_type_schemas_impl().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "bug");
    }
}
