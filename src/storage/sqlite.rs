//! SQLite storage backend for provenance graphs

use super::traits::{GraphStore, OpenStore, StorageError, StorageResult};
use crate::graph::{Entity, GraphMetadata, ProvenanceGraph};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// SQLite-backed graph store
///
/// Uses a single SQLite database file with a `graphs` table and an
/// `entities` table. Entity order is kept in a `position` column so a
/// loaded graph serialises exactly like the one that was saved.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS graphs (
                name TEXT PRIMARY KEY,
                metadata_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entities (
                graph_name TEXT NOT NULL,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL,
                entity_json TEXT NOT NULL,
                PRIMARY KEY (graph_name, id),
                FOREIGN KEY (graph_name) REFERENCES graphs(name) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_entities_kind
                ON entities(graph_name, kind);

            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Number of stored entities of one kind (`step`, `file`, ...) in a graph
    pub fn count_kind(&self, name: &str, kind: &str) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE graph_name = ?1 AND kind = ?2",
            params![name, kind],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl GraphStore for SqliteStore {
    fn save_graph(&self, graph: &ProvenanceGraph) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let metadata_json = serde_json::to_string(&graph.metadata)?;
        tx.execute(
            r#"
            INSERT INTO graphs (name, metadata_json) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET metadata_json = excluded.metadata_json
            "#,
            params![graph.name, metadata_json],
        )?;

        // Snapshot semantics: the stored entity set mirrors the graph exactly.
        tx.execute(
            "DELETE FROM entities WHERE graph_name = ?1",
            params![graph.name],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO entities (graph_name, id, position, kind, entity_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, entity) in graph.entities().enumerate() {
                let json = serde_json::to_string(entity)?;
                stmt.execute(params![
                    graph.name,
                    entity.id.as_str(),
                    position as i64,
                    entity.body.kind_label(),
                    json
                ])?;
            }
        }

        tx.commit()?;
        debug!(graph = %graph.name, entities = graph.entity_count(), "saved graph snapshot");
        Ok(())
    }

    fn load_graph(&self, name: &str) -> StorageResult<Option<ProvenanceGraph>> {
        let conn = self.conn()?;

        let metadata_json: Option<String> = conn
            .query_row(
                "SELECT metadata_json FROM graphs WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        let Some(metadata_json) = metadata_json else {
            return Ok(None);
        };
        let metadata: GraphMetadata = serde_json::from_str(&metadata_json)?;

        let mut stmt = conn.prepare(
            "SELECT entity_json FROM entities WHERE graph_name = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![name], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            let entity: Entity = serde_json::from_str(&row?)?;
            entities.push(entity);
        }

        Ok(Some(ProvenanceGraph::from_entities(name, metadata, entities)))
    }

    fn list_graphs(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM graphs ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn delete_graph(&self, name: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM graphs WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EntityBody, EntityId, FileArtifact, FormalParameter, Relation};

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn create_test_graph() -> ProvenanceGraph {
        let mut graph = ProvenanceGraph::new("pipeline");
        let param = graph.get_or_create(
            "#fp-transects-1",
            EntityBody::FormalParameter(FormalParameter {
                name: "#fp-transects-1".into(),
                base_key: "transects".into(),
                version: Some(1),
                additional_type: "File".into(),
                value_required: true,
            }),
        );
        let file = graph.add_data_entity(
            "https://example.org/blob/abc/transects.geojson",
            EntityBody::File(FileArtifact {
                name: "transects.geojson".into(),
                sha256: Some("ff".into()),
                size: Some(12),
                commit_hash: Some("abc".into()),
                exists: true,
                description: None,
            }),
        );
        graph.append_unique(&file, Relation::ExampleOfWork, &param).unwrap();
        graph
    }

    #[test]
    fn test_save_and_load_graph() {
        let store = create_test_store();
        let graph = create_test_graph();
        store.save_graph(&graph).unwrap();

        let loaded = store.load_graph("pipeline").unwrap().unwrap();
        assert_eq!(loaded.entity_count(), graph.entity_count());
        let ids: Vec<_> = loaded.entities().map(|e| e.id.clone()).collect();
        let expected: Vec<_> = graph.entities().map(|e| e.id.clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(loaded.to_jsonld(), graph.to_jsonld());
    }

    #[test]
    fn test_save_replaces_snapshot() {
        let store = create_test_store();
        let mut graph = create_test_graph();
        store.save_graph(&graph).unwrap();

        graph.get_or_create(
            "#fp-extra-1",
            EntityBody::FormalParameter(FormalParameter {
                name: "#fp-extra-1".into(),
                base_key: "extra".into(),
                version: Some(1),
                additional_type: "File".into(),
                value_required: true,
            }),
        );
        store.save_graph(&graph).unwrap();

        let loaded = store.load_graph("pipeline").unwrap().unwrap();
        assert!(loaded.contains(&EntityId::from("#fp-extra-1")));
        assert_eq!(store.count_kind("pipeline", "formal_parameter").unwrap(), 2);
        assert_eq!(store.list_graphs().unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_graph() {
        let store = create_test_store();
        assert!(store.load_graph("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_graphs() {
        let store = create_test_store();
        store.save_graph(&ProvenanceGraph::new("b")).unwrap();
        store.save_graph(&ProvenanceGraph::new("a")).unwrap();
        assert_eq!(store.list_graphs().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_delete_graph_cascades() {
        let store = create_test_store();
        store.save_graph(&create_test_graph()).unwrap();

        assert!(store.delete_graph("pipeline").unwrap());
        assert!(!store.delete_graph("pipeline").unwrap());
        assert!(store.load_graph("pipeline").unwrap().is_none());
        assert_eq!(store.count_kind("pipeline", "file").unwrap(), 0);
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prov.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_graph(&create_test_graph()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.load_graph("pipeline").unwrap().is_some());
    }
}
