//! SQLite storage backend
//!
//! Edges are stored as JSON next to indexed `parent_id` / `child_id`
//! columns. Reachability is answered by one recursive CTE instead of a
//! query per tier, and each change set runs in a single transaction.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::types::{FromSql, ToSql};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Mutex;
use taproot_core::{ChangeSet, Direction, Edge, EdgeId, EdgeRepository, NodeId, Result};

/// Upper bound on bound parameters per `IN (...)` lookup
const BATCH_SIZE: usize = 500;

/// Node ids the SQLite backend can store
pub trait SqlNodeId: NodeId + ToSql + FromSql + Serialize + DeserializeOwned {}

impl<T> SqlNodeId for T where T: NodeId + ToSql + FromSql + Serialize + DeserializeOwned {}

/// SQLite storage backend
pub struct SqliteStorage<N> {
    conn: Mutex<Connection>,
    weight_fields: Vec<String>,
    _node: PhantomData<fn() -> N>,
}

impl<N: SqlNodeId> SqliteStorage<N> {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite database (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
            weight_fields: vec![taproot_core::limits::DEFAULT_WEIGHT_FIELD.to_string()],
            _node: PhantomData,
        };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Declare an edge metadata key usable as a weight field
    pub fn with_weight_field(mut self, field: impl Into<String>) -> Self {
        self.weight_fields.push(field.into());
        self
    }

    fn init_tables(&self) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        // Id columns are untyped so integer and text ids keep their type
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id PRIMARY KEY NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                parent_id NOT NULL,
                child_id NOT NULL,
                edge_type TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_edges_parent ON edges(parent_id);
            CREATE INDEX IF NOT EXISTS idx_edges_child ON edges(child_id);
            "#,
        )?;

        Ok(())
    }

    fn decode_rows(
        stmt: &mut rusqlite::Statement<'_>,
        params: &[&dyn ToSql],
    ) -> StorageResult<Vec<Edge<N>>> {
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

        let mut edges = Vec::new();
        for row in rows {
            let data = row?;
            edges.push(serde_json::from_str(&data)?);
        }
        Ok(edges)
    }

    fn node_exists_in(tx: &Transaction<'_>, node: &N) -> StorageResult<bool> {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
            params![node],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Whether `to` is reachable from `from` in the uncommitted state of `tx`
    fn reaches_in(tx: &Transaction<'_>, from: &N, to: &N) -> StorageResult<bool> {
        let found: bool = tx.query_row(
            r#"
            WITH RECURSIVE walk(node) AS (
                SELECT ?1
                UNION
                SELECT e.child_id FROM edges e JOIN walk w ON e.parent_id = w.node
            )
            SELECT EXISTS(SELECT 1 FROM walk WHERE node = ?2)
            "#,
            params![from, to],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn apply_in(tx: &Transaction<'_>, changes: &ChangeSet<N>) -> StorageResult<()> {
        for id in &changes.delete_edges {
            tx.execute("DELETE FROM edges WHERE id = ?1", params![id.to_string()])?;
        }
        for node in &changes.delete_nodes {
            tx.execute(
                "DELETE FROM edges WHERE parent_id = ?1 OR child_id = ?1",
                params![node],
            )?;
            tx.execute("DELETE FROM nodes WHERE id = ?1", params![node])?;
        }
        for node in &changes.insert_nodes {
            tx.execute("INSERT OR IGNORE INTO nodes (id) VALUES (?1)", params![node])?;
        }

        for edge in &changes.insert_edges {
            for end in [&edge.parent, &edge.child] {
                if !Self::node_exists_in(tx, end)? {
                    return Err(StorageError::NodeNotFound(end.to_string()));
                }
            }
            let data = serde_json::to_string(edge)?;
            tx.execute(
                "INSERT INTO edges (id, parent_id, child_id, edge_type, data) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![edge.id.to_string(), edge.parent, edge.child, edge.edge_type, data],
            )?;
        }

        if changes.guard_acyclic {
            for edge in &changes.insert_edges {
                if Self::reaches_in(tx, &edge.child, &edge.parent)? {
                    return Err(StorageError::cycle(&edge.parent, &edge.child));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<N: SqlNodeId> EdgeRepository<N> for SqliteStorage<N> {
    async fn save_node(&self, node: &N) -> Result<()> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        conn.execute("INSERT OR IGNORE INTO nodes (id) VALUES (?1)", params![node])
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn node_exists(&self, node: &N) -> Result<bool> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM nodes WHERE id = ?1)",
                params![node],
                |row| row.get(0),
            )
            .map_err(StorageError::from)?;
        Ok(exists)
    }

    async fn nodes(&self) -> Result<Vec<N>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let mut stmt = conn
            .prepare("SELECT id FROM nodes")
            .map_err(StorageError::from)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, N>(0))
            .map_err(StorageError::from)?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row.map_err(StorageError::from)?);
        }
        nodes.sort();
        Ok(nodes)
    }

    async fn edge(&self, id: &EdgeId) -> Result<Option<Edge<N>>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM edges WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn edges(&self) -> Result<Vec<Edge<N>>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let mut stmt = conn
            .prepare("SELECT data FROM edges")
            .map_err(StorageError::from)?;
        Ok(Self::decode_rows(&mut stmt, &[])?)
    }

    async fn edges_touching(&self, nodes: &[N], direction: Direction) -> Result<Vec<Edge<N>>> {
        let conn = self.conn.lock().map_err(StorageError::lock)?;
        let mut edges = Vec::new();

        for chunk in nodes.chunks(BATCH_SIZE) {
            let placeholders = (1..=chunk.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let condition = match direction {
                Direction::Outgoing => format!("parent_id IN ({})", placeholders),
                Direction::Incoming => format!("child_id IN ({})", placeholders),
                Direction::Both => format!(
                    "parent_id IN ({0}) OR child_id IN ({0})",
                    placeholders
                ),
            };
            let sql = format!("SELECT data FROM edges WHERE {}", condition);

            let mut stmt = conn.prepare(&sql).map_err(StorageError::from)?;
            let values: Vec<&dyn ToSql> = chunk.iter().map(|n| n as &dyn ToSql).collect();
            edges.extend(Self::decode_rows(&mut stmt, &values)?);
        }

        Ok(edges)
    }

    /// One recursive query over the edge table.
    ///
    /// The walk is capped at the node count, which bounds every shortest
    /// hop distance, so unbounded requests still terminate.
    async fn reachable_edges(
        &self,
        seeds: &[N],
        direction: Direction,
        max_depth: u32,
    ) -> Result<Vec<Edge<N>>> {
        if seeds.is_empty() || max_depth == 0 {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().map_err(StorageError::lock)?;

        let node_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        let limit = i64::from(max_depth).min(node_count.max(1));

        let seed_rows = (0..seeds.len())
            .map(|i| format!("(?{})", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let (step, touching) = match direction {
            Direction::Outgoing => (
                "SELECT e.child_id, w.depth + 1 FROM edges e JOIN walk w ON e.parent_id = w.node",
                "parent_id IN (SELECT node FROM walk)",
            ),
            Direction::Incoming => (
                "SELECT e.parent_id, w.depth + 1 FROM edges e JOIN walk w ON e.child_id = w.node",
                "child_id IN (SELECT node FROM walk)",
            ),
            Direction::Both => (
                "SELECT CASE WHEN e.parent_id = w.node THEN e.child_id ELSE e.parent_id END, w.depth + 1 \
                 FROM edges e JOIN walk w ON e.parent_id = w.node OR e.child_id = w.node",
                "parent_id IN (SELECT node FROM walk) OR child_id IN (SELECT node FROM walk)",
            ),
        };
        // walk holds every node within limit - 1 hops; their edges are the result
        let sql = format!(
            r#"
            WITH RECURSIVE
                seeds(node) AS (VALUES {seed_rows}),
                walk(node, depth) AS (
                    SELECT node, 0 FROM seeds
                    UNION
                    {step} WHERE w.depth + 1 < ?1
                )
            SELECT data FROM edges WHERE {touching}
            "#
        );

        let mut values: Vec<&dyn ToSql> = vec![&limit];
        values.extend(seeds.iter().map(|n| n as &dyn ToSql));

        let mut stmt = conn.prepare(&sql).map_err(StorageError::from)?;
        let edges = Self::decode_rows(&mut stmt, &values)?;
        tracing::debug!(
            "Recursive fetch from {} seeds returned {} edges (depth={})",
            seeds.len(),
            edges.len(),
            limit
        );
        Ok(edges)
    }

    fn weight_fields(&self) -> Vec<String> {
        self.weight_fields.clone()
    }

    async fn apply(&self, changes: ChangeSet<N>) -> Result<()> {
        let mut conn = self.conn.lock().map_err(StorageError::lock)?;
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        // Dropping the transaction on error rolls it back
        Self::apply_in(&tx, &changes)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tracing::debug!(
            "Committed change set: +{} edges, -{} edges",
            changes.insert_edges.len(),
            changes.delete_edges.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taproot_core::{DagEngine, Error, NewEdge, TraversalFilter};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn chain(storage: &SqliteStorage<i64>, pairs: &[(i64, i64)]) {
        let conn = storage.conn.lock().unwrap();
        for (p, c) in pairs {
            for n in [p, c] {
                conn.execute("INSERT OR IGNORE INTO nodes (id) VALUES (?1)", params![n])
                    .unwrap();
            }
            let edge = Edge::new(*p, *c);
            conn.execute(
                "INSERT INTO edges (id, parent_id, child_id, edge_type, data) VALUES (?1, ?2, ?3, NULL, ?4)",
                params![edge.id.to_string(), p, c, serde_json::to_string(&edge).unwrap()],
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let storage = SqliteStorage::<i64>::in_memory().unwrap();
        chain(&storage, &[(1, 2), (2, 3)]);

        assert_eq!(storage.nodes().await.unwrap(), vec![1, 2, 3]);
        assert!(storage.node_exists(&2).await.unwrap());
        assert!(!storage.node_exists(&9).await.unwrap());

        let edges = storage
            .edges_touching(&[2], Direction::Both)
            .await
            .unwrap();
        assert_eq!(edges.len(), 2);

        let id = edges[0].id;
        assert_eq!(storage.edge(&id).await.unwrap().unwrap().id, id);
        assert!(storage.edge(&EdgeId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recursive_fetch() {
        let storage = SqliteStorage::<i64>::in_memory().unwrap();
        chain(&storage, &[(1, 2), (2, 3), (3, 4), (1, 5)]);

        let edges = storage
            .reachable_edges(&[1], Direction::Outgoing, 2)
            .await
            .unwrap();
        assert_eq!(edges.len(), 3);

        let edges = storage
            .reachable_edges(&[4], Direction::Incoming, u32::MAX)
            .await
            .unwrap();
        assert_eq!(edges.len(), 3);

        let edges = storage
            .reachable_edges(&[5], Direction::Both, 2)
            .await
            .unwrap();
        assert_eq!(edges.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_rolls_back() {
        let storage = SqliteStorage::<i64>::in_memory().unwrap();
        chain(&storage, &[(1, 2), (2, 3)]);

        let err = storage
            .apply(ChangeSet::new().insert(Edge::new(3, 4)).guarded(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));

        let err = storage
            .apply(ChangeSet::new().insert(Edge::new(3, 1)).guarded(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));
        assert_eq!(storage.edges().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_text_ids_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dag.sqlite");
        {
            let storage = Arc::new(SqliteStorage::<String>::open(&path).unwrap());
            for n in ["root", "a", "b"] {
                storage.save_node(&n.to_string()).await.unwrap();
            }
            let engine = DagEngine::with_defaults(Arc::clone(&storage));
            engine
                .add_child(&"root".to_string(), &"a".to_string(), NewEdge::new().with_weight(2.0))
                .await
                .unwrap();
            engine
                .add_child(&"a".to_string(), &"b".to_string(), NewEdge::new())
                .await
                .unwrap();
        }

        let storage = Arc::new(SqliteStorage::<String>::open(&path).unwrap());
        let engine = DagEngine::with_defaults(storage);
        let path = engine
            .weighted_path(&"root".to_string(), &"b".to_string(), None, &TraversalFilter::new())
            .await
            .unwrap();
        assert_eq!(path.nodes, vec!["root", "a", "b"]);
        assert!((path.total_weight - 3.0).abs() < 1e-9);
    }
}
