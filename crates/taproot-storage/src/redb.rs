//! ReDB storage backend
//!
//! Nodes are keyed by their JSON encoding and edges by their ULID, both
//! with JSON values. Two multimap tables index edge ids by parent and by
//! child, so lookups decode only the edges they return and a traversal
//! runs inside one read transaction. A change set is applied inside one
//! write transaction that is aborted on the first failed check.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use redb::{
    Database, MultimapTable, MultimapTableDefinition, ReadableMultimapTable, ReadableTable, Table,
    TableDefinition, WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Mutex;
use taproot_core::{
    ChangeSet, Direction, Edge, EdgeId, EdgeIndex, EdgeRepository, Frontier, NodeId, Result,
};

// Table definitions
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
const EDGES: TableDefinition<&str, &[u8]> = TableDefinition::new("edges");

// node key -> ids of edges leaving / entering the node
const CHILD_EDGES: MultimapTableDefinition<&str, &str> = MultimapTableDefinition::new("child_edges");
const PARENT_EDGES: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("parent_edges");

/// Tables opened by one write transaction
struct WriteTables<'t> {
    nodes: Table<'t, &'static str, &'static [u8]>,
    edges: Table<'t, &'static str, &'static [u8]>,
    children: MultimapTable<'t, &'static str, &'static str>,
    parents: MultimapTable<'t, &'static str, &'static str>,
}

impl<'t> WriteTables<'t> {
    fn open(write_txn: &'t WriteTransaction) -> StorageResult<Self> {
        Ok(Self {
            nodes: write_txn.open_table(NODES)?,
            edges: write_txn.open_table(EDGES)?,
            children: write_txn.open_multimap_table(CHILD_EDGES)?,
            parents: write_txn.open_multimap_table(PARENT_EDGES)?,
        })
    }
}

/// ReDB storage backend
pub struct RedbStorage<N> {
    db: Mutex<Database>,
    weight_fields: Vec<String>,
    _node: PhantomData<fn() -> N>,
}

impl<N: NodeId + Serialize + DeserializeOwned> RedbStorage<N> {
    /// Open or create a ReDB database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Initialize tables
        {
            let write_txn = db.begin_write()?;
            WriteTables::open(&write_txn)?;
            write_txn.commit()?;
        }

        Ok(Self {
            db: Mutex::new(db),
            weight_fields: vec![taproot_core::limits::DEFAULT_WEIGHT_FIELD.to_string()],
            _node: PhantomData,
        })
    }

    /// Declare an edge metadata key usable as a weight field
    pub fn with_weight_field(mut self, field: impl Into<String>) -> Self {
        self.weight_fields.push(field.into());
        self
    }

    fn node_key(node: &N) -> StorageResult<String> {
        Ok(serde_json::to_string(node)?)
    }

    fn read_edges<T>(table: &T) -> StorageResult<Vec<Edge<N>>>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let mut edges = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            edges.push(serde_json::from_slice(value.value())?);
        }
        Ok(edges)
    }

    /// Ids of the edges indexed under `node`
    fn indexed_ids<M>(index: &M, node: &N, ids: &mut BTreeSet<String>) -> StorageResult<()>
    where
        M: ReadableMultimapTable<&'static str, &'static str>,
    {
        let key = Self::node_key(node)?;
        for id in index.get(key.as_str())? {
            ids.insert(id?.value().to_string());
        }
        Ok(())
    }

    /// Edges touching `nodes`, decoded through the adjacency tables
    fn touching_in<T, M>(
        edges: &T,
        children: &M,
        parents: &M,
        nodes: &[N],
        direction: Direction,
    ) -> StorageResult<Vec<Edge<N>>>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
        M: ReadableMultimapTable<&'static str, &'static str>,
    {
        let mut ids = BTreeSet::new();
        for node in nodes {
            if matches!(direction, Direction::Outgoing | Direction::Both) {
                Self::indexed_ids(children, node, &mut ids)?;
            }
            if matches!(direction, Direction::Incoming | Direction::Both) {
                Self::indexed_ids(parents, node, &mut ids)?;
            }
        }

        let mut found = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(value) = edges.get(id.as_str())? {
                found.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(found)
    }

    fn all_edges(&self) -> StorageResult<Vec<Edge<N>>> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(EDGES)?;
        Self::read_edges(&table)
    }

    fn touching(&self, nodes: &[N], direction: Direction) -> StorageResult<Vec<Edge<N>>> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read()?;
        let edges = read_txn.open_table(EDGES)?;
        let children = read_txn.open_multimap_table(CHILD_EDGES)?;
        let parents = read_txn.open_multimap_table(PARENT_EDGES)?;
        Self::touching_in(&edges, &children, &parents, nodes, direction)
    }

    fn reachable(
        &self,
        seeds: &[N],
        direction: Direction,
        max_depth: u32,
    ) -> StorageResult<Vec<Edge<N>>> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read()?;
        let edges = read_txn.open_table(EDGES)?;
        let children = read_txn.open_multimap_table(CHILD_EDGES)?;
        let parents = read_txn.open_multimap_table(PARENT_EDGES)?;

        let mut frontier = Frontier::new(seeds, direction, max_depth);
        while let Some(tier) = frontier.next_tier() {
            let batch = Self::touching_in(&edges, &children, &parents, &tier, direction)?;
            frontier.absorb(batch);
        }
        Ok(frontier.into_edges())
    }

    fn remove_edge_in(tables: &mut WriteTables<'_>, id: &str) -> StorageResult<()> {
        let removed: Option<Edge<N>> = match tables.edges.remove(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        if let Some(edge) = removed {
            tables
                .children
                .remove(Self::node_key(&edge.parent)?.as_str(), id)?;
            tables
                .parents
                .remove(Self::node_key(&edge.child)?.as_str(), id)?;
        }
        Ok(())
    }

    fn apply_in(write_txn: &WriteTransaction, changes: &ChangeSet<N>) -> StorageResult<()> {
        let mut tables = WriteTables::open(write_txn)?;

        for id in &changes.delete_edges {
            Self::remove_edge_in(&mut tables, &id.to_string())?;
        }
        for node in &changes.delete_nodes {
            tables.nodes.remove(Self::node_key(node)?.as_str())?;
            let mut attached = BTreeSet::new();
            Self::indexed_ids(&tables.children, node, &mut attached)?;
            Self::indexed_ids(&tables.parents, node, &mut attached)?;
            for id in &attached {
                Self::remove_edge_in(&mut tables, id)?;
            }
        }
        for node in &changes.insert_nodes {
            let key = Self::node_key(node)?;
            tables.nodes.insert(key.as_str(), key.as_bytes())?;
        }

        for edge in &changes.insert_edges {
            for end in [&edge.parent, &edge.child] {
                if !Self::contains(&tables.nodes, end)? {
                    return Err(StorageError::NodeNotFound(end.to_string()));
                }
            }
            let id = edge.id.to_string();
            let value = serde_json::to_vec(edge)?;
            tables.edges.insert(id.as_str(), value.as_slice())?;
            tables
                .children
                .insert(Self::node_key(&edge.parent)?.as_str(), id.as_str())?;
            tables
                .parents
                .insert(Self::node_key(&edge.child)?.as_str(), id.as_str())?;
        }

        if changes.guard_acyclic {
            let index = EdgeIndex::new(Self::read_edges(&tables.edges)?);
            if let Some(edge) = index.closing_edge(&changes.insert_edges) {
                return Err(StorageError::cycle(&edge.parent, &edge.child));
            }
        }
        Ok(())
    }

    fn contains<T>(nodes: &T, node: &N) -> StorageResult<bool>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let key = Self::node_key(node)?;
        Ok(nodes.get(key.as_str())?.is_some())
    }
}

#[async_trait]
impl<N: NodeId + Serialize + DeserializeOwned> EdgeRepository<N> for RedbStorage<N> {
    async fn save_node(&self, node: &N) -> Result<()> {
        let key = Self::node_key(node)?;

        let db = self.db.lock().map_err(StorageError::lock)?;
        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut table = write_txn.open_table(NODES).map_err(StorageError::from)?;
            table
                .insert(key.as_str(), key.as_bytes())
                .map_err(StorageError::from)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        Ok(())
    }

    async fn node_exists(&self, node: &N) -> Result<bool> {
        let key = Self::node_key(node)?;

        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(NODES).map_err(StorageError::from)?;
        let found = table.get(key.as_str()).map_err(StorageError::from)?.is_some();
        Ok(found)
    }

    async fn nodes(&self) -> Result<Vec<N>> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(NODES).map_err(StorageError::from)?;

        let mut nodes = Vec::new();
        for entry in table.iter().map_err(StorageError::from)? {
            let (_, value) = entry.map_err(StorageError::from)?;
            nodes.push(serde_json::from_slice(value.value())?);
        }
        // keys sort by their JSON text, not by node order
        nodes.sort();
        Ok(nodes)
    }

    async fn edge(&self, id: &EdgeId) -> Result<Option<Edge<N>>> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let read_txn = db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(EDGES).map_err(StorageError::from)?;

        let key = id.to_string();
        if let Some(value) = table.get(key.as_str()).map_err(StorageError::from)? {
            Ok(Some(serde_json::from_slice(value.value())?))
        } else {
            Ok(None)
        }
    }

    async fn edges(&self) -> Result<Vec<Edge<N>>> {
        Ok(self.all_edges()?)
    }

    async fn edges_touching(&self, nodes: &[N], direction: Direction) -> Result<Vec<Edge<N>>> {
        Ok(self.touching(nodes, direction)?)
    }

    async fn reachable_edges(
        &self,
        seeds: &[N],
        direction: Direction,
        max_depth: u32,
    ) -> Result<Vec<Edge<N>>> {
        let edges = self.reachable(seeds, direction, max_depth)?;
        tracing::debug!(
            "Expanded {} edges from {} seeds in one read transaction",
            edges.len(),
            seeds.len()
        );
        Ok(edges)
    }

    fn weight_fields(&self) -> Vec<String> {
        self.weight_fields.clone()
    }

    async fn apply(&self, changes: ChangeSet<N>) -> Result<()> {
        let db = self.db.lock().map_err(StorageError::lock)?;
        let write_txn = db.begin_write().map_err(StorageError::from)?;

        if let Err(e) = Self::apply_in(&write_txn, &changes) {
            write_txn.abort().map_err(StorageError::from)?;
            return Err(e.into());
        }
        write_txn.commit().map_err(StorageError::from)?;
        tracing::debug!(
            "Committed change set in single transaction: +{} edges, -{} edges",
            changes.insert_edges.len(),
            changes.delete_edges.len()
        );

        Ok(())
    }
}
