//! Persistent local graph backend backed by SQLite.
//!
//! Full capabilities, no external services required. This is the default
//! backend.

use async_trait::async_trait;
use engram_types::error::{EngramError, EngramResult};
use engram_types::graph::{
    canon, canon_id, label, rel, Edge, ExportEdge, ExportNode, GraphExport, Node,
};
use engram_types::llm::ExtractedEntity;
use engram_types::store::{
    GraphStore, ImportTrace, NodeFilter, ScoreUpdate, StoreCapabilities,
};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::migration::run_migrations;
use crate::traverse::enumerate_paths;

const NODE_COLUMNS: &str =
    "id, label, props_json, confidence, source, updated_at_ms, decay, importance, archived";

/// Persistent graph store backed by a local SQLite file.
#[derive(Clone)]
pub struct SqliteGraph {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraph {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> EngramResult<Self> {
        let conn = Connection::open(path).map_err(|e| EngramError::Store(e.to_string()))?;
        tracing::debug!(path = %path.display(), "opened graph database");
        Self::init(conn)
    }

    /// Open an in-memory database; used by tests.
    pub fn open_in_memory() -> EngramResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| EngramError::Store(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> EngramResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| EngramError::Store(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| EngramError::Store(e.to_string()))?;
        run_migrations(&conn).map_err(|e| EngramError::Store(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> EngramResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EngramError::Internal(e.to_string()))
    }

    fn upsert_node(conn: &Connection, node: &Node) -> EngramResult<()> {
        // Merge props into any existing row and preserve housekeeping
        // scores; the ingestion path never writes decay/importance.
        let existing: Option<String> = conn
            .query_row(
                "SELECT props_json FROM nodes WHERE id = ?1",
                rusqlite::params![node.id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
            .map_err(|e| EngramError::Store(e.to_string()))?;

        let props = match existing {
            Some(props_json) => {
                let mut merged: HashMap<String, serde_json::Value> =
                    serde_json::from_str(&props_json).unwrap_or_default();
                for (key, value) in &node.props {
                    merged.insert(key.clone(), value.clone());
                }
                merged
            }
            None => node.props.clone(),
        };
        let props_json = serde_json::to_string(&props)
            .map_err(|e| EngramError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO nodes (id, label, props_json, confidence, source, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 label = ?2, props_json = ?3, confidence = ?4, source = ?5, updated_at_ms = ?6",
            rusqlite::params![
                node.id,
                node.label,
                props_json,
                node.confidence,
                node.source,
                node.updated_at_ms,
            ],
        )
        .map_err(|e| EngramError::Store(e.to_string()))?;
        Ok(())
    }

    fn upsert_edge(conn: &Connection, edge: &Edge) -> EngramResult<()> {
        let props_json = serde_json::to_string(&edge.props)
            .map_err(|e| EngramError::Serialization(e.to_string()))?;
        // Re-ingesting the same (src, rel, dst) triple is a no-op.
        conn.execute(
            "INSERT OR IGNORE INTO edges (id, src, rel, dst, props_json, source, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                edge.id,
                edge.src,
                edge.rel,
                edge.dst,
                props_json,
                edge.source,
                edge.created_at_ms,
            ],
        )
        .map_err(|e| EngramError::Store(e.to_string()))?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    let props_json: String = row.get(2)?;
    let props: HashMap<String, serde_json::Value> =
        serde_json::from_str(&props_json).unwrap_or_default();
    Ok(Node {
        id: row.get(0)?,
        label: row.get(1)?,
        props,
        confidence: row.get(3)?,
        source: row.get(4)?,
        updated_at_ms: row.get(5)?,
        decay: row.get(6)?,
        importance: row.get(7)?,
        archived: row.get::<_, i64>(8)? != 0,
    })
}

fn collect_nodes(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> EngramResult<Vec<Node>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| EngramError::Store(e.to_string()))?;
    let rows = stmt
        .query_map(params, row_to_node)
        .map_err(|e| EngramError::Store(e.to_string()))?;
    let mut nodes = Vec::new();
    for row in rows {
        nodes.push(row.map_err(|e| EngramError::Store(e.to_string()))?);
    }
    Ok(nodes)
}

#[async_trait]
impl GraphStore for SqliteGraph {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            traversal: true,
            conflict_lookup: true,
            aggregates: true,
        }
    }

    async fn ensure_schema(&self) -> EngramResult<()> {
        let conn = self.lock()?;
        run_migrations(&conn).map_err(|e| EngramError::Store(e.to_string()))
    }

    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        source: &str,
    ) -> EngramResult<()> {
        let now = now_ms();
        let source_id = format!("source:{source}");
        let conn = self.lock()?;
        let source_node = Node::new(
            label::SOURCE,
            source_id.clone(),
            HashMap::from([("id".to_string(), serde_json::json!(source))]),
            1.0,
            source,
            now,
        );
        Self::upsert_node(&conn, &source_node)?;
        for entity in entities {
            let name = canon(&entity.name);
            if name.is_empty() {
                continue;
            }
            let node = Node::new(
                label::ENTITY,
                canon_id("entity", &name),
                HashMap::from([
                    ("name".to_string(), serde_json::json!(name)),
                    ("type".to_string(), serde_json::json!(entity.entity_type)),
                ]),
                1.0,
                source,
                now,
            );
            Self::upsert_node(&conn, &node)?;
            let edge = Edge::new(
                node.id.clone(),
                rel::MENTIONED_IN,
                source_id.clone(),
                HashMap::new(),
                source,
                now,
            );
            Self::upsert_edge(&conn, &edge)?;
        }
        Ok(())
    }

    async fn fetch_context(&self, limit: usize) -> EngramResult<String> {
        let conn = self.lock()?;
        let nodes = collect_nodes(
            &conn,
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE archived = 0 AND label != 'Source'
                 ORDER BY updated_at_ms DESC, id ASC LIMIT ?1"
            ),
            &[&(limit as i64)],
        )?;
        Ok(nodes
            .iter()
            .map(|n| n.context_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn upsert_nodes_edges(&self, nodes: &[Node], edges: &[Edge]) -> EngramResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| EngramError::Store(e.to_string()))?;
        for node in nodes {
            Self::upsert_node(&tx, node)?;
        }
        for edge in edges {
            Self::upsert_edge(&tx, edge)?;
        }
        tx.commit().map_err(|e| EngramError::Store(e.to_string()))?;
        Ok(())
    }

    async fn export_graph(&self, limit_nodes: usize) -> EngramResult<GraphExport> {
        let conn = self.lock()?;
        let nodes = collect_nodes(
            &conn,
            &format!(
                "SELECT {NODE_COLUMNS} FROM nodes ORDER BY updated_at_ms DESC, id ASC LIMIT ?1"
            ),
            &[&(limit_nodes as i64)],
        )?;
        let exported: Vec<ExportNode> = nodes
            .iter()
            .map(|n| ExportNode {
                id: n.id.clone(),
                label: n.title().to_string(),
                node_type: n.label.clone(),
                props: n.props.clone(),
                updated_at_ms: n.updated_at_ms,
            })
            .collect();
        let ids: HashSet<&str> = exported.iter().map(|n| n.id.as_str()).collect();

        let mut stmt = conn
            .prepare(
                "SELECT id, src, rel, dst, props_json, created_at_ms FROM edges
                 ORDER BY created_at_ms DESC, id ASC LIMIT 5000",
            )
            .map_err(|e| EngramError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let props_json: String = row.get(4)?;
                Ok(ExportEdge {
                    id: row.get(0)?,
                    from: row.get(1)?,
                    label: row.get(2)?,
                    to: row.get(3)?,
                    props: serde_json::from_str(&props_json).unwrap_or_default(),
                    created_at_ms: row.get(5)?,
                })
            })
            .map_err(|e| EngramError::Store(e.to_string()))?;

        let mut edges = Vec::new();
        for row in rows {
            let edge = row.map_err(|e| EngramError::Store(e.to_string()))?;
            if ids.contains(edge.from.as_str()) && ids.contains(edge.to.as_str()) {
                edges.push(edge);
            }
        }
        Ok(GraphExport {
            nodes: exported,
            edges,
        })
    }

    async fn traverse_imports(
        &self,
        start_path: &str,
        hops: u32,
        limit: usize,
    ) -> EngramResult<ImportTrace> {
        let conn = self.lock()?;
        let file_nodes = collect_nodes(
            &conn,
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE label = 'File'"),
            &[],
        )?;
        let path_by_id: HashMap<&str, &str> = file_nodes
            .iter()
            .filter_map(|n| n.prop_str("path").map(|p| (n.id.as_str(), p)))
            .collect();
        if !path_by_id.values().any(|p| *p == start_path) {
            return Ok(ImportTrace::empty(start_path, hops));
        }

        let mut stmt = conn
            .prepare("SELECT src, dst FROM edges WHERE rel = 'IMPORTS'")
            .map_err(|e| EngramError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| EngramError::Store(e.to_string()))?;

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (src, dst) = row.map_err(|e| EngramError::Store(e.to_string()))?;
            if let (Some(from), Some(to)) =
                (path_by_id.get(src.as_str()), path_by_id.get(dst.as_str()))
            {
                adjacency
                    .entry(from.to_string())
                    .or_default()
                    .push(to.to_string());
            }
        }
        for targets in adjacency.values_mut() {
            targets.sort();
        }
        Ok(ImportTrace {
            start: start_path.to_string(),
            hops,
            paths: enumerate_paths(&adjacency, start_path, hops, limit),
        })
    }

    async fn get_nodes(&self, ids: &[String]) -> EngramResult<Vec<Node>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let params: Vec<&dyn rusqlite::types::ToSql> =
            ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
        collect_nodes(
            &conn,
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id IN ({placeholders})"),
            &params,
        )
    }

    async fn scan_nodes(&self) -> EngramResult<Vec<Node>> {
        let conn = self.lock()?;
        collect_nodes(&conn, &format!("SELECT {NODE_COLUMNS} FROM nodes"), &[])
    }

    async fn node_degrees(&self, ids: &[String]) -> EngramResult<HashMap<String, u64>> {
        let conn = self.lock()?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut stmt = conn
            .prepare("SELECT src, dst FROM edges")
            .map_err(|e| EngramError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| EngramError::Store(e.to_string()))?;
        let mut degrees: HashMap<String, u64> = HashMap::new();
        for row in rows {
            let (src, dst) = row.map_err(|e| EngramError::Store(e.to_string()))?;
            if wanted.contains(src.as_str()) {
                *degrees.entry(src).or_default() += 1;
            }
            if wanted.contains(dst.as_str()) {
                *degrees.entry(dst).or_default() += 1;
            }
        }
        Ok(degrees)
    }

    async fn apply_scores(&self, updates: &[ScoreUpdate]) -> EngramResult<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| EngramError::Store(e.to_string()))?;
        for update in updates {
            tx.execute(
                "UPDATE nodes SET decay = ?1, importance = ?2, archived = ?3 WHERE id = ?4",
                rusqlite::params![
                    update.decay,
                    update.importance,
                    update.archived as i64,
                    update.id,
                ],
            )
            .map_err(|e| EngramError::Store(e.to_string()))?;
        }
        tx.commit().map_err(|e| EngramError::Store(e.to_string()))?;
        Ok(())
    }

    async fn recent_nodes(&self, filter: &NodeFilter, limit: usize) -> EngramResult<Vec<Node>> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {NODE_COLUMNS} FROM nodes WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut idx = 0;

        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }
        if let Some(ref label) = filter.label {
            idx += 1;
            sql.push_str(&format!(" AND label = ?{idx}"));
            params.push(Box::new(label.clone()));
        }
        for excluded in &filter.exclude_labels {
            idx += 1;
            sql.push_str(&format!(" AND label != ?{idx}"));
            params.push(Box::new(excluded.clone()));
        }
        idx += 1;
        sql.push_str(&format!(" ORDER BY updated_at_ms DESC, id ASC LIMIT ?{idx}"));
        params.push(Box::new(limit as i64));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        collect_nodes(&conn, &sql, &param_refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteGraph {
        SqliteGraph::open_in_memory().unwrap()
    }

    fn node(label_: &str, id: &str, props: &[(&str, &str)], ms: i64) -> Node {
        let props = props
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
            .collect();
        Node::new(label_, id, props, 1.0, "test", ms)
    }

    #[tokio::test]
    async fn test_upsert_idempotent() {
        let store = setup();
        let nodes = vec![
            node(label::FILE, "file:a.rs", &[("path", "a.rs")], 1),
            node(label::FILE, "file:b.rs", &[("path", "b.rs")], 2),
        ];
        let edges = vec![Edge::new(
            "file:a.rs",
            rel::IMPORTS,
            "file:b.rs",
            HashMap::new(),
            "test",
            3,
        )];
        store.upsert_nodes_edges(&nodes, &edges).await.unwrap();
        let once = store.export_graph(100).await.unwrap();
        store.upsert_nodes_edges(&nodes, &edges).await.unwrap();
        let twice = store.export_graph(100).await.unwrap();
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[tokio::test]
    async fn test_props_merge_preserves_existing_keys() {
        let store = setup();
        store
            .upsert_nodes_edges(
                &[node(
                    label::DECISION,
                    "decision:ship it",
                    &[("what", "ship it"), ("why", "deadline")],
                    1,
                )],
                &[],
            )
            .await
            .unwrap();
        store
            .upsert_nodes_edges(
                &[node(label::DECISION, "decision:ship it", &[("what", "ship it")], 2)],
                &[],
            )
            .await
            .unwrap();
        let stored = store
            .get_nodes(&["decision:ship it".to_string()])
            .await
            .unwrap();
        assert_eq!(stored[0].prop_str("why"), Some("deadline"));
        assert_eq!(stored[0].updated_at_ms, 2);
    }

    #[tokio::test]
    async fn test_apply_scores_and_recent_filter() {
        let store = setup();
        store
            .upsert_nodes_edges(
                &[
                    node(label::PATTERN, "pattern:style:tabs", &[("name", "tabs")], 1),
                    node(label::SOURCE, "source:cli", &[("id", "cli")], 2),
                ],
                &[],
            )
            .await
            .unwrap();
        store
            .apply_scores(&[ScoreUpdate {
                id: "pattern:style:tabs".to_string(),
                decay: 0.3,
                importance: 0.1,
                archived: true,
            }])
            .await
            .unwrap();

        let visible = store
            .recent_nodes(&NodeFilter::excluding(&[label::SOURCE]), 10)
            .await
            .unwrap();
        assert!(visible.is_empty());

        let all = store
            .recent_nodes(
                &NodeFilter {
                    include_archived: true,
                    exclude_labels: vec![label::SOURCE.to_string()],
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].decay, Some(0.3));
    }

    #[tokio::test]
    async fn test_traverse_imports() {
        let store = setup();
        store
            .upsert_nodes_edges(
                &[
                    node(label::FILE, "file:a.rs", &[("path", "a.rs")], 1),
                    node(label::FILE, "file:b.rs", &[("path", "b.rs")], 2),
                ],
                &[Edge::new(
                    "file:a.rs",
                    rel::IMPORTS,
                    "file:b.rs",
                    HashMap::new(),
                    "test",
                    3,
                )],
            )
            .await
            .unwrap();
        let trace = store.traverse_imports("a.rs", 2, 50).await.unwrap();
        assert_eq!(trace.paths, vec![vec!["a.rs".to_string(), "b.rs".to_string()]]);

        let empty = store.traverse_imports("missing.rs", 2, 50).await.unwrap();
        assert!(empty.paths.is_empty());
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.sqlite");
        let store = SqliteGraph::open(&path).unwrap();
        store
            .upsert_entities(
                &[ExtractedEntity {
                    name: "Engram".to_string(),
                    entity_type: "Project".to_string(),
                }],
                "test",
            )
            .await
            .unwrap();
        let context = store.fetch_context(10).await.unwrap();
        assert!(context.contains("Engram"));
    }
}
