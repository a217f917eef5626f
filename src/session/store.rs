use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::Db;
use crate::entity::EntityType;
use crate::error::{Result, WikitreeError};
use crate::graph::{Edge, Graph, GraphSnapshot, Node};
use crate::session::Session;

/// One row of `sessions` plus its graph size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_query: Option<String>,
    pub width: usize,
    pub depth: usize,
    pub node_count: usize,
    pub edge_count: usize,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| WikitreeError::InvalidInput(format!("bad timestamp {:?}: {}", value, e)))
}

fn load_session(conn: &Connection, name: &str) -> Result<Option<Session>> {
    let header = conn
        .query_row(
            "SELECT created_at, updated_at, last_query, width, depth FROM sessions WHERE name = ?1",
            params![name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((created_at, updated_at, last_query, width, depth)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, entity_type, depth, expanded, label FROM nodes
         WHERE session = ?1 ORDER BY ordinal",
    )?;
    let nodes = stmt
        .query_map(params![name], |row| {
            let entity_type: String = row.get(1)?;
            Ok(Node {
                id: row.get(0)?,
                entity_type: EntityType::from_label(&entity_type),
                depth: row.get::<_, i64>(2)? as usize,
                expanded: row.get(3)?,
                label: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let mut stmt = conn.prepare(
        "SELECT source_id, target_id FROM edges WHERE session = ?1 ORDER BY ordinal",
    )?;
    let edges = stmt
        .query_map(params![name], |row| {
            Ok(Edge {
                source_id: row.get(0)?,
                target_id: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let graph = Graph::from_snapshot(GraphSnapshot { nodes, edges })?;

    Ok(Some(Session {
        name: name.to_string(),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        last_query,
        width: width as usize,
        depth: depth as usize,
        graph,
    }))
}

/// Replace the stored copy of `session` in one transaction.
fn save_session(conn: &mut Connection, session: &Session) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO sessions (name, created_at, updated_at, last_query, width, depth)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(name) DO UPDATE SET
             updated_at = excluded.updated_at,
             last_query = excluded.last_query,
             width = excluded.width,
             depth = excluded.depth",
        params![
            session.name,
            session.created_at.to_rfc3339(),
            session.updated_at.to_rfc3339(),
            session.last_query,
            session.width as i64,
            session.depth as i64,
        ],
    )?;

    tx.execute("DELETE FROM edges WHERE session = ?1", params![session.name])?;
    tx.execute("DELETE FROM nodes WHERE session = ?1", params![session.name])?;

    {
        let mut insert_node = tx.prepare(
            "INSERT INTO nodes (session, id, entity_type, depth, expanded, label, ordinal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for (ordinal, node) in session.graph.nodes().iter().enumerate() {
            insert_node.execute(params![
                session.name,
                node.id,
                node.entity_type.as_str(),
                node.depth as i64,
                node.expanded,
                node.label,
                ordinal as i64,
            ])?;
        }

        let mut insert_edge = tx.prepare(
            "INSERT INTO edges (session, source_id, target_id, ordinal) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (ordinal, edge) in session.graph.edges().iter().enumerate() {
            insert_edge.execute(params![session.name, edge.source_id, edge.target_id, ordinal as i64])?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn list_sessions(conn: &Connection) -> Result<Vec<SessionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.name, s.created_at, s.updated_at, s.last_query, s.width, s.depth,
                (SELECT COUNT(*) FROM nodes n WHERE n.session = s.name),
                (SELECT COUNT(*) FROM edges e WHERE e.session = s.name)
         FROM sessions s
         ORDER BY s.updated_at DESC, s.name",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    rows.into_iter()
        .map(|(name, created_at, updated_at, last_query, width, depth, nodes, edges)| {
            Ok(SessionSummary {
                name,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
                last_query,
                width: width as usize,
                depth: depth as usize,
                node_count: nodes as usize,
                edge_count: edges as usize,
            })
        })
        .collect()
}

/// SQLite-backed store of named sessions
#[derive(Debug, Clone)]
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    /// Open the store, applying any pending migrations.
    pub async fn open(db: Db) -> Result<Self> {
        db.migrate().await?;
        Ok(Self { db })
    }

    pub async fn load(&self, name: &str) -> Result<Option<Session>> {
        let name = name.to_string();
        self.db
            .with_connection(move |conn| load_session(conn, &name))
            .await
    }

    /// Like [`SessionStore::load`], but a missing session is an error.
    pub async fn load_existing(&self, name: &str) -> Result<Session> {
        self.load(name)
            .await?
            .ok_or_else(|| WikitreeError::SessionNotFound(name.to_string()))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        self.db
            .with_connection(move |conn| {
                save_session(conn, &session)?;
                log::info!(
                    "Saved session {} ({} nodes, {} edges)",
                    session.name,
                    session.graph.node_count(),
                    session.graph.edge_count()
                );
                Ok(())
            })
            .await
    }

    /// Most recently updated first.
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        self.db.with_connection(|conn| list_sessions(conn)).await
    }

    /// Returns false when no session had that name.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.db
            .with_connection(move |conn| {
                let removed = conn.execute("DELETE FROM sessions WHERE name = ?1", params![name])?;
                Ok(removed > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> SessionStore {
        SessionStore::open(Db::new(dir.path().join("sessions.db")))
            .await
            .unwrap()
    }

    fn beatles_session() -> Session {
        let mut session = Session::new("beatles", 2, 2);
        session.last_query = Some("John Lennon".to_string());
        let graph = &mut session.graph;
        graph.upsert_node("John Lennon", EntityType::Person, 0);
        graph.set_label("John Lennon", Some("English singer".to_string()));
        graph.mark_expanded("John Lennon");
        graph.upsert_node("Yoko Ono", EntityType::Person, 1);
        graph.upsert_node("Paul McCartney", EntityType::Person, 1);
        graph.upsert_node("Liverpool", EntityType::Location, 1);
        graph.add_edge("John Lennon", "Yoko Ono");
        graph.add_edge("John Lennon", "Paul McCartney");
        graph.add_edge("John Lennon", "Liverpool");
        session
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let session = beatles_session();
        store.save(&session).await.unwrap();

        let loaded = store.load("beatles").await.unwrap().unwrap();
        assert_eq!(loaded.graph.snapshot(), session.graph.snapshot());
        assert_eq!(loaded.last_query.as_deref(), Some("John Lennon"));
        assert_eq!((loaded.width, loaded.depth), (2, 2));
        assert_eq!(loaded.created_at, session.created_at);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        assert!(store.load("nobody").await.unwrap().is_none());
        let err = store.load_existing("nobody").await.unwrap_err();
        assert!(matches!(err, WikitreeError::SessionNotFound(name) if name == "nobody"));
    }

    #[tokio::test]
    async fn test_resave_replaces_graph() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        let mut session = beatles_session();
        store.save(&session).await.unwrap();

        session.graph.upsert_node("Sean Lennon", EntityType::Person, 2);
        session.graph.add_edge("Yoko Ono", "Sean Lennon");
        session.graph.mark_expanded("Yoko Ono");
        session.touch();
        store.save(&session).await.unwrap();

        let loaded = store.load_existing("beatles").await.unwrap();
        assert_eq!(loaded.graph.node_count(), 5);
        assert_eq!(loaded.graph.edge_count(), 4);
        assert!(loaded.graph.node("Yoko Ono").unwrap().expanded);
        assert_eq!(loaded.graph.snapshot(), session.graph.snapshot());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.save(&beatles_session()).await.unwrap();
        store.save(&Session::new("empty", 3, 1)).await.unwrap();

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 2);
        let beatles = summaries.iter().find(|s| s.name == "beatles").unwrap();
        assert_eq!((beatles.node_count, beatles.edge_count), (4, 3));
        let empty = summaries.iter().find(|s| s.name == "empty").unwrap();
        assert_eq!((empty.node_count, empty.edge_count), (0, 0));

        assert!(store.delete("beatles").await.unwrap());
        assert!(!store.delete("beatles").await.unwrap());
        assert!(store.load("beatles").await.unwrap().is_none());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_isolated() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store.save(&beatles_session()).await.unwrap();

        let mut other = Session::new("stones", 2, 2);
        other.graph.upsert_node("Mick Jagger", EntityType::Person, 0);
        store.save(&other).await.unwrap();

        let beatles = store.load_existing("beatles").await.unwrap();
        assert!(!beatles.graph.contains("Mick Jagger"));
        let stones = store.load_existing("stones").await.unwrap();
        assert_eq!(stones.graph.node_count(), 1);
    }
}
