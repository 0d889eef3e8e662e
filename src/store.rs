//! Persistent, de-duplicated list of committed colours.
//!
//! A single SQLite table holds one row per colour. Inserting a colour that is
//! already present deletes the old row first, so the colour moves to the
//! newest identity instead of being duplicated.

use crate::color::Color;
use crate::error::StoreFault;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS colors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    red INTEGER NOT NULL,
    green INTEGER NOT NULL,
    blue INTEGER NOT NULL
)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedColor {
    pub id: i64,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Changed,
}

pub type SharedStore = Arc<Mutex<ColorStore>>;

pub struct ColorStore {
    conn: Connection,
    path: Option<PathBuf>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl ColorStore {
    pub fn open(path: &Path) -> Result<Self, StoreFault> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StoreFault::new(
                        "open",
                        format!("create directory {}: {err}", parent.display()),
                    )
                })?;
            }
        }
        let conn = Connection::open(path).map_err(StoreFault::from_sql("open"))?;
        let store = Self::with_connection(conn, Some(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "colour store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreFault> {
        let conn = Connection::open_in_memory().map_err(StoreFault::from_sql("open"))?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreFault> {
        conn.execute(CREATE_TABLE_SQL, [])
            .map_err(StoreFault::from_sql("create table"))?;
        Ok(Self {
            conn,
            path,
            subscribers: Vec::new(),
        })
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Database file backing this store; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers a listener that receives [`StoreEvent::Changed`] after
    /// every successful mutation.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn insert(&mut self, color: Color) -> Result<SavedColor, StoreFault> {
        let tx = self
            .conn
            .transaction()
            .map_err(StoreFault::from_sql("insert"))?;
        let replaced = tx
            .execute(
                "DELETE FROM colors WHERE red = ?1 AND green = ?2 AND blue = ?3",
                params![color.red, color.green, color.blue],
            )
            .map_err(StoreFault::from_sql("insert"))?;
        tx.execute(
            "INSERT INTO colors (red, green, blue) VALUES (?1, ?2, ?3)",
            params![color.red, color.green, color.blue],
        )
        .map_err(StoreFault::from_sql("insert"))?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(StoreFault::from_sql("insert"))?;

        if replaced > 0 {
            tracing::debug!(hex = %color, replaced, "moved existing colour to newest position");
        }
        tracing::info!(hex = %color, id, "saved colour");
        self.notify();
        Ok(SavedColor { id, color })
    }

    /// All rows in insertion order. Each call is a fresh snapshot.
    pub fn list_all(&self) -> Result<Vec<SavedColor>, StoreFault> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, red, green, blue FROM colors ORDER BY id ASC")
            .map_err(StoreFault::from_sql("list"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SavedColor {
                    id: row.get(0)?,
                    color: Color::rgb(row.get(1)?, row.get(2)?, row.get(3)?),
                })
            })
            .map_err(StoreFault::from_sql("list"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreFault::from_sql("list"))
    }

    pub fn find(&self, color: Color) -> Result<Option<SavedColor>, StoreFault> {
        self.conn
            .query_row(
                "SELECT id FROM colors WHERE red = ?1 AND green = ?2 AND blue = ?3
                 ORDER BY id DESC LIMIT 1",
                params![color.red, color.green, color.blue],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|id| id.map(|id| SavedColor { id, color }))
            .map_err(StoreFault::from_sql("find"))
    }

    /// Deletes by identity. Unknown identities are ignored.
    pub fn remove(&mut self, id: i64) -> Result<(), StoreFault> {
        let removed = self
            .conn
            .execute("DELETE FROM colors WHERE id = ?1", params![id])
            .map_err(StoreFault::from_sql("remove"))?;
        if removed > 0 {
            tracing::info!(id, "removed colour");
            self.notify();
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), StoreFault> {
        let removed = self
            .conn
            .execute("DELETE FROM colors", [])
            .map_err(StoreFault::from_sql("clear"))?;
        tracing::info!(removed, "cleared colour store");
        self.notify();
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreFault> {
        self.conn
            .query_row("SELECT COUNT(*) FROM colors", [], |row| row.get::<_, i64>(0))
            .map(|count| count.max(0) as usize)
            .map_err(StoreFault::from_sql("count"))
    }

    pub fn is_empty(&self) -> Result<bool, StoreFault> {
        Ok(self.len()? == 0)
    }

    fn notify(&mut self) {
        self.subscribers
            .retain(|tx| tx.send(StoreEvent::Changed).is_ok());
    }
}

/// Locks a shared store, mapping poisoning to a [`StoreFault`].
pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, ColorStore>, StoreFault> {
    store
        .lock()
        .map_err(|_| StoreFault::new("lock", "colour store lock poisoned"))
}
