use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// How long a statement waits on another process's lock before failing with `database is locked`.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// Thread-local connection slots, one per database path.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides this thread's connection for the database to the closure, opening it on first use.
    pub fn with_conn<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<rusqlite::Error>,
    {
        DB_CONNS.with(|cell| {
            let mut conns = cell.borrow_mut();
            let conn = match conns.entry(self.path.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let conn = open(&self.path)?;
                    slot.insert(conn)
                }
            };
            f(conn)
        })
    }
}

// `serve` and `ingest` share one file: WAL keeps readers from blocking the writer,
// and the busy timeout covers writer-writer overlap.
fn open(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

/// Applies the embedded schema. Safe to run on every start-up.
pub fn init_db(db: &Database) -> Result<(), rusqlite::Error> {
    db.with_conn(|conn| conn.execute_batch(SCHEMA_SQL))?;
    info!(path = db.path(), "database initialized");
    Ok(())
}
