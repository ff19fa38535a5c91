//! The file-backed session: one connection, one lock, one state machine.

use crate::error::{Error, Result};
use crate::query::{Query, QueryOperator};
use crate::schema::ColumnSpec;
use crate::sql;
use crate::state::SessionState;
use crate::value::Cursor;
use rusqlite::Connection;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, trace, warn};

/// Operations host lifecycles rely on.
pub trait BaseDb {
    /// Open the connection.
    fn connect(&self) -> Result<()>;

    /// Close the connection.
    fn disconnect(&self) -> Result<()>;

    /// Execute a command that returns no rows.
    fn run_normal(&self, command: &str) -> Result<()>;

    /// Execute a command and return its rows.
    fn run_search(&self, command: &str) -> Result<Cursor>;
}

/// A single SQLite connection bound to a database file.
///
/// Every public operation holds the session lock for its whole duration, so
/// at most one command runs at a time and callers on other threads block
/// until it is released. The state can be read at any time without taking
/// the lock.
///
/// Table names, filters and inserted values are inlined into the SQL text
/// as given. Use [`Session::select`] / [`Session::delete_where`] with a
/// [`Query`], or [`crate::Value`] literals for [`Session::insert`], when any
/// part comes from untrusted input.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    state: AtomicU8,
    connection: Mutex<Option<Connection>>,
}

impl Session {
    /// Create a session for the database file at `path`.
    ///
    /// The parent directory is created if it does not exist yet. No
    /// connection is opened until [`Session::connect`].
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::ParentDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
                debug!("Created parent directory {}", parent.display());
            }
        }

        Ok(Self {
            path,
            state: AtomicU8::new(SessionState::Disconnected.repr()),
            connection: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_repr(self.state.load(Ordering::SeqCst))
    }

    /// Open the database file.
    ///
    /// Any handle still held from an earlier connection (for example after a
    /// failed command left the session in `Error`) is dropped first.
    pub fn connect(&self) -> Result<()> {
        let mut connection = self.lock();
        self.set_state(SessionState::Connecting);

        if connection.take().is_some() {
            debug!("Dropping previous connection to {}", self.path.display());
        }

        match open(&self.path) {
            Ok(conn) => {
                *connection = Some(conn);
                self.set_state(SessionState::Connected);
                info!("Connected to database {}", self.path.display());
                Ok(())
            }
            Err(source) => {
                self.set_state(SessionState::Error);
                warn!("Cannot connect to database {}: {}", self.path.display(), source);
                Err(Error::Connection {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Close the connection.
    ///
    /// Fails with [`Error::Busy`] if a unit of work was left in flight, and
    /// with [`Error::NotConnected`] if there is no open handle.
    pub fn disconnect(&self) -> Result<()> {
        let mut connection = self.lock();

        if self.state() == SessionState::Processing {
            self.set_state(SessionState::Error);
            warn!("Refusing to disconnect {} while processing", self.path.display());
            return Err(Error::Busy);
        }

        let Some(conn) = connection.take() else {
            return Err(Error::NotConnected);
        };

        self.set_state(SessionState::Disconnecting);
        match conn.close() {
            Ok(()) => {
                self.set_state(SessionState::Disconnected);
                info!("Disconnected from database {}", self.path.display());
                Ok(())
            }
            Err((conn, source)) => {
                *connection = Some(conn);
                self.set_state(SessionState::Error);
                warn!("Cannot disconnect from {}: {}", self.path.display(), source);
                Err(Error::Disconnect {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Create a table from column definitions.
    ///
    /// A table without columns is rejected before anything reaches the engine.
    pub fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        let command = sql::create_table(table, columns);
        self.unit_of_work(&command, |conn| {
            if columns.is_empty() {
                return Err(Error::invalid_command(format!(
                    "table {table} needs at least one column"
                )));
            }
            if let Some(column) = columns.iter().find(|c| c.id().trim().is_empty()) {
                return Err(Error::invalid_command(format!(
                    "column of type {} in table {table} has no name",
                    column.column_type()
                )));
            }
            conn.execute_batch(&command)?;
            Ok(())
        })
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.raw_execute(&sql::drop_table(table))
    }

    /// Select every row of `table` matching a raw SQL `filter`.
    ///
    /// A blank filter selects the whole table. The filter is inlined
    /// verbatim; prefer [`Session::select`] for anything built from input.
    pub fn query(&self, table: &str, filter: &str) -> Result<Cursor> {
        self.raw_query(&sql::select(table, filter))
    }

    /// Select every row of `table` matching `query`.
    pub fn select(&self, table: &str, query: &Query) -> Result<Cursor> {
        self.query(table, &query.to_filter())
    }

    /// Insert one row from ordered column/value pairs.
    ///
    /// Values are rendered with `Display` and inlined as-is: a `&str` is raw
    /// SQL, a [`crate::Value`] renders as an escaped literal.
    pub fn insert<K, V>(&self, table: &str, values: &[(K, V)]) -> Result<()>
    where
        K: AsRef<str>,
        V: fmt::Display,
    {
        let command = sql::insert(table, values);
        self.unit_of_work(&command, |conn| {
            if values.is_empty() {
                return Err(Error::invalid_command(format!(
                    "insert into {table} needs at least one value"
                )));
            }
            conn.execute_batch(&command)?;
            Ok(())
        })
    }

    /// Delete rows of `table` matching a raw SQL `filter`.
    ///
    /// A blank filter deletes every row.
    pub fn delete(&self, table: &str, filter: &str) -> Result<()> {
        self.raw_execute(&sql::delete(table, filter))
    }

    pub fn delete_where(&self, table: &str, query: &Query) -> Result<()> {
        self.delete(table, &query.to_filter())
    }

    /// Execute arbitrary SQL that returns no rows.
    pub fn raw_execute(&self, command: &str) -> Result<()> {
        self.unit_of_work(command, |conn| {
            conn.execute_batch(command)?;
            Ok(())
        })
    }

    /// Execute an arbitrary query and read its rows into a cursor.
    ///
    /// Only the first statement of `command` runs; anything after it is
    /// ignored. Use [`Session::raw_execute`] for batches.
    pub fn raw_query(&self, command: &str) -> Result<Cursor> {
        self.unit_of_work(command, |conn| {
            let mut statement = conn.prepare(command)?;
            Ok(Cursor::read(&mut statement)?)
        })
    }

    /// Run a query and map each row while the session lock is held.
    pub fn query_map<T, F>(&self, command: &str, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        self.unit_of_work(command, |conn| {
            let mut statement = conn.prepare(command)?;
            let rows = statement.query_map([], |row| f(row))?;
            let mut mapped = Vec::new();
            for row in rows {
                mapped.push(row?);
            }
            Ok(mapped)
        })
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let query = Query::new()
            .with_condition("type", QueryOperator::Equal("table".into()))
            .with_condition("name", QueryOperator::Equal(table.into()));
        Ok(self.select("sqlite_master", &query)?.remaining() > 0)
    }

    /// Run one unit of work against the open connection.
    ///
    /// Checks the state, moves to `Processing`, then to `Connected` or
    /// `Error` depending on the outcome. The connection stays open on error.
    fn unit_of_work<T, F>(&self, command: &str, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let connection = self.lock();
        let conn = match connection.as_ref() {
            Some(conn) if self.state().accepts_work() => conn,
            _ => {
                self.set_state(SessionState::Error);
                warn!("Not connected, rejected: {}", command);
                return Err(Error::NotConnected);
            }
        };

        self.set_state(SessionState::Processing);
        debug!("Executing: {}", command);
        match work(conn) {
            Ok(value) => {
                self.set_state(SessionState::Connected);
                Ok(value)
            }
            Err(e) => {
                self.set_state(SessionState::Error);
                warn!("Command failed: {}: {}", command, e);
                Err(e)
            }
        }
    }

    /// The state machine, not the poison flag, records an interrupted
    /// unit of work: it is left in `Processing`.
    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        let previous = SessionState::from_repr(self.state.swap(state.repr(), Ordering::SeqCst));
        trace!("Session {}: {} -> {}", self.path.display(), previous, state);
    }
}

impl BaseDb for Session {
    fn connect(&self) -> Result<()> {
        Session::connect(self)
    }

    fn disconnect(&self) -> Result<()> {
        Session::disconnect(self)
    }

    fn run_normal(&self, command: &str) -> Result<()> {
        self.raw_execute(command)
    }

    fn run_search(&self, command: &str) -> Result<Cursor> {
        self.raw_query(command)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session(path: {})", self.path.display())
    }
}

/// Open the file and read its header so a bad path fails here rather than on
/// the first command.
fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))?;
    Ok(conn)
}
