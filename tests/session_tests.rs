use sqlite_session::{
    BaseDb, ColumnModifier, ColumnSpec, ColumnType, Error, Query, QueryOperator, Result, Session,
    SessionState, Value,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// Helper function to create a session on a temporary database file
fn create_temp_session() -> (Session, TempDir) {
    let dir = TempDir::new().unwrap();
    let session = Session::new(dir.path().join("data").join("test.db")).unwrap();
    (session, dir)
}

fn connected_session() -> (Session, TempDir) {
    let (session, dir) = create_temp_session();
    session.connect().unwrap();
    (session, dir)
}

fn users_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", ColumnType::Int),
        ColumnSpec::new("name", ColumnType::Varchar).with(ColumnModifier::Length(32)),
        ColumnSpec::new("age", ColumnType::Int).with(ColumnModifier::Default("0".into())),
        ColumnSpec::new("email", ColumnType::Text).with(ColumnModifier::Nullable),
    ]
}

fn ids(session: &Session, filter: &str) -> Result<Vec<i64>> {
    Ok(session
        .query("users", filter)?
        .filter_map(|row| row.get_by_name("id").and_then(Value::as_i64))
        .collect())
}

#[test]
fn test_fresh_session_is_disconnected() {
    let (session, _dir) = create_temp_session();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_work_before_connect_fails_with_not_connected() {
    let (session, _dir) = create_temp_session();

    assert!(matches!(
        session.create_table("users", &users_columns()),
        Err(Error::NotConnected)
    ));
    assert_eq!(session.state(), SessionState::Error);

    assert!(matches!(session.drop_table("users"), Err(Error::NotConnected)));
    assert!(matches!(session.query("users", ""), Err(Error::NotConnected)));
    assert!(matches!(
        session.insert("users", &[("id", "1")]),
        Err(Error::NotConnected)
    ));
    assert!(matches!(session.delete("users", ""), Err(Error::NotConnected)));
    assert!(matches!(session.raw_execute("SELECT 1"), Err(Error::NotConnected)));
    assert!(matches!(session.raw_query("SELECT 1"), Err(Error::NotConnected)));
    assert_eq!(session.state(), SessionState::Error);

    // nothing was opened, so the file was never created
    assert!(!session.path().exists());
}

#[test]
fn test_connect_and_disconnect() {
    let (session, _dir) = create_temp_session();

    session.connect().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert!(session.path().exists());

    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);

    assert!(matches!(session.disconnect(), Err(Error::NotConnected)));
}

#[test]
fn test_connect_failure_is_recoverable() {
    let (session, _dir) = create_temp_session();
    std::fs::write(session.path(), vec![0x42; 4096]).unwrap();

    let err = session.connect().unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
    assert_eq!(session.state(), SessionState::Error);
    assert!(matches!(session.raw_execute("SELECT 1"), Err(Error::NotConnected)));

    std::fs::remove_file(session.path()).unwrap();
    session.connect().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_basic_operations() {
    let (session, _dir) = connected_session();

    session.create_table("users", &users_columns()).unwrap();
    assert!(session.table_exists("users").unwrap());
    assert_eq!(session.state(), SessionState::Connected);

    session
        .insert("users", &[("id", "1"), ("name", "'John Doe'"), ("age", "30")])
        .unwrap();
    session
        .insert(
            "users",
            &[
                ("id", Value::from(2)),
                ("name", Value::from("Jane O'Hara")),
                ("email", Value::from("jane@example.com")),
            ],
        )
        .unwrap();

    let mut cursor = session.query("users", "id=1").unwrap();
    assert_eq!(cursor.columns(), ["id", "name", "age", "email"]);
    let row = cursor.next().unwrap();
    assert_eq!(row.get_by_name("name"), Some(&Value::Text("John Doe".into())));
    assert_eq!(row.get_by_name("age"), Some(&Value::Integer(30)));
    assert!(row.get_by_name("email").unwrap().is_null());
    assert!(cursor.next().is_none());
    cursor.close();

    let jane = session
        .select(
            "users",
            &Query::new().with_condition("name", QueryOperator::Equal("Jane O'Hara".into())),
        )
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(jane.get(0), Some(&Value::Integer(2)));
    assert_eq!(jane.get_by_name("age"), Some(&Value::Integer(0)));

    assert_eq!(ids(&session, "").unwrap(), vec![1, 2]);

    session.delete("users", "id=1").unwrap();
    assert_eq!(ids(&session, "").unwrap(), vec![2]);

    session.delete("users", "").unwrap();
    assert!(ids(&session, "").unwrap().is_empty());

    session.drop_table("users").unwrap();
    assert!(!session.table_exists("users").unwrap());
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_delete_where_with_structured_filter() {
    let (session, _dir) = connected_session();
    session.create_table("users", &users_columns()).unwrap();
    for (id, age) in [(1, 17), (2, 18), (3, 40)] {
        session
            .insert("users", &[("id", Value::from(id)), ("age", Value::from(age))])
            .unwrap();
    }

    session
        .delete_where(
            "users",
            &Query::new().with_condition("age", QueryOperator::GreaterThanOrEqual(18.into())),
        )
        .unwrap();
    assert_eq!(ids(&session, "").unwrap(), vec![1]);
}

#[test]
fn test_data_survives_reconnect() {
    let (session, _dir) = connected_session();
    session.create_table("users", &users_columns()).unwrap();
    session.insert("users", &[("id", "7")]).unwrap();
    session.disconnect().unwrap();

    session.connect().unwrap();
    assert_eq!(ids(&session, "").unwrap(), vec![7]);
}

#[test]
fn test_sql_error_moves_to_error_and_reconnect_recovers() {
    let (session, _dir) = connected_session();

    let err = session.raw_execute("THIS IS NOT SQL").unwrap_err();
    assert!(err.is_sql());
    assert_eq!(session.state(), SessionState::Error);

    // the handle is still open but the session refuses work until reconnected
    assert!(matches!(session.raw_query("SELECT 1"), Err(Error::NotConnected)));

    session.connect().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    let one = session.raw_query("SELECT 1 AS one").unwrap().next().unwrap();
    assert_eq!(one.get_by_name("one"), Some(&Value::Integer(1)));
}

#[test]
fn test_disconnect_closes_handle_left_open_by_sql_error() {
    let (session, _dir) = connected_session();
    assert!(session.drop_table("missing").unwrap_err().is_sql());
    assert_eq!(session.state(), SessionState::Error);

    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_create_table_without_columns_is_rejected() {
    let (session, _dir) = connected_session();

    let err = session.create_table("empty", &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidCommand { .. }));
    assert_eq!(session.state(), SessionState::Error);
    session.connect().unwrap();
    assert!(!session.table_exists("empty").unwrap());
}

#[test]
fn test_insert_without_values_is_rejected() {
    let (session, _dir) = connected_session();
    session.create_table("users", &users_columns()).unwrap();

    let none: [(&str, &str); 0] = [];
    assert!(matches!(
        session.insert("users", &none),
        Err(Error::InvalidCommand { .. })
    ));
}

#[test]
fn test_non_finite_reals_round_trip_through_insert() {
    let (session, _dir) = connected_session();
    session
        .create_table("readings", &[ColumnSpec::new("x", ColumnType::Decimal)])
        .unwrap();

    for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        session.insert("readings", &[("x", Value::Real(x))]).unwrap();
    }
    assert_eq!(session.state(), SessionState::Connected);

    let values: Vec<_> = session
        .raw_query("SELECT x FROM readings ORDER BY rowid")
        .unwrap()
        .map(|row| row.get(0).cloned().unwrap())
        .collect();
    assert!(values[0].is_null());
    assert_eq!(values[1].as_f64(), Some(f64::INFINITY));
    assert_eq!(values[2].as_f64(), Some(f64::NEG_INFINITY));
}

#[test]
fn test_raw_query_runs_only_first_statement() {
    let (session, _dir) = connected_session();

    let rows: Vec<_> = session.raw_query("SELECT 1 AS n; SELECT 2 AS n").unwrap().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("n"), Some(&Value::Integer(1)));
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_base_db_surface() {
    let (session, _dir) = create_temp_session();
    let db: &dyn BaseDb = &session;

    db.connect().unwrap();
    db.run_normal("CREATE TABLE kv (k TEXT, v TEXT); INSERT INTO kv VALUES ('a', 'b');")
        .unwrap();
    let rows: Vec<_> = db.run_search("SELECT v FROM kv WHERE k = 'a'").unwrap().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0), Some(&Value::Text("b".into())));
    db.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_query_map_reads_typed_rows() {
    let (session, _dir) = connected_session();
    session.create_table("users", &users_columns()).unwrap();
    session.insert("users", &[("id", "1"), ("name", "'a'")]).unwrap();
    session.insert("users", &[("id", "2"), ("name", "'b'")]).unwrap();

    let names = session
        .query_map("SELECT name FROM users ORDER BY id", |row| {
            row.get::<_, String>(0)
        })
        .unwrap();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_concurrent_callers_never_interleave() {
    let (session, _dir) = connected_session();
    let session = Arc::new(session);
    let log = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let session = Arc::clone(&session);
            let log = Arc::clone(&log);
            thread::spawn(move || {
                session
                    .query_map("SELECT 1", |_| {
                        log.lock().unwrap().push(format!("{name}-start"));
                        thread::sleep(Duration::from_millis(50));
                        log.lock().unwrap().push(format!("{name}-end"));
                        Ok(())
                    })
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 6);
    for pair in log.chunks(2) {
        let start = pair[0].strip_suffix("-start").unwrap();
        assert_eq!(pair[1], format!("{start}-end"));
    }
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_state_is_processing_while_work_runs() {
    let (session, _dir) = connected_session();
    let session = Arc::new(session);
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let worker = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            session
                .query_map("SELECT 1", |_| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                })
                .unwrap();
        })
    };

    entered_rx.recv().unwrap();
    assert_eq!(session.state(), SessionState::Processing);
    release_tx.send(()).unwrap();
    worker.join().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
}

#[test]
fn test_disconnect_after_interrupted_work_is_busy() {
    let (session, _dir) = connected_session();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        session.query_map("SELECT 1", |_| -> rusqlite::Result<()> {
            panic!("row handler failed")
        })
    }));
    assert!(outcome.is_err());
    assert_eq!(session.state(), SessionState::Processing);

    assert!(matches!(session.disconnect(), Err(Error::Busy)));
    assert_eq!(session.state(), SessionState::Error);

    session.connect().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    session.disconnect().unwrap();
}
