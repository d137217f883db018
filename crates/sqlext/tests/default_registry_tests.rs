//! Integration tests for the process-wide registry and the free-function API.
//!
//! Every test here mutates the default registry, so they run one at a time
//! behind `GLOBAL` and start from a purged registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};
use sqlext::{Args, Connection, DEFAULT_FLAGS, ExtError, Result, Signature, SqliteValue};

static GLOBAL: Mutex<()> = Mutex::new(());

fn isolated() -> MutexGuard<'static, ()> {
    let guard = GLOBAL.lock();
    sqlext::purge_function_registrations();
    guard
}

/// `format(template, v1, *rest)`: substitutes `%d` in order, absent rest
/// values print as `-1`.
fn format_fn(args: &Args<'_>) -> Result<Option<SqliteValue>> {
    let mut out = args.text(0)?.to_owned();
    let mut values = vec![args.value(1)?.to_text()];
    values.extend(
        args.optional()
            .map(|v| v.map_or_else(|| "-1".to_owned(), SqliteValue::to_text)),
    );
    for value in values {
        out = out.replacen("%d", &value, 1);
    }
    Ok(Some(SqliteValue::Text(out)))
}

fn text(conn: &Connection, sql: &str) -> Option<String> {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

// ===========================================================================
// 1. REGISTRATION
// ===========================================================================

#[test]
fn purge_empties_names() {
    let _guard = isolated();
    sqlext::register_create_function("one", 0, DEFAULT_FLAGS, |_| Ok(SqliteValue::Integer(1)));
    sqlext::register_math();
    assert!(!sqlext::registered_function_names().is_empty());

    sqlext::purge_function_registrations();
    assert!(sqlext::registered_function_names().is_empty());
    sqlext::purge_function_registrations();
    assert!(sqlext::registered_function_names().is_empty());
}

#[test]
fn reregistration_overwrites() {
    let _guard = isolated();
    sqlext::register_create_function("pick", 0, DEFAULT_FLAGS, |_| Ok(SqliteValue::Integer(1)));
    sqlext::register_create_function("pick", 0, DEFAULT_FLAGS, |_| Ok(SqliteValue::Integer(2)));
    assert_eq!(sqlext::registered_function_names(), vec!["pick"]);

    let conn = Connection::open_in_memory().unwrap();
    let v: i64 = conn.query_row("SELECT pick()", [], |r| r.get(0)).unwrap();
    assert_eq!(v, 2);
}

#[test]
fn invalid_signature_is_rejected_at_registration() {
    let _guard = isolated();
    let err = sqlext::register_function("huge", Signature::with_optional(100, 100), |_| {
        Ok(None)
    })
    .unwrap_err();
    assert!(matches!(err, ExtError::InvalidSignature { .. }), "{err:?}");
    assert!(sqlext::registered_function_names().is_empty());
}

// ===========================================================================
// 2. NULL PROPAGATION THROUGH THE ENGINE
// ===========================================================================

#[test]
fn sqrt_of_null_is_null() {
    let _guard = isolated();
    sqlext::register_function("sqrt", Signature::exact(1), |args| {
        Ok(args.numeric(0).map(|x| SqliteValue::Float(x.sqrt())))
    })
    .unwrap();

    let conn = Connection::open_in_memory().unwrap();
    let (root, null): (f64, Option<f64>) = conn
        .query_row("SELECT sqrt(25), sqrt(NULL)", [], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap();
    assert!((root - 5.0).abs() < f64::EPSILON);
    assert_eq!(null, None);
}

#[test]
fn required_null_skips_the_callable() {
    let _guard = isolated();
    let calls = Arc::new(AtomicUsize::new(0));
    let spy = Arc::clone(&calls);
    sqlext::register_function("spy", Signature::exact(1), move |_| {
        spy.fetch_add(1, Ordering::SeqCst);
        Ok(Some(SqliteValue::Integer(7)))
    })
    .unwrap();

    let conn = Connection::open_in_memory().unwrap();
    let v: Option<i64> = conn.query_row("SELECT spy(NULL)", [], |r| r.get(0)).unwrap();
    assert_eq!(v, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let v: Option<i64> = conn.query_row("SELECT spy(1)", [], |r| r.get(0)).unwrap();
    assert_eq!(v, Some(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn format_with_sentinel_for_absent_rest() {
    let _guard = isolated();
    sqlext::register_function("format", Signature::variadic(2), format_fn).unwrap();
    let conn = Connection::open_in_memory().unwrap();

    assert_eq!(text(&conn, "SELECT format(NULL, NULL)"), None);
    assert_eq!(text(&conn, "SELECT format('result: %d', NULL)"), None);
    assert_eq!(text(&conn, "SELECT format(NULL, 5)"), None);
    assert_eq!(
        text(&conn, "SELECT format('result: %d', 8)").as_deref(),
        Some("result: 8")
    );
    assert_eq!(
        text(&conn, "SELECT format('result: %d %d', 8, NULL)").as_deref(),
        Some("result: 8 -1")
    );
    assert_eq!(
        text(&conn, "SELECT format('result: %d %d %d', 8, NULL, NULL)").as_deref(),
        Some("result: 8 -1 -1")
    );
}

#[test]
fn too_few_arguments_is_a_sql_error() {
    let _guard = isolated();
    sqlext::register_function("format", Signature::variadic(2), format_fn).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let err = conn
        .query_row("SELECT format('x')", [], |r| r.get::<_, Option<String>>(0))
        .unwrap_err();
    assert!(err.to_string().contains("wrong number of arguments"), "{err}");
}

#[test]
fn callable_error_surfaces_with_its_message() {
    let _guard = isolated();
    sqlext::register_function("strict_div", Signature::exact(2), |args| {
        let d = args.numeric(1).unwrap_or_default();
        if d == 0.0 {
            return Err(ExtError::function_error("division by zero in strict_div"));
        }
        Ok(args.numeric(0).map(|n| SqliteValue::Float(n / d)))
    })
    .unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let err = conn
        .query_row("SELECT strict_div(1, 0)", [], |r| r.get::<_, f64>(0))
        .unwrap_err();
    assert!(err.to_string().contains("division by zero in strict_div"), "{err}");
}

// ===========================================================================
// 3. CONNECTIONS
// ===========================================================================

#[test]
fn fresh_connection_tracks_created_functions() {
    let _guard = isolated();
    let conn = Connection::open_in_memory().unwrap();
    assert!(!conn.function_created("foo"));

    conn.create_function("foo", 0, DEFAULT_FLAGS, |_| Ok(SqliteValue::Integer(1)))
        .unwrap();
    for name in ["foo", "FOO", "Foo"] {
        assert!(conn.function_created(name), "{name}");
    }
    assert!(!conn.function_created("bar"));
}

#[test]
fn open_marks_registered_functions_as_created() {
    let _guard = isolated();
    sqlext::register_math();
    let conn = Connection::open_in_memory().unwrap();
    for name in sqlext::registered_function_names() {
        assert!(conn.function_created(&name), "{name}");
    }
}

#[test]
fn enhance_db_session_reaches_existing_connection() {
    let _guard = isolated();
    let conn = Connection::open_in_memory().unwrap();
    sqlext::register_function("late", Signature::exact(0), |_| {
        Ok(Some(SqliteValue::from("here")))
    })
    .unwrap();
    assert!(!conn.function_created("late"));

    let created = sqlext::enhance_db_session(&conn).unwrap();
    assert_eq!(created, 1);
    assert!(conn.function_created("late"));
    assert_eq!(text(&conn, "SELECT late()").as_deref(), Some("here"));
}

#[test]
fn enhance_db_session_accepts_bare_engine_connection() {
    let _guard = isolated();
    sqlext::register_math();
    let engine = rusqlite::Connection::open_in_memory().unwrap();
    sqlext::enhance_db_session(&engine).unwrap();
    let v: f64 = engine.query_row("SELECT cbrt(64)", [], |r| r.get(0)).unwrap();
    assert!((v - 4.0).abs() < 1e-9);
}

#[test]
fn engine_rejection_propagates_from_open() {
    let _guard = isolated();
    sqlext::register_create_function("broken", -5, DEFAULT_FLAGS, |_| Ok(SqliteValue::Null));
    let err = Connection::open_in_memory().unwrap_err();
    assert!(err.is_engine(), "{err:?}");
    assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::ApiMisuse));
}

#[test]
fn open_with_init_sees_functions() {
    let _guard = isolated();
    sqlext::register_math();
    let conn = Connection::open_with(":memory:", |conn| {
        let v: f64 = conn.query_row("SELECT hypot(3, 4)", [], |r| r.get(0))?;
        assert!((v - 5.0).abs() < 1e-9);
        Ok(())
    })
    .unwrap();
    assert!(conn.function_created("hypot"));
}

#[test]
fn scoped_runs_block_with_functions() {
    let _guard = isolated();
    sqlext::register_math();
    let v: f64 = Connection::scoped(":memory:", |conn| {
        Ok(conn.query_row("SELECT pow(2, 8)", [], |r| r.get(0))?)
    })
    .unwrap();
    assert!((v - 256.0).abs() < 1e-9);
}

// ===========================================================================
// 4. MATH
// ===========================================================================

#[test]
fn register_math_runs_once() {
    let _guard = isolated();
    assert!(sqlext::register_math());
    assert!(!sqlext::register_math());

    // An override survives a non-forcing pass.
    sqlext::register_create_function("sqrt", 1, DEFAULT_FLAGS, |_| Ok(SqliteValue::Integer(-1)));
    sqlext::register_math();
    let conn = Connection::open_in_memory().unwrap();
    let v: i64 = conn.query_row("SELECT sqrt(4)", [], |r| r.get(0)).unwrap();
    assert_eq!(v, -1);

    sqlext::register_math_force();
    let conn = Connection::open_in_memory().unwrap();
    let v: f64 = conn.query_row("SELECT sqrt(4)", [], |r| r.get(0)).unwrap();
    assert!((v - 2.0).abs() < f64::EPSILON);
}

#[test]
fn math_functions_evaluate() {
    let _guard = isolated();
    sqlext::register_math();
    let conn = Connection::open_in_memory().unwrap();
    let row: (f64, f64, f64, f64, i64) = conn
        .query_row(
            "SELECT cbrt(125), log(1000, 10), floor(1.5), ceil(1.5), floor(7)",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .unwrap();
    assert!((row.0 - 5.0).abs() < 1e-9);
    assert!((row.1 - 3.0).abs() < 1e-9);
    assert!((row.2 - 1.0).abs() < f64::EPSILON);
    assert!((row.3 - 2.0).abs() < f64::EPSILON);
    assert_eq!(row.4, 7);

    let nulls: (Option<f64>, Option<f64>) = conn
        .query_row("SELECT log(NULL), mod(5, 0)", [], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap();
    assert_eq!(nulls, (None, None));
}

#[test]
fn math_domain_errors_fail_the_statement() {
    let _guard = isolated();
    sqlext::register_math();
    let conn = Connection::open_in_memory().unwrap();
    for (sql, message) in [
        ("SELECT sqrt(-1)", "numerical argument is out of domain - sqrt"),
        ("SELECT acos(2)", "numerical argument is out of domain - acos"),
        ("SELECT floor('abc')", "type mismatch: expected numeric, got text"),
    ] {
        let err = conn
            .query_row(sql, [], |r| r.get::<_, Option<f64>>(0))
            .unwrap_err();
        assert!(err.to_string().contains(message), "{sql}: {err}");
    }

    let (log0, big, zero): (f64, f64, f64) = conn
        .query_row(
            "SELECT log(0), ldexp(1e-300, 1100), ldexp(0, 2100)",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(log0, f64::NEG_INFINITY);
    assert!((big / 1.358_298_529_049_386e31 - 1.0).abs() < 1e-9, "{big:e}");
    assert_eq!(zero, 0.0);
}

#[test]
fn format_template_must_be_text() {
    let _guard = isolated();
    sqlext::register_function("format", Signature::variadic(2), format_fn).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let err = conn
        .query_row("SELECT format(42, 1)", [], |r| r.get::<_, Option<String>>(0))
        .unwrap_err();
    assert!(err.to_string().contains("expected text, got integer"), "{err}");
}

#[test]
fn purge_resets_math_flag() {
    let _guard = isolated();
    assert!(sqlext::register_math());
    sqlext::purge_function_registrations();
    assert!(sqlext::register_math());
}
