use clientsync_store::StoreError;

#[test]
fn unavailable_is_unavailable() {
    let err = StoreError::Unavailable("gone".into());
    assert!(err.is_unavailable());
    assert_eq!(err.to_string(), "store unavailable: gone");
}

#[test]
fn row_level_errors_are_not_unavailable() {
    assert!(!StoreError::InvalidData("bad".into()).is_unavailable());
    assert!(!StoreError::Duplicate("a@b.com".into()).is_unavailable());
    assert!(!StoreError::Database(rusqlite::Error::QueryReturnedNoRows).is_unavailable());
}

#[test]
fn busy_database_is_unavailable() {
    let err = StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        None,
    ));
    assert!(err.is_unavailable());
}

#[test]
fn duplicate_display() {
    let err = StoreError::Duplicate("a@b.com".into());
    assert_eq!(err.to_string(), "duplicate email: a@b.com");
}

#[test]
fn lock_waits_and_interrupts_are_timeouts() {
    for code in [
        rusqlite::ffi::SQLITE_BUSY,
        rusqlite::ffi::SQLITE_LOCKED,
        rusqlite::ffi::SQLITE_INTERRUPT,
    ] {
        let err = StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ));
        assert!(err.is_timed_out(), "code {code} should be a timeout");
    }
    assert!(!StoreError::Unavailable("gone".into()).is_timed_out());
    assert!(!StoreError::Database(rusqlite::Error::QueryReturnedNoRows).is_timed_out());
}
