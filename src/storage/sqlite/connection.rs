//! Shared connection handling for the `SQLite` store.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Timeout for [`acquire_lock_with_timeout`].
#[allow(dead_code)]
pub const MUTEX_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Acquires the connection mutex, recovering from poison.
///
/// A previous panic inside a locked section leaves the mutex poisoned even
/// though `SQLite`'s on-disk state is still consistent (every write goes
/// through a transaction); recovering and continuing is safe.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("sqlite connection mutex was poisoned, recovering");
            poisoned.into_inner()
        },
    }
}

/// Acquires the connection mutex with a spin-wait timeout.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the lock cannot be acquired within `timeout`.
#[allow(dead_code)]
pub fn acquire_lock_with_timeout<T>(
    mutex: &Mutex<T>,
    timeout: Duration,
) -> Result<MutexGuard<'_, T>> {
    let start = Instant::now();
    let sleep_duration = Duration::from_millis(10);

    loop {
        match mutex.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                tracing::warn!("sqlite connection mutex was poisoned, recovering");
                return Ok(poisoned.into_inner());
            },
            Err(std::sync::TryLockError::WouldBlock) => {
                if start.elapsed() > timeout {
                    return Err(Error::Storage {
                        operation: "acquire_lock".to_string(),
                        cause: format!("lock acquisition timed out after {timeout:?}"),
                    });
                }
                std::thread::sleep(sleep_duration);
            },
        }
    }
}

/// Configures a freshly opened connection: WAL journaling, foreign key
/// enforcement (must be set per-connection; `SQLite` does not persist it),
/// `NORMAL` synchronous, and a 5-second busy timeout so concurrent writers
/// block briefly instead of failing with `SQLITE_BUSY`.
///
/// # Errors
///
/// Returns [`Error::Storage`] if any pragma fails.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "busy_timeout", "5000")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_acquire_lock_success() {
        let mutex = Mutex::new(42);
        let guard = acquire_lock(&mutex);
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_acquire_lock_concurrent() {
        let mutex = Arc::new(Mutex::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let mutex_clone = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                let mut guard = acquire_lock(&mutex_clone);
                *guard += 1;
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*acquire_lock(&mutex), 10);
    }

    #[test]
    fn test_configure_connection_enables_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let fk: i32 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);

        let busy_timeout: i32 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(busy_timeout, 5000);
    }
}
