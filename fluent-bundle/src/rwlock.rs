//! Readers-writer lock for high-concurrency `Bundle` access (spec.md §4.9).
//!
//! Grounded directly on the reference's `runtime/rwlock.py`: `std::sync::RwLock`
//! cannot provide writer preference, reentrant readers/writers, or
//! write-to-read downgrading, so this hand-rolls the same
//! `Mutex` + `Condvar` design the reference uses (`threading.Condition` there,
//! `Mutex<State>` + `Condvar` here).
//!
//! Differences from the reference, each intentional:
//! - Read-to-write upgrade is rejected with [`RwLockError::UpgradeNotSupported`]
//!   instead of a raised `RuntimeError`, since Rust has no exceptions.
//! - Timeouts are `Option<Duration>`: `None` blocks indefinitely, `Some(Duration::ZERO)`
//!   is non-blocking (try-once), matching the reference's `None`/`0` timeout
//!   convention. Negative durations cannot be expressed in `Duration`, so callers
//!   construct `Duration` directly and a negative-timeout `ValueError` equivalent
//!   does not arise in this API — see `DESIGN.md`.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::errors::RwLockError;

struct State {
    active_readers: usize,
    active_writer: Option<ThreadId>,
    waiting_writers: usize,
    reader_threads: HashMap<ThreadId, usize>,
    writer_reentry_count: usize,
    writer_held_reads: usize,
}

impl State {
    fn new() -> Self {
        State {
            active_readers: 0,
            active_writer: None,
            waiting_writers: 0,
            reader_threads: HashMap::new(),
            writer_reentry_count: 0,
            writer_held_reads: 0,
        }
    }
}

/// A writer-preferring, reentrant readers-writer lock.
pub struct RwLock {
    state: Mutex<State>,
    condvar: Condvar,
}

/// RAII guard for a held read lock. Dropping it releases the lock.
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

/// RAII guard for a held write lock. Dropping it releases the lock.
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RwLock {
    pub fn new() -> Self {
        RwLock { state: Mutex::new(State::new()), condvar: Condvar::new() }
    }

    /// Acquires the read lock, blocking indefinitely.
    pub fn read(&self) -> ReadGuard<'_> {
        self.try_read(None).expect("indefinite read acquisition cannot time out")
    }

    /// Acquires the write lock, blocking indefinitely.
    pub fn write(&self) -> WriteGuard<'_> {
        self.try_write(None).expect("indefinite write acquisition cannot time out")
    }

    /// Attempts to acquire the read lock. `timeout = None` blocks indefinitely;
    /// `Some(Duration::ZERO)` tries once without blocking.
    pub fn try_read(&self, timeout: Option<Duration>) -> Result<ReadGuard<'_>, RwLockError> {
        let current = thread::current().id();
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut guard = self.state.lock().expect("rwlock mutex poisoned");

        if let Some(count) = guard.reader_threads.get_mut(&current) {
            *count += 1;
            return Ok(ReadGuard { lock: self });
        }

        if guard.active_writer == Some(current) {
            guard.writer_held_reads += 1;
            return Ok(ReadGuard { lock: self });
        }

        loop {
            if guard.active_writer.is_none() && guard.waiting_writers == 0 {
                break;
            }
            guard = match wait_with_deadline(&self.condvar, guard, deadline)? {
                Some(g) => g,
                None => return Err(RwLockError::Timeout),
            };
        }

        guard.active_readers += 1;
        guard.reader_threads.insert(current, 1);
        Ok(ReadGuard { lock: self })
    }

    /// Attempts to acquire the write lock. `timeout = None` blocks indefinitely;
    /// `Some(Duration::ZERO)` tries once without blocking.
    pub fn try_write(&self, timeout: Option<Duration>) -> Result<WriteGuard<'_>, RwLockError> {
        let current = thread::current().id();
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut guard = self.state.lock().expect("rwlock mutex poisoned");

        if guard.reader_threads.contains_key(&current) {
            return Err(RwLockError::UpgradeNotSupported);
        }

        if guard.active_writer == Some(current) {
            guard.writer_reentry_count += 1;
            return Ok(WriteGuard { lock: self });
        }

        guard.waiting_writers += 1;
        let acquired = loop {
            if guard.active_readers == 0 && guard.active_writer.is_none() {
                break true;
            }
            match wait_with_deadline(&self.condvar, guard, deadline)? {
                Some(g) => guard = g,
                None => break false,
            }
        };

        guard.waiting_writers -= 1;
        if !acquired {
            return Err(RwLockError::Timeout);
        }
        guard.active_writer = Some(current);
        Ok(WriteGuard { lock: self })
    }

    fn release_read(&self) {
        let current = thread::current().id();
        let mut guard = self.state.lock().expect("rwlock mutex poisoned");

        if guard.active_writer == Some(current) && guard.writer_held_reads > 0 {
            guard.writer_held_reads -= 1;
            return;
        }

        let count = guard
            .reader_threads
            .get_mut(&current)
            .expect("release_read called without holding the read lock");
        *count -= 1;
        if *count == 0 {
            guard.reader_threads.remove(&current);
            guard.active_readers -= 1;
            if guard.active_readers == 0 {
                self.condvar.notify_all();
            }
        }
    }

    fn release_write(&self) {
        let current = thread::current().id();
        let mut guard = self.state.lock().expect("rwlock mutex poisoned");
        assert_eq!(guard.active_writer, Some(current), "release_write called without holding the write lock");

        if guard.writer_reentry_count > 0 {
            guard.writer_reentry_count -= 1;
            return;
        }

        if guard.writer_held_reads > 0 {
            guard.active_readers += 1;
            let held = guard.writer_held_reads;
            guard.reader_threads.insert(current, held);
            guard.writer_held_reads = 0;
        }

        guard.active_writer = None;
        self.condvar.notify_all();
    }
}

/// Waits on the condvar, respecting an optional deadline. Returns `Ok(Some(guard))`
/// after a spurious-or-real wakeup still before the deadline, `Ok(None)` once the
/// deadline has passed.
fn wait_with_deadline<'a>(
    condvar: &Condvar,
    guard: std::sync::MutexGuard<'a, State>,
    deadline: Option<Instant>,
) -> Result<Option<std::sync::MutexGuard<'a, State>>, RwLockError> {
    match deadline {
        None => Ok(Some(condvar.wait(guard).expect("rwlock mutex poisoned"))),
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, result) = condvar
                .wait_timeout(guard, deadline - now)
                .expect("rwlock mutex poisoned");
            if result.timed_out() {
                Ok(None)
            } else {
                Ok(Some(guard))
            }
        }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn reentrant_read_lock() {
        let lock = RwLock::new();
        let a = lock.read();
        let b = lock.read();
        drop(a);
        drop(b);
    }

    #[test]
    fn reentrant_write_lock() {
        let lock = RwLock::new();
        let a = lock.write();
        let b = lock.write();
        drop(a);
        drop(b);
    }

    #[test]
    fn write_then_read_downgrade() {
        let lock = RwLock::new();
        let w = lock.write();
        let r = lock.read();
        drop(r);
        drop(w);
        // after full release, a fresh reader must be able to proceed
        let _r2 = lock.read();
    }

    #[test]
    fn read_to_write_upgrade_rejected() {
        let lock = RwLock::new();
        let _r = lock.read();
        let err = lock.try_write(Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err, RwLockError::UpgradeNotSupported);
    }

    #[test]
    fn non_blocking_write_fails_while_reader_active() {
        let lock = Arc::new(RwLock::new());
        let lock2 = lock.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            let _r = lock2.read();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
        });
        rx.recv().unwrap();
        let err = lock.try_write(Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err, RwLockError::Timeout);
        handle.join().unwrap();
    }

    #[test]
    fn concurrent_readers_allowed() {
        let lock = Arc::new(RwLock::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                let _r = lock.read();
                thread::sleep(Duration::from_millis(10));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn writer_excludes_other_writers() {
        let lock = Arc::new(RwLock::new());
        let lock2 = lock.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = thread::spawn(move || {
            let _w = lock2.write();
            tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
        });
        rx.recv().unwrap();
        let err = lock.try_write(Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err, RwLockError::Timeout);
        handle.join().unwrap();
    }
}
