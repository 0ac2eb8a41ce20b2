//! Producer/worker synchronization primitives (§3, §4.4, §4.5).
//!
//! A stream's single scratch buffer is handed off between whichever
//! application thread calls a producer entry point and the stream's capture
//! worker thread. [`Handoff`] bundles the three counting semaphores that
//! drive that single-slot rendezvous (`empty`, `full`, `finished`), the
//! `capture_ready` startup flag the producer busy-waits on, and the
//! [`WriteLock`] that serializes concurrent producer calls against the same
//! stream.
//!
//! The real signal-handler-installing hook this pipeline's C ancestor used
//! is out of scope here (see the crate root docs); `Handoff::post`'s use of
//! [`Condvar`] is therefore a calling-convention discipline, not an
//! OS-enforced async-signal-safety guarantee.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

/// A classic counting semaphore built on [`Mutex`] + [`Condvar`].
///
/// Not async-signal-safe in the POSIX sense; see the module docs.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the count is positive, then decrements it.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.cond.wait(count).unwrap();
        }
        *count -= 1;
    }

    /// Decrements the count without blocking if it is already positive.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock().unwrap();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Increments the count and wakes one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.cond.notify_one();
    }
}

/// A spinning mutual-exclusion lock for the async, non-blocking write path.
#[derive(Debug, Default)]
pub struct Spinlock {
    locked: AtomicBool,
}

impl Spinlock {
    pub fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    pub fn lock(&self) -> SpinlockGuard<'_> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        SpinlockGuard { lock: self }
    }

    pub fn try_lock(&self) -> Option<SpinlockGuard<'_>> {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| SpinlockGuard { lock: self })
    }
}

#[derive(Debug)]
pub struct SpinlockGuard<'a> {
    lock: &'a Spinlock,
}

impl Drop for SpinlockGuard<'_> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// Serializes producer entry points against one stream.
///
/// A blocking stream uses a real mutex (the calling application thread is
/// expected to sleep); an async stream uses a [`Spinlock`] since the
/// producer call must never block for long enough to stall the caller's
/// realtime thread.
#[derive(Debug)]
pub enum WriteLock {
    Blocking(Mutex<()>),
    Spin(Spinlock),
}

impl WriteLock {
    pub fn new(is_async: bool) -> Self {
        if is_async {
            WriteLock::Spin(Spinlock::new())
        } else {
            WriteLock::Blocking(Mutex::new(()))
        }
    }

    pub fn lock(&self) -> WriteLockGuard<'_> {
        match self {
            WriteLock::Blocking(m) => WriteLockGuard::Blocking(m.lock().unwrap()),
            WriteLock::Spin(s) => WriteLockGuard::Spin(s.lock()),
        }
    }
}

pub enum WriteLockGuard<'a> {
    Blocking(MutexGuard<'a, ()>),
    Spin(SpinlockGuard<'a>),
}

/// The single-slot rendezvous between a producer entry point and the
/// capture worker thread for one stream.
///
/// `empty` starts at 1 (the scratch buffer is free), `full` and `finished`
/// start at 0. A producer call does `empty.wait()`, fills the buffer,
/// `full.post()`; the worker does `full.wait()`, drains the buffer,
/// `finished.post()` and `empty.post()` to hand the slot back. `finished` is
/// only consumed on `stop`/`destroy` draining a last in-flight buffer.
#[derive(Debug)]
pub struct Handoff {
    pub empty: Semaphore,
    pub full: Semaphore,
    pub finished: Semaphore,
    /// Set once the worker thread has entered its loop and is ready to
    /// accept a buffer; producer entry points busy-wait on this before their
    /// first `empty.wait()` to avoid racing worker startup.
    pub capture_ready: AtomicBool,
    pub write_lock: WriteLock,
}

impl Handoff {
    pub fn new(is_async: bool) -> Self {
        Self {
            empty: Semaphore::new(1),
            full: Semaphore::new(0),
            finished: Semaphore::new(0),
            capture_ready: AtomicBool::new(false),
            write_lock: WriteLock::new(is_async),
        }
    }

    /// Busy-waits for the worker thread to signal readiness.
    pub fn wait_for_capture_ready(&self) {
        while !self.capture_ready.load(Ordering::Acquire) {
            std::hint::spin_loop();
        }
    }

    pub fn signal_capture_ready(&self) {
        self.capture_ready.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn semaphore_wait_blocks_until_post() {
        let sem = Arc::new(Semaphore::new(0));
        let sem2 = Arc::clone(&sem);
        let handle = thread::spawn(move || {
            sem2.wait();
        });
        thread::sleep(std::time::Duration::from_millis(20));
        sem.post();
        handle.join().unwrap();
    }

    #[test]
    fn semaphore_try_wait_does_not_block() {
        let sem = Semaphore::new(0);
        assert!(!sem.try_wait());
        sem.post();
        assert!(sem.try_wait());
        assert!(!sem.try_wait());
    }

    #[test]
    fn spinlock_excludes_concurrent_access() {
        let lock = Arc::new(Spinlock::new());
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let _guard = lock.lock();
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn handoff_single_slot_roundtrip() {
        let handoff = Handoff::new(false);
        handoff.empty.wait();
        handoff.full.post();
        handoff.full.wait();
        handoff.finished.post();
        handoff.empty.post();
        assert!(handoff.empty.try_wait());
    }

    #[test]
    fn capture_ready_gate_releases_waiter() {
        let handoff = Arc::new(Handoff::new(false));
        let h2 = Arc::clone(&handoff);
        let handle = thread::spawn(move || {
            h2.wait_for_capture_ready();
        });
        thread::sleep(std::time::Duration::from_millis(10));
        handoff.signal_capture_ready();
        handle.join().unwrap();
    }
}
