//! Test utilities and fixtures for Skein development.
//!
//! Provides fixture entity types, reusable task definitions, a shared
//! [`Journal`] for recording what tasks did and when, and
//! [`init_tracing`] for opting into log output with `RUST_LOG`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use skein_engine::{Runtime, RuntimeConfig};
use tracing_subscriber::EnvFilter;

pub use fixtures::*;

/// Install a test-friendly tracing subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A runtime with the default config.
pub fn runtime() -> Runtime {
    init_tracing();
    Runtime::new(RuntimeConfig::default()).expect("default config is valid")
}

/// A runtime with resumption tracing enabled.
pub fn traced_runtime() -> Runtime {
    init_tracing();
    Runtime::new(RuntimeConfig::default().with_trace()).expect("default config is valid")
}

/// Run `n` frames.
pub fn run_frames(rt: &mut Runtime, n: u32) {
    for _ in 0..n {
        rt.run_frame();
    }
}

/// Shared append-only log.
///
/// Clones share storage, so a journal can be handed to any number of task
/// bodies and finalizers and inspected afterwards.
pub struct Journal<T> {
    entries: Rc<RefCell<Vec<T>>>,
}

impl<T> Journal<T> {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn push(&self, entry: T) {
        self.entries.borrow_mut().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl<T: Clone> Journal<T> {
    /// Copy of everything recorded so far.
    pub fn entries(&self) -> Vec<T> {
        self.entries.borrow().clone()
    }
}

impl<T> Clone for Journal<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_clones_share_entries() {
        let a = Journal::new();
        let b = a.clone();
        a.push(1);
        b.push(2);
        assert_eq!(a.entries(), vec![1, 2]);
        assert_eq!(b.take(), vec![1, 2]);
        assert!(a.is_empty());
    }
}
