//! In-memory ordered ledger
//!
//! Backs tests and benchmarks, and can be embedded where no host ledger is
//! available. It also keeps the bookkeeping the contract's guarantees are
//! checked against: write counts, open iterator handles and injected
//! iteration faults.

use super::{KeyValue, Ledger, StateIterator};
use crate::keys::KeyRange;
use crate::{Result, ledger_error};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// BTreeMap-backed [`Ledger`]
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: BTreeMap<Vec<u8>, Vec<u8>>,
    caller: Option<Vec<u8>>,
    writes: usize,
    open_iterators: Arc<AtomicUsize>,
    fail_scan_after: Option<usize>,
    fail_close: bool,
}

impl MemoryLedger {
    /// Create an empty ledger with no caller identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the certificate returned by [`Ledger::caller_certificate`]
    pub fn with_caller(mut self, certificate: impl Into<Vec<u8>>) -> Self {
        self.caller = Some(certificate.into());
        self
    }

    /// Switch the submitting identity between invocations
    pub fn set_caller(&mut self, certificate: impl Into<Vec<u8>>) {
        self.caller = Some(certificate.into());
    }

    /// Make every subsequent scan fail after yielding `items` entries
    pub fn fail_scans_after(&mut self, items: Option<usize>) {
        self.fail_scan_after = items;
    }

    /// Make closing every subsequently opened scan report an error
    pub fn fail_close(&mut self, fail: bool) {
        self.fail_close = fail;
    }

    /// Number of successful `put_state` calls
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Iterator handles opened but not yet closed
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.state.get(key).cloned())
    }

    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        trace!(key = %hex::encode(key), "put_state");
        self.state.insert(key.to_vec(), value.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn range_scan(&self, range: &KeyRange) -> Result<Box<dyn StateIterator + '_>> {
        let entries: Vec<KeyValue> = match &range.end {
            Some(end) if end <= &range.start => Vec::new(),
            end => {
                let upper = match end {
                    Some(end) => Bound::Excluded(end.clone()),
                    None => Bound::Unbounded,
                };
                self.state
                    .range((Bound::Included(range.start.clone()), upper))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            }
        };

        self.open_iterators.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryIterator {
            entries: entries.into_iter(),
            yielded: 0,
            fail_after: self.fail_scan_after,
            fail_close: self.fail_close,
            open_iterators: Arc::clone(&self.open_iterators),
            closed: false,
        }))
    }

    fn caller_certificate(&self) -> Result<Vec<u8>> {
        self.caller
            .clone()
            .ok_or_else(|| ledger_error!("no caller certificate attached to transaction"))
    }
}

/// Snapshot iterator over a [`MemoryLedger`] range
struct MemoryIterator {
    entries: std::vec::IntoIter<KeyValue>,
    yielded: usize,
    fail_after: Option<usize>,
    fail_close: bool,
    open_iterators: Arc<AtomicUsize>,
    closed: bool,
}

impl Iterator for MemoryIterator {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        if self.fail_after == Some(self.yielded) {
            self.fail_after = None;
            return Some(Err(ledger_error!(
                "injected iterator fault after {} entries",
                self.yielded
            )));
        }
        let entry = self.entries.next()?;
        self.yielded += 1;
        Some(Ok(entry))
    }
}

impl StateIterator for MemoryIterator {
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        // The handle is released even when the close reports a failure
        self.closed = true;
        self.open_iterators.fetch_sub(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ledger_error!("injected close fault"));
        }
        Ok(())
    }
}
