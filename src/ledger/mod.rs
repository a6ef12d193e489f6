//! Ledger collaborator interface
//!
//! The contract never owns storage. Every invocation receives a ledger handle
//! scoped to one host transaction and talks to it through [`Ledger`].

pub mod memory;

use crate::Result;
use crate::keys::KeyRange;
use tracing::warn;

pub use memory::MemoryLedger;

/// One `(key, value)` pair yielded by a range scan
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Iterator handle returned by [`Ledger::range_scan`]
///
/// Handles hold host resources until [`close`](StateIterator::close) is called.
pub trait StateIterator: Iterator<Item = Result<KeyValue>> {
    /// Release the handle. Calling it twice must be harmless.
    fn close(&mut self) -> Result<()>;
}

/// Key-value ledger operations available inside one transaction
pub trait Ledger {
    /// Point read; `None` when the key has never been written
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Point write, replacing any previous value
    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Ordered iteration over every key inside `range`
    fn range_scan(&self, range: &KeyRange) -> Result<Box<dyn StateIterator + '_>>;

    /// Serialized identity of the transaction submitter
    fn caller_certificate(&self) -> Result<Vec<u8>>;
}

/// Scoped ownership of a [`StateIterator`]
///
/// The handle is closed when the guard drops, so early returns and `?` never
/// leak it. [`finish`](ScanGuard::finish) closes it explicitly and reports a
/// failed close.
pub struct ScanGuard<'a> {
    inner: Box<dyn StateIterator + 'a>,
    closed: bool,
}

impl<'a> ScanGuard<'a> {
    /// Open a range scan on `ledger`
    pub fn open<L: Ledger + ?Sized>(ledger: &'a L, range: &KeyRange) -> Result<Self> {
        let inner = ledger.range_scan(range)?;
        Ok(Self {
            inner,
            closed: false,
        })
    }

    /// Close the handle, surfacing any close error
    pub fn finish(mut self) -> Result<()> {
        self.closed = true;
        self.inner.close()
    }
}

impl Iterator for ScanGuard<'_> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next()
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.inner.close() {
                warn!("Failed to close range iterator: {}", e);
            }
        }
    }
}
