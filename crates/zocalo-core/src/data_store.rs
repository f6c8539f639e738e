//! Reference-counted byte-blob store keyed by 16-bit identifiers.
//!
//! Modules park state here across a recycle: a module saves its blob
//! while stopping and restores it after the reload. The store lives in
//! process memory only; nothing survives a real restart. The shell
//! creates it on the first save and drops it once the last entry has
//! been released.

use std::collections::BTreeMap;

/// Largest blob a single entry will accept.
pub const MAX_DATA_LEN: usize = 4096;

#[derive(Debug)]
struct Entry {
    data: Vec<u8>,
    refs: u32,
}

/// In-memory key/value store with per-key reference counts.
#[derive(Debug, Default)]
pub struct DataStore {
    entries: BTreeMap<u16, Entry>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `ident` and takes one reference.
    ///
    /// A second store under the same identifier replaces the blob and
    /// increments the count, so every saver must release once.
    /// Returns false for empty or oversized blobs.
    pub fn store(&mut self, ident: u16, data: &[u8]) -> bool {
        if data.is_empty() || data.len() > MAX_DATA_LEN {
            return false;
        }
        match self.entries.get_mut(&ident) {
            Some(entry) => {
                entry.data = data.to_vec();
                entry.refs += 1;
            }
            None => {
                self.entries.insert(
                    ident,
                    Entry {
                        data: data.to_vec(),
                        refs: 1,
                    },
                );
            }
        }
        true
    }

    /// Copies the blob stored under `ident` into `out` and drops one
    /// reference, freeing the entry at zero.
    ///
    /// Returns the number of bytes copied (bounded by `out.len()`), or
    /// `None` when the identifier is unknown.
    pub fn release(&mut self, ident: u16, out: &mut [u8]) -> Option<usize> {
        let entry = self.entries.get_mut(&ident)?;
        let n = entry.data.len().min(out.len());
        out[..n].copy_from_slice(&entry.data[..n]);

        entry.refs -= 1;
        if entry.refs == 0 {
            self.entries.remove(&ident);
        }
        Some(n)
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_release_removes_the_entry() {
        let mut ds = DataStore::new();
        assert!(ds.store(7, b"state"));
        assert_eq!(ds.count(), 1);

        let mut buf = [0u8; 16];
        assert_eq!(ds.release(7, &mut buf), Some(5));
        assert_eq!(&buf[..5], b"state");
        assert_eq!(ds.count(), 0);
    }

    #[test]
    fn double_store_needs_double_release() {
        let mut ds = DataStore::new();
        assert!(ds.store(7, b"first"));
        assert!(ds.store(7, b"second"));

        let mut buf = [0u8; 16];
        assert_eq!(ds.release(7, &mut buf), Some(6));
        assert_eq!(&buf[..6], b"second");

        // Still retrievable: one reference remains.
        assert_eq!(ds.count(), 1);
        assert_eq!(ds.release(7, &mut buf), Some(6));
        assert_eq!(ds.count(), 0);
    }

    #[test]
    fn release_of_unknown_ident_is_none() {
        let mut ds = DataStore::new();
        let mut buf = [0u8; 4];
        assert_eq!(ds.release(99, &mut buf), None);
    }

    #[test]
    fn release_truncates_to_caller_buffer() {
        let mut ds = DataStore::new();
        assert!(ds.store(1, b"longer than the buffer"));

        let mut buf = [0u8; 6];
        assert_eq!(ds.release(1, &mut buf), Some(6));
        assert_eq!(&buf, b"longer");
    }

    #[test]
    fn rejects_empty_and_oversized_blobs() {
        let mut ds = DataStore::new();
        assert!(!ds.store(1, &[]));
        assert!(!ds.store(1, &vec![0u8; MAX_DATA_LEN + 1]));
        assert!(ds.is_empty());
    }
}
