//! Resumption trace hashing for replay comparison.
//!
//! Folds every `(frame, creation index)` resumption pair into a running
//! FNV-1a digest. Two runs with identical creation sequences and frame
//! counts produce identical digests. Not cryptographically secure.

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Running digest of task resumptions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResumeTrace {
    hash: u64,
    len: u64,
}

impl ResumeTrace {
    pub(crate) fn new() -> Self {
        Self {
            hash: FNV_OFFSET,
            len: 0,
        }
    }

    /// Record one resumption.
    pub(crate) fn record(&mut self, frame: u64, creation: u64) {
        self.hash = fnv1a_u64(fnv1a_u64(self.hash, frame), creation);
        self.len += 1;
    }

    pub(crate) fn hash(&self) -> u64 {
        self.hash
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }
}
