//! Sharded string interner for mime types, mime paths and category names.
//!
//! Interned strings are leaked, so every caller gets the same `&'static str`
//! for equal contents and can compare by pointer downstream.

use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;

const NUM_SHARDS: usize = 16;

/// Thread-safe string interner.
///
/// Each shard has its own lock, so unrelated languages interning their names
/// rarely contend.
pub struct StringInterner {
    shards: [RwLock<FxHashSet<&'static str>>; NUM_SHARDS],
}

/// The process-wide interner shared by every language and path.
pub fn global() -> &'static StringInterner {
    static GLOBAL: OnceLock<StringInterner> = OnceLock::new();
    GLOBAL.get_or_init(StringInterner::new)
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashSet::default())),
        }
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        hash as usize % NUM_SHARDS
    }

    /// Intern a string and return the canonical `'static` copy.
    ///
    /// Two calls with equal strings return the same pointer.
    pub fn intern_str(&self, s: &str) -> &'static str {
        let shard = &self.shards[Self::shard_for(s)];
        if let Some(&interned) = shard.read().get(s) {
            return interned;
        }

        let mut guard = shard.write();
        // Another thread may have interned it between the locks.
        if let Some(&interned) = guard.get(s) {
            return interned;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        guard.insert(leaked);
        leaked
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
