//! Process-wide string interning for map keys.
//!
//! The pool is never pruned: every distinct key interned lives until the
//! process exits. Only request interning (`#[codable(intern)]`) for maps
//! whose keys come from a bounded vocabulary, such as config-defined names.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

static INTERNER: LazyLock<Mutex<HashSet<Arc<str>>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Returns the canonical shared instance of `s`.
///
/// Equal strings interned at any point in the process share one allocation,
/// even after every other handle to it was dropped.
pub fn intern(s: &str) -> Arc<str> {
    let mut pool = INTERNER.lock();
    if let Some(existing) = pool.get(s) {
        return Arc::clone(existing);
    }
    let interned: Arc<str> = Arc::from(s);
    pool.insert(Arc::clone(&interned));
    interned
}
