//! Per-id category lists with structural sharing.
//!
//! Lists are computed once per language. Ids whose category combination is
//! identical share the same `Arc<[&str]>`, so consumers can compare lists by
//! pointer and the memory cost is bounded by the number of distinct
//! combinations rather than the number of ids.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{TokenId, TokenIdSet};

/// A shared, immutable list of category names.
pub type CategoryList = Arc<[&'static str]>;

/// Canonicalizing interner keyed on the category-name vector.
struct CategoryInterner {
    lists: FxHashMap<Vec<&'static str>, CategoryList>,
}

impl CategoryInterner {
    fn new() -> Self {
        CategoryInterner {
            lists: FxHashMap::default(),
        }
    }

    fn intern(&mut self, names: &[&'static str]) -> CategoryList {
        if let Some(list) = self.lists.get(names) {
            return Arc::clone(list);
        }
        let list: CategoryList = Arc::from(names);
        self.lists.insert(names.to_vec(), Arc::clone(&list));
        list
    }
}

/// Category lists of every id of one language, indexed by ordinal.
pub(crate) struct CategoryLists {
    all: Vec<CategoryList>,
    non_primary: Vec<CategoryList>,
}

impl CategoryLists {
    /// Compute the lists: primary category first, then the remaining
    /// categories containing the id in name order.
    pub(crate) fn build(
        ids: &[TokenId],
        categories: &FxHashMap<&'static str, TokenIdSet>,
        max_ordinal: u32,
    ) -> Self {
        let mut names: Vec<&'static str> = categories.keys().copied().collect();
        names.sort_unstable();

        let mut interner = CategoryInterner::new();
        let empty = interner.intern(&[]);
        let slots = max_ordinal as usize + 1;
        let mut all = vec![Arc::clone(&empty); slots];
        let mut non_primary = vec![empty; slots];

        let mut scratch = Vec::new();
        for id in ids {
            scratch.clear();
            let primary = id.primary_category();
            scratch.extend(primary);
            scratch.extend(names.iter().copied().filter(|name| {
                Some(*name) != primary && categories[name].contains(id)
            }));

            let ordinal = id.ordinal() as usize;
            all[ordinal] = interner.intern(&scratch);
            let skip = usize::from(primary.is_some());
            non_primary[ordinal] = interner.intern(&scratch[skip..]);
        }

        tracing::trace!(
            ids = ids.len(),
            distinct = interner.lists.len(),
            "category lists built"
        );
        CategoryLists { all, non_primary }
    }

    pub(crate) fn all(&self, id: &TokenId) -> &CategoryList {
        &self.all[id.ordinal() as usize]
    }

    pub(crate) fn non_primary(&self, id: &TokenId) -> &CategoryList {
        &self.non_primary[id.ordinal() as usize]
    }
}
