//! Input attributes: values scoped to a language path.
//!
//! Lexers and embedding resolvers read configuration (dialect versions,
//! feature switches) from here. A value is either specific to one exact path
//! or global, in which case it is also visible from every path that ends
//! with that path.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::LanguagePath;

type Value = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct PathAttributes {
    specific: FxHashMap<String, Value>,
    global: FxHashMap<String, Value>,
}

/// Thread-safe store of path-scoped values.
#[derive(Default)]
pub struct InputAttributes {
    values: Mutex<FxHashMap<LanguagePath, PathAttributes>>,
}

impl InputAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key` for `path`.
    ///
    /// A global value is also visible from longer paths ending with `path`.
    pub fn set_value<T>(&self, path: &LanguagePath, key: &str, value: T, global: bool)
    where
        T: Any + Send + Sync,
    {
        let mut values = self.values.lock();
        let attributes = values.entry(path.clone()).or_default();
        let map = if global {
            &mut attributes.global
        } else {
            &mut attributes.specific
        };
        map.insert(key.to_owned(), Arc::new(value));
    }

    /// Look up `key` for `path`.
    ///
    /// The exact path's specific value wins, then its global value, then the
    /// global values of ever shorter suffixes of the path.
    pub fn get_value(&self, path: &LanguagePath, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let values = self.values.lock();
        if let Some(attributes) = values.get(path) {
            if let Some(value) = attributes
                .specific
                .get(key)
                .or_else(|| attributes.global.get(key))
            {
                return Some(Arc::clone(value));
            }
        }
        (1..path.size())
            .filter_map(|start| path.sub_path(start, path.size()))
            .find_map(|suffix| values.get(&suffix)?.global.get(key).map(Arc::clone))
    }

    /// Typed form of [`get_value`](Self::get_value).
    ///
    /// Returns `None` if the key is absent or holds a value of another type.
    pub fn get<T>(&self, path: &LanguagePath, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get_value(path, key)?.downcast::<T>().ok()
    }
}

impl fmt::Debug for InputAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.lock();
        f.debug_map()
            .entries(values.iter().map(|(path, attributes)| {
                (
                    path.mime_path(),
                    (attributes.specific.len(), attributes.global.len()),
                )
            }))
            .finish()
    }
}
