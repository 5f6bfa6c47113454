//! The static/dynamic query cache: a query's source text is read (from a
//! file, or registered directly) exactly once per cache key, then
//! reused for every subsequent lookup.
//!
//! A `.sql` file is a [`QueryKind::Static`] query: its text is the literal
//! SQL to execute, unchanged. A `.sql.tmpl` file (or any source handed to
//! [`QueryCache::get_or_register_source`] as [`QueryKind::Dynamic`]) is
//! rendered through [`crate::renderer::render_template`] on every call —
//! the cache only saves re-reading/re-registering the source, not the
//! per-call render.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock};

use compact_str::CompactString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Static,
    Dynamic,
}

#[derive(Debug)]
pub struct CachedQuery {
    pub name: CompactString,
    pub source: Arc<str>,
    pub kind: QueryKind,
}

/// Read-mostly, write-once-per-key cache of query source text.
#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<CompactString, Arc<CachedQuery>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`'s contents, caching by its string form. `kind` is
    /// determined by the caller (by convention: `.sql` -> `Static`,
    /// `.sql.tmpl` -> `Dynamic`).
    pub fn get_or_load_file(&self, path: &Path, kind: QueryKind) -> io::Result<Arc<CachedQuery>> {
        let key = CompactString::from(path.to_string_lossy().as_ref());
        self.get_or_insert_with(key.clone(), || {
            let text = fs::read_to_string(path)?;
            Ok(CachedQuery {
                name: key.clone(),
                source: Arc::from(text),
                kind,
            })
        })
    }

    /// Register in-memory source text under `name`, caching it the same
    /// way a file would be cached.
    pub fn get_or_register_source(&self, name: &str, source: &str, kind: QueryKind) -> Arc<CachedQuery> {
        let key = CompactString::from(name);
        self.get_or_insert_with(key.clone(), || {
            Ok(CachedQuery {
                name: key.clone(),
                source: Arc::from(source),
                kind,
            })
        })
        .expect("infallible source registration")
    }

    fn get_or_insert_with<E>(
        &self,
        key: CompactString,
        build: impl FnOnce() -> Result<CachedQuery, E>,
    ) -> Result<Arc<CachedQuery>, E> {
        if let Some(existing) = self.entries.read().unwrap().get(&key) {
            log::trace!("query cache hit for {key:?}");
            return Ok(existing.clone());
        }
        log::debug!("query cache miss for {key:?}, building");
        let built = Arc::new(build()?);
        let mut guard = self.entries.write().unwrap();
        let entry = guard.entry(key).or_insert(built).clone();
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_under_the_same_name_reuses_the_first_source() {
        let cache = QueryCache::new();
        let a = cache.get_or_register_source("q", "select 1", QueryKind::Static);
        let b = cache.get_or_register_source("q", "select 2 -- ignored", QueryKind::Static);
        assert_eq!(a.source.as_ref(), "select 1");
        assert_eq!(b.source.as_ref(), "select 1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_names_cache_independently() {
        let cache = QueryCache::new();
        cache.get_or_register_source("a", "select 1", QueryKind::Static);
        cache.get_or_register_source("b", "select {{ x }}", QueryKind::Dynamic);
        assert_eq!(cache.len(), 2);
    }
}
