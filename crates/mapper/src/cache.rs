//! The compiled-mapper cache. Cache key is `(target types, relationship
//! set, column-name tuple)` with structural equality. The cache is
//! thread-safe and write-once per key.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use compact_str::CompactString;
use sqlkit_core::{MappingSpecError, Relationship, RelationshipKind};

use crate::binding::ShapeBinding;
use crate::plan::MappingPlan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    type_ids: Vec<TypeId>,
    relationships: Vec<Relationship>,
    columns: Vec<CompactString>,
}

impl CacheKey {
    pub fn new(shapes: &[ShapeBinding], relationships: &[Relationship], columns: &[CompactString]) -> Self {
        let type_ids = shapes.iter().map(|s| s.spec.type_id()).collect();
        let mut relationships: Vec<Relationship> = relationships.to_vec();
        relationships.sort_by(|a, b| canonical_order(a).cmp(&canonical_order(b)));
        CacheKey {
            type_ids,
            relationships,
            columns: columns.to_vec(),
        }
    }
}

fn canonical_order(r: &Relationship) -> (u8, &str, &str, &str) {
    let kind = match r.kind {
        RelationshipKind::OneToOne => 0,
        RelationshipKind::OneToMany => 1,
    };
    (kind, r.left.as_str(), r.field.as_str(), r.right.as_str())
}

/// Read-mostly, write-once-per-key cache of compiled [`MappingPlan`]s.
#[derive(Default)]
pub struct MapperCache {
    entries: RwLock<HashMap<CacheKey, Arc<MappingPlan>>>,
}

impl MapperCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Result<MappingPlan, MappingSpecError>,
    ) -> Result<Arc<MappingPlan>, MappingSpecError> {
        if let Some(plan) = self.entries.read().unwrap().get(&key) {
            return Ok(plan.clone());
        }
        let plan = Arc::new(build()?);
        let mut guard = self.entries.write().unwrap();
        let plan = guard.entry(key).or_insert(plan).clone();
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
