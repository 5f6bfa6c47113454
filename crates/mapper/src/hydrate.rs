//! The per-hydration-pass state machine: an Init / Per-row / Terminate
//! cycle, executed against a precompiled [`MappingPlan`] without any
//! per-row name lookups.

use std::collections::HashMap;
use std::sync::Arc;

use sqlkit_core::MappingSpecError;

use crate::binding::AnyObject;
use crate::id_key::IdKey;
use crate::plan::{MappingPlan, ResultShape};
use crate::row::Row;

/// One emitted hydration result: a single root object for a unary
/// result, or one tuple-per-row for an n-ary result.
#[derive(Clone)]
pub enum HydrationOutput {
    Unary(AnyObject),
    Nary(Vec<AnyObject>),
}

/// Drives one hydration pass over an externally-supplied row stream.
///
/// Holds the per-shape identity maps (destroyed with the `Hydrator` at
/// the end of the pass) and, for a unary result, the pending root
/// awaiting emission.
pub struct Hydrator {
    plan: Arc<MappingPlan>,
    identity_maps: Vec<HashMap<IdKey, AnyObject>>,
    last_root: Option<AnyObject>,
    shape_by_lower_name: HashMap<String, usize>,
}

impl Hydrator {
    pub fn new(plan: Arc<MappingPlan>) -> Self {
        let identity_maps = plan.shapes.iter().map(|_| HashMap::new()).collect();
        let shape_by_lower_name = plan
            .shapes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.binding.shape_name().to_ascii_lowercase(), i))
            .collect();
        Hydrator {
            plan,
            identity_maps,
            last_root: None,
            shape_by_lower_name,
        }
    }

    /// Process one row, returning a completed root when the unary
    /// result's identity just changed, or a fresh tuple for an n-ary
    /// result. Returns `None` for a unary result whose root hasn't
    /// changed yet.
    pub fn feed_row(&mut self, row: &dyn Row) -> Result<Option<HydrationOutput>, MappingSpecError> {
        let mut resolved: Vec<Option<AnyObject>> = vec![None; self.plan.shapes.len()];
        let mut emitted_root: Option<AnyObject> = None;

        for (shape_idx, shape_plan) in self.plan.shapes.iter().enumerate() {
            let id_values = shape_plan
                .id_column_indices
                .iter()
                .map(|&col| row.get(col));
            let id_key = IdKey::from_values(id_values)?;

            let (object, newly_built) = match self.identity_maps[shape_idx].get(&id_key) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let field_values: Vec<_> = shape_plan
                        .field_column_indices
                        .iter()
                        .map(|&col| row.get(col))
                        .collect();
                    let built = (shape_plan.binding.construct)(&field_values);
                    self.identity_maps[shape_idx].insert(id_key, built.clone());
                    (built, true)
                }
            };

            if Some(shape_idx) == self.plan.root_index {
                let changed = match &self.last_root {
                    Some(prev) => !Arc::ptr_eq(prev, &object),
                    None => false,
                };
                if changed {
                    emitted_root = self.last_root.replace(object.clone());
                } else {
                    self.last_root = Some(object.clone());
                }
            }

            if newly_built {
                for rel_binding in &shape_plan.incoming {
                    let left_idx = self.shape_by_lower_name[&rel_binding.relationship.left.to_ascii_lowercase()];
                    let left_object = resolved[left_idx]
                        .clone()
                        .expect("relationship `left` shape must be visited before `right` in declaration order");
                    (rel_binding.attach)(&left_object, &object);
                }
            }

            resolved[shape_idx] = Some(object);
        }

        if let Some(root) = emitted_root {
            return Ok(Some(HydrationOutput::Unary(root)));
        }
        if matches!(self.plan.result, ResultShape::Nary(_)) {
            let tuple = resolved.into_iter().map(|o| o.expect("every shape resolves each row")).collect();
            return Ok(Some(HydrationOutput::Nary(tuple)));
        }
        Ok(None)
    }

    /// Signal end-of-stream: emits the trailing root for a unary result,
    /// if any remains pending.
    pub fn finish(&mut self) -> Option<HydrationOutput> {
        if matches!(self.plan.result, ResultShape::Unary(_)) {
            self.last_root.take().map(HydrationOutput::Unary)
        } else {
            None
        }
    }
}

/// Adapts a row iterator into a [`HydrationOutput`] iterator, driving a
/// [`Hydrator`] over the stream for a hydrator-backed `iter`.
pub struct HydrateIter<I> {
    rows: I,
    hydrator: Hydrator,
    exhausted: bool,
    pending_final: Option<HydrationOutput>,
}

impl<I> HydrateIter<I> {
    pub fn new(rows: I, plan: Arc<MappingPlan>) -> Self {
        HydrateIter {
            rows,
            hydrator: Hydrator::new(plan),
            exhausted: false,
            pending_final: None,
        }
    }
}

impl<I, R> Iterator for HydrateIter<I>
where
    I: Iterator<Item = R>,
    R: Row,
{
    type Item = Result<HydrationOutput, MappingSpecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(out) = self.pending_final.take() {
            return Some(Ok(out));
        }
        if self.exhausted {
            return None;
        }
        loop {
            match self.rows.next() {
                Some(row) => match self.hydrator.feed_row(&row) {
                    Ok(Some(out)) => return Some(Ok(out)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                },
                None => {
                    self.exhausted = true;
                    return self.hydrator.finish().map(Ok);
                }
            }
        }
    }
}
