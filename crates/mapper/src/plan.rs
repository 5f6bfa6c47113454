//! The mapping-plan compiler: resolves column-to-field mappings, id
//! columns, and relationship edges once, up front, producing a
//! [`MappingPlan`] that the hydrator in [`crate::hydrate`] executes per
//! row without any further name lookups.

use std::collections::{HashMap, HashSet};

use compact_str::CompactString;
use sqlkit_core::{ColumnRef, MappingSpecError};

use crate::binding::{RelationshipBinding, ShapeBinding};

/// The declared result shape: one root, or an ordered tuple of shapes.
#[derive(Debug, Clone)]
pub enum ResultShape {
    Unary(CompactString),
    Nary(Vec<CompactString>),
}

/// One shape's precomputed row-processing plan: resolved id-column
/// indices and resolved field-column indices, in the exact order its
/// [`ShapeBinding`] declared them.
pub struct ShapePlan {
    pub binding: ShapeBinding,
    pub id_column_indices: Vec<usize>,
    pub field_column_indices: Vec<usize>,
    /// Relationships whose `right` is this shape, i.e. triggered right
    /// after this shape resolves for a row.
    pub incoming: Vec<RelationshipBinding>,
}

pub struct MappingPlan {
    pub result: ResultShape,
    /// Shapes in the order the hydrator visits them per row. This is the
    /// declaration order from [`compile`]'s `shapes` argument.
    pub shapes: Vec<ShapePlan>,
    /// Index into `shapes` of the root, when `result` is unary.
    pub root_index: Option<usize>,
}

/// Compile a [`MappingPlan`] from declared shapes, relationships, and the
/// cursor's column list.
pub fn compile(
    result: ResultShape,
    shapes: Vec<ShapeBinding>,
    relationships: Vec<RelationshipBinding>,
    columns: &[CompactString],
) -> Result<MappingPlan, MappingSpecError> {
    let shape_index: HashMap<String, usize> = shapes
        .iter()
        .enumerate()
        .map(|(i, s)| (s.shape_name().to_ascii_lowercase(), i))
        .collect();

    for rel_binding in &relationships {
        for name in [&rel_binding.relationship.left, &rel_binding.relationship.right] {
            if !shape_index.contains_key(&name.to_ascii_lowercase()) {
                return Err(MappingSpecError::UndeclaredShape {
                    shape: name.to_string(),
                });
            }
        }
    }

    // Step 2: resolve each column's `<shape>__<field>` prefix to a shape,
    // recording field -> column index.
    let mut field_columns: Vec<HashMap<String, usize>> = vec![HashMap::new(); shapes.len()];
    for (index, column) in columns.iter().enumerate() {
        let Some(col_ref) = ColumnRef::parse(column) else {
            continue;
        };
        if let Some(&shape_idx) = shape_index.get(&col_ref.shape.to_ascii_lowercase()) {
            field_columns[shape_idx].insert(col_ref.field.to_ascii_lowercase(), index);
        }
    }

    // Step 3: every id_field must have a mapped column; every declared
    // field must too, since the construct closure expects a value for
    // each of them.
    let mut shape_plans: Vec<ShapePlan> = Vec::with_capacity(shapes.len());
    for binding in shapes {
        let fields_for_shape = &field_columns[shape_index[&binding.shape_name().to_ascii_lowercase()]];

        let mut id_column_indices = Vec::with_capacity(binding.spec.id_fields().len());
        for id_field in binding.spec.id_fields() {
            let key = id_field.to_ascii_lowercase();
            let Some(&idx) = fields_for_shape.get(&key) else {
                return Err(MappingSpecError::MissingIdColumn {
                    shape: binding.shape_name().to_string(),
                    field: id_field.to_string(),
                });
            };
            id_column_indices.push(idx);
        }

        let mut field_column_indices = Vec::with_capacity(binding.fields.len());
        for field in &binding.fields {
            let key = field.to_ascii_lowercase();
            let Some(&idx) = fields_for_shape.get(&key) else {
                return Err(MappingSpecError::MissingIdColumn {
                    shape: binding.shape_name().to_string(),
                    field: field.to_string(),
                });
            };
            field_column_indices.push(idx);
        }

        shape_plans.push(ShapePlan {
            binding,
            id_column_indices,
            field_column_indices,
            incoming: Vec::new(),
        });
    }

    for rel_binding in relationships {
        let right_idx = shape_index[&rel_binding.relationship.right.to_ascii_lowercase()];
        shape_plans[right_idx].incoming.push(rel_binding);
    }

    // Step 4: adjacency left -> right, find unique in-degree-zero source.
    let root_index = match &result {
        ResultShape::Unary(root_name) => {
            let found = find_unique_root(&shape_plans);
            let expected_idx = shape_index.get(&root_name.to_ascii_lowercase()).copied();
            match (found, expected_idx) {
                (Some(found_idx), Some(expected_idx)) if found_idx == expected_idx => {
                    Some(expected_idx)
                }
                (found, _) => {
                    return Err(MappingSpecError::NoUniqueRoot {
                        candidates: if found.is_some() { 1 } else { count_in_degree_zero(&shape_plans) },
                    })
                }
            }
        }
        ResultShape::Nary(_) => None,
    };

    Ok(MappingPlan {
        result,
        shapes: shape_plans,
        root_index,
    })
}

fn in_degree_zero_indices(shapes: &[ShapePlan]) -> Vec<usize> {
    let mut has_incoming: HashSet<usize> = HashSet::new();
    for (idx, plan) in shapes.iter().enumerate() {
        if !plan.incoming.is_empty() {
            has_incoming.insert(idx);
        }
    }
    (0..shapes.len()).filter(|i| !has_incoming.contains(i)).collect()
}

fn find_unique_root(shapes: &[ShapePlan]) -> Option<usize> {
    let candidates = in_degree_zero_indices(shapes);
    if candidates.len() == 1 {
        Some(candidates[0])
    } else {
        None
    }
}

fn count_in_degree_zero(shapes: &[ShapePlan]) -> usize {
    in_degree_zero_indices(shapes).len()
}
