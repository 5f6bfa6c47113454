//! The row-stream object hydrator: compile a [`plan::MappingPlan`] from a
//! declared result shape, relationships, and a cursor's column list, then
//! drive it over a row stream with [`hydrate::Hydrator`] /
//! [`hydrate::HydrateIter`], reusing compiled plans via [`cache::MapperCache`].

pub mod binding;
pub mod cache;
pub mod hydrate;
pub mod id_key;
pub mod plan;
pub mod row;

pub use binding::{AnyObject, AttachFn, ConstructFn, RelationshipBinding, ShapeBinding};
pub use cache::{CacheKey, MapperCache};
pub use hydrate::{HydrateIter, HydrationOutput, Hydrator};
pub use id_key::{IdKey, IdScalar};
pub use plan::{compile, MappingPlan, ResultShape, ShapePlan};
pub use row::Row;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Arc;

    use compact_str::CompactString;
    use sqlkit_core::{MapperSpec, ParamValue, Relationship};

    #[derive(Debug)]
    struct Task {
        id: i64,
        title: String,
        statuses: RefCell<Vec<AnyObject>>,
    }

    #[derive(Debug)]
    struct Status {
        id: i64,
        name: String,
    }

    fn task_binding() -> ShapeBinding {
        ShapeBinding::new(MapperSpec::new::<Task>(), ["id", "title"], |values| {
            let id = match &values[0] {
                ParamValue::Int(i) => *i,
                _ => panic!("expected int id"),
            };
            let title = match &values[1] {
                ParamValue::Text(s) => s.to_string(),
                _ => panic!("expected text title"),
            };
            Arc::new(Task {
                id,
                title,
                statuses: RefCell::new(Vec::new()),
            }) as AnyObject
        })
    }

    fn status_binding() -> ShapeBinding {
        ShapeBinding::new(MapperSpec::new::<Status>(), ["id", "name"], |values| {
            let id = match &values[0] {
                ParamValue::Int(i) => *i,
                _ => panic!("expected int id"),
            };
            let name = match &values[1] {
                ParamValue::Text(s) => s.to_string(),
                _ => panic!("expected text name"),
            };
            Arc::new(Status { id, name }) as AnyObject
        })
    }

    fn task_to_statuses() -> RelationshipBinding {
        RelationshipBinding::new(Relationship::one_to_many("task", "statuses", "status"), |left, right| {
            let task = left.downcast_ref::<Task>().unwrap();
            task.statuses.borrow_mut().push(right.clone());
        })
    }

    fn columns() -> Vec<CompactString> {
        ["task__id", "task__title", "status__id", "status__name"]
            .into_iter()
            .map(CompactString::from)
            .collect()
    }

    fn row(task_id: i64, title: &str, status_id: i64, status_name: &str) -> Vec<ParamValue> {
        vec![
            ParamValue::Int(task_id),
            ParamValue::from(title),
            ParamValue::Int(status_id),
            ParamValue::from(status_name),
        ]
    }

    #[test]
    fn streams_one_task_per_identity_change_with_statuses_attached() {
        let plan = compile(
            ResultShape::Unary(CompactString::from("task")),
            vec![task_binding(), status_binding()],
            vec![task_to_statuses()],
            &columns(),
        )
        .unwrap();
        let plan = Arc::new(plan);

        let rows = vec![
            row(1, "first", 10, "open"),
            row(1, "first", 11, "closed"),
            row(2, "second", 12, "open"),
        ];

        let mut hydrator = Hydrator::new(plan);
        let mut emitted = Vec::new();
        for r in &rows {
            if let Some(HydrationOutput::Unary(obj)) = hydrator.feed_row(r).unwrap() {
                emitted.push(obj);
            }
        }
        if let Some(HydrationOutput::Unary(obj)) = hydrator.finish() {
            emitted.push(obj);
        }

        assert_eq!(emitted.len(), 2);
        let first = emitted[0].downcast_ref::<Task>().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.statuses.borrow().len(), 2);

        let second = emitted[1].downcast_ref::<Task>().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.statuses.borrow().len(), 1);
    }

    #[test]
    fn duplicate_child_row_does_not_duplicate_attach() {
        let plan = Arc::new(
            compile(
                ResultShape::Unary(CompactString::from("task")),
                vec![task_binding(), status_binding()],
                vec![task_to_statuses()],
                &columns(),
            )
            .unwrap(),
        );
        let mut hydrator = Hydrator::new(plan);
        let repeated = row(1, "first", 10, "open");
        hydrator.feed_row(&repeated).unwrap();
        hydrator.feed_row(&repeated).unwrap();
        let out = hydrator.finish().unwrap();
        let HydrationOutput::Unary(obj) = out else { panic!("expected unary") };
        let task = obj.downcast_ref::<Task>().unwrap();
        assert_eq!(task.statuses.borrow().len(), 1);
    }

    #[test]
    fn missing_id_column_is_a_compile_time_error() {
        let bad_columns: Vec<CompactString> = ["task__title"].into_iter().map(CompactString::from).collect();
        let err = compile(
            ResultShape::Unary(CompactString::from("task")),
            vec![task_binding()],
            vec![],
            &bad_columns,
        )
        .unwrap_err();
        assert!(matches!(err, sqlkit_core::MappingSpecError::MissingIdColumn { .. }));
    }

    #[test]
    fn undeclared_relationship_shape_is_a_compile_time_error() {
        let err = compile(
            ResultShape::Unary(CompactString::from("task")),
            vec![task_binding()],
            vec![task_to_statuses()],
            &columns(),
        )
        .unwrap_err();
        assert!(matches!(err, sqlkit_core::MappingSpecError::UndeclaredShape { .. }));
    }
}
