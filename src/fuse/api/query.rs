use serde_json::Value;

use crate::fuse::constants::MAX_IN_CLAUSE_SIZE;
use crate::fuse::model::{FieldPath, ResourcePath};

use super::constraint::{Constraint, Relation};
use super::reference::CollectionReference;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    ArrayContains,
    In,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: Value,
}

impl FieldFilter {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// For [`FilterOperator::In`] this is always a JSON array.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Store-independent query over one collection.
///
/// Built by [`compile`]; filters combine conjunctively, orderings apply in
/// insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    order_by: Vec<OrderBy>,
}

impl CompiledQuery {
    /// A query matching every document of the collection.
    pub fn new(collection_path: ResourcePath) -> Self {
        Self {
            collection_path,
            filters: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Whether the query targets the whole collection.
    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn where_field(mut self, field: FieldPath, operator: FilterOperator, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field,
            operator,
            value,
        });
        self
    }

    /// Adds a sort directive. A later directive on the same field replaces
    /// the direction of the earlier one.
    pub fn order(mut self, field: FieldPath, direction: OrderDirection) -> Self {
        match self.order_by.iter_mut().find(|order| order.field == field) {
            Some(existing) => existing.direction = direction,
            None => self.order_by.push(OrderBy { field, direction }),
        }
        self
    }

    fn apply(self, constraint: &Constraint) -> Self {
        let Some(field) = FieldPath::resolve(constraint.field()) else {
            return self;
        };
        match constraint.relation() {
            Relation::EqualTo(value) => self.where_field(field, FilterOperator::Equal, value.clone()),
            Relation::Contains(value) => {
                self.where_field(field, FilterOperator::ArrayContains, value.clone())
            }
            Relation::ContainedIn(values) => {
                let values = values.iter().take(MAX_IN_CLAUSE_SIZE).cloned().collect();
                self.where_field(field, FilterOperator::In, Value::Array(values))
            }
            Relation::Ordered { ascending } => {
                let direction = if *ascending {
                    OrderDirection::Ascending
                } else {
                    OrderDirection::Descending
                };
                self.order(field, direction)
            }
        }
    }
}

/// Folds `constraints` left to right onto `collection`.
///
/// An empty list yields the whole collection. Constraints whose field cannot
/// be resolved leave the query unchanged.
pub fn compile(collection: &CollectionReference, constraints: &[Constraint]) -> CompiledQuery {
    constraints
        .iter()
        .fold(CompiledQuery::new(collection.path().clone()), |query, constraint| {
            query.apply(constraint)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes() -> CollectionReference {
        CollectionReference::new(ResourcePath::from_string("devel/0.0.1/notes").unwrap())
    }

    #[test]
    fn empty_constraints_target_whole_collection() {
        let query = compile(&notes(), &[]);
        assert!(query.is_unfiltered());
        assert!(query.order_by().is_empty());
        assert_eq!(query.collection_path().canonical_string(), "devel/0.0.1/notes");
    }

    #[test]
    fn filters_accumulate_conjunctively() {
        let query = compile(
            &notes(),
            &[
                Constraint::equal_to("owner.name", "ada"),
                Constraint::contains("tags", "rust"),
                Constraint::contained_in("status", ["open", "done"]),
            ],
        );
        let operators: Vec<_> = query.filters().iter().map(|f| f.operator()).collect();
        assert_eq!(
            operators,
            [
                FilterOperator::Equal,
                FilterOperator::ArrayContains,
                FilterOperator::In
            ]
        );
        assert_eq!(query.filters()[0].field().segments(), &["owner", "name"]);
        assert_eq!(query.filters()[2].value(), &json!(["open", "done"]));
    }

    #[test]
    fn id_field_uses_document_identity() {
        let query = compile(&notes(), &[Constraint::contained_in("id", ["a", "b"])]);
        assert!(query.filters()[0].field().is_document_id());
    }

    #[test]
    fn contained_in_compiles_at_most_ten_values() {
        let query = compile(
            &notes(),
            &[Constraint::new(
                "rank",
                Relation::ContainedIn((0..25).map(|n| json!(n)).collect()),
            )],
        );
        match query.filters()[0].value() {
            Value::Array(values) => assert_eq!(values.len(), MAX_IN_CLAUSE_SIZE),
            other => panic!("expected array, found {other:?}"),
        }
    }

    #[test]
    fn later_ordering_on_same_field_wins() {
        let query = compile(
            &notes(),
            &[
                Constraint::ordered("created_at", true),
                Constraint::ordered("title", true),
                Constraint::ordered("created_at", false),
            ],
        );
        assert_eq!(query.order_by().len(), 2);
        assert_eq!(query.order_by()[0].field().canonical_string(), "created_at");
        assert_eq!(query.order_by()[0].direction(), OrderDirection::Descending);
    }

    #[test]
    fn unresolvable_field_is_ignored() {
        let query = compile(&notes(), &[Constraint::equal_to("", 1)]);
        assert!(query.is_unfiltered());
    }

    #[test]
    fn compilation_is_deterministic() {
        let constraints = vec![
            Constraint::equal_to("owner", "ada"),
            Constraint::ordered("created_at", false),
            Constraint::contains("tags", "rust"),
        ];
        assert_eq!(compile(&notes(), &constraints), compile(&notes(), &constraints));
    }
}
