use std::cmp::Ordering;

use serde_json::Value;

use crate::fuse::api::{CompiledQuery, FieldFilter, FilterOperator, OrderBy, OrderDirection};
use crate::fuse::model::FieldPath;
use crate::fuse::store::RawDocument;

/// Filters and orders `documents` according to `query`.
///
/// Documents outside the query's collection must already be excluded by the
/// caller. Ties in the requested ordering fall back to document id order.
pub(crate) fn apply_query_to_documents(
    documents: Vec<RawDocument>,
    query: &CompiledQuery,
) -> Vec<RawDocument> {
    let mut matched: Vec<RawDocument> = documents
        .into_iter()
        .filter(|document| document_satisfies_filters(document, query.filters()))
        .collect();

    matched.sort_by(|left, right| {
        compare_documents(left, right, query.order_by()).then_with(|| left.id.cmp(&right.id))
    });
    matched
}

fn document_satisfies_filters(document: &RawDocument, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| {
        get_field_value(document, filter.field())
            .map(|value| evaluate_filter(filter, &value))
            .unwrap_or(false)
    })
}

fn evaluate_filter(filter: &FieldFilter, value: &Value) -> bool {
    match filter.operator() {
        FilterOperator::Equal => values_equal(value, filter.value()),
        FilterOperator::ArrayContains => match value {
            Value::Array(items) => items.iter().any(|item| values_equal(item, filter.value())),
            _ => false,
        },
        FilterOperator::In => match filter.value() {
            Value::Array(needles) => needles.iter().any(|needle| values_equal(needle, value)),
            _ => false,
        },
    }
}

fn get_field_value(document: &RawDocument, field: &FieldPath) -> Option<Value> {
    if field.is_document_id() {
        return Some(Value::String(document.id.clone()));
    }
    let (first, rest) = field.segments().split_first()?;
    let mut current = document.fields.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

fn compare_documents(left: &RawDocument, right: &RawDocument, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let left_value = get_field_value(left, order.field()).unwrap_or(Value::Null);
        let right_value = get_field_value(right, order.field()).unwrap_or(Value::Null);

        let mut ordering = compare_values(&left_value, &right_value);
        if order.direction() == OrderDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

// Integers and floats with the same numeric value are equal, as in the store.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuse::api::{compile, Constraint};
    use crate::fuse::model::ResourcePath;
    use serde_json::json;

    fn document(id: &str, fields: Value) -> RawDocument {
        let fields = match fields {
            Value::Object(map) => map,
            other => panic!("expected object, found {other:?}"),
        };
        RawDocument::new(id, fields)
    }

    fn query(constraints: &[Constraint]) -> CompiledQuery {
        let collection = ResourcePath::from_string("notes").unwrap();
        compile(&crate::fuse::api::CollectionReference::new(collection), constraints)
    }

    fn ids(documents: &[RawDocument]) -> Vec<&str> {
        documents.iter().map(|doc| doc.id.as_str()).collect()
    }

    fn corpus() -> Vec<RawDocument> {
        vec![
            document("a", json!({"rank": 3, "tags": ["rust"], "owner": {"name": "ada"}})),
            document("b", json!({"rank": 1, "tags": ["go"], "owner": {"name": "bob"}})),
            document("c", json!({"rank": 2.0, "tags": ["rust", "go"], "owner": {"name": "ada"}})),
        ]
    }

    #[test]
    fn filters_on_nested_fields_and_arrays() {
        let result = apply_query_to_documents(
            corpus(),
            &query(&[
                Constraint::equal_to("owner.name", "ada"),
                Constraint::contains("tags", "go"),
            ]),
        );
        assert_eq!(ids(&result), ["c"]);
    }

    #[test]
    fn in_filter_matches_document_ids() {
        let result = apply_query_to_documents(
            corpus(),
            &query(&[Constraint::contained_in("id", ["a", "b", "z"])]),
        );
        assert_eq!(ids(&result), ["a", "b"]);
    }

    #[test]
    fn orders_mixed_numeric_values() {
        let descending = apply_query_to_documents(corpus(), &query(&[Constraint::ordered("rank", false)]));
        assert_eq!(ids(&descending), ["a", "c", "b"]);

        let ascending = apply_query_to_documents(corpus(), &query(&[Constraint::ordered("rank", true)]));
        assert_eq!(ids(&ascending), ["b", "c", "a"]);
    }

    #[test]
    fn missing_fields_never_match_filters() {
        let result = apply_query_to_documents(corpus(), &query(&[Constraint::equal_to("missing", Value::Null)]));
        assert!(result.is_empty());
    }
}
