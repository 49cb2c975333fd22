use serde_json::Value;

use crate::fuse::constants::MAX_IN_CLAUSE_SIZE;

/// How a [`Constraint`] relates its field to the supplied value(s).
#[derive(Clone, Debug, PartialEq)]
pub enum Relation {
    /// The field equals the value.
    EqualTo(Value),
    /// The field is an array that contains the value.
    Contains(Value),
    /// The field equals one of the values. Only the first
    /// [`MAX_IN_CLAUSE_SIZE`] values are kept.
    ContainedIn(Vec<Value>),
    /// Sort the results by the field.
    Ordered { ascending: bool },
}

/// A declarative filter or sort clause over one document field.
///
/// `field` is a dotted path (`"owner.name"`) or `"id"` for the document
/// identifier itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    field: String,
    relation: Relation,
}

impl Constraint {
    pub fn new(field: impl Into<String>, relation: Relation) -> Self {
        let relation = match relation {
            Relation::ContainedIn(mut values) => {
                values.truncate(MAX_IN_CLAUSE_SIZE);
                Relation::ContainedIn(values)
            }
            other => other,
        };
        Self {
            field: field.into(),
            relation,
        }
    }

    pub fn equal_to(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Relation::EqualTo(value.into()))
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Relation::Contains(value.into()))
    }

    pub fn contained_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            Relation::ContainedIn(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn ordered(field: impl Into<String>, ascending: bool) -> Self {
        Self::new(field, Relation::Ordered { ascending })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contained_in_keeps_first_ten_values() {
        let constraint = Constraint::contained_in("tag", (0..15).map(|n| json!(n)));
        match constraint.relation() {
            Relation::ContainedIn(values) => {
                assert_eq!(values.len(), MAX_IN_CLAUSE_SIZE);
                assert_eq!(values.first(), Some(&json!(0)));
                assert_eq!(values.last(), Some(&json!(9)));
            }
            other => panic!("unexpected relation {other:?}"),
        }
    }

    #[test]
    fn builders_record_field() {
        let constraint = Constraint::ordered("created_at", false);
        assert_eq!(constraint.field(), "created_at");
        assert_eq!(
            constraint.relation(),
            &Relation::Ordered { ascending: false }
        );
    }
}
