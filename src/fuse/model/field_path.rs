use crate::fuse::constants::{DOCUMENT_ID_FIELD, DOCUMENT_NAME_FIELD};

/// Structured path to a (possibly nested) document field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Resolves a constraint field name.
    ///
    /// `"id"` maps to the document identity; anything else is split on `.`.
    /// Returns `None` when the name contains an empty segment.
    pub fn resolve(field: &str) -> Option<Self> {
        if field == DOCUMENT_ID_FIELD {
            return Some(Self::document_id());
        }
        Self::from_dot_separated(field)
    }

    pub fn from_dot_separated(path: &str) -> Option<Self> {
        if path.split('.').any(|segment| segment.trim().is_empty()) {
            return None;
        }
        Some(Self {
            segments: path.split('.').map(str::to_string).collect(),
        })
    }

    pub fn document_id() -> Self {
        Self {
            segments: vec![DOCUMENT_NAME_FIELD.to_string()],
        }
    }

    pub fn is_document_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == DOCUMENT_NAME_FIELD
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn canonical_string(&self) -> String {
        self.segments.join(".")
    }
}
