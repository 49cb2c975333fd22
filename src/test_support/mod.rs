//! Fixtures shared by the crate's unit tests.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fuse::store::FieldMap;
use crate::fuse::Fusable;

/// Serializes tests that install the process-wide user log handler.
pub static LOG_GUARD: Mutex<()> = Mutex::new(());

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rank: i64,
}

impl Note {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            tags: Vec::new(),
            rank: 0,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }
}

impl Fusable for Note {
    const TYPE_ID: &'static str = "notes";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Unwraps a JSON object literal into a field map.
pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, found {other}"),
    }
}
