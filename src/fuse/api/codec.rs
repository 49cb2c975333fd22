use std::sync::LazyLock;

use serde_json::Value;

use crate::fuse::constants::DOCUMENT_ID_FIELD;
use crate::fuse::error::{decode_error, invalid_argument, FuseError, FuseResult};
use crate::fuse::settings::DecodePolicy;
use crate::fuse::store::{FieldMap, RawDocument};
use crate::logger::{LogArgument, Logger};

use super::record::Fusable;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firefuse/codec"));

/// Which fields an encoded payload carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every serialized field, `id` included.
    Replace,
    /// Every serialized field except `id`.
    Merge,
}

/// Converts between store documents and typed records.
#[derive(Clone, Copy, Debug)]
pub struct DocumentCodec {
    policy: DecodePolicy,
}

impl DocumentCodec {
    pub fn new(policy: DecodePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    /// Decodes `raw` into `T`.
    ///
    /// The store id is injected under `id`, the map is serialized to JSON
    /// bytes and those bytes are parsed with [`Fusable::decode`].
    pub fn decode<T: Fusable>(&self, raw: &RawDocument) -> FuseResult<T> {
        let mut fields = raw.fields.clone();
        fields.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(raw.id.clone()));
        let bytes = serde_json::to_vec(&Value::Object(fields))
            .map_err(|err| decode_error(format!("Failed to serialize document {}: {err}", raw.id)))?;
        T::decode(&bytes)
    }

    /// Decodes `raw`, applying the decode policy on failure.
    ///
    /// Documents with an empty id are absent and never decoded.
    ///
    /// # Panics
    /// Under [`DecodePolicy::Strict`] when the document does not decode.
    pub fn decode_or_drop<T: Fusable>(&self, raw: &RawDocument) -> Option<T> {
        if raw.id.is_empty() {
            return None;
        }
        match self.decode(raw) {
            Ok(record) => Some(record),
            Err(err) => {
                self.report_failure::<T>(raw, &err);
                None
            }
        }
    }

    /// Decodes every document, dropping those that fail.
    pub fn decode_all<T: Fusable>(&self, documents: &[RawDocument]) -> Vec<T> {
        documents
            .iter()
            .filter_map(|raw| self.decode_or_drop(raw))
            .collect()
    }

    /// Serializes `record` into a field map.
    ///
    /// # Errors
    /// `fuse/invalid-argument` when the record does not serialize to a map.
    pub fn encode<T: Fusable>(&self, record: &T, mode: EncodeMode) -> FuseResult<FieldMap> {
        let value = serde_json::to_value(record)
            .map_err(|err| invalid_argument(format!("Failed to encode {}: {err}", T::TYPE_ID)))?;
        let Value::Object(mut fields) = value else {
            return Err(invalid_argument(format!(
                "Records of type {} must serialize to a map",
                T::TYPE_ID
            )));
        };
        if mode == EncodeMode::Merge {
            fields.remove(DOCUMENT_ID_FIELD);
        }
        Ok(fields)
    }

    /// Splits `record` into a store document whose id is the document key
    /// and whose fields never contain `id`.
    pub fn to_raw_document<T: Fusable>(&self, record: &T) -> FuseResult<RawDocument> {
        let mut fields = self.encode(record, EncodeMode::Replace)?;
        fields.remove(DOCUMENT_ID_FIELD);
        Ok(RawDocument::new(record.id(), fields))
    }

    fn report_failure<T: Fusable>(&self, raw: &RawDocument, err: &FuseError) {
        let mut payload = raw.fields.clone();
        payload.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(raw.id.clone()));
        LOGGER.error_with([
            LogArgument::from(format!("{err} in collection {}:", T::TYPE_ID)),
            LogArgument::from(Value::Object(payload)),
        ]);
        if self.policy == DecodePolicy::Strict {
            panic!("malformed {} document {}: {err}", T::TYPE_ID, raw.id);
        }
    }
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self::new(DecodePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{set_user_log_handler, LogCallbackParams};
    use crate::test_support::{fields, Note, LOG_GUARD};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn lenient() -> DocumentCodec {
        DocumentCodec::new(DecodePolicy::Lenient)
    }

    #[test]
    fn decode_injects_store_id() {
        let raw = RawDocument::new("n1", fields(json!({"title": "Groceries", "tags": ["home"]})));
        let note: Note = lenient().decode(&raw).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.tags, vec!["home".to_string()]);
    }

    #[test]
    fn decode_missing_required_field_is_an_error() {
        let raw = RawDocument::new("n1", fields(json!({"tags": []})));
        let err = lenient().decode::<Note>(&raw).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn lenient_policy_drops_and_logs_payload() {
        let _guard = LOG_GUARD.lock().unwrap_or_else(|p| p.into_inner());
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        set_user_log_handler(
            Some(move |params: LogCallbackParams| {
                if params.logger_name == "@firefuse/codec" {
                    sink.lock().unwrap().push(params);
                }
            }),
            None,
        );

        let documents = vec![
            RawDocument::new("good", fields(json!({"title": "ok"}))),
            RawDocument::new("bad", fields(json!({"title": 42}))),
        ];
        let notes: Vec<Note> = lenient().decode_all(&documents);

        let records = captured.lock().unwrap().clone();
        set_user_log_handler(None::<fn(LogCallbackParams)>, None);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "good");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].args[1], json!({"id": "bad", "title": 42}));
    }

    #[test]
    #[should_panic(expected = "malformed notes document bad")]
    fn strict_policy_panics() {
        let _guard = LOG_GUARD.lock().unwrap_or_else(|p| p.into_inner());
        let codec = DocumentCodec::new(DecodePolicy::Strict);
        let raw = RawDocument::new("bad", fields(json!({"title": 42})));
        let _ = codec.decode_or_drop::<Note>(&raw);
    }

    #[test]
    fn empty_id_is_absent_without_decoding() {
        let codec = DocumentCodec::new(DecodePolicy::Strict);
        let raw = RawDocument::new("", fields(json!({"title": 42})));
        assert!(codec.decode_or_drop::<Note>(&raw).is_none());
    }

    #[test]
    fn merge_encoding_drops_id() {
        let note = Note::new("n1", "Groceries");
        let replace = lenient().encode(&note, EncodeMode::Replace).unwrap();
        let merge = lenient().encode(&note, EncodeMode::Merge).unwrap();
        assert_eq!(replace.get("id"), Some(&json!("n1")));
        assert!(merge.get("id").is_none());
        assert_eq!(merge.get("title"), Some(&json!("Groceries")));
    }

    #[test]
    fn raw_document_keeps_id_out_of_payload() {
        let note = Note::new("n1", "Groceries");
        let raw = lenient().to_raw_document(&note).unwrap();
        assert_eq!(raw.id, "n1");
        assert!(!raw.fields.contains_key("id"));
        assert_eq!(lenient().decode::<Note>(&raw).unwrap(), note);
    }
}
