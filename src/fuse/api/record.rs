use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fuse::constants::AUTO_ID_LENGTH;
use crate::fuse::error::{decode_error, FuseResult};

/// A typed, identifiable, serde-encodable domain record.
///
/// `TYPE_ID` names the collection the record lives in. The record's
/// serialized form must carry its identifier under the `id` key; an empty
/// id means the record has no identity yet and is never sent to the store.
pub trait Fusable: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_ID: &'static str;

    fn id(&self) -> &str;

    /// Parses a record from its canonical JSON bytes.
    fn decode(bytes: &[u8]) -> FuseResult<Self> {
        serde_json::from_slice(bytes).map_err(|err| {
            decode_error(format!("Failed to decode {}: {err}", Self::TYPE_ID))
        })
    }
}

/// Generates a random 20-character alphanumeric document id.
pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .take(AUTO_ID_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Note;

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = generate_id();
        assert_eq!(id.len(), AUTO_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn decode_reports_type_on_failure() {
        let err = Note::decode(br#"{"id":"n1"}"#).unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.message().contains("notes"));
    }
}
