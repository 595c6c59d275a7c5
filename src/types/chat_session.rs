use serde::{Deserialize, Deserializer, Serialize};

/// A server-side conversation context.
///
/// The server stores sessions under an integer primary key but the id is
/// opaque to the client, so both JSON strings and JSON integers are accepted
/// and normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// The opaque session identifier.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    /// Optional human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Creation timestamp as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatSession {
    /// Create a new `ChatSession` with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created_at: None,
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(id) => Ok(id),
        RawId::Number(id) => Ok(id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn chat_session_string_id() {
        let session: ChatSession = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(session, ChatSession::new("abc"));
    }

    #[test]
    fn chat_session_integer_id() {
        let session: ChatSession = serde_json::from_value(json!({
            "id": 42,
            "title": "Design doc",
            "created_at": "2024-09-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(session.id, "42");
        assert_eq!(session.title.as_deref(), Some("Design doc"));
        assert_eq!(session.created_at.as_deref(), Some("2024-09-01T10:00:00Z"));
    }

    #[test]
    fn chat_session_missing_id_is_an_error() {
        assert!(serde_json::from_value::<ChatSession>(json!({"title": "x"})).is_err());
        assert!(serde_json::from_value::<ChatSession>(json!({"id": null})).is_err());
    }

    #[test]
    fn chat_session_serialization_skips_absent_fields() {
        let session = ChatSession::new("7").with_title("Notes");
        assert_eq!(
            to_value(&session).unwrap(),
            json!({"id": "7", "title": "Notes"})
        );
    }
}
