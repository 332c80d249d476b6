//! Field extraction from the upload service's acknowledgment.
//!
//! The service replies with a flat JSON object carrying `id`, `name`, and `status` as string
//! values. Only that shape is understood: no nesting, escapes, or non-string values.

use crate::error::ResponseInvalid;

/// The only status value treated as success
pub const STATUS_CONFIRMED: &str = "confirmed";

/// Return the value of the first `"<key>":"<value>"` pair in `text`.
///
/// `None` when the key pattern is absent or its value is unterminated.
pub fn extract_field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("\"{}\":\"", key);
    let start = text.find(&pattern)? + pattern.len();
    let rest = &text[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Decoded acknowledgment, scoped to one reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// An acknowledgment that may be booked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedEvent {
    pub id: String,
    pub name: String,
}

impl ParsedResponse {
    pub fn parse(text: &str) -> Self {
        let field = |key: &str| extract_field(text, key).map(str::to_string);
        Self {
            id: field("id"),
            name: field("name"),
            status: field("status"),
        }
    }

    /// Accept only replies with a non-empty name and `status == "confirmed"`
    pub fn into_confirmed(self) -> Result<ConfirmedEvent, ResponseInvalid> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ResponseInvalid::MissingName),
        };
        if self.status.as_deref() != Some(STATUS_CONFIRMED) {
            return Err(ResponseInvalid::StatusNotConfirmed);
        }

        Ok(ConfirmedEvent {
            id: self.id.unwrap_or_default(),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{"id":"42","name":"Dentist","status":"confirmed"}"#;

    #[test]
    fn test_extract_known_fields() {
        assert_eq!(extract_field(REPLY, "status"), Some("confirmed"));
        assert_eq!(extract_field(REPLY, "id"), Some("42"));
        assert_eq!(extract_field(REPLY, "name"), Some("Dentist"));
    }

    #[test]
    fn test_missing_key_is_empty() {
        assert_eq!(extract_field(REPLY, "missing"), None);
        assert_eq!(extract_field(REPLY, "missing").unwrap_or_default(), "");
    }

    #[test]
    fn test_unterminated_value_is_empty() {
        assert_eq!(extract_field(r#"{"name":"Dent"#, "name"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = r#"{"name":"first","name":"second"}"#;
        assert_eq!(extract_field(text, "name"), Some("first"));
    }

    #[test]
    fn test_non_string_values_are_not_matched() {
        assert_eq!(extract_field(r#"{"id":42}"#, "id"), None);
    }

    #[test]
    fn test_confirmed_reply() {
        let confirmed = ParsedResponse::parse(REPLY).into_confirmed().unwrap();
        assert_eq!(
            confirmed,
            ConfirmedEvent {
                id: "42".to_string(),
                name: "Dentist".to_string()
            }
        );
    }

    #[test]
    fn test_rejections() {
        let no_name = ParsedResponse::parse(r#"{"id":"1","status":"confirmed"}"#);
        assert_eq!(no_name.into_confirmed(), Err(ResponseInvalid::MissingName));

        let empty_name = ParsedResponse::parse(r#"{"id":"1","name":"","status":"confirmed"}"#);
        assert_eq!(empty_name.into_confirmed(), Err(ResponseInvalid::MissingName));

        let pending = ParsedResponse::parse(r#"{"id":"1","name":"Gym","status":"pending"}"#);
        assert_eq!(
            pending.into_confirmed(),
            Err(ResponseInvalid::StatusNotConfirmed)
        );
    }
}
