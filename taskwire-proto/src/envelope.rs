//! Inbound message envelope.

use serde_json::Value;

/// Dispatch key used when an envelope carries no usable `type` discriminant.
///
/// Legacy backends occasionally push frames without a discriminant; those
/// are still delivered, under this key, rather than dropped.
pub const FALLBACK_KIND: &str = "message";

/// One decoded inbound frame: the `type` discriminant plus the full payload.
///
/// Envelopes are ephemeral. Each is produced from a single text frame,
/// handed to the dispatcher synchronously, then discarded.
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: Option<String>,
    value: Value,
}

impl Envelope {
    /// Decode an envelope from one wire frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Wrap an already-decoded JSON value.
    pub fn from_value(value: Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self { kind, value }
    }

    /// The `type` discriminant, if the frame carried one.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// The key this envelope dispatches under in the generic namespace.
    pub fn dispatch_key(&self) -> &str {
        self.kind.as_deref().unwrap_or(FALLBACK_KIND)
    }

    /// The full payload value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// A named field of the payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_type_discriminant() {
        let envelope = Envelope::decode(r#"{"type":"chat_message","message":{"body":"hi"}}"#).unwrap();
        assert_eq!(envelope.kind(), Some("chat_message"));
        assert_eq!(envelope.dispatch_key(), "chat_message");
    }

    #[test]
    fn missing_type_falls_back_to_message_key() {
        let envelope = Envelope::decode(r#"{"message":{"body":"hi"}}"#).unwrap();
        assert_eq!(envelope.kind(), None);
        assert_eq!(envelope.dispatch_key(), FALLBACK_KIND);
    }

    #[test]
    fn non_string_type_falls_back_to_message_key() {
        let envelope = Envelope::decode(r#"{"type":42}"#).unwrap();
        assert_eq!(envelope.kind(), None);
        assert_eq!(envelope.dispatch_key(), FALLBACK_KIND);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(Envelope::decode("{not json").is_err());
    }

    #[test]
    fn field_access_reads_payload() {
        let envelope = Envelope::decode(r#"{"type":"task_created","task":{"id":1}}"#).unwrap();
        let task = envelope.field("task").unwrap();
        assert_eq!(task["id"], 1);
        assert!(envelope.field("missing").is_none());
    }
}
