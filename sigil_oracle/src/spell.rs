//! Spells and librarian chat on top of a [`Transport`].

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::OracleError;
use crate::transport::{CompletionRequest, Transport};

pub const SPELL_INSTRUCTION: &str = "You are an ancient librarian of the Mystic Arts. \
Generate unique spells including a name, a short description, a fake Latin/Sanskrit-style \
incantation, and a hex color code that fits the spell's theme.";

pub const ADVICE_INSTRUCTION: &str = "You are Wong, the librarian of Kamar-Taj. You are \
helpful, slightly dry, and knowledgeable about the Mystic Arts. Keep responses concise and \
thematic.";

// ════════════════════════════════════════════════════════════════════════════
// SpellInfo
// ════════════════════════════════════════════════════════════════════════════

/// What the overlay shows and which color the circle glows in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellInfo {
    pub name:        String,
    pub description: String,
    pub incantation: String,
    /// Hex string; the renderer falls back to orange if it does not parse.
    pub color:       String,
}

impl SpellInfo {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        incantation: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        SpellInfo {
            name:        name.into(),
            description: description.into(),
            incantation: incantation.into(),
            color:       color.into(),
        }
    }

    /// Returned whenever spell generation fails for any reason.
    pub fn fallback() -> Self {
        SpellInfo::new(
            "Eldritch Shield",
            "A standard defensive barrier of pure energy.",
            "Protego Maximus",
            "#fb923c",
        )
    }

    /// The spell a fresh session starts with.
    pub fn initial() -> Self {
        SpellInfo {
            description: "The primary defensive barrier of Kamar-Taj.".into(),
            ..SpellInfo::fallback()
        }
    }
}

/// The structured-output schema every generated spell must satisfy.
pub fn spell_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name":        { "type": "STRING" },
            "description": { "type": "STRING" },
            "incantation": { "type": "STRING" },
            "color":       { "type": "STRING" }
        },
        "required": ["name", "description", "incantation", "color"]
    })
}

pub fn spell_request(prompt: &str) -> CompletionRequest {
    CompletionRequest {
        system_instruction: SPELL_INSTRUCTION.to_string(),
        prompt:             format!("Generate a mystical Doctor Strange style spell for: {prompt}"),
        response_schema:    Some(spell_schema()),
    }
}

/// Like [`generate_spell`] but reports why it failed.
pub fn try_generate_spell<T: Transport + ?Sized>(transport: &T, prompt: &str) -> Result<SpellInfo, OracleError> {
    let text = transport.complete(&spell_request(prompt))?;
    let spell: SpellInfo = serde_json::from_str(text.trim())?;
    Ok(spell)
}

/// Ask for a spell themed on `prompt`.  Never fails: any problem is logged
/// and [`SpellInfo::fallback`] comes back instead.
pub fn generate_spell<T: Transport + ?Sized>(transport: &T, prompt: &str) -> SpellInfo {
    match try_generate_spell(transport, prompt) {
        Ok(spell) => {
            debug!("[oracle] generated spell {:?}", spell.name);
            spell
        }
        Err(e) => {
            warn!("[oracle] spell generation failed, using fallback: {e}");
            SpellInfo::fallback()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Chat
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role:    Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::User, content: content.into() }
    }

    pub fn model(content: impl Into<String>) -> Self {
        ChatMessage { role: Role::Model, content: content.into() }
    }
}

/// Ask the librarian about the latest message.  Only that message is sent;
/// earlier turns are not replayed.
pub fn mystic_advice<T: Transport + ?Sized>(transport: &T, history: &[ChatMessage]) -> Result<String, OracleError> {
    let last = history.last().ok_or(OracleError::EmptyHistory)?;
    transport.complete(&CompletionRequest {
        system_instruction: ADVICE_INSTRUCTION.to_string(),
        prompt:             last.content.clone(),
        response_schema:    None,
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CannedTransport, OfflineTransport};

    const GOOD: &str = r##"{"name":"Crimson Bands of Cyttorak","description":"Binding ribbons.","incantation":"Vincula Cyttorakis","color":"#dc2626"}"##;

    #[test]
    fn parses_structured_reply() {
        let t = CannedTransport::new().reply(GOOD);
        let spell = generate_spell(&t, "binding");
        assert_eq!(spell.name, "Crimson Bands of Cyttorak");
        assert_eq!(spell.color, "#dc2626");

        let sent = &t.requests()[0];
        assert_eq!(sent.prompt, "Generate a mystical Doctor Strange style spell for: binding");
        assert_eq!(sent.system_instruction, SPELL_INSTRUCTION);
        assert_eq!(sent.response_schema, Some(spell_schema()));
    }

    #[test]
    fn unparseable_reply_yields_fallback() {
        let t = CannedTransport::new().reply("the sorcerer supreme is out to lunch");
        assert_eq!(generate_spell(&t, "anything"), SpellInfo::fallback());
    }

    #[test]
    fn missing_field_yields_fallback() {
        let t = CannedTransport::new().reply(r#"{"name":"Half a spell"}"#);
        assert!(matches!(try_generate_spell(&t, "x"), Err(OracleError::Decode(_))));
        let t = CannedTransport::new().reply(r#"{"name":"Half a spell"}"#);
        assert_eq!(generate_spell(&t, "x"), SpellInfo::fallback());
    }

    #[test]
    fn transport_errors_yield_fallback() {
        assert_eq!(generate_spell(&OfflineTransport, "x"), SpellInfo::fallback());
        let t = CannedTransport::new().fail(OracleError::Status { code: 503, body: String::new() });
        assert_eq!(generate_spell(&t, "x"), SpellInfo::fallback());
    }

    #[test]
    fn fallback_constants() {
        let f = SpellInfo::fallback();
        assert_eq!(f.name, "Eldritch Shield");
        assert_eq!(f.description, "A standard defensive barrier of pure energy.");
        assert_eq!(f.incantation, "Protego Maximus");
        assert_eq!(f.color, "#fb923c");
        assert_eq!(SpellInfo::initial().description, "The primary defensive barrier of Kamar-Taj.");
    }

    #[test]
    fn advice_sends_only_the_last_message() {
        let t = CannedTransport::new().reply("Read the book. Quietly.");
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::model("first answer"),
            ChatMessage::user("where is the book?"),
        ];
        assert_eq!(mystic_advice(&t, &history).unwrap(), "Read the book. Quietly.");
        let sent = &t.requests()[0];
        assert_eq!(sent.prompt, "where is the book?");
        assert_eq!(sent.system_instruction, ADVICE_INSTRUCTION);
        assert!(sent.response_schema.is_none());
    }

    #[test]
    fn advice_on_empty_history_is_an_error() {
        let t = CannedTransport::new().reply("unused");
        assert!(matches!(mystic_advice(&t, &[]), Err(OracleError::EmptyHistory)));
        assert!(t.requests().is_empty());
    }

    #[test]
    fn role_serializes_lowercase() {
        let m = ChatMessage::model("hi");
        assert_eq!(serde_json::to_value(&m).unwrap()["role"], "model");
    }
}
