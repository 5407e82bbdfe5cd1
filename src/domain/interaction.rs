//! Inbound interaction model.
//!
//! [`RawInteraction`] mirrors the JSON body Discord posts to the interactions
//! endpoint. [`Interaction::classify`] turns it into a typed [`Interaction`],
//! returning `Ok(None)` for interaction types this bot does not handle.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::error::DomainError;

/// Name of the only slash command this bot registers and answers.
pub const FORTUNE_COMMAND: &str = "fortune";
/// Option carrying the user's free-text question.
pub const QUESTION_OPTION: &str = "question";
/// Custom id of the button attached to every fortune message.
pub const REDO_BUTTON_ID: &str = "redo_button";

const ARTIFACT_SUFFIX: &str = "-fortune";
const ARTIFACT_EXTENSION: &str = "png";

/// Wire codes for the `type` field of an inbound interaction.
pub mod codes {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
    pub const MESSAGE_COMPONENT: u8 = 3;
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInteraction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub member: Option<RawMember>,
    #[serde(default)]
    pub user: Option<RawUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub user: Option<RawUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCommandData {
    name: String,
    #[serde(default)]
    options: Vec<RawCommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCommandOption {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawComponentData {
    custom_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Handshake,
    CommandInvocation,
    ComponentActivation,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handshake => "handshake",
            Self::CommandInvocation => "command",
            Self::ComponentActivation => "component",
        }
    }
}

/// Interaction snowflake. Also the basis of the temporary artifact name, so it
/// is restricted to characters that are safe inside a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InteractionId(String);

impl InteractionId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::validation("interaction id must not be empty"));
        }
        if !value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(DomainError::validation(format!(
                "interaction id `{value}` contains unsupported characters"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<id>-fortune.png`; unique per interaction.
    pub fn artifact_file_name(&self) -> String {
        format!("{}{ARTIFACT_SUFFIX}.{ARTIFACT_EXTENSION}", self.0)
    }
}

impl fmt::Display for InteractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Continuation token authorizing edits to the interaction's original message.
#[derive(Clone, PartialEq, Eq)]
pub struct InteractionToken(String);

impl InteractionToken {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::validation("interaction token must not be empty"));
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InteractionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InteractionToken([redacted])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Id and token of an interaction that expects a follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub id: InteractionId,
    pub token: InteractionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionPayload {
    Handshake,
    Command {
        correlation: Correlation,
        name: String,
        question: Option<String>,
    },
    Component {
        correlation: Correlation,
        custom_id: String,
    },
}

/// A classified inbound interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub user: Option<UserId>,
    pub payload: InteractionPayload,
}

impl Interaction {
    /// Classify a raw callback. Unknown `type` codes yield `Ok(None)`.
    ///
    /// Handshakes carry no obligations beyond the pong, so their id and token
    /// are ignored. Command and component interactions must carry both.
    pub fn classify(raw: RawInteraction) -> Result<Option<Self>, DomainError> {
        let RawInteraction {
            kind,
            id,
            token,
            data,
            member,
            user,
        } = raw;

        if kind == codes::PING {
            return Ok(Some(Self {
                user: None,
                payload: InteractionPayload::Handshake,
            }));
        }
        if kind != codes::APPLICATION_COMMAND && kind != codes::MESSAGE_COMPONENT {
            return Ok(None);
        }

        let correlation = Correlation {
            id: id
                .ok_or_else(|| DomainError::validation("interaction id is missing"))
                .and_then(InteractionId::parse)?,
            token: token
                .ok_or_else(|| DomainError::validation("interaction token is missing"))
                .and_then(InteractionToken::parse)?,
        };

        let payload = if kind == codes::APPLICATION_COMMAND {
            let data: RawCommandData = decode_data(data)?;
            InteractionPayload::Command {
                correlation,
                question: extract_question(&data.options),
                name: data.name,
            }
        } else {
            let data: RawComponentData = decode_data(data)?;
            InteractionPayload::Component {
                correlation,
                custom_id: data.custom_id,
            }
        };

        // Guild interactions nest the invoker under `member`, DMs put it at the top level.
        let user = member
            .and_then(|member| member.user)
            .or(user)
            .map(|user| UserId::new(user.id));

        Ok(Some(Self { user, payload }))
    }

    pub fn kind(&self) -> InteractionKind {
        match self.payload {
            InteractionPayload::Handshake => InteractionKind::Handshake,
            InteractionPayload::Command { .. } => InteractionKind::CommandInvocation,
            InteractionPayload::Component { .. } => InteractionKind::ComponentActivation,
        }
    }
}

fn decode_data<T>(data: Option<Value>) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de>,
{
    let data = data.ok_or_else(|| DomainError::validation("interaction data is missing"))?;
    serde_json::from_value(data)
        .map_err(|err| DomainError::validation(format!("interaction data is malformed: {err}")))
}

fn extract_question(options: &[RawCommandOption]) -> Option<String> {
    let option = options
        .iter()
        .find(|option| option.name.as_deref() == Some(QUESTION_OPTION))
        .or_else(|| options.first())?;

    // Whitespace-only answers count as absent; anything else is kept verbatim.
    let text = match option.value.as_ref()? {
        Value::String(text) => text.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };

    (!text.trim().is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn classify(value: Value) -> Result<Option<Interaction>, DomainError> {
        let raw: RawInteraction = serde_json::from_value(value).expect("raw interaction");
        Interaction::classify(raw)
    }

    fn correlation(id: &str) -> Correlation {
        Correlation {
            id: InteractionId::parse(id).expect("id"),
            token: InteractionToken::parse("tok").expect("token"),
        }
    }

    #[test]
    fn ping_classifies_as_handshake_without_id() {
        let interaction = classify(json!({ "type": 1 }))
            .expect("valid")
            .expect("recognized");
        assert_eq!(interaction.kind(), InteractionKind::Handshake);
        assert_eq!(interaction.payload, InteractionPayload::Handshake);
    }

    #[test]
    fn command_extracts_question_and_member_user() {
        let interaction = classify(json!({
            "type": 2,
            "id": "A1",
            "token": "tok",
            "data": {
                "name": "fortune",
                "options": [{ "name": "question", "type": 3, "value": "will it rain" }]
            },
            "member": { "user": { "id": "U9" } }
        }))
        .expect("valid")
        .expect("recognized");

        assert_eq!(interaction.kind(), InteractionKind::CommandInvocation);
        assert_eq!(interaction.user, Some(UserId::new("U9")));
        assert_eq!(
            interaction.payload,
            InteractionPayload::Command {
                correlation: correlation("A1"),
                name: "fortune".to_string(),
                question: Some("will it rain".to_string()),
            }
        );
    }

    #[test]
    fn question_text_is_kept_verbatim() {
        let interaction = classify(json!({
            "type": 2,
            "id": "A5",
            "token": "tok",
            "data": {
                "name": "fortune",
                "options": [{ "name": "question", "value": "  will it rain?  " }]
            }
        }))
        .expect("valid")
        .expect("recognized");

        match interaction.payload {
            InteractionPayload::Command { question, .. } => {
                assert_eq!(question.as_deref(), Some("  will it rain?  "));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn command_without_options_has_no_question() {
        let interaction = classify(json!({
            "type": 2,
            "id": "A2",
            "token": "tok",
            "data": { "name": "fortune" },
            "user": { "id": "dm-user" }
        }))
        .expect("valid")
        .expect("recognized");

        assert_eq!(interaction.user, Some(UserId::new("dm-user")));
        assert!(matches!(
            interaction.payload,
            InteractionPayload::Command { question: None, .. }
        ));
    }

    #[test]
    fn blank_question_is_dropped() {
        let interaction = classify(json!({
            "type": 2,
            "id": "A3",
            "token": "tok",
            "data": { "name": "fortune", "options": [{ "name": "question", "value": "   " }] }
        }))
        .expect("valid")
        .expect("recognized");

        assert!(matches!(
            interaction.payload,
            InteractionPayload::Command { question: None, .. }
        ));
        assert!(interaction.user.is_none());
    }

    #[test]
    fn component_reads_custom_id() {
        let interaction = classify(json!({
            "type": 3,
            "id": "B1",
            "token": "tok",
            "data": { "custom_id": "redo_button", "component_type": 2 }
        }))
        .expect("valid")
        .expect("recognized");

        assert_eq!(interaction.kind(), InteractionKind::ComponentActivation);
        assert_eq!(
            interaction.payload,
            InteractionPayload::Component {
                correlation: correlation("B1"),
                custom_id: REDO_BUTTON_ID.to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_not_recognized() {
        let outcome = classify(json!({ "type": 4, "id": "C1", "token": "tok" })).expect("valid");
        assert!(outcome.is_none());
    }

    #[test]
    fn command_without_token_is_rejected() {
        let err = classify(json!({
            "type": 2,
            "id": "A4",
            "data": { "name": "fortune" }
        }))
        .expect_err("missing token");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn id_with_path_separators_is_rejected() {
        assert!(InteractionId::parse("../etc").is_err());
        assert!(InteractionId::parse("").is_err());
        assert!(InteractionId::parse("1234567890").is_ok());
    }

    #[test]
    fn artifact_name_is_derived_from_id() {
        let id = InteractionId::parse("A1").expect("id");
        assert_eq!(id.artifact_file_name(), "A1-fortune.png");
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = InteractionToken::parse("secret-token").expect("token");
        assert!(!format!("{token:?}").contains("secret-token"));
    }
}
