//! Outbound message and callback payloads.

use serde::Serialize;

/// Embed accent color used for every fortune card.
pub const FORTUNE_COLOR: u32 = 8_226_557;
pub const REDO_BUTTON_LABEL: &str = "Reject Fate";
pub const REDO_BUTTON_EMOJI: &str = "\u{1F501}";

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_SECONDARY: u8 = 2;

const CALLBACK_PONG: u8 = 1;
const CALLBACK_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Synchronous reply to an inbound interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: CALLBACK_PONG,
        }
    }

    /// Opens an editable "thinking" placeholder in the channel.
    pub fn deferred() -> Self {
        Self {
            kind: CALLBACK_DEFERRED_CHANNEL_MESSAGE,
        }
    }
}

/// Body of the edit applied to the deferred placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsePayload {
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub description: String,
    pub image: EmbedImage,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        Self {
            kind: COMPONENT_ACTION_ROW,
            components,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub label: String,
    pub style: u8,
    pub emoji: Emoji,
    pub custom_id: String,
}

impl Button {
    pub fn secondary(label: &str, emoji: &str, custom_id: &str) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            label: label.to_string(),
            style: BUTTON_STYLE_SECONDARY,
            emoji: Emoji {
                id: None,
                name: emoji.to_string(),
            },
            custom_id: custom_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emoji {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: u32,
    pub description: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn callback_types_serialize_as_discord_codes() {
        assert_eq!(
            serde_json::to_value(InteractionResponse::pong()).expect("json"),
            json!({ "type": 1 })
        );
        assert_eq!(
            serde_json::to_value(InteractionResponse::deferred()).expect("json"),
            json!({ "type": 5 })
        );
    }

    #[test]
    fn button_serializes_null_emoji_id() {
        let button = Button::secondary(REDO_BUTTON_LABEL, REDO_BUTTON_EMOJI, "redo_button");
        let value = serde_json::to_value(ActionRow::new(vec![button])).expect("json");
        assert_eq!(value["type"], 1);
        assert_eq!(value["components"][0]["type"], 2);
        assert_eq!(value["components"][0]["style"], 2);
        assert!(value["components"][0]["emoji"]["id"].is_null());
    }
}
