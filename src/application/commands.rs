//! Application command catalog pushed to Discord by the `register` subcommand.

use serde::Serialize;

use crate::domain::interaction::{FORTUNE_COMMAND, QUESTION_OPTION};

const CHAT_INPUT: u8 = 1;
const OPTION_STRING: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDefinition {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOption {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
}

pub fn fortune_command() -> CommandDefinition {
    CommandDefinition {
        kind: CHAT_INPUT,
        name: FORTUNE_COMMAND.to_string(),
        description: "Ask a question to have your fortune read".to_string(),
        options: vec![CommandOption {
            kind: OPTION_STRING,
            name: QUESTION_OPTION.to_string(),
            description: "The question you want answered".to_string(),
            required: false,
            min_length: Some(1),
        }],
    }
}

pub fn all_commands() -> Vec<CommandDefinition> {
    vec![fortune_command()]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fortune_command_matches_registered_shape() {
        let value = serde_json::to_value(fortune_command()).expect("json");
        assert_eq!(
            value,
            json!({
                "type": 1,
                "name": "fortune",
                "description": "Ask a question to have your fortune read",
                "options": [{
                    "type": 3,
                    "name": "question",
                    "description": "The question you want answered",
                    "required": false,
                    "min_length": 1
                }]
            })
        );
    }
}
