//! Routes classified interactions to the pong reply or the fortune flow.

use metrics::counter;
use tracing::debug;

use crate::domain::interaction::{
    Correlation, FORTUNE_COMMAND, Interaction, InteractionId, InteractionPayload,
    InteractionToken, REDO_BUTTON_ID, UserId,
};

/// Which control produced a fortune request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FortuneOrigin {
    Command,
    Redo,
}

impl FortuneOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Redo => "redo",
        }
    }
}

/// Everything the follow-up needs once the placeholder is acknowledged.
#[derive(Debug, Clone)]
pub struct FortuneRequest {
    pub id: InteractionId,
    pub token: InteractionToken,
    pub user: Option<UserId>,
    pub question: Option<String>,
    pub origin: FortuneOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownCommand(String),
    UnknownComponent(String),
}

#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Answer synchronously with a pong; nothing else happens.
    Pong,
    /// Acknowledge with a deferred placeholder, then run the follow-up.
    Deferred(FortuneRequest),
    /// Well-formed but not ours; respond with an empty body.
    Ignored(IgnoreReason),
}

pub fn dispatch(interaction: Interaction) -> Dispatch {
    let kind = interaction.kind();
    counter!("fortune_interactions_total", "kind" => kind.as_str()).increment(1);

    let Interaction { user, payload } = interaction;

    let (correlation, question, origin) = match payload {
        InteractionPayload::Handshake => return Dispatch::Pong,
        InteractionPayload::Command {
            correlation,
            name,
            question,
        } => {
            if name != FORTUNE_COMMAND {
                debug!(
                    target = "fortune_teller::dispatch",
                    command = %name,
                    "Ignoring unknown command"
                );
                return Dispatch::Ignored(IgnoreReason::UnknownCommand(name));
            }
            (correlation, question, FortuneOrigin::Command)
        }
        // Redo starts a new reading; the original question is not carried over.
        InteractionPayload::Component {
            correlation,
            custom_id,
        } => {
            if custom_id != REDO_BUTTON_ID {
                debug!(
                    target = "fortune_teller::dispatch",
                    custom_id = %custom_id,
                    "Ignoring unknown component"
                );
                return Dispatch::Ignored(IgnoreReason::UnknownComponent(custom_id));
            }
            (correlation, None, FortuneOrigin::Redo)
        }
    };

    let Correlation { id, token } = correlation;
    Dispatch::Deferred(FortuneRequest {
        id,
        token,
        user,
        question,
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlation() -> Correlation {
        Correlation {
            id: InteractionId::parse("A1").expect("id"),
            token: InteractionToken::parse("tok").expect("token"),
        }
    }

    fn interaction(payload: InteractionPayload) -> Interaction {
        Interaction {
            user: Some(UserId::new("U9")),
            payload,
        }
    }

    #[test]
    fn handshake_is_answered_with_pong() {
        let outcome = dispatch(Interaction {
            user: None,
            payload: InteractionPayload::Handshake,
        });
        assert!(matches!(outcome, Dispatch::Pong));
    }

    #[test]
    fn fortune_command_is_deferred_with_question() {
        let outcome = dispatch(interaction(InteractionPayload::Command {
            correlation: correlation(),
            name: "fortune".to_string(),
            question: Some("will it rain".to_string()),
        }));

        match outcome {
            Dispatch::Deferred(request) => {
                assert_eq!(request.id.as_str(), "A1");
                assert_eq!(request.question.as_deref(), Some("will it rain"));
                assert_eq!(request.origin, FortuneOrigin::Command);
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn redo_button_is_deferred_without_question() {
        let outcome = dispatch(interaction(InteractionPayload::Component {
            correlation: correlation(),
            custom_id: "redo_button".to_string(),
        }));

        match outcome {
            Dispatch::Deferred(request) => {
                assert!(request.question.is_none());
                assert_eq!(request.origin, FortuneOrigin::Redo);
            }
            other => panic!("unexpected dispatch: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_ignored() {
        let outcome = dispatch(interaction(InteractionPayload::Command {
            correlation: correlation(),
            name: "horoscope".to_string(),
            question: None,
        }));
        assert!(matches!(
            outcome,
            Dispatch::Ignored(IgnoreReason::UnknownCommand(name)) if name == "horoscope"
        ));
    }

    #[test]
    fn unknown_component_is_ignored() {
        let outcome = dispatch(interaction(InteractionPayload::Component {
            correlation: correlation(),
            custom_id: "other_button".to_string(),
        }));
        assert!(matches!(
            outcome,
            Dispatch::Ignored(IgnoreReason::UnknownComponent(_))
        ));
    }
}
