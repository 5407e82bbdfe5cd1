//! Builds the fortune message that replaces the deferred placeholder.

use time::OffsetDateTime;

use crate::domain::{
    interaction::{REDO_BUTTON_ID, UserId},
    payload::{
        ActionRow, Attachment, Button, Embed, EmbedImage, FORTUNE_COLOR, REDO_BUTTON_EMOJI,
        REDO_BUTTON_LABEL, ResponsePayload,
    },
};

/// Stand-in mention when the invoking user is unknown.
pub const UNKNOWN_USER: &str = "someone";

pub fn mention(user: Option<&UserId>) -> String {
    user.map(UserId::mention)
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

/// Header shown above the card.
///
/// With a question: `<t:UNIX:R> <@USER> asked "QUESTION"`, rendered by
/// Discord as a relative timestamp. Without one: `<@USER>'s fortune awaits...`.
pub fn fortune_header(
    user: Option<&UserId>,
    question: Option<&str>,
    now: OffsetDateTime,
) -> String {
    let mention = mention(user);
    match question {
        Some(question) => format!(
            "<t:{}:R> {mention} asked \"{question}\"",
            now.unix_timestamp()
        ),
        None => format!("{mention}'s fortune awaits..."),
    }
}

pub fn build_fortune_embed(
    user: Option<&UserId>,
    file_name: &str,
    header: String,
) -> ResponsePayload {
    ResponsePayload {
        embeds: vec![Embed {
            description: header,
            image: EmbedImage {
                url: format!("attachment://{file_name}"),
            },
            color: FORTUNE_COLOR,
        }],
        components: vec![ActionRow::new(vec![Button::secondary(
            REDO_BUTTON_LABEL,
            REDO_BUTTON_EMOJI,
            REDO_BUTTON_ID,
        )])],
        attachments: vec![Attachment {
            id: 0,
            description: format!("Fortune for {}", mention(user)),
            filename: file_name.to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn header_with_question_embeds_timestamp_and_quote() {
        let user = UserId::new("U9");
        let header = fortune_header(
            Some(&user),
            Some("will it rain"),
            datetime!(2024-01-02 03:04:05 UTC),
        );
        assert_eq!(header, "<t:1704164645:R> <@U9> asked \"will it rain\"");
    }

    #[test]
    fn header_without_question_is_generic() {
        let user = UserId::new("U9");
        let header = fortune_header(Some(&user), None, OffsetDateTime::now_utc());
        assert_eq!(header, "<@U9>'s fortune awaits...");
    }

    #[test]
    fn unknown_user_falls_back_to_placeholder() {
        let header = fortune_header(None, None, OffsetDateTime::now_utc());
        assert_eq!(header, "someone's fortune awaits...");
    }

    #[test]
    fn payload_carries_one_image_and_one_redo_button() {
        let user = UserId::new("U9");
        let payload = build_fortune_embed(Some(&user), "A1-fortune.png", "hello".to_string());

        assert_eq!(payload.embeds.len(), 1);
        assert_eq!(payload.embeds[0].description, "hello");
        assert_eq!(payload.embeds[0].image.url, "attachment://A1-fortune.png");
        assert_eq!(payload.embeds[0].color, FORTUNE_COLOR);

        assert_eq!(payload.components.len(), 1);
        assert_eq!(payload.components[0].components.len(), 1);
        assert_eq!(payload.components[0].components[0].custom_id, REDO_BUTTON_ID);

        assert_eq!(payload.attachments.len(), 1);
        assert_eq!(payload.attachments[0].id, 0);
        assert_eq!(payload.attachments[0].filename, "A1-fortune.png");
        assert_eq!(payload.attachments[0].description, "Fortune for <@U9>");
    }
}
