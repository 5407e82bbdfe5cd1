//! REST client for the Discord endpoints the bot talks to.

use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use tracing::{debug, info};
use url::Url;

use crate::{
    application::{
        commands::CommandDefinition,
        followup::{ArtifactUpload, DeliveryError, FollowUpTransport},
    },
    config::DiscordSettings,
    domain::{interaction::InteractionToken, payload::ResponsePayload},
};

use super::error::InfraError;

#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    base: Url,
    application_id: String,
    bot_token: String,
}

impl std::fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base", &self.base.as_str())
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

impl DiscordClient {
    pub fn new(settings: &DiscordSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| InfraError::http(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base: settings.api_base.clone(),
            application_id: settings.application_id.clone(),
            bot_token: settings.bot_token.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("fortune-teller/", env!("CARGO_PKG_VERSION"))
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Append `segments` to the API base, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Option<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments);
        Some(url)
    }

    /// Replace the whole global command set with `commands`.
    pub async fn register_global(&self, commands: &[CommandDefinition]) -> Result<(), InfraError> {
        let url = self
            .endpoint(&["applications", &self.application_id, "commands"])
            .ok_or_else(|| InfraError::http("API base cannot carry a path"))?;

        let response = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization())
            .json(commands)
            .send()
            .await
            .map_err(|err| InfraError::http(format!("command registration failed: {err}")))?;
        ensure_success(response).await?;

        info!(
            target = "fortune_teller::discord",
            scope = "global",
            commands = commands.len(),
            "Registered application commands"
        );
        Ok(())
    }

    /// Create or update each command in a single guild.
    pub async fn register_guild(
        &self,
        guild_id: &str,
        commands: &[CommandDefinition],
    ) -> Result<(), InfraError> {
        let url = self
            .endpoint(&[
                "applications",
                &self.application_id,
                "guilds",
                guild_id,
                "commands",
            ])
            .ok_or_else(|| InfraError::http("API base cannot carry a path"))?;

        for command in commands {
            let response = self
                .client
                .post(url.clone())
                .header(AUTHORIZATION, self.authorization())
                .json(command)
                .send()
                .await
                .map_err(|err| InfraError::http(format!("command registration failed: {err}")))?;
            ensure_success(response).await?;
            debug!(
                target = "fortune_teller::discord",
                guild_id,
                command = %command.name,
                "Registered guild command"
            );
        }

        info!(
            target = "fortune_teller::discord",
            scope = "guild",
            guild_id,
            commands = commands.len(),
            "Registered application commands"
        );
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<(), InfraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(InfraError::http(format!("status {status} body {body}")))
}

fn multipart_form(
    payload: &ResponsePayload,
    upload: ArtifactUpload,
) -> Result<Form, DeliveryError> {
    let payload_json = Part::text(serde_json::to_string(payload)?)
        .mime_str("application/json")
        .map_err(transport_error)?;

    let mime = mime_guess::from_path(&upload.file_name).first_or_octet_stream();
    let file = Part::bytes(upload.bytes.to_vec())
        .file_name(upload.file_name)
        .mime_str(mime.essence_str())
        .map_err(transport_error)?;

    Ok(Form::new()
        .part("payload_json", payload_json)
        .part("files[0]", file))
}

fn transport_error(err: reqwest::Error) -> DeliveryError {
    DeliveryError::Transport {
        source: Box::new(err),
    }
}

#[async_trait]
impl FollowUpTransport for DiscordClient {
    async fn edit_original(
        &self,
        token: &InteractionToken,
        payload: &ResponsePayload,
        upload: ArtifactUpload,
    ) -> Result<(), DeliveryError> {
        let url = self
            .endpoint(&[
                "webhooks",
                &self.application_id,
                token.expose(),
                "messages",
                "@original",
            ])
            .ok_or_else(|| DeliveryError::Endpoint(self.base.to_string()))?;
        let form = multipart_form(payload, upload)?;

        let response = self
            .client
            .patch(url)
            .header(AUTHORIZATION, self.authorization())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body: if status == StatusCode::NOT_FOUND {
                format!("interaction token expired or unknown: {body}")
            } else {
                body
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str) -> DiscordSettings {
        DiscordSettings {
            application_id: "1234".to_string(),
            bot_token: "bot-token".to_string(),
            public_key: None,
            api_base: Url::parse(base).expect("base url"),
        }
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = DiscordClient::new(&settings("https://discord.com/api/v10/")).expect("client");
        let url = client
            .endpoint(&["webhooks", "1234", "tok", "messages", "@original"])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://discord.com/api/v10/webhooks/1234/tok/messages/@original"
        );
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = DiscordClient::new(&settings("https://discord.com/api/v10/")).expect("client");
        let url = client.endpoint(&["webhooks", "a/b c"]).expect("url");
        assert_eq!(url.as_str(), "https://discord.com/api/v10/webhooks/a%2Fb%20c");
    }

    #[test]
    fn debug_output_hides_token() {
        let client = DiscordClient::new(&settings("https://discord.com/api/v10/")).expect("client");
        assert!(!format!("{client:?}").contains("bot-token"));
    }
}
