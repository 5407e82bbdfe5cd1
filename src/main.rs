use std::{process, sync::Arc};

use fortune_teller::{
    application::{
        commands::all_commands,
        error::AppError,
        random::ThreadRandom,
        reconciler::Reconciler,
    },
    config::{self, Settings},
    infra::{
        artifacts::ArtifactStore,
        assets,
        discord::DiscordClient,
        error::InfraError,
        http::{self, AppState, SignatureVerifier},
        render::MagickRenderer,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Register(args) => run_register(settings, args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let public_key = settings
        .discord
        .public_key
        .as_deref()
        .ok_or_else(|| InfraError::configuration("discord.public_key is required to serve"))?;
    let verifier = SignatureVerifier::from_hex(public_key)
        .map_err(|err| InfraError::configuration(err.to_string()))?;

    let catalogs = assets::load_catalogs(&settings.assets)?;
    let artifacts = ArtifactStore::new(settings.assets.artifact_dir.clone()).map_err(|err| {
        InfraError::configuration(format!(
            "failed to prepare artifact directory `{}`: {err}",
            settings.assets.artifact_dir.display()
        ))
    })?;
    let discord = DiscordClient::new(&settings.discord)?;

    let reconciler = Reconciler::new(
        Arc::new(catalogs),
        Arc::new(ThreadRandom),
        Arc::new(MagickRenderer::from(&settings.render)),
        Arc::new(artifacts),
        Arc::new(discord),
    );

    let state = AppState {
        verifier: Arc::new(verifier),
        reconciler: Arc::new(reconciler),
        body_limit: settings.server.max_body_bytes.get(),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "fortune_teller::serve",
        addr = %settings.server.addr,
        "Listening for interactions"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_register(settings: Settings, args: config::RegisterArgs) -> Result<(), AppError> {
    let discord = DiscordClient::new(&settings.discord)?;
    let commands = all_commands();

    match args.guild_id.as_deref().map(str::trim) {
        Some(guild_id) if !guild_id.is_empty() => {
            discord.register_guild(guild_id, &commands).await?
        }
        Some(_) => return Err(AppError::validation("--guild must not be empty")),
        None => discord.register_global(&commands).await?,
    }

    Ok(())
}
