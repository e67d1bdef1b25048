//! Citizen Assistant Bot
//!
//! Telegram front end for the retrieval pipeline: every question goes
//! through the rate limiter, then retrieval, then the answering model.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use poliscope::config::Config;
use poliscope::integrations::OpenAIClient;
use poliscope::metrics;
use poliscope::ratelimit::RateLimiter;
use poliscope::retrieval::ContextPipeline;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::Message;
use tracing::{error, info, warn};

const GREETING: &str = "Bonjour ! Je suis un assistant civique. Posez-moi vos questions sur la \
     vie politique française : vos élus, les partis, les lois en discussion, les scrutins, les \
     déclarations de patrimoine.\n\nPar exemple :\n• Qui est mon député dans le 34 ?\n• Comment \
     a voté Jean Dupont sur l'immigration ?\n• Quel est le patrimoine de Marie Durand ?";

const FALLBACK_REPLY: &str = "Désolé, une erreur technique m'empêche de répondre pour le moment. \
     Réessayez dans quelques instants.";

const RATE_LIMITED_REPLY: &str = "Vous avez posé beaucoup de questions en peu de temps. Patientez \
     une minute avant de réessayer.";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<ContextPipeline>,
    limiter: Arc<RateLimiter>,
    ai: OpenAIClient,
    config: Arc<Config>,
}

async fn handle_start(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, GREETING).await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let text = match msg.text() {
        Some(t) if !t.starts_with('/') => t,
        _ => return Ok(()),
    };

    let user = msg.from().context("No user in message")?;
    let client = format!("tg:{}", user.id.0);

    let decision = state.limiter.limit(&client).await;
    if !decision.allowed {
        metrics::record_rate_limited();
        info!(%client, "Rate limited");
        bot.send_message(msg.chat.id, RATE_LIMITED_REPLY).await?;
        return Ok(());
    }

    let context = state.pipeline.context_for_query(text).await;

    let reply = match state
        .ai
        .answer_with_context(text, &context, &state.config)
        .await
    {
        Ok(answer) => answer,
        Err(e) => {
            error!(error = %e, "AI error");
            FALLBACK_REPLY.to_string()
        }
    };

    bot.send_message(msg.chat.id, &reply).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let token = std::env::var("CITIZEN_BOT_TOKEN")
        .context("CITIZEN_BOT_TOKEN not set in environment (.env)")?;

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = Config::new();
    let pipeline = ContextPipeline::from_config(&config).await?;
    let limiter = RateLimiter::from_config(&config);
    let ai = OpenAIClient::from_env()?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        limiter: Arc::new(limiter),
        ai,
        config: Arc::new(config),
    };

    info!("Starting Citizen Assistant Bot...");

    let bot = Bot::new(token);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text() == Some("/start"))
                .endpoint(handle_start),
        )
        .branch(
            Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
                let state = state.clone();
                async move { handle_message(bot, msg, state).await }
            }),
        );

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
