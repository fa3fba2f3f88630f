mod api;
mod config;
mod diff;
mod error;
mod github;
mod llm;
mod orchestrator;
mod prompts;
mod response;
mod types;

use actix_web::{web, App, HttpServer};
use secrecy::ExposeSecret;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::github::GithubClient;
use crate::llm::gemini::GeminiClient;
use crate::llm::groq::GroqClient;
use crate::orchestrator::ReviewEngine;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().map_err(startup_error)?;

    let groq_key = config
        .providers
        .groq_api_key
        .clone()
        .ok_or_else(|| startup_error(ConfigError::MissingRequired("GROQ_API_KEY".into())))?;
    let gemini_key = config
        .providers
        .gemini_api_key
        .clone()
        .ok_or_else(|| startup_error(ConfigError::MissingRequired("GEMINI_API_KEY".into())))?;
    let github_token = config
        .github
        .token
        .clone()
        .ok_or_else(|| startup_error(ConfigError::MissingRequired("GITHUB_TOKEN".into())))?;

    if config.github.webhook_secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET not set, webhook signatures will not be verified");
    }

    let engine = ReviewEngine::new(
        Box::new(GroqClient::new(groq_key.expose_secret())),
        Box::new(GeminiClient::new(gemini_key.expose_secret())),
        config.review.clone(),
    );
    let github = GithubClient::new(github_token.expose_secret());
    let state = web::Data::new(AppState {
        engine,
        github,
        webhook_secret: config.github.webhook_secret.clone(),
    });

    info!(
        "starting server at http://{}:{}",
        config.server.host, config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}
