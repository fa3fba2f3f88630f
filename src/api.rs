use actix_web::{web, HttpRequest, HttpResponse, Responder};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{error, info};

use crate::error::ApiError;
use crate::github::GithubClient;
use crate::orchestrator::ReviewEngine;
use crate::types::WebhookPayload;

type HmacSha256 = Hmac<Sha256>;

pub struct AppState {
    pub engine: ReviewEngine,
    pub github: GithubClient,
    pub webhook_secret: Option<SecretString>,
}

pub async fn health() -> impl Responder {
    web::Json(serde_json::json!({"status": "ok"}))
}

pub async fn webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = header_str(&req, "X-Hub-Signature-256");
        if !verify_signature(secret.expose_secret().as_bytes(), &body, signature) {
            return Err(ApiError::InvalidSignature);
        }
    }

    let event = header_str(&req, "X-GitHub-Event");
    if event != "pull_request" {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "ignored",
            "event": event,
        })));
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed payload: {}", e)))?;

    if payload.action != "opened" && payload.action != "synchronize" {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "status": "ignored",
            "action": payload.action,
        })));
    }

    let repo = payload.repository.full_name;
    let pr_number = payload.pull_request.number;
    info!(
        "received PR event: {} for {} #{}",
        payload.action, repo, pr_number
    );

    let state = state.clone();
    tokio::spawn(async move {
        process_pr(&state, &repo, pr_number).await;
    });

    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "status": "review started",
        "pr": pr_number,
    })))
}

/// The full review flow for one PR, run as a background task. Every failure
/// is terminal for this PR only: logged, never propagated.
async fn process_pr(state: &AppState, repo: &str, pr_number: u64) {
    info!("starting review for {} PR #{}", repo, pr_number);

    let raw_diff = match state.github.fetch_pr_diff(repo, pr_number).await {
        Ok(diff) => diff,
        Err(e) => {
            error!("failed to fetch diff for {}#{}: {}", repo, pr_number, e);
            return;
        }
    };
    if raw_diff.trim().is_empty() {
        info!("empty diff for {}#{}, skipping review", repo, pr_number);
        return;
    }
    info!("fetched diff: {} characters", raw_diff.len());

    let findings = state.engine.run(&raw_diff).await;
    info!("found {} total issues", findings.len());

    if let Err(e) = state
        .github
        .post_review_comments(repo, pr_number, &findings)
        .await
    {
        error!(
            "failed to post review comments for {}#{}: {}",
            repo, pr_number, e
        );
        return;
    }
    info!("review posted to {}#{}", repo, pr_number);
}

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Constant-time check of GitHub's `X-Hub-Signature-256` header against the
/// shared webhook secret.
pub fn verify_signature(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&sig_bytes).is_ok()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/webhook", web::post().to(webhook));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;
    use crate::llm::gemini::GeminiClient;
    use crate::llm::groq::GroqClient;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    fn test_state(webhook_secret: Option<&str>) -> web::Data<AppState> {
        let engine = ReviewEngine::new(
            Box::new(GroqClient::new("test-key")),
            Box::new(GeminiClient::new("test-key")),
            ReviewConfig::default(),
        );
        web::Data::new(AppState {
            engine,
            github: GithubClient::new("test-token"),
            webhook_secret: webhook_secret.map(SecretString::from),
        })
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(
            App::new().app_data(test_state(None)).configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_webhook_ignores_other_events() {
        let app = test::init_service(
            App::new().app_data(test_state(None)).configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/webhook")
            .insert_header(("X-GitHub-Event", "push"))
            .set_payload("{}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ignored");
        assert_eq!(body["event"], "push");
    }

    #[actix_web::test]
    async fn test_webhook_ignores_other_actions() {
        let app = test::init_service(
            App::new().app_data(test_state(None)).configure(configure),
        )
        .await;
        let payload = r#"{
            "action": "closed",
            "repository": {"full_name": "org/repo"},
            "pull_request": {"number": 1}
        }"#;
        let req = test::TestRequest::post()
            .uri("/webhook")
            .insert_header(("X-GitHub-Event", "pull_request"))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["action"], "closed");
    }

    #[actix_web::test]
    async fn test_webhook_rejects_missing_signature() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Some("secret")))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/webhook")
            .insert_header(("X-GitHub-Event", "pull_request"))
            .set_payload("{}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_webhook_rejects_malformed_payload() {
        let app = test::init_service(
            App::new().app_data(test_state(None)).configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/webhook")
            .insert_header(("X-GitHub-Event", "pull_request"))
            .set_payload("not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    fn sign(secret: &[u8], payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[::core::prelude::v1::test]
    fn test_verify_signature_accepts_valid() {
        let secret = b"webhook-secret";
        let payload = br#"{"action":"opened"}"#;
        let signature = sign(secret, payload);
        assert!(verify_signature(secret, payload, &signature));
    }

    #[::core::prelude::v1::test]
    fn test_verify_signature_rejects_tampered_payload() {
        let secret = b"webhook-secret";
        let signature = sign(secret, br#"{"action":"opened"}"#);
        assert!(!verify_signature(
            secret,
            br#"{"action":"closed"}"#,
            &signature
        ));
    }

    #[::core::prelude::v1::test]
    fn test_verify_signature_rejects_malformed_header() {
        let secret = b"webhook-secret";
        let payload = b"body";
        assert!(!verify_signature(secret, payload, ""));
        assert!(!verify_signature(secret, payload, "sha1=abcdef"));
        assert!(!verify_signature(secret, payload, "sha256=not-hex"));
    }
}
