//! 評審の HTTP エンドポイント
//!
//! - `POST /api/evaluate`: `{ "images": [...] }` → `{ "markdown": ... }`
//! - `GET /health`: バージョン
//!
//! 接続情報はサーバの環境変数からのみ取得する。

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use focuslens_common::error::HINT_MODEL_UNAVAILABLE;
use focuslens_common::{
    CredentialSources, Error as CommonError, EvaluationRequest, Evaluator, FailureKind, Settings,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::gemini::GeminiClient;

const MISSING_SERVER_KEY: &str = "服务器未配置 API Key";
const NO_IMAGES: &str = "请提供至少一张图片";
const SERVER_INVALID_CREDENTIAL: &str = "API Key 校验失败。请检查服务器环境变量配置。";
const SERVER_INVALID_REQUEST: &str = "请求参数错误。请检查 Base URL 配置是否正确。";
const METHOD_NOT_ALLOWED: &str = "Method not allowed";

#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<dyn Evaluator>,
    /// 起動時に読み込んだサーバ側設定
    pub settings: Settings,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateBody {
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateReply {
    pub markdown: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// JSON のエラーレスポンス
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// 外部呼び出しの失敗を HTTP ステータスに対応付ける
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::InvalidCredential => StatusCode::UNAUTHORIZED,
        FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
        FailureKind::ModelUnavailable => StatusCode::NOT_FOUND,
        FailureKind::EmptyResponse | FailureKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn external_error(e: CommonError) -> AppError {
    let kind = e.failure_kind().unwrap_or(FailureKind::Other);
    let message = match kind {
        FailureKind::InvalidCredential => SERVER_INVALID_CREDENTIAL.to_string(),
        FailureKind::InvalidRequest => SERVER_INVALID_REQUEST.to_string(),
        FailureKind::ModelUnavailable => HINT_MODEL_UNAVAILABLE.to_string(),
        FailureKind::EmptyResponse | FailureKind::Other => e.to_string(),
    };
    AppError::new(status_for(kind), message)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/evaluate",
            post(handle_evaluate).fallback(handle_method_not_allowed),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(bind: &str, timeout_seconds: u64) -> anyhow::Result<()> {
    let settings = Config::server_settings();
    if !settings.has_api_key() {
        tracing::warn!("server started without GEMINI_API_KEY; evaluations will fail");
    }

    let state = AppState {
        evaluator: Arc::new(GeminiClient::new(timeout_seconds)?),
        settings,
    };

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind = %listener.local_addr()?, "server listening");
    println!("FocusLens server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn handle_evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateBody>, JsonRejection>,
) -> Result<Json<EvaluateReply>, AppError> {
    let endpoint = CredentialSources::server_only(state.settings.clone())
        .resolve()
        .map_err(|_| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, MISSING_SERVER_KEY))?;

    let images = match payload {
        Ok(Json(body)) if !body.images.is_empty() => body.images,
        Ok(_) => return Err(AppError::new(StatusCode::BAD_REQUEST, NO_IMAGES)),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "invalid request body");
            return Err(AppError::new(StatusCode::BAD_REQUEST, NO_IMAGES));
        }
    };

    tracing::info!(images = images.len(), "evaluate request");
    let request = EvaluationRequest { images, endpoint };
    match state.evaluator.evaluate(&request).await {
        Ok(markdown) => Ok(Json(EvaluateReply { markdown })),
        Err(e) => {
            tracing::error!(error = %e, "evaluation failed");
            Err(external_error(e))
        }
    }
}

async fn handle_method_not_allowed() -> AppError {
    AppError::new(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED)
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
