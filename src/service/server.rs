use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::errors::{ErrorCode, SessionError};
use crate::service::session::{SessionRpc, SessionService};
use crate::service::wire::{
    ClearCookiesRequest, Empty, ErrorBody, GetCookiesRequest, GetCookiesResponse,
    SetCookiesRequest, CLEAR_COOKIES_PATH, GET_COOKIES_PATH, SET_COOKIES_PATH,
};

/// Builds the router for `service`.
pub fn router(service: SessionService) -> Router {
    Router::new()
        .route(GET_COOKIES_PATH, post(get_cookies))
        .route(SET_COOKIES_PATH, post(set_cookies))
        .route(CLEAR_COOKIES_PATH, post(clear_cookies))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(service)
}

/// Serves `service` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    service: SessionService,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// A [`SessionError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct RpcError(pub SessionError);

impl From<SessionError> for RpcError {
    fn from(err: SessionError) -> Self {
        RpcError(err)
    }
}

fn status_for(code: ErrorCode) -> http::StatusCode {
    match code {
        ErrorCode::InvalidArgument => http::StatusCode::BAD_REQUEST,
        ErrorCode::Database => http::StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::DataLoss | ErrorCode::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        // nginx's "client closed request"
        ErrorCode::Cancelled => {
            http::StatusCode::from_u16(499).unwrap_or(http::StatusCode::REQUEST_TIMEOUT)
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        match code {
            ErrorCode::InvalidArgument | ErrorCode::Cancelled => {
                log::debug!("rpc rejected: {}", self.0)
            }
            _ => log::error!("rpc failed: {}", self.0),
        }
        let body = ErrorBody {
            code,
            message: self.0.message(),
        };
        (status_for(code), Json(body)).into_response()
    }
}

async fn get_cookies(
    State(service): State<SessionService>,
    Json(req): Json<GetCookiesRequest>,
) -> Result<Json<GetCookiesResponse>, RpcError> {
    let ctx = CancellationToken::new();
    Ok(Json(service.get_cookies(&ctx, req).await?))
}

async fn set_cookies(
    State(service): State<SessionService>,
    Json(req): Json<SetCookiesRequest>,
) -> Result<Json<Empty>, RpcError> {
    let ctx = CancellationToken::new();
    Ok(Json(service.set_cookies(&ctx, req).await?))
}

async fn clear_cookies(
    State(service): State<SessionService>,
    Json(req): Json<ClearCookiesRequest>,
) -> Result<Json<Empty>, RpcError> {
    let ctx = CancellationToken::new();
    Ok(Json(service.clear_cookies(&ctx, req).await?))
}
