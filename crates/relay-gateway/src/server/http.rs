//! HTTP endpoints served next to the gateway

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use relay_broker::RelayState;
use relay_common::{AppError, ErrorResponse};
use relay_core::{DomainError, Principal, UserSummary};
use serde::Serialize;

use crate::server::GatewayState;

/// HTTP error response
///
/// Wraps [`AppError`] so it can be rendered as `{ "error": { code, message } }`.
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(AppError::Domain(err))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = ?self.0, "Server error occurred");
        }

        let body = ErrorBody {
            error: ErrorResponse::from(&self.0),
        };
        (status, Json(body)).into_response()
    }
}

/// Principal resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    GatewayState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::MissingAuth)?;

        let state = GatewayState::from_ref(state);
        let principal = state
            .authenticator()
            .resolve_principal(bearer.token())
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Invalid bearer token"))?;

        Ok(Self(principal))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub relay_state: RelayState,
    pub sessions: usize,
}

/// Liveness plus relay state
///
/// GET /health
pub async fn health_check(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let relay_state = state.relay().state();
    let (status_code, status) = if relay_state.is_connected() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status,
        relay_state,
        sessions: state.registry().session_count(),
    };
    (status_code, Json(body))
}

/// Directory entry with live presence
#[derive(Debug, Serialize)]
pub struct UserListing {
    #[serde(flatten)]
    pub user: UserSummary,
    pub online: bool,
}

/// GET /users (also served at /all/user)
pub async fn list_users(
    State(state): State<GatewayState>,
    _user: AuthUser,
) -> Result<Json<Vec<UserListing>>, ApiError> {
    let online = state.registry().online_users();
    let users = state
        .directory()
        .list_users()
        .await?
        .into_iter()
        .map(|user| UserListing {
            online: online.binary_search(&user.username).is_ok(),
            user,
        })
        .collect();
    Ok(Json(users))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    /// Connection IDs of the caller's live sessions, oldest first
    pub sessions: Vec<String>,
}

/// GET /me
pub async fn me(State(state): State<GatewayState>, AuthUser(principal): AuthUser) -> Json<MeResponse> {
    let sessions = state
        .registry()
        .sessions_of(principal.name())
        .iter()
        .map(|s| s.connection_id.to_string())
        .collect();

    Json(MeResponse {
        username: principal.into_inner(),
        sessions,
    })
}
