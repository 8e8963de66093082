use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::register::UserData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::Principal;
use crate::inbound::http::router::AppState;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiSuccess<CurrentUserData>, ApiError> {
    let user = state.user_service.get_user(&principal.user_id).await?;
    let active_sessions = state
        .session_service
        .active_session_count(&principal.user_id)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        CurrentUserData {
            user: (&user).into(),
            active_sessions,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUserData {
    pub user: UserData,
    pub active_sessions: u64,
}
