use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(rename = "LoginStatus")]
    pub login_status: bool,
    pub message: &'static str,
}

/// POST /login
///
/// Checks the credentials against the admin's Argon2id hash. No session is
/// issued; the front end only needs the status.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());
    let (Some(email), Some(password)) = (present(request.email), present(request.password))
    else {
        return Err(AppError::MissingCredentials);
    };

    let Some(admin) = state.store.find_admin(&email).await? else {
        warn!(email = %email, "Login rejected: unknown admin");
        return Err(AppError::InvalidCredentials);
    };

    let admin_id = admin.id;

    // Argon2 verification is CPU-bound.
    let hasher = state.hasher.clone();
    let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &admin.password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check did not complete: {e}")))??;

    if !verified {
        warn!(email = %email, admin_id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    info!(email = %email, admin_id, "Admin logged in");
    Ok(Json(LoginResponse {
        login_status: true,
        message: "Login successful.",
    }))
}
