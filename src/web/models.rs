//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/chirps`.
#[derive(Deserialize)]
pub struct ChirpRequest {
    pub body: String,
}

/// Query string of `GET /api/chirps`.
#[derive(Deserialize, Default)]
pub struct ChirpsQuery {
    pub author_id: Option<u32>,
}

/// Body of `POST /api/users`, `PUT /api/users` and `POST /api/login`.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Represents a login response with both tokens.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub id: u32,
    pub email: String,
    pub is_chirpy_red: bool,
    pub token: String,
    pub refresh_token: String,
}

/// Represents a refresh response with a new access token.
#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RevokeResponse {
    pub revoked_token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StatusResponse {
    pub status: String,
}

/// Event delivered by the payment provider.
#[derive(Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Deserialize)]
pub struct WebhookData {
    pub user_id: u32,
}
