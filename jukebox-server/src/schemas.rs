//! Request bodies accepted by the endpoints, validated before any handler
//! logic runs

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use jukebox_library::PrimaryKey;
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    /// Matching the configured admin key grants the admin role
    pub admin_key: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForgotPasswordSchema {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordSchema {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(length(min = 6, max = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 64))]
    pub new_password: String,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileSchema {
    #[validate(length(min = 2, max = 128))]
    pub username: Option<String>,
    #[validate(length(min = 8, max = 64))]
    pub password: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSongSchema {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub artist: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPlaylistSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddSongSchema {
    pub song_id: PrimaryKey,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| ServerError::BadRequest("JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| ServerError::BadRequest("Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
