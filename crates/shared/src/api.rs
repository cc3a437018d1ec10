use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::models::{Collection, Download, MediaResource, SavedPost, UserInfo, VideoTarget};
use crate::session::SessionSettings;

#[derive(Debug, Error)]
pub enum InstagramError {
    #[error("rate limited by Instagram, try again later")]
    RateLimited,

    #[error("two-factor authentication required")]
    TwoFactorRequired { identifier: String },

    #[error("challenge_required: Instagram wants to verify this login")]
    ChallengeRequired { api_path: String },

    #[error("login_required: session is not authenticated")]
    LoginRequired,

    #[error("bad credentials: {0}")]
    BadCredentials(String),

    #[error("Instagram API returned error: {status} - {message}")]
    Api { status: StatusCode, message: String },

    #[error("media has nothing to download: {0}")]
    MissingMedia(String),

    #[error("unexpected media payload: {0}")]
    UnexpectedMedia(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("file operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse Instagram response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    two_factor_required: bool,
    #[serde(default)]
    two_factor_info: Option<TwoFactorInfo>,
    #[serde(default)]
    challenge: Option<ChallengeInfo>,
}

#[derive(Debug, Deserialize)]
struct TwoFactorInfo {
    two_factor_identifier: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeInfo {
    #[serde(default)]
    api_path: Option<String>,
}

impl InstagramError {
    /// Turn a non-success Instagram response into the matching error.
    pub fn from_failure(status: StatusCode, body: &str) -> Self {
        let failure: FailureBody = serde_json::from_str(body).unwrap_or_default();
        let message = failure.message.clone().unwrap_or_else(|| body.trim().to_string());

        if status == StatusCode::TOO_MANY_REQUESTS || message.contains("Please wait a few minutes")
        {
            return InstagramError::RateLimited;
        }

        if failure.two_factor_required {
            if let Some(info) = failure.two_factor_info {
                return InstagramError::TwoFactorRequired {
                    identifier: info.two_factor_identifier,
                };
            }
        }

        match message.as_str() {
            "challenge_required" | "checkpoint_required" => {
                let api_path = failure
                    .challenge
                    .and_then(|c| c.api_path)
                    .unwrap_or_else(|| "/challenge/".to_string());
                return InstagramError::ChallengeRequired { api_path };
            }
            "login_required" => return InstagramError::LoginRequired,
            _ => {}
        }

        if matches!(
            failure.error_type.as_deref(),
            Some("bad_password") | Some("invalid_user")
        ) {
            return InstagramError::BadCredentials(message);
        }

        InstagramError::Api { status, message }
    }

    /// Whether the session needs a fresh login before retrying.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            InstagramError::LoginRequired | InstagramError::ChallengeRequired { .. }
        )
    }
}

/// Every Instagram call the reposter makes.
#[async_trait]
pub trait InstagramApi: Send + Sync {
    /// The logged-in account's id, `None` until a login succeeds.
    fn user_id(&self) -> Option<String>;

    fn import_session(&mut self, settings: SessionSettings);

    fn export_session(&self) -> SessionSettings;

    async fn login(&mut self, username: &str, password: &str) -> Result<(), InstagramError>;

    async fn two_factor_login(
        &mut self,
        username: &str,
        identifier: &str,
        code: &str,
    ) -> Result<(), InstagramError>;

    async fn submit_challenge_code(&mut self, api_path: &str, code: &str)
        -> Result<(), InstagramError>;

    async fn account_info(&self) -> Result<UserInfo, InstagramError>;

    async fn timeline(&self) -> Result<(), InstagramError>;

    async fn collections(&self) -> Result<Vec<Collection>, InstagramError>;

    async fn collection_posts(&self, collection: &Collection)
        -> Result<Vec<SavedPost>, InstagramError>;

    async fn saved_posts(&self) -> Result<Vec<SavedPost>, InstagramError>;

    async fn like(&self, media_id: &str) -> Result<(), InstagramError>;

    async fn unsave(&self, media_id: &str) -> Result<(), InstagramError>;

    async fn download(
        &self,
        resource: &MediaResource,
        folder: &Path,
    ) -> Result<Download, InstagramError>;

    async fn upload_photo(&self, item: &Download, caption: &str) -> Result<String, InstagramError>;

    async fn upload_video(
        &self,
        item: &Download,
        caption: &str,
        target: &VideoTarget,
    ) -> Result<String, InstagramError>;

    async fn upload_album(&self, items: &[Download], caption: &str)
        -> Result<String, InstagramError>;

    /// Forget the login so the next `ensure_logged_in` starts over.
    fn clear_session(&mut self) {
        let mut settings = self.export_session();
        settings.authorization = None;
        settings.user_id = None;
        self.import_session(settings);
    }

    /// Cheap authenticated probe: own profile first, timeline feed as fallback.
    async fn verify_connection(&self) -> Result<UserInfo, InstagramError> {
        match self.account_info().await {
            Ok(info) => Ok(info),
            Err(primary) => {
                tracing::warn!("Profile lookup failed: {}", primary);
                self.timeline().await?;
                Ok(UserInfo {
                    pk: self.user_id().unwrap_or_default(),
                    username: String::new(),
                    full_name: String::new(),
                })
            }
        }
    }
}
