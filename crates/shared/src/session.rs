use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::api::{InstagramApi, InstagramError};

/// Device identity Instagram expects to stay stable between logins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIds {
    pub uuid: String,
    pub phone_id: String,
    pub android_device_id: String,
    pub advertising_id: String,
}

impl DeviceIds {
    pub fn generate() -> Self {
        let device_seed = Uuid::new_v4().simple().to_string();
        Self {
            uuid: Uuid::new_v4().to_string(),
            phone_id: Uuid::new_v4().to_string(),
            android_device_id: format!("android-{}", &device_seed[..16]),
            advertising_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Everything needed to resume a login without a password, saved to the cookies file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub uuids: DeviceIds,
    #[serde(default)]
    pub last_login: Option<i64>,
}

impl SessionSettings {
    pub fn generate() -> Self {
        Self {
            authorization: None,
            user_id: None,
            username: None,
            uuids: DeviceIds::generate(),
            last_login: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some() && self.user_id.is_some()
    }
}

pub fn load_session(path: &Path) -> Result<Option<SessionSettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file: {}", path.display()))?;

    let settings = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

    Ok(Some(settings))
}

pub fn save_session(path: &Path, settings: &SessionSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create session directory")?;
    }

    let json = serde_json::to_string_pretty(settings).context("Failed to serialize session")?;

    fs::write(path, json)
        .with_context(|| format!("Failed to write session file: {}", path.display()))?;

    Ok(())
}

/// Source of the one-time codes Instagram sends during login.
pub trait VerificationPrompt {
    fn verification_code(&mut self, reason: &str) -> Result<String>;
}

pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Log in, preferring the cached session over a password login.
pub async fn login<A, P>(
    api: &mut A,
    credentials: &Credentials<'_>,
    session_file: &Path,
    prompt: &mut P,
) -> Result<()>
where
    A: InstagramApi + ?Sized,
    P: VerificationPrompt + ?Sized,
{
    match load_session(session_file) {
        Ok(Some(settings)) if !settings.is_authenticated() => {
            warn!("Saved session has no logged-in user, proceeding with password login...");
            // Keep the device ids so Instagram sees the same phone
            api.import_session(settings);
        }
        Ok(Some(settings)) => {
            api.import_session(settings);
            info!("Testing saved session...");
            match api.timeline().await {
                Ok(()) => {
                    info!("Login successful using saved session");
                    return Ok(());
                }
                Err(e) => {
                    warn!("Saved session is invalid: {}", e);
                    warn!("Proceeding with password login...");
                }
            }
        }
        Ok(None) => {}
        Err(e) => error!("Error loading session: {:#}", e),
    }

    info!("Logging in as {}...", credentials.username);
    match api.login(credentials.username, credentials.password).await {
        Ok(()) => {}
        Err(InstagramError::TwoFactorRequired { identifier }) => {
            let code = prompt.verification_code("Two-factor authentication code")?;
            api.two_factor_login(credentials.username, &identifier, code.trim())
                .await
                .context("Two-factor verification failed")?;
        }
        Err(InstagramError::ChallengeRequired { api_path }) => {
            info!("Instagram requires verification. Please check your email or phone for a verification code.");
            let code = prompt.verification_code("Enter verification code")?;
            api.submit_challenge_code(&api_path, code.trim())
                .await
                .context("Verification failed")?;
        }
        Err(e) => return Err(e).context("Login failed"),
    }

    info!("Login successful");

    match save_session(session_file, &api.export_session()) {
        Ok(()) => info!("Session saved to {}", session_file.display()),
        Err(e) => error!("Error saving session: {:#}", e),
    }

    Ok(())
}

/// Run [`login`] only when the client has no authenticated user.
pub async fn ensure_logged_in<A, P>(
    api: &mut A,
    credentials: &Credentials<'_>,
    session_file: &Path,
    prompt: &mut P,
) -> Result<()>
where
    A: InstagramApi + ?Sized,
    P: VerificationPrompt + ?Sized,
{
    if api.user_id().is_some() {
        return Ok(());
    }

    info!("Client is not logged in, attempting login");
    login(api, credentials, session_file, prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeInstagram;
    use tempfile::TempDir;

    struct FixedPrompt {
        code: String,
        asked: usize,
    }

    impl VerificationPrompt for FixedPrompt {
        fn verification_code(&mut self, _reason: &str) -> Result<String> {
            self.asked += 1;
            Ok(self.code.clone())
        }
    }

    fn prompt() -> FixedPrompt {
        FixedPrompt {
            code: "123456\n".to_string(),
            asked: 0,
        }
    }

    const CREDENTIALS: Credentials<'static> = Credentials {
        username: "me",
        password: "secret",
    };

    #[test]
    fn test_session_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cookies.json");

        assert!(load_session(&path).unwrap().is_none());

        let mut settings = SessionSettings::generate();
        settings.authorization = Some("Bearer IGT:2:abc".to_string());
        settings.user_id = Some("42".to_string());
        save_session(&path, &settings).unwrap();

        let loaded = load_session(&path).unwrap().unwrap();
        assert_eq!(loaded, settings);
        assert!(loaded.is_authenticated());
    }

    #[test]
    fn test_generated_device_ids() {
        let ids = DeviceIds::generate();
        assert!(ids.android_device_id.starts_with("android-"));
        assert_eq!(ids.android_device_id.len(), "android-".len() + 16);
        assert_ne!(ids.uuid, ids.phone_id);
    }

    #[tokio::test]
    async fn test_valid_saved_session_skips_password_login() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        let mut settings = SessionSettings::generate();
        settings.authorization = Some("Bearer token".to_string());
        settings.user_id = Some("42".to_string());
        save_session(&path, &settings).unwrap();

        let mut api = FakeInstagram::new();
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert_eq!(api.calls_named("login"), 0);
        assert_eq!(api.user_id().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_invalid_session_falls_back_to_password() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        let mut settings = SessionSettings::generate();
        settings.authorization = Some("Bearer expired".to_string());
        settings.user_id = Some("42".to_string());
        save_session(&path, &settings).unwrap();

        let mut api = FakeInstagram::new();
        api.fail_timeline = true;
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert_eq!(api.calls_named("timeline"), 1);
        assert_eq!(api.calls_named("login"), 1);
        assert_eq!(prompt.asked, 0);

        let saved = load_session(&path).unwrap().unwrap();
        assert_eq!(saved.user_id.as_deref(), Some("1000"));
    }

    #[tokio::test]
    async fn test_session_without_user_is_not_trusted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        let mut settings = SessionSettings::generate();
        settings.authorization = Some("Bearer token".to_string());
        let device_uuid = settings.uuids.uuid.clone();
        save_session(&path, &settings).unwrap();

        let mut api = FakeInstagram::new();
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert_eq!(api.calls_named("timeline"), 0);
        assert_eq!(api.calls_named("login"), 1);
        assert!(api.user_id().is_some());
        assert_eq!(api.export_session().uuids.uuid, device_uuid);
    }

    #[tokio::test]
    async fn test_corrupt_session_file_falls_back_to_password() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "not json").unwrap();

        let mut api = FakeInstagram::new();
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert_eq!(api.calls_named("login"), 1);
        assert!(load_session(&path).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_two_factor_asks_for_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut api = FakeInstagram::new();
        api.login_error = Some(InstagramError::TwoFactorRequired {
            identifier: "tf-1".to_string(),
        });
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert_eq!(prompt.asked, 1);
        assert!(api.calls().contains(&"two_factor_login:tf-1:123456".to_string()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_challenge_submits_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut api = FakeInstagram::new();
        api.login_error = Some(InstagramError::ChallengeRequired {
            api_path: "/challenge/9/abc/".to_string(),
        });
        let mut prompt = prompt();
        login(&mut api, &CREDENTIALS, &path, &mut prompt).await.unwrap();

        assert!(api
            .calls()
            .contains(&"submit_challenge_code:/challenge/9/abc/:123456".to_string()));
    }

    #[tokio::test]
    async fn test_bad_password_fails_without_saving() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut api = FakeInstagram::new();
        api.login_error = Some(InstagramError::BadCredentials("nope".to_string()));
        let mut prompt = prompt();
        let err = login(&mut api, &CREDENTIALS, &path, &mut prompt)
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Login failed"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_ensure_logged_in_is_noop_when_authenticated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cookies.json");

        let mut api = FakeInstagram::logged_in();
        let mut prompt = prompt();
        ensure_logged_in(&mut api, &CREDENTIALS, &path, &mut prompt)
            .await
            .unwrap();

        assert!(api.calls().is_empty());
    }
}
