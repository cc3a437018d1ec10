use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CAPTION: &str = "Reposted";
const DEFAULT_INTERVAL_MINUTES: u64 = 30;
// One year
const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;
const DEFAULT_HISTORY_FILE: &str = "repost_history.json";
const DEFAULT_MEDIA_FOLDER: &str = "instagram_media";
const DEFAULT_COOKIES_FILE: &str = "instagram_cookies.json";

const SETUP_HELP: &str = "To fix this, create a .env file (or ~/.config/insta-reposter/.env) with:\n  \
    INSTAGRAM_USERNAME=your_username\n  \
    INSTAGRAM_PASSWORD=your_password\n  \
    REPOST_CAPTION=\"Reposted\"\n  \
    CHECK_INTERVAL_MINUTES=30\n  \
    HISTORY_FILE=repost_history.json\n  \
    MEDIA_FOLDER=instagram_media\n  \
    COOKIES_FILE=instagram_cookies.json\n  \
    KEEP_MEDIA=false\n\n\
    Or provide these values as environment variables.";

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub caption: String,
    pub check_interval: Duration,
    pub history_file: PathBuf,
    pub media_folder: PathBuf,
    pub cookies_file: PathBuf,
    pub keep_media: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let username = get("INSTAGRAM_USERNAME")
            .with_context(|| format!("INSTAGRAM_USERNAME not found.\n\n{}", SETUP_HELP))?;
        let password = get("INSTAGRAM_PASSWORD")
            .with_context(|| format!("INSTAGRAM_PASSWORD not found.\n\n{}", SETUP_HELP))?;

        let caption = get("REPOST_CAPTION").unwrap_or_else(|| DEFAULT_CAPTION.to_string());

        let interval_minutes = match get("CHECK_INTERVAL_MINUTES") {
            Some(raw) => parse_interval(&raw)?,
            None => DEFAULT_INTERVAL_MINUTES,
        };

        let keep_media = get("KEEP_MEDIA").map(|v| parse_flag(&v)).unwrap_or(false);

        Ok(Self {
            username,
            password,
            caption,
            check_interval: Duration::from_secs(interval_minutes * 60),
            history_file: PathBuf::from(
                get("HISTORY_FILE").unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_string()),
            ),
            media_folder: PathBuf::from(
                get("MEDIA_FOLDER").unwrap_or_else(|| DEFAULT_MEDIA_FOLDER.to_string()),
            ),
            cookies_file: PathBuf::from(
                get("COOKIES_FILE").unwrap_or_else(|| DEFAULT_COOKIES_FILE.to_string()),
            ),
            keep_media,
        })
    }

    pub fn interval_minutes(&self) -> u64 {
        self.check_interval.as_secs() / 60
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/insta-reposter/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("insta-reposter").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() && dotenvy::from_path(&home_path).is_ok() {
                return;
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

fn parse_interval(raw: &str) -> Result<u64> {
    let minutes: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("CHECK_INTERVAL_MINUTES must be a whole number, got {:?}", raw))?;

    if minutes == 0 {
        anyhow::bail!("CHECK_INTERVAL_MINUTES must be at least 1");
    }
    if minutes > MAX_INTERVAL_MINUTES {
        anyhow::bail!(
            "CHECK_INTERVAL_MINUTES must be at most {} (one year), got {}",
            MAX_INTERVAL_MINUTES,
            minutes
        );
    }

    Ok(minutes)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
