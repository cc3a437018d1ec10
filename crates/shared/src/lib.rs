// Public modules
pub mod api;
pub mod caption;
pub mod config;
pub mod history;
pub mod instagram;
pub mod models;
pub mod reposter;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api::{InstagramApi, InstagramError};
pub use caption::build_caption;
pub use config::Config;
pub use history::History;
pub use instagram::InstagramClient;
pub use models::{Collection, Download, MediaKind, SavedPost, VideoTarget};
pub use reposter::{CycleReport, Pacing, PostOutcome, RepostOptions, Reposter};
pub use session::{ensure_logged_in, login, Credentials, SessionSettings, VerificationPrompt};
