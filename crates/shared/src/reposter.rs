use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::{InstagramApi, InstagramError};
use crate::caption::build_caption;
use crate::config::Config;
use crate::history::History;
use crate::models::{Download, MediaKind, MediaResource, SavedPost, VideoTarget};

const COLLECTION_NAMES: [&str; 2] = ["All Posts", "Saved"];
const DEFAULT_IGTV_TITLE: &str = "Reposted IGTV";

/// Retry counts and waits used inside a poll cycle.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub connectivity_attempts: u32,
    pub connectivity_delay: Duration,
    pub fetch_attempts: u32,
    pub fetch_delay: Duration,
    pub download_attempts: u32,
    pub download_delay: Duration,
    pub between_posts: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            connectivity_attempts: 3,
            connectivity_delay: Duration::from_secs(10),
            fetch_attempts: 3,
            fetch_delay: Duration::from_secs(5),
            download_attempts: 3,
            download_delay: Duration::from_secs(5),
            between_posts: Duration::from_secs(5),
        }
    }
}

impl Pacing {
    /// Same retry counts, no waiting.
    pub fn immediate() -> Self {
        Self {
            connectivity_delay: Duration::ZERO,
            fetch_delay: Duration::ZERO,
            download_delay: Duration::ZERO,
            between_posts: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepostOptions {
    pub caption_template: String,
    pub media_folder: PathBuf,
    pub keep_media: bool,
}

impl From<&Config> for RepostOptions {
    fn from(config: &Config) -> Self {
        Self {
            caption_template: config.caption.clone(),
            media_folder: config.media_folder.clone(),
            keep_media: config.keep_media,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Reposted { new_media_id: String },
    AlreadyReposted,
    /// Nothing could be downloaded, so nothing was published.
    NothingUploaded,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub skipped: usize,
    pub reposted: usize,
    pub failed: usize,
}

pub struct Reposter<A> {
    api: A,
    history: History,
    options: RepostOptions,
    pacing: Pacing,
}

impl<A: InstagramApi> Reposter<A> {
    pub fn new(api: A, history: History, options: RepostOptions) -> Self {
        Self {
            api,
            history,
            options,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// One poll: check the session, fetch saved posts, repost anything new.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.check_connectivity().await?;

        info!("Checking for saved posts to repost...");
        let posts = self.fetch_with_retries().await?;

        let mut report = CycleReport {
            fetched: posts.len(),
            ..CycleReport::default()
        };

        if posts.is_empty() {
            info!("No saved posts found to repost");
            return Ok(report);
        }

        let total = posts.len();
        info!("Processing {} saved posts", total);

        for (i, post) in posts.iter().enumerate() {
            info!("Processing post {}/{}: {}", i + 1, total, post.id);

            if self.history.contains(&post.id) {
                info!("Skipping already reposted media: {}", post.id);
                report.skipped += 1;
                continue;
            }

            match self.process_post(post).await {
                Ok(PostOutcome::Reposted { .. }) => report.reposted += 1,
                Ok(PostOutcome::AlreadyReposted) => report.skipped += 1,
                Ok(PostOutcome::NothingUploaded) => report.failed += 1,
                Err(e) => {
                    error!("Error reposting media {}: {:#}", post.id, e);
                    report.failed += 1;
                }
            }

            // Spread uploads out to stay under rate limits
            if i + 1 < total {
                pause(self.pacing.between_posts).await;
            }
        }

        Ok(report)
    }

    /// Like, download, re-upload with attribution, unsave, and record one post.
    pub async fn process_post(&mut self, post: &SavedPost) -> Result<PostOutcome> {
        if self.history.contains(&post.id) {
            info!("Skipping already reposted media: {}", post.id);
            return Ok(PostOutcome::AlreadyReposted);
        }

        info!("Processing {} {} by @{}", post.kind.label(), post.id, post.owner);

        match self.api.like(&post.id).await {
            Ok(()) => info!("Liked post: {}", post.id),
            Err(e) => warn!("Failed to like post {}: {}", post.id, e),
        }

        let caption = build_caption(&self.options.caption_template, &post.owner);

        let folder = self
            .options
            .media_folder
            .join(format!("{}_{}", post.owner, post.id));
        fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create media folder: {}", folder.display()))?;

        let mut downloads = Vec::new();
        let uploaded = self
            .download_and_upload(post, &folder, &caption, &mut downloads)
            .await;

        if self.options.keep_media {
            info!("Keeping downloaded media at: {}", folder.display());
        } else {
            remove_downloads(&downloads, &folder);
        }

        let new_media_id = match uploaded? {
            Some(id) => id,
            None => {
                warn!(
                    "Repost of {} was not successful. Not adding to history",
                    post.id
                );
                return Ok(PostOutcome::NothingUploaded);
            }
        };

        match self.api.unsave(&post.id).await {
            Ok(()) => info!("Removed post {} from saved posts", post.id),
            Err(e) => warn!("Failed to remove post {} from saved posts: {}", post.id, e),
        }

        self.history
            .record(&post.id)
            .context("Failed to save history")?;

        info!("Successfully reposted {} as {}", post.id, new_media_id);
        Ok(PostOutcome::Reposted { new_media_id })
    }

    async fn download_and_upload(
        &self,
        post: &SavedPost,
        folder: &Path,
        caption: &str,
        downloads: &mut Vec<Download>,
    ) -> Result<Option<String>> {
        let target = match post.kind {
            MediaKind::Album => return self.repost_album(post, folder, caption, downloads).await,
            MediaKind::Photo => None,
            MediaKind::Video => Some(VideoTarget::Feed),
            MediaKind::Reel => Some(VideoTarget::Reel),
            MediaKind::Igtv => Some(VideoTarget::Igtv {
                title: post
                    .title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_IGTV_TITLE.to_string()),
            }),
        };

        let resource = post
            .primary_resource()
            .with_context(|| format!("Post {} has no media", post.id))?;

        let download = self.download_with_retries(resource, folder).await?;
        downloads.push(download.clone());

        info!("Reposting {}: {}", post.kind.label(), post.id);
        let new_media_id = match target {
            None => self.api.upload_photo(&download, caption).await,
            Some(target) => self.api.upload_video(&download, caption, &target).await,
        }
        .with_context(|| format!("Failed to upload {} {}", post.kind.label(), post.id))?;

        Ok(Some(new_media_id))
    }

    async fn repost_album(
        &self,
        post: &SavedPost,
        folder: &Path,
        caption: &str,
        downloads: &mut Vec<Download>,
    ) -> Result<Option<String>> {
        for (i, resource) in post.resources.iter().enumerate() {
            // Separate folders keep child filenames from colliding
            let item_folder = folder.join(format!("item_{}", i));
            match self.download_with_retries(resource, &item_folder).await {
                Ok(download) => downloads.push(download),
                Err(e) => error!("Skipping album item {} of {}: {:#}", i, post.id, e),
            }
        }

        if downloads.is_empty() {
            warn!("No valid media found in album {}", post.id);
            return Ok(None);
        }

        info!(
            "Reposting album: {} ({}/{} items)",
            post.id,
            downloads.len(),
            post.resources.len()
        );
        let new_media_id = self
            .api
            .upload_album(downloads, caption)
            .await
            .with_context(|| format!("Failed to upload album {}", post.id))?;

        Ok(Some(new_media_id))
    }

    async fn download_with_retries(
        &self,
        resource: &MediaResource,
        folder: &Path,
    ) -> Result<Download> {
        let attempts = self.pacing.download_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.api.download(resource, folder).await {
                Ok(download) => {
                    info!("Downloaded {}", download.path.display());
                    return Ok(download);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Download attempt {} for {} failed: {}. Retrying in {:?}...",
                        attempt, resource.pk, e, self.pacing.download_delay
                    );
                    pause(self.pacing.download_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to download {} after {} attempts",
                            resource.pk, attempts
                        )
                    })
                }
            }
        }
    }

    async fn check_connectivity(&mut self) -> Result<()> {
        info!("Testing Instagram API connectivity...");
        let attempts = self.pacing.connectivity_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.api.verify_connection().await {
                Ok(user) => {
                    info!("API connectivity test successful! Connected as: {}", user.username);
                    return Ok(());
                }
                Err(e) if e.needs_login() => {
                    // Force a fresh login before the next cycle
                    self.api.clear_session();
                    return Err(e).context("Instagram session is no longer valid");
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "API connectivity check failed ({}), retry {}/{}",
                        e, attempt, attempts
                    );
                    pause(self.pacing.connectivity_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e).context(
                        "Cannot proceed with reposting due to API connectivity issues after retries",
                    )
                }
            }
        }
    }

    /// Find the saved posts: "All Posts", then "Saved", then the first collection, then the saved feed.
    pub async fn fetch_saved_posts(&self) -> Result<Vec<SavedPost>, InstagramError> {
        match self.api.collections().await {
            Ok(collections) => {
                info!("Found {} collections", collections.len());
                let mut tried = HashSet::new();

                let named = COLLECTION_NAMES
                    .iter()
                    .filter_map(|name| collections.iter().find(|c| c.name == *name));

                for collection in named.chain(collections.first()) {
                    if !tried.insert(collection.id.clone()) {
                        continue;
                    }

                    info!(
                        "Attempting to get saved posts from '{}' collection",
                        collection.name
                    );
                    match self.api.collection_posts(collection).await {
                        Ok(posts) => {
                            info!(
                                "Fetched {} posts from '{}' collection",
                                posts.len(),
                                collection.name
                            );
                            return Ok(posts);
                        }
                        Err(e) => warn!(
                            "Failed to get posts from '{}' collection: {}",
                            collection.name, e
                        ),
                    }
                }

                if collections.is_empty() {
                    warn!("No collections found");
                }
            }
            Err(e) => error!("Failed to get collections: {}", e),
        }

        info!("Attempting to get all saved posts directly");
        let posts = self.api.saved_posts().await?;
        info!("Fetched {} posts from the saved feed", posts.len());
        Ok(posts)
    }

    async fn fetch_with_retries(&self) -> Result<Vec<SavedPost>> {
        let attempts = self.pacing.fetch_attempts.max(1);

        for attempt in 1..=attempts {
            match self.fetch_saved_posts().await {
                Ok(posts) if !posts.is_empty() || attempt == attempts => return Ok(posts),
                Ok(_) => {
                    warn!("No saved posts found, retry {}/{}", attempt, attempts);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Error getting saved posts: {}, retry {}/{}",
                        e, attempt, attempts
                    );
                }
                Err(e) => return Err(e).context("Failed to get saved posts"),
            }
            pause(self.pacing.fetch_delay).await;
        }

        Ok(Vec::new())
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

fn remove_downloads(downloads: &[Download], folder: &Path) {
    for file in downloads.iter().flat_map(|d| d.files()) {
        if file.exists() {
            if let Err(e) = fs::remove_file(file) {
                warn!("Could not remove file {}: {}", file.display(), e);
            }
        }
    }

    // Only empty directories go; anything else in the folder is left alone
    if let Ok(entries) = fs::read_dir(folder) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir(&path).ok();
            }
        }
    }
    fs::remove_dir(folder).ok();
}
