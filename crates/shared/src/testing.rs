//! In-memory `InstagramApi` used by unit tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::api::{InstagramApi, InstagramError};
use crate::models::{
    Collection, Download, MediaKind, MediaResource, ResourceKind, SavedPost, UserInfo, VideoTarget,
};
use crate::session::SessionSettings;

pub struct FakeInstagram {
    pub session: SessionSettings,
    pub posts: Vec<SavedPost>,
    pub collections: Vec<Collection>,
    pub login_error: Option<InstagramError>,
    pub fail_timeline: bool,
    /// Timeline answers with a server error instead of `login_required`.
    pub timeline_unavailable: bool,
    pub fail_account_info: bool,
    pub fail_collections: bool,
    pub fail_like: bool,
    pub fail_unsave: bool,
    pub fail_upload: bool,
    /// Remaining failures before `saved_posts` starts succeeding.
    pub saved_posts_failures: Mutex<usize>,
    /// Remaining download failures per resource pk.
    pub download_failures: Mutex<HashMap<String, usize>>,
    pub captions: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeInstagram {
    pub fn new() -> Self {
        Self {
            session: SessionSettings::generate(),
            posts: Vec::new(),
            collections: Vec::new(),
            login_error: None,
            fail_timeline: false,
            timeline_unavailable: false,
            fail_account_info: false,
            fail_collections: false,
            fail_like: false,
            fail_unsave: false,
            fail_upload: false,
            saved_posts_failures: Mutex::new(0),
            download_failures: Mutex::new(HashMap::new()),
            captions: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn logged_in() -> Self {
        let mut fake = Self::new();
        fake.authenticate();
        fake
    }

    pub fn with_posts(posts: Vec<SavedPost>) -> Self {
        let mut fake = Self::logged_in();
        fake.posts = posts;
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Count calls whose recorded name (before any `:`) matches.
    pub fn calls_named(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(name))
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn authenticate(&mut self) {
        self.session.authorization = Some("Bearer IGT:2:fake".to_string());
        self.session.user_id = Some("1000".to_string());
    }
}

pub fn resource(pk: &str, kind: ResourceKind) -> MediaResource {
    MediaResource {
        pk: pk.to_string(),
        kind,
        image_url: Some(format!("https://cdn.example/{}.jpg", pk)),
        video_url: match kind {
            ResourceKind::Video => Some(format!("https://cdn.example/{}.mp4", pk)),
            ResourceKind::Photo => None,
        },
        width: 1080,
        height: 1080,
        duration_secs: if kind == ResourceKind::Video { 10.0 } else { 0.0 },
    }
}

pub fn post(id: &str, owner: &str, kind: MediaKind) -> SavedPost {
    let resources = match kind {
        MediaKind::Photo => vec![resource(id, ResourceKind::Photo)],
        MediaKind::Album => vec![
            resource(&format!("{}-a", id), ResourceKind::Photo),
            resource(&format!("{}-b", id), ResourceKind::Video),
        ],
        _ => vec![resource(id, ResourceKind::Video)],
    };

    SavedPost {
        id: id.to_string(),
        pk: id.to_string(),
        code: format!("C{}", id),
        kind,
        owner: owner.to_string(),
        caption: "original caption".to_string(),
        title: None,
        resources,
    }
}

pub fn collection(id: &str, name: &str) -> Collection {
    Collection {
        id: id.to_string(),
        name: name.to_string(),
        collection_type: "MEDIA".to_string(),
        media_count: 1,
    }
}

#[async_trait]
impl InstagramApi for FakeInstagram {
    fn user_id(&self) -> Option<String> {
        self.session.user_id.clone()
    }

    fn import_session(&mut self, settings: SessionSettings) {
        self.session = settings;
    }

    fn export_session(&self) -> SessionSettings {
        self.session.clone()
    }

    async fn login(&mut self, username: &str, _password: &str) -> Result<(), InstagramError> {
        self.record(format!("login:{}", username));
        if let Some(err) = self.login_error.take() {
            return Err(err);
        }
        self.authenticate();
        Ok(())
    }

    async fn two_factor_login(
        &mut self,
        _username: &str,
        identifier: &str,
        code: &str,
    ) -> Result<(), InstagramError> {
        self.record(format!("two_factor_login:{}:{}", identifier, code));
        self.authenticate();
        Ok(())
    }

    async fn submit_challenge_code(
        &mut self,
        api_path: &str,
        code: &str,
    ) -> Result<(), InstagramError> {
        self.record(format!("submit_challenge_code:{}:{}", api_path, code));
        self.authenticate();
        Ok(())
    }

    async fn account_info(&self) -> Result<UserInfo, InstagramError> {
        self.record("account_info");
        if self.fail_account_info {
            return Err(InstagramError::LoginRequired);
        }
        Ok(UserInfo {
            pk: self.user_id().unwrap_or_default(),
            username: "me".to_string(),
            full_name: String::new(),
        })
    }

    async fn timeline(&self) -> Result<(), InstagramError> {
        self.record("timeline");
        if self.timeline_unavailable {
            return Err(InstagramError::Api {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "try again".to_string(),
            });
        }
        if self.fail_timeline || !self.session.is_authenticated() {
            return Err(InstagramError::LoginRequired);
        }
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<Collection>, InstagramError> {
        self.record("collections");
        if self.fail_collections {
            return Err(InstagramError::RateLimited);
        }
        Ok(self.collections.clone())
    }

    async fn collection_posts(
        &self,
        collection: &Collection,
    ) -> Result<Vec<SavedPost>, InstagramError> {
        self.record(format!("collection_posts:{}", collection.name));
        Ok(self.posts.clone())
    }

    async fn saved_posts(&self) -> Result<Vec<SavedPost>, InstagramError> {
        self.record("saved_posts");
        let mut remaining = self.saved_posts_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(InstagramError::RateLimited);
        }
        Ok(self.posts.clone())
    }

    async fn like(&self, media_id: &str) -> Result<(), InstagramError> {
        self.record(format!("like:{}", media_id));
        if self.fail_like {
            return Err(InstagramError::RateLimited);
        }
        Ok(())
    }

    async fn unsave(&self, media_id: &str) -> Result<(), InstagramError> {
        self.record(format!("unsave:{}", media_id));
        if self.fail_unsave {
            return Err(InstagramError::RateLimited);
        }
        Ok(())
    }

    async fn download(
        &self,
        resource: &MediaResource,
        folder: &Path,
    ) -> Result<Download, InstagramError> {
        self.record(format!("download:{}", resource.pk));
        {
            let mut failures = self.download_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&resource.pk) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(InstagramError::MissingMedia(resource.pk.clone()));
                }
            }
        }

        fs::create_dir_all(folder)?;
        let (path, thumbnail) = match resource.kind {
            ResourceKind::Photo => (folder.join(format!("{}.jpg", resource.pk)), None),
            ResourceKind::Video => {
                let path = folder.join(format!("{}.mp4", resource.pk));
                let thumbnail = folder.join(format!("{}.mp4.jpg", resource.pk));
                fs::write(&thumbnail, b"thumb")?;
                (path, Some(thumbnail))
            }
        };
        fs::write(&path, b"media")?;

        Ok(Download {
            resource: resource.clone(),
            path,
            thumbnail,
        })
    }

    async fn upload_photo(&self, item: &Download, caption: &str) -> Result<String, InstagramError> {
        self.record(format!("upload_photo:{}", item.resource.pk));
        self.captions.lock().unwrap().push(caption.to_string());
        if self.fail_upload {
            return Err(InstagramError::RateLimited);
        }
        Ok(format!("new-{}", item.resource.pk))
    }

    async fn upload_video(
        &self,
        item: &Download,
        caption: &str,
        target: &VideoTarget,
    ) -> Result<String, InstagramError> {
        let target = match target {
            VideoTarget::Feed => "feed".to_string(),
            VideoTarget::Reel => "reel".to_string(),
            VideoTarget::Igtv { title } => format!("igtv({})", title),
        };
        self.record(format!("upload_video:{}:{}", item.resource.pk, target));
        self.captions.lock().unwrap().push(caption.to_string());
        if self.fail_upload {
            return Err(InstagramError::RateLimited);
        }
        Ok(format!("new-{}", item.resource.pk))
    }

    async fn upload_album(
        &self,
        items: &[Download],
        caption: &str,
    ) -> Result<String, InstagramError> {
        self.record(format!("upload_album:{}", items.len()));
        self.captions.lock().unwrap().push(caption.to_string());
        if self.fail_upload {
            return Err(InstagramError::RateLimited);
        }
        Ok("new-album".to_string())
    }
}
