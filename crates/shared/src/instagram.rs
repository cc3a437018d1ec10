use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::api::{InstagramApi, InstagramError};
use crate::models::{
    string_or_number, Collection, Download, MediaResource, RawMedia, ResourceKind, SavedPost,
    UserInfo, VideoTarget,
};
use crate::session::SessionSettings;

const DEFAULT_BASE_URL: &str = "https://i.instagram.com/";
const APP_ID: &str = "567067343352427";
const USER_AGENT: &str = "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const RETRY_CONTEXT: &str =
    r#"{"num_step_auto_retry":0,"num_reupload":0,"num_step_manual_retry":0}"#;
const IMAGE_COMPRESSION: &str = r#"{"lib_name":"moz","lib_version":"3.1.m","quality":"80"}"#;

const MAX_FEED_PAGES: usize = 20;
const PAGE_DELAY: Duration = Duration::from_millis(500);
const CONFIGURE_RETRIES: u32 = 4;
const TRANSCODE_WAIT: Duration = Duration::from_secs(4);

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    more_available: bool,
    #[serde(default)]
    next_max_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    media: RawMedia,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(deserialize_with = "string_or_number")]
    collection_id: String,
    collection_name: String,
    #[serde(default)]
    collection_type: String,
    #[serde(default)]
    collection_media_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    logged_in_user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(deserialize_with = "string_or_number")]
    pk: String,
    username: String,
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct ConfigureResponse {
    #[serde(default)]
    media: Option<Value>,
}

/// Client for Instagram's mobile private API.
pub struct InstagramClient {
    http: Client,
    base_url: Url,
    session: SessionSettings,
}

impl InstagramClient {
    pub fn new() -> Result<Self, InstagramError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, InstagramError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        // Url::join drops the last segment unless the base ends in a slash
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            http,
            base_url,
            session: SessionSettings::generate(),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, InstagramError> {
        let url = self.base_url.join(path)?;

        let mut builder = self
            .http
            .request(method, url)
            .header("X-IG-App-ID", APP_ID)
            .header("X-IG-Device-ID", self.session.uuids.uuid.as_str())
            .header("X-IG-Android-ID", self.session.uuids.android_device_id.as_str())
            .header("X-IG-Capabilities", "3brTvx0=")
            .header("X-IG-Connection-Type", "WIFI");

        if let Some(authorization) = &self.session.authorization {
            builder = builder.header("Authorization", authorization.as_str());
        }

        Ok(builder)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, InstagramError> {
        let response = self.request(Method::GET, path)?.send().await?;
        parse_json(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        pairs: &[(&str, &str)],
    ) -> Result<T, InstagramError> {
        let response = self
            .request(Method::POST, path)?
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body(pairs))
            .send()
            .await?;
        parse_json(response).await
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        data: &Value,
    ) -> Result<T, InstagramError> {
        let response = self.send_signed(path, data).await?;
        parse_json(response).await
    }

    async fn send_signed(&self, path: &str, data: &Value) -> Result<Response, InstagramError> {
        let signed = format!("SIGNATURE.{}", data);
        Ok(self
            .request(Method::POST, path)?
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body(&[("signed_body", signed.as_str())]))
            .send()
            .await?)
    }

    fn require_user_id(&self) -> Result<&str, InstagramError> {
        self.session
            .user_id
            .as_deref()
            .ok_or(InstagramError::LoginRequired)
    }

    fn uid(&self) -> String {
        self.session.user_id.clone().unwrap_or_default()
    }

    fn absorb_auth_headers(&mut self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        // Instagram sends "Bearer IGT:2:" with an empty token when it is not granting one
        if let Some(authorization) = header("ig-set-authorization").filter(|v| !v.ends_with(':')) {
            self.session.authorization = Some(authorization);
        }
        if let Some(user_id) = header("ig-set-ds-user-id") {
            self.session.user_id = Some(user_id);
        }
    }

    async fn finish_login(&mut self, response: Response, username: &str) -> Result<(), InstagramError> {
        let headers = response.headers().clone();
        let body: LoginResponse = parse_json(response).await?;
        self.absorb_auth_headers(&headers);

        let username = match body.logged_in_user {
            Some(user) => {
                self.session.user_id = Some(user.pk);
                user.username
            }
            None => username.to_string(),
        };

        if self.session.user_id.is_none() {
            return Err(InstagramError::LoginRequired);
        }

        info!("Logged in as {}", username);
        self.session.username = Some(username);
        self.session.last_login = Some(Utc::now().timestamp());
        Ok(())
    }

    async fn fetch_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, InstagramError> {
        let mut items = Vec::new();
        let mut max_id: Option<String> = None;

        for _ in 0..MAX_FEED_PAGES {
            let page_path = match &max_id {
                Some(cursor) => format!(
                    "{}{}max_id={}",
                    path,
                    if path.contains('?') { '&' } else { '?' },
                    urlencoding::encode(cursor)
                ),
                None => path.to_string(),
            };

            let page: Page<T> = self.get_json(&page_path).await?;
            items.extend(page.items);

            match (page.more_available, page.next_max_id.and_then(cursor_string)) {
                (true, Some(next)) => max_id = Some(next),
                _ => break,
            }

            tokio::time::sleep(PAGE_DELAY).await;
        }

        Ok(items)
    }

    async fn feed_posts(&self, path: &str) -> Result<Vec<SavedPost>, InstagramError> {
        let items: Vec<FeedItem> = self.fetch_pages(path).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| match SavedPost::try_from(item.media) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!("Skipping saved item: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<(), InstagramError> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstagramError::Api {
                status,
                message: format!("download of {} failed", url),
            });
        }

        let bytes = response.bytes().await?;
        if let Err(e) = tokio::fs::write(path, &bytes).await {
            discard(&[path]).await;
            return Err(e.into());
        }
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn rupload_photo(
        &self,
        path: &Path,
        upload_id: &str,
        media_type: &str,
    ) -> Result<(), InstagramError> {
        let data = tokio::fs::read(path).await?;
        let upload_name = upload_name(upload_id);
        let params = json!({
            "retry_context": RETRY_CONTEXT,
            "media_type": media_type,
            "xsharing_user_ids": "[]",
            "upload_id": upload_id,
            "image_compression": IMAGE_COMPRESSION,
        });

        let response = self
            .request(Method::POST, &format!("rupload_igphoto/{}", upload_name))?
            .header("X-Instagram-Rupload-Params", params.to_string())
            .header("X_FB_PHOTO_WATERFALL_ID", Uuid::new_v4().to_string())
            .header("X-Entity-Type", "image/jpeg")
            .header("Offset", "0")
            .header("X-Entity-Name", upload_name.as_str())
            .header("X-Entity-Length", data.len().to_string())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;

        let _: Value = parse_json(response).await?;
        Ok(())
    }

    /// Upload video bytes and their cover image under one upload id.
    async fn rupload_video(
        &self,
        item: &Download,
        upload_id: &str,
        target: Option<&VideoTarget>,
    ) -> Result<(), InstagramError> {
        let thumbnail = item.thumbnail.as_deref().ok_or_else(|| {
            InstagramError::MissingMedia(format!("video {} has no cover image", item.resource.pk))
        })?;

        let data = tokio::fs::read(&item.path).await?;
        let upload_name = upload_name(upload_id);
        let mut params = json!({
            "retry_context": RETRY_CONTEXT,
            "media_type": "2",
            "xsharing_user_ids": "[]",
            "upload_id": upload_id,
            "upload_media_duration_ms": duration_ms(&item.resource).to_string(),
            "upload_media_width": item.resource.width.to_string(),
            "upload_media_height": item.resource.height.to_string(),
        });
        match target {
            Some(VideoTarget::Reel) => params["is_clips_video"] = json!("1"),
            Some(VideoTarget::Igtv { .. }) => params["is_igtv_video"] = json!(true),
            Some(VideoTarget::Feed) | None => {}
        }

        let response = self
            .request(Method::POST, &format!("rupload_igvideo/{}", upload_name))?
            .header("X-Instagram-Rupload-Params", params.to_string())
            .header("X_FB_VIDEO_WATERFALL_ID", Uuid::new_v4().to_string())
            .header("X-Entity-Type", "video/mp4")
            .header("Offset", "0")
            .header("X-Entity-Name", upload_name.as_str())
            .header("X-Entity-Length", data.len().to_string())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let _: Value = parse_json(response).await?;

        self.rupload_photo(thumbnail, upload_id, "2").await
    }

    /// Publish an uploaded item, waiting out "Transcode not finished" replies.
    async fn configure(&self, path: &str, data: &Value) -> Result<String, InstagramError> {
        let mut attempt = 0;

        loop {
            match self.post_signed::<ConfigureResponse>(path, data).await {
                Ok(response) => {
                    return response
                        .media
                        .as_ref()
                        .and_then(media_id)
                        .ok_or_else(|| {
                            InstagramError::UnexpectedMedia(format!(
                                "{} returned no media",
                                path
                            ))
                        })
                }
                Err(InstagramError::Api { message, .. })
                    if message.contains("Transcode") && attempt < CONFIGURE_RETRIES =>
                {
                    attempt += 1;
                    debug!("Video still transcoding, waiting before configure retry {}", attempt);
                    tokio::time::sleep(TRANSCODE_WAIT).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn device(&self) -> Value {
        json!({
            "manufacturer": "OnePlus",
            "model": "6T Dev",
            "android_version": 26,
            "android_release": "8.0.0",
        })
    }

    fn photo_metadata(&self, resource: &MediaResource) -> Value {
        json!({
            "edits": {
                "crop_original_size": [resource.width, resource.height],
                "crop_center": [0.0, -0.0],
                "crop_zoom": 1.0,
            },
            "extra": {
                "source_width": resource.width,
                "source_height": resource.height,
            },
        })
    }

    fn video_metadata(&self, resource: &MediaResource) -> Value {
        let seconds = resource.duration_secs;
        json!({
            "length": seconds,
            "clips": [{"length": seconds, "source_type": "4"}],
            "poster_frame_index": 0,
            "audio_muted": false,
            "extra": {
                "source_width": resource.width,
                "source_height": resource.height,
            },
        })
    }
}

#[async_trait]
impl InstagramApi for InstagramClient {
    fn user_id(&self) -> Option<String> {
        self.session.user_id.clone()
    }

    fn import_session(&mut self, settings: SessionSettings) {
        self.session = settings;
    }

    fn export_session(&self) -> SessionSettings {
        self.session.clone()
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), InstagramError> {
        let uuids = &self.session.uuids;
        let data = json!({
            "jazoest": jazoest(&uuids.phone_id),
            "country_codes": r#"[{"country_code":"1","source":["default"]}]"#,
            "phone_id": uuids.phone_id,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", Utc::now().timestamp(), password),
            "username": username,
            "adid": uuids.advertising_id,
            "guid": uuids.uuid,
            "device_id": uuids.android_device_id,
            "google_tokens": "[]",
            "login_attempt_count": "0",
        });

        let response = self.send_signed("api/v1/accounts/login/", &data).await?;
        self.finish_login(response, username).await
    }

    async fn two_factor_login(
        &mut self,
        username: &str,
        identifier: &str,
        code: &str,
    ) -> Result<(), InstagramError> {
        let uuids = &self.session.uuids;
        let data = json!({
            "verification_code": code,
            "phone_id": uuids.phone_id,
            "two_factor_identifier": identifier,
            "username": username,
            "trust_this_device": "0",
            "guid": uuids.uuid,
            "device_id": uuids.android_device_id,
            "waterfall_id": Uuid::new_v4().to_string(),
            "verification_method": "3",
        });

        let response = self
            .send_signed("api/v1/accounts/two_factor_login/", &data)
            .await?;
        self.finish_login(response, username).await
    }

    async fn submit_challenge_code(
        &mut self,
        api_path: &str,
        code: &str,
    ) -> Result<(), InstagramError> {
        let path = format!("api/v1/{}", api_path.trim_start_matches('/'));
        let response = self
            .request(Method::POST, &path)?
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body(&[("security_code", code)]))
            .send()
            .await?;

        let username = self.session.username.clone().unwrap_or_default();
        self.finish_login(response, &username).await
    }

    async fn account_info(&self) -> Result<UserInfo, InstagramError> {
        let user_id = self.require_user_id()?;
        let response: UserResponse = self
            .get_json(&format!("api/v1/users/{}/info/", user_id))
            .await?;

        Ok(UserInfo {
            pk: response.user.pk,
            username: response.user.username,
            full_name: response.user.full_name,
        })
    }

    async fn timeline(&self) -> Result<(), InstagramError> {
        self.require_user_id()?;
        let uuids = &self.session.uuids;
        let _: Value = self
            .post_form(
                "api/v1/feed/timeline/",
                &[
                    ("is_prefetch", "0"),
                    ("feed_view_info", "[]"),
                    ("seen_posts", ""),
                    ("phone_id", uuids.phone_id.as_str()),
                    ("reason", "cold_start_fetch"),
                    ("battery_level", "100"),
                    ("timezone_offset", "0"),
                    ("device_id", uuids.uuid.as_str()),
                    ("is_pull_to_refresh", "0"),
                    ("is_charging", "0"),
                ],
            )
            .await?;
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<Collection>, InstagramError> {
        self.require_user_id()?;
        let types = urlencoding::encode(r#"["ALL_MEDIA_AUTO_COLLECTION","MEDIA"]"#);
        let raw: Vec<RawCollection> = self
            .fetch_pages(&format!("api/v1/collections/list/?collection_types={}", types))
            .await?;

        Ok(raw
            .into_iter()
            .map(|c| Collection {
                id: c.collection_id,
                name: c.collection_name,
                collection_type: c.collection_type,
                media_count: c.collection_media_count.unwrap_or(0),
            })
            .collect())
    }

    async fn collection_posts(
        &self,
        collection: &Collection,
    ) -> Result<Vec<SavedPost>, InstagramError> {
        if collection.is_all_posts() {
            return self.saved_posts().await;
        }

        self.require_user_id()?;
        self.feed_posts(&format!(
            "api/v1/feed/collection/{}/posts/",
            urlencoding::encode(&collection.id)
        ))
        .await
    }

    async fn saved_posts(&self) -> Result<Vec<SavedPost>, InstagramError> {
        self.require_user_id()?;
        self.feed_posts("api/v1/feed/saved/posts/").await
    }

    async fn like(&self, media_id: &str) -> Result<(), InstagramError> {
        self.require_user_id()?;
        let data = json!({
            "media_id": media_id,
            "module_name": "feed_timeline",
            "container_module": "feed_timeline",
            "radio_type": "wifi-none",
            "_uid": self.uid(),
            "_uuid": self.session.uuids.uuid,
        });
        let _: Value = self
            .post_signed(&format!("api/v1/media/{}/like/", media_id), &data)
            .await?;
        Ok(())
    }

    async fn unsave(&self, media_id: &str) -> Result<(), InstagramError> {
        self.require_user_id()?;
        let data = json!({
            "_uid": self.uid(),
            "_uuid": self.session.uuids.uuid,
        });
        let _: Value = self
            .post_signed(&format!("api/v1/media/{}/unsave/", media_id), &data)
            .await?;
        Ok(())
    }

    async fn download(
        &self,
        resource: &MediaResource,
        folder: &Path,
    ) -> Result<Download, InstagramError> {
        tokio::fs::create_dir_all(folder).await?;

        match resource.kind {
            ResourceKind::Photo => {
                let url = resource.image_url.as_deref().ok_or_else(|| {
                    InstagramError::MissingMedia(format!("photo {} has no image URL", resource.pk))
                })?;
                let path = folder.join(format!("{}.jpg", resource.pk));
                self.fetch_to_file(url, &path).await?;

                Ok(Download {
                    resource: resource.clone(),
                    path,
                    thumbnail: None,
                })
            }
            ResourceKind::Video => {
                let url = resource.video_url.as_deref().ok_or_else(|| {
                    InstagramError::MissingMedia(format!("video {} has no video URL", resource.pk))
                })?;
                let path = folder.join(format!("{}.mp4", resource.pk));
                self.fetch_to_file(url, &path).await?;

                let thumbnail = match resource.image_url.as_deref() {
                    Some(cover_url) => {
                        let thumbnail = thumbnail_path(&path);
                        if let Err(e) = self.fetch_to_file(cover_url, &thumbnail).await {
                            // No Download is returned, so nothing else will remove these
                            discard(&[path.as_path(), thumbnail.as_path()]).await;
                            return Err(e);
                        }
                        Some(thumbnail)
                    }
                    None => None,
                };

                Ok(Download {
                    resource: resource.clone(),
                    path,
                    thumbnail,
                })
            }
        }
    }

    async fn upload_photo(&self, item: &Download, caption: &str) -> Result<String, InstagramError> {
        self.require_user_id()?;
        let upload_id = new_upload_id();
        self.rupload_photo(&item.path, &upload_id, "1").await?;

        let mut data = json!({
            "media_folder": "Instagram",
            "source_type": "4",
            "caption": caption,
            "upload_id": upload_id,
            "device": self.device(),
            "_uid": self.uid(),
            "_uuid": self.session.uuids.uuid,
        });
        merge(&mut data, self.photo_metadata(&item.resource));

        self.configure("api/v1/media/configure/", &data).await
    }

    async fn upload_video(
        &self,
        item: &Download,
        caption: &str,
        target: &VideoTarget,
    ) -> Result<String, InstagramError> {
        self.require_user_id()?;
        let upload_id = new_upload_id();
        self.rupload_video(item, &upload_id, Some(target)).await?;

        let mut data = json!({
            "source_type": "4",
            "caption": caption,
            "upload_id": upload_id,
            "device": self.device(),
            "_uid": self.uid(),
            "_uuid": self.session.uuids.uuid,
        });
        merge(&mut data, self.video_metadata(&item.resource));

        let path = match target {
            VideoTarget::Feed => "api/v1/media/configure/?video=1",
            VideoTarget::Reel => {
                merge(&mut data, json!({"clips_share_preview_to_feed": "1"}));
                "api/v1/media/configure_to_clips/"
            }
            VideoTarget::Igtv { title } => {
                merge(
                    &mut data,
                    json!({"title": title, "igtv_share_preview_to_feed": "1"}),
                );
                "api/v1/media/configure_to_igtv/?video=1"
            }
        };

        self.configure(path, &data).await
    }

    async fn upload_album(
        &self,
        items: &[Download],
        caption: &str,
    ) -> Result<String, InstagramError> {
        self.require_user_id()?;
        let mut children = Vec::with_capacity(items.len());

        for item in items {
            let upload_id = new_upload_id();
            let mut child = json!({"upload_id": upload_id, "source_type": "4"});

            match item.resource.kind {
                ResourceKind::Photo => {
                    self.rupload_photo(&item.path, &upload_id, "1").await?;
                    merge(&mut child, self.photo_metadata(&item.resource));
                }
                ResourceKind::Video => {
                    self.rupload_video(item, &upload_id, None).await?;
                    merge(&mut child, self.video_metadata(&item.resource));
                }
            }

            children.push(child);
        }

        let sidecar_id = new_upload_id();
        let data = json!({
            "timezone_offset": "0",
            "source_type": "4",
            "creation_logger_session_id": Uuid::new_v4().to_string(),
            "caption": caption,
            "client_sidecar_id": sidecar_id,
            "upload_id": sidecar_id,
            "device": self.device(),
            "children_metadata": children,
            "_uid": self.uid(),
            "_uuid": self.session.uuids.uuid,
        });

        self.configure("api/v1/media/configure_sidecar/", &data).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, InstagramError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(InstagramError::from_failure(status, &body));
    }

    let value: Value = serde_json::from_str(&body)?;
    if value.get("status").and_then(Value::as_str) == Some("fail") {
        return Err(InstagramError::from_failure(status, &body));
    }

    Ok(serde_json::from_value(value)?)
}

/// Remove partially written files, ignoring ones that were never created.
async fn discard(paths: &[&Path]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed partial download {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn merge(base: &mut Value, extra: Value) {
    if let (Value::Object(base), Value::Object(extra)) = (base, extra) {
        base.extend(extra);
    }
}

fn cursor_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn media_id(media: &Value) -> Option<String> {
    media
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| media.get("pk").and_then(|pk| cursor_string(pk.clone())))
}

/// Device-derived checksum Instagram expects alongside the phone id.
fn jazoest(phone_id: &str) -> String {
    let sum: u32 = phone_id.bytes().map(u32::from).sum();
    format!("2{}", sum)
}

static UPLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp plus a per-process sequence, so album children never share an id.
fn new_upload_id() -> String {
    let seq = UPLOAD_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("{}{:03}", Utc::now().timestamp_millis(), seq)
}

fn upload_name(upload_id: &str) -> String {
    let random = Uuid::new_v4().as_u128() % 10_000_000_000;
    format!("{}_0_{:010}", upload_id, random)
}

fn duration_ms(resource: &MediaResource) -> u64 {
    (resource.duration_secs * 1000.0).round().max(0.0) as u64
}

fn thumbnail_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".jpg");
    PathBuf::from(name)
}
