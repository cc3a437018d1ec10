use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::api::InstagramError;

/// What kind of post a saved item is, as far as reposting cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Video,
    Igtv,
    Reel,
    Album,
}

impl MediaKind {
    /// Map Instagram's numeric `media_type` and `product_type` to a kind.
    pub fn from_api(media_type: u8, product_type: &str) -> Option<Self> {
        match media_type {
            1 => Some(MediaKind::Photo),
            2 => match product_type {
                "clips" => Some(MediaKind::Reel),
                "igtv" => Some(MediaKind::Igtv),
                _ => Some(MediaKind::Video),
            },
            8 => Some(MediaKind::Album),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Igtv => "IGTV",
            MediaKind::Reel => "reel",
            MediaKind::Album => "album",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Photo,
    Video,
}

/// One downloadable piece of media: the post itself, or one album child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaResource {
    pub pk: String,
    pub kind: ResourceKind,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
}

/// A post from the account's saved collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPost {
    pub id: String,
    pub pk: String,
    pub code: String,
    pub kind: MediaKind,
    pub owner: String,
    pub caption: String,
    pub title: Option<String>,
    pub resources: Vec<MediaResource>,
}

impl SavedPost {
    /// The single resource of a non-album post.
    pub fn primary_resource(&self) -> Option<&MediaResource> {
        self.resources.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub collection_type: String,
    pub media_count: u32,
}

impl Collection {
    /// Instagram's implicit "All Posts" collection is served by the saved feed.
    pub fn is_all_posts(&self) -> bool {
        self.collection_type == "ALL_MEDIA_AUTO_COLLECTION"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub pk: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

/// A resource downloaded to disk, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub resource: MediaResource,
    pub path: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

impl Download {
    /// Every file this download put on disk.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.thumbnail.as_deref())
    }
}

/// Where a video upload is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoTarget {
    Feed,
    Igtv { title: String },
    Reel,
}

// ==================== Wire format ====================

#[derive(Debug, Deserialize)]
pub(crate) struct RawMedia {
    #[serde(default)]
    id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pk: String,
    #[serde(default)]
    code: Option<String>,
    media_type: u8,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    caption: Option<RawCaption>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image_versions2: Option<RawImageVersions>,
    #[serde(default)]
    video_versions: Option<Vec<RawVersion>>,
    #[serde(default)]
    video_duration: Option<f64>,
    #[serde(default)]
    original_width: Option<u32>,
    #[serde(default)]
    original_height: Option<u32>,
    #[serde(default)]
    carousel_media: Option<Vec<RawMedia>>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct RawCaption {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RawImageVersions {
    #[serde(default)]
    candidates: Vec<RawVersion>,
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

fn largest(versions: &[RawVersion]) -> Option<&RawVersion> {
    versions
        .iter()
        .max_by_key(|v| u64::from(v.width) * u64::from(v.height))
}

impl RawMedia {
    fn into_resource(self) -> Result<MediaResource, InstagramError> {
        let kind = match self.media_type {
            1 => ResourceKind::Photo,
            2 => ResourceKind::Video,
            other => {
                return Err(InstagramError::UnexpectedMedia(format!(
                    "media {} has resource type {}",
                    self.pk, other
                )))
            }
        };

        let image = self
            .image_versions2
            .as_ref()
            .and_then(|versions| largest(&versions.candidates));
        let video = self.video_versions.as_deref().and_then(largest);

        let (fallback_width, fallback_height) = video
            .or(image)
            .map(|v| (v.width, v.height))
            .unwrap_or((0, 0));

        Ok(MediaResource {
            image_url: image.map(|v| v.url.clone()),
            video_url: video.map(|v| v.url.clone()),
            width: self.original_width.unwrap_or(fallback_width),
            height: self.original_height.unwrap_or(fallback_height),
            duration_secs: self.video_duration.unwrap_or(0.0),
            pk: self.pk,
            kind,
        })
    }
}

impl TryFrom<RawMedia> for SavedPost {
    type Error = InstagramError;

    fn try_from(mut raw: RawMedia) -> Result<Self, Self::Error> {
        let product_type = raw.product_type.take().unwrap_or_default();
        let kind = MediaKind::from_api(raw.media_type, &product_type).ok_or_else(|| {
            InstagramError::UnexpectedMedia(format!(
                "media {} has unknown type {}",
                raw.pk, raw.media_type
            ))
        })?;

        let owner = raw
            .user
            .take()
            .map(|u| u.username)
            .ok_or_else(|| InstagramError::UnexpectedMedia(format!("media {} has no owner", raw.pk)))?;

        let pk = raw.pk.clone();
        let id = raw.id.take().unwrap_or_else(|| pk.clone());
        let code = raw.code.take().unwrap_or_default();
        let caption = raw.caption.take().map(|c| c.text).unwrap_or_default();
        let title = raw.title.take().filter(|t| !t.trim().is_empty());

        let resources = if kind == MediaKind::Album {
            raw.carousel_media
                .take()
                .unwrap_or_default()
                .into_iter()
                .map(RawMedia::into_resource)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![raw.into_resource()?]
        };

        Ok(SavedPost {
            id,
            pk,
            code,
            kind,
            owner,
            caption,
            title,
            resources,
        })
    }
}

/// Instagram sends ids as numbers in some payloads and strings in others.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
