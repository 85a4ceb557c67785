//! Video model and watch-history projections.

use serde::{Deserialize, Serialize};

use crate::models::user::{MediaAsset, User};

/// Video metadata stored in Firestore. Owned by the video service;
/// read-only here via watch-history references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Document id
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: u32,
    /// User id of the uploading channel
    pub owner_id: String,
    pub created_at: String,
}

/// Public fields of a video's owner, embedded per watch-history entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub full_name: String,
    pub username: String,
    pub avatar: MediaAsset,
}

impl From<&User> for VideoOwner {
    fn from(user: &User) -> Self {
        Self {
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Watch-history entry: the video plus its owner as a single embedded
/// object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryVideo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration_secs: u32,
    pub created_at: String,
    pub owner: VideoOwner,
}

impl WatchHistoryVideo {
    pub fn new(video: Video, owner: VideoOwner) -> Self {
        Self {
            id: video.id,
            title: video.title,
            thumbnail_url: video.thumbnail_url,
            duration_secs: video.duration_secs,
            created_at: video.created_at,
            owner,
        }
    }
}
