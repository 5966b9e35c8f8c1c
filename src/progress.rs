//! Learner progress: completed videos, starred videos and starred courses.
//!
//! The record is kept in memory and written through to [`Storage`] after every
//! mutation as `{"state": {...}, "version": N}`. Storage problems never
//! surface as errors to callers; the session continues on in-memory state.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::model::Video;
use crate::storage::Storage;

pub const PROGRESS_KEY: &str = "course-progress";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub completed_videos: BTreeSet<String>,
    #[serde(default)]
    pub starred_videos: BTreeSet<String>,
    #[serde(default)]
    pub starred_courses: BTreeSet<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: Value,
    #[serde(default)]
    version: u32,
}

/// Decode a persisted envelope, migrating older versions.
///
/// Version 0 predates `starredCourses`; the serde default fills it in, so the
/// migration only has to accept the shape. Newer versions are read best-effort.
pub fn decode_record(raw: &str) -> Result<ProgressRecord> {
    let env: Envelope = serde_json::from_str(raw).context("progress envelope")?;
    if env.version > SCHEMA_VERSION {
        warn!(version = env.version, "progress record written by a newer version");
    }
    let record: ProgressRecord = serde_json::from_value(env.state).context("progress state")?;
    if env.version < SCHEMA_VERSION {
        info!(from = env.version, to = SCHEMA_VERSION, "migrated progress record");
    }
    Ok(record)
}

pub fn encode_record(record: &ProgressRecord) -> Result<String> {
    let env = Envelope { state: serde_json::to_value(record)?, version: SCHEMA_VERSION };
    Ok(serde_json::to_string(&env)?)
}

pub struct ProgressStore {
    storage: Arc<dyn Storage>,
    record: ProgressRecord,
}

impl ProgressStore {
    /// Load the persisted record. Missing, corrupt or unreadable records all
    /// start the session from an empty record.
    pub async fn load(storage: Arc<dyn Storage>) -> Self {
        let record = match storage.get_value(PROGRESS_KEY).await {
            Ok(Some(raw)) => decode_record(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt progress record, starting fresh");
                ProgressRecord::default()
            }),
            Ok(None) => {
                debug!("no saved progress");
                ProgressRecord::default()
            }
            Err(e) => {
                warn!(error = %e, "progress storage unavailable, using in-memory state");
                ProgressRecord::default()
            }
        };
        Self { storage, record }
    }

    pub fn record(&self) -> &ProgressRecord { &self.record }

    pub async fn mark_video_complete(&mut self, video_id: &str) {
        if self.record.completed_videos.insert(video_id.to_string()) {
            self.persist().await;
        }
    }

    pub async fn mark_video_incomplete(&mut self, video_id: &str) {
        if self.record.completed_videos.remove(video_id) {
            self.persist().await;
        }
    }

    pub fn is_video_completed(&self, video_id: &str) -> bool {
        self.record.completed_videos.contains(video_id)
    }

    /// Returns the new starred state.
    pub async fn toggle_video_starred(&mut self, video_id: &str) -> bool {
        let starred = toggle(&mut self.record.starred_videos, video_id);
        self.persist().await;
        starred
    }

    pub fn is_video_starred(&self, video_id: &str) -> bool {
        self.record.starred_videos.contains(video_id)
    }

    /// Returns the new starred state.
    pub async fn toggle_course_starred(&mut self, course_id: &str) -> bool {
        let starred = toggle(&mut self.record.starred_courses, course_id);
        self.persist().await;
        starred
    }

    pub fn is_course_starred(&self, course_id: &str) -> bool {
        self.record.starred_courses.contains(course_id)
    }

    /// Percentage of `videos` marked complete; 0 for an empty course.
    pub fn course_progress(&self, videos: &[Video]) -> f64 {
        if videos.is_empty() {
            return 0.0;
        }
        let done = videos.iter().filter(|v| self.is_video_completed(&v.id)).count();
        done as f64 / videos.len() as f64 * 100.0
    }

    pub async fn reset(&mut self) {
        self.record = ProgressRecord::default();
        self.persist().await;
    }

    async fn persist(&self) {
        let payload = match encode_record(&self.record) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode progress");
                return;
            }
        };
        if let Err(e) = self.storage.put_value(PROGRESS_KEY, &payload).await {
            warn!(error = %e, "failed to save progress; keeping in-memory state");
        }
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    struct BrokenStorage;

    #[async_trait]
    impl Storage for BrokenStorage {
        async fn get_value(&self, _: &str) -> Result<Option<String>> { Err(anyhow::anyhow!("disk gone")) }
        async fn put_value(&self, _: &str, _: &str) -> Result<()> { Err(anyhow::anyhow!("disk gone")) }
        async fn remove_value(&self, _: &str) -> Result<()> { Err(anyhow::anyhow!("disk gone")) }
        async fn get_cache(&self, _: &str, _: i64) -> Result<Option<String>> { Ok(None) }
        async fn put_cache(&self, _: &str, _: &str, _: i64) -> Result<()> { Ok(()) }
        async fn clear_cache_prefix(&self, _: Option<&str>) -> Result<u64> { Ok(0) }
    }

    fn video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: id.to_string(),
            kind: "video".to_string(),
            youtube_url: String::new(),
            notes_url: String::new(),
            coding_question_url: None,
        }
    }

    #[tokio::test]
    async fn complete_then_incomplete() {
        let mut store = ProgressStore::load(Arc::new(MemoryStorage::new())).await;
        store.mark_video_complete("v1").await;
        store.mark_video_complete("v1").await;
        assert!(store.is_video_completed("v1"));
        assert_eq!(store.record().completed_videos.len(), 1);
        store.mark_video_incomplete("v1").await;
        assert!(!store.is_video_completed("v1"));
    }

    #[tokio::test]
    async fn double_toggle_restores_state() {
        let mut store = ProgressStore::load(Arc::new(MemoryStorage::new())).await;
        store.toggle_course_starred("os").await;
        let before = store.record().clone();

        assert!(store.toggle_video_starred("v9").await);
        assert!(!store.toggle_video_starred("v9").await);
        assert!(!store.toggle_course_starred("os").await);
        assert!(store.toggle_course_starred("os").await);
        assert_eq!(store.record(), &before);
    }

    #[tokio::test]
    async fn writes_through_and_reloads() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = ProgressStore::load(storage.clone()).await;
        store.mark_video_complete("v1").await;
        store.toggle_course_starred("dsa").await;

        let raw = storage.get_value(PROGRESS_KEY).await.unwrap().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["state"]["completedVideos"][0], "v1");

        let reloaded = ProgressStore::load(storage).await;
        assert!(reloaded.is_video_completed("v1"));
        assert!(reloaded.is_course_starred("dsa"));
    }

    #[tokio::test]
    async fn version_zero_record_gains_starred_courses() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .put_value(PROGRESS_KEY, r#"{"state":{"completedVideos":["a","a"],"starredVideos":["b"]},"version":0}"#)
            .await
            .unwrap();
        let store = ProgressStore::load(storage).await;
        assert!(store.is_video_completed("a"));
        assert_eq!(store.record().completed_videos.len(), 1);
        assert!(store.is_video_starred("b"));
        assert!(store.record().starred_courses.is_empty());
    }

    #[tokio::test]
    async fn corrupt_record_starts_fresh() {
        let storage = Arc::new(MemoryStorage::new());
        storage.put_value(PROGRESS_KEY, "not json").await.unwrap();
        let store = ProgressStore::load(storage).await;
        assert_eq!(store.record(), &ProgressRecord::default());
    }

    #[tokio::test]
    async fn unavailable_storage_keeps_session_state() {
        let mut store = ProgressStore::load(Arc::new(BrokenStorage)).await;
        store.mark_video_complete("v1").await;
        assert!(store.toggle_video_starred("v2").await);
        assert!(store.is_video_completed("v1"));
        assert!(store.is_video_starred("v2"));
    }

    #[tokio::test]
    async fn course_progress_percentage() {
        let mut store = ProgressStore::load(Arc::new(MemoryStorage::new())).await;
        let videos = vec![video("a"), video("b"), video("c"), video("d")];
        assert_eq!(store.course_progress(&videos), 0.0);
        store.mark_video_complete("a").await;
        store.mark_video_complete("zzz").await;
        assert_eq!(store.course_progress(&videos), 25.0);
        assert_eq!(store.course_progress(&[]), 0.0);
        store.reset().await;
        assert_eq!(store.course_progress(&videos), 0.0);
    }
}
