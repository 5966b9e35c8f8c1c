use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::locale::Language;
use crate::model::{Announcement, AnnouncementsData, Course, CoursesData, LinkCategory, LinksData, Video, VideoData};
use crate::source::ContentSource;

const DATA_ROOT: &str = "data";

/// Loads course, video, link and announcement files, preferring the
/// language-suffixed variant and falling back to the default file.
#[derive(Clone)]
pub struct CatalogLoader {
    source: Arc<dyn ContentSource>,
}

impl CatalogLoader {
    pub fn new(source: Arc<dyn ContentSource>) -> Self { Self { source } }

    pub fn source(&self) -> &dyn ContentSource { self.source.as_ref() }

    /// Videos of a course. Unknown courses and unreadable files yield an empty list.
    pub async fn load_videos(&self, course_id: &str, lang: Language) -> Vec<Video> {
        let stem = format!("{DATA_ROOT}/videos/{course_id}");
        match self.load_localized::<VideoData>(&stem, lang).await {
            Some(data) => data.videos,
            None => {
                warn!(course_id, "no video list found");
                Vec::new()
            }
        }
    }

    pub async fn total_videos(&self, course_id: &str) -> usize {
        self.load_videos(course_id, Language::DEFAULT).await.len()
    }

    pub async fn load_courses(&self, lang: Language) -> Vec<Course> {
        self.load_localized::<CoursesData>(&format!("{DATA_ROOT}/courses"), lang)
            .await
            .map(|d| d.courses)
            .unwrap_or_default()
    }

    pub async fn find_course(&self, id: &str, lang: Language) -> Option<Course> {
        self.load_courses(lang).await.into_iter().find(|c| c.id == id)
    }

    pub async fn load_links(&self, lang: Language) -> Vec<LinkCategory> {
        self.load_localized::<LinksData>(&format!("{DATA_ROOT}/links"), lang)
            .await
            .map(|d| d.categories)
            .unwrap_or_default()
    }

    pub async fn load_announcements(&self) -> Vec<Announcement> {
        self.load_localized::<AnnouncementsData>(&format!("{DATA_ROOT}/announcements"), Language::DEFAULT)
            .await
            .map(|d| d.items)
            .unwrap_or_default()
    }

    /// Try `<stem>.<code>.json`, then `<stem>.json`. Any failure on a variant
    /// moves on to the next one.
    async fn load_localized<T: DeserializeOwned>(&self, stem: &str, lang: Language) -> Option<T> {
        let mut candidates = vec![lang];
        if !lang.is_default() {
            candidates.push(Language::DEFAULT);
        }
        for candidate in candidates {
            let path = candidate.suffixed(stem, "json");
            match self.source.read(&path).await {
                Ok(Some(text)) => match serde_json::from_str::<T>(&text) {
                    Ok(v) => {
                        debug!(%path, "loaded");
                        return Some(v);
                    }
                    Err(e) => warn!(%path, error = %e, "malformed content file, falling back"),
                },
                Ok(None) => debug!(%path, "variant missing"),
                Err(e) => warn!(%path, error = %e, "failed to read content file, falling back"),
            }
        }
        None
    }
}

/// Courses whose id, title or description (base or localized) contain the
/// normalized query. An empty query keeps every course.
pub fn search_courses<'a>(courses: &'a [Course], query: &str) -> Vec<&'a Course> {
    let needle = norm_query(query);
    if needle.is_empty() {
        return courses.iter().collect();
    }
    courses
        .iter()
        .filter(|c| {
            let localized = c.translations.values().flat_map(|t| [t.title.as_deref(), t.description.as_deref()]).flatten();
            [c.id.as_str(), c.title.as_str(), c.description.as_str()]
                .into_iter()
                .chain(localized)
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn active_announcements(items: &[Announcement]) -> Vec<&Announcement> {
    items.iter().filter(|a| a.is_active).collect()
}

/// Index of the banner shown after `current` in a rotation of `len` items.
pub fn next_announcement_index(current: usize, len: usize) -> usize {
    if len == 0 { 0 } else { (current + 1) % len }
}

pub(crate) fn norm_query(q: &str) -> String {
    let t = q.trim().to_lowercase();
    let mut o = String::with_capacity(t.len());
    let mut s = false;
    for c in t.chars() {
        if c.is_whitespace() {
            if !s { o.push(' '); s = true; }
        } else {
            o.push(c); s = false;
        }
    }
    o
}
