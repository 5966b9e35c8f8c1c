pub mod catalog;
pub mod chatbot;
pub mod config;
pub mod db;
pub mod leaderboard;
pub mod locale;
pub mod model;
pub mod progress;
pub mod resolver;
pub mod routes;
pub mod source;
pub mod storage;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::locale::Language;
    pub use crate::model::{Announcement, BlogMetadata, BlogPost, Course, Difficulty, Link, LinkCategory, Video};
    pub use crate::progress::{ProgressRecord, ProgressStore};
    pub use crate::routes::Route;
    pub use crate::{App, CoursePage};
}

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{search_courses, CatalogLoader};
use crate::chatbot::{ChatMessage, Chatbot};
use crate::config::Config;
use crate::db::Database;
use crate::leaderboard::{load_leaderboard, Contributor, GithubClient};
use crate::locale::{detect_language, Language, Translations};
use crate::model::{Announcement, BlogPost, Course, LinkCategory, Video};
use crate::progress::ProgressStore;
use crate::resolver::BlogIndex;
use crate::source::{ContentSource, FsSource};
use crate::storage::{MemoryStorage, Storage};

/// Everything a course page shows.
#[derive(Debug, Clone, Serialize)]
pub struct CoursePage {
    pub course: Course,
    pub videos: Vec<Video>,
    pub progress_percent: f64,
    pub starred: bool,
}

/// Application state: content, progress, language and search query. Views get
/// a reference to this instead of reaching for globals.
pub struct App {
    config: Config,
    storage: Arc<dyn Storage>,
    db: Option<Database>,
    catalog: CatalogLoader,
    blogs: BlogIndex,
    translations: Translations,
    progress: ProgressStore,
    language: Language,
    query: String,
}

impl App {
    /// Open storage and index the content directory named by `config`.
    /// An unusable database degrades to in-memory storage for the session.
    pub async fn connect(config: Config) -> Result<Self> {
        let (storage, db): (Arc<dyn Storage>, Option<Database>) = match open_database(&config).await {
            Ok(db) => (Arc::new(db.clone()) as Arc<dyn Storage>, Some(db)),
            Err(e) => {
                warn!(error = %e, "database unavailable, progress will not be saved");
                (Arc::new(MemoryStorage::new()) as Arc<dyn Storage>, None)
            }
        };
        let source: Arc<dyn ContentSource> = Arc::new(FsSource::new(config.content_dir.clone()));
        Self::with_parts(config, source, storage, db).await
    }

    /// Assemble from explicit parts (embedding, tests).
    pub async fn with_parts(
        config: Config,
        source: Arc<dyn ContentSource>,
        storage: Arc<dyn Storage>,
        db: Option<Database>,
    ) -> Result<Self> {
        let stored = locale::load_preference(storage.as_ref())
            .await
            .map(|l| l.code().to_string())
            .or_else(|| config.language.clone());
        let env_lang = std::env::var("LANG").ok();
        let language = detect_language(stored.as_deref(), env_lang.as_deref());

        let blogs = BlogIndex::load(source.as_ref()).await;
        let translations = Translations::load(source.as_ref(), language).await;
        let progress = ProgressStore::load(storage.clone()).await;
        info!(%language, "catalog ready");

        Ok(Self {
            config,
            storage,
            db,
            catalog: CatalogLoader::new(source),
            blogs,
            translations,
            progress,
            language,
            query: String::new(),
        })
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn storage(&self) -> &dyn Storage { self.storage.as_ref() }
    pub fn database(&self) -> Option<&Database> { self.db.as_ref() }
    pub fn catalog(&self) -> &CatalogLoader { &self.catalog }
    pub fn blogs(&self) -> &BlogIndex { &self.blogs }
    pub fn progress(&self) -> &ProgressStore { &self.progress }
    pub fn progress_mut(&mut self) -> &mut ProgressStore { &mut self.progress }
    pub fn language(&self) -> Language { self.language }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str { self.translations.t(key) }

    /// Switch language for this session only.
    pub fn use_language(&mut self, language: Language) {
        self.language = language;
        self.translations.set_language(language);
    }

    /// Switch language and remember it.
    pub async fn set_language(&mut self, language: Language) -> Result<()> {
        self.use_language(language);
        locale::save_preference(self.storage.as_ref(), language).await
    }

    /// Forget the saved preference and return to the default language.
    pub async fn reset_language(&mut self) -> Result<()> {
        self.use_language(Language::DEFAULT);
        locale::reset_preference(self.storage.as_ref()).await
    }

    pub fn query(&self) -> &str { &self.query }
    pub fn set_query(&mut self, query: &str) { self.query = query.to_string(); }

    /// Courses matching the current search query.
    pub async fn courses(&self) -> Vec<Course> {
        let all = self.catalog.load_courses(self.language).await;
        search_courses(&all, &self.query).into_iter().cloned().collect()
    }

    pub async fn course_page(&self, course_id: &str) -> Option<CoursePage> {
        let course = self.catalog.find_course(course_id, self.language).await?;
        let videos = self.catalog.load_videos(course_id, self.language).await;
        let progress_percent = self.progress.course_progress(&videos);
        let starred = self.progress.is_course_starred(course_id);
        Some(CoursePage { course, videos, progress_percent, starred })
    }

    pub fn blog_posts(&self) -> Vec<BlogPost> { self.blogs.posts(self.language) }

    pub fn blog_post(&self, slug: &str) -> Option<BlogPost> { self.blogs.resolve(slug, self.language) }

    pub async fn links(&self) -> Vec<LinkCategory> { self.catalog.load_links(self.language).await }

    pub async fn announcements(&self) -> Vec<Announcement> {
        self.catalog.load_announcements().await.into_iter().filter(|a| a.is_active).collect()
    }

    pub async fn leaderboard(&self, refresh: bool) -> Result<Vec<Contributor>> {
        let lb = &self.config.leaderboard;
        let client = GithubClient::new(&lb.owner, &lb.repo, lb.token.clone())?;
        load_leaderboard(&client, self.storage.as_ref(), lb.ttl_secs, refresh).await
    }

    /// One-shot question to the assistant. `None` for a blank question; any
    /// failure, including a missing API key, is the apology reply.
    pub async fn ask(&self, question: &str) -> Option<ChatMessage> {
        let cfg = &self.config.chatbot;
        let mut bot = Chatbot::gemini(cfg.api_key.as_deref(), &cfg.model);
        bot.send(question).await.cloned()
    }

    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        self.storage.clear_cache_prefix(prefix).await
    }

    /// Compact the database; no-op when running on in-memory storage.
    pub async fn vacuum_db(&self) -> Result<()> {
        match &self.db {
            Some(db) => db.vacuum().await,
            None => Ok(()),
        }
    }
}

async fn open_database(config: &Config) -> Result<Database> {
    let db = Database::connect(config.database_url.as_deref()).await?;
    db.run_migrations().await?;
    Ok(db)
}
