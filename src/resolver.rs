//! Locale-aware blog resolution.
//!
//! Each post lives in `blogs/<slug>/` with `metadata.json` + `content.md` for
//! the default language and optional `metadata.<code>.json` /
//! `content.<code>.md` variants. The index enumerates all of them once; lookups
//! afterwards are pure.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::locale::Language;
use crate::model::{BlogMetadata, BlogPost};
use crate::source::ContentSource;

const BLOG_ROOT: &str = "blogs";

type Key = (String, Language);

#[derive(Debug, Clone, Default)]
pub struct BlogIndex {
    metadata: BTreeMap<Key, BlogMetadata>,
    content: BTreeMap<Key, String>,
}

impl BlogIndex {
    pub fn new() -> Self { Self::default() }

    /// Enumerate every blog directory and load all language variants.
    /// Unreadable or malformed files are skipped; an unreadable blog root
    /// yields an empty index.
    pub async fn load(source: &dyn ContentSource) -> Self {
        let mut index = Self::new();
        let slugs = match source.list_dirs(BLOG_ROOT).await {
            Ok(slugs) => slugs,
            Err(e) => {
                warn!(error = %e, "cannot list blogs");
                return index;
            }
        };
        for slug in slugs {
            for lang in Language::ALL {
                let meta_path = format!("{BLOG_ROOT}/{slug}/{}", lang.suffixed("metadata", "json"));
                if let Some(text) = read_variant(source, &meta_path).await {
                    match serde_json::from_str::<BlogMetadata>(&text) {
                        Ok(meta) => index.insert_metadata(&slug, lang, meta),
                        Err(e) => warn!(path = %meta_path, error = %e, "skipping malformed blog metadata"),
                    }
                }
                let content_path = format!("{BLOG_ROOT}/{slug}/{}", lang.suffixed("content", "md"));
                if let Some(text) = read_variant(source, &content_path).await {
                    index.insert_content(&slug, lang, text);
                }
            }
        }
        debug!(posts = index.slugs().len(), "blog index loaded");
        index
    }

    pub fn insert_metadata(&mut self, slug: &str, lang: Language, meta: BlogMetadata) {
        self.metadata.insert((slug.to_string(), lang), meta);
    }

    pub fn insert_content(&mut self, slug: &str, lang: Language, content: String) {
        self.content.insert((slug.to_string(), lang), content);
    }

    /// Slugs that have metadata in at least one language.
    pub fn slugs(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.metadata.keys().map(|(s, _)| s.as_str()).collect();
        out.dedup();
        out
    }

    /// Pick the best (metadata, content) pair for `slug`.
    ///
    /// Order: both preferred; preferred metadata with default content; default
    /// metadata with preferred content; both default. When none of those exist
    /// the first complete pair in any language is used.
    pub fn resolve(&self, slug: &str, preferred: Language) -> Option<BlogPost> {
        let default = Language::DEFAULT;
        let tiers = [
            (preferred, preferred),
            (preferred, default),
            (default, preferred),
            (default, default),
        ];
        let others = Language::ALL
            .into_iter()
            .flat_map(|m| Language::ALL.into_iter().map(move |c| (m, c)));

        tiers.into_iter().chain(others).find_map(|(meta_lang, content_lang)| {
            let metadata = self.metadata.get(&(slug.to_string(), meta_lang))?;
            let content = self.content.get(&(slug.to_string(), content_lang))?;
            Some(BlogPost {
                slug: slug.to_string(),
                metadata: metadata.clone(),
                content: content.clone(),
                metadata_language: meta_lang,
                content_language: content_lang,
            })
        })
    }

    /// Every resolvable post, newest first.
    pub fn posts(&self, preferred: Language) -> Vec<BlogPost> {
        let mut posts: Vec<BlogPost> = self
            .slugs()
            .into_iter()
            .filter_map(|slug| self.resolve(slug, preferred))
            .collect();
        posts.sort_by(|a, b| b.metadata.date.cmp(&a.metadata.date).then_with(|| a.slug.cmp(&b.slug)));
        posts
    }
}

async fn read_variant(source: &dyn ContentSource, path: &str) -> Option<String> {
    match source.read(path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(%path, error = %e, "skipping unreadable blog file");
            None
        }
    }
}
