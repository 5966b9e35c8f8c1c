use std::path::PathBuf;
use std::sync::Arc;

use course_catalog::chatbot::{Sender, FAILURE_REPLY};
use course_catalog::db::sqlite_url_for;
use course_catalog::prelude::*;
use course_catalog::source::FsSource;
use course_catalog::storage::MemoryStorage;

fn config_for(db_dir: &tempfile::TempDir) -> Config {
    let mut cfg = Config::default();
    cfg.content_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("content");
    cfg.database_url = Some(sqlite_url_for(&db_dir.path().join("progress.db")));
    cfg.language = Some("en".to_string());
    cfg
}

#[tokio::test]
async fn kannada_blog_uses_english_body() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = App::connect(config_for(&dir)).await.unwrap();
    app.use_language(Language::Kannada);

    let post = app.blog_post("intro").unwrap();
    assert_eq!(post.metadata.title, "ಬ್ಲಾಗ್‌ಗೆ ಸ್ವಾಗತ");
    assert!(post.content.starts_with("# Welcome"));
    assert_eq!(post.content_language, Language::English);
    assert!(app.blog_post("missing").is_none());
    assert_eq!(app.blog_posts().len(), 1);
}

#[tokio::test]
async fn search_and_course_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = App::connect(config_for(&dir)).await.unwrap();

    let ids: Vec<String> = app.courses().await.into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["dsa", "os"]);
    app.set_query("os");
    let ids: Vec<String> = app.courses().await.into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["os"]);

    app.progress_mut().mark_video_complete("dsa-1").await;
    let page = app.course_page("dsa").await.unwrap();
    assert_eq!(page.videos.len(), 2);
    assert_eq!(page.progress_percent, 50.0);

    // Course exists but has no video file.
    let os = app.course_page("os").await.unwrap();
    assert!(os.videos.is_empty());
    assert_eq!(os.progress_percent, 0.0);

    assert!(app.course_page("nope").await.is_none());
}

#[tokio::test]
async fn progress_and_language_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut app = App::connect(config_for(&dir)).await.unwrap();
        app.progress_mut().mark_video_complete("dsa-2").await;
        app.progress_mut().toggle_course_starred("os").await;
        app.set_language(Language::Kannada).await.unwrap();
    }

    let mut app = App::connect(config_for(&dir)).await.unwrap();
    assert!(app.progress().is_video_completed("dsa-2"));
    assert!(app.progress().is_course_starred("os"));
    assert_eq!(app.language(), Language::Kannada);
    assert_eq!(app.links().await[0].title, "ಸಾಮಾಜಿಕ");
    assert_eq!(app.t("blogNotFound"), "Blog post not found");

    app.reset_language().await.unwrap();
    let app = App::connect(config_for(&dir)).await.unwrap();
    assert_eq!(app.language(), Language::English);
}

#[tokio::test]
async fn unusable_database_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config_for(&dir);
    cfg.database_url = Some("sqlite:///definitely/not/a/dir/progress.db?mode=ro".to_string());

    let mut app = App::connect(cfg).await.unwrap();
    assert!(app.database().is_none());
    app.progress_mut().mark_video_complete("dsa-1").await;
    assert!(app.progress().is_video_completed("dsa-1"));
    assert_eq!(app.announcements().await.len(), 1);
}

#[tokio::test]
async fn unreadable_blog_does_not_block_courses() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("blogs/bad")).unwrap();
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::write(root.join("blogs/bad/content.md"), [0xff_u8, 0xfe, 0x00]).unwrap();
    std::fs::write(
        root.join("data/courses.json"),
        r#"{"courses":[{"id":"dsa","title":"DSA","description":"d","thumbnail":"t","difficulty":"Beginner"}]}"#,
    )
    .unwrap();

    let app = App::with_parts(Config::default(), Arc::new(FsSource::new(root)), Arc::new(MemoryStorage::new()), None)
        .await
        .unwrap();
    assert_eq!(app.courses().await.len(), 1);
    assert!(app.blog_posts().is_empty());
}

#[tokio::test]
async fn ask_without_api_key_replies_with_apology() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::with_parts(Config::default(), Arc::new(FsSource::new(dir.path())), Arc::new(MemoryStorage::new()), None)
        .await
        .unwrap();

    let reply = app.ask("what is a stack?").await.unwrap();
    assert_eq!(reply.sender, Sender::Bot);
    assert_eq!(reply.text, FAILURE_REPLY);
    assert!(app.ask("   ").await.is_none());
}
