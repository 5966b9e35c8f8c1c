mod cli;

use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ProgressAction};
use course_catalog::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.content_dir {
        config.content_dir = dir;
    }
    let mut app = App::connect(config).await?;
    if let Some(code) = &cli.lang {
        let lang = Language::from_code(code).ok_or_else(|| anyhow!("unsupported language: {code}"))?;
        app.use_language(lang);
    }
    let json = cli.json;

    match cli.command {
        Commands::Courses { query } => {
            app.set_query(query.as_deref().unwrap_or_default());
            let courses = app.courses().await;
            if json { return print_json(&courses); }
            if courses.is_empty() {
                println!("{}", app.t("noCoursesFound"));
            }
            print_courses(&app, &courses).await;
        }
        Commands::Course { id } => match app.course_page(&id).await {
            Some(page) if json => print_json(&page)?,
            Some(page) => print_course(&app, &page),
            None => println!("{}: {id}", app.t("courseNotFound")),
        },
        Commands::Blogs => {
            let posts = app.blog_posts();
            if json { return print_json(&posts); }
            for post in posts {
                println!("{}  {}  ({})", post.metadata.date, post.metadata.title, post.slug);
                if !post.metadata.description.is_empty() {
                    println!("    {}", post.metadata.description);
                }
            }
        }
        Commands::Blog { slug } => match app.blog_post(&slug) {
            Some(post) if json => print_json(&post)?,
            Some(post) => {
                println!("{}", post.metadata.title);
                let author = match &post.metadata.author_url {
                    Some(url) => format!("{} <{url}>", post.metadata.author),
                    None => post.metadata.author.clone(),
                };
                println!("By {author} · {}", post.metadata.date);
                if !post.metadata.tags.is_empty() {
                    println!("#{}", post.metadata.tags.join(" #"));
                }
                println!();
                println!("{}", post.content);
            }
            None => println!("{}: {slug}", app.t("blogNotFound")),
        },
        Commands::Links => {
            let categories = app.links().await;
            if json { return print_json(&categories); }
            for cat in categories {
                println!("{}", cat.title);
                for link in cat.links {
                    println!("  {} - {}  {}", link.title, link.description, link.url);
                }
            }
        }
        Commands::Announcements => {
            let items = app.announcements().await;
            if json { return print_json(&items); }
            for a in items {
                match a.link {
                    Some(link) => println!("* {} ({link})", a.message),
                    None => println!("* {}", a.message),
                }
            }
        }
        Commands::Leaderboard { refresh } => match app.leaderboard(refresh).await {
            Ok(board) if json => print_json(&board)?,
            Ok(board) => {
                for (rank, c) in board.iter().enumerate() {
                    println!(
                        "{:>3}. {:<24} PRs {:>3}  issues {:>3}  commits {:>4}  {}",
                        rank + 1, c.name, c.prs, c.issues, c.commits, c.github_profile
                    );
                }
            }
            Err(e) => println!("{}: {e:#}", app.t("leaderboardError")),
        },
        Commands::Progress { action } => run_progress(&mut app, action, json).await?,
        Commands::Language { code, reset } => {
            if reset {
                app.reset_language().await?;
            } else if let Some(code) = code {
                let lang = Language::from_code(&code).ok_or_else(|| anyhow!("unsupported language: {code}"))?;
                app.set_language(lang).await?;
            }
            println!("{} ({})", app.language().native_name(), app.language());
        }
        Commands::Route { path } => {
            let resolved = Route::parse(&path);
            if resolved.redirected {
                println!("{path} -> {} (redirect)", resolved.route);
            } else {
                println!("{}", resolved.route);
            }
        }
        Commands::Ask { question } => match app.ask(&question.join(" ")).await {
            Some(reply) => println!("{}", reply.text),
            None => println!("{}", app.t("emptyQuestion")),
        },
        Commands::Cache { prefix } => {
            let removed = app.clear_cache_prefix(prefix.as_deref()).await?;
            println!("removed {removed} cache entries");
        }
        Commands::Vacuum => app.vacuum_db().await?,
    }
    Ok(())
}

async fn run_progress(app: &mut App, action: ProgressAction, json: bool) -> Result<()> {
    let store = app.progress_mut();
    match action {
        ProgressAction::Complete { video_id } => store.mark_video_complete(&video_id).await,
        ProgressAction::Incomplete { video_id } => store.mark_video_incomplete(&video_id).await,
        ProgressAction::StarVideo { video_id } => {
            let on = store.toggle_video_starred(&video_id).await;
            println!("{video_id}: {}", if on { "starred" } else { "unstarred" });
        }
        ProgressAction::StarCourse { course_id } => {
            let on = store.toggle_course_starred(&course_id).await;
            println!("{course_id}: {}", if on { "starred" } else { "unstarred" });
        }
        ProgressAction::Reset => store.reset().await,
        ProgressAction::Show => {
            let record = store.record();
            if json { return print_json(record); }
            println!("completed: {}", join(&record.completed_videos));
            println!("starred videos: {}", join(&record.starred_videos));
            println!("starred courses: {}", join(&record.starred_courses));
        }
    }
    Ok(())
}

async fn print_courses(app: &App, courses: &[Course]) {
    let lang = app.language();
    for c in courses {
        let star = if app.progress().is_course_starred(&c.id) { "★" } else { " " };
        let total = app.catalog().total_videos(&c.id).await;
        println!("{star} {:<12} {} [{}] {total} videos", c.id, c.title_in(lang), c.difficulty);
        println!("    {}", c.description_in(lang));
    }
}

fn print_course(app: &App, page: &CoursePage) {
    let lang = app.language();
    let star = if page.starred { "★ " } else { "" };
    println!("{star}{}", page.course.title_in(lang));
    println!("{}", page.course.description_in(lang));
    println!("Progress: {}%", page.progress_percent.round());
    if page.videos.is_empty() {
        println!("{}", app.t("noVideos"));
    }
    for v in &page.videos {
        let done = if app.progress().is_video_completed(&v.id) { "[x]" } else { "[ ]" };
        let star = if app.progress().is_video_starred(&v.id) { "★" } else { " " };
        println!("{done}{star} {:<10} {}", v.id, v.title);
        println!("      video: {}  notes: {}", v.youtube_url, v.notes_url);
        if let Some(q) = &v.coding_question_url {
            println!("      practice: {q}");
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn join<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    let v: Vec<&str> = ids.into_iter().map(String::as_str).collect();
    if v.is_empty() { "-".to_string() } else { v.join(", ") }
}
