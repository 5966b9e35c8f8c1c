use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse the course catalog, blogs and links from the terminal
#[derive(Parser)]
#[command(name = "course-catalog")]
#[command(about = "Localized course catalog with learning progress", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Content directory, overrides the config file
    #[arg(long, global = true)]
    pub content_dir: Option<PathBuf>,

    /// Language for this invocation only (en, kn)
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List courses
    Courses {
        /// Filter by id, title or description
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show a course with its videos and progress
    Course {
        id: String,
    },
    /// List blog posts
    Blogs,
    /// Show a blog post
    Blog {
        slug: String,
    },
    /// Show the link directory
    Links,
    /// Show active announcements
    Announcements,
    /// Rank repository contributors
    Leaderboard {
        /// Ignore the cached leaderboard
        #[arg(long)]
        refresh: bool,
    },
    /// Track completed and starred items
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },
    /// Show, set or reset the preferred language
    Language {
        /// Language code to save
        code: Option<String>,
        /// Forget the saved language
        #[arg(long, conflicts_with = "code")]
        reset: bool,
    },
    /// Resolve a site path to its page
    Route {
        path: String,
    },
    /// Ask the channel assistant a question
    Ask {
        question: Vec<String>,
    },
    /// Manage the leaderboard cache
    Cache {
        /// Only clear keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Compact the progress database
    Vacuum,
}

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Mark a video as watched
    Complete { video_id: String },
    /// Mark a video as not watched
    Incomplete { video_id: String },
    /// Star or unstar a video
    StarVideo { video_id: String },
    /// Star or unstar a course
    StarCourse { course_id: String },
    /// Print the saved record
    Show,
    /// Clear all progress
    Reset,
}
