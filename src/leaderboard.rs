//! Contributor leaderboard built from a GitHub repository's pull requests,
//! closed issues and PR commits.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::storage::{current_epoch, Storage};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub user: Option<GithubUser>,
    pub commits_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub assignee: Option<GithubUser>,
    #[serde(default)]
    pub assignees: Vec<GithubUser>,
    pub state: String,
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub github: String,
    pub name: String,
    pub prs: u32,
    pub issues: u32,
    pub commits: u32,
    pub github_profile: String,
    pub profile_image: String,
}

impl Contributor {
    pub fn score(&self) -> u32 { self.prs + self.issues + self.commits }
}

/// Where contribution data comes from.
#[async_trait]
pub trait ContributionSource: Send + Sync {
    /// Cache namespace, e.g. `owner/repo`.
    fn repository(&self) -> String;
    async fn pull_requests(&self) -> Result<Vec<PullRequest>>;
    async fn closed_issues(&self) -> Result<Vec<Issue>>;
    async fn commit_count(&self, commits_url: &str) -> Result<u32>;
    async fn user(&self, login: &str) -> Result<GithubUser>;
}

pub struct GithubClient {
    http: reqwest::Client,
    base: Url,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(owner: &str, repo: &str, token: Option<String>) -> Result<Self> {
        Self::with_base(GITHUB_API_BASE, owner, repo, token)
    }

    pub fn with_base(base: &str, owner: &str, repo: &str, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("course-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = Url::parse(base).with_context(|| format!("invalid GitHub API base: {base}"))?;
        Ok(Self { http, base, owner: owner.to_string(), repo: repo.to_string(), token: token.filter(|t| !t.is_empty()) })
    }

    fn repo_url(&self, tail: &str) -> Result<Url> {
        self.base
            .join(&format!("repos/{}/{}/{}", self.owner, self.repo, tail))
            .context("building GitHub URL")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        let mut req = self.http.get(url.clone()).header(reqwest::header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }
        debug!(%url, "GitHub request");
        let resp = req.send().await.with_context(|| format!("failed to fetch {what}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("failed to fetch {what}: HTTP {}", resp.status()));
        }
        resp.json::<T>().await.with_context(|| format!("decoding {what}"))
    }
}

#[async_trait]
impl ContributionSource for GithubClient {
    fn repository(&self) -> String { format!("{}/{}", self.owner, self.repo) }

    async fn pull_requests(&self) -> Result<Vec<PullRequest>> {
        let mut url = self.repo_url("pulls")?;
        url.query_pairs_mut().append_pair("state", "all").append_pair("per_page", "100");
        self.get_json(url, "pull requests").await
    }

    async fn closed_issues(&self) -> Result<Vec<Issue>> {
        let mut url = self.repo_url("issues")?;
        url.query_pairs_mut().append_pair("state", "closed").append_pair("per_page", "100");
        self.get_json(url, "issues").await
    }

    async fn commit_count(&self, commits_url: &str) -> Result<u32> {
        let url = Url::parse(commits_url).with_context(|| format!("invalid commits URL: {commits_url}"))?;
        let commits: Vec<serde_json::Value> = self.get_json(url, "PR commits").await?;
        Ok(commits.len() as u32)
    }

    async fn user(&self, login: &str) -> Result<GithubUser> {
        let url = self.base.join(&format!("users/{login}")).context("building GitHub URL")?;
        self.get_json(url, &format!("user profile for {login}")).await
    }
}

/// Closed, non-PR issues whose author is also an assignee, counted per author.
pub fn count_issues(issues: &[Issue]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for issue in issues {
        if issue.pull_request.is_some() || issue.state != "closed" {
            continue;
        }
        let Some(author) = issue.user.as_ref().map(|u| u.login.as_str()) else { continue };
        let assigned = issue.assignee.as_ref().is_some_and(|a| a.login == author)
            || issue.assignees.iter().any(|a| a.login == author);
        if assigned {
            *counts.entry(author.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Merge per-user counts into a ranked list, highest total first.
pub fn rank_contributors(
    pr_counts: &HashMap<String, u32>,
    issue_counts: &HashMap<String, u32>,
    commit_counts: &HashMap<String, u32>,
    profiles: &HashMap<String, GithubUser>,
) -> Vec<Contributor> {
    let users: BTreeSet<&String> = pr_counts.keys().chain(issue_counts.keys()).collect();
    let mut out: Vec<Contributor> = users
        .into_iter()
        .map(|login| {
            let profile = profiles.get(login);
            Contributor {
                github: login.clone(),
                name: profile.and_then(|p| p.name.clone()).filter(|n| !n.is_empty()).unwrap_or_else(|| login.clone()),
                prs: pr_counts.get(login).copied().unwrap_or(0),
                issues: issue_counts.get(login).copied().unwrap_or(0),
                commits: commit_counts.get(login).copied().unwrap_or(0),
                github_profile: format!("https://github.com/{login}"),
                profile_image: profile.map(|p| p.avatar_url.clone()).unwrap_or_default(),
            }
        })
        .collect();
    out.sort_by(|a, b| b.score().cmp(&a.score()).then_with(|| a.github.cmp(&b.github)));
    out
}

/// Fetch everything from `source` and rank contributors.
pub async fn build_leaderboard(source: &dyn ContributionSource) -> Result<Vec<Contributor>> {
    let (prs, issues) = futures::try_join!(source.pull_requests(), source.closed_issues())?;

    let authored: Vec<(&str, &str)> = prs
        .iter()
        .filter_map(|pr| pr.user.as_ref().map(|u| (u.login.as_str(), pr.commits_url.as_str())))
        .collect();

    let mut pr_counts: HashMap<String, u32> = HashMap::new();
    for (login, _) in &authored {
        *pr_counts.entry(login.to_string()).or_insert(0) += 1;
    }

    let commit_totals = try_join_all(authored.iter().map(|(_, url)| source.commit_count(url))).await?;
    let mut commit_counts: HashMap<String, u32> = HashMap::new();
    for ((login, _), n) in authored.iter().zip(commit_totals) {
        *commit_counts.entry(login.to_string()).or_insert(0) += n;
    }

    let logins: BTreeSet<&str> = authored.iter().map(|(l, _)| *l).collect();
    let users = try_join_all(logins.iter().map(|login| source.user(login))).await?;
    let profiles: HashMap<String, GithubUser> = logins.iter().map(|l| l.to_string()).zip(users).collect();

    let issue_counts = count_issues(&issues);
    Ok(rank_contributors(&pr_counts, &issue_counts, &commit_counts, &profiles))
}

/// Leaderboard with a TTL cache in front. `refresh` bypasses the cache.
pub async fn load_leaderboard(
    source: &dyn ContributionSource,
    storage: &dyn Storage,
    ttl_secs: i64,
    refresh: bool,
) -> Result<Vec<Contributor>> {
    let key = format!("leaderboard|{}", source.repository());
    let now = current_epoch();
    if !refresh {
        match storage.get_cache(&key, now).await {
            Ok(Some(payload)) => match serde_json::from_str::<Vec<Contributor>>(&payload) {
                Ok(list) => {
                    debug!(%key, "leaderboard cache hit");
                    return Ok(list);
                }
                Err(e) => warn!(%key, error = %e, "ignoring stale leaderboard cache"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "leaderboard cache unavailable"),
        }
    }

    let list = build_leaderboard(source).await?;
    info!(contributors = list.len(), "leaderboard fetched");
    let payload = serde_json::to_string(&list)?;
    if let Err(e) = storage.put_cache(&key, &payload, now + ttl_secs).await {
        warn!(error = %e, "failed to cache leaderboard");
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(login: &str) -> GithubUser {
        GithubUser { login: login.to_string(), avatar_url: format!("https://avatars/{login}"), name: None }
    }

    fn issue(author: &str, assignee: Option<&str>, assignees: &[&str], is_pr: bool) -> Issue {
        Issue {
            user: Some(user(author)),
            assignee: assignee.map(user),
            assignees: assignees.iter().map(|a| user(a)).collect(),
            state: "closed".to_string(),
            pull_request: is_pr.then(|| PullRequestRef { url: Some("x".to_string()) }),
        }
    }

    struct FakeGithub {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ContributionSource for FakeGithub {
        fn repository(&self) -> String { "owner/repo".to_string() }

        async fn pull_requests(&self) -> Result<Vec<PullRequest>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("Failed to fetch pull requests"));
            }
            Ok(vec![
                PullRequest { user: Some(user("asha")), commits_url: "c/1".to_string() },
                PullRequest { user: Some(user("asha")), commits_url: "c/2".to_string() },
                PullRequest { user: Some(user("ravi")), commits_url: "c/3".to_string() },
                PullRequest { user: None, commits_url: "c/4".to_string() },
            ])
        }

        async fn closed_issues(&self) -> Result<Vec<Issue>> {
            Ok(vec![issue("meena", Some("meena"), &[], false), issue("ravi", None, &["ravi"], false)])
        }

        async fn commit_count(&self, commits_url: &str) -> Result<u32> {
            Ok(match commits_url { "c/1" => 3, "c/2" => 1, "c/3" => 2, _ => 0 })
        }

        async fn user(&self, login: &str) -> Result<GithubUser> {
            let mut u = user(login);
            if login == "asha" {
                u.name = Some("Asha K".to_string());
            }
            Ok(u)
        }
    }

    #[test]
    fn issues_counted_only_when_self_assigned_and_closed() {
        let mut open = issue("a", Some("a"), &[], false);
        open.state = "open".to_string();
        let issues = vec![
            issue("a", Some("a"), &[], false),
            issue("a", None, &["b", "a"], false),
            issue("a", Some("b"), &["b"], false),
            issue("a", Some("a"), &[], true),
            open,
        ];
        let counts = count_issues(&issues);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.len(), 1);
    }

    #[tokio::test]
    async fn builds_ranked_board() {
        let fake = FakeGithub { calls: AtomicUsize::new(0), fail: false };
        let board = build_leaderboard(&fake).await.unwrap();
        let order: Vec<(&str, u32)> = board.iter().map(|c| (c.github.as_str(), c.score())).collect();
        assert_eq!(order, vec![("asha", 6), ("ravi", 4), ("meena", 1)]);
        assert_eq!(board[0].name, "Asha K");
        assert_eq!(board[0].commits, 4);
        assert_eq!(board[1].name, "ravi");
        assert_eq!(board[2].profile_image, "");
        assert_eq!(board[2].github_profile, "https://github.com/meena");

        let json = serde_json::to_value(&board[0]).unwrap();
        assert_eq!(json["githubProfile"], "https://github.com/asha");
        assert_eq!(json["profileImage"], "https://avatars/asha");
        assert!(json.get("github_profile").is_none());
    }

    #[tokio::test]
    async fn cached_until_refresh() {
        let fake = FakeGithub { calls: AtomicUsize::new(0), fail: false };
        let storage = MemoryStorage::new();
        load_leaderboard(&fake, &storage, 600, false).await.unwrap();
        load_leaderboard(&fake, &storage, 600, false).await.unwrap();
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        load_leaderboard(&fake, &storage, 600, true).await.unwrap();
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn network_failure_is_an_error() {
        let fake = FakeGithub { calls: AtomicUsize::new(0), fail: true };
        let err = load_leaderboard(&fake, &MemoryStorage::new(), 600, false).await.unwrap_err();
        assert!(err.to_string().contains("pull requests"));
    }

    #[test]
    fn client_urls() {
        let c = GithubClient::new("chandansgowda", "engineering-in-kannada", Some(String::new())).unwrap();
        assert!(c.token.is_none());
        assert_eq!(
            c.repo_url("pulls").unwrap().as_str(),
            "https://api.github.com/repos/chandansgowda/engineering-in-kannada/pulls"
        );
    }
}
