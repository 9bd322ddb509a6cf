use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::issue::{IssueError, IssueTracker, NewIssue, RemoteIssue};

const API_BASE: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("No .git directory found at or above {0}")]
    NotARepository(PathBuf),
    #[error("Failed to read git config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No GitHub remote found in {0}")]
    NoGithubRemote(PathBuf),
}

/// Owner and repository name of a GitHub remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub repo: String,
}

impl RepoIdentity {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Locate the git config for `start` (or an ancestor) and read the GitHub
/// remote out of it.
pub fn discover_repo(start: &Path) -> Result<RepoIdentity, RepoError> {
    let config_path = find_git_config(start)?;
    let content = fs::read_to_string(&config_path).map_err(|source| RepoError::Io {
        path: config_path.clone(),
        source,
    })?;
    parse_remote_url(&content).ok_or(RepoError::NoGithubRemote(config_path))
}

fn find_git_config(start: &Path) -> Result<PathBuf, RepoError> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    for candidate in start.ancestors() {
        let dot_git = candidate.join(".git");
        if dot_git.is_dir() {
            return Ok(dot_git.join("config"));
        }
        // Worktrees and submodules use a `gitdir: <path>` pointer file.
        if dot_git.is_file() {
            if let Ok(text) = fs::read_to_string(&dot_git) {
                if let Some(target) = text.trim().strip_prefix("gitdir:") {
                    let git_dir = candidate.join(target.trim());
                    let common = git_dir.join("commondir");
                    if let Ok(rel) = fs::read_to_string(&common) {
                        return Ok(git_dir.join(rel.trim()).join("config"));
                    }
                    return Ok(git_dir.join("config"));
                }
            }
        }
    }
    Err(RepoError::NotARepository(start))
}

/// First GitHub `url = ...` entry in a git config file.
///
/// Accepts `git@github.com:owner/repo.git` and
/// `https://github.com/owner/repo(.git)`.
pub fn parse_remote_url(git_config: &str) -> Option<RepoIdentity> {
    let re = Regex::new(r"(?i)github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").expect("regex");
    git_config
        .lines()
        .filter_map(|line| {
            let (key, value) = line.trim().split_once('=')?;
            if key.trim() != "url" {
                return None;
            }
            Some(value.trim())
        })
        .find_map(|url| {
            let caps = re.captures(url)?;
            Some(RepoIdentity {
                owner: caps.get(1)?.as_str().to_string(),
                repo: caps.get(2)?.as_str().to_string(),
            })
        })
}

/// GitHub REST issues API over a blocking client.
#[derive(Debug)]
pub struct GithubTracker {
    repo: RepoIdentity,
    token: String,
    api_base: String,
    client: Client,
}

impl GithubTracker {
    pub fn new(repo: RepoIdentity, token: impl Into<String>) -> Result<Self, IssueError> {
        let client = Client::builder()
            .user_agent(format!("klaw/{}", crate::version()))
            .build()?;
        Ok(Self {
            repo,
            token: token.into().trim().to_string(),
            api_base: API_BASE.to_string(),
            client,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self.client = Client::builder()
            .no_proxy()
            .build()
            .expect("local client");
        self
    }

    pub fn repo(&self) -> &RepoIdentity {
        &self.repo
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_base,
            self.repo.owner,
            self.repo.repo
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(&self.token)
    }

    fn send(&self, request: RequestBuilder, url: &str, expected: StatusCode) -> Result<String, IssueError> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        if status != expected {
            return Err(IssueError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text()?)
    }
}

impl IssueTracker for GithubTracker {
    fn list_issues(&self) -> Result<Vec<RemoteIssue>, IssueError> {
        let url = self.issues_url();
        let mut issues = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self.client.get(&url).query(&[
                ("state", "all".to_string()),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]);
            let body = self.send(request, &url, StatusCode::OK)?;
            let batch: Vec<RemoteIssue> = serde_json::from_str(&body)?;
            let fetched = batch.len();
            debug!(page, fetched, "fetched issue page");
            issues.extend(batch.into_iter().filter(|issue| !issue.is_pull_request()));
            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(issues)
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<RemoteIssue, IssueError> {
        let url = self.issues_url();
        let request = self.client.post(&url).json(issue);
        let body = self.send(request, &url, StatusCode::CREATED)?;
        Ok(serde_json::from_str(&body)?)
    }
}
