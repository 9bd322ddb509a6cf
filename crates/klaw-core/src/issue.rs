use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Malformed issue response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Issue tracker rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUser {
    pub login: String,
}

/// An issue as reported by the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIssue {
    #[serde(default)]
    pub id: u64,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub assignee: Option<IssueUser>,
    /// Present when the issues endpoint hands back a pull request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl RemoteIssue {
    pub fn is_closed(&self) -> bool {
        self.state.trim().eq_ignore_ascii_case("closed")
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn assignee_login(&self) -> Option<&str> {
        self.assignee.as_ref().map(|user| user.login.as_str())
    }
}

/// Payload for creating an issue. `number` and `state` are assigned remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl NewIssue {
    pub fn from_text(text: &str, assignee: Option<&str>) -> Self {
        Self {
            title: text.to_string(),
            body: text.to_string(),
            assignee: assignee.map(str::to_string),
        }
    }
}

pub trait IssueTracker {
    /// All issues, open and closed, in the order the tracker returns them.
    fn list_issues(&self) -> Result<Vec<RemoteIssue>, IssueError>;
    fn create_issue(&self, issue: &NewIssue) -> Result<RemoteIssue, IssueError>;
}

/// Tracker kept entirely in memory; numbers are assigned sequentially.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    issues: RefCell<Vec<RemoteIssue>>,
    fail_after: Option<usize>,
    created: RefCell<usize>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issues(issues: Vec<RemoteIssue>) -> Self {
        Self {
            issues: RefCell::new(issues),
            ..Self::default()
        }
    }

    /// Reject every create request after the first `count` succeed.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn issues(&self) -> Vec<RemoteIssue> {
        self.issues.borrow().clone()
    }
}

impl IssueTracker for MemoryTracker {
    fn list_issues(&self) -> Result<Vec<RemoteIssue>, IssueError> {
        Ok(self.issues())
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<RemoteIssue, IssueError> {
        let mut created = self.created.borrow_mut();
        if let Some(limit) = self.fail_after {
            if *created >= limit {
                return Err(IssueError::Rejected(format!(
                    "create limit of {} reached",
                    limit
                )));
            }
        }
        *created += 1;

        let mut issues = self.issues.borrow_mut();
        let number = issues.iter().map(|issue| issue.number).max().unwrap_or(0) + 1;
        let record = RemoteIssue {
            id: number * 1000,
            number,
            title: issue.title.clone(),
            body: Some(issue.body.clone()),
            state: "open".to_string(),
            assignee: issue.assignee.clone().map(|login| IssueUser { login }),
            pull_request: None,
        };
        issues.push(record.clone());
        Ok(record)
    }
}
