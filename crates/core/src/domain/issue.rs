use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub u64);

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// `{id, name}` reference the tracker embeds for projects, statuses, users and so on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub project: NamedRef,
    pub tracker: NamedRef,
    pub status: NamedRef,
    pub priority: NamedRef,
    pub author: NamedRef,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub done_ratio: u32,
    #[serde(default)]
    pub spent_hours: Option<f64>,
    #[serde(default)]
    pub journals: Option<Vec<Journal>>,
}

impl Issue {
    pub fn is_new(&self) -> bool {
        self.status.name.eq_ignore_ascii_case("new")
    }

    pub fn assignee_name(&self) -> &str {
        self.assigned_to.as_ref().map(|user| user.name.as_str()).unwrap_or("Nobody")
    }

    /// Spent hours worth showing; zero and absent both count as none.
    pub fn logged_hours(&self) -> Option<f64> {
        self.spent_hours.filter(|hours| *hours != 0.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: u64,
    pub user: NamedRef,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_on: String,
}

impl Journal {
    pub fn note(&self) -> Option<&str> {
        self.notes.as_deref().filter(|notes| !notes.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IssueList {
    pub issues: Vec<Issue>,
    pub total_count: u64,
}

/// Attributes sent when updating an issue; unset fields are left untouched by the tracker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_ratio: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub project_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueQuery {
    pub assigned_to_id: u64,
    pub status: String,
    pub limit: u32,
    pub sort: String,
}

impl IssueQuery {
    /// Open issues assigned to `user_id`, highest priority first.
    pub fn open_for(user_id: u64, limit: u32) -> Self {
        Self {
            assigned_to_id: user_id,
            status: "open".to_owned(),
            limit,
            sort: "priority:desc".to_owned(),
        }
    }
}

/// Workflow states addressable by name from chat, with the tracker's default ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueStatus {
    New,
    InProgress,
    Resolved,
    Feedback,
    Closed,
    Rejected,
}

impl IssueStatus {
    /// Maps free text to a status. Unknown or absent text means "In Progress".
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
            return Self::InProgress;
        };
        let lowered = name.to_ascii_lowercase();

        if lowered.starts_with("new") {
            Self::New
        } else if lowered.contains("progress") {
            Self::InProgress
        } else if lowered.contains("resolved") {
            Self::Resolved
        } else if lowered.contains("feedback") {
            Self::Feedback
        } else if lowered.contains("closed") {
            Self::Closed
        } else if lowered.contains("rejected") {
            Self::Rejected
        } else {
            Self::InProgress
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::New => 1,
            Self::InProgress => 2,
            Self::Resolved => 3,
            Self::Feedback => 4,
            Self::Closed => 5,
            Self::Rejected => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Feedback => "Feedback",
            Self::Closed => "Closed",
            Self::Rejected => "Rejected",
        }
    }
}
