use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redbot_core::{
    BotError, Issue, IssueId, IssueList, IssueQuery, IssueUpdate, NamedRef, NewIssue,
    SearchResults, TimeEntry, User, UserList,
};
use redbot_tracker::TrackerApi;

pub(crate) const BASE_URL: &str = "https://tracker.example";

pub(crate) fn issue(id: u64, status: &str) -> Issue {
    let named = |id: u64, name: &str| NamedRef { id, name: name.to_owned() };
    Issue {
        id: IssueId(id),
        project: named(1, "Website"),
        tracker: named(1, "Bug"),
        status: named(2, status),
        priority: named(4, "High"),
        author: named(7, "Alice Smith"),
        assigned_to: None,
        subject: "Broken login".to_owned(),
        description: None,
        done_ratio: 0,
        spent_hours: None,
        journals: None,
    }
}

pub(crate) fn user(id: u64, login: &str, firstname: &str, lastname: &str) -> User {
    User {
        id,
        login: login.to_owned(),
        firstname: firstname.to_owned(),
        lastname: lastname.to_owned(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TrackerCall {
    GetIssue { id: IssueId, include_journals: bool },
    UpdateIssue { id: IssueId, update: IssueUpdate },
    CreateIssue(NewIssue),
    CreateTimeEntry(TimeEntry),
    ListIssues(IssueQuery),
    SearchUsers(String),
    Search { query: String, limit: u32 },
}

/// In-memory tracker. User search matches login, first or last name by substring, the way
/// the real tracker's fuzzy search does.
#[derive(Default)]
pub(crate) struct FakeTracker {
    issues: Vec<Issue>,
    users: Vec<User>,
    assigned: Vec<Issue>,
    search: Option<SearchResults>,
    failures: HashMap<&'static str, BotError>,
    calls: Mutex<Vec<TrackerCall>>,
}

impl FakeTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub(crate) fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub(crate) fn with_assigned(mut self, issue: Issue) -> Self {
        self.assigned.push(issue);
        self
    }

    pub(crate) fn with_search(mut self, results: SearchResults) -> Self {
        self.search = Some(results);
        self
    }

    /// Makes `operation` fail with `error`.
    pub(crate) fn failing(mut self, operation: &'static str, error: BotError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, operation: &'static str, call: TrackerCall) -> Result<(), BotError> {
        self.calls.lock().expect("calls lock").push(call);
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TrackerApi for FakeTracker {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get_issue(&self, id: IssueId, include_journals: bool) -> Result<Issue, BotError> {
        self.record("get_issue", TrackerCall::GetIssue { id, include_journals })?;
        self.issues
            .iter()
            .find(|issue| issue.id == id)
            .cloned()
            .ok_or_else(|| BotError::Transport("fetch issue failed with 404 Not Found".to_owned()))
    }

    async fn update_issue(&self, id: IssueId, update: &IssueUpdate) -> Result<(), BotError> {
        self.record("update_issue", TrackerCall::UpdateIssue { id, update: update.clone() })
    }

    async fn create_issue(&self, new_issue: &NewIssue) -> Result<Issue, BotError> {
        self.record("create_issue", TrackerCall::CreateIssue(new_issue.clone()))?;
        let mut created = issue(101, "New");
        created.subject = new_issue.subject.clone();
        Ok(created)
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<(), BotError> {
        self.record("create_time_entry", TrackerCall::CreateTimeEntry(entry.clone()))
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<IssueList, BotError> {
        self.record("list_issues", TrackerCall::ListIssues(query.clone()))?;
        Ok(IssueList { issues: self.assigned.clone(), total_count: self.assigned.len() as u64 })
    }

    async fn search_users(&self, name: &str) -> Result<UserList, BotError> {
        self.record("search_users", TrackerCall::SearchUsers(name.to_owned()))?;
        let needle = name.to_lowercase();
        let users: Vec<User> = self
            .users
            .iter()
            .filter(|user| {
                [&user.login, &user.firstname, &user.lastname]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(UserList { total_count: users.len() as u64, users })
    }

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, BotError> {
        self.record("search", TrackerCall::Search { query: query.to_owned(), limit })?;
        Ok(self.search.clone().unwrap_or(SearchResults {
            results: Vec::new(),
            total_count: 0,
            limit: u64::from(limit),
        }))
    }
}
