use async_trait::async_trait;
use redbot_core::{
    BotError, Issue, IssueId, IssueList, IssueQuery, IssueUpdate, NewIssue, SearchResults,
    TimeEntry, UserList,
};

#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Base URL without a trailing slash, used to build links for chat replies.
    fn base_url(&self) -> &str;

    fn issue_url(&self, id: IssueId) -> String {
        format!("{}/issues/{id}", self.base_url())
    }

    fn search_url(&self, query: &str) -> String {
        format!("{}/search?q={query}", self.base_url())
    }

    async fn get_issue(&self, id: IssueId, include_journals: bool) -> Result<Issue, BotError>;

    async fn update_issue(&self, id: IssueId, update: &IssueUpdate) -> Result<(), BotError>;

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, BotError>;

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<(), BotError>;

    async fn list_issues(&self, query: &IssueQuery) -> Result<IssueList, BotError>;

    async fn search_users(&self, name: &str) -> Result<UserList, BotError>;

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, BotError>;
}
