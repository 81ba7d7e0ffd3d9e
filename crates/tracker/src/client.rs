use async_trait::async_trait;
use redbot_core::config::TrackerSettings;
use redbot_core::{
    BotError, Issue, IssueId, IssueList, IssueQuery, IssueUpdate, NewIssue, SearchResults,
    TimeEntry, User, UserList,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::TrackerApi;

const API_KEY_HEADER: &str = "x-redmine-api-key";
const MAX_ERROR_DETAIL_CHARS: usize = 300;

#[derive(Clone)]
pub struct RedmineClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct IssueEnvelope {
    issue: Issue,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Serialize)]
struct IssueBody<'a, T: Serialize> {
    issue: &'a T,
}

#[derive(Serialize)]
struct TimeEntryBody<'a> {
    time_entry: &'a TimeEntry,
}

#[derive(Deserialize)]
struct TrackerErrors {
    #[serde(default)]
    errors: Vec<String>,
}

impl RedmineClient {
    pub fn new(settings: &TrackerSettings) -> Result<Self, BotError> {
        let mut api_key = HeaderValue::from_str(settings.api_token.expose_secret().trim())
            .map_err(|_| {
                BotError::ConfigMissing(
                    "REDBOT_REDMINE_TOKEN contains characters that cannot be sent in a header."
                        .to_string(),
                )
            })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("redbot"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|error| BotError::Transport(format!("failed to create http client: {error}")))?;

        Ok(Self { http, base_url: settings.base_url.trim_end_matches('/').to_string() })
    }

    /// The account the API token belongs to; used as a connectivity probe.
    pub async fn current_user(&self) -> Result<User, BotError> {
        let request = self.http.get(self.endpoint("/users/current.json"));
        let envelope: UserEnvelope = self.request_json("fetch current user", request).await?;
        Ok(envelope.user)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn request_json<T>(&self, operation: &str, request: RequestBuilder) -> Result<T, BotError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(operation, request).await?;
        response.json::<T>().await.map_err(|error| {
            warn!(
                event_name = "tracker.response.malformed",
                operation,
                error = %error,
                "tracker returned an unreadable body"
            );
            BotError::MalformedResponse(format!("{operation} returned an unreadable body: {error}"))
        })
    }

    async fn request_empty(&self, operation: &str, request: RequestBuilder) -> Result<(), BotError> {
        self.send(operation, request).await.map(|_| ())
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, BotError> {
        debug!(event_name = "tracker.request", operation, "sending tracker request");

        let response = request.send().await.map_err(|error| {
            warn!(event_name = "tracker.request.failed", operation, error = %error, "tracker request failed");
            BotError::Transport(format!("{operation} request failed: {error}"))
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(event_name = "tracker.response", operation, status = status.as_u16(), "tracker responded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        warn!(
            event_name = "tracker.response.rejected",
            operation,
            status = status.as_u16(),
            detail = %detail,
            "tracker rejected request"
        );

        Err(BotError::Transport(if detail.is_empty() {
            format!("{operation} failed with {status}")
        } else {
            format!("{operation} failed with {status}: {detail}")
        }))
    }
}

/// Redmine reports validation problems as `{"errors": [...]}`; anything else is
/// passed through truncated.
fn error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<TrackerErrors>(body) {
        if !parsed.errors.is_empty() {
            return parsed.errors.join(", ");
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_DETAIL_CHARS {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX_ERROR_DETAIL_CHARS).collect();
    format!("{truncated}...")
}

#[async_trait]
impl TrackerApi for RedmineClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_issue(&self, id: IssueId, include_journals: bool) -> Result<Issue, BotError> {
        let mut request = self.http.get(self.endpoint(&format!("/issues/{id}.json")));
        if include_journals {
            request = request.query(&[("include", "journals")]);
        }
        let envelope: IssueEnvelope = self.request_json("fetch issue", request).await?;
        Ok(envelope.issue)
    }

    async fn update_issue(&self, id: IssueId, update: &IssueUpdate) -> Result<(), BotError> {
        let request = self
            .http
            .put(self.endpoint(&format!("/issues/{id}.json")))
            .json(&IssueBody { issue: update });
        self.request_empty("update issue", request).await
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, BotError> {
        let request = self.http.post(self.endpoint("/issues.json")).json(&IssueBody { issue });
        let envelope: IssueEnvelope = self.request_json("create issue", request).await?;
        Ok(envelope.issue)
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<(), BotError> {
        let request = self
            .http
            .post(self.endpoint("/time_entries.json"))
            .json(&TimeEntryBody { time_entry: entry });
        self.request_empty("log time", request).await
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<IssueList, BotError> {
        let request = self.http.get(self.endpoint("/issues.json")).query(&[
            ("assigned_to_id", query.assigned_to_id.to_string()),
            ("status_id", query.status.clone()),
            ("limit", query.limit.to_string()),
            ("sort", query.sort.clone()),
        ]);
        self.request_json("list issues", request).await
    }

    async fn search_users(&self, name: &str) -> Result<UserList, BotError> {
        let request = self.http.get(self.endpoint("/users.json")).query(&[("name", name)]);
        self.request_json("search users", request).await
    }

    async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, BotError> {
        let request = self
            .http
            .get(self.endpoint("/search.json"))
            .query(&[("q", query.to_string()), ("limit", limit.to_string())]);
        self.request_json("search", request).await
    }
}
