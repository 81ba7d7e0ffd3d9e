use std::sync::Arc;

use async_trait::async_trait;
use redbot_core::{
    resolve_users, BotError, IssueId, IssueQuery, IssueStatus, IssueUpdate, NewIssue, TimeEntry,
    User,
};
use redbot_tracker::TrackerApi;
use tracing::{error, info};

use crate::{
    commands::{IssueOwner, TrackerCommandService},
    render::{self, ListOwner},
    replies::OutboundMessage,
};

/// Open issues listed per `show ... issues` request.
pub const ISSUE_LIST_LIMIT: u32 = 10;

pub const ISSUE_LIST_FAILURE: &str = "Couldn't get a list of issues for you!";

/// Command implementations backed by the tracker. Each command awaits its tracker calls in
/// sequence and stops at the first failure.
pub struct TrackerCommands {
    tracker: Arc<dyn TrackerApi>,
    search_limit: u32,
}

impl TrackerCommands {
    pub fn new(tracker: Arc<dyn TrackerApi>, search_limit: u32) -> Self {
        Self { tracker, search_limit }
    }

    /// Searches the tracker's users for `name` and narrows the hits to one user.
    async fn find_user(&self, name: &str) -> Result<User, BotError> {
        let found = self.tracker.search_users(name).await?;
        if found.is_empty() {
            return Err(BotError::user_not_found(name));
        }

        resolve_users(name, &found.users)
            .best()
            .cloned()
            .ok_or_else(|| BotError::user_not_found(name))
    }
}

fn attributed(sender: &str, text: &str) -> String {
    format!("{sender}: {text}")
}

#[async_trait]
impl TrackerCommandService for TrackerCommands {
    async fn link_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError> {
        Ok(vec![OutboundMessage::reply(self.tracker.issue_url(issue_id))])
    }

    async fn set_done_ratio(
        &self,
        issue_id: IssueId,
        percent: u32,
        comment: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let notes = match comment {
            Some(comment) => attributed(sender, &comment),
            None => format!("Ratio set by: {sender}"),
        };
        let update =
            IssueUpdate { done_ratio: Some(percent), notes: Some(notes), ..IssueUpdate::default() };

        self.tracker.update_issue(issue_id, &update).await?;
        Ok(vec![OutboundMessage::reply(format!("Set #{issue_id} to {percent}%"))])
    }

    async fn log_time(
        &self,
        issue_id: IssueId,
        hours: f64,
        comment: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let comments = match comment {
            Some(comment) => attributed(sender, &comment),
            None => format!("Time logged by: {sender}"),
        };

        self.tracker.create_time_entry(&TimeEntry { issue_id, hours, comments }).await?;
        Ok(vec![OutboundMessage::reply("Your time was logged")])
    }

    async fn list_issues(
        &self,
        owner: IssueOwner,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let name = match &owner {
            IssueOwner::Sender => sender.split_whitespace().next().unwrap_or(sender),
            IssueOwner::Named(name) => name.as_str(),
        };
        let user = self.find_user(name).await?;

        let query = IssueQuery::open_for(user.id, ISSUE_LIST_LIMIT);
        let list = self.tracker.list_issues(&query).await.map_err(|tracker_error| {
            error!(
                event_name = "chat.command.list_issues_failed",
                user_id = user.id,
                error = %tracker_error,
                "listing assigned issues failed"
            );
            BotError::Transport(ISSUE_LIST_FAILURE.to_owned())
        })?;

        let list_owner = match owner {
            IssueOwner::Sender => ListOwner::Sender,
            IssueOwner::Named(_) => ListOwner::Other { firstname: &user.firstname },
        };
        Ok(vec![OutboundMessage::reply(render::issue_list(&list, list_owner, ISSUE_LIST_LIMIT))])
    }

    async fn add_note(
        &self,
        issue_id: IssueId,
        note: String,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let update =
            IssueUpdate { notes: Some(attributed(sender, &note)), ..IssueUpdate::default() };

        self.tracker.update_issue(issue_id, &update).await?;
        Ok(vec![OutboundMessage::reply(format!("Done! Updated #{issue_id} with \"{note}\""))])
    }

    async fn set_status(
        &self,
        issue_id: IssueId,
        status: Option<String>,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let resolved = IssueStatus::from_name(status.as_deref());
        let update = IssueUpdate { status_id: Some(resolved.code()), ..IssueUpdate::default() };

        self.tracker.update_issue(issue_id, &update).await?;
        let shown = status.unwrap_or_else(|| IssueStatus::InProgress.label().to_owned());
        Ok(vec![OutboundMessage::reply(format!(
            "Done! Issue id #{issue_id} is now set to status '{shown}'"
        ))])
    }

    async fn create_issue(
        &self,
        project: String,
        tracker_id: Option<u64>,
        subject: String,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let new_issue = NewIssue { project_id: project, subject, tracker_id };
        let created = self.tracker.create_issue(&new_issue).await?;

        info!(
            event_name = "chat.command.issue_created",
            issue_id = %created.id,
            project = %new_issue.project_id,
            "created tracker issue"
        );
        Ok(vec![OutboundMessage::reply(format!(
            "Done! Added issue {} with \"{}\"",
            created.id, new_issue.subject
        ))])
    }

    async fn assign_issue(
        &self,
        issue_id: IssueId,
        user_name: String,
        note: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        let user = self.find_user(&user_name).await?;
        let update = IssueUpdate {
            assigned_to_id: Some(user.id),
            notes: note.map(|note| attributed(sender, &note)),
            ..IssueUpdate::default()
        };

        self.tracker.update_issue(issue_id, &update).await?;
        Ok(vec![OutboundMessage::reply(format!("Assigned #{issue_id} to {}.", user.firstname))])
    }

    async fn show_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError> {
        let issue = self.tracker.get_issue(issue_id, true).await?;
        Ok(vec![OutboundMessage::reply(render::issue_detail(&issue))])
    }

    async fn search(&self, query: String) -> Result<Vec<OutboundMessage>, BotError> {
        let results = self.tracker.search(&query, self.search_limit).await?;
        let more_url = self.tracker.search_url(&query);
        Ok(vec![OutboundMessage::reply(render::search_results(&results, &query, &more_url))])
    }
}
