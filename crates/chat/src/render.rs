//! Plain-text rendering for tracker data.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use redbot_core::{Issue, IssueList, SearchResults};

use crate::replies::TextBuilder;

pub const JOURNAL_DATE_FORMAT: &str = "mm/dd/yyyy (hh:ii ap)";
pub const DEFAULT_DATE_FORMAT: &str = "mm/dd/yyyy at hh:ii ap";

const SCISSORS: &str = "---------8<-------------------------------------------------";

/// Whose issues a list shows; decides the header wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOwner<'a> {
    Sender,
    Other { firstname: &'a str },
}

pub fn issue_detail(issue: &Issue) -> String {
    let mut text = TextBuilder::new()
        .spaced(format!(
            "[{} - {}] {} #{} ({})",
            issue.project.name, issue.priority.name, issue.tracker.name, issue.id, issue.status.name
        ))
        .line(format!("Assigned: {} (opened by {})", issue.assignee_name(), issue.author.name));

    if !issue.is_new() {
        text = match issue.logged_hours() {
            Some(hours) => text.line(format!("Progress: {}% ({hours} hours)", issue.done_ratio)),
            None => text.line(format!("Progress: {}%", issue.done_ratio)),
        };
    }

    text = text
        .line(format!("Subject: {}", issue.subject))
        .spaced(issue.description.as_deref().unwrap_or_default());

    if let Some(journals) = &issue.journals {
        text = text.line(format!("\n{SCISSORS}\n"));
        for journal in journals {
            let Some(note) = journal.note() else {
                continue;
            };
            text = text
                .line(format!(
                    "{} on {}:",
                    journal.user.name,
                    format_date(&journal.created_on, JOURNAL_DATE_FORMAT)
                ))
                .line(format!("    {note}\n"));
        }
    }

    text.build()
}

pub fn issue_list(list: &IssueList, owner: ListOwner<'_>, shown_limit: u32) -> String {
    let header = match owner {
        ListOwner::Sender => format!("You have {} issue(s).", list.total_count),
        ListOwner::Other { firstname } => format!(
            "{firstname} has {} issue(s) and limiting to {shown_limit} issues here. :) ",
            list.total_count
        ),
    };

    list.issues
        .iter()
        .fold(TextBuilder::new().line(header), |text, issue| {
            text.spaced(format!(
                "[{} - {} - {}] #{}: {}",
                issue.tracker.name, issue.priority.name, issue.status.name, issue.id, issue.subject
            ))
        })
        .build()
}

/// Search reply. `more_url` is only linked when the tracker reports more hits than it returned.
pub fn search_results(results: &SearchResults, query: &str, more_url: &str) -> String {
    if results.total_count == 0 {
        return format!("No search results for {query}");
    }

    let text = TextBuilder::new()
        .extend(results.results.iter().map(|result| format!("{} - {}", result.title, result.url)));
    if results.has_more() {
        text.line(format!("More results: {more_url}")).build()
    } else {
        text.build()
    }
}

pub fn mention_summary(issue: &Issue) -> String {
    format!(
        "{} #{} ({}): {} ({}) [{}]",
        issue.tracker.name,
        issue.id,
        issue.project.name,
        issue.subject,
        issue.status.name,
        issue.priority.name
    )
}

/// Fills `template` from `timestamp` in UTC. Tokens `mm dd yyyy hh ii ss ap` are each
/// replaced once; minutes and seconds are zero-padded, the rest are not. Timestamps that
/// do not parse are returned unchanged.
pub fn format_date(timestamp: &str, template: &str) -> String {
    let Some(moment) = parse_timestamp(timestamp) else {
        return timestamp.to_owned();
    };
    let (is_pm, hour) = moment.hour12();

    let tokens = [
        ("mm", moment.month().to_string()),
        ("dd", moment.day().to_string()),
        ("yyyy", moment.year().to_string()),
        ("hh", hour.to_string()),
        ("ii", format!("{:02}", moment.minute())),
        ("ss", format!("{:02}", moment.second())),
        ("ap", if is_pm { "PM" } else { "AM" }.to_owned()),
    ];

    tokens
        .iter()
        .fold(template.to_owned(), |rendered, (token, value)| rendered.replacen(token, value, 1))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc).naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}
