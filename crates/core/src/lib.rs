pub mod config;
pub mod domain;
pub mod errors;
pub mod resolver;

pub use domain::issue::{
    Issue, IssueId, IssueList, IssueQuery, IssueStatus, IssueUpdate, Journal, NamedRef, NewIssue,
};
pub use domain::search::{SearchResult, SearchResults};
pub use domain::time_entry::TimeEntry;
pub use domain::user::{User, UserList};
pub use errors::BotError;
pub use resolver::{resolve_users, Resolution};
