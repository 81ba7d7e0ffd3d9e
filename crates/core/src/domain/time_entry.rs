use serde::Serialize;

use crate::domain::issue::IssueId;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeEntry {
    pub issue_id: IssueId,
    pub hours: f64,
    pub comments: String,
}
