use async_trait::async_trait;
use redbot_core::{BotError, IssueId};
use regex::{Captures, Regex};

use crate::replies::{self, OutboundMessage};

#[derive(Clone, Debug, PartialEq)]
pub enum TrackerCommand {
    LinkIssue { issue_id: IssueId },
    SetDoneRatio { issue_id: IssueId, percent: u32, comment: Option<String> },
    LogTime { issue_id: IssueId, hours: f64, comment: Option<String> },
    ListIssues { owner: IssueOwner },
    AddNote { issue_id: IssueId, note: String },
    SetStatus { issue_id: IssueId, status: Option<String> },
    CreateIssue { project: String, tracker_id: Option<u64>, subject: String },
    AssignIssue { issue_id: IssueId, user_name: String, note: Option<String> },
    ShowIssue { issue_id: IssueId },
    Search { query: String },
    Help,
}

impl TrackerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinkIssue { .. } => "link_issue",
            Self::SetDoneRatio { .. } => "set_done_ratio",
            Self::LogTime { .. } => "log_time",
            Self::ListIssues { .. } => "list_issues",
            Self::AddNote { .. } => "add_note",
            Self::SetStatus { .. } => "set_status",
            Self::CreateIssue { .. } => "create_issue",
            Self::AssignIssue { .. } => "assign_issue",
            Self::ShowIssue { .. } => "show_issue",
            Self::Search { .. } => "search",
            Self::Help => "help",
        }
    }

    pub fn issue_id(&self) -> Option<IssueId> {
        match self {
            Self::LinkIssue { issue_id }
            | Self::SetDoneRatio { issue_id, .. }
            | Self::LogTime { issue_id, .. }
            | Self::AddNote { issue_id, .. }
            | Self::SetStatus { issue_id, .. }
            | Self::AssignIssue { issue_id, .. }
            | Self::ShowIssue { issue_id } => Some(*issue_id),
            Self::ListIssues { .. }
            | Self::CreateIssue { .. }
            | Self::Search { .. }
            | Self::Help => None,
        }
    }
}

/// Whose open issues `show ... issues` asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssueOwner {
    Sender,
    Named(String),
}

type Extractor = fn(&Captures<'_>) -> Option<TrackerCommand>;

const PREFIX: &str = r"(?i)^(?:redmine|rm)";

/// Declaration order is match order.
const PATTERNS: [(&str, Extractor); 11] = [
    (r#" link me (?:issue )?#?(\d+)"#, link_issue),
    (r#" set (?:issue )?#?(\d+) to (\d{1,3})%?(?: "?([^"]+)"?)?"#, set_done_ratio),
    (r#" add (\d{1,2}(?:\.\d+)?) hours? to (?:issue )?#?(\d+)(?: "?([^"]+)"?)?"#, log_time),
    (r#" show @?(?:my|(\w+\s?'?s?)) (?:redmine )?issues"#, list_issues),
    (r#" update (?:issue )?#?(\d+)(?:\s*with\s*)?(?:[-:,])? "?([^"]+)"?"#, add_note),
    (r#" starting (?:issue )?#?(\d+) ?([^*]+)?"#, set_status),
    (
        r#" add (?:issue )?(?:\s*to\s*)?"?([^" ]+)"? (?:tracker\s)?(\d+)?(?:\s*with\s*)"?([^"]+)"?"#,
        create_issue,
    ),
    (r#" assign (?:issue )?#?(\d+) to (\w+)(?: "?([^"]+)"?)?"#, assign_issue),
    (r#"(?: show)?(?: me)? (?:issue )?#?(\d+)"#, show_issue),
    (r#" search (.+)"#, search),
    (r#" help\s*$"#, help),
];

struct CommandPattern {
    regex: Regex,
    extract: Extractor,
}

/// Compiled command patterns, tried in order against text already stripped of the bot name.
pub struct CommandTable {
    patterns: Vec<CommandPattern>,
}

impl CommandTable {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = PATTERNS
            .iter()
            .map(|(pattern, extract)| {
                Regex::new(&format!("{PREFIX}{pattern}"))
                    .map(|regex| CommandPattern { regex, extract: *extract })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// First pattern that matches and whose captures convert cleanly wins; a capture that
    /// fails conversion moves on to the next pattern.
    pub fn parse(&self, text: &str) -> Option<TrackerCommand> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.regex.captures(text)?;
            (pattern.extract)(&captures)
        })
    }
}

/// Returns the text after the bot's name when the message is addressed to the bot
/// (`redbot rm ...`, `@redbot: rm ...`, `Redbot, rm ...`).
pub fn strip_bot_name<'a>(text: &'a str, bot_name: &str) -> Option<&'a str> {
    let text = text.trim_start();
    let text = text.strip_prefix('@').unwrap_or(text);
    let head = text.get(..bot_name.len())?;
    if bot_name.is_empty() || !head.eq_ignore_ascii_case(bot_name) {
        return None;
    }

    let rest = &text[bot_name.len()..];
    let rest = rest.strip_prefix([':', ',']).unwrap_or(rest);
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

pub struct CommandRouter<S> {
    table: CommandTable,
    bot_name: String,
    service: S,
}

impl<S> CommandRouter<S>
where
    S: TrackerCommandService,
{
    pub fn new(bot_name: impl Into<String>, service: S) -> Result<Self, regex::Error> {
        Ok(Self { table: CommandTable::new()?, bot_name: bot_name.into(), service })
    }

    /// Parses a raw chat message. Messages not addressed to the bot, or matching no
    /// command, yield `None`.
    pub fn parse(&self, text: &str) -> Option<TrackerCommand> {
        let body = strip_bot_name(text, &self.bot_name)?;
        self.table.parse(body)
    }

    pub async fn route(
        &self,
        command: TrackerCommand,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError> {
        match command {
            TrackerCommand::LinkIssue { issue_id } => self.service.link_issue(issue_id).await,
            TrackerCommand::SetDoneRatio { issue_id, percent, comment } => {
                self.service.set_done_ratio(issue_id, percent, comment, sender).await
            }
            TrackerCommand::LogTime { issue_id, hours, comment } => {
                self.service.log_time(issue_id, hours, comment, sender).await
            }
            TrackerCommand::ListIssues { owner } => self.service.list_issues(owner, sender).await,
            TrackerCommand::AddNote { issue_id, note } => {
                self.service.add_note(issue_id, note, sender).await
            }
            TrackerCommand::SetStatus { issue_id, status } => {
                self.service.set_status(issue_id, status).await
            }
            TrackerCommand::CreateIssue { project, tracker_id, subject } => {
                self.service.create_issue(project, tracker_id, subject).await
            }
            TrackerCommand::AssignIssue { issue_id, user_name, note } => {
                self.service.assign_issue(issue_id, user_name, note, sender).await
            }
            TrackerCommand::ShowIssue { issue_id } => self.service.show_issue(issue_id).await,
            TrackerCommand::Search { query } => self.service.search(query).await,
            TrackerCommand::Help => Ok(vec![replies::help_message()]),
        }
    }
}

#[async_trait]
pub trait TrackerCommandService: Send + Sync {
    async fn link_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError>;

    async fn set_done_ratio(
        &self,
        issue_id: IssueId,
        percent: u32,
        comment: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn log_time(
        &self,
        issue_id: IssueId,
        hours: f64,
        comment: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn list_issues(
        &self,
        owner: IssueOwner,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn add_note(
        &self,
        issue_id: IssueId,
        note: String,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn set_status(
        &self,
        issue_id: IssueId,
        status: Option<String>,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn create_issue(
        &self,
        project: String,
        tracker_id: Option<u64>,
        subject: String,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn assign_issue(
        &self,
        issue_id: IssueId,
        user_name: String,
        note: Option<String>,
        sender: &str,
    ) -> Result<Vec<OutboundMessage>, BotError>;

    async fn show_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError>;

    async fn search(&self, query: String) -> Result<Vec<OutboundMessage>, BotError>;
}

fn link_issue(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::LinkIssue { issue_id: issue_id(captures, 1)? })
}

fn set_done_ratio(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::SetDoneRatio {
        issue_id: issue_id(captures, 1)?,
        percent: captures.get(2)?.as_str().parse().ok()?,
        comment: text(captures, 3),
    })
}

fn log_time(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::LogTime {
        hours: captures.get(1)?.as_str().parse().ok()?,
        issue_id: issue_id(captures, 2)?,
        comment: text(captures, 3),
    })
}

fn list_issues(captures: &Captures<'_>) -> Option<TrackerCommand> {
    let owner = match captures.get(1) {
        Some(name) => {
            let name = name.as_str().split('\'').next().unwrap_or_default().trim();
            if name.is_empty() {
                return None;
            }
            IssueOwner::Named(name.to_owned())
        }
        None => IssueOwner::Sender,
    };
    Some(TrackerCommand::ListIssues { owner })
}

fn add_note(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::AddNote { issue_id: issue_id(captures, 1)?, note: text(captures, 2)? })
}

fn set_status(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::SetStatus { issue_id: issue_id(captures, 1)?, status: text(captures, 2) })
}

fn create_issue(captures: &Captures<'_>) -> Option<TrackerCommand> {
    let tracker_id = match captures.get(2) {
        Some(raw) => Some(raw.as_str().parse().ok()?),
        None => None,
    };
    Some(TrackerCommand::CreateIssue {
        project: text(captures, 1)?,
        tracker_id,
        subject: text(captures, 3)?,
    })
}

fn assign_issue(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::AssignIssue {
        issue_id: issue_id(captures, 1)?,
        user_name: text(captures, 2)?,
        note: text(captures, 3),
    })
}

fn show_issue(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::ShowIssue { issue_id: issue_id(captures, 1)? })
}

fn search(captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::Search { query: text(captures, 1)? })
}

fn help(_captures: &Captures<'_>) -> Option<TrackerCommand> {
    Some(TrackerCommand::Help)
}

fn issue_id(captures: &Captures<'_>, group: usize) -> Option<IssueId> {
    captures.get(group)?.as_str().parse().ok().map(IssueId)
}

fn text(captures: &Captures<'_>, group: usize) -> Option<String> {
    captures
        .get(group)
        .map(|value| value.as_str().trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use redbot_core::{BotError, IssueId};

    use super::{
        strip_bot_name, CommandRouter, CommandTable, IssueOwner, TrackerCommand,
        TrackerCommandService,
    };
    use crate::replies::OutboundMessage;

    fn parse(text: &str) -> Option<TrackerCommand> {
        CommandTable::new().expect("patterns compile").parse(text)
    }

    #[test]
    fn strips_addressing_forms() {
        assert_eq!(strip_bot_name("redbot rm show 1", "redbot"), Some("rm show 1"));
        assert_eq!(strip_bot_name("  @Redbot: rm show 1", "redbot"), Some("rm show 1"));
        assert_eq!(strip_bot_name("redbot, rm show 1", "redbot"), Some("rm show 1"));
        assert_eq!(strip_bot_name("redbotx rm show 1", "redbot"), None);
        assert_eq!(strip_bot_name("rm show 1", "redbot"), None);
        assert_eq!(strip_bot_name("hey redbot rm show 1", "redbot"), None);
    }

    #[test]
    fn parses_link_and_show() {
        assert_eq!(parse("rm link me 42"), Some(TrackerCommand::LinkIssue { issue_id: IssueId(42) }));
        assert_eq!(
            parse("redmine link me issue #7"),
            Some(TrackerCommand::LinkIssue { issue_id: IssueId(7) })
        );
        for text in ["rm 42", "rm show 42", "rm show me 42", "RM SHOW ME ISSUE #42"] {
            assert_eq!(
                parse(text),
                Some(TrackerCommand::ShowIssue { issue_id: IssueId(42) }),
                "{text}"
            );
        }
    }

    #[test]
    fn done_ratio_accepts_three_digits_and_optional_comment() {
        assert_eq!(
            parse("rm set 42 to 150%"),
            Some(TrackerCommand::SetDoneRatio { issue_id: IssueId(42), percent: 150, comment: None })
        );
        assert_eq!(
            parse(r#"rm set issue #42 to 60% "halfway there""#),
            Some(TrackerCommand::SetDoneRatio {
                issue_id: IssueId(42),
                percent: 60,
                comment: Some("halfway there".to_owned()),
            })
        );
    }

    #[test]
    fn log_time_accepts_decimal_hours() {
        assert_eq!(
            parse(r#"rm add 1.5 hours to #42 "code review""#),
            Some(TrackerCommand::LogTime {
                issue_id: IssueId(42),
                hours: 1.5,
                comment: Some("code review".to_owned()),
            })
        );
        assert_eq!(
            parse("rm add 2 hour to issue 9"),
            Some(TrackerCommand::LogTime { issue_id: IssueId(9), hours: 2.0, comment: None })
        );
    }

    #[test]
    fn list_issues_distinguishes_sender_from_named_user() {
        assert_eq!(
            parse("rm show my issues"),
            Some(TrackerCommand::ListIssues { owner: IssueOwner::Sender })
        );
        assert_eq!(
            parse("rm show @alice's redmine issues"),
            Some(TrackerCommand::ListIssues { owner: IssueOwner::Named("alice".to_owned()) })
        );
        assert_eq!(
            parse("rm show bob issues"),
            Some(TrackerCommand::ListIssues { owner: IssueOwner::Named("bob".to_owned()) })
        );
    }

    #[test]
    fn update_takes_quoted_or_bare_notes() {
        let expected = Some(TrackerCommand::AddNote {
            issue_id: IssueId(42),
            note: "fixed in staging".to_owned(),
        });
        assert_eq!(parse(r#"rm update 42 with "fixed in staging""#), expected);
        assert_eq!(parse("rm update #42: fixed in staging"), expected);
    }

    #[test]
    fn starting_captures_optional_status() {
        assert_eq!(
            parse("rm starting 42"),
            Some(TrackerCommand::SetStatus { issue_id: IssueId(42), status: None })
        );
        assert_eq!(
            parse("rm starting issue 42 Resolved"),
            Some(TrackerCommand::SetStatus {
                issue_id: IssueId(42),
                status: Some("Resolved".to_owned())
            })
        );
    }

    #[test]
    fn add_issue_with_and_without_tracker() {
        assert_eq!(
            parse(r#"rm add issue to "website" tracker 2 with "Broken login""#),
            Some(TrackerCommand::CreateIssue {
                project: "website".to_owned(),
                tracker_id: Some(2),
                subject: "Broken login".to_owned(),
            })
        );
        assert_eq!(
            parse(r#"rm add website with "Dark mode""#),
            Some(TrackerCommand::CreateIssue {
                project: "website".to_owned(),
                tracker_id: None,
                subject: "Dark mode".to_owned(),
            })
        );
    }

    #[test]
    fn log_time_wins_over_add_issue() {
        assert!(matches!(parse("rm add 3 hours to 42"), Some(TrackerCommand::LogTime { .. })));
    }

    #[test]
    fn assign_and_search() {
        assert_eq!(
            parse(r#"rm assign 42 to alice "please review""#),
            Some(TrackerCommand::AssignIssue {
                issue_id: IssueId(42),
                user_name: "alice".to_owned(),
                note: Some("please review".to_owned()),
            })
        );
        assert_eq!(
            parse("rm search login timeout"),
            Some(TrackerCommand::Search { query: "login timeout".to_owned() })
        );
        assert_eq!(parse("rm help"), Some(TrackerCommand::Help));
    }

    #[test]
    fn overflowing_ids_do_not_match() {
        assert_eq!(parse("rm link me 99999999999999999999999"), None);
        assert_eq!(parse("rm show 99999999999999999999999"), None);
    }

    #[test]
    fn unknown_text_is_ignored() {
        assert_eq!(parse("rm dance"), None);
        assert_eq!(parse("show 42"), None);
        assert_eq!(parse("rm search   "), None);
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingService {
        fn record(&self, call: String) -> Result<Vec<OutboundMessage>, BotError> {
            self.calls.lock().expect("calls lock").push(call.clone());
            Ok(vec![OutboundMessage::reply(call)])
        }
    }

    #[async_trait]
    impl TrackerCommandService for RecordingService {
        async fn link_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("link {issue_id}"))
        }

        async fn set_done_ratio(
            &self,
            issue_id: IssueId,
            percent: u32,
            _comment: Option<String>,
            sender: &str,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("ratio {issue_id} {percent} by {sender}"))
        }

        async fn log_time(
            &self,
            issue_id: IssueId,
            hours: f64,
            _comment: Option<String>,
            sender: &str,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("time {issue_id} {hours} by {sender}"))
        }

        async fn list_issues(
            &self,
            owner: IssueOwner,
            sender: &str,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("list {owner:?} for {sender}"))
        }

        async fn add_note(
            &self,
            issue_id: IssueId,
            note: String,
            _sender: &str,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("note {issue_id} {note}"))
        }

        async fn set_status(
            &self,
            issue_id: IssueId,
            status: Option<String>,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("status {issue_id} {status:?}"))
        }

        async fn create_issue(
            &self,
            project: String,
            _tracker_id: Option<u64>,
            subject: String,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("create {project} {subject}"))
        }

        async fn assign_issue(
            &self,
            issue_id: IssueId,
            user_name: String,
            _note: Option<String>,
            _sender: &str,
        ) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("assign {issue_id} {user_name}"))
        }

        async fn show_issue(&self, issue_id: IssueId) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("show {issue_id}"))
        }

        async fn search(&self, query: String) -> Result<Vec<OutboundMessage>, BotError> {
            self.record(format!("search {query}"))
        }
    }

    #[tokio::test]
    async fn router_calls_service_entrypoints() {
        let router =
            CommandRouter::new("redbot", RecordingService::default()).expect("router builds");

        let cases = [
            ("redbot rm link me 1", "link 1"),
            ("redbot: rm set 2 to 50%", "ratio 2 50 by alice"),
            ("@redbot rm add 1.5 hours to 3", "time 3 1.5 by alice"),
            ("redbot rm show my issues", "list Sender for alice"),
            ("redbot rm update 4 with \"done\"", "note 4 done"),
            ("redbot rm starting 5 closed", "status 5 Some(\"closed\")"),
            ("redbot rm add issue to web with \"Crash\"", "create web Crash"),
            ("redbot rm assign 6 to bob", "assign 6 bob"),
            ("redbot rm show 7", "show 7"),
            ("redbot rm search crash", "search crash"),
        ];

        for (text, expected) in cases {
            let command = router.parse(text).expect("command parses");
            let replies = router.route(command, "alice").await.expect("route");
            assert_eq!(replies, vec![OutboundMessage::reply(expected)], "{text}");
        }

        assert_eq!(router.service.calls.lock().expect("calls lock").len(), cases.len());
    }

    #[tokio::test]
    async fn router_answers_help_without_service() {
        let router =
            CommandRouter::new("redbot", RecordingService::default()).expect("router builds");
        let command = router.parse("redbot rm help").expect("help parses");
        let replies = router.route(command, "alice").await.expect("route");

        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.contains("rm link me"));
        assert!(router.service.calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn unaddressed_messages_are_not_commands() {
        let router =
            CommandRouter::new("redbot", RecordingService::default()).expect("router builds");
        assert_eq!(router.parse("rm show 7"), None);
    }
}
