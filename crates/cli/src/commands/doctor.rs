use redbot_core::config::{AppConfig, LoadOptions, TrackerSettings};
use redbot_tracker::RedmineClient;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    match report.overall_status {
        CheckStatus::Fail => CommandResult::failed(output),
        CheckStatus::Pass | CheckStatus::Skipped => CommandResult::ok(output),
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_mention_listener(&config));

            match config.redmine.settings() {
                Ok(settings) => {
                    checks.push(DoctorCheck::new(
                        "tracker_settings",
                        CheckStatus::Pass,
                        format!("tracker at `{}`", settings.base_url),
                    ));
                    checks.push(check_tracker_connectivity(&settings));
                }
                Err(error) => {
                    checks.push(DoctorCheck::new("tracker_settings", CheckStatus::Fail, error.to_string()));
                    checks.push(skipped_connectivity("tracker settings are incomplete"));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["mention_listener", "tracker_settings"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
            checks.push(skipped_connectivity("configuration did not load"));
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let (overall_status, summary) = if any_failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_mention_listener(config: &AppConfig) -> DoctorCheck {
    match config.mention.pattern() {
        Ok(Some(pattern)) => DoctorCheck::new(
            "mention_listener",
            CheckStatus::Pass,
            format!("listening for `{pattern}` (capture {})", config.mention.match_index),
        ),
        Ok(None) => DoctorCheck::new(
            "mention_listener",
            CheckStatus::Skipped,
            "mention.regex is unset; listener disabled",
        ),
        Err(error) => DoctorCheck::new("mention_listener", CheckStatus::Fail, error.to_string()),
    }
}

fn skipped_connectivity(reason: &str) -> DoctorCheck {
    DoctorCheck::new("tracker_connectivity", CheckStatus::Skipped, format!("skipped because {reason}"))
}

fn check_tracker_connectivity(settings: &TrackerSettings) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                "tracker_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let client = RedmineClient::new(settings)?;
        client.current_user().await
    });

    match result {
        Ok(user) => DoctorCheck::new(
            "tracker_connectivity",
            CheckStatus::Pass,
            format!("authenticated as `{}`", user.login),
        ),
        Err(error) => DoctorCheck::new("tracker_connectivity", CheckStatus::Fail, error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
