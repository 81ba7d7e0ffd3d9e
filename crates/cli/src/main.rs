use std::process::ExitCode;

fn main() -> ExitCode {
    redbot_cli::run()
}
