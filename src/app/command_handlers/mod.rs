use crate::app::cli::{help_text, parse_cli_verb, CliVerb};

pub mod config;
pub mod run;
pub mod session;
pub mod theme;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Run => run::cmd_run(&args[1..]),
        CliVerb::Session => session::cmd_session(&args[1..]),
        CliVerb::Theme => theme::cmd_theme(&args[1..]),
        CliVerb::Config => config::cmd_config(&args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
