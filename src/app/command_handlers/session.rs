use crate::app::command_support::{http_orchestrator, load_settings};
use crate::app::session::{run_session, SessionDriver};
use std::io;

pub fn cmd_session(args: &[String]) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: session".to_string());
    }
    let settings = load_settings()?;
    tracing::info!(api_base = %settings.api_base, "session started");
    let mut driver = SessionDriver::new(http_orchestrator(&settings));
    let stdin = io::stdin();
    run_session(&mut driver, stdin.lock(), io::stdout())?;
    Ok("session ended".to_string())
}
