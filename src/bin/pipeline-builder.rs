use pipeline_builder::app::command_handlers;
use pipeline_builder::config::{default_state_root, load_global_settings};
use pipeline_builder::shared::logging::init_logging;

fn init_logging_from_settings() -> Result<(), String> {
    // An unreadable config must still reach the command, which reports it.
    let settings = load_global_settings().unwrap_or_default();
    let log_file = default_state_root()
        .ok()
        .and_then(|root| settings.resolved_log_file(&root));
    init_logging(&settings.log_level, log_file.as_deref())
}

fn run() -> Result<(), String> {
    init_logging_from_settings()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = command_handlers::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
