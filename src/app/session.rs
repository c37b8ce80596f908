//! Line-oriented interactive session driving one pipeline run.

use crate::app::render::{
    render_preview, render_progress, render_report_page, render_results_summary, render_split,
    render_status, stage_message,
};
use crate::pipeline::{
    validators, AdvanceOutcome, PipelineError, PipelineOrchestrator, Stage, StageDraft,
};
use crate::remote::{PreprocessStep, RunService, UploadFile};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const SESSION_EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit"];
pub const SESSION_PROMPT: &str = "pipeline> ";
const TERMINAL_STAGE_NOTE: &str = "terminal stage; reset to start over";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    File(PathBuf),
    Target(String),
    Step(PreprocessStep),
    Fraction(f64),
    Model(String),
    Next,
    Back,
    Reset,
    Preview(u32),
    Report(u32),
    Results,
    Matrix(PathBuf),
    Status,
    Help,
    Exit,
}

pub fn is_session_exit_command(line: &str) -> bool {
    SESSION_EXIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

fn parse_page(raw: Option<&str>) -> Result<u32, String> {
    match raw {
        None => Ok(1),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| format!("page must be a positive number, got `{raw}`")),
    }
}

fn required<'a>(value: Option<&'a str>, usage: &str) -> Result<&'a str, String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("usage: {usage}"))
}

pub fn parse_session_command(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    if is_session_exit_command(line) {
        return Ok(SessionCommand::Exit);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, Some(rest.trim())),
        None => (line, None),
    };
    match verb.to_ascii_lowercase().as_str() {
        "file" => Ok(SessionCommand::File(PathBuf::from(required(
            rest,
            "file <path>",
        )?))),
        "target" => Ok(SessionCommand::Target(
            required(rest, "target <column>")?.to_string(),
        )),
        "step" => PreprocessStep::parse(required(rest, "step <standardize|normalize>")?)
            .map(SessionCommand::Step),
        "fraction" => {
            let raw = required(rest, "fraction <0..1>")?;
            raw.parse::<f64>()
                .map(SessionCommand::Fraction)
                .map_err(|_| format!("fraction must be a number, got `{raw}`"))
        }
        "model" => Ok(SessionCommand::Model(
            required(rest, "model <logistic|decision-tree>")?.to_string(),
        )),
        "next" => Ok(SessionCommand::Next),
        "back" => Ok(SessionCommand::Back),
        "reset" => Ok(SessionCommand::Reset),
        "preview" => parse_page(rest).map(SessionCommand::Preview),
        "report" => parse_page(rest).map(SessionCommand::Report),
        "results" => Ok(SessionCommand::Results),
        "matrix" => Ok(SessionCommand::Matrix(PathBuf::from(required(
            rest,
            "matrix <path.png>",
        )?))),
        "status" => Ok(SessionCommand::Status),
        "help" | "?" => Ok(SessionCommand::Help),
        other => Err(format!("unknown command `{other}`; type `help`")),
    }
}

pub fn session_help_text() -> String {
    [
        "Commands:",
        "  file <path>                 Select a CSV or Excel file to upload",
        "  target <column>             Choose the column to predict",
        "  step <standardize|normalize> Toggle a preprocessing step",
        "  fraction <0..1>             Set the test fraction (default 0.2)",
        "  model <logistic|decision-tree> Choose the model to train",
        "  next                        Advance to the next stage",
        "  back                        Return to the previous stage",
        "  reset                       Start a new pipeline",
        "  preview [page]              Show a page of the uploaded dataset",
        "  report [page]               Show a page of the classification report",
        "  results                     Show the results summary",
        "  matrix <path.png>           Save the confusion matrix image",
        "  status                      Show the current run",
        "  exit                        Leave the session",
    ]
    .join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionReply {
    Continue(String),
    Exit,
}

pub struct SessionDriver<S> {
    orchestrator: PipelineOrchestrator<S>,
    draft: StageDraft,
}

impl<S: RunService> SessionDriver<S> {
    pub fn new(orchestrator: PipelineOrchestrator<S>) -> Self {
        Self {
            orchestrator,
            draft: StageDraft::default(),
        }
    }

    pub fn orchestrator(&self) -> &PipelineOrchestrator<S> {
        &self.orchestrator
    }

    pub fn draft(&self) -> &StageDraft {
        &self.draft
    }

    pub fn handle_line(&mut self, line: &str) -> SessionReply {
        if line.trim().is_empty() {
            return SessionReply::Continue(String::new());
        }
        let command = match parse_session_command(line) {
            Ok(command) => command,
            Err(err) => return SessionReply::Continue(format!("error: {err}")),
        };
        if command == SessionCommand::Exit {
            return SessionReply::Exit;
        }
        match self.execute(command) {
            Ok(text) => SessionReply::Continue(text),
            Err(err) => SessionReply::Continue(format!("error: {err}")),
        }
    }

    fn execute(&mut self, command: SessionCommand) -> Result<String, String> {
        match command {
            SessionCommand::File(path) => self.select_file(&path),
            SessionCommand::Target(column) => {
                self.draft.target = Some(column.clone());
                Ok(format!("target={column}"))
            }
            SessionCommand::Step(step) => {
                let on = self.draft.toggle_step(step);
                Ok(format!("{step}={}", if on { "on" } else { "off" }))
            }
            SessionCommand::Fraction(fraction) => {
                validators::split_ready(fraction).map_err(|e| e.to_string())?;
                self.draft.test_fraction = fraction;
                Ok(render_split(self.draft.split_ratio()))
            }
            SessionCommand::Model(model) => {
                self.draft.model = Some(model.clone());
                Ok(format!("model={model}"))
            }
            SessionCommand::Next => self.next(),
            SessionCommand::Back => {
                let stage = self.orchestrator.retreat();
                Ok(render_progress(stage))
            }
            SessionCommand::Reset => {
                self.orchestrator.reset();
                self.draft = StageDraft::default();
                Ok(format!("pipeline reset\n{}", render_progress(Stage::FIRST)))
            }
            SessionCommand::Preview(page) => self
                .orchestrator
                .preview_page(page)
                .map(|view| render_preview(&view))
                .map_err(describe),
            SessionCommand::Report(page) => self
                .orchestrator
                .report_page(page)
                .map(|view| render_report_page(&view))
                .map_err(describe),
            SessionCommand::Results => self
                .orchestrator
                .fetch_results()
                .map(|report| render_results_summary(&report))
                .map_err(describe),
            SessionCommand::Matrix(path) => self.save_matrix(&path),
            SessionCommand::Status => Ok(self.status()),
            SessionCommand::Help => Ok(session_help_text()),
            SessionCommand::Exit => Ok(String::new()),
        }
    }

    fn select_file(&mut self, path: &Path) -> Result<String, String> {
        let file = UploadFile::from_path(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let text = format!("selected {} ({} bytes)", file.filename, file.bytes.len());
        self.draft.file = Some(file);
        Ok(text)
    }

    fn next(&mut self) -> Result<String, String> {
        let stage = self.orchestrator.current_stage();
        if stage.is_terminal() {
            return Ok(TERMINAL_STAGE_NOTE.to_string());
        }
        let outcome = self
            .orchestrator
            .advance(self.draft.input_for(stage))
            .map_err(describe)?;
        let (from, to) = match outcome {
            AdvanceOutcome::Advanced { from, to } => (from, to),
            AdvanceOutcome::Recorded { stage } => {
                return Ok(format!("{stage} data recorded; stage unchanged"))
            }
            AdvanceOutcome::Discarded => {
                return Ok("response discarded; the run was reset".to_string())
            }
        };
        let mut lines = Vec::new();
        if let Some(message) = from
            .data_key()
            .and_then(|key| stage_message(&self.orchestrator.snapshot(), key).map(str::to_string))
        {
            lines.push(message);
        }
        lines.push(render_progress(to));
        match to {
            Stage::Preview => match self.orchestrator.preview_page(1) {
                Ok(view) => lines.push(render_preview(&view)),
                Err(err) => lines.push(format!("error: {}", describe(err))),
            },
            Stage::Split => lines.push(render_split(self.draft.split_ratio())),
            Stage::Results => match self.orchestrator.report_page(1) {
                Ok(view) => {
                    if let Some(report) = self.orchestrator.results() {
                        lines.push(render_results_summary(&report));
                    }
                    lines.push(render_report_page(&view));
                }
                Err(err) => lines.push(format!("error: {}", describe(err))),
            },
            _ => {}
        }
        Ok(lines.join("\n"))
    }

    fn save_matrix(&self, path: &Path) -> Result<String, String> {
        let report = match self.orchestrator.results() {
            Some(report) => report,
            None => self.orchestrator.fetch_results().map_err(describe)?,
        };
        let png = report
            .confusion_matrix_png()
            .map_err(|e| format!("confusion matrix is not valid base64: {e}"))?;
        fs::write(path, &png).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        Ok(format!("saved {} ({} bytes)", path.display(), png.len()))
    }

    fn status(&self) -> String {
        let run = self.orchestrator.snapshot();
        let mut lines = vec![render_status(&run)];
        let input = self.draft.input_for(run.current_stage());
        let readiness = if run.current_stage().is_terminal() {
            TERMINAL_STAGE_NOTE.to_string()
        } else {
            match validators::check_entry(&run, &input) {
                Ok(()) => "ready to advance".to_string(),
                Err(err) => format!("not ready: {err}"),
            }
        };
        lines.push(readiness);
        lines.join("\n")
    }
}

fn describe(err: PipelineError) -> String {
    err.to_string()
}

/// Reads commands until end of input or an exit command.
pub fn run_session<S, R, W>(
    driver: &mut SessionDriver<S>,
    input: R,
    mut output: W,
) -> Result<(), String>
where
    S: RunService,
    R: BufRead,
    W: Write,
{
    let write_err = |e: std::io::Error| format!("failed to write session output: {e}");
    writeln!(output, "{}", render_progress(Stage::FIRST)).map_err(write_err)?;
    write!(output, "{SESSION_PROMPT}").map_err(write_err)?;
    output.flush().map_err(write_err)?;
    for line in input.lines() {
        let line = line.map_err(|e| format!("failed to read session input: {e}"))?;
        match driver.handle_line(&line) {
            SessionReply::Exit => break,
            SessionReply::Continue(text) => {
                if !text.is_empty() {
                    writeln!(output, "{text}").map_err(write_err)?;
                }
            }
        }
        write!(output, "{SESSION_PROMPT}").map_err(write_err)?;
        output.flush().map_err(write_err)?;
    }
    writeln!(output).map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_are_case_insensitive() {
        assert!(is_session_exit_command("EXIT"));
        assert!(is_session_exit_command("Quit"));
        assert!(!is_session_exit_command("next"));
    }

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(
            parse_session_command("target  label"),
            Ok(SessionCommand::Target("label".to_string()))
        );
        assert_eq!(
            parse_session_command("step Normalize"),
            Ok(SessionCommand::Step(PreprocessStep::Normalize))
        );
        assert_eq!(
            parse_session_command("fraction 0.25"),
            Ok(SessionCommand::Fraction(0.25))
        );
        assert_eq!(parse_session_command("preview"), Ok(SessionCommand::Preview(1)));
        assert_eq!(parse_session_command("report 2"), Ok(SessionCommand::Report(2)));
    }

    #[test]
    fn malformed_commands_explain_usage() {
        assert_eq!(
            parse_session_command("target"),
            Err("usage: target <column>".to_string())
        );
        assert!(parse_session_command("fraction abc")
            .expect_err("not a number")
            .contains("must be a number"));
        assert!(parse_session_command("launch")
            .expect_err("unknown")
            .contains("unknown command"));
    }
}
