#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Session,
    Theme,
    Config,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "session" => CliVerb::Session,
        "theme" => CliVerb::Theme,
        "config" => CliVerb::Config,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  run --file <path> --target <column> --model <logistic|decision-tree>".to_string(),
        "      [--standardize] [--normalize] [--test-fraction <f>]".to_string(),
        "      [--preview-page <n>] [--report-page <n>] [--save-matrix <path.png>]".to_string(),
        "                                       Walk every stage of one pipeline run".to_string(),
        "  session                              Drive a pipeline interactively from stdin"
            .to_string(),
        "  theme [show|light|dark|toggle]       Show or change the theme preference".to_string(),
        "  config                               Print the settings path and values".to_string(),
        "  help                                 Show this message".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_and_unknown_falls_through() {
        assert_eq!(parse_cli_verb("run"), CliVerb::Run);
        assert_eq!(parse_cli_verb("session"), CliVerb::Session);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("deploy"), CliVerb::Unknown);
    }

    #[test]
    fn help_lists_every_verb() {
        let help = help_text();
        for verb in ["run", "session", "theme", "config", "help"] {
            assert!(help.contains(&format!("  {verb}")), "missing {verb}");
        }
    }
}
