use crate::app::command_support::{map_config_err, preference_store};
use crate::config::{resolve_theme, PreferenceStore, Theme};

pub fn cmd_theme(args: &[String]) -> Result<String, String> {
    let store = preference_store()?;
    apply_theme_command(&store, args)
}

pub fn apply_theme_command(store: &dyn PreferenceStore, args: &[String]) -> Result<String, String> {
    let action = match args {
        [] => "show",
        [action] => action.as_str(),
        _ => return Err("usage: theme [show|light|dark|toggle]".to_string()),
    };
    let theme = match action {
        "show" => resolve_theme(store).map_err(map_config_err)?,
        "toggle" => {
            let next = resolve_theme(store).map_err(map_config_err)?.toggled();
            store.set_theme(next).map_err(map_config_err)?;
            next
        }
        other => {
            let theme = Theme::parse(other)?;
            store.set_theme(theme).map_err(map_config_err)?;
            theme
        }
    };
    Ok(format!("theme={theme}"))
}
