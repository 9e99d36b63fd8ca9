//! Config inspection commands. These never contact a device.

use serde_json::Value;
use tabled::Tabled;
use zowie_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Default")]
    default: String,
}

#[derive(serde::Serialize)]
struct ProfileSummary {
    name: String,
    host: String,
    username: String,
    default: bool,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = zowie_config::config_path();
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let config = zowie_config::load_config_or_default();
            let value = redacted(&config)?;
            let out = output::render_single(
                &global.output,
                &value,
                |v| serde_json::to_string_pretty(v).unwrap_or_default(),
                |_| path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        ConfigCommand::Profiles => {
            let config = zowie_config::load_config_or_default();
            let default = config.default_profile.as_deref().unwrap_or("default");
            let mut profiles: Vec<ProfileSummary> = config
                .profiles
                .iter()
                .map(|(name, profile)| ProfileSummary {
                    name: name.clone(),
                    host: profile.host.clone(),
                    username: profile.username.clone(),
                    default: name == default,
                })
                .collect();
            profiles.sort_by(|a, b| a.name.cmp(&b.name));

            let out = output::render_list(
                &global.output,
                &profiles,
                |p| ProfileRow {
                    name: p.name.clone(),
                    host: p.host.clone(),
                    username: p.username.clone(),
                    default: if p.default { "*".into() } else { String::new() },
                },
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// The config as JSON with plaintext passwords masked.
fn redacted(config: &Config) -> Result<Value, CliError> {
    let mut value = serde_json::to_value(config)?;
    if let Some(profiles) = value.get_mut("profiles").and_then(Value::as_object_mut) {
        for profile in profiles.values_mut() {
            if let Some(password) = profile.get_mut("password").filter(|p| !p.is_null()) {
                *password = Value::String("********".into());
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zowie_config::Profile;

    use super::*;

    #[test]
    fn passwords_are_masked() {
        let mut config = Config::default();
        config.profiles.insert(
            "stage".into(),
            Profile {
                host: "10.0.0.5".into(),
                username: "admin".into(),
                password: Some("hunter2".into()),
                password_env: None,
                timeout: None,
                scan_interval: None,
                managed_source_name: None,
            },
        );

        let value = redacted(&config).unwrap();
        assert_eq!(value["profiles"]["stage"]["password"], "********");
        assert_eq!(value["profiles"]["stage"]["host"], "10.0.0.5");
    }
}
