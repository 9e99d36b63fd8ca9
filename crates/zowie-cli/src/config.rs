//! Resolution of the target device from the config file, the selected
//! profile, and command-line overrides.

use secrecy::SecretString;

use zowie_config::{Config, Profile};
use zowie_core::DeviceConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Profile name in effect: `--profile`, else the file's default.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `DeviceConfig` for the active profile with flag overrides
/// applied (flag > env > profile).
pub fn resolve_device(global: &GlobalOpts, config: &Config) -> Result<DeviceConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let mut profile = match config.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            let host = global.host.clone().ok_or_else(|| CliError::NoConfig {
                path: zowie_config::config_path().display().to_string(),
            })?;
            Profile {
                host,
                username: "admin".into(),
                password: None,
                password_env: None,
                timeout: None,
                scan_interval: None,
                managed_source_name: None,
            }
        }
    };

    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    if let Some(ref password) = global.password {
        profile.password = Some(password.clone());
    }

    let mut device = zowie_config::profile_to_device_config(config, &profile, &profile_name)?;
    if let Some(ref password) = global.password {
        device.password = SecretString::from(password.clone());
    }
    Ok(device)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["zowie"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_stage() -> Config {
        let mut config = Config::default();
        config.profiles.insert(
            "stage".into(),
            Profile {
                host: "192.168.10.20".into(),
                username: "admin".into(),
                password: Some("stage-pass".into()),
                password_env: None,
                timeout: Some(4),
                scan_interval: None,
                managed_source_name: None,
            },
        );
        config
    }

    #[test]
    fn flags_override_profile() {
        let opts = global(&[
            "--profile",
            "stage",
            "--host",
            "10.1.1.1",
            "--username",
            "operator",
            "--password",
            "flag-pass",
        ]);
        let device = resolve_device(&opts, &config_with_stage()).unwrap();

        assert_eq!(device.url.as_str(), "http://10.1.1.1/");
        assert_eq!(device.username, "operator");
        assert_eq!(device.password.expose_secret(), "flag-pass");
        assert_eq!(device.timeout.as_secs(), 4);
    }

    #[test]
    fn host_flag_without_profile() {
        let opts = global(&["--host", "10.1.1.2", "--password", "pw"]);
        let device = resolve_device(&opts, &Config::default()).unwrap();
        assert_eq!(device.url.as_str(), "http://10.1.1.2/");
        assert_eq!(device.username, "admin");
    }

    #[test]
    fn unknown_profile_lists_available() {
        let opts = global(&["--profile", "booth"]);
        let err = resolve_device(&opts, &config_with_stage()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "booth");
                assert_eq!(available, "stage");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nothing_configured() {
        let opts = global(&[]);
        let err = resolve_device(&opts, &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
