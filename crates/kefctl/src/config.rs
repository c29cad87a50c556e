//! CLI configuration: resolves the speaker and controller settings from
//! the config file, the selected profile and global flag overrides.

use std::time::Duration;

use clap::ValueEnum;

use kefctl_core::{ControllerConfig, Endpoint};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use kefctl_config::{
    Config, Defaults, Profile, config_path, controller_config, load_config, profile_endpoint,
    save_config,
};

/// Everything needed to talk to one speaker.
#[derive(Debug)]
pub struct Target {
    pub endpoint: Endpoint,
    pub controller: ControllerConfig,
}

/// Resolve the target speaker.
///
/// `--address` wins over any profile. Otherwise the named profile (or the
/// config's default profile) supplies the address.
pub fn resolve_target(global: &GlobalOpts, cfg: &Config) -> Result<Target, CliError> {
    let (endpoint, profile) = match global.address.as_deref() {
        Some(address) => {
            let endpoint = Endpoint::parse(address).map_err(|e| CliError::Validation {
                field: "address".into(),
                reason: format!("{address}: {e}"),
            })?;
            (endpoint, None)
        }
        None => {
            let profile = select_profile(global, cfg)?;
            (profile_endpoint(profile)?, Some(profile))
        }
    };

    let mut controller = controller_config(&cfg.defaults, profile);
    if let Some(secs) = global.timeout {
        controller.timeout = Duration::from_secs(secs.max(1));
    }

    Ok(Target {
        endpoint,
        controller,
    })
}

/// `-o` / `KEF_OUTPUT` wins; otherwise `defaults.output` from the config.
pub fn resolve_output(global: &GlobalOpts, defaults: &Defaults) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&defaults.output, true).map_err(|reason| CliError::Validation {
        field: "defaults.output".into(),
        reason,
    })
}

fn select_profile<'a>(global: &GlobalOpts, cfg: &'a Config) -> Result<&'a Profile, CliError> {
    let requested = global.profile.as_deref();
    match cfg.profile(requested) {
        Ok((_, profile)) => Ok(profile),
        // Without an explicit -p, a missing default just means nothing is
        // configured yet.
        Err(kefctl_config::ConfigError::ProfileNotFound { .. }) if requested.is_none() => {
            Err(CliError::NoSpeaker {
                path: config_path().display().to_string(),
            })
        }
        Err(kefctl_config::ConfigError::ProfileNotFound { name }) => {
            Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["kefctl"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with(name: &str, address: &str) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(name.into(), Profile::new(address));
        cfg
    }

    #[test]
    fn address_flag_overrides_profiles() {
        let cfg = config_with("default", "10.0.0.5");
        let target = resolve_target(&global(&["--address", "10.0.0.9"]), &cfg).unwrap();
        assert_eq!(target.endpoint.to_string(), "10.0.0.9");
    }

    #[test]
    fn default_profile_supplies_address_and_timeout_flag_applies() {
        let cfg = config_with("default", "speaker.local:8080");
        let target = resolve_target(&global(&["--timeout", "12"]), &cfg).unwrap();
        assert_eq!(target.endpoint.to_string(), "speaker.local:8080");
        assert_eq!(target.controller.timeout, Duration::from_secs(12));
    }

    #[test]
    fn nothing_configured_is_reported_as_no_speaker() {
        let err = resolve_target(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoSpeaker { .. }));
    }

    #[test]
    fn output_falls_back_to_config_default() {
        let mut defaults = Defaults::default();
        assert_eq!(
            resolve_output(&global(&[]), &defaults).unwrap(),
            OutputFormat::Table
        );

        defaults.output = "json-compact".into();
        assert_eq!(
            resolve_output(&global(&[]), &defaults).unwrap(),
            OutputFormat::JsonCompact
        );
        assert_eq!(
            resolve_output(&global(&["-o", "json"]), &defaults).unwrap(),
            OutputFormat::Json
        );
    }

    #[test]
    fn unknown_default_output_is_rejected() {
        let defaults = Defaults {
            output: "yaml".into(),
            ..Defaults::default()
        };
        let err = resolve_output(&global(&[]), &defaults).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn unknown_profile_lists_alternatives() {
        let cfg = config_with("desk", "10.0.0.5");
        let err = resolve_target(&global(&["-p", "kitchen"]), &cfg).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "kitchen");
                assert_eq!(available, "desk");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
