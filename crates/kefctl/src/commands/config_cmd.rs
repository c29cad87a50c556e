//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, mut cfg: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => {
            add_profile(&mut cfg, init)?;
            let path = config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Configuration saved to {}", path.display());
            }
            Ok(())
        }
        ConfigCommand::Show => {
            let rendered = match global.output_format() {
                OutputFormat::Table => toml::to_string_pretty(&cfg)?,
                OutputFormat::Json => output::render_json_pretty(&cfg),
                OutputFormat::JsonCompact => output::render_json_compact(&cfg),
            };
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

/// Validate and insert a profile. The first profile, or one added with
/// `--set-default`, becomes the default.
fn add_profile(cfg: &mut Config, init: ConfigInitArgs) -> Result<(), CliError> {
    if init.name.trim().is_empty() {
        return Err(CliError::Validation {
            field: "name".into(),
            reason: "profile name cannot be empty".into(),
        });
    }
    if cfg.profiles.contains_key(&init.name) && !init.force {
        return Err(CliError::ProfileExists { name: init.name });
    }

    let mut profile = Profile::new(init.speaker);
    profile.timeout = init.profile_timeout;
    config::profile_endpoint(&profile)?;

    let first = cfg.profiles.is_empty();
    cfg.profiles.insert(init.name.clone(), profile);
    if first || init.set_default {
        cfg.default_profile = Some(init.name);
    }
    Ok(())
}
