//! overlay-edit - edit a provisioning overlay file in your editor.
//!
//! # Usage
//!
//! ```bash
//! overlay-edit compute etc/motd
//! overlay-edit --parents compute etc/ssh/sshd_config.ww
//! EDITOR=nano overlay-edit --mode 0644 compute etc/hosts
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use overlay_edit::config::{
    clear_config_flags, global_config_path, load_config_flags, parse_mode, save_config_flags,
    ConfigFlags, EnvOverrides, Settings,
};
use overlay_edit::prelude::*;

/// Edit a file in an overlay
#[derive(Parser, Debug)]
#[command(name = "overlay-edit", version, about, long_about = None)]
struct Cli {
    /// Overlay name
    #[arg(value_name = "OVERLAY")]
    overlay: String,

    /// File to edit, relative to the overlay
    #[arg(value_name = "FILE")]
    file: String,

    /// Create any missing parent directories
    #[arg(short, long)]
    parents: bool,

    /// Permission mode for a newly created file (octal)
    #[arg(short, long, value_parser = parse_mode, value_name = "MODE")]
    mode: Option<u32>,

    /// Directory holding the overlays
    #[arg(long, value_name = "DIR")]
    overlay_dir: Option<PathBuf>,

    /// Editor command (defaults to $EDITOR, then /bin/vi)
    #[arg(long, value_name = "CMD")]
    editor: Option<String>,

    /// How to decide whether the file was changed
    #[arg(long, value_enum)]
    detect: Option<ChangeDetection>,

    /// Replace the file by renaming a temporary copy into place
    #[arg(long)]
    atomic: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            parents: self.parents,
            atomic: self.atomic,
            debug: self.debug,
            mode: self.mode,
            overlay_dir: self.overlay_dir.clone(),
            editor: self.editor.clone(),
            detect: self.detect,
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("overlay_edit={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let cli_flags = cli.flags();
    let config_path = global_config_path();

    if cli.save || cli.clear {
        let Some(path) = config_path.as_deref() else {
            anyhow::bail!("No config directory: set XDG_CONFIG_HOME or HOME");
        };
        if cli.clear {
            clear_config_flags(path)?;
        }
        if cli.save {
            save_config_flags(path, &cli_flags)?;
        }
    }

    let file_flags = match config_path.as_deref() {
        Some(path) if !cli.clear => load_config_flags(path)?,
        _ => ConfigFlags::default(),
    };
    Ok(Settings::resolve(
        &file_flags,
        &cli_flags,
        &EnvOverrides::from_env(),
    ))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            init_logging(cli.debug);
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(settings.debug);

    let registry = OverlayRegistry::new(&settings.overlay_dir);
    let options = EditOptions {
        create_dirs: settings.create_dirs,
        mode: settings.mode,
        detection: settings.detection,
        strategy: settings.strategy,
        ..EditOptions::default()
    };
    let request = EditRequest::new(cli.overlay, cli.file);

    match edit_overlay_file(&request, &registry, &settings.editor, &options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
