//! Layered defaults for command-line flags.
//!
//! The defaults file holds ordinary flag tokens (`--parents`, `--mode 0644`,
//! ...) with `#` comments. It lives only in the user's config directory,
//! never the working directory, since it can name the editor to run. The
//! file, the environment and the command line are merged into one
//! [`Settings`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::commit::{CommitStrategy, DEFAULT_FILE_MODE};
use crate::overlay::DEFAULT_OVERLAY_DIR;
use crate::session::{ChangeDetection, EditorCommand};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub parents: bool,
    pub atomic: bool,
    pub debug: bool,
    pub mode: Option<u32>,
    pub overlay_dir: Option<PathBuf>,
    pub editor: Option<String>,
    pub detect: Option<ChangeDetection>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            parents: self.parents || other.parents,
            atomic: self.atomic || other.atomic,
            debug: self.debug || other.debug,
            mode: other.mode.or(self.mode),
            overlay_dir: other
                .overlay_dir
                .clone()
                .or_else(|| self.overlay_dir.clone()),
            editor: other.editor.clone().or_else(|| self.editor.clone()),
            detect: other.detect.or(self.detect),
        }
    }
}

/// Values taken from the process environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `EDITOR`
    pub editor: Option<String>,
    /// `OVERLAY_EDIT_DIR`
    pub overlay_dir: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            editor: std::env::var("EDITOR").ok().filter(|v| !v.trim().is_empty()),
            overlay_dir: std::env::var_os("OVERLAY_EDIT_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub create_dirs: bool,
    pub mode: u32,
    pub overlay_dir: PathBuf,
    pub editor: EditorCommand,
    pub detection: ChangeDetection,
    pub strategy: CommitStrategy,
    pub debug: bool,
}

impl Settings {
    /// Merge defaults files, environment and command line.
    ///
    /// Valued options on the command line win, then the environment, then
    /// the files. Boolean flags are on if any layer sets them.
    pub fn resolve(file: &ConfigFlags, cli: &ConfigFlags, env: &EnvOverrides) -> Self {
        let merged = file.union(cli);
        let editor = cli
            .editor
            .as_deref()
            .or(env.editor.as_deref())
            .or(file.editor.as_deref())
            .map_or_else(EditorCommand::default, EditorCommand::parse);
        let overlay_dir = cli
            .overlay_dir
            .clone()
            .or_else(|| env.overlay_dir.clone())
            .or_else(|| file.overlay_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERLAY_DIR));
        Self {
            create_dirs: merged.parents,
            mode: merged.mode.unwrap_or(DEFAULT_FILE_MODE),
            overlay_dir,
            editor,
            detection: merged.detect.unwrap_or_default(),
            strategy: if merged.atomic {
                CommitStrategy::Atomic
            } else {
                CommitStrategy::InPlace
            },
            debug: merged.debug,
        }
    }
}

/// Location of the defaults file, if a config directory is known.
pub fn global_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("overlay-edit").join("config"))
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let mut tokens = Vec::new();
    for line in content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
    {
        // Editor commands and paths may contain spaces; keep the rest of the line.
        if let Some((flag, rest)) = split_valued_line(line) {
            tokens.push(flag.to_string());
            tokens.push(rest.to_string());
        } else {
            tokens.extend(line.split_whitespace().map(ToOwned::to_owned));
        }
    }
    Ok(parse_flag_tokens(&tokens))
}

fn split_valued_line(line: &str) -> Option<(&str, &str)> {
    ["--editor", "--overlay-dir"].into_iter().find_map(|flag| {
        let rest = line.strip_prefix(flag)?;
        let value = rest
            .strip_prefix('=')
            .or_else(|| rest.strip_prefix(char::is_whitespace))?
            .trim();
        (!value.is_empty()).then_some((flag, value))
    })
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# overlay-edit defaults (saved with --save)".to_string());
    if flags.parents {
        lines.push("--parents".to_string());
    }
    if flags.atomic {
        lines.push("--atomic".to_string());
    }
    if flags.debug {
        lines.push("--debug".to_string());
    }
    if let Some(mode) = flags.mode {
        lines.push(format!("--mode {mode:04o}"));
    }
    if let Some(dir) = &flags.overlay_dir {
        lines.push(format!("--overlay-dir {}", dir.display()));
    }
    if let Some(editor) = &flags.editor {
        lines.push(format!("--editor {editor}"));
    }
    if let Some(detect) = flags.detect {
        let detect_str = match detect {
            ChangeDetection::Mtime => "mtime",
            ChangeDetection::Content => "content",
        };
        lines.push(format!("--detect {detect_str}"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Extract known flags from a token list. Unknown tokens are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let next = tokens.get(i + 1).map(String::as_str);
        match token {
            "--parents" | "-p" => flags.parents = true,
            "--atomic" => flags.atomic = true,
            "--debug" | "-d" => flags.debug = true,
            "--mode" | "-m" => {
                if let Some(value) = next {
                    flags.mode = parse_mode(value).ok();
                    i += 1;
                }
            }
            "--overlay-dir" => {
                if let Some(value) = next {
                    flags.overlay_dir = Some(PathBuf::from(value));
                    i += 1;
                }
            }
            "--editor" => {
                if let Some(value) = next {
                    flags.editor = Some(value.to_string());
                    i += 1;
                }
            }
            "--detect" => {
                if let Some(value) = next {
                    flags.detect = parse_detect(value);
                    i += 1;
                }
            }
            _ => {
                if let Some(value) = token.strip_prefix("--mode=") {
                    flags.mode = parse_mode(value).ok();
                } else if let Some(value) = token.strip_prefix("--overlay-dir=") {
                    flags.overlay_dir = Some(PathBuf::from(value));
                } else if let Some(value) = token.strip_prefix("--editor=") {
                    flags.editor = Some(value.to_string());
                } else if let Some(value) = token.strip_prefix("--detect=") {
                    flags.detect = parse_detect(value);
                }
            }
        }
        i += 1;
    }
    flags
}

/// Parse an octal permission mode such as `0644`, `644` or `0o644`.
///
/// # Errors
/// Returns a message if `s` is not octal or exceeds `0o7777`.
pub fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("invalid octal permission mode: {s}"))?;
    if mode > 0o7777 {
        return Err(format!("permission mode out of range: {s}"));
    }
    Ok(mode)
}

fn parse_detect(s: &str) -> Option<ChangeDetection> {
    match s {
        "mtime" => Some(ChangeDetection::Mtime),
        "content" => Some(ChangeDetection::Content),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = tokens(&[
            "overlay-edit",
            "-p",
            "--mode",
            "0644",
            "--detect=content",
            "--editor",
            "nano -w",
            "--atomic",
            "compute",
            "etc/motd",
        ]);
        let flags = parse_flag_tokens(&args);
        assert!(flags.parents);
        assert!(flags.atomic);
        assert!(!flags.debug);
        assert_eq!(flags.mode, Some(0o644));
        assert_eq!(flags.detect, Some(ChangeDetection::Content));
        assert_eq!(flags.editor.as_deref(), Some("nano -w"));
        assert_eq!(flags.overlay_dir, None);
    }

    #[test]
    fn test_parse_mode_accepts_octal_forms() {
        assert_eq!(parse_mode("0755"), Ok(0o755));
        assert_eq!(parse_mode("644"), Ok(0o644));
        assert_eq!(parse_mode("0o600"), Ok(0o600));
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("17777").is_err());
        assert!(parse_mode("rw-r--r--").is_err());
    }

    #[test]
    fn test_resolve_precedence_cli_env_file_default() {
        let file = ConfigFlags {
            editor: Some("nano".to_string()),
            overlay_dir: Some(PathBuf::from("/file/overlays")),
            mode: Some(0o600),
            parents: true,
            ..ConfigFlags::default()
        };
        let env = EnvOverrides {
            editor: Some("vim".to_string()),
            overlay_dir: None,
        };

        let settings = Settings::resolve(&file, &ConfigFlags::default(), &env);
        assert_eq!(settings.editor, EditorCommand::parse("vim"));
        assert_eq!(settings.overlay_dir, PathBuf::from("/file/overlays"));
        assert_eq!(settings.mode, 0o600);
        assert!(settings.create_dirs);

        let cli = ConfigFlags {
            editor: Some("code --wait".to_string()),
            mode: Some(0o644),
            atomic: true,
            ..ConfigFlags::default()
        };
        let settings = Settings::resolve(&file, &cli, &env);
        assert_eq!(settings.editor.program(), "code");
        assert_eq!(settings.mode, 0o644);
        assert_eq!(settings.strategy, CommitStrategy::Atomic);
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(
            &ConfigFlags::default(),
            &ConfigFlags::default(),
            &EnvOverrides::default(),
        );
        assert_eq!(settings.editor, EditorCommand::default());
        assert_eq!(settings.overlay_dir, PathBuf::from(DEFAULT_OVERLAY_DIR));
        assert_eq!(settings.mode, DEFAULT_FILE_MODE);
        assert_eq!(settings.detection, ChangeDetection::Mtime);
        assert_eq!(settings.strategy, CommitStrategy::InPlace);
        assert!(!settings.create_dirs);
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config");
        let flags = ConfigFlags {
            parents: true,
            atomic: true,
            debug: true,
            mode: Some(0o640),
            overlay_dir: Some(PathBuf::from("/srv/my overlays")),
            editor: Some("code --wait".to_string()),
            detect: Some(ChangeDetection::Content),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_valued_lines_keep_embedded_spaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(
            &path,
            "--overlay-dir=/srv/my overlays\n--editor=emacsclient -t\n--mode 0600 --parents\n",
        )
        .unwrap();

        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded.overlay_dir, Some(PathBuf::from("/srv/my overlays")));
        assert_eq!(loaded.editor.as_deref(), Some("emacsclient -t"));
        assert_eq!(loaded.mode, Some(0o600));
        assert!(loaded.parents);
    }

    #[test]
    fn test_split_valued_line_requires_separator() {
        assert_eq!(split_valued_line("--editor vim"), Some(("--editor", "vim")));
        assert_eq!(split_valued_line("--editorx vim"), None);
        assert_eq!(split_valued_line("--overlay-dir"), None);
        assert_eq!(split_valued_line("--parents"), None);
    }
}
