use std::path::PathBuf;

use overlay_edit::config::{
    load_config_flags, parse_flag_tokens, ConfigFlags, EnvOverrides, Settings,
};
use overlay_edit::session::ChangeDetection;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    let content = r#"
# comment
--parents

--mode 0644
   
--overlay-dir=/srv/overlays
--editor emacsclient -t
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.parents);
    assert_eq!(flags.mode, Some(0o644));
    assert_eq!(flags.overlay_dir, Some(PathBuf::from("/srv/overlays")));
    assert_eq!(flags.editor.as_deref(), Some("emacsclient -t"));
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    let content = "--parents\n--mode 0600\n--detect content\n--overlay-dir /file\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_flags = parse_flag_tokens(&["--mode=0640".to_string(), "--atomic".to_string()]);

    let settings = Settings::resolve(&file_flags, &cli_flags, &EnvOverrides::default());
    assert!(settings.create_dirs, "file flags should remain enabled");
    assert_eq!(settings.mode, 0o640, "cli should override mode");
    assert_eq!(
        settings.detection,
        ChangeDetection::Content,
        "file config should be preserved when CLI does not override"
    );
    assert_eq!(settings.overlay_dir, PathBuf::from("/file"));
}

#[test]
fn test_environment_overlay_dir_beats_file() {
    let file = ConfigFlags {
        overlay_dir: Some(PathBuf::from("/file")),
        ..ConfigFlags::default()
    };
    let env = EnvOverrides {
        editor: None,
        overlay_dir: Some(PathBuf::from("/env")),
    };
    let settings = Settings::resolve(&file, &ConfigFlags::default(), &env);
    assert_eq!(settings.overlay_dir, PathBuf::from("/env"));
}
