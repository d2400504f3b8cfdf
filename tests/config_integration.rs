use std::path::PathBuf;

use theme_runtime::config::{ConfigFlags, RuntimeConfig, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".themerc");
    let content = r"
# comment
--save-data

--breakpoint 1024
   
--debug-log=runtime.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.save_data);
    assert_eq!(flags.breakpoint, Some(1024.0));
    assert_eq!(flags.debug_log, Some(PathBuf::from("runtime.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".themerc");
    let content = "--save-data\n--max-slides 3\n--debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "theme-runtime".to_string(),
        "--max-slides".to_string(),
        "6".to_string(),
        "--no-idle-callbacks".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.save_data, "file flags should remain enabled");
    assert!(effective.no_idle_callbacks, "cli flags should be applied");
    assert_eq!(effective.max_slides, Some(6), "cli should override max slides");
    assert_eq!(
        effective.debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "theme-runtime".to_string(),
        "--scroll-threshold=250".to_string(),
        "--idle-timeout=50".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.scroll_threshold, Some(250.0));
    assert_eq!(flags.idle_timeout, Some(50));
}

#[test]
fn test_effective_flags_reach_runtime_config() {
    let file = ConfigFlags {
        media_debounce: Some(400),
        ..ConfigFlags::default()
    };
    let cli = parse_flag_tokens(&["--resize-debounce".to_string(), "90".to_string()]);
    let config = file.union(&cli).apply(RuntimeConfig::default());
    assert_eq!(config.media_debounce_ms, 400);
    assert_eq!(config.resize_debounce_ms, 90);
    assert_eq!(config.frame_ms, 16);
}
