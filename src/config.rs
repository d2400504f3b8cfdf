use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Every tunable of the runtime, with the theme's stock defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeConfig {
    /// Length of one animation frame on the virtual clock.
    pub frame_ms: u64,
    /// Viewport width at and above which the page counts as desktop.
    pub breakpoint_px: f64,
    /// Debounce for breakpoint re-evaluation after resizes.
    pub media_debounce_ms: u64,
    /// Carousels with at most this many slides stay unmounted on desktop.
    pub max_desktop_slides: usize,
    /// Visible fraction below which autoplay pauses.
    pub autoplay_visibility_threshold: f64,
    /// Margin around the viewport for lazy media detection.
    pub lazy_root_margin: f64,
    pub lazy_threshold: f64,
    /// Debounce for height recomputation after width changes.
    pub resize_debounce_ms: u64,
    /// Scroll offset below which the sticky bar is always shown.
    pub scroll_threshold: f64,
    /// Scroll movements smaller than this are ignored.
    pub scroll_hysteresis: f64,
    /// Idle-callback fallback delay (and starvation limit).
    pub idle_timeout_ms: u64,
    pub hover_leave_delay_ms: u64,
    pub focus_delay_ms: u64,
    /// Placeholder fade-out before it removes itself.
    pub placeholder_fade_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16,
            breakpoint_px: 992.0,
            media_debounce_ms: 250,
            max_desktop_slides: 4,
            autoplay_visibility_threshold: 0.1,
            lazy_root_margin: 100.0,
            lazy_threshold: 0.01,
            resize_debounce_ms: 150,
            scroll_threshold: 200.0,
            scroll_hysteresis: 20.0,
            idle_timeout_ms: 100,
            hover_leave_delay_ms: 200,
            focus_delay_ms: 100,
            placeholder_fade_ms: 300,
        }
    }
}

/// Defaults persisted in a flags file, merged with command-line flags.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub breakpoint: Option<f64>,
    pub max_slides: Option<usize>,
    pub media_debounce: Option<u64>,
    pub resize_debounce: Option<u64>,
    pub scroll_threshold: Option<f64>,
    pub hysteresis: Option<f64>,
    pub idle_timeout: Option<u64>,
    pub save_data: bool,
    pub no_idle_callbacks: bool,
    pub debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans are OR-ed, options from `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            breakpoint: other.breakpoint.or(self.breakpoint),
            max_slides: other.max_slides.or(self.max_slides),
            media_debounce: other.media_debounce.or(self.media_debounce),
            resize_debounce: other.resize_debounce.or(self.resize_debounce),
            scroll_threshold: other.scroll_threshold.or(self.scroll_threshold),
            hysteresis: other.hysteresis.or(self.hysteresis),
            idle_timeout: other.idle_timeout.or(self.idle_timeout),
            save_data: self.save_data || other.save_data,
            no_idle_callbacks: self.no_idle_callbacks || other.no_idle_callbacks,
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
        }
    }

    /// Overlay the set flags onto `base`.
    pub fn apply(&self, base: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            breakpoint_px: self.breakpoint.unwrap_or(base.breakpoint_px),
            max_desktop_slides: self.max_slides.unwrap_or(base.max_desktop_slides),
            media_debounce_ms: self.media_debounce.unwrap_or(base.media_debounce_ms),
            resize_debounce_ms: self.resize_debounce.unwrap_or(base.resize_debounce_ms),
            scroll_threshold: self.scroll_threshold.unwrap_or(base.scroll_threshold),
            scroll_hysteresis: self.hysteresis.unwrap_or(base.scroll_hysteresis),
            idle_timeout_ms: self.idle_timeout.unwrap_or(base.idle_timeout_ms),
            ..base
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("theme-runtime").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("theme-runtime")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("theme-runtime").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("theme-runtime")
                .join("config");
        }
    }

    PathBuf::from(".themerc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".themerc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# theme-runtime defaults (saved with --save)".to_string()];
    if let Some(v) = flags.breakpoint {
        lines.push(format!("--breakpoint {v}"));
    }
    if let Some(v) = flags.max_slides {
        lines.push(format!("--max-slides {v}"));
    }
    if let Some(v) = flags.media_debounce {
        lines.push(format!("--media-debounce {v}"));
    }
    if let Some(v) = flags.resize_debounce {
        lines.push(format!("--resize-debounce {v}"));
    }
    if let Some(v) = flags.scroll_threshold {
        lines.push(format!("--scroll-threshold {v}"));
    }
    if let Some(v) = flags.hysteresis {
        lines.push(format!("--hysteresis {v}"));
    }
    if let Some(v) = flags.idle_timeout {
        lines.push(format!("--idle-timeout {v}"));
    }
    if flags.save_data {
        lines.push("--save-data".to_string());
    }
    if flags.no_idle_callbacks {
        lines.push("--no-idle-callbacks".to_string());
    }
    if let Some(path) = &flags.debug_log {
        lines.push(format!("--debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
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

const VALUE_FLAGS: [&str; 8] = [
    "--breakpoint",
    "--max-slides",
    "--media-debounce",
    "--resize-debounce",
    "--scroll-threshold",
    "--hysteresis",
    "--idle-timeout",
    "--debug-log",
];

/// Pick known flags out of a token list; unknown tokens and unparsable
/// values are ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        let value = if !VALUE_FLAGS.contains(&name) {
            None
        } else if inline.is_some() {
            inline
        } else if let Some(next) = tokens.get(i + 1) {
            i += 1;
            Some(next.as_str())
        } else {
            None
        };
        match name {
            "--save-data" => flags.save_data = true,
            "--no-idle-callbacks" => flags.no_idle_callbacks = true,
            "--breakpoint" => flags.breakpoint = value.and_then(|v| v.parse().ok()),
            "--max-slides" => flags.max_slides = value.and_then(|v| v.parse().ok()),
            "--media-debounce" => flags.media_debounce = value.and_then(|v| v.parse().ok()),
            "--resize-debounce" => flags.resize_debounce = value.and_then(|v| v.parse().ok()),
            "--scroll-threshold" => flags.scroll_threshold = value.and_then(|v| v.parse().ok()),
            "--hysteresis" => flags.hysteresis = value.and_then(|v| v.parse().ok()),
            "--idle-timeout" => flags.idle_timeout = value.and_then(|v| v.parse().ok()),
            "--debug-log" => flags.debug_log = value.map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    flags
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
            "theme-runtime",
            "--breakpoint",
            "1024",
            "--max-slides=3",
            "--save-data",
            "--debug-log",
            "trace.log",
            "page.json",
        ]);
        let flags = parse_flag_tokens(&args);
        assert_eq!(flags.breakpoint, Some(1024.0));
        assert_eq!(flags.max_slides, Some(3));
        assert!(flags.save_data);
        assert_eq!(flags.debug_log, Some(PathBuf::from("trace.log")));
    }

    #[test]
    fn test_unparsable_values_are_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--breakpoint", "wide", "--hysteresis=20"]));
        assert_eq!(flags.breakpoint, None);
        assert_eq!(flags.hysteresis, Some(20.0));
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            save_data: true,
            breakpoint: Some(768.0),
            max_slides: Some(2),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            breakpoint: Some(1200.0),
            no_idle_callbacks: true,
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.save_data);
        assert!(merged.no_idle_callbacks);
        assert_eq!(merged.breakpoint, Some(1200.0));
        assert_eq!(merged.max_slides, Some(2));
    }

    #[test]
    fn test_apply_only_overrides_set_fields() {
        let flags = ConfigFlags {
            breakpoint: Some(768.0),
            hysteresis: Some(10.0),
            ..ConfigFlags::default()
        };
        let config = flags.apply(RuntimeConfig::default());
        assert_eq!(config.breakpoint_px, 768.0);
        assert_eq!(config.scroll_hysteresis, 10.0);
        assert_eq!(config.max_desktop_slides, 4);
        assert_eq!(config.media_debounce_ms, 250);
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".themerc");
        let flags = ConfigFlags {
            breakpoint: Some(1100.0),
            max_slides: Some(5),
            media_debounce: Some(300),
            resize_debounce: Some(120),
            scroll_threshold: Some(240.0),
            hysteresis: Some(12.5),
            idle_timeout: Some(80),
            save_data: true,
            no_idle_callbacks: true,
            debug_log: Some(PathBuf::from("trace.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let flags = load_config_flags(&dir.path().join("absent")).unwrap();
        assert_eq!(flags, ConfigFlags::default());
    }
}
