//! Configuration loading for rdir.
//!
//! A small optional TOML file tweaks defaults; everything works without it.
//! The path is `~/.config/rdir/rdir.toml`, overridable with `RDIR_CONFIG`.
//! A missing file yields defaults, a malformed file is a startup error.

use serde::Deserialize;

use std::collections::HashMap;
use std::path::PathBuf;

/// Default head sample size for previews.
const DEFAULT_PREVIEW_LIMIT: usize = 256 * 1024;
/// Default cap on global search results.
const DEFAULT_MAX_SEARCH_RESULTS: usize = 2000;

/// Runtime configuration, resolved from the optional config file.
#[derive(Debug, Clone)]
pub struct Config {
    show_hidden: bool,
    tab_width: usize,
    preview_limit: usize,
    max_search_results: usize,
    editor_cmd: Option<String>,
    pager_cmd: Option<String>,
    clipboard_cmd: Option<String>,
    theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_hidden: false,
            tab_width: crate::core::text::TAB_WIDTH,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            editor_cmd: None,
            pager_cmd: None,
            clipboard_cmd: None,
            theme: Theme::default(),
        }
    }
}

/// The raw serde shape of the config file; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    show_hidden: Option<bool>,
    tab_width: Option<usize>,
    preview_limit: Option<usize>,
    max_search_results: Option<usize>,
    editor: Option<ToolSection>,
    pager: Option<ToolSection>,
    clipboard: Option<ToolSection>,
    theme: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolSection {
    cmd: Option<String>,
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        if let Ok(custom) = std::env::var("RDIR_CONFIG") {
            return PathBuf::from(custom);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rdir")
            .join("rdir.toml")
    }

    /// Loads the config file, returning defaults when it does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        let Ok(raw_text) = std::fs::read_to_string(&path) else {
            return Ok(Self::default());
        };
        let raw: RawConfig = toml::from_str(&raw_text)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            show_hidden: raw.show_hidden.unwrap_or(defaults.show_hidden),
            tab_width: raw.tab_width.unwrap_or(defaults.tab_width).clamp(1, 16),
            preview_limit: raw
                .preview_limit
                .unwrap_or(defaults.preview_limit)
                .clamp(4 * 1024, 16 * 1024 * 1024),
            max_search_results: raw
                .max_search_results
                .unwrap_or(defaults.max_search_results)
                .clamp(15, 1_000_000),
            editor_cmd: raw.editor.and_then(|t| t.cmd),
            pager_cmd: raw.pager.and_then(|t| t.cmd),
            clipboard_cmd: raw.clipboard.and_then(|t| t.cmd),
            theme: Theme::from_map(raw.theme.unwrap_or_default()),
        }
    }

    // Getters / accessors

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    pub fn max_search_results(&self) -> usize {
        self.max_search_results
    }

    pub fn editor_cmd(&self) -> Option<&str> {
        self.editor_cmd.as_deref()
    }

    pub fn pager_cmd(&self) -> Option<&str> {
        self.pager_cmd.as_deref()
    }

    pub fn clipboard_cmd(&self) -> Option<&str> {
        self.clipboard_cmd.as_deref()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

/// Theme colors, each overridable by name in the `[theme]` table.
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: ratatui::style::Color,
    pub selection_bg: ratatui::style::Color,
    pub directory: ratatui::style::Color,
    pub symlink: ratatui::style::Color,
    pub hidden: ratatui::style::Color,
    pub heading: ratatui::style::Color,
    pub code: ratatui::style::Color,
    pub link: ratatui::style::Color,
    pub rule: ratatui::style::Color,
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Color;
        Self {
            accent: Color::Cyan,
            selection_bg: Color::DarkGray,
            directory: Color::Blue,
            symlink: Color::Magenta,
            hidden: Color::DarkGray,
            heading: Color::Yellow,
            code: Color::Green,
            link: Color::Cyan,
            rule: Color::DarkGray,
        }
    }
}

impl Theme {
    fn from_map(map: HashMap<String, String>) -> Self {
        let mut theme = Self::default();
        for (key, value) in &map {
            let color = parse_color(value);
            match key.as_str() {
                "accent" => theme.accent = color,
                "selection_bg" => theme.selection_bg = color,
                "directory" => theme.directory = color,
                "symlink" => theme.symlink = color,
                "hidden" => theme.hidden = color,
                "heading" => theme.heading = color,
                "code" => theme.code = color,
                "link" => theme.link = color,
                "rule" => theme.rule = color,
                _ => {}
            }
        }
        theme
    }
}

/// Parses a color name or `#RRGGBB`/`#RGB` hex value.
pub fn parse_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;
    match s.to_lowercase().as_str() {
        "default" | "reset" => Color::Reset,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "black" => Color::Black,
        "gray" => Color::Gray,
        "darkgray" => Color::DarkGray,
        _ => {
            if let Some(hex) = s.strip_prefix('#') {
                let expanded = if hex.len() == 3 {
                    hex.chars().flat_map(|c| [c, c]).collect::<String>()
                } else {
                    hex.to_string()
                };
                if expanded.len() == 6
                    && let Ok(rgb) = u32::from_str_radix(&expanded, 16)
                {
                    return Color::Rgb(
                        ((rgb >> 16) & 0xFF) as u8,
                        ((rgb >> 8) & 0xFF) as u8,
                        (rgb & 0xFF) as u8,
                    );
                }
            }
            Color::Reset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn defaults_without_file() {
        let config = Config::from_raw(RawConfig::default());
        assert!(!config.show_hidden());
        assert_eq!(config.tab_width(), 4);
        assert_eq!(config.preview_limit(), DEFAULT_PREVIEW_LIMIT);
    }

    #[test]
    fn raw_overrides_apply_and_clamp() {
        let raw: RawConfig = toml::from_str(
            r#"
            show_hidden = true
            tab_width = 99
            [editor]
            cmd = "hx"
            "#,
        )
        .expect("parse");
        let config = Config::from_raw(raw);
        assert!(config.show_hidden());
        assert_eq!(config.tab_width(), 16, "tab width clamps to sane range");
        assert_eq!(config.editor_cmd(), Some("hx"));
    }

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color("red"), Color::Red);
        assert_eq!(parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(parse_color("#f00"), Color::Rgb(255, 0, 0));
        assert_eq!(parse_color("bogus"), Color::Reset);
    }

    #[test]
    fn theme_map_overrides() {
        let mut map = HashMap::new();
        map.insert("accent".to_string(), "#00ff00".to_string());
        let theme = Theme::from_map(map);
        assert_eq!(theme.accent, Color::Rgb(0, 255, 0));
        assert_eq!(theme.directory, Color::Blue);
    }
}
