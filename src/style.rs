//! Map color themes
//!
//! A theme maps the six map roles to concrete hex colors. The built-in
//! themes are parsed once from TOML; further themes can be loaded from a
//! file and layered over them.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Theme used when a requested theme is unknown
pub const DEFAULT_THEME: &str = "light_minimal";

/// Errors that can occur when loading themes
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Failed to read theme file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse theme TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Theme '{theme}' has invalid {role} color '{value}'")]
    InvalidColor {
        theme: String,
        role: Role,
        value: String,
    },
    #[error("Theme '{0}' is defined more than once")]
    DuplicateTheme(String),
}

/// What a theme color is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Background,
    Roads,
    Buildings,
    Water,
    Green,
    Border,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Background,
        Role::Roads,
        Role::Buildings,
        Role::Water,
        Role::Green,
        Role::Border,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Background => "background",
            Role::Roads => "roads",
            Role::Buildings => "buildings",
            Role::Water => "water",
            Role::Green => "green",
            Role::Border => "border",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named color theme
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleTheme {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub background: String,
    pub roads: String,
    pub buildings: String,
    pub water: String,
    pub green: String,
    pub border: String,
}

impl StyleTheme {
    pub fn color(&self, role: Role) -> &str {
        match role {
            Role::Background => &self.background,
            Role::Roads => &self.roads,
            Role::Buildings => &self.buildings,
            Role::Water => &self.water,
            Role::Green => &self.green,
            Role::Border => &self.border,
        }
    }

    fn validate(&self) -> Result<(), ThemeError> {
        for role in Role::ALL {
            let value = self.color(role);
            if !is_hex_color(value) {
                return Err(ThemeError::InvalidColor {
                    theme: self.key.clone(),
                    role,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// `#rgb`, `#rrggbb` or `#rrggbbaa`
fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

#[derive(Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    theme: Vec<StyleTheme>,
}

const BUILTIN_THEMES: &str = r##"
[[theme]]
key = "light_minimal"
name = "Minimal Light"
description = "Clean, minimalist style with subtle colors"
background = "#ffffff"
roads = "#000000"
buildings = "#d9d9d9"
water = "#a6cbe8"
green = "#b5d2a7"
border = "#f5f5f5"

[[theme]]
key = "light_vintage"
name = "Vintage Light"
description = "Sepia-toned vintage map style"
background = "#f8f4e9"
roads = "#796e65"
buildings = "#d5c8b6"
water = "#b9d6cd"
green = "#aac092"
border = "#e8e0d0"

[[theme]]
key = "light_colorful"
name = "Colorful Light"
description = "Vibrant colors on light background"
background = "#fcfcfc"
roads = "#404040"
buildings = "#ffcc99"
water = "#3399ff"
green = "#66cc66"
border = "#f0f0f0"

[[theme]]
key = "light_blueprint"
name = "Blueprint"
description = "Technical drawing style with blue tones"
background = "#f5faff"
roads = "#336699"
buildings = "#99ccff"
water = "#3399cc"
green = "#ccffcc"
border = "#dbeeff"

[[theme]]
key = "dark_minimal"
name = "Minimal Dark"
description = "Modern dark theme with high contrast"
background = "#121212"
roads = "#e0e0e0"
buildings = "#3a3a3a"
water = "#4db8ff"
green = "#6ccf99"
border = "#333333"

[[theme]]
key = "dark_nightmode"
name = "Night Mode"
description = "Night-time map visualization"
background = "#0f1621"
roads = "#3a4559"
buildings = "#202a3a"
water = "#1e3c58"
green = "#1e3325"
border = "#1c2635"

[[theme]]
key = "dark_neon"
name = "Neon Dark"
description = "High-contrast neon colors on dark background"
background = "#0a0a0a"
roads = "#ff00ff"
buildings = "#333333"
water = "#00ccff"
green = "#33ff33"
border = "#222222"

[[theme]]
key = "dark_ember"
name = "Ember"
description = "Dark theme with warm color accents"
background = "#1a1a1a"
roads = "#e0a868"
buildings = "#404040"
water = "#407fb7"
green = "#5a8a5a"
border = "#2d2d2d"
"##;

/// Ordered registry of themes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleCatalog {
    themes: Vec<StyleTheme>,
}

impl StyleCatalog {
    /// The process-wide built-in catalog
    pub fn builtin() -> &'static StyleCatalog {
        static BUILTIN: OnceLock<StyleCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Self::from_str(BUILTIN_THEMES).expect("Built-in themes should be valid TOML")
        })
    }

    /// Load themes from a TOML string of `[[theme]]` tables
    pub fn from_str(content: &str) -> Result<Self, ThemeError> {
        let parsed: TomlCatalog = toml::from_str(content)?;
        let mut themes: Vec<StyleTheme> = Vec::with_capacity(parsed.theme.len());
        for theme in parsed.theme {
            theme.validate()?;
            if themes.iter().any(|t| t.key == theme.key) {
                return Err(ThemeError::DuplicateTheme(theme.key));
            }
            themes.push(theme);
        }
        Ok(Self { themes })
    }

    /// Load themes from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ThemeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Built-in themes with the themes of `path` layered on top
    pub fn with_file(path: &Path) -> Result<Self, ThemeError> {
        Ok(Self::builtin().clone().merged(Self::from_file(path)?))
    }

    /// Themes of `other` replace same-keyed themes and are appended otherwise
    pub fn merged(mut self, other: StyleCatalog) -> Self {
        for theme in other.themes {
            match self.themes.iter_mut().find(|t| t.key == theme.key) {
                Some(existing) => *existing = theme,
                None => self.themes.push(theme),
            }
        }
        self
    }

    pub fn lookup(&self, key: &str) -> Option<&StyleTheme> {
        self.themes.iter().find(|t| t.key == key)
    }

    /// Theme for `name`, falling back to the default theme
    ///
    /// Never fails: an unknown name logs a warning.
    pub fn resolve(&self, name: &str) -> StyleTheme {
        if let Some(theme) = self.lookup(name) {
            return theme.clone();
        }
        warn!("Style '{}' not found. Using default style '{}'", name, DEFAULT_THEME);
        self.lookup(DEFAULT_THEME)
            .or_else(|| Self::builtin().lookup(DEFAULT_THEME))
            .cloned()
            .expect("Built-in catalog should contain the default theme")
    }

    pub fn themes(&self) -> &[StyleTheme] {
        &self.themes
    }

    pub fn keys(&self) -> Vec<&str> {
        self.themes.iter().map(|t| t.key.as_str()).collect()
    }

    /// One line per theme: key, display name and description
    pub fn describe(&self) -> String {
        let mut out = String::from("Available color styles:\n");
        for theme in &self.themes {
            out.push_str(&format!(
                "- {}: {} - {}\n",
                theme.key, theme.name, theme.description
            ));
        }
        out
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::builtin().clone()
    }
}
