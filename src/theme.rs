//! The closed catalog of portfolio themes and reply normalisation.

use crate::pipeline::reply::clean_reply;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named visual style from the fixed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Modern,
    Minimalist,
    DarkTheme,
    Creative,
    Corporate,
    Elegant,
    /// Fallback when the selector's reply is not in the catalog.
    #[default]
    Tech,
    Artistic,
    Classic,
    GridBased,
    Vibrant,
}

impl Theme {
    /// Every theme, in the order offered to the selector model.
    pub const ALL: [Theme; 11] = [
        Theme::Modern,
        Theme::Minimalist,
        Theme::DarkTheme,
        Theme::Creative,
        Theme::Corporate,
        Theme::Elegant,
        Theme::Tech,
        Theme::Artistic,
        Theme::Classic,
        Theme::GridBased,
        Theme::Vibrant,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Theme::Modern => "modern",
            Theme::Minimalist => "minimalist",
            Theme::DarkTheme => "dark_theme",
            Theme::Creative => "creative",
            Theme::Corporate => "corporate",
            Theme::Elegant => "elegant",
            Theme::Tech => "tech",
            Theme::Artistic => "artistic",
            Theme::Classic => "classic",
            Theme::GridBased => "grid_based",
            Theme::Vibrant => "vibrant",
        }
    }

    /// Parse a free-form model reply into a catalog label.
    ///
    /// Reasoning blocks and fences are removed, then the text is trimmed,
    /// lowercased, unquoted, stripped of a trailing period, and spaces or
    /// hyphens become underscores (`"Dark Theme"` → `dark_theme`).
    pub fn from_reply(reply: &str) -> Option<Theme> {
        normalise_label(reply).parse().ok()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .iter()
            .copied()
            .find(|t| t.label() == s)
            .ok_or_else(|| UnknownTheme(s.to_string()))
    }
}

/// A label outside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme '{0}' (expected one of: {labels})", labels = catalog())]
pub struct UnknownTheme(pub String);

/// Comma-separated catalog, for messages and help text.
pub fn catalog() -> String {
    Theme::ALL.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ")
}

pub(crate) fn normalise_label(reply: &str) -> String {
    let cleaned = clean_reply(reply).trim().to_lowercase();
    cleaned
        .trim_end_matches('.')
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim_end_matches('.')
        .trim()
        .replace([' ', '-'], "_")
}

/// The outcome of theme selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeChoice {
    pub theme: Theme,
    /// The model reply, or `None` when the theme was forced by configuration.
    pub raw_reply: Option<String>,
    /// True when the reply was not a catalog label and the default was used.
    pub fell_back: bool,
}

impl ThemeChoice {
    /// Resolve a model reply, falling back to [`Theme::default`].
    pub fn from_reply(reply: &str) -> Self {
        match Theme::from_reply(reply) {
            Some(theme) => Self {
                theme,
                raw_reply: Some(reply.to_string()),
                fell_back: false,
            },
            None => Self {
                theme: Theme::default(),
                raw_reply: Some(reply.to_string()),
                fell_back: true,
            },
        }
    }

    pub fn forced(theme: Theme) -> Self {
        Self {
            theme,
            raw_reply: None,
            fell_back: false,
        }
    }
}
