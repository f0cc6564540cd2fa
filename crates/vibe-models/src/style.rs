//! Narration style definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Narration style requested from the analysis endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Everyday spoken English
    #[default]
    Casual,
    /// Short sentences, common vocabulary
    Beginner,
    /// Descriptive, richer vocabulary
    Literary,
}

impl Style {
    pub const ALL: &'static [Style] = &[Style::Casual, Style::Beginner, Style::Literary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Casual => "casual",
            Style::Beginner => "beginner",
            Style::Literary => "literary",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Style {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "casual" => Ok(Style::Casual),
            "beginner" => Ok(Style::Beginner),
            "literary" => Ok(Style::Literary),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid style: {0}")]
pub struct StyleParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("casual".parse::<Style>().unwrap(), Style::Casual);
        assert_eq!("Beginner".parse::<Style>().unwrap(), Style::Beginner);
        assert_eq!(" literary ".parse::<Style>().unwrap(), Style::Literary);
        assert!("poetic".parse::<Style>().is_err());
    }

    #[test]
    fn test_style_serde_roundtrip_names() {
        for style in Style::ALL {
            let json = serde_json::to_string(style).unwrap();
            assert_eq!(json, format!("\"{}\"", style.as_str()));
        }
    }
}
