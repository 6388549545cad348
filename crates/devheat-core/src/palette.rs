//! Heatmap color palette names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned for a palette name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown palette {name:?}, expected one of: github, blue, mono, sunset")]
pub struct UnknownPalette {
    name: String,
}

/// The color palette used to render a heatmap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Github,
    Blue,
    Mono,
    Sunset,
}

impl Palette {
    /// All palettes.
    pub const ALL: [Palette; 4] = [Palette::Github, Palette::Blue, Palette::Mono, Palette::Sunset];

    /// Returns the palette name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Blue => "blue",
            Self::Mono => "mono",
            Self::Sunset => "sunset",
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Palette {
    type Err = UnknownPalette;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|palette| palette.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPalette {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_palettes() {
        assert_eq!("github".parse::<Palette>(), Ok(Palette::Github));
        assert_eq!("Blue".parse::<Palette>(), Ok(Palette::Blue));
        assert_eq!(" mono ".parse::<Palette>(), Ok(Palette::Mono));
        assert_eq!("sunset".parse::<Palette>(), Ok(Palette::Sunset));
    }

    #[test]
    fn reject_unknown_palette() {
        let err = "rainbow".parse::<Palette>().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"unknown palette "rainbow", expected one of: github, blue, mono, sunset"#);
        assert!("".parse::<Palette>().is_err());
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for palette in Palette::ALL {
            assert_eq!(palette.to_string().parse::<Palette>(), Ok(palette));
        }
    }
}
