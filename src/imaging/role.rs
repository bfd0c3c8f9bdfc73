//! Semantic image roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the caller intends to do with an image. Only `Cover` is cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageRole {
    /// Portrait cover art, cropped to 2:3 around the subject.
    Cover,
    #[default]
    Backdrop,
    Thumb,
    Banner,
    Logo,
    Art,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Cover => "Cover",
            ImageRole::Backdrop => "Backdrop",
            ImageRole::Thumb => "Thumb",
            ImageRole::Banner => "Banner",
            ImageRole::Logo => "Logo",
            ImageRole::Art => "Art",
        }
    }

    /// Whether this role goes through face-aware cropping.
    pub fn is_cropped(&self) -> bool {
        matches!(self, ImageRole::Cover)
    }

    /// Parse a role, falling back to `Backdrop` for missing or unknown values.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown image role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ImageRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "cover" | "primary" | "poster" => ImageRole::Cover,
            "backdrop" => ImageRole::Backdrop,
            "thumb" => ImageRole::Thumb,
            "banner" => ImageRole::Banner,
            "logo" => ImageRole::Logo,
            "art" => ImageRole::Art,
            _ => return Err(UnknownRole(s.to_string())),
        };
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases_and_case() {
        assert_eq!("Primary".parse::<ImageRole>().unwrap(), ImageRole::Cover);
        assert_eq!(" poster ".parse::<ImageRole>().unwrap(), ImageRole::Cover);
        assert_eq!("BACKDROP".parse::<ImageRole>().unwrap(), ImageRole::Backdrop);
    }

    #[test]
    fn test_display_round_trips() {
        for role in [
            ImageRole::Cover,
            ImageRole::Backdrop,
            ImageRole::Thumb,
            ImageRole::Banner,
            ImageRole::Logo,
            ImageRole::Art,
        ] {
            assert_eq!(role.to_string().parse::<ImageRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_backdrop() {
        assert_eq!(ImageRole::parse_or_default(Some("Disc")), ImageRole::Backdrop);
        assert_eq!(ImageRole::parse_or_default(None), ImageRole::Backdrop);
        assert!(!ImageRole::parse_or_default(Some("Disc")).is_cropped());
    }
}
