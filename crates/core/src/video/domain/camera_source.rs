use std::fmt;

use serde::Deserialize;

/// Where frames come from.
///
/// A bare integer (in YAML or on the command line) selects a local capture
/// device by index; anything else is a file path or stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawSource")]
pub enum CameraSource {
    Device(u32),
    Location(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Index(u32),
    Text(String),
}

impl From<RawSource> for CameraSource {
    fn from(raw: RawSource) -> Self {
        match raw {
            RawSource::Index(i) => Self::Device(i),
            RawSource::Text(s) => Self::parse(&s),
        }
    }
}

impl CameraSource {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        match trimmed.parse::<u32>() {
            Ok(index) => Self::Device(index),
            Err(_) => Self::Location(trimmed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Location(s) if s.is_empty())
    }
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(i) => write!(f, "camera #{i}"),
            Self::Location(s) => f.write_str(s),
        }
    }
}
