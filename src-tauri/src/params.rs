//! Generation parameters: strength and output format.
//!
//! The live values sit in managed state and are mutated from the UI; the
//! runner takes a by-value copy of [`GenParams`] when a batch starts, so a
//! running batch never sees a mid-flight parameter change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STRENGTH_MIN: u8 = 1;
pub const STRENGTH_MAX: u8 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("strength must be between {STRENGTH_MIN} and {STRENGTH_MAX}, got {0}")]
    StrengthOutOfRange(u32),
    #[error("unknown output format '{0}' (expected png or exr)")]
    UnknownFormat(String),
}

/// Output format literal passed verbatim to the conversion tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Exr,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Exr => "exr",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(OutputFormat::Png),
            "exr" => Ok(OutputFormat::Exr),
            other => Err(ParamError::UnknownFormat(other.to_string())),
        }
    }
}

/// Gradient strength, validated into `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Strength(u8);

impl Strength {
    pub fn new(value: u32) -> Result<Self, ParamError> {
        if (STRENGTH_MIN as u32..=STRENGTH_MAX as u32).contains(&value) {
            Ok(Strength(value as u8))
        } else {
            Err(ParamError::StrengthOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Strength {
    fn default() -> Self {
        Strength(2)
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current generation parameters. Copied at batch start; the copy is the
/// snapshot handed to the job runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenParams {
    pub strength: Strength,
    pub format: OutputFormat,
}
