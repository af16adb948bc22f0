use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One isolated component of the mix that the service can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stem {
    Vocals,
    Instrumental,
}

impl Stem {
    pub const ALL: [Stem; 2] = [Stem::Vocals, Stem::Instrumental];

    pub fn label(self) -> &'static str {
        match self {
            Stem::Vocals => "vocals",
            Stem::Instrumental => "instrumental",
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requested output stems. Order is irrelevant; an empty set is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StemSet {
    stems: BTreeSet<Stem>,
}

impl StemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `stem`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, stem: Stem) -> bool {
        if self.stems.remove(&stem) {
            false
        } else {
            self.stems.insert(stem);
            true
        }
    }

    pub fn contains(&self, stem: Stem) -> bool {
        self.stems.contains(&stem)
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Stem> + '_ {
        self.stems.iter().copied()
    }
}

impl FromIterator<Stem> for StemSet {
    fn from_iter<I: IntoIterator<Item = Stem>>(iter: I) -> Self {
        Self {
            stems: iter.into_iter().collect(),
        }
    }
}

/// Container format requested when downloading a stem. Not part of job identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Mp3,
    Wav,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown output format `{0}` (expected mp3 or wav)")]
pub struct ParseFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "wav" => Ok(OutputFormat::Wav),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}
