//! `op` version parsing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::OpError;

/// Dotted numeric version reported by `op --version`.
///
/// Missing trailing components compare as zero, so `1.12` equals `1.12.0`.
#[derive(Debug, Clone, Eq)]
pub struct CliVersion {
    parts: Vec<u32>,
    raw: String,
}

impl CliVersion {
    /// Numeric components.
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    pub fn major(&self) -> u32 {
        self.part(0)
    }

    pub fn minor(&self) -> u32 {
        self.part(1)
    }

    fn part(&self, index: usize) -> u32 {
        self.parts.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for CliVersion {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        // tolerate a leading "v" and pre-release suffixes like "1.12.4-beta.01"
        let core = raw.strip_prefix('v').unwrap_or(raw);
        let core = core.split(['-', '+', ' ']).next().unwrap_or_default();
        if core.is_empty() {
            return Err(OpError::InvalidVersion(s.to_string()));
        }

        let parts = core
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| OpError::InvalidVersion(s.to_string()))?;

        Ok(Self {
            parts,
            raw: raw.to_string(),
        })
    }
}

impl PartialEq for CliVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for CliVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for CliVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CliVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
