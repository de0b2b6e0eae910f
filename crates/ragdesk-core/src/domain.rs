//! Knowledge domains served by the desk.

use serde::{Deserialize, Serialize};

/// A fixed knowledge area with its own document set and agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Salary,
    Insurance,
    /// Query matched no domain.
    Unknown,
}

impl Domain {
    /// Domains that own a knowledge index, in display order.
    pub const KNOWN: [Domain; 2] = [Domain::Salary, Domain::Insurance];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Insurance => "insurance",
            Self::Unknown => "unknown",
        }
    }

    /// Canonical source file for the domain, relative to the data directory.
    pub fn source_file(self) -> Option<&'static str> {
        match self {
            Self::Salary => Some("salary.txt"),
            Self::Insurance => Some("insurance.txt"),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Domain::Insurance).unwrap(), "\"insurance\"");
        let d: Domain = serde_json::from_str("\"salary\"").unwrap();
        assert_eq!(d, Domain::Salary);
    }

    #[test]
    fn test_source_files() {
        assert_eq!(Domain::Salary.source_file(), Some("salary.txt"));
        assert_eq!(Domain::Insurance.source_file(), Some("insurance.txt"));
        assert_eq!(Domain::Unknown.source_file(), None);
    }
}
