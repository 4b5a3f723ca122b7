use serde::{Deserialize, Serialize};

/// The two disjoint knowledge areas that partition both the passage corpora
/// and query routing. Each domain owns exactly one index collection;
/// domains never share passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// AngelOne brokerage support (trading, accounts, funds).
    AngelOne,
    /// Health-insurance plan coverage and benefits.
    Insurance,
}

impl Domain {
    pub fn all() -> [Self; 2] {
        [Self::AngelOne, Self::Insurance]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AngelOne => "AngelOne",
            Self::Insurance => "Insurance",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
