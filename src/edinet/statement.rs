use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// The three statement tables extracted from every filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum StatementKind {
    #[serde(rename = "BS")]
    BalanceSheet,
    #[serde(rename = "PL")]
    IncomeStatement,
    #[serde(rename = "CF")]
    CashFlow,
}

impl StatementKind {
    pub fn code(&self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "BS",
            StatementKind::IncomeStatement => "PL",
            StatementKind::CashFlow => "CF",
        }
    }

    pub fn all() -> impl Iterator<Item = StatementKind> {
        StatementKind::iter()
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for StatementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BS" => Ok(StatementKind::BalanceSheet),
            "PL" => Ok(StatementKind::IncomeStatement),
            "CF" => Ok(StatementKind::CashFlow),
            other => Err(format!("Unknown statement kind: {}", other)),
        }
    }
}

/// Everything that gets published for a filing: one artifact set per
/// statement plus the fundamentals projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArtifactKind {
    Statement(StatementKind),
    Fundamentals,
}

impl ArtifactKind {
    pub fn code(&self) -> &'static str {
        match self {
            ArtifactKind::Statement(kind) => kind.code(),
            ArtifactKind::Fundamentals => "Fundamentals",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fundamentals" => Ok(ArtifactKind::Fundamentals),
            other => other.parse().map(ArtifactKind::Statement),
        }
    }
}

impl TryFrom<String> for ArtifactKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ArtifactKind> for String {
    fn from(kind: ArtifactKind) -> Self {
        kind.code().to_string()
    }
}

impl From<StatementKind> for ArtifactKind {
    fn from(kind: StatementKind) -> Self {
        ArtifactKind::Statement(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Consolidated,
    Solo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Taxonomy {
    #[serde(rename = "jgaap")]
    Domestic,
    #[serde(rename = "ifrs")]
    Ifrs,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Consolidated => write!(f, "consolidated"),
            Scope::Solo => write!(f, "solo"),
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Taxonomy::Domestic => write!(f, "jgaap"),
            Taxonomy::Ifrs => write!(f, "ifrs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in StatementKind::all() {
            assert_eq!(kind.code().parse::<StatementKind>(), Ok(kind));
        }
        assert!("Fundamentals".parse::<StatementKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_as_code() {
        let json = serde_json::to_string(&StatementKind::CashFlow).unwrap();
        assert_eq!(json, "\"CF\"");
    }

    #[test]
    fn test_artifact_kind_codes() {
        assert_eq!("Fundamentals".parse::<ArtifactKind>(), Ok(ArtifactKind::Fundamentals));
        assert_eq!(
            "PL".parse::<ArtifactKind>(),
            Ok(ArtifactKind::Statement(StatementKind::IncomeStatement))
        );
        assert!("XX".parse::<ArtifactKind>().is_err());
        let json = serde_json::to_string(&ArtifactKind::from(StatementKind::BalanceSheet)).unwrap();
        assert_eq!(json, "\"BS\"");
    }
}
