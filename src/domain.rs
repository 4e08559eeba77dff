use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TaxLookupError;

pub const LINNEAN_RANKS: [&str; 8] = [
    "superkingdom",
    "kingdom",
    "phylum",
    "class",
    "order",
    "family",
    "genus",
    "species",
];

pub const ALL_RANKS_KEYWORD: &str = "all";
pub const NAMED_RANKS_KEYWORD: &str = "named";
pub const LINNEAN_KEYWORD: &str = "linnean";
pub const NO_RANK: &str = "no rank";

/// Opaque taxon identifier. Never compared numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxonId(String);

impl TaxonId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for TaxonId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaxonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The taxon ID extracted from an input column.
///
/// Aligners report ambiguous hits as a `;`-separated list of IDs; only the
/// first one is looked up and the rest are kept for the warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonQuery {
    pub id: TaxonId,
    pub discarded: Vec<String>,
}

impl TaxonQuery {
    pub fn from_field(field: &str) -> Self {
        let mut parts = field.trim().split(';');
        let first = parts.next().unwrap_or_default().trim();
        let discarded = parts.map(|part| part.trim().to_string()).collect();
        Self {
            id: TaxonId::from(first),
            discarded,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.discarded.is_empty()
    }
}

/// Which lineage entries end up in the output.
///
/// Holds lowercase rank labels plus the reserved `all` and `named` keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSelection {
    ranks: BTreeSet<String>,
}

impl RankSelection {
    pub fn linnean() -> Self {
        Self {
            ranks: LINNEAN_RANKS.iter().map(|rank| rank.to_string()).collect(),
        }
    }

    pub fn all() -> Self {
        Self::from_tokens([ALL_RANKS_KEYWORD])
    }

    pub fn named() -> Self {
        Self::from_tokens([NAMED_RANKS_KEYWORD])
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ranks: tokens
                .into_iter()
                .map(|token| token.as_ref().trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    pub fn selects(&self, rank: &str) -> bool {
        self.ranks.contains(ALL_RANKS_KEYWORD)
            || self.ranks.contains(rank)
            || (self.ranks.contains(NAMED_RANKS_KEYWORD) && rank != NO_RANK)
    }

    pub fn ranks(&self) -> impl Iterator<Item = &str> {
        self.ranks.iter().map(String::as_str)
    }
}

impl Default for RankSelection {
    fn default() -> Self {
        Self::linnean()
    }
}

impl FromStr for RankSelection {
    type Err = TaxLookupError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(LINNEAN_KEYWORD) {
            return Ok(Self::linnean());
        }
        let separator =
            Regex::new(r"[\s,]+").map_err(|err| TaxLookupError::InvalidRanks(err.to_string()))?;
        let selection = Self::from_tokens(separator.split(trimmed));
        if selection.ranks.is_empty() {
            return Err(TaxLookupError::InvalidRanks(format!(
                "'{value}' does not name any rank"
            )));
        }
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn split_on_commas_and_whitespace() {
        let selection: RankSelection = " Genus,species  order ".parse().unwrap();
        assert_eq!(
            selection.ranks().collect::<Vec<_>>(),
            vec!["genus", "order", "species"]
        );
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = " , ".parse::<RankSelection>().unwrap_err();
        assert_matches!(err, TaxLookupError::InvalidRanks(_));
    }

    #[test]
    fn query_trims_first_id() {
        let query = TaxonQuery::from_field(" 562 ; 83333");
        assert_eq!(query.id.as_str(), "562");
        assert_eq!(query.discarded, vec!["83333".to_string()]);
    }
}
