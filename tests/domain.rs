use assert_matches::assert_matches;

use kira_taxlookup::domain::{LINNEAN_RANKS, RankSelection, TaxonId, TaxonQuery};
use kira_taxlookup::error::TaxLookupError;

#[test]
fn linnean_keyword_expands_to_fixed_set() {
    let selection: RankSelection = "linnean".parse().unwrap();
    assert_eq!(selection, RankSelection::linnean());
    for rank in LINNEAN_RANKS {
        assert!(selection.selects(rank));
    }
    assert!(!selection.selects("no rank"));
    assert!(!selection.selects("subspecies"));
}

#[test]
fn rank_list_is_lowercased() {
    let selection: RankSelection = "Superkingdom ORDER,genus".parse().unwrap();
    assert!(selection.selects("superkingdom"));
    assert!(selection.selects("order"));
    assert!(selection.selects("genus"));
    assert!(!selection.selects("species"));
}

#[test]
fn all_keyword_selects_every_rank() {
    let selection: RankSelection = "all".parse().unwrap();
    assert!(selection.selects("no rank"));
    assert!(selection.selects("clade"));
}

#[test]
fn named_keyword_excludes_no_rank() {
    let selection: RankSelection = "named".parse().unwrap();
    assert!(selection.selects("clade"));
    assert!(!selection.selects("no rank"));
}

#[test]
fn keywords_mix_with_explicit_ranks() {
    let selection: RankSelection = "named, genus".parse().unwrap();
    assert!(selection.selects("genus"));
    assert!(selection.selects("clade"));
    assert!(!selection.selects("no rank"));
}

#[test]
fn multi_word_rank_splits_into_tokens() {
    // "no rank" cannot be named explicitly; it splits into "no" and "rank".
    let selection: RankSelection = "genus, no rank".parse().unwrap();
    assert!(selection.selects("genus"));
    assert!(selection.selects("no"));
    assert!(!selection.selects("no rank"));
}

#[test]
fn blank_rank_selection_is_invalid() {
    let err = "   ".parse::<RankSelection>().unwrap_err();
    assert_matches!(err, TaxLookupError::InvalidRanks(_));
}

#[test]
fn single_id_query() {
    let query = TaxonQuery::from_field("562");
    assert_eq!(query.id, TaxonId::from("562"));
    assert!(!query.is_ambiguous());
}

#[test]
fn multi_id_query_uses_first() {
    let query = TaxonQuery::from_field("123;456");
    assert_eq!(query.id.as_str(), "123");
    assert!(query.is_ambiguous());
    assert_eq!(query.discarded, vec!["456".to_string()]);
}

#[test]
fn empty_field_gives_empty_id() {
    let query = TaxonQuery::from_field("  ");
    assert_eq!(query.id.as_str(), "");
    assert!(!query.is_ambiguous());
}
