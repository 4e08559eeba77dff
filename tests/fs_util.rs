mod common;

use assert_matches::assert_matches;

use kira_taxlookup::error::TaxLookupError;
use kira_taxlookup::fs_util::extract_tar_gz_members;

#[test]
fn extracts_only_requested_members() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("taxdump.tar.gz");
    std::fs::write(&archive, common::full_taxdump_archive()).unwrap();
    let target = temp.path().join("data");

    let extracted =
        extract_tar_gz_members(&archive, &["nodes.dmp", "names.dmp"], &target).unwrap();
    assert_eq!(extracted, vec![target.join("names.dmp"), target.join("nodes.dmp")]);
    assert_eq!(
        std::fs::read_to_string(target.join("names.dmp")).unwrap(),
        common::NAMES_DMP
    );
    assert!(!target.join("citations.dmp").exists());
}

#[test]
fn missing_member_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("taxdump.tar.gz");
    std::fs::write(&archive, common::taxdump_archive(&[("names.dmp", "n")])).unwrap();

    let err = extract_tar_gz_members(&archive, &["nodes.dmp", "names.dmp"], temp.path())
        .unwrap_err();
    assert_matches!(err, TaxLookupError::MissingArchiveMember(ref name) if name == "nodes.dmp");
}

#[test]
fn corrupt_archive_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("taxdump.tar.gz");
    std::fs::write(&archive, b"<html>not found</html>").unwrap();

    let err = extract_tar_gz_members(&archive, &["names.dmp"], temp.path()).unwrap_err();
    assert_matches!(err, TaxLookupError::Filesystem(_));
}
