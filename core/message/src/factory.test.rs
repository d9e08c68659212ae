use lumen_protocol::Role;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_continuation_message() {
    let content = continuation_message();
    assert_eq!(content.role, Role::User);
    assert_eq!(content.text(), "Please continue.");
}

#[test]
fn test_environment_priming_pair_roles() {
    let [user, model] = environment_priming_pair();
    assert_eq!(user.role, Role::User);
    assert_eq!(model.role, Role::Model);
    assert!(user.text().contains("summarized"));
}

#[test]
fn test_summary_pair_wraps_summary() {
    let [user, model] = summary_pair("Fixed the parser; tests pass.");
    assert_eq!(user.role, Role::User);
    assert_eq!(model.role, Role::Model);
    assert!(user.text().starts_with("<compaction_summary>"));
    assert!(user.text().contains("Fixed the parser; tests pass."));
    assert!(user.text().ends_with("</compaction_summary>"));
}
