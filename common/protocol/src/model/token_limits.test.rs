use super::*;

#[test]
fn test_known_models() {
    let table = TokenLimitTable::default();
    assert_eq!(table.limit("claude-opus-4"), 200_000);
    assert_eq!(table.limit("gemini-2.5-pro"), 1_048_576);
    assert_eq!(table.limit("gpt-5"), 400_000);
}

#[test]
fn test_prefix_match_on_versioned_names() {
    let table = TokenLimitTable::default();
    assert_eq!(table.limit("claude-opus-4-20250514"), 200_000);
    assert_eq!(table.limit("gemini-2.5-flash"), 1_048_576);
}

#[test]
fn test_unknown_model_gets_default() {
    let table = TokenLimitTable::default();
    assert_eq!(table.limit("mystery-model-9000"), DEFAULT_TOKEN_LIMIT);
}

#[test]
fn test_provider_segment_ignored() {
    let table = TokenLimitTable::default();
    assert_eq!(table.limit("anthropic/claude-opus-4"), 200_000);
    assert_eq!(table.limit("genai/gemini-1.5-pro"), 2_097_152);
}

#[test]
fn test_spec_with_slashed_model_id_matches_family() {
    // Only the first slash separates the provider; the rest is the
    // model id and still prefix-matches its family entry.
    let table = TokenLimitTable::default();
    assert_eq!(table.limit("openai/gpt-5/preview"), 400_000);
}

#[test]
fn test_longest_prefix_wins() {
    let mut table = TokenLimitTable::default();
    table.insert("gemini-1.5-pro-experimental", 100);
    assert_eq!(table.limit("gemini-1.5-pro-experimental-0827"), 100);
    assert_eq!(table.limit("gemini-1.5-pro"), 2_097_152);
}

#[test]
fn test_with_entries() {
    let table = TokenLimitTable::with_entries(vec![("tiny".to_string(), 1000)], 500);
    assert_eq!(table.limit("tiny-v2"), 1000);
    assert_eq!(table.limit("other"), 500);
}
