use super::*;

#[test]
fn test_parse_valid() {
    let spec: ModelSpec = "anthropic/claude-opus-4".parse().unwrap();
    assert_eq!(spec.provider, "anthropic");
    assert_eq!(spec.model, "claude-opus-4");
}

#[test]
fn test_parse_keeps_slashes_in_model() {
    let spec: ModelSpec = "openai/gpt-5/preview".parse().unwrap();
    assert_eq!(spec.provider, "openai");
    assert_eq!(spec.model, "gpt-5/preview");
}

#[test]
fn test_parse_invalid() {
    assert!("no-slash".parse::<ModelSpec>().is_err());
    assert!("/missing-provider".parse::<ModelSpec>().is_err());
    assert!("missing-model/".parse::<ModelSpec>().is_err());
}

#[test]
fn test_display_roundtrip() {
    let spec = ModelSpec::new("genai", "gemini-2.5-pro");
    assert_eq!(spec.to_string(), "genai/gemini-2.5-pro");
    let parsed: ModelSpec = spec.to_string().parse().unwrap();
    assert_eq!(parsed, spec);
}

#[test]
fn test_serde_as_string() {
    let spec = ModelSpec::new("anthropic", "claude-haiku");
    let json = serde_json::to_string(&spec).unwrap();
    assert_eq!(json, "\"anthropic/claude-haiku\"");

    let parsed: ModelSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, spec);
}
