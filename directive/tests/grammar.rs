use directive::{Grammar, GrammarError};

#[test]
fn defaults_are_the_wire_tokens() {
    let grammar = Grammar::default();
    assert_eq!(grammar.region.start_marker, "#region");
    assert_eq!(grammar.region.end_marker, "#endregion");
    assert_eq!(grammar.region.comment_marker, "//");
    assert_eq!(grammar.delimiters.begin, "===BEGIN_TOOL_CALL===");
    assert_eq!(grammar.delimiters.end, "===END_TOOL_CALL===");
}

#[test]
fn partial_override_keeps_defaults() {
    let grammar = Grammar::from_toml_str("[delimiters]\nbegin = \"<<CALL\"\nend = \"CALL>>\"\n").unwrap();
    assert_eq!(grammar.delimiters.begin, "<<CALL");
    assert_eq!(grammar.region, Grammar::default().region);
    assert_eq!(Grammar::from_toml_str("").unwrap(), Grammar::default());
}

#[test]
fn rejects_bad_grammars() {
    assert!(matches!(
        Grammar::from_toml_str("[region]\ncomment_marker = \" \"\n"),
        Err(GrammarError::EmptyToken("region.comment_marker"))
    ));
    assert!(matches!(
        Grammar::from_toml_str("[delimiters]\nbegin = \"@@\"\nend = \"@@\"\n"),
        Err(GrammarError::IdenticalDelimiters)
    ));
    assert!(matches!(
        Grammar::from_toml_str("[region]\nstart = \"#r\"\n"),
        Err(GrammarError::Toml(_))
    ));
}
