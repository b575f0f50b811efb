use crate::grammar::RegionGrammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Start,
    End,
}

/// Recognize a region marker at the start of `line`, ignoring leading
/// whitespace and ASCII case. The marker must end at a word boundary; any
/// trailing text (a region label, usually) is ignored.
pub(crate) fn recognize(grammar: &RegionGrammar, line: &str) -> Option<Marker> {
    let rest = line.trim_start();
    // End first: a configured start marker may be a prefix of the end marker.
    if starts_with_word(rest, &grammar.end_marker) {
        Some(Marker::End)
    } else if starts_with_word(rest, &grammar.start_marker) {
        Some(Marker::Start)
    } else {
        None
    }
}

/// Whether `line` is an instruction line: the comment marker after leading
/// whitespace. Matched exactly.
pub(crate) fn is_instruction(grammar: &RegionGrammar, line: &str) -> bool {
    line.trim_start().starts_with(grammar.comment_marker.as_str())
}

fn starts_with_word(text: &str, word: &str) -> bool {
    let Some(head) = text.get(..word.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(word) {
        return false;
    }
    match text[word.len()..].chars().next() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_'),
    }
}
