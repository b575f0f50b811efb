//! Property-based tests for the region filter and extractor.

use directive::{Extractor, filter};
use proptest::prelude::*;

/// A line that can never be a region marker.
fn plain_line() -> impl Strategy<Value = String> {
    "[a-zA-Z /.,]{0,24}"
}

#[derive(Debug, Clone)]
enum Segment {
    Prose(String),
    Region(Vec<(bool, String)>),
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        plain_line().prop_map(Segment::Prose),
        prop::collection::vec(
            prop_oneof![
                "[ ]{0,2}// [a-z ]{0,12}".prop_map(|l| (true, l)),
                "[a-z][a-z ]{0,12}".prop_map(|l| (false, l)),
            ],
            0..6,
        )
        .prop_map(Segment::Region),
    ]
}

/// Render segments into (document, expected filter output).
fn render(segments: &[Segment]) -> (String, String) {
    let mut input = Vec::new();
    let mut expected = Vec::new();
    for segment in segments {
        match segment {
            Segment::Prose(line) => {
                input.push(line.clone());
                expected.push(line.clone());
            }
            Segment::Region(lines) => {
                input.push("#region".to_string());
                expected.push("#region".to_string());
                for (instruction, line) in lines {
                    input.push(line.clone());
                    if *instruction {
                        expected.push(line.clone());
                    }
                }
                input.push("#endregion".to_string());
                expected.push("#endregion".to_string());
            }
        }
    }
    (input.join("\n"), expected.join("\n"))
}

proptest! {
    #[test]
    fn documents_without_markers_are_unchanged(lines in prop::collection::vec(plain_line(), 0..12)) {
        let doc = lines.join("\n");
        prop_assert_eq!(filter(&doc), doc);
    }

    #[test]
    fn balanced_regions_keep_exactly_the_instructions(segments in prop::collection::vec(segment(), 0..8)) {
        let (doc, expected) = render(&segments);
        prop_assert_eq!(filter(&doc), expected);
    }

    #[test]
    fn filtering_never_adds_lines(lines in prop::collection::vec("[ ]?(#region|#endregion|//)?.{0,16}", 0..16)) {
        let doc = lines.join("\n");
        let out = filter(&doc);
        prop_assert!(out.split('\n').count() <= doc.split('\n').count());
    }

    #[test]
    fn extraction_is_total_and_idempotent(
        prefix in ".{0,40}",
        body in ".{0,60}",
        suffix in ".{0,40}",
        close in any::<bool>(),
    ) {
        let end = if close { "===END_TOOL_CALL===" } else { "" };
        let buffer = format!("{prefix}===BEGIN_TOOL_CALL==={body}{end}{suffix}");
        let extractor = Extractor::default();
        let first = extractor.extract(&buffer);
        prop_assert_eq!(&first, &extractor.extract(&buffer));
        if let Some(block) = &first.block {
            prop_assert!(buffer[block.clone()].starts_with("===BEGIN_TOOL_CALL==="));
            prop_assert!(buffer[block.clone()].ends_with("===END_TOOL_CALL==="));
        }
    }

    #[test]
    fn arbitrary_text_never_panics(buffer in any::<String>()) {
        let _ = Extractor::default().extract(&buffer);
        let _ = filter(&buffer);
    }
}
