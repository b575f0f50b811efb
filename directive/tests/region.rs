use directive::{Issue, LineKind, RegionFilter, RegionGrammar, filter};
use pretty_assertions::assert_eq;

fn lines(parts: &[&str]) -> String {
    parts.join("\n")
}

#[test]
fn prose_outside_regions_is_untouched() {
    let doc = lines(&["Chapter one.", "// not an instruction here", "", "The end."]);
    assert_eq!(filter(&doc), doc);
}

#[test]
fn keeps_only_comment_lines_inside_a_region() {
    let doc = lines(&[
        "She opened the door.",
        "#region notes",
        "remember the knife from chapter 2",
        "  // Keep the tone tense.",
        "// Mention the rain.",
        "#endregion",
        "Rain fell.",
    ]);
    assert_eq!(
        filter(&doc),
        lines(&[
            "She opened the door.",
            "#region notes",
            "  // Keep the tone tense.",
            "// Mention the rain.",
            "#endregion",
            "Rain fell.",
        ])
    );
}

#[test]
fn unterminated_region_runs_to_end_of_document() {
    let doc = lines(&["#region", "keep//? no", "// yes", "prose"]);
    assert_eq!(filter(&doc), lines(&["#region", "// yes"]));
}

#[test]
fn markers_ignore_case_and_leading_whitespace() {
    let doc = lines(&["   #REGION Outline", "dropped", "\t#EndRegion trailing words", "kept"]);
    assert_eq!(
        filter(&doc),
        lines(&["   #REGION Outline", "\t#EndRegion trailing words", "kept"])
    );
}

#[test]
fn marker_must_be_a_whole_word() {
    let doc = lines(&["#regions of the north", "mountains"]);
    assert_eq!(filter(&doc), doc);
}

#[test]
fn nested_start_is_kept_but_does_not_nest() {
    let doc = lines(&[
        "#region",
        "a",
        "#region",
        "// x",
        "#endregion",
        "b",
        "#endregion",
    ]);
    assert_eq!(
        filter(&doc),
        lines(&["#region", "#region", "// x", "#endregion", "b", "#endregion"])
    );
}

#[test]
fn carriage_returns_survive_on_kept_lines() {
    let doc = "intro\r\n#region\r\nnote\r\n// do this\r\n#endregion\r\nend";
    assert_eq!(
        filter(doc),
        "intro\r\n#region\r\n// do this\r\n#endregion\r\nend"
    );
}

#[test]
fn empty_and_trailing_newline_documents() {
    assert_eq!(filter(""), "");
    assert_eq!(filter("prose\n"), "prose\n");
    assert_eq!(filter("#region\nnote\n"), "#region");
}

#[test]
fn classify_reports_kinds_numbers_and_spans() {
    let doc = "p\n#region\nn\n// i\n#endregion";
    let classified = RegionFilter::default().classify(doc);
    let kinds: Vec<LineKind> = classified.iter().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::Prose,
            LineKind::RegionStart,
            LineKind::Note,
            LineKind::Instruction,
            LineKind::RegionEnd,
        ]
    );
    assert_eq!(classified[3].number, 4);
    assert_eq!(&doc[classified[3].span.clone()], "// i");
}

#[test]
fn analyze_reports_marker_misuse() {
    let doc = lines(&["#endregion", "#region", "#region", "// x", "#endregion", "#region", "tail"]);
    let findings = RegionFilter::default().analyze(&doc, 0);
    let issues: Vec<Issue> = findings.iter().map(|f| f.issue.clone()).collect();
    assert_eq!(
        issues,
        vec![Issue::StrayRegionEnd, Issue::NestedRegion, Issue::UnterminatedRegion]
    );
    assert!(findings.iter().all(|f| f.is_warning()));
    // The unterminated finding points at the last opening marker.
    let last = findings.last().unwrap();
    assert_eq!(&doc[last.span.clone()], "#region");
    assert_eq!(last.span.start, doc.rfind("#region").unwrap());
}

#[test]
fn analyze_is_quiet_on_balanced_documents() {
    let doc = lines(&["a", "#region", "// x", "#endregion", "b"]);
    assert!(RegionFilter::default().analyze(&doc, 0).is_empty());
}

#[test]
fn custom_markers() {
    let grammar = RegionGrammar {
        start_marker: "@begin".into(),
        end_marker: "@end".into(),
        comment_marker: ">>".into(),
    };
    let doc = lines(&["x", "@BEGIN", "y", ">> z", "// w", "@end", "#region"]);
    assert_eq!(
        RegionFilter::new(grammar).filter(&doc),
        lines(&["x", "@BEGIN", ">> z", "@end", "#region"])
    );
}
