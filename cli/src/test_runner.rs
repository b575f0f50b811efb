use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use directive::{Extractor, Finding, Grammar, RegionFilter, Scan};

const FIXTURE_SUFFIX: &str = ".test.md";

#[derive(Debug, Deserialize)]
pub struct ExpectedFinding {
    /// Substring that must appear in the finding message.
    pub contains: String,

    /// If set, the finding's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectedCall {
    pub name: String,

    /// Compared after conversion to JSON. Omitted means no arguments.
    #[serde(default)]
    pub arguments: toml::Table,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Filter,
    Extract,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Which parser the document body is fed to.
    #[serde(default)]
    pub mode: Mode,

    /// Expected filtered document (trailing whitespace ignored). Filter mode.
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected call. Extract mode.
    #[serde(default)]
    pub expect_call: Option<ExpectedCall>,

    /// Expected prefix; "" means no prefix. Extract mode.
    #[serde(default)]
    pub expect_prefix: Option<String>,

    /// Expect that no call is extracted. Extract mode.
    #[serde(default)]
    pub expect_none: bool,

    /// Expected findings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_findings: Option<Vec<ExpectedFinding>>,

    /// Grammar override for this file.
    #[serde(default)]
    pub grammar: Option<Grammar>,
}

/// Parse a `.test.md` file into its TOML config and document body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path, grammar: &Grammar) -> TestResult {
    // 1. Read file
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    // 2. Parse frontmatter
    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("frontmatter error: {}", e)),
            };
        }
    };

    let description = config.description.clone();
    let outcome = match check(&config, source, grammar) {
        Ok(()) => TestOutcome::Pass,
        Err(reason) => TestOutcome::Fail(reason),
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run the parser selected by `config.mode` over `source` and compare
/// against every expectation present.
fn check(config: &TestConfig, source: &str, grammar: &Grammar) -> Result<(), String> {
    let grammar = config.grammar.as_ref().unwrap_or(grammar);
    grammar
        .validate()
        .map_err(|e| format!("invalid grammar: {}", e))?;

    let findings = match config.mode {
        Mode::Filter => {
            if config.expect_call.is_some() || config.expect_prefix.is_some() || config.expect_none {
                return Err("call expectations need mode = \"extract\"".into());
            }
            let filter = RegionFilter::new(grammar.region.clone());
            if let Some(expected) = &config.expect_output {
                let actual = filter.filter(source);
                let actual = actual.trim_end();
                let expected = expected.trim_end();
                if actual != expected {
                    return Err(format!(
                        "output mismatch\n  expected:\n{}\n  actual:\n{}",
                        indent(expected),
                        indent(actual)
                    ));
                }
            }
            filter.analyze(source, 0)
        }
        Mode::Extract => {
            if config.expect_output.is_some() {
                return Err("expect_output needs mode = \"filter\"".into());
            }
            let extractor = Extractor::new(grammar.delimiters.clone());
            let (result, findings) = match extractor.scan(source, 0) {
                Scan::Found(result, warning) => (result, warning.into_iter().collect()),
                Scan::Incomplete => (Default::default(), Vec::new()),
                Scan::Malformed(finding) => (Default::default(), vec![finding]),
            };

            if config.expect_none && result.call.is_some() {
                return Err(format!("expected no call, got {:?}", result.call));
            }

            if let Some(expected) = &config.expect_call {
                let Some(call) = &result.call else {
                    return Err(format!("expected call \"{}\", found none", expected.name));
                };
                if call.name != expected.name {
                    return Err(format!(
                        "call name mismatch\n  expected: {}\n  actual:   {}",
                        expected.name, call.name
                    ));
                }
                let expected_args = serde_json::to_value(&expected.arguments)
                    .map_err(|e| format!("cannot convert expected arguments: {}", e))?;
                let actual_args = serde_json::Value::Object(call.arguments.clone());
                if actual_args != expected_args {
                    return Err(format!(
                        "arguments mismatch\n  expected: {}\n  actual:   {}",
                        expected_args, actual_args
                    ));
                }
            }

            if let Some(expected) = &config.expect_prefix {
                let actual = result.prefix.as_deref().unwrap_or("");
                if actual != expected.as_str() {
                    return Err(format!(
                        "prefix mismatch\n  expected: {:?}\n  actual:   {:?}",
                        expected, actual
                    ));
                }
            }

            findings
        }
    };

    match &config.expect_findings {
        Some(expected) => match check_findings(source, &findings, expected) {
            Some(reason) => Err(reason),
            None => Ok(()),
        },
        None => Ok(()),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual findings match expectations. Returns `Some(reason)` on mismatch.
fn check_findings(
    source: &str,
    findings: &[Finding],
    expected: &[ExpectedFinding],
) -> Option<String> {
    if findings.len() != expected.len() {
        let actual_msgs: Vec<String> = findings
            .iter()
            .map(|f| format!("  - {}", f.message()))
            .collect();
        return Some(format!(
            "expected {} finding(s), got {}\n  actual findings:\n{}",
            expected.len(),
            findings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in findings.iter().zip(expected.iter()).enumerate() {
        let msg = actual.message();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "finding[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "finding[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Fixture files grouped by the folder they sit in, relative to `root`.
/// Files directly in `root` land in the "" category. Both levels are sorted.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            collect_tests(&path, root, out);
            continue;
        }
        let is_fixture = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(FIXTURE_SUFFIX));
        if is_fixture {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

/// Pick the categories to run. An empty request selects everything; a
/// requested category also selects its subfolders.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut selected = BTreeMap::new();
    for req in requested.iter().map(|r| r.trim_matches('/')) {
        let nested = format!("{}/", req);
        let before = selected.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&nested) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }
    selected
}

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, text: &str, code: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        }
    }

    fn pass(&self) -> String {
        self.paint("PASS", "32")
    }

    fn fail(&self) -> String {
        self.paint("FAIL", "31")
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text, "1")
    }
}

/// Run all fixture files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String], grammar: &Grammar) -> i32 {
    let palette = Palette { no_color };

    let groups: Vec<(Option<String>, Vec<PathBuf>)> = if path.is_file() {
        vec![(None, vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
            return 1;
        }
        let selected = select_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (Some(category_label(cat).to_string()), files.to_vec()))
            .collect()
    };

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (header, files) in groups {
        if let Some(header) = header {
            eprintln!();
            eprintln!("{}", palette.bold(&header));
        }
        for file in files {
            let result = run_single_test(&file, grammar);
            let label = result.description.clone().unwrap_or_else(|| {
                file.file_name()
                    .and_then(|s| s.to_str())
                    .map(|s| s.trim_end_matches(FIXTURE_SUFFIX).to_string())
                    .unwrap_or_else(|| "?".to_string())
            });
            if matches!(result.outcome, TestOutcome::Pass) {
                passed += 1;
                eprintln!("  {}  {}", palette.pass(), label);
            } else {
                eprintln!("  {}  {}", palette.fail(), label);
                failures.push(result);
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("ok", "32"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("FAILED", "31"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    #[test]
    fn bundled_fixtures_pass() {
        for (category, files) in discover_categorized(&fixtures_dir()) {
            for file in files {
                let result = run_single_test(&file, &Grammar::default());
                if let TestOutcome::Fail(reason) = result.outcome {
                    panic!("{}: {}\n{}", category, file.display(), reason);
                }
            }
        }
    }

    #[test]
    fn frontmatter_splits_config_and_body() {
        let (config, body) =
            parse_test_file("---\nmode = \"extract\"\nexpect_none = true\n---\nhello\n").unwrap();
        assert_eq!(config.mode, Mode::Extract);
        assert!(config.expect_none);
        assert_eq!(body, "hello\n");

        assert!(parse_test_file("mode = \"filter\"\n").is_err());
        assert!(parse_test_file("---\nmode = \"filter\"\n").is_err());
        assert!(parse_test_file("---\nunknown_key = 1\n---\n").is_err());
    }

    #[test]
    fn mismatches_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrong.test.md");
        std::fs::write(
            &path,
            "---\nexpect_output = \"kept\"\n---\n#region\nkept\n#endregion\n",
        )
        .unwrap();
        match run_single_test(&path, &Grammar::default()).outcome {
            TestOutcome::Fail(reason) => assert!(reason.contains("output mismatch"), "{reason}"),
            TestOutcome::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn discovery_groups_by_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("region/deep")).unwrap();
        for name in ["top.test.md", "region/a.test.md", "region/deep/b.test.md", "region/skip.md"] {
            std::fs::write(dir.path().join(name), "---\ndescription = \"stub\"\n---\nprose\n").unwrap();
        }

        let found = discover_categorized(dir.path());
        let summary: Vec<(&str, usize)> = found.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        assert_eq!(summary, vec![("", 1), ("region", 1), ("region/deep", 1)]);

        let picked = select_categories(&found, &["region".to_string()]);
        assert_eq!(picked.keys().copied().collect::<Vec<_>>(), vec!["region", "region/deep"]);

        assert_eq!(run_tests(dir.path(), true, &[], &Grammar::default()), 0);
    }
}
