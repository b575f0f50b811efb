mod test_runner;

use std::io::Read;
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use directive::{DirectiveCall, Extractor, Finding, Grammar, LineKind, RegionFilter, Scan, ScanResult};
use session::{DispatchError, Progress, StreamSession};

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "Recover directives from manuscripts and generated text"
)]
struct Cli {
    /// Disable colored diagnostics
    #[arg(long, global = true)]
    no_color: bool,

    /// TOML file overriding region markers and tool-call delimiters
    #[arg(long, global = true, value_name = "FILE")]
    grammar: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a document with region notes removed
    Filter(FilterArgs),

    /// Find a tool call in a generated response
    Extract(ExtractArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Document to filter ("-" for stdin)
    file: String,

    /// Print each line with its classification instead of the filtered text
    #[arg(long)]
    show_lines: bool,
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Response text to scan ("-" for stdin)
    file: String,

    /// Replay the input as a stream of chunks of this many bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let grammar = match &cli.grammar {
        Some(path) => load_grammar(path),
        None => Grammar::default(),
    };

    match cli.command {
        Command::Filter(args) => do_filter(args, &grammar, cli.no_color),
        Command::Extract(args) => do_extract(args, &grammar, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code =
                test_runner::run_tests(path, cli.no_color, &test_args.category, &grammar);
            process::exit(exit_code);
        }
    }
}

fn load_grammar(path: &str) -> Grammar {
    let source = read_source(path);
    match Grammar::from_toml_str(&source) {
        Ok(grammar) => grammar,
        Err(e) => {
            eprintln!("error: {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn read_source(file: &str) -> String {
    let result = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    } else {
        std::fs::read_to_string(file)
    };
    match result {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    }
}

fn do_filter(args: FilterArgs, grammar: &Grammar, no_color: bool) {
    let source = read_source(&args.file);
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let filter = RegionFilter::new(grammar.region.clone());
    emit_findings(&files, &filter.analyze(&source, file_id), no_color);

    if args.show_lines {
        for line in filter.classify(&source) {
            let label = match line.kind {
                LineKind::Prose => "prose",
                LineKind::RegionStart => "start",
                LineKind::RegionEnd => "end",
                LineKind::Instruction => "instruction",
                LineKind::Note => "dropped",
            };
            println!("{:>5} {:<11} {}", line.number, label, line.text);
        }
        return;
    }

    print!("{}", filter.filter(&source));
}

fn do_extract(args: ExtractArgs, grammar: &Grammar, no_color: bool) {
    let source = read_source(&args.file);
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());
    let extractor = Extractor::new(grammar.delimiters.clone());

    if let Some(size) = args.chunk_size {
        replay_stream(&source, size.max(1), extractor, &files, file_id, no_color);
        return;
    }

    let (result, failed) = match extractor.scan(&source, file_id) {
        Scan::Found(result, warning) => {
            emit_findings(&files, warning.as_slice(), no_color);
            (result, false)
        }
        Scan::Incomplete => (ScanResult::default(), false),
        Scan::Malformed(finding) => {
            emit_findings(&files, &[finding], no_color);
            (ScanResult::default(), true)
        }
    };
    print_json(&json!(result));
    if failed {
        process::exit(1);
    }
}

/// Feed `source` through a session in fixed-size chunks, echoing the call
/// arguments back as the dispatch output.
fn replay_stream(
    source: &str,
    size: usize,
    extractor: Extractor,
    files: &SimpleFiles<String, String>,
    file_id: usize,
    no_color: bool,
) {
    let mut session = StreamSession::new(extractor);
    let mut echo = |call: &DirectiveCall| -> Result<serde_json::Value, DispatchError> {
        Ok(serde_json::Value::Object(call.arguments.clone()))
    };

    let mut dispatched = None;
    let mut start = 0;
    let mut chunks = 0;
    while start < source.len() {
        let mut end = (start + size).min(source.len());
        while !source.is_char_boundary(end) {
            end += 1;
        }
        chunks += 1;
        match session.push(&source[start..end], &mut echo) {
            Ok(Progress::Dispatched(dispatch)) => dispatched = Some(dispatch),
            Ok(Progress::Pending | Progress::Closed) => {}
            Err(e) => eprintln!("error: {}", e),
        }
        start = end;
    }

    let transcript = session.finish(file_id);
    emit_findings(files, &transcript.findings, no_color);

    match dispatched {
        Some(dispatch) => {
            eprintln!("ready after chunk {} of {}", dispatch.update, chunks);
            print_json(&json!({
                "update": dispatch.update,
                "prefix": dispatch.prefix,
                "call": dispatch.call,
                "remainder": transcript.remainder,
            }));
        }
        None => {
            eprintln!("no directive in {} chunk(s)", chunks);
            if !transcript.findings.is_empty() {
                process::exit(1);
            }
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("error: cannot encode result: {}", e);
            process::exit(1);
        }
    }
}

fn emit_findings(files: &SimpleFiles<String, String>, findings: &[Finding], no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for finding in findings {
        let diagnostic = finding.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}
