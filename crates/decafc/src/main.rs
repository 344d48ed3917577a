use std::fs;
use std::ops::Range;
use std::path::PathBuf;
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, info, warn, LevelFilter};
use serde_json::json;

use decaf_common::config::{self, DecafConfig};
use decaf_common::{CompileError, Diagnostic, DiagnosticFormat, Span};
use decaf_compiler::ast::{AstError, Program};
use decaf_compiler::{analyze_with_options, AnalyzerOptions};

/// Semantic errors were found.
const EXIT_ERRORS: i32 = 1;
/// The input could not be analysed at all.
const EXIT_FAILURE: i32 = 2;

/// Decaf semantic checker.
///
/// Checks a Decaf parse tree (JSON) for scoping and typing errors.
#[derive(Parser, Debug)]
#[command(
    name = "decafc",
    version,
    about,
    long_about = "Decaf semantic checker.\n\nReads the parse tree produced by the Decaf parser (JSON), resolves every\nname against its scope and type-checks declarations, statements and\nexpressions.\n\nExamples:\n  decafc prog.json                      Check and report errors\n  decafc prog.json --source prog.decaf  Show the offending source lines\n  decafc prog.json --format json        Machine-readable diagnostics\n  decafc prog.json --dump-scopes        Print the scope tree as JSON"
)]
struct Cli {
    /// Parse tree to check, as JSON.
    input: PathBuf,

    /// Decaf source file the tree was parsed from.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Configuration file (default: nearest Decaf.toml above the input).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Diagnostic output format.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Print at most N diagnostics (0 prints all).
    #[arg(long = "max-errors", value_name = "N")]
    max_errors: Option<usize>,

    /// Name of the required entry method.
    #[arg(long = "entry-point", value_name = "NAME")]
    entry_point: Option<String>,

    /// Do not require an entry method.
    #[arg(long = "no-entry-check")]
    no_entry_check: bool,

    /// Print the scope tree as JSON to stdout.
    #[arg(long = "dump-scopes")]
    dump_scopes: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Human,
    Plain,
    Json,
}

impl From<FormatArg> for DiagnosticFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Human => DiagnosticFormat::Human,
            FormatArg::Plain => DiagnosticFormat::Plain,
            FormatArg::Json => DiagnosticFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(EXIT_FAILURE);
        }
    };
    debug!("configuration root: {}", config.root_dir.display());

    let tree = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {}", cli.input.display(), e);
            process::exit(EXIT_FAILURE);
        }
    };

    let source = cli.source.as_ref().and_then(|path| match fs::read_to_string(path) {
        Ok(text) => Some(SourceFile {
            name: path.display().to_string(),
            text,
        }),
        Err(e) => {
            warn!("could not read source '{}': {}", path.display(), e);
            None
        }
    });

    let printer = Printer {
        format: cli
            .format
            .map(DiagnosticFormat::from)
            .unwrap_or(config.diagnostics.format),
        max_errors: cli.max_errors.unwrap_or(config.diagnostics.max_errors),
        source,
    };

    // === Parse tree ===
    let program = match Program::from_json(&tree) {
        Ok(p) => p,
        Err(e) => {
            printer.print(&[syntax_diagnostic(&e)]);
            process::exit(EXIT_FAILURE);
        }
    };

    // === Semantic Analysis ===
    let options = analyzer_options(&cli, &config);
    info!(
        "analysing '{}' (entry point: {})",
        cli.input.display(),
        if options.require_entry_point {
            options.entry_point.as_str()
        } else {
            "<none>"
        }
    );
    let analysis = analyze_with_options(&program, options);

    if cli.dump_scopes {
        let dump = json!({
            "scopes": analysis.scopes(),
            "scope_map": analysis.scope_map(),
        });
        match serde_json::to_string_pretty(&dump) {
            Ok(j) => println!("{}", j),
            Err(e) => eprintln!("error: failed to serialize scopes: {}", e),
        }
    }

    printer.print(analysis.diagnostics());

    if analysis.had_errors() {
        process::exit(EXIT_ERRORS);
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    let level = match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

fn load_config(cli: &Cli) -> Result<DecafConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config(path),
        None => {
            let abs_input = fs::canonicalize(&cli.input).unwrap_or_else(|_| cli.input.clone());
            config::find_and_load_config(&abs_input)
        }
    }
}

/// Configuration values, overridden by whatever flags were given.
fn analyzer_options(cli: &Cli, config: &DecafConfig) -> AnalyzerOptions {
    let mut options = AnalyzerOptions::from(&config.analysis);
    if let Some(entry) = &cli.entry_point {
        options.entry_point = entry.clone();
    }
    if cli.no_entry_check {
        options.require_entry_point = false;
    }
    options
}

fn syntax_diagnostic(error: &AstError) -> Diagnostic {
    let AstError::Json(inner) = error;
    let line = u32::try_from(inner.line()).unwrap_or(0);
    let column = u32::try_from(inner.column()).unwrap_or(0);
    Diagnostic::new(
        CompileError::Syntax {
            message: error.to_string(),
        },
        Span::new(line, column),
    )
}

struct SourceFile {
    name: String,
    text: String,
}

struct Printer {
    format: DiagnosticFormat,
    max_errors: usize,
    source: Option<SourceFile>,
}

impl Printer {
    fn print(&self, diagnostics: &[Diagnostic]) {
        let shown = match self.max_errors {
            0 => diagnostics,
            n => &diagnostics[..n.min(diagnostics.len())],
        };

        match self.format {
            DiagnosticFormat::Json => {
                let items: Vec<_> = shown.iter().map(diagnostic_json).collect();
                let out = json!({
                    "diagnostics": items,
                    "total": diagnostics.len(),
                });
                match serde_json::to_string_pretty(&out) {
                    Ok(j) => println!("{}", j),
                    Err(e) => eprintln!("error: failed to serialize diagnostics: {}", e),
                }
                return;
            }
            DiagnosticFormat::Plain => {
                for diag in shown {
                    println!("{}", diag);
                }
            }
            DiagnosticFormat::Human => {
                for diag in shown {
                    match &self.source {
                        Some(source) => print_report(diag, source),
                        None => eprintln!("{}", diag),
                    }
                }
            }
        }

        let hidden = diagnostics.len() - shown.len();
        if hidden > 0 {
            eprintln!("... {} more diagnostic(s) not shown", hidden);
        }
        if self.format == DiagnosticFormat::Human {
            match diagnostics.len() {
                0 => println!("No errors found."),
                n => eprintln!("{} error(s) found.", n),
            }
        }
    }
}

fn diagnostic_json(diag: &Diagnostic) -> serde_json::Value {
    json!({
        "class": diag.class().label(),
        "type_code": diag.error.type_code(),
        "line": diag.span.line,
        "column": diag.span.column,
        "message": diag.message(),
        "error": diag.error,
    })
}

fn print_report(diag: &Diagnostic, source: &SourceFile) {
    let file_name = source.name.as_str();
    let Some(range) = line_range(&source.text, diag.span.line) else {
        eprintln!("{}", diag);
        return;
    };

    let title = match diag.error.type_code() {
        Some(code) => format!("{} (code {})", diag.class(), code),
        None => diag.class().to_string(),
    };

    let result = Report::build(ReportKind::Error, file_name, range.start)
        .with_message(title)
        .with_label(
            Label::new((file_name, range))
                .with_message(diag.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((file_name, Source::from(source.text.as_str())));
    if let Err(e) = result {
        eprintln!("error: could not render diagnostic: {}", e);
        eprintln!("{}", diag);
    }
}

/// Character range of 1-based `line` in `text`, without its line break.
fn line_range(text: &str, line: u32) -> Option<Range<usize>> {
    let index = usize::try_from(line).ok()?.checked_sub(1)?;
    let mut start = 0;
    for (i, l) in text.split('\n').enumerate() {
        let width = l.chars().count();
        if i == index {
            let content = l.trim_end_matches('\r').chars().count();
            return Some(start..start + content.max(1));
        }
        start += width + 1;
    }
    None
}
