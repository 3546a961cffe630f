use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use nyx_ast::LineIndex;
use nyx_driver::options::OptionValue;
use nyx_driver::{symbolicate, CompileOutput, CompilerInstance, Issue, RawOptions, SourceFile, Unsqueeze};
use nyx_lexer::{Lexer, Token, TokenKind};

#[derive(Parser)]
#[command(
    name = "nyx",
    version = "0.1.0",
    about = "Nyx compiler",
    long_about = "Compiles Nyx sources into a single JavaScript bundle,\nwith optional identifier squeezing and type checking."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Nyx files into one bundle
    Compile {
        /// Input files, in order. Replaces `files` from the config
        inputs: Vec<PathBuf>,

        /// JSON file of compiler options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to emit
        #[arg(long)]
        language: Option<Language>,

        /// Squeeze identifiers
        #[arg(long)]
        squeeze: bool,

        /// Type check the generated TypeScript
        #[arg(long)]
        check_types: bool,

        /// Write a source map next to the output
        #[arg(long)]
        map: bool,

        /// Leave the runtime prelude out of the bundle
        #[arg(long)]
        omit_runtime: bool,

        /// Print the whole result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace squeezed identifiers in text with their readable names
    Symbolicate {
        /// Text to symbolicate (stdin if omitted)
        input: Option<PathBuf>,

        /// Squeeze map: a token to name object, or a `--json` compile result
        #[arg(short, long)]
        map: Option<PathBuf>,
    },

    /// Lex a Nyx file and show tokens (debug)
    Lex {
        /// Input Nyx file
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse a Nyx file and show its outline AST (debug)
    Parse {
        /// Input Nyx file
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Language {
    /// Diagnostics only
    None,
    Javascript,
    Typescript,
}

impl Language {
    fn option_value(self) -> &'static str {
        match self {
            Language::None => "none",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            inputs,
            config,
            output,
            language,
            squeeze,
            check_types,
            map,
            omit_runtime,
            json,
        } => {
            let flags = CompileFlags {
                language,
                squeeze,
                check_types,
                map,
                omit_runtime,
            };
            compile_command(inputs, config, output, flags, json, cli.verbose)
        }
        Commands::Symbolicate { input, map } => {
            init_logging(cli.verbose);
            symbolicate_command(input, map)
        }
        Commands::Lex { input, positions } => {
            init_logging(cli.verbose);
            lex_command(input, positions)
        }
        Commands::Parse { input } => {
            init_logging(cli.verbose);
            parse_command(input)
        }
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

struct CompileFlags {
    language: Option<Language>,
    squeeze: bool,
    check_types: bool,
    map: bool,
    omit_runtime: bool,
}

fn compile_command(
    inputs: Vec<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    flags: CompileFlags,
    json: bool,
    verbose: bool,
) -> ExitCode {
    let mut options = match config {
        Some(path) => match load_config(&path) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => RawOptions::new(),
    };
    options.merge(flag_options(inputs, output.as_deref(), &flags));

    let print_log = matches!(
        options.get("dev-print-log"),
        Some(OptionValue::Json(Value::Bool(true)))
    );
    init_logging(verbose || print_log);

    let compiler = CompilerInstance::new();
    let result = match compiler.compile(options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return exit_code(&result);
    }

    for warning in &result.warnings {
        report_issue(warning, ReportKind::Warning, Color::Yellow);
    }
    for error in &result.errors {
        report_issue(error, ReportKind::Error, Color::Red);
    }

    if let Err(e) = write_outputs(&result, output.as_deref()) {
        eprintln!("Error writing output: {}", e);
        return ExitCode::FAILURE;
    }

    exit_code(&result)
}

fn load_config(path: &Path) -> Result<RawOptions, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    RawOptions::from_json_str(&text).map_err(|e| e.to_string())
}

/// Command-line flags as options; they override the config file.
fn flag_options(inputs: Vec<PathBuf>, output: Option<&Path>, flags: &CompileFlags) -> RawOptions {
    let mut options = RawOptions::new();

    if !inputs.is_empty() {
        let files: Vec<SourceFile> = inputs
            .iter()
            .map(|path| SourceFile::on_disk(path.to_string_lossy()))
            .collect();
        options.insert("files", files);
    }
    if let Some(language) = flags.language {
        options.insert("output-language", language.option_value());
    }
    if flags.squeeze {
        options.insert("squeeze", true);
    }
    if flags.check_types {
        options.insert("check-types", true);
    }
    if flags.omit_runtime {
        options.insert("dev-omit-runtime", true);
    }
    if flags.map {
        options.insert("include-map", true);
        if let Some(output) = output {
            let file = output.file_name().map(|name| name.to_string_lossy().into_owned());
            if let Some(file) = file {
                options.insert("source-map-file", file);
            }
        }
    }

    options
}

fn write_outputs(result: &CompileOutput, output: Option<&Path>) -> io::Result<()> {
    let Some(code) = &result.code else {
        return Ok(());
    };

    match output {
        Some(path) => {
            fs::write(path, code)?;
            if let Some(map) = &result.map {
                let mut map_path = path.as_os_str().to_owned();
                map_path.push(".map");
                fs::write(map_path, map)?;
            }
        }
        None => println!("{}", code),
    }
    Ok(())
}

fn exit_code(result: &CompileOutput) -> ExitCode {
    if result.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn symbolicate_command(input: Option<PathBuf>, map: Option<PathBuf>) -> ExitCode {
    let text = match &input {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    let text = match text {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading input: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let table = match map.as_deref().map(load_squeeze_map).transpose() {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error loading squeeze map: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let lookup = match &table {
        Some(table) => Unsqueeze::Map(table),
        None => Unsqueeze::None,
    };
    print!("{}", symbolicate(&text, lookup));
    ExitCode::SUCCESS
}

fn load_squeeze_map(path: &Path) -> Result<BTreeMap<String, String>, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;

    let table = match value.get("squeezed") {
        Some(squeezed) => squeezed.clone(),
        None => value,
    };
    serde_json::from_value(table).map_err(|e| e.to_string())
}

fn lex_command(input: PathBuf, positions: bool) -> ExitCode {
    let source = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filename = input.to_string_lossy().to_string();
    let tokens = Lexer::new(&source).tokenize();

    println!("Tokens for {}:\n", filename);
    println!("{}", "=".repeat(80));

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Eof {
            println!("\n{:4} | {:?}", i, token.kind);
            break;
        }

        if positions {
            println!(
                "{:4} | {:20?} | {:?} | {}..{}",
                i, token.kind, token.value, token.span.start, token.span.end
            );
        } else {
            println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
        }
    }

    println!("{}", "=".repeat(80));
    println!("\nTotal tokens: {}", tokens.len());

    let error_count = tokens.iter().filter(|t| t.kind == TokenKind::Error).count();
    if error_count > 0 {
        println!("\nLexer errors found: {}", error_count);
        report_lexer_errors(&tokens, &filename, &source);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn parse_command(input: PathBuf) -> ExitCode {
    let source = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filename = input.to_string_lossy().to_string();

    match nyx_parser::parse(&source) {
        Ok(parsed) => {
            println!("{:#?}", parsed.program);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(
                ReportKind::Error,
                Color::Red,
                "Parse error",
                &err.message,
                err.span.start,
                err.span.end,
                &filename,
                &source,
            );
            ExitCode::FAILURE
        }
    }
}

// Helper functions

fn report_lexer_errors(tokens: &[Token], filename: &str, source: &str) {
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Error) {
        report_error(
            ReportKind::Error,
            Color::Red,
            "Lexical error",
            &token.value,
            token.span.start,
            token.span.end,
            filename,
            source,
        );
    }
}

/// Renders an issue against its file when the file can be read; plain text
/// otherwise.
fn report_issue(issue: &Issue, kind: ReportKind<'_>, color: Color) {
    let located = issue.file.as_ref().zip(issue.line).and_then(|(file, line)| {
        let source = fs::read_to_string(file).ok()?;
        let start = LineIndex::new(&source).line_start(line)? + issue.column.unwrap_or(0);
        (start <= source.len()).then(|| (file.clone(), source, start))
    });

    let Some((file, source, start)) = located else {
        let label = if matches!(kind, ReportKind::Warning) { "warning" } else { "error" };
        eprintln!("{}: {}", label, issue);
        return;
    };

    let end = (start + 1).min(source.len());
    let title = match &issue.cause {
        Some(cause) => format!("{} ({})", issue.message, cause),
        None => issue.message.clone(),
    };
    report_error(kind, color, &title, &issue.message, start, end, &file, &source);
}

#[allow(clippy::too_many_arguments)]
fn report_error(
    kind: ReportKind<'_>,
    color: Color,
    title: &str,
    message: &str,
    start: usize,
    end: usize,
    filename: &str,
    source: &str,
) {
    let span = (filename, start..end);
    let _ = Report::build(kind, span.clone())
        .with_message(title)
        .with_label(Label::new(span).with_message(message).with_color(color))
        .finish()
        .eprint((filename, Source::from(source)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_options_override_config() {
        let mut options = RawOptions::from_json(json!({ "squeeze": false, "files": ["a.nx"] })).unwrap();
        let flags = CompileFlags {
            language: Some(Language::Typescript),
            squeeze: true,
            check_types: false,
            map: true,
            omit_runtime: false,
        };
        options.merge(flag_options(Vec::new(), Some(Path::new("out/bundle.js")), &flags));

        let options = nyx_driver::CompilerOptions::new(&options).unwrap();
        assert!(options.squeeze());
        assert!(options.include_map());
        assert_eq!(options.source_map_file(), Some("bundle.js"));
        assert_eq!(options.output_language(), nyx_driver::OutputLanguage::TypeScript);
        assert_eq!(options.files().len(), 1);
    }
}
