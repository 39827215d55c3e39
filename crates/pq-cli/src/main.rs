//! The `pqc` command-line driver.
//!
//! Provides two subcommands over the parser toolkit:
//!
//! - `pqc parse <file>` - parse a Power Query (M) source file and print the
//!   resulting AST as an indented tree.
//! - `pqc check <file>` - parse a file and report diagnostics only, exiting
//!   non-zero if parsing failed.
//!
//! Options:
//! - `--policy` - disambiguation policy (`strict` or `thorough`, default `thorough`)
//! - `--mode` - what the file is expected to contain (`document`, `expression`, `section`)

use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};

use pq_common::Position;
use pq_parser::ast::{LeafPayload, NodeKind};
use pq_parser::error::{ParseError, ParseErrorKind};
use pq_parser::state::DisambiguationPolicy;
use pq_parser::xor_node::XorNode;
use pq_parser::{parse, ParseMode, ParseOk, ParseOptions};

#[derive(Parser)]
#[command(name = "pqc", version, about = "The Power Query (M) parser toolkit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print its AST as an indented tree
    Parse {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = CliPolicy::Thorough)]
        policy: CliPolicy,

        #[arg(long, value_enum, default_value_t = CliMode::Document)]
        mode: CliMode,
    },
    /// Parse a file and report diagnostics only
    Check {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = CliPolicy::Thorough)]
        policy: CliPolicy,

        #[arg(long, value_enum, default_value_t = CliMode::Document)]
        mode: CliMode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliPolicy {
    Strict,
    Thorough,
}

impl From<CliPolicy> for DisambiguationPolicy {
    fn from(value: CliPolicy) -> Self {
        match value {
            CliPolicy::Strict => DisambiguationPolicy::Strict,
            CliPolicy::Thorough => DisambiguationPolicy::Thorough,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Document,
    Expression,
    Section,
}

impl From<CliMode> for ParseMode {
    fn from(value: CliMode) -> Self {
        match value {
            CliMode::Document => ParseMode::Document,
            CliMode::Expression => ParseMode::Expression,
            CliMode::Section => ParseMode::Section,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Parse { file, policy, mode } => run_parse(&file, policy.into(), mode.into(), true),
        Commands::Check { file, policy, mode } => run_parse(&file, policy.into(), mode.into(), false),
    };
    process::exit(exit_code);
}

fn run_parse(file: &Path, policy: DisambiguationPolicy, mode: ParseMode, print_tree: bool) -> i32 {
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: failed to read '{}': {}", file.display(), e);
            return 1;
        }
    };

    let (tokens, lex_errors) = pq_lexer::tokenize(&source);
    for lex_error in &lex_errors {
        eprintln!("lex error: {lex_error}");
    }
    if !lex_errors.is_empty() {
        return 1;
    }

    let options = ParseOptions { mode, disambiguation_policy: policy, ..ParseOptions::default() };
    match parse(tokens, options) {
        Ok(ok) => {
            if print_tree {
                print_node(&ok, ok.root, 0);
            }
            0
        }
        Err(error) => {
            report_parse_error(&source, file, &error);
            1
        }
    }
}

fn print_node(ok: &ParseOk, id: u32, depth: usize) {
    let Some(xor) = ok.node_id_map.xor_node(id) else { return };
    let indent = "  ".repeat(depth);
    match xor {
        XorNode::Ast(node) => {
            print!("{indent}{:?}", node.kind);
            if let Some(leaf) = &node.leaf {
                print!(" {}", describe_leaf(leaf));
            }
            println!();
            for &child in &node.children {
                print_node(ok, child, depth + 1);
            }
        }
        XorNode::Context(ctx) => {
            println!("{indent}{:?} (incomplete)", ctx.kind);
        }
    }
}

fn describe_leaf(leaf: &LeafPayload) -> String {
    match leaf {
        LeafPayload::Constant(c) => format!("{c:?}"),
        LeafPayload::Identifier(s) => format!("{s:?}"),
        LeafPayload::GeneralizedIdentifier(s) => format!("{s:?}"),
        LeafPayload::Literal(kind, text) => format!("{kind:?}({text:?})"),
        LeafPayload::PrimitiveType(s) => format!("{s:?}"),
    }
}

/// Render a [`ParseError`] with `ariadne`, converting the error's
/// line/code-unit [`Position`] into the byte offset `ariadne` expects.
fn report_parse_error(source: &str, file: &Path, error: &ParseError) {
    let (message, position) = describe_error(error);
    let start = byte_offset(source, position);
    let end = (start + 1).min(source.len().max(1));

    eprintln!("{}:{}:{}: parse error", file.display(), position.line_number, position.column);
    let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_message("Parse error")
        .with_label(Label::new(start..end).with_message(&message))
        .finish()
        .eprint(Source::from(source));
}

fn describe_error(error: &ParseError) -> (String, Position) {
    let message = error.to_string();
    let position = match &error.kind {
        ParseErrorKind::ExpectedTokenKind { found, .. } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::ExpectedAnyTokenKind { found, .. } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::ExpectedClosingTokenKind { found, .. } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::ExpectedCsvContinuation { found } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::ExpectedGeneralizedIdentifier { found } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::InvalidPrimitiveType { found } => Some(found.position_start),
        ParseErrorKind::InvalidCatchFunction { found } => found.as_ref().map(|t| t.position_start),
        ParseErrorKind::RequiredParameterAfterOptional { position } => Some(*position),
        ParseErrorKind::UnterminatedSequence { opened_at } => Some(*opened_at),
        ParseErrorKind::UnusedTokensRemain { first_unused } => Some(first_unused.position_start),
        ParseErrorKind::InvariantError(_) | ParseErrorKind::Cancelled => None,
    };
    (message, position.unwrap_or_else(Position::start))
}

/// `position.line_code_unit` counts UTF-16 code units into the line;
/// this walks `source`'s matching line char-by-char, re-encoding each char
/// to UTF-16 to find the byte offset of that code-unit boundary.
fn byte_offset(source: &str, position: Position) -> usize {
    let mut line_start_byte = 0usize;
    let mut current_line = 1u32;
    if position.line_number > 1 {
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                current_line += 1;
                if current_line == position.line_number {
                    line_start_byte = i + 1;
                    break;
                }
            }
        }
    }

    let line_text = &source[line_start_byte..];
    let mut code_units = 0u32;
    let mut byte_offset = 0usize;
    for c in line_text.chars() {
        if code_units >= position.line_code_unit {
            break;
        }
        code_units += c.len_utf16() as u32;
        byte_offset += c.len_utf8();
    }
    line_start_byte + byte_offset
}
