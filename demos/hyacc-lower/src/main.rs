use std::{ops::Range, path::PathBuf, process::ExitCode, sync::Arc};

use ariadne::{ColorGenerator, Config, IndexType, Label, Report, ReportKind, Source};
use clap::Parser as ClapParser;
use hyacc::{
    clause::ClauseRecord,
    config::LoweringConfig,
    device::DeviceRegistry,
    ir::{
        GenericOp, Operation,
        operand::{Location, Value},
    },
    lower::LoopSkeleton,
    parser::parse_clauses,
    session::{Directive, Session},
    utils::{Error, ParserError},
};
use log::info;

/// Lower every `#pragma acc loop` line of a file and print the resulting IR.
#[derive(ClapParser)]
pub struct Arguments {
    /// Path to the input file
    input: PathBuf,

    /// Lowering configuration (TOML). Defaults to `$HYACC_CONFIG_PATH` or the
    /// user configuration directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

const DIRECTIVE: &str = "#pragma acc loop";

/// A directive line found in the input.
struct Line {
    number: u32,
    column: u32,
    /// Byte offset of the directive within the file.
    offset: usize,
    text: String,
}

fn find_directives(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for (index, line) in source.split_inclusive('\n').enumerate() {
        let trimmed = line.trim_start();
        let is_directive = trimmed
            .strip_prefix(DIRECTIVE)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
        if is_directive {
            let indent = line.len() - trimmed.len();
            lines.push(Line {
                number: index as u32 + 1,
                column: indent as u32 + 1,
                offset: offset + indent,
                text: trimmed.trim_end().to_string(),
            });
        }
        offset += line.len();
    }
    lines
}

/// Stand-in for `for (unsigned I = 0u; I < N; ++I);` on the line after the
/// directive.
fn synthetic_skeleton(file: &str, line: u32) -> hyacc::utils::Result<LoopSkeleton> {
    let i = Value(0);
    let op = |result: u32, name: &str, operands: &[Value], ty: &str| -> Operation {
        GenericOp::new(name, operands.iter().copied())
            .with_result(Value(result))
            .with_type(ty)
            .into()
    };

    LoopSkeleton::builder(Location::new(file, line + 1, 3))
        .init([op(0, "cir.alloca", &[], "!cir.ptr<!u32i>")])
        .cond(
            [
                op(1, "cir.load", &[i], "!u32i"),
                op(2, "cir.const", &[], "!u32i"),
                op(3, "cir.cmp", &[Value(1), Value(2)], "!cir.bool"),
            ],
            Value(3),
        )
        .body([])
        .step([
            op(4, "cir.load", &[i], "!u32i"),
            op(5, "cir.unary", &[Value(4)], "!u32i"),
            GenericOp::new("cir.store", [Value(5), i]).into(),
        ])
        .build()
}

fn report(file: &str, source: &str, span: Range<usize>, message: String, label: &str) {
    let mut colors = ColorGenerator::new();
    let color = colors.next();
    let span = (file.to_string(), span);

    let printed = Report::build(ReportKind::Error, span.clone())
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(message)
        .with_label(Label::new(span).with_message(label).with_color(color))
        .finish()
        .eprint((file.to_string(), Source::from(source)));

    if let Err(err) = printed {
        eprintln!("Failed to render diagnostic: {}", err);
    }
}

fn report_parser_errors(file: &str, source: &str, line: &Line, errors: &[ParserError]) {
    for error in errors {
        report(
            file,
            source,
            line.offset + error.start..line.offset + error.end,
            error.message.clone(),
            "The error occurred here",
        );
    }
}

/// Span of the clause an error points at, or of the whole directive.
fn error_span(line: &Line, records: &[ClauseRecord], error: &Error) -> Range<usize> {
    match error {
        Error::MalformedClause {
            index: Some(index), ..
        } => match records.get(*index) {
            Some(record) => line.offset + record.span.start..line.offset + record.span.end,
            None => line.offset..line.offset + line.text.len(),
        },
        _ => line.offset..line.offset + line.text.len(),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();

    let config = match &args.config {
        Some(path) => LoweringConfig::load_from_toml(path),
        None => LoweringConfig::load_or_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let file = args.input.display().to_string();
    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to read {}: {}", file, err);
            return ExitCode::FAILURE;
        }
    };

    let session = Session::with_config(config, Arc::new(DeviceRegistry::new()));
    let lines = find_directives(&source);
    info!("Found {} loop directive(s) in {}.", lines.len(), file);

    let mut failed = false;
    let mut parsed = Vec::new();
    let mut directives = Vec::new();

    for line in &lines {
        let records = match parse_clauses(&line.text, Some(file.as_str())) {
            Ok(records) => records,
            Err(Error::ParserErrors { errors }) => {
                report_parser_errors(&file, &source, line, &errors);
                failed = true;
                continue;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                return ExitCode::FAILURE;
            }
        };

        let skeleton = match synthetic_skeleton(&file, line.number) {
            Ok(skeleton) => skeleton,
            Err(err) => {
                eprintln!("Error: {}", err);
                return ExitCode::FAILURE;
            }
        };

        parsed.push((line, records.clone()));
        directives.push(Directive {
            records,
            skeleton,
            loc: Location::new(file.as_str(), line.number, line.column),
        });
    }

    let unit = match session.lower_unit(directives) {
        Ok(unit) => unit,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    for ((line, records), outcome) in parsed.iter().zip(&unit.outcomes) {
        match outcome {
            Ok(op) => println!("{}", op.fmt(session.registry())),
            Err(diagnostic) => {
                failed = true;
                report(
                    &file,
                    &source,
                    error_span(line, records, &diagnostic.error),
                    diagnostic.error.to_string(),
                    "in this directive",
                );
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
