//! Purpose: `coltext` CLI entry point; encode/decode column text from the shell.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit one JSON document on stdout on success.
//! Invariants: Errors go to stderr as JSON when stderr is not a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use coltext::api::{ColumnKind, Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run<I>(args: I) -> Result<RunOutcome, Error>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `coltext --help` for usage."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_decode_hint)
        .map_err(add_io_hint)
}

#[derive(Parser)]
#[command(
    name = "coltext",
    version,
    about = "Encode and decode typed values stored in text columns",
    long_about = None,
    after_help = r#"EXAMPLES
  $ coltext encode tags '["metal", "cubic"]'
  {"kind":"tags","raw":"metal|cubic"}
  $ coltext decode array 'nda1;i8;2,2;1,2,3,4'
  {"dtype":"i8","kind":"array","shape":[2,2],"value":[[1,2],[3,4]]}
  $ coltext row read --schema schema.json '{"data": "{\"a\":1}"}'

Set RUST_LOG=debug to trace codec failures on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Tags,
    Array,
    Mapping,
    Json,
}

impl From<KindArg> for ColumnKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Tags => ColumnKind::Tags,
            KindArg::Array => ColumnKind::Array,
            KindArg::Mapping => ColumnKind::Mapping,
            KindArg::Json => ColumnKind::Json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Encode a JSON value into column text.
    Encode {
        kind: KindArg,
        #[arg(help = "JSON value (reads stdin when omitted)")]
        value: Option<String>,
        #[arg(long, default_value = coltext::api::DEFAULT_TAG_DELIMITER, help = "Tag delimiter")]
        delimiter: String,
        #[arg(long, help = "Reject tags that would not round-trip")]
        strict: bool,
    },
    /// Decode column text into JSON.
    Decode {
        kind: KindArg,
        #[arg(help = "Raw column text (reads stdin when omitted)")]
        raw: Option<String>,
        #[arg(long, conflicts_with = "raw", help = "Treat the column as NULL")]
        null: bool,
        #[arg(long, default_value = coltext::api::DEFAULT_TAG_DELIMITER, help = "Tag delimiter")]
        delimiter: String,
    },
    /// Decode or encode whole rows using a column schema file.
    Row {
        #[command(subcommand)]
        command: RowCommand,
    },
    /// Print a shell completion script.
    Completion { shell: Shell },
    /// Print version information.
    Version,
}

#[derive(Subcommand)]
enum RowCommand {
    /// Raw row object (column -> text|null) to typed values.
    Read {
        #[arg(long, value_hint = ValueHint::FilePath)]
        schema: PathBuf,
        #[arg(help = "Row JSON (reads stdin when omitted)")]
        row: Option<String>,
    },
    /// Typed values object (column -> JSON) to a raw row.
    Write {
        #[arg(long, value_hint = ValueHint::FilePath)]
        schema: PathBuf,
        #[arg(help = "Values JSON (reads stdin when omitted)")]
        values: Option<String>,
    },
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim_start_matches("error: ").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn read_input(arg: Option<String>, what: &str) -> Result<String, Error> {
    if let Some(value) = arg {
        return Ok(value);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message(format!("failed to read {what} from stdin"))
            .with_source(err)
    })?;
    Ok(buf)
}

fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

fn parse_json_arg(text: &str, what: &str) -> Result<Value, Error> {
    serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} is not valid JSON: {err}"))
            .with_source(err)
    })
}

fn add_decode_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::MalformedArray => {
            err.with_hint("Array columns must hold text written by `coltext encode array`.")
        }
        ErrorKind::MalformedMapping => {
            err.with_hint("Mapping columns must hold a JSON object, e.g. {\"a\":1}.")
        }
        ErrorKind::JsonParse => err.with_hint("JSON columns must hold valid JSON text."),
        _ => err,
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path and that stdin is readable.")
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(column) = err.column() {
        lines.push(format!("column: {column}"));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    lines.join("\n")
}
