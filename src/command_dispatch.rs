//! Purpose: Hold top-level CLI command dispatch for `coltext`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command goes through the library codecs or registry; no format logic lives here.

use super::*;

use coltext::api::{
    ColumnCodec, ColumnSpec, ColumnValue, MemoryRow, NumericArray, Schema, TagListCodec,
};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "coltext", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_json(json!({
                "name": "coltext",
                "version": env!("CARGO_PKG_VERSION"),
                "array_format_version": coltext::api::ARRAY_FORMAT_VERSION,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Encode {
            kind,
            value,
            delimiter,
            strict,
        } => {
            let kind = ColumnKind::from(kind);
            let codec = build_codec(kind, delimiter, strict)?;
            let input = read_input(value, "value")?;
            let value = ColumnValue::from_json(kind, parse_json_arg(&input, "value")?)?;
            let raw = codec.encode(&value)?;
            emit_json(json!({ "kind": kind, "raw": raw }));
            Ok(RunOutcome::ok())
        }
        Command::Decode {
            kind,
            raw,
            null,
            delimiter,
        } => {
            let kind = ColumnKind::from(kind);
            let codec = build_codec(kind, delimiter, false)?;
            let raw = if null {
                None
            } else {
                Some(match raw {
                    Some(raw) => raw,
                    None => strip_trailing_newline(read_input(None, "raw text")?),
                })
            };
            let value = codec.decode(raw.as_deref())?;
            emit_json(decoded_json(&value));
            Ok(RunOutcome::ok())
        }
        Command::Row { command } => match command {
            RowCommand::Read { schema, row } => {
                let registry = Schema::load(&schema)?.registry()?;
                let input = read_input(row, "row")?;
                let row = raw_row_from_json(parse_json_arg(&input, "row")?)?;
                let values = registry
                    .read_all(&row)?
                    .into_iter()
                    .map(|(column, value)| (column, value.to_json()))
                    .collect::<Map<_, _>>();
                emit_json(json!({ "values": values }));
                Ok(RunOutcome::ok())
            }
            RowCommand::Write { schema, values } => {
                let registry = Schema::load(&schema)?.registry()?;
                let input = read_input(values, "values")?;
                let Value::Object(values) = parse_json_arg(&input, "values")? else {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("values must be a JSON object of column -> value"));
                };
                let mut row = MemoryRow::new();
                for (column, value) in values {
                    let kind = registry.kind(&column)?;
                    let value = ColumnValue::from_json(kind, value)
                        .map_err(|err| err.with_column(column.clone()))?;
                    registry.write(&mut row, &column, &value)?;
                }
                emit_json(json!({ "row": row.cells() }));
                Ok(RunOutcome::ok())
            }
        },
    }
}

fn build_codec(kind: ColumnKind, delimiter: String, strict: bool) -> Result<Box<dyn ColumnCodec>, Error> {
    match kind {
        ColumnKind::Tags => Ok(Box::new(TagListCodec::new(delimiter)?.with_strict(strict))),
        other => ColumnSpec::from(other).build(),
    }
}

fn decoded_json(value: &ColumnValue) -> Value {
    let mut out = Map::new();
    out.insert("kind".to_string(), json!(value.kind()));
    out.insert("value".to_string(), value.to_json());
    if let ColumnValue::Array(array) = value {
        insert_array_meta(&mut out, array);
    }
    Value::Object(out)
}

fn insert_array_meta(out: &mut Map<String, Value>, array: &NumericArray) {
    out.insert("dtype".to_string(), json!(array.dtype().tag()));
    out.insert("shape".to_string(), json!(array.shape()));
}

fn raw_row_from_json(value: Value) -> Result<MemoryRow, Error> {
    let Value::Object(cells) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("row must be a JSON object of column -> text or null"));
    };
    cells
        .into_iter()
        .map(|(column, raw)| match raw {
            Value::Null => Ok((column, None)),
            Value::String(text) => Ok((column, Some(text))),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message("raw column values must be strings or null")
                .with_column(column)),
        })
        .collect()
}
