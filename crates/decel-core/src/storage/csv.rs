//! The `csv` payload of a saved table.

use crate::error::{DecelError, Result};
use crate::table::Table;
use decel_engine::engine::{CellRef, Value};

/// Render every stored value of `table` from `A1` to its bounds.
///
/// Formula cells contribute their last computed value. Empty cells are
/// written as empty fields so row and column positions survive.
pub fn write_payload(table: &Table) -> Result<String> {
    write_grid(table, Value::to_storage_string)
}

/// Like [`write_payload`] but with values formatted for display.
pub fn write_display(table: &Table) -> Result<String> {
    write_grid(table, |value| value.to_string())
}

fn write_grid<F>(table: &Table, render: F) -> Result<String>
where
    F: Fn(&Value) -> String,
{
    let Some((max_row, max_col)) = table.bounds() else {
        return Ok(String::new());
    };

    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in 0..=max_row {
        let record: Vec<String> = (0..=max_col)
            .map(|col| render(&table.stored_value(CellRef::new(row, col))))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DecelError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| DecelError::InvalidDocument(e.to_string()))
}

/// Parse a payload back into non-empty `(cell, value)` pairs.
pub fn read_payload(payload: &str) -> Result<Vec<(CellRef, Value)>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload.as_bytes());

    let mut cells = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for (col, field) in record.iter().enumerate() {
            let value = parse_field(field);
            if !value.is_empty() {
                cells.push((CellRef::new(row, col), value));
            }
        }
    }
    Ok(cells)
}

/// Interpret one CSV field.
/// - Empty string -> Empty
/// - Valid number -> Number (unless it has leading zeros like "007")
/// - `NaN`, `inf`, `-inf` as written for non-finite numbers -> Number
/// - Otherwise -> Text
pub fn parse_field(field: &str) -> Value {
    if field.is_empty() {
        return Value::Empty;
    }

    // Surrounding whitespace means the value was text.
    let trimmed = field.trim();
    if field != trimmed {
        return Value::text(field);
    }

    if trimmed.starts_with('0')
        && trimmed.len() > 1
        && !trimmed.starts_with("0.")
        && trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    {
        return Value::text(trimmed);
    }

    match trimmed {
        "NaN" => return Value::Number(f64::NAN),
        "inf" => return Value::Number(f64::INFINITY),
        "-inf" => return Value::Number(f64::NEG_INFINITY),
        _ => {}
    }

    if looks_numeric(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Number(n);
        }
    }

    Value::text(trimmed)
}

/// `str::parse::<f64>` also accepts `inf` and `NaN`; only ordinary decimal
/// text is read as a number.
pub(crate) fn looks_numeric(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field(""), Value::Empty);
        assert_eq!(parse_field("42"), Value::Number(42.0));
        assert_eq!(parse_field("-1.5"), Value::Number(-1.5));
        assert_eq!(parse_field("0.25"), Value::Number(0.25));
        assert_eq!(parse_field("0"), Value::Number(0.0));
        assert_eq!(parse_field("007"), Value::text("007"));
        assert_eq!(parse_field("  padded "), Value::text("  padded "));
        assert!(matches!(parse_field("NaN"), Value::Number(n) if n.is_nan()));
        assert_eq!(parse_field("-inf"), Value::Number(f64::NEG_INFINITY));
        assert_eq!(parse_field("Infinity"), Value::text("Infinity"));
        assert_eq!(parse_field("hello"), Value::text("hello"));
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        assert_eq!(write_payload(&Table::new()).unwrap(), "");
    }

    #[test]
    fn test_write_payload_layout() {
        let mut table = Table::new();
        table.set_value(CellRef::new(0, 0), Value::Number(1.0));
        table.set_value(CellRef::new(1, 2), Value::text("a, b"));
        table.set_value(CellRef::new(2, 1), Value::Number(0.1));

        let payload = write_payload(&table).unwrap();
        assert_eq!(payload, "1,,\n,,\"a, b\"\n,0.1,\n");
    }

    #[test]
    fn test_write_display_formats_numbers() {
        let mut table = Table::new();
        table.set_value(CellRef::new(0, 0), Value::Number(2.0 / 3.0));
        table.set_value(CellRef::new(0, 1), Value::Number(4.0));
        assert_eq!(write_display(&table).unwrap(), "0.67,4\n");
        assert!(write_payload(&table).unwrap().starts_with("0.6666"));
    }

    #[test]
    fn test_single_column_blank_rows_keep_position() {
        let mut table = Table::new();
        table.set_value(CellRef::new(0, 0), Value::text("top"));
        table.set_value(CellRef::new(3, 0), Value::text("bottom"));

        let payload = write_payload(&table).unwrap();
        let cells = read_payload(&payload).unwrap();
        assert_eq!(
            cells,
            vec![
                (CellRef::new(0, 0), Value::text("top")),
                (CellRef::new(3, 0), Value::text("bottom")),
            ]
        );
    }

    #[test]
    fn test_read_payload_ragged_rows() {
        let cells = read_payload("1,2,3\n4\n").unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3], (CellRef::new(1, 0), Value::Number(4.0)));
    }
}
