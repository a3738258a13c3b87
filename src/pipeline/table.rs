//! JSON → tabular records → CSV.
//!
//! Accepted shapes, with columns inferred from the data:
//!
//! | JSON                              | Columns                         | Rows                   |
//! |-----------------------------------|---------------------------------|------------------------|
//! | `[{..}, {..}]`                    | union of keys, first-seen order | one per object         |
//! | `[[..], [..]]`                    | `0..n` for the widest row       | one per inner array    |
//! | `[1, "a", ..]`                    | `0`                             | one per element        |
//! | `{"k": [..], "j": [..]}`          | object keys                     | zipped, padded         |
//! | `{"k": [..], "j": "x"}`           | object keys                     | zipped, `x` repeated   |
//! | `{"rows": [...]}` (one key)       | from the wrapped array          | from the wrapped array |
//! | `{"k": 1, "j": "x"}`              | object keys                     | one                    |
//!
//! A top-level scalar is not tabular. Objects with no keys contribute no
//! columns, so `[{}]` yields an empty record set.

use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

/// Parsed rows and columns of one extraction result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    /// Cells in column order; every row has `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
}

/// Why a JSON value could not be turned into a table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected an array or object, found {found}")]
pub struct ShapeError {
    pub found: &'static str,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Render one JSON value as a CSV cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

impl RecordSet {
    pub fn from_json(value: &Value) -> Result<Self, ShapeError> {
        match value {
            Value::Array(items) => Ok(Self::from_array(items)),
            Value::Object(map) => Ok(Self::from_object(map)),
            other => Err(ShapeError { found: kind(other) }),
        }
    }

    fn from_array(items: &[Value]) -> Self {
        if items.is_empty() {
            return Self::default();
        }
        if items.iter().any(Value::is_object) {
            Self::from_objects(items)
        } else if items.iter().any(Value::is_array) {
            Self::from_arrays(items)
        } else {
            Self {
                columns: vec!["0".to_string()],
                rows: items.iter().map(|v| vec![cell_text(v)]).collect(),
            }
        }
    }

    /// Rows of objects. Non-object entries land in a `value` column.
    fn from_objects(items: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for item in items {
            match item {
                Value::Object(map) => {
                    for key in map.keys() {
                        if !columns.iter().any(|c| c == key) {
                            columns.push(key.clone());
                        }
                    }
                }
                _ => {
                    if !columns.iter().any(|c| c == "value") {
                        columns.push("value".to_string());
                    }
                }
            }
        }

        // Only empty objects: nothing to tabulate.
        if columns.is_empty() {
            return Self::default();
        }

        let rows = items
            .iter()
            .map(|item| {
                columns
                    .iter()
                    .map(|col| match item {
                        Value::Object(map) => map.get(col).map(cell_text).unwrap_or_default(),
                        other if col == "value" => cell_text(other),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Positional rows. Scalars count as one-cell rows.
    fn from_arrays(items: &[Value]) -> Self {
        let width = items
            .iter()
            .map(|v| v.as_array().map_or(1, Vec::len))
            .max()
            .unwrap_or(0);
        let columns = (0..width).map(|i| i.to_string()).collect();

        let rows = items
            .iter()
            .map(|item| {
                let mut row: Vec<String> = match item {
                    Value::Array(cells) => cells.iter().map(cell_text).collect(),
                    other => vec![cell_text(other)],
                };
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        // {"rows": [...]} style wrapper.
        if map.len() == 1 {
            if let Some(Value::Array(items)) = map.values().next() {
                if items.iter().any(|v| v.is_object() || v.is_array()) {
                    return Self::from_array(items);
                }
            }
        }

        let columns: Vec<String> = map.keys().cloned().collect();

        // Column-oriented: array values fill downwards, non-array values
        // repeat on every row.
        if map.values().any(Value::is_array) {
            let height = map
                .values()
                .filter_map(Value::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let rows = (0..height)
                .map(|r| {
                    map.values()
                        .map(|col| match col {
                            Value::Array(cells) => cells.get(r).map(cell_text).unwrap_or_default(),
                            other => cell_text(other),
                        })
                        .collect()
                })
                .collect();
            return Self { columns, rows };
        }

        let row = map.values().map(cell_text).collect();
        Self {
            columns,
            rows: vec![row],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Serialise as CSV: header row, then data rows, `\n`-terminated.
    /// A record set without columns serialises to nothing.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        if !self.is_empty() {
            out.write_record(&self.columns)?;
            for row in &self.rows {
                out.write_record(row)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        // The csv writer only emits the UTF-8 it was given.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the CSV to `path`, replacing any existing file.
    pub fn write_csv_file(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv_of(value: Value) -> String {
        RecordSet::from_json(&value).unwrap().to_csv_string().unwrap()
    }

    #[test]
    fn objects_become_rows() {
        assert_eq!(csv_of(json!([{"a": 1, "b": 2}])), "a,b\n1,2\n");
    }

    #[test]
    fn header_is_union_of_keys_in_first_seen_order() {
        let csv = csv_of(json!([
            {"Date": "2024-01-02", "Amount": 10.5},
            {"Date": "2024-01-03", "Memo": "coffee, large", "Amount": -3}
        ]));
        assert_eq!(
            csv,
            "Date,Amount,Memo\n2024-01-02,10.5,\n2024-01-03,-3,\"coffee, large\"\n"
        );
    }

    #[test]
    fn cell_rendering() {
        let csv = csv_of(json!([{"n": null, "t": true, "nested": {"x": [1]}}]));
        assert_eq!(csv, "n,t,nested\n,true,\"{\"\"x\"\":[1]}\"\n");
    }

    #[test]
    fn arrays_are_positional_and_padded() {
        let csv = csv_of(json!([["Item", "Qty"], ["Bolt", 4, "extra"], ["Nut"]]));
        assert_eq!(csv, "0,1,2\nItem,Qty,\nBolt,4,extra\nNut,,\n");
    }

    #[test]
    fn scalars_become_single_column() {
        assert_eq!(csv_of(json!(["x", 2])), "0\nx\n2\n");
    }

    #[test]
    fn column_oriented_object() {
        let csv = csv_of(json!({"name": ["a", "b", "c"], "qty": [1, 2]}));
        assert_eq!(csv, "name,qty\na,1\nb,2\nc,\n");
    }

    #[test]
    fn scalars_repeat_beside_column_arrays() {
        let csv = csv_of(json!({"a": [1, 2], "b": "x"}));
        assert_eq!(csv, "a,b\n1,x\n2,x\n");
    }

    #[test]
    fn empty_objects_have_no_rows() {
        let records = RecordSet::from_json(&json!([{}, {}])).unwrap();
        assert!(records.is_empty());
        assert!(records.rows.is_empty());
        assert_eq!(records.to_csv_string().unwrap(), "");
    }

    #[test]
    fn single_key_wrapper_is_unwrapped() {
        let csv = csv_of(json!({"table": [{"a": 1}, {"a": 2}]}));
        assert_eq!(csv, "a\n1\n2\n");
    }

    #[test]
    fn single_key_scalar_list_stays_column() {
        let csv = csv_of(json!({"totals": [1, 2]}));
        assert_eq!(csv, "totals\n1\n2\n");
    }

    #[test]
    fn flat_object_is_one_row() {
        assert_eq!(csv_of(json!({"k": "v", "n": 3})), "k,n\nv,3\n");
    }

    #[test]
    fn empty_array_writes_nothing() {
        assert_eq!(csv_of(json!([])), "");
    }

    #[test]
    fn scalar_is_not_tabular() {
        let err = RecordSet::from_json(&json!("Not a table")).unwrap_err();
        assert_eq!(err.to_string(), "expected an array or object, found a string");
    }
}
