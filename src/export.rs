// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Tabular export: heterogeneous JSON records to a single CSV document
//
// The header is the insertion-ordered union of field names across all
// records (first appearance wins). Each row is aligned to that header; fields
// a record lacks render as empty strings. Values are quoted only when they
// contain a delimiter, quote or line break.

use crate::record::SensorRecord;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// CSV-shaped view of a set of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDocument {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped: usize,
}

impl TabularDocument {
    /// Build a document from raw JSON texts, one object per record.
    ///
    /// Texts that are not JSON objects are skipped with a warning and counted
    /// in [`TabularDocument::skipped`]; they never abort the export.
    pub fn from_json_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut objects = Vec::new();
        let mut skipped = 0;

        for (index, text) in records.into_iter().enumerate() {
            match serde_json::from_str::<Value>(text.as_ref()) {
                Ok(Value::Object(map)) => objects.push(map),
                Ok(other) => {
                    warn!(
                        "Skipping record {}: expected a JSON object, found {}",
                        index,
                        json_kind(&other)
                    );
                    skipped += 1;
                }
                Err(e) => {
                    warn!("Skipping malformed record {}: {}", index, e);
                    skipped += 1;
                }
            }
        }

        let mut document = Self::from_objects(objects);
        document.skipped = skipped;
        document
    }

    /// Build a document from already-parsed JSON objects
    pub fn from_objects(objects: Vec<Map<String, Value>>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for object in &objects {
            for key in object.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), headers.len());
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|object| {
                let mut row = vec![String::new(); headers.len()];
                for (key, value) in object {
                    row[positions[key]] = render_value(value);
                }
                row
            })
            .collect();

        debug!(
            "Built tabular document with {} columns",
            headers.len()
        );

        Self {
            headers,
            rows,
            skipped: 0,
        }
    }

    /// Build a document from typed sensor records
    pub fn from_records(records: &[SensorRecord]) -> Self {
        let objects = records
            .iter()
            .filter_map(|record| match serde_json::to_value(record) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            })
            .collect();
        Self::from_objects(objects)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of inputs dropped because they were not JSON objects
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.headers.is_empty()
    }

    /// Render as CSV text, one `\n`-terminated line per row.
    ///
    /// An empty document renders as an empty string, without a header.
    pub fn render(&self) -> csv::Result<String> {
        if self.is_empty() {
            return Ok(String::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;

        // Every cell came from a Rust string
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Display for TabularDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let csv = self.render().map_err(|_| fmt::Error)?;
        f.write_str(&csv)
    }
}

/// Convert raw JSON record texts straight to CSV text
pub fn records_to_csv<S: AsRef<str>>(records: &[S]) -> csv::Result<String> {
    TabularDocument::from_json_records(records).render()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_first_appearance_order() {
        let doc = TabularDocument::from_json_records([r#"{"a":1,"b":2}"#, r#"{"c":3,"a":9}"#]);
        assert_eq!(doc.headers(), &["a", "b", "c"]);
        assert_eq!(doc.render().unwrap(), "a,b,c\n1,2,\n9,,3\n");
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let csv = records_to_csv(&[r#"{"a":1}"#, r#"{"a":2,"b":5}"#]).unwrap();
        assert_eq!(csv, "a,b\n1,\n2,5\n");
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        let empty: [&str; 0] = [];
        assert_eq!(records_to_csv(&empty).unwrap(), "");
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let doc = TabularDocument::from_json_records([
            r#"{"a":1}"#,
            "not json",
            "[1,2]",
            r#"{"a":2}"#,
        ]);
        assert_eq!(doc.skipped(), 2);
        assert_eq!(doc.rows().len(), 2);
        assert_eq!(doc.render().unwrap(), "a\n1\n2\n");
    }

    #[test]
    fn test_values_needing_quotes() {
        let csv = records_to_csv(&[
            r#"{"location":"den, upstairs","note":"say \"hi\""}"#,
            r#"{"location":"line\nbreak","note":"plain"}"#,
        ])
        .unwrap();
        assert_eq!(
            csv,
            "location,note\n\"den, upstairs\",\"say \"\"hi\"\"\"\n\"line\nbreak\",plain\n"
        );
    }

    #[test]
    fn test_scalar_rendering() {
        let csv = records_to_csv(&[r#"{"s":"text","n":22.3,"i":7,"b":true,"z":null}"#]).unwrap();
        assert_eq!(csv, "s,n,i,b,z\ntext,22.3,7,true,\n");
    }

    #[test]
    fn test_from_records_uses_canonical_columns() {
        let doc = TabularDocument::from_records(&[SensorRecord::sample()]);
        assert_eq!(
            doc.to_string(),
            "recorded,location,sensor,measurement,units,value\n1756655999,den,bmp280,temperature,C,22.3\n"
        );
    }
}
