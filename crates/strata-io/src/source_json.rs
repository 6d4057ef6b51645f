//! JSON-lines reader against a declared layout.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use strata_core::{Data, Error, Result, Slice, SliceBuilder, Type};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

pub struct JsonReader {
    paths: VecDeque<PathBuf>,
    lines: Option<Lines<BufReader<File>>>,
    layout: Type,
}

impl JsonReader {
    /// Creates a reader over `pattern` producing slices under `layout`.
    pub fn new(pattern: &str, layout: Type) -> Result<Self> {
        if !layout.is_record() {
            return Err(Error::inconsistent_schema(format!(
                "the json source needs a record layout, got {layout}"
            )));
        }
        Ok(Self {
            paths: crate::expand_paths(pattern)?.into(),
            lines: None,
            layout: layout.flatten(),
        })
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(lines) = &mut self.lines {
                match lines.next_line().await? {
                    Some(line) => return Ok(Some(line)),
                    None => self.lines = None,
                }
            }
            let Some(path) = self.paths.pop_front() else {
                return Ok(None);
            };
            let file = File::open(&path).await?;
            self.lines = Some(BufReader::new(file).lines());
        }
    }

    fn row(&self, object: &Value) -> Result<Vec<Data>> {
        let fields = self.layout.fields().unwrap_or_default();
        fields
            .iter()
            .map(|field| match lookup(object, &field.name) {
                Some(value) => crate::json_to_data(&field.ty, value),
                None => Ok(Data::None),
            })
            .collect()
    }
}

/// Finds a field in a JSON object, first by its literal (possibly dotted)
/// name, then by descending into nested objects along the dots.
fn lookup<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(key) {
        return Some(value);
    }
    let mut current = object;
    for segment in key.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[async_trait]
impl crate::Reader for JsonReader {
    fn name(&self) -> &str {
        "json"
    }

    fn layout(&self) -> Option<&Type> {
        Some(&self.layout)
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Slice>> {
        let mut builder = SliceBuilder::new(self.layout.clone())?;
        while builder.rows() < max_rows {
            let Some(line) = self.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let object: Value = match serde_json::from_str(&line) {
                Ok(object) => object,
                Err(e) => {
                    warn!(error = %e, "skips malformed json line");
                    continue;
                }
            };
            match self.row(&object) {
                Ok(row) => builder.add_row(row)?,
                Err(e) => warn!(error = %e, "skips mistyped json line"),
            }
        }
        if builder.rows() == 0 {
            return Ok(None);
        }
        builder.finish().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reader;
    use std::io::Write as _;

    #[tokio::test]
    async fn reads_flat_and_nested_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": {{"orig_h": "10.0.0.1"}}, "bytes": 42}}"#).unwrap();
        writeln!(file, r#"{{"id.orig_h": "10.0.0.2", "bytes": 7}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, r#"{{"bytes": 1}}"#).unwrap();
        file.flush().unwrap();

        let layout = Type::record([
            ("id", Type::record([("orig_h", Type::address())])),
            ("bytes", Type::count()),
        ])
        .with_name("event");
        let mut reader = JsonReader::new(file.path().to_str().unwrap(), layout).unwrap();
        let slice = reader.next_batch(100).await.unwrap().unwrap();
        assert_eq!(slice.rows(), 3);
        assert_eq!(slice.columns(), 2);
        assert_eq!(
            slice.at(0, 0),
            &Data::Address("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            slice.at(1, 0),
            &Data::Address("10.0.0.2".parse().unwrap())
        );
        // A missing field is null.
        assert_eq!(slice.at(2, 0), &Data::None);
        assert_eq!(slice.at(2, 1), &Data::Count(1));
        assert!(reader.next_batch(100).await.unwrap().is_none());
    }
}
