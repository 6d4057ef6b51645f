//! JSON export, one object per row keyed by flat column names.

use async_trait::async_trait;
use serde_json::{Map, Value};
use strata_core::{Result, Slice};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct JsonWriter {
    out: Box<dyn AsyncWrite + Send + Unpin>,
}

impl JsonWriter {
    /// Opens the output file, or standard output when no path is given.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let out: Box<dyn AsyncWrite + Send + Unpin> = match path {
            Some(path) => Box::new(tokio::fs::File::from_std(std::fs::File::create(path)?)),
            None => Box::new(tokio::io::stdout()),
        };
        Ok(Self { out })
    }
}

#[async_trait]
impl crate::Writer for JsonWriter {
    fn name(&self) -> &str {
        "json"
    }

    async fn write(&mut self, slice: &Slice) -> Result<()> {
        let fields = slice.layout().fields().unwrap_or_default();
        let mut buffer = Vec::new();
        for row in 0..slice.rows() {
            let mut object = Map::new();
            for (column, field) in fields.iter().enumerate() {
                object.insert(field.name.clone(), crate::data_to_json(slice.at(row, column)));
            }
            serde_json::to_writer(&mut buffer, &Value::Object(object))
                .map_err(|e| strata_core::Error::io(e.to_string()))?;
            buffer.push(b'\n');
        }
        self.out.write_all(&buffer).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }
}
