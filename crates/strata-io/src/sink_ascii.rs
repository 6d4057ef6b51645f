//! Human-readable row rendering, one event per line.

use async_trait::async_trait;
use std::fmt::Write as _;
use strata_core::{Result, Slice};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct AsciiWriter {
    out: Box<dyn AsyncWrite + Send + Unpin>,
}

impl AsciiWriter {
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
impl crate::Writer for AsciiWriter {
    fn name(&self) -> &str {
        "ascii"
    }

    async fn write(&mut self, slice: &Slice) -> Result<()> {
        let name = slice.layout().name();
        let mut buffer = String::new();
        for row in 0..slice.rows() {
            let _ = write!(buffer, "{} [{}] (", name, slice.offset() + row as u64);
            for column in 0..slice.columns() {
                if column > 0 {
                    buffer.push_str(", ");
                }
                let _ = write!(buffer, "{}", slice.at(row, column));
            }
            buffer.push_str(")\n");
        }
        self.out.write_all(buffer.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writer;
    use strata_core::{Data, GenericSlice, Type};

    #[tokio::test]
    async fn renders_rows_with_absolute_ids() {
        let layout =
            Type::record([("a", Type::integer()), ("b", Type::string())]).with_name("event");
        let mut slice = GenericSlice::make(
            layout,
            &[
                vec![Data::Integer(1), Data::from("x")],
                vec![Data::Integer(2), Data::from("y")],
            ],
        )
        .unwrap();
        slice.set_offset(10);

        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = AsciiWriter::open(file.path().to_str()).unwrap();
        writer.write(&slice).await.unwrap();
        writer.flush().await.unwrap();
        let rendered = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(rendered, "event [10] (1, \"x\")\nevent [11] (2, \"y\")\n");
    }
}
