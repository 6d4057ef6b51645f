//! A deterministic synthetic telemetry generator.
//!
//! Produces flow-like events from a counter, so every run yields the same
//! data. Used to exercise the ingest pipeline without external input.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use strata_core::{Data, Port, Protocol, Result, Slice, SliceBuilder, Timestamp, Type};

/// Epoch of the first generated event: 2020-01-01T00:00:00Z.
const BASE_TIME_SECS: i64 = 1_577_836_800;

pub struct TestReader {
    layout: Type,
    produced: u64,
    limit: u64,
}

impl TestReader {
    pub fn new(limit: u64) -> Self {
        Self {
            layout: Self::layout(),
            produced: 0,
            limit,
        }
    }

    fn layout() -> Type {
        Type::record([
            ("id", Type::count()),
            ("ts", Type::time()),
            ("src", Type::address()),
            ("dst", Type::address()),
            ("src_port", Type::port()),
            ("bytes", Type::count()),
            ("action", Type::enumeration(["allow", "deny", "drop"])),
        ])
        .with_name("strata.test")
    }

    fn row(i: u64) -> Vec<Data> {
        let src = Ipv4Addr::new(10, (i >> 16) as u8, (i >> 8) as u8, i as u8);
        let dst = Ipv4Addr::new(192, 168, (i >> 8) as u8, i as u8);
        vec![
            Data::Count(i),
            Data::Time(Timestamp::from_nanos(
                (BASE_TIME_SECS + i as i64) * 1_000_000_000,
            )),
            Data::Address(IpAddr::V4(src)),
            Data::Address(IpAddr::V4(dst)),
            Data::Port(Port::new(1024 + (i % 40000) as u16, Protocol::Tcp)),
            Data::Count((i * 37) % 65536),
            Data::Enumeration((i % 3) as u32),
        ]
    }
}

#[async_trait]
impl crate::Reader for TestReader {
    fn name(&self) -> &str {
        "test"
    }

    fn layout(&self) -> Option<&Type> {
        Some(&self.layout)
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Slice>> {
        if self.produced >= self.limit {
            return Ok(None);
        }
        let remaining = (self.limit - self.produced).min(max_rows as u64);
        let mut builder = SliceBuilder::new(self.layout.clone())?;
        for i in self.produced..self.produced + remaining {
            builder.add_row(Self::row(i))?;
        }
        self.produced += remaining;
        builder.finish().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reader;

    #[tokio::test]
    async fn generates_deterministic_batches() {
        let mut reader = TestReader::new(10);
        let first = reader.next_batch(4).await.unwrap().unwrap();
        assert_eq!(first.rows(), 4);
        assert_eq!(first.columns(), 7);
        assert_eq!(first.at(2, 0), &Data::Count(2));
        let second = reader.next_batch(100).await.unwrap().unwrap();
        assert_eq!(second.rows(), 6);
        assert!(reader.next_batch(1).await.unwrap().is_none());

        let mut again = TestReader::new(10);
        let repeat = again.next_batch(4).await.unwrap().unwrap();
        assert_eq!(repeat, first);
    }
}
