//! # Strata Core - Columnar Event Storage Substrate
//!
//! This crate provides the foundational pieces of the Strata platform: the
//! schema algebra describing event layouts, the dynamically-typed values
//! conforming to those layouts, the immutable table slices batching typed
//! rows, and the typed value indexes that slices feed column by column.
//!
//! ## Key Components
//!
//! - **Schema algebra**: recursive types with names and attributes,
//!   structural navigation, flattening, congruence, printing, parsing, and
//!   stable content digests
//! - **Data values**: a totally-ordered tagged union mirroring the type
//!   algebra, with borrow-based views
//! - **Table slices**: reference-counted batched row containers with three
//!   physical layouts and framed wire serialization
//! - **Value indexes**: schema-directed, append-only per-column indexes
//!
//! ## Example Usage
//!
//! ```rust
//! use strata_core::{Data, SliceBuilder, Type};
//!
//! # fn example() -> strata_core::Result<()> {
//! let layout = Type::record([
//!     ("source", Type::address()),
//!     ("bytes", Type::count()),
//! ])
//! .with_name("flow");
//! let mut builder = SliceBuilder::new(layout)?;
//! builder.add_row(vec![Data::Address("10.0.0.1".parse().unwrap()), Data::Count(42)])?;
//! let slice = builder.finish()?;
//! assert_eq!(slice.rows(), 1);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod index;
pub mod schema;
pub mod slice;

pub use data::{
    compatible_data, make_view, type_check, type_of, Data, DataView, Duration, Pattern, Port,
    Protocol, Subnet, Timestamp,
};
pub use error::{Error, ErrorKind, Result};
pub use index::{append_cell, ScalarIndex, SequenceIndex, ValueIndex};
pub use schema::{
    compatible, congruent, parse_type, Attribute, Field, Kind, Leaf, Offset, RelOp, SymbolTable,
    Type,
};
pub use slice::{
    instances, read_slice, write_slice, ColumnMajor, ColumnMatrixSlice, GenericSlice, MajorOrder,
    MatrixSlice, RowMajor, RowMatrixSlice, Slice, SliceBuilder, TableSlice, COLUMN_MAJOR_ID,
    GENERIC_ID, ROW_MAJOR_ID,
};
