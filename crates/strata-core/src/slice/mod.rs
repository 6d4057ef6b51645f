//! Table slices: immutable batched rows under one record layout.
//!
//! A slice is created by a builder (or a pre-sized matrix constructor),
//! then shared by reference count through the [`Slice`] handle. The handle
//! exposes the small capability set every physical layout implements:
//! layout, shape, offset, random access, framed serialization, deep copy,
//! and schema-directed column-to-index appends.
//!
//! Three layouts exist: the growable generic layout and the two dense
//! matrix layouts (row-major and column-major). A process-wide atomic
//! counter tracks live slice storage for observability.

mod generic;
mod matrix;

pub use generic::{GenericSlice, SliceBuilder};
pub use matrix::{ColumnMajor, ColumnMatrixSlice, MajorOrder, MatrixSlice, RowMajor, RowMatrixSlice};

use crate::data::{Data, DataView};
use crate::error::{Error, Result};
use crate::index::ValueIndex;
use crate::schema::Type;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Implementation id of the generic builder-backed layout.
pub const GENERIC_ID: u32 = u32::from_le_bytes(*b"gnrc");

/// Implementation id of the row-major matrix layout.
pub const ROW_MAJOR_ID: u32 = u32::from_le_bytes(*b"rmaj");

/// Implementation id of the column-major matrix layout.
pub const COLUMN_MAJOR_ID: u32 = u32::from_le_bytes(*b"cmaj");

static INSTANCES: AtomicUsize = AtomicUsize::new(0);

/// Number of live slice storages in this process.
pub fn instances() -> usize {
    INSTANCES.load(Ordering::Relaxed)
}

/// RAII token tying the instance counter to storage lifetime. Every
/// concrete slice owns one, so the counter balances on all exit paths.
#[derive(Debug)]
pub(crate) struct InstanceToken(());

impl InstanceToken {
    pub(crate) fn new() -> Self {
        INSTANCES.fetch_add(1, Ordering::Relaxed);
        Self(())
    }
}

impl Clone for InstanceToken {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        INSTANCES.fetch_sub(1, Ordering::Relaxed);
    }
}

/// The capability set shared by all physical slice layouts.
pub trait TableSlice: fmt::Debug + Send + Sync {
    /// The flat record type declaring the column schema.
    fn layout(&self) -> &Type;

    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    /// Absolute row id of the first row within the logical stream.
    fn offset(&self) -> u64;

    fn set_offset(&mut self, offset: u64);

    fn implementation_id(&self) -> u32;

    /// Borrowed view over one cell. Bounds violations are programming
    /// errors and assert.
    fn at(&self, row: usize, column: usize) -> DataView<'_>;

    /// Deep copy with fresh storage ownership.
    fn copy(&self) -> Box<dyn TableSlice>;

    /// All cells in the layout's natural traversal order, for framing.
    fn wire_body(&self) -> Vec<Data>;

    /// Feeds every cell of `column`, paired with its absolute row id, into
    /// `index`. Dispatch is schema-directed; a variant mismatch is a hard
    /// error.
    fn append_column_to_index(&self, column: usize, index: &mut ValueIndex) -> Result<()>;
}

/// A shared handle to an immutable slice.
///
/// Cloning shares storage. [`Slice::set_offset`] copies on write: a handle
/// that is not the sole owner deep-copies its storage first, so shared
/// readers never observe mutation.
#[derive(Debug, Clone)]
pub struct Slice(Arc<dyn TableSlice>);

impl Slice {
    pub fn new(inner: impl TableSlice + 'static) -> Self {
        Self(Arc::new(inner))
    }

    pub fn from_box(inner: Box<dyn TableSlice>) -> Self {
        Self(Arc::from(inner))
    }

    pub fn layout(&self) -> &Type {
        self.0.layout()
    }

    pub fn rows(&self) -> usize {
        self.0.rows()
    }

    pub fn columns(&self) -> usize {
        self.0.columns()
    }

    pub fn offset(&self) -> u64 {
        self.0.offset()
    }

    pub fn implementation_id(&self) -> u32 {
        self.0.implementation_id()
    }

    pub fn at(&self, row: usize, column: usize) -> DataView<'_> {
        self.0.at(row, column)
    }

    pub fn append_column_to_index(&self, column: usize, index: &mut ValueIndex) -> Result<()> {
        self.0.append_column_to_index(column, index)
    }

    /// Deep copy with fresh ownership.
    pub fn copy(&self) -> Slice {
        Slice::from_box(self.0.copy())
    }

    /// Stamps the absolute row id of the first row. Copies on write when
    /// the storage is shared.
    pub fn set_offset(&mut self, offset: u64) {
        if Arc::get_mut(&mut self.0).is_none() {
            self.0 = Arc::from(self.0.copy());
        }
        if let Some(inner) = Arc::get_mut(&mut self.0) {
            inner.set_offset(offset);
        }
    }

    fn wire_body(&self) -> Vec<Data> {
        self.0.wire_body()
    }
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        if self.layout() != other.layout()
            || self.rows() != other.rows()
            || self.columns() != other.columns()
            || self.offset() != other.offset()
        {
            return false;
        }
        (0..self.rows())
            .all(|r| (0..self.columns()).all(|c| self.at(r, c) == other.at(r, c)))
    }
}

impl Eq for Slice {}

/// The framed wire form of a slice.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    impl_id: u32,
    layout: Type,
    rows: u64,
    cols: u64,
    offset: u64,
    body: Vec<Data>,
}

/// Appends the framed encoding of `slice` to `out`.
pub fn write_slice(slice: &Slice, out: &mut Vec<u8>) -> Result<()> {
    let frame = Frame {
        impl_id: slice.implementation_id(),
        layout: slice.layout().clone(),
        rows: slice.rows() as u64,
        cols: slice.columns() as u64,
        offset: slice.offset(),
        body: slice.wire_body(),
    };
    let bytes = postcard::to_allocvec(&frame)
        .map_err(|e| Error::io(format!("failed to encode slice frame: {e}")))?;
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Reads one framed slice from the front of `input`, advancing it past the
/// frame. On failure the input is left untouched and only this slice read
/// is aborted.
pub fn read_slice(input: &mut &[u8]) -> Result<Slice> {
    let (frame, rest) = postcard::take_from_bytes::<Frame>(input)
        .map_err(|e| Error::io(format!("failed to decode slice frame: {e}")))?;
    let slice = build_slice(frame)?;
    *input = rest;
    Ok(slice)
}

fn build_slice(frame: Frame) -> Result<Slice> {
    let rows = frame.rows as usize;
    let cols = frame.cols as usize;
    if !frame.layout.is_record() {
        return Err(Error::inconsistent_schema("slice layout must be a record"));
    }
    if frame.layout.flat_size() != cols {
        return Err(Error::inconsistent_schema(format!(
            "layout declares {} columns but frame has {cols}",
            frame.layout.flat_size()
        )));
    }
    match frame.impl_id {
        GENERIC_ID => {
            GenericSlice::from_wire(frame.layout, frame.offset, rows, cols, frame.body)
                .map(Slice::new)
        }
        ROW_MAJOR_ID => {
            MatrixSlice::<RowMajor>::from_wire(frame.layout, frame.offset, rows, cols, frame.body)
                .map(Slice::new)
        }
        COLUMN_MAJOR_ID => MatrixSlice::<ColumnMajor>::from_wire(
            frame.layout,
            frame.offset,
            rows,
            cols,
            frame.body,
        )
        .map(Slice::new),
        other => Err(Error::unspecified(format!(
            "unknown slice implementation id: {other:#010x}"
        ))),
    }
}

/// Looks up the type of a column in a flat layout.
pub(crate) fn column_type(layout: &Type, column: usize) -> Result<&Type> {
    layout
        .fields()
        .and_then(|fields| fields.get(column))
        .map(|field| &field.ty)
        .ok_or_else(|| Error::inconsistent_schema(format!("layout has no column {column}")))
}

/// Flattens one structured row into leaf cells; nested record values are
/// inlined positionally, everything else stays a single cell.
pub(crate) fn flatten_row(row: Vec<Data>, out: &mut Vec<Data>) {
    for value in row {
        match value {
            Data::Record(inner) => flatten_row(inner, out),
            other => out.push(other),
        }
    }
}
