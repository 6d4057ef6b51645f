//! Dense matrix slice layouts.
//!
//! Both layouts keep all cells in one contiguous element block, pre-sized
//! to `rows x columns`. The memory order is a compile-time policy: row
//! major strides by column count, column major strides by row count, which
//! makes column iteration contiguous.

use super::{column_type, flatten_row, InstanceToken, Slice, TableSlice};
use super::{COLUMN_MAJOR_ID, ROW_MAJOR_ID};
use crate::data::{type_check, Data, DataView};
use crate::error::{Error, Result};
use crate::index::{append_cell, ValueIndex};
use crate::schema::Type;
use std::fmt;
use std::marker::PhantomData;

/// Memory-order policy of a matrix slice.
pub trait MajorOrder: fmt::Debug + Copy + Default + Send + Sync + 'static {
    const IMPL_ID: u32;

    /// Position of a cell inside the element block.
    fn index_of(rows: usize, columns: usize, row: usize, column: usize) -> usize;
}

/// Elements stored row after row; `index = row * columns + column`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowMajor;

impl MajorOrder for RowMajor {
    const IMPL_ID: u32 = ROW_MAJOR_ID;

    fn index_of(_rows: usize, columns: usize, row: usize, column: usize) -> usize {
        row * columns + column
    }
}

/// Elements stored column after column; `index = column * rows + row`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColumnMajor;

impl MajorOrder for ColumnMajor {
    const IMPL_ID: u32 = COLUMN_MAJOR_ID;

    fn index_of(rows: usize, _columns: usize, row: usize, column: usize) -> usize {
        column * rows + row
    }
}

/// A fixed-shape slice over one contiguous element block.
#[derive(Debug, Clone)]
pub struct MatrixSlice<O: MajorOrder> {
    layout: Type,
    rows: usize,
    columns: usize,
    offset: u64,
    elements: Box<[Data]>,
    _token: InstanceToken,
    _order: PhantomData<O>,
}

/// A matrix slice with row-major memory order.
pub type RowMatrixSlice = MatrixSlice<RowMajor>;

/// A matrix slice with column-major memory order.
pub type ColumnMatrixSlice = MatrixSlice<ColumnMajor>;

impl<O: MajorOrder> MatrixSlice<O> {
    /// Returns a pre-sized slice with every cell unfilled (`Data::None`).
    /// Callers fill cells with [`MatrixSlice::put`] before sharing.
    pub fn make(layout: Type, rows: usize) -> Result<Self> {
        if !layout.is_record() {
            return Err(Error::inconsistent_schema(format!(
                "slice layout must be a record, got {layout}"
            )));
        }
        let layout = layout.flatten();
        let columns = layout.fields().map(<[_]>::len).unwrap_or(0);
        if columns == 0 {
            return Err(Error::inconsistent_schema("slice layout has no columns"));
        }
        Ok(Self {
            layout,
            rows,
            columns,
            offset: 0,
            elements: vec![Data::None; rows * columns].into_boxed_slice(),
            _token: InstanceToken::new(),
            _order: PhantomData,
        })
    }

    /// Builds a filled slice from complete rows, type-checking each cell.
    pub fn make_from_rows(layout: Type, rows: &[Vec<Data>]) -> Result<Slice> {
        let mut slice = Self::make(layout, rows.len())?;
        for (r, row) in rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(slice.columns);
            flatten_row(row.clone(), &mut cells);
            if cells.len() != slice.columns {
                return Err(Error::inconsistent_schema(format!(
                    "row {r} has {} cells but the layout has {} columns",
                    cells.len(),
                    slice.columns
                )));
            }
            for (c, cell) in cells.into_iter().enumerate() {
                let ty = column_type(&slice.layout, c)?;
                if !type_check(ty, &cell) {
                    return Err(Error::inconsistent_schema(format!(
                        "value {cell} does not fit column {c} of type {ty}"
                    )));
                }
                slice.put(r, c, cell);
            }
        }
        Ok(Slice::new(slice))
    }

    /// Fills one cell. Only valid before the slice is shared.
    pub fn put(&mut self, row: usize, column: usize, value: Data) {
        assert!(row < self.rows);
        assert!(column < self.columns);
        self.elements[O::index_of(self.rows, self.columns, row, column)] = value;
    }

    /// Iterates one column in row order. O(1) per step; contiguous in the
    /// column-major layout.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &Data> + '_ {
        assert!(column < self.columns);
        (0..self.rows).map(move |row| &self.elements[O::index_of(self.rows, self.columns, row, column)])
    }

    pub(crate) fn from_wire(
        layout: Type,
        offset: u64,
        rows: usize,
        cols: usize,
        body: Vec<Data>,
    ) -> Result<Self> {
        if body.len() != rows * cols {
            return Err(Error::inconsistent_schema(format!(
                "frame declares {rows}x{cols} cells but carries {}",
                body.len()
            )));
        }
        Ok(Self {
            layout,
            rows,
            columns: cols,
            offset,
            elements: body.into_boxed_slice(),
            _token: InstanceToken::new(),
            _order: PhantomData,
        })
    }
}

impl<O: MajorOrder> TableSlice for MatrixSlice<O> {
    fn layout(&self) -> &Type {
        &self.layout
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn implementation_id(&self) -> u32 {
        O::IMPL_ID
    }

    fn at(&self, row: usize, column: usize) -> DataView<'_> {
        assert!(row < self.rows);
        assert!(column < self.columns);
        &self.elements[O::index_of(self.rows, self.columns, row, column)]
    }

    fn copy(&self) -> Box<dyn TableSlice> {
        Box::new(self.clone())
    }

    fn wire_body(&self) -> Vec<Data> {
        self.elements.to_vec()
    }

    fn append_column_to_index(&self, column: usize, index: &mut ValueIndex) -> Result<()> {
        let ty = column_type(&self.layout, column)?;
        let mut id = self.offset;
        for cell in self.column(column) {
            append_cell(ty, index, cell, id)?;
            id += 1;
        }
        Ok(())
    }
}
