//! The growable, builder-backed slice layout.

use super::{column_type, flatten_row, InstanceToken, Slice, TableSlice, GENERIC_ID};
use crate::data::{type_check, Data, DataView};
use crate::error::{Error, Result};
use crate::index::{append_cell, ValueIndex};
use crate::schema::Type;

/// Stores rows as a sequence of per-row records.
#[derive(Debug, Clone)]
pub struct GenericSlice {
    layout: Type,
    columns: usize,
    offset: u64,
    rows: Vec<Data>,
    _token: InstanceToken,
}

impl GenericSlice {
    /// Builds a slice from complete rows. Rows may be structured; nested
    /// record values are flattened into leaf cells.
    pub fn make(layout: Type, rows: &[Vec<Data>]) -> Result<Slice> {
        let mut builder = SliceBuilder::new(layout)?;
        for row in rows {
            builder.add_row(row.clone())?;
        }
        builder.finish()
    }

    pub(crate) fn from_wire(
        layout: Type,
        offset: u64,
        rows: usize,
        cols: usize,
        body: Vec<Data>,
    ) -> Result<Self> {
        if body.len() != rows {
            return Err(Error::inconsistent_schema(format!(
                "frame declares {rows} rows but carries {}",
                body.len()
            )));
        }
        for row in &body {
            match row {
                Data::Record(cells) if cells.len() == cols => {}
                _ => {
                    return Err(Error::inconsistent_schema(
                        "generic slice body must hold records of column arity",
                    ))
                }
            }
        }
        Ok(Self {
            layout,
            columns: cols,
            offset,
            rows: body,
            _token: InstanceToken::new(),
        })
    }
}

impl TableSlice for GenericSlice {
    fn layout(&self) -> &Type {
        &self.layout
    }

    fn rows(&self) -> usize {
        self.rows.len()
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
        GENERIC_ID
    }

    fn at(&self, row: usize, column: usize) -> DataView<'_> {
        assert!(row < self.rows.len());
        assert!(column < self.columns);
        match &self.rows[row] {
            Data::Record(cells) => &cells[column],
            _ => unreachable!("generic slice rows are records"),
        }
    }

    fn copy(&self) -> Box<dyn TableSlice> {
        Box::new(self.clone())
    }

    fn wire_body(&self) -> Vec<Data> {
        self.rows.clone()
    }

    fn append_column_to_index(&self, column: usize, index: &mut ValueIndex) -> Result<()> {
        let ty = column_type(&self.layout, column)?;
        let mut id = self.offset;
        for row in 0..self.rows.len() {
            append_cell(ty, index, self.at(row, column), id)?;
            id += 1;
        }
        Ok(())
    }
}

/// Accumulates typed cells row by row and finishes into a [`GenericSlice`].
///
/// The layout is flattened up front; cells arrive in flat column order and
/// are type-checked against their column. The builder is reusable after
/// [`SliceBuilder::finish`].
#[derive(Debug)]
pub struct SliceBuilder {
    layout: Type,
    columns: usize,
    current: Vec<Data>,
    finished: Vec<Data>,
}

impl SliceBuilder {
    pub fn new(layout: Type) -> Result<Self> {
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
            columns,
            current: Vec::with_capacity(columns),
            finished: Vec::new(),
        })
    }

    pub fn layout(&self) -> &Type {
        &self.layout
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of completed rows.
    pub fn rows(&self) -> usize {
        self.finished.len()
    }

    /// Appends the next cell in flat column order. Completing a row moves
    /// it into the slice under construction.
    pub fn add(&mut self, value: Data) -> Result<()> {
        let column = self.current.len();
        let ty = column_type(&self.layout, column)?;
        if !type_check(ty, &value) {
            return Err(Error::inconsistent_schema(format!(
                "value {value} does not fit column {column} of type {ty}"
            )));
        }
        self.current.push(value);
        if self.current.len() == self.columns {
            let row = std::mem::take(&mut self.current);
            self.finished.push(Data::Record(row));
            self.current.reserve(self.columns);
        }
        Ok(())
    }

    /// Appends one complete row. Structured rows are flattened into leaf
    /// cells first; the arity must match the flat layout.
    pub fn add_row(&mut self, row: Vec<Data>) -> Result<()> {
        if !self.current.is_empty() {
            return Err(Error::inconsistent_schema(
                "cannot add a row while a partial row is pending",
            ));
        }
        let mut cells = Vec::with_capacity(self.columns);
        flatten_row(row, &mut cells);
        if cells.len() != self.columns {
            return Err(Error::inconsistent_schema(format!(
                "row has {} cells but the layout has {} columns",
                cells.len(),
                self.columns
            )));
        }
        for cell in cells {
            self.add(cell)?;
        }
        Ok(())
    }

    /// Finishes the slice under construction and resets the builder. A
    /// pending partial row is an error.
    pub fn finish(&mut self) -> Result<Slice> {
        if !self.current.is_empty() {
            return Err(Error::inconsistent_schema(format!(
                "partial row with {} of {} cells pending",
                self.current.len(),
                self.columns
            )));
        }
        let rows = std::mem::take(&mut self.finished);
        Ok(Slice::new(GenericSlice {
            layout: self.layout.clone(),
            columns: self.columns,
            offset: 0,
            rows,
            _token: InstanceToken::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::slice::GENERIC_ID;

    fn layout() -> Type {
        Type::record([
            ("a", Type::integer()),
            ("b", Type::record([("x", Type::count()), ("y", Type::string())])),
        ])
        .with_name("event")
    }

    #[test]
    fn builder_flattens_layout_and_rows() {
        let mut builder = SliceBuilder::new(layout()).unwrap();
        assert_eq!(builder.columns(), 3);
        builder
            .add_row(vec![
                Data::Integer(1),
                Data::Record(vec![Data::Count(2), Data::from("three")]),
            ])
            .unwrap();
        builder
            .add_row(vec![Data::Integer(4), Data::Count(5), Data::from("six")])
            .unwrap();
        let slice = builder.finish().unwrap();
        assert_eq!(slice.implementation_id(), GENERIC_ID);
        assert_eq!(slice.rows(), 2);
        assert_eq!(slice.columns(), 3);
        assert_eq!(slice.at(0, 2), &Data::from("three"));
        assert_eq!(slice.at(1, 1), &Data::Count(5));
        assert_eq!(slice.layout().fields().unwrap()[1].name, "b.x");
        // The builder is reusable after finish.
        assert_eq!(builder.rows(), 0);
    }

    #[test]
    fn builder_rejects_type_mismatches() {
        let mut builder = SliceBuilder::new(layout()).unwrap();
        let err = builder.add(Data::from("not an int")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentSchema);
    }

    #[test]
    fn builder_rejects_partial_rows_at_finish() {
        let mut builder = SliceBuilder::new(layout()).unwrap();
        builder.add(Data::Integer(1)).unwrap();
        let err = builder.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentSchema);
    }

    #[test]
    fn null_cells_are_allowed() {
        let mut builder = SliceBuilder::new(layout()).unwrap();
        builder
            .add_row(vec![Data::None, Data::None, Data::None])
            .unwrap();
        let slice = builder.finish().unwrap();
        assert_eq!(slice.at(0, 0), &Data::None);
    }
}
