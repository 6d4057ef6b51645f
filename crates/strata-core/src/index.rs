//! Typed value indexes and the schema-directed dispatch that feeds them.
//!
//! A [`ValueIndex`] ingests cell views paired with absolute row ids. The
//! concrete variant is chosen from a column's type; the slice layer never
//! constructs indexes, it only routes cells into one it was handed. Routing
//! cross-checks the column type variant against the index variant and
//! reports a hard schema error on any mismatch.

use crate::data::{Data, Duration, Pattern, Port, Subnet, Timestamp};
use crate::error::{Error, Result};
use crate::schema::{Kind, Type};
use ordered_float::OrderedFloat;
use std::net::IpAddr;

/// An append-only index over one scalar column.
#[derive(Debug, Clone)]
pub struct ScalarIndex<T> {
    entries: Vec<(u64, Option<T>)>,
}

impl<T> Default for ScalarIndex<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> ScalarIndex<T> {
    pub fn fast_append(&mut self, value: Option<T>, id: u64) {
        self.entries.push((id, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row ids whose cell equals `value`.
    pub fn lookup_eq(&self, value: &T) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, x)| x.as_ref() == Some(value))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// An append-only index over container-valued columns. Cells are kept whole.
#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    entries: Vec<(u64, Data)>,
}

impl SequenceIndex {
    pub fn fast_append(&mut self, value: Data, id: u64) {
        self.entries.push((id, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup_eq(&self, value: &Data) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, x)| x == value)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// A polymorphic value index; one variant per column type variant.
#[derive(Debug, Clone)]
pub enum ValueIndex {
    Bool(ScalarIndex<bool>),
    Integer(ScalarIndex<i64>),
    Count(ScalarIndex<u64>),
    Real(ScalarIndex<OrderedFloat<f64>>),
    Duration(ScalarIndex<Duration>),
    Time(ScalarIndex<Timestamp>),
    String(ScalarIndex<String>),
    Pattern(ScalarIndex<Pattern>),
    Address(ScalarIndex<IpAddr>),
    Subnet(ScalarIndex<Subnet>),
    Port(ScalarIndex<Port>),
    Enumeration(ScalarIndex<u32>),
    Sequence(SequenceIndex),
}

impl ValueIndex {
    /// Constructs the index variant matching a column type, unwrapping
    /// aliases. The `none` and empty types have no index.
    pub fn for_type(ty: &Type) -> Option<ValueIndex> {
        match ty.skeleton().kind()? {
            Kind::None => None,
            Kind::Bool => Some(ValueIndex::Bool(Default::default())),
            Kind::Integer => Some(ValueIndex::Integer(Default::default())),
            Kind::Count => Some(ValueIndex::Count(Default::default())),
            Kind::Real => Some(ValueIndex::Real(Default::default())),
            Kind::Duration => Some(ValueIndex::Duration(Default::default())),
            Kind::Time => Some(ValueIndex::Time(Default::default())),
            Kind::String => Some(ValueIndex::String(Default::default())),
            Kind::Pattern => Some(ValueIndex::Pattern(Default::default())),
            Kind::Address => Some(ValueIndex::Address(Default::default())),
            Kind::Subnet => Some(ValueIndex::Subnet(Default::default())),
            Kind::Port => Some(ValueIndex::Port(Default::default())),
            Kind::Enumeration(_) => Some(ValueIndex::Enumeration(Default::default())),
            Kind::Vector(_) | Kind::Set(_) | Kind::Map(..) | Kind::Record(_) => {
                Some(ValueIndex::Sequence(Default::default()))
            }
            Kind::Alias(_) => unreachable!("skeleton unwraps aliases"),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueIndex::Bool(idx) => idx.len(),
            ValueIndex::Integer(idx) => idx.len(),
            ValueIndex::Count(idx) => idx.len(),
            ValueIndex::Real(idx) => idx.len(),
            ValueIndex::Duration(idx) => idx.len(),
            ValueIndex::Time(idx) => idx.len(),
            ValueIndex::String(idx) => idx.len(),
            ValueIndex::Pattern(idx) => idx.len(),
            ValueIndex::Address(idx) => idx.len(),
            ValueIndex::Subnet(idx) => idx.len(),
            ValueIndex::Port(idx) => idx.len(),
            ValueIndex::Enumeration(idx) => idx.len(),
            ValueIndex::Sequence(idx) => idx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn variant_name(&self) -> &'static str {
        match self {
            ValueIndex::Bool(_) => "bool",
            ValueIndex::Integer(_) => "int",
            ValueIndex::Count(_) => "count",
            ValueIndex::Real(_) => "real",
            ValueIndex::Duration(_) => "duration",
            ValueIndex::Time(_) => "time",
            ValueIndex::String(_) => "string",
            ValueIndex::Pattern(_) => "pattern",
            ValueIndex::Address(_) => "addr",
            ValueIndex::Subnet(_) => "subnet",
            ValueIndex::Port(_) => "port",
            ValueIndex::Enumeration(_) => "enum",
            ValueIndex::Sequence(_) => "sequence",
        }
    }
}

fn mismatch(expected: &str, cell: &Data) -> Error {
    Error::inconsistent_schema(format!(
        "cell {cell} does not belong into a {expected} index"
    ))
}

/// Routes one cell into `index`. The column type selects the expected index
/// variant; `Data::None` appends a null to any index.
pub fn append_cell(ty: &Type, index: &mut ValueIndex, cell: &Data, id: u64) -> Result<()> {
    let Some(kind) = ty.skeleton().kind() else {
        return Err(Error::inconsistent_schema("column has the empty type"));
    };
    macro_rules! scalar {
        ($idx:expr, $variant:path, $label:literal) => {
            match cell {
                Data::None => {
                    $idx.fast_append(None, id);
                    Ok(())
                }
                $variant(x) => {
                    $idx.fast_append(Some(x.clone()), id);
                    Ok(())
                }
                other => Err(mismatch($label, other)),
            }
        };
    }
    match (kind, index) {
        (Kind::Bool, ValueIndex::Bool(idx)) => scalar!(idx, Data::Bool, "bool"),
        (Kind::Integer, ValueIndex::Integer(idx)) => scalar!(idx, Data::Integer, "int"),
        (Kind::Count, ValueIndex::Count(idx)) => scalar!(idx, Data::Count, "count"),
        (Kind::Real, ValueIndex::Real(idx)) => scalar!(idx, Data::Real, "real"),
        (Kind::Duration, ValueIndex::Duration(idx)) => scalar!(idx, Data::Duration, "duration"),
        (Kind::Time, ValueIndex::Time(idx)) => scalar!(idx, Data::Time, "time"),
        (Kind::String, ValueIndex::String(idx)) => scalar!(idx, Data::String, "string"),
        (Kind::Pattern, ValueIndex::Pattern(idx)) => scalar!(idx, Data::Pattern, "pattern"),
        (Kind::Address, ValueIndex::Address(idx)) => scalar!(idx, Data::Address, "addr"),
        (Kind::Subnet, ValueIndex::Subnet(idx)) => scalar!(idx, Data::Subnet, "subnet"),
        (Kind::Port, ValueIndex::Port(idx)) => scalar!(idx, Data::Port, "port"),
        (Kind::Enumeration(_), ValueIndex::Enumeration(idx)) => {
            scalar!(idx, Data::Enumeration, "enum")
        }
        (
            Kind::Vector(_) | Kind::Set(_) | Kind::Map(..) | Kind::Record(_),
            ValueIndex::Sequence(idx),
        ) => match cell {
            Data::Vector(_) | Data::Set(_) | Data::Map(_) | Data::Record(_) | Data::None => {
                idx.fast_append(cell.clone(), id);
                Ok(())
            }
            other => Err(mismatch("sequence", other)),
        },
        (_, index) => Err(Error::inconsistent_schema(format!(
            "column type {ty} does not match a {} index",
            index.variant_name()
        ))),
    }
}
