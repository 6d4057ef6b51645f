//! The schema algebra describing event layouts.
//!
//! A [`Type`] is a finite tree: scalar leaves (`bool`, `int`, `count`, …),
//! containers (`vector`, `set`, `map`), positional `record`s, enumerations,
//! and `alias` wrappers. Every type optionally carries a name and an ordered
//! attribute list. The default-constructed type is the distinguished *empty*
//! type that equals no variant, including `none`.
//!
//! Records support structural navigation: dotted-key and offset lookup,
//! flattening to leaf columns and back, suffix search with glob segments,
//! and leaf iteration. Congruence compares structure while ignoring names
//! and attributes, which is what slice layouts care about when two schemas
//! describe the same column shape.

mod parse;
mod print;

pub use parse::parse_type;

use arcstr::ArcStr;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh64::Xxh64;

/// Seed for content hashes. Fixed so digests are stable across runs.
const HASH_SEED: u64 = 0;

/// A path of field positions into a (possibly nested) record tree.
pub type Offset = Vec<usize>;

/// Maps schema names to previously parsed types for symbolic resolution.
pub type SymbolTable = BTreeMap<String, Type>;

/// A key/value annotation attached to a type. Duplicates are preserved in
/// insertion order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

impl Attribute {
    /// A bare attribute, e.g. `#skip`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// A key/value attribute, e.g. `#default=F`.
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// A named field inside a record type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The structural variant of a type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    None,
    Bool,
    Integer,
    Count,
    Real,
    Duration,
    Time,
    String,
    Pattern,
    Address,
    Subnet,
    Port,
    Enumeration(Vec<String>),
    Vector(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Record(Vec<Field>),
    Alias(Box<Type>),
}

/// A schema type: an optional structural variant plus name and attributes.
///
/// `Type::default()` is the empty type. It holds no variant, and the name
/// and attribute setters are no-ops on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Type {
    kind: Option<Kind>,
    name: ArcStr,
    attributes: Vec<Attribute>,
}

impl Type {
    fn of(kind: Kind) -> Self {
        Self {
            kind: Some(kind),
            name: ArcStr::new(),
            attributes: Vec::new(),
        }
    }

    pub fn none() -> Self {
        Self::of(Kind::None)
    }

    pub fn boolean() -> Self {
        Self::of(Kind::Bool)
    }

    pub fn integer() -> Self {
        Self::of(Kind::Integer)
    }

    pub fn count() -> Self {
        Self::of(Kind::Count)
    }

    pub fn real() -> Self {
        Self::of(Kind::Real)
    }

    pub fn duration() -> Self {
        Self::of(Kind::Duration)
    }

    pub fn time() -> Self {
        Self::of(Kind::Time)
    }

    pub fn string() -> Self {
        Self::of(Kind::String)
    }

    pub fn pattern() -> Self {
        Self::of(Kind::Pattern)
    }

    pub fn address() -> Self {
        Self::of(Kind::Address)
    }

    pub fn subnet() -> Self {
        Self::of(Kind::Subnet)
    }

    pub fn port() -> Self {
        Self::of(Kind::Port)
    }

    pub fn enumeration<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::of(Kind::Enumeration(
            fields.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn vector(element: Type) -> Self {
        Self::of(Kind::Vector(Box::new(element)))
    }

    pub fn set(element: Type) -> Self {
        Self::of(Kind::Set(Box::new(element)))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Self::of(Kind::Map(Box::new(key), Box::new(value)))
    }

    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Self::record_of(
            fields
                .into_iter()
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
        )
    }

    pub fn record_of(fields: Vec<Field>) -> Self {
        Self::of(Kind::Record(fields))
    }

    pub fn alias(inner: Type) -> Self {
        Self::of(Kind::Alias(Box::new(inner)))
    }

    // -- accessors ----------------------------------------------------------

    pub fn kind(&self) -> Option<&Kind> {
        self.kind.as_ref()
    }

    /// True for the default-constructed empty type.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns a copy with the name replaced. No-op on the empty type.
    pub fn with_name(mut self, name: impl Into<ArcStr>) -> Self {
        if self.kind.is_some() {
            self.name = name.into();
        }
        self
    }

    /// Returns a copy with the attributes replaced. No-op on the empty type.
    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        if self.kind.is_some() {
            self.attributes = attributes;
        }
        self
    }

    // -- introspection ------------------------------------------------------

    /// Scalar types, excluding enumerations.
    pub fn is_basic(&self) -> bool {
        matches!(
            self.kind,
            Some(
                Kind::None
                    | Kind::Bool
                    | Kind::Integer
                    | Kind::Count
                    | Kind::Real
                    | Kind::Duration
                    | Kind::Time
                    | Kind::String
                    | Kind::Pattern
                    | Kind::Address
                    | Kind::Subnet
                    | Kind::Port
            )
        )
    }

    /// Enumerations, containers, and records.
    pub fn is_complex(&self) -> bool {
        matches!(
            self.kind,
            Some(
                Kind::Enumeration(_)
                    | Kind::Vector(_)
                    | Kind::Set(_)
                    | Kind::Map(..)
                    | Kind::Record(_)
            )
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            Some(Kind::Vector(_) | Kind::Set(_) | Kind::Map(..))
        )
    }

    pub fn is_recursive(&self) -> bool {
        matches!(
            self.kind,
            Some(Kind::Vector(_) | Kind::Set(_) | Kind::Map(..) | Kind::Record(_) | Kind::Alias(_))
        )
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, Some(Kind::Record(_)))
    }

    /// The fields of a record type, or `None` for every other variant.
    pub fn fields(&self) -> Option<&[Field]> {
        match &self.kind {
            Some(Kind::Record(fields)) => Some(fields),
            _ => None,
        }
    }

    /// Unwraps alias wrappers down to the underlying structural type.
    pub fn skeleton(&self) -> &Type {
        let mut t = self;
        while let Some(Kind::Alias(inner)) = &t.kind {
            t = inner;
        }
        t
    }

    // -- record navigation --------------------------------------------------

    /// Looks up the type under a dotted key. On a flattened record only the
    /// leaf columns are addressable; interior paths resolve on nested
    /// records only.
    pub fn at_key(&self, key: &str) -> Option<&Type> {
        let fields = self.fields()?;
        for field in fields {
            if field.name == key {
                return Some(&field.ty);
            }
            if let Some(rest) = key
                .strip_prefix(field.name.as_str())
                .and_then(|r| r.strip_prefix('.'))
            {
                if let Some(found) = field.ty.at_key(rest) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Looks up the type at a record offset. The empty offset is invalid.
    pub fn at_offset(&self, offset: &[usize]) -> Option<&Type> {
        let (&head, rest) = offset.split_first()?;
        let field = self.fields()?.get(head)?;
        if rest.is_empty() {
            Some(&field.ty)
        } else {
            field.ty.at_offset(rest)
        }
    }

    /// Resolves a dotted key to a record offset. The key may carry the
    /// record's own name as its first segment.
    pub fn resolve_key(&self, key: &str) -> Option<Offset> {
        fn go(fields: &[Field], key: &str, acc: &mut Offset) -> bool {
            for (i, field) in fields.iter().enumerate() {
                if field.name == key {
                    acc.push(i);
                    return true;
                }
                if let Some(rest) = key
                    .strip_prefix(field.name.as_str())
                    .and_then(|r| r.strip_prefix('.'))
                {
                    if let Some(sub) = field.ty.fields() {
                        acc.push(i);
                        if go(sub, rest, acc) {
                            return true;
                        }
                        acc.pop();
                    }
                }
            }
            false
        }
        let fields = self.fields()?;
        let mut acc = Offset::new();
        if go(fields, key, &mut acc) {
            return Some(acc);
        }
        if !self.name.is_empty() {
            if let Some(rest) = key
                .strip_prefix(self.name.as_str())
                .and_then(|r| r.strip_prefix('.'))
            {
                acc.clear();
                if go(fields, rest, &mut acc) {
                    return Some(acc);
                }
            }
        }
        None
    }

    /// Resolves a record offset back to its dotted key.
    pub fn resolve_offset(&self, offset: &[usize]) -> Option<String> {
        let (&head, rest) = offset.split_first()?;
        let field = self.fields()?.get(head)?;
        if rest.is_empty() {
            Some(field.name.clone())
        } else {
            field
                .ty
                .resolve_offset(rest)
                .map(|tail| format!("{}.{}", field.name, tail))
        }
    }

    /// Returns a record whose direct children are exactly the leaves of this
    /// record, with dotted field names encoding the original paths. Every
    /// other variant is returned unchanged.
    pub fn flatten(&self) -> Type {
        fn walk(prefix: &str, fields: &[Field], out: &mut Vec<Field>) {
            for field in fields {
                let key = if prefix.is_empty() {
                    field.name.clone()
                } else {
                    format!("{}.{}", prefix, field.name)
                };
                match field.ty.fields() {
                    Some(sub) => walk(&key, sub, out),
                    None => out.push(Field::new(key, field.ty.clone())),
                }
            }
        }
        match self.fields() {
            None => self.clone(),
            Some(fields) => {
                let mut flat = Vec::new();
                walk("", fields, &mut flat);
                Type {
                    kind: Some(Kind::Record(flat)),
                    name: self.name.clone(),
                    attributes: self.attributes.clone(),
                }
            }
        }
    }

    /// Rebuilds the nested record encoded by dotted field names. Inverse of
    /// [`Type::flatten`].
    pub fn unflatten(&self) -> Type {
        fn build(entries: &[(Vec<&str>, &Type)]) -> Vec<Field> {
            let mut fields = Vec::new();
            let mut i = 0;
            while i < entries.len() {
                let (path, ty) = &entries[i];
                if path.len() == 1 {
                    fields.push(Field::new(path[0], (*ty).clone()));
                    i += 1;
                    continue;
                }
                let head = path[0];
                let mut sub = Vec::new();
                while i < entries.len() && entries[i].0.len() > 1 && entries[i].0[0] == head {
                    sub.push((entries[i].0[1..].to_vec(), entries[i].1));
                    i += 1;
                }
                fields.push(Field::new(head, Type::record_of(build(&sub))));
            }
            fields
        }
        match self.fields() {
            None => self.clone(),
            Some(fields) => {
                let entries: Vec<_> = fields
                    .iter()
                    .map(|f| (f.name.split('.').collect::<Vec<_>>(), &f.ty))
                    .collect();
                Type {
                    kind: Some(Kind::Record(build(&entries))),
                    name: self.name.clone(),
                    attributes: self.attributes.clone(),
                }
            }
        }
    }

    /// Number of leaves in the flattened form. A non-record counts as one.
    pub fn flat_size(&self) -> usize {
        match self.fields() {
            Some(fields) => fields.iter().map(|f| f.ty.flat_size()).sum(),
            None => 1,
        }
    }

    /// Maps a leaf offset to its column position in the flattened form.
    /// Interior offsets have no flat index.
    pub fn flat_index_at(&self, offset: &[usize]) -> Option<usize> {
        let fields = self.fields()?;
        let (&head, rest) = offset.split_first()?;
        if head >= fields.len() {
            return None;
        }
        let preceding: usize = fields[..head].iter().map(|f| f.ty.flat_size()).sum();
        let target = &fields[head].ty;
        if rest.is_empty() {
            if target.is_record() {
                None
            } else {
                Some(preceding)
            }
        } else {
            target.flat_index_at(rest).map(|i| preceding + i)
        }
    }

    /// Every leaf of this record with its dotted key and offset, in
    /// definition order.
    pub fn leaves(&self) -> Vec<Leaf<'_>> {
        fn walk<'a>(fields: &'a [Field], key: &str, path: &mut Offset, out: &mut Vec<Leaf<'a>>) {
            for (i, field) in fields.iter().enumerate() {
                let child_key = if key.is_empty() {
                    field.name.clone()
                } else {
                    format!("{}.{}", key, field.name)
                };
                path.push(i);
                match field.ty.fields() {
                    Some(sub) => walk(sub, &child_key, path, out),
                    None => out.push(Leaf {
                        offset: path.clone(),
                        key: child_key,
                        ty: &field.ty,
                    }),
                }
                path.pop();
            }
        }
        let mut out = Vec::new();
        if let Some(fields) = self.fields() {
            let mut path = Offset::new();
            walk(fields, "", &mut path, &mut out);
        }
        out
    }

    /// Offsets of all fields, interior or leaf, whose dotted key ends with
    /// `pattern`. The pattern may contain `*` glob segments and may include
    /// the record's own name as a prefix. Matching is a plain string-suffix
    /// test over `name.key`, so partial leading segments match too.
    pub fn find_suffix(&self, pattern: &str) -> Vec<Offset> {
        let Some(fields) = self.fields() else {
            return Vec::new();
        };
        let mut rx = String::new();
        for ch in pattern.chars() {
            if ch == '*' {
                rx.push_str("[^.]*");
            } else {
                rx.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
            }
        }
        rx.push('$');
        let Ok(re) = Regex::new(&rx) else {
            return Vec::new();
        };
        fn walk(
            fields: &[Field],
            prefix: &str,
            path: &mut Offset,
            re: &Regex,
            out: &mut Vec<Offset>,
        ) {
            for (i, field) in fields.iter().enumerate() {
                let key = format!("{}.{}", prefix, field.name);
                path.push(i);
                if re.is_match(&key) {
                    out.push(path.clone());
                }
                if let Some(sub) = field.ty.fields() {
                    walk(sub, &key, path, re, out);
                }
                path.pop();
            }
        }
        let mut out = Vec::new();
        let mut path = Offset::new();
        // An empty record name still yields "." separators below, which is
        // harmless: the regex is anchored at the end only.
        walk(fields, &self.name, &mut path, &re, &mut out);
        out
    }

    // -- hashing -------------------------------------------------------------

    /// Stable 64-bit content hash with a fixed seed.
    pub fn hash64(&self) -> u64 {
        let mut hasher = Xxh64::new(HASH_SEED);
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Content digest: the decimal hash of this type with the outer name
    /// stripped. Used as a schema identifier by the type registry.
    pub fn digest(&self) -> String {
        let anonymous = Type {
            kind: self.kind.clone(),
            name: ArcStr::new(),
            attributes: self.attributes.clone(),
        };
        anonymous.hash64().to_string()
    }
}

/// A leaf of a record tree: its offset, dotted key, and type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf<'a> {
    pub offset: Offset,
    pub key: String,
    pub ty: &'a Type,
}

/// Relational operators usable in schema compatibility checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelOp {
    Match,
    NotMatch,
    In,
    NotIn,
    Equal,
    NotEqual,
}

/// Structural equivalence ignoring names and attributes. Aliases are
/// transparent; records compare positionally.
pub fn congruent(lhs: &Type, rhs: &Type) -> bool {
    let lhs = lhs.skeleton();
    let rhs = rhs.skeleton();
    match (lhs.kind(), rhs.kind()) {
        (None, None) => true,
        (Some(a), Some(b)) => match (a, b) {
            (Kind::Enumeration(xs), Kind::Enumeration(ys)) => xs == ys,
            (Kind::Vector(x), Kind::Vector(y)) | (Kind::Set(x), Kind::Set(y)) => congruent(x, y),
            (Kind::Map(kx, vx), Kind::Map(ky, vy)) => congruent(kx, ky) && congruent(vx, vy),
            (Kind::Record(xs), Kind::Record(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys.iter())
                        .all(|(x, y)| congruent(&x.ty, &y.ty))
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        },
        _ => false,
    }
}

/// True when an operand of type `lhs` may participate with `op` against an
/// operand of type `rhs`.
pub fn compatible(lhs: &Type, op: RelOp, rhs: &Type) -> bool {
    let is = |t: &Type, k: &Kind| {
        t.skeleton()
            .kind()
            .is_some_and(|actual| std::mem::discriminant(actual) == std::mem::discriminant(k))
    };
    let string_and_pattern = |x: &Type, y: &Type| {
        (is(x, &Kind::String) && is(y, &Kind::Pattern))
            || (is(x, &Kind::Pattern) && is(y, &Kind::String))
    };
    match op {
        RelOp::Match | RelOp::NotMatch => string_and_pattern(lhs, rhs),
        RelOp::Equal | RelOp::NotEqual => {
            lhs.is_empty() || rhs.is_empty() || string_and_pattern(lhs, rhs) || congruent(lhs, rhs)
        }
        RelOp::In | RelOp::NotIn => {
            if is(lhs, &Kind::String) && is(rhs, &Kind::String) {
                return true;
            }
            if (is(lhs, &Kind::Address) || is(lhs, &Kind::Subnet)) && is(rhs, &Kind::Subnet) {
                return true;
            }
            match rhs.skeleton().kind() {
                Some(Kind::Vector(element)) | Some(Kind::Set(element)) => congruent(lhs, element),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> Type {
        Type::record([
            ("a", Type::integer()),
            (
                "b",
                Type::record([
                    ("a", Type::integer()),
                    ("b", Type::count()),
                    (
                        "c",
                        Type::record([
                            ("x", Type::integer()),
                            ("y", Type::address()),
                            ("z", Type::real()),
                        ]),
                    ),
                ]),
            ),
            ("c", Type::count()),
        ])
        .with_name("foo")
    }

    #[test]
    fn default_construction() {
        let t = Type::default();
        assert!(t.is_empty());
        assert_ne!(t, Type::none());
        assert_ne!(t, Type::boolean());
    }

    #[test]
    fn setters_are_noops_on_the_empty_type() {
        let t = Type::default().with_name("foo");
        assert!(t.name().is_empty());
        let t = Type::default().with_attributes(vec![Attribute::pair("key", "value")]);
        assert!(t.attributes().is_empty());
        let t = Type::string().with_name("foo");
        assert_eq!(t.name(), "foo");
        let t = Type::string().with_attributes(vec![Attribute::pair("key", "value")]);
        assert_eq!(t.attributes(), [Attribute::pair("key", "value")]);
    }

    #[test]
    fn equality_comparison() {
        assert_eq!(Type::default(), Type::default());
        assert_ne!(Type::boolean(), Type::default());
        assert_eq!(Type::boolean(), Type::boolean());
        assert_ne!(Type::boolean(), Type::real());
        let x = Type::string().with_name("foo");
        let y = Type::string();
        assert_ne!(x, y);
        let y = y.with_name("foo");
        assert_eq!(x, y);
        let attrs = vec![Attribute::pair("key", "value")];
        assert_ne!(Type::real().with_attributes(attrs.clone()), Type::real());
        assert_eq!(
            Type::real().with_attributes(attrs.clone()),
            Type::real().with_attributes(attrs)
        );
    }

    #[test]
    fn ordering_is_deterministic() {
        assert!(Type::string().with_name("a") < Type::string().with_name("b"));
        assert!(Type::record([("x", Type::integer())]).with_name("a")
            < Type::record([("x", Type::integer())]).with_name("b"));
        let mut xs = vec![Type::string(), Type::address(), Type::pattern()];
        let mut ys = vec![Type::string(), Type::pattern(), Type::address()];
        xs.sort();
        ys.sort();
        assert_eq!(xs, ys);
    }

    #[test]
    fn introspection() {
        assert!(Type::enumeration(["a"]).is_complex());
        assert!(!Type::enumeration(["a"]).is_basic());
        let v = Type::vector(Type::integer());
        assert!(v.is_complex() && v.is_container() && v.is_recursive());
        let s = Type::set(Type::integer());
        assert!(s.is_complex() && s.is_container() && s.is_recursive());
        let m = Type::map(Type::integer(), Type::boolean());
        assert!(m.is_complex() && m.is_container() && m.is_recursive());
        let r = Type::record([("x", Type::integer())]);
        assert!(r.is_recursive() && !r.is_container());
        let a = Type::alias(Type::integer());
        assert!(a.is_recursive() && !a.is_container());
        assert!(Type::boolean().is_basic());
    }

    #[test]
    fn record_offset_access() {
        let r = Type::record([
            (
                "x",
                Type::record([
                    (
                        "y",
                        Type::record([("z", Type::integer()), ("k", Type::boolean())]),
                    ),
                    (
                        "m",
                        Type::record([
                            ("y", Type::record([("a", Type::address())])),
                            ("f", Type::real()),
                        ]),
                    ),
                    ("b", Type::boolean()),
                ]),
            ),
            ("y", Type::record([("b", Type::boolean())])),
        ]);
        assert_eq!(r.at_offset(&[0, 0, 0]), Some(&Type::integer()));
        assert_eq!(r.at_offset(&[0, 0, 1]), Some(&Type::boolean()));
        assert_eq!(r.at_offset(&[0, 1, 0, 0]), Some(&Type::address()));
        assert_eq!(r.at_offset(&[0, 1, 1]), Some(&Type::real()));
        assert_eq!(r.at_offset(&[0, 2]), Some(&Type::boolean()));
        assert_eq!(r.at_offset(&[1, 0]), Some(&Type::boolean()));
        assert!(r.at_offset(&[0, 0]).is_some_and(Type::is_record));
        assert!(r.at_offset(&[2]).is_none());
        assert!(r.at_offset(&[]).is_none());
        let keys: Vec<_> = r.leaves().into_iter().map(|l| l.key).collect();
        assert_eq!(keys, ["x.y.z", "x.y.k", "x.m.y.a", "x.m.f", "x.b", "y.b"]);
    }

    #[test]
    fn record_resolving() {
        let r = Type::record([
            ("a", Type::integer()),
            ("b", Type::count()),
            (
                "c",
                Type::record([
                    ("x", Type::integer()),
                    ("y", Type::address()),
                    ("z", Type::real()),
                ]),
            ),
        ]);
        assert_eq!(r.resolve_key("c"), Some(vec![2]));
        assert_eq!(r.resolve_key("c.x"), Some(vec![2, 0]));
        assert_eq!(r.resolve_key("c.x.absent"), None);
        assert_eq!(r.resolve_offset(&[2]), Some("c".to_string()));
        assert_eq!(r.resolve_offset(&[2, 0]), Some("c.x".to_string()));
    }

    #[test]
    fn resolve_inverses_over_all_leaves() {
        let r = make_record();
        for leaf in r.leaves() {
            assert_eq!(r.resolve_key(&leaf.key), Some(leaf.offset.clone()));
            assert_eq!(r.resolve_offset(&leaf.offset), Some(leaf.key.clone()));
            assert_eq!(r.resolve_key(&format!("foo.{}", leaf.key)), Some(leaf.offset));
        }
    }

    #[test]
    fn flattening_and_unflattening() {
        let x = Type::record([
            (
                "x",
                Type::record([
                    (
                        "y",
                        Type::record([("z", Type::integer()), ("k", Type::boolean())]),
                    ),
                    (
                        "m",
                        Type::record([
                            ("y", Type::record([("a", Type::address())])),
                            ("f", Type::real()),
                        ]),
                    ),
                    ("b", Type::boolean()),
                ]),
            ),
            ("y", Type::record([("b", Type::boolean())])),
        ]);
        let y = Type::record([
            ("x.y.z", Type::integer()),
            ("x.y.k", Type::boolean()),
            ("x.m.y.a", Type::address()),
            ("x.m.f", Type::real()),
            ("x.b", Type::boolean()),
            ("y.b", Type::boolean()),
        ]);
        let f = x.flatten();
        assert_eq!(f, y);
        assert_eq!(f.unflatten(), x);
        assert_eq!(x.flat_size(), 6);
        assert_eq!(f.flat_size(), 6);
    }

    #[test]
    fn flat_index_computation() {
        let x = Type::record([
            (
                "x",
                Type::record([
                    (
                        "y",
                        Type::record([("z", Type::integer()), ("k", Type::boolean())]),
                    ),
                    (
                        "m",
                        Type::record([
                            ("y", Type::record([("a", Type::address())])),
                            ("f", Type::real()),
                        ]),
                    ),
                    ("b", Type::boolean()),
                ]),
            ),
            ("y", Type::record([("b", Type::boolean())])),
        ]);
        assert_eq!(x.flat_index_at(&[0, 0, 0]), Some(0));
        assert_eq!(x.flat_index_at(&[0, 0, 1]), Some(1));
        assert_eq!(x.flat_index_at(&[0, 1, 0, 0]), Some(2));
        assert_eq!(x.flat_index_at(&[0, 1, 1]), Some(3));
        assert_eq!(x.flat_index_at(&[0, 2]), Some(4));
        assert_eq!(x.flat_index_at(&[1, 0]), Some(5));
        assert_eq!(x.flat_index_at(&[0]), None);
        assert_eq!(x.flat_index_at(&[0, 0]), None);
        assert_eq!(x.flat_index_at(&[1]), None);
        assert_eq!(x.flat_index_at(&[2]), None);
    }

    #[test]
    fn symbol_finding_exact() {
        let r = make_record();
        let f = r.flatten();
        assert_eq!(r.at_key("a"), Some(&Type::integer()));
        assert_eq!(f.at_key("a"), Some(&Type::integer()));
        assert_eq!(r.at_key("b.c.y"), Some(&Type::address()));
        assert_eq!(f.at_key("b.c.y"), Some(&Type::address()));
        assert!(r.at_key("b").is_some_and(Type::is_record));
        // A flat record no longer has an interior record to address.
        assert_eq!(f.at_key("b"), None);
        assert!(r.at_key("b.c").is_some_and(Type::is_record));
        assert_eq!(f.at_key("b.c"), None);
    }

    #[test]
    fn symbol_finding_suffix() {
        let r = make_record();
        let f = r.flatten();
        assert_eq!(r.find_suffix("c.y"), vec![vec![1, 2, 1]]);
        assert_eq!(f.find_suffix("c.y"), vec![vec![4]]);
        assert_eq!(r.find_suffix("z"), vec![vec![1, 2, 2]]);
        assert_eq!(f.find_suffix("z"), vec![vec![5]]);
        assert_eq!(r.find_suffix("a"), vec![vec![0], vec![1, 0]]);
        assert_eq!(f.find_suffix("a"), vec![vec![0], vec![1]]);
        assert_eq!(
            r.find_suffix("c.*"),
            vec![vec![1, 2, 0], vec![1, 2, 1], vec![1, 2, 2]]
        );
        assert_eq!(f.find_suffix("c.*"), vec![vec![3], vec![4], vec![5]]);
        assert_eq!(r.find_suffix("b"), vec![vec![1], vec![1, 1]]);
        assert_eq!(f.find_suffix("b"), vec![vec![2]]);
        assert_eq!(r.find_suffix("foo.a"), vec![vec![0]]);
        assert_eq!(f.find_suffix("oo.b.c.y"), vec![vec![4]]);
    }

    #[test]
    fn congruence() {
        let i = Type::integer().with_name("i");
        let j = Type::integer().with_name("j");
        let c = Type::count().with_name("c");
        assert_ne!(i, j);
        assert!(congruent(&i, &i));
        assert!(congruent(&i, &j));
        assert!(!congruent(&i, &c));

        let s0 = Type::set(i.clone());
        let s1 = Type::set(j.clone());
        let s2 = Type::set(c.clone());
        assert_ne!(s0, s1);
        assert!(congruent(&s0, &s1));
        assert!(!congruent(&s1, &s2));

        let r0 = Type::record([
            ("a", Type::address()),
            ("b", Type::boolean()),
            ("c", Type::count()),
        ]);
        let r1 = Type::record([
            ("x", Type::address()),
            ("y", Type::boolean()),
            ("z", Type::count()),
        ]);
        assert_ne!(r0, r1);
        assert!(congruent(&r0, &r1));

        let a = Type::alias(i.clone()).with_name("a");
        assert_ne!(a, i);
        assert!(congruent(&a, &i));
        let a = Type::alias(r0.clone()).with_name("r0");
        assert_ne!(a, r0);
        assert!(congruent(&a, &r0));
    }

    #[test]
    fn compatibility() {
        assert!(compatible(&Type::address(), RelOp::In, &Type::subnet()));
        assert!(compatible(&Type::subnet(), RelOp::In, &Type::subnet()));
        assert!(!compatible(&Type::integer(), RelOp::In, &Type::subnet()));
        assert!(compatible(&Type::string(), RelOp::Match, &Type::pattern()));
        assert!(!compatible(&Type::string(), RelOp::Match, &Type::string()));
        assert!(compatible(
            &Type::integer(),
            RelOp::In,
            &Type::vector(Type::integer())
        ));
        assert!(compatible(
            &Type::integer().with_name("x"),
            RelOp::Equal,
            &Type::integer()
        ));
    }

    #[test]
    fn hashing_is_stable_and_name_sensitive() {
        let x = Type::record([
            ("x", Type::integer()),
            ("y", Type::string()),
            ("z", Type::vector(Type::real())),
        ]);
        assert_eq!(x.hash64(), x.hash64());
        assert_eq!(x.hash64(), x.clone().hash64());
        assert_ne!(Type::boolean().hash64(), Type::address().hash64());
        assert_ne!(x.hash64(), x.clone().with_name("foo").hash64());
        // The digest ignores the outer name only.
        assert_eq!(x.digest(), x.clone().with_name("foo").digest());
        assert_eq!(x.digest(), x.hash64().to_string());
    }
}
