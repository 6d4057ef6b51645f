//! Dynamically-typed values mirroring the schema algebra.
//!
//! A [`Data`] is the runtime companion of a [`Type`]: every type variant has
//! a value variant. Values are totally ordered and hashable so they can live
//! in sorted sets and maps; reals use [`ordered_float::OrderedFloat`] for a
//! total order. Views over values are plain borrows, which is all the index
//! layer needs to ingest cells without copying.

use crate::schema::{compatible, Kind, RelOp, Type};
use chrono::DateTime;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A non-owning view over a value or any of its sub-elements.
pub type DataView<'a> = &'a Data;

/// Lifts an owned value into a view bound to its lifetime.
pub fn make_view(data: &Data) -> DataView<'_> {
    data
}

/// A signed duration in nanoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Duration(i64);

impl Duration {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9) as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n == 0 {
            return f.write_str("0s");
        }
        if n % 3_600_000_000_000 == 0 {
            write!(f, "{}h", n / 3_600_000_000_000)
        } else if n % 60_000_000_000 == 0 {
            write!(f, "{}min", n / 60_000_000_000)
        } else if n % 1_000_000_000 == 0 {
            write!(f, "{}s", n / 1_000_000_000)
        } else if n % 1_000_000 == 0 {
            write!(f, "{}ms", n / 1_000_000)
        } else if n % 1_000 == 0 {
            write!(f, "{}us", n / 1_000)
        } else {
            write!(f, "{}ns", n)
        }
    }
}

/// A point in time as nanoseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9) as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.div_euclid(1_000_000_000);
        let nanos = self.0.rem_euclid(1_000_000_000) as u32;
        match DateTime::from_timestamp(secs, nanos) {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ns", self.0),
        }
    }
}

/// A regular expression value. Equality and ordering are on the source
/// string; compilation happens on demand.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pattern(String);

impl Pattern {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whole-string match against the pattern.
    pub fn is_match(&self, input: &str) -> Result<bool> {
        let re = regex::Regex::new(&format!("^(?:{})$", self.0))
            .map_err(|e| Error::syntax(format!("invalid pattern {}: {e}", self.0)))?;
        Ok(re.is_match(input))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0)
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .map(Pattern::new)
            .ok_or_else(|| Error::syntax(format!("pattern must be slash-delimited: {s}")))
    }
}

/// Transport protocol tag of a port.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Unknown,
    Icmp,
    Tcp,
    Udp,
}

/// A transport-layer port: 16-bit number plus protocol tag.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Port {
    number: u16,
    protocol: Protocol,
}

impl Port {
    pub fn new(number: u16, protocol: Protocol) -> Self {
        Self { number, protocol }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = match self.protocol {
            Protocol::Unknown => "?",
            Protocol::Icmp => "icmp",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        };
        write!(f, "{}/{}", self.number, proto)
    }
}

impl FromStr for Port {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (number, proto) = s
            .split_once('/')
            .ok_or_else(|| Error::syntax(format!("port must be number/proto: {s}")))?;
        let number = number
            .parse::<u16>()
            .map_err(|_| Error::syntax(format!("invalid port number: {number}")))?;
        let protocol = match proto {
            "?" => Protocol::Unknown,
            "icmp" => Protocol::Icmp,
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            other => return Err(Error::syntax(format!("invalid port protocol: {other}"))),
        };
        Ok(Self::new(number, protocol))
    }
}

/// An IP subnet: network address plus prefix length. The network address is
/// canonicalized by masking out host bits on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subnet {
    network: IpAddr,
    length: u8,
}

impl Subnet {
    pub fn new(network: IpAddr, length: u8) -> Self {
        match network {
            IpAddr::V4(addr) => {
                let length = length.min(32);
                let bits = u32::from(addr);
                let masked = if length == 0 {
                    0
                } else {
                    bits & (u32::MAX << (32 - length))
                };
                Self {
                    network: IpAddr::V4(masked.into()),
                    length,
                }
            }
            IpAddr::V6(addr) => {
                let length = length.min(128);
                let bits = u128::from(addr);
                let masked = if length == 0 {
                    0
                } else {
                    bits & (u128::MAX << (128 - length))
                };
                Self {
                    network: IpAddr::V6(masked.into()),
                    length,
                }
            }
        }
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    /// True when `addr` lies inside this subnet.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                Subnet::new(addr, self.length).network == self.network
            }
            _ => false,
        }
    }

    /// True when `other` is fully contained in this subnet.
    pub fn contains_subnet(&self, other: &Subnet) -> bool {
        other.length >= self.length && self.contains(other.network)
    }
}

impl Default for Subnet {
    fn default() -> Self {
        Self::new(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 0)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.length)
    }
}

impl FromStr for Subnet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, length) = s
            .split_once('/')
            .ok_or_else(|| Error::syntax(format!("subnet must be addr/length: {s}")))?;
        let addr = addr
            .parse::<IpAddr>()
            .map_err(|_| Error::syntax(format!("invalid network address: {addr}")))?;
        let length = length
            .parse::<u8>()
            .map_err(|_| Error::syntax(format!("invalid prefix length: {length}")))?;
        Ok(Self::new(addr, length))
    }
}

/// A dynamically-typed value.
///
/// Sets are canonical (sorted, deduplicated) and maps iterate in key order;
/// vectors and records are positional.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Data {
    #[default]
    None,
    Bool(bool),
    Integer(i64),
    Count(u64),
    Real(OrderedFloat<f64>),
    Duration(Duration),
    Time(Timestamp),
    String(String),
    Pattern(Pattern),
    Address(IpAddr),
    Subnet(Subnet),
    Port(Port),
    Enumeration(u32),
    Vector(Vec<Data>),
    Set(BTreeSet<Data>),
    Map(BTreeMap<Data, Data>),
    Record(Vec<Data>),
}

impl Data {
    pub fn real(x: f64) -> Self {
        Data::Real(OrderedFloat(x))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Data::None)
    }
}

impl From<bool> for Data {
    fn from(x: bool) -> Self {
        Data::Bool(x)
    }
}

impl From<i64> for Data {
    fn from(x: i64) -> Self {
        Data::Integer(x)
    }
}

impl From<u64> for Data {
    fn from(x: u64) -> Self {
        Data::Count(x)
    }
}

impl From<f64> for Data {
    fn from(x: f64) -> Self {
        Data::real(x)
    }
}

impl From<&str> for Data {
    fn from(x: &str) -> Self {
        Data::String(x.to_string())
    }
}

impl From<String> for Data {
    fn from(x: String) -> Self {
        Data::String(x)
    }
}

impl From<IpAddr> for Data {
    fn from(x: IpAddr) -> Self {
        Data::Address(x)
    }
}

impl From<Subnet> for Data {
    fn from(x: Subnet) -> Self {
        Data::Subnet(x)
    }
}

impl From<Port> for Data {
    fn from(x: Port) -> Self {
        Data::Port(x)
    }
}

impl From<Duration> for Data {
    fn from(x: Duration) -> Self {
        Data::Duration(x)
    }
}

impl From<Timestamp> for Data {
    fn from(x: Timestamp) -> Self {
        Data::Time(x)
    }
}

impl From<Pattern> for Data {
    fn from(x: Pattern) -> Self {
        Data::Pattern(x)
    }
}

impl From<Vec<Data>> for Data {
    fn from(xs: Vec<Data>) -> Self {
        Data::Vector(xs)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::None => f.write_str("nil"),
            Data::Bool(true) => f.write_str("T"),
            Data::Bool(false) => f.write_str("F"),
            Data::Integer(x) => write!(f, "{x}"),
            Data::Count(x) => write!(f, "{x}"),
            Data::Real(x) => write!(f, "{x}"),
            Data::Duration(x) => write!(f, "{x}"),
            Data::Time(x) => write!(f, "{x}"),
            Data::String(x) => write!(f, "{x:?}"),
            Data::Pattern(x) => write!(f, "{x}"),
            Data::Address(x) => write!(f, "{x}"),
            Data::Subnet(x) => write!(f, "{x}"),
            Data::Port(x) => write!(f, "{x}"),
            Data::Enumeration(x) => write!(f, "{x}"),
            Data::Vector(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Data::Set(xs) => {
                f.write_str("{")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("}")
            }
            Data::Map(xs) => {
                f.write_str("{")?;
                for (i, (k, v)) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} -> {v}")?;
                }
                f.write_str("}")
            }
            Data::Record(xs) => {
                f.write_str("(")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Infers a type for a value. Container element types come from the first
/// element; record fields are anonymous.
pub fn type_of(data: &Data) -> Type {
    match data {
        Data::None => Type::none(),
        Data::Bool(_) => Type::boolean(),
        Data::Integer(_) => Type::integer(),
        Data::Count(_) => Type::count(),
        Data::Real(_) => Type::real(),
        Data::Duration(_) => Type::duration(),
        Data::Time(_) => Type::time(),
        Data::String(_) => Type::string(),
        Data::Pattern(_) => Type::pattern(),
        Data::Address(_) => Type::address(),
        Data::Subnet(_) => Type::subnet(),
        Data::Port(_) => Type::port(),
        Data::Enumeration(_) => Type::enumeration(std::iter::empty::<String>()),
        Data::Vector(xs) => Type::vector(xs.first().map(type_of).unwrap_or_default()),
        Data::Set(xs) => Type::set(xs.iter().next().map(type_of).unwrap_or_default()),
        Data::Map(xs) => match xs.iter().next() {
            Some((k, v)) => Type::map(type_of(k), type_of(v)),
            None => Type::map(Type::default(), Type::default()),
        },
        Data::Record(xs) => Type::record(xs.iter().map(|x| ("", type_of(x)))),
    }
}

/// Checks whether a value conforms to a type. `Data::None` conforms to
/// everything; containers with untyped elements accept any container of the
/// same kind; records also accept positional vectors, matching arity and
/// checking each field.
pub fn type_check(ty: &Type, data: &Data) -> bool {
    let ty = ty.skeleton();
    if data.is_none() {
        return true;
    }
    let Some(kind) = ty.kind() else {
        return false;
    };
    match (kind, data) {
        (Kind::Bool, Data::Bool(_)) => true,
        (Kind::Integer, Data::Integer(_)) => true,
        (Kind::Count, Data::Count(_)) => true,
        (Kind::Real, Data::Real(_)) => true,
        (Kind::Duration, Data::Duration(_)) => true,
        (Kind::Time, Data::Time(_)) => true,
        (Kind::String, Data::String(_)) => true,
        (Kind::Pattern, Data::Pattern(_)) => true,
        (Kind::Address, Data::Address(_)) => true,
        (Kind::Subnet, Data::Subnet(_)) => true,
        (Kind::Port, Data::Port(_)) => true,
        (Kind::Enumeration(fields), Data::Enumeration(x)) => (*x as usize) < fields.len(),
        (Kind::Vector(element), Data::Vector(xs)) => {
            element.is_empty() || xs.iter().all(|x| type_check(element, x))
        }
        (Kind::Set(element), Data::Set(xs)) => {
            element.is_empty() || xs.iter().all(|x| type_check(element, x))
        }
        (Kind::Map(key, value), Data::Map(xs)) => xs.iter().all(|(k, v)| {
            (key.is_empty() || type_check(key, k)) && (value.is_empty() || type_check(value, v))
        }),
        (Kind::Record(fields), Data::Record(xs)) | (Kind::Record(fields), Data::Vector(xs)) => {
            fields.len() == xs.len()
                && fields
                    .iter()
                    .zip(xs.iter())
                    .all(|(field, x)| type_check(&field.ty, x))
        }
        _ => false,
    }
}

/// Type/value compatibility under a relational operator.
pub fn compatible_data(lhs: &Type, op: RelOp, rhs: &Data) -> bool {
    compatible(lhs, op, &type_of(rhs))
}
