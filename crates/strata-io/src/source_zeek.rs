//! Reader for Zeek tab-separated log files.
//!
//! A Zeek log opens with a header block:
//!
//! ```text
//! #separator \x09
//! #set_separator ,
//! #empty_field (empty)
//! #unset_field -
//! #path conn
//! #open 2019-06-07-14-30-44
//! #fields ts uid id.orig_h ...
//! #types time string addr ...
//! ```
//!
//! The `#fields`/`#types` pair declares the layout; dotted field names are
//! already the flat column form. Unset fields render as the `#unset_field`
//! token, empty containers as the `#empty_field` token. A `#separator` line
//! in the middle of the input restarts the header with a new log.

use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;
use strata_core::{
    Data, Duration, Error, Kind, Port, Protocol, Result, Slice, SliceBuilder, Timestamp, Type,
};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

pub struct ZeekReader {
    paths: VecDeque<PathBuf>,
    lines: Option<Lines<BufReader<File>>>,
    header: Option<Header>,
}

#[derive(Debug)]
struct Header {
    separator: String,
    set_separator: String,
    empty_field: String,
    unset_field: String,
    layout: Type,
}

impl ZeekReader {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            paths: crate::expand_paths(pattern)?.into(),
            lines: None,
            header: None,
        })
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        match &mut self.lines {
            Some(lines) => lines.next_line().await.map_err(Error::from),
            None => Ok(None),
        }
    }

    /// Reads one tagged header line and returns its value part.
    async fn header_line(&mut self, separator: &str, tag: &str) -> Result<String> {
        let line = self
            .next_line()
            .await?
            .ok_or_else(|| Error::syntax(format!("missing header line {tag}")))?;
        let mut parts = line.splitn(2, separator);
        if parts.next() != Some(tag) {
            return Err(Error::syntax(format!("got invalid {tag}")));
        }
        Ok(parts.next().unwrap_or_default().to_string())
    }

    /// Opens the next input file, if any, and parses its header.
    async fn open_next(&mut self) -> Result<bool> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(false);
        };
        debug!(path = %path.display(), "opens zeek log");
        let file = File::open(&path).await?;
        self.lines = Some(BufReader::new(file).lines());
        let first = self
            .next_line()
            .await?
            .ok_or_else(|| Error::syntax("could not read first line of header"))?;
        self.parse_header(&first).await?;
        Ok(true)
    }

    /// Parses the header block, starting from its `#separator` line.
    async fn parse_header(&mut self, separator_line: &str) -> Result<()> {
        let value = separator_line
            .strip_prefix("#separator")
            .map(str::trim)
            .ok_or_else(|| Error::syntax("got invalid #separator"))?;
        let separator = decode_separator(value);
        let set_separator = self.header_line(&separator, "#set_separator").await?;
        let empty_field = self.header_line(&separator, "#empty_field").await?;
        let unset_field = self.header_line(&separator, "#unset_field").await?;
        let path = self.header_line(&separator, "#path").await?;
        let _open = self.header_line(&separator, "#open").await?;
        let fields_line = self.header_line(&separator, "#fields").await?;
        let types_line = self.header_line(&separator, "#types").await?;
        let names: Vec<&str> = fields_line.split(separator.as_str()).collect();
        let types: Vec<&str> = types_line.split(separator.as_str()).collect();
        if names.len() != types.len() {
            return Err(Error::syntax(format!(
                "#fields declares {} columns but #types declares {}",
                names.len(),
                types.len()
            )));
        }
        let fields: Result<Vec<_>> = names
            .iter()
            .zip(types.iter())
            .map(|(name, zeek)| make_type(zeek).map(|ty| (name.to_string(), ty)))
            .collect();
        let layout = Type::record(fields?).with_name(format!("zeek.{path}"));
        debug!(layout = %layout.signature(), "parsed zeek header");
        self.header = Some(Header {
            separator,
            set_separator,
            empty_field,
            unset_field,
            layout,
        });
        Ok(())
    }
}

#[async_trait]
impl crate::Reader for ZeekReader {
    fn name(&self) -> &str {
        "zeek"
    }

    fn layout(&self) -> Option<&Type> {
        self.header.as_ref().map(|h| &h.layout)
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Slice>> {
        loop {
            if self.lines.is_none() && !self.open_next().await? {
                return Ok(None);
            }
            let mut builder = {
                let header = self
                    .header
                    .as_ref()
                    .ok_or_else(|| Error::syntax("zeek input carries no header"))?;
                SliceBuilder::new(header.layout.clone())?
            };
            while builder.rows() < max_rows {
                let Some(line) = self.next_line().await? else {
                    // End of this file; the next loop turn opens the next
                    // one with a fresh header.
                    self.lines = None;
                    break;
                };
                if line.is_empty() {
                    continue;
                }
                if let Some(rest) = line.strip_prefix("#separator") {
                    // The log restarts with a new header; close the batch
                    // because the layout may change.
                    let rest = rest.to_string();
                    self.parse_header(&format!("#separator{rest}")).await?;
                    break;
                }
                if line.starts_with('#') {
                    continue;
                }
                let header = self
                    .header
                    .as_ref()
                    .ok_or_else(|| Error::syntax("zeek data before header"))?;
                let row = parse_row(header, &line)?;
                builder.add_row(row)?;
            }
            if builder.rows() > 0 {
                return builder.finish().map(Some);
            }
            if self.lines.is_none() && self.paths.is_empty() {
                return Ok(None);
            }
        }
    }
}

/// Decodes the `#separator` value, which escapes bytes as `\xNN`.
fn decode_separator(value: &str) -> String {
    if !value.contains("\\x") {
        return value.to_string();
    }
    let mut out = String::new();
    let mut rest = value;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4).unwrap_or_default();
        match u8::from_str_radix(hex, 16) {
            Ok(byte) => out.push(byte as char),
            Err(_) => out.push_str("\\x"),
        }
        rest = rest.get(pos + 4..).unwrap_or_default();
    }
    out.push_str(rest);
    out
}

/// Maps a Zeek type name onto the schema algebra.
fn make_type(zeek: &str) -> Result<Type> {
    let ty = match zeek {
        "enum" | "string" | "file" | "func" => Type::string(),
        "bool" => Type::boolean(),
        "int" => Type::integer(),
        "count" => Type::count(),
        "double" => Type::real(),
        "interval" => Type::duration(),
        "time" => Type::time(),
        "pattern" => Type::pattern(),
        "addr" => Type::address(),
        "subnet" => Type::subnet(),
        "port" => Type::port(),
        compound => {
            let (constructor, element) = compound
                .split_once('[')
                .and_then(|(c, rest)| rest.strip_suffix(']').map(|e| (c, e)))
                .ok_or_else(|| Error::syntax(format!("unknown zeek type: {compound}")))?;
            // Zeek cannot log nested containers, so the element is basic.
            let element = make_type(element)?;
            match constructor {
                "vector" => Type::vector(element),
                "set" | "table" => Type::set(element),
                other => return Err(Error::syntax(format!("unknown zeek type: {other}[..]"))),
            }
        }
    };
    Ok(ty)
}

fn parse_row(header: &Header, line: &str) -> Result<Vec<Data>> {
    let fields: Vec<&str> = line.split(header.separator.as_str()).collect();
    let columns = header.layout.fields().unwrap_or_default();
    if fields.len() != columns.len() {
        return Err(Error::syntax(format!(
            "row has {} fields but the layout has {} columns",
            fields.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(fields.iter())
        .map(|(column, text)| {
            if *text == header.unset_field {
                return Ok(Data::None);
            }
            if *text == header.empty_field {
                return match column.ty.kind() {
                    Some(Kind::Vector(_)) => Ok(Data::Vector(Vec::new())),
                    Some(Kind::Set(_)) => Ok(Data::Set(BTreeSet::new())),
                    Some(Kind::String) => Ok(Data::String(String::new())),
                    _ => Err(Error::syntax(format!(
                        "only containers can be empty, column {} is {}",
                        column.name, column.ty
                    ))),
                };
            }
            parse_value(&column.ty, text, &header.set_separator)
        })
        .collect()
}

fn parse_value(ty: &Type, text: &str, set_separator: &str) -> Result<Data> {
    let fail = || Error::syntax(format!("cannot parse {text:?} as {ty}"));
    let Some(kind) = ty.kind() else {
        return Err(fail());
    };
    let data = match kind {
        Kind::Bool => match text {
            "T" => Data::Bool(true),
            "F" => Data::Bool(false),
            _ => return Err(fail()),
        },
        Kind::Integer => Data::Integer(text.parse().map_err(|_| fail())?),
        Kind::Count => Data::Count(text.parse().map_err(|_| fail())?),
        Kind::Real => Data::real(text.parse().map_err(|_| fail())?),
        Kind::Duration => {
            Data::Duration(Duration::from_secs_f64(text.parse().map_err(|_| fail())?))
        }
        Kind::Time => Data::Time(Timestamp::from_secs_f64(text.parse().map_err(|_| fail())?)),
        Kind::String => Data::String(text.to_string()),
        Kind::Pattern => Data::Pattern(strata_core::Pattern::new(text)),
        Kind::Address => Data::Address(text.parse().map_err(|_| fail())?),
        Kind::Subnet => Data::Subnet(text.parse().map_err(|_| fail())?),
        Kind::Port => match text.parse::<u16>() {
            Ok(number) => Data::Port(Port::new(number, Protocol::Unknown)),
            Err(_) => Data::Port(text.parse().map_err(|_| fail())?),
        },
        Kind::Vector(element) => Data::Vector(
            text.split(set_separator)
                .map(|item| parse_value(element, item, set_separator))
                .collect::<Result<_>>()?,
        ),
        Kind::Set(element) => Data::Set(
            text.split(set_separator)
                .map(|item| parse_value(element, item, set_separator))
                .collect::<Result<_>>()?,
        ),
        _ => return Err(fail()),
    };
    Ok(data)
}
