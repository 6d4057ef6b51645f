//! Printers for the textual type grammar.
//!
//! `Display` on a named type prints the name; anonymous types print their
//! full structure followed by attributes. [`Type::signature`] prints the
//! `name = structure` form used when declaring schemas.

use super::{Attribute, Kind, Type};
use std::fmt::{self, Write as _};

fn is_bare_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        if c == '"' || c == '\\' {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    f.write_char('"')
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.key)?;
        if let Some(value) = &self.value {
            f.write_char('=')?;
            let needs_quotes = value.is_empty()
                || value
                    .chars()
                    .any(|c| c.is_ascii_whitespace() || matches!(c, ',' | '}' | '>' | '"' | '#'));
            if needs_quotes {
                write_quoted(f, value)?;
            } else {
                f.write_str(value)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name().is_empty() {
            f.write_str(self.name())
        } else {
            write_structure(self, f)
        }
    }
}

impl Type {
    /// The declaration form: `name = structure`, or just the structure for
    /// anonymous types.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        if !self.name().is_empty() {
            // write! into a String cannot fail.
            let _ = write!(out, "{} = ", self.name());
        }
        let _ = write!(out, "{}", Structure(self));
        out
    }
}

struct Structure<'a>(&'a Type);

impl fmt::Display for Structure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_structure(self.0, f)
    }
}

fn write_structure(ty: &Type, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ty.kind() {
        None | Some(Kind::None) => f.write_str("none")?,
        Some(Kind::Bool) => f.write_str("bool")?,
        Some(Kind::Integer) => f.write_str("int")?,
        Some(Kind::Count) => f.write_str("count")?,
        Some(Kind::Real) => f.write_str("real")?,
        Some(Kind::Duration) => f.write_str("duration")?,
        Some(Kind::Time) => f.write_str("time")?,
        Some(Kind::String) => f.write_str("string")?,
        Some(Kind::Pattern) => f.write_str("pattern")?,
        Some(Kind::Address) => f.write_str("addr")?,
        Some(Kind::Subnet) => f.write_str("subnet")?,
        Some(Kind::Port) => f.write_str("port")?,
        Some(Kind::Enumeration(fields)) => {
            f.write_str("enum {")?;
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(field)?;
            }
            f.write_char('}')?;
        }
        Some(Kind::Vector(element)) => write!(f, "vector<{element}>")?,
        Some(Kind::Set(element)) => write!(f, "set<{element}>")?,
        Some(Kind::Map(key, value)) => write!(f, "map<{key}, {value}>")?,
        Some(Kind::Record(fields)) => {
            f.write_str("record{")?;
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                if is_bare_ident(&field.name) {
                    f.write_str(&field.name)?;
                } else {
                    write_quoted(f, &field.name)?;
                }
                write!(f, ": {}", field.ty)?;
            }
            f.write_char('}')?;
        }
        Some(Kind::Alias(inner)) => write!(f, "{inner}")?,
    }
    for attribute in ty.attributes() {
        write!(f, " {attribute}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{parse_type, Attribute, SymbolTable, Type};

    #[test]
    fn basic_types() {
        assert_eq!(Type::default().to_string(), "none");
        assert_eq!(Type::none().to_string(), "none");
        assert_eq!(Type::boolean().to_string(), "bool");
        assert_eq!(Type::integer().to_string(), "int");
        assert_eq!(Type::count().to_string(), "count");
        assert_eq!(Type::real().to_string(), "real");
        assert_eq!(Type::duration().to_string(), "duration");
        assert_eq!(Type::time().to_string(), "time");
        assert_eq!(Type::string().to_string(), "string");
        assert_eq!(Type::pattern().to_string(), "pattern");
        assert_eq!(Type::address().to_string(), "addr");
        assert_eq!(Type::subnet().to_string(), "subnet");
        assert_eq!(Type::port().to_string(), "port");
    }

    #[test]
    fn complex_types() {
        assert_eq!(
            Type::enumeration(["foo", "bar", "baz"]).to_string(),
            "enum {foo, bar, baz}"
        );
        assert_eq!(Type::vector(Type::real()).to_string(), "vector<real>");
        assert_eq!(Type::set(Type::boolean()).to_string(), "set<bool>");
        assert_eq!(
            Type::map(Type::count(), Type::boolean()).to_string(),
            "map<count, bool>"
        );
        assert_eq!(
            Type::record([
                ("foo", Type::boolean()),
                ("bar", Type::integer()),
                ("baz", Type::real())
            ])
            .to_string(),
            "record{foo: bool, bar: int, baz: real}"
        );
    }

    #[test]
    fn aliases_haul_through() {
        let a = Type::alias(Type::real());
        assert_eq!(a.to_string(), "real");
        let a = a.with_name("foo");
        assert_eq!(a.to_string(), "foo");
        assert_eq!(a.signature(), "foo = real");
    }

    #[test]
    fn attributes() {
        assert_eq!(Attribute::pair("foo", "bar").to_string(), "#foo=bar");
        assert_eq!(Attribute::new("skip").to_string(), "#skip");
        let s = Type::set(Type::port())
            .with_attributes(vec![Attribute::new("skip"), Attribute::pair("tokenize", "/rx/")]);
        assert_eq!(s.to_string(), "set<port> #skip #tokenize=/rx/");
        let s = Type::set(Type::port()).with_attributes(vec![Attribute::new("skip")]);
        let t = Type::map(Type::count(), s);
        assert_eq!(t.to_string(), "map<count, set<port> #skip>");
        let t = t.with_name("jells");
        assert_eq!(t.signature(), "jells = map<count, set<port> #skip>");
    }

    #[test]
    fn quoted_field_names() {
        let r = Type::record([("a b", Type::address()), ("b", Type::boolean())]);
        assert_eq!(r.to_string(), r#"record{"a b": addr, b: bool}"#);
    }

    #[test]
    fn print_parse_round_trip() {
        let symbols = SymbolTable::new();
        let gnarly = Type::record([
            ("a", Type::map(Type::string(), Type::port())),
            (
                "b",
                Type::vector(Type::boolean())
                    .with_attributes(vec![Attribute::pair("default", "F")]),
            ),
            (
                "c",
                Type::record([
                    ("x", Type::integer()),
                    ("y", Type::address()),
                    (
                        "z",
                        Type::real().with_attributes(vec![Attribute::pair("key", "value")]),
                    ),
                ]),
            ),
            ("d e", Type::enumeration(["foo", "bar"])),
            ("f", Type::set(Type::subnet())),
        ]);
        let printed = gnarly.to_string();
        assert_eq!(parse_type(&printed, &symbols).unwrap(), gnarly);
    }

    #[test]
    fn named_round_trip_through_symbols() {
        let foo = Type::vector(Type::boolean()).with_name("foo");
        let mut symbols = SymbolTable::new();
        symbols.insert("foo".to_string(), foo.clone());
        let r = Type::record([("a", foo.clone()), ("b", Type::count())]);
        let printed = r.to_string();
        assert_eq!(printed, "record{a: foo, b: count}");
        assert_eq!(parse_type(&printed, &symbols).unwrap(), r);
    }
}
