//! Recursive-descent parser for the textual type grammar.
//!
//! ```text
//! type       := named-type | anon-type
//! named-type := identifier                 (resolved via a symbol table)
//! anon-type  := 'bool' | 'int' | 'count' | 'real' | 'duration'
//!             | 'time' | 'string' | 'pattern' | 'addr' | 'subnet' | 'port'
//!             | 'none'
//!             | 'enum' '{' ident (',' ident)* '}'
//!             | 'vector' '<' type '>'
//!             | 'set'    '<' type '>'
//!             | 'map'    '<' type ',' type '>'
//!             | 'record' '{' field (',' field)* '}'
//! field      := quoted-or-ident ':' type attr*
//! attr       := '#' ident ( '=' ( quoted | unquoted ) )?
//! ```

use super::{Attribute, Field, SymbolTable, Type};
use crate::error::{Error, Result};

/// Parses a type from its textual form, resolving bare identifiers against
/// `symbols`. The whole input must be consumed.
pub fn parse_type(input: &str, symbols: &SymbolTable) -> Result<Type> {
    let mut parser = Parser {
        src: input.as_bytes(),
        pos: 0,
        symbols,
    };
    let ty = parser.ty()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(Error::syntax(format!(
            "trailing input after type at byte {}",
            parser.pos
        )));
    }
    Ok(ty)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    symbols: &'a SymbolTable,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self
            .src
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, b: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.eat(b) {
            Ok(())
        } else {
            Err(Error::syntax(format!(
                "expected '{}' at byte {}",
                b as char, self.pos
            )))
        }
    }

    fn ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        if self
            .peek()
            .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
        {
            self.pos += 1;
            while self
                .peek()
                .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
            {
                self.pos += 1;
            }
            // Byte-wise ASCII scanning keeps this valid UTF-8.
            Ok(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
        } else {
            Err(Error::syntax(format!(
                "expected identifier at byte {}",
                self.pos
            )))
        }
    }

    fn quoted(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    let s = String::from_utf8(out)
                        .map_err(|_| Error::syntax("invalid UTF-8 in quoted string"))?;
                    return Ok(s);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b) => {
                            out.push(b);
                            self.pos += 1;
                        }
                        None => return Err(Error::syntax("dangling escape in quoted string")),
                    }
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
                None => return Err(Error::syntax("unterminated quoted string")),
            }
        }
    }

    fn ty(&mut self) -> Result<Type> {
        let id = self.ident()?;
        let mut ty = match id.as_str() {
            "none" => Type::none(),
            "bool" => Type::boolean(),
            "int" => Type::integer(),
            "count" => Type::count(),
            "real" => Type::real(),
            "duration" => Type::duration(),
            "time" => Type::time(),
            "string" => Type::string(),
            "pattern" => Type::pattern(),
            "addr" => Type::address(),
            "subnet" => Type::subnet(),
            "port" => Type::port(),
            "enum" => self.enum_body()?,
            "vector" => {
                self.expect(b'<')?;
                let element = self.ty()?;
                self.expect(b'>')?;
                Type::vector(element)
            }
            "set" => {
                self.expect(b'<')?;
                let element = self.ty()?;
                self.expect(b'>')?;
                Type::set(element)
            }
            "map" => {
                self.expect(b'<')?;
                let key = self.ty()?;
                self.expect(b',')?;
                let value = self.ty()?;
                self.expect(b'>')?;
                Type::map(key, value)
            }
            "record" => self.record_body()?,
            symbol => self
                .symbols
                .get(symbol)
                .cloned()
                .ok_or_else(|| Error::unknown_symbol(format!("unknown type symbol: {symbol}")))?,
        };
        let attributes = self.attributes()?;
        if !attributes.is_empty() {
            ty = ty.with_attributes(attributes);
        }
        Ok(ty)
    }

    fn enum_body(&mut self) -> Result<Type> {
        self.expect(b'{')?;
        let mut fields = vec![self.ident()?];
        while self.eat(b',') {
            fields.push(self.ident()?);
        }
        self.expect(b'}')?;
        Ok(Type::enumeration(fields))
    }

    fn record_body(&mut self) -> Result<Type> {
        self.expect(b'{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            let name = if self.peek() == Some(b'"') {
                self.quoted()?
            } else {
                self.ident()?
            };
            self.expect(b':')?;
            let ty = self.ty()?;
            fields.push(Field::new(name, ty));
            if !self.eat(b',') {
                break;
            }
        }
        self.expect(b'}')?;
        Ok(Type::record_of(fields))
    }

    fn attributes(&mut self) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() != Some(b'#') {
                return Ok(attributes);
            }
            self.pos += 1;
            let key = self.ident()?;
            if self.peek() == Some(b'=') {
                self.pos += 1;
                let value = if self.peek() == Some(b'"') {
                    self.quoted()?
                } else {
                    self.unquoted_value()?
                };
                attributes.push(Attribute::pair(key, value));
            } else {
                attributes.push(Attribute::new(key));
            }
        }
    }

    fn unquoted_value(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b',' | b'}' | b'>'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::syntax(format!(
                "expected attribute value at byte {}",
                start
            )));
        }
        String::from_utf8(self.src[start..self.pos].to_vec())
            .map_err(|_| Error::syntax("invalid UTF-8 in attribute value"))
    }
}
