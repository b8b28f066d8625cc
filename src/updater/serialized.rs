//! Decoder for the serialized wrapper format some vendor servers use for
//! `sections`, `banners` and `icons`.
//!
//! Supported values: `N;`, `b:0;`, `i:42;`, `d:1.5;`, `s:5:"hello";`,
//! arrays `a:N:{key;value...}` and objects `O:len:"Class":N:{...}`.
//! Arrays and objects both decode to JSON objects with string keys.
//! String lengths are byte counts, so multi-byte UTF-8 content is handled.

use serde_json::{Map, Number, Value};

/// Deepest array/object nesting accepted before decoding gives up.
///
/// Kept well under serde_json's recursion limit so a decoded mapping can
/// still be read back from the result cache.
pub const MAX_DEPTH: usize = 64;

/// Decode a complete serialized value. Trailing input is rejected.
pub fn decode(input: &str) -> Option<Value> {
    let mut parser = Parser {
        input: input.trim().as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    (parser.pos == parser.input.len()).then_some(value)
}

/// Cheap check before attempting a full decode
pub fn looks_serialized(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed == "N;" {
        return true;
    }
    let bytes = trimmed.as_bytes();
    bytes.len() >= 4
        && bytes[1] == b':'
        && matches!(bytes[0], b'a' | b'O' | b's' | b'i' | b'd' | b'b')
        && matches!(bytes[bytes.len() - 1], b';' | b'}')
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn value(&mut self) -> Option<Value> {
        let tag = self.next()?;
        if tag == b'N' {
            self.expect(b';')?;
            return Some(Value::Null);
        }
        self.expect(b':')?;

        match tag {
            b'b' => {
                let raw = self.until(b';')?;
                match raw {
                    b"0" => Some(Value::Bool(false)),
                    b"1" => Some(Value::Bool(true)),
                    _ => None,
                }
            }
            b'i' => {
                let raw = std::str::from_utf8(self.until(b';')?).ok()?;
                raw.parse::<i64>().ok().map(Value::from)
            }
            b'd' => {
                let raw = std::str::from_utf8(self.until(b';')?).ok()?;
                let float = raw.parse::<f64>().ok()?;
                Some(Number::from_f64(float).map(Value::Number).unwrap_or(Value::Null))
            }
            b's' => {
                let text = self.string_body()?;
                self.expect(b';')?;
                Some(Value::String(text))
            }
            b'a' => self.entries(),
            b'O' => {
                // Class name is irrelevant once flattened to a mapping
                self.string_body()?;
                self.expect(b':')?;
                self.entries()
            }
            _ => None,
        }
    }

    /// `len:"bytes"`
    fn string_body(&mut self) -> Option<String> {
        let len = self.length(b':')?;
        self.expect(b'"')?;
        let end = self.pos.checked_add(len)?;
        let bytes = self.input.get(self.pos..end)?;
        self.pos = end;
        self.expect(b'"')?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    /// `count:{key;value ...}`
    fn entries(&mut self) -> Option<Value> {
        if self.depth >= MAX_DEPTH {
            return None;
        }
        self.depth += 1;

        let count = self.length(b':')?;
        self.expect(b'{')?;

        let mut map = Map::new();
        for _ in 0..count {
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let value = self.value()?;
            map.insert(key, value);
        }

        self.expect(b'}')?;
        self.depth -= 1;
        Some(Value::Object(map))
    }

    fn length(&mut self, terminator: u8) -> Option<usize> {
        let raw = std::str::from_utf8(self.until(terminator)?).ok()?;
        raw.parse().ok()
    }

    /// Bytes up to (not including) `terminator`; consumes the terminator
    fn until(&mut self, terminator: u8) -> Option<&'a [u8]> {
        let rest = self.input.get(self.pos..)?;
        let offset = rest.iter().position(|&b| b == terminator)?;
        let slice = &rest[..offset];
        self.pos += offset + 1;
        Some(slice)
    }

    fn next(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.next()? == byte).then_some(())
    }
}
