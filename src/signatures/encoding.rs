//! Byte encoding of the canonical form.
//!
//! Compact JSON with HTML characters (`<`, `>`, `&`) written literally and no
//! trailing newline. Strings are escaped the way the reference Go encoder does
//! it so independently written tools hash identical bytes: control characters
//! use short escapes where JSON has them and `\u00XX` otherwise, and the line
//! and paragraph separators U+2028/U+2029 are always escaped.

use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Compact formatter that escapes U+2028 and U+2029.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escape = match c {
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escape.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize `value` into canonical bytes.
pub fn to_canonical_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    // The encoder never emits a record separator, but trim one if present
    if out.last() == Some(&b'\n') {
        out.pop();
    }
    Ok(out)
}
