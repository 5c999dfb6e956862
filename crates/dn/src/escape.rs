//! RFC 4514 (with RFC 2253/1779 compatibility) escaping and unescaping.

use crate::error::DnError;
use std::fmt;

const SPECIALS: &[u8] = b",=+<>#;\"\\";

/// Decodes the escape sequences in a raw RDN-value token (as it appeared
/// between delimiters in the grammar) into its byte value. `\\`, `\#`, and
/// the named specials unescape to the literal byte; `\<hex><hex>` decodes
/// the hex pair. UTF-8 multi-byte sequences pass through unchanged.
pub fn unescape(raw: &[u8]) -> Result<Vec<u8>, DnError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b == b'\\' {
            let pos = i;
            i += 1;
            if i >= raw.len() {
                return Err(DnError::UnterminatedEscape { pos });
            }
            let c = raw[i];
            if is_hex_digit(c) {
                if i + 1 >= raw.len() || !is_hex_digit(raw[i + 1]) {
                    return Err(DnError::InvalidHex { pos });
                }
                let hi = hex_val(c);
                let lo = hex_val(raw[i + 1]);
                out.push((hi << 4) | lo);
                i += 2;
            } else {
                // \ESC, \#, \", \+, \,, \;, \<, \>, or a bare escaped special.
                out.push(c);
                i += 1;
            }
        } else {
            out.push(b);
            i += 1;
        }
    }
    Ok(out)
}

fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_digit() || (b'a'..=b'f').contains(&b) || (b'A'..=b'F').contains(&b)
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!("checked by is_hex_digit"),
    }
}

/// Writes `value` as an RFC 4514 `string` production: leading `#`/space and
/// trailing space are escaped, as are the grammar's special characters and
/// any embedded NUL. A run of bytes between specials is written as a single
/// `&str` slice so multi-byte UTF-8 sequences (which specials, being ASCII,
/// never appear inside) survive unescaped, matching the grammar's `UTFMB`
/// production.
pub fn write_escaped_value(f: &mut fmt::Formatter<'_>, value: &[u8]) -> fmt::Result {
    let needs_escape = |i: usize, b: u8| -> bool {
        (i == 0 && (b == b'#' || b == b' '))
            || (i == value.len() - 1 && b == b' ')
            || b == 0
            || SPECIALS.contains(&b)
    };
    let mut run_start = 0;
    let mut i = 0;
    while i < value.len() {
        if needs_escape(i, value[i]) {
            if run_start < i {
                write_run(f, &value[run_start..i])?;
            }
            write!(f, "\\{:02x}", value[i])?;
            i += 1;
            run_start = i;
        } else {
            i += 1;
        }
    }
    if run_start < value.len() {
        write_run(f, &value[run_start..])?;
    }
    Ok(())
}

fn write_run(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    match std::str::from_utf8(bytes) {
        Ok(s) => f.write_str(s),
        Err(_) => Err(fmt::Error),
    }
}

/// Renders `value` the same way [`write_escaped_value`] does, but to an
/// owned `String` for callers that are not inside a `Display` impl.
pub fn escape_to_string(value: &[u8]) -> String {
    struct Wrap<'a>(&'a [u8]);
    impl fmt::Display for Wrap<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_escaped_value(f, self.0)
        }
    }
    Wrap(value).to_string()
}
