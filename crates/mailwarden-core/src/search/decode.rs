//! RFC 2047 header decoding.
//!
//! Subjects and sender names arrive as encoded words
//! (`=?charset?B|Q?text?=`). Decoding is best effort: a malformed word is
//! kept verbatim rather than failing the whole message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decode a header value, replacing every well-formed encoded word and
/// keeping everything else as-is.
#[must_use]
pub fn decode_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut previous_was_encoded = false;

    while let Some(start) = rest.find("=?") {
        let (plain, tail) = rest.split_at(start);
        // Whitespace between adjacent encoded words is transparent.
        if !(previous_was_encoded && plain.chars().all(char::is_whitespace)) {
            out.push_str(plain);
        }
        match split_encoded_word(tail) {
            Some((word, remainder)) => {
                match decode_word(word) {
                    Some(decoded) => {
                        out.push_str(&decoded);
                        previous_was_encoded = true;
                    }
                    None => {
                        out.push_str(word);
                        previous_was_encoded = false;
                    }
                }
                rest = remainder;
            }
            None => {
                out.push_str(tail);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Split one `=?..?..?..?=` word off the front of `s`, which must start
/// with `=?`.
fn split_encoded_word(s: &str) -> Option<(&str, &str)> {
    let end = s.find("?=")?;
    // The terminator must come after charset, encoding, and text sections.
    let word = &s[..end + 2];
    if word.matches('?').count() < 4 {
        return None;
    }
    Some((word, &s[end + 2..]))
}

fn decode_word(word: &str) -> Option<String> {
    let inner = word.strip_prefix("=?")?.strip_suffix("?=")?;
    let mut parts = inner.splitn(3, '?');
    let _charset = parts.next()?;
    let encoding = parts.next()?;
    let text = parts.next()?;

    match encoding {
        "B" | "b" => {
            let bytes = STANDARD.decode(text).ok()?;
            String::from_utf8(bytes).ok()
        }
        "Q" | "q" => decode_q(text),
        _ => None,
    }
}

/// Q encoding: quoted-printable with `_` standing for space.
fn decode_q(text: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '_' => bytes.push(b' '),
            '=' => {
                let hi = chars.next()?;
                let lo = chars.next()?;
                let mut hex = String::with_capacity(2);
                hex.push(hi);
                hex.push(lo);
                bytes.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            _ if ch.is_ascii() => bytes.push(ch as u8),
            _ => return None,
        }
    }
    String::from_utf8(bytes).ok()
}
