//! Info hash extraction from magnet URIs.

use regex_lite::Regex;

/// Read the info hash off a magnet URI.
///
/// Accepts `urn:btih:` with 40 hex or 32 base32 characters and `urn:sha1:`
/// with 40 hex characters. The result is lowercase hex.
pub(crate) fn derive_info_hash(uri: &str) -> Option<String> {
    let re = Regex::new(r"(?i)[?&]xt=urn:(btih|sha1):([a-z0-9]+)").ok()?;
    let caps = re.captures(uri)?;
    let scheme = caps.get(1)?.as_str().to_ascii_lowercase();
    let value = caps.get(2)?.as_str();

    match (scheme.as_str(), value.len()) {
        (_, 40) if value.chars().all(|c| c.is_ascii_hexdigit()) => Some(value.to_lowercase()),
        ("btih", 32) => base32_to_hex(value),
        _ => None,
    }
}

/// Decode RFC 4648 base32 (no padding) into lowercase hex.
fn base32_to_hex(input: &str) -> Option<String> {
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    let mut out = String::with_capacity(input.len() * 5 / 4);

    for c in input.bytes() {
        let value = match c.to_ascii_uppercase() {
            upper @ b'A'..=b'Z' => upper - b'A',
            digit @ b'2'..=b'7' => digit - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push_str(&format!("{:02x}", (buffer >> bits) & 0xff));
            buffer &= (1 << bits) - 1;
        }
    }

    Some(out)
}
