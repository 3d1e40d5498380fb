use std::fmt::Display;

/// A valid lowercase hexadecimal encoding of binary data.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Hex(Vec<u8>);

impl Hex {
    /// Validates `s` as an even-length string of hexadecimal digits.
    pub fn parse(s: &str) -> Option<Hex> {
        if s.len() % 2 != 0 || !s.bytes().all(|b| unhex_digit(b).is_some()) {
            return None;
        }
        Some(Hex(s.to_ascii_lowercase().into_bytes()))
    }

    pub fn as_str(&self) -> &str {
        // Only ever constructed from ASCII hex digits.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn hex_digit(b: u8) -> u8 {
    if b <= 9 {
        b + b'0'
    } else {
        b + b'a' - 10
    }
}

fn unhex_digit(h: u8) -> Option<u8> {
    match h {
        b'0'..=b'9' => Some(h - b'0'),
        b'a'..=b'f' => Some(h - b'a' + 10),
        b'A'..=b'F' => Some(h - b'A' + 10),
        _ => None,
    }
}

impl<'a> From<&'a [u8]> for Hex {
    fn from(bytes: &[u8]) -> Self {
        let mut out = Vec::with_capacity(bytes.len() * 2);
        for &b in bytes {
            out.push(hex_digit(b >> 4));
            out.push(hex_digit(b & 0b00001111));
        }
        Hex(out)
    }
}

impl From<Hex> for Vec<u8> {
    fn from(value: Hex) -> Self {
        value
            .0
            .chunks(2)
            .map(|pair| {
                let hi = unhex_digit(pair[0]).unwrap_or(0);
                let lo = unhex_digit(pair[1]).unwrap_or(0);
                (hi << 4) | lo
            })
            .collect()
    }
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex: Hex = Hex::from(example);
    let bytes: Vec<u8> = hex.into();
    let bytes_ref: &[u8] = &bytes;
    assert_eq!(example, bytes_ref);
}

#[test]
fn test_hex_parse_rejects_garbage() {
    assert!(Hex::parse("abc").is_none());
    assert!(Hex::parse("zz").is_none());
    assert_eq!(Hex::parse("00FF").unwrap().as_str(), "00ff");
}
