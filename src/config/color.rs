use crate::foundation::core::Rgba8;
use crate::foundation::error::{VersecastError, VersecastResult};

/// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional, case-insensitive).
pub fn parse_hex_color(s: &str) -> VersecastResult<Rgba8> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);

    fn hex_byte(pair: &str) -> VersecastResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| VersecastError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    if !s.is_ascii() {
        return Err(VersecastError::validation(
            "hex color must be #RRGGBB or #RRGGBBAA",
        ));
    }
    match s.len() {
        6 => Ok(Rgba8::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err(VersecastError::validation(
            "hex color must be #RRGGBB or #RRGGBBAA",
        )),
    }
}

impl serde::Serialize for Rgba8 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_color(&s).map_err(serde::de::Error::custom)
    }
}
