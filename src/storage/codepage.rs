//! Character field text encoding
//!
//! Byte 29 of the preamble carries the language driver id, which selects
//! the encoding for 'C' field content. The ids seen in practice:
//! - 0x00: unspecified (treated as 7-bit ASCII)
//! - 0x01 / 0x65: DOS code pages, mapped to 437
//! - 0x03 / 0x57: Windows ANSI, code page 1252
//!
//! Unknown ids fall back to ASCII with a warning rather than failing the
//! open; the raw byte is preserved and round-trips through the header
//! untouched.

/// Text encoding for Character fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codepage {
    /// 7-bit ASCII; high bytes decode to the replacement character
    Ascii,
    /// IBM PC code page 437
    Cp437,
    /// Windows code page 1252
    Cp1252,
}

impl Codepage {
    /// Resolve a language driver byte to an encoding
    pub fn from_language_driver(id: u8) -> Codepage {
        match id {
            0x00 => Codepage::Ascii,
            0x01 | 0x65 => Codepage::Cp437,
            0x03 | 0x57 => Codepage::Cp1252,
            other => {
                tracing::warn!(
                    language_driver = other,
                    "unknown language driver id, falling back to ASCII"
                );
                Codepage::Ascii
            }
        }
    }

    /// Decode raw field bytes into text
    ///
    /// Bytes without a mapping decode to U+FFFD.
    pub fn decode(&self, data: &[u8]) -> String {
        data.iter().map(|&b| self.decode_byte(b)).collect()
    }

    /// Encode text into field bytes, replacing unmappable characters
    /// with '?'
    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.chars().map(|c| self.encode_char(c)).collect()
    }

    fn decode_byte(&self, byte: u8) -> char {
        if byte < 0x80 {
            return byte as char;
        }
        match self {
            Codepage::Ascii => '\u{FFFD}',
            Codepage::Cp437 => CP437_HIGH[(byte - 0x80) as usize],
            Codepage::Cp1252 => {
                if (0x80..0xA0).contains(&byte) {
                    CP1252_HIGH[(byte - 0x80) as usize]
                } else {
                    // 0xA0..=0xFF matches Latin-1
                    char::from_u32(byte as u32).unwrap_or('\u{FFFD}')
                }
            }
        }
    }

    fn encode_char(&self, c: char) -> u8 {
        if c.is_ascii() {
            return c as u8;
        }
        match self {
            Codepage::Ascii => b'?',
            Codepage::Cp437 => CP437_HIGH
                .iter()
                .position(|&mapped| mapped == c)
                .map(|i| 0x80 + i as u8)
                .unwrap_or(b'?'),
            Codepage::Cp1252 => {
                if let Some(i) = CP1252_HIGH.iter().position(|&mapped| mapped == c) {
                    0x80 + i as u8
                } else if ('\u{A0}'..='\u{FF}').contains(&c) {
                    c as u32 as u8
                } else {
                    b'?'
                }
            }
        }
    }
}

/// Code page 437, bytes 0x80-0xFF
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];

/// Code page 1252, bytes 0x80-0x9F (the rest matches Latin-1)
const CP1252_HIGH: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡',
    'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž', '\u{FFFD}',
    '\u{FFFD}', '‘', '’', '“', '”', '•', '–', '—',
    '˜', '™', 'š', '›', 'œ', '\u{FFFD}', 'ž', 'Ÿ',
];
