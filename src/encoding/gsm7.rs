// ABOUTME: GSM 03.38 default alphabet with the escape extension table
// ABOUTME: Converts text to septets and packs/unpacks septets into octets LSB-first

use crate::encoding::EncodingError;

/// Septet that switches to the extension table for the next septet
pub const ESC: u8 = 0x1B;

const CR: u8 = 0x0D;
const AT: u8 = 0x00;

// Index 0x1B is the escape septet and never maps to a character.
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1b}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0c}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

const UNMAPPABLE: u8 = b'?';

fn basic_septet(c: char) -> Option<u8> {
    BASIC
        .iter()
        .position(|&b| b == c)
        .filter(|&septet| septet != ESC as usize)
        .map(|septet| septet as u8)
}

fn extension_septet(c: char) -> Option<u8> {
    EXTENSION
        .iter()
        .find(|(_, ext)| *ext == c)
        .map(|(septet, _)| *septet)
}

fn extension_char(septet: u8) -> Option<char> {
    EXTENSION
        .iter()
        .find(|(code, _)| *code == septet)
        .map(|(_, c)| *c)
}

/// Whether every character of `text` exists in the basic or extension table
pub fn is_representable(text: &str) -> bool {
    text.chars()
        .all(|c| basic_septet(c).is_some() || extension_septet(c).is_some())
}

/// Map text to septets, one per octet. Unmappable characters become '?'.
pub fn to_septets(text: &str) -> Vec<u8> {
    let mut septets = Vec::with_capacity(text.len());
    for c in text.chars() {
        if let Some(septet) = basic_septet(c) {
            septets.push(septet);
        } else if let Some(septet) = extension_septet(c) {
            septets.push(ESC);
            septets.push(septet);
        } else {
            septets.push(UNMAPPABLE);
        }
    }
    septets
}

/// Map septets back to text
pub fn from_septets(septets: &[u8]) -> Result<String, EncodingError> {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter().copied().enumerate();
    while let Some((position, septet)) = iter.next() {
        if septet > 0x7F {
            return Err(EncodingError::UnexpectedByte {
                byte: septet,
                position,
            });
        }
        if septet == ESC {
            let (position, escaped) = iter.next().ok_or(EncodingError::UnexpectedByte {
                byte: ESC,
                position,
            })?;
            let c = extension_char(escaped).ok_or(EncodingError::UnexpectedByte {
                byte: escaped,
                position,
            })?;
            text.push(c);
        } else {
            text.push(BASIC[septet as usize]);
        }
    }
    Ok(text)
}

/// Pack septets into octets, LSB first.
///
/// The spare bits of the final octet stay zero. When the septets would not
/// survive `unpack` unchanged (see `needs_pad`), one extra CR septet is
/// appended for `unpack` to remove.
pub fn pack(septets: &[u8]) -> Vec<u8> {
    let padded = needs_pad(septets);

    let count = septets.len() + usize::from(padded);
    let mut out = vec![0u8; (count * 7).div_ceil(8)];

    let pad = padded.then_some(CR);
    for (index, septet) in septets.iter().copied().chain(pad).enumerate() {
        for i in 0..7 {
            let bit_index = index * 7 + i;
            out[bit_index / 8] |= ((septet >> i) & 1) << (bit_index % 8);
        }
    }
    out
}

// Seven zero spare bits read back as a trailing '@', so a text ending on an
// octet boundary with '@' (or CR, for handsets that treat a final CR as
// filler) is padded. A pad CR is only recognised after such a text, which
// means any text that is one of those followed by CRs must be padded too.
fn needs_pad(septets: &[u8]) -> bool {
    let mut end = septets.len();
    while end > 0 {
        let last = septets[end - 1];
        if end % 8 == 0 && matches!(last, CR | AT) {
            return true;
        }
        if last != CR {
            return false;
        }
        end -= 1;
    }
    false
}

/// Unpack octets into septets, dropping the padding `pack` may add
pub fn unpack(octets: &[u8]) -> Vec<u8> {
    let count = octets.len() * 8 / 7;
    let mut septets = Vec::with_capacity(count);

    for index in 0..count {
        let mut septet = 0u8;
        for i in 0..7 {
            let bit_index = index * 7 + i;
            septet |= ((octets[bit_index / 8] >> (bit_index % 8)) & 1) << i;
        }
        septets.push(septet);
    }

    if septets.len() % 8 == 0 && septets.last() == Some(&AT) {
        septets.pop();
    }
    if let Some((&CR, text)) = septets.split_last() {
        if needs_pad(text) {
            septets.pop();
        }
    }
    septets
}

/// Unpacked GSM 7-bit: one septet per octet
pub fn encode(text: &str) -> Vec<u8> {
    to_septets(text)
}

pub fn decode(data: &[u8]) -> Result<String, EncodingError> {
    from_septets(data)
}

/// Packed GSM 7-bit: eight septets in seven octets
pub fn encode_packed(text: &str) -> Vec<u8> {
    pack(&to_septets(text))
}

pub fn decode_packed(data: &[u8]) -> Result<String, EncodingError> {
    from_septets(&unpack(data))
}

/// Split septets into runs of at most `limit`, never ending a run on an
/// escape septet (which would separate it from the character it selects)
pub fn split_septets(septets: &[u8], limit: usize) -> Vec<&[u8]> {
    let limit = limit.max(2);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < septets.len() {
        let mut end = (start + limit).min(septets.len());
        if end < septets.len() && ends_inside_escape(&septets[start..end]) {
            end -= 1;
        }
        chunks.push(&septets[start..end]);
        start = end;
    }
    chunks
}

// A trailing ESC only starts a pair if it is not itself the second half of one
fn ends_inside_escape(run: &[u8]) -> bool {
    let trailing_escapes = run.iter().rev().take_while(|&&s| s == ESC).count();
    trailing_escapes % 2 == 1
}
