//! Decoding byte slices into UTF-8 code units.
//!
//! The pool accepts candidates as raw bytes in a handful of known encodings.
//! ASCII and UTF-8 inputs are validated and borrowed in place; Latin-1 and
//! UTF-16 are transcoded, either onto the caller's stack for short inputs or
//! into a rented buffer.

use std::str;

use crate::error::{EncodingError, EncodingResult};

/// Longest input, in bytes, eligible for the caller's stack buffer.
pub const STACK_DECODE_LIMIT: usize = 256;

/// Stack buffer size covering the worst-case UTF-8 expansion of
/// [`STACK_DECODE_LIMIT`] input bytes in any supported encoding.
pub const STACK_BUFFER_BYTES: usize = 1024;

/// Byte encodings accepted by the byte-slice interning operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
  Ascii,
  Utf8,
  Latin1,
  Utf16Le,
  Utf16Be,
}

impl Encoding {
  /// Resolve a WHATWG-style label to an encoding.
  ///
  /// # Examples
  /// ```
  /// use canon_core::encoding::Encoding;
  ///
  /// assert_eq!(Encoding::from_label("ISO-8859-1").unwrap(), Encoding::Latin1);
  /// assert!(Encoding::from_label("ebcdic").is_err());
  /// ```
  pub fn from_label(label: &str) -> EncodingResult<Encoding> {
    match label.to_ascii_lowercase().as_str() {
      "ascii" | "us-ascii" => Ok(Encoding::Ascii),
      "utf8" | "utf-8" => Ok(Encoding::Utf8),
      "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
      "utf-16" | "utf-16le" => Ok(Encoding::Utf16Le),
      "utf-16be" => Ok(Encoding::Utf16Be),
      _ => Err(EncodingError::UnknownLabel),
    }
  }
}

/// Borrow `bytes` as a str after checking every byte is 7-bit.
pub fn validate_ascii(bytes: &[u8]) -> EncodingResult<&str> {
  if let Some(position) = bytes.iter().position(|&byte| byte > 0x7f) {
    return Err(EncodingError::NonAscii(position));
  }

  // A 7-bit byte sequence is valid UTF-8 by construction.
  Ok(unsafe { str::from_utf8_unchecked(bytes) })
}

/// Borrow `bytes` as a str after UTF-8 validation.
pub fn validate_utf8(bytes: &[u8]) -> EncodingResult<&str> {
  str::from_utf8(bytes).map_err(|_| EncodingError::InvalidUtf8)
}

/// Decode `bytes` into `out`, returning the number of UTF-8 bytes written.
///
/// `out` must hold the worst-case expansion of the input: twice the input
/// length for Latin-1, one and a half times for UTF-16. The written prefix is
/// always valid UTF-8.
pub fn decode_to_slice(bytes: &[u8], encoding: Encoding, out: &mut [u8]) -> EncodingResult<usize> {
  match encoding {
    Encoding::Ascii => {
      let decoded = validate_ascii(bytes)?;
      out[..decoded.len()].copy_from_slice(decoded.as_bytes());
      Ok(decoded.len())
    }
    Encoding::Utf8 => {
      let decoded = validate_utf8(bytes)?;
      out[..decoded.len()].copy_from_slice(decoded.as_bytes());
      Ok(decoded.len())
    }
    Encoding::Latin1 => {
      let mut written = 0;
      for &byte in bytes {
        written += (byte as char).encode_utf8(&mut out[written..]).len();
      }
      Ok(written)
    }
    Encoding::Utf16Le | Encoding::Utf16Be => {
      let mut written = 0;
      for decoded in char::decode_utf16(utf16_units(bytes, encoding)?) {
        let decoded = decoded.map_err(|_| EncodingError::InvalidUtf16)?;
        written += decoded.encode_utf8(&mut out[written..]).len();
      }
      Ok(written)
    }
  }
}

/// Decode `bytes`, appending to `out`.
pub fn decode_to_string(
  bytes: &[u8],
  encoding: Encoding,
  out: &mut String,
) -> EncodingResult<()> {
  match encoding {
    Encoding::Ascii => out.push_str(validate_ascii(bytes)?),
    Encoding::Utf8 => out.push_str(validate_utf8(bytes)?),
    Encoding::Latin1 => out.extend(bytes.iter().map(|&byte| byte as char)),
    Encoding::Utf16Le | Encoding::Utf16Be => {
      for decoded in char::decode_utf16(utf16_units(bytes, encoding)?) {
        out.push(decoded.map_err(|_| EncodingError::InvalidUtf16)?);
      }
    }
  }

  Ok(())
}

fn utf16_units(
  bytes: &[u8],
  encoding: Encoding,
) -> EncodingResult<impl Iterator<Item = u16> + '_> {
  if bytes.len() % 2 != 0 {
    return Err(EncodingError::OddUtf16Length);
  }

  let big_endian = encoding == Encoding::Utf16Be;
  Ok(bytes.chunks_exact(2).map(move |pair| {
    if big_endian {
      u16::from_be_bytes([pair[0], pair[1]])
    } else {
      u16::from_le_bytes([pair[0], pair[1]])
    }
  }))
}

#[cfg(test)]
mod test {
  use super::*;

  mod validate {
    use super::*;

    #[test]
    fn ascii() {
      assert_eq!(validate_ascii(b"plain").unwrap(), "plain");
      assert_eq!(validate_ascii("héllo".as_bytes()), Err(EncodingError::NonAscii(1)));
    }

    #[test]
    fn utf8() {
      assert_eq!(validate_utf8("héllo".as_bytes()).unwrap(), "héllo");
      assert_eq!(validate_utf8(&[0xff, 0xfe]), Err(EncodingError::InvalidUtf8));
    }
  }

  mod decode {
    use super::*;

    #[test]
    fn latin1_expands() {
      let mut out = [0u8; 16];
      let written = decode_to_slice(&[0x63, 0x61, 0x66, 0xe9], Encoding::Latin1, &mut out).unwrap();

      assert_eq!(std::str::from_utf8(&out[..written]).unwrap(), "café");
    }

    #[test]
    fn utf16_both_orders() {
      let mut out = String::new();
      decode_to_string(&[0x61, 0x00], Encoding::Utf16Le, &mut out).unwrap();
      assert_eq!(out, "a");

      out.clear();
      decode_to_string(&[0x03, 0xb1], Encoding::Utf16Be, &mut out).unwrap();
      assert_eq!(out, "α");
    }

    #[test]
    fn utf16_rejects_bad_input() {
      let mut out = String::new();

      assert_eq!(
        decode_to_string(&[0x61], Encoding::Utf16Le, &mut out),
        Err(EncodingError::OddUtf16Length)
      );
      assert_eq!(
        decode_to_string(&[0x00, 0xd8], Encoding::Utf16Le, &mut out),
        Err(EncodingError::InvalidUtf16)
      );
    }

    #[test]
    fn surrogate_pair_round_trips() {
      // U+1D11E musical G clef as UTF-16LE
      let mut out = String::new();
      decode_to_string(&[0x34, 0xd8, 0x1e, 0xdd], Encoding::Utf16Le, &mut out).unwrap();

      assert_eq!(out, "\u{1d11e}");
    }
  }
}
