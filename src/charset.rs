// charset.rs

use encoding_rs::{CoderResult, Decoder, DecoderResult, Encoding, UTF_8};
use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use crate::error::GzLinesError;

const DEFAULT_BYTE_BUFFER_SIZE: usize = 8192;

/// Label suffix that selects replacement of malformed input with U+FFFD.
const LOSSY_SUFFIX: &str = "-lossy";

/// A character set plus the policy for malformed input.
///
/// Labels are resolved with the WHATWG Encoding Standard rules, so
/// `latin1` and `iso-8859-1` name windows-1252. Appending `-lossy` to a label
/// replaces malformed sequences with U+FFFD instead of failing the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
    lossy: bool,
}

impl TextEncoding {
    /// Strict decoding with `encoding`: malformed input is an `InvalidData` error.
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            lossy: false,
        }
    }

    pub fn utf8() -> Self {
        Self::new(UTF_8)
    }

    pub fn utf8_lossy() -> Self {
        Self::utf8().lossy(true)
    }

    pub fn lossy(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Resolve a label such as `utf-8`, `latin1`, `shift_jis` or `utf-8-lossy`.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let (name, lossy) = match label.len().checked_sub(LOSSY_SUFFIX.len()) {
            Some(at)
                if label.is_char_boundary(at)
                    && label[at..].eq_ignore_ascii_case(LOSSY_SUFFIX) =>
            {
                (&label[..at], true)
            }
            _ => (label, false),
        };
        Encoding::for_label(name.as_bytes()).map(|encoding| Self { encoding, lossy })
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding.name())?;
        if self.lossy {
            f.write_str(LOSSY_SUFFIX)?;
        }
        Ok(())
    }
}

impl FromStr for TextEncoding {
    type Err = GzLinesError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::for_label(label).ok_or_else(|| GzLinesError::UnsupportedEncoding(label.to_string()))
    }
}

/// A source of characters.
///
/// `read_chars` follows the `Read::read` contract: `Ok(0)` for a non-empty
/// buffer means end of stream.
pub trait CharRead {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize>;

    /// Whether the next `read_chars` is guaranteed not to block.
    fn ready(&mut self) -> io::Result<bool> {
        Ok(false)
    }
}

impl<T: CharRead + ?Sized> CharRead for Box<T> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(buf)
    }

    fn ready(&mut self) -> io::Result<bool> {
        (**self).ready()
    }
}

impl<T: CharRead + ?Sized> CharRead for &mut T {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(buf)
    }

    fn ready(&mut self) -> io::Result<bool> {
        (**self).ready()
    }
}

/// Decodes a byte stream into characters with a fixed [`TextEncoding`].
///
/// Every byte read is handed to the decoder at once; a multi-byte sequence
/// split across reads stays inside the decoder until its remaining bytes
/// arrive. Byte order marks are not interpreted.
pub struct DecodingReader<R: Read> {
    inner: R,
    encoding: TextEncoding,
    decoder: Decoder,
    bytes: Box<[u8]>,
    /// Decoded text not yet handed out.
    decoded: String,
    /// Byte offset of the next character in `decoded`.
    pos: usize,
    /// Strict mode hit malformed input; reported once `decoded` drains.
    malformed: bool,
    /// The decoder has seen end of input.
    finished: bool,
}

impl<R: Read> fmt::Debug for DecodingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodingReader")
            .field("encoding", &self.encoding)
            .field("pending", &(self.decoded.len() - self.pos))
            .field("malformed", &self.malformed)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: TextEncoding) -> Self {
        Self::with_capacity(inner, encoding, DEFAULT_BYTE_BUFFER_SIZE)
    }

    /// Create a reader that reads `capacity` bytes (at least one) at a time.
    pub fn with_capacity(inner: R, encoding: TextEncoding, capacity: usize) -> Self {
        Self {
            inner,
            encoding,
            decoder: encoding.encoding.new_decoder_without_bom_handling(),
            bytes: vec![0u8; capacity.max(1)].into_boxed_slice(),
            decoded: String::new(),
            pos: 0,
            malformed: false,
            finished: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    fn read_bytes(&mut self) -> io::Result<usize> {
        loop {
            match self.inner.read(&mut self.bytes) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }

    /// Decode the first `len` bytes of the byte buffer into `decoded`, which
    /// must already be drained. `len == 0` flushes the decoder at end of input.
    fn decode(&mut self, len: usize) -> io::Result<()> {
        let last = len == 0;
        self.decoded.clear();
        self.pos = 0;

        let mut src = &self.bytes[..len];
        loop {
            let needed = if self.encoding.lossy {
                self.decoder.max_utf8_buffer_length(src.len())
            } else {
                self.decoder
                    .max_utf8_buffer_length_without_replacement(src.len())
            };
            let needed = needed.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "read buffer too large")
            })?;
            self.decoded.reserve(needed);

            if self.encoding.lossy {
                let (result, read, _) = self.decoder.decode_to_string(src, &mut self.decoded, last);
                src = &src[read..];
                if let CoderResult::InputEmpty = result {
                    break;
                }
            } else {
                let (result, read) =
                    self.decoder
                        .decode_to_string_without_replacement(src, &mut self.decoded, last);
                src = &src[read..];
                match result {
                    DecoderResult::InputEmpty => break,
                    DecoderResult::OutputFull => {}
                    DecoderResult::Malformed(..) => {
                        self.malformed = true;
                        break;
                    }
                }
            }
        }
        if last {
            self.finished = true;
        }
        Ok(())
    }
}

impl<R: Read> CharRead for DecodingReader<R> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pos < self.decoded.len() {
                let mut written = 0;
                let mut consumed = 0;
                for (dst, c) in buf.iter_mut().zip(self.decoded[self.pos..].chars()) {
                    *dst = c;
                    written += 1;
                    consumed += c.len_utf8();
                }
                self.pos += consumed;
                return Ok(written);
            }
            // Characters decoded before malformed input are delivered first.
            if self.malformed {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("malformed {} input", self.encoding.encoding.name()),
                ));
            }
            if self.finished {
                return Ok(0);
            }
            let n = self.read_bytes()?;
            self.decode(n)?;
        }
    }

    /// True only when whole decoded characters are waiting. Bytes of an
    /// incomplete sequence held by the decoder do not count.
    fn ready(&mut self) -> io::Result<bool> {
        Ok(self.pos < self.decoded.len())
    }
}
