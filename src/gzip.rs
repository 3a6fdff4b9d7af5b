// gzip.rs

use flate2::bufread::GzDecoder;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default size of the pushback window that holds bytes read past the end of
/// one member.
pub const DEFAULT_PUSHBACK_CAPACITY: usize = 10 * 1024;

/// Whether a file name carries the gzip extension.
pub fn is_gzip_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

/// Decodes a stream of one or more back-to-back gzip members as a single
/// logical stream.
///
/// A single-member decoder stops after the first member's trailer and reports
/// end of stream even when more members follow. This reader keeps exactly one
/// member decoder alive; when it finishes, any bytes left in the pushback
/// buffer mean another member starts there, so a fresh decoder is built over
/// the same buffer and the read is retried.
///
/// Bytes after the last member that are not a gzip header surface as an
/// `io::Error` from the next decoder. Nothing is retried after an error.
pub struct MultiMemberGzReader<R: Read> {
    /// Decoder for the member being read; it owns the pushback buffer.
    current: Option<GzDecoder<BufReader<R>>>,
    /// Members started so far, including the current one.
    members: usize,
    end_of_stream: bool,
}

impl<R: Read> fmt::Debug for MultiMemberGzReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiMemberGzReader")
            .field("members", &self.members)
            .field("end_of_stream", &self.end_of_stream)
            .finish()
    }
}

impl<R: Read> MultiMemberGzReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_pushback_capacity(reader, DEFAULT_PUSHBACK_CAPACITY)
    }

    /// Create a reader whose pushback buffer holds `capacity` bytes (at least one).
    pub fn with_pushback_capacity(reader: R, capacity: usize) -> Self {
        let pushback = BufReader::with_capacity(capacity.max(1), reader);
        Self {
            current: Some(GzDecoder::new(pushback)),
            members: 1,
            end_of_stream: false,
        }
    }

    /// Number of gzip members started so far.
    pub fn members(&self) -> usize {
        self.members
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Called when the current member is exhausted. Returns `false` when the
    /// underlying stream holds no further bytes.
    fn next_member(&mut self) -> io::Result<bool> {
        let has_more = match self.current.as_mut() {
            Some(decoder) => !decoder.get_mut().fill_buf()?.is_empty(),
            None => false,
        };
        if !has_more {
            return Ok(false);
        }

        // The finished decoder consumed exactly its header, payload and
        // trailer, so the pushback buffer now starts at the next header.
        self.current = self
            .current
            .take()
            .map(|finished| GzDecoder::new(finished.into_inner()));
        self.members += 1;
        debug!(member = self.members, "starting next gzip member");
        Ok(true)
    }
}

impl<R: Read> Read for MultiMemberGzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.end_of_stream {
                return Ok(0);
            }
            let decoder = match self.current.as_mut() {
                Some(decoder) => decoder,
                None => return Ok(0),
            };
            let n = decoder.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            if !self.next_member()? {
                debug!(members = self.members, "end of gzip stream");
                self.end_of_stream = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{concat_members, gzip_bytes};
    use flate2::read::GzDecoder as SingleMemberDecoder;

    fn decode_all<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    fn plaintexts(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("member {} line a\nmember {} line b\n", i, i))
            .collect()
    }

    #[test]
    fn test_round_trip_one_two_five_members() {
        for n in [1, 2, 5] {
            let texts = plaintexts(n);
            let data = concat_members(&texts);
            let mut reader = MultiMemberGzReader::new(data.as_slice());
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), texts.concat());
            assert_eq!(reader.members(), n);
            assert!(reader.is_end_of_stream());
        }
    }

    #[test]
    fn test_single_member_decoder_truncates() {
        let texts = plaintexts(5);
        let data = concat_members(&texts);
        let out = decode_all(SingleMemberDecoder::new(data.as_slice())).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), texts[0]);
    }

    #[test]
    fn test_tiny_pushback_and_read_buffers() {
        let texts = plaintexts(3);
        let data = concat_members(&texts);
        let mut reader = MultiMemberGzReader::with_pushback_capacity(data.as_slice(), 1);
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(String::from_utf8(out).unwrap(), texts.concat());
    }

    #[test]
    fn test_empty_member_in_the_middle() {
        let data = concat_members(&["first\n", "", "third\n"]);
        let out = decode_all(MultiMemberGzReader::new(data.as_slice())).unwrap();
        assert_eq!(out, b"first\nthird\n");
    }

    #[test]
    fn test_end_of_stream_is_sticky() {
        let data = gzip_bytes(b"only\n");
        let mut reader = MultiMemberGzReader::new(data.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_trailing_garbage_is_an_error() {
        let mut data = gzip_bytes(b"good\n");
        data.extend_from_slice(b"not a gzip header at all");
        assert!(decode_all(MultiMemberGzReader::new(data.as_slice())).is_err());
    }

    #[test]
    fn test_truncated_member_is_an_error() {
        let data = concat_members(&["first\n", "second member here\n"]);
        let truncated = &data[..data.len() - 4];
        assert!(decode_all(MultiMemberGzReader::new(truncated)).is_err());
    }

    #[test]
    fn test_is_gzip_path() {
        assert!(is_gzip_path("logs/access.log.gz"));
        assert!(is_gzip_path("ARCHIVE.GZ"));
        assert!(!is_gzip_path("access.log"));
        assert!(!is_gzip_path("access.gzip"));
    }
}
