// line_reader.rs

use std::fmt;
use std::io;
use tracing::trace;

use crate::charset::CharRead;
use crate::error::{GzLinesError, Result};

pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Initial capacity of the accumulator used when a line spans refills.
const EXPECTED_LINE_LENGTH: usize = 400;

/// Line- and character-oriented reading with a running line count.
///
/// Implemented by [`LineReader`] and by
/// [`ThreadedLineReader`](crate::threaded::ThreadedLineReader), which supports
/// only `read_line`, `line_number`, `close` and `is_closed`; the character
/// primitives fail with [`GzLinesError::Unsupported`] there.
pub trait LineRead {
    /// Next line without its `\n` or `\r\n` terminator, or `None` at end of
    /// stream. A final unterminated line is returned once.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Lines delivered so far.
    fn line_number(&self) -> u64;

    fn read_char(&mut self) -> Result<Option<char>>;

    /// Fill as much of `buf` as is available without blocking past the first
    /// successful read. `Ok(0)` for a non-empty `buf` means end of stream.
    fn read_into(&mut self, buf: &mut [char]) -> Result<usize>;

    /// Skip up to `n` characters, returning how many were skipped.
    fn skip(&mut self, n: u64) -> Result<u64>;

    fn ready(&mut self) -> Result<bool>;

    fn mark(&mut self, read_ahead_limit: usize) -> Result<()>;

    fn reset(&mut self) -> Result<()>;

    /// Release the underlying stream. Calling it again does nothing.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    /// Iterate over the remaining lines, stopping after the first error.
    fn lines(&mut self) -> Lines<'_, Self>
    where
        Self: Sized,
    {
        Lines {
            reader: self,
            done: false,
        }
    }
}

impl<T: LineRead + ?Sized> LineRead for Box<T> {
    fn read_line(&mut self) -> Result<Option<String>> {
        (**self).read_line()
    }

    fn line_number(&self) -> u64 {
        (**self).line_number()
    }

    fn read_char(&mut self) -> Result<Option<char>> {
        (**self).read_char()
    }

    fn read_into(&mut self, buf: &mut [char]) -> Result<usize> {
        (**self).read_into(buf)
    }

    fn skip(&mut self, n: u64) -> Result<u64> {
        (**self).skip(n)
    }

    fn ready(&mut self) -> Result<bool> {
        (**self).ready()
    }

    fn mark(&mut self, read_ahead_limit: usize) -> Result<()> {
        (**self).mark(read_ahead_limit)
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// Iterator returned by [`LineRead::lines`].
pub struct Lines<'a, L: ?Sized> {
    reader: &'a mut L,
    done: bool,
}

impl<L: LineRead + ?Sized> Iterator for Lines<'_, L> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    limit: usize,
    line_number: u64,
}

/// Buffered character reader that splits lines on `\n` and `\r\n` and counts
/// the lines it hands out.
///
/// `buf[pos..len]` holds the characters not yet delivered; `pos == len`
/// means the next read must refill from the source. A bare `\r` is ordinary
/// content. Not for concurrent use: every method takes `&mut self`.
pub struct LineReader<S: CharRead> {
    /// `None` once closed.
    inner: Option<S>,
    buf: Vec<char>,
    len: usize,
    pos: usize,
    line_number: u64,
    mark: Option<Mark>,
}

impl<S: CharRead> fmt::Debug for LineReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("capacity", &self.buf.len())
            .field("buffered", &(self.len - self.pos))
            .field("line_number", &self.line_number)
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

fn count_newlines(chars: &[char]) -> u64 {
    chars.iter().filter(|&&c| c == '\n').count() as u64
}

fn read_retrying<S: CharRead + ?Sized>(source: &mut S, dst: &mut [char]) -> io::Result<usize> {
    loop {
        match source.read_chars(dst) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

impl<S: CharRead> LineReader<S> {
    pub fn new(source: S) -> Self {
        Self::build(source, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(source: S, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(GzLinesError::InvalidArgument(
                "line reader buffer capacity must be greater than zero".into(),
            ));
        }
        Ok(Self::build(source, capacity))
    }

    fn build(source: S, capacity: usize) -> Self {
        Self {
            inner: Some(source),
            buf: vec!['\0'; capacity],
            len: 0,
            pos: 0,
            line_number: 0,
            mark: None,
        }
    }

    /// The wrapped source, unless closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// Unwrap the source, discarding buffered characters. `None` once closed.
    pub fn into_inner(self) -> Option<S> {
        self.inner
    }

    fn ensure_open(&self) -> Result<()> {
        match self.inner {
            Some(_) => Ok(()),
            None => Err(GzLinesError::StreamClosed),
        }
    }

    /// Refill the buffer. Only called once `pos == len`. A live mark keeps
    /// its characters, moved to the front of the buffer.
    fn fill(&mut self) -> Result<usize> {
        let mut dst = 0;
        if let Some(mark) = self.mark.as_mut() {
            let delta = self.pos - mark.pos;
            if delta >= mark.limit {
                self.mark = None;
            } else {
                if mark.limit > self.buf.len() {
                    self.buf.resize(mark.limit, '\0');
                }
                self.buf.copy_within(mark.pos..self.len, 0);
                mark.pos = 0;
                dst = delta;
            }
        }
        self.pos = dst;
        self.len = dst;

        let source = self.inner.as_mut().ok_or(GzLinesError::StreamClosed)?;
        let n = read_retrying(source, &mut self.buf[dst..])?;
        self.len += n;
        Ok(n)
    }

    /// One buffered read into `dst`.
    fn read1(&mut self, dst: &mut [char]) -> Result<usize> {
        if self.pos >= self.len {
            if dst.len() >= self.buf.len() && self.mark.is_none() {
                // Larger than the buffer: skip the copy.
                let source = self.inner.as_mut().ok_or(GzLinesError::StreamClosed)?;
                return Ok(read_retrying(source, dst)?);
            }
            if self.fill()? == 0 {
                return Ok(0);
            }
        }
        let n = dst.len().min(self.len - self.pos);
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl<S: CharRead> LineRead for LineReader<S> {
    fn read_line(&mut self) -> Result<Option<String>> {
        self.ensure_open()?;
        let mut partial: Option<String> = None;
        loop {
            if self.pos >= self.len && self.fill()? == 0 {
                if partial.is_some() {
                    self.line_number += 1;
                }
                return Ok(partial);
            }

            let start = self.pos;
            match self.buf[start..self.len].iter().position(|&c| c == '\n') {
                Some(offset) => {
                    let end = start + offset;
                    self.pos = end + 1;
                    self.line_number += 1;
                    let mut line = partial.unwrap_or_else(|| String::with_capacity(end - start));
                    line.extend(&self.buf[start..end]);
                    if line.ends_with('\r') {
                        line.pop();
                    }
                    return Ok(Some(line));
                }
                None => {
                    partial
                        .get_or_insert_with(|| String::with_capacity(EXPECTED_LINE_LENGTH))
                        .extend(&self.buf[start..self.len]);
                    self.pos = self.len;
                }
            }
        }
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn read_char(&mut self) -> Result<Option<char>> {
        self.ensure_open()?;
        if self.pos >= self.len && self.fill()? == 0 {
            return Ok(None);
        }
        let c = self.buf[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line_number += 1;
        }
        Ok(Some(c))
    }

    fn read_into(&mut self, buf: &mut [char]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let mut n = self.read1(buf)?;
        if n > 0 {
            while n < buf.len() && self.ready()? {
                let more = self.read1(&mut buf[n..])?;
                if more == 0 {
                    break;
                }
                n += more;
            }
        }
        self.line_number += count_newlines(&buf[..n]);
        Ok(n)
    }

    fn skip(&mut self, n: u64) -> Result<u64> {
        self.ensure_open()?;
        let mut remaining = n;
        while remaining > 0 {
            if self.pos >= self.len && self.fill()? == 0 {
                break;
            }
            let step = ((self.len - self.pos) as u64).min(remaining) as usize;
            self.line_number += count_newlines(&self.buf[self.pos..self.pos + step]);
            self.pos += step;
            remaining -= step as u64;
        }
        Ok(n - remaining)
    }

    fn ready(&mut self) -> Result<bool> {
        let source = self.inner.as_mut().ok_or(GzLinesError::StreamClosed)?;
        Ok(self.pos < self.len || source.ready()?)
    }

    fn mark(&mut self, read_ahead_limit: usize) -> Result<()> {
        self.ensure_open()?;
        if read_ahead_limit == 0 {
            return Err(GzLinesError::InvalidArgument(
                "read-ahead limit must be greater than zero".into(),
            ));
        }
        self.mark = Some(Mark {
            pos: self.pos,
            limit: read_ahead_limit,
            line_number: self.line_number,
        });
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mark = self.mark.ok_or(GzLinesError::InvalidMark)?;
        self.pos = mark.pos;
        self.line_number = mark.line_number;
        Ok(())
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            trace!(lines = self.line_number, "line reader closed");
        }
        self.buf = Vec::new();
        self.len = 0;
        self.pos = 0;
        self.mark = None;
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}
