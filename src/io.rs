// io.rs

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::charset::{DecodingReader, TextEncoding};
use crate::error::{GzLinesError, Result};
use crate::gzip::{is_gzip_path, MultiMemberGzReader, DEFAULT_PUSHBACK_CAPACITY, GZIP_MAGIC};
use crate::line_reader::{LineRead, LineReader, DEFAULT_BUFFER_CAPACITY};
use crate::threaded::{ThreadedLineReader, DEFAULT_QUEUE_CAPACITY};

const DEFAULT_WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// How to decide whether an input is gzip-compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputCompression {
    /// Gzip when the file name ends in `.gz`.
    #[default]
    Auto,
    /// Gzip when the first two bytes are the gzip magic number.
    Sniff,
    Gzip,
    Plain,
}

/// Settings for building a line reader over a byte stream.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Characters held by the line reader's buffer.
    pub buffer_capacity: usize,
    pub encoding: TextEncoding,
    /// Bytes held by the gzip pushback buffer.
    pub pushback_capacity: usize,
    /// Read lines on a background thread.
    pub background: bool,
    /// Entries in the background reader's hand-off queue.
    pub queue_capacity: usize,
    pub compression: InputCompression,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            encoding: TextEncoding::default(),
            pushback_capacity: DEFAULT_PUSHBACK_CAPACITY,
            background: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            compression: InputCompression::default(),
        }
    }
}

impl ReaderOptions {
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("buffer_capacity", self.buffer_capacity),
            ("pushback_capacity", self.pushback_capacity),
            ("queue_capacity", self.queue_capacity),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(GzLinesError::InvalidArgument(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReaderOptionsBuilder {
    options: ReaderOptions,
}

impl ReaderOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.buffer_capacity = capacity;
        self
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn pushback_capacity(mut self, capacity: usize) -> Self {
        self.options.pushback_capacity = capacity;
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.options.background = background;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.options.queue_capacity = capacity;
        self
    }

    pub fn compression(mut self, compression: InputCompression) -> Self {
        self.options.compression = compression;
        self
    }

    pub fn build(self) -> Result<ReaderOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

pub struct InputStream {
    filepath: PathBuf,
    options: ReaderOptions,
}

impl InputStream {
    pub fn new(filepath: &Path) -> Self {
        Self {
            filepath: filepath.into(),
            options: ReaderOptions::default(),
        }
    }

    pub fn options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.filepath
    }

    fn is_gzipped(file: &mut File) -> Result<bool> {
        let mut header = Vec::with_capacity(GZIP_MAGIC.len());
        // Read up to the first two bytes
        Read::by_ref(file)
            .take(GZIP_MAGIC.len() as u64)
            .read_to_end(&mut header)?;
        // Reset the file pointer
        file.rewind()?;
        Ok(header == GZIP_MAGIC)
    }

    fn is_compressed(&self, file: &mut File) -> Result<bool> {
        match self.options.compression {
            InputCompression::Auto => Ok(is_gzip_path(&self.filepath)),
            InputCompression::Sniff => Self::is_gzipped(file),
            InputCompression::Gzip => Ok(true),
            InputCompression::Plain => Ok(false),
        }
    }

    /// Open the file and build its line reader.
    pub fn open(&self) -> Result<Box<dyn LineRead + Send>> {
        let mut file = File::open(&self.filepath)?;
        let compressed = self.is_compressed(&mut file)?;
        debug!(
            path = %self.filepath.display(),
            compressed,
            background = self.options.background,
            "opening input"
        );
        Self::from_reader(file, compressed, &self.options)
    }

    /// Build the reader stack over `reader`: optional multi-member gzip
    /// decoding, text decoding, line buffering, and optionally a background
    /// thread.
    pub fn from_reader<R>(
        reader: R,
        compressed: bool,
        options: &ReaderOptions,
    ) -> Result<Box<dyn LineRead + Send>>
    where
        R: Read + Send + 'static,
    {
        options.validate()?;
        let bytes: Box<dyn Read + Send> = if compressed {
            Box::new(MultiMemberGzReader::with_pushback_capacity(
                reader,
                options.pushback_capacity,
            ))
        } else {
            Box::new(reader)
        };
        let chars = DecodingReader::new(bytes, options.encoding);
        let lines = LineReader::with_capacity(chars, options.buffer_capacity)?;
        if options.background {
            Ok(Box::new(ThreadedLineReader::spawn(
                lines,
                options.queue_capacity,
            )?))
        } else {
            Ok(Box::new(lines))
        }
    }

    /// Read the whole input and return its line count.
    pub fn count_lines(&self) -> Result<u64> {
        let mut reader = self.open()?;
        while reader.read_line()?.is_some() {}
        let lines = reader.line_number();
        reader.close();
        Ok(lines)
    }
}

#[derive(Clone)]
pub struct OutputStreamBuilder {
    filepath: Option<PathBuf>,
    buffer_size: usize,
    compression_level: Compression,
    append: bool,
}

impl Default for OutputStreamBuilder {
    fn default() -> Self {
        Self {
            filepath: None,
            buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            compression_level: Compression::default(),
            append: false,
        }
    }
}

impl OutputStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filepath(mut self, path: Option<impl AsRef<Path>>) -> Self {
        self.filepath = path.map(|p| p.as_ref().to_path_buf());
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn compression_level(mut self, level: Option<Compression>) -> Self {
        if let Some(level) = level {
            self.compression_level = level;
        } else {
            self.compression_level = Compression::best();
        }
        self
    }

    /// Append to an existing file instead of truncating it. For `.gz` paths
    /// each writer adds one new gzip member.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn build(self) -> OutputStream {
        OutputStream {
            filepath: self.filepath,
            buffer_size: self.buffer_size,
            compression_level: self.compression_level,
            append: self.append,
        }
    }
}

pub struct OutputStream {
    filepath: Option<PathBuf>,
    buffer_size: usize,
    compression_level: Compression,
    append: bool,
}

impl OutputStream {
    pub fn new(filepath: Option<impl AsRef<Path>>) -> Self {
        OutputStreamBuilder::new().filepath(filepath).build()
    }

    pub fn builder() -> OutputStreamBuilder {
        OutputStreamBuilder::new()
    }

    fn should_compress(&self) -> bool {
        self.filepath.as_ref().map_or(false, |p| is_gzip_path(p))
    }

    fn open_file(&self, path: &Path) -> io::Result<File> {
        if self.append {
            OpenOptions::new().create(true).append(true).open(path)
        } else {
            File::create(path)
        }
    }

    /// Open the output. For gzip paths, [`OutputWriter::finish`] completes
    /// the member.
    pub fn writer(&self) -> io::Result<OutputWriter> {
        match &self.filepath {
            Some(path) => {
                let file = self.open_file(path)?;
                debug!(
                    path = %path.display(),
                    append = self.append,
                    compress = self.should_compress(),
                    "opening output"
                );
                let writer = if self.should_compress() {
                    OutputWriter::Gzip(BufWriter::with_capacity(
                        self.buffer_size,
                        GzEncoder::new(file, self.compression_level),
                    ))
                } else {
                    OutputWriter::Plain(BufWriter::with_capacity(self.buffer_size, file))
                };
                Ok(writer)
            }
            None => Ok(OutputWriter::Stdout(BufWriter::with_capacity(
                self.buffer_size,
                io::stdout(),
            ))),
        }
    }
}

/// A writer opened by [`OutputStream`].
///
/// Dropping a gzip writer still writes the trailer but loses any error from
/// doing so; call [`finish`](OutputWriter::finish) instead.
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(BufWriter<GzEncoder<File>>),
    Stdout(BufWriter<io::Stdout>),
}

impl OutputWriter {
    /// Flush buffered output and, for gzip, write the member trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|e| e.into_error())?;
                encoder.finish()?;
                Ok(())
            }
            OutputWriter::Stdout(mut writer) => writer.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(writer) => writer.write(buf),
            OutputWriter::Stdout(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(writer) => writer.flush(),
            OutputWriter::Stdout(writer) => writer.flush(),
        }
    }
}
