pub mod charset;
pub mod error;
pub mod gzip;
pub mod io;
pub mod line_reader;
pub mod threaded;

pub use charset::{CharRead, DecodingReader, TextEncoding};
pub use error::{GzLinesError, Result};
pub use gzip::{is_gzip_path, MultiMemberGzReader};
pub use io::{InputCompression, InputStream, OutputStream, OutputWriter, ReaderOptions};
pub use line_reader::{LineRead, LineReader, Lines};
pub use threaded::ThreadedLineReader;

#[cfg(test)]
pub(crate) mod test_utils;
