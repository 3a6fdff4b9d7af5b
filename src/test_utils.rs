// test_utils.rs

#[cfg(test)]
pub mod test_utils {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::env;
    use std::io::{self, Read, Write};
    use std::path::{Path, PathBuf};
    use tempfile;

    pub struct TestDir {
        dir: PathBuf,
        #[allow(dead_code)] // held only so the directory outlives the test
        temp_dir: Option<tempfile::TempDir>,
    }

    impl TestDir {
        pub fn new(prefix: &str) -> std::io::Result<Self> {
            let keep_output = env::var("KEEP_TEST_OUTPUT").is_ok();
            if keep_output {
                let output_dir = env::current_dir()?.join("test_output").join(prefix);
                std::fs::create_dir_all(&output_dir)?;
                Ok(TestDir {
                    dir: output_dir,
                    temp_dir: None,
                })
            } else {
                let temp_dir = tempfile::tempdir()?;
                let dir = temp_dir.path().to_path_buf();
                Ok(TestDir {
                    dir,
                    temp_dir: Some(temp_dir),
                })
            }
        }

        pub fn path(&self) -> &Path {
            &self.dir
        }
    }

    /// Compress `data` as one complete gzip member.
    pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Compress each text as its own member and concatenate the members.
    pub fn concat_members<S: AsRef<[u8]>>(texts: &[S]) -> Vec<u8> {
        texts
            .iter()
            .flat_map(|t| gzip_bytes(t.as_ref()))
            .collect()
    }

    /// Yields its data, then fails every read after that.
    pub struct FailAfter {
        data: io::Cursor<Vec<u8>>,
    }

    impl FailAfter {
        pub fn new(data: impl Into<Vec<u8>>) -> Self {
            Self {
                data: io::Cursor::new(data.into()),
            }
        }
    }

    impl Read for FailAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 if !buf.is_empty() => Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "simulated disk failure",
                )),
                n => Ok(n),
            }
        }
    }
}
