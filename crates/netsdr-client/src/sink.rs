//! Destinations for decoded IQ samples.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only consumer of decoded samples.
pub trait SampleSink: Send + Sync {
    /// Append one sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be stored.
    fn append(&self, sample: i16) -> io::Result<()>;

    /// Append a batch of samples, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`SampleSink::append`].
    fn append_batch(&self, samples: &[i16]) -> io::Result<()> {
        samples.iter().try_for_each(|&s| self.append(s))
    }
}

/// Writes samples to a file as little-endian 16-bit integers, appending to
/// any existing content.
#[derive(Debug)]
pub struct FileSampleSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileSampleSink {
    /// Open (or create) `path` for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Get the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered samples to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SampleSink for FileSampleSink {
    fn append(&self, sample: i16) -> io::Result<()> {
        self.lock().write_all(&sample.to_le_bytes())
    }

    fn append_batch(&self, samples: &[i16]) -> io::Result<()> {
        let mut writer = self.lock();
        for sample in samples {
            writer.write_all(&sample.to_le_bytes())?;
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("netsdr-{}-{}.bin", name, std::process::id()))
    }

    #[test]
    fn test_file_sink_appends() {
        let path = temp_path("append");
        let _ = std::fs::remove_file(&path);

        {
            let sink = FileSampleSink::open(&path).unwrap();
            sink.append_batch(&[1, -1]).unwrap();
        }
        {
            let sink = FileSampleSink::open(&path).unwrap();
            sink.append(0x1234).unwrap();
            sink.flush().unwrap();
        }

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, vec![0x01, 0x00, 0xFF, 0xFF, 0x34, 0x12]);
        std::fs::remove_file(&path).unwrap();
    }
}
