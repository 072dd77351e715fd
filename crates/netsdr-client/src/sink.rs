//! Sample sinks.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use netsdr_core::{Result, SampleSink};

/// Appends decoded samples to a file as 16-bit little-endian words.
///
/// Each sample's low 16 bits are written; the stream carries 16-bit IQ
/// data, so the upper bits are always zero by the time samples reach the
/// sink. The resulting file is raw interleaved PCM, playable with any
/// tool that accepts s16le.
pub struct FileSampleSink {
    file: Mutex<File>,
}

impl FileSampleSink {
    /// Open (or create) `path` for appending.
    pub async fn create(path: impl AsRef<Path>) -> Result<FileSampleSink> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(FileSampleSink { file: Mutex::new(file) })
    }
}

#[async_trait]
impl SampleSink for FileSampleSink {
    async fn write_samples(&self, samples: &[i32]) -> Result<()> {
        let mut buf = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            buf.extend_from_slice(&(sample as i16).to_le_bytes());
        }

        let mut file = self.file.lock().await;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_low_sixteen_bits_le() {
        let dir = std::env::temp_dir().join(format!("netsdr-sink-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("samples.bin");
        let _ = tokio::fs::remove_file(&path).await;

        let sink = FileSampleSink::create(&path).await.unwrap();
        sink.write_samples(&[1, 2, 0x0001_0003]).await.unwrap();

        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn appends_across_writes() {
        let dir = std::env::temp_dir().join(format!("netsdr-sink-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("append.bin");
        let _ = tokio::fs::remove_file(&path).await;

        let sink = FileSampleSink::create(&path).await.unwrap();
        sink.write_samples(&[1]).await.unwrap();
        sink.write_samples(&[2]).await.unwrap();

        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x02, 0x00]);

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
