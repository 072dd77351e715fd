//! In-memory sample sink.

use std::sync::Mutex;

use async_trait::async_trait;

use netsdr_core::{Result, SampleSink};

/// Collects written samples in memory for later assertion.
pub struct MemorySink {
    samples: Mutex<Vec<i32>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink {
            samples: Mutex::new(Vec::new()),
        }
    }

    /// Every sample written so far, in order.
    pub fn samples(&self) -> Vec<i32> {
        self.samples.lock().unwrap().clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSink for MemorySink {
    async fn write_samples(&self, samples: &[i32]) -> Result<()> {
        self.samples.lock().unwrap().extend_from_slice(samples);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accumulates_in_order() {
        let sink = MemorySink::new();
        sink.write_samples(&[1, 2]).await.unwrap();
        sink.write_samples(&[3]).await.unwrap();
        assert_eq!(sink.samples(), vec![1, 2, 3]);
    }
}
