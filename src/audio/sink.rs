use crate::error::RecordingError;
use async_trait::async_trait;

/// Streaming destination for captured audio.
///
/// Chunks are written as they arrive during a recording session; `finalize`
/// closes the destination so the file is complete on disk.
#[async_trait]
pub trait AudioSink: Send {
    /// Write a chunk of samples. The Vec is moved to avoid copying.
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<(), RecordingError>;

    /// Finalize and close the sink.
    async fn finalize(&mut self) -> Result<(), RecordingError>;
}
