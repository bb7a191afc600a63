use super::format::AudioFormat;
use super::sink::AudioSink;
use crate::error::RecordingError;
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

enum WavCommand {
    WriteChunk(Vec<f32>),
    Finalize {
        reply: oneshot::Sender<Result<(), RecordingError>>,
    },
}

/// WAV encoder backed by a dedicated blocking thread.
///
/// Creating the sink creates the destination file immediately, so the catalog
/// entry exists before any audio bytes arrive. All file I/O happens on the
/// encoder thread; chunks are forwarded over a channel and written in order.
#[derive(Debug)]
pub struct WavSink {
    tx: mpsc::UnboundedSender<WavCommand>,
}

impl WavSink {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self, RecordingError> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec).map_err(|e| match e {
            hound::Error::IoError(source) => RecordingError::Destination {
                path: path.to_path_buf(),
                source,
            },
            other => RecordingError::Encode(other.to_string()),
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    WavCommand::WriteChunk(samples) => {
                        for sample in samples {
                            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            if let Err(e) = writer.write_sample(amplitude) {
                                tracing::error!("failed to write sample: {e}");
                                return;
                            }
                        }
                    }
                    WavCommand::Finalize { reply } => {
                        let result = writer
                            .finalize()
                            .map_err(|e| RecordingError::Encode(e.to_string()));
                        let _ = reply.send(result);
                        return;
                    }
                }
            }
            // Sender dropped without Finalize: the writer's own Drop patches
            // the header so the file stays readable.
        });

        Ok(Self { tx })
    }
}

#[async_trait]
impl AudioSink for WavSink {
    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<(), RecordingError> {
        self.tx
            .send(WavCommand::WriteChunk(samples))
            .map_err(|_| RecordingError::Encode("encoder thread exited".into()))
    }

    async fn finalize(&mut self) -> Result<(), RecordingError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Finalize { reply })
            .map_err(|_| RecordingError::Encode("encoder thread exited".into()))?;

        rx.await
            .map_err(|_| RecordingError::Encode("encoder thread exited".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finalized_sink_is_a_readable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.wav");

        let mut sink = WavSink::create(&path, AudioFormat::SPEECH).unwrap();
        sink.write_chunk(vec![0.0; 800]).unwrap();
        sink.write_chunk(vec![0.5; 200]).unwrap();
        sink.finalize().await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 1_000);
    }

    #[test]
    fn test_create_in_missing_directory_is_a_destination_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("note.wav");

        let err = WavSink::create(&path, AudioFormat::SPEECH).unwrap_err();
        assert!(matches!(err, RecordingError::Destination { .. }));
    }

    #[test]
    fn test_samples_are_clamped_to_i16_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loud.wav");

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let mut sink = WavSink::create(&path, AudioFormat::SPEECH).unwrap();
            sink.write_chunk(vec![2.0, -2.0]).unwrap();
            sink.finalize().await.unwrap();
        });

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }
}
