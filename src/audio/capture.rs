use super::format::AudioFormat;
use crate::error::RecordingError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};

/// Seconds of audio the ring buffer can hold before capture data is lost.
const RING_SECONDS: f32 = 30.0;

/// Size of the chunks forwarded to the sink, in seconds.
const CHUNK_SECONDS: f32 = 0.25;

pub struct AudioCapture;

impl AudioCapture {
    /// Start capturing from the default input device.
    ///
    /// The returned stream must be kept alive for capture to continue;
    /// dropping it stops the device callback. Chunks are delivered through
    /// `chunk_tx`. Must be called on a `LocalSet` (the bridge task is
    /// `spawn_local` and the stream itself is `!Send`).
    pub fn start(
        format: AudioFormat,
        chunk_tx: mpsc::Sender<Vec<f32>>,
    ) -> Result<cpal::Stream, RecordingError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(RecordingError::NoDevice)?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(format.samples_for_duration(RING_SECONDS));
        let (mut producer, consumer) = ring.split();

        let notify = Arc::new(Notify::new());
        let notify_callback = notify.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    notify_callback.notify_one();
                },
                |err| {
                    tracing::error!("input stream error: {err}");
                },
                None,
            )
            .map_err(|e| RecordingError::Capture(e.to_string()))?;

        stream
            .play()
            .map_err(|e| RecordingError::Capture(e.to_string()))?;

        let chunk_size = format.samples_for_duration(CHUNK_SECONDS);
        tokio::task::spawn_local(Self::pump(consumer, chunk_tx, chunk_size, notify));

        tracing::info!("audio capture started");
        Ok(stream)
    }

    /// Moves samples from the device ring buffer into sink-sized chunks.
    /// Exits when the receiving side of `tx` goes away.
    async fn pump(
        mut consumer: impl Consumer<Item = f32>,
        tx: mpsc::Sender<Vec<f32>>,
        chunk_size: usize,
        notify: Arc<Notify>,
    ) {
        loop {
            notify.notified().await;

            while consumer.occupied_len() >= chunk_size {
                let mut chunk = vec![0.0f32; chunk_size];
                let n = consumer.pop_slice(&mut chunk);
                chunk.truncate(n);

                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        }
    }
}
