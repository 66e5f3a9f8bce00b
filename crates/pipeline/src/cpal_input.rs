//! Native microphone through cpal
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread; the
//! capture service only sees a channel of PCM16 chunks. Recordings are sealed
//! as WAV.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;

use crate::input::{AudioInput, InputStream};
use crate::wav::{encode_wav, f32_to_pcm16_le, pcm16_from_le_bytes, WAV_MIME};
use crate::CaptureError;

const CHUNK_QUEUE: usize = 64;

/// Default system microphone
#[derive(Debug, Clone)]
pub struct CpalInput {
    preferred_rate: u32,
    preferred_channels: u16,
}

impl CpalInput {
    pub fn new(config: &lia_config::CaptureConfig) -> Self {
        Self {
            preferred_rate: config.sample_rate,
            preferred_channels: config.channels,
        }
    }

    fn pick_config(&self, device: &cpal::Device) -> Result<cpal::SupportedStreamConfig, CaptureError> {
        let wanted = cpal::SampleRate(self.preferred_rate);
        if let Ok(configs) = device.supported_input_configs() {
            for range in configs {
                if range.channels() == self.preferred_channels
                    && range.min_sample_rate() <= wanted
                    && range.max_sample_rate() >= wanted
                {
                    return Ok(range.with_sample_rate(wanted));
                }
            }
        }
        device
            .default_input_config()
            .map_err(|e| CaptureError::Unavailable(e.to_string()))
    }

    /// Runs on the capture thread until `stop_rx` fires or is dropped
    fn run_device(
        &self,
        chunk_tx: mpsc::SyncSender<Vec<u8>>,
        ready_tx: mpsc::SyncSender<Result<(u32, u16), CaptureError>>,
        stop_rx: mpsc::Receiver<()>,
    ) {
        let host = cpal::default_host();
        let Some(device) = host.default_input_device() else {
            let _ = ready_tx.send(Err(CaptureError::Unavailable(
                "no default input device".to_string(),
            )));
            return;
        };

        let supported = match self.pick_config(&device) {
            Ok(c) => c,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            },
        };
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let format = (config.sample_rate.0, config.channels);

        let err_fn = |err: cpal::StreamError| tracing::error!(error = %err, "Input stream error");
        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = chunk_tx.try_send(f32_to_pcm16_le(data));
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let bytes = data.iter().flat_map(|s| s.to_le_bytes()).collect();
                    let _ = chunk_tx.try_send(bytes);
                },
                err_fn,
                None,
            ),
            other => {
                let _ = ready_tx.send(Err(CaptureError::Unavailable(format!(
                    "unsupported sample format {:?}",
                    other
                ))));
                return;
            },
        };

        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                let _ = ready_tx.send(Err(CaptureError::PermissionDenied(e.to_string())));
                return;
            },
        };
        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
            return;
        }

        let _ = ready_tx.send(Ok(format));
        let _ = stop_rx.recv();
        drop(stream);
        tracing::debug!("Input stream closed");
    }
}

#[async_trait]
impl AudioInput for CpalInput {
    async fn acquire(&self) -> Result<Box<dyn InputStream>, CaptureError> {
        let (chunk_tx, chunk_rx) = mpsc::sync_channel(CHUNK_QUEUE);
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel();

        let input = self.clone();
        std::thread::Builder::new()
            .name("lia-capture".to_string())
            .spawn(move || input.run_device(chunk_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?
            .map_err(|_| CaptureError::Unavailable("capture thread exited".to_string()))?;
        let (sample_rate, channels) = ready?;

        tracing::info!(sample_rate, channels, "Microphone opened");
        Ok(Box::new(CpalStream {
            chunk_rx,
            stop_tx: Some(stop_tx),
            sample_rate,
            channels,
        }))
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

struct CpalStream {
    chunk_rx: mpsc::Receiver<Vec<u8>>,
    stop_tx: Option<mpsc::Sender<()>>,
    sample_rate: u32,
    channels: u16,
}

impl InputStream for CpalStream {
    fn mime_type(&self) -> &str {
        WAV_MIME
    }

    fn try_next_chunk(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        match self.chunk_rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) if self.stop_tx.is_none() => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(CaptureError::Stream("input device disconnected".to_string()))
            },
        }
    }

    fn release(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
    }

    fn seal(&self, chunks: Vec<Vec<u8>>) -> Result<Vec<u8>, CaptureError> {
        let samples = pcm16_from_le_bytes(&chunks.concat());
        encode_wav(&samples, self.sample_rate, self.channels)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.release();
    }
}
