//! Microphone forwarding while the live session is active

use lia_agent::AssistantSession;
use lia_pipeline::AudioInput;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Stream microphone chunks into the live session until it ends
///
/// The live session already holds the device lease, so the stream is opened
/// directly on the input rather than through the capture service.
pub fn spawn_live_audio(session: Arc<AssistantSession>, input: Arc<dyn AudioInput>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = match input.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(input = input.name(), error = %e, "Live session has no microphone");
                return;
            },
        };

        let mut live = session.subscribe_live_active();
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        let mut sent = 0usize;

        while *live.borrow_and_update() {
            tokio::select! {
                _ = ticker.tick() => {},
                changed = live.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                },
            }

            loop {
                match stream.try_next_chunk() {
                    Ok(Some(chunk)) => {
                        if session.send_live_audio(&chunk).await {
                            sent += chunk.len();
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Microphone stream failed");
                        stream.release();
                        return;
                    },
                }
            }
        }

        stream.release();
        tracing::debug!(bytes = sent, "Live microphone forwarding stopped");
    })
}
