//! Pipeline controller: command handling and the record/transcribe/improve/
//! deliver cycle.
//!
//! The controller is single-threaded over its command channel.  Capture
//! start/stop happen inline in the command handler; the transcribe and
//! improve stages run in a spawned processing task so the controller stays
//! responsive.  The shared state cell is moved to `Processing` before the
//! task is spawned, which makes start-while-processing rejection immediate
//! rather than racy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::CaptureDevice;
use crate::deliver::{DeliveryError, ResultSink};
use crate::improve::TextImprover;
use crate::pipeline::state::{PipelineState, SharedState};
use crate::stt::SpeechToText;

/// How long `quit` waits for an in-flight processing task before aborting it.
const QUIT_GRACE: Duration = Duration::from_secs(5);

/// Commands accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Begin capturing microphone audio.
    StartRecording,
    /// Stop capturing and process the recording.
    StopRecording,
    /// Copy the most recent result to the clipboard again.
    CopyLast,
    /// Shut the pipeline down.
    Quit,
}

/// Owns the capture device and drives recordings through transcription,
/// improvement, and delivery.
pub struct PipelineController {
    capture: Box<dyn CaptureDevice>,
    stt: Arc<dyn SpeechToText>,
    improver: Arc<dyn TextImprover>,
    sink: Arc<ResultSink>,
    state: SharedState,
    language: Option<String>,
    processing: Option<JoinHandle<()>>,
}

impl PipelineController {
    pub fn new(
        capture: Box<dyn CaptureDevice>,
        stt: Arc<dyn SpeechToText>,
        improver: Arc<dyn TextImprover>,
        sink: Arc<ResultSink>,
        language: Option<String>,
    ) -> Self {
        Self {
            capture,
            stt,
            improver,
            sink,
            state: SharedState::new(),
            language,
            processing: None,
        }
    }

    /// Current pipeline state.
    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    /// Live input level in `[0.0, 1.0]`; `0.0` outside a recording.
    pub fn level(&self) -> f32 {
        self.capture.current_level()
    }

    /// Elapsed recording time; zero outside a recording.
    pub fn duration(&self) -> Duration {
        self.capture.duration()
    }

    /// Consume commands until the channel closes or `Quit` arrives.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControllerCommand>) {
        while let Some(command) = commands.recv().await {
            log::debug!("pipeline: command {command:?} in state {}", self.state.get());
            match command {
                ControllerCommand::StartRecording => self.handle_start(),
                ControllerCommand::StopRecording => self.handle_stop(),
                ControllerCommand::CopyLast => self.handle_copy_last(),
                ControllerCommand::Quit => {
                    self.handle_quit().await;
                    return;
                }
            }
        }
        // Channel closed without an explicit quit; shut down anyway.
        self.handle_quit().await;
    }

    /// `StartRecording`: only valid from `Idle`.
    fn handle_start(&mut self) {
        match self.state.get() {
            PipelineState::Recording => {
                log::warn!("pipeline: already recording, start ignored");
                return;
            }
            PipelineState::Processing => {
                log::warn!("pipeline: still processing, start ignored");
                return;
            }
            PipelineState::Idle => {}
        }

        match self.capture.start() {
            Ok(()) => {
                log::info!("pipeline: recording started");
                self.state.set(PipelineState::Recording);
            }
            Err(e) => {
                log::error!("pipeline: could not start recording: {e}");
                self.sink.report_failure(format!("Recording failed: {e}"));
            }
        }
    }

    /// `StopRecording`: only valid from `Recording`.  Transitions to
    /// `Processing` and spawns the transcribe/improve/deliver task.
    fn handle_stop(&mut self) {
        if self.state.get() != PipelineState::Recording {
            log::warn!("pipeline: not recording, stop ignored");
            return;
        }

        let buffer = match self.capture.stop() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::error!("pipeline: could not stop recording: {e}");
                self.sink.report_failure(format!("Recording failed: {e}"));
                self.state.set(PipelineState::Idle);
                return;
            }
        };

        log::info!(
            "pipeline: recording stopped, {:.1} s captured",
            buffer.duration_secs()
        );
        self.state.set(PipelineState::Processing);

        let stt = self.stt.clone();
        let improver = self.improver.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        let language = self.language.clone();
        let samples = buffer.into_samples();

        self.processing = Some(tokio::spawn(async move {
            process_recording(samples, language, stt, improver, sink).await;
            state.set(PipelineState::Idle);
        }));
    }

    /// `CopyLast`: re-copy the previous result, valid in any state.
    fn handle_copy_last(&mut self) {
        match self.sink.redeliver_last() {
            Ok(()) => log::info!("pipeline: last result re-copied"),
            Err(DeliveryError::NothingToDeliver) => {
                log::warn!("pipeline: nothing to copy yet");
                self.sink.report_failure("No transcription to copy yet");
            }
            // The sink already sent an error notification.
            Err(e) => log::error!("pipeline: re-copy failed: {e}"),
        }
    }

    /// `Quit`: release the microphone, give an in-flight processing task a
    /// grace period, then free model memory.
    async fn handle_quit(&mut self) {
        log::info!("pipeline: shutting down");

        if self.state.get() == PipelineState::Recording {
            if let Err(e) = self.capture.stop() {
                log::warn!("pipeline: capture stop during shutdown failed: {e}");
            }
        }

        if let Some(handle) = self.processing.take() {
            if !handle.is_finished() {
                log::info!("pipeline: waiting for processing to finish");
            }
            let abort = handle.abort_handle();
            match tokio::time::timeout(QUIT_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("pipeline: processing task panicked: {e}"),
                Err(_) => {
                    log::warn!("pipeline: processing did not finish in time, aborting");
                    abort.abort();
                }
            }
        }

        self.stt.unload();
        self.state.set(PipelineState::Idle);
    }

    /// Wait for the in-flight processing task, if any.  Used by tests and
    /// by callers that need a completed cycle before inspecting results.
    pub async fn join_processing(&mut self) {
        if let Some(handle) = self.processing.take() {
            if let Err(e) = handle.await {
                log::error!("pipeline: processing task panicked: {e}");
            }
        }
    }
}

/// The processing stage: transcribe, improve, deliver.  Sends exactly one
/// notification per run through the sink.
async fn process_recording(
    samples: Vec<f32>,
    language: Option<String>,
    stt: Arc<dyn SpeechToText>,
    improver: Arc<dyn TextImprover>,
    sink: Arc<ResultSink>,
) {
    let transcript = {
        let stt = stt.clone();
        let task = tokio::task::spawn_blocking(move || {
            stt.transcribe(&samples, language.as_deref())
        });
        match task.await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                log::error!("pipeline: transcription failed: {e}");
                sink.report_failure(format!("Transcription failed: {e}"));
                return;
            }
            Err(e) => {
                log::error!("pipeline: transcription task panicked: {e}");
                sink.report_failure("Transcription failed unexpectedly");
                return;
            }
        }
    };

    if transcript.trim().is_empty() {
        log::info!("pipeline: transcript empty, nothing to deliver");
        sink.report_failure("No speech detected");
        return;
    }

    let result = improver.improve(&transcript).await;

    // Clipboard I/O blocks on some platforms.
    let delivery = tokio::task::spawn_blocking(move || sink.deliver(result)).await;
    match delivery {
        Ok(Ok(())) => {}
        // The sink already sent an error notification for clipboard
        // failures; EmptyText cannot occur past the guard above.
        Ok(Err(e)) => log::error!("pipeline: delivery failed: {e}"),
        Err(e) => log::error!("pipeline: delivery task panicked: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
