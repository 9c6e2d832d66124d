//! Application entry point — SpeakType.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (missing or invalid config is fatal).
//! 3. Create the tokio runtime (multi-thread, 2 workers).
//! 4. Build the Whisper transcriber, the Ollama improver, and the result
//!    sink from config.
//! 5. Spawn the pipeline controller on the runtime.
//! 6. Read commands from stdin and forward them to the controller until
//!    `quit` or end of input.

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;

use speaktype::{
    audio::AudioCapture,
    config::AppConfig,
    deliver::{ClipboardWriter, LogNotifier, ResultSink, SystemClipboard},
    improve::{OllamaImprover, TextImprover},
    pipeline::{ControllerCommand, PipelineController},
    stt::{ModelPaths, SpeechToText, WhisperTranscriber},
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("SpeakType starting up");

    // 2. Configuration — fatal when missing or invalid, so a typo in
    //    settings.toml never silently runs with defaults.
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // 3. Tokio runtime (2 workers — processing task + improver HTTP)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Pipeline components
    let model_size = config.model_size()?;
    let model_paths = ModelPaths::from_app_paths(&speaktype::config::AppPaths::new());
    let model_path = model_paths.model_path(model_size);
    if !model_paths.is_available(model_size) {
        log::warn!(
            "Whisper model {} not found; download {} (~{} MB) from {} into {}",
            model_size,
            model_size.file_name(),
            model_size.file_size_mb(),
            model_size.source_url(),
            model_paths.models_dir.display()
        );
    }
    let use_gpu = config.whisper.device == "gpu";
    let stt: Arc<dyn SpeechToText> = Arc::new(WhisperTranscriber::new(model_path, use_gpu));

    let improver: Arc<dyn TextImprover> = Arc::new(OllamaImprover::from_config(&config.ollama)?);
    {
        let improver = improver.clone();
        rt.spawn(async move {
            if !improver.is_available().await {
                log::warn!("Ollama is unreachable; transcripts will be delivered unimproved");
            }
        });
    }

    let clipboard = SystemClipboard::new();
    if !clipboard.is_available() {
        log::warn!("Clipboard is unavailable; deliveries will fail until it comes back");
    }
    let sink = Arc::new(ResultSink::new(
        Arc::new(clipboard),
        Arc::new(LogNotifier::new()),
        config.clipboard.clone(),
    ));

    let capture = AudioCapture::new(config.audio.clone());
    let language = config.whisper.language.clone();

    let controller =
        PipelineController::new(Box::new(capture), stt, improver, sink, language);

    // 5. Spawn the controller
    let (command_tx, command_rx) = mpsc::channel::<ControllerCommand>(16);
    let controller_task = rt.spawn(controller.run(command_rx));

    // 6. stdin command loop
    println!("Commands: start | stop | copy | quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match line.trim() {
            "" => continue,
            "start" => ControllerCommand::StartRecording,
            "stop" => ControllerCommand::StopRecording,
            "copy" => ControllerCommand::CopyLast,
            "quit" | "exit" => ControllerCommand::Quit,
            other => {
                println!("Unknown command {other:?}; expected start, stop, copy or quit");
                continue;
            }
        };
        let is_quit = command == ControllerCommand::Quit;
        if rt.block_on(command_tx.send(command)).is_err() {
            log::warn!("Pipeline stopped; exiting");
            break;
        }
        if is_quit {
            break;
        }
    }
    drop(command_tx);

    // Dropping the channel makes run() shut down even without a quit command.
    rt.block_on(controller_task)?;
    log::info!("SpeakType shut down");
    Ok(())
}
