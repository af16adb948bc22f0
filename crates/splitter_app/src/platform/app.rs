use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_error, engine_info};
use splitter_core::{update, AppState, FileSource, Msg, SelectedFile};
use splitter_engine::{ensure_output_dir, EngineHandle};

use super::args::Cli;
use super::config::{self, RunSettings};
use super::driver::{Driver, RunOutcome, Step};
use super::effects::EffectRunner;
use super::ui::render::TerminalRenderer;

const TICK: Duration = Duration::from_millis(250);

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let settings = config::resolve(cli).context("loading configuration")?;
    engine_logging::initialize(settings.log_destination.clone(), settings.log_level);
    engine_info!(
        "Starting splitter: input={:?} base_url={} output_dir={:?}",
        settings.input,
        settings.client.base_url,
        settings.output_dir
    );
    match &settings.config_path {
        Some(path) => engine_info!("Loaded config from {:?}", path),
        None => engine_info!("No config file found, using defaults"),
    }

    let file = read_selection(&settings.input)?;
    if settings.download {
        ensure_output_dir(&settings.output_dir)
            .with_context(|| format!("preparing {:?}", settings.output_dir))?;
    }

    let engine = EngineHandle::new(settings.client.clone(), settings.output_dir.clone())
        .context("starting engine")?;
    let outcome = drive(&settings, file, engine.clone());
    engine.shutdown();

    let success = outcome.is_success();
    match outcome {
        RunOutcome::Downloaded { saved, failed } => {
            for (stem, path) in &saved {
                println!("{stem}: {path}");
            }
            for (stem, message) in &failed {
                eprintln!("{stem}: download failed: {message}");
            }
            if !success {
                bail!("{} of {} downloads failed", failed.len(), failed.len() + saved.len());
            }
        }
        RunOutcome::Located(downloads) => {
            for download in &downloads {
                println!("{}: {}", download.stem, download.locator);
            }
        }
        RunOutcome::Failed(message) => {
            engine_error!("Separation failed: {}", message);
            bail!("separation failed: {message}");
        }
    }
    Ok(())
}

fn read_selection(path: &Path) -> anyhow::Result<SelectedFile> {
    let content = fs::read(path).with_context(|| format!("reading {path:?}"))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SelectedFile::new(name, content))
}

/// Runs the update loop until the driver reports an outcome.
fn drive(settings: &RunSettings, file: SelectedFile, engine: EngineHandle) -> RunOutcome {
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut runner = EffectRunner::new(engine, msg_tx);
    let mut driver = Driver::new(settings.retries, settings.download);
    let mut renderer = TerminalRenderer::default();
    let mut state = AppState::new();

    let mut pending: VecDeque<Msg> = VecDeque::new();
    pending.push_back(Msg::FormatChanged(settings.format));
    pending.extend(settings.stems.iter().map(Msg::StemToggled));
    pending.push_back(Msg::FileSelected {
        file,
        source: FileSource::Picker,
    });
    pending.push_back(Msg::StartClicked);

    loop {
        while let Some(msg) = pending.pop_front() {
            let (next, effects) = update(std::mem::take(&mut state), msg);
            state = next;
            runner.enqueue(effects);

            if !state.consume_dirty() {
                continue;
            }
            let view = state.view();
            for line in renderer.frame(&view) {
                eprintln!("{line}");
            }
            match driver.observe(&view) {
                Step::Wait => {}
                Step::Raise(msgs) => pending.extend(msgs),
                Step::Done(outcome) => return outcome,
            }
        }

        match msg_rx.recv_timeout(TICK) {
            Ok(msg) => pending.push_back(msg),
            Err(mpsc::RecvTimeoutError::Timeout) => pending.push_back(Msg::Tick),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return RunOutcome::Failed("engine stopped unexpectedly".to_string());
            }
        }
    }
}
