use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};

use crate::download::{Downloader, ReqwestDownloader};
use crate::progress::{ProgressSource, ProgressSubscription, ReqwestProgressSource};
use crate::sink::{ChannelEventSink, EventSink};
use crate::transfer::{ReqwestTransferClient, TransferClient};
use crate::{ClientSettings, DownloadRequest, EngineEvent, JobId, StemLocators, Upload};

enum EngineCommand {
    Submit {
        job_id: JobId,
        upload: Upload,
    },
    OpenStream {
        job_id: JobId,
        locators: StemLocators,
    },
    CloseStream {
        job_id: JobId,
    },
    Download {
        job_id: JobId,
        stem: String,
        request: DownloadRequest,
    },
    Shutdown,
}

/// The IO implementations the engine drives.
#[derive(Clone)]
pub struct EngineBackends {
    pub transfer: Arc<dyn TransferClient>,
    pub progress: Arc<dyn ProgressSource>,
    pub downloader: Arc<dyn Downloader>,
}

impl EngineBackends {
    pub fn reqwest(settings: ClientSettings, output_dir: PathBuf) -> Self {
        Self {
            transfer: Arc::new(ReqwestTransferClient::new(settings.clone())),
            progress: Arc::new(ReqwestProgressSource::new(settings.clone())),
            downloader: Arc::new(ReqwestDownloader::new(settings, output_dir)),
        }
    }
}

/// Runs submissions, the progress subscription and downloads on a background runtime.
///
/// At most one progress subscription is open; opening a new one closes the previous
/// one first.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings, output_dir: PathBuf) -> io::Result<Self> {
        Self::with_backends(EngineBackends::reqwest(settings, output_dir))
    }

    pub fn with_backends(backends: EngineBackends) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::Builder::new()
            .name("splitter-engine".to_string())
            .spawn(move || run_commands(runtime, backends, sink, cmd_rx))?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        })
    }

    pub fn submit(&self, job_id: JobId, upload: Upload) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { job_id, upload });
    }

    pub fn open_stream(&self, job_id: JobId, locators: StemLocators) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::OpenStream { job_id, locators });
    }

    pub fn close_stream(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::CloseStream { job_id });
    }

    pub fn download(&self, job_id: JobId, stem: impl Into<String>, request: DownloadRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Download {
            job_id,
            stem: stem.into(),
            request,
        });
    }

    /// Closes any open subscription and stops the engine thread.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    /// `Disconnected` once the engine thread has stopped and every event is drained.
    pub fn try_recv(&self) -> Result<EngineEvent, mpsc::TryRecvError> {
        match self.event_rx.lock() {
            Ok(rx) => rx.try_recv(),
            Err(_) => Err(mpsc::TryRecvError::Disconnected),
        }
    }

    /// Waits up to `timeout`; `Disconnected` once the engine thread has stopped.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, mpsc::RecvTimeoutError> {
        match self.event_rx.lock() {
            Ok(rx) => rx.recv_timeout(timeout),
            Err(_) => Err(mpsc::RecvTimeoutError::Disconnected),
        }
    }
}

fn run_commands(
    runtime: tokio::runtime::Runtime,
    backends: EngineBackends,
    sink: Arc<dyn EventSink>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
) {
    let mut active: Option<ProgressSubscription> = None;

    while let Ok(command) = cmd_rx.recv() {
        match command {
            EngineCommand::Submit { job_id, upload } => {
                let transfer = backends.transfer.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = transfer.submit(&upload).await;
                    sink.emit(EngineEvent::Submitted { job_id, result });
                });
            }
            EngineCommand::OpenStream { job_id, locators } => {
                if let Some(mut previous) = active.take() {
                    previous.close();
                }
                active = Some(ProgressSubscription::open(
                    runtime.handle(),
                    backends.progress.clone(),
                    job_id,
                    locators,
                    sink.clone(),
                ));
            }
            EngineCommand::CloseStream { job_id } => {
                let matches = active
                    .as_ref()
                    .is_some_and(|subscription| subscription.job_id() == job_id);
                match active.take() {
                    Some(mut subscription) if matches => subscription.close(),
                    other => {
                        active = other;
                        engine_debug!("No open progress stream for job {}", job_id);
                    }
                }
            }
            EngineCommand::Download {
                job_id,
                stem,
                request,
            } => {
                let downloader = backends.downloader.clone();
                let sink = sink.clone();
                runtime.spawn(async move {
                    let result = downloader.download(&request).await;
                    sink.emit(EngineEvent::Downloaded {
                        job_id,
                        stem,
                        result,
                    });
                });
            }
            EngineCommand::Shutdown => break,
        }
    }

    if let Some(mut subscription) = active.take() {
        subscription.close();
    }
    engine_info!("Engine stopped");
    runtime.shutdown_timeout(Duration::from_millis(500));
}
