use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_info, engine_warn};
use splitter_core::{Effect, JobHandle, Msg, Stem, SubmitOutcome};
use splitter_engine::{
    download_filename, DownloadRequest, EngineEvent, EngineHandle, StemLocators, Upload,
};

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Executes core effects against the engine and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
    source_name: String,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let runner = Self {
            engine,
            source_name: String::new(),
        };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit {
                    job_id,
                    file,
                    stems,
                } => {
                    engine_info!(
                        "Submit job_id={} file={} size={} stems={:?}",
                        job_id,
                        file.name(),
                        file.size(),
                        stems.iter().map(Stem::label).collect::<Vec<_>>()
                    );
                    self.source_name = file.name().to_string();
                    self.engine.submit(
                        job_id,
                        Upload {
                            file_name: file.name().to_string(),
                            content: Bytes::from_owner(file.content().clone()),
                        },
                    );
                }
                Effect::OpenProgressStream { job_id, handle } => {
                    engine_info!("Open progress stream job_id={}", job_id);
                    self.engine.open_stream(job_id, to_locators(handle));
                }
                Effect::CloseProgressStream { job_id } => {
                    engine_info!("Close progress stream job_id={}", job_id);
                    self.engine.close_stream(job_id);
                }
                Effect::Download {
                    job_id,
                    stem,
                    locator,
                    format,
                } => {
                    let file_name =
                        download_filename(&self.source_name, stem.label(), format.extension());
                    engine_info!(
                        "Download job_id={} stem={} locator={} file={}",
                        job_id,
                        stem,
                        locator,
                        file_name
                    );
                    self.engine.download(
                        job_id,
                        stem.label(),
                        DownloadRequest { locator, file_name },
                    );
                }
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || forward_events(&engine, &msg_tx));
    }
}

/// Pumps engine events into `msg_tx` until either side goes away.
fn forward_events(engine: &EngineHandle, msg_tx: &mpsc::Sender<Msg>) {
    loop {
        let event = match engine.recv_timeout(EVENT_POLL) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                engine_debug!("Engine event channel closed");
                return;
            }
        };
        engine_debug!("Engine event: {:?}", event);
        let Some(msg) = map_event(event) else {
            continue;
        };
        if msg_tx.send(msg).is_err() {
            return;
        }
    }
}

fn to_locators(handle: JobHandle) -> StemLocators {
    StemLocators {
        vocals: handle.vocals,
        instrumental: handle.instrumental,
    }
}

/// Translates an engine event into the core message it stands for.
pub fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Submitted { job_id, result } => {
            let outcome = match result {
                Ok(locators) => SubmitOutcome::Accepted(JobHandle {
                    vocals: locators.vocals,
                    instrumental: locators.instrumental,
                }),
                Err(error) if error.kind.is_rejection() => {
                    engine_warn!("Job {} rejected: {}", job_id, error);
                    SubmitOutcome::Rejected(error.message)
                }
                Err(error) => {
                    engine_warn!("Job {} submission failed ({}): {}", job_id, error.kind, error);
                    SubmitOutcome::TransportError(error.message)
                }
            };
            Some(Msg::SubmitCompleted { job_id, outcome })
        }
        EngineEvent::Progress { job_id, percent } => {
            Some(Msg::ProgressReceived { job_id, percent })
        }
        EngineEvent::StreamFailed { job_id, error } => {
            engine_warn!("Progress stream for job {} failed: {}", job_id, error);
            Some(Msg::StreamFailed {
                job_id,
                message: error.message,
            })
        }
        EngineEvent::Downloaded {
            job_id,
            stem,
            result,
        } => {
            let Some(stem) = Stem::ALL.into_iter().find(|s| s.label() == stem) else {
                engine_warn!("Download for unknown stem '{}' ignored", stem);
                return None;
            };
            let result = result
                .map(|path| path.display().to_string())
                .map_err(|error| error.message);
            Some(Msg::DownloadFinished {
                job_id,
                stem,
                result,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitter_engine::{ClientSettings, FailureKind, TransferError};
    use std::path::PathBuf;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn event_forwarding_stops_once_engine_shuts_down() {
        let temp = TempDir::new().unwrap();
        let engine =
            EngineHandle::new(ClientSettings::default(), temp.path().to_path_buf()).unwrap();
        let (msg_tx, msg_rx) = mpsc::channel();
        engine.shutdown();

        let started = Instant::now();
        forward_events(&engine, &msg_tx);
        assert!(started.elapsed() < Duration::from_secs(5));

        drop(msg_tx);
        assert!(msg_rx.recv().is_err());
    }

    #[test]
    fn rejection_and_transport_errors_map_to_distinct_outcomes() {
        let rejected = map_event(EngineEvent::Submitted {
            job_id: 3,
            result: Err(TransferError::new(FailureKind::Rejected, "Unsupported file")),
        });
        assert_eq!(
            rejected,
            Some(Msg::SubmitCompleted {
                job_id: 3,
                outcome: SubmitOutcome::Rejected("Unsupported file".to_string()),
            })
        );

        let transport = map_event(EngineEvent::Submitted {
            job_id: 3,
            result: Err(TransferError::new(FailureKind::HttpStatus(502), "Bad gateway")),
        });
        assert_eq!(
            transport,
            Some(Msg::SubmitCompleted {
                job_id: 3,
                outcome: SubmitOutcome::TransportError("Bad gateway".to_string()),
            })
        );
    }

    #[test]
    fn accepted_submission_carries_locators() {
        let msg = map_event(EngineEvent::Submitted {
            job_id: 1,
            result: Ok(StemLocators {
                vocals: Some("/download/v".to_string()),
                instrumental: None,
            }),
        });
        assert_eq!(
            msg,
            Some(Msg::SubmitCompleted {
                job_id: 1,
                outcome: SubmitOutcome::Accepted(JobHandle {
                    vocals: Some("/download/v".to_string()),
                    instrumental: None,
                }),
            })
        );
    }

    #[test]
    fn download_events_map_stem_labels_back() {
        let msg = map_event(EngineEvent::Downloaded {
            job_id: 2,
            stem: "instrumental".to_string(),
            result: Ok(PathBuf::from("out/song_instrumental.mp3")),
        });
        assert_eq!(
            msg,
            Some(Msg::DownloadFinished {
                job_id: 2,
                stem: Stem::Instrumental,
                result: Ok(PathBuf::from("out/song_instrumental.mp3").display().to_string()),
            })
        );

        let unknown = map_event(EngineEvent::Downloaded {
            job_id: 2,
            stem: "drums".to_string(),
            result: Ok(PathBuf::from("x")),
        });
        assert_eq!(unknown, None);
    }
}
