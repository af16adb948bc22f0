use crate::{AppState, DownloadStatus, Effect, JobState, Msg, SubmitOutcome};

/// Pure update function: applies a message to state and returns any effects.
///
/// Engine messages carry the job id they were produced for; anything that does not
/// match the live job in the expected phase is dropped without touching the state.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected { file, source: _ } => {
            // A new file supersedes the previous job, whatever phase it was in.
            let effects: Vec<Effect> = state.close_stream().into_iter().collect();
            state.replace_selection(file);
            effects
        }
        Msg::FileRemoved => {
            if state.selection().is_none() && state.job_state() == JobState::Idle {
                return (state, Vec::new());
            }
            let effects: Vec<Effect> = state.close_stream().into_iter().collect();
            state.clear_selection();
            effects
        }
        Msg::StemToggled(stem) => {
            state.toggle_stem(stem);
            Vec::new()
        }
        Msg::FormatChanged(format) => {
            state.set_format(format);
            Vec::new()
        }
        Msg::StartClicked => {
            if !state.can_start() {
                return (state, Vec::new());
            }
            let mut effects: Vec<Effect> = state.close_stream().into_iter().collect();
            if let Some((job_id, file, stems)) = state.begin_submission() {
                effects.push(Effect::Submit {
                    job_id,
                    file,
                    stems,
                });
            }
            effects
        }
        Msg::SubmitCompleted { job_id, outcome } => {
            if !state.is_current(job_id, JobState::Submitting) {
                return (state, Vec::new());
            }
            match outcome {
                SubmitOutcome::Accepted(handle) => {
                    let mut effects: Vec<Effect> = state.close_stream().into_iter().collect();
                    state.begin_tracking(job_id, handle.clone());
                    effects.push(Effect::OpenProgressStream { job_id, handle });
                    effects
                }
                SubmitOutcome::Rejected(message) | SubmitOutcome::TransportError(message) => {
                    state.fail(message);
                    Vec::new()
                }
            }
        }
        Msg::ProgressReceived { job_id, percent } => {
            if !state.is_current(job_id, JobState::Tracking) {
                return (state, Vec::new());
            }
            if state.record_progress(percent) {
                let effects: Vec<Effect> = state.close_stream().into_iter().collect();
                state.complete();
                effects
            } else {
                Vec::new()
            }
        }
        Msg::StreamFailed { job_id, message } => {
            if !state.is_current(job_id, JobState::Tracking) {
                return (state, Vec::new());
            }
            let effects: Vec<Effect> = state.close_stream().into_iter().collect();
            state.fail(message);
            effects
        }
        Msg::DownloadRequested { stem } => {
            let format = state.format();
            let (Some(job_id), Ok(locator)) = (
                state.current_job_id(),
                state.resolve_download_target(stem, format),
            ) else {
                return (state, Vec::new());
            };
            if state.download_status(stem) == Some(&DownloadStatus::Pending) {
                return (state, Vec::new());
            }
            state.set_download_status(stem, DownloadStatus::Pending);
            vec![Effect::Download {
                job_id,
                stem,
                locator,
                format,
            }]
        }
        Msg::DownloadFinished {
            job_id,
            stem,
            result,
        } => {
            if !state.is_current(job_id, JobState::Completed)
                || state.download_status(stem) != Some(&DownloadStatus::Pending)
            {
                return (state, Vec::new());
            }
            let status = match result {
                Ok(saved_to) => DownloadStatus::Saved(saved_to),
                Err(message) => DownloadStatus::Failed(message),
            };
            state.set_download_status(stem, status);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
