//! Stream ownership: opens and closes are always paired and stale events are inert.
use std::sync::Once;

use splitter_core::{
    update, AppState, Effect, FileSource, JobHandle, JobId, JobState, Msg, SelectedFile, Stem,
    SubmitOutcome,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

/// Counts open/close effects while feeding messages through `update`.
#[derive(Default)]
struct Driver {
    state: AppState,
    opened: Vec<JobId>,
    closed: Vec<JobId>,
    last_submit: Option<JobId>,
}

impl Driver {
    fn send(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in &effects {
            match effect {
                Effect::OpenProgressStream { job_id, .. } => {
                    assert_eq!(
                        self.opened.len(),
                        self.closed.len(),
                        "stream opened while another was still open"
                    );
                    self.opened.push(*job_id);
                }
                Effect::CloseProgressStream { job_id } => self.closed.push(*job_id),
                Effect::Submit { job_id, .. } => self.last_submit = Some(*job_id),
                Effect::Download { .. } => {}
            }
        }
        effects
    }

    fn select(&mut self, name: &str) {
        self.send(Msg::FileSelected {
            file: SelectedFile::new(name, vec![1, 2, 3]),
            source: FileSource::Drop,
        });
    }

    fn start_and_accept(&mut self) -> JobId {
        self.send(Msg::StartClicked);
        let job_id = self.last_submit.expect("submitted");
        self.send(Msg::SubmitCompleted {
            job_id,
            outcome: SubmitOutcome::Accepted(JobHandle {
                vocals: Some("/v".to_string()),
                instrumental: Some("/i".to_string()),
            }),
        });
        job_id
    }

    fn outstanding(&self) -> usize {
        self.opened.len() - self.closed.len()
    }
}

#[test]
fn remove_during_tracking_closes_stream_and_drops_stale_events() {
    init_logging();
    let mut driver = Driver::default();
    driver.select("song.mp3");
    let job_id = driver.start_and_accept();
    driver.send(Msg::ProgressReceived { job_id, percent: 30 });

    let effects = driver.send(Msg::FileRemoved);
    assert_eq!(effects, vec![Effect::CloseProgressStream { job_id }]);
    assert_eq!(driver.state.job_state(), JobState::Idle);
    assert_eq!(driver.state.progress_percent(), 0);

    driver.state.consume_dirty();
    let before = driver.state.clone();
    let effects = driver.send(Msg::ProgressReceived { job_id, percent: 80 });
    assert!(effects.is_empty());
    assert_eq!(driver.state, before);
    let effects = driver.send(Msg::ProgressReceived { job_id, percent: 100 });
    assert!(effects.is_empty());
    assert_eq!(driver.state, before);
    assert_eq!(driver.outstanding(), 0);
}

#[test]
fn submission_result_after_removal_is_discarded() {
    init_logging();
    let mut driver = Driver::default();
    driver.select("song.mp3");
    driver.send(Msg::StartClicked);
    let job_id = driver.last_submit.expect("submitted");
    driver.send(Msg::FileRemoved);

    let before = driver.state.clone();
    let effects = driver.send(Msg::SubmitCompleted {
        job_id,
        outcome: SubmitOutcome::Accepted(JobHandle::default()),
    });

    assert!(effects.is_empty());
    assert_eq!(driver.state, before);
    assert!(driver.opened.is_empty());
}

#[test]
fn reselecting_mid_job_supersedes_it() {
    init_logging();
    let mut driver = Driver::default();
    driver.select("first.mp3");
    let first = driver.start_and_accept();

    driver.select("second.mp3");
    assert_eq!(driver.closed, vec![first]);
    assert_eq!(driver.state.job_state(), JobState::FileReady);

    let second = driver.start_and_accept();
    assert_ne!(first, second);
    // Late progress from the superseded job must not move the new one.
    driver.send(Msg::ProgressReceived {
        job_id: first,
        percent: 100,
    });
    assert_eq!(driver.state.job_state(), JobState::Tracking);
    assert_eq!(driver.state.progress_percent(), 0);
    assert_eq!(driver.state.open_stream(), Some(second));
    assert_eq!(driver.outstanding(), 1);
}

#[test]
fn many_jobs_never_leak_subscriptions() {
    init_logging();
    let mut driver = Driver::default();
    driver.send(Msg::StemToggled(Stem::Vocals));
    for round in 0..5 {
        driver.select(&format!("take-{round}.mp3"));
        let job_id = driver.start_and_accept();
        driver.send(Msg::ProgressReceived { job_id, percent: 50 });
        if round % 2 == 0 {
            let effects = driver.send(Msg::ProgressReceived { job_id, percent: 100 });
            assert_eq!(effects, vec![Effect::CloseProgressStream { job_id }]);
            // Repeated terminal value after completion closes nothing more.
            let effects = driver.send(Msg::ProgressReceived { job_id, percent: 100 });
            assert!(effects.is_empty());
        }
        assert!(driver.outstanding() <= 1);
    }
    assert_eq!(driver.opened.len(), 5);
    assert!(driver.closed.len() + 1 >= driver.opened.len());
    assert!(driver.outstanding() <= 1);
}
