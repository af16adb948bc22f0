use splitter_core::{AppViewModel, DownloadStatus, DownloadView, JobId, JobState, Msg, Stem};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Downloads were attempted; each stem is either saved or failed.
    Downloaded {
        saved: Vec<(Stem, String)>,
        failed: Vec<(Stem, String)>,
    },
    /// Downloads were skipped; these locators are ready to fetch.
    Located(Vec<DownloadView>),
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            RunOutcome::Downloaded { failed, .. } => failed.is_empty(),
            RunOutcome::Located(_) => true,
            RunOutcome::Failed(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Wait,
    Raise(Vec<Msg>),
    Done(RunOutcome),
}

/// Plays the user's part for a non-interactive run: retries failures and
/// downloads every available stem once the job completes.
#[derive(Debug)]
pub struct Driver {
    retries_left: u32,
    download: bool,
    retried_job: Option<JobId>,
    downloads_requested: Option<JobId>,
}

impl Driver {
    pub fn new(retries: u32, download: bool) -> Self {
        Self {
            retries_left: retries,
            download,
            retried_job: None,
            downloads_requested: None,
        }
    }

    pub fn observe(&mut self, view: &AppViewModel) -> Step {
        match view.state {
            JobState::Failed => {
                let message = view
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "separation failed".to_string());
                if self.retried_job == view.job_id {
                    return Step::Wait;
                }
                if self.retries_left > 0 && view.can_start {
                    self.retries_left -= 1;
                    self.retried_job = view.job_id;
                    return Step::Raise(vec![Msg::StartClicked]);
                }
                Step::Done(RunOutcome::Failed(message))
            }
            JobState::Completed => self.observe_completed(view),
            _ => Step::Wait,
        }
    }

    fn observe_completed(&mut self, view: &AppViewModel) -> Step {
        if !self.download || view.available_downloads.is_empty() {
            return Step::Done(RunOutcome::Located(view.available_downloads.clone()));
        }

        if self.downloads_requested != view.job_id {
            self.downloads_requested = view.job_id;
            return Step::Raise(
                view.available_downloads
                    .iter()
                    .map(|download| Msg::DownloadRequested {
                        stem: download.stem,
                    })
                    .collect(),
            );
        }

        let settled = view.downloads.len() >= view.available_downloads.len()
            && view
                .downloads
                .iter()
                .all(|row| row.status != DownloadStatus::Pending);
        if !settled {
            return Step::Wait;
        }

        let mut saved = Vec::new();
        let mut failed = Vec::new();
        for row in &view.downloads {
            match &row.status {
                DownloadStatus::Saved(path) => saved.push((row.stem, path.clone())),
                DownloadStatus::Failed(message) => failed.push((row.stem, message.clone())),
                DownloadStatus::Pending => {}
            }
        }
        Step::Done(RunOutcome::Downloaded { saved, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use splitter_core::DownloadRowView;

    fn failed_view(job_id: JobId) -> AppViewModel {
        AppViewModel {
            state: JobState::Failed,
            job_id: Some(job_id),
            error_message: Some("Connection refused".to_string()),
            can_start: true,
            ..AppViewModel::default()
        }
    }

    fn completed_view(job_id: JobId) -> AppViewModel {
        AppViewModel {
            state: JobState::Completed,
            job_id: Some(job_id),
            progress_percent: 100,
            available_downloads: vec![
                DownloadView {
                    stem: Stem::Vocals,
                    locator: "/download/v?format=mp3".to_string(),
                },
                DownloadView {
                    stem: Stem::Instrumental,
                    locator: "/download/i?format=mp3".to_string(),
                },
            ],
            ..AppViewModel::default()
        }
    }

    #[test]
    fn waits_while_job_is_running() {
        let mut driver = Driver::new(0, true);
        let view = AppViewModel {
            state: JobState::Tracking,
            job_id: Some(1),
            progress_percent: 40,
            ..AppViewModel::default()
        };
        assert_eq!(driver.observe(&view), Step::Wait);
    }

    #[test]
    fn retries_each_failed_job_once_until_budget_is_spent() {
        let mut driver = Driver::new(1, true);
        assert_eq!(
            driver.observe(&failed_view(1)),
            Step::Raise(vec![Msg::StartClicked])
        );
        assert_eq!(driver.observe(&failed_view(1)), Step::Wait);
        assert_eq!(
            driver.observe(&failed_view(2)),
            Step::Done(RunOutcome::Failed("Connection refused".to_string()))
        );
    }

    #[test]
    fn requests_downloads_once_then_reports_results() {
        let mut driver = Driver::new(0, true);
        let mut view = completed_view(4);
        assert_eq!(
            driver.observe(&view),
            Step::Raise(vec![
                Msg::DownloadRequested { stem: Stem::Vocals },
                Msg::DownloadRequested {
                    stem: Stem::Instrumental
                },
            ])
        );

        view.downloads = vec![
            DownloadRowView {
                stem: Stem::Vocals,
                status: DownloadStatus::Saved("out/song_vocals.mp3".to_string()),
            },
            DownloadRowView {
                stem: Stem::Instrumental,
                status: DownloadStatus::Pending,
            },
        ];
        assert_eq!(driver.observe(&view), Step::Wait);

        view.downloads[1].status = DownloadStatus::Failed("HTTP 404".to_string());
        let step = driver.observe(&view);
        assert_eq!(
            step,
            Step::Done(RunOutcome::Downloaded {
                saved: vec![(Stem::Vocals, "out/song_vocals.mp3".to_string())],
                failed: vec![(Stem::Instrumental, "HTTP 404".to_string())],
            })
        );
        if let Step::Done(outcome) = step {
            assert!(!outcome.is_success());
        }
    }

    #[test]
    fn skipping_downloads_reports_locators() {
        let mut driver = Driver::new(0, false);
        let view = completed_view(1);
        assert_eq!(
            driver.observe(&view),
            Step::Done(RunOutcome::Located(view.available_downloads.clone()))
        );
    }
}
