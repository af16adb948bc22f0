#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked or dropped a file.
    FileSelected {
        file: crate::SelectedFile,
        source: crate::FileSource,
    },
    /// User removed the current file.
    FileRemoved,
    /// User toggled one of the stem options.
    StemToggled(crate::Stem),
    /// User changed the download format.
    FormatChanged(crate::OutputFormat),
    /// User clicked Process (or Retry).
    StartClicked,
    /// Submission request resolved.
    SubmitCompleted {
        job_id: crate::JobId,
        outcome: crate::SubmitOutcome,
    },
    /// Progress stream delivered a percent value (unclamped).
    ProgressReceived { job_id: crate::JobId, percent: i64 },
    /// Progress stream errored or closed before reaching 100.
    StreamFailed {
        job_id: crate::JobId,
        message: String,
    },
    /// User asked to download one stem of the completed job.
    DownloadRequested { stem: crate::Stem },
    /// A stem download finished; `Ok` carries where it was saved.
    DownloadFinished {
        job_id: crate::JobId,
        stem: crate::Stem,
        result: Result<String, String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
