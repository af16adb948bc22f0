use thiserror::Error;

use crate::{JobResult, JobState, OutputFormat, Stem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("downloads are only available once the job has completed (state: {0:?})")]
    NotCompleted(JobState),
    #[error("no {0} stem is available for this job")]
    StemUnavailable(Stem),
}

/// Builds `{path}?format={format}` for a stem of a completed job.
///
/// The format is applied here on every call and never stored with the job.
pub(crate) fn resolve_download_target(
    state: JobState,
    result: Option<&JobResult>,
    stem: Stem,
    format: OutputFormat,
) -> Result<String, AccessError> {
    if state != JobState::Completed {
        return Err(AccessError::NotCompleted(state));
    }
    let path = result
        .and_then(|result| result.path(stem))
        .ok_or(AccessError::StemUnavailable(stem))?;
    let separator = if path.contains('?') { '&' } else { '?' };
    Ok(format!("{path}{separator}format={}", format.as_str()))
}
