use crate::{JobHandle, JobId, OutputFormat, SelectedFile, Stem, StemSet};

/// Side effects requested by [`crate::update`]. Hosts must execute them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Submit {
        job_id: JobId,
        file: SelectedFile,
        stems: StemSet,
    },
    OpenProgressStream {
        job_id: JobId,
        handle: JobHandle,
    },
    CloseProgressStream {
        job_id: JobId,
    },
    Download {
        job_id: JobId,
        stem: Stem,
        locator: String,
        format: OutputFormat,
    },
}
