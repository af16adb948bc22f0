//! Splitter core: pure job lifecycle state machine and view-model helpers.
mod access;
mod effect;
mod msg;
mod state;
mod stem;
mod update;
mod view_model;

pub use access::AccessError;
pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    AppState, DownloadStatus, FileSource, JobHandle, JobId, JobResult, JobState, SelectedFile,
    SubmitOutcome,
};
pub use stem::{OutputFormat, ParseFormatError, Stem, StemSet};
pub use update::update;
pub use view_model::{AppViewModel, DownloadRowView, DownloadView};
