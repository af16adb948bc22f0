//! Splitter engine: network IO for submission, progress streaming and downloads.
mod download;
mod engine;
mod filename;
mod persist;
mod progress;
mod settings;
mod sink;
mod sse;
mod transfer;
mod types;

pub use download::{Downloader, ReqwestDownloader};
pub use engine::{EngineBackends, EngineHandle};
pub use filename::download_filename;
pub use persist::{ensure_output_dir, PersistError, StagedStem, StemWriter};
pub use progress::{
    decode_percents, PercentStream, ProgressSource, ProgressSubscription, ReqwestProgressSource,
    PROGRESS_PATH,
};
pub use settings::{ClientSettings, DEFAULT_BASE_URL};
pub use sink::{ChannelEventSink, EventSink};
pub use sse::{parse_percent, SseDecoder};
pub use transfer::{ReqwestTransferClient, TransferClient, AUDIO_FIELD, SEPARATE_PATH};
pub use types::{
    DownloadRequest, EngineEvent, FailureKind, JobId, StemLocators, TransferError, Upload,
};
