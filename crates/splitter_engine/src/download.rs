use std::path::PathBuf;

use engine_logging::engine_info;
use futures_util::StreamExt;

use crate::persist::{PersistError, StemWriter};
use crate::settings::{map_reqwest_error, ClientSettings};
use crate::{DownloadRequest, FailureKind, TransferError};

/// Fetches a processed stem and stores it locally.
#[async_trait::async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, TransferError>;
}

pub struct ReqwestDownloader {
    settings: ClientSettings,
    writer: StemWriter,
}

impl ReqwestDownloader {
    pub fn new(settings: ClientSettings, output_dir: PathBuf) -> Self {
        Self {
            settings,
            writer: StemWriter::new(output_dir),
        }
    }
}

#[async_trait::async_trait]
impl Downloader for ReqwestDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, TransferError> {
        let url = self.settings.endpoint(&request.locator)?;
        let client = self.settings.build_client(false)?;
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("download of {url} failed: http status {status}"),
            ));
        }

        let mut staged = self.writer.begin(&request.file_name).map_err(io_failure)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            staged.append(&chunk).map_err(io_failure)?;
        }

        let written = staged.written();
        let saved = staged.commit().map_err(io_failure)?;
        engine_info!("Saved {} bytes from {} to {:?}", written, url, saved);
        Ok(saved)
    }
}

fn io_failure(err: PersistError) -> TransferError {
    TransferError::new(FailureKind::Io, err.to_string())
}
