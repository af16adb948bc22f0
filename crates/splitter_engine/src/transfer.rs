use engine_logging::{engine_debug, engine_info};
use serde::Deserialize;

use crate::settings::{map_reqwest_error, ClientSettings};
use crate::{FailureKind, StemLocators, TransferError, Upload};

pub const SEPARATE_PATH: &str = "/separate";
/// Multipart field carrying the audio file.
pub const AUDIO_FIELD: &str = "audio";

/// Submits an audio file for separation.
///
/// `Ok` is an accepted job; `Err` with [`FailureKind::Rejected`] is a backend rejection;
/// any other kind is a transport failure.
#[async_trait::async_trait]
pub trait TransferClient: Send + Sync {
    async fn submit(&self, upload: &Upload) -> Result<StemLocators, TransferError>;
}

#[derive(Debug, Deserialize)]
struct SeparateResponse {
    success: bool,
    error: Option<String>,
    vocals: Option<String>,
    instrumental: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestTransferClient {
    settings: ClientSettings,
}

impl ReqwestTransferClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl TransferClient for ReqwestTransferClient {
    async fn submit(&self, upload: &Upload) -> Result<StemLocators, TransferError> {
        let size = upload.content.len() as u64;
        if size > self.settings.max_upload_bytes {
            return Err(TransferError::new(
                FailureKind::TooLarge {
                    max_bytes: self.settings.max_upload_bytes,
                    actual: size,
                },
                format!(
                    "{} is too large to upload ({size} bytes, limit {})",
                    upload.file_name, self.settings.max_upload_bytes
                ),
            ));
        }

        let url = self.settings.endpoint(SEPARATE_PATH)?;
        let client = self.settings.build_client(false)?;
        let part = reqwest::multipart::Part::stream_with_length(upload.content.clone(), size)
            .file_name(upload.file_name.clone());
        let form = reqwest::multipart::Form::new().part(AUDIO_FIELD, part);

        engine_info!(
            "Submitting {} ({} bytes) to {}",
            upload.file_name,
            size,
            url
        );
        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        engine_debug!("Submission answered {} with {} bytes", status, body.len());

        if !status.is_success() {
            let detail = serde_json::from_slice::<SeparateResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error);
            let message = match detail {
                Some(detail) => format!("http status {status}: {detail}"),
                None => format!("http status {status}"),
            };
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        let parsed: SeparateResponse = serde_json::from_slice(&body).map_err(|err| {
            TransferError::new(
                FailureKind::MalformedBody,
                format!("malformed response body: {err}"),
            )
        })?;

        if !parsed.success {
            return Err(TransferError::new(
                FailureKind::Rejected,
                parsed
                    .error
                    .unwrap_or_else(|| "the server rejected the file".to_string()),
            ));
        }

        Ok(StemLocators {
            vocals: parsed.vocals,
            instrumental: parsed.instrumental,
        })
    }
}
