use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use engine_logging::{engine_debug, engine_warn};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;

use crate::settings::{map_reqwest_error, ClientSettings};
use crate::sse::{parse_percent, SseDecoder};
use crate::{EngineEvent, EventSink, FailureKind, JobId, StemLocators, TransferError};

pub const PROGRESS_PATH: &str = "/progress";

/// Raw percent values in arrival order. Dropping the stream releases the connection.
pub type PercentStream = BoxStream<'static, Result<i64, TransferError>>;

/// Opens a server-push progress subscription for an accepted job.
#[async_trait::async_trait]
pub trait ProgressSource: Send + Sync {
    async fn open(
        &self,
        job_id: JobId,
        locators: &StemLocators,
    ) -> Result<PercentStream, TransferError>;
}

/// Progress over `GET /progress`.
///
/// The backend exposes one global channel without a job identifier, so only one job
/// can be tracked at a time.
#[derive(Debug, Clone)]
pub struct ReqwestProgressSource {
    settings: ClientSettings,
}

impl ReqwestProgressSource {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl ProgressSource for ReqwestProgressSource {
    async fn open(
        &self,
        job_id: JobId,
        _locators: &StemLocators,
    ) -> Result<PercentStream, TransferError> {
        let url = self.settings.endpoint(PROGRESS_PATH)?;
        let client = self.settings.build_client(true)?;
        let response = client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("progress stream refused: http status {status}"),
            ));
        }

        engine_debug!("Progress stream connected for job {}", job_id);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(decode_percents(body))
    }
}

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<i64>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn queue(&mut self, data: &str) {
        match parse_percent(data) {
            Some(percent) => self.pending.push_back(percent),
            None => engine_warn!("Ignoring non-numeric progress event {:?}", data),
        }
    }
}

/// Turns an event-stream body into percent values. A body error ends the stream.
pub fn decode_percents<S>(body: S) -> PercentStream
where
    S: Stream<Item = Result<Bytes, TransferError>> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(percent) = state.pending.pop_front() {
                return Some((Ok(percent), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.push(&chunk) {
                        state.queue(&data);
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    if let Some(data) = state.decoder.finish() {
                        state.queue(&data);
                    }
                }
            }
        }
    })
    .boxed()
}

/// Shared open/closed flag. Events are only handed to the sink while it is open.
#[derive(Clone)]
struct Gate(Arc<Mutex<bool>>);

impl Gate {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn emit(&self, sink: &dyn EventSink, event: EngineEvent) -> bool {
        match self.0.lock() {
            Ok(open) if *open => {
                sink.emit(event);
                true
            }
            _ => false,
        }
    }

    fn shut(&self) -> bool {
        match self.0.lock() {
            Ok(mut open) => std::mem::replace(&mut *open, false),
            Err(_) => false,
        }
    }
}

/// The one live progress subscription of a job.
///
/// [`close`](Self::close) is idempotent. Once it returns, no further event from this
/// subscription reaches the sink. The underlying stream is dropped as soon as the
/// terminal value (>= 100) has been seen, without waiting for the server.
pub struct ProgressSubscription {
    job_id: JobId,
    gate: Gate,
    cancel: CancellationToken,
}

impl ProgressSubscription {
    pub fn open(
        runtime: &tokio::runtime::Handle,
        source: Arc<dyn ProgressSource>,
        job_id: JobId,
        locators: StemLocators,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let gate = Gate::new();
        let cancel = CancellationToken::new();
        runtime.spawn(run_subscription(
            source,
            job_id,
            locators,
            sink,
            gate.clone(),
            cancel.clone(),
        ));
        Self {
            job_id,
            gate,
            cancel,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn close(&mut self) {
        if self.gate.shut() {
            engine_debug!("Closing progress stream for job {}", self.job_id);
        }
        self.cancel.cancel();
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_subscription(
    source: Arc<dyn ProgressSource>,
    job_id: JobId,
    locators: StemLocators,
    sink: Arc<dyn EventSink>,
    gate: Gate,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = source.open(job_id, &locators) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            gate.emit(sink.as_ref(), EngineEvent::StreamFailed { job_id, error });
            return;
        }
    };

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };
        match item {
            Some(Ok(percent)) => {
                if !gate.emit(sink.as_ref(), EngineEvent::Progress { job_id, percent }) {
                    break;
                }
                if percent >= 100 {
                    engine_debug!("Job {} reached {}%, releasing stream", job_id, percent);
                    break;
                }
            }
            Some(Err(error)) => {
                engine_warn!("Progress stream for job {} failed: {}", job_id, error);
                gate.emit(sink.as_ref(), EngineEvent::StreamFailed { job_id, error });
                break;
            }
            None => {
                gate.emit(
                    sink.as_ref(),
                    EngineEvent::StreamFailed {
                        job_id,
                        error: TransferError::new(
                            FailureKind::StreamClosed,
                            "progress stream closed before completion",
                        ),
                    },
                );
                break;
            }
        }
    }
    drop(stream);
}
