use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use splitter_engine::{
    decode_percents, ClientSettings, EngineEvent, EventSink, FailureKind, ProgressSource,
    ProgressSubscription, ReqwestProgressSource, StemLocators, TransferError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn source_for(server: &MockServer) -> ReqwestProgressSource {
    ReqwestProgressSource::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
}

async fn mount_events(server: &MockServer, body: &'static str) {
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

async fn wait_for_events(sink: &TestSink, count: usize) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    for _ in 0..200 {
        seen.extend(sink.take());
        if seen.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    seen
}

#[tokio::test]
async fn event_stream_yields_percents_in_order() {
    let server = MockServer::start().await;
    mount_events(&server, "data:0\n\ndata: 10\n\n: ping\n\ndata:55\r\n\r\ndata:100\n\n").await;

    let stream = source_for(&server)
        .open(1, &StemLocators::default())
        .await
        .expect("stream opens");
    let values: Vec<i64> = stream.map(|item| item.expect("no error")).collect().await;
    assert_eq!(values, vec![0, 10, 55, 100]);
}

#[tokio::test]
async fn non_numeric_payloads_are_skipped() {
    let body = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"data:12\n\ndata:starting\n\n")),
        Ok(Bytes::from_static(b"data:250\n\ndata:-4\n\n")),
    ]);
    let values: Vec<_> = decode_percents(body).collect().await;
    assert_eq!(values, vec![Ok(12), Ok(250), Ok(-4)]);
}

#[tokio::test]
async fn body_error_ends_the_stream_with_error() {
    let body = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"data:30\n\n")),
        Err(TransferError::new(FailureKind::Network, "connection reset")),
        Ok(Bytes::from_static(b"data:40\n\n")),
    ]);
    let values: Vec<_> = decode_percents(body).collect().await;
    assert_eq!(values.len(), 2);
    assert_eq!(values[0], Ok(30));
    assert_eq!(values[1].as_ref().unwrap_err().kind, FailureKind::Network);
}

#[tokio::test]
async fn refused_stream_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .open(1, &StemLocators::default())
        .await
        .err()
        .expect("refused");
    assert_eq!(err.kind, FailureKind::HttpStatus(503));
}

#[tokio::test]
async fn subscription_reports_progress_until_terminal_value() {
    let server = MockServer::start().await;
    mount_events(&server, "data:10\n\ndata:55\n\ndata:100\n\n").await;

    let sink = Arc::new(TestSink::default());
    let mut subscription = ProgressSubscription::open(
        &tokio::runtime::Handle::current(),
        Arc::new(source_for(&server)),
        7,
        StemLocators::default(),
        sink.clone(),
    );

    let events = wait_for_events(&sink, 3).await;
    assert_eq!(
        events,
        vec![
            EngineEvent::Progress {
                job_id: 7,
                percent: 10
            },
            EngineEvent::Progress {
                job_id: 7,
                percent: 55
            },
            EngineEvent::Progress {
                job_id: 7,
                percent: 100
            },
        ]
    );
    subscription.close();
    subscription.close();
    assert!(subscription.is_closed());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn early_end_of_stream_is_a_failure() {
    let server = MockServer::start().await;
    mount_events(&server, "data:10\n\ndata:40\n\n").await;

    let sink = Arc::new(TestSink::default());
    let _subscription = ProgressSubscription::open(
        &tokio::runtime::Handle::current(),
        Arc::new(source_for(&server)),
        3,
        StemLocators::default(),
        sink.clone(),
    );

    let events = wait_for_events(&sink, 3).await;
    assert_eq!(events.len(), 3);
    match &events[2] {
        EngineEvent::StreamFailed { job_id, error } => {
            assert_eq!(*job_id, 3);
            assert_eq!(error.kind, FailureKind::StreamClosed);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
