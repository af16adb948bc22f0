use std::fs;

use splitter_engine::{
    download_filename, ClientSettings, DownloadRequest, Downloader, FailureKind,
    ReqwestDownloader,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader_for(server: &MockServer, temp: &TempDir) -> ReqwestDownloader {
    ReqwestDownloader::new(
        ClientSettings {
            base_url: server.uri(),
            ..ClientSettings::default()
        },
        temp.path().join("stems"),
    )
}

#[tokio::test]
async fn stem_is_fetched_with_format_and_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/song/vocals.wav"))
        .and(query_param("format", "wav"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF....WAVE".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let request = DownloadRequest {
        locator: "/download/song/vocals.wav?format=wav".to_string(),
        file_name: download_filename("song.mp3", "vocals", "wav"),
    };

    let saved = downloader_for(&server, &temp)
        .download(&request)
        .await
        .expect("download ok");
    assert_eq!(saved, temp.path().join("stems").join("song_vocals.wav"));
    assert_eq!(fs::read(&saved).unwrap(), b"RIFF....WAVE");
}

#[tokio::test]
async fn missing_stem_is_reported_and_nothing_is_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download/song/no_vocals.wav"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Requested file is not available yet."))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let request = DownloadRequest {
        locator: "/download/song/no_vocals.wav?format=mp3".to_string(),
        file_name: "song_instrumental.mp3".to_string(),
    };

    let err = downloader_for(&server, &temp)
        .download(&request)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!temp.path().join("stems").join("song_instrumental.mp3").exists());
}
