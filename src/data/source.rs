//! Snapshot Source Module
//! Locates a published snapshot and fetches its raw bytes.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::loader::LoaderError;

/// Where a snapshot's raw bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

/// Published file name for the snapshot of a given day.
pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!(
        "Datos_Capacidad_Asistencial_Historico_{}.csv",
        date.format("%d%m%Y")
    )
}

impl Source {
    /// Snapshot for `date` under `base`, which is either a URL prefix or a
    /// local directory.
    pub fn for_date(base: &str, date: NaiveDate) -> Self {
        let file_name = snapshot_file_name(date);
        if base.starts_with("http://") || base.starts_with("https://") {
            Source::Url(format!("{}/{}", base.trim_end_matches('/'), file_name))
        } else {
            Source::File(PathBuf::from(base).join(file_name))
        }
    }

    /// Fetch the raw bytes. Every failure is reported as unavailable.
    pub fn fetch(&self, timeout: Duration) -> Result<Vec<u8>, LoaderError> {
        match self {
            Source::Url(url) => fetch_url(url, timeout),
            Source::File(path) => std::fs::read(path).map_err(|e| {
                LoaderError::SourceUnavailable(format!("{}: {}", path.display(), e))
            }),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn fetch_url(url: &str, timeout: Duration) -> Result<Vec<u8>, LoaderError> {
    let unavailable = |e: reqwest::Error| LoaderError::SourceUnavailable(format!("{}: {}", url, e));

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(unavailable)?;

    let response = client.get(url).send().map_err(unavailable)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoaderError::SourceUnavailable(format!(
            "{}: HTTP {}",
            url, status
        )));
    }

    let bytes = response.bytes().map_err(unavailable)?;
    log::info!("Fetched {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve a single canned HTTP response on an ephemeral port.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn file_name_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2022, 3, 7).unwrap();
        assert_eq!(
            snapshot_file_name(date),
            "Datos_Capacidad_Asistencial_Historico_07032022.csv"
        );
    }

    #[test]
    fn for_date_distinguishes_urls_from_directories() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert_eq!(
            Source::for_date("https://example.org/docs/", date),
            Source::Url(
                "https://example.org/docs/Datos_Capacidad_Asistencial_Historico_02012023.csv"
                    .to_string()
            )
        );
        assert_eq!(
            Source::for_date("/data/snapshots", date),
            Source::File(PathBuf::from(
                "/data/snapshots/Datos_Capacidad_Asistencial_Historico_02012023.csv"
            ))
        );
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::File(dir.path().join("missing.csv"));
        let err = source.fetch(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoaderError::SourceUnavailable(_)));
    }

    #[test]
    fn http_not_found_is_unavailable() {
        let base = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let source = Source::Url(format!("{}/missing.csv", base));
        let err = source.fetch(Duration::from_secs(5)).unwrap_err();
        match err {
            LoaderError::SourceUnavailable(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn http_timeout_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            // Accept and hold the connection without ever answering
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_secs(5));
                drop(stream);
            }
        });

        let source = Source::Url(format!("http://{}/slow.csv", addr));
        let err = source.fetch(Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, LoaderError::SourceUnavailable(_)));
    }

    #[test]
    fn http_success_returns_body() {
        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        );
        let source = Source::Url(format!("{}/ok.csv", base));
        let bytes = source.fetch(Duration::from_secs(5)).unwrap();
        assert_eq!(bytes, b"hello");
    }
}
