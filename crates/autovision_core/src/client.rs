//! HTTP access to the prediction service.

use crate::config::AppConfig;
use crate::intake::{self, ImageSelection};
use crate::prediction::PredictionResult;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Multipart field the service reads the photo from.
pub const UPLOAD_FIELD: &str = "file";

/// Shown to the user for every failed analysis, whatever the cause.
pub const GENERIC_FAILURE: &str =
    "Failed to analyze image. The request to the prediction service failed.";

/// Why a submission produced no prediction.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("prediction service answered with status {0}")]
    Status(StatusCode),
    #[error("malformed prediction payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no sample image available: {0}")]
    SampleUnavailable(String),
    #[error("request worker stopped before answering")]
    Interrupted,
}

impl SubmissionError {
    /// Text for the notification. Details only go to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::SampleUnavailable(_) => "Could not load a sample image.",
            _ => GENERIC_FAILURE,
        }
    }
}

/// Anything that can turn a photo into a prediction.
pub trait PredictionBackend: Send + Sync {
    fn predict(&self, image: &ImageSelection) -> Result<PredictionResult, SubmissionError>;
}

/// Blocking client for the prediction service.
#[derive(Debug, Clone)]
pub struct HttpPredictionClient {
    client: Client,
    endpoint: String,
    sample_endpoint: String,
}

#[derive(Deserialize)]
struct SampleReply {
    url: Option<String>,
    error: Option<String>,
}

impl HttpPredictionClient {
    pub fn new(config: &AppConfig) -> Result<Self, SubmissionError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            sample_endpoint: config.sample_endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service for one of its test photos and download it.
    pub fn random_sample(&self) -> Result<ImageSelection, SubmissionError> {
        let reply: SampleReply = serde_json::from_slice(
            &success(self.client.get(&self.sample_endpoint).send()?)?.bytes()?,
        )?;
        let path = match (reply.url, reply.error) {
            (Some(url), _) => url,
            (None, Some(err)) => return Err(SubmissionError::SampleUnavailable(err)),
            (None, None) => {
                return Err(SubmissionError::SampleUnavailable(
                    "reply carried no url".to_string(),
                ));
            }
        };
        let url = Url::parse(&self.sample_endpoint)
            .and_then(|base| base.join(&path))
            .map_err(|e| SubmissionError::SampleUnavailable(format!("{path}: {e}")))?;

        let response = success(self.client.get(url.clone()).send()?)?;
        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let file_name = url
            .path_segments()
            .and_then(|mut segs| segs.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("sample")
            .to_string();
        let mime = declared
            .filter(|m| m.starts_with("image/"))
            .or_else(|| intake::mime_for_path(Path::new(&file_name)).map(str::to_string));
        let bytes = response.bytes()?;
        intake::accept(&file_name, mime.as_deref(), bytes.to_vec().into()).ok_or_else(|| {
            SubmissionError::SampleUnavailable(format!("{file_name} is not an image"))
        })
    }
}

impl PredictionBackend for HttpPredictionClient {
    fn predict(&self, image: &ImageSelection) -> Result<PredictionResult, SubmissionError> {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        tracing::info!("submitting {} to {}", image.file_name, self.endpoint);
        let response = success(self.client.post(&self.endpoint).multipart(form).send()?)?;
        let body = response.bytes()?;
        Ok(PredictionResult::from_slice(&body)?)
    }
}

fn success(response: Response) -> Result<Response, SubmissionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(SubmissionError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    /// Serve the given responses, one per connection, and hand back what
    /// each request looked like.
    fn serve(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut stream);
                let _ = stream.write_all(response.as_bytes());
                let _ = tx.send(request);
            }
        });
        (format!("http://{addr}"), rx)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut buf) else { break };
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let expected = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= head_end + 4 + expected {
                break;
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn reply(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn client_for(base: &str) -> HttpPredictionClient {
        let config = AppConfig {
            endpoint: format!("{base}/predict"),
            sample_endpoint: format!("{base}/random_test_car"),
            ..AppConfig::default()
        };
        HttpPredictionClient::new(&config).unwrap()
    }

    fn photo() -> ImageSelection {
        ImageSelection {
            file_name: "audi.jpg".into(),
            mime: "image/jpeg".into(),
            bytes: Arc::from(&b"not-really-a-jpeg"[..]),
        }
    }

    const BODY: &str = r#"{"car":"Audi_A4_Sedan_2012","year":2012,"confidence":{"model":0.92,"year":0.81},"engine":{"bhp":{"value":208,"confidence":0.8}}}"#;

    #[test]
    fn posts_single_multipart_field() {
        let (base, requests) = serve(vec![reply("200 OK", "application/json", BODY)]);
        let result = client_for(&base).predict(&photo()).unwrap();
        assert_eq!(result.subject, "Audi_A4_Sedan_2012");

        let request = requests.recv().unwrap();
        assert!(request.starts_with("POST /predict "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"audi.jpg\""));
        assert!(request.contains("not-really-a-jpeg"));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let (base, _requests) = serve(vec![reply(
            "500 Internal Server Error",
            "application/json",
            r#"{"detail":"boom"}"#,
        )]);
        let err = client_for(&base).predict(&photo()).unwrap_err();
        assert!(matches!(err, SubmissionError::Status(s) if s.as_u16() == 500));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let (base, _requests) = serve(vec![reply("200 OK", "text/html", "<html></html>")]);
        let err = client_for(&base).predict(&photo()).unwrap_err();
        assert!(matches!(err, SubmissionError::Parse(_)));
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let err = client_for(&base).predict(&photo()).unwrap_err();
        assert!(matches!(err, SubmissionError::Transport(_)));
    }

    #[test]
    fn random_sample_follows_relative_url() {
        let (base, requests) = serve(vec![
            reply("200 OK", "application/json", r#"{"url":"/static/test_cars/golf.png"}"#),
            reply("200 OK", "image/png", "pngbytes"),
        ]);
        let sample = client_for(&base).random_sample().unwrap();
        assert_eq!(sample.file_name, "golf.png");
        assert_eq!(sample.mime, "image/png");
        assert_eq!(&*sample.bytes, b"pngbytes");
        assert!(requests.recv().unwrap().starts_with("GET /random_test_car "));
        assert!(requests.recv().unwrap().starts_with("GET /static/test_cars/golf.png "));
    }

    #[test]
    fn random_sample_reports_service_error() {
        let (base, _requests) = serve(vec![reply(
            "200 OK",
            "application/json",
            r#"{"error":"No images found"}"#,
        )]);
        let err = client_for(&base).random_sample().unwrap_err();
        assert!(matches!(err, SubmissionError::SampleUnavailable(ref m) if m == "No images found"));
    }
}
