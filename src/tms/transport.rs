use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};
use tokio::io::AsyncWriteExt;

use super::error::{TransportError, TransportErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Request payload. Form fields and files are sent as `multipart/form-data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<(String, PathBuf)>,
    },
}

impl RequestBody {
    pub fn fields(fields: Vec<(String, String)>) -> Self {
        RequestBody::Multipart {
            fields,
            files: Vec::new(),
        }
    }

    pub fn file(field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        RequestBody::Multipart {
            fields: Vec::new(),
            files: vec![(field.into(), path.into())],
        }
    }
}

/// A fully resolved HTTP request: absolute URL with query, headers and body.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// Status and raw body of an HTTP exchange, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Status of an exchange whose body went straight to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Download {
    pub status: u16,
    /// Bytes written to the destination.
    pub written: u64,
}

fn local_file_error(path: &Path, status: u16, err: std::io::Error) -> TransportError {
    TransportError {
        status: Some(status),
        ..TransportError::new(
            TransportErrorKind::LocalFile,
            format!("{}: {err}", path.display()),
        )
    }
}

/// Performs a single HTTP exchange.
///
/// Implementations must not retry and must not judge the status code.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Performs the exchange and writes the body verbatim to `destination`,
    /// whatever the status. The default buffers the body in memory first.
    async fn download(
        &self,
        request: TransportRequest,
        destination: &Path,
    ) -> Result<Download, TransportError> {
        let response = self.perform(request).await?;
        tokio::fs::write(destination, &response.body)
            .await
            .map_err(|e| local_file_error(destination, response.status, e))?;
        Ok(Download {
            status: response.status,
            written: response.body.len() as u64,
        })
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// Only the connect phase is bounded. Export jobs can upload large files and
/// import downloads can be slow, so the overall request has no timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    async fn multipart_form(
        fields: Vec<(String, String)>,
        files: Vec<(String, PathBuf)>,
    ) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        for (name, path) in files {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                TransportError::new(
                    TransportErrorKind::LocalFile,
                    format!("{}: {e}", path.display()),
                )
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            form = form.part(name, Part::bytes(bytes).file_name(file_name));
        }
        Ok(form)
    }

    async fn builder(&self, request: TransportRequest) -> Result<RequestBuilder, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url),
            HttpMethod::Post => self.client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let RequestBody::Multipart { fields, files } = request.body {
            builder = builder.multipart(Self::multipart_form(fields, files).await?);
        }
        Ok(builder)
    }
}

impl Transport for ReqwestTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = self.builder(request).await?.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| TransportError {
            status: Some(status),
            ..TransportError::from(e)
        })?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }

    /// Streams the body chunk by chunk into `destination`.
    async fn download(
        &self,
        request: TransportRequest,
        destination: &Path,
    ) -> Result<Download, TransportError> {
        let mut response = self.builder(request).await?.send().await?;
        let status = response.status().as_u16();

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| local_file_error(destination, status, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| TransportError {
            status: Some(status),
            ..TransportError::from(e)
        })? {
            file.write_all(&chunk)
                .await
                .map_err(|e| local_file_error(destination, status, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| local_file_error(destination, status, e))?;

        Ok(Download { status, written })
    }
}
