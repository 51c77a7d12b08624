//! Protocol codec for the TMS job API.
//!
//! All five operations go through [`TmsClient::exchange`]. Each [`Operation`]
//! describes its method, its `fields` selector and the envelope field it
//! expects back, so the public methods only supply the per-call params and body.

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use reqwest::Url;
use serde::Deserialize;

use super::error::TransportError;
use super::transport::{
    HttpMethod, ReqwestTransport, RequestBody, Transport, TransportRequest, TransportResponse,
};
use super::types::{Direction, Envelope, JobId, JobState};
use crate::error::{ProtocolFailure, RequestContext, TmsError, mask_secret};

const ACCESS_TOKEN_HEADER: &str = "Access-Token";
const APP_TOKEN_HEADER: &str = "X-App-Token";

/// The logical TMS operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ImportRequest,
    ImportState,
    ImportDownload,
    ExportUpload,
    ExportState,
}

/// Envelope field an operation must return on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    JobId,
    StateId,
}

impl Expect {
    fn path(self) -> &'static str {
        match self {
            Expect::JobId => "data.id",
            Expect::StateId => "data.state.id",
        }
    }

    fn extract(self, envelope: &Envelope) -> Option<i64> {
        match self {
            Expect::JobId => envelope.job_id().map(|id| id.0),
            Expect::StateId => envelope.state_id(),
        }
    }
}

/// Static description of one operation.
struct OperationDef {
    method: HttpMethod,
    fields: Option<&'static str>,
    /// `None` means the body is returned raw instead of decoded.
    expect: Option<Expect>,
}

impl Operation {
    fn def(self) -> OperationDef {
        match self {
            Operation::ImportRequest | Operation::ExportUpload => OperationDef {
                method: HttpMethod::Post,
                fields: Some("id"),
                expect: Some(Expect::JobId),
            },
            Operation::ImportState | Operation::ExportState => OperationDef {
                method: HttpMethod::Get,
                fields: Some("id,state"),
                expect: Some(Expect::StateId),
            },
            Operation::ImportDownload => OperationDef {
                method: HttpMethod::Get,
                fields: None,
                expect: None,
            },
        }
    }

    /// State endpoint for a pipeline direction.
    pub fn state_of(direction: Direction) -> Self {
        match direction {
            Direction::Export => Operation::ExportState,
            Direction::Import => Operation::ImportState,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Operation::ImportRequest => "import request",
            Operation::ImportState => "import state check",
            Operation::ImportDownload => "import download",
            Operation::ExportUpload => "export upload",
            Operation::ExportState => "export state check",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Endpoint paths, appended verbatim to the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointSet {
    pub import_request: String,
    pub import_state: String,
    pub import_download: String,
    pub export_upload: String,
    pub export_state: String,
}

impl EndpointSet {
    pub fn path(&self, operation: Operation) -> &str {
        match operation {
            Operation::ImportRequest => &self.import_request,
            Operation::ImportState => &self.import_state,
            Operation::ImportDownload => &self.import_download,
            Operation::ExportUpload => &self.export_upload,
            Operation::ExportState => &self.export_state,
        }
    }
}

/// Access token plus application token, sent on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
    application_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, application_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            application_token: application_token.into(),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (ACCESS_TOKEN_HEADER.to_string(), self.access_token.clone()),
            (APP_TOKEN_HEADER.to_string(), self.application_token.clone()),
        ]
    }

    fn masked_headers(&self) -> Vec<(String, String)> {
        vec![
            (ACCESS_TOKEN_HEADER.to_string(), mask_secret(&self.access_token)),
            (APP_TOKEN_HEADER.to_string(), mask_secret(&self.application_token)),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &mask_secret(&self.access_token))
            .field("application_token", &mask_secret(&self.application_token))
            .finish()
    }
}

/// Client for the TMS job endpoints.
pub struct TmsClient<T = ReqwestTransport> {
    transport: T,
    host: String,
    endpoints: EndpointSet,
    credentials: Credentials,
    verify_download_status: bool,
}

impl TmsClient<ReqwestTransport> {
    pub fn new(
        host: impl Into<String>,
        endpoints: EndpointSet,
        credentials: Credentials,
    ) -> Result<Self, TransportError> {
        Ok(Self::with_transport(
            ReqwestTransport::new()?,
            host,
            endpoints,
            credentials,
        ))
    }
}

impl<T: Transport> TmsClient<T> {
    pub fn with_transport(
        transport: T,
        host: impl Into<String>,
        endpoints: EndpointSet,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            host: host.into(),
            endpoints,
            credentials,
            verify_download_status: true,
        }
    }

    /// When disabled, the import download writes whatever body arrives, even
    /// for a non-200 status.
    pub fn verify_download_status(mut self, verify: bool) -> Self {
        self.verify_download_status = verify;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests an import file for `languages`; returns the job id.
    pub async fn submit_import(&self, languages: &[String]) -> Result<JobId, TmsError> {
        let body = RequestBody::fields(vec![("languages".to_string(), languages.join(","))]);
        let id = self
            .perform(Operation::ImportRequest, Vec::new(), body)
            .await?;
        Ok(JobId(id))
    }

    /// Uploads the export file as the `file` multipart field; returns the job id.
    pub async fn submit_export_upload(&self, file_path: &Path) -> Result<JobId, TmsError> {
        let id = self
            .perform(
                Operation::ExportUpload,
                Vec::new(),
                RequestBody::file("file", file_path),
            )
            .await?;
        Ok(JobId(id))
    }

    /// Reads the current state of job `id`.
    pub async fn poll_state(&self, direction: Direction, id: JobId) -> Result<JobState, TmsError> {
        let raw = self
            .perform(
                Operation::state_of(direction),
                vec![("id".to_string(), id.to_string())],
                RequestBody::Empty,
            )
            .await?;
        Ok(JobState::from_raw(raw))
    }

    /// Streams the import file of job `id` to `destination`, returning the
    /// number of bytes written. A body rejected by the status check is
    /// removed again.
    pub async fn download_import_file(&self, id: JobId, destination: &Path) -> Result<u64, TmsError> {
        let (request, mut context) = self.request(
            Operation::ImportDownload,
            vec![("id".to_string(), id.to_string())],
            RequestBody::Empty,
        )?;
        let download = match self.transport.download(request, destination).await {
            Ok(download) => download,
            Err(source) => return Err(transport_failed(context, source)),
        };
        context.http_status = Some(download.status);

        if let Err(err) = self.check_status(Operation::ImportDownload, download.status, context) {
            if let Err(e) = tokio::fs::remove_file(destination).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove rejected download {}: {e}", destination.display());
                }
            }
            return Err(err);
        }
        debug!(
            "Wrote {} bytes of job {id} to {}",
            download.written,
            destination.display()
        );
        Ok(download.written)
    }

    /// Runs a JSON operation and extracts the integer its definition expects.
    async fn perform(
        &self,
        operation: Operation,
        params: Vec<(String, String)>,
        body: RequestBody,
    ) -> Result<i64, TmsError> {
        let (response, context) = self.exchange(operation, params, body).await?;
        let Some(expect) = operation.def().expect else {
            return Err(TmsError::Config(format!("{operation} has no JSON result")));
        };

        let envelope: Envelope = serde_json::from_slice(&response.body).map_err(|e| {
            TmsError::Protocol {
                context: Box::new(context.clone()),
                failure: ProtocolFailure::MalformedBody(e.to_string()),
            }
        })?;

        expect.extract(&envelope).ok_or_else(|| TmsError::Protocol {
            context: Box::new(context),
            failure: ProtocolFailure::MissingField(expect.path()),
        })
    }

    /// Sends one request and enforces the status contract. Returns the raw
    /// response together with the diagnostics context used for errors.
    async fn exchange(
        &self,
        operation: Operation,
        params: Vec<(String, String)>,
        body: RequestBody,
    ) -> Result<(TransportResponse, RequestContext), TmsError> {
        let (request, mut context) = self.request(operation, params, body)?;
        let response = match self.transport.perform(request).await {
            Ok(response) => response,
            Err(source) => return Err(transport_failed(context, source)),
        };
        context.http_status = Some(response.status);

        let context = self.check_status(operation, response.status, context)?;
        Ok((response, context))
    }

    /// Resolves the URL and headers of `operation` and the masked context
    /// describing it.
    fn request(
        &self,
        operation: Operation,
        mut params: Vec<(String, String)>,
        body: RequestBody,
    ) -> Result<(TransportRequest, RequestContext), TmsError> {
        let def = operation.def();
        if let Some(fields) = def.fields {
            params.push(("fields".to_string(), fields.to_string()));
        }
        let endpoint = self.endpoints.path(operation);
        let url = self.url(endpoint, &params)?;
        let context = RequestContext {
            operation,
            endpoint: endpoint.to_string(),
            method: def.method,
            params,
            headers: self.credentials.masked_headers(),
            http_status: None,
        };

        debug!("{} {url}", def.method);
        let request = TransportRequest {
            method: def.method,
            url,
            headers: self.credentials.headers(),
            body,
        };
        Ok((request, context))
    }

    fn check_status(
        &self,
        operation: Operation,
        status: u16,
        context: RequestContext,
    ) -> Result<RequestContext, TmsError> {
        let must_be_ok = operation.def().expect.is_some() || self.verify_download_status;
        if must_be_ok && status != 200 {
            return Err(TmsError::Protocol {
                context: Box::new(context),
                failure: ProtocolFailure::Status(status),
            });
        }
        Ok(context)
    }

    fn url(&self, endpoint: &str, params: &[(String, String)]) -> Result<Url, TmsError> {
        let raw = format!("{}{}", self.host, endpoint);
        let mut url =
            Url::parse(&raw).map_err(|e| TmsError::Config(format!("invalid URL `{raw}`: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

fn transport_failed(mut context: RequestContext, source: TransportError) -> TmsError {
    context.http_status = source.status;
    TmsError::Transport {
        context: Box::new(context),
        source,
    }
}
