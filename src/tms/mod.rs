pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{Credentials, EndpointSet, Operation, TmsClient};
pub use error::{TransportError, TransportErrorKind};
pub use transport::{
    Download, HttpMethod, RequestBody, ReqwestTransport, Transport, TransportRequest,
    TransportResponse,
};
pub use types::{Direction, JobId, JobState};
