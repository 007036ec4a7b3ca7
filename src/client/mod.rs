//! Rate-limited client for the document registration endpoint.

mod document_client;
mod transport;

pub use document_client::DocumentClient;
pub use transport::{HttpTransport, Transport, TransportResponse, SIGNATURE_HEADER};
