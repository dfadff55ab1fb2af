//! HTTP transport adapter

mod translate;
mod transport;

pub use translate::{from_reqwest, from_status};
pub use transport::{sniff_mime, ReqwestTransport, ReqwestTransportBuilder};
