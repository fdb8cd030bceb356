//! HTTP serving on top of `may_minihttp`.
//!
//! [`DocsService`] answers `GET <endpoint>` with the rendered documentation
//! page and `GET <endpoint>/style.css|script.js` with its assets. Every other
//! request goes to the host [`Router`](crate::router::Router); unmatched
//! requests get a JSON 404.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, ParsedRequest};
pub use response::Reply;
pub use service::DocsService;
