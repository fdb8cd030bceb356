use crate::router::HandlerResponse;
use may_minihttp::Response;
use serde_json::Value;

/// A complete response, independent of the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(status: u16, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
        }
    }

    pub fn html(body: String) -> Self {
        Self::new(200, "text/html; charset=utf-8", body.into_bytes())
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(
            status,
            "application/json",
            serde_json::to_vec(body).unwrap_or_default(),
        )
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<HandlerResponse> for Reply {
    fn from(res: HandlerResponse) -> Self {
        match res.body {
            Value::String(s) => Reply::new(res.status, "text/plain; charset=utf-8", s.into_bytes()),
            other => Reply::json(res.status, &other),
        }
    }
}

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "text/css; charset=utf-8" => "Content-Type: text/css; charset=utf-8",
        "application/javascript; charset=utf-8" => "Content-Type: application/javascript; charset=utf-8",
        "text/plain; charset=utf-8" => "Content-Type: text/plain; charset=utf-8",
        "application/json" => "Content-Type: application/json",
        "image/svg+xml" => "Content-Type: image/svg+xml",
        "image/png" => "Content-Type: image/png",
        _ => "Content-Type: application/octet-stream",
    }
}

pub fn write_reply(res: &mut Response, reply: Reply) {
    res.status_code(reply.status as usize, status_reason(reply.status));
    res.header(content_type_header(reply.content_type));
    res.body_vec(reply.body);
}
