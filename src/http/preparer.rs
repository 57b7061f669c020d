use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::SystemTime;

use crate::http::mime::MimeType;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBody, StatusCode};

/// Fills in the headers every response must carry before it is written.
#[derive(Debug, Clone)]
pub struct ResponsePreparer {
    server_name: Option<String>,
}

impl ResponsePreparer {
    /// `server_name` is the `Server` header value; `None` suppresses the
    /// header.
    pub fn new(server_name: Option<String>) -> Self {
        Self { server_name }
    }

    pub fn prepare(&self, request: Option<&Request<'_>>, response: &mut Response) {
        populate(request, response);

        if !response.headers.contains("content-type") {
            let mime = response
                .content_type
                .clone()
                .unwrap_or_else(MimeType::octet_stream);
            response.headers.set("content-type", mime.to_string());
        }

        if !response.headers.contains("date") {
            response
                .headers
                .set("date", httpdate::fmt_http_date(SystemTime::now()));
        }

        if let Some(server) = &self.server_name {
            if !response.headers.contains("server") {
                response.headers.set("server", server.clone());
            }
        }

        for cookie in &response.cookies {
            response.headers.append("set-cookie", cookie.to_string());
        }
    }
}

/// Response-specific headers: the ETag and the conditional-GET outcome.
fn populate(request: Option<&Request<'_>>, response: &mut Response) {
    if !response.etag || response.headers.contains("etag") {
        return;
    }
    let ResponseBody::Bytes(body) = &response.body else {
        return;
    };

    let tag = entity_tag(body);
    response.headers.set("etag", tag.clone());

    let Some(request) = request else {
        return;
    };
    if !matches!(request.method, Method::GET | Method::HEAD) || response.status != StatusCode::Ok {
        return;
    }

    let matched = request
        .headers
        .tokens("if-none-match")
        .iter()
        .any(|candidate| *candidate == "*" || candidate.trim_start_matches("W/") == tag);
    if matched {
        tracing::debug!(etag = %tag, "Entity unchanged, answering 304");
        response.status = StatusCode::NotModified;
        response.take_body();
    }
}

/// Strong entity tag derived from the body bytes.
fn entity_tag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}-{:x}\"", hasher.finish(), body.len())
}
