use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::http::error::HttpError;
use crate::http::parser::RequestParser;
use crate::http::preparer::ResponsePreparer;
use crate::http::reader::LineReader;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::routing::router::Router;

/// Everything a connection needs to serve requests. Built once at startup and
/// shared read-only between connections.
pub struct Service {
    pub parser: RequestParser,
    pub router: Arc<Router>,
    pub preparer: ResponsePreparer,
    pub writer: ResponseWriter,
    pub line_limit: usize,
}

impl Service {
    pub fn new(
        parser: RequestParser,
        router: Arc<Router>,
        preparer: ResponsePreparer,
        writer: ResponseWriter,
        line_limit: usize,
    ) -> Self {
        Self {
            parser,
            router,
            preparer,
            writer,
            line_limit,
        }
    }

    pub fn from_config(config: &Config, router: Router) -> Self {
        Self::new(
            RequestParser::new(config.max_headers),
            Arc::new(router),
            ResponsePreparer::new(config.server_name.clone()),
            ResponseWriter::new(config.compression),
            config.max_line_length,
        )
    }
}

pub enum ConnectionState {
    Open,
    Closed,
}

/// One client connection, serving requests strictly one after another.
pub struct Connection<R, W> {
    reader: LineReader<R>,
    output: W,
    peer: Option<SocketAddr>,
    scheme: String,
    port: u16,
    service: Arc<Service>,
}

impl<R: Read, W: Write> Connection<R, W> {
    pub fn new(input: R, output: W, peer: Option<SocketAddr>, service: Arc<Service>) -> Self {
        Self {
            reader: LineReader::new(input).with_line_limit(service.line_limit),
            output,
            peer,
            scheme: "http".to_string(),
            port: 80,
            service,
        }
    }

    /// Local port and scheme copied onto every request.
    pub fn with_local(mut self, scheme: impl Into<String>, port: u16) -> Self {
        self.scheme = scheme.into();
        self.port = port;
        self
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match self.serve_next()? {
                ConnectionState::Open => continue,
                ConnectionState::Closed => break,
            }
        }
        self.output.flush()?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Reads one request, answers it, and reports whether another may follow.
    pub fn serve_next(&mut self) -> anyhow::Result<ConnectionState> {
        if !self.reader.has_data()? {
            return Ok(ConnectionState::Closed);
        }

        let Connection {
            reader,
            output,
            peer,
            scheme,
            port,
            service,
        } = self;
        let peer_label = peer.map(|p| p.to_string()).unwrap_or_default();

        let mut request = match service.parser.parse(reader) {
            Ok(request) => request,
            Err(e) => {
                if e.is_silent() {
                    tracing::warn!(peer = %peer_label, error = %e, "Closing connection on unreadable request");
                    return Ok(ConnectionState::Closed);
                }
                tracing::warn!(peer = %peer_label, error = %e, "Rejecting malformed request");
                let mut response = Response::for_status(e.status());
                service.preparer.prepare(None, &mut response);
                service.writer.write(output, None, response)?;
                return Ok(ConnectionState::Closed);
            }
        };

        request.remote_addr = *peer;
        request.scheme = scheme.clone();
        request.port = *port;

        let mut close_after = false;
        let mut response = match service.router.handle(&mut request) {
            Ok(response) => response,
            Err(err) => match err.downcast_ref::<HttpError>() {
                Some(e) if e.is_silent() => {
                    tracing::warn!(
                        peer = %peer_label,
                        method = %request.method,
                        path = %request.path,
                        error = %e,
                        "Closing connection on unreadable request body"
                    );
                    return Ok(ConnectionState::Closed);
                }
                Some(e) => {
                    tracing::debug!(method = %request.method, path = %request.path, error = %e, "Request failed");
                    close_after = e.closes_connection();
                    Response::for_status(e.status())
                }
                None => {
                    tracing::error!(
                        method = %request.method,
                        path = %request.path,
                        error = %err,
                        "Handler failed"
                    );
                    Response::for_status(StatusCode::InternalServerError)
                }
            },
        };

        if close_after {
            response.headers.set("connection", "close");
        }

        service.preparer.prepare(Some(&request), &mut response);
        let keep_alive = service.writer.write(output, Some(&request), response)?;

        if !keep_alive {
            return Ok(ConnectionState::Closed);
        }

        // The next request starts where this body ends.
        if let Err(e) = request.discard_body() {
            tracing::warn!(peer = %peer_label, error = %e, "Failed to drain request body");
            return Ok(ConnectionState::Closed);
        }
        Ok(ConnectionState::Open)
    }
}
