use std::io::Cursor;
use std::sync::Arc;

use tessera::config::Config;
use tessera::http::connection::{Connection, Service};
use tessera::http::mime::MimeType;
use tessera::http::request::Method;
use tessera::http::response::{Response, StatusCode};
use tessera::routing::{CompiledPath, Router, handler};

const BODY_LIMIT: usize = 16;

fn router() -> Router {
    let mut router = Router::new();
    router
        .add_route(
            "page",
            CompiledPath::new("/a").unwrap(),
            handler(|_req| Ok(Response::text(StatusCode::Ok, "page a"))),
            vec![Method::GET, Method::POST],
            vec![MimeType::text()],
        )
        .unwrap();
    router
        .add_route(
            "echo",
            CompiledPath::new("/echo").unwrap(),
            handler(|req| {
                let body = req.read_body(BODY_LIMIT)?;
                Ok(Response::ok(body))
            }),
            vec![Method::POST],
            vec![],
        )
        .unwrap();
    router
        .add_route(
            "utf8",
            CompiledPath::new("/utf8").unwrap(),
            handler(|req| {
                let text = req.read_body_string(BODY_LIMIT)?;
                Ok(Response::ok(text))
            }),
            vec![Method::POST],
            vec![],
        )
        .unwrap();
    router
        .add_route(
            "broken",
            CompiledPath::new("/broken").unwrap(),
            handler(|_req| Err(anyhow::anyhow!("handler exploded"))),
            vec![Method::GET],
            vec![],
        )
        .unwrap();
    router
}

fn serve(input: &[u8]) -> String {
    let service = Arc::new(Service::from_config(&Config::default(), router()));
    let mut conn = Connection::new(Cursor::new(input.to_vec()), Vec::new(), None, service);
    conn.run().unwrap();
    String::from_utf8_lossy(&conn.into_output()).into_owned()
}

fn status_lines(output: &str) -> Vec<&str> {
    output
        .split("\r\n")
        .filter(|line| line.starts_with("HTTP/1."))
        .collect()
}

#[test]
fn test_pipelined_requests() {
    let output = serve(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /a HTTP/1.1\r\nHost: x\r\n\r\n");

    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK", "HTTP/1.1 200 OK"]);
    assert_eq!(output.matches("page a").count(), 2);
    assert!(output.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(output.contains("Date: "));
    assert!(output.contains("Server: tessera/"));
}

#[test]
fn test_malformed_request_gets_400_and_close() {
    let output = serve(b"BROKEN\r\n\r\nGET /a HTTP/1.1\r\n\r\n");

    assert_eq!(status_lines(&output), ["HTTP/1.1 400 Bad Request"]);
    assert!(output.contains("Connection: close\r\n"));
}

#[test]
fn test_unsupported_version_gets_505() {
    let output = serve(b"GET /a HTTP/3.0\r\n\r\n");
    assert_eq!(status_lines(&output), ["HTTP/1.1 505 HTTP Version Not Supported"]);
}

#[test]
fn test_ambiguous_framing_closes_silently() {
    let output = serve(
        b"POST /echo HTTP/1.1\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n",
    );
    assert!(output.is_empty());
}

#[test]
fn test_truncated_head_closes_silently() {
    assert!(serve(b"GET /a HTTP/1.1\r\nHost: x").is_empty());
    assert!(serve(b"").is_empty());
}

#[test]
fn test_not_found_keeps_connection_open() {
    let output = serve(b"GET /missing HTTP/1.1\r\n\r\nGET /a HTTP/1.1\r\n\r\n");

    assert_eq!(
        status_lines(&output),
        ["HTTP/1.1 404 Not Found", "HTTP/1.1 200 OK"]
    );
    assert!(output.contains("404 Not Found"));
}

#[test]
fn test_unacceptable_type_is_404() {
    let output = serve(b"GET /a HTTP/1.1\r\nAccept: image/png\r\n\r\n");
    assert_eq!(status_lines(&output), ["HTTP/1.1 404 Not Found"]);
}

#[test]
fn test_handler_error_is_500() {
    let output = serve(b"GET /broken HTTP/1.1\r\n\r\nGET /a HTTP/1.1\r\n\r\n");

    assert_eq!(
        status_lines(&output),
        ["HTTP/1.1 500 Internal Server Error", "HTTP/1.1 200 OK"]
    );
    assert!(output.contains("500 Internal Server Error"));
}

#[test]
fn test_unread_body_is_drained() {
    let output = serve(b"POST /a HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloGET /a HTTP/1.1\r\n\r\n");
    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK", "HTTP/1.1 200 OK"]);
}

#[test]
fn test_unread_chunked_body_is_drained() {
    let output = serve(
        b"POST /a HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nskip\r\n0\r\n\r\nGET /a HTTP/1.1\r\n\r\n",
    );
    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK", "HTTP/1.1 200 OK"]);
}

#[test]
fn test_chunked_echo() {
    let output = serve(
        b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n3\r\ndef\r\n0\r\n\r\n",
    );

    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK"]);
    assert!(output.contains("Content-Length: 6\r\n"));
    assert!(output.ends_with("\r\n\r\nabcdef"));
}

#[test]
fn test_body_too_large_is_413_and_closes() {
    let output = serve(
        b"POST /echo HTTP/1.1\r\nContent-Length: 20\r\n\r\n01234567890123456789GET /a HTTP/1.1\r\n\r\n",
    );

    assert_eq!(status_lines(&output), ["HTTP/1.1 413 Payload Too Large"]);
    assert!(output.contains("Connection: close\r\n"));
}

#[test]
fn test_invalid_utf8_body_is_400_but_persists() {
    let mut input = b"POST /utf8 HTTP/1.1\r\nContent-Length: 2\r\n\r\n".to_vec();
    input.extend_from_slice(&[0xC3, 0x28]);
    input.extend_from_slice(b"GET /a HTTP/1.1\r\n\r\n");

    let output = serve(&input);
    assert_eq!(
        status_lines(&output),
        ["HTTP/1.1 400 Bad Request", "HTTP/1.1 200 OK"]
    );
}

#[test]
fn test_corrupt_chunk_in_handler_closes_silently() {
    let output = serve(b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nabc\r\n0\r\n\r\n");
    assert!(output.is_empty());
}

#[test]
fn test_overlong_chunk_extension_closes_silently() {
    let mut input = b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3;ext=".to_vec();
    input.extend(std::iter::repeat_n(b'x', 9000));
    input.extend_from_slice(b"\r\nabc\r\n0\r\n\r\n");

    assert!(serve(&input).is_empty());
}

#[test]
fn test_malformed_trailer_closes_silently() {
    let output = serve(
        b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\nX-Sum: 1\r\n folded\r\n\r\n",
    );
    assert!(output.is_empty());

    let output = serve(
        b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\nno colon here\r\n\r\n",
    );
    assert!(output.is_empty());
}

#[test]
fn test_chunked_applied_twice_gets_400_and_close() {
    let output = serve(
        b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked, chunked\r\n\r\nf\r\n5\r\nhello\r\n0\r\n\r\n\r\n0\r\n\r\n",
    );
    assert_eq!(status_lines(&output), ["HTTP/1.1 400 Bad Request"]);
    assert!(output.contains("Connection: close\r\n"));
    assert!(!output.contains("hello"));
}

#[test]
fn test_http10_closes_after_response() {
    let output = serve(b"GET /a HTTP/1.0\r\n\r\nGET /a HTTP/1.0\r\n\r\n");

    assert_eq!(status_lines(&output), ["HTTP/1.0 200 OK"]);
    assert!(output.contains("Connection: close\r\n"));
}

#[test]
fn test_connection_close_request() {
    let output = serve(b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\nGET /a HTTP/1.1\r\n\r\n");
    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK"]);
}

#[test]
fn test_head_request_served_by_get_route() {
    let output = serve(b"HEAD /a HTTP/1.1\r\n\r\n");

    assert_eq!(status_lines(&output), ["HTTP/1.1 200 OK"]);
    assert!(output.contains("Content-Length: 6\r\n"));
    assert!(output.ends_with("\r\n\r\n"));
}

#[test]
fn test_oversized_header_line_is_431() {
    let config = Config {
        max_line_length: 64,
        ..Config::default()
    };
    let service = Arc::new(Service::from_config(&config, router()));
    let mut input = b"GET /a HTTP/1.1\r\nX-Big: ".to_vec();
    input.extend(std::iter::repeat_n(b'a', 200));
    input.extend_from_slice(b"\r\n\r\n");

    let mut conn = Connection::new(Cursor::new(input), Vec::new(), None, service);
    conn.run().unwrap();
    let output = String::from_utf8(conn.into_output()).unwrap();

    assert!(output.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
}
