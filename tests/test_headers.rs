use std::io::Cursor;

use tessera::http::error::HttpError;
use tessera::http::headers::{HeaderMap, HeaderParser, canonical_name};
use tessera::http::reader::LineReader;

fn parse(bytes: &[u8]) -> Result<HeaderMap, HttpError> {
    let mut reader = LineReader::new(Cursor::new(bytes.to_vec()));
    HeaderParser::default().parse(&mut reader)
}

#[test]
fn test_parse_simple_block() {
    let headers = parse(b"Host: example.com\r\nUser-Agent: test\r\n\r\n").unwrap();

    assert_eq!(headers.get("host"), Some("example.com"));
    assert_eq!(headers.get("HOST"), Some("example.com"));
    assert_eq!(headers.get("user-agent"), Some("test"));
    assert_eq!(headers.len(), 2);
}

#[test]
fn test_values_are_trimmed() {
    let headers = parse(b"X-Pad:   spaced \t\r\n\r\n").unwrap();
    assert_eq!(headers.get("x-pad"), Some("spaced"));
}

#[test]
fn test_empty_value_allowed() {
    let headers = parse(b"X-Empty:\r\n\r\n").unwrap();
    assert_eq!(headers.get("x-empty"), Some(""));
}

#[test]
fn test_repeated_names_accumulate_in_order() {
    let headers = parse(b"Accept: a\r\naccept: b\r\nACCEPT: c\r\n\r\n").unwrap();
    assert_eq!(headers.get_all("accept"), ["a", "b", "c"]);
}

#[test]
fn test_space_before_colon_rejected() {
    let result = parse(b"Host : example.com\r\n\r\n");
    assert!(matches!(result, Err(HttpError::MalformedHeader(_))));
}

#[test]
fn test_missing_colon_rejected() {
    let result = parse(b"BrokenHeader\r\n\r\n");
    assert!(matches!(result, Err(HttpError::MalformedHeader(_))));
}

#[test]
fn test_obsolete_folding_rejected() {
    let result = parse(b"X-Long: first\r\n  continued\r\n\r\n");
    assert!(matches!(result, Err(HttpError::ObsoleteFolding)));

    let result = parse(b"X-Long: first\r\n\tcontinued\r\n\r\n");
    assert!(matches!(result, Err(HttpError::ObsoleteFolding)));
}

#[test]
fn test_truncated_block_is_incomplete() {
    let result = parse(b"Host: example.com\r\n");
    assert!(matches!(result, Err(HttpError::Incomplete)));
}

#[test]
fn test_too_many_headers() {
    let mut reader = LineReader::new(Cursor::new(b"A: 1\r\nB: 2\r\nC: 3\r\n\r\n".to_vec()));
    let result = HeaderParser::new(2).parse(&mut reader);
    assert!(matches!(result, Err(HttpError::TooManyHeaders { limit: 2 })));
}

#[test]
fn test_reserialize_is_idempotent() {
    let original = b"Host: example.com\r\nSet-Cookie: a=1\r\nX-Multi: one\r\nSet-Cookie: b=2\r\nX-Multi: two\r\n\r\n";
    let first = parse(original).unwrap();

    let mut wire = first.to_string().into_bytes();
    wire.extend_from_slice(b"\r\n");
    let second = parse(&wire).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.get_all("set-cookie"), ["a=1", "b=2"]);
    assert_eq!(second.get_all("x-multi"), ["one", "two"]);
}

#[test]
fn test_tokens_and_has_token() {
    let headers = parse(b"Connection: keep-alive, Upgrade\r\nConnection: TE\r\n\r\n").unwrap();
    assert_eq!(headers.tokens("connection"), ["keep-alive", "Upgrade", "TE"]);
    assert!(headers.has_token("connection", "upgrade"));
    assert!(!headers.has_token("connection", "close"));
}

#[test]
fn test_set_and_remove() {
    let mut headers = HeaderMap::new();
    headers.append("X-A", "1");
    headers.append("x-a", "2");
    headers.set("X-A", "3");
    assert_eq!(headers.get_all("x-a"), ["3"]);

    assert_eq!(headers.remove("X-A"), vec!["3".to_string()]);
    assert!(headers.is_empty());
}

#[test]
fn test_canonical_names() {
    assert_eq!(canonical_name("content-type"), "Content-Type");
    assert_eq!(canonical_name("x-request-id"), "X-Request-Id");
    assert_eq!(canonical_name("etag"), "ETag");
    assert_eq!(canonical_name("www-authenticate"), "WWW-Authenticate");
}
