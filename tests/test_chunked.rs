use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use tessera::http::body::{BodyRead, BodySink, WireSink};
use tessera::http::chunked::{ChunkedDecoder, ChunkedSink, parse_chunk_size};
use tessera::http::encoding::{Coding, decoder_stack, parse_codings};
use tessera::http::error::HttpError;
use tessera::http::headers::HeaderParser;
use tessera::http::reader::LineReader;

fn reader(bytes: &[u8]) -> LineReader<Cursor<Vec<u8>>> {
    LineReader::new(Cursor::new(bytes.to_vec()))
}

fn read_all(body: &mut dyn BodyRead) -> Result<Vec<u8>, HttpError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = body.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

fn chunk_encode(parts: &[&[u8]]) -> Vec<u8> {
    let mut wire = Vec::new();
    {
        let mut sink = ChunkedSink::new(Box::new(WireSink::new(&mut wire)));
        for part in parts {
            sink.write_all(part).unwrap();
        }
        sink.finish().unwrap();
    }
    wire
}

#[test]
fn test_decode_simple_chunks() {
    let mut r = reader(b"5\r\nHello\r\n7\r\n, world\r\n0\r\n\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert_eq!(read_all(&mut decoder).unwrap(), b"Hello, world");
}

#[test]
fn test_read_stops_at_chunk_boundary() {
    let mut r = reader(b"3\r\nabc\r\n3\r\ndef\r\n0\r\n\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    let mut buf = [0u8; 10];
    assert_eq!(decoder.read(&mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn test_hex_sizes_and_extensions() {
    let mut body = b"A;name=value;flag\r\n".to_vec();
    body.extend_from_slice(b"0123456789\r\n0\r\n\r\n");
    let mut r = reader(&body);
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert_eq!(read_all(&mut decoder).unwrap(), b"0123456789");
}

#[test]
fn test_trailers_are_collected() {
    let mut r = reader(b"2\r\nhi\r\n0\r\nX-Checksum: abc\r\nX-Other: 1\r\n\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert_eq!(read_all(&mut decoder).unwrap(), b"hi");

    let trailers = decoder.take_trailers().unwrap();
    assert_eq!(trailers.get("x-checksum"), Some("abc"));
    assert_eq!(trailers.get("x-other"), Some("1"));
}

#[test]
fn test_next_message_untouched() {
    let mut r = reader(b"2\r\nhi\r\n0\r\n\r\nGET / HTTP/1.1\r\n");
    {
        let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
        assert_eq!(read_all(&mut decoder).unwrap(), b"hi");
    }
    assert_eq!(r.read_line().unwrap(), "GET / HTTP/1.1");
}

#[test]
fn test_parse_chunk_size() {
    assert_eq!(parse_chunk_size("0").unwrap(), 0);
    assert_eq!(parse_chunk_size("ff").unwrap(), 255);
    assert_eq!(parse_chunk_size("1A;ext=1").unwrap(), 26);

    for bad in ["", "xyz", "-5", "+5", " 5", "ffffffffffffffffff"] {
        assert!(
            matches!(parse_chunk_size(bad), Err(HttpError::InvalidChunkSize(_))),
            "accepted {:?}",
            bad
        );
    }
}

#[test]
fn test_invalid_size_line_fails_read() {
    let mut r = reader(b"zz\r\nabc\r\n0\r\n\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert!(matches!(read_all(&mut decoder), Err(HttpError::InvalidChunkSize(_))));
}

#[test]
fn test_truncated_chunk_data() {
    let mut r = reader(b"a\r\nshort");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    let err = read_all(&mut decoder).unwrap_err();
    assert!(matches!(err, HttpError::TruncatedBody));
    assert!(err.is_silent());
}

#[test]
fn test_missing_terminal_chunk() {
    let mut r = reader(b"2\r\nhi\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert!(matches!(read_all(&mut decoder), Err(HttpError::TruncatedBody)));
}

#[test]
fn test_data_without_crlf() {
    let mut r = reader(b"2\r\nhiXX0\r\n\r\n");
    let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
    assert!(matches!(read_all(&mut decoder), Err(HttpError::MalformedChunk)));
}

#[test]
fn test_encode_wire_format() {
    assert_eq!(chunk_encode(&[&b"Hello"[..], b"", b"0123456789abcdef"]), b"5\r\nHello\r\n10\r\n0123456789abcdef\r\n0\r\n\r\n");
    assert_eq!(chunk_encode(&[]), b"0\r\n\r\n");
}

#[test]
fn test_round_trip() {
    let large: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let cases: Vec<Vec<&[u8]>> = vec![
        vec![],
        vec![&b"single"[..]],
        vec![&b"one"[..], &b"two"[..], &b"three"[..]],
        vec![&large[..9000], &large[9000..]],
    ];

    for parts in cases {
        let expected: Vec<u8> = parts.concat();
        let wire = chunk_encode(&parts);

        let mut r = reader(&wire);
        let mut decoder = ChunkedDecoder::new(&mut r, HeaderParser::default());
        assert_eq!(read_all(&mut decoder).unwrap(), expected);
    }
}

#[test]
fn test_gzip_then_chunked_decodes_to_plaintext() {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(b"Hello, Cacofony!\n").unwrap();
    let compressed = gz.finish().unwrap();

    let (head, tail) = compressed.split_at(compressed.len() / 2);
    let wire = chunk_encode(&[head, tail]);

    let codings = parse_codings(&["gzip", "chunked"]).unwrap();
    assert_eq!(codings, vec![Coding::Gzip, Coding::Chunked]);

    let mut r = reader(&wire);
    let mut body = decoder_stack(&mut r, HeaderParser::default(), &codings);
    assert_eq!(read_all(body.as_mut()).unwrap(), b"Hello, Cacofony!\n");
}

#[test]
fn test_gzip_encoder_round_trip_through_chunks() {
    let mut wire = Vec::new();
    {
        let sink = Coding::Chunked.encoder(Box::new(WireSink::new(&mut wire)));
        let mut sink = Coding::Gzip.encoder(sink);
        sink.write_all(b"Hello, ").unwrap();
        sink.write_all(b"Cacofony!\n").unwrap();
        sink.finish().unwrap();
    }

    let codings = parse_codings(&["gzip", "chunked"]).unwrap();
    let mut r = reader(&wire);
    let mut body = decoder_stack(&mut r, HeaderParser::default(), &codings);
    assert_eq!(read_all(body.as_mut()).unwrap(), b"Hello, Cacofony!\n");
}

#[test]
fn test_registry_tokens() {
    assert_eq!(Coding::from_token("chunked").unwrap(), Coding::Chunked);
    assert_eq!(Coding::from_token("GZIP").unwrap(), Coding::Gzip);
    assert_eq!(Coding::from_token("*").unwrap(), Coding::Gzip);
    assert_eq!(Coding::from_token("deflate").unwrap(), Coding::Deflate);
    assert!(matches!(
        Coding::from_token("br"),
        Err(HttpError::UnsupportedEncoding(_))
    ));
}
