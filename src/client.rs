//! Request/response client for one running engine.
//!
//! The engine speaks a minimal HTTP/1.0-shaped protocol: the text travels
//! percent-encoded in the request path and the reply is a single buffer
//! holding three whitespace-separated integers (positive, negative,
//! neutral). Every call opens and closes its own connection.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Largest reply read from an engine.
pub const RESPONSE_LIMIT: usize = 4096;

/// Characters left unescaped in the request path (RFC 3986 unreserved plus `/`).
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Sentiment scores for one text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreResult {
    pub positive: i32,
    pub negative: i32,
    pub neutral: i32,
}

impl ScoreResult {
    pub fn new(positive: i32, negative: i32, neutral: i32) -> Self {
        Self {
            positive,
            negative,
            neutral,
        }
    }
}

/// Stateless client; cheap to clone and share across dispatch threads.
#[derive(Debug, Clone)]
pub struct TextScoreClient {
    host: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl Default for TextScoreClient {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl TextScoreClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            host: config.host.clone(),
            connect_timeout: config.connect_timeout(),
            io_timeout: config.io_timeout(),
        }
    }

    /// Same client with a different read/write timeout.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Score one text item against the engine listening on `port`.
    ///
    /// # Errors
    /// - [`ClientError::Unreachable`] if nothing accepts the connection
    /// - [`ClientError::Io`] if the exchange fails after connecting
    /// - [`ClientError::Malformed`] if the reply is not three integers
    pub fn score(&self, port: u16, text: &str) -> ClientResult<ScoreResult> {
        let mut stream = self.connect(port)?;
        let io_err = |source| ClientError::Io { port, source };

        stream
            .set_read_timeout(Some(self.io_timeout))
            .map_err(io_err)?;
        stream
            .set_write_timeout(Some(self.io_timeout))
            .map_err(io_err)?;

        stream
            .write_all(build_request(text).as_bytes())
            .map_err(io_err)?;
        stream.flush().map_err(io_err)?;

        let response = read_response(&mut stream).map_err(io_err)?;
        let scores = parse_scores(port, &String::from_utf8_lossy(&response))?;

        log::trace!(
            target: "sentipool::client",
            "port {} scored {:?}",
            port,
            scores
        );
        Ok(scores)
    }

    fn connect(&self, port: u16) -> ClientResult<TcpStream> {
        let unreachable = |source| ClientError::Unreachable { port, source };
        let addrs = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(unreachable)?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(e),
            }
        }
        Err(unreachable(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve", self.host),
            )
        })))
    }
}

/// Build the request line for one text item.
pub(crate) fn build_request(text: &str) -> String {
    format!(
        "GET /{} HTTP/1.0\r\n\r\n",
        utf8_percent_encode(text, PATH_SAFE)
    )
}

/// Read one bounded reply.
///
/// Stops at EOF, at [`RESPONSE_LIMIT`] bytes, once the bytes read form three
/// integer fields, or when a read times out after some data has arrived.
/// Engines that keep the socket open after replying are served without
/// waiting for the timeout.
fn read_response<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(64);
    let mut chunk = [0u8; 512];
    while buf.len() < RESPONSE_LIMIT {
        let want = chunk.len().min(RESPONSE_LIMIT - buf.len());
        match reader.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if is_complete_reply(&buf) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e)
                if !buf.is_empty()
                    && matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
            {
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(buf)
}

/// True once the bytes hold exactly three integer fields.
fn is_complete_reply(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let fields: Vec<&str> = text.split_whitespace().collect();
    fields.len() == 3 && fields.iter().all(|f| f.parse::<i32>().is_ok())
}

/// Map a reply positionally onto (positive, negative, neutral).
pub(crate) fn parse_scores(port: u16, raw: &str) -> ClientResult<ScoreResult> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    let [positive, negative, neutral] = fields.as_slice() else {
        return Err(ClientError::malformed(port, raw));
    };

    let parse = |field: &str| {
        field
            .parse::<i32>()
            .map_err(|_| ClientError::malformed(port, raw))
    };
    Ok(ScoreResult::new(
        parse(*positive)?,
        parse(*negative)?,
        parse(*neutral)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    /// Accept one connection, capture the request line, reply with `reply`.
    fn one_shot_engine(reply: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            reader.get_mut().write_all(reply.as_bytes()).unwrap();
            line
        });
        (port, handle)
    }

    #[test]
    fn encodes_text_as_request_path() {
        assert_eq!(
            build_request("I love it!"),
            "GET /I%20love%20it%21 HTTP/1.0\r\n\r\n"
        );
        assert_eq!(build_request("a/b-c_d.e~f"), "GET /a/b-c_d.e~f HTTP/1.0\r\n\r\n");
        assert_eq!(build_request("café"), "GET /caf%C3%A9 HTTP/1.0\r\n\r\n");
    }

    #[test]
    fn parses_three_integer_fields() {
        assert_eq!(
            parse_scores(1, "4 -1 1\n").unwrap(),
            ScoreResult::new(4, -1, 1)
        );
        assert_eq!(
            parse_scores(1, "  1\t-5  -1 ").unwrap(),
            ScoreResult::new(1, -5, -1)
        );
    }

    #[test]
    fn rejects_wrong_field_count_or_non_numeric() {
        for raw in ["", "4 -1", "4 -1 1 0", "four -1 1", "4 -1 1.5"] {
            let err = parse_scores(7, raw).unwrap_err();
            assert!(
                matches!(err, ClientError::Malformed { port: 7, .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn score_round_trips_through_a_listener() {
        let (port, engine) = one_shot_engine("3 -2 1");
        let client = TextScoreClient::default();

        let scores = client.score(port, "good day").unwrap();

        assert_eq!(scores, ScoreResult::new(3, -2, 1));
        assert_eq!(engine.join().unwrap(), "GET /good%20day HTTP/1.0\r\n");
    }

    #[test]
    fn malformed_reply_is_reported() {
        let (port, engine) = one_shot_engine("<html>oops</html>");
        let err = TextScoreClient::default().score(port, "x").unwrap_err();
        engine.join().unwrap();

        assert!(matches!(err, ClientError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn reply_on_connection_left_open_is_returned_without_waiting() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let _ = stream.read(&mut buf).unwrap();
            stream.write_all(b"3 -2 1").unwrap();
            // Hold the socket open well past the client's answer
            thread::sleep(Duration::from_millis(2500));
        });
        let client = TextScoreClient::new(&ClientConfig {
            io_timeout_ms: 10_000,
            ..ClientConfig::default()
        });

        let started = std::time::Instant::now();
        let scores = client.score(port, "good day").unwrap();

        assert_eq!(scores, ScoreResult::new(3, -2, 1));
        assert!(
            started.elapsed() < Duration::from_millis(2000),
            "took {:?}",
            started.elapsed()
        );
        engine.join().unwrap();
    }

    #[test]
    fn split_reply_is_reassembled() {
        let mut reader = io::Cursor::new(b"4 -1".to_vec()).chain(io::Cursor::new(b" 0".to_vec()));
        assert_eq!(read_response(&mut reader).unwrap(), b"4 -1 0");
    }

    #[test]
    fn oversized_reply_is_cut_at_limit() {
        let mut reader = io::Cursor::new(vec![b'x'; RESPONSE_LIMIT * 2]);
        assert_eq!(read_response(&mut reader).unwrap().len(), RESPONSE_LIMIT);
    }

    #[test]
    fn closed_port_is_unreachable() {
        // Bind then drop to obtain a port with no listener
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let err = TextScoreClient::default().score(port, "x").unwrap_err();
        assert!(err.is_unreachable(), "got {err:?}");
    }
}
