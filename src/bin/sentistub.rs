//! Stand-in sentiment engine.
//!
//! Accepts the engine's command line (`sentidata <dir> listen <port> <mode>`)
//! and answers the request/response protocol with a small lexicon score, so
//! pools can be exercised without a JVM or language data.

use clap::Parser;
use percent_encoding::percent_decode_str;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const POSITIVE: &[&str] = &["good", "great", "happy", "love", "nice", "excellent", "wonderful"];
const NEGATIVE: &[&str] = &["bad", "awful", "sad", "hate", "terrible", "horrible", "angry"];

#[derive(Parser)]
#[command(name = "sentistub")]
#[command(about = "Lexicon-based stand-in for the sentiment engine")]
struct Args {
    /// Literal `sentidata`
    sentidata: String,
    /// Language data directory
    data_dir: PathBuf,
    /// Literal `listen`
    listen: String,
    port: u16,
    /// Output mode; only `trinary` is supported
    mode: String,

    /// Report the bound port as the positive score
    #[arg(long)]
    echo_port: bool,

    /// Keep running when SIGTERM arrives
    #[arg(long)]
    ignore_term: bool,

    /// Sleep before binding the port
    #[arg(long, default_value_t = 0)]
    startup_delay_ms: u64,
}

fn lexicon_score(text: &str) -> (i32, i32, i32) {
    let mut positive = 1;
    let mut negative = -1;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
    {
        if POSITIVE.contains(&word.as_str()) {
            positive = (positive + 1).min(5);
        } else if NEGATIVE.contains(&word.as_str()) {
            negative = (negative - 1).max(-5);
        }
    }
    let neutral = match positive + negative {
        0 => 0,
        sum if sum > 0 => 1,
        _ => -1,
    };
    (positive, negative, neutral)
}

fn read_request(stream: &mut TcpStream) -> io::Result<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    Ok(String::from_utf8_lossy(&request).into_owned())
}

fn handle(mut stream: TcpStream, args: &Args) -> io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let request = read_request(&mut stream)?;
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let text = percent_decode_str(path.trim_start_matches('/')).decode_utf8_lossy();

    let (positive, negative, neutral) = lexicon_score(&text);
    let positive = if args.echo_port {
        i32::from(args.port)
    } else {
        positive
    };
    stream.write_all(format!("{positive} {negative} {neutral}").as_bytes())?;
    stream.flush()
}

#[cfg(unix)]
fn ignore_sigterm() -> io::Result<()> {
    use nix::sys::signal::{SigHandler, Signal, signal};
    // SAFETY: SigIgn installs no handler code; no other thread exists yet.
    unsafe { signal(Signal::SIGTERM, SigHandler::SigIgn) }
        .map(|_| ())
        .map_err(io::Error::from)
}

#[cfg(not(unix))]
fn ignore_sigterm() -> io::Result<()> {
    Ok(())
}

fn run(args: Args) -> io::Result<()> {
    if args.sentidata != "sentidata" || args.listen != "listen" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "expected: sentidata <dir> listen <port> <mode>",
        ));
    }
    if args.mode != "trinary" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported mode {}", args.mode),
        ));
    }
    if !args.data_dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("data directory {} not found", args.data_dir.display()),
        ));
    }
    if args.ignore_term {
        ignore_sigterm()?;
    }
    if args.startup_delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(args.startup_delay_ms));
    }

    let listener = TcpListener::bind(("127.0.0.1", args.port))?;
    log::info!(target: "sentistub", "Listening on port {}", args.port);

    std::thread::scope(|scope| {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let args = &args;
                    scope.spawn(move || {
                        if let Err(e) = handle(stream, args) {
                            log::debug!(target: "sentistub", "Connection failed: {}", e);
                        }
                    });
                }
                Err(e) => log::warn!(target: "sentistub", "Accept failed: {}", e),
            }
        }
    });
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sentistub: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_text_scores_baseline() {
        assert_eq!(lexicon_score("the table is brown"), (1, -1, 0));
    }

    #[test]
    fn lexicon_words_move_scores() {
        assert_eq!(lexicon_score("A great and happy day"), (3, -1, 1));
        assert_eq!(lexicon_score("bad, sad, awful"), (1, -4, -1));
    }

    #[test]
    fn scores_are_clamped() {
        let text = "good ".repeat(20);
        assert_eq!(lexicon_score(&text).0, 5);
    }
}
