//! In-process engine stand-in on a `std::net::TcpListener`.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Answers every connection with a fixed reply and records the request
/// lines it saw. Stops accepting when dropped.
pub(crate) struct FakeEngine {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeEngine {
    pub(crate) fn bind(port: u16, reply: &str) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port)).expect("bind fake engine");
        Self::serve(listener, reply)
    }

    pub(crate) fn any_port(reply: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake engine");
        Self::serve(listener, reply)
    }

    fn serve(listener: TcpListener, reply: &str) -> Self {
        let port = listener.local_addr().expect("local addr").port();
        listener.set_nonblocking(true).expect("nonblocking");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let reply = reply.to_string();

        let handle = {
            let requests = Arc::clone(&requests);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            if let Some(line) = answer(stream, &reply) {
                                requests.lock().unwrap().push(line);
                            }
                        }
                        Err(_) => std::thread::sleep(Duration::from_millis(5)),
                    }
                }
            })
        };

        Self {
            port,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn answer(mut stream: TcpStream, reply: &str) -> Option<String> {
    stream.set_nonblocking(false).ok()?;
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .ok()?;
    let mut request = Vec::new();
    let mut buf = [0u8; 512];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    stream.write_all(reply.as_bytes()).ok()?;
    let text = String::from_utf8_lossy(&request);
    text.lines().next().map(str::to_string)
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
