//! Liveness checks for engine ports.

use crate::client::TextScoreClient;
use crate::config::ClientConfig;

/// Decides whether a port currently hosts a responsive engine by scoring a
/// fixed probe text through [`TextScoreClient`].
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: TextScoreClient,
    probe_text: String,
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl HealthProbe {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: TextScoreClient::new(config).with_io_timeout(config.liveness_timeout()),
            probe_text: config.probe_text.clone(),
        }
    }

    /// True iff the probe text was scored successfully. Never fails; any
    /// client error counts as "not live".
    pub fn exists(&self, port: u16) -> bool {
        match self.client.score(port, &self.probe_text) {
            Ok(_) => true,
            Err(e) => {
                log::trace!(target: "sentipool::probe", "port {} not live: {}", port, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn responsive_port_exists() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let _ = stream.read(&mut buf).unwrap();
            stream.write_all(b"1 -1 0").unwrap();
        });

        assert!(HealthProbe::default().exists(port));
        engine.join().unwrap();
    }

    #[test]
    fn garbage_reply_does_not_count_as_live() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 256];
            let _ = stream.read(&mut buf).unwrap();
            stream.write_all(b"HTTP/1.0 404 Not Found\r\n\r\n").unwrap();
        });

        assert!(!HealthProbe::default().exists(port));
        engine.join().unwrap();
    }

    #[test]
    fn closed_port_does_not_exist() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        assert!(!HealthProbe::default().exists(port));
    }

    #[test]
    fn silent_engine_is_abandoned_after_liveness_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = thread::spawn(move || {
            // Accept and never answer
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(std::time::Duration::from_millis(1500));
            drop(stream);
        });
        let health = HealthProbe::new(&ClientConfig {
            io_timeout_ms: 30_000,
            liveness_timeout_ms: 200,
            ..ClientConfig::default()
        });

        let started = std::time::Instant::now();
        assert!(!health.exists(port));
        assert!(started.elapsed() < std::time::Duration::from_millis(1000));
        engine.join().unwrap();
    }
}
