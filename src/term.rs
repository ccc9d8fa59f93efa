use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::thread;

use anyhow::{Context, Result};
use log::info;

use crate::util::DEFAULT_TERM_PORT;

/// Client for the serial console the simulator exposes on a local TCP port.
/// Plain byte relay in both directions; typing `~.` at the start of a line
/// detaches without touching the guest.
pub struct TermClient {
    pub host: String,
    pub port: u16,
}

impl TermClient {
    pub fn new(host: impl Into<String>, port: u16) -> TermClient {
        TermClient {
            host: host.into(),
            port,
        }
    }

    pub fn localhost(port: u16) -> TermClient {
        TermClient::new("127.0.0.1", port)
    }

    pub fn connect_and_relay(&self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)
            .with_context(|| format!("connecting to guest console at {}", addr))?;
        info!("connected to {} (detach with ~.)", addr);

        let mut from_guest = stream.try_clone().context("cloning console stream")?;
        let reader = thread::spawn(move || -> io::Result<()> {
            let mut stdout = io::stdout();
            let mut buffer = [0u8; 4096];
            loop {
                let n = from_guest.read(&mut buffer)?;
                if n == 0 {
                    return Ok(()); // simulator closed the console
                }
                stdout.write_all(&buffer[..n])?;
                stdout.flush()?;
            }
        });

        let result = relay_stdin(io::stdin().lock(), &stream);
        // Dropping our side unblocks the reader on most platforms; if the
        // guest half already closed, join the reader for its verdict.
        stream.shutdown(std::net::Shutdown::Both).ok();
        if let Ok(Err(e)) = reader.join() {
            if e.kind() != io::ErrorKind::ConnectionReset {
                return Err(e).context("reading from guest console");
            }
        }
        result
    }
}

/// Copy stdin to the guest until EOF or a `~.` escape at the start of a
/// line. Returns once the session is over.
fn relay_stdin(mut input: impl Read, stream: &TcpStream) -> Result<()> {
    let mut to_guest = stream;
    let mut buffer = [0u8; 1];
    let mut at_line_start = true;
    let mut saw_tilde = false;
    loop {
        let n = input.read(&mut buffer).context("reading stdin")?;
        if n == 0 {
            return Ok(());
        }
        let byte = buffer[0];
        if at_line_start && byte == b'~' && !saw_tilde {
            saw_tilde = true;
            continue;
        }
        if saw_tilde {
            saw_tilde = false;
            if byte == b'.' {
                info!("detached");
                return Ok(());
            }
            if byte == b'~' {
                // `~~` collapses to one literal tilde.
                to_guest.write_all(b"~").context("writing to guest console")?;
                at_line_start = false;
                continue;
            }
            // Not an escape after all; forward the swallowed tilde first.
            to_guest.write_all(b"~").context("writing to guest console")?;
        }
        to_guest
            .write_all(&buffer[..1])
            .context("writing to guest console")?;
        at_line_start = byte == b'\n' || byte == b'\r';
    }
}

pub fn default_client() -> TermClient {
    TermClient::localhost(DEFAULT_TERM_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::TcpListener;

    fn echo_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn read_sent(server: &mut TcpStream) -> Vec<u8> {
        let mut sent = Vec::new();
        server.read_to_end(&mut sent).unwrap();
        sent
    }

    #[test]
    fn test_relay_forwards_bytes_until_eof() {
        let (client, mut server) = echo_pair();
        relay_stdin(Cursor::new(b"ls -l\n".to_vec()), &client).unwrap();
        drop(client);
        assert_eq!(read_sent(&mut server), b"ls -l\n");
    }

    #[test]
    fn test_tilde_dot_detaches_without_forwarding() {
        let (client, mut server) = echo_pair();
        relay_stdin(Cursor::new(b"echo hi\n~.after".to_vec()), &client).unwrap();
        drop(client);
        assert_eq!(read_sent(&mut server), b"echo hi\n");
    }

    #[test]
    fn test_mid_line_tilde_is_forwarded() {
        let (client, mut server) = echo_pair();
        relay_stdin(Cursor::new(b"a~.b\n".to_vec()), &client).unwrap();
        drop(client);
        assert_eq!(read_sent(&mut server), b"a~.b\n");
    }

    #[test]
    fn test_escaped_tilde_forwards_literal() {
        // `~x` at line start is not an escape; both bytes reach the guest.
        let (client, mut server) = echo_pair();
        relay_stdin(Cursor::new(b"~x\n".to_vec()), &client).unwrap();
        drop(client);
        assert_eq!(read_sent(&mut server), b"~x\n");
    }

    #[test]
    fn test_doubled_tilde_collapses_to_one() {
        let (client, mut server) = echo_pair();
        relay_stdin(Cursor::new(b"~~ls\n".to_vec()), &client).unwrap();
        drop(client);
        assert_eq!(read_sent(&mut server), b"~ls\n");
    }

    #[test]
    fn test_connect_refused_is_reported() {
        // Port 1 is never a gem5 console.
        let client = TermClient::localhost(1);
        let err = client.connect_and_relay().unwrap_err();
        assert!(err.to_string().contains("guest console"));
    }
}
