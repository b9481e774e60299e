//! Where report lines go: the local console or a listener on the network.
use std::{
    io::{self, BufWriter, Stdout, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::debug;

use crate::errors::TrellisError;

/// A line oriented text destination.
pub trait Sink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Shared handle to the active sink.
#[derive(Clone)]
pub struct Writer(Arc<Mutex<Box<dyn Sink + Send>>>);

impl Writer {
    pub fn new(sink: impl Sink + Send + 'static) -> Self {
        Writer(Arc::new(Mutex::new(Box::new(sink))))
    }

    pub fn console() -> Self {
        Writer::new(ConsoleSink::default())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Sink + Send>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write_line(&self, line: &str) -> Result<(), TrellisError> {
        self.lock().write_line(line).map_err(TrellisError::from)
    }

    pub fn close(&self) -> Result<(), TrellisError> {
        self.lock().close().map_err(TrellisError::from)
    }
}

/// Lines on standard output.
pub struct ConsoleSink {
    out: BufWriter<Stdout>,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
        }
    }
}

impl Sink for ConsoleSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Lines sent over a TCP connection, e.g. to a log collector on the
/// developer's machine.
pub struct TcpSink {
    stream: Option<BufWriter<TcpStream>>,
}

impl TcpSink {
    /// Connect to `host:port`, trying every resolved address in turn.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, TrellisError> {
        let connect_error = |source: io::Error| TrellisError::Connect {
            host: host.to_string(),
            port,
            source,
        };

        let addrs = (host, port).to_socket_addrs().map_err(connect_error)?;
        let mut last = io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "host did not resolve to any address",
        );
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    debug!("connected to {}", addr);
                    return Ok(Self {
                        stream: Some(BufWriter::new(stream)),
                    });
                }
                Err(err) => last = err,
            }
        }
        Err(connect_error(last))
    }
}

impl Sink for TcpSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "sink is closed")
        })?;
        writeln!(stream, "{}", line)?;
        stream.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush()?;
            stream.get_ref().shutdown(Shutdown::Both)?;
        }
        Ok(())
    }
}

/// Keeps lines in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Sink for CaptureSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io::{BufRead, BufReader},
        net::TcpListener,
        thread,
    };

    #[test]
    fn capture_sink_is_shared_between_clones() {
        let sink = CaptureSink::default();
        let writer = Writer::new(sink.clone());
        writer.write_line("[Runner executing:\tunit]").unwrap();
        writer.clone().write_line("second").unwrap();
        assert_eq!(sink.lines(), vec!["[Runner executing:\tunit]", "second"]);
    }

    #[test]
    fn tcp_sink_delivers_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            BufReader::new(stream)
                .lines()
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        });

        let mut sink =
            TcpSink::connect("127.0.0.1", port, Duration::from_secs(5)).unwrap();
        sink.write_line("hello").unwrap();
        sink.write_line("world").unwrap();
        sink.close().unwrap();

        assert_eq!(server.join().unwrap(), vec!["hello", "world"]);
        assert!(sink.write_line("late").is_err());
    }

    #[test]
    fn unreachable_host_is_a_connect_error() {
        // Bind then drop to find a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        match TcpSink::connect("127.0.0.1", port, Duration::from_secs(1)) {
            Err(TrellisError::Connect { host, port: p, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
