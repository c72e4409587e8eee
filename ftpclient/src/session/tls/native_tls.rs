//! # Native tls
//!
//! Native tls implementation of TLS types

use std::io::{self, Read, Write};
use std::net::TcpStream;

use native_tls::{TlsConnector as NativeConnector, TlsStream as NativeStream};

use super::{TlsConnector, TlsStream};
use crate::{FtpError, FtpResult};

#[derive(Debug)]
/// A Wrapper for the tls connector
pub struct NativeTlsConnector {
    connector: NativeConnector,
}

impl From<NativeConnector> for NativeTlsConnector {
    fn from(connector: NativeConnector) -> Self {
        Self { connector }
    }
}

impl NativeTlsConnector {
    /// Connector verifying servers against the system trust store
    pub fn new() -> FtpResult<Self> {
        NativeConnector::new()
            .map(Self::from)
            .map_err(|e| FtpError::Tls(e.to_string()))
    }

    /// Connector which accepts invalid certificates and host names.
    /// Only meant for servers with self-signed certificates you trust.
    pub fn dangerous_accept_any_certificate() -> FtpResult<Self> {
        NativeConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map(Self::from)
            .map_err(|e| FtpError::Tls(e.to_string()))
    }
}

impl TlsConnector for NativeTlsConnector {
    fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>> {
        let stream = self
            .connector
            .connect(domain, stream)
            .map_err(|e| FtpError::Tls(format!("handshake with {domain} failed: {e}")))?;
        Ok(Box::new(NativeTlsStream::from(stream)))
    }
}

// -- tls stream wrapper to implement drop...

/// Tls stream wrapper which shuts the TLS session down on drop
#[derive(Debug)]
pub struct NativeTlsStream {
    stream: NativeStream<TcpStream>,
    ssl_shutdown: bool,
}

impl From<NativeStream<TcpStream>> for NativeTlsStream {
    fn from(stream: NativeStream<TcpStream>) -> Self {
        Self {
            stream,
            ssl_shutdown: true,
        }
    }
}

impl TlsStream for NativeTlsStream {
    fn get_ref(&self) -> &TcpStream {
        self.stream.get_ref()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if !self.ssl_shutdown {
            return Ok(());
        }
        self.ssl_shutdown = false;
        self.stream.shutdown()?;
        debug!("TLS Stream shut down");
        Ok(())
    }
}

impl Read for NativeTlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for NativeTlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Drop for NativeTlsStream {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("Failed to shutdown stream: {}", err);
        }
    }
}
