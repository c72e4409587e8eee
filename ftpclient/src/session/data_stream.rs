//! # Data Stream
//!
//! This module exposes the stream which bytes are written to/read from, on both the
//! control and the data connection

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use super::tls::TlsStream;

/// Stream used for communications. It can be both of type Tcp in case of plain communication or Tls in case of FTPS
#[derive(Debug)]
pub enum DataStream {
    Tcp(TcpStream),
    Tls(Box<dyn TlsStream>),
}

impl DataStream {
    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        match self {
            DataStream::Tcp(stream) => stream,
            DataStream::Tls(stream) => stream.get_ref(),
        }
    }

    /// Whether the stream is encrypted
    pub fn is_secure(&self) -> bool {
        matches!(self, DataStream::Tls(_))
    }

    /// Take the plain tcp stream back, to upgrade it to TLS.
    /// Gives the stream back untouched if it is already secure
    pub(crate) fn into_plain(self) -> Result<TcpStream, Self> {
        match self {
            DataStream::Tcp(stream) => Ok(stream),
            stream => Err(stream),
        }
    }

    /// Flush pending bytes, terminate the TLS session if any and close the socket.
    pub(crate) fn close(mut self) -> io::Result<()> {
        self.flush()?;
        if let DataStream::Tls(stream) = &mut self {
            stream.shutdown()?;
        }
        match self.get_ref().shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }
}

impl Read for DataStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DataStream::Tcp(stream) => stream.read(buf),
            DataStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DataStream::Tcp(stream) => stream.write(buf),
            DataStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DataStream::Tcp(stream) => stream.flush(),
            DataStream::Tls(stream) => stream.flush(),
        }
    }
}
