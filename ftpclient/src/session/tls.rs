//! # Tls
//!
//! Tls wrappers

use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(feature = "native-tls")]
mod native_tls;
#[cfg(feature = "native-tls")]
pub use self::native_tls::{NativeTlsConnector, NativeTlsStream};

#[cfg(feature = "rustls")]
mod rustls;
#[cfg(feature = "rustls")]
pub use self::rustls::{RustlsConnector, RustlsStream};

use crate::FtpResult;

/// Wraps a connected [`TcpStream`] into a TLS client stream.
///
/// The same connector is used for the control connection and for every data connection
/// of a session, so implementations which keep a session cache get TLS session reuse on
/// the data channel for free.
pub trait TlsConnector: Debug + Send + Sync {
    /// Run the client handshake on `stream`, verifying the server as `domain`.
    ///
    /// Implementations must complete the handshake before returning, so that certificate
    /// and handshake failures surface as [`crate::FtpError::Tls`].
    fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>>;
}

/// A TLS client stream over a [`TcpStream`].
pub trait TlsStream: Read + Write + Debug + Send {
    /// Get ref to underlying tcp stream
    fn get_ref(&self) -> &TcpStream;

    /// Send the TLS close notification. Calling it more than once does nothing
    fn shutdown(&mut self) -> io::Result<()>;
}

/// Build the connector used when the session has none configured
#[cfg(feature = "rustls")]
pub(crate) fn default_connector() -> Option<Box<dyn TlsConnector>> {
    Some(Box::new(RustlsConnector::with_webpki_roots()))
}

#[cfg(all(feature = "native-tls", not(feature = "rustls")))]
pub(crate) fn default_connector() -> Option<Box<dyn TlsConnector>> {
    match NativeTlsConnector::new() {
        Ok(connector) => Some(Box::new(connector)),
        Err(err) => {
            error!("could not build native-tls connector: {err}");
            None
        }
    }
}

#[cfg(not(any(feature = "rustls", feature = "native-tls")))]
pub(crate) fn default_connector() -> Option<Box<dyn TlsConnector>> {
    None
}
