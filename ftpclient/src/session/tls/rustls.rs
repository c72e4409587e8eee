//! # Rustls
//!
//! Rustls implementation of tls types

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    StreamOwned,
};

use super::{TlsConnector, TlsStream};
use crate::{FtpError, FtpResult};

/// A Wrapper for the tls connector
pub struct RustlsConnector {
    connector: Arc<ClientConfig>,
}

impl std::fmt::Debug for RustlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<?>")
    }
}

impl From<Arc<ClientConfig>> for RustlsConnector {
    fn from(connector: Arc<ClientConfig>) -> Self {
        Self { connector }
    }
}

impl RustlsConnector {
    /// Verify servers against the Mozilla root store shipped by `webpki-roots`
    pub fn with_webpki_roots() -> Self {
        let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Self::from(Arc::new(config))
    }

    /// Accept any server certificate.
    ///
    /// Handshake signatures are still checked, but the certificate chain and the server name
    /// are not. Only meant for servers with self-signed certificates you trust.
    pub fn dangerous_accept_any_certificate() -> Self {
        let verifier = AcceptAnyCertificate {
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        };
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Self::from(Arc::new(config))
    }
}

impl TlsConnector for RustlsConnector {
    fn connect(&self, domain: &str, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>> {
        let server_name = ServerName::try_from(domain.to_string())
            .map_err(|e| FtpError::Tls(e.to_string()))?;
        let mut connection = ClientConnection::new(Arc::clone(&self.connector), server_name)
            .map_err(|e| FtpError::Tls(e.to_string()))?;
        let mut stream = stream;
        while connection.is_handshaking() {
            connection
                .complete_io(&mut stream)
                .map_err(|e| FtpError::Tls(format!("handshake with {domain} failed: {e}")))?;
        }
        // the last flight may still be queued once handshaking is over
        while connection.wants_write() {
            connection
                .write_tls(&mut stream)
                .map_err(|e| FtpError::Tls(format!("handshake with {domain} failed: {e}")))?;
        }
        trace!("TLS handshake with {domain} completed");
        Ok(Box::new(RustlsStream {
            stream: StreamOwned::new(connection, stream),
            ssl_shutdown: true,
        }))
    }
}

// -- tls stream wrapper to implement drop...

/// Tls stream wrapper which sends the close notification on drop
#[derive(Debug)]
pub struct RustlsStream {
    stream: StreamOwned<ClientConnection, TcpStream>,
    ssl_shutdown: bool,
}

impl TlsStream for RustlsStream {
    fn get_ref(&self) -> &TcpStream {
        self.stream.get_ref()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if !self.ssl_shutdown {
            return Ok(());
        }
        self.ssl_shutdown = false;
        self.stream.flush()?;
        self.stream.conn.send_close_notify();
        while self.stream.conn.wants_write() {
            self.stream.conn.write_tls(&mut self.stream.sock)?;
        }
        trace!("TLS stream terminated");
        Ok(())
    }
}

impl Read for RustlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            // plenty of servers close the data connection without close_notify
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                trace!("peer closed TLS stream without close_notify");
                Ok(0)
            }
            result => result,
        }
    }
}

impl Write for RustlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Drop for RustlsStream {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("error in terminating rustls stream: {err}");
        }
    }
}

/// Certificate verifier which trusts any certificate
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
