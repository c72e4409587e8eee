//! # Data
//!
//! Data connection negotiation: passive address parsing, active listeners and the
//! connection handed to the transfer engine

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::data_stream::DataStream;
use crate::regex::{EPSV_PORT_RE, PASV_PORT_RE};
use crate::types::{DataDirection, DataError, FtpError, FtpResult, Mode, Reply, TransferType};

/// Describes an open data connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConnectionDescriptor {
    /// How the connection was established
    pub mode: Mode,
    /// Whether bytes flow to or from the server
    pub direction: DataDirection,
    /// Address of the server side of the connection
    pub address: SocketAddr,
    /// Whether the connection is protected by TLS
    pub secure: bool,
}

/// An open data connection.
///
/// While it is alive the session refuses to open another one or to send commands.
/// Dropping it closes the socket and releases the session; the completion reply of the
/// data command is then read by the session before its next command.
#[derive(Debug)]
pub struct DataConnection {
    descriptor: DataConnectionDescriptor,
    transfer_type: TransferType,
    stream: DataStream,
    _busy: BusyGuard,
}

/// Marks the session's data channel busy until dropped.
///
/// It is taken once the server accepted a data command; dropping it counts the completion
/// reply the server owes for that command in `pending_replies`.
#[derive(Debug)]
pub(crate) struct BusyGuard {
    flag: Arc<AtomicBool>,
    pending_replies: Arc<AtomicUsize>,
}

impl BusyGuard {
    /// Mark `flag` busy. Fails if it already is
    pub fn acquire(flag: &Arc<AtomicBool>, pending_replies: &Arc<AtomicUsize>) -> FtpResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FtpError::Data(DataError::Busy))?;
        Ok(Self {
            flag: Arc::clone(flag),
            pending_replies: Arc::clone(pending_replies),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.pending_replies.fetch_add(1, Ordering::AcqRel);
        self.flag.store(false, Ordering::Release);
    }
}

impl DataConnection {
    pub(crate) fn new(
        descriptor: DataConnectionDescriptor,
        transfer_type: TransferType,
        stream: DataStream,
        busy: BusyGuard,
    ) -> Self {
        Self {
            descriptor,
            transfer_type,
            stream,
            _busy: busy,
        }
    }

    /// How this connection was opened
    pub fn descriptor(&self) -> &DataConnectionDescriptor {
        &self.descriptor
    }

    /// Representation type the session had when the connection was opened
    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    /// Flush, terminate TLS and close the socket
    pub fn close(self) -> io::Result<()> {
        trace!("closing data connection to {}", self.descriptor.address);
        self.stream.close()
    }
}

impl Read for DataConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for DataConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Parse the address out of a `227` reply.
///
/// PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
pub(crate) fn parse_pasv_reply(reply: &Reply) -> FtpResult<SocketAddr> {
    let message = reply.message();
    trace!("PASV response: {message}");
    let bad_reply = || FtpError::Data(DataError::PassiveReply(reply.clone()));
    let caps = PASV_PORT_RE.captures(&message).ok_or_else(bad_reply)?;
    let mut fields = [0u8; 6];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = caps[i + 1].parse::<u8>().map_err(|_| bad_reply())?;
    }
    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = (u16::from(fields[4]) << 8) | u16::from(fields[5]);

    Ok(SocketAddr::new(ip.into(), port))
}

/// Parse the port out of a `229` reply; the host is the one of the control connection.
///
/// EPSV response format : 229 Entering Extended Passive Mode (|||port|)
pub(crate) fn parse_epsv_reply(reply: &Reply, control_peer: IpAddr) -> FtpResult<SocketAddr> {
    let message = reply.message();
    trace!("EPSV response: {message}");
    let port = EPSV_PORT_RE
        .captures(&message)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .ok_or_else(|| FtpError::Data(DataError::PassiveReply(reply.clone())))?;

    Ok(SocketAddr::new(control_peer, port))
}

/// Connect to the endpoint the server is listening on
pub(crate) fn connect_passive(address: SocketAddr, timeout: Duration) -> FtpResult<TcpStream> {
    debug!("connecting to passive endpoint {address}");
    TcpStream::connect_timeout(&address, timeout).map_err(|err| match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            FtpError::Data(DataError::ConnectTimeout)
        }
        _ => FtpError::Data(DataError::Connect(err)),
    })
}

/// Create a listener on an ephemeral port of `local_ip` for the server to connect to
pub(crate) fn bind_active(local_ip: IpAddr) -> FtpResult<TcpListener> {
    debug!("Starting local tcp listener...");
    let listener = TcpListener::bind(SocketAddr::new(local_ip, 0))
        .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
    Ok(listener)
}

/// Wait up to `timeout` for the server to connect to `listener`
pub(crate) fn accept_active(listener: &TcpListener, timeout: Duration) -> FtpResult<TcpStream> {
    let start = Instant::now();
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("server connected from {peer}");
                stream
                    .set_nonblocking(false)
                    .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
                break Ok(stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    break Err(FtpError::Data(DataError::Timeout));
                }
                std::thread::sleep((timeout - elapsed).min(Duration::from_millis(50)));
            }
            Err(e) => break Err(FtpError::Data(DataError::Connect(e))),
        }
    }
}
