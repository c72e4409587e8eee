//! # Types
//!
//! Errors, replies and the set of values used to configure a session

use std::collections::HashMap;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::status::{ReplyKind, Status};

/// A shorthand for a Result whose error type is always an FtpError.
pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using FTP.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Could not establish the control connection
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),
    /// TLS handshake failed, the certificate was rejected or no connector is available
    #[error("Secure error: {0}")]
    Tls(String),
    /// The server rejected the credentials
    #[error("Authentication failed: {0}")]
    Auth(Reply),
    /// The data connection could not be negotiated
    #[error("Data connection error: {0}")]
    Data(#[from] DataError),
    /// Socket fault while executing a command or transferring data
    #[error("I/O error: {0}")]
    Io(io::Error),
    /// Nothing was received on the channel within the idle timeout
    #[error("Timed out reading from the {0} channel")]
    IdleTimeout(Channel),
    /// The server sent something we couldn't understand or didn't expect
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The operation requires a connected session
    #[error("Not connected")]
    NotConnected,
    /// `connect` was called on a connected session
    #[error("Already connected")]
    AlreadyConnected,
    /// The operation requires an authenticated session
    #[error("Not logged in")]
    NotLoggedIn,
}

/// Failures while opening the control connection
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection refused: {0}")]
    Refused(io::Error),
    #[error("timed out connecting to server")]
    Timeout,
    #[error("could not resolve '{0}'")]
    Resolve(String),
    #[error("{0}")]
    Io(io::Error),
}

/// Failures while negotiating a data connection
#[derive(Debug, Error)]
pub enum DataError {
    /// The passive-mode reply didn't contain an address we can parse
    #[error("could not parse passive address from reply {0}")]
    PassiveReply(Reply),
    /// The server never connected back in active mode
    #[error("timed out waiting for the server to open the data connection")]
    Timeout,
    /// The passive endpoint didn't accept the connection in time
    #[error("timed out connecting to the passive endpoint")]
    ConnectTimeout,
    #[error("could not open data connection: {0}")]
    Connect(io::Error),
    /// A data connection is already open on this session
    #[error("a data connection is already open")]
    Busy,
}

/// Malformed or unexpected replies
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("unexpected reply {0}")]
    UnexpectedReply(Reply),
    #[error("command argument breaks the line: {0}")]
    InvalidArgument(String),
}

/// Identifies which socket an idle timeout happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Control,
    Data,
}

/// Defines a reply from the ftp server.
///
/// `lines` holds the reply text with the leading code and separator removed from the
/// first and last line; continuation lines are kept verbatim. Line terminators are stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub code: u32,
    pub lines: Vec<String>,
}

/// Transfer type used in `TYPE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    /// ASCII text; line terminators are translated to CRLF on the wire
    Ascii,
    /// Image; bytes are copied unmodified
    #[default]
    Binary,
}

/// Connection mode for data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// The client listens, the server connects
    Active,
    /// Required by some servers (ipv6); defined in rfc 2428 <https://www.rfc-editor.org/rfc/rfc2428#section-3>
    ExtendedPassive,
    /// The server listens, the client connects
    #[default]
    Passive,
}

/// Security of the control and data connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    #[default]
    Plain,
    /// Plain connection upgraded with `AUTH TLS` before login
    ExplicitTls,
    /// TLS from the first byte
    ImplicitTls,
}

/// Top state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
}

/// Direction of the bytes on a data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    Upload,
    Download,
}

/// Features returned by FEAT command (key, maybe value)
pub type Features = HashMap<String, Option<String>>;

impl FtpError {
    /// Map an I/O error raised on `channel`, telling apart timeouts
    pub(crate) fn from_io(channel: Channel, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::IdleTimeout(channel),
            _ => Self::Io(err),
        }
    }

    /// Shorthand for an unexpected reply
    pub(crate) fn unexpected(reply: Reply) -> Self {
        Self::Protocol(ProtocolError::UnexpectedReply(reply))
    }

    /// Returns the server reply carried by this error, if any
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Auth(reply)
            | Self::Data(DataError::PassiveReply(reply))
            | Self::Protocol(ProtocolError::UnexpectedReply(reply)) => Some(reply),
            _ => None,
        }
    }

    /// Whether the control connection can no longer be trusted after this error
    pub(crate) fn breaks_control(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::IdleTimeout(Channel::Control)
                | Self::Protocol(ProtocolError::Malformed(_))
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Data => write!(f, "data"),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message())
    }
}

impl Reply {
    /// Instantiates a new `Reply`
    pub fn new(code: u32, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Named status for this reply code
    pub fn status(&self) -> Status {
        Status::from(self.code)
    }

    /// Classification of the reply. Codes are validated when parsed, so this never fails
    /// for replies read from the server
    pub fn kind(&self) -> ReplyKind {
        ReplyKind::from_code(self.code).unwrap_or(ReplyKind::PermanentNegative)
    }

    /// Whether the reply is positive (1xx, 2xx, 3xx)
    pub fn is_positive(&self) -> bool {
        self.kind().is_positive()
    }

    /// Whether the reply is a multi-line reply
    pub fn is_multiline(&self) -> bool {
        self.lines.len() > 1
    }

    /// First line of text
    pub fn first_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// Reply text, lines joined with `\n`
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii => write!(f, "A"),
            Self::Binary => write!(f, "I"),
        }
    }
}

impl Security {
    /// Whether the session uses TLS
    pub fn is_secure(&self) -> bool {
        !matches!(self, Self::Plain)
    }

    /// Well-known port for this security mode
    pub fn default_port(&self) -> u16 {
        match self {
            Self::ImplicitTls => 990,
            Self::Plain | Self::ExplicitTls => 21,
        }
    }
}

#[cfg(test)]
mod test {

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fmt_error() {
        assert_eq!(
            FtpError::Io(io::Error::new(io::ErrorKind::NotFound, "omar"))
                .to_string()
                .as_str(),
            "I/O error: omar"
        );
        assert_eq!(
            FtpError::Tls("omar".to_string()).to_string().as_str(),
            "Secure error: omar"
        );
        assert_eq!(
            FtpError::unexpected(Reply::new(552, vec!["error".to_string()]))
                .to_string()
                .as_str(),
            "Protocol error: unexpected reply [552] error"
        );
        assert_eq!(
            FtpError::Data(DataError::Busy).to_string().as_str(),
            "Data connection error: a data connection is already open"
        );
        assert_eq!(
            FtpError::IdleTimeout(Channel::Data).to_string().as_str(),
            "Timed out reading from the data channel"
        );
        assert_eq!(
            FtpError::Connect(ConnectError::Resolve("nowhere".to_string()))
                .to_string()
                .as_str(),
            "Connection error: could not resolve 'nowhere'"
        );
    }

    #[test]
    fn should_map_io_timeouts() {
        assert!(matches!(
            FtpError::from_io(Channel::Control, io::ErrorKind::WouldBlock.into()),
            FtpError::IdleTimeout(Channel::Control)
        ));
        assert!(matches!(
            FtpError::from_io(Channel::Data, io::ErrorKind::TimedOut.into()),
            FtpError::IdleTimeout(Channel::Data)
        ));
        assert!(matches!(
            FtpError::from_io(Channel::Data, io::ErrorKind::ConnectionReset.into()),
            FtpError::Io(_)
        ));
    }

    #[test]
    fn should_tell_which_errors_break_control() {
        assert!(FtpError::Io(io::ErrorKind::BrokenPipe.into()).breaks_control());
        assert!(FtpError::IdleTimeout(Channel::Control).breaks_control());
        assert!(
            FtpError::Protocol(ProtocolError::Malformed("x".to_string())).breaks_control()
        );
        assert!(!FtpError::IdleTimeout(Channel::Data).breaks_control());
        assert!(!FtpError::Data(DataError::Timeout).breaks_control());
        assert!(!FtpError::unexpected(Reply::new(550, vec![])).breaks_control());
    }

    #[test]
    fn should_expose_reply_from_error() {
        let reply = Reply::new(530, vec!["Login incorrect.".to_string()]);
        assert_eq!(FtpError::Auth(reply.clone()).reply(), Some(&reply));
        assert_eq!(FtpError::NotConnected.reply(), None);
    }

    #[test]
    fn reply() {
        let reply = Reply::new(
            211,
            vec!["System status".to_string(), "End".to_string()],
        );
        assert_eq!(reply.status(), Status::System);
        assert_eq!(reply.kind(), ReplyKind::PositiveCompletion);
        assert!(reply.is_positive());
        assert!(reply.is_multiline());
        assert_eq!(reply.first_line(), "System status");
        assert_eq!(reply.message(), "System status\nEnd");
    }

    #[test]
    fn fmt_reply() {
        let reply = Reply::new(
            550,
            vec!["Can't create directory: File exists".to_string()],
        );
        assert_eq!(
            reply.to_string().as_str(),
            "[550] Can't create directory: File exists"
        );
        assert!(!reply.is_positive());
    }

    #[test]
    fn fmt_transfer_type() {
        assert_eq!(TransferType::Ascii.to_string().as_str(), "A");
        assert_eq!(TransferType::Binary.to_string().as_str(), "I");
    }

    #[test]
    fn security_defaults() {
        assert_eq!(Security::default(), Security::Plain);
        assert_eq!(Security::ImplicitTls.default_port(), 990);
        assert_eq!(Security::ExplicitTls.default_port(), 21);
        assert!(Security::ExplicitTls.is_secure());
        assert!(!Security::Plain.is_secure());
    }
}
