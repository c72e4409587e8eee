//! # Command
//!
//! The set of FTP commands

use std::fmt;
use std::net::SocketAddr;

use crate::types::{FtpError, FtpResult, ProtocolError, TransferType};

pub mod feat;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Ftp commands with their arguments
pub enum Command {
    /// Append to file
    Appe(String),
    /// Set auth to TLS
    Auth,
    /// Change directory to parent directory
    Cdup,
    /// Change working directory
    Cwd(String),
    /// Remove file at specified path
    Dele(String),
    /// Extended active mode address <https://www.rfc-editor.org/rfc/rfc2428#section-2>
    Eprt(SocketAddr),
    /// Extended passive mode <https://www.rfc-editor.org/rfc/rfc2428#section-3>
    Epsv,
    /// List supported features
    Feat,
    /// List entries at specified path. If path is not provided list entries at current working directory
    List(Option<String>),
    /// Get modification time for file at specified path
    Mdtm(String),
    /// Make directory
    Mkd(String),
    /// Machine-readable listing of a directory
    Mlsd(Option<String>),
    /// Machine-readable facts about a single path
    Mlst(Option<String>),
    /// Get the list of file names at specified path. If path is not provided list entries at current working directory
    Nlst(Option<String>),
    /// Ping server
    Noop,
    /// Provide login password
    Pass(String),
    /// Passive mode
    Pasv,
    /// Protection buffer size
    Pbsz(usize),
    /// Specifies an IPv4 address and port to which the server should connect (active mode)
    Port(SocketAddr),
    /// Set protection level for the data channel
    Prot(ProtectionLevel),
    /// Print working directory
    Pwd,
    /// Quit
    Quit,
    /// Select file to rename
    RenameFrom(String),
    /// Rename selected file to
    RenameTo(String),
    /// Retrieve file
    Retr(String),
    /// Remove directory
    Rmd(String),
    /// Get file size of specified path
    Size(String),
    /// Put file at specified path
    Store(String),
    /// Set transfer type
    Type(TransferType),
    /// Provide user to login as
    User(String),
    /// Any other verb with its raw arguments
    Custom(String, Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(unused)]
/// Protection level; argument for `Prot` command
pub enum ProtectionLevel {
    Clear,
    Private,
}

impl Command {
    /// Build a command from a verb and its optional arguments
    pub fn custom(verb: impl ToString, args: Option<impl ToString>) -> Self {
        Self::Custom(verb.to_string(), args.map(|x| x.to_string()))
    }

    /// Make sure the command goes out as a single line.
    /// Arguments with CR or LF would smuggle more commands to the server
    pub fn validate(&self) -> FtpResult<()> {
        let line = self.to_string();
        let body = line.strip_suffix("\r\n").unwrap_or(&line);
        if body.contains(['\r', '\n']) {
            error!("refusing to send a command spanning more lines");
            return Err(FtpError::Protocol(ProtocolError::InvalidArgument(
                self.loggable().escape_debug().to_string(),
            )));
        }
        Ok(())
    }

    /// Text to print in logs. Passwords are masked
    pub fn loggable(&self) -> String {
        match self {
            Self::Pass(_) => "PASS ******".to_string(),
            cmd => cmd.to_string().trim_end_matches("\r\n").to_string(),
        }
    }
}

/// Formats an address as `h1,h2,h3,h4,p1,p2` for `PORT`
fn port_argument(addr: &SocketAddr) -> String {
    let ip = match addr {
        SocketAddr::V4(v4) => v4.ip().octets(),
        // PORT is IPv4 only; EPRT must be used for IPv6 endpoints
        SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped().map(|ip| ip.octets()).unwrap_or([0; 4]),
    };
    format!(
        "{},{},{},{},{},{}",
        ip[0],
        ip[1],
        ip[2],
        ip[3],
        addr.port() >> 8,
        addr.port() & 0xff
    )
}

/// Formats an address as `|proto|addr|port|` for `EPRT`
fn eprt_argument(addr: &SocketAddr) -> String {
    let proto = match addr {
        SocketAddr::V4(_) => 1,
        SocketAddr::V6(_) => 2,
    };
    format!("|{}|{}|{}|", proto, addr.ip(), addr.port())
}

fn with_optional_path(f: &mut fmt::Formatter<'_>, verb: &str, p: &Option<String>) -> fmt::Result {
    match p.as_deref() {
        Some(p) => write!(f, "{verb} {p}"),
        None => write!(f, "{verb}"),
    }
}

// -- stringify

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Appe(p) => write!(f, "APPE {p}"),
            Self::Auth => write!(f, "AUTH TLS"),
            Self::Cdup => write!(f, "CDUP"),
            Self::Cwd(d) => write!(f, "CWD {d}"),
            Self::Dele(p) => write!(f, "DELE {p}"),
            Self::Eprt(addr) => write!(f, "EPRT {}", eprt_argument(addr)),
            Self::Epsv => write!(f, "EPSV"),
            Self::Feat => write!(f, "FEAT"),
            Self::List(p) => with_optional_path(f, "LIST", p),
            Self::Mdtm(p) => write!(f, "MDTM {p}"),
            Self::Mkd(p) => write!(f, "MKD {p}"),
            Self::Mlsd(p) => with_optional_path(f, "MLSD", p),
            Self::Mlst(p) => with_optional_path(f, "MLST", p),
            Self::Nlst(p) => with_optional_path(f, "NLST", p),
            Self::Noop => write!(f, "NOOP"),
            Self::Pass(p) => write!(f, "PASS {p}"),
            Self::Pasv => write!(f, "PASV"),
            Self::Pbsz(sz) => write!(f, "PBSZ {sz}"),
            Self::Port(addr) => write!(f, "PORT {}", port_argument(addr)),
            Self::Prot(level) => write!(f, "PROT {level}"),
            Self::Pwd => write!(f, "PWD"),
            Self::Quit => write!(f, "QUIT"),
            Self::RenameFrom(p) => write!(f, "RNFR {p}"),
            Self::RenameTo(p) => write!(f, "RNTO {p}"),
            Self::Retr(p) => write!(f, "RETR {p}"),
            Self::Rmd(p) => write!(f, "RMD {p}"),
            Self::Size(p) => write!(f, "SIZE {p}"),
            Self::Store(p) => write!(f, "STOR {p}"),
            Self::Type(t) => write!(f, "TYPE {t}"),
            Self::User(u) => write!(f, "USER {u}"),
            Self::Custom(verb, args) => with_optional_path(f, verb, args),
        }?;
        write!(f, "\r\n")
    }
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "C"),
            Self::Private => write!(f, "P"),
        }
    }
}
