#![crate_name = "ftpclient"]
#![crate_type = "lib"]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # ftpclient
//!
//! ftpclient is a blocking FTP client core written in Rust with FTPS support.
//! It is made of:
//!
//! - the **control channel**: commands out, replies in, session state and login
//! - the **data channel negotiator**: active, passive and extended passive data connections, plain or TLS
//! - the **transfer engine**: ASCII and BINARY uploads and downloads
//! - the **listing parser**: Unix `ls -l`, MLSx and DOS listings, with skipped lines counted
//!
//! ## Get started
//!
//! ```toml
//! ftpclient = "^0.4"
//! ```
//!
//! ### Features
//!
//! #### SSL/TLS Support
//!
//! FTPS is provided by `rustls`, enabled by default. `native-tls` can be enabled instead:
//!
//! ```toml
//! ftpclient = { version = "^0.4", default-features = false, features = ["native-tls"] }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use ftpclient::{FtpSession, SessionConfig};
//!
//! let mut session = FtpSession::new(SessionConfig::new("127.0.0.1").with_port(10021));
//! session.login("test", "test").unwrap();
//! session.put(&mut Cursor::new(b"hello".to_vec()), "hello.txt").unwrap();
//! for entry in session.list(None).unwrap() {
//!     println!("{} {}", entry.name(), entry.size());
//! }
//! session.logout().unwrap();
//! ```
//!
//! ## FTPS
//!
//! The security of a session is chosen in its configuration.
//! With explicit TLS the client connects in clear and upgrades the control connection with
//! `AUTH TLS` before login; with implicit TLS, usually on port 990, the handshake comes first.
//! Data connections are protected too in both cases.
//!
//! ```rust,no_run
//! use ftpclient::{FtpSession, Security, SessionConfig};
//!
//! let config = SessionConfig::new("test.rebex.net").with_security(Security::ExplicitTls);
//! let mut session = FtpSession::new(config);
//! session.login("demo", "password").unwrap();
//! assert!(session.logout().is_ok());
//! ```
//!

#![doc(html_playground_url = "https://play.rust-lang.org")]

// -- common deps
#[macro_use]
extern crate lazy_regex;
#[macro_use]
extern crate log;

// -- private
mod command;
mod config;
mod regex;
mod session;
mod status;
mod types;

// -- public
pub mod list;

// -- secure deps
#[cfg(feature = "native-tls")]
pub extern crate native_tls_crate as native_tls;
#[cfg(feature = "rustls")]
pub extern crate rustls_crate as rustls;

// -- export
pub use command::{Command, ProtectionLevel};
pub use config::{
    SessionConfig, DEFAULT_ACCEPT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DATA_CONNECT_TIMEOUT,
    DEFAULT_IDLE_TIMEOUT,
};
pub use list::{FileEntry, FileType, Listing};
pub use session::transfer;
pub use session::{
    DataConnection, DataConnectionDescriptor, DataStream, FtpSession, TlsConnector, TlsStream,
};
// -- export secure
#[cfg(feature = "native-tls")]
#[cfg_attr(docsrs, doc(cfg(feature = "native-tls")))]
pub use session::{NativeTlsConnector, NativeTlsStream};
#[cfg(feature = "rustls")]
#[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
pub use session::{RustlsConnector, RustlsStream};
pub use status::{ReplyKind, Status};
pub use types::{
    Channel, ConnectError, DataDirection, DataError, Features, FtpError, FtpResult, Mode,
    ProtocolError, Reply, Security, SessionState, TransferType,
};

// -- test
#[cfg(test)]
mod test_container;
#[cfg(test)]
mod test_server;

// -- test logging
#[cfg(test)]
pub fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
