//! # Config
//!
//! Session configuration

use std::time::Duration;

use crate::types::{Mode, Security, TransferType};

/// Default timeout to establish the control connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default timeout to connect to a passive endpoint
pub const DEFAULT_DATA_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default time the server has to connect back in active mode
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default idle-read timeout on both channels
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Everything a [`crate::FtpSession`] needs to know before connecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    host: String,
    port: u16,
    security: Security,
    tls_domain: Option<String>,
    mode: Mode,
    transfer_type: TransferType,
    nat_workaround: bool,
    connect_timeout: Duration,
    data_connect_timeout: Duration,
    accept_timeout: Duration,
    control_idle_timeout: Option<Duration>,
    data_idle_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Plain FTP to `host` on port 21, passive mode, binary transfers
    pub fn new<S: AsRef<str>>(host: S) -> Self {
        Self {
            host: host.as_ref().to_string(),
            port: Security::Plain.default_port(),
            security: Security::Plain,
            tls_domain: None,
            mode: Mode::default(),
            transfer_type: TransferType::default(),
            nat_workaround: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            data_connect_timeout: DEFAULT_DATA_CONNECT_TIMEOUT,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            control_idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            data_idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }

    /// Set the port to connect to
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the security mode. If the port is still the default of the previous mode,
    /// it is moved to the default of the new one (990 for implicit TLS, 21 otherwise)
    pub fn with_security(mut self, security: Security) -> Self {
        if self.port == self.security.default_port() {
            self.port = security.default_port();
        }
        self.security = security;
        self
    }

    /// Name to verify the server certificate against; defaults to the host
    pub fn with_tls_domain<S: AsRef<str>>(mut self, domain: S) -> Self {
        self.tls_domain = Some(domain.as_ref().to_string());
        self
    }

    /// Data connection mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Transfer type set once logged in
    pub fn with_transfer_type(mut self, transfer_type: TransferType) -> Self {
        self.transfer_type = transfer_type;
        self
    }

    /// In passive mode, connect to the control connection peer instead of the address
    /// the server advertises. Useful with servers behind NAT advertising private addresses
    pub fn with_passive_nat_workaround(mut self, nat_workaround: bool) -> Self {
        self.nat_workaround = nat_workaround;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_data_connect_timeout(mut self, timeout: Duration) -> Self {
        self.data_connect_timeout = timeout;
        self
    }

    /// Time the server has to connect back in active mode
    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }

    /// Idle-read timeout on the control connection; `None` waits forever
    pub fn with_control_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.control_idle_timeout = timeout;
        self
    }

    /// Idle-read timeout on data connections; `None` waits forever
    pub fn with_data_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.data_idle_timeout = timeout;
        self
    }

    // -- getters

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn security(&self) -> Security {
        self.security
    }

    /// Name the server certificate is verified against
    pub fn tls_domain(&self) -> &str {
        self.tls_domain.as_deref().unwrap_or(&self.host)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn nat_workaround(&self) -> bool {
        self.nat_workaround
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn data_connect_timeout(&self) -> Duration {
        self.data_connect_timeout
    }

    pub fn accept_timeout(&self) -> Duration {
        self.accept_timeout
    }

    pub fn control_idle_timeout(&self) -> Option<Duration> {
        self.control_idle_timeout
    }

    pub fn data_idle_timeout(&self) -> Option<Duration> {
        self.data_idle_timeout
    }
}
