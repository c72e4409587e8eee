//! # Session
//!
//! This module exposes [`FtpSession`], a blocking FTP/FTPS client session.
//!
//! A session owns one control connection and at most one data connection at a time.
//! It moves from `Disconnected` to `Connected` on [`FtpSession::connect`] and to
//! `Authenticated` on [`FtpSession::login`]; any fault on the control connection
//! brings it back to `Disconnected`.

mod control;
mod data;
mod data_stream;
mod tls;
pub mod transfer;

use std::fmt;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::prelude::{NaiveDate, NaiveDateTime, NaiveTime};

use self::control::ControlChannel;
use self::data::BusyGuard;
pub use self::data::{DataConnection, DataConnectionDescriptor};
pub use self::data_stream::DataStream;
#[cfg(feature = "native-tls")]
pub use self::tls::{NativeTlsConnector, NativeTlsStream};
#[cfg(feature = "rustls")]
pub use self::tls::{RustlsConnector, RustlsStream};
pub use self::tls::{TlsConnector, TlsStream};
use crate::command::feat::parse_features;
use crate::command::{Command, ProtectionLevel};
use crate::config::SessionConfig;
use crate::list::{self, FileEntry, Listing};
use crate::regex::{MDTM_RE, SIZE_RE};
use crate::status::{ReplyKind, Status};
use crate::types::{
    Channel, ConnectError, DataDirection, DataError, Features, FtpError, FtpResult, Mode,
    ProtocolError, Reply, Security, SessionState, TransferType,
};

/// A blocking FTP session
#[derive(Debug)]
pub struct FtpSession {
    config: SessionConfig,
    state: SessionState,
    control: Option<ControlChannel>,
    tls_connector: Option<Box<dyn TlsConnector>>,
    mode: Mode,
    nat_workaround: bool,
    transfer_type: TransferType,
    working_directory: Option<String>,
    welcome_msg: Option<String>,
    data_busy: Arc<AtomicBool>,
    /// Replies the server owes for data commands whose connection is gone
    pending_replies: Arc<AtomicUsize>,
}

impl FtpSession {
    /// Create a disconnected session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            mode: config.mode(),
            nat_workaround: config.nat_workaround(),
            transfer_type: config.transfer_type(),
            config,
            state: SessionState::Disconnected,
            control: None,
            tls_connector: None,
            working_directory: None,
            welcome_msg: None,
            data_busy: Arc::new(AtomicBool::new(false)),
            pending_replies: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use `connector` for TLS instead of the default one of the enabled provider.
    ///
    /// The same connector secures the control connection and every data connection.
    pub fn with_tls_connector(mut self, connector: impl TlsConnector + 'static) -> Self {
        self.tls_connector = Some(Box::new(connector));
        self
    }

    // -- getters

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    pub fn security(&self) -> Security {
        self.config.security()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    /// Last working directory known, either set with an absolute `cwd` or read with `pwd`
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// Get welcome message from the server on connect.
    pub fn get_welcome_msg(&self) -> Option<&str> {
        self.welcome_msg.as_deref()
    }

    /// Returns a reference to the underlying TcpStream of the control connection.
    ///
    /// Example:
    /// ```no_run
    /// use std::time::Duration;
    /// use ftpclient::{FtpSession, SessionConfig};
    ///
    /// let mut session = FtpSession::new(SessionConfig::new("127.0.0.1"));
    /// session.connect().expect("Couldn't connect to the server...");
    /// session.get_ref()
    ///     .expect("not connected")
    ///     .set_read_timeout(Some(Duration::from_secs(10)))
    ///     .expect("set_read_timeout call failed");
    /// ```
    pub fn get_ref(&self) -> Option<&TcpStream> {
        self.control.as_ref().map(|control| control.stream().get_ref())
    }

    // -- connection

    /// Open the control connection, secure it if the session is FTPS and read the greeting.
    pub fn connect(&mut self) -> FtpResult<()> {
        if self.control.is_some() {
            return Err(FtpError::AlreadyConnected);
        }
        debug!(
            "Connecting to {}:{} ({:?})",
            self.config.host(),
            self.config.port(),
            self.config.security()
        );
        let stream = self.open_control_stream()?;
        let result = self.handshake(stream);
        if result.is_err() {
            self.drop_control();
        }
        result
    }

    /// Close the control connection without saying goodbye. Does nothing if not connected
    pub fn disconnect(&mut self) {
        if let Some(control) = self.control.take() {
            debug!("Disconnecting from {}", self.config.host());
            if let Err(err) = control.into_stream().close() {
                error!("failed to close control connection: {err}");
            }
        }
        self.drop_control();
    }

    /// Log in to the FTP server. Connects first if the session is disconnected.
    ///
    /// The session transfer type is sent to the server once logged in.
    pub fn login<S: AsRef<str>>(&mut self, user: S, password: S) -> FtpResult<()> {
        if self.state == SessionState::Disconnected {
            self.connect()?;
        }
        debug!("Signing in with user '{}'", user.as_ref());
        let reply = self.execute(&Command::User(user.as_ref().to_string()))?;
        match reply.status() {
            Status::LoggedIn | Status::CommandNotImplemented => {}
            Status::NeedPassword => {
                debug!("Password is required");
                let reply = self.execute(&Command::Pass(password.as_ref().to_string()))?;
                if !matches!(
                    reply.status(),
                    Status::LoggedIn | Status::CommandNotImplemented
                ) {
                    return Err(FtpError::Auth(reply));
                }
            }
            _ => return Err(FtpError::Auth(reply)),
        }
        debug!("Login OK");
        self.state = SessionState::Authenticated;
        self.working_directory = None;
        self.send_transfer_type(self.transfer_type)
    }

    /// Send `QUIT` and disconnect, whatever the server replies.
    pub fn logout(&mut self) -> FtpResult<()> {
        if self.control.is_none() {
            return Err(FtpError::NotConnected);
        }
        debug!("Quitting session");
        let result = self.execute_expect(Command::Quit, &[Status::Closing]);
        self.disconnect();
        result.map(|_| ())
    }

    // -- commands

    /// Send any command and return the reply as it is, without judging it
    pub fn send_command(&mut self, verb: &str, args: Option<&str>) -> FtpResult<Reply> {
        debug!("Sending custom command: {verb}");
        self.execute(&Command::custom(verb, args))
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self) -> FtpResult<()> {
        debug!("Pinging server");
        self.execute_expect(Command::Noop, &[Status::CommandOk])
            .map(|_| ())
    }

    /// Gets the current directory
    pub fn pwd(&mut self) -> FtpResult<String> {
        debug!("Getting working directory");
        let reply = self.execute_expect(Command::Pwd, &[Status::PathCreated])?;
        let path = parse_quoted_path(reply.first_line())
            .ok_or_else(|| FtpError::unexpected(reply.clone()))?;
        self.working_directory = Some(path.clone());
        Ok(path)
    }

    /// Change the current directory to `path`.
    ///
    /// When `create` is set and the server refuses the change, the directory is created and
    /// the change is attempted once more.
    pub fn cwd<S: AsRef<str>>(&mut self, path: S, create: bool) -> FtpResult<()> {
        let path = path.as_ref();
        debug!("Changing working directory to {path}");
        let cwd = Command::Cwd(path.to_string());
        let expected = [Status::RequestedFileActionOk, Status::CommandOk];
        match self.execute_expect(cwd.clone(), &expected) {
            Err(FtpError::Protocol(ProtocolError::UnexpectedReply(reply)))
                if create && !reply.is_positive() =>
            {
                debug!("{path} could not be entered ({reply}); creating it");
                self.mkdir(path)?;
                self.execute_expect(cwd, &expected)?;
            }
            result => {
                result?;
            }
        }
        self.working_directory = path.starts_with('/').then(|| path.to_string());
        Ok(())
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> FtpResult<()> {
        debug!("Going to parent directory");
        self.execute_expect(
            Command::Cdup,
            &[Status::CommandOk, Status::RequestedFileActionOk],
        )?;
        self.working_directory = None;
        Ok(())
    }

    /// Creates a new directory on the server.
    pub fn mkdir<S: AsRef<str>>(&mut self, pathname: S) -> FtpResult<()> {
        debug!("Creating directory at {}", pathname.as_ref());
        self.execute_expect(
            Command::Mkd(pathname.as_ref().to_string()),
            &[Status::PathCreated],
        )
        .map(|_| ())
    }

    /// Removes the remote pathname from the server.
    pub fn rmdir<S: AsRef<str>>(&mut self, pathname: S) -> FtpResult<()> {
        debug!("Removing directory {}", pathname.as_ref());
        self.execute_expect(
            Command::Rmd(pathname.as_ref().to_string()),
            &[Status::RequestedFileActionOk],
        )
        .map(|_| ())
    }

    /// Remove the remote file from the server.
    pub fn rm<S: AsRef<str>>(&mut self, filename: S) -> FtpResult<()> {
        debug!("Removing file {}", filename.as_ref());
        self.execute_expect(
            Command::Dele(filename.as_ref().to_string()),
            &[Status::RequestedFileActionOk],
        )
        .map(|_| ())
    }

    /// Renames the file from_name to to_name
    pub fn rename<S: AsRef<str>>(&mut self, from_name: S, to_name: S) -> FtpResult<()> {
        debug!(
            "Renaming '{}' to '{}'",
            from_name.as_ref(),
            to_name.as_ref()
        );
        self.execute_expect(
            Command::RenameFrom(from_name.as_ref().to_string()),
            &[Status::RequestFilePending],
        )?;
        self.execute_expect(
            Command::RenameTo(to_name.as_ref().to_string()),
            &[Status::RequestedFileActionOk],
        )
        .map(|_| ())
    }

    /// Sets the type of file to be transferred.
    ///
    /// Before login the type is only recorded; it is sent to the server on login.
    pub fn set_transfer_type(&mut self, transfer_type: TransferType) -> FtpResult<()> {
        if self.state != SessionState::Authenticated {
            debug!("Transfer type {transfer_type} will be set on login");
            self.transfer_type = transfer_type;
            return Ok(());
        }
        self.send_transfer_type(transfer_type)
    }

    /// Open data connections in passive mode (`PASV`)
    pub fn set_passive_mode(&mut self) {
        self.set_mode(Mode::Passive);
    }

    /// Open data connections in extended passive mode (`EPSV`)
    pub fn set_extended_passive_mode(&mut self) {
        self.set_mode(Mode::ExtendedPassive);
    }

    /// Open data connections in active mode (`PORT`/`EPRT`)
    pub fn set_active_mode(&mut self) {
        self.set_mode(Mode::Active);
    }

    /// Set NAT workaround for passive mode: the address advertised in the `227` reply is
    /// replaced with the address of the control connection peer
    pub fn set_passive_nat_workaround(&mut self, nat_workaround: bool) {
        self.nat_workaround = nat_workaround;
    }

    /// Retrieves the size of the file in bytes at `pathname` if it exists.
    pub fn size<S: AsRef<str>>(&mut self, pathname: S) -> FtpResult<u64> {
        debug!("Getting file size for {}", pathname.as_ref());
        let reply = self.execute_expect(
            Command::Size(pathname.as_ref().to_string()),
            &[Status::File],
        )?;
        SIZE_RE
            .captures(reply.first_line())
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .ok_or_else(|| malformed(&reply))
    }

    /// Retrieves the modification time of the file at `pathname` if it exists.
    pub fn mdtm<S: AsRef<str>>(&mut self, pathname: S) -> FtpResult<NaiveDateTime> {
        debug!("Getting modification time for {}", pathname.as_ref());
        let reply = self.execute_expect(
            Command::Mdtm(pathname.as_ref().to_string()),
            &[Status::File],
        )?;
        let caps = MDTM_RE
            .captures(reply.first_line())
            .ok_or_else(|| malformed(&reply))?;
        let field = |i: usize| caps[i].parse::<u32>().map_err(|_| malformed(&reply));
        let date = NaiveDate::from_ymd_opt(field(1)? as i32, field(2)?, field(3)?)
            .ok_or_else(|| malformed(&reply))?;
        let time = NaiveTime::from_hms_opt(field(4)?, field(5)?, field(6)?)
            .ok_or_else(|| malformed(&reply))?;

        Ok(NaiveDateTime::new(date, time))
    }

    /// Retrieves the features supported by the server, through the FEAT command.
    pub fn feat(&mut self) -> FtpResult<Features> {
        debug!("Getting server supported features");
        let reply = self.execute_expect(Command::Feat, &[Status::System])?;
        parse_features(&reply)
    }

    /// Get the facts of a single path through `MLST`.
    /// The working directory is described when `pathname` is `None`.
    pub fn mlst(&mut self, pathname: Option<&str>) -> FtpResult<FileEntry> {
        debug!("Reading {} path information", pathname.unwrap_or("working"));
        let reply = self.execute_expect(
            Command::Mlst(pathname.map(|x| x.to_string())),
            &[Status::RequestedFileActionOk],
        )?;
        // facts are on the second line, after a leading space
        let line = reply
            .lines
            .get(1)
            .map(|line| line.trim_start())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| malformed(&reply))?;
        FileEntry::from_mlsx_line(line).map_err(|err| {
            FtpError::from(ProtocolError::Malformed(format!(
                "bad MLST facts {line:?}: {err}"
            )))
        })
    }

    // -- transfers

    /// Store the bytes read from `source` as `remote_name` on the server.
    /// Returns the number of bytes read from `source`.
    pub fn put<R: Read + ?Sized>(&mut self, source: &mut R, remote_name: &str) -> FtpResult<u64> {
        debug!("Uploading {remote_name}");
        let connection =
            self.open_data(DataDirection::Upload, Command::Store(remote_name.to_string()))?;
        let outcome = transfer::upload(connection, source);
        self.complete_transfer(outcome)
    }

    /// Append the bytes read from `source` to `remote_name` on the server.
    pub fn append<R: Read + ?Sized>(&mut self, source: &mut R, remote_name: &str) -> FtpResult<u64> {
        debug!("Appending to {remote_name}");
        let connection =
            self.open_data(DataDirection::Upload, Command::Appe(remote_name.to_string()))?;
        let outcome = transfer::upload(connection, source);
        self.complete_transfer(outcome)
    }

    /// Retrieve `remote_name` from the server into `sink`.
    /// Returns the number of bytes written to `sink`.
    pub fn get<W: Write + ?Sized>(&mut self, remote_name: &str, sink: &mut W) -> FtpResult<u64> {
        debug!("Retrieving {remote_name}");
        let connection =
            self.open_data(DataDirection::Download, Command::Retr(remote_name.to_string()))?;
        let outcome = transfer::download(connection, sink);
        self.complete_transfer(outcome)
    }

    /// List the entries of `pathname`, or of the working directory.
    /// Lines which can't be parsed are counted in [`Listing::skipped`].
    pub fn list(&mut self, pathname: Option<&str>) -> FtpResult<Listing> {
        let raw = self.list_raw(pathname)?;
        Ok(list::parse(&raw))
    }

    /// Get the `LIST` output as it was sent by the server
    pub fn list_raw(&mut self, pathname: Option<&str>) -> FtpResult<String> {
        debug!(
            "Reading {} directory content",
            pathname.unwrap_or("working")
        );
        let connection = self.open_data(
            DataDirection::Download,
            Command::List(pathname.map(|x| x.to_string())),
        )?;
        let outcome = transfer::read_listing(connection);
        self.complete_transfer(outcome)
    }

    /// List `pathname` and keep the entries matching `predicate`, in server order
    pub fn list_filtered<P>(&mut self, pathname: Option<&str>, predicate: P) -> FtpResult<Vec<FileEntry>>
    where
        P: FnMut(&FileEntry) -> bool,
    {
        self.list(pathname).map(|listing| listing.filter(predicate))
    }

    /// List the directories in `pathname`
    pub fn list_directories(&mut self, pathname: &str) -> FtpResult<Vec<FileEntry>> {
        self.list_filtered(Some(pathname), FileEntry::is_directory)
    }

    /// List `pathname`, handing each entry to `f` as soon as its line is received.
    /// Returns the number of lines which couldn't be parsed.
    pub fn list_each<F>(&mut self, pathname: Option<&str>, f: F) -> FtpResult<usize>
    where
        F: FnMut(FileEntry),
    {
        debug!(
            "Streaming {} directory content",
            pathname.unwrap_or("working")
        );
        let connection = self.open_data(
            DataDirection::Download,
            Command::List(pathname.map(|x| x.to_string())),
        )?;
        let outcome = transfer::stream_entries(connection, f);
        self.complete_transfer(outcome)
    }

    /// Machine-readable listing of `pathname` through `MLSD`
    pub fn mlsd(&mut self, pathname: Option<&str>) -> FtpResult<Listing> {
        debug!(
            "Reading {} directory content (MLSD)",
            pathname.unwrap_or("working")
        );
        let connection = self.open_data(
            DataDirection::Download,
            Command::Mlsd(pathname.map(|x| x.to_string())),
        )?;
        let outcome = transfer::read_listing(connection);
        self.complete_transfer(outcome).map(|raw| list::parse(&raw))
    }

    /// Names of the entries of `pathname` through `NLST`
    pub fn nlst(&mut self, pathname: Option<&str>) -> FtpResult<Vec<String>> {
        debug!(
            "Getting file names for {} directory",
            pathname.unwrap_or("working")
        );
        let connection = self.open_data(
            DataDirection::Download,
            Command::Nlst(pathname.map(|x| x.to_string())),
        )?;
        let outcome = transfer::read_lines(connection);
        self.complete_transfer(outcome)
    }

    // -- data connections

    /// Negotiate a data connection and send `command` on the control connection.
    ///
    /// The connection is returned once the server accepted the command with a preliminary
    /// reply. While it is alive, no other command can be sent. Once done with it, pass it
    /// to [`FtpSession::close_data_connection`] to read the completion reply; if it is just
    /// dropped, the reply is read and discarded before the next command.
    pub fn open_data(
        &mut self,
        direction: DataDirection,
        command: Command,
    ) -> FtpResult<DataConnection> {
        if self.data_busy.load(Ordering::Acquire) {
            return Err(DataError::Busy.into());
        }
        self.require_login()?;
        command.validate()?;
        let result = self.negotiate(direction, command);
        self.check(result)
    }

    /// Close a connection returned by [`FtpSession::open_data`] and read the completion reply
    pub fn close_data_connection(&mut self, connection: DataConnection) -> FtpResult<()> {
        debug!("closing data connection");
        let outcome = connection
            .close()
            .map_err(|err| FtpError::from_io(Channel::Data, err));
        self.complete_transfer(outcome)
    }

    fn negotiate(
        &mut self,
        direction: DataDirection,
        command: Command,
    ) -> FtpResult<DataConnection> {
        let (stream, address, busy) = match self.mode {
            Mode::Passive | Mode::ExtendedPassive => {
                let address = self.passive_address()?;
                let stream = data::connect_passive(address, self.config.data_connect_timeout())?;
                self.execute_preliminary(command)?;
                (stream, address, self.acquire_data_channel()?)
            }
            Mode::Active => {
                let local_ip = self.control()?.local_addr()?.ip();
                let listener = data::bind_active(local_ip)?;
                let local = listener
                    .local_addr()
                    .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
                debug!("Active mode, listening on {local}");
                let advertise = match local {
                    SocketAddr::V4(_) => Command::Port(local),
                    SocketAddr::V6(_) => Command::Eprt(local),
                };
                self.execute_expect(advertise, &[Status::CommandOk])?;
                self.execute_preliminary(command)?;
                let busy = self.acquire_data_channel()?;
                let stream = data::accept_active(&listener, self.config.accept_timeout())
                    .inspect_err(|_| {
                        debug!("server never connected; its reply to the command will be discarded")
                    })?;
                let peer = stream
                    .peer_addr()
                    .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
                (stream, peer, busy)
            }
        };
        stream
            .set_read_timeout(self.config.data_idle_timeout())
            .map_err(|err| FtpError::Data(DataError::Connect(err)))?;
        let secure = self.config.security().is_secure();
        let stream = if secure {
            DataStream::Tls(self.secure(stream)?)
        } else {
            DataStream::Tcp(stream)
        };
        let descriptor = DataConnectionDescriptor {
            mode: self.mode,
            direction,
            address,
            secure,
        };
        trace!("data connection open: {descriptor:?}");

        Ok(DataConnection::new(
            descriptor,
            self.transfer_type,
            stream,
            busy,
        ))
    }

    /// Ask the server where to connect for the next data connection
    fn passive_address(&mut self) -> FtpResult<SocketAddr> {
        let peer = self.control()?.peer_addr()?;
        if self.mode == Mode::ExtendedPassive {
            debug!("EPSV command");
            let reply = self.execute_expect(Command::Epsv, &[Status::ExtendedPassiveMode])?;
            return data::parse_epsv_reply(&reply, peer.ip());
        }
        debug!("PASV command");
        let reply = self.execute_expect(Command::Pasv, &[Status::PassiveMode])?;
        let address = data::parse_pasv_reply(&reply)?;
        if self.nat_workaround && address.ip() != peer.ip() {
            debug!(
                "passive address {} replaced with {} (NAT workaround)",
                address.ip(),
                peer.ip()
            );
            return Ok(SocketAddr::new(peer.ip(), address.port()));
        }
        Ok(address)
    }

    fn execute_preliminary(&mut self, command: Command) -> FtpResult<Reply> {
        self.execute_expect(command, &[Status::AlreadyOpen, Status::AboutToSend])
    }

    /// Mark the data channel busy once the server accepted a data command.
    /// From here on the server owes the completion reply of that command
    fn acquire_data_channel(&self) -> FtpResult<BusyGuard> {
        BusyGuard::acquire(&self.data_busy, &self.pending_replies).inspect_err(|_| {
            self.pending_replies.fetch_add(1, Ordering::AcqRel);
        })
    }

    /// Read the completion reply of a transfer.
    /// A failed transfer wins over the reply, but the reply is read anyway to keep the
    /// control connection in sync.
    fn complete_transfer<T>(&mut self, outcome: FtpResult<T>) -> FtpResult<T> {
        let reply = self.read_completion();
        let value = outcome?;
        let reply = reply?;
        if reply.kind() != ReplyKind::PositiveCompletion {
            error!("transfer not completed: {reply}");
            return Err(FtpError::unexpected(reply));
        }
        trace!("transfer completed: {reply}");
        Ok(value)
    }

    // -- private

    /// Resolve the host and connect to the first address which accepts the connection
    fn open_control_stream(&self) -> FtpResult<TcpStream> {
        let host = self.config.host();
        let addrs: Vec<SocketAddr> = (host, self.config.port())
            .to_socket_addrs()
            .map_err(|err| {
                debug!("could not resolve {host}: {err}");
                ConnectError::Resolve(host.to_string())
            })?
            .collect();
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout()) {
                Ok(stream) => {
                    debug!("Established connection with server {addr}");
                    return Ok(stream);
                }
                Err(err) => {
                    debug!("could not connect to {addr}: {err}");
                    last_err = Some(err);
                }
            }
        }
        let err = match last_err {
            None => ConnectError::Resolve(host.to_string()),
            Some(err) => match err.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                    ConnectError::Timeout
                }
                std::io::ErrorKind::ConnectionRefused => ConnectError::Refused(err),
                _ => ConnectError::Io(err),
            },
        };

        Err(err.into())
    }

    /// Read the greeting and negotiate security on a freshly opened control connection
    fn handshake(&mut self, stream: TcpStream) -> FtpResult<()> {
        stream
            .set_read_timeout(self.config.control_idle_timeout())
            .map_err(FtpError::Io)?;
        let security = self.config.security();
        let stream = match security {
            Security::ImplicitTls => {
                debug!("TLS handshake before greeting");
                DataStream::Tls(self.secure(stream)?)
            }
            Security::Plain | Security::ExplicitTls => DataStream::Tcp(stream),
        };
        self.control = Some(ControlChannel::new(stream));

        debug!("Reading server response...");
        let greeting = loop {
            let reply = self.read_reply()?;
            match reply.status() {
                Status::Ready => break reply,
                _ if reply.code == 120 => debug!("server not ready yet: {reply}"),
                _ => return Err(FtpError::unexpected(reply)),
            }
        };
        debug!("Server READY; response: {greeting}");
        self.welcome_msg = Some(greeting.message());

        if security == Security::ExplicitTls {
            debug!("Initializing TLS auth");
            let reply = self.execute(&Command::Auth)?;
            if reply.status() != Status::AuthOk {
                return Err(FtpError::Tls(format!("AUTH TLS refused: {reply}")));
            }
            let plain = self
                .control
                .take()
                .ok_or(FtpError::NotConnected)?
                .into_stream()
                .into_plain()
                .map_err(|_| FtpError::Tls("control connection is already secure".to_string()))?;
            debug!("TLS OK; initializing ssl stream");
            let stream = self.secure(plain)?;
            self.control = Some(ControlChannel::new(DataStream::Tls(stream)));
        }
        if security.is_secure() {
            self.execute_expect(Command::Pbsz(0), &[Status::CommandOk])?;
            self.execute_expect(Command::Prot(ProtectionLevel::Private), &[Status::CommandOk])?;
            debug!("TLS Stream OK");
        }
        self.state = SessionState::Connected;

        Ok(())
    }

    /// Run the TLS handshake on `stream`, with the default connector if none was given
    fn secure(&mut self, stream: TcpStream) -> FtpResult<Box<dyn TlsStream>> {
        if self.tls_connector.is_none() {
            self.tls_connector = tls::default_connector();
        }
        match self.tls_connector.as_deref() {
            Some(connector) => connector.connect(self.config.tls_domain(), stream),
            None => Err(FtpError::Tls(
                "no TLS connector available; enable the `rustls` or `native-tls` feature"
                    .to_string(),
            )),
        }
    }

    fn send_transfer_type(&mut self, transfer_type: TransferType) -> FtpResult<()> {
        debug!("Setting transfer type {transfer_type}");
        self.execute_expect(Command::Type(transfer_type), &[Status::CommandOk])?;
        self.transfer_type = transfer_type;
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        debug!("Changed mode to {mode:?}");
        self.mode = mode;
    }

    fn require_login(&self) -> FtpResult<()> {
        match self.state {
            SessionState::Disconnected => Err(FtpError::NotConnected),
            SessionState::Connected => Err(FtpError::NotLoggedIn),
            SessionState::Authenticated => Ok(()),
        }
    }

    fn control(&self) -> FtpResult<&ControlChannel> {
        self.control.as_ref().ok_or(FtpError::NotConnected)
    }

    /// Send a command and read its reply.
    fn execute(&mut self, command: &Command) -> FtpResult<Reply> {
        if self.data_busy.load(Ordering::Acquire) {
            return Err(DataError::Busy.into());
        }
        let result = self.exchange(command);
        self.check(result)
    }

    /// Like `execute`, but fails unless the reply code is one of `expected`
    fn execute_expect(&mut self, command: Command, expected: &[Status]) -> FtpResult<Reply> {
        let reply = self.execute(&command)?;
        if expected.iter().any(|status| status.code() == reply.code) {
            Ok(reply)
        } else {
            error!(
                "Expected {:?}, got {}",
                expected.iter().map(Status::code).collect::<Vec<u32>>(),
                reply
            );
            Err(FtpError::unexpected(reply))
        }
    }

    fn exchange(&mut self, command: &Command) -> FtpResult<Reply> {
        command.validate()?;
        let control = self.control.as_mut().ok_or(FtpError::NotConnected)?;
        while self.pending_replies.load(Ordering::Acquire) > 0 {
            let stale = control.read_reply()?;
            debug!("discarding stale reply {stale}");
            settle_reply(&self.pending_replies);
        }
        control.execute(command)
    }

    /// Read the completion reply of the last data command, after the older ones still owed
    fn read_completion(&mut self) -> FtpResult<Reply> {
        let result = match self.control.as_mut() {
            Some(control) => loop {
                let reply = match control.read_reply() {
                    Ok(reply) => reply,
                    Err(err) => break Err(err),
                };
                if settle_reply(&self.pending_replies) <= 1 {
                    break Ok(reply);
                }
                debug!("discarding stale reply {reply}");
            },
            None => Err(FtpError::NotConnected),
        };
        self.check(result)
    }

    fn read_reply(&mut self) -> FtpResult<Reply> {
        let result = match self.control.as_mut() {
            Some(control) => control.read_reply(),
            None => Err(FtpError::NotConnected),
        };
        self.check(result)
    }

    /// Drop the control connection if `result` says it can't be trusted anymore
    fn check<T>(&mut self, result: FtpResult<T>) -> FtpResult<T> {
        if let Err(err) = &result {
            if err.breaks_control() {
                error!("control connection lost: {err}");
                self.drop_control();
            }
        }
        result
    }

    fn drop_control(&mut self) {
        self.control = None;
        self.state = SessionState::Disconnected;
        self.pending_replies = Arc::new(AtomicUsize::new(0));
        self.working_directory = None;
        // a data connection still alive must not keep the next session busy
        self.data_busy = Arc::new(AtomicBool::new(false));
    }
}

impl fmt::Display for FtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.config.security() {
            Security::Plain => "ftp",
            Security::ExplicitTls | Security::ImplicitTls => "ftps",
        };
        write!(f, "{scheme}://{}:{}", self.config.host(), self.config.port())
    }
}

/// Count one owed reply as read; returns how many were owed before
fn settle_reply(pending: &AtomicUsize) -> usize {
    pending
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |owed| {
            Some(owed.saturating_sub(1))
        })
        .unwrap_or_else(|owed| owed)
}

fn malformed(reply: &Reply) -> FtpError {
    ProtocolError::Malformed(format!("unexpected reply text {reply}")).into()
}

/// Get the path out of a `257` reply: `"path" comment`, where `""` stands for a quote
fn parse_quoted_path(text: &str) -> Option<String> {
    let mut chars = text.chars().skip_while(|c| *c != '"');
    chars.next()?;
    let mut path = String::new();
    while let Some(c) = chars.next() {
        if c == '"' {
            match chars.next() {
                Some('"') => path.push('"'),
                _ => return Some(path),
            }
        } else {
            path.push(c);
        }
    }
    None
}
