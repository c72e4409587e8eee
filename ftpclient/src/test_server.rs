//! # Test server
//!
//! A scripted FTP server running on a thread, for session tests.
//! The script is followed step by step; any command which doesn't match makes the server thread panic,
//! which fails the test on [`MockServer::finish`].
//! With the `rustls` feature the server speaks FTPS too, with a self-signed certificate.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
#[cfg(feature = "rustls")]
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pretty_assertions::assert_eq;
#[cfg(feature = "rustls")]
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
#[cfg(feature = "rustls")]
use rustls::{ServerConfig, ServerConnection, StreamOwned};

use crate::SessionConfig;

/// A step of the server script
#[derive(Debug, Clone)]
pub enum Step {
    /// Write raw reply text; must include line terminators
    Reply(&'static str),
    /// Read a command and check it, without terminator
    Expect(&'static str),
    /// Expect `PASV`, listen on an ephemeral port and advertise it with `227`
    Pasv,
    /// Expect `EPSV`, listen on an ephemeral port and advertise it with `229`
    Epsv,
    /// Expect `PORT` or `EPRT`, remember the address and reply `200`
    Port,
    /// Accept the passive data connection, write the bytes and close it
    SendData(&'static [u8]),
    /// Accept the passive data connection and read it until the client closes it
    RecvData,
    /// Connect to the address advertised by the client, write the bytes and close
    ActiveSendData(&'static [u8]),
    /// Wait before the next step
    Sleep(Duration),
    /// Run the TLS server handshake on the control connection
    #[cfg(feature = "rustls")]
    Handshake,
    /// Expect `PROT P`, reply `200` and secure every following data connection
    #[cfg(feature = "rustls")]
    ProtP,
}

/// What the server saw
#[derive(Debug, Default)]
pub struct ServerLog {
    /// Every command received, in order, without terminator
    pub commands: Vec<String>,
    /// Bytes received on each data connection
    pub uploads: Vec<Vec<u8>>,
}

pub struct MockServer {
    address: SocketAddr,
    handle: JoinHandle<ServerLog>,
}

impl MockServer {
    /// Listen on localhost and run `script` against the first client
    pub fn start(script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock server");
        let address = listener.local_addr().expect("no local address");
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("client never connected");
            run_script(stream, script)
        });

        Self { address, handle }
    }

    /// Session configuration pointing to this server, with short timeouts
    pub fn config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1")
            .with_port(self.address.port())
            .with_connect_timeout(Duration::from_secs(5))
            .with_data_connect_timeout(Duration::from_secs(5))
            .with_accept_timeout(Duration::from_secs(5))
            .with_control_idle_timeout(Some(Duration::from_secs(5)))
            .with_data_idle_timeout(Some(Duration::from_secs(5)))
    }

    /// Wait for the script to be over
    pub fn finish(self) -> ServerLog {
        self.handle.join().expect("mock server failed")
    }
}

/// Greeting, then `credential_steps`
pub fn login_steps() -> Vec<Step> {
    let mut steps = vec![Step::Reply("220 Mock FTP server ready\r\n")];
    steps.extend(credential_steps());
    steps
}

/// `USER test` / `PASS test` and the `TYPE I` sent after login
pub fn credential_steps() -> Vec<Step> {
    vec![
        Step::Expect("USER test"),
        Step::Reply("331 Password required for test\r\n"),
        Step::Expect("PASS test"),
        Step::Reply("230 User test logged in\r\n"),
        Step::Expect("TYPE I"),
        Step::Reply("200 Type set to I\r\n"),
    ]
}

/// `login_steps` followed by `steps`
pub fn logged_in(steps: Vec<Step>) -> Vec<Step> {
    let mut script = login_steps();
    script.extend(steps);
    script
}

/// A stream of the server, plain or secured
enum ServerStream {
    Plain(TcpStream),
    #[cfg(feature = "rustls")]
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl ServerStream {
    /// Send the TLS close notification, if any, and close the stream
    fn close(self) {
        match self {
            ServerStream::Plain(_) => {}
            #[cfg(feature = "rustls")]
            ServerStream::Tls(mut stream) => {
                stream.conn.send_close_notify();
                stream.flush().expect("failed to send close notify");
            }
        }
    }
}

impl Read for ServerStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ServerStream::Plain(stream) => stream.read(buf),
            #[cfg(feature = "rustls")]
            ServerStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for ServerStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ServerStream::Plain(stream) => stream.write(buf),
            #[cfg(feature = "rustls")]
            ServerStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ServerStream::Plain(stream) => stream.flush(),
            #[cfg(feature = "rustls")]
            ServerStream::Tls(stream) => stream.flush(),
        }
    }
}

/// TLS server side of the script, created on the first handshake
#[derive(Default)]
struct TlsState {
    #[cfg(feature = "rustls")]
    config: Option<Arc<ServerConfig>>,
    /// Whether data connections are secured
    #[cfg(feature = "rustls")]
    protect_data: bool,
}

impl TlsState {
    #[cfg(feature = "rustls")]
    fn accept(&mut self, mut stream: TcpStream) -> ServerStream {
        let config = self.config.get_or_insert_with(self_signed_config);
        let mut connection =
            ServerConnection::new(Arc::clone(config)).expect("bad TLS server config");
        while connection.is_handshaking() {
            connection
                .complete_io(&mut stream)
                .expect("TLS handshake failed");
        }
        while connection.wants_write() {
            connection
                .write_tls(&mut stream)
                .expect("failed to finish TLS handshake");
        }
        ServerStream::Tls(Box::new(StreamOwned::new(connection, stream)))
    }

    #[cfg(feature = "rustls")]
    fn data_stream(&mut self, stream: TcpStream) -> ServerStream {
        if self.protect_data {
            self.accept(stream)
        } else {
            ServerStream::Plain(stream)
        }
    }

    #[cfg(not(feature = "rustls"))]
    fn data_stream(&mut self, stream: TcpStream) -> ServerStream {
        ServerStream::Plain(stream)
    }
}

/// Self-signed `localhost` certificate; TLS 1.2 only, with no post-handshake messages
#[cfg(feature = "rustls")]
fn self_signed_config() -> Arc<ServerConfig> {
    let certificate = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .expect("failed to generate certificate");
    let cert_der = CertificateDer::from(
        certificate
            .serialize_der()
            .expect("failed to serialize certificate"),
    );
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        certificate.serialize_private_key_der(),
    ));
    let config = ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS12])
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .expect("bad certificate");
    Arc::new(config)
}

fn run_script(stream: TcpStream, script: Vec<Step>) -> ServerLog {
    let mut reader = BufReader::new(ServerStream::Plain(stream));
    let mut tls = TlsState::default();
    let mut log = ServerLog::default();
    let mut passive: Option<TcpListener> = None;
    let mut active: Option<SocketAddr> = None;
    for step in script {
        match step {
            Step::Reply(text) => reply(&mut reader, text),
            Step::Expect(expected) => {
                let command = read_command(&mut reader, &mut log);
                assert_eq!(command.as_str(), expected);
            }
            Step::Pasv => {
                assert_eq!(read_command(&mut reader, &mut log).as_str(), "PASV");
                let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind data port");
                let port = listener.local_addr().expect("no data address").port();
                let text = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{}).\r\n",
                    port >> 8,
                    port & 0xff
                );
                reply(&mut reader, &text);
                passive = Some(listener);
            }
            Step::Epsv => {
                assert_eq!(read_command(&mut reader, &mut log).as_str(), "EPSV");
                let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind data port");
                let port = listener.local_addr().expect("no data address").port();
                reply(
                    &mut reader,
                    &format!("229 Entering Extended Passive Mode (|||{port}|)\r\n"),
                );
                passive = Some(listener);
            }
            Step::Port => {
                let command = read_command(&mut reader, &mut log);
                active = Some(parse_active_address(&command));
                reply(&mut reader, "200 PORT command successful\r\n");
            }
            Step::SendData(data) => {
                let mut data_stream = tls.data_stream(accept_passive(&mut passive));
                data_stream.write_all(data).expect("failed to send data");
                data_stream.close();
            }
            Step::RecvData => {
                let mut data_stream = tls.data_stream(accept_passive(&mut passive));
                let mut received = Vec::new();
                data_stream
                    .read_to_end(&mut received)
                    .expect("failed to receive data");
                log.uploads.push(received);
            }
            Step::ActiveSendData(data) => {
                let address = active.take().expect("client never sent PORT");
                let mut data_stream =
                    TcpStream::connect(address).expect("failed to connect to the client");
                data_stream.write_all(data).expect("failed to send data");
            }
            Step::Sleep(duration) => thread::sleep(duration),
            #[cfg(feature = "rustls")]
            Step::Handshake => {
                let stream = match reader.into_inner() {
                    ServerStream::Plain(stream) => stream,
                    ServerStream::Tls(_) => panic!("control connection is already secure"),
                };
                reader = BufReader::new(tls.accept(stream));
            }
            #[cfg(feature = "rustls")]
            Step::ProtP => {
                assert_eq!(read_command(&mut reader, &mut log).as_str(), "PROT P");
                reply(&mut reader, "200 Protection level set to P\r\n");
                tls.protect_data = true;
            }
        }
    }
    log
}

fn reply(reader: &mut BufReader<ServerStream>, text: &str) {
    let stream = reader.get_mut();
    stream
        .write_all(text.as_bytes())
        .and_then(|_| stream.flush())
        .expect("failed to reply");
}

fn accept_passive(passive: &mut Option<TcpListener>) -> TcpStream {
    let (stream, _) = passive
        .take()
        .expect("no passive listener")
        .accept()
        .expect("client never opened the data connection");
    stream
}

fn read_command(reader: &mut BufReader<ServerStream>, log: &mut ServerLog) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).expect("failed to read command");
    let command = line.trim_end_matches(['\r', '\n']).to_string();
    log.commands.push(command.clone());
    command
}

/// Parse `PORT h1,h2,h3,h4,p1,p2` or `EPRT |proto|addr|port|`
fn parse_active_address(command: &str) -> SocketAddr {
    let (verb, args) = command.split_once(' ').expect("bad active command");
    match verb {
        "PORT" => {
            let fields: Vec<u16> = args
                .split(',')
                .map(|field| field.parse().expect("bad PORT field"))
                .collect();
            let ip: IpAddr = format!("{}.{}.{}.{}", fields[0], fields[1], fields[2], fields[3])
                .parse()
                .expect("bad PORT address");
            SocketAddr::new(ip, (fields[4] << 8) | fields[5])
        }
        "EPRT" => {
            let fields: Vec<&str> = args.split('|').collect();
            SocketAddr::new(
                fields[2].parse().expect("bad EPRT address"),
                fields[3].parse().expect("bad EPRT port"),
            )
        }
        other => panic!("expected PORT or EPRT, got {other}"),
    }
}
