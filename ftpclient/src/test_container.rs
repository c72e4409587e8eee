//! # Test container
//!
//! A pure-ftpd server in docker, for the tests which need a real server.
//! Passive ports are published on the same host ports, so the address advertised in `PASV`
//! replies can be used as it is.

use std::borrow::Cow;

use testcontainers::core::{CmdWaitFor, ExecCommand, IntoContainerPort, WaitFor};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, Image, ImageExt};

use crate::SessionConfig;

/// Passive port range of the image
const PASSIVE_PORTS: std::ops::RangeInclusive<u16> = 30000..=30009;

#[derive(Debug, Default, Clone)]
struct PureFtpImage {
    _priv: (),
}

impl Image for PureFtpImage {
    fn name(&self) -> &str {
        "stilliard/pure-ftpd"
    }

    fn tag(&self) -> &str {
        "latest"
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout("Starting Pure-FTPd")]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        vec![
            ("PUBLICHOST", "localhost"),
            ("FTP_USER_NAME", "test"),
            ("FTP_USER_PASS", "test"),
            ("FTP_USER_HOME", "/home/test"),
        ]
    }
}

pub struct SyncPureFtpRunner {
    container: Container<PureFtpImage>,
    ftp_port: u16,
}

impl SyncPureFtpRunner {
    pub fn start() -> Self {
        let ftp_port = free_port();
        let mut image = PureFtpImage::default().with_mapped_port(ftp_port, 21.tcp());
        for port in PASSIVE_PORTS {
            image = image.with_mapped_port(port, port.tcp());
        }
        let container = image.start().expect("Failed to start container");

        let resp = container
            .exec(
                ExecCommand::new(["/bin/mkdir", "-p", "/home/test/pub"])
                    .with_cmd_ready_condition(CmdWaitFor::Exit { code: Some(0) }),
            )
            .expect("Failed to create directory");
        assert_eq!(
            resp.exit_code()
                .expect("failed to get exit code for mkdir")
                .expect("no exit code for mkdir"),
            0
        );

        Self {
            container,
            ftp_port,
        }
    }

    pub fn get_ftp_port(&self) -> u16 {
        self.ftp_port
    }

    pub fn id(&self) -> &str {
        self.container.id()
    }

    /// Plain session configuration pointing to the container
    pub fn config(&self) -> SessionConfig {
        SessionConfig::new("127.0.0.1").with_port(self.get_ftp_port())
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("no free port")
}

#[cfg(test)]
mod test {

    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use rand::distr::Alphanumeric;
    use rand::{rng, Rng};
    use serial_test::serial;

    use super::*;
    use crate::{FtpSession, SessionState, TransferType};

    fn with_test_session<F>(f: F)
    where
        F: FnOnce(&mut FtpSession),
    {
        crate::log_init();
        let container = SyncPureFtpRunner::start();
        let mut session = FtpSession::new(container.config());
        session.login("test", "test").unwrap();
        let tempdir = generate_tempdir();
        session.cwd(tempdir.as_str(), true).unwrap();

        f(&mut session);

        session.cdup().unwrap();
        session.rmdir(tempdir.as_str()).unwrap();
        session.logout().unwrap();
        drop(container);
    }

    fn generate_tempdir() -> String {
        let mut rng = rng();
        let name: String = std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(5)
            .collect();
        format!("temp_{name}")
    }

    fn is_send<T: Send>(_send: T) {}

    #[test]
    #[ignore = "just needs to compile"]
    fn session_should_be_send() {
        let session = FtpSession::new(SessionConfig::new("127.0.0.1"));
        is_send::<FtpSession>(session);
    }

    #[test]
    #[ignore = "needs docker"]
    #[serial]
    fn should_connect_and_keep_welcome_message() {
        crate::log_init();
        let container = SyncPureFtpRunner::start();
        debug!("pure-ftpd running in {}", container.id());
        let mut session = FtpSession::new(container.config());
        session.connect().unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session
            .get_welcome_msg()
            .unwrap()
            .contains("You will be disconnected after 15 minutes of inactivity."));
        session.login("test", "test").unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        session.logout().unwrap();
    }

    #[test]
    #[ignore = "needs docker"]
    #[serial]
    fn should_put_list_and_get_file() {
        with_test_session(|session| {
            let content = b"test data\nsecond line\n".to_vec();
            assert_eq!(
                session
                    .put(&mut Cursor::new(content.clone()), "test.txt")
                    .unwrap(),
                content.len() as u64
            );
            assert_eq!(session.size("test.txt").unwrap(), content.len() as u64);
            assert!(session.mdtm("test.txt").is_ok());

            let listing = session.list(None).unwrap();
            assert_eq!(listing.skipped, 0);
            let names: Vec<&str> = listing.iter().map(|entry| entry.name()).collect();
            assert!(names.contains(&"test.txt"));

            let mut sink = Vec::new();
            session.get("test.txt", &mut sink).unwrap();
            assert_eq!(sink, content);

            session.rename("test.txt", "renamed.txt").unwrap();
            assert_eq!(session.nlst(None).unwrap(), vec!["renamed.txt".to_string()]);
            session.rm("renamed.txt").unwrap();
        });
    }

    #[test]
    #[ignore = "needs docker"]
    #[serial]
    fn should_transfer_ascii_file() {
        with_test_session(|session| {
            session.set_transfer_type(TransferType::Ascii).unwrap();
            session
                .put(&mut Cursor::new(b"one\ntwo\n".to_vec()), "ascii.txt")
                .unwrap();
            let mut sink = Vec::new();
            session.get("ascii.txt", &mut sink).unwrap();
            let mut expected = b"one".to_vec();
            expected.extend_from_slice(crate::transfer::LOCAL_EOL);
            expected.extend_from_slice(b"two");
            expected.extend_from_slice(crate::transfer::LOCAL_EOL);
            assert_eq!(sink, expected);
            session.set_transfer_type(TransferType::Binary).unwrap();
            session.rm("ascii.txt").unwrap();
        });
    }

    #[test]
    #[ignore = "needs docker"]
    #[serial]
    fn should_list_directories() {
        with_test_session(|session| {
            session.mkdir("sub").unwrap();
            session
                .put(&mut Cursor::new(b"x".to_vec()), "file.txt")
                .unwrap();
            let directories = session.list_directories(".").unwrap();
            assert!(directories.iter().all(|entry| entry.is_directory()));
            assert!(directories.iter().any(|entry| entry.name() == "sub"));
            assert!(!directories.iter().any(|entry| entry.name() == "file.txt"));
            session.rm("file.txt").unwrap();
            session.rmdir("sub").unwrap();
        });
    }
}
