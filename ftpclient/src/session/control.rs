//! # Control
//!
//! The control connection: commands out, replies in

use std::io::{self, BufRead, BufReader, Write};
use std::net::SocketAddr;

use super::data_stream::DataStream;
use crate::command::Command;
use crate::types::{Channel, FtpError, FtpResult, ProtocolError, Reply};

/// Control connection of a session
#[derive(Debug)]
pub(crate) struct ControlChannel {
    reader: BufReader<DataStream>,
}

impl ControlChannel {
    pub fn new(stream: DataStream) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Write a command to the server
    pub fn send(&mut self, command: &Command) -> FtpResult<()> {
        trace!("CC OUT: {}", command.loggable());
        let stream = self.reader.get_mut();
        stream
            .write_all(command.to_string().as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|err| FtpError::from_io(Channel::Control, err))
    }

    /// Read the next complete reply
    pub fn read_reply(&mut self) -> FtpResult<Reply> {
        read_reply(&mut self.reader)
    }

    /// Send a command and read its reply
    pub fn execute(&mut self, command: &Command) -> FtpResult<Reply> {
        self.send(command)?;
        self.read_reply()
    }

    pub fn local_addr(&self) -> FtpResult<SocketAddr> {
        self.stream().get_ref().local_addr().map_err(FtpError::Io)
    }

    pub fn peer_addr(&self) -> FtpResult<SocketAddr> {
        self.stream().get_ref().peer_addr().map_err(FtpError::Io)
    }

    pub fn stream(&self) -> &DataStream {
        self.reader.get_ref()
    }

    /// Give back the stream. Bytes buffered and not yet read are lost; the server sends
    /// nothing unsolicited while a TLS upgrade is pending
    pub fn into_stream(self) -> DataStream {
        self.reader.into_inner()
    }
}

/// Read a reply from `reader`.
///
/// A reply is either a single line `ddd text` or a multi-line block opened by `ddd-text`
/// and closed by the first line starting with the same code followed by a space.
/// Lines in between are kept verbatim, even when they look like replies with another code.
pub(crate) fn read_reply<R: BufRead>(reader: &mut R) -> FtpResult<Reply> {
    let first = read_line(reader)?;
    trace!("CC IN: {first:?}");
    let code = parse_code(&first)?;
    let mut lines = Vec::new();
    match first.as_bytes().get(3) {
        None => lines.push(String::new()),
        Some(b' ') => lines.push(first[4..].to_string()),
        Some(b'-') => {
            lines.push(first[4..].to_string());
            let terminator = format!("{code} ");
            loop {
                let line = read_line(reader)?;
                trace!("CC IN: {line:?}");
                if let Some(text) = line.strip_prefix(&terminator) {
                    lines.push(text.to_string());
                    break;
                } else if line == terminator.trim_end() {
                    lines.push(String::new());
                    break;
                }
                lines.push(line);
            }
        }
        Some(_) => {
            return Err(ProtocolError::Malformed(format!("bad separator in {first:?}")).into());
        }
    }

    Ok(Reply::new(code, lines))
}

/// Read a line, without its terminator. EOF is an error, since the server never closes the
/// control connection in the middle of a reply
fn read_line<R: BufRead>(reader: &mut R) -> FtpResult<String> {
    let mut buf = Vec::new();
    let read = reader
        .read_until(b'\n', &mut buf)
        .map_err(|err| FtpError::from_io(Channel::Control, err))?;
    if read == 0 {
        return Err(FtpError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "control connection closed by server",
        )));
    }
    if buf.ends_with(b"\n") {
        buf.pop();
    }
    if buf.ends_with(b"\r") {
        buf.pop();
    }

    Ok(String::from_utf8_lossy(&buf).to_string())
}

/// Get the reply code from the first three characters of the line
fn parse_code(line: &str) -> FtpResult<u32> {
    line.get(0..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse::<u32>().ok())
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| ProtocolError::Malformed(format!("bad reply code in {line:?}")).into())
}

#[cfg(test)]
mod test {

    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::status::Status;

    fn read(input: &str) -> FtpResult<Reply> {
        read_reply(&mut Cursor::new(input.as_bytes().to_vec()))
    }

    #[test]
    fn should_read_single_line_reply() {
        let reply = read("220 Service ready\r\n").unwrap();
        assert_eq!(reply.status(), Status::Ready);
        assert_eq!(reply.lines, vec!["Service ready".to_string()]);
    }

    #[test]
    fn should_read_multi_line_reply() {
        let reply = read("211-Features:\r\n MDTM\r\n SIZE\r\n211 End\r\n").unwrap();
        assert_eq!(reply.code, 211);
        assert_eq!(
            reply.lines,
            vec![
                "Features:".to_string(),
                " MDTM".to_string(),
                " SIZE".to_string(),
                "End".to_string(),
            ]
        );
    }

    #[test]
    fn should_keep_lines_with_other_codes_in_multi_line_reply() {
        let reply = read("230-Welcome\r\n220 not the end\r\n230-still not\r\n230 Done\r\n").unwrap();
        assert_eq!(reply.code, 230);
        assert_eq!(reply.lines.len(), 4);
        assert_eq!(reply.lines[1], "220 not the end");
        assert_eq!(reply.lines[2], "230-still not");
        assert_eq!(reply.lines[3], "Done");
    }

    #[test]
    fn should_read_replies_one_at_a_time() {
        let mut reader = Cursor::new(b"150 Opening\r\n226 Done\r\n".to_vec());
        assert_eq!(read_reply(&mut reader).unwrap().code, 150);
        assert_eq!(read_reply(&mut reader).unwrap().code, 226);
    }

    #[test]
    fn should_accept_bare_lf_and_bare_code() {
        let reply = read("200 Ok\n").unwrap();
        assert_eq!(reply.first_line(), "Ok");
        let reply = read("200\r\n").unwrap();
        assert_eq!(reply.code, 200);
        assert_eq!(reply.first_line(), "");
    }

    #[test]
    fn should_reject_malformed_replies() {
        assert!(matches!(
            read("hello world\r\n").unwrap_err(),
            FtpError::Protocol(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            read("099 too low\r\n").unwrap_err(),
            FtpError::Protocol(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            read("200_bad separator\r\n").unwrap_err(),
            FtpError::Protocol(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            read("2\r\n").unwrap_err(),
            FtpError::Protocol(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn should_fail_on_eof() {
        assert!(matches!(read("").unwrap_err(), FtpError::Io(_)));
        assert!(matches!(
            read("211-Features:\r\n MDTM\r\n").unwrap_err(),
            FtpError::Io(_)
        ));
    }
}
