//! # Transfer
//!
//! Move bytes between a local source or sink and an open data connection.
//! Every function consumes the connection and closes it once the stream is over.

mod ascii;

use std::io::{self, BufRead, BufReader, Read, Write};

pub use self::ascii::LOCAL_EOL;
use self::ascii::{FromNetwork, ToNetwork};
use super::data::DataConnection;
use crate::list::EntryReader;
use crate::types::{Channel, FtpError, FtpResult, TransferType};

const BUFFER_SIZE: usize = 64 * 1024;

/// Send everything `source` yields to the server; returns the number of bytes read from `source`
pub fn upload<R: Read + ?Sized>(mut connection: DataConnection, source: &mut R) -> FtpResult<u64> {
    let mut translator = match connection.transfer_type() {
        TransferType::Ascii => Some(ToNetwork::default()),
        TransferType::Binary => None,
    };
    let mut buffer = vec![0; BUFFER_SIZE];
    let mut translated = Vec::new();
    let mut transferred = 0u64;
    loop {
        let read = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!("failed to read upload source: {err}");
                return Err(FtpError::Io(err));
            }
        };
        transferred += read as u64;
        let chunk = match translator.as_mut() {
            Some(translator) => {
                translated.clear();
                translator.translate(&buffer[..read], &mut translated);
                &translated[..]
            }
            None => &buffer[..read],
        };
        connection
            .write_all(chunk)
            .map_err(|err| FtpError::from_io(Channel::Data, err))?;
    }
    connection
        .close()
        .map_err(|err| FtpError::from_io(Channel::Data, err))?;
    debug!("uploaded {transferred} bytes");

    Ok(transferred)
}

/// Write everything the server sends to `sink`; returns the number of bytes written to `sink`
pub fn download<W: Write + ?Sized>(mut connection: DataConnection, sink: &mut W) -> FtpResult<u64> {
    let mut translator = match connection.transfer_type() {
        TransferType::Ascii => Some(FromNetwork::default()),
        TransferType::Binary => None,
    };
    let mut buffer = vec![0; BUFFER_SIZE];
    let mut translated = Vec::new();
    let mut transferred = 0u64;
    loop {
        let read = match connection.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(FtpError::from_io(Channel::Data, err)),
        };
        let chunk = match translator.as_mut() {
            Some(translator) => {
                translated.clear();
                translator.translate(&buffer[..read], &mut translated);
                &translated[..]
            }
            None => &buffer[..read],
        };
        write_sink(sink, chunk)?;
        transferred += chunk.len() as u64;
    }
    if let Some(translator) = translator.as_mut() {
        translated.clear();
        translator.finish(&mut translated);
        write_sink(sink, &translated)?;
        transferred += translated.len() as u64;
    }
    sink.flush().map_err(FtpError::Io)?;
    // the server closed its side already
    if let Err(err) = connection.close() {
        debug!("error closing data connection after download: {err}");
    }
    debug!("downloaded {transferred} bytes");

    Ok(transferred)
}

/// Read a whole listing as text
pub fn read_listing(connection: DataConnection) -> FtpResult<String> {
    let mut raw = Vec::new();
    download(connection, &mut raw)?;

    Ok(String::from_utf8_lossy(&raw).to_string())
}

/// Read a listing line by line, without terminators. Lines are decoded lossily
pub fn read_lines(connection: DataConnection) -> FtpResult<Vec<String>> {
    let mut reader = BufReader::new(connection);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|err| FtpError::from_io(Channel::Data, err))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        trace!("STREAM IN: {line:?}");
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    close_after_read(reader.into_inner());

    Ok(lines)
}

/// Parse a listing while it is read from the connection, handing each entry to `f`.
/// Returns the number of lines which couldn't be parsed
pub fn stream_entries<F>(connection: DataConnection, mut f: F) -> FtpResult<usize>
where
    F: FnMut(crate::FileEntry),
{
    let mut entries = EntryReader::new(BufReader::new(connection));
    for entry in entries.by_ref() {
        f(entry.map_err(|err| FtpError::from_io(Channel::Data, err))?);
    }
    let skipped = entries.skipped();
    close_after_read(entries.into_inner().into_inner());

    Ok(skipped)
}

fn write_sink<W: Write + ?Sized>(sink: &mut W, chunk: &[u8]) -> FtpResult<()> {
    sink.write_all(chunk).map_err(|err| {
        error!("failed to write download sink: {err}");
        FtpError::Io(err)
    })
}

fn close_after_read(connection: DataConnection) {
    if let Err(err) = connection.close() {
        debug!("error closing data connection after read: {err}");
    }
}
