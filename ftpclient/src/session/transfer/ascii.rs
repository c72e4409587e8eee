//! # Ascii
//!
//! Line terminator translation for `TYPE A` transfers. Both translators keep state
//! between calls so a terminator split across two buffers is handled.

/// Line terminator of the local platform
#[cfg(windows)]
pub const LOCAL_EOL: &[u8] = b"\r\n";
#[cfg(not(windows))]
pub const LOCAL_EOL: &[u8] = b"\n";

/// Local text to network text: every LF not preceded by CR becomes CRLF
#[derive(Debug, Default)]
pub struct ToNetwork {
    last_was_cr: bool,
}

impl ToNetwork {
    pub fn translate(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.reserve(input.len() + input.len() / 16);
        for &byte in input {
            if byte == b'\n' && !self.last_was_cr {
                output.push(b'\r');
            }
            output.push(byte);
            self.last_was_cr = byte == b'\r';
        }
    }
}

/// Network text to local text: CRLF becomes the local line terminator
#[derive(Debug, Default)]
pub struct FromNetwork {
    pending_cr: bool,
}

impl FromNetwork {
    pub fn translate(&mut self, input: &[u8], output: &mut Vec<u8>) {
        output.reserve(input.len());
        for &byte in input {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    output.extend_from_slice(LOCAL_EOL);
                    continue;
                }
                output.push(b'\r');
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                output.push(byte);
            }
        }
    }

    /// Flush a trailing CR held back at the end of the stream
    pub fn finish(&mut self, output: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            output.push(b'\r');
        }
    }
}
