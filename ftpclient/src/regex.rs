//! # FTP Regex
//!
//! Regular expressions to parse FTP replies

use lazy_regex::{Lazy, Regex};

/// This regex extracts IP and Port details from PASV command reply.
/// The regex looks for the pattern h1,h2,h3,h4,p1,p2; the parentheses are optional since
/// some servers omit them.
pub static PASV_PORT_RE: Lazy<Regex> =
    lazy_regex!(r"(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3}),(\d{1,3})");

/// This regex extract the port number from EPSV command reply.
/// The regex looks for the pattern (|||port_number|)
pub static EPSV_PORT_RE: Lazy<Regex> = lazy_regex!(r"\(\|\|\|(\d+)\|\)");

/// This regex extracts modification time from MDTM command reply.
pub static MDTM_RE: Lazy<Regex> = lazy_regex!(r"\b(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})(\d{2})\b");

/// This regex extracts file size from SIZE command reply.
pub static SIZE_RE: Lazy<Regex> = lazy_regex!(r"(\d+)\s*$");
