//! # List
//!
//! This module exposes the parser for directory listings.
//!
//! There's no specification for the `LIST` output, so what comes back depends on the remote server.
//! The parser recognizes each line by its shape:
//!
//! - Unix `ls -l` lines, starting with a permission string (`-rw-r--r--`)
//! - machine readable `MLSD`/`MLST` lines, `fact=value;...; name`
//! - DOS/IIS lines, `MM-DD-YY  HH:MMAM  <DIR>|size name`
//!
//! Any other style can be added as a new [`ListingStyle`].
//! Lines which can't be parsed are skipped and counted, they never fail the listing.
//!
//! ```rust
//! use ftpclient::list;
//!
//! let listing = list::parse(
//!     "total 2\r\n-rw-r--r-- 1 0 0 8192 Nov 5 2018 omar.txt\r\nnot a listing line\r\n",
//! );
//! assert_eq!(listing.entries.len(), 1);
//! assert_eq!(listing.entries[0].name(), "omar.txt");
//! assert_eq!(listing.skipped, 1);
//! ```

mod file_type;

use std::convert::TryFrom;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use chrono::prelude::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono::{Datelike, Days};
pub use file_type::FileType;
use lazy_regex::{Lazy, Regex};
use thiserror::Error;

// -- Regex

/// POSIX system regex to parse list output
static POSIX_LS_RE: Lazy<Regex> = lazy_regex!(
    r#"^([\-ld])([\-rwxsStT]{9})[+@.]?\s+(\d+)\s+(\S+)\s+(\S+)\s+(\d+)\s+(\w{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4}))\s+(.+)$"#
);
/// DOS system regex to parse list output
static DOS_LS_RE: Lazy<Regex> = lazy_regex!(
    r#"^(\d{2}-\d{2}-\d{2,4}\s+\d{1,2}:\d{2}\s*[AaPp][Mm])\s+(<DIR>)?([\d,]*)\s+(.+)$"#
);
/// Leading permission string of an `ls -l` line
static POSIX_SHAPE_RE: Lazy<Regex> = lazy_regex!(r#"^[\-ldcbps][\-rwxsStT]{9}"#);
/// Leading date of a DOS line
static DOS_SHAPE_RE: Lazy<Regex> = lazy_regex!(r#"^\d{2}-\d{2}-\d{2,4}\s"#);
/// `ls -l` header line
static TOTAL_RE: Lazy<Regex> = lazy_regex!(r#"^total\s+\d+\s*$"#);

// -- File entry

/// Describes an entry of a directory listing
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FileEntry {
    /// File name
    name: String,
    /// Whether it is a directory, a file or a symlink
    file_type: FileType,
    /// File size in bytes
    size: u64,
    /// Last time the file was modified, if the server said so
    modified: Option<SystemTime>,
    /// Permissions as the server wrote them
    permissions: Option<String>,
    /// Owner user id (POSIX only)
    uid: Option<u32>,
    /// Owner group id (POSIX only)
    gid: Option<u32>,
}

/// Listing styles the parser recognizes
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListingStyle {
    /// `ls -l` output
    Unix,
    /// `MLSD` / `MLST` facts
    Mlsx,
    /// DOS/IIS output
    Dos,
}

/// Why a listing line couldn't be parsed
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("Syntax error: invalid line")]
    SyntaxError,
    #[error("Invalid date")]
    InvalidDate,
    #[error("Bad file size")]
    BadSize,
}

/// A parsed listing: the entries in server order and the number of lines skipped
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Listing {
    pub entries: Vec<FileEntry>,
    pub skipped: usize,
}

impl FileEntry {
    // -- getters

    /// Get file name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the entry type
    pub fn file_type(&self) -> &FileType {
        &self.file_type
    }

    /// Get whether file is a directory
    pub fn is_directory(&self) -> bool {
        self.file_type.is_directory()
    }

    /// Get whether file is a file
    pub fn is_file(&self) -> bool {
        self.file_type.is_file()
    }

    /// Get whether file is a symlink
    pub fn is_symlink(&self) -> bool {
        self.file_type.is_symlink()
    }

    /// Returns, if available, the file the symlink is pointing to
    pub fn symlink(&self) -> Option<&Path> {
        self.file_type.symlink()
    }

    /// Returned file size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the last time the file was modified
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Raw permission string: `-rwxr-xr-x` for `ls -l`, the `unix.mode` or `perm` fact for MLSx
    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// Returns when available the owner user of the file. (POSIX only)
    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// Returns when available the owner group of the file. (POSIX only)
    pub fn gid(&self) -> Option<u32> {
        self.gid
    }

    // -- parsers

    /// Parse an output line from a MLSD or MLST command
    pub fn from_mlsx_line(line: &str) -> Result<Self, ParseError> {
        let (facts, name) = line.split_once(' ').ok_or(ParseError::SyntaxError)?;
        if name.is_empty() || !facts.contains('=') {
            return Err(ParseError::SyntaxError);
        }
        let mut file_type = None;
        let mut size = 0;
        let mut modified = None;
        let mut perm = None;
        let mut mode = None;
        let mut uid = None;
        let mut gid = None;
        for fact in facts.split(';').filter(|fact| !fact.is_empty()) {
            let (key, value) = fact.split_once('=').ok_or(ParseError::SyntaxError)?;
            match key.to_ascii_lowercase().as_str() {
                "type" => file_type = Some(Self::parse_mlsx_type(value)?),
                "size" | "sizd" => {
                    size = value.parse::<u64>().map_err(|_| ParseError::BadSize)?;
                }
                "modify" => modified = Some(Self::parse_mlsx_time(value)?),
                "perm" => perm = Some(value.to_string()),
                "unix.mode" => mode = Some(value.to_string()),
                "unix.uid" | "unix.owner" => uid = value.parse::<u32>().ok(),
                "unix.gid" | "unix.group" => gid = value.parse::<u32>().ok(),
                _ => continue,
            }
        }
        let file_type = file_type.ok_or(ParseError::SyntaxError)?;
        trace!("Parsed MLSx line {line}");

        Ok(Self {
            name: name.to_string(),
            file_type,
            size,
            modified,
            permissions: mode.or(perm),
            uid,
            gid,
        })
    }

    /// Parse a POSIX LIST output line and if it is valid, return a `FileEntry` instance.
    pub fn from_posix_line(line: &str) -> Result<Self, ParseError> {
        let metadata = POSIX_LS_RE
            .captures(line)
            .ok_or(ParseError::SyntaxError)?;
        trace!("Parsed POSIX line {line}");
        // NOTE: metadata fmt: (regex, file_type, permissions, link_count, uid, gid, filesize, mtime, filename)
        let kind = &metadata[1];
        let size = metadata[6]
            .parse::<u64>()
            .map_err(|_| ParseError::BadSize)?;
        let modified = Self::parse_lstime(metadata[7].trim())?;
        let (name, file_type) = match kind {
            "d" => (metadata[8].to_string(), FileType::Directory),
            "l" => {
                let (name, target) = Self::get_name_and_link(&metadata[8]);
                (name, FileType::Symlink(target))
            }
            _ => (metadata[8].to_string(), FileType::File),
        };

        Ok(Self {
            name,
            file_type,
            size,
            modified: Some(modified),
            permissions: Some(format!("{}{}", kind, &metadata[2])),
            uid: metadata[4].parse::<u32>().ok(),
            gid: metadata[5].parse::<u32>().ok(),
        })
    }

    /// Try to parse a "LIST" output command line in DOS format.
    /// DOS syntax has the following syntax:
    ///
    /// ```text
    /// {DATE} {TIME} {<DIR> | SIZE} {FILENAME}
    /// 10-19-20  03:19PM <DIR> pub
    /// 04-08-14  03:09PM 403   readme.txt
    /// ```
    pub fn from_dos_line(line: &str) -> Result<Self, ParseError> {
        let metadata = DOS_LS_RE.captures(line).ok_or(ParseError::SyntaxError)?;
        trace!("Parsed DOS line {line}");
        let modified = Self::parse_dostime(&metadata[1])?;
        let (file_type, size) = match metadata.get(2) {
            Some(_) => (FileType::Directory, 0),
            None => {
                let size = metadata[3].replace(',', "");
                if size.is_empty() {
                    return Err(ParseError::BadSize);
                }
                let size = size.parse::<u64>().map_err(|_| ParseError::BadSize)?;
                (FileType::File, size)
            }
        };

        Ok(Self {
            name: metadata[4].to_string(),
            file_type,
            size,
            modified: Some(modified),
            permissions: None,
            uid: None,
            gid: None,
        })
    }

    /// Returns from a `ls -l` command output file name token, the name of the file and the symbolic link (if there is any)
    fn get_name_and_link(token: &str) -> (String, Option<PathBuf>) {
        match token.split_once(" -> ") {
            Some((name, target)) => (name.to_string(), Some(PathBuf::from(target))),
            None => (token.to_string(), None),
        }
    }

    /// Parse the value of the MLSx `type` fact
    fn parse_mlsx_type(value: &str) -> Result<FileType, ParseError> {
        let kind = value.to_ascii_lowercase();
        match kind.as_str() {
            "file" => Ok(FileType::File),
            "dir" | "cdir" | "pdir" => Ok(FileType::Directory),
            "link" => Ok(FileType::Symlink(None)),
            kind if kind.starts_with("os.unix=slink") || kind.starts_with("os.unix=symlink") => {
                let target = value
                    .split_once(':')
                    .map(|(_, target)| target)
                    .filter(|target| !target.is_empty())
                    .map(PathBuf::from);
                Ok(FileType::Symlink(target))
            }
            _ => Err(ParseError::SyntaxError),
        }
    }

    /// Convert MLSD time (`YYYYMMDDHHMMSS[.sss]`, UTC) to System Time
    fn parse_mlsx_time(tm: &str) -> Result<SystemTime, ParseError> {
        let tm = tm.get(0..14).ok_or(ParseError::InvalidDate)?;
        NaiveDateTime::parse_from_str(tm, "%Y%m%d%H%M%S")
            .map(to_system_time)
            .map_err(|_| ParseError::InvalidDate)
    }

    /// Convert ls syntax time to System Time
    /// ls time has two possible syntax:
    /// 1. within the last six months: %b %d %H:%M (e.g. Nov 5 13:46)
    /// 2. else: %b %d %Y (e.g. Nov 5 2019)
    ///
    /// In the first case the year is the current one, unless that would put the date
    /// in the future, in which case it is the previous one.
    fn parse_lstime(tm: &str) -> Result<SystemTime, ParseError> {
        if let Ok(date) = NaiveDate::parse_from_str(tm, "%b %d %Y") {
            return Ok(to_system_time(date.and_time(NaiveTime::MIN)));
        }
        let now = Utc::now().naive_utc();
        let horizon = now.checked_add_days(Days::new(1)).unwrap_or(now);
        let with_year = |year: i32| {
            NaiveDateTime::parse_from_str(&format!("{tm} {year}"), "%b %d %H:%M %Y").ok()
        };
        with_year(now.year())
            .filter(|datetime| *datetime <= horizon)
            .or_else(|| with_year(now.year() - 1))
            .map(to_system_time)
            .ok_or(ParseError::InvalidDate)
    }

    /// Parse date time string in DOS representation ("%m-%d-%y %I:%M%p")
    fn parse_dostime(tm: &str) -> Result<SystemTime, ParseError> {
        NaiveDateTime::parse_from_str(tm, "%m-%d-%y %I:%M%p")
            .or_else(|_| NaiveDateTime::parse_from_str(tm, "%m-%d-%Y %I:%M%p"))
            .map(to_system_time)
            .map_err(|_| ParseError::InvalidDate)
    }
}

impl FromStr for FileEntry {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl TryFrom<&str> for FileEntry {
    type Error = ParseError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        match ListingStyle::detect(line) {
            Some(ListingStyle::Unix) => Self::from_posix_line(line),
            Some(ListingStyle::Mlsx) => Self::from_mlsx_line(line),
            Some(ListingStyle::Dos) => Self::from_dos_line(line),
            None => Err(ParseError::SyntaxError),
        }
    }
}

impl ListingStyle {
    /// Guess the style of a listing line from its shape
    pub fn detect(line: &str) -> Option<Self> {
        if POSIX_SHAPE_RE.is_match(line) {
            Some(Self::Unix)
        } else if line
            .split_once(' ')
            .is_some_and(|(facts, _)| facts.contains('=') && facts.ends_with(';'))
        {
            Some(Self::Mlsx)
        } else if DOS_SHAPE_RE.is_match(line) {
            Some(Self::Dos)
        } else {
            None
        }
    }
}

impl Listing {
    /// Iterate over the entries
    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep the entries matching `predicate`, in server order
    pub fn filter<P>(self, mut predicate: P) -> Vec<FileEntry>
    where
        P: FnMut(&FileEntry) -> bool,
    {
        self.entries
            .into_iter()
            .filter(|entry| predicate(entry))
            .collect()
    }
}

impl IntoIterator for Listing {
    type Item = FileEntry;
    type IntoIter = std::vec::IntoIter<FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// -- lazy parsing

/// Parse a whole listing
pub fn parse(raw: &str) -> Listing {
    let mut entries = Entries::new(raw);
    let parsed = entries.by_ref().collect();

    Listing {
        entries: parsed,
        skipped: entries.skipped(),
    }
}

/// Lazily parses the lines of a listing held in memory
#[derive(Debug)]
pub struct Entries<'a> {
    lines: std::str::Lines<'a>,
    skipped: usize,
}

impl<'a> Entries<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            lines: raw.lines(),
            skipped: 0,
        }
    }

    /// Lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Entries<'_> {
    type Item = FileEntry;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(entry) = parse_line(line, &mut self.skipped) {
                return Some(entry);
            }
        }
        None
    }
}

/// Lazily parses a listing while it is read, one line at a time
#[derive(Debug)]
pub struct EntryReader<R> {
    reader: R,
    skipped: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> EntryReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            skipped: 0,
            buf: Vec::new(),
        }
    }

    /// Lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for EntryReader<R> {
    type Item = io::Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.buf);
                    if let Some(entry) = parse_line(&line, &mut self.skipped) {
                        return Some(Ok(entry));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Parse a single listing line; blank lines and the `total` header are ignored, bad lines counted
fn parse_line(line: &str, skipped: &mut usize) -> Option<FileEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || TOTAL_RE.is_match(line) {
        return None;
    }
    match FileEntry::try_from(line) {
        Ok(entry) => Some(entry),
        Err(err) => {
            debug!("skipping listing line {line:?}: {err}");
            *skipped += 1;
            None
        }
    }
}

fn to_system_time(datetime: NaiveDateTime) -> SystemTime {
    let secs = datetime.and_utc().timestamp();
    if secs >= 0 {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        SystemTime::UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

#[cfg(test)]
mod test {

    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    fn epoch(secs: u64) -> Option<SystemTime> {
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn parse_posix_line() {
        let file = FileEntry::from_str("-rw-rw-r-- 1 1000 100 8192 Nov 5 2018 omar.txt").unwrap();
        assert_eq!(file.name(), "omar.txt");
        assert!(file.is_file());
        assert_eq!(file.size(), 8192);
        assert_eq!(file.modified(), epoch(1541376000));
        assert_eq!(file.permissions(), Some("-rw-rw-r--"));
        assert_eq!(file.uid(), Some(1000));
        assert_eq!(file.gid(), Some(100));

        let file = FileEntry::from_str("drwxr-xr-x 2 ftp ftp 4096 Nov  5  2018 docs").unwrap();
        assert!(file.is_directory());
        assert_eq!(file.uid(), None);
        assert_eq!(file.gid(), None);
        assert_eq!(file.modified(), epoch(1541376000));
    }

    #[test]
    fn should_parse_posix_names_with_spaces_and_links() {
        let file = FileEntry::from_str("-rw-r--r--+ 1 0 0 10 Nov 5 2018 my cool file.txt").unwrap();
        assert_eq!(file.name(), "my cool file.txt");

        let file =
            FileEntry::from_str("lrwxrwxrwx 1 0 0 12 Nov 5 2018 current -> releases/42").unwrap();
        assert_eq!(file.name(), "current");
        assert!(file.is_symlink());
        assert_eq!(file.symlink(), Some(Path::new("releases/42")));

        let file = FileEntry::from_str("-rw-r--r-- 1 0 0 10 Nov 5 2018 1234 5678.txt").unwrap();
        assert_eq!(file.name(), "1234 5678.txt");
    }

    #[test]
    fn should_parse_posix_recent_dates_in_the_past() {
        let file = FileEntry::from_str("-rw-r--r-- 1 0 0 10 Jan 1 00:00 new.txt").unwrap();
        let modified = file.modified().unwrap();
        assert!(modified <= SystemTime::now() + Duration::from_secs(86400));
        let file = FileEntry::from_str("-rw-r--r-- 1 0 0 10 Dec 31 23:59 old.txt").unwrap();
        assert!(file.modified().unwrap() <= SystemTime::now() + Duration::from_secs(86400));
    }

    #[test]
    fn should_reject_bad_posix_lines() {
        assert_eq!(
            FileEntry::from_posix_line("-rw-rw-r-- 1 0 0 8192 Nov 5 omar.txt").unwrap_err(),
            ParseError::SyntaxError
        );
        assert_eq!(
            FileEntry::from_posix_line("-rw-rw-r-- 1 0 0 8192 Nop 5 2018 omar.txt").unwrap_err(),
            ParseError::InvalidDate
        );
        assert_eq!(
            FileEntry::from_posix_line("-rw-rw-r-- 1 0 0 99999999999999999999 Nov 5 2018 a")
                .unwrap_err(),
            ParseError::BadSize
        );
    }

    #[test]
    fn parse_mlsx_line() {
        let file = FileEntry::from_str(
            "type=file;size=8192;modify=20181105163248;unix.mode=0644;unix.uid=1000; omar.txt",
        )
        .unwrap();
        assert_eq!(file.name(), "omar.txt");
        assert!(file.is_file());
        assert_eq!(file.size(), 8192);
        assert_eq!(file.modified(), epoch(1541435568));
        assert_eq!(file.permissions(), Some("0644"));
        assert_eq!(file.uid(), Some(1000));

        let file = FileEntry::from_str("type=dir;modify=20181105163248.123;perm=flcdmpe; my dir")
            .unwrap();
        assert_eq!(file.name(), "my dir");
        assert!(file.is_directory());
        assert_eq!(file.modified(), epoch(1541435568));
        assert_eq!(file.permissions(), Some("flcdmpe"));

        let file = FileEntry::from_str("type=OS.unix=slink:/srv/Target;size=0; link").unwrap();
        assert_eq!(file.symlink(), Some(Path::new("/srv/Target")));

        let file = FileEntry::from_str("type=file; no-time").unwrap();
        assert_eq!(file.modified(), None);
    }

    #[test]
    fn should_reject_bad_mlsx_lines() {
        assert_eq!(
            FileEntry::from_mlsx_line("size=10; nameless-type").unwrap_err(),
            ParseError::SyntaxError
        );
        assert_eq!(
            FileEntry::from_mlsx_line("type=socket; sock").unwrap_err(),
            ParseError::SyntaxError
        );
        assert_eq!(
            FileEntry::from_mlsx_line("type=file;size=big; file").unwrap_err(),
            ParseError::BadSize
        );
        assert_eq!(
            FileEntry::from_mlsx_line("type=file;modify=2018; file").unwrap_err(),
            ParseError::InvalidDate
        );
    }

    #[test]
    fn parse_dos_line() {
        let file = FileEntry::from_str("04-08-14  03:09PM       403 readme.txt").unwrap();
        assert_eq!(file.name(), "readme.txt");
        assert!(file.is_file());
        assert_eq!(file.size(), 403);
        assert_eq!(file.modified(), epoch(1396969740));

        let file = FileEntry::from_str("10-19-20  03:19PM <DIR> pub").unwrap();
        assert_eq!(file.name(), "pub");
        assert!(file.is_directory());
        assert_eq!(file.size(), 0);
        assert_eq!(file.modified(), epoch(1603120740));

        let file = FileEntry::from_str("10-19-2020  03:19PM    1,024 big file.bin").unwrap();
        assert_eq!(file.name(), "big file.bin");
        assert_eq!(file.size(), 1024);
        assert_eq!(file.modified(), epoch(1603120740));
    }

    #[test]
    fn should_detect_listing_style() {
        assert_eq!(
            ListingStyle::detect("-rw-rw-r-- 1 0 0 8192 Nov 5 2018 omar.txt"),
            Some(ListingStyle::Unix)
        );
        assert_eq!(
            ListingStyle::detect("type=file;size=1; omar.txt"),
            Some(ListingStyle::Mlsx)
        );
        assert_eq!(
            ListingStyle::detect("04-08-14  03:09PM 403 readme.txt"),
            Some(ListingStyle::Dos)
        );
        assert_eq!(ListingStyle::detect("readme.txt"), None);
    }

    #[test]
    fn should_parse_listing_skipping_bad_lines() {
        let listing = parse(
            "total 12\r\n\
             -rw-r--r-- 1 0 0 10 Nov 5 2018 b.txt\r\n\
             this is not a listing line\r\n\
             \r\n\
             drwxr-xr-x 2 0 0 4096 Nov 5 2018 a\r\n\
             -rw-r--r-- 1 0 0 ten Nov 5 2018 broken.txt\r\n\
             type=file;size=1; c.txt\r\n",
        );
        assert_eq!(
            listing
                .iter()
                .map(|entry| entry.name())
                .collect::<Vec<&str>>(),
            vec!["b.txt", "a", "c.txt"]
        );
        assert_eq!(listing.skipped, 2);
        assert_eq!(listing.len(), 3);
    }

    #[test]
    fn should_parse_empty_listing() {
        let listing = parse("total 0\r\n");
        assert!(listing.is_empty());
        assert_eq!(listing.skipped, 0);
    }

    #[test]
    fn should_filter_listing() {
        let listing = parse(
            "-rw-r--r-- 1 0 0 10 Nov 5 2018 b.txt\ndrwxr-xr-x 2 0 0 4096 Nov 5 2018 a\n",
        );
        let dirs = listing.filter(FileEntry::is_directory);
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name(), "a");
    }

    #[test]
    fn should_parse_lazily() {
        let mut entries = Entries::new("garbage\n-rw-r--r-- 1 0 0 10 Nov 5 2018 b.txt\nmore garbage\n");
        assert_eq!(entries.next().unwrap().name(), "b.txt");
        assert_eq!(entries.skipped(), 1);
        assert!(entries.next().is_none());
        assert_eq!(entries.skipped(), 2);
    }

    #[test]
    fn should_parse_from_reader() {
        let mut reader = EntryReader::new(Cursor::new(
            b"type=dir; d\r\n\xff\xfe junk\r\ntype=file;size=3; f\xc3\xa0.txt\r\n".to_vec(),
        ));
        let names = reader
            .by_ref()
            .map(|entry| entry.unwrap().name().to_string())
            .collect::<Vec<String>>();
        assert_eq!(names, vec!["d".to_string(), "fà.txt".to_string()]);
        assert_eq!(reader.skipped(), 1);
    }
}
