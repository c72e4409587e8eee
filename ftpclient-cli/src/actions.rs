use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ftpclient::{
    FileEntry, FtpResult, FtpSession, Mode, RustlsConnector, Security, SessionConfig, TransferType,
};

pub fn quit(mut ftp: Option<FtpSession>) {
    if let Some(mut ftp) = ftp.take() {
        if !ftp.is_connected() {
            return;
        }
        match ftp.logout() {
            Ok(_) => println!("OK"),
            Err(err) => eprintln!("Failed to disconnect from remote: {err}"),
        }
    }
}

pub fn appe(ftp: &mut FtpSession, local: &Path, dest: &str) {
    let mut reader = match File::open(local) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to open local file for read: {err}");
            return;
        }
    };
    match ftp.append(&mut reader, dest) {
        Ok(bytes) => println!("OK: {bytes} bytes"),
        Err(err) => eprintln!("APPE error: {err}"),
    }
}

pub fn cdup(ftp: &mut FtpSession) {
    match ftp.cdup() {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("CDUP error: {err}"),
    }
}

/// Connect to `remote` (`host[:port]`); the port defaults to the one of `security`
pub fn connect(remote: &str, security: Security) -> Option<FtpSession> {
    let (host, port) = match parse_remote(remote) {
        Ok(remote) => remote,
        Err(err) => {
            eprintln!("{err}");
            return None;
        }
    };
    let mut config = SessionConfig::new(host).with_security(security);
    if let Some(port) = port {
        config = config.with_port(port);
    }
    let mut session = FtpSession::new(config);
    if security.is_secure() {
        // certificates are not verified
        session = session.with_tls_connector(RustlsConnector::dangerous_accept_any_certificate());
    }
    match session.connect() {
        Ok(_) => {
            if let Some(welcome) = session.get_welcome_msg() {
                println!("{welcome}");
            }
            println!("OK");
            Some(session)
        }
        Err(err) => {
            eprintln!("Failed to connect to remote: {err}");
            None
        }
    }
}

/// Split `host[:port]`. IPv6 literals take a port only when bracketed, as in `[::1]:2121`
fn parse_remote(remote: &str) -> Result<(&str, Option<u16>), String> {
    let parse_port = |port: &str| {
        port.parse::<u16>()
            .map_err(|_| format!("Invalid port: {port}"))
    };
    if let Some(bracketed) = remote.strip_prefix('[') {
        let (host, rest) = bracketed
            .split_once(']')
            .ok_or_else(|| format!("Invalid address: {remote}"))?;
        return match rest {
            "" => Ok((host, None)),
            rest => match rest.strip_prefix(':') {
                Some(port) => Ok((host, Some(parse_port(port)?))),
                None => Err(format!("Invalid address: {remote}")),
            },
        };
    }
    match remote.split_once(':') {
        Some((host, port)) if !port.contains(':') => Ok((host, Some(parse_port(port)?))),
        _ => Ok((remote, None)),
    }
}

pub fn cwd(ftp: &mut FtpSession, dir: &str, create: bool) {
    match ftp.cwd(dir, create) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("CWD error: {err}"),
    }
}

pub fn feat(ftp: &mut FtpSession) {
    match ftp.feat() {
        Ok(features) => {
            let mut features: Vec<_> = features.into_iter().collect();
            features.sort();
            for (name, value) in features {
                match value {
                    Some(value) => println!("{name} {value}"),
                    None => println!("{name}"),
                }
            }
        }
        Err(err) => eprintln!("FEAT error: {err}"),
    }
}

/// Download `file` to `dest`. When `dest` is a directory, or missing, the file keeps its name.
/// Existing local files are never overwritten
pub fn get(ftp: &mut FtpSession, file: &str, dest: Option<&Path>) {
    let base_name = Path::new(file)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(file));
    let dest = match dest {
        Some(dest) if dest.is_dir() => dest.join(base_name),
        Some(dest) => dest.to_path_buf(),
        None => base_name,
    };
    match download_to(&dest, |writer| ftp.get(file, writer)) {
        Ok(bytes) => println!("OK: {bytes} bytes written to {}", dest.display()),
        Err(err) => eprintln!("{err}"),
    }
}

/// Create `dest`, which must not exist yet, and fill it with `download`.
/// The file is removed if the download fails
fn download_to<F>(dest: &Path, download: F) -> Result<u64, String>
where
    F: FnOnce(&mut File) -> FtpResult<u64>,
{
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(w) => w,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(format!("Local file {} already exists", dest.display()));
        }
        Err(err) => return Err(format!("Failed to open destination file: {err}")),
    };
    match download(&mut writer) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(writer);
            if let Err(rm_err) = fs::remove_file(dest) {
                eprintln!("Failed to remove {}: {rm_err}", dest.display());
            }
            Err(format!("GET error: {err}"))
        }
    }
}

pub fn list(ftp: &mut FtpSession, p: Option<&str>) {
    match ftp.list(p) {
        Ok(listing) => {
            let skipped = listing.skipped;
            listing.iter().for_each(print_entry);
            if skipped > 0 {
                println!("({skipped} lines could not be parsed)");
            }
        }
        Err(err) => eprintln!("LIST error: {err}"),
    }
}

pub fn lsdir(ftp: &mut FtpSession, p: &str) {
    match ftp.list_directories(p) {
        Ok(entries) => entries.iter().for_each(print_entry),
        Err(err) => eprintln!("LSDIR error: {err}"),
    }
}

fn print_entry(entry: &FileEntry) {
    println!(
        "{:<10} {:>12} {}",
        entry.permissions().unwrap_or("-"),
        entry.size(),
        entry.name()
    );
}

pub fn login(ftp: &mut FtpSession) {
    // Read username
    print!("Username: ");
    let _ = io::stdout().flush();
    let mut username = String::new();
    if let Err(err) = io::stdin().read_line(&mut username) {
        eprintln!("Could not read username: {err}");
        return;
    }
    // Read password
    let password: String = match rpassword::prompt_password("Password: ") {
        Ok(p) => p,
        Err(err) => {
            eprintln!("Could not read password: {err}");
            return;
        }
    };
    // Login
    match ftp.login(username.trim(), password.as_str()) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("LOGIN error: {err}"),
    }
}

pub fn logout(ftp: &mut FtpSession) {
    match ftp.logout() {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("LOGOUT error: {err}"),
    }
}

pub fn mdtm(ftp: &mut FtpSession, f: &str) {
    match ftp.mdtm(f) {
        Ok(time) => println!("OK: {time}"),
        Err(err) => eprintln!("MDTM error: {err}"),
    }
}

pub fn mkdir(ftp: &mut FtpSession, f: &str) {
    match ftp.mkdir(f) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("MKDIR error: {err}"),
    }
}

pub fn set_mode(ftp: &mut FtpSession, mode: Mode) {
    match mode {
        Mode::Active => ftp.set_active_mode(),
        Mode::ExtendedPassive => ftp.set_extended_passive_mode(),
        Mode::Passive => ftp.set_passive_mode(),
    }
    println!("OK");
}

pub fn set_type(ftp: &mut FtpSession, transfer_type: TransferType) {
    match ftp.set_transfer_type(transfer_type) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("TYPE error: {err}"),
    }
}

pub fn noop(ftp: &mut FtpSession) {
    match ftp.noop() {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("NOOP error: {err}"),
    }
}

/// Upload `local` as `dest`, or with its own name
pub fn put(ftp: &mut FtpSession, local: &Path, dest: Option<&str>) {
    let dest = match dest {
        Some(dest) => dest.to_string(),
        None => match local.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => {
                eprintln!("Cannot tell the name of {}", local.display());
                return;
            }
        },
    };
    let mut reader = match File::open(local) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("Failed to open local file for read: {err}");
            return;
        }
    };
    match ftp.put(&mut reader, dest.as_str()) {
        Ok(bytes) => println!("OK: {bytes} bytes"),
        Err(err) => eprintln!("PUT error: {err}"),
    }
}

pub fn pwd(ftp: &mut FtpSession) {
    match ftp.pwd() {
        Ok(p) => println!("OK: {p}"),
        Err(err) => eprintln!("PWD error: {err}"),
    }
}

pub fn rename(ftp: &mut FtpSession, src: &str, dest: &str) {
    match ftp.rename(src, dest) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RENAME error: {err}"),
    }
}

pub fn rm(ftp: &mut FtpSession, file: &str) {
    match ftp.rm(file) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RM error: {err}"),
    }
}

pub fn rmdir(ftp: &mut FtpSession, dir: &str) {
    match ftp.rmdir(dir) {
        Ok(_) => println!("OK"),
        Err(err) => eprintln!("RMDIR error: {err}"),
    }
}

pub fn size(ftp: &mut FtpSession, file: &str) {
    match ftp.size(file) {
        Ok(size) => println!("OK: {size}"),
        Err(err) => eprintln!("SIZE error: {err}"),
    }
}
