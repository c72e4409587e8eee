//! # ftpclient
//!
//! An interactive client to connect and work with FTP and FTPS servers
//!

// -- mods
mod actions;
mod args;
mod command;

use std::io;
use std::io::Write;
use std::str::FromStr;

use actions::*;
use args::Args;
use command::Command;
use env_logger::Builder as LogBuilder;
use ftpclient::{FtpSession, Security};
use log::LevelFilter;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

fn usage() {
    println!("Available commands:");
    println!("APPE <file> <dest>                  Append content of local file `file` to `dest`");
    println!("CDUP                                Go to parent directory");
    println!("CONNECT <addr[:port]>               Connect to remote host");
    println!("CONNECT+S <addr[:port]>             Connect to remote host using explicit FTPS");
    println!("CONNECT+I <addr[:port]>             Connect to remote host using implicit FTPS");
    println!("CWD <dir> [create]                  Change working directory, creating it if asked");
    println!("FEAT                                Get supported features on the server");
    println!("GET <file> [dest]                   Download `file` to `dest`; never overwrites local files");
    println!("HELP                                Print this help");
    println!("LIST [dir]                          List files. If directory is not provided, current directory is used");
    println!("LOGIN                               Login to remote");
    println!("LOGOUT                              Logout and disconnect from remote");
    println!("LSDIR <dir>                         List directories in `dir`");
    println!("MDTM <file>                         Get modification time for `file`");
    println!("MKDIR <dir>                         Create directory");
    println!("MODE <PASSIVE|EXTPASSIVE|ACTIVE>    Set mode");
    println!("NOOP                                Ping server");
    println!("PUT <file> [dest]                   Upload local file `file` to `dest`");
    println!("PWD                                 Print working directory");
    println!("QUIT                                Quit ftpclient");
    println!("RENAME <source> <dest>              Rename file `source` to `dest`");
    println!("RM <file>                           Remove file");
    println!("RMDIR <dir>                         Remove directory");
    println!("SIZE <file>                         Get `file` size");
    println!("TYPE <ASCII|BINARY>                 Set transfer type");
}

fn input() -> Option<Command> {
    loop {
        print!(">> ");
        let _ = io::stdout().flush();
        let mut input: String = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(err) => {
                eprintln!("Failed to read stdin: {err}");
                return None;
            }
        }
        // Try to create command
        match Command::from_str(input.as_str()) {
            Ok(cmd) => return Some(cmd),
            Err(err) => println!("Unknown command: {err}"),
        }
    }
}

fn main() {
    let args: Args = argh::from_env();
    // print version
    if args.version {
        println!("ftpclient {APP_VERSION} - developed by {APP_AUTHORS}")
    }
    // init logger
    LogBuilder::new()
        .filter_level(if args.debug {
            LevelFilter::Trace
        } else if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        })
        .init();
    // Main loop
    let mut ftp: Option<FtpSession> = None;

    // connect if host is specified
    if let Some(host) = args.host {
        perform(&mut ftp, Command::Connect(host, Security::Plain));
    }

    loop {
        match input() {
            None | Some(Command::Quit) => {
                // Break if quit
                quit(ftp);
                break;
            }
            Some(Command::Help) => usage(),
            Some(cmd) => perform(&mut ftp, cmd),
        }
    }
}

fn perform(ftp: &mut Option<FtpSession>, command: Command) {
    match ftp {
        Some(ftp) => perform_connected(ftp, command),
        None => {
            if let Some(session) = perform_uninitialized(command) {
                *ftp = Some(session);
            }
        }
    }
}

fn perform_uninitialized(command: Command) -> Option<FtpSession> {
    match command {
        Command::Connect(remote, security) => connect(remote.as_str(), security),
        _ => {
            eprintln!("Can't perform command: you must connect to remote first");
            None
        }
    }
}

fn perform_connected(ftp: &mut FtpSession, command: Command) {
    match command {
        Command::Appe(src, dest) => appe(ftp, src.as_path(), dest.as_str()),
        Command::Cdup => cdup(ftp),
        Command::Connect(remote, security) => {
            if let Some(session) = connect(remote.as_str(), security) {
                ftp.disconnect();
                *ftp = session;
            }
        }
        Command::Cwd(dir, create) => cwd(ftp, dir.as_str(), create),
        Command::Feat => feat(ftp),
        Command::Get(file, dest) => get(ftp, file.as_str(), dest.as_deref()),
        Command::List(p) => list(ftp, p.as_deref()),
        Command::Login => login(ftp),
        Command::Logout => logout(ftp),
        Command::Lsdir(p) => lsdir(ftp, p.as_str()),
        Command::Mdtm(p) => mdtm(ftp, p.as_str()),
        Command::Mkdir(p) => mkdir(ftp, p.as_str()),
        Command::Mode(m) => set_mode(ftp, m),
        Command::Noop => noop(ftp),
        Command::Put(src, dest) => put(ftp, src.as_path(), dest.as_deref()),
        Command::Pwd => pwd(ftp),
        Command::Rename(src, dest) => rename(ftp, src.as_str(), dest.as_str()),
        Command::Rm(file) => rm(ftp, file.as_str()),
        Command::Rmdir(file) => rmdir(ftp, file.as_str()),
        Command::Size(file) => size(ftp, file.as_str()),
        Command::Type(transfer_type) => set_type(ftp, transfer_type),
        Command::Help | Command::Quit => {
            eprintln!("Something unexpected happened")
        }
    }
}
