//! # Command
//!
//! Commands typed at the prompt

use std::path::PathBuf;
use std::str::FromStr;

use ftpclient::{Mode, Security, TransferType};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Appe(PathBuf, String),
    Cdup,
    Connect(String, Security),
    Cwd(String, bool),
    Feat,
    Get(String, Option<PathBuf>),
    Help,
    List(Option<String>),
    Login,
    Logout,
    Lsdir(String),
    Mdtm(String),
    Mkdir(String),
    Mode(Mode),
    Noop,
    Put(PathBuf, Option<String>),
    Pwd,
    Quit,
    Rename(String, String),
    Rm(String),
    Rmdir(String),
    Size(String),
    Type(TransferType),
}

impl FromStr for Command {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut args = s.split_whitespace();
        let verb = args.next().ok_or("empty command")?.to_ascii_uppercase();
        let mut next = || args.next().map(|x| x.to_string());
        let command = match verb.as_str() {
            "APPE" => {
                let file = next().ok_or("missing file")?;
                let dest = next().ok_or("missing destination")?;
                Self::Appe(PathBuf::from(file), dest)
            }
            "CDUP" => Self::Cdup,
            "CONNECT" => Self::Connect(next().ok_or("missing address")?, Security::Plain),
            "CONNECT+S" => Self::Connect(next().ok_or("missing address")?, Security::ExplicitTls),
            "CONNECT+I" => Self::Connect(next().ok_or("missing address")?, Security::ImplicitTls),
            "CWD" => {
                let dir = next().ok_or("missing directory")?;
                let create = match next().as_deref() {
                    None => false,
                    Some(flag) if flag.eq_ignore_ascii_case("create") => true,
                    Some(_) => return Err("expected `create`"),
                };
                Self::Cwd(dir, create)
            }
            "FEAT" => Self::Feat,
            "GET" | "RETR" => Self::Get(next().ok_or("missing file")?, next().map(PathBuf::from)),
            "HELP" => Self::Help,
            "LIST" => Self::List(next()),
            "LOGIN" => Self::Login,
            "LOGOUT" => Self::Logout,
            "LSDIR" => Self::Lsdir(next().ok_or("missing directory")?),
            "MDTM" => Self::Mdtm(next().ok_or("missing file")?),
            "MKDIR" => Self::Mkdir(next().ok_or("missing directory")?),
            "MODE" => match next().ok_or("missing mode")?.to_ascii_uppercase().as_str() {
                "ACTIVE" => Self::Mode(Mode::Active),
                "EXTPASSIVE" => Self::Mode(Mode::ExtendedPassive),
                "PASSIVE" => Self::Mode(Mode::Passive),
                _ => return Err("unknown mode"),
            },
            "NOOP" => Self::Noop,
            "PUT" => Self::Put(PathBuf::from(next().ok_or("missing file")?), next()),
            "PWD" => Self::Pwd,
            "QUIT" => Self::Quit,
            "RENAME" => {
                let src = next().ok_or("missing source")?;
                let dest = next().ok_or("missing destination")?;
                Self::Rename(src, dest)
            }
            "RM" => Self::Rm(next().ok_or("missing file")?),
            "RMDIR" => Self::Rmdir(next().ok_or("missing directory")?),
            "SIZE" => Self::Size(next().ok_or("missing file")?),
            "TYPE" => match next().ok_or("missing type")?.to_ascii_uppercase().as_str() {
                "A" | "ASCII" => Self::Type(TransferType::Ascii),
                "I" | "BINARY" => Self::Type(TransferType::Binary),
                _ => return Err("unknown transfer type"),
            },
            _ => return Err("unknown command"),
        };

        Ok(command)
    }
}
