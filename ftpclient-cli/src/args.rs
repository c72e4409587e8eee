use argh::FromArgs;

/// Interactive FTP/FTPS client
#[derive(FromArgs)]
pub struct Args {
    /// enable TRACE log level
    #[argh(switch, short = 'D')]
    pub debug: bool,
    /// enable INFO log level
    #[argh(switch, short = 'v')]
    pub verbose: bool,
    /// print version
    #[argh(switch, short = 'V')]
    pub version: bool,
    /// connect to this host (`host[:port]`) at startup
    #[argh(positional)]
    pub host: Option<String>,
}
