//! To run this example enable the rustls feature (--features rustls).
//! If you use this code in your own project you need to enable ftpclient's
//! rustls feature through Cargo.toml and also include the webpki-roots crate
//! as a dependency (this includes Mozilla's root certificates for use with
//! rustls).

use std::sync::Arc;

use ftpclient::rustls;
use ftpclient::rustls::ClientConfig;
use ftpclient::{FtpSession, RustlsConnector, Security, SessionConfig};

fn main() {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    // Connect with explicit TLS and authenticate.
    let mut session = FtpSession::new(
        SessionConfig::new("test.rebex.net").with_security(Security::ExplicitTls),
    )
    .with_tls_connector(RustlsConnector::from(Arc::new(config)));
    session.login("demo", "password").unwrap();

    let listing = session.list(None).unwrap();
    for entry in listing.iter() {
        println!("{:>10} {}", entry.size(), entry.name());
    }

    // Terminate the connection to the server.
    let _ = session.logout();
}
