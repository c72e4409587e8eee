use crate::types::{Features, ProtocolError, Reply};
use crate::FtpError;

/// Parses the reply to a FEAT command.
///
/// RFC is specified [RFC 2389](https://datatracker.ietf.org/doc/html/rfc2389#section-3.2).
///
/// This is the syntax of the FEAT response:
///
/// - no-features: "211 [SP] ..."
/// - features-list: "211-...":
///     - ... "feature-label" [[SP] ["description"]]
///     - "211 END"
///
/// The reply has already been split into lines by the control channel, so the feature lines
/// are the ones between the first and the last.
pub fn parse_features(reply: &Reply) -> Result<Features, FtpError> {
    debug!("Parsing features; first line: {}", reply.first_line());

    let mut features = Features::with_capacity(reply.lines.len());
    if !reply.is_multiline() {
        debug!("single line FEAT reply - no features available");
        return Ok(features);
    }
    let last = reply.lines.len() - 1;
    for line in &reply.lines[1..last] {
        parse_feature(line, &mut features)?;
    }

    Ok(features)
}

/// Parses a single feature line from the FEAT response.
///
/// The line MUST start with a space character (` `) and can have the following syntax:
///
/// - `feature-label` [[SP] ["description"]]
fn parse_feature(line: &str, features: &mut Features) -> Result<(), FtpError> {
    if !line.starts_with(' ') {
        error!("Feature response doesn't start with ` `");
        return Err(ProtocolError::Malformed(format!("bad feature line: {line}")).into());
    }

    let mut line = line.trim().split(' ');
    let Some(feature_name) = line.next().filter(|name| !name.is_empty()) else {
        error!("Feature line is empty");
        return Err(ProtocolError::Malformed("empty feature line".to_string()).into());
    };
    let feature_values = match line.collect::<Vec<&str>>().join(" ") {
        values if values.is_empty() => None,
        values => Some(values),
    };
    debug!("found supported feature: {feature_name}: {feature_values:?}");
    features.insert(feature_name.to_string(), feature_values);

    Ok(())
}
