//! Host and port handling for `Host` header values.

/// Splits `host:port` or `[ipv6]:port` into host and port.
///
/// The port is split off only when the last `:` is followed by nothing but ASCII
/// digits (an empty port is accepted). Brackets around the host are removed.
/// Input that does not fit is returned whole as the host, with an empty port.
pub fn split_host_port(hostport: &str) -> (&str, &str) {
    let mut host = hostport;
    let mut port = "";

    if let Some(colon) = host.rfind(':')
        && valid_optional_port(&host[colon..])
    {
        port = &host[colon + 1..];
        host = &host[..colon];
    }

    if let Some(unbracketed) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        host = unbracketed;
    }

    (host, port)
}

/// Accepts an empty string, or `:` followed by zero or more ASCII digits.
pub fn valid_optional_port(port: &str) -> bool {
    match port.strip_prefix(':') {
        Some(digits) => digits.bytes().all(|b| b.is_ascii_digit()),
        None => port.is_empty(),
    }
}
