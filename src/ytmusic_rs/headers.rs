use color_eyre::eyre::{Result, WrapErr, bail};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha1::{Digest, Sha1};

/// Headers the HTTP client sets itself, or that only make sense for the
/// request they were copied from.
const SKIPPED: &[&str] = &["host", "content-length", "accept-encoding", "connection"];

/// Parses request headers copied from a logged-in browser session.
///
/// Accepts the `name: value` per line format browsers produce. HTTP/2
/// pseudo-headers (`:authority`, ...) are dropped. A `cookie` header is
/// required.
pub fn parse_raw_headers(raw: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        let name = name.trim().to_ascii_lowercase();
        if SKIPPED.contains(&name.as_str()) {
            continue;
        }

        let header_name = HeaderName::from_bytes(name.as_bytes())
            .wrap_err_with(|| format!("Invalid header name `{name}`"))?;
        let header_value = HeaderValue::from_str(value.trim())
            .wrap_err_with(|| format!("Invalid value for header `{name}`"))?;
        headers.insert(header_name, header_value);
    }

    if !headers.contains_key(reqwest::header::COOKIE) {
        bail!("Raw headers must include the session cookie");
    }

    Ok(headers)
}

/// The `SAPISID` session value from a cookie header, preferring the
/// `__Secure-3PAPISID` variant.
pub fn sapisid_from_cookie(cookie: &str) -> Option<&str> {
    let value_of = |wanted: &str| {
        cookie
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == wanted)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    };
    value_of("__Secure-3PAPISID").or_else(|| value_of("SAPISID"))
}

/// `authorization` value for a cookie session at `timestamp` (unix
/// seconds): `SAPISIDHASH <ts>_<sha1("<ts> <sapisid> <origin>")>`.
pub fn sapisid_hash(timestamp: i64, sapisid: &str, origin: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{timestamp} {sapisid} {origin}").as_bytes());
    format!("SAPISIDHASH {timestamp}_{:x}", hasher.finalize())
}
