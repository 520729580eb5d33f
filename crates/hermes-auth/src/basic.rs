//! HTTP Basic authentication (RFC 7617).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A username and password from an `Authorization: Basic` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// The user id before the first `:`.
    pub username: String,
    /// Everything after the first `:`.
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Parses an `Authorization` header value as Basic credentials.
///
/// Returns `None` if the scheme is not `Basic`, the payload is not valid
/// base64 or UTF-8, or it has no `:`.
///
/// ```
/// use hermes_auth::parse_basic_auth;
///
/// let creds = parse_basic_auth("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==").unwrap();
/// assert_eq!(creds.username, "Aladdin");
/// assert_eq!(creds.password, "open sesame");
/// ```
#[must_use]
pub fn parse_basic_auth(header: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_may_contain_colon() {
        let header = format!("Basic {}", STANDARD.encode("svc:pa:ss"));
        let creds = parse_basic_auth(&header).unwrap();
        assert_eq!(creds.username, "svc");
        assert_eq!(creds.password, "pa:ss");
    }

    #[test]
    fn test_malformed_is_none() {
        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic !!!notbase64").is_none());
        assert!(parse_basic_auth(&format!("Basic {}", STANDARD.encode("nocolon"))).is_none());
        assert!(parse_basic_auth("Basic").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = parse_basic_auth("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==").unwrap();
        assert!(!format!("{creds:?}").contains("sesame"));
    }
}
