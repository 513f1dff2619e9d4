//! URL utilities for playlist URL construction and safe logging

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::config::{Credentials, PlaylistEndpoint};

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Normalize URL scheme by ensuring it has a proper HTTP/HTTPS prefix
    ///
    /// ```rust
    /// use epg_unifier::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::normalize_scheme("example.com"), "http://example.com");
    /// assert_eq!(UrlUtils::normalize_scheme("https://example.com"), "https://example.com");
    /// ```
    pub fn normalize_scheme(url: &str) -> String {
        let trimmed = url.trim();

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        }
    }

    /// Build the provider playlist URL for the given endpoint
    ///
    /// Credentials are appended as query parameters and percent-encoded.
    ///
    /// ```rust
    /// use epg_unifier::config::{Credentials, PlaylistEndpoint};
    /// use epg_unifier::utils::url::UrlUtils;
    ///
    /// let creds = Credentials { username: "user".into(), password: "pass".into() };
    /// let url = UrlUtils::build_playlist_url("http://example.com", &creds, PlaylistEndpoint::M3uPlus).unwrap();
    /// assert_eq!(url, "http://example.com/get.php?username=user&password=pass&type=m3u_plus");
    /// ```
    pub fn build_playlist_url(
        base_url: &str,
        credentials: &Credentials,
        endpoint: PlaylistEndpoint,
    ) -> Result<String, url::ParseError> {
        let mut base = Self::normalize_scheme(base_url);
        if !base.ends_with('/') {
            base.push('/');
        }
        let path = match endpoint {
            PlaylistEndpoint::M3uPlus => "get.php",
            PlaylistEndpoint::Xmltv => "xmltv.php",
        };
        let mut url = Url::parse(&base)?.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("username", &credentials.username)
                .append_pair("password", &credentials.password);
            if endpoint == PlaylistEndpoint::M3uPlus {
                query.append_pair("type", "m3u_plus");
            }
        }
        Ok(url.to_string())
    }

    /// Obfuscate sensitive information in URLs for safe logging
    ///
    /// Masks URL userinfo and credential-like query parameters.
    ///
    /// ```rust
    /// use epg_unifier::utils::url::UrlUtils;
    ///
    /// let url = "http://example.com/get.php?username=user&password=secret&type=m3u_plus";
    /// assert_eq!(
    ///     UrlUtils::obfuscate_credentials(url),
    ///     "http://example.com/get.php?username=****&password=****&type=m3u_plus"
    /// );
    /// ```
    pub fn obfuscate_credentials(url: &str) -> String {
        static SENSITIVE_PARAMS: OnceLock<Regex> = OnceLock::new();

        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url)
            && (!parsed.username().is_empty() || parsed.password().is_some())
        {
            let mut new_url = parsed.clone();
            let _ = new_url.set_username("****");
            let _ = new_url.set_password(Some("****"));
            obfuscated = new_url.to_string();
        }

        let re = SENSITIVE_PARAMS.get_or_init(|| {
            Regex::new(r"(?i)([?&](?:username|password|user|pass|pwd|passwd)=)[^&\s]*")
                .expect("static credential pattern is valid")
        });
        re.replace_all(&obfuscated, "${1}****").to_string()
    }
}
