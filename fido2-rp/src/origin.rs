//! Checks on origins, relying party ids and URLs supplied as expectations.

use public_suffix::{EffectiveTLDProvider, DEFAULT_PROVIDER};
use url::Url;

use crate::{Error, Result};

/// Relaxations for [`check_url`]. Everything is forbidden by default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UrlRules {
    /// Allow `http://` in addition to `https://`.
    pub allow_http: bool,
    /// Allow a path other than `/`.
    pub allow_path: bool,
    /// Allow a `#fragment`.
    pub allow_hash: bool,
    /// Allow `user:password@`.
    pub allow_credentials: bool,
    /// Allow a `?query`.
    pub allow_query: bool,
}

fn is_localhost(host: &str) -> bool {
    host == "localhost" || host.ends_with(".localhost")
}

/// The registrable domain of `host`, when it has one.
fn registrable_domain(host: &str) -> Option<String> {
    let ascii = idna::domain_to_ascii(host).ok()?;
    DEFAULT_PROVIDER
        .effective_tld_plus_one(&ascii)
        .ok()
        .map(str::to_owned)
}

/// Whether `value` is a bare domain name that has a registrable domain.
pub fn valid_domain_name(value: &str) -> bool {
    !value.is_empty()
        && !value.contains(['/', ':', '?', '#', '@'])
        && registrable_domain(value).is_some()
}

/// Check that `value` is a serialized web origin usable by a relying party, returning it.
///
/// `localhost` and its subdomains may use any scheme; anything else must be `https` and have a
/// registrable domain.
pub fn check_origin(value: &str) -> Result<String> {
    let url =
        Url::parse(value).map_err(|_| Error::verification("origin is not a valid eTLD+1"))?;

    let origin = url.origin().ascii_serialization();
    if origin != value {
        return Err(Error::verification("origin was malformatted"));
    }

    let host = url.host_str().unwrap_or_default();
    if is_localhost(host) {
        return Ok(origin);
    }

    if url.scheme() != "https" {
        return Err(Error::verification("origin should be https"));
    }

    if registrable_domain(host).is_none() {
        return Err(Error::verification("origin is not a valid eTLD+1"));
    }

    Ok(origin)
}

/// Check that `value` is an absolute `http(s)` URL without the parts `rules` does not allow.
///
/// `name` is used to prefix error messages.
pub fn check_url(value: &str, name: &str, rules: UrlRules) -> Result<String> {
    if name.is_empty() {
        return Err(Error::type_error("name not specified in check_url"));
    }

    let url = Url::parse(value)
        .map_err(|_| Error::verification(format!("{name} is not a valid eTLD+1/url")))?;

    if !value.starts_with("http") {
        return Err(Error::verification(format!("{name} must be http protocol")));
    }

    if !rules.allow_http && url.scheme() != "https" {
        return Err(Error::verification(format!("{name} should be https")));
    }

    if !rules.allow_path && (value.ends_with('/') || url.path() != "/") {
        return Err(Error::verification(format!(
            "{name} should not include path in url"
        )));
    }

    if !rules.allow_hash && url.fragment().is_some() {
        return Err(Error::verification(format!(
            "{name} should not include hash in url"
        )));
    }

    if !rules.allow_credentials && (!url.username().is_empty() || url.password().is_some()) {
        return Err(Error::verification(format!(
            "{name} should not include credentials in url"
        )));
    }

    if !rules.allow_query && url.query().is_some() {
        return Err(Error::verification(format!(
            "{name} should not include query string in url"
        )));
    }

    Ok(value.to_owned())
}

/// Accept a bare domain with a registrable domain, otherwise fall back to [`check_url`].
pub fn check_domain_or_url(value: &str, name: &str, rules: UrlRules) -> Result<String> {
    if valid_domain_name(value) {
        return Ok(value.to_owned());
    }
    check_url(value, name, rules)
}

/// Check a relying party id expectation.
pub fn check_rp_id(rp_id: &str) -> Result<String> {
    if is_localhost(rp_id) {
        return Ok(rp_id.to_owned());
    }
    check_domain_or_url(rp_id, "rpId", UrlRules::default())
}

/// The host an rpId hash is computed from when no rpId is expected.
pub(crate) fn origin_host(origin: &str) -> Result<String> {
    Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .ok_or_else(|| Error::verification("origin is not a valid eTLD+1"))
}

/// The host of an rpId given either as a domain or as a URL.
pub(crate) fn rp_id_host(rp_id: &str) -> String {
    Url::parse(rp_id)
        .ok()
        .filter(|url| url.scheme().starts_with("http"))
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_else(|| rp_id.to_owned())
}
