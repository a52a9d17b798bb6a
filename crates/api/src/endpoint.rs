//! Base URL construction and endpoint composition.

use reqwest::Url;

use crate::Error;

/// API version segment appended to bare hosts.
pub const API_VERSION: &str = "v0";

const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Builds the session base URL from a user-supplied host string.
///
/// - No `://` in `host` means `http://` is assumed.
/// - Only `http` and `https` are accepted.
/// - A host without a path gets `/survoxapi/<version>` appended.
/// - Credentials, query strings and fragments are rejected.
/// - Exactly one trailing slash is stripped.
pub fn base_url_from_host(host: &str, version: &str) -> Result<String, Error> {
    let host = host.trim();
    if host.is_empty() {
        return Err(Error::runtime("Parameter \"host\" is required"));
    }

    let full = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let bad_host = || Error::runtime(format!("Bad host \"{full}\" - use https://www.host.com"));

    let mut url = Url::parse(&full).map_err(|_| bad_host())?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::runtime(format!(
            "Bad scheme \"{}\" - must be {}",
            url.scheme(),
            ALLOWED_SCHEMES.join(", ")
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(bad_host());
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(bad_host());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::runtime(format!(
            "Bad host \"{full}\" - cannot contain parameters or query string"
        )));
    }

    // `Url` normalizes an empty path to "/", so look at the raw text.
    if !has_explicit_path(&full) {
        url.set_path(&format!("/survoxapi/{version}"));
    }

    let mut base = String::from(url);
    if base.ends_with('/') {
        base.pop();
    }
    Ok(base)
}

fn has_explicit_path(full: &str) -> bool {
    let rest = full.split_once("://").map_or(full, |(_, rest)| rest);
    rest.find(['/', '?', '#'])
        .is_some_and(|idx| rest[idx..].starts_with('/'))
}

/// Resolves `path` against `base_url`.
///
/// Absolute inputs (starting with `base_url` or `http`) are returned
/// unchanged, so resolving twice gives the same result. Relative paths are
/// joined with exactly one `/`.
pub fn resolve(base_url: &str, path: &str) -> String {
    if path.starts_with(base_url) || path.starts_with("http") {
        return path.to_string();
    }
    match (base_url.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base_url}{}", &path[1..]),
        (false, false) => format!("{base_url}/{path}"),
        _ => format!("{base_url}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://h.com/survoxapi/v0";

    #[test]
    fn resolve_joins_relative_path() {
        assert_eq!(
            resolve(BASE, "/accounts/"),
            "https://h.com/survoxapi/v0/accounts/"
        );
    }

    #[test]
    fn resolve_inserts_missing_separator() {
        assert_eq!(resolve(BASE, "accounts/"), "https://h.com/survoxapi/v0/accounts/");
    }

    #[test]
    fn resolve_never_doubles_separator() {
        assert_eq!(
            resolve("https://h.com/survoxapi/v0/", "/accounts/"),
            "https://h.com/survoxapi/v0/accounts/"
        );
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let other = "http://chunks.h.com/upload/abc/";
        assert_eq!(resolve(BASE, other), other);
    }

    #[test]
    fn resolve_is_idempotent() {
        for path in ["/accounts/", "clients/x/", "", "/", "https://other/x"] {
            let once = resolve(BASE, path);
            assert_eq!(resolve(BASE, &once), once, "path {path:?}");
        }
    }

    #[test]
    fn bare_host_gets_scheme_and_api_path() {
        assert_eq!(
            base_url_from_host("localhost", API_VERSION).unwrap(),
            "http://localhost/survoxapi/v0"
        );
    }

    #[test]
    fn host_with_port_keeps_port() {
        assert_eq!(
            base_url_from_host("localhost:8080", API_VERSION).unwrap(),
            "http://localhost:8080/survoxapi/v0"
        );
    }

    #[test]
    fn explicit_path_is_kept_and_trailing_slash_stripped() {
        assert_eq!(
            base_url_from_host("https://h.com/custom/api/", API_VERSION).unwrap(),
            "https://h.com/custom/api"
        );
    }

    #[test]
    fn root_path_counts_as_explicit() {
        assert_eq!(base_url_from_host("https://h.com/", API_VERSION).unwrap(), "https://h.com");
    }

    #[test]
    fn rejects_empty_host() {
        let err = base_url_from_host("  ", API_VERSION).unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn rejects_other_schemes() {
        let err = base_url_from_host("ftp://h.com", API_VERSION).unwrap_err();
        assert_eq!(err.to_string(), "Error[0] - Bad scheme \"ftp\" - must be http, https");
    }

    #[test]
    fn rejects_credentials() {
        let err = base_url_from_host("https://user:pw@h.com", API_VERSION).unwrap_err();
        assert!(err.to_string().contains("Bad host"));
    }

    #[test]
    fn rejects_query_and_fragment() {
        for host in ["https://h.com/api?x=1", "https://h.com/api#frag"] {
            let err = base_url_from_host(host, API_VERSION).unwrap_err();
            assert!(
                err.to_string().contains("cannot contain parameters or query string"),
                "{host}: {err}"
            );
        }
    }
}
