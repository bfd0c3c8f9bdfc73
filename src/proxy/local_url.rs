//! Proxy-local wrapper URLs.
//!
//! Metadata consumers are handed URLs that point back at this proxy, with the
//! real source URL and role in the query string. Such a URL can come back as a
//! request; it must be unwrapped, otherwise the proxy would fetch itself.

use url::{form_urlencoded, Url};

use crate::imaging::ImageRole;

/// Builds and recognises wrapper URLs for one public endpoint.
#[derive(Debug, Clone)]
pub struct LocalUrls {
    base: Url,
    endpoint: String,
}

impl LocalUrls {
    /// `base_url` is where the proxy is publicly reachable; `endpoint_path`
    /// is the image route relative to it.
    pub fn new(base_url: &str, endpoint_path: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base_url)?;
        let endpoint = format!(
            "{}/{}",
            base.path().trim_end_matches('/'),
            endpoint_path.trim_start_matches('/')
        );
        Ok(Self { base, endpoint })
    }

    /// Absolute path of the image endpoint, e.g. `/proxy/Image`.
    pub fn endpoint_path(&self) -> &str {
        &self.endpoint
    }

    /// Parse `url` as absolute, or relative to the base URL.
    fn resolve(&self, url: &str) -> Option<Url> {
        self.base.join(url.trim()).ok()
    }

    pub fn is_local(&self, url: &str) -> bool {
        self.resolve(url)
            .is_some_and(|u| u.path().eq_ignore_ascii_case(&self.endpoint))
    }

    /// Wrap a source URL. Blank and already-local URLs are returned unchanged.
    pub fn local_url(&self, url: &str, role: ImageRole, with_base: bool) -> String {
        if url.trim().is_empty() || self.is_local(url) {
            return url.to_string();
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .append_pair("type", role.as_str())
            .finish();

        if with_base {
            let mut target = self.base.clone();
            target.set_path(&self.endpoint);
            target.set_query(Some(&query));
            target.to_string()
        } else {
            format!("{}?{}", self.endpoint, query)
        }
    }

    /// Resolve a possibly-wrapped request into the source URL and role.
    ///
    /// A wrapper without a usable `url` parameter is treated as an ordinary
    /// URL. The wrapper's `type` wins over `role` when it parses.
    pub fn unwrap(&self, url: &str, role: ImageRole) -> (String, ImageRole) {
        let Some(parsed) = self.resolve(url) else {
            return (url.to_string(), role);
        };
        if !parsed.path().eq_ignore_ascii_case(&self.endpoint) {
            return (url.to_string(), role);
        }

        let mut inner = None;
        let mut inner_role = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "url" if inner.is_none() => inner = Some(value.into_owned()),
                "type" if inner_role.is_none() => inner_role = value.parse::<ImageRole>().ok(),
                _ => {}
            }
        }

        match inner {
            Some(inner) if is_web_url(&inner) => (inner, inner_role.unwrap_or(role)),
            _ => {
                tracing::debug!(url = %url, "Local URL without a usable source; using as-is");
                (url.to_string(), role)
            }
        }
    }
}

fn is_web_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> LocalUrls {
        LocalUrls::new("http://media.local:8080/proxy/", "/Image").unwrap()
    }

    #[test]
    fn test_wrap_builds_endpoint_url() {
        let wrapped = urls().local_url("https://img.example.com/a b.jpg?x=1&y=2", ImageRole::Cover, true);
        assert_eq!(
            wrapped,
            "http://media.local:8080/proxy/Image?url=https%3A%2F%2Fimg.example.com%2Fa+b.jpg%3Fx%3D1%26y%3D2&type=Cover"
        );
    }

    #[test]
    fn test_unwrap_of_wrap_is_identity() {
        let urls = urls();
        let cases = [
            ("https://img.example.com/a b.jpg?x=1&y=2", ImageRole::Cover),
            ("http://cdn.example.org/backdrops/42.png", ImageRole::Backdrop),
            ("https://img.example.com/%E5%B0%81%E9%9D%A2.jpg#frag", ImageRole::Thumb),
        ];
        for (source, role) in cases {
            for with_base in [true, false] {
                let wrapped = urls.local_url(source, role, with_base);
                assert!(urls.is_local(&wrapped), "{wrapped} should be local");
                assert_eq!(urls.unwrap(&wrapped, ImageRole::Backdrop), (source.to_string(), role));
            }
        }
    }

    #[test]
    fn test_wrapping_is_idempotent() {
        let urls = urls();
        let once = urls.local_url("https://img.example.com/a.jpg", ImageRole::Cover, true);
        assert_eq!(urls.local_url(&once, ImageRole::Backdrop, true), once);
        assert_eq!(urls.local_url("  ", ImageRole::Cover, true), "  ");
    }

    #[test]
    fn test_endpoint_match_is_case_insensitive() {
        let urls = urls();
        let wrapped = "http://other-host/PROXY/image?url=https%3A%2F%2Fimg.example.com%2Fa.jpg&type=primary";
        assert_eq!(
            urls.unwrap(wrapped, ImageRole::Backdrop),
            ("https://img.example.com/a.jpg".to_string(), ImageRole::Cover)
        );
    }

    #[test]
    fn test_malformed_wrappers_fail_open() {
        let urls = urls();
        for raw in [
            "http://media.local:8080/proxy/Image?url=not-a-url&type=Cover",
            "http://media.local:8080/proxy/Image?type=Cover",
            "http://media.local:8080/proxy/Image?url=file%3A%2F%2F%2Fetc%2Fpasswd",
        ] {
            assert_eq!(urls.unwrap(raw, ImageRole::Logo), (raw.to_string(), ImageRole::Logo));
        }
    }

    #[test]
    fn test_unknown_type_keeps_request_role() {
        let urls = urls();
        let raw = "/proxy/Image?url=https%3A%2F%2Fimg.example.com%2Fa.jpg&type=Disc";
        assert_eq!(
            urls.unwrap(raw, ImageRole::Cover),
            ("https://img.example.com/a.jpg".to_string(), ImageRole::Cover)
        );
    }

    #[test]
    fn test_remote_urls_are_untouched() {
        let urls = urls();
        let raw = "https://img.example.com/Image?url=https%3A%2F%2Fevil.example%2F";
        assert!(!urls.is_local(raw));
        assert_eq!(urls.unwrap(raw, ImageRole::Cover), (raw.to_string(), ImageRole::Cover));
    }
}
