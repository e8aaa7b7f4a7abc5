use serde::{Deserialize, Serialize};

/// Query string of a tracked click: `?url=<target>&type=<kind>`.
#[derive(Debug, Default, Deserialize)]
pub struct ClickQuery {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingLinksRequest {
    pub message_id: String,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub link_kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingLinksResponse {
    pub open_pixel_url: String,
    pub click_url: String,
}

/// Returns the redirect target for a click if it is safe to follow.
///
/// Only absolute `http(s)` URLs and same-site paths are accepted. Absolute URLs come back in the
/// parser's serialized form, so the result is always a valid `Location` value.
#[must_use]
pub fn safe_redirect_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.starts_with('/') {
        // Browsers read `\` as `/`, so `/\host` is protocol-relative too
        let same_site = !raw.starts_with("//") && !raw.contains('\\') && !raw.chars().any(char::is_control);
        return same_site.then(|| raw.to_string());
    }
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Some(parsed.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect_targets() {
        assert_eq!(safe_redirect_target("https://calendly.com/demo").as_deref(), Some("https://calendly.com/demo"));
        assert_eq!(safe_redirect_target(" /pricing ").as_deref(), Some("/pricing"));
        assert_eq!(safe_redirect_target("javascript:alert(1)"), None);
        assert_eq!(safe_redirect_target("//evil.example.com"), None);
        assert_eq!(safe_redirect_target("not a url"), None);
    }

    #[test]
    fn test_backslash_paths_are_not_same_site() {
        assert_eq!(safe_redirect_target("/\\evil.example.com"), None);
        assert_eq!(safe_redirect_target("/docs\\..\\pricing"), None);
        assert_eq!(safe_redirect_target("/pricing\nSet-Cookie: a=b"), None);
    }

    #[test]
    fn test_absolute_targets_are_normalized() {
        // The URL parser drops embedded newlines and tabs
        assert_eq!(safe_redirect_target("https://calendly.com/de\nmo").as_deref(), Some("https://calendly.com/demo"));
        assert_eq!(safe_redirect_target("https://Calendly.com").as_deref(), Some("https://calendly.com/"));
        assert_eq!(
            safe_redirect_target("https://calendly.com/book a call").as_deref(),
            Some("https://calendly.com/book%20a%20call")
        );
    }

    #[test]
    fn test_click_query_parsing() {
        let q: ClickQuery = serde_json::from_str(r#"{"url":"https://a.example","type":"meeting"}"#).unwrap();
        assert_eq!(q.url.as_deref(), Some("https://a.example"));
        assert_eq!(q.link_type.as_deref(), Some("meeting"));
    }
}
