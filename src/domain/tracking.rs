use crate::domain::record::LinkKind;
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrackingUrlError {
    #[error("base URL cannot carry path segments: {0}")]
    NotABase(String),
    #[error("message id must not be empty")]
    EmptyMessageId,
}

/// Builds the tracked URLs embedded into an outgoing email.
#[derive(Debug, Clone)]
pub struct TrackingLinks {
    base: Url,
}

impl TrackingLinks {
    /// # Errors
    /// Returns `TrackingUrlError::NotABase` for URLs such as `mailto:` that have no path.
    pub fn new(base: Url) -> Result<Self, TrackingUrlError> {
        if base.cannot_be_a_base() {
            return Err(TrackingUrlError::NotABase(base.to_string()));
        }
        Ok(Self { base })
    }

    /// URL of the 1x1 open-tracking pixel for `message_id`.
    ///
    /// # Errors
    /// Returns `TrackingUrlError::EmptyMessageId` if `message_id` is blank.
    pub fn open_pixel_url(&self, message_id: &str) -> Result<Url, TrackingUrlError> {
        self.endpoint(&["track", "open"], message_id)
    }

    /// Redirecting click URL for `message_id`. Without a target the click lands on the default page.
    ///
    /// # Errors
    /// Returns `TrackingUrlError::EmptyMessageId` if `message_id` is blank.
    pub fn click_url(&self, message_id: &str, target: Option<&str>, kind: LinkKind) -> Result<Url, TrackingUrlError> {
        let mut url = self.endpoint(&["track", "click"], message_id)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(target) = target {
                query.append_pair("url", target);
            }
            query.append_pair("type", kind.as_str());
        }
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str], message_id: &str) -> Result<Url, TrackingUrlError> {
        if message_id.trim().is_empty() {
            return Err(TrackingUrlError::EmptyMessageId);
        }
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| TrackingUrlError::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push(message_id);
        Ok(url)
    }
}
