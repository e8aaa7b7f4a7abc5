use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub window_days: Option<u32>,
}

impl AnalyticsQuery {
    /// Resolves the requested window against the configured default and maximum.
    ///
    /// # Errors
    /// Returns an error if the window is zero or larger than `max`.
    pub fn resolve(&self, default: u32, max: u32) -> Result<u32, String> {
        let days = self.window_days.unwrap_or(default);
        if days == 0 || days > max {
            return Err(format!("windowDays must be between 1 and {max}"));
        }
        Ok(days)
    }
}
