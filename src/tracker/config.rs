use std::time::Duration;

use url::Url;

use crate::tracker::constants::{
    DEFAULT_APPLICATION_ID, DEFAULT_APPLICATION_VERSION, DEFAULT_DISPATCH_TIMEOUT,
    DEFAULT_MAX_QUEUE_SIZE, DEFAULT_SESSION_TIMEOUT, VISITOR_ID_LENGTH,
};
use crate::tracker::error::{config_error, TrackerResult};

/// Collector endpoint and site identity supplied through `init_tracker`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    collector_url: Url,
    site_id: i64,
    opted_out: bool,
}

impl TrackerConfig {
    /// Validates the collector endpoint and site id.
    ///
    /// The endpoint must be an absolute `http`/`https` URL with a host, for example
    /// `https://matomo.example.com/matomo.php`. The site id must be positive.
    pub fn new(collector_url: &str, site_id: i64) -> TrackerResult<Self> {
        let parsed = Url::parse(collector_url.trim()).map_err(|err| {
            config_error(format!("invalid collector url `{collector_url}`: {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(config_error(format!(
                "collector url must use http or https, got `{}`",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(config_error(format!("collector url `{collector_url}` has no host")));
        }
        if site_id <= 0 {
            return Err(config_error(format!("site id must be greater than 0, got {site_id}")));
        }

        Ok(Self {
            collector_url: parsed,
            site_id,
            opted_out: false,
        })
    }

    pub fn collector_url(&self) -> &Url {
        &self.collector_url
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn opted_out(&self) -> bool {
        self.opted_out
    }

    pub(crate) fn set_opted_out(&mut self, opted_out: bool) {
        self.opted_out = opted_out;
    }
}

/// Process-level tracker options that do not change between `init_tracker` calls.
#[derive(Clone, Debug)]
pub struct TrackerSettings {
    application_id: String,
    application_version: String,
    application_base_url: Option<String>,
    user_agent: Option<String>,
    language: Option<String>,
    visitor_id: Option<String>,
    session_timeout: Duration,
    dispatch_timeout: Duration,
    max_queue_size: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            application_version: DEFAULT_APPLICATION_VERSION.to_string(),
            application_base_url: None,
            user_agent: Some(format!("matomo-rs-sdk/{}", env!("CARGO_PKG_VERSION"))),
            language: None,
            visitor_id: None,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
        }
    }
}

impl TrackerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of the host application, such as its package name.
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = application_id.into();
        self
    }

    pub fn with_application_version(mut self, version: impl Into<String>) -> Self {
        self.application_version = version.into();
        self
    }

    /// Overrides the base used to turn screen paths into page URLs. Defaults to
    /// `https://<application_id>`.
    pub fn with_application_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.application_base_url = Some(base_url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Pins the visitor id instead of generating a random one. Must be 16 hexadecimal
    /// characters.
    pub fn with_visitor_id(mut self, visitor_id: impl Into<String>) -> Self {
        self.visitor_id = Some(visitor_id.into());
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size.max(1);
        self
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn application_version(&self) -> &str {
        &self.application_version
    }

    pub fn application_base_url(&self) -> String {
        match &self.application_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.application_id),
        }
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.dispatch_timeout
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    pub(crate) fn resolve_visitor_id(&self) -> TrackerResult<String> {
        match &self.visitor_id {
            Some(id) => {
                if id.len() != VISITOR_ID_LENGTH || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(config_error(format!(
                        "visitor id must be {VISITOR_ID_LENGTH} hexadecimal characters, got `{id}`"
                    )));
                }
                Ok(id.to_ascii_lowercase())
            }
            None => Ok(generate_visitor_id()),
        }
    }
}

fn generate_visitor_id() -> String {
    use rand::Rng;

    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::error::TrackerErrorCode;

    #[test]
    fn accepts_https_endpoint() {
        let config = TrackerConfig::new("https://example.com/matomo.php", 1).unwrap();
        assert_eq!(config.collector_url().as_str(), "https://example.com/matomo.php");
        assert_eq!(config.site_id(), 1);
        assert!(!config.opted_out());
    }

    #[test]
    fn rejects_invalid_parameters() {
        for (url, site_id) in [
            ("not a url", 1),
            ("ftp://example.com/matomo.php", 1),
            ("https://example.com/matomo.php", 0),
            ("https://example.com/matomo.php", -4),
        ] {
            let err = TrackerConfig::new(url, site_id).unwrap_err();
            assert_eq!(err.code, TrackerErrorCode::Config, "{url} / {site_id}");
        }
    }

    #[test]
    fn generated_visitor_ids_are_hex() {
        let id = TrackerSettings::default().resolve_visitor_id().unwrap();
        assert_eq!(id.len(), VISITOR_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn pinned_visitor_id_is_validated() {
        let settings = TrackerSettings::default().with_visitor_id("ABCDEF0123456789");
        assert_eq!(settings.resolve_visitor_id().unwrap(), "abcdef0123456789");

        let settings = TrackerSettings::default().with_visitor_id("short");
        assert_eq!(settings.resolve_visitor_id().unwrap_err().code, TrackerErrorCode::Config);
    }

    #[test]
    fn base_url_defaults_to_application_id() {
        let settings = TrackerSettings::default().with_application_id("com.example.shop");
        assert_eq!(settings.application_base_url(), "https://com.example.shop");

        let settings = settings.with_application_base_url("https://shop.example.com/");
        assert_eq!(settings.application_base_url(), "https://shop.example.com");
    }
}
