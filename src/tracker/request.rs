//! Pure translation of a [`TrackEvent`] into Matomo HTTP tracking API parameters.
//!
//! Nothing here performs I/O or reads clocks. The tracker supplies the timestamp and session
//! flags through [`RequestContext`], so identical inputs always yield identical requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::tracker::constants::{
    params, APP_DOWNLOAD_ACTION, APP_DOWNLOAD_ACTION_NAME, APP_DOWNLOAD_CATEGORY, APP_DOWNLOAD_PATH,
};
use crate::tracker::dimensions::DimensionSnapshot;
use crate::tracker::event::TrackEvent;

const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A fully-formed tracking request, ready to be sent to the collector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    query_params: BTreeMap<String, String>,
    dimensions: BTreeMap<i64, String>,
}

impl OutboundRequest {
    pub fn new(query_params: BTreeMap<String, String>, dimensions: BTreeMap<i64, String>) -> Self {
        Self {
            query_params,
            dimensions,
        }
    }

    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    pub fn dimensions(&self) -> &BTreeMap<i64, String> {
        &self.dimensions
    }

    /// Looks up a wire parameter, including `dimension<id>` keys.
    pub fn param(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.query_params.get(key) {
            return Some(value);
        }
        key.strip_prefix(params::DIMENSION_PREFIX)
            .and_then(|id| id.parse::<i64>().ok())
            .and_then(|id| self.dimensions.get(&id))
            .map(String::as_str)
    }

    /// Every wire parameter, with dimensions rendered under the `dimension<id>` keys.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .query_params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        pairs.extend(
            self.dimensions
                .iter()
                .map(|(id, value)| (format!("{}{id}", params::DIMENSION_PREFIX), value.clone())),
        );
        pairs
    }

    /// Percent-encoded `key=value&...` form of [`Self::query_pairs`].
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, QUERY_VALUE),
                    utf8_percent_encode(value, QUERY_VALUE)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Site and visitor state captured by the tracker at build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub site_id: i64,
    pub opted_out: bool,
    pub visitor_id: String,
    pub user_id: Option<String>,
    pub new_visit: bool,
    pub timestamp: DateTime<Utc>,
    pub application_base_url: String,
    pub application_id: String,
    pub application_version: String,
    pub user_agent: Option<String>,
    pub language: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuppressReason {
    Uninitialized,
    OptedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    Built(OutboundRequest),
    Suppressed(SuppressReason),
}

impl BuildOutcome {
    pub fn into_request(self) -> Option<OutboundRequest> {
        match self {
            BuildOutcome::Built(request) => Some(request),
            BuildOutcome::Suppressed(_) => None,
        }
    }
}

/// Builds the outbound request for `event`.
///
/// `context` is `None` while the tracker is uninitialized; both that and an opted-out context
/// produce [`BuildOutcome::Suppressed`].
pub fn build_request(
    event: &TrackEvent,
    context: Option<&RequestContext>,
    dimensions: &DimensionSnapshot,
) -> BuildOutcome {
    let Some(context) = context else {
        return BuildOutcome::Suppressed(SuppressReason::Uninitialized);
    };
    if context.opted_out {
        return BuildOutcome::Suppressed(SuppressReason::OptedOut);
    }

    let mut query = BTreeMap::new();
    apply_event(&mut query, event, context);
    apply_context(&mut query, context);

    BuildOutcome::Built(OutboundRequest::new(query, dimensions.clone().into_entries()))
}

fn apply_event(query: &mut BTreeMap<String, String>, event: &TrackEvent, context: &RequestContext) {
    match event {
        TrackEvent::Screen { path, title } => {
            put(query, params::URL, Some(&page_url(&context.application_base_url, path)));
            put(query, params::ACTION_NAME, title.as_deref());
        }
        TrackEvent::Event {
            category,
            action,
            name,
            value,
            path,
        } => {
            put(query, params::EVENT_CATEGORY, Some(category.as_str()));
            put(query, params::EVENT_ACTION, Some(action.as_str()));
            put(query, params::EVENT_NAME, name.as_deref());
            if let Some(value) = value.filter(|v| v.is_finite()) {
                put(query, params::EVENT_VALUE, Some(&value.to_string()));
            }
            if let Some(path) = path {
                put(query, params::URL, Some(&page_url(&context.application_base_url, path)));
            }
        }
        TrackEvent::Search {
            query: keyword,
            category,
            result_count,
            path,
        } => {
            put(query, params::SEARCH_KEYWORD, Some(keyword.as_str()));
            put(query, params::SEARCH_CATEGORY, category.as_deref());
            put(query, params::SEARCH_COUNT, Some(&result_count.to_string()));
            if let Some(path) = path {
                put(query, params::URL, Some(&page_url(&context.application_base_url, path)));
            }
        }
        TrackEvent::Outlink { url } => {
            put(query, params::LINK, Some(url.as_str()));
            put(query, params::URL, Some(url.as_str()));
        }
        TrackEvent::DownloadLink { url } => {
            // Sent as an outlink; the `download` parameter makes the collector file it as a
            // download.
            put(query, params::DOWNLOAD, Some(url.as_str()));
            put(query, params::LINK, Some(url.as_str()));
            put(query, params::URL, Some(url.as_str()));
        }
        TrackEvent::AppDownload => {
            let install_identifier = format!(
                "http://{}:{}",
                context.application_id, context.application_version
            );
            put(query, params::EVENT_CATEGORY, Some(APP_DOWNLOAD_CATEGORY));
            put(query, params::EVENT_ACTION, Some(APP_DOWNLOAD_ACTION));
            put(query, params::ACTION_NAME, Some(APP_DOWNLOAD_ACTION_NAME));
            put(
                query,
                params::URL,
                Some(&page_url(&context.application_base_url, APP_DOWNLOAD_PATH)),
            );
            put(query, params::DOWNLOAD, Some(&install_identifier));
        }
    }
}

fn apply_context(query: &mut BTreeMap<String, String>, context: &RequestContext) {
    put(query, params::SITE_ID, Some(&context.site_id.to_string()));
    put(query, params::RECORD, Some("1"));
    put(query, params::API_VERSION, Some("1"));
    put(query, params::VISITOR_ID, Some(&context.visitor_id));
    put(query, params::USER_ID, context.user_id.as_deref());
    put(query, params::USER_AGENT, context.user_agent.as_deref());
    put(query, params::LANGUAGE, context.language.as_deref());
    if context.new_visit {
        put(query, params::NEW_VISIT, Some("1"));
    }
    put(
        query,
        params::DATETIME,
        Some(&context.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    put(query, params::SEND_IMAGE, Some("0"));
}

fn put(query: &mut BTreeMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        query.insert(key.to_string(), value.to_string());
    }
}

fn page_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::dimensions::DimensionRegistry;
    use crate::tracker::event::{EventOptions, SearchOptions};
    use chrono::TimeZone;

    fn context() -> RequestContext {
        RequestContext {
            site_id: 7,
            opted_out: false,
            visitor_id: "0123456789abcdef".into(),
            user_id: None,
            new_visit: false,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
            application_base_url: "https://com.example.app".into(),
            application_id: "com.example.app".into(),
            application_version: "42".into(),
            user_agent: None,
            language: None,
        }
    }

    fn build(event: &TrackEvent, dimensions: &DimensionSnapshot) -> OutboundRequest {
        build_request(event, Some(&context()), dimensions)
            .into_request()
            .expect("request should be built")
    }

    #[test]
    fn suppressed_without_context_or_when_opted_out() {
        let event = TrackEvent::screen("/home", None);
        let snapshot = DimensionSnapshot::default();
        assert_eq!(
            build_request(&event, None, &snapshot),
            BuildOutcome::Suppressed(SuppressReason::Uninitialized)
        );

        let mut opted_out = context();
        opted_out.opted_out = true;
        assert_eq!(
            build_request(&event, Some(&opted_out), &snapshot),
            BuildOutcome::Suppressed(SuppressReason::OptedOut)
        );
    }

    #[test]
    fn screen_sets_url_and_title() {
        let event = TrackEvent::screen("Home", Some("Home Screen"));
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("url"), Some("https://com.example.app/Home"));
        assert_eq!(request.param("action_name"), Some("Home Screen"));
        assert_eq!(request.param("idsite"), Some("7"));
        assert_eq!(request.param("rec"), Some("1"));
        assert_eq!(request.param("_id"), Some("0123456789abcdef"));
        assert_eq!(request.param("cdt"), Some("2024-05-17 09:30:00"));
        assert_eq!(request.param("uid"), None);
        assert!(request.dimensions().is_empty());
    }

    #[test]
    fn event_omits_empty_fields() {
        let event = TrackEvent::event(
            "",
            "play",
            EventOptions::default().with_value(2.5).with_url("/player"),
        );
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("e_c"), None);
        assert_eq!(request.param("e_a"), Some("play"));
        assert_eq!(request.param("e_n"), None);
        assert_eq!(request.param("e_v"), Some("2.5"));
        assert_eq!(request.param("url"), Some("https://com.example.app/player"));
    }

    #[test]
    fn search_includes_category_and_count() {
        let event = TrackEvent::search(
            "red shoes",
            SearchOptions::default().with_category("catalog").with_result_count(12),
        );
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("search"), Some("red shoes"));
        assert_eq!(request.param("search_cat"), Some("catalog"));
        assert_eq!(request.param("search_count"), Some("12"));
        assert_eq!(request.param("url"), None);
    }

    #[test]
    fn search_url_becomes_page_url() {
        let options = SearchOptions::default().with_url("/catalog/search");
        let event = TrackEvent::search("boots", options);
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("url"), Some("https://com.example.app/catalog/search"));
        assert_eq!(request.param("search_count"), Some("0"));
    }

    #[test]
    fn link_parameters_carry_the_url_unchanged() {
        let event = TrackEvent::download_link("https://Example.com/a b.pdf").unwrap();
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("download"), Some("https://Example.com/a b.pdf"));
        assert_eq!(request.param("link"), Some("https://Example.com/a b.pdf"));
        assert_eq!(request.param("url"), Some("https://Example.com/a b.pdf"));

        let event = TrackEvent::outlink("https://Example.com").unwrap();
        let request = build(&event, &DimensionSnapshot::default());
        assert_eq!(request.param("link"), Some("https://Example.com"));
    }

    #[test]
    fn download_link_is_an_outlink_with_download_param() {
        let mut registry = DimensionRegistry::new();
        registry.set(1, Some("premium")).unwrap();
        registry.set(4, Some("de")).unwrap();

        let event = TrackEvent::download_link("https://example.com/f.pdf").unwrap();
        let request = build(&event, &registry.snapshot());

        assert_eq!(request.param("link"), Some("https://example.com/f.pdf"));
        assert_eq!(request.param("download"), Some("https://example.com/f.pdf"));
        assert_eq!(request.param("dimension1"), Some("premium"));
        assert_eq!(request.param("dimension4"), Some("de"));
    }

    #[test]
    fn app_download_uses_install_identifier() {
        let request = build(&TrackEvent::app_download(), &DimensionSnapshot::default());
        assert_eq!(request.param("download"), Some("http://com.example.app:42"));
        assert_eq!(request.param("e_c"), Some("Application"));
        assert_eq!(request.param("e_a"), Some("downloaded"));
        assert_eq!(
            request.param("url"),
            Some("https://com.example.app/application/downloaded")
        );
    }

    #[test]
    fn context_fields_are_attached_when_present() {
        let mut ctx = context();
        ctx.user_id = Some("user@example.com".into());
        ctx.new_visit = true;
        ctx.language = Some("de-DE".into());
        let event = TrackEvent::screen("/a", None);
        let outcome = build_request(&event, Some(&ctx), &DimensionSnapshot::default());
        let request = outcome.into_request().unwrap();
        assert_eq!(request.param("uid"), Some("user@example.com"));
        assert_eq!(request.param("new_visit"), Some("1"));
        assert_eq!(request.param("lang"), Some("de-DE"));
        assert_eq!(request.param("action_name"), None);
    }

    #[test]
    fn query_string_is_percent_encoded() {
        let mut registry = DimensionRegistry::new();
        registry.set(2, Some("a b")).unwrap();
        let event = TrackEvent::search("x&y", SearchOptions::default());
        let request = build(&event, &registry.snapshot());
        let query = request.query_string();
        assert!(query.contains("search=x%26y"), "{query}");
        assert!(query.contains("dimension2=a%20b"), "{query}");
        assert!(query.contains("cdt=2024-05-17%2009%3A30%3A00"), "{query}");
    }

    #[test]
    fn queued_request_survives_json_storage() {
        let mut registry = DimensionRegistry::new();
        registry.set(5, Some("gold")).unwrap();
        let request = build(&TrackEvent::screen("/cart", Some("Cart")), &registry.snapshot());

        let stored = serde_json::to_string(&request).unwrap();
        let restored: OutboundRequest = serde_json::from_str(&stored).unwrap();

        assert_eq!(restored, request);
        assert_eq!(restored.param("dimension5"), Some("gold"));
    }
}
