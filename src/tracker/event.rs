use url::Url;

use crate::tracker::error::{malformed_url, TrackerResult};

/// A single trackable action.
///
/// The set of variants is closed; the request builder matches on it exhaustively. Optional
/// string fields never hold an empty string: the constructors normalize `Some("")` to `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackEvent {
    Screen {
        path: String,
        title: Option<String>,
    },
    Event {
        category: String,
        action: String,
        name: Option<String>,
        value: Option<f64>,
        path: Option<String>,
    },
    Search {
        query: String,
        category: Option<String>,
        result_count: i64,
        path: Option<String>,
    },
    /// `url` is kept exactly as supplied; it is only checked to be an absolute URI.
    Outlink {
        url: String,
    },
    DownloadLink {
        url: String,
    },
    AppDownload,
}

/// Optional fields accepted by [`crate::tracker::Tracker::track_event`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventOptions {
    pub name: Option<String>,
    pub value: Option<f64>,
    /// Path under which the event occurred, for example `/user/settings/billing`.
    pub url: Option<String>,
}

impl EventOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Optional fields accepted by [`crate::tracker::Tracker::track_search`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub category: Option<String>,
    /// Defaults to `0` when unset, matching the mobile SDKs.
    pub result_count: Option<i64>,
    /// Page on which the search was made.
    pub url: Option<String>,
}

impl SearchOptions {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_result_count(mut self, count: i64) -> Self {
        self.result_count = Some(count);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl TrackEvent {
    pub fn screen(path: impl Into<String>, title: Option<&str>) -> Self {
        TrackEvent::Screen {
            path: path.into(),
            title: non_empty(title),
        }
    }

    pub fn event(
        category: impl Into<String>,
        action: impl Into<String>,
        options: EventOptions,
    ) -> Self {
        TrackEvent::Event {
            category: category.into(),
            action: action.into(),
            name: non_empty(options.name.as_deref()),
            value: options.value,
            path: non_empty(options.url.as_deref()),
        }
    }

    pub fn search(query: impl Into<String>, options: SearchOptions) -> Self {
        TrackEvent::Search {
            query: query.into(),
            category: non_empty(options.category.as_deref()),
            result_count: options.result_count.unwrap_or(0),
            path: non_empty(options.url.as_deref()),
        }
    }

    /// Builds an outlink event, failing with `tracker/malformed-url` when `url` is not an
    /// absolute URI.
    pub fn outlink(url: &str) -> TrackerResult<Self> {
        Ok(TrackEvent::Outlink {
            url: parse_link(url, "outlink")?,
        })
    }

    pub fn download_link(url: &str) -> TrackerResult<Self> {
        Ok(TrackEvent::DownloadLink {
            url: parse_link(url, "download link")?,
        })
    }

    pub fn app_download() -> Self {
        TrackEvent::AppDownload
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackEvent::Screen { .. } => "screen",
            TrackEvent::Event { .. } => "event",
            TrackEvent::Search { .. } => "search",
            TrackEvent::Outlink { .. } => "outlink",
            TrackEvent::DownloadLink { .. } => "download-link",
            TrackEvent::AppDownload => "app-download",
        }
    }
}

fn parse_link(raw: &str, kind: &str) -> TrackerResult<String> {
    Url::parse(raw.trim())
        .map(|_| raw.to_owned())
        .map_err(|err| malformed_url(format!("unable to parse {kind} url `{raw}`: {err}")))
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_owned)
}
