#![doc = include_str!("README.md")]
mod api;
mod config;
mod constants;
mod dimensions;
pub mod error;
mod event;
mod lifecycle;
mod request;
mod transport;

#[doc(inline)]
pub use api::{FlushReport, Tracker, TrackerState};

#[doc(inline)]
pub use config::{TrackerConfig, TrackerSettings};

#[doc(inline)]
pub use constants::{params, DISABLE_TRANSPORT_ENV, MAX_DIMENSION_VALUE_LENGTH, TRACKER_LOGGER_NAME};

#[doc(inline)]
pub use dimensions::{DimensionRegistry, DimensionSnapshot, DimensionUpdate};

#[doc(inline)]
pub use error::{
    config_error, internal_error, invalid_argument, malformed_url, transport_error, TrackerError,
    TrackerErrorCode, TrackerResult,
};

#[doc(inline)]
pub use event::{EventOptions, SearchOptions, TrackEvent};

#[doc(inline)]
pub use lifecycle::{HostLifecycleEvent, LifecycleAdapter};

#[doc(inline)]
pub use request::{build_request, BuildOutcome, OutboundRequest, RequestContext, SuppressReason};

#[doc(inline)]
pub use transport::{CollectorClient, HttpCollectorClient};
