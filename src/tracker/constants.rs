use std::time::Duration;

pub const TRACKER_LOGGER_NAME: &str = "@matomo/tracker";

pub const DEFAULT_APPLICATION_ID: &str = "app";
pub const DEFAULT_APPLICATION_VERSION: &str = "1";
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000;

pub const MAX_DIMENSION_VALUE_LENGTH: usize = 255;
pub const VISITOR_ID_LENGTH: usize = 16;

pub const DISABLE_TRANSPORT_ENV: &str = "MATOMO_DISABLE_TRANSPORT";

pub const APP_DOWNLOAD_CATEGORY: &str = "Application";
pub const APP_DOWNLOAD_ACTION: &str = "downloaded";
pub const APP_DOWNLOAD_ACTION_NAME: &str = "application/downloaded";
pub const APP_DOWNLOAD_PATH: &str = "/application/downloaded";

/// Query parameter names of the Matomo HTTP tracking API.
pub mod params {
    pub const SITE_ID: &str = "idsite";
    pub const RECORD: &str = "rec";
    pub const API_VERSION: &str = "apiv";
    pub const VISITOR_ID: &str = "_id";
    pub const USER_ID: &str = "uid";
    pub const USER_AGENT: &str = "ua";
    pub const LANGUAGE: &str = "lang";
    pub const NEW_VISIT: &str = "new_visit";
    pub const DATETIME: &str = "cdt";
    pub const SEND_IMAGE: &str = "send_image";
    pub const URL: &str = "url";
    pub const ACTION_NAME: &str = "action_name";
    pub const EVENT_CATEGORY: &str = "e_c";
    pub const EVENT_ACTION: &str = "e_a";
    pub const EVENT_NAME: &str = "e_n";
    pub const EVENT_VALUE: &str = "e_v";
    pub const SEARCH_KEYWORD: &str = "search";
    pub const SEARCH_CATEGORY: &str = "search_cat";
    pub const SEARCH_COUNT: &str = "search_count";
    pub const LINK: &str = "link";
    pub const DOWNLOAD: &str = "download";
    pub const DIMENSION_PREFIX: &str = "dimension";
}
