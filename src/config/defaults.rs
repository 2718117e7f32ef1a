//! Default values for configuration

/// Default poll interval between sync cycles (5 minutes)
pub fn default_poll_interval() -> u64 {
    std::env::var("SYNC_POLL_INTERVAL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300)
}

/// Default maximum retry attempts before a record is stuck
pub fn default_max_retries() -> u32 {
    3
}

/// Default delay before re-entering the loop after a cycle-level failure (1 minute)
pub fn default_retry_delay() -> u64 {
    60
}

/// Default listing page size requested from the source
pub fn default_batch_size() -> u32 {
    50
}

/// Default content source API base URL
pub fn default_source_base_url() -> String {
    std::env::var("SOURCE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}

/// Default request timeout for source calls in seconds
pub fn default_source_timeout() -> u64 {
    30
}

/// Default user agent for source requests
pub fn default_source_user_agent() -> String {
    format!("portalsync/{}", env!("CARGO_PKG_VERSION"))
}

/// Default folder set initialized for every new tenant
pub fn default_folders() -> Vec<String> {
    [
        "meeting_agendas",
        "meeting_minutes",
        "budgets",
        "ordinances",
        "resolutions",
        "public_notices",
        "event_flyers",
        "job_postings",
        "news_press_releases",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
