// Global configuration constants - single source of truth

pub struct Config;

impl Config {
    // Remote endpoints
    pub const PROFILE_URL: &'static str = "http://www.kongregate.com/accounts/";
    pub const USER_INFO_URL: &'static str = "http://www.kongregate.com/api/user_info.json";

    // Discovery
    pub const ID_STEP: u64 = 50;
    pub const MAX_CONNECTIONS: usize = 100;
    pub const DISCOVERY_TIMEOUT_SECS: u64 = 2;

    // Narrowing
    pub const INITIAL_CHUNK_SIZE: usize = 1 << 12;
    pub const CHUNKS_PER_CHECKPOINT: usize = 1 << 8;
    pub const CHECKPOINT_FILE: &'static str = "state.json";

    // HTTP/Network config
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const MAX_CONTENT_SIZE: usize = 5 * 1024 * 1024; // 5MB
    pub const RETRY_DELAY_SECS: u64 = 60 * 10; // long enough to stop getting denied
    pub const USER_AGENT: &'static str = "KongMemberSince/0.1";

    // On-disk formats
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d";
}
