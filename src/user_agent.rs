//! User-Agent string for outbound requests.
//!
//! Every request carries one fixed User-Agent. Proceedings sites serve the
//! archive pages to desktop browsers, so the default mimics one; operators can
//! override it with `user_agent` in the config file or `--user-agent`.

/// Desktop-browser User-Agent sent unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
