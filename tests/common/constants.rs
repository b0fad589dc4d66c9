//! Shared constants for the e2e test suites.

pub const TEST_USER: &str = "test_user";
pub const TEST_PASS: &str = "test_password_123";

pub const OTHER_USER: &str = "other_user";
pub const OTHER_PASS: &str = "other_password_123";

pub const SERVER_READY_TIMEOUT_MS: u64 = 10_000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
