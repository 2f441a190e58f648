/// Header names used by the Firehose HTTP endpoint delivery contract (lowercase, as `HeaderName` stores them)
pub const COMMON_ATTRIBUTES_HEADER: &str = "x-amz-firehose-common-attributes";
pub const REQUEST_ID_HEADER: &str = "x-amz-firehose-request-id";
pub const ACCESS_KEY_HEADER: &str = "x-amz-firehose-access-key";

// Environment variables read once at startup
pub const ENV_ACCESS_KEY: &str = "ACCESS_KEY";
pub const ENV_CREDENTIAL_POLICY: &str = "CREDENTIAL_POLICY";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_STREAM_NAME: &str = "STREAM_NAME";
pub const ENV_AWS_REGION: &str = "AWS_REGION";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_REPLAY_TIMEOUT_SECS: &str = "REPLAY_TIMEOUT_SECS";
pub const ENV_REPLAY_DEFAULT_SCHEME: &str = "REPLAY_DEFAULT_SCHEME";
pub const ENV_MAX_BODY_BYTES: &str = "MAX_BODY_BYTES";

pub const DEFAULT_STREAM_NAME: &str = "http-out";
pub const DEFAULT_SCHEME: &str = "http";

/// Error messages surfaced in the response envelope
pub const POST_REQUIRED_MESSAGE: &str = "POST method required";
pub const INVALID_ACCESS_KEY_MESSAGE: &str = "invalid access key";
