/// Length of generated share codes
pub const SHARE_CODE_LEN: usize = 10;

/// Minimum password length for account registration (mirrored in the
/// register DTO's length validator)
#[allow(dead_code)]
pub const MIN_PASSWORD_LEN: u64 = 6;

/// Default expiry window when expiry is enabled without a timestamp (7 days)
pub const DEFAULT_EXPIRY_HOURS: i64 = 168;

/// Maximum number of files accepted in a single upload batch
pub const MAX_FILES_PER_UPLOAD: usize = 5;

// =============================================================================
// FILE STATUS
// =============================================================================

/// File is live and downloadable
pub const STATUS_ACTIVE: &str = "active";

/// File has passed its expiry timestamp
pub const STATUS_EXPIRED: &str = "expired";
