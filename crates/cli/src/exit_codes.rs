//! CLI Exit Code Registry
//!
//! Single source of truth for `stripe-csv` exit codes. Scripts rely on
//! these values.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unparseable date/range)  |
//! | 3    | Output file already exists, or local IO failure      |
//! | 50   | No Stripe API key (neither flag nor env var)         |
//! | 51   | Stripe rejected the credentials (401/403)            |
//! | 52   | Stripe rejected the request (400)                    |
//! | 54   | Any other upstream failure: 4xx, 5xx, 429, network,  |
//! |      | malformed response                                   |
//!
//! There is no retry: the first failure of any kind ends the run.

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - export written.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable dates, empty range.
pub const EXIT_USAGE: u8 = 2;

/// Output path already taken, or the file could not be written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Fetch (50-59): Stripe API
// =============================================================================

/// No API key provided (neither flag nor env var).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Bad request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Upstream error, rate limit, network failure or malformed response.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;
