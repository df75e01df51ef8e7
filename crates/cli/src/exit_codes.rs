//! CLI Exit Code Registry
//!
//! Single source of truth for `fxbar` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, from clap)    |
//! | 3-9     | eval      | Formula evaluation codes                 |
//! | 10-19   | suggest   | Suggestion endpoint codes                |
//! | 20-29   | edit      | Terminal editor codes                    |

use fxbar_suggest::SuggestError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

// 2 is produced by clap itself for usage errors.

// =============================================================================
// Eval (3-9)
// =============================================================================

/// The token sequence has no value (empty, malformed, division by zero).
/// Nothing is printed on stdout in text mode.
pub const EXIT_EVAL_ABSENT: u8 = 3;

/// `@name` did not match any suggestion from the endpoint.
pub const EXIT_EVAL_UNKNOWN_TAG: u8 = 4;

// =============================================================================
// Suggest (10-19)
// =============================================================================

/// No endpoint URL in --url, FXBAR_AUTOCOMPLETE_URL or settings.json.
pub const EXIT_SUGGEST_NOT_CONFIGURED: u8 = 10;

/// Connect, TLS or timeout failure.
pub const EXIT_SUGGEST_NETWORK: u8 = 11;

/// Endpoint answered with a non-success status.
pub const EXIT_SUGGEST_HTTP: u8 = 12;

/// Endpoint body was not a suggestion list.
pub const EXIT_SUGGEST_PARSE: u8 = 13;

// =============================================================================
// Edit (20-29)
// =============================================================================

/// Terminal could not be set up (not a TTY, raw mode refused).
pub const EXIT_EDIT_TERMINAL: u8 = 20;

/// Map a SuggestError to its exit code.
pub fn suggest_exit_code(err: &SuggestError) -> u8 {
    match err {
        SuggestError::NotConfigured => EXIT_SUGGEST_NOT_CONFIGURED,
        SuggestError::Network(_) => EXIT_SUGGEST_NETWORK,
        SuggestError::Http(..) => EXIT_SUGGEST_HTTP,
        SuggestError::Parse(_) => EXIT_SUGGEST_PARSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggest_codes_are_in_range() {
        let errors = [
            SuggestError::NotConfigured,
            SuggestError::Network("x".into()),
            SuggestError::Http(500, String::new()),
            SuggestError::Parse("x".into()),
        ];
        for err in &errors {
            assert!((10..20).contains(&suggest_exit_code(err)), "{:?}", err);
        }
    }
}
