//! # Compiler Primitives
//!
//! Hardcoded constants for the Sigflow CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Index of the startup layer.
///
/// The first layer is the only one evaluated unconditionally by the
/// startup schedule.
pub const STARTUP_LAYER: usize = 0;

/// Prefix of event pseudo-signal labels (`event:<functor>`).
///
/// The separator is reserved: user names may not contain it.
pub const EVENT_LABEL_PREFIX: &str = "event:";

/// Characters that may not appear in functor or signal names.
pub const RESERVED_NAME_CHARS: &[char] = &[':'];

/// Width in bits of one change-flag storage word.
pub const CHANGE_WORD_BITS: usize = 32;

/// Magic bytes for the Sigflow binary plan header.
///
/// - File Header = Magic Bytes ("SGFL") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"SGFL";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the plan format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// CAPACITY LIMITS
// =============================================================================

/// Maximum number of functors in one compilation.
///
/// Handles are `u32`; this bound keeps generated artifacts reasonable.
pub const MAX_FUNCTOR_COUNT: usize = 65_536;

/// Maximum number of produced signals in one compilation.
pub const MAX_SIGNAL_COUNT: usize = 65_536;

/// Maximum length of a functor or signal name.
pub const MAX_NAME_LENGTH: usize = 256;

/// Number of change-flag words needed for `signal_count` slots.
///
/// Always at least one word, so an empty plan still has valid storage.
#[must_use]
pub const fn change_words(signal_count: usize) -> usize {
    signal_count / CHANGE_WORD_BITS + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"SGFL");
    }

    #[test]
    fn change_words_rounds_up() {
        assert_eq!(change_words(0), 1);
        assert_eq!(change_words(31), 1);
        assert_eq!(change_words(32), 2);
        assert_eq!(change_words(70), 3);
    }
}
