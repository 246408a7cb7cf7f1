//! Centralized limits for recursive folds over user-written declarations.

/// Maximum nesting of constant folding when enum initializers reference
/// other members.
pub const MAX_CONSTANT_EVAL_DEPTH: u32 = 256;

/// Maximum length of a base class chain walked when checking for cycles
/// or looking up inherited constructors.
pub const MAX_BASE_CLASS_CHAIN: u32 = 512;

/// Maximum number of lexical scopes / alias hops walked while resolving
/// one name.
pub const MAX_RESOLUTION_DEPTH: u32 = 128;

/// Parameter and generic parameter positions are stored as `u16`.
pub const MAX_PARAMETER_COUNT: usize = u16::MAX as usize + 1;

/// `index` as a stored parameter position, `None` past
/// [`MAX_PARAMETER_COUNT`].
#[inline]
pub fn parameter_index(index: usize) -> Option<u16> {
    u16::try_from(index).ok()
}

#[cfg(test)]
#[path = "../tests/limits_tests.rs"]
mod tests;
