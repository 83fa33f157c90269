//! Name validation.

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Maximum group name length in characters (not bytes)
pub const GROUP_NAME_CHARS_MAX: usize = 20;

// =============================================================================
// Types
// =============================================================================

/// Why a requested name was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameViolation {
    Missing,
    TooLong { chars: usize },
}

// =============================================================================
// Validation
// =============================================================================

/// Check a requested name. Rules run in order: presence, then length.
pub fn validate_name(new_name: Option<&str>) -> Result<&str, NameViolation> {
    let name = match new_name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(NameViolation::Missing),
    };

    let chars = name.chars().count();
    if chars > GROUP_NAME_CHARS_MAX {
        return Err(NameViolation::TooLong { chars });
    }

    Ok(name)
}

// =============================================================================
// Tests
// =============================================================================
