//! Profile name and criteria validation.

/// Validation error for a profile's name or search criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileValidationError {
    /// Name is empty or shorter than two characters.
    NameTooShort,
    /// A profile with the same name already exists (case-insensitive).
    DuplicateName,
    /// Criteria is empty or shorter than two characters.
    CriteriaTooShort,
    /// Criteria exceeds 200 characters.
    CriteriaTooLong,
    /// Criteria contains control characters or protocol-unsafe characters.
    CriteriaForbiddenChars,
    /// Criteria has no word containing a non-punctuation character.
    CriteriaNoUsefulWord,
}

impl ProfileValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NameTooShort => "Profile name must have at least 2 characters",
            Self::DuplicateName => "A profile with this name already exists",
            Self::CriteriaTooShort => "Search criteria must have at least 2 characters",
            Self::CriteriaTooLong => "Search criteria must have at most 200 characters",
            Self::CriteriaForbiddenChars => {
                "Search criteria must not contain control characters"
            }
            Self::CriteriaNoUsefulWord => {
                "Search criteria must contain at least one searchable word"
            }
        }
    }
}

impl std::fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ProfileValidationError {}

/// Minimum trimmed criteria length.
const CRITERIA_MIN_LEN: usize = 2;

/// Maximum trimmed criteria length.
const CRITERIA_MAX_LEN: usize = 200;

/// Punctuation stripped when checking that at least one useful token exists.
const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '-', '_', '(', ')', '[', ']', '{', '}', '"',
    '\'',
];

/// Validate a profile display name.
///
/// # Errors
///
/// Returns `NameTooShort` for names with fewer than two characters after
/// trimming.
pub fn validate_name(name: &str) -> Result<(), ProfileValidationError> {
    if name.trim().chars().count() < 2 {
        return Err(ProfileValidationError::NameTooShort);
    }
    Ok(())
}

/// Validate a search criteria phrase.
///
/// Accepts 2 to 200 trimmed characters, rejects control characters (which the
/// protocol's quoted literals cannot carry), and requires at least one word
/// made of something other than punctuation.
///
/// # Errors
///
/// Returns the first failed rule.
pub fn validate_criteria(criteria: &str) -> Result<(), ProfileValidationError> {
    let trimmed = criteria.trim();
    let len = trimmed.chars().count();

    if len < CRITERIA_MIN_LEN {
        return Err(ProfileValidationError::CriteriaTooShort);
    }
    if len > CRITERIA_MAX_LEN {
        return Err(ProfileValidationError::CriteriaTooLong);
    }
    if trimmed.chars().any(char::is_control) || trimmed.contains('\\') {
        return Err(ProfileValidationError::CriteriaForbiddenChars);
    }

    let has_useful_word = trimmed
        .split_whitespace()
        .any(|word| word.chars().any(|c| !PUNCTUATION.contains(&c)));
    if !has_useful_word {
        return Err(ProfileValidationError::CriteriaNoUsefulWord);
    }

    Ok(())
}
