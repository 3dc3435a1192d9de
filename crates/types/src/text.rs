/// Minimum number of meaningful (trimmed) characters in a prescription.
pub const MIN_PRESCRIPTION_CHARS: usize = 10;

/// Maximum number of characters accepted in a single prescription.
pub const MAX_PRESCRIPTION_CHARS: usize = 5000;

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Prescription text is required")]
    Empty,
    /// The trimmed input is below the minimum length
    #[error("Prescription text is too short ({actual} characters, minimum {min})")]
    TooShort { min: usize, actual: usize },
    /// The input exceeds the maximum length
    #[error("Prescription text is too long ({actual} characters, maximum {max})")]
    TooLong { max: usize, actual: usize },
}

/// Raw prescription text that has passed the length bounds.
///
/// Lengths are counted in characters rather than bytes, so handwritten notes typed with
/// accented characters are measured the way a user would count them. The minimum applies to the
/// trimmed text; the maximum applies to the raw input. The stored value is the original
/// (untrimmed) text, since line layout is meaningful to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrescriptionText(String);

impl PrescriptionText {
    /// Creates a new `PrescriptionText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for empty or whitespace-only input, `TextError::TooShort` when
    /// the trimmed input has fewer than [`MIN_PRESCRIPTION_CHARS`] characters and
    /// `TextError::TooLong` when the input has more than [`MAX_PRESCRIPTION_CHARS`].
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let input = input.into();

        let total = input.chars().count();
        if total > MAX_PRESCRIPTION_CHARS {
            return Err(TextError::TooLong {
                max: MAX_PRESCRIPTION_CHARS,
                actual: total,
            });
        }

        let meaningful = input.trim().chars().count();
        if meaningful == 0 {
            return Err(TextError::Empty);
        }
        if meaningful < MIN_PRESCRIPTION_CHARS {
            return Err(TextError::TooShort {
                min: MIN_PRESCRIPTION_CHARS,
                actual: meaningful,
            });
        }

        Ok(Self(input))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrescriptionText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PrescriptionText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PrescriptionText {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl serde::Serialize for PrescriptionText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PrescriptionText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PrescriptionText::new(s).map_err(serde::de::Error::custom)
    }
}
