use commtest_model::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutErrorCode {
    OutOfBounds,
    LastLine,
    CoveredPosition,
    NotMerged,
    DepthExceeded,
    TooLarge,
    PathNotFound,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutError {
    pub code: LayoutErrorCode,
    pub message: String,
}

impl LayoutError {
    #[must_use]
    pub fn new(code: LayoutErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_bounds(what: &str, index: usize, len: usize) -> Self {
        Self::new(
            LayoutErrorCode::OutOfBounds,
            format!("{what} index {index} out of range (len {len})"),
        )
    }
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for LayoutError {}

impl From<ValidationError> for LayoutError {
    fn from(value: ValidationError) -> Self {
        Self::new(LayoutErrorCode::Invalid, value.0)
    }
}
