use thiserror::Error;

#[derive(Debug, Error)]
pub enum NpSearchError {
    /// Missing or unusable external binary, or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Missing, empty, non-FASTA or mixed-alphabet input.
    #[error("input error: {0}")]
    Input(String),

    /// A pipeline stage produced nothing for the whole input.
    #[error("no results after {stage}: {message}")]
    EmptyResult { stage: String, message: String },

    /// An external tool failed for a reason other than running out of time.
    #[error("external tool error: {0}")]
    ExternalTool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl NpSearchError {
    pub fn empty_result(stage: &str, message: impl Into<String>) -> Self {
        Self::EmptyResult {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Process exit status reported for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 2,
            Self::Configuration(_) => 3,
            Self::EmptyResult { .. } => 4,
            Self::ExternalTool(_) => 5,
            Self::Io(_) | Self::Json(_) => 6,
            Self::Internal(_) => 70,
        }
    }
}

pub type Result<T> = std::result::Result<T, NpSearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_and_non_zero() {
        let errors = [
            NpSearchError::Input("x".to_string()),
            NpSearchError::Configuration("x".to_string()),
            NpSearchError::empty_result("orf extraction", "x"),
            NpSearchError::ExternalTool("x".to_string()),
            NpSearchError::Io(std::io::Error::other("x")),
            NpSearchError::Internal("x".to_string()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_empty_result_names_stage() {
        let e = NpSearchError::empty_result("signal peptide classification", "no positives");
        assert!(e.to_string().contains("signal peptide classification"));
    }
}
