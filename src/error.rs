use thiserror::Error;

/// Failure taxonomy for the caption pipeline.
///
/// Every stage reports one of these as data; nothing in the pipeline
/// panics or kills the process. The first failing stage short-circuits
/// the run and no partial transcript is returned.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("not a recognized YouTube URL")]
    InvalidUrl,

    #[error("no captions available for video {0}")]
    NoCaptions(String),

    #[error("no captions in any preferred language ({0})")]
    NoMatchingLanguage(String),

    #[error("failed to fetch captions: {0}")]
    FetchFailed(String),
}

impl CaptionError {
    /// Stable machine-readable kind, used in the JSON error shape.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::InvalidUrl => "invalid_url",
            CaptionError::NoCaptions(_) => "no_captions",
            CaptionError::NoMatchingLanguage(_) => "no_matching_language_captions",
            CaptionError::FetchFailed(_) => "fetch_failed",
        }
    }

    /// User-facing recovery hint. The manual upload path is always on offer.
    pub fn remediation(&self) -> &'static str {
        match self {
            CaptionError::InvalidUrl => {
                "Check the URL; supported forms are watch?v=, youtu.be/, embed/, /v/ and shorts/ links, or a bare 11-character video ID."
            }
            CaptionError::NoCaptions(_) => {
                "This video has no captions. Upload the meeting audio instead with --audio."
            }
            CaptionError::NoMatchingLanguage(_) => {
                "Captions exist but not in a preferred language. Adjust --langs, or upload the meeting audio with --audio."
            }
            CaptionError::FetchFailed(_) => {
                "YouTube could not be reached or returned unexpected data. Try again, or upload the meeting audio with --audio."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(CaptionError::InvalidUrl.kind(), "invalid_url");
        assert_eq!(CaptionError::NoCaptions("x".into()).kind(), "no_captions");
        assert_eq!(
            CaptionError::NoMatchingLanguage("en".into()).kind(),
            "no_matching_language_captions"
        );
        assert_eq!(CaptionError::FetchFailed("timeout".into()).kind(), "fetch_failed");
    }

    #[test]
    fn test_remediation_always_offers_upload_fallback() {
        for err in [
            CaptionError::NoCaptions("abc12345678".into()),
            CaptionError::NoMatchingLanguage("en, en-US".into()),
            CaptionError::FetchFailed("503".into()),
        ] {
            assert!(err.remediation().contains("--audio"), "missing fallback: {err}");
        }
    }

    #[test]
    fn test_display_includes_detail() {
        let err = CaptionError::NoMatchingLanguage("en, en-US, en-GB".into());
        assert!(err.to_string().contains("en, en-US, en-GB"));
    }
}
