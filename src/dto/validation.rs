//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of an external catalog video identifier.
const VIDEO_ID_LENGTH: usize = 11;

/// Validates that a catalog video ID is exactly 11 URL-safe base64 characters.
///
/// # Examples
///
/// ```ignore
/// validate_video_id("dQw4w9WgXcQ") // Ok
/// validate_video_id("dQw4w9WgXc")  // Err - too short
/// validate_video_id("dQw4w9WgXc!") // Err - invalid character
/// ```
pub fn validate_video_id(id: &str) -> Result<(), ValidationError> {
    if id.len() != VIDEO_ID_LENGTH {
        let mut err = ValidationError::new("video_id_length");
        err.message = Some(
            format!(
                "Video ID must be exactly {VIDEO_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("video_id_format");
        err.message =
            Some("Video ID must contain only letters, digits, `-`, and `_`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_video_id_valid() {
        assert!(validate_video_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_video_id("___________").is_ok());
        assert!(validate_video_id("a-b_c-d_e-f").is_ok());
    }

    #[test]
    fn test_validate_video_id_invalid_length() {
        assert!(validate_video_id("dQw4w9WgXc").is_err()); // too short
        assert!(validate_video_id("dQw4w9WgXcQQ").is_err()); // too long
        assert!(validate_video_id("").is_err()); // empty
    }

    #[test]
    fn test_validate_video_id_invalid_format() {
        assert!(validate_video_id("dQw4w9WgXc!").is_err()); // punctuation
        assert!(validate_video_id("dQw4w9WgXc ").is_err()); // space
        assert!(validate_video_id("dQw4w9WgXcé").is_err()); // non-ascii
    }
}
