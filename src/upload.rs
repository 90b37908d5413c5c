use std::fmt;

/// Ceiling on uploaded file size, enforced both in the uploader and on the
/// server before any decode.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    TooLarge { size: usize },
    UnsupportedType { mime: String },
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::TooLarge { size } => write!(
                f,
                "The image is {} bytes, which exceeds the 5 MiB limit. Please choose a smaller file.",
                size
            ),
            UploadError::UnsupportedType { mime } => write!(
                f,
                "The file type '{}' is not supported. Please upload a JPEG, PNG or WebP image.",
                mime
            ),
        }
    }
}

impl std::error::Error for UploadError {}

pub fn check_upload(mime: &str, size: usize) -> Result<(), UploadError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(UploadError::UnsupportedType {
            mime: mime.to_string(),
        });
    }
    Ok(())
}

/// What the uploader holds after a file has been picked: enough to render a
/// preview and build the multipart submission. Selecting a new file replaces
/// the previous selection and clears any prior result or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    pub file_name: String,
    pub mime: String,
    pub size: usize,
    pub preview: String,
}

pub fn select_image(file_name: &str, mime: &str, size: usize) -> Result<SelectedImage, UploadError> {
    check_upload(mime, size)?;
    Ok(SelectedImage {
        file_name: file_name.to_string(),
        mime: mime.to_string(),
        size,
        preview: format!("preview:{}", file_name),
    })
}

/// Submission lifecycle of the uploader. At most one conversion request is in
/// flight at a time; `begin` refuses while already `Submitting`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
    Success { url: String },
    Failed { error: String },
}

impl SubmitState {
    pub fn can_submit(&self) -> bool {
        !matches!(self, SubmitState::Submitting)
    }

    /// Transition into `Submitting`. Returns false if a request is already
    /// outstanding, in which case the state is left untouched.
    pub fn begin(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        *self = SubmitState::Submitting;
        true
    }

    pub fn succeed(&mut self, url: String) {
        *self = SubmitState::Success { url };
    }

    pub fn fail(&mut self, error: String) {
        *self = SubmitState::Failed { error };
    }

    /// A new file selection puts the uploader back to `Idle`.
    pub fn reset(&mut self) {
        *self = SubmitState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_accepts_allowed_types_under_limit() {
        for mime in ALLOWED_MIME_TYPES {
            let selected = select_image("photo.png", mime, 1024).expect("selection rejected");
            assert!(!selected.preview.is_empty());
            assert_eq!(selected.mime, mime);
        }
    }

    #[test]
    fn test_select_accepts_file_at_exact_limit() {
        assert!(select_image("big.jpg", "image/jpeg", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_select_rejects_oversized_file() {
        let err = select_image("huge.jpg", "image/jpeg", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
        assert!(err.to_string().contains("5 MiB"));
    }

    #[test]
    fn test_select_rejects_disallowed_type() {
        let err = select_image("clip.gif", "image/gif", 1024).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert!(err.to_string().contains("image/gif"));
    }

    #[test]
    fn test_submit_guard_refuses_second_submit() {
        let mut state = SubmitState::Idle;
        assert!(state.begin());
        assert_eq!(state, SubmitState::Submitting);
        assert!(!state.begin());
        assert_eq!(state, SubmitState::Submitting);
    }

    #[test]
    fn test_terminal_states_allow_resubmission() {
        let mut state = SubmitState::Success {
            url: "https://host/x.png".to_string(),
        };
        assert!(state.begin());

        let mut state = SubmitState::Failed {
            error: "boom".to_string(),
        };
        assert!(state.begin());
    }

    #[test]
    fn test_new_selection_resets_to_idle() {
        let mut state = SubmitState::Failed {
            error: "boom".to_string(),
        };
        state.reset();
        assert_eq!(state, SubmitState::Idle);

        state.begin();
        state.succeed("https://host/x.png".to_string());
        state.reset();
        assert_eq!(state, SubmitState::Idle);
    }
}
