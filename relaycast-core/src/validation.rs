//! Input validation for profile and endpoint writes.

/// Maximum profile name length
pub const PROFILE_NAME_MAX: usize = 100;
/// Maximum endpoint name length
pub const ENDPOINT_NAME_MAX: usize = 100;

/// URL schemes accepted for endpoint destinations
pub const ALLOWED_STREAM_SCHEMES: &[&str] = &["rtmp", "rtmps", "srt"];

/// Validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    Field { field: String, message: String },
}

impl ValidationError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Profile name validator
#[derive(Debug, Clone)]
pub struct ProfileNameValidator {
    max_length: usize,
}

impl Default for ProfileNameValidator {
    fn default() -> Self {
        Self {
            max_length: PROFILE_NAME_MAX,
        }
    }
}

impl ProfileNameValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, name: &str) -> ValidationResult<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }

        if name.len() > self.max_length {
            return Err(ValidationError::field(
                "name",
                format!("must be at most {} characters", self.max_length),
            ));
        }

        if name.chars().any(char::is_control) {
            return Err(ValidationError::field(
                "name",
                "cannot contain control characters",
            ));
        }

        Ok(())
    }
}

/// Endpoint name validator
#[derive(Debug, Clone)]
pub struct EndpointNameValidator {
    max_length: usize,
}

impl Default for EndpointNameValidator {
    fn default() -> Self {
        Self {
            max_length: ENDPOINT_NAME_MAX,
        }
    }
}

impl EndpointNameValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, name: &str) -> ValidationResult<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }

        if name.len() > self.max_length {
            return Err(ValidationError::field(
                "name",
                format!("must be at most {} characters", self.max_length),
            ));
        }

        Ok(())
    }
}

/// Stream URL validator
///
/// Accepts syntactically valid URLs whose scheme is in the allowed set.
#[derive(Debug, Clone)]
pub struct StreamUrlValidator {
    allowed_schemes: Vec<String>,
}

impl Default for StreamUrlValidator {
    fn default() -> Self {
        Self {
            allowed_schemes: ALLOWED_STREAM_SCHEMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl StreamUrlValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_schemes(mut self, schemes: Vec<String>) -> Self {
        self.allowed_schemes = schemes;
        self
    }

    pub fn validate(&self, raw: &str) -> ValidationResult<()> {
        if raw.trim().is_empty() {
            return Err(ValidationError::field("url", "must not be empty"));
        }

        let parsed = url::Url::parse(raw)
            .map_err(|_| ValidationError::field("url", "must be a valid URL"))?;

        if !self.allowed_schemes.iter().any(|s| s == parsed.scheme()) {
            return Err(ValidationError::field(
                "url",
                format!(
                    "scheme '{}' is not allowed (expected one of {:?})",
                    parsed.scheme(),
                    self.allowed_schemes
                ),
            ));
        }

        Ok(())
    }
}

/// Service tag validator: free-form, but not empty.
pub fn validate_service_tag(tag: &str) -> ValidationResult<()> {
    if tag.trim().is_empty() {
        return Err(ValidationError::field("service_tag", "must not be empty"));
    }
    Ok(())
}
