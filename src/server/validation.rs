use crate::server::response::ApiError;

pub const DEFAULT_NEXT_PATH: &str = "/dashboard";

/// Returns the trimmed value of a required body field.
pub fn require_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{field} is required"))),
    }
}

/// Accepts only same-origin relative paths as a post-login destination.
pub fn safe_next_path(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains("://")
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => DEFAULT_NEXT_PATH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field() {
        assert_eq!(require_field(Some(" x "), "email").unwrap(), "x");

        let err = require_field(Some("   "), "email").unwrap_err();
        assert_eq!(err.message, "email is required");
        assert!(require_field(None, "requestId").is_err());
    }

    #[test]
    fn test_safe_next_path() {
        assert_eq!(safe_next_path(None), "/dashboard");
        assert_eq!(safe_next_path(Some("/inventory?x=1")), "/inventory?x=1");
        assert_eq!(safe_next_path(Some("https://evil.test")), "/dashboard");
        assert_eq!(safe_next_path(Some("//evil.test")), "/dashboard");
        assert_eq!(safe_next_path(Some("/\\evil.test")), "/dashboard");
        assert_eq!(safe_next_path(Some("dashboard")), "/dashboard");
        assert_eq!(safe_next_path(Some("/dash\nboard")), "/dashboard");
        assert_eq!(safe_next_path(Some("/dash\r\nSet-Cookie: x=1")), "/dashboard");
    }
}
