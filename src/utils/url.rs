//! Provider endpoint URLs.

/// Joins an API root and an endpoint path with exactly one slash between.
///
/// ```
/// use bestie::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://example.com/v1beta/openai/", "/chat/completions"),
///     "https://example.com/v1beta/openai/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Checks a user-supplied API root before it is saved.
///
/// ```
/// use bestie::utils::url::validate_base_url;
///
/// assert!(validate_base_url("http://localhost:11434/v1").is_ok());
/// assert!(validate_base_url("localhost:11434").is_err());
/// ```
pub fn validate_base_url(base_url: &str) -> Result<(), String> {
    let rest = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .ok_or_else(|| format!("Base URL must start with http:// or https://, got '{base_url}'"))?;
    if rest.trim_matches('/').is_empty() {
        return Err(format!("Base URL '{base_url}' has no host"));
    }
    if base_url.chars().any(char::is_whitespace) {
        return Err(format!("Base URL '{base_url}' contains whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_doubled_slashes() {
        for base in ["https://api.test/v1", "https://api.test/v1/", "https://api.test/v1///"] {
            assert_eq!(
                construct_api_url(base, "models"),
                "https://api.test/v1/models"
            );
        }
        assert_eq!(
            construct_api_url("https://api.test/v1", "///chat/completions"),
            "https://api.test/v1/chat/completions"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(validate_base_url("ftp://api.test").is_err());
        assert!(validate_base_url("https://").is_err());
        assert!(validate_base_url("https://api.test/v 1").is_err());
        assert!(validate_base_url("https://generativelanguage.googleapis.com/v1beta/openai").is_ok());
    }
}
