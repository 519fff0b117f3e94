//! Validation of URLs offered for analysis.

use log::warn;

use crate::config::MAX_URL_LENGTH;
use crate::error_handling::TrackerError;

/// Validates a URL before it is submitted.
///
/// Surrounding whitespace is trimmed. The URL must name its scheme explicitly
/// (`http://` or `https://`); no prefix is guessed, since submitting
/// `https://` for something the user typed as plain text would analyse a
/// different target than the one they meant.
///
/// # Arguments
///
/// * `raw` - The URL as typed by the user
///
/// # Returns
///
/// The trimmed URL, exactly as it will be sent to the service.
///
/// # Errors
///
/// Returns `TrackerError::InvalidUrl` if the URL is empty, longer than 2048
/// characters, lacks an `http`/`https` scheme or does not parse.
pub fn validate_submission_url(raw: &str) -> Result<String, TrackerError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(TrackerError::InvalidUrl("URL must not be empty".to_string()));
    }

    if url.len() > MAX_URL_LENGTH {
        warn!(
            "Rejecting URL exceeding maximum length ({} > {}): {}...",
            url.len(),
            MAX_URL_LENGTH,
            url.chars().take(50).collect::<String>()
        );
        return Err(TrackerError::InvalidUrl(format!(
            "URL is longer than {MAX_URL_LENGTH} characters"
        )));
    }

    let lowercase = url.to_ascii_lowercase();
    if !lowercase.starts_with("http://") && !lowercase.starts_with("https://") {
        return Err(TrackerError::InvalidUrl(format!(
            "{url}: URL must start with http:// or https://"
        )));
    }

    match url::Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some_and(|host| !host.is_empty()) => {
            Ok(url.to_string())
        }
        Ok(_) => Err(TrackerError::InvalidUrl(format!("{url}: URL has no host"))),
        Err(e) => Err(TrackerError::InvalidUrl(format!("{url}: {e}"))),
    }
}
