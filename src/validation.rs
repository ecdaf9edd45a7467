//! Server-side validation of lead contact fields.
//!
//! The form does its own client-side validation; this is the backstop for
//! direct API callers and broken clients.

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Fake/placeholder patterns (repeated digits like 9999, 1111)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    // Basic checks
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // Detect fake patterns (repeated digits)
    let fake_patterns = [
        "999999",    // Common fake: 9999999999@gmail.com
        "111111",    // Common fake: 1111111111@
        "000000",    // Common fake: 000000@
        "123456789", // Sequential fake
    ];

    for pattern in &fake_patterns {
        if email.contains(pattern) {
            tracing::warn!("Invalid email detected (fake pattern '{}'): {}", pattern, email);
            return false;
        }
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("Invalid email format: {}", email);
        return false;
    }

    true
}

/// Validate and normalize a US phone number.
///
/// Returns `(true, e164)` for valid numbers, `(false, reason)` otherwise.
pub fn validate_us_phone(raw: &str) -> (bool, String) {
    // Skip empty or very short strings
    if raw.trim().is_empty() || raw.len() < 7 {
        return (false, "Phone too short".to_string());
    }

    // Parse with US country code
    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                // Format to E.164 (+12085550134)
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid US phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("Invalid US phone number: {}", raw);
                (false, "Invalid US phone number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse US phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user+tag@subdomain.example.co.uk"));
        assert!(is_valid_email("valid_email-2023@company.org"));
    }

    #[test]
    fn malformed_emails_rejected() {
        assert!(!is_valid_email("not_an_email"));
        assert!(!is_valid_email("missing@domain"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn fake_pattern_emails_rejected() {
        assert!(!is_valid_email("fake999999@example.com"));
        assert!(!is_valid_email("1111111111@gmail.com"));
        assert!(!is_valid_email("test123456789@example.com"));
    }

    #[test]
    fn valid_us_phones_normalize_to_e164() {
        let (valid, normalized) = validate_us_phone("(208) 555-0134");
        assert!(valid);
        assert_eq!(normalized, "+12085550134");

        let (valid, normalized) = validate_us_phone("208-555-0134");
        assert!(valid);
        assert_eq!(normalized, "+12085550134");

        let (valid, normalized) = validate_us_phone("+1 208 555 0134");
        assert!(valid);
        assert_eq!(normalized, "+12085550134");
    }

    #[test]
    fn invalid_phones_rejected() {
        let (valid, _) = validate_us_phone("123");
        assert!(!valid);

        let (valid, _) = validate_us_phone("");
        assert!(!valid);

        // 1xx area codes do not exist in the NANP
        let (valid, _) = validate_us_phone("(123) 555-0134");
        assert!(!valid);
    }
}
