use serde::Deserialize;

/// One agent response line from the serial buffer. All fields are optional
/// on the wire (the agent marshals with omitempty).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerialEntry {
    pub modulus: Option<String>,
    pub encrypted_password: Option<String>,
    pub error_message: Option<String>,
    pub user_name: Option<String>,
    pub password_found: Option<bool>,
    pub exponent: Option<String>,
    pub hash_function: Option<String>,
}

/// Scan the accumulated serial output for the response matching `modulus`.
///
/// The buffer interleaves agent responses with arbitrary console noise, so
/// each line is parsed fallibly and failures are filtered out rather than
/// aborting the scan. Lines are visited newest-first; the bottom-most match
/// wins. `None` means the agent has not answered yet and the caller should
/// poll again.
pub fn find_response(output: &str, modulus: &str) -> Option<SerialEntry> {
    output
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<SerialEntry>(line).ok())
        .find(|entry| entry.modulus.as_deref() == Some(modulus))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_matching_modulus_among_garbage() {
        let text = "garbage\n{\"modulus\":\"AA==\",\"encryptedPassword\":\"Zm9v\"}\n{\"modulus\":\"BB==\",\"encryptedPassword\":\"YmFy\"}";
        let entry = find_response(text, "AA==").unwrap();
        assert_eq!(entry.encrypted_password.as_deref(), Some("Zm9v"));
    }

    #[test]
    fn bottom_most_match_wins() {
        let text = "{\"modulus\":\"AA==\",\"encryptedPassword\":\"b2xk\"}\nboot noise\n{\"modulus\":\"AA==\",\"encryptedPassword\":\"bmV3\"}";
        let entry = find_response(text, "AA==").unwrap();
        assert_eq!(entry.encrypted_password.as_deref(), Some("bmV3"));
    }

    #[test]
    fn no_match_means_not_ready() {
        let text = "garbage\n{\"modulus\":\"BB==\",\"encryptedPassword\":\"YmFy\"}";
        assert!(find_response(text, "AA==").is_none());
        assert!(find_response("", "AA==").is_none());
    }

    #[test]
    fn tolerates_crlf_and_partial_lines() {
        let text = "{\"modulus\":\"AA==\",\"encryptedPassword\":\"Zm9v\"}\r\n{\"modulus\":\"AA==\",\"encryptedPa";
        let entry = find_response(text, "AA==").unwrap();
        assert_eq!(entry.encrypted_password.as_deref(), Some("Zm9v"));
    }

    #[test]
    fn carries_agent_error_and_hash_function() {
        let text = concat!(
            "{\"modulus\":\"AA==\",\"errorMessage\":\"failed to reset password\"}\n",
            "{\"modulus\":\"BB==\",\"encryptedPassword\":\"Zm9v\",\"passwordFound\":true,\"hashFunction\":\"sha256\",\"userName\":\"u\"}",
        );
        let entry = find_response(text, "AA==").unwrap();
        assert_eq!(
            entry.error_message.as_deref(),
            Some("failed to reset password")
        );

        let entry = find_response(text, "BB==").unwrap();
        assert_eq!(entry.hash_function.as_deref(), Some("sha256"));
        assert_eq!(entry.password_found, Some(true));
    }
}
