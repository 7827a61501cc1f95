pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

pub fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(8080)
}

/// Continue offers left unanswered this long count as a failed economy call.
pub fn parse_continue_timeout_ms(raw: Option<&str>, fallback: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(|ms| ms.clamp(1_000, 120_000))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_applies_trim_empty_and_max_len() {
        assert_eq!(sanitize_name(""), "Player");
        assert_eq!(sanitize_name("   "), "Player");
        assert_eq!(sanitize_name(" Alice "), "Alice");
        assert_eq!(sanitize_name("12345678901234567890"), "1234567890123456");
    }

    #[test]
    fn port_parsing_falls_back_to_default() {
        assert_eq!(parse_port(Some("3000")), 3000);
        assert_eq!(parse_port(Some(" 9000 ")), 9000);
        assert_eq!(parse_port(Some("0")), 8080);
        assert_eq!(parse_port(Some("http")), 8080);
        assert_eq!(parse_port(None), 8080);
    }

    #[test]
    fn continue_timeout_is_clamped() {
        assert_eq!(parse_continue_timeout_ms(None, 15_000), 15_000);
        assert_eq!(parse_continue_timeout_ms(Some("5000"), 15_000), 5_000);
        assert_eq!(parse_continue_timeout_ms(Some("10"), 15_000), 1_000);
        assert_eq!(parse_continue_timeout_ms(Some("999999"), 15_000), 120_000);
        assert_eq!(parse_continue_timeout_ms(Some("soon"), 15_000), 15_000);
    }
}
