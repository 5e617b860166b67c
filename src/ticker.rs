// =============================================================================
// Ticker symbol validation and normalization
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

static TICKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9.\-^]+$").unwrap());

/// Normalize a raw path/query ticker into canonical form: URL-decode,
/// upper-case, then validate against the ticker symbol alphabet. Rejects
/// path traversal (`..`) explicitly even though it would also fail the
/// regex, since a bare `..` is otherwise the same length class as a short
/// ticker and deserves its own error message.
pub fn normalize_ticker(raw: &str) -> Result<String, String> {
    let decoded = percent_decode(raw);
    if decoded.contains("..") {
        return Err("path traversal sequence rejected".to_string());
    }
    let upper = decoded.to_uppercase();
    if upper.is_empty() {
        return Err("ticker must not be empty".to_string());
    }
    if !TICKER_RE.is_match(&upper) {
        return Err(format!("invalid ticker symbol: {raw}"));
    }
    Ok(upper)
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_tickers() {
        assert_eq!(normalize_ticker("aapl").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("^GSPC").unwrap(), "^GSPC");
    }

    #[test]
    fn decodes_dotted_tickers() {
        assert_eq!(normalize_ticker("BRK%2EB").unwrap(), "BRK.B");
        assert_eq!(normalize_ticker("BRK.B").unwrap(), "BRK.B");
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(normalize_ticker("..").is_err());
        assert!(normalize_ticker("%2E%2E").is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(normalize_ticker("AAPL;DROP").is_err());
        assert!(normalize_ticker("").is_err());
    }
}
