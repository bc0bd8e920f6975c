//! Field normalization for noisy rendered text
//!
//! Every function here is total: any input maps to either the sentinel or a
//! value of the expected shape. Extraction code relies on that to keep
//! single-field failures from escaping the normalization layer.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical "no usable value" marker. Downstream consumers never see a
/// missing key or an empty string, only this.
pub const SENTINEL: &str = "-";

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://([A-Za-z0-9-]+\.)+[A-Za-z0-9-]{2,}(/\S*)?$").unwrap()
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@([A-Za-z0-9-]+\.)+[A-Za-z0-9-]{2,}$").unwrap()
});

/// Trims and maps dash-like glyphs, `0`, and `N/A` to the sentinel.
/// Idempotent: applying it twice is the same as applying it once.
pub fn clean_dash(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return SENTINEL.to_string();
    }
    match trimmed {
        "-" | "—" | "–" | "0" => SENTINEL.to_string(),
        _ if trimmed.eq_ignore_ascii_case("n/a") => SENTINEL.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Normalizes a website value: scheme prepended when missing, then
/// validated against a dotted-label host pattern.
pub fn normalize_url(value: &str) -> String {
    let cleaned = clean_dash(value);
    if cleaned == SENTINEL {
        return cleaned;
    }
    let with_scheme = if cleaned.contains("://") {
        cleaned
    } else {
        format!("https://{cleaned}")
    };
    if URL_RE.is_match(&with_scheme) {
        with_scheme
    } else {
        SENTINEL.to_string()
    }
}

/// Validates an email address; anything malformed collapses to the sentinel.
pub fn normalize_email(value: &str) -> String {
    let cleaned = clean_dash(value);
    if cleaned == SENTINEL {
        return cleaned;
    }
    if EMAIL_RE.is_match(&cleaned) {
        cleaned
    } else {
        SENTINEL.to_string()
    }
}

/// Strips a phone value down to digits and `+`, collapsing runs of `+`.
/// Fewer than six digits is treated as no value.
pub fn normalize_phone(value: &str) -> String {
    let cleaned = clean_dash(value);
    if cleaned == SENTINEL {
        return cleaned;
    }

    let mut out = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        if c == '+' {
            if !out.ends_with('+') {
                out.push(c);
            }
        } else if c.is_ascii_digit() {
            out.push(c);
        }
    }

    let digit_count = out.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count < 6 {
        return SENTINEL.to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_dash_maps_null_like_values() {
        assert_eq!(clean_dash(""), SENTINEL);
        assert_eq!(clean_dash("   "), SENTINEL);
        assert_eq!(clean_dash("-"), SENTINEL);
        assert_eq!(clean_dash("—"), SENTINEL);
        assert_eq!(clean_dash("–"), SENTINEL);
        assert_eq!(clean_dash("0"), SENTINEL);
        assert_eq!(clean_dash("N/A"), SENTINEL);
        assert_eq!(clean_dash("n/a"), SENTINEL);
        assert_eq!(clean_dash("  SD Negeri 1  "), "SD Negeri 1");
    }

    #[test]
    fn clean_dash_is_idempotent() {
        for input in ["", "-", "—", "0", "n/a", " SDN Ungaran 01 ", "021-555"] {
            let once = clean_dash(input);
            assert_eq!(clean_dash(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn normalize_url_prepends_scheme() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(
            normalize_url("sdn1.sch.id/profil"),
            "https://sdn1.sch.id/profil"
        );
        assert_eq!(
            normalize_url("http://example.com"),
            "http://example.com"
        );
    }

    #[test]
    fn normalize_url_rejects_garbage() {
        assert_eq!(normalize_url("not a url"), SENTINEL);
        assert_eq!(normalize_url("-"), SENTINEL);
        assert_eq!(normalize_url("http://"), SENTINEL);
        assert_eq!(normalize_url("localhost"), SENTINEL);
    }

    #[test]
    fn normalize_email_accepts_valid_rejects_invalid() {
        assert_eq!(normalize_email("a@b.co"), "a@b.co");
        assert_eq!(
            normalize_email("kepala.sekolah@sdn1.sch.id"),
            "kepala.sekolah@sdn1.sch.id"
        );
        assert_eq!(normalize_email("bad@@x"), SENTINEL);
        assert_eq!(normalize_email("no-at-sign"), SENTINEL);
        assert_eq!(normalize_email("-"), SENTINEL);
    }

    #[test]
    fn normalize_phone_strips_and_collapses() {
        assert_eq!(normalize_phone("+62 812-3456-789"), "+628123456789");
        assert_eq!(normalize_phone("(024) 6921-234"), "0246921234");
        assert_eq!(normalize_phone("++62++813 000"), "+62+813000");
    }

    #[test]
    fn normalize_phone_rejects_short_or_empty() {
        assert_eq!(normalize_phone("123"), SENTINEL);
        assert_eq!(normalize_phone("+"), SENTINEL);
        assert_eq!(normalize_phone("ext."), SENTINEL);
        assert_eq!(normalize_phone("-"), SENTINEL);
    }
}
