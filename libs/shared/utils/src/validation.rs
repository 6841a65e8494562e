use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").expect("phone pattern compiles")
});

static CLINIC_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9][A-Z0-9-]{2,15}$").expect("clinic code pattern compiles")
});

static HEX_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone.trim())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_clinic_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Expects an already normalized (upper-case) code.
pub fn is_valid_clinic_code(code: &str) -> bool {
    CLINIC_CODE_RE.is_match(code)
}

/// `#rrggbb`, as used for calendar colors.
pub fn is_valid_hex_color(color: &str) -> bool {
    HEX_COLOR_RE.is_match(color)
}

/// Strips characters that would break a PostgREST `or=(...)` group or act
/// as wildcards inside `ilike`.
pub fn search_term(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns the trimmed value, or a message naming the missing field.
pub fn require_non_blank(field: &str, value: Option<&str>) -> Result<String, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(format!("{} is required", field)),
    }
}
