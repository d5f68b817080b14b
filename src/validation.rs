//! Validation for player-supplied identifiers and amounts.
//!
//! Everything here runs before any record is touched, so a failure never leaves
//! partial state behind.

/// Validation errors with messages suitable for chat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("이름이 너무 짧습니다 (최소 {min}자)")]
    TooShort { min: usize },

    #[error("이름이 너무 깁니다 (최대 {max}자)")]
    TooLong { max: usize },

    #[error("사용할 수 없는 문자가 포함되어 있습니다: {chars}")]
    InvalidCharacters { chars: String },

    #[error("숫자를 입력해주세요: '{input}'")]
    NotANumber { input: String },

    #[error("금액은 1 이상이어야 합니다")]
    NonPositive,

    #[error("값이 허용 범위를 벗어났습니다 ({min}~{max})")]
    OutOfRange { min: i64, max: i64 },
}

/// Guild names: 2..=max characters, letters (any script), digits, `_` and `-`.
pub fn validate_guild_name(name: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < 2 {
        return Err(ValidationError::TooShort { min: 2 });
    }
    if len > max_len {
        return Err(ValidationError::TooLong { max: max_len });
    }
    let invalid: String = trimmed
        .chars()
        .filter(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidCharacters { chars: invalid });
    }
    Ok(trimmed.to_string())
}

/// Coupon codes are ASCII alphanumeric and stored upper case.
pub fn normalize_coupon_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.len() < 3 {
        return Err(ValidationError::TooShort { min: 3 });
    }
    if trimmed.len() > 32 {
        return Err(ValidationError::TooLong { max: 32 });
    }
    let invalid: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric())
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidCharacters { chars: invalid });
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Largest amount a single deposit, withdrawal or coupon may move.
pub const MAX_AMOUNT: i64 = 1_000_000_000;

/// Parse a strictly positive whole amount. Thousands separators are accepted.
pub fn parse_amount(input: &str) -> Result<i64, ValidationError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    let value: i64 = cleaned.parse().map_err(|_| ValidationError::NotANumber {
        input: input.trim().to_string(),
    })?;
    if value <= 0 {
        return Err(ValidationError::NonPositive);
    }
    if value > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            min: 1,
            max: MAX_AMOUNT,
        });
    }
    Ok(value)
}

/// Strip formatting codes and control characters and cap the length of free text.
pub fn sanitize_description(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
            continue;
        }
        if c.is_control() {
            continue;
        }
        out.push(c);
    }
    out.trim().chars().take(max_chars).collect()
}
