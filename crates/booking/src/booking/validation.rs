use thiserror::Error;

const MIN_NAME_CHARS: usize = 3;
const MIN_PHONE_CHARS: usize = 8;
const MIN_PHONE_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("name must be at least {MIN_NAME_CHARS} characters")]
    NameTooShort,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("phone number is not valid")]
    InvalidPhone,
}

/// Collapses inner whitespace; the result has at least three characters.
pub fn validate_name(input: &str) -> Result<String, FieldError> {
    let name = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(FieldError::NameTooShort);
    }
    Ok(name)
}

/// `local@domain.tld` with no whitespace, exactly one `@`, and a dot inside
/// the domain that is neither its first nor last character.
pub fn validate_email(input: &str) -> Result<String, FieldError> {
    let email = input.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(FieldError::InvalidEmail);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(FieldError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(FieldError::InvalidEmail);
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len());
    if !has_inner_dot || domain.starts_with('.') || domain.ends_with('.') {
        return Err(FieldError::InvalidEmail);
    }

    Ok(email.to_string())
}

/// Digits, `+`, `-`, spaces and parentheses; at least eight characters of
/// which at least six are digits.
pub fn validate_phone(input: &str) -> Result<String, FieldError> {
    let phone = input.trim();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();

    if !allowed || phone.chars().count() < MIN_PHONE_CHARS || digits < MIN_PHONE_DIGITS {
        return Err(FieldError::InvalidPhone);
    }
    Ok(phone.to_string())
}
