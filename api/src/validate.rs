//! Payload checks run before any I/O. Fields are checked in a fixed order and
//! the first failing rule wins.

use crate::models::{
    chat::GeneratePayload,
    user::{CreateUser, LoginPayload},
};

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Name must be at least 2 characters")]
    NameTooShort,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email format")]
    EmailInvalid,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Prompt is required")]
    PromptRequired,
    #[error("Language is required")]
    LanguageRequired,
}

pub fn validate_signup(payload: &CreateUser) -> Result<(), ValidationError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort);
    }

    validate_email(&payload.email)?;

    if payload.password.trim().is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }

    Ok(())
}

pub fn validate_login(payload: &LoginPayload) -> Result<(), ValidationError> {
    validate_email(&payload.email)?;

    if payload.password.trim().is_empty() {
        return Err(ValidationError::PasswordRequired);
    }

    Ok(())
}

pub fn validate_generate(payload: &GeneratePayload) -> Result<(), ValidationError> {
    if payload.prompt.trim().is_empty() {
        return Err(ValidationError::PromptRequired);
    }
    if payload.language.trim().is_empty() {
        return Err(ValidationError::LanguageRequired);
    }
    Ok(())
}

// Deliberately loose: anything with an `@` passes.
fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !email.contains('@') {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> CreateUser {
        CreateUser {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login(email: &str, password: &str) -> LoginPayload {
        LoginPayload {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn valid_signup_passes() {
        assert_eq!(validate_signup(&signup("Ada", "ada@example.com", "hunter22")), Ok(()));
    }

    #[test]
    fn signup_name_rules() {
        assert_eq!(
            validate_signup(&signup("   ", "ada@example.com", "hunter22")),
            Err(ValidationError::NameRequired)
        );
        assert_eq!(
            validate_signup(&signup(" A ", "ada@example.com", "hunter22")),
            Err(ValidationError::NameTooShort)
        );
    }

    #[test]
    fn signup_email_rules() {
        assert_eq!(
            validate_signup(&signup("Ada", "", "hunter22")),
            Err(ValidationError::EmailRequired)
        );
        assert_eq!(
            validate_signup(&signup("Ada", "ada.example.com", "hunter22")),
            Err(ValidationError::EmailInvalid)
        );
    }

    #[test]
    fn signup_password_rules() {
        assert_eq!(
            validate_signup(&signup("Ada", "ada@example.com", "")),
            Err(ValidationError::PasswordRequired)
        );
        let err = validate_signup(&signup("Ada", "ada@example.com", "1234567")).unwrap_err();
        assert_eq!(err, ValidationError::PasswordTooShort);
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
    }

    #[test]
    fn first_failing_field_wins() {
        assert_eq!(
            validate_signup(&signup("", "bad", "")),
            Err(ValidationError::NameRequired)
        );
        assert_eq!(
            validate_signup(&signup("Ada", "bad", "")),
            Err(ValidationError::EmailInvalid)
        );
    }

    #[test]
    fn login_rules() {
        assert_eq!(validate_login(&login("ada@example.com", "x")), Ok(()));
        assert_eq!(
            validate_login(&login("", "x")),
            Err(ValidationError::EmailRequired)
        );
        assert_eq!(
            validate_login(&login("ada", "x")),
            Err(ValidationError::EmailInvalid)
        );
        assert_eq!(
            validate_login(&login("ada@example.com", " ")),
            Err(ValidationError::PasswordRequired)
        );
    }

    #[test]
    fn generate_rules() {
        let mut payload = GeneratePayload {
            chat_id: None,
            prompt: " ".into(),
            language: "rust".into(),
        };
        assert_eq!(validate_generate(&payload), Err(ValidationError::PromptRequired));
        payload.prompt = "fizzbuzz".into();
        payload.language = String::new();
        assert_eq!(validate_generate(&payload), Err(ValidationError::LanguageRequired));
        payload.language = "rust".into();
        assert_eq!(validate_generate(&payload), Ok(()));
    }
}
