//! Payload validation rules shared by the HTTP and service layers

use super::{BookInput, CategoryInput, DomainError};

fn min_chars(value: &str, min: usize, message: &str) -> Result<(), DomainError> {
    if value.trim().chars().count() < min {
        return Err(DomainError::Validation(message.to_string()));
    }
    Ok(())
}

impl BookInput {
    /// Checks field shapes only; category existence and slug uniqueness are
    /// enforced by the repository.
    pub fn validate(&self) -> Result<(), DomainError> {
        min_chars(&self.title, 2, "Title is required")?;
        min_chars(&self.slug, 2, "Slug is required")?;
        min_chars(&self.author, 2, "Author is required")?;
        min_chars(&self.description, 10, "Description is required")?;
        if self.price_cents <= 0 {
            return Err(DomainError::Validation(
                "Price must be a positive amount".to_string(),
            ));
        }
        min_chars(&self.currency, 3, "Currency is required")?;
        if self.stock < 0 {
            return Err(DomainError::Validation(
                "Stock cannot be negative".to_string(),
            ));
        }
        min_chars(&self.image_url, 3, "Image is required")?;
        Ok(())
    }
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        min_chars(&self.name, 2, "Name is required")?;
        min_chars(&self.slug, 2, "Slug is required")
    }
}

/// Sign-up payload rules: name of two characters, a plausible email and a
/// six character password.
pub fn validate_signup(name: &str, email: &str, password: &str) -> Result<(), DomainError> {
    min_chars(name, 2, "Name is required")?;
    if !is_plausible_email(email) {
        return Err(DomainError::Validation("Invalid email".to_string()));
    }
    if password.chars().count() < 6 {
        return Err(DomainError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
