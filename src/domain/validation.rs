//! Input validation for patient fields and account credentials
//!
//! Every check collects all problems before failing so the caller can show
//! them together. Messages never echo the rejected value.

use crate::domain::errors::VigilError;
use crate::domain::record::{RawDelta, RawFields};
use crate::domain::Result;

const CONTACT_SEPARATORS: [char; 5] = [' ', '-', '(', ')', '.'];
const MAX_USERNAME_LENGTH: usize = 64;

/// Checks a patient name
pub fn name_errors(name: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push("Name cannot be empty.".to_string());
    } else if name.trim().chars().count() < 3 {
        errors.push("Name must be at least 3 characters.".to_string());
    } else if name.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Name cannot contain numbers.".to_string());
    }
    errors
}

/// Checks a contact number; an empty contact is allowed
pub fn contact_errors(contact: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let contact = contact.trim();
    if contact.is_empty() {
        return errors;
    }

    let body = contact.strip_prefix('+').unwrap_or(contact);
    if body
        .chars()
        .any(|c| !c.is_ascii_digit() && !CONTACT_SEPARATORS.contains(&c))
    {
        errors.push("Contact number must contain digits only (0-9).".to_string());
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        errors.push("Contact number must be between 7 and 15 digits.".to_string());
    }
    errors
}

/// Checks a diagnosis
pub fn diagnosis_errors(diagnosis: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if diagnosis.trim().is_empty() {
        errors.push("Diagnosis cannot be empty.".to_string());
    } else if diagnosis.trim().chars().count() < 5 {
        errors.push("Diagnosis must be at least 5 characters long.".to_string());
    }
    errors
}

/// Validates a full set of raw fields for record creation
pub fn validate_raw_fields(raw: &RawFields) -> Result<()> {
    let mut errors = name_errors(&raw.name);
    errors.extend(contact_errors(&raw.contact));
    errors.extend(diagnosis_errors(&raw.diagnosis));
    into_result(errors)
}

/// Validates the fields an update would change
pub fn validate_delta(delta: &RawDelta) -> Result<()> {
    if delta.is_empty() {
        return Err(VigilError::Validation(
            "Update must change at least one field.".to_string(),
        ));
    }

    let mut errors = Vec::new();
    if let Some(name) = &delta.name {
        errors.extend(name_errors(name));
    }
    if let Some(contact) = &delta.contact {
        errors.extend(contact_errors(contact));
    }
    if let Some(diagnosis) = &delta.diagnosis {
        errors.extend(diagnosis_errors(diagnosis));
    }
    into_result(errors)
}

/// Validates a username for provisioning
pub fn validate_username(username: &str) -> Result<()> {
    let mut errors = Vec::new();
    if username.trim().is_empty() {
        errors.push("Username cannot be empty.".to_string());
    } else {
        if username.trim() != username {
            errors.push("Username cannot start or end with whitespace.".to_string());
        }
        if username.chars().count() > MAX_USERNAME_LENGTH {
            errors.push(format!(
                "Username must be at most {MAX_USERNAME_LENGTH} characters."
            ));
        }
        if username.chars().any(char::is_control) {
            errors.push("Username cannot contain control characters.".to_string());
        }
    }
    into_result(errors)
}

/// Validates a new secret against the configured minimum length
pub fn validate_secret(secret: &str, min_length: usize) -> Result<()> {
    if secret.chars().count() < min_length {
        return Err(VigilError::Validation(format!(
            "Password must be at least {min_length} characters."
        )));
    }
    Ok(())
}

fn into_result(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(VigilError::Validation(errors.join(" ")))
    }
}
