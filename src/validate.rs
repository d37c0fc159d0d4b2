//! Lead field validation and duplicate detection.

use std::collections::HashMap;
use std::sync::LazyLock;

use leadsflow_common::{Lead, LeadPatch, NewLead};
use regex::Regex;
use serde::Serialize;

use crate::errors::ValidationError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is a valid static pattern")
});

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

/// Trim and lowercase an email address, checking its shape.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if EMAIL_REGEX.is_match(&email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail(raw.to_string()))
    }
}

/// Strip formatting from a phone number. A leading `+` is kept.
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    if !allowed || !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhone(raw.to_string()));
    }
    if trimmed.starts_with('+') {
        Ok(format!("+{}", digits))
    } else {
        Ok(digits)
    }
}

fn normalize_optional<F>(value: &Option<String>, f: F) -> Result<Option<String>, ValidationError>
where
    F: Fn(&str) -> Result<String, ValidationError>,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => f(v).map(Some),
    }
}

fn check_deal_value(value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ValidationError::InvalidDealValue(v)),
        _ => Ok(()),
    }
}

/// Check a lead form and return it with normalized contact fields.
pub fn validate_new_lead(lead: &NewLead) -> Result<NewLead, ValidationError> {
    let name = lead.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    check_deal_value(lead.deal_value)?;
    Ok(NewLead {
        name: name.to_string(),
        phone: normalize_optional(&lead.phone, normalize_phone)?,
        email: normalize_optional(&lead.email, normalize_email)?,
        ..lead.clone()
    })
}

/// Same checks for the fields a patch sets.
pub fn validate_patch(patch: &LeadPatch) -> Result<LeadPatch, ValidationError> {
    let mut patch = patch.clone();
    if let Some(name) = &patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        patch.name = Some(name.to_string());
    }
    check_deal_value(patch.deal_value)?;
    if let Some(phone) = &patch.phone {
        patch.phone = Some(normalize_phone(phone)?);
    }
    if let Some(email) = &patch.email {
        patch.email = Some(normalize_email(email)?);
    }
    Ok(patch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateField {
    Phone,
    Email,
}

/// Leads that share a normalized phone or email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub field: DuplicateField,
    pub key: String,
    pub lead_ids: Vec<String>,
}

fn phone_key(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= MIN_PHONE_DIGITS).then_some(digits)
}

fn email_key(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    (!email.is_empty()).then_some(email)
}

/// Groups of two or more leads sharing a contact, ordered by the first
/// lead's position in `leads`.
pub fn find_duplicates(leads: &[Lead]) -> Vec<DuplicateGroup> {
    let mut index: HashMap<(DuplicateField, String), usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();

    for lead in leads {
        let keys = [
            lead.phone
                .as_deref()
                .and_then(phone_key)
                .map(|k| (DuplicateField::Phone, k)),
            lead.email
                .as_deref()
                .and_then(email_key)
                .map(|k| (DuplicateField::Email, k)),
        ];
        for (field, key) in keys.into_iter().flatten() {
            match index.get(&(field, key.clone())) {
                Some(&idx) => groups[idx].lead_ids.push(lead.id.clone()),
                None => {
                    index.insert((field, key.clone()), groups.len());
                    groups.push(DuplicateGroup {
                        field,
                        key,
                        lead_ids: vec![lead.id.clone()],
                    });
                }
            }
        }
    }

    groups.retain(|g| g.lead_ids.len() > 1);
    groups
}
