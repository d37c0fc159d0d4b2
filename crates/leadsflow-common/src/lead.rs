use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A sales lead as cached on the client.
///
/// The backend owns the record; the client holds a transient copy that is
/// overwritten on every refetch. Older backend deployments still emit a few
/// Portuguese field names, which are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, alias = "telefone")]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "interesse")]
    pub interest: Option<String>,
    #[serde(default, alias = "origem")]
    pub origin: Option<String>,
    /// Drives funnel placement. Matched against stage ids and labels.
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "valor")]
    pub deal_value: Option<f64>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub ai_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub converted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn flag(&self, flag: LeadFlag) -> bool {
        match flag {
            LeadFlag::Favorite => self.favorite,
            LeadFlag::AiEnabled => self.ai_enabled,
        }
    }

    pub fn set_flag(&mut self, flag: LeadFlag, value: bool) {
        match flag {
            LeadFlag::Favorite => self.favorite = value,
            LeadFlag::AiEnabled => self.ai_enabled = value,
        }
    }

    /// Best available contact string for list views.
    pub fn contact(&self) -> Option<&str> {
        self.phone.as_deref().or(self.email.as_deref())
    }
}

/// Lead ids arrive as strings from current backends and as integers from
/// older ones.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) if s.trim().is_empty() => {
            Err(serde::de::Error::custom("lead id must not be empty"))
        }
        RawId::Text(s) => Ok(s),
        RawId::Number(n) => Ok(n.to_string()),
    }
}

/// Payload for creating or importing a lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "telefone")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "interesse")]
    pub interest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "origem")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "valor")]
    pub deal_value: Option<f64>,
}

impl NewLead {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update sent as `PATCH`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_at: Option<DateTime<Utc>>,
}

impl LeadPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn flag(flag: LeadFlag, value: bool) -> Self {
        let mut patch = Self::default();
        match flag {
            LeadFlag::Favorite => patch.favorite = Some(value),
            LeadFlag::AiEnabled => patch.ai_enabled = Some(value),
        }
        patch
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields to a cached lead.
    pub fn apply(&self, lead: &mut Lead) {
        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            lead.phone = Some(phone.clone());
        }
        if let Some(email) = &self.email {
            lead.email = Some(email.clone());
        }
        if let Some(interest) = &self.interest {
            lead.interest = Some(interest.clone());
        }
        if let Some(origin) = &self.origin {
            lead.origin = Some(origin.clone());
        }
        if let Some(status) = &self.status {
            lead.status = status.clone();
        }
        if let Some(value) = self.deal_value {
            lead.deal_value = Some(value);
        }
        if let Some(favorite) = self.favorite {
            lead.favorite = favorite;
        }
        if let Some(ai_enabled) = self.ai_enabled {
            lead.ai_enabled = ai_enabled;
        }
        if let Some(converted_at) = self.converted_at {
            lead.converted_at = Some(converted_at);
        }
    }
}

/// Boolean toggles exposed on the lead detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadFlag {
    Favorite,
    AiEnabled,
}

impl LeadFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::AiEnabled => "ai_enabled",
        }
    }
}

impl FromStr for LeadFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "favorite" | "fav" => Ok(Self::Favorite),
            "ai_enabled" | "ai" => Ok(Self::AiEnabled),
            _ => Err(format!("Invalid flag: {} (expected favorite or ai)", s)),
        }
    }
}
