//! Principal references as they appear in descriptors.
//!
//! Users are written `user:<name>_<domain>`, where the last underscore stands
//! for the `@` of the e-mail address; groups are written `group:<name>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrincipalRef {
    User { email: String },
    Group { name: String },
}

impl PrincipalRef {
    pub fn user(email: impl Into<String>) -> Self {
        Self::User {
            email: email.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::Group { name: name.into() }
    }

    /// Identifier understood by the identity backend (e-mail or group name)
    pub fn external_id(&self) -> &str {
        match self {
            Self::User { email } => email,
            Self::Group { name } => name,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { email } => match email.rsplit_once('@') {
                Some((local, domain)) => write!(f, "user:{local}_{domain}"),
                None => write!(f, "user:{email}"),
            },
            Self::Group { name } => write!(f, "group:{name}"),
        }
    }
}

impl FromStr for PrincipalRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(user) = s.strip_prefix("user:") {
            let (local, domain) = user
                .rsplit_once('_')
                .filter(|(local, domain)| !local.is_empty() && !domain.is_empty())
                .ok_or_else(|| {
                    format!("'{s}' is not a valid user reference, expected 'user:<name>_<domain>'")
                })?;
            return Ok(Self::user(format!("{local}@{domain}")));
        }

        if let Some(group) = s.strip_prefix("group:") {
            if group.trim().is_empty() {
                return Err(format!("'{s}' is not a valid group reference"));
            }
            return Ok(Self::group(group));
        }

        Err(format!(
            "'{s}' is not a valid principal reference, expected 'user:' or 'group:' prefix"
        ))
    }
}

impl Serialize for PrincipalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrincipalRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
