use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Claims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationMethod {
    None,
    #[serde(rename = "JWT")]
    Jwt,
    #[serde(rename = "APIKey")]
    ApiKey,
    System,
}

impl fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthenticationMethod::None => "None",
            AuthenticationMethod::Jwt => "JWT",
            AuthenticationMethod::ApiKey => "APIKey",
            AuthenticationMethod::System => "System",
        };
        f.write_str(s)
    }
}

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub authentication_method: AuthenticationMethod,
    pub additional_claims: BTreeMap<String, String>,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            display_name: Some("Anonymous User".to_string()),
            email: None,
            authentication_method: AuthenticationMethod::None,
            additional_claims: BTreeMap::new(),
        }
    }

    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            display_name: Some("System".to_string()),
            email: None,
            authentication_method: AuthenticationMethod::System,
            additional_claims: BTreeMap::new(),
        }
    }

    pub fn from_claims(claims: &Claims) -> Self {
        let mut additional_claims = BTreeMap::new();
        if let Some(tid) = &claims.tid {
            additional_claims.insert("TenantId".to_string(), tid.clone());
        }
        if let Some(appid) = &claims.appid {
            additional_claims.insert("AppId".to_string(), appid.clone());
        }
        if !claims.roles.is_empty() {
            additional_claims.insert("Roles".to_string(), claims.roles.join(","));
        }

        Self {
            user_id: claims.oid.clone().unwrap_or_else(|| claims.sub.clone()),
            display_name: claims.name.clone().or_else(|| claims.preferred_username.clone()),
            email: claims.email.clone().or_else(|| claims.upn.clone()),
            authentication_method: AuthenticationMethod::Jwt,
            additional_claims,
        }
    }

    /// The key itself is never kept, only its last four characters.
    pub fn from_api_key(name: &str, key: &str) -> Self {
        let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        let mut additional_claims = BTreeMap::new();
        additional_claims.insert("ApiKeyHash".to_string(), format!("***{}", tail));

        Self {
            user_id: name.to_string(),
            display_name: Some(name.to_string()),
            email: None,
            authentication_method: AuthenticationMethod::ApiKey,
            additional_claims,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication_method != AuthenticationMethod::None
    }

    pub fn to_log_string(&self) -> String {
        format!("{} ({})", self.display_name.as_deref().unwrap_or(&self.user_id), self.authentication_method)
    }
}
