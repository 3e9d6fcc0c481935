//! Keystone v3 password authentication and service catalog

use crate::error::{OpenStackError, Result};
use serde::Deserialize;
use serde_json::{Value, json};

/// Project the token is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    Id(String),
    Name(String),
}

/// Password credentials of one OpenStack user
#[derive(Debug, Clone)]
pub struct Credentials {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project: ProjectScope,
    pub user_domain_name: String,
    pub project_domain_name: String,
    /// Endpoint interface to use from the catalog (`public`, `internal`, `admin`)
    pub interface: String,
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| OpenStackError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Credentials {
    /// Read the standard `OS_*` variables of an OpenStack RC file
    pub fn from_env() -> Result<Self> {
        let auth_url = required("OS_AUTH_URL")?;
        let username = required("OS_USERNAME")?;
        let password = required("OS_PASSWORD")?;
        let project = match std::env::var("OS_PROJECT_ID") {
            Ok(id) if !id.is_empty() => ProjectScope::Id(id),
            _ => ProjectScope::Name(required("OS_PROJECT_NAME")?),
        };

        Ok(Self {
            auth_url,
            username,
            password,
            project,
            user_domain_name: optional("OS_USER_DOMAIN_NAME", "Default"),
            project_domain_name: optional("OS_PROJECT_DOMAIN_NAME", "Default"),
            interface: optional("OS_INTERFACE", "public"),
        })
    }

    pub fn token_url(&self) -> String {
        let base = self.auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{}/auth/tokens", base)
        } else {
            format!("{}/v3/auth/tokens", base)
        }
    }

    fn request_body(&self) -> Value {
        let project = match &self.project {
            ProjectScope::Id(id) => json!({ "id": id }),
            ProjectScope::Name(name) => json!({
                "name": name,
                "domain": { "name": self.project_domain_name },
            }),
        };

        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "domain": { "name": self.user_domain_name },
                            "password": self.password,
                        }
                    }
                },
                "scope": { "project": project }
            }
        })
    }
}

/// Issued token plus the catalog it came with
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    catalog: Vec<CatalogEntry>,
}

impl Token {
    /// URL of the first service type in `service_types` offered in `region`
    pub fn endpoint(&self, service_types: &[&str], region: &str, interface: &str) -> Result<String> {
        service_types
            .iter()
            .filter_map(|service_type| self.catalog.iter().find(|e| e.service_type == *service_type))
            .flat_map(|entry| entry.endpoints.iter())
            .find(|e| e.interface == interface && e.in_region(region))
            .map(|e| e.url.trim_end_matches('/').to_string())
            .ok_or_else(|| OpenStackError::EndpointNotFound {
                service: service_types.join("|"),
                region: region.to_string(),
                interface: interface.to_string(),
            })
    }
}

/// Obtain a project-scoped token
pub async fn authenticate(http: &reqwest::Client, credentials: &Credentials) -> Result<Token> {
    let url = credentials.token_url();
    tracing::debug!("Authenticating {} at {}", credentials.username, url);

    let response = http
        .post(&url)
        .json(&credentials.request_body())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(OpenStackError::AuthenticationFailed(format!(
            "{}: {}",
            status, body
        )));
    }

    let value = response
        .headers()
        .get("X-Subject-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| OpenStackError::AuthenticationFailed("response lacks X-Subject-Token".into()))?;

    let body: TokenResponse = response.json().await?;
    Ok(Token {
        value,
        catalog: body.token.catalog,
    })
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct Endpoint {
    interface: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    url: String,
}

impl Endpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region_id.as_deref() == Some(region) || self.region.as_deref() == Some(region)
    }
}
