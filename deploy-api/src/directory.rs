//! Client for the space directory collaborator.
//!
//! The directory maps an external space identifier to its space name and
//! lists the caller's environment namespaces with their type tags. Absence
//! of a space is a valid, non-error outcome. Consumers depend on the
//! [`SpaceDirectory`] trait; the default implementation talks JSON:API-style
//! HTTP through a caller-owned [`reqwest`] client.

use std::time::Duration;

use async_trait::async_trait;
use deploy_config::shared::DirectoryConfig;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Environment type tags that can host deployments. The remaining namespace
/// types (builds, tooling) never appear in the deployment views.
pub const DEPLOYABLE_ENV_KINDS: [&str; 2] = ["run", "stage"];

/// Request timeout for directory lookups.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors emitted by the directory client.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory answered with a non-2xx status.
    #[error("request to {url} failed with status {status}")]
    UpstreamStatus { status: u16, url: String },

    /// A transport-level failure while talking to the directory.
    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response body could not be decoded into the expected shape.
    #[error("malformed directory response: {0}")]
    Malformed(String),
}

/// A space resolved through the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceRef {
    pub id: Uuid,
    pub name: String,
}

/// One environment namespace of the caller, tagged with its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentNamespace {
    /// Namespace name in the cluster, e.g. `myspace-run`.
    pub name: String,
    /// Environment type tag, e.g. `run` or `stage`. Environments are
    /// addressed by this tag in the API.
    pub kind: String,
}

/// Lookup interface of the space directory.
#[async_trait]
pub trait SpaceDirectory: Send + Sync {
    /// Resolves an external space identifier to its space. Returns `None`
    /// when the space does not exist.
    async fn space_by_id(&self, space_id: Uuid) -> Result<Option<SpaceRef>, DirectoryError>;

    /// Lists the caller's environment namespaces.
    async fn environment_namespaces(&self)
    -> Result<Vec<EnvironmentNamespace>, DirectoryError>;
}

/// Keeps the environments that can host deployments.
pub fn deployable_environments(namespaces: &[EnvironmentNamespace]) -> Vec<EnvironmentNamespace> {
    namespaces
        .iter()
        .filter(|namespace| DEPLOYABLE_ENV_KINDS.contains(&namespace.kind.as_str()))
        .cloned()
        .collect()
}

/// Directory client over HTTP.
pub struct HttpSpaceDirectory {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpSpaceDirectory {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| DirectoryError::Malformed(format!("directory base url: {err}")))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token.expose_secret().to_string(),
        })
    }

    /// Fetches a JSON document, collapsing 404 into `None` and reporting any
    /// other non-2xx status as an upstream error carrying the URL.
    async fn get_document(&self, path: &str) -> Result<Option<Vec<u8>>, DirectoryError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| DirectoryError::Malformed(format!("directory url: {err}")))?;

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .header("Accept", "application/json, text/plain, */*")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DirectoryError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(Some(response.bytes().await?.to_vec()))
    }
}

#[async_trait]
impl SpaceDirectory for HttpSpaceDirectory {
    async fn space_by_id(&self, space_id: Uuid) -> Result<Option<SpaceRef>, DirectoryError> {
        let Some(body) = self.get_document(&format!("api/spaces/{space_id}")).await? else {
            return Ok(None);
        };

        parse_space_document(space_id, &body)
    }

    async fn environment_namespaces(
        &self,
    ) -> Result<Vec<EnvironmentNamespace>, DirectoryError> {
        let Some(body) = self.get_document("api/user/services").await? else {
            return Ok(Vec::new());
        };

        parse_user_services_document(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SpaceSingle {
    data: SpaceDocument,
}

#[derive(Debug, Deserialize)]
struct SpaceDocument {
    attributes: SpaceAttributes,
}

#[derive(Debug, Deserialize)]
struct SpaceAttributes {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserServiceSingle {
    data: UserServiceDocument,
}

#[derive(Debug, Deserialize)]
struct UserServiceDocument {
    attributes: UserServiceAttributes,
}

#[derive(Debug, Deserialize)]
struct UserServiceAttributes {
    #[serde(default)]
    namespaces: Vec<NamespaceAttributes>,
}

#[derive(Debug, Deserialize)]
struct NamespaceAttributes {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Decodes a space document. A document without a name counts as an absent
/// space, not an error.
fn parse_space_document(
    space_id: Uuid,
    body: &[u8],
) -> Result<Option<SpaceRef>, DirectoryError> {
    let document: SpaceSingle = serde_json::from_slice(body)
        .map_err(|err| DirectoryError::Malformed(format!("space document: {err}")))?;

    Ok(document
        .data
        .attributes
        .name
        .map(|name| SpaceRef { id: space_id, name }))
}

/// Decodes the user services document into environment namespaces.
fn parse_user_services_document(
    body: &[u8],
) -> Result<Vec<EnvironmentNamespace>, DirectoryError> {
    let document: UserServiceSingle = serde_json::from_slice(body)
        .map_err(|err| DirectoryError::Malformed(format!("user services document: {err}")))?;

    Ok(document
        .data
        .attributes
        .namespaces
        .into_iter()
        .map(|namespace| EnvironmentNamespace {
            name: namespace.name,
            kind: namespace.kind,
        })
        .collect())
}
