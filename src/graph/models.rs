//! Graph resource payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signed-in user (`GET /me`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
}

/// Delegated permission exposed by an application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionScope {
    pub id: Uuid,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub admin_consent_display_name: String,
    pub admin_consent_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_consent_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_consent_description: Option<String>,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplication {
    #[serde(rename = "oauth2PermissionScopes")]
    pub oauth2_permission_scopes: Vec<PermissionScope>,
}

/// Body of `POST /applications`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRegistration {
    pub display_name: String,
    pub sign_in_audience: String,
    pub identifier_uris: Vec<String>,
    pub api: ApiApplication,
}

/// Created application as returned by Graph.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Option<String>,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}
