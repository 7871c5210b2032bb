use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Identity, Invite, Tenant, UpgradeRequest, User, Warehouse};
use crate::workflow::CreatedInvite;

// Request bodies keep every field optional so a missing field is a 400 with
// the field's name instead of a generic deserialisation rejection.

#[derive(Debug, Default, Deserialize)]
pub struct CreateInviteRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateInviteRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccessRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestUpgradeRequest {
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Body of the admin transitions that only name their target.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdBody {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectUpgradeRequest {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoAccountRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InviteListParams {
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteLinkResponse {
    pub email: String,
    pub code: String,
    pub magic_link: String,
    pub expires_at: DateTime<Utc>,
}

impl From<CreatedInvite> for InviteLinkResponse {
    fn from(created: CreatedInvite) -> Self {
        Self {
            email: created.invite.email,
            code: created.code,
            magic_link: created.magic_link,
            expires_at: created.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub id: String,
    pub email: String,
    pub kind: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Invite> for InviteResponse {
    fn from(invite: Invite) -> Self {
        Self {
            kind: invite.kind.as_str(),
            status: invite.status.as_str(),
            code: invite.code().map(String::from),
            company_name: invite.company_name().map(String::from),
            expires_at: invite.expires_at(),
            id: invite.id,
            email: invite.email,
            invited_by: invite.invited_by,
            created_at: invite.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequestResponse {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub status: &'static str,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UpgradeRequest> for UpgradeRequestResponse {
    fn from(request: UpgradeRequest) -> Self {
        Self {
            status: request.status.as_str(),
            id: request.id,
            email: request.email,
            company_name: request.company_name,
            rejection_reason: request.rejection_reason,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub success: bool,
    pub identity: Identity,
    pub user: Option<User>,
    pub is_demo: bool,
    pub tenant: Tenant,
    pub warehouses: Vec<Warehouse>,
}
