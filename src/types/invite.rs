use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const PLATFORM_INVITE_TYPE: &str = "platform";

const NUMERIC_CODE_LEN: usize = 4;
const HEX_CODE_LEN: usize = 12;

/// Sub-kind of an invite row, with the fields that only make sense for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InviteKind {
    /// A signup grant with a usable code.
    PlatformInvite {
        code: String,
        expires_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        company_name: Option<String>,
    },
    /// A self-service request for a platform invite, awaiting an admin.
    AccessRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        company_name: Option<String>,
    },
}

impl InviteKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InviteKind::PlatformInvite { .. } => "platform_invite",
            InviteKind::AccessRequest { .. } => "access_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Approved,
    Revoked,
}

impl InviteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Approved => "approved",
            InviteStatus::Revoked => "revoked",
        }
    }
}

impl FromStr for InviteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InviteStatus::Pending),
            "approved" => Ok(InviteStatus::Approved),
            "revoked" => Ok(InviteStatus::Revoked),
            other => Err(format!("unknown invite status: {other}")),
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: String,
    pub email: String,
    pub invite_type: String,
    #[serde(flatten)]
    pub kind: InviteKind,
    pub status: InviteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Invite {
    /// Code of a platform invite; access requests carry none.
    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            InviteKind::PlatformInvite { code, .. } => Some(code),
            InviteKind::AccessRequest { .. } => None,
        }
    }

    pub fn company_name(&self) -> Option<&str> {
        match &self.kind {
            InviteKind::PlatformInvite { company_name, .. }
            | InviteKind::AccessRequest { company_name } => company_name.as_deref(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            InviteKind::PlatformInvite { expires_at, .. } => Some(*expires_at),
            InviteKind::AccessRequest { .. } => None,
        }
    }
}

/// The two invite code schemes in use.
///
/// `Numeric` codes are issued by the HTTP flows and are the only ones the
/// validate endpoint accepts. `Hex` codes come from the seeding command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteCode {
    Numeric(String),
    Hex(String),
}

impl InviteCode {
    pub fn generate_numeric() -> Self {
        let n: u16 = rand::thread_rng().gen_range(0..10_000);
        InviteCode::Numeric(format!("{n:0width$}", width = NUMERIC_CODE_LEN))
    }

    /// Derives a 12-character hex code from the email and a random nonce.
    pub fn generate_hex(email: &str) -> Self {
        let nonce: [u8; 16] = rand::thread_rng().r#gen();
        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hasher.update(nonce);
        let digest = hex::encode(hasher.finalize());
        InviteCode::Hex(digest[..HEX_CODE_LEN].to_string())
    }

    /// Accepts exactly four ASCII digits.
    pub fn parse_numeric(s: &str) -> Option<Self> {
        if s.len() == NUMERIC_CODE_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Some(InviteCode::Numeric(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InviteCode::Numeric(s) | InviteCode::Hex(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            InviteCode::Numeric(s) | InviteCode::Hex(s) => s,
        }
    }
}
