mod invite;
mod models;
mod role;

pub use invite::{Invite, InviteCode, InviteKind, InviteStatus, PLATFORM_INVITE_TYPE};
pub use models::{
    AuthCode, Identity, Session, Tenant, UpgradeRequest, UpgradeStatus, User, Warehouse,
};
pub use role::Role;
