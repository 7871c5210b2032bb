use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Identity, Role, User};

use super::session::resolve_session;

/// Who is making a request, resolved fresh from its session token.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    /// Authenticated, but no tenant-scoped user record yet.
    Demo { identity: Identity },
    Member { identity: Identity, user: User },
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Anonymous => None,
            Caller::Demo { identity } | Caller::Member { identity, .. } => Some(identity),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Caller::Member { user, .. } => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Caller::Anonymous)
    }

    pub fn require_identity(&self) -> Result<&Identity> {
        self.identity().ok_or(Error::Unauthorized)
    }

    /// Admin actions need a non-demo user record with the admin role.
    pub fn require_admin(&self) -> Result<&User> {
        match self {
            Caller::Anonymous => Err(Error::Unauthorized),
            Caller::Demo { .. } => Err(Error::Forbidden),
            Caller::Member { user, .. } => {
                if user.role == Role::Admin && !user.is_demo {
                    Ok(user)
                } else {
                    Err(Error::Forbidden)
                }
            }
        }
    }

    pub fn require_super_admin(&self) -> Result<&User> {
        let user = self.require_admin()?;
        if user.is_superadmin {
            Ok(user)
        } else {
            Err(Error::Forbidden)
        }
    }
}

/// Resolves a raw session token into a `Caller`.
pub fn resolve_caller(store: &dyn Store, raw_token: Option<&str>) -> Result<Caller> {
    let Some(raw_token) = raw_token else {
        return Ok(Caller::Anonymous);
    };

    let Some(resolved) = resolve_session(store, raw_token)? else {
        return Ok(Caller::Anonymous);
    };

    caller_for_identity(store, resolved.identity)
}

/// Attaches the identity's user record, if it has one.
pub fn caller_for_identity(store: &dyn Store, identity: Identity) -> Result<Caller> {
    Ok(match store.get_user_by_identity(&identity.id)? {
        Some(user) => Caller::Member { identity, user },
        None => Caller::Demo { identity },
    })
}
