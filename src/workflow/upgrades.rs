use chrono::Utc;
use uuid::Uuid;

use super::bootstrap::{self, SetupOutcome};
use crate::auth::Caller;
use crate::error::{Error, Result};
use crate::store::{Grant, Store};
use crate::types::{UpgradeRequest, UpgradeStatus, User};

/// An approved upgrade and the tenant the identity now belongs to.
#[derive(Debug, Clone)]
pub struct ApprovedUpgrade {
    pub request: UpgradeRequest,
    pub tenant_id: String,
}

/// Files an upgrade request for a caller that is still in demo mode.
pub fn create(
    store: &dyn Store,
    caller: &Caller,
    company_name: Option<&str>,
) -> Result<UpgradeRequest> {
    let identity = match caller {
        Caller::Anonymous => return Err(Error::Unauthorized),
        Caller::Member { .. } => {
            return Err(Error::Conflict(
                "Account already has full access".to_string(),
            ));
        }
        Caller::Demo { identity } => identity,
    };

    let now = Utc::now();
    let request = UpgradeRequest {
        id: Uuid::new_v4().to_string(),
        email: identity.email.clone(),
        identity_id: identity.id.clone(),
        company_name: company_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from),
        status: UpgradeStatus::Pending,
        rejection_reason: None,
        rejected_by: None,
        rejected_at: None,
        approved_by: None,
        approved_at: None,
        created_at: now,
        updated_at: now,
    };

    match store.create_upgrade_request(&request) {
        Ok(()) => {
            tracing::info!("Upgrade request {} filed by {}", request.id, request.email);
            Ok(request)
        }
        Err(Error::AlreadyExists) => Err(Error::Conflict(
            "An upgrade request is already pending for this account".to_string(),
        )),
        Err(e) => Err(e),
    }
}

pub fn reject(
    store: &dyn Store,
    request_id: &str,
    reason: Option<&str>,
    admin: &User,
) -> Result<UpgradeRequest> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    let request = store.reject_upgrade_request(request_id, reason, &admin.id, Utc::now())?;
    tracing::info!("Upgrade request {} rejected by {}", request.id, admin.id);
    Ok(request)
}

/// Approves a pending request and moves the identity off the demo tenant.
///
/// For an identity without a user record, the status change and the new tenant
/// are written in one transaction: a request settled concurrently leaves no
/// tenant behind, and of two concurrent approvals only one provisions.
pub fn approve(store: &dyn Store, request_id: &str, admin: &User) -> Result<ApprovedUpgrade> {
    let request = store
        .get_upgrade_request(request_id)?
        .ok_or(Error::NotFound)?;

    let identity = store
        .get_identity(&request.identity_id)?
        .ok_or(Error::NotFound)?;

    if store.get_user_by_identity(&identity.id)?.is_none() {
        let grant = Grant::Upgrade {
            request_id: &request.id,
            approved_by: &admin.id,
        };
        if let SetupOutcome::Created { tenant, .. } =
            bootstrap::provision(store, &identity, request.company_name.as_deref(), grant)?
        {
            let request = store
                .get_upgrade_request(&request.id)?
                .ok_or(Error::NotFound)?;
            tracing::info!("Upgrade request {} approved by {}", request.id, admin.id);
            return Ok(ApprovedUpgrade {
                request,
                tenant_id: tenant.id,
            });
        }
    }

    // The identity already has a tenant; only the request is settled.
    let request = store.approve_upgrade_request(&request.id, &admin.id, Utc::now())?;
    tracing::info!("Upgrade request {} approved by {}", request.id, admin.id);

    let tenant_id = store
        .get_user_by_identity(&identity.id)?
        .map(|user| user.tenant_id)
        .ok_or(Error::NotFound)?;

    Ok(ApprovedUpgrade { request, tenant_id })
}

pub fn list_pending(store: &dyn Store) -> Result<Vec<UpgradeRequest>> {
    store.list_pending_upgrade_requests()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::testing::{admin, identity, test_store};

    #[test]
    fn test_reject_records_reason_then_refuses_again() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let caller = Caller::Demo {
            identity: identity(&store, "demo@x.com"),
        };

        let request = create(&store, &caller, Some("Demo Co")).unwrap();
        let rejected = reject(&store, &request.id, Some("not qualified"), &super_admin).unwrap();
        assert_eq!(rejected.status, UpgradeStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("not qualified"));
        assert_eq!(rejected.rejected_by.as_deref(), Some(super_admin.id.as_str()));
        assert!(rejected.rejected_at.is_some());

        match reject(&store, &request.id, None, &super_admin) {
            Err(Error::InvalidState { status }) => assert_eq!(status, "rejected"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_reason_is_stored_as_null() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let caller = Caller::Demo {
            identity: identity(&store, "demo@x.com"),
        };

        let request = create(&store, &caller, None).unwrap();
        let rejected = reject(&store, &request.id, Some("   "), &super_admin).unwrap();
        assert!(rejected.rejection_reason.is_none());
    }

    #[test]
    fn test_reject_missing_request() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        assert!(matches!(
            reject(&store, "req-1", None, &super_admin),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_create_requires_demo_caller() {
        let (_temp, store) = test_store();
        let member = admin(&store, "member@x.com", false);
        let identity = store.get_identity(&member.identity_id).unwrap().unwrap();

        assert!(matches!(
            create(&store, &Caller::Anonymous, None),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            create(&store, &Caller::Member { identity, user: member }, None),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_one_pending_request_per_email() {
        let (_temp, store) = test_store();
        let caller = Caller::Demo {
            identity: identity(&store, "demo@x.com"),
        };

        create(&store, &caller, None).unwrap();
        assert!(matches!(
            create(&store, &caller, None),
            Err(Error::Conflict(_))
        ));
        assert_eq!(list_pending(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_approve_provisions_tenant() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let demo = identity(&store, "demo@x.com");
        store.set_identity_demo(&demo.id, true).unwrap();
        let caller = Caller::Demo {
            identity: demo.clone(),
        };

        let request = create(&store, &caller, Some("Upgraded Co")).unwrap();
        let approved = approve(&store, &request.id, &super_admin).unwrap();
        assert_eq!(approved.request.status, UpgradeStatus::Approved);

        let user = store.get_user_by_identity(&demo.id).unwrap().unwrap();
        assert_eq!(user.tenant_id, approved.tenant_id);
        let tenant = store.get_tenant(&approved.tenant_id).unwrap().unwrap();
        assert_eq!(tenant.name, "Upgraded Co");
        assert!(!store.get_identity(&demo.id).unwrap().unwrap().is_demo);

        assert!(matches!(
            approve(&store, &request.id, &super_admin),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(
            reject(&store, &request.id, None, &super_admin),
            Err(Error::InvalidState { status }) if status == "approved"
        ));
    }

    #[test]
    fn test_approve_settled_request_leaves_no_tenant() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let demo = identity(&store, "demo@x.com");
        let caller = Caller::Demo {
            identity: demo.clone(),
        };

        let request = create(&store, &caller, Some("Never Co")).unwrap();
        reject(&store, &request.id, None, &super_admin).unwrap();

        assert!(matches!(
            approve(&store, &request.id, &super_admin),
            Err(Error::InvalidState { status }) if status == "rejected"
        ));
        assert!(store.get_user_by_identity(&demo.id).unwrap().is_none());
        let tenants: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM tenants WHERE name = 'Never Co'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(tenants, 0);
        assert_eq!(
            store.get_upgrade_request(&request.id).unwrap().unwrap().status,
            UpgradeStatus::Rejected
        );
    }

    #[test]
    fn test_approve_for_provisioned_identity_keeps_its_tenant() {
        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let demo = identity(&store, "demo@x.com");
        let caller = Caller::Demo {
            identity: demo.clone(),
        };
        let request = create(&store, &caller, Some("Second Co")).unwrap();

        // Signed up through an invite while the request was pending.
        let existing = match bootstrap::provision(&store, &demo, Some("First Co"), Grant::Direct)
            .unwrap()
        {
            SetupOutcome::Created { tenant, .. } => tenant,
            other => panic!("expected Created, got {other:?}"),
        };

        let approved = approve(&store, &request.id, &super_admin).unwrap();
        assert_eq!(approved.tenant_id, existing.id);
        assert_eq!(approved.request.status, UpgradeStatus::Approved);
    }

    #[test]
    fn test_concurrent_approvals_provision_once() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let (_temp, store) = test_store();
        let super_admin = admin(&store, "root@x.com", true);
        let demo = identity(&store, "demo@x.com");
        let caller = Caller::Demo {
            identity: demo.clone(),
        };
        let request = create(&store, &caller, Some("Raced Co")).unwrap();

        let store = Arc::new(store);
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let admin = super_admin.clone();
                let request_id = request.id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    approve(store.as_ref(), &request_id, &admin)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::InvalidState { status }) if status == "approved")));

        let tenants: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM tenants WHERE name = 'Raced Co'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(tenants, 1);
    }
}
