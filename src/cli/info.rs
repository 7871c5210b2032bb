use serde::Serialize;

use crate::store::Store;
use crate::types::InviteKind;

use super::init_store;

#[derive(Serialize)]
struct ServerInfo {
    demo_tenant: Option<String>,
    pending_invites: usize,
    pending_access_requests: usize,
    pending_upgrade_requests: usize,
}

#[derive(Serialize)]
struct PendingOutput {
    id: String,
    email: String,
    kind: &'static str,
    created_at: String,
}

#[derive(Serialize)]
struct DetailedServerInfo {
    #[serde(flatten)]
    summary: ServerInfo,
    pending: Vec<PendingOutput>,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let demo_tenant = store.get_demo_tenant()?.map(|t| t.name);
    let invites = store.list_pending_invites(None)?;
    let upgrades = store.list_pending_upgrade_requests()?;

    let access_requests = invites
        .iter()
        .filter(|i| matches!(i.kind, InviteKind::AccessRequest { .. }))
        .count();

    let summary = ServerInfo {
        demo_tenant,
        pending_invites: invites.len() - access_requests,
        pending_access_requests: access_requests,
        pending_upgrade_requests: upgrades.len(),
    };

    let mut pending: Vec<PendingOutput> = invites
        .into_iter()
        .map(|i| PendingOutput {
            kind: i.kind.as_str(),
            created_at: i.created_at.to_rfc3339(),
            id: i.id,
            email: i.email,
        })
        .collect();
    pending.extend(upgrades.into_iter().map(|r| PendingOutput {
        kind: "upgrade_request",
        created_at: r.created_at.to_rfc3339(),
        id: r.id,
        email: r.email,
    }));

    if json {
        let info = DetailedServerInfo { summary, pending };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!(
        "Demo tenant:              {}",
        summary.demo_tenant.as_deref().unwrap_or("(missing)")
    );
    println!("Pending invites:          {}", summary.pending_invites);
    println!("Pending access requests:  {}", summary.pending_access_requests);
    println!("Pending upgrade requests: {}", summary.pending_upgrade_requests);

    if !pending.is_empty() {
        println!();
        for item in &pending {
            println!("{:<16} {:<36} {}", item.kind, item.id, item.email);
        }
    }

    Ok(())
}
