use std::fs;
use std::path::PathBuf;

use anyhow::bail;
use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::init_store;
use crate::config;
use crate::store::{SqliteStore, Store};
use crate::types::Identity;
use crate::workflow::{SetupOutcome, bootstrap, invites, normalize_email};

pub fn run_init(
    data_dir: String,
    non_interactive: bool,
    superadmin_email: Option<String>,
    company: Option<String>,
) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let config = config::load(&data_path)?;
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    println!("Database ready at {}", config.db_path().display());

    let email = match superadmin_email {
        Some(email) => Some(email),
        None if !non_interactive => prompt_superadmin_email()?,
        None => None,
    };

    if let Some(email) = email {
        create_super_admin(&store, &email, company.as_deref())?;
    }

    Ok(())
}

fn prompt_superadmin_email() -> anyhow::Result<Option<String>> {
    let create = inquire::Confirm::new("Would you like to create a super-admin?")
        .with_default(true)
        .prompt()?;

    if !create {
        return Ok(None);
    }

    let email = inquire::Text::new("Super-admin email:")
        .with_validator(|input: &str| {
            if normalize_email(input).is_ok() {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    "Enter a valid email address".into(),
                ))
            }
        })
        .prompt()?;

    Ok(Some(email))
}

fn create_super_admin(store: &SqliteStore, email: &str, company: Option<&str>) -> anyhow::Result<()> {
    let email = normalize_email(email)?;

    let identity = match store.get_identity_by_email(&email)? {
        Some(identity) => identity,
        None => {
            let identity = Identity {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                is_demo: false,
                created_at: Utc::now(),
            };
            store.create_identity(&identity)?;
            identity
        }
    };

    match bootstrap::provision_super_admin(store, &identity, company)? {
        SetupOutcome::Created { tenant, .. } => {
            println!();
            println!("========================================");
            println!("Super-admin {email} provisioned in tenant '{}'.", tenant.name);
            println!("Sign in with a one-time code at /login.");
            println!("========================================");
            println!();
            Ok(())
        }
        _ => bail!("{email} already has an account"),
    }
}

#[derive(Serialize)]
struct SeededInvite {
    email: String,
    code: String,
    expires_at: String,
}

pub fn run_seed_invites(
    data_dir: String,
    emails: Vec<String>,
    company: Option<String>,
    ttl_hours: i64,
    json: bool,
) -> anyhow::Result<()> {
    if ttl_hours <= 0 {
        bail!("--ttl-hours must be positive");
    }

    let store = init_store(&data_dir)?;
    let ttl = Duration::hours(ttl_hours);

    let mut seeded = Vec::with_capacity(emails.len());
    for email in &emails {
        let invite = invites::seed(&store, email, company.as_deref(), ttl)?;
        seeded.push(SeededInvite {
            code: invite.code().unwrap_or_default().to_string(),
            expires_at: invite
                .expires_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            email: invite.email,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&seeded)?);
    } else {
        for invite in &seeded {
            println!("{}  {}  (expires {})", invite.code, invite.email, invite.expires_at);
        }
    }

    Ok(())
}
