//! Client registry command handlers.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clientdesk_core::api::ApiClient;
use clientdesk_core::flows::ClientRegistry;
use clientdesk_core::session::SessionStore;
use clientdesk_types::{Client, ClientDraft};
use comfy_table::{ContentArrangement, Table};

const NOT_LOGGED_IN_HINT: &str = "You are not logged in. Run `clientdesk login`.";

/// Field overrides for `clients edit`; unset fields keep the stored value.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FieldChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    company: Option<String>,
}

impl FieldChanges {
    fn apply(self, form: &mut ClientDraft) {
        let Self {
            name,
            email,
            phone,
            company,
        } = self;
        for (slot, value) in [
            (&mut form.name, name),
            (&mut form.email, email),
            (&mut form.phone, phone),
            (&mut form.company, company),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// What the list view shows for the registry's current state.
#[derive(Debug, PartialEq)]
enum ListView<'a> {
    NotLoggedIn,
    Empty,
    Records(&'a [Client]),
}

impl<'a> ListView<'a> {
    fn of(registry: &'a ClientRegistry) -> Self {
        if !registry.is_authenticated() {
            ListView::NotLoggedIn
        } else if registry.clients().is_empty() {
            ListView::Empty
        } else {
            ListView::Records(registry.clients())
        }
    }
}

pub async fn list(api: ApiClient, session: SessionStore, json: bool) -> Result<()> {
    let mut registry = ClientRegistry::new(api, session);
    fetch(&mut registry).await?;
    render(&registry, json)
}

pub async fn create(api: ApiClient, session: SessionStore, draft: ClientDraft) -> Result<()> {
    let mut registry = ClientRegistry::new(api, session);
    registry.create(draft).await?;
    println!("Client saved.");
    println!();
    render(&registry, false)
}

pub async fn edit(
    api: ApiClient,
    session: SessionStore,
    id: &str,
    changes: FieldChanges,
) -> Result<()> {
    let mut registry = ClientRegistry::new(api, session);
    fetch(&mut registry).await?;
    if !registry.is_authenticated() {
        anyhow::bail!(NOT_LOGGED_IN_HINT);
    }

    let Some(record) = registry.find(id).cloned() else {
        tracing::debug!(id, loaded = registry.clients().len(), "edit target not in registry");
        anyhow::bail!("No client with id '{id}'");
    };
    registry.begin_edit(&record);
    changes.apply(registry.form_mut());
    registry.submit().await?;

    println!("Client {id} updated.");
    println!();
    render(&registry, false)
}

pub async fn delete(api: ApiClient, session: SessionStore, id: &str) -> Result<()> {
    let mut registry = ClientRegistry::new(api, session);
    registry.delete(id).await?;
    println!("Client {id} deleted.");
    println!();
    render(&registry, false)
}

async fn fetch(registry: &mut ClientRegistry) -> Result<()> {
    if io::stderr().is_terminal() {
        eprintln!("Loading clients...");
    }
    registry.refresh().await?;
    Ok(())
}

fn render(registry: &ClientRegistry, json: bool) -> Result<()> {
    let view = ListView::of(registry);
    if json && view != ListView::NotLoggedIn {
        let out = serde_json::to_string_pretty(registry.clients()).context("serialize clients")?;
        println!("{out}");
        return Ok(());
    }

    match view {
        ListView::NotLoggedIn => println!("{NOT_LOGGED_IN_HINT}"),
        ListView::Empty => println!("No clients registered."),
        ListView::Records(records) => println!("{}", table(records)),
    }
    Ok(())
}

fn table(records: &[Client]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Name", "Email", "Phone", "Company"]);
    for client in records {
        table.add_row(vec![
            client.id.as_deref().unwrap_or("-"),
            client.name.as_str(),
            client.email.as_str(),
            client.phone.as_str(),
            client.company.as_str(),
        ]);
    }
    table
}
