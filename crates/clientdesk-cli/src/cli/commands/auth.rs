//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use clientdesk_core::api::ApiClient;
use clientdesk_core::flows::{AuthFlow, AuthState, Navigation};
use clientdesk_core::session::SessionStore;
use clientdesk_types::{Credentials, RegistrationRequest};

use super::clients;

pub async fn login(
    api: ApiClient,
    session: SessionStore,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let creds = Credentials::new(email, password);

    let mut flow = AuthFlow::new(api.clone(), session.clone());
    flow.login(&creds).await?;

    if let AuthState::Success(Navigation::Clients) = flow.take_outcome() {
        println!("Logged in as {}", creds.email);
        println!();
        // The session is already saved; a failed listing does not undo the login.
        if let Err(e) = clients::list(api, session, false).await {
            tracing::warn!(error = %e, "login succeeded but listing clients failed");
            eprintln!("{e:#}");
        }
    }
    Ok(())
}

pub async fn register(
    api: ApiClient,
    session: SessionStore,
    name: String,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let req = RegistrationRequest::new(name, email, password);

    let mut flow = AuthFlow::new(api, session);
    flow.register(&req).await?;

    if let AuthState::Success(Navigation::Login) = flow.take_outcome() {
        println!("Registered {}", req.email);
        println!("Run `clientdesk login --email {}` to log in.", req.email);
    }
    Ok(())
}

pub fn logout(session: &SessionStore) -> Result<()> {
    if !session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    session.clear_session().context("clear session")?;
    println!("Logged out.");
    Ok(())
}

pub fn whoami(session: &SessionStore) {
    let Some(current) = session.load() else {
        println!("Not logged in.");
        return;
    };

    match &current.user {
        Some(user) => {
            println!("Logged in as {}", user.display_name());
            if let Some(email) = &user.email {
                println!("  email: {email}");
            }
            if let Some(id) = &user.id {
                println!("  id:    {}", id.as_str().map_or_else(|| id.to_string(), str::to_string));
            }
        }
        None => println!("Logged in"),
    }
    println!("  token: {}", current.redacted_token());
}

/// Uses the flag value, or reads one line from stdin.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        print!("Password: ");
        io::stdout().flush()?;
    }

    let mut input = String::new();
    stdin
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
