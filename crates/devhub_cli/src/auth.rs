use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result};
use auth_client::masking::mask_token;
use auth_client::{Session, SessionManager};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Password};
use devhub_core::Config;

async fn manager(config: &Config) -> Result<SessionManager> {
    SessionManager::from_config(config)
        .await
        .with_context(|| {
            format!(
                "Failed to open token store {}",
                config.token_store_path().display()
            )
        })
}

/// Reads without echo on a terminal; piped input is taken from the first line.
fn prompt_password() -> Result<String> {
    if io::stdin().is_terminal() {
        return Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Password")
            .interact()
            .context("Failed to read password");
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_session(session: &Session) {
    let user = &session.user;
    println!("{} {}", "Signed in as".green(), user.username.bold());
    if !user.email.is_empty() {
        println!("  email:       {}", user.email);
    }
    if !user.roles.is_empty() {
        let roles: Vec<&str> = user.roles.iter().map(String::as_str).collect();
        println!("  roles:       {}", roles.join(", "));
    }
    if let Some(at) = session.login_time {
        println!("  since:       {}", at.to_rfc3339());
    }
    println!("  access:      {}", mask_token(&session.tokens.access_token).dimmed());
}

pub async fn login(
    config: &Config,
    username: &str,
    password: Option<String>,
    remember_me: bool,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let session = manager(config)
        .await?
        .login(username, &password, remember_me)
        .await
        .context("Login failed")?;
    print_session(&session);
    Ok(())
}

pub async fn register(
    config: &Config,
    username: &str,
    email: &str,
    password: Option<String>,
    confirm_password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let confirm_password = confirm_password.unwrap_or_else(|| password.clone());

    let user = manager(config)
        .await?
        .register(username, email, &password, &confirm_password)
        .await
        .context("Registration failed")?;
    println!(
        "{} {} ({}). Sign in with `devhub login {}`.",
        "Registered".green(),
        user.username.bold(),
        user.email,
        user.username
    );
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    manager(config).await?.logout().await;
    println!("{}", "Signed out".yellow());
    Ok(())
}

pub async fn whoami(config: &Config) -> Result<()> {
    let manager = manager(config).await?;
    match manager.check_status().await {
        Ok(session) => print_session(&session),
        Err(err) => {
            tracing::debug!("Status check failed: {err}");
            println!("{}", "Not signed in".yellow());
        }
    }
    Ok(())
}

pub async fn refresh(config: &Config) -> Result<()> {
    let tokens = manager(config)
        .await?
        .refresh()
        .await
        .context("Token refresh failed; sign in again")?;
    println!(
        "{} {}",
        "Token refreshed:".green(),
        mask_token(&tokens.access_token)
    );
    Ok(())
}

pub async fn permissions(config: &Config) -> Result<()> {
    let manager = manager(config).await?;
    let permissions = manager
        .fetch_permissions()
        .await
        .context("Failed to fetch permissions")?;
    let roles = manager.fetch_roles().await.context("Failed to fetch roles")?;

    println!("{}", "Roles".bold());
    for role in &roles {
        println!("  {role}");
    }
    println!("{}", "Permissions".bold());
    for permission in &permissions {
        println!("  {permission}");
    }
    Ok(())
}
