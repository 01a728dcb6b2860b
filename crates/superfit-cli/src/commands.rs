//! Subcommand implementations.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use superfit_core::auth::{self, route, Claims, LoginFlow, Navigator};
use superfit_core::{Config, SessionClient, SessionContext};
use tracing::warn;

/// Environment variable consulted before prompting for the password
const ENV_PASSWORD: &str = "SUPERFIT_PASSWORD";

/// Prints the page a login or logout lands on.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &reqwest::Url) {
        println!("→ {}", url);
    }
}

fn connect(config: &Config) -> Result<(SessionContext, Arc<SessionClient>)> {
    let session = SessionContext::init(config).context("Failed to open session storage")?;
    let api = SessionClient::from_session(config, &session)?;
    Ok((session, Arc::new(api)))
}

pub async fn login(config: Config, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    let (session, api) = connect(&config)?;
    let flow = LoginFlow::new(api, session.tokens(), config.redirect_delay());

    println!("Authenticating...");
    if let Err(e) = flow.login(&email, &password, &ConsoleNavigator).await {
        let message = e.user_message();
        return Err(anyhow::Error::new(e).context(message));
    }
    if let Some(message) = flow.state().message() {
        println!("{}", message);
    }

    if let Err(e) = Config::remember_email(email.trim()) {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    let (session, api) = connect(config)?;
    let was_authenticated = session.is_authenticated();
    // The server route runs even without a local credential
    auth::logout(api.as_ref(), &session, &ConsoleNavigator).await;
    if was_authenticated {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn whoami(config: &Config) -> Result<()> {
    let session = SessionContext::init(config).context("Failed to open session storage")?;
    match session.claims() {
        None => println!("Not logged in."),
        Some(Err(e)) => return Err(e).context("Stored credential cannot be decoded"),
        Some(Ok(claims)) => print!("{}", describe(&claims)),
    }
    Ok(())
}

fn describe(claims: &Claims) -> String {
    let mut out = String::new();
    out.push_str(&format!("Email:   {}\n", claims.sub.as_deref().unwrap_or("-")));
    out.push_str(&format!("Role:    {}\n", claims.role().unwrap_or("-")));
    out.push_str(&format!("Landing: {}\n", route(claims.role())));
    if let Some(issued) = claims.issued_at() {
        out.push_str(&format!("Issued:  {}\n", issued.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(expires) = claims.expires_at() {
        let note = if claims.is_expired() { " (expired)" } else { "" };
        out.push_str(&format!("Expires: {}{}\n", expires.format("%Y-%m-%d %H:%M UTC"), note));
    }
    out
}

pub async fn request(config: &Config, method: &str, path: &str, data: Option<&str>) -> Result<()> {
    let method = parse_method(method)?;
    let body = data
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    let (_session, api) = connect(config)?;
    let text = api.send(method, path, body.as_ref()).await?;
    println!("{}", pretty(&text));
    Ok(())
}

fn parse_method(method: &str) -> Result<reqwest::Method> {
    reqwest::Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", method))
}

/// Pretty-print JSON bodies, pass anything else through.
fn pretty(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| text.to_string())
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(choose_email(&input, last))
}

fn choose_email(input: &str, last: Option<&str>) -> String {
    let input = input.trim();
    match last {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    }
}
