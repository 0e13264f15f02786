//! Command implementations. Each writes its human-readable output to `out`.

use std::io::{self, Write};
use std::path::PathBuf;

use clawapi_core::{
    ArchiveError, Config, ConfigError, ProviderDescriptor, ProviderRegistry, SessionError,
    SessionStore, export_session, import_session,
};
use serde_json::{Value, json};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Provider '{0}' does not exist in the ClawAPI registry. Run: clawapi available")]
    UnknownProvider(String),

    #[error("Imported session for '{provider}' is not usable: {source}")]
    InvalidSession {
        provider: String,
        #[source]
        source: SessionError,
    },

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Gateway not reachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything a command needs: configuration, registry, and session store.
pub struct Context {
    pub config: Config,
    pub registry: ProviderRegistry,
    pub store: SessionStore,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let store = SessionStore::new(config.paths.sessions_dir());
        Self {
            config,
            registry: ProviderRegistry::builtin(),
            store,
        }
    }

    fn descriptor(&self, provider: &str) -> Result<&ProviderDescriptor, CliError> {
        self.registry
            .get(provider)
            .ok_or_else(|| CliError::UnknownProvider(provider.to_string()))
    }

    /// Base URL of the local gateway. Wildcard binds are reached via loopback.
    fn gateway_url(&self) -> Result<String, CliError> {
        let host = match self.config.settings.gateway.host.as_str() {
            "0.0.0.0" | "::" => "127.0.0.1",
            host => host,
        };
        Ok(format!("http://{}:{}", host, self.config.port()?))
    }

    fn session_label(&self, descriptor: &ProviderDescriptor) -> String {
        match self.store.inspect(descriptor) {
            Ok(_) => "session ok".to_string(),
            Err(SessionError::Missing { .. }) => "no session".to_string(),
            Err(e) => format!("invalid session ({e})"),
        }
    }
}

pub fn available(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    writeln!(out, "Available providers:")?;
    for descriptor in ctx.registry.iter() {
        let marker = if ctx.config.paths.is_installed(&descriptor.name) {
            "installed"
        } else {
            "-"
        };
        writeln!(
            out,
            "  {:<10} {:<10} {:<10} {:<10} {}",
            descriptor.name, descriptor.display_name, descriptor.vendor, marker, descriptor.notes
        )?;
    }
    Ok(())
}

pub fn list(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let installed: Vec<&ProviderDescriptor> = ctx
        .registry
        .iter()
        .filter(|d| ctx.config.paths.is_installed(&d.name))
        .collect();

    if installed.is_empty() {
        writeln!(out, "No providers installed. Run: clawapi add <provider>")?;
        return Ok(());
    }
    writeln!(out, "Installed providers:")?;
    for descriptor in installed {
        writeln!(
            out,
            "  {:<10} {}",
            descriptor.name,
            ctx.session_label(descriptor)
        )?;
    }
    Ok(())
}

pub fn add(ctx: &Context, provider: &str, out: &mut impl Write) -> Result<(), CliError> {
    let descriptor = ctx.descriptor(provider)?;
    ctx.config.paths.set_installed(provider)?;
    info!("Installed provider '{}'", provider);

    writeln!(out, "{} installed.", descriptor.display_name)?;
    if !ctx.store.validate(descriptor) {
        writeln!(
            out,
            "No usable session yet. Log in at {} and import it with: clawapi import {} <FILE>",
            descriptor.login_url, provider
        )?;
    }
    writeln!(out, "Restart the gateway to activate it.")?;
    Ok(())
}

pub fn remove(
    ctx: &Context,
    provider: &str,
    purge: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    ctx.descriptor(provider)?;
    if ctx.config.paths.set_uninstalled(provider)? {
        writeln!(out, "{provider} uninstalled.")?;
    } else {
        writeln!(out, "{provider} was not installed.")?;
    }
    if purge && ctx.store.reset(provider)? {
        writeln!(out, "Saved session deleted.")?;
    }
    Ok(())
}

pub fn reset(ctx: &Context, provider: &str, out: &mut impl Write) -> Result<(), CliError> {
    ctx.descriptor(provider)?;
    if ctx.store.reset(provider)? {
        writeln!(out, "Session for {provider} deleted.")?;
    } else {
        writeln!(out, "{provider} has no saved session.")?;
    }
    Ok(())
}

pub fn export(
    ctx: &Context,
    provider: &str,
    output: Option<PathBuf>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    ctx.descriptor(provider)?;
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{provider}_session.zip")));
    let count = export_session(&ctx.store, provider, &path)?;
    writeln!(out, "Exported {count} file(s) to {}", path.display())?;
    Ok(())
}

/// Import an archive, then install the provider if the session qualifies.
pub fn import(
    ctx: &Context,
    provider: &str,
    archive: &std::path::Path,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let descriptor = ctx.descriptor(provider)?;
    import_session(&ctx.store, provider, archive)?;

    ctx.store
        .inspect(descriptor)
        .map_err(|source| CliError::InvalidSession {
            provider: provider.to_string(),
            source,
        })?;
    ctx.config.paths.set_installed(provider)?;

    writeln!(
        out,
        "Session for {} imported and installed. Restart the gateway to activate it.",
        descriptor.display_name
    )?;
    Ok(())
}

pub async fn status(ctx: &Context, out: &mut impl Write) -> Result<(), CliError> {
    let url = format!("{}/health", ctx.gateway_url()?);
    debug!("Checking {}", url);

    let health: Value = match reqwest::get(&url).await {
        Ok(response) => response
            .json()
            .await
            .map_err(|e| CliError::Gateway(e.to_string()))?,
        Err(source) => return Err(CliError::Unreachable { url, source }),
    };

    let active: Vec<&str> = health["active_providers"]
        .as_array()
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    writeln!(out, "Gateway running at {}", ctx.gateway_url()?)?;
    if active.is_empty() {
        writeln!(out, "No active providers.")?;
    } else {
        writeln!(out, "Active providers: {}", active.join(", "))?;
    }
    Ok(())
}

pub async fn test(
    ctx: &Context,
    model: &str,
    prompt: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let url = format!("{}/v1/chat/completions", ctx.gateway_url()?);
    writeln!(out, "Sending test prompt to {model}...")?;

    let response = reqwest::Client::new()
        .post(&url)
        .json(&json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
        }))
        .send()
        .await
        .map_err(|source| CliError::Unreachable {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| CliError::Gateway(e.to_string()))?;

    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        return Err(CliError::Gateway(format!("HTTP {}: {}", status.as_u16(), message)));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default();
    writeln!(out, "{content}")?;
    Ok(())
}
