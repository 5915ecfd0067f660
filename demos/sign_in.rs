//! Bootstraps a registry from a configuration file, prints the provider picker metadata and a
//! sign-in redirect, then finishes the exchange when a callback `state` + `code` are supplied.
//!
//! ```text
//! OIDC_CONFIG=config.json cargo run --example sign_in
//! OIDC_CONFIG=config.json OIDC_STATE='Google:…' OIDC_CODE='4/0A…' cargo run --example sign_in
//! ```

// std
use std::{env, fs};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use oidc_federation::{config::ConfigSection, provider::split_state, registry::ProviderRegistry};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = env::var("OIDC_CONFIG").unwrap_or_else(|_| "config.json".into());
	let root = ConfigSection::from_json_str(&fs::read_to_string(&path)?)?;
	let registry = ProviderRegistry::with_default_factory()?;

	registry.rebuild(&root).await?;

	println!("Provider picker metadata: {}.", registry.metadata());

	let Some(first) = registry.names().into_iter().next() else {
		return Err(eyre!("`{path}` does not configure any usable provider."));
	};
	let request = registry.create_authorization_request(&first, false)?;

	println!("Send your user to {}.", request.url);
	println!("Store state `{}` in the user's session.", request.state);

	let (Ok(state), Ok(code)) = (env::var("OIDC_STATE"), env::var("OIDC_CODE")) else {
		println!("Set OIDC_STATE and OIDC_CODE from the callback to finish signing in.");

		return Ok(());
	};
	let (provider, _) =
		split_state(&state).ok_or_else(|| eyre!("State `{state}` was not issued by this crate."))?;
	let identity = registry.exchange_code_for_identity(provider, &code).await?;

	println!("Signed in as {} via {provider}.", identity.main_identifier);
	println!("{}", serde_json::to_string_pretty(&identity)?);

	Ok(())
}
