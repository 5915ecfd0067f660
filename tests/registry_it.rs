#![cfg(feature = "reqwest")]

mod support;

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use oidc_federation::{
	config::ConfigSection,
	error::{ConfigError, Error, ErrorKind, RegistryError},
	provider::{IdentityProvider, ProviderKind, split_state},
	registry::DisplayMetadata,
};
use support::*;

fn provider_section(server: &MockServer) -> Value {
	json!({
		"ClientID": CLIENT_ID,
		"ClientSecret": CLIENT_SECRET,
		"RedirectURL": "https://app/cb",
		"SignInScope": "openid email",
		"SignUpScope": "openid email profile",
		"PublicKeyURL": server.url("/jwks"),
		"TokenEndpoint": server.url("/token"),
	})
}

async fn configured(server: &MockServer, provider: &str) -> std::sync::Arc<dyn IdentityProvider> {
	let adapter = adapter(server, ProviderKind::Google);

	adapter.configure(name(provider), config(server)).await.expect("Configuration should succeed.");

	std::sync::Arc::new(adapter)
}

#[tokio::test]
async fn duplicate_add_keeps_the_first_provider() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let registry = registry();
	let first = configured(&server, "Google").await;
	let second = configured(&server, "Google").await;

	registry
		.add(first.clone(), DisplayMetadata::new("Google").with_message("first"))
		.expect("First add should succeed.");

	let err = registry
		.add(second, DisplayMetadata::new("Google").with_message("second"))
		.expect_err("Second add with the same name must fail.");

	assert!(matches!(
		err,
		Error::Registry(RegistryError::DuplicateProvider { ref name }) if name == "Google"
	));
	assert_eq!(registry.len(), 1);

	let entry = registry.entry("Google").expect("First provider should remain registered.");

	assert!(std::sync::Arc::ptr_eq(&entry.provider, &first));
	assert_eq!(entry.metadata.message, "first");
}

#[tokio::test]
async fn remove_requires_a_registered_name() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let registry = registry();
	let provider = configured(&server, "Google").await;

	registry.add(provider.clone(), DisplayMetadata::new("Google")).expect("Add should succeed.");
	registry.remove(provider.as_ref()).expect("Registered provider should be removable.");

	assert!(registry.is_empty());
	assert_eq!(&*registry.metadata(), "{}");

	let err = registry.remove_by_name("Google").expect_err("Second removal must fail.");

	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn rebuild_skips_declined_sections() {
	let server = MockServer::start_async().await;
	let jwks = mock_jwks(&server).await;
	let mut work = provider_section(&server);

	work["Provider"] = json!("Microsoft");
	work["DisplayName"] = json!("Work account");
	work["Icon"] = json!("icons/microsoft.svg");

	let mut disabled = provider_section(&server);

	disabled["Provider"] = json!("Google");
	disabled["Enabled"] = json!(false);

	let root = ConfigSection::root(json!({
		"OAuth": {
			"Google": provider_section(&server),
			"Contoso": work,
			"Legacy": disabled,
			"Apple": provider_section(&server),
			"GitHub": provider_section(&server),
			"Broken": { "Provider": "Google", "ClientID": CLIENT_ID },
			"Note": "not a provider",
		},
		"Logging": "verbose",
	}));
	let registry = registry();

	registry.rebuild(&root).await.expect("Rebuild should skip declined sections.");

	assert_eq!(registry.names(), [name("Contoso"), name("Google")]);
	assert_eq!(jwks.hits_async().await, 2);

	let metadata = serde_json::from_str::<Value>(&registry.metadata())
		.expect("Registry metadata should be JSON.");

	assert_eq!(
		metadata,
		json!({
			"Contoso": {
				"name": "Work account",
				"message": "Sign in with Work account",
				"iconRef": "icons/microsoft.svg",
			},
			"Google": { "name": "Google", "message": "Sign in with Google", "iconRef": "" },
		})
	);

	let contoso = registry.lookup("Contoso").expect("Contoso should be registered.");

	assert!(contoso.is_configured());
	assert!(
		contoso
			.create_authorization_request(false)
			.expect("Authorization request should build.")
			.nonce
			.is_some()
	);
}

#[tokio::test]
async fn failed_rebuild_keeps_the_previous_snapshot() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let down = MockServer::start_async().await;
	let _down = down
		.mock_async(|when, then| {
			when.method(GET).path("/jwks");
			then.status(500);
		})
		.await;
	let registry = registry();

	registry
		.rebuild(&ConfigSection::root(json!({ "OAuth": { "Google": provider_section(&server) } })))
		.await
		.expect("Initial rebuild should succeed.");

	let before = registry.metadata();
	let unreachable = ConfigSection::root(json!({
		"OAuth": { "Microsoft": provider_section(&server), "Google": provider_section(&down) },
	}));
	let err = registry.rebuild(&unreachable).await.expect_err("Unreachable key set must abort.");

	assert!(matches!(err, Error::Config(ConfigError::KeySetUnavailable { .. })));
	assert_eq!(registry.names(), [name("Google")]);
	assert_eq!(registry.metadata(), before);

	let duplicated = ConfigSection::root(json!({
		"OAuth": { "Microsoft": provider_section(&server) },
		"Enterprise": { "Microsoft": provider_section(&server) },
	}));
	let err = registry.rebuild(&duplicated).await.expect_err("Repeated names must abort.");

	assert_eq!(err.kind(), ErrorKind::DuplicateProvider);
	assert_eq!(registry.names(), [name("Google")]);
}

#[tokio::test]
async fn add_from_config_reports_declines_and_duplicates() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let registry = registry();
	let section = ConfigSection::named("Google", provider_section(&server));

	registry.add_from_config(&section).await.expect("Valid section should register.");

	let err = registry.add_from_config(&section).await.expect_err("Same name must be rejected.");

	assert_eq!(err.kind(), ErrorKind::DuplicateProvider);

	let mut disabled = provider_section(&server);

	disabled["Enabled"] = json!(false);

	let err = registry
		.add_from_config(&ConfigSection::named("Microsoft", disabled))
		.await
		.expect_err("Disabled section must be declined.");

	assert!(matches!(err, Error::Registry(RegistryError::Declined { .. })));
	assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn host_surface_routes_by_name_and_state() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let _token = mock_token(&server, &sign(&google_claims(), Some(KID))).await;
	let registry = registry();

	registry
		.add_from_config(&ConfigSection::named("Google", provider_section(&server)))
		.await
		.expect("Valid section should register.");

	let request = registry
		.create_authorization_request("Google", false)
		.expect("Authorization request should build.");
	let (prefix, _) = split_state(&request.state).expect("Issued state should split.");
	let provider = registry.route_callback(&request.state).expect("Issued state should route.");

	assert_eq!(prefix, "Google");
	assert_eq!(provider.name().as_str(), "Google");

	let record = registry
		.exchange_code_for_identity(prefix, "code")
		.await
		.expect("Exchange through the registry should succeed.");

	assert_eq!(record.main_identifier, "ada@example.com");
	assert!(matches!(
		registry.create_authorization_request("Contoso", false),
		Err(Error::Registry(RegistryError::NotFound { ref name })) if name == "Contoso"
	));

	let err = registry
		.exchange_code_for_identity("Contoso", "code")
		.await
		.expect_err("Unknown provider must fail.");

	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn rejected_code_does_not_change_the_registry() {
	let server = MockServer::start_async().await;
	let _jwks = mock_jwks(&server).await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant"}"#);
		})
		.await;
	let registry = registry();

	registry
		.add_from_config(&ConfigSection::named("Google", provider_section(&server)))
		.await
		.expect("Valid section should register.");

	let before = registry.metadata();
	let err = registry
		.exchange_code_for_identity("Google", "stale-code")
		.await
		.expect_err("Rejected code must fail.");

	assert!(matches!(err, Error::TokenExchangeFailed { status: Some(400), .. }));
	assert_eq!(registry.metadata(), before);
	assert!(registry.lookup("Google").expect("Provider should stay registered.").is_configured());
}

#[tokio::test]
async fn registry_refreshes_keys_of_a_registered_provider() {
	let server = MockServer::start_async().await;
	let jwks = mock_jwks(&server).await;
	let registry = registry();

	registry
		.add_from_config(&ConfigSection::named("Google", provider_section(&server)))
		.await
		.expect("Valid section should register.");

	let before = registry.metadata();

	registry.refresh_keys("Google").await.expect("Refresh through the registry should succeed.");

	assert_eq!(jwks.hits_async().await, 2);
	assert!(std::sync::Arc::ptr_eq(&before, &registry.metadata()));
	assert_eq!(registry.refresh_keys("Contoso").await.map_err(|e| e.kind()), Err(ErrorKind::NotFound));
}
