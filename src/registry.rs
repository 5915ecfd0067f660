//! Named provider registry with copy-on-write snapshots.
//!
//! Readers clone the current [`Arc`] snapshot and release the lock immediately, so lookups and
//! [`ProviderRegistry::metadata`] never observe a half-applied mutation. Writers assemble a
//! complete replacement map, serialize its metadata once, and swap it in.

pub mod factory;

pub use factory::*;

// crates.io
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	config::ConfigSection,
	error::RegistryError,
	identity::{IdentityRecord, ProviderName},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{AuthorizationRequest, IdentityProvider, split_state},
};

/// Display metadata published to provider pickers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetadata {
	/// Label shown to end users.
	pub name: String,
	/// Call-to-action text, e.g. `Sign in with Google`.
	pub message: String,
	/// Host-defined icon reference; empty when unset.
	pub icon_ref: String,
}
impl DisplayMetadata {
	/// Creates metadata with the default `Sign in with <name>` message and no icon.
	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();

		Self { message: format!("Sign in with {name}"), name, icon_ref: String::new() }
	}

	/// Replaces the call-to-action text.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();

		self
	}

	/// Sets the icon reference.
	pub fn with_icon_ref(mut self, icon_ref: impl Into<String>) -> Self {
		self.icon_ref = icon_ref.into();

		self
	}

	fn to_json(&self) -> Value {
		serde_json::json!({
			"name": self.name,
			"message": self.message,
			"iconRef": self.icon_ref,
		})
	}
}

/// Registered adapter together with its display metadata.
#[derive(Clone)]
pub struct ProviderEntry {
	/// Configured adapter.
	pub provider: Arc<dyn IdentityProvider>,
	/// Metadata published through [`ProviderRegistry::metadata`].
	pub metadata: DisplayMetadata,
}
impl ProviderEntry {
	/// Pairs an adapter with its metadata.
	pub fn new(provider: Arc<dyn IdentityProvider>, metadata: DisplayMetadata) -> Self {
		Self { provider, metadata }
	}
}
impl Debug for ProviderEntry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderEntry")
			.field("provider", &self.provider.name())
			.field("metadata", &self.metadata)
			.finish()
	}
}

/// Registry of named identity providers shared by every authentication attempt in a process.
pub struct ProviderRegistry {
	factory: Arc<dyn ProviderFactory>,
	snapshot: RwLock<Arc<RegistrySnapshot>>,
	rebuild_guard: AsyncMutex<()>,
}
impl ProviderRegistry {
	/// Creates an empty registry that builds adapters through `factory`.
	pub fn new(factory: impl ProviderFactory + 'static) -> Self {
		Self::with_factory(Arc::new(factory))
	}

	/// Creates an empty registry around a shared factory.
	pub fn with_factory(factory: Arc<dyn ProviderFactory>) -> Self {
		Self {
			factory,
			snapshot: RwLock::new(Arc::new(RegistrySnapshot::new(BTreeMap::new()))),
			rebuild_guard: AsyncMutex::new(()),
		}
	}

	/// Returns the adapter registered under `name`.
	pub fn lookup(&self, name: &str) -> Option<Arc<dyn IdentityProvider>> {
		self.current().entries.get(name).map(|entry| entry.provider.clone())
	}

	/// Returns the adapter and metadata registered under `name`.
	pub fn entry(&self, name: &str) -> Option<ProviderEntry> {
		self.current().entries.get(name).cloned()
	}

	/// Registered provider names in sorted order.
	pub fn names(&self) -> Vec<ProviderName> {
		self.current().entries.keys().cloned().collect()
	}

	/// Number of registered providers.
	pub fn len(&self) -> usize {
		self.current().entries.len()
	}

	/// Returns true when no provider is registered.
	pub fn is_empty(&self) -> bool {
		self.current().entries.is_empty()
	}

	/// Serialized `{ "<name>": { "name", "message", "iconRef" } }` document, keys sorted.
	///
	/// The document is produced when the registry changes, so reads only clone an [`Arc`].
	pub fn metadata(&self) -> Arc<str> {
		self.current().metadata.clone()
	}

	/// Registers `provider` under its current name.
	///
	/// Fails with [`RegistryError::DuplicateProvider`] and leaves the existing adapter in place
	/// when the name is taken.
	pub fn add(&self, provider: Arc<dyn IdentityProvider>, metadata: DisplayMetadata) -> Result<()> {
		self.insert(ProviderEntry::new(provider, metadata))
	}

	/// Builds an adapter from `section` through the factory and registers it.
	pub async fn add_from_config(&self, section: &ConfigSection) -> Result<()> {
		match self.factory.build(section).await? {
			BuildOutcome::Built(entry) => self.insert(entry),
			BuildOutcome::Declined { reason } => Err(RegistryError::Declined { reason }.into()),
		}
	}

	/// Unregisters the adapter with the same name as `provider`.
	pub fn remove(&self, provider: &dyn IdentityProvider) -> Result<()> {
		self.remove_by_name(provider.name().as_str())
	}

	/// Unregisters the adapter registered under `name`.
	pub fn remove_by_name(&self, name: &str) -> Result<()> {
		let mut guard = self.snapshot.write();

		if !guard.entries.contains_key(name) {
			return Err(RegistryError::NotFound { name: name.to_owned() }.into());
		}

		let mut entries = guard.entries.clone();

		entries.remove(name);

		*guard = Arc::new(RegistrySnapshot::new(entries));

		Ok(())
	}

	/// Replaces the whole registry with the providers described under `root`.
	///
	/// `root` holds categories (e.g. `OAuth`), each holding one object per provider instance.
	/// Sections the factory declines are logged and skipped. A factory error or a repeated
	/// name aborts the rebuild and keeps the previous providers. Concurrent rebuilds run one at
	/// a time.
	pub async fn rebuild(&self, root: &ConfigSection) -> Result<()> {
		let _guard = self.rebuild_guard.lock().await;

		obs::observe_flow(FlowSpan::new(FlowKind::RegistryRebuild, "rebuild"), async {
			let mut entries = BTreeMap::new();

			for category in root.children().into_iter().filter(ConfigSection::is_object) {
				for leaf in category.children().into_iter().filter(ConfigSection::is_object) {
					let entry = match self.factory.build(&leaf).await? {
						BuildOutcome::Built(entry) => entry,
						BuildOutcome::Declined { reason } => {
							obs::warn_skipped_section(leaf.path(), &reason);
							obs::record_flow_outcome(FlowKind::RegistryRebuild, FlowOutcome::Skipped);

							continue;
						},
					};
					let name = entry.provider.name();

					if entries.contains_key(&name) {
						return Err(RegistryError::DuplicateProvider { name: name.to_string() }.into());
					}

					entries.insert(name, entry);
				}
			}

			*self.snapshot.write() = Arc::new(RegistrySnapshot::new(entries));

			Ok::<_, Error>(())
		})
		.await
	}

	/// Builds the sign-in or sign-up redirect for the provider registered under `name`.
	pub fn create_authorization_request(
		&self,
		name: &str,
		signup: bool,
	) -> Result<AuthorizationRequest> {
		self.require(name)?.create_authorization_request(signup)
	}

	/// Exchanges `code` with the provider registered under `name`.
	pub async fn exchange_code_for_identity(&self, name: &str, code: &str) -> Result<IdentityRecord> {
		let provider = self.require(name)?;

		provider.exchange_code_for_identity(code).await
	}

	/// Same as [`exchange_code_for_identity`](Self::exchange_code_for_identity), abandoning the
	/// request once `cancel` fires.
	pub async fn exchange_code_for_identity_with_cancel(
		&self,
		name: &str,
		code: &str,
		cancel: &CancellationToken,
	) -> Result<IdentityRecord> {
		let provider = self.require(name)?;

		provider.exchange_code_for_identity_with_cancel(code, cancel).await
	}

	/// Re-downloads the key set of the provider registered under `name`.
	///
	/// Rotation does not change the registry snapshot, so metadata and lookups are unaffected.
	pub async fn refresh_keys(&self, name: &str) -> Result<()> {
		let provider = self.require(name)?;

		provider.refresh_keys().await
	}

	/// Resolves the provider that issued an authorization `state`.
	///
	/// The host still has to compare `state` with the value it stored for the session.
	pub fn route_callback(&self, state: &str) -> Result<Arc<dyn IdentityProvider>> {
		let (name, _) = split_state(state)
			.ok_or_else(|| RegistryError::NotFound { name: state.to_owned() })?;

		self.require(name)
	}

	fn insert(&self, entry: ProviderEntry) -> Result<()> {
		let name = entry.provider.name();
		let mut guard = self.snapshot.write();

		if guard.entries.contains_key(&name) {
			return Err(RegistryError::DuplicateProvider { name: name.to_string() }.into());
		}

		let mut entries = guard.entries.clone();

		entries.insert(name, entry);

		*guard = Arc::new(RegistrySnapshot::new(entries));

		Ok(())
	}

	fn require(&self, name: &str) -> Result<Arc<dyn IdentityProvider>> {
		self.lookup(name).ok_or_else(|| RegistryError::NotFound { name: name.to_owned() }.into())
	}

	fn current(&self) -> Arc<RegistrySnapshot> {
		self.snapshot.read().clone()
	}
}
#[cfg(feature = "reqwest")]
impl ProviderRegistry {
	/// Creates an empty registry backed by [`DefaultProviderFactory`] and the reqwest transport.
	pub fn with_default_factory() -> Result<Self> {
		Ok(Self::new(ReqwestProviderFactory::new()?))
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistry").field("providers", &self.names()).finish()
	}
}

struct RegistrySnapshot {
	entries: BTreeMap<ProviderName, ProviderEntry>,
	metadata: Arc<str>,
}
impl RegistrySnapshot {
	fn new(entries: BTreeMap<ProviderName, ProviderEntry>) -> Self {
		let document = entries
			.iter()
			.map(|(name, entry)| (name.to_string(), entry.metadata.to_json()))
			.collect::<Map<_, _>>();
		let metadata = Value::Object(document).to_string().into();

		Self { entries, metadata }
	}
}
