//! `PartsFinder`: the single entry point over search, resolution and
//! session state.

use std::sync::Arc;

use tracing::warn;

use crate::catalog::{PartsCatalog, VehicleKey};
use crate::config::FinderConfig;
use crate::error::{LookupError, NotFound};
use crate::resolver::{PurchaseLink, Resolver, TypeChoice};
use crate::search::{SearchEngine, SearchOutcome};
use crate::selection::{BladeSelection, Fitment, LinkMode, SessionPayload};
use crate::synonyms::SynonymTable;
use crate::token_store::{SessionToken, SessionTokenStore, TokenStoreStats};

pub struct PartsFinder {
    catalog: Arc<dyn PartsCatalog>,
    engine: SearchEngine,
    resolver: Resolver,
    tokens: SessionTokenStore,
    config: FinderConfig,
}

impl PartsFinder {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn PartsCatalog>,
        synonyms: Arc<SynonymTable>,
        config: FinderConfig,
    ) -> Self {
        let tokens = SessionTokenStore::new(config.sessions.token_capacity);
        Self::with_tokens(catalog, synonyms, config, tokens)
    }

    /// Use a caller-built token store (e.g. a fixed seed).
    #[must_use]
    pub fn with_tokens(
        catalog: Arc<dyn PartsCatalog>,
        synonyms: Arc<SynonymTable>,
        config: FinderConfig,
        tokens: SessionTokenStore,
    ) -> Self {
        Self {
            engine: SearchEngine::new(Arc::clone(&catalog), synonyms, config.search.clone()),
            resolver: Resolver::new(Arc::clone(&catalog)),
            catalog,
            tokens,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn PartsCatalog {
        self.catalog.as_ref()
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub fn search(&self, query: &str) -> SearchOutcome {
        self.engine.search(query)
    }

    #[must_use]
    pub fn search_brand(&self, brand: &str) -> SearchOutcome {
        self.engine.search_brand(brand)
    }

    /// Fitment and compatible frames for a vehicle.
    pub fn resolve_frames(&self, vehicle: &VehicleKey) -> Result<(Fitment, Vec<String>), LookupError> {
        let fitment = self.current_fitment(vehicle)?;
        let frames = self.resolver.resolve_frames(&fitment)?;
        Ok((fitment, frames))
    }

    pub fn resolve_types(&self, frame: &str, fitment: &Fitment) -> Result<TypeChoice, LookupError> {
        self.resolver.types_for(frame, &fitment.mount, fitment.sizes)
    }

    pub fn resolve_links(
        &self,
        blade: &BladeSelection,
        mode: LinkMode,
    ) -> Result<Vec<PurchaseLink>, LookupError> {
        self.resolver.links(blade, mode)
    }

    /// Fresh fitment from the catalog; a vanished vehicle is `NotFound`.
    pub fn current_fitment(&self, vehicle: &VehicleKey) -> Result<Fitment, LookupError> {
        self.resolver.fitment(vehicle).inspect_err(|_| {
            warn!(vehicle = %vehicle, "Selection refers to a vehicle no longer in the catalog");
        })
    }

    pub fn put_state(&self, payload: impl Into<SessionPayload>) -> SessionToken {
        self.tokens.put(payload)
    }

    /// Payload behind a token; unknown and evicted tokens are both
    /// `NotFound::Token`.
    pub fn get_state(&self, token: &str) -> Result<Arc<SessionPayload>, LookupError> {
        self.tokens.get(token).ok_or_else(|| {
            warn!(token, "Session token expired");
            NotFound::Token(token.to_string()).into()
        })
    }

    #[must_use]
    pub fn token_stats(&self) -> TokenStoreStats {
        self.tokens.stats()
    }
}
