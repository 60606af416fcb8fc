//! The consuming agent: ties the store, codec, evaluator and activation
//! client together behind the calls an application actually makes.
//!
//! Nothing here panics or aborts on a bad license file. Load and decode
//! failures are logged and read as "no license".

use crate::codec::{self, EncodedLicense};
use crate::config::AgentConfig;
use crate::device::Fingerprint;
use crate::error::{LicenseError, LicenseResult};
use crate::evaluator::{LicenseState, evaluate};
use crate::license::{License, MintParams, Package, RegistrationStatus};
use crate::store::{LicenseStore, SlotEntry};
use crate::wire::ActivationResponse;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tether_crypto::SharedKey;
use tracing::{info, warn};

#[cfg(feature = "online")]
use crate::activation::ActivationClient;

/// License manager for one installation.
#[derive(Debug)]
pub struct LicenseAgent {
    config: AgentConfig,
    key: Arc<SharedKey>,
    fingerprint: Fingerprint,
    store: Arc<LicenseStore>,
    #[cfg(feature = "online")]
    client: ActivationClient,
}

impl LicenseAgent {
    /// Creates an agent for the current machine.
    pub fn new(config: AgentConfig, key: SharedKey) -> LicenseResult<Self> {
        Self::with_fingerprint(config, key, Fingerprint::derive())
    }

    /// Creates an agent with an explicit fingerprint.
    pub fn with_fingerprint(
        config: AgentConfig,
        key: SharedKey,
        fingerprint: Fingerprint,
    ) -> LicenseResult<Self> {
        let path = match &config.license_path {
            Some(p) => p.clone(),
            None => LicenseStore::default_path()?,
        };
        let store = Arc::new(LicenseStore::new(path));
        let key = Arc::new(key);

        #[cfg(feature = "online")]
        let client = ActivationClient::new(&config, Arc::clone(&key), Arc::clone(&store))?;

        Ok(Self {
            config,
            key,
            fingerprint,
            store,
            #[cfg(feature = "online")]
            client,
        })
    }

    /// Returns this machine's fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &LicenseStore {
        &self.store
    }

    /// Loads and decodes the stored license, degrading every failure to `None`.
    #[must_use]
    pub fn load(&self) -> Option<License> {
        match self.store.load() {
            Ok(Some(blob)) => self.decode_stored(&blob),
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read license file: {e}");
                None
            }
        }
    }

    /// Re-reads the store and evaluates it at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> LicenseState {
        evaluate(self.load().as_ref(), &self.fingerprint, now)
    }

    /// Startup check. When the slot is empty, mints and stores a local trial.
    ///
    /// A slot that exists but cannot be used (corrupt, foreign, expired) does
    /// not earn a new trial. The emptiness check and the trial write hold the
    /// store lock together, so a concurrent `renew` is never overwritten.
    pub fn initialize(&self, now: DateTime<Utc>) -> LicenseResult<LicenseState> {
        let mut trial = None;
        let entry = self.store.load_or_insert_with(|| {
            let license = self.mint_trial(now)?;
            let blob = codec::encode(&license, &self.key)?;
            trial = Some(license);
            Ok(blob)
        });

        let license = match entry {
            Ok(SlotEntry::Existing(blob)) => self.decode_stored(&blob),
            Ok(SlotEntry::Inserted(_)) => {
                info!(expires_at = ?trial.as_ref().and_then(|t| t.expires_at), "started trial license");
                trial
            }
            // No trial minted yet: the slot itself could not be read
            Err(LicenseError::Storage(e)) if trial.is_none() => {
                warn!("failed to read license file: {e}");
                return Ok(LicenseState::Absent);
            }
            Err(e) => return Err(e),
        };

        let state = evaluate(license.as_ref(), &self.fingerprint, now);
        info!(%state, "license initialized");
        Ok(state)
    }

    /// Gate for licensed operations.
    ///
    /// # Errors
    ///
    /// Returns `LicenseRequired` carrying the current state unless it is active.
    pub fn require_active(&self, now: DateTime<Utc>) -> LicenseResult<License> {
        let license = self.load();
        match evaluate(license.as_ref(), &self.fingerprint, now) {
            LicenseState::Active { .. } => license.ok_or(LicenseError::LicenseRequired(LicenseState::Absent)),
            state => Err(LicenseError::LicenseRequired(state)),
        }
    }

    /// Installs a base64 license obtained out of band (e.g. offline minting).
    ///
    /// The previous license is kept unless the new one decodes, is bound to
    /// this machine, and matches the package table.
    pub fn import_encoded(&self, text: &str) -> LicenseResult<License> {
        let blob = EncodedLicense::from_base64(text)?;
        let license = codec::decode(&blob, &self.key)?;
        self.check_binding(&license)?;
        license.check_terms(&self.config.packages)?;
        self.store.save(&blob)?;
        info!(package = %license.package, "imported license");
        Ok(license)
    }

    /// Installs a license file: either `{"license": "<base64>"}` or bare base64.
    pub fn import_file(&self, path: &Path) -> LicenseResult<License> {
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<ActivationResponse>(&content) {
            Ok(body) => self.import_encoded(&body.license),
            Err(_) => self.import_encoded(&content),
        }
    }

    /// Requests a fresh license for this machine from the activation service.
    #[cfg(feature = "online")]
    pub async fn renew(&self, package: Package) -> LicenseResult<License> {
        self.client.activate(&self.fingerprint, package).await
    }

    fn mint_trial(&self, now: DateTime<Utc>) -> LicenseResult<License> {
        License::mint(
            &self.config.packages,
            MintParams {
                subject: &self.config.trial_subject,
                entitlement: &self.config.trial_entitlement,
                status: RegistrationStatus::Trial,
                package: Package::Trial,
                fingerprint: &self.fingerprint,
            },
            now,
        )
    }

    fn decode_stored(&self, blob: &EncodedLicense) -> Option<License> {
        let result = codec::decode(blob, &self.key)
            .and_then(|license| license.check_terms(&self.config.packages).map(|()| license));
        match result {
            Ok(license) => Some(license),
            Err(e @ LicenseError::Decryption(_)) => {
                warn!("stored license is corrupt or sealed with another key: {e}");
                None
            }
            Err(e) => {
                warn!("stored license is unreadable by this version: {e}");
                None
            }
        }
    }

    fn check_binding(&self, license: &License) -> LicenseResult<()> {
        if license.machine_fingerprint != self.fingerprint {
            return Err(LicenseError::Binding {
                expected: self.fingerprint.to_string(),
                found: license.machine_fingerprint.to_string(),
            });
        }
        Ok(())
    }
}
