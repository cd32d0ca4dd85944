//! Reconciliation engine
//!
//! Compares a desired [`InterfaceSpec`] with what is live on the host and on
//! disk, decides one [`Action`], and carries it out against the collaborator
//! traits. The decision is a pure function ([`plan`]) shared by dry runs and
//! real runs, so a dry run always reports what the real run would do.
//!
//! Ordering guarantees:
//! - an existing file is backed up before anything is mutated;
//! - the file is written only after the tunnel accepted the configuration;
//! - on delete the file is removed only after the interface is gone.

mod outcome;
mod probe;

pub use outcome::{Action, JsonReporter, Outcome, OutcomeReporter};
pub use probe::{RuntimeState, StateProber};

use crate::config::Settings;
use crate::error::{ConvergeError, Result};
use crate::platform::TunnelControl;
use crate::spec::InterfaceSpec;
use crate::storage::FileStore;
use crate::wireguard::render::{comparison_form, extract_private_key};
use crate::wireguard::{render, KeyGenerator, KeyPair, PrivateKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Target state requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Interface configured and up
    #[default]
    Present,
    /// Interface and its file gone
    Absent,
}

/// Validated input for one reconciliation
#[derive(Clone)]
pub struct ReconcileRequest {
    /// Desired interface configuration
    pub spec: InterfaceSpec,
    /// Target state
    pub state: DesiredState,
    /// Decide and report without mutating anything
    pub dry_run: bool,
    /// Key to use instead of generating one
    pub private_key: Option<PrivateKey>,
}

impl fmt::Debug for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileRequest")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("dry_run", &self.dry_run)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Current state as seen against the desired spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedState {
    /// No file and no live interface
    Absent,
    /// File matches the spec and the interface is up
    PresentMatching,
    /// Anything else: stale file, missing file, or interface down
    PresentDrifted,
}

/// Decision for one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Derived current state
    pub observed: ObservedState,
    /// Action to take
    pub action: Action,
    /// The persisted file renders identically to the spec and holds the
    /// requested key, if one was supplied
    pub file_matches: bool,
}

/// Decide what to do; pure, no collaborator calls
///
/// A `supplied_key` that differs from the key in the persisted file counts
/// as drift, so the interface converges onto the caller's key.
pub fn plan(
    spec: &InterfaceSpec,
    desired: DesiredState,
    supplied_key: Option<&PrivateKey>,
    runtime: &RuntimeState,
) -> Plan {
    let file_matches = runtime
        .current_config_text
        .as_deref()
        .map(|text| {
            let key_matches = supplied_key.map_or(true, |supplied| {
                extract_private_key(text).map(|persisted| persisted.public_key())
                    == Some(supplied.public_key())
            });
            key_matches && comparison_form(text) == render(spec, None).as_str()
        })
        .unwrap_or(false);

    let observed = match (runtime.current_config_text.is_some(), runtime.exists) {
        (false, false) => ObservedState::Absent,
        (true, true) if file_matches => ObservedState::PresentMatching,
        _ => ObservedState::PresentDrifted,
    };

    let action = match desired {
        DesiredState::Present => match observed {
            ObservedState::Absent => Action::Create,
            ObservedState::PresentMatching => Action::None,
            ObservedState::PresentDrifted => Action::Update,
        },
        DesiredState::Absent if runtime.exists => Action::Delete,
        DesiredState::Absent => Action::None,
    };

    Plan {
        observed,
        action,
        file_matches,
    }
}

/// Drives one interface to its desired state
pub struct Reconciler {
    tunnel: Box<dyn TunnelControl>,
    keys: Box<dyn KeyGenerator>,
    files: Box<dyn FileStore>,
    settings: Settings,
}

impl Reconciler {
    /// Create a reconciler over its collaborators
    pub fn new(
        tunnel: Box<dyn TunnelControl>,
        keys: Box<dyn KeyGenerator>,
        files: Box<dyn FileStore>,
        settings: Settings,
    ) -> Self {
        Self {
            tunnel,
            keys,
            files,
            settings,
        }
    }

    /// Run one reconciliation; failures are reported in the outcome
    pub fn reconcile(&self, req: &ReconcileRequest) -> Outcome {
        let name = &req.spec.name;
        info!(
            "Reconciling interface {} (state={:?}, dry_run={})",
            name, req.state, req.dry_run
        );

        let runtime = match StateProber::new(
            self.tunnel.as_ref(),
            self.files.as_ref(),
            &self.settings,
        )
        .probe(name)
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to probe {}: {}", name, e);
                return Outcome::failure(Action::None, &e).with_dry_run(req.dry_run);
            }
        };

        let plan = plan(&req.spec, req.state, req.private_key.as_ref(), &runtime);
        debug!(
            "Plan for {}: observed={:?}, action={}, file_matches={}",
            name, plan.observed, plan.action, plan.file_matches
        );

        if req.dry_run {
            return self.preview(req, &runtime, &plan);
        }

        let result = match plan.action {
            Action::None => Ok(self.unchanged(req, &runtime)),
            Action::Create | Action::Update => self.converge(req, &runtime, &plan),
            Action::Delete => self.delete(name),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to {} interface {}: {}", plan.action, name, e);
                Outcome::failure(plan.action, &e)
            }
        }
    }

    fn preview(&self, req: &ReconcileRequest, runtime: &RuntimeState, plan: &Plan) -> Outcome {
        let name = &req.spec.name;
        let outcome = match plan.action {
            Action::None => self.unchanged(req, runtime),
            action => {
                // Only report a key that is already known; dry runs never generate one
                let public_key = match (plan.action, req.private_key.as_ref()) {
                    (Action::Delete, _) => None,
                    (_, Some(key)) => Some(key.public_key().to_base64()),
                    (_, None) if plan.file_matches => runtime
                        .current_config_text
                        .as_deref()
                        .and_then(extract_private_key)
                        .map(|key| key.public_key().to_base64()),
                    _ => None,
                };
                Outcome::success(
                    action,
                    format!("Would {} interface {}", action, name),
                    public_key,
                )
            }
        };
        info!("Dry run for {}: {}", name, outcome.message);
        outcome.with_dry_run(true)
    }

    fn unchanged(&self, req: &ReconcileRequest, runtime: &RuntimeState) -> Outcome {
        let name = &req.spec.name;
        match req.state {
            DesiredState::Present => {
                let public_key = runtime
                    .current_config_text
                    .as_deref()
                    .and_then(extract_private_key)
                    .map(|key| key.public_key().to_base64());
                info!("Interface {} is up to date", name);
                Outcome::success(
                    Action::None,
                    format!("Interface {} is up to date", name),
                    public_key,
                )
            }
            DesiredState::Absent => {
                info!("Interface {} is already absent", name);
                Outcome::success(
                    Action::None,
                    format!("Interface {} is already absent", name),
                    None,
                )
            }
        }
    }

    fn converge(&self, req: &ReconcileRequest, runtime: &RuntimeState, plan: &Plan) -> Result<Outcome> {
        let name = &req.spec.name;
        let config_path = self.settings.config_path(name);

        if runtime.current_config_text.is_some() {
            let backup_path = self.settings.backup_path(name);
            self.files.copy(&config_path, &backup_path).map_err(|e| {
                ConvergeError::Backup(format!(
                    "Failed to back up {:?} to {:?}: {}",
                    config_path, backup_path, e
                ))
            })?;
            info!("Backed up {:?} to {:?}", config_path, backup_path);
        }

        let keys = self.key_pair(req, runtime, plan)?;
        let rendered = render(&req.spec, Some(&keys));

        self.tunnel
            .apply_config(name, rendered.as_str())
            .map_err(|e| ConvergeError::Apply(format!("Failed to configure {}: {}", name, e)))?;
        info!("Applied configuration to {}", name);

        let public_key = keys.public.to_base64();
        if let Err(e) = self.files.write(&config_path, rendered.as_str()) {
            let err = ConvergeError::Persist(format!("Failed to write {:?}: {}", config_path, e));
            warn!("Interface {} is configured but {}", name, err);
            return Ok(Outcome::failure(plan.action, &err).with_public_key(Some(public_key)));
        }

        let verb = match plan.action {
            Action::Create => "created",
            _ => "updated",
        };
        info!("Interface {} {}", name, verb);
        Ok(Outcome::success(
            plan.action,
            format!("Interface {} {}", name, verb),
            Some(public_key),
        ))
    }

    fn key_pair(&self, req: &ReconcileRequest, runtime: &RuntimeState, plan: &Plan) -> Result<KeyPair> {
        if let Some(private) = &req.private_key {
            debug!("Using caller-supplied key for {}", req.spec.name);
            return Ok(KeyPair::from_private(private.clone()));
        }

        if plan.file_matches {
            if let Some(private) = runtime
                .current_config_text
                .as_deref()
                .and_then(extract_private_key)
            {
                debug!("Reusing persisted key for {}", req.spec.name);
                return Ok(KeyPair::from_private(private));
            }
        }

        debug!("Generating new key pair for {}", req.spec.name);
        self.keys.generate().map_err(|e| match e {
            ConvergeError::KeyGeneration(_) => e,
            other => ConvergeError::KeyGeneration(other.to_string()),
        })
    }

    fn delete(&self, name: &str) -> Result<Outcome> {
        self.tunnel
            .teardown(name)
            .map_err(|e| ConvergeError::Teardown(format!("Failed to delete {}: {}", name, e)))?;
        info!("Removed interface {}", name);

        let config_path = self.settings.config_path(name);
        if let Err(e) = self.files.remove(&config_path) {
            let err = ConvergeError::Persist(format!("Failed to remove {:?}: {}", config_path, e));
            warn!("Interface {} is gone but {}", name, err);
            return Ok(Outcome::failure(Action::Delete, &err));
        }

        Ok(Outcome::success(
            Action::Delete,
            format!("Interface {} deleted", name),
            None,
        ))
    }
}
