//! Stage (a) of the execution pipeline: schema, size, allowlist, and
//! signature checks run before anything else is consulted.
//!
//! Signature verification deliberately doesn't reach for the `subtle`
//! crate for its constant-time comparison: the workspace doesn't
//! otherwise depend on it, and a byte-wise XOR accumulation is a handful
//! of lines that does the same job for a fixed-length digest comparison.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use celeris_core::{MAX_SUPPORTED_SCHEMA_VERSION, TaskMessage};

use crate::error::SecurityError;

/// The header a signed message carries its HMAC under.
pub const SIGNATURE_HEADER: &str = "x-celeris-signature";

/// Security-gate configuration: a payload size cap, an optional task-name
/// allowlist, and an optional signing requirement.
#[derive(Clone)]
pub struct SecurityConfig {
    pub max_payload_bytes: usize,
    pub allowed_task_names: Option<HashSet<String>>,
    pub require_signature: bool,
    pub signing_key: Option<Vec<u8>>,
    pub max_schema_version: u16,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            allowed_task_names: None,
            require_signature: false,
            signing_key: None,
            max_schema_version: MAX_SUPPORTED_SCHEMA_VERSION,
        }
    }
}

/// 1 MiB, generous for JSON task arguments without letting an oversized
/// payload tie up broker bandwidth and decode time.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

impl SecurityConfig {
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::new()
    }
}

pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl Default for SecurityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SecurityConfig::default(),
        }
    }

    pub fn max_payload_bytes(mut self, max: usize) -> Self {
        self.config.max_payload_bytes = max;
        self
    }

    pub fn allow_task(mut self, task_name: impl Into<String>) -> Self {
        self.config
            .allowed_task_names
            .get_or_insert_with(HashSet::new)
            .insert(task_name.into());
        self
    }

    pub fn allowed_task_names(mut self, names: HashSet<String>) -> Self {
        self.config.allowed_task_names = Some(names);
        self
    }

    pub fn require_signature(mut self, signing_key: impl Into<Vec<u8>>) -> Self {
        self.config.require_signature = true;
        self.config.signing_key = Some(signing_key.into());
        self
    }

    pub fn max_schema_version(mut self, version: u16) -> Self {
        self.config.max_schema_version = version;
        self
    }

    pub fn build(self) -> SecurityConfig {
        self.config
    }
}

/// Runs the validate-and-decode checks of stage (a), in the order the
/// design lists them: schema version, payload size, task allowlist,
/// signature.
pub struct SecurityGate {
    config: SecurityConfig,
}

impl SecurityGate {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn check_schema_version(&self, version: u16) -> Result<(), SecurityError> {
        if version > self.config.max_schema_version {
            return Err(SecurityError::UnsupportedSchemaVersion {
                found: version,
                max_supported: self.config.max_schema_version,
            });
        }
        Ok(())
    }

    pub fn check_payload_size(&self, payload: &[u8]) -> Result<(), SecurityError> {
        if payload.len() > self.config.max_payload_bytes {
            return Err(SecurityError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub fn check_task_allowed(&self, task_name: &str) -> Result<(), SecurityError> {
        if let Some(allowed) = &self.config.allowed_task_names {
            if !allowed.contains(task_name) {
                return Err(SecurityError::TaskNotAllowed {
                    task_name: task_name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Verifies `signature` (base64-encoded HMAC-SHA-256 over `payload`)
    /// against the configured signing key. A no-op when signing isn't
    /// required.
    pub fn verify_signature(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SecurityError> {
        if !self.config.require_signature {
            return Ok(());
        }
        let signature = signature.ok_or(SecurityError::MissingSignature)?;
        let key = self
            .config
            .signing_key
            .as_deref()
            .ok_or(SecurityError::MissingSignature)?;

        let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_| SecurityError::InvalidSignature)?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let provided = BASE64
            .decode(signature)
            .map_err(|_| SecurityError::InvalidSignature)?;

        if constant_time_eq(&expected, &provided) {
            Ok(())
        } else {
            Err(SecurityError::InvalidSignature)
        }
    }

    /// Signs `payload`, for producers that need to attach the
    /// [`SIGNATURE_HEADER`] before publishing. Returns `None` when no
    /// signing key is configured.
    pub fn sign(&self, payload: &[u8]) -> Option<String> {
        let key = self.config.signing_key.as_deref()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
        mac.update(payload);
        Some(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Runs every check for an inbound message, in validate-and-decode
    /// order. `signature` is read from [`SIGNATURE_HEADER`] by the caller.
    pub fn validate(
        &self,
        message: &TaskMessage,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SecurityError> {
        self.check_schema_version(message.schema_version)?;
        self.check_payload_size(payload)?;
        self.check_task_allowed(&message.task_name)?;
        self.verify_signature(payload, signature)?;
        Ok(())
    }
}

/// Byte-wise constant-time comparison: always walks the full shorter
/// length so timing doesn't leak how many leading bytes matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> TaskMessage {
        TaskMessage::builder("tasks.send", "default").build().unwrap()
    }

    #[test]
    fn schema_version_within_bound_passes() {
        let gate = SecurityGate::new(SecurityConfig::default());
        assert!(gate.check_schema_version(1).is_ok());
    }

    #[test]
    fn schema_version_above_bound_is_rejected() {
        let gate = SecurityGate::new(SecurityConfig::builder().max_schema_version(1).build());
        let err = gate.check_schema_version(2).unwrap_err();
        assert!(matches!(err, SecurityError::UnsupportedSchemaVersion { .. }));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let gate = SecurityGate::new(SecurityConfig::builder().max_payload_bytes(4).build());
        let err = gate.check_payload_size(b"too long").unwrap_err();
        assert!(matches!(err, SecurityError::PayloadTooLarge { .. }));
    }

    #[test]
    fn payload_within_cap_passes() {
        let gate = SecurityGate::new(SecurityConfig::builder().max_payload_bytes(4).build());
        assert!(gate.check_payload_size(b"ok").is_ok());
    }

    #[test]
    fn allowlist_rejects_unlisted_task() {
        let gate = SecurityGate::new(
            SecurityConfig::builder().allow_task("tasks.send").build(),
        );
        assert!(gate.check_task_allowed("tasks.send").is_ok());
        let err = gate.check_task_allowed("tasks.other").unwrap_err();
        assert!(matches!(err, SecurityError::TaskNotAllowed { .. }));
    }

    #[test]
    fn no_allowlist_configured_allows_anything() {
        let gate = SecurityGate::new(SecurityConfig::default());
        assert!(gate.check_task_allowed("tasks.anything").is_ok());
    }

    #[test]
    fn signature_not_required_skips_verification() {
        let gate = SecurityGate::new(SecurityConfig::default());
        assert!(gate.verify_signature(b"payload", None).is_ok());
    }

    #[test]
    fn missing_signature_is_rejected_when_required() {
        let gate = SecurityGate::new(
            SecurityConfig::builder().require_signature(b"secret".to_vec()).build(),
        );
        let err = gate.verify_signature(b"payload", None).unwrap_err();
        assert!(matches!(err, SecurityError::MissingSignature));
    }

    #[test]
    fn valid_signature_round_trips() {
        let gate = SecurityGate::new(
            SecurityConfig::builder().require_signature(b"secret".to_vec()).build(),
        );
        let signature = gate.sign(b"payload").unwrap();
        assert!(gate.verify_signature(b"payload", Some(&signature)).is_ok());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let gate = SecurityGate::new(
            SecurityConfig::builder().require_signature(b"secret".to_vec()).build(),
        );
        let signature = gate.sign(b"payload").unwrap();
        let err = gate
            .verify_signature(b"different payload", Some(&signature))
            .unwrap_err();
        assert!(matches!(err, SecurityError::InvalidSignature));
    }

    #[test]
    fn validate_runs_every_check_in_order() {
        let gate = SecurityGate::new(SecurityConfig::default());
        assert!(gate.validate(&message(), b"{}", None).is_ok());
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn constant_time_eq_accepts_equal_slices() {
        assert!(constant_time_eq(b"abc", b"abc"));
    }
}
