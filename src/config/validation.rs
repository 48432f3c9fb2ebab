//! Relation record validation.
//!
//! # Responsibilities
//! - Semantic validation of relation records (serde handles syntactic)
//! - Keep the engine total: a record that reaches the reconciler is
//!   already well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function over the record, no I/O

use thiserror::Error;

use super::relation::RelationConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("external_port must be non-zero")]
    ZeroExternalPort,
    #[error("internal_port must be non-zero")]
    ZeroInternalPort,
    #[error("internal_host must not be empty")]
    EmptyInternalHost,
    #[error("urlbase '{0}' must start with '/'")]
    RelativeUrlbase(String),
    #[error("group_id '{0}' must not contain '/'")]
    SlashInGroupId(String),
}

/// Validate one relation record, collecting every problem.
pub fn validate_relation(config: &RelationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.external_port == 0 {
        errors.push(ValidationError::ZeroExternalPort);
    }
    if config.internal_port == 0 {
        errors.push(ValidationError::ZeroInternalPort);
    }
    if config.internal_host.trim().is_empty() {
        errors.push(ValidationError::EmptyInternalHost);
    }
    if let Some(urlbase) = config.urlbase.as_deref() {
        if !urlbase.is_empty() && !urlbase.starts_with('/') {
            errors.push(ValidationError::RelativeUrlbase(urlbase.to_string()));
        }
    }
    if let Some(group) = config.group_id.as_deref() {
        if group.contains('/') {
            errors.push(ValidationError::SlashInGroupId(group.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
