//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! charm config (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CharmConfig (defaulted, injected into the engine)
//!
//! relation data (JSON, per related unit)
//!     → relation.rs (deserialize, single object or array)
//!     → validation.rs (semantic checks, all errors collected)
//!     → RelationConfig records fed to process_configs
//! ```
//!
//! # Design Decisions
//! - CharmConfig is passed explicitly into the engine, never read from
//!   ambient process state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod relation;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use relation::{Mode, RelationConfig, RelationPayload};
pub use schema::{CharmConfig, LetsEncryptConfig, StatsConfig, UpnpConfig};
pub use validation::{validate_relation, ValidationError};
