//! Structured configuration model subsystem.
//!
//! # Data Flow
//! ```text
//! /etc/haproxy/haproxy.cfg
//!     → parser.rs (text → Document)
//!     → document.rs / section.rs / line.rs (typed, ordered mutation)
//!     → render.rs (Document → canonical text)
//!     → store.rs (explicit load / invalidate / save lifecycle)
//! ```
//!
//! # Design Decisions
//! - The reconciliation engine only ever sees the object model; raw text
//!   stays inside this module
//! - Order-preserving Vecs everywhere: rule evaluation in HAProxy is
//!   first-match-wins and re-saves must be byte-stable

pub mod document;
pub mod line;
pub mod parser;
pub mod render;
pub mod section;
pub mod store;

pub use document::{Document, RELATION_PREFIX};
pub use line::{Acl, Bind, ConfigLine, OptionLine, Server, UseBackend};
pub use parser::{parse, ParseError};
pub use render::render;
pub use section::{Backend, Defaults, Frontend, Global, Userlist};
pub use store::{ConfigStore, StoreError};
