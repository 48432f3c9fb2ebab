//! Line-level entries of an HAProxy configuration section.
//!
//! # Responsibilities
//! - Represent binds, ACLs, use_backend rules, servers, options, and
//!   free-form directives as typed values
//! - Render each entry back to its directive text
//!
//! # Design Decisions
//! - Free-form directives split into first token (keyword) + remainder
//!   (value); rendering re-joins them, so the split point never changes
//!   the output bytes
//! - Bind and server attributes are stored as individual whitespace
//!   tokens, keeping parse(render(x)) structurally equal to x

use std::fmt;

/// A free-form configuration directive, e.g. `timeout tunnel 1h` as
/// keyword `timeout`, value `tunnel 1h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    pub keyword: String,
    pub value: String,
}

impl ConfigLine {
    pub fn new(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }

    /// Parse a raw directive line into keyword + value.
    pub fn from_line(line: &str) -> Self {
        match line.split_once(char::is_whitespace) {
            Some((kw, rest)) => Self::new(kw, rest.trim()),
            None => Self::new(line, ""),
        }
    }
}

impl fmt::Display for ConfigLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}", self.keyword)
        } else {
            write!(f, "{} {}", self.keyword, self.value)
        }
    }
}

/// An `option` directive, e.g. `option httpchk GET / HTTP/1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionLine {
    pub keyword: String,
    pub value: String,
}

impl OptionLine {
    pub fn new(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for OptionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "option {}", self.keyword)
        } else {
            write!(f, "option {} {}", self.keyword, self.value)
        }
    }
}

/// A frontend bind line: address, port and optional attributes such as
/// `ssl crt /path` or `alpn h2,http/1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub address: String,
    pub port: u16,
    pub attributes: Vec<String>,
}

impl Bind {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            attributes: Vec::new(),
        }
    }

    /// Append attributes given as a whitespace-separated string.
    pub fn push_attributes(&mut self, attrs: &str) {
        self.attributes
            .extend(attrs.split_whitespace().map(str::to_owned));
    }

    /// True if any attribute token equals `token`.
    pub fn has_attribute(&self, token: &str) -> bool {
        self.attributes.iter().any(|a| a == token)
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bind {}:{}", self.address, self.port)?;
        for attr in &self.attributes {
            write!(f, " {}", attr)?;
        }
        Ok(())
    }
}

/// A named match condition. The name doubles as the join key to the
/// use_backend rule carrying the same condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub name: String,
    pub value: String,
}

impl Acl {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acl {} {}", self.name, self.value)
    }
}

/// A routing rule selecting a backend, either conditionally
/// (`use_backend <name> if <condition>`) or as the unconditional default
/// (`default_backend <name>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseBackend {
    pub backend: String,
    pub operator: String,
    pub condition: String,
    pub is_default: bool,
}

impl UseBackend {
    /// Conditional rule keyed to an ACL name.
    pub fn conditional(backend: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            operator: "if".to_string(),
            condition: condition.into(),
            is_default: false,
        }
    }

    /// Unconditional default rule, used for pure-TCP passthrough.
    pub fn default_rule(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            operator: String::new(),
            condition: String::new(),
            is_default: true,
        }
    }
}

impl fmt::Display for UseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default {
            write!(f, "default_backend {}", self.backend)
        } else {
            write!(
                f,
                "use_backend {} {} {}",
                self.backend, self.operator, self.condition
            )
        }
    }
}

/// One backend instance within a pool. Attributes are single tokens
/// (`check`, `fall`, `3`, `cookie`, `<unit>`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub attributes: Vec<String>,
}

impl Server {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            attributes: Vec::new(),
        }
    }

    /// Append attributes given as a whitespace-separated string.
    pub fn push_attributes(&mut self, attrs: &str) {
        self.attributes
            .extend(attrs.split_whitespace().map(str::to_owned));
    }

    /// True if any attribute token equals `token`.
    pub fn has_attribute(&self, token: &str) -> bool {
        self.attributes.iter().any(|a| a == token)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server {} {}:{}", self.name, self.host, self.port)?;
        for attr in &self.attributes {
            write!(f, " {}", attr)?;
        }
        Ok(())
    }
}
