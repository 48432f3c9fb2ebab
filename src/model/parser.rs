//! Parser for the on-disk HAProxy configuration text.
//!
//! # Responsibilities
//! - Turn haproxy.cfg text into a [`Document`]
//! - Report malformed input with line numbers
//!
//! # Design Decisions
//! - Only the section kinds the engine manipulates are accepted; a
//!   `listen` section in the input is an error, not silently dropped,
//!   because a lossy parse would corrupt the file on the next save
//! - Comments and blank lines are not preserved; the renderer emits a
//!   canonical form and determinism matters more than cosmetics

use thiserror::Error;

use super::document::Document;
use super::line::{Acl, Bind, ConfigLine, OptionLine, Server, UseBackend};
use super::section::{Backend, Defaults, Frontend, Userlist};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unknown section kind '{section}'")]
    UnknownSection { line: usize, section: String },
    #[error("line {line}: '{section}' section requires a name")]
    MissingName { line: usize, section: String },
    #[error("line {line}: directive outside of any section")]
    OrphanDirective { line: usize },
    #[error("line {line}: malformed {directive} directive")]
    MalformedDirective { line: usize, directive: String },
    #[error("line {line}: invalid listen address '{address}'")]
    InvalidAddress { line: usize, address: String },
    #[error("line {line}: more than one global section")]
    DuplicateGlobal { line: usize },
}

enum Section {
    Global,
    Defaults(Defaults),
    Userlist(Userlist),
    Frontend(Frontend),
    Backend(Backend),
}

/// Parse configuration text into a structured document.
pub fn parse(text: &str) -> Result<Document, ParseError> {
    let mut doc = Document {
        defaults: Vec::new(),
        ..Document::default()
    };
    let mut seen_global = false;
    let mut current: Option<Section> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        if !indented {
            if let Some(section) = current.take() {
                close_section(&mut doc, section);
            }
            current = Some(open_section(trimmed, line, &mut seen_global)?);
        } else {
            let section = current
                .as_mut()
                .ok_or(ParseError::OrphanDirective { line })?;
            match section {
                Section::Global => doc.global.configs.push(ConfigLine::from_line(trimmed)),
                Section::Defaults(defaults) => parse_defaults_line(defaults, trimmed),
                Section::Userlist(userlist) => {
                    userlist.configs.push(ConfigLine::from_line(trimmed))
                }
                Section::Frontend(frontend) => parse_frontend_line(frontend, trimmed, line)?,
                Section::Backend(backend) => parse_backend_line(backend, trimmed, line)?,
            }
        }
    }
    if let Some(section) = current.take() {
        close_section(&mut doc, section);
    }

    // A config without defaults is still a valid document for the engine.
    if doc.defaults.is_empty() {
        doc.defaults.push(Defaults::default());
    }
    Ok(doc)
}

fn open_section(header: &str, line: usize, seen_global: &mut bool) -> Result<Section, ParseError> {
    let mut tokens = header.split_whitespace();
    let kind = tokens.next().unwrap_or_default();
    let name = tokens.next();
    match kind {
        "global" => {
            if *seen_global {
                return Err(ParseError::DuplicateGlobal { line });
            }
            *seen_global = true;
            Ok(Section::Global)
        }
        "defaults" => Ok(Section::Defaults(Defaults {
            name: name.unwrap_or_default().to_string(),
            ..Defaults::default()
        })),
        "userlist" => {
            let name = name.ok_or_else(|| ParseError::MissingName {
                line,
                section: kind.to_string(),
            })?;
            Ok(Section::Userlist(Userlist {
                name: name.to_string(),
                ..Userlist::default()
            }))
        }
        "frontend" => {
            let name = name.ok_or_else(|| ParseError::MissingName {
                line,
                section: kind.to_string(),
            })?;
            let mut frontend = Frontend {
                name: name.to_string(),
                ..Frontend::default()
            };
            // Legacy header form `frontend <name> <addr>:<port>`.
            if let Some(addr) = tokens.next() {
                frontend.binds.push(parse_address(addr, line)?);
            }
            Ok(Section::Frontend(frontend))
        }
        "backend" => {
            let name = name.ok_or_else(|| ParseError::MissingName {
                line,
                section: kind.to_string(),
            })?;
            Ok(Section::Backend(Backend::new(name)))
        }
        other => Err(ParseError::UnknownSection {
            line,
            section: other.to_string(),
        }),
    }
}

fn close_section(doc: &mut Document, section: Section) {
    match section {
        Section::Global => {}
        Section::Defaults(defaults) => doc.defaults.push(defaults),
        Section::Userlist(userlist) => doc.userlists.push(userlist),
        Section::Frontend(frontend) => doc.frontends.push(frontend),
        Section::Backend(backend) => doc.backends.push(backend),
    }
}

fn parse_defaults_line(defaults: &mut Defaults, line: &str) {
    if let Some(rest) = line.strip_prefix("option ") {
        defaults.options.push(option_line(rest));
    } else {
        defaults.configs.push(ConfigLine::from_line(line));
    }
}

fn parse_frontend_line(frontend: &mut Frontend, line: &str, lineno: usize) -> Result<(), ParseError> {
    if let Some(rest) = line.strip_prefix("bind ") {
        let mut tokens = rest.split_whitespace();
        let addr = tokens.next().ok_or_else(|| ParseError::MalformedDirective {
            line: lineno,
            directive: "bind".to_string(),
        })?;
        let mut bind = parse_address(addr, lineno)?;
        bind.attributes.extend(tokens.map(str::to_owned));
        frontend.binds.push(bind);
    } else if let Some(rest) = line.strip_prefix("acl ") {
        frontend.acls.push(parse_acl(rest, lineno)?);
    } else if let Some(rest) = line.strip_prefix("use_backend ") {
        let mut tokens = rest.split_whitespace();
        let backend = tokens.next().ok_or_else(|| ParseError::MalformedDirective {
            line: lineno,
            directive: "use_backend".to_string(),
        })?;
        let operator = tokens.next().unwrap_or_default();
        let condition = tokens.collect::<Vec<_>>().join(" ");
        frontend.use_backends.push(UseBackend {
            backend: backend.to_string(),
            operator: operator.to_string(),
            condition,
            is_default: false,
        });
    } else if let Some(rest) = line.strip_prefix("default_backend ") {
        frontend
            .use_backends
            .push(UseBackend::default_rule(rest.trim()));
    } else {
        frontend.configs.push(ConfigLine::from_line(line));
    }
    Ok(())
}

fn parse_backend_line(backend: &mut Backend, line: &str, lineno: usize) -> Result<(), ParseError> {
    if let Some(rest) = line.strip_prefix("option ") {
        backend.options.push(option_line(rest));
    } else if let Some(rest) = line.strip_prefix("acl ") {
        backend.acls.push(parse_acl(rest, lineno)?);
    } else if let Some(rest) = line.strip_prefix("server ") {
        let mut tokens = rest.split_whitespace();
        let name = tokens.next().ok_or_else(|| ParseError::MalformedDirective {
            line: lineno,
            directive: "server".to_string(),
        })?;
        let addr = tokens.next().ok_or_else(|| ParseError::MalformedDirective {
            line: lineno,
            directive: "server".to_string(),
        })?;
        let (host, port) = split_address(addr, lineno)?;
        let mut server = Server::new(name, host, port);
        server.attributes.extend(tokens.map(str::to_owned));
        backend.servers.push(server);
    } else {
        backend.configs.push(ConfigLine::from_line(line));
    }
    Ok(())
}

fn parse_acl(rest: &str, lineno: usize) -> Result<Acl, ParseError> {
    match rest.split_once(char::is_whitespace) {
        Some((name, value)) => Ok(Acl::new(name, value.trim())),
        None => Err(ParseError::MalformedDirective {
            line: lineno,
            directive: "acl".to_string(),
        }),
    }
}

fn option_line(rest: &str) -> OptionLine {
    match rest.split_once(char::is_whitespace) {
        Some((kw, value)) => OptionLine::new(kw, value.trim()),
        None => OptionLine::new(rest, ""),
    }
}

fn parse_address(addr: &str, lineno: usize) -> Result<Bind, ParseError> {
    let (host, port) = split_address(addr, lineno)?;
    Ok(Bind::new(host, port))
}

fn split_address(addr: &str, lineno: usize) -> Result<(String, u16), ParseError> {
    let (host, port) = addr.rsplit_once(':').ok_or_else(|| ParseError::InvalidAddress {
        line: lineno,
        address: addr.to_string(),
    })?;
    let port = port.parse().map_err(|_| ParseError::InvalidAddress {
        line: lineno,
        address: addr.to_string(),
    })?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
global
    log /dev/log local0
    maxconn 20000
    daemon

defaults
    log global
    mode http
    option httplog
    option dontlognull
    timeout connect 5000

frontend relation-80
    bind 0.0.0.0:80
    acl app-0-0 path_beg /test/
    acl app-0-0 path /test
    use_backend app-0-0 if app-0-0

backend app-0-0
    mode http
    cookie SERVERID insert indirect nocache
    option httpchk GET / HTTP/1.0
    server app-0-0 10.0.0.5:8080 check fall 3 rise 2
";

    #[test]
    fn test_parse_sample() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.global.configs.len(), 3);
        assert_eq!(doc.defaults.len(), 1);
        assert_eq!(doc.defaults[0].options.len(), 2);
        assert_eq!(doc.frontends.len(), 1);
        let fe = &doc.frontends[0];
        assert_eq!(fe.port(), Some(80));
        assert_eq!(fe.acls.len(), 2);
        assert_eq!(fe.use_backends.len(), 1);
        assert_eq!(fe.use_backends[0].condition, "app-0-0");
        let be = &doc.backends[0];
        assert!(be.has_config("mode", "http"));
        assert!(be.has_option("httpchk"));
        assert_eq!(be.servers[0].port, 8080);
        assert!(be.servers[0].has_attribute("check"));
    }

    #[test]
    fn test_default_backend_directive() {
        let text = "frontend relation-90\n    bind 0.0.0.0:90\n    mode tcp\n    default_backend group-a\n";
        let doc = parse(text).unwrap();
        let fe = &doc.frontends[0];
        assert!(fe.is_tcp());
        assert!(fe.use_backends[0].is_default);
        assert_eq!(fe.use_backends[0].backend, "group-a");
    }

    #[test]
    fn test_unknown_section_is_an_error() {
        let err = parse("listen stats\n    bind 0.0.0.0:9000\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownSection { line: 1, .. }));
    }

    #[test]
    fn test_orphan_directive_is_an_error() {
        let err = parse("    mode http\n").unwrap_err();
        assert!(matches!(err, ParseError::OrphanDirective { line: 1 }));
    }

    #[test]
    fn test_bad_bind_port() {
        let err = parse("frontend f\n    bind 0.0.0.0:http\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAddress { line: 2, .. }));
    }

    #[test]
    fn test_empty_input_gets_defaults_section() {
        let doc = parse("").unwrap();
        assert_eq!(doc.defaults.len(), 1);
    }
}
