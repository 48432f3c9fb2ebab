//! Renderer producing the canonical haproxy.cfg text.
//!
//! # Design Decisions
//! - Deterministic output: fixed section-kind order (global, defaults,
//!   userlists, frontends, backends), insertion order within each kind,
//!   four-space indent
//! - Round-trip safe with the parser: parse(render(d)) is structurally
//!   equal to d

use std::fmt::Display;

use super::document::Document;
use super::section::{Backend, Frontend};

const INDENT: &str = "    ";

/// Render a document to configuration text.
pub fn render(doc: &Document) -> String {
    let mut out = String::new();

    out.push_str("global\n");
    for config in &doc.global.configs {
        push_line(&mut out, config);
    }
    out.push('\n');

    for defaults in &doc.defaults {
        if defaults.name.is_empty() {
            out.push_str("defaults\n");
        } else {
            out.push_str(&format!("defaults {}\n", defaults.name));
        }
        for option in &defaults.options {
            push_line(&mut out, option);
        }
        for config in &defaults.configs {
            push_line(&mut out, config);
        }
        out.push('\n');
    }

    for userlist in &doc.userlists {
        out.push_str(&format!("userlist {}\n", userlist.name));
        for config in &userlist.configs {
            push_line(&mut out, config);
        }
        out.push('\n');
    }

    for frontend in &doc.frontends {
        render_frontend(&mut out, frontend);
    }
    for backend in &doc.backends {
        render_backend(&mut out, backend);
    }

    // One trailing newline, not two.
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn push_line(out: &mut String, entry: &dyn Display) {
    out.push_str(INDENT);
    out.push_str(&entry.to_string());
    out.push('\n');
}

fn render_frontend(out: &mut String, fe: &Frontend) {
    out.push_str(&format!("frontend {}\n", fe.name));
    for bind in &fe.binds {
        push_line(out, bind);
    }
    for config in &fe.configs {
        push_line(out, config);
    }
    for acl in &fe.acls {
        push_line(out, acl);
    }
    for rule in &fe.use_backends {
        push_line(out, rule);
    }
    out.push('\n');
}

fn render_backend(out: &mut String, be: &Backend) {
    out.push_str(&format!("backend {}\n", be.name));
    for option in &be.options {
        push_line(out, option);
    }
    for config in &be.configs {
        push_line(out, config);
    }
    for acl in &be.acls {
        push_line(out, acl);
    }
    for server in &be.servers {
        push_line(out, server);
    }
    out.push('\n');
}
