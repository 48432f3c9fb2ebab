//! Feature toggle tests: stats endpoint, HTTPS redirect, TLS
//! termination and the tunnel timeout.

mod common;

use std::fs;

use common::{http_config, Harness};

#[test]
fn test_enable_stats_builds_auth_frontend() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.stats.enabled = true;
        charm.stats.user = "ops".to_string();
        charm.stats.passwd = "secret".to_string();
        charm.stats.url = "/status".to_string();
    });
    let status = harness.engine.enable_stats(true).unwrap();
    assert!(status.ok);

    let doc = harness.engine.document().unwrap();
    let frontend = doc.frontend_named("stats").unwrap();
    assert_eq!(frontend.port(), Some(9000));
    assert!(frontend.has_config("stats", "enable"));
    assert!(frontend.has_config("stats", "auth ops:secret"));
    assert!(frontend.has_config("stats", "uri /status"));
    assert!(!frontend.has_acl("local"));

    // Toggling twice leaves one frontend.
    harness.engine.enable_stats(true).unwrap();
    let doc = harness.engine.document().unwrap();
    assert_eq!(
        doc.frontends.iter().filter(|fe| fe.name == "stats").count(),
        1
    );
}

#[test]
fn test_local_stats_is_gated_and_not_exposed() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.stats.enabled = true;
        charm.stats.local = true;
    });
    harness.engine.enable_stats(true).unwrap();

    let doc = harness.engine.document().unwrap();
    let frontend = doc.frontend_named("stats").unwrap();
    assert!(frontend.has_acl("local"));
    assert!(frontend.has_config("http-request", "deny if !local"));

    // The stats port stays out of the externally-open set.
    assert!(!harness.open_ports().contains(&9000));
}

#[test]
fn test_stats_port_conflict() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.stats.enabled = true;
        charm.stats.port = 80;
    });
    harness
        .engine
        .process_configs("unit-mock/0", &[http_config()])
        .unwrap();

    let status = harness.engine.enable_stats(true).unwrap();
    assert!(!status.ok);
    assert_eq!(status.message, "Stats port already in use");
    let doc = harness.engine.document().unwrap();
    assert!(doc.frontend_named("stats").is_none());
}

#[test]
fn test_stats_frontend_rejects_http_registrations() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.stats.enabled = true;
    });
    harness.engine.enable_stats(true).unwrap();

    let mut config = http_config();
    config.external_port = 9000;
    let status = harness
        .engine
        .process_configs("unit-mock/0", &[config])
        .unwrap();
    assert!(!status.ok);
}

#[test]
fn test_redirect_round_trip() {
    let mut harness = Harness::new();
    harness.engine.enable_redirect(true).unwrap();

    let doc = harness.engine.document().unwrap();
    let frontend = doc.frontend(80).unwrap();
    assert!(frontend.use_backends[0].is_default);
    let backend = doc.backend("redirect").unwrap();
    assert!(backend.has_config("redirect", "scheme https"));
    assert_eq!(backend.servers[0].host, "127.0.0.1");
    assert_eq!(backend.servers[0].port, 0);

    // Re-enabling does not stack rules.
    harness.engine.enable_redirect(true).unwrap();
    let doc = harness.engine.document().unwrap();
    assert_eq!(doc.frontend(80).unwrap().use_backends.len(), 1);

    harness.engine.disable_redirect(true).unwrap();
    let doc = harness.engine.document().unwrap();
    assert!(doc.backend("redirect").is_none());
    assert!(doc.frontend(80).is_none());
}

#[test]
fn test_timeout_tunnel_replaces_previous_value() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.tunnel_timeout = "2h".to_string();
    });
    harness.engine.add_timeout_tunnel(true).unwrap();
    harness.engine.add_timeout_tunnel(true).unwrap();

    let doc = harness.engine.document().unwrap();
    let tunnels: Vec<_> = doc.defaults[0]
        .configs
        .iter()
        .filter(|c| c.keyword == "timeout" && c.value.starts_with("tunnel"))
        .collect();
    assert_eq!(tunnels.len(), 1);
    assert_eq!(tunnels[0].value, "tunnel 2h");
    // Package-provided timeouts survive.
    assert!(doc.defaults[0]
        .configs
        .iter()
        .any(|c| c.value.starts_with("connect")));
}

#[test]
fn test_enable_letsencrypt_wires_challenge_and_tls() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.letsencrypt.enabled = true;
        charm.letsencrypt.domains = vec!["example.com".to_string()];
        charm.letsencrypt.destination_https_rewrite = true;
    });
    let status = harness.engine.enable_letsencrypt().unwrap();
    assert!(status.ok);

    assert_eq!(
        harness.certs.state.lock().unwrap().registrations,
        vec![vec!["example.com".to_string()]]
    );

    let cert_file = harness.engine.charm().cert_file().unwrap();
    assert_eq!(fs::read_to_string(&cert_file).unwrap(), "CHAIN\nKEY\n");

    let doc = harness.engine.document().unwrap();
    let fe80 = doc.frontend(80).unwrap();
    assert!(fe80.has_acl("letsencrypt"));
    assert!(fe80.has_use_backend("letsencrypt-backend"));

    let fe443 = doc.frontend(443).unwrap();
    assert!(fe443.binds[0].has_attribute("ssl"));
    assert!(fe443.binds[0].has_attribute("alpn"));
    assert!(fe443
        .binds[0]
        .attributes
        .contains(&cert_file.display().to_string()));
    assert!(fe443.has_acl("letsencrypt"));
    assert!(fe443
        .configs
        .iter()
        .any(|c| c.keyword == "reqirep"));

    let backend = doc.backend("letsencrypt-backend").unwrap();
    assert_eq!(backend.servers[0].port, 9999);

    assert_eq!(
        harness.scheduler.jobs.lock().unwrap().get("renew-cert"),
        Some(&"@daily".to_string())
    );
}

#[test]
fn test_reenabling_letsencrypt_does_not_duplicate() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.letsencrypt.enabled = true;
        charm.letsencrypt.domains = vec!["example.com".to_string()];
    });
    harness.engine.enable_letsencrypt().unwrap();
    harness.engine.enable_letsencrypt().unwrap();

    let doc = harness.engine.document().unwrap();
    let fe80 = doc.frontend(80).unwrap();
    assert_eq!(
        fe80.acls.iter().filter(|a| a.name == "letsencrypt").count(),
        1
    );
    let fe443 = doc.frontend(443).unwrap();
    let ssl_tokens = fe443.binds[0]
        .attributes
        .iter()
        .filter(|a| *a == "ssl")
        .count();
    assert_eq!(ssl_tokens, 1);
    let backend = doc.backend("letsencrypt-backend").unwrap();
    assert_eq!(backend.servers.len(), 1);
}

#[test]
fn test_old_proxy_version_skips_alpn() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.version = "1.8".to_string();
        charm.letsencrypt.enabled = true;
        charm.letsencrypt.domains = vec!["example.com".to_string()];
    });
    harness.engine.enable_letsencrypt().unwrap();

    let doc = harness.engine.document().unwrap();
    let fe443 = doc.frontend(443).unwrap();
    assert!(fe443.binds[0].has_attribute("ssl"));
    assert!(!fe443.binds[0].has_attribute("alpn"));
}

#[test]
fn test_disable_letsencrypt_strips_tls_state() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.letsencrypt.enabled = true;
        charm.letsencrypt.domains = vec!["example.com".to_string()];
    });
    harness.engine.enable_letsencrypt().unwrap();
    harness.engine.disable_letsencrypt(true).unwrap();

    let doc = harness.engine.document().unwrap();
    assert!(doc.backend("letsencrypt-backend").is_none());
    if let Some(fe443) = doc.frontend(443) {
        assert!(fe443.binds[0].attributes.is_empty());
        assert!(!fe443.has_acl("letsencrypt"));
    }
    assert!(harness
        .scheduler
        .jobs
        .lock()
        .unwrap()
        .get("renew-cert")
        .is_none());
}

#[test]
fn test_letsencrypt_without_domains_is_an_error() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.letsencrypt.enabled = true;
    });
    assert!(harness.engine.enable_letsencrypt().is_err());
}

#[test]
fn test_renew_only_path_merges_and_reloads() {
    let mut harness = Harness::with_charm_config(|charm| {
        charm.letsencrypt.enabled = true;
        charm.letsencrypt.domains = vec!["example.com".to_string()];
    });
    harness.engine.enable_letsencrypt().unwrap();
    let reloads_before = harness.system.state.lock().unwrap().reloads;

    let status = harness.engine.renew_cert(false).unwrap();
    assert!(status.ok);
    assert_eq!(harness.certs.state.lock().unwrap().renews, 1);
    assert!(harness.system.state.lock().unwrap().reloads > reloads_before);
}

#[test]
fn test_renew_upnp_resends_open_for_held_ports() {
    let mut harness = Harness::new();
    harness
        .engine
        .process_configs("unit-mock/0", &[http_config()])
        .unwrap();
    harness.system.state.lock().unwrap().open_calls.clear();

    harness.engine.renew_upnp().unwrap();
    let state = harness.system.state.lock().unwrap();
    assert_eq!(state.open_calls, vec![80]);
    assert!(state.ports.contains(&80));
}

#[test]
fn test_release_upnp_closes_everything() {
    let mut harness = Harness::new();
    harness
        .engine
        .process_configs("unit-mock/0", &[http_config()])
        .unwrap();

    harness.engine.release_upnp().unwrap();
    assert!(harness.open_ports().is_empty());
}
