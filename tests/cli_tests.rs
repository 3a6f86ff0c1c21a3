use clap::Parser;
use form_reconciler::cli::commands::{
    ReconcilePreview, SubmitArgs, build_form_request, preview_reconciliation,
};
use form_reconciler::cli::config::{AppConfig, Cli, Commands, load_config, parse_override};
use form_reconciler::log_level;
use form_reconciler::reconcile::patch::DomPatch;
use form_reconciler::reconcile::reconciler::ReconcileTarget;
use form_reconciler::transport::TransportStrategy;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_submit_minimal() {
    let cli = Cli::parse_from([
        "form-reconciler",
        "submit",
        "--page",
        "http://shop.test/",
        "--form",
        "#form-login",
    ]);
    match cli.command {
        Commands::Submit {
            page,
            form,
            index,
            url,
            set,
            strategy,
            reload_url,
            reload_target,
        } => {
            assert_eq!(page, "http://shop.test/");
            assert_eq!(form, "#form-login");
            assert_eq!(index, 0);
            assert!(url.is_none());
            assert!(set.is_empty());
            assert!(strategy.is_none());
            assert!(reload_url.is_none());
            assert!(reload_target.is_none());
        }
        _ => panic!("Expected Submit command"),
    }
    assert_eq!(cli.verbose, 0);
}

#[test]
fn cli_parse_submit_all_args() {
    let cli = Cli::parse_from([
        "form-reconciler",
        "-vv",
        "submit",
        "--page",
        "http://shop.test/cart",
        "--form",
        "#shopping-cart form",
        "--index",
        "1",
        "--url",
        "http://shop.test/edit",
        "--set",
        "quantity=3",
        "--set",
        "note=a=b",
        "--strategy",
        "native-form",
        "--reload-url",
        "http://shop.test/list",
        "--reload-target",
        "#shopping-cart",
    ]);
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Submit {
            index, set, strategy, ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(set, vec!["quantity=3", "note=a=b"]);
            assert_eq!(strategy.as_deref(), Some("native-form"));
        }
        _ => panic!("Expected Submit command"),
    }
}

#[test]
fn cli_reload_url_requires_target() {
    let result = Cli::try_parse_from([
        "form-reconciler",
        "submit",
        "--page",
        "http://shop.test/",
        "--form",
        "#f",
        "--reload-url",
        "http://shop.test/list",
    ]);
    assert!(result.is_err());
}

#[test]
fn cli_parse_reconcile() {
    let cli = Cli::parse_from([
        "form-reconciler",
        "reconcile",
        "--body",
        "-",
        "--config",
        "custom.yaml",
    ]);
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
    match cli.command {
        Commands::Reconcile { body, form } => {
            assert_eq!(body, "-");
            assert!(form.is_none());
        }
        _ => panic!("Expected Reconcile command"),
    }
}

#[test]
fn verbosity_maps_to_level() {
    assert_eq!(log_level(0), "info");
    assert_eq!(log_level(1), "debug");
    assert_eq!(log_level(5), "trace");
}

// ============================================================================
// Request building
// ============================================================================

#[test]
fn override_splits_on_first_equals() {
    assert_eq!(
        parse_override("note=a=b").unwrap(),
        ("note".to_string(), "a=b".to_string())
    );
    assert_eq!(parse_override("empty=").unwrap().1, "");
    assert!(parse_override("novalue").is_err());
    assert!(parse_override("=x").is_err());
}

#[test]
fn submit_args_become_form_request() {
    let args = SubmitArgs {
        page: "http://shop.test/cart".into(),
        form: "#shopping-cart form".into(),
        index: 2,
        set: vec!["quantity=3".into()],
        strategy: Some("fetch".into()),
        reload_url: Some("http://shop.test/list".into()),
        reload_target: Some("#shopping-cart".into()),
        ..Default::default()
    };

    let request = build_form_request(&args).unwrap();
    let locator = request.form.unwrap();
    assert_eq!(locator.selector, "#shopping-cart form");
    assert_eq!(locator.index, 2);
    assert_eq!(
        request.overrides,
        vec![("quantity".to_string(), "3".to_string())]
    );
    assert_eq!(request.strategy, Some(TransportStrategy::InPageFetch));
    assert_eq!(request.reload.unwrap().target, "#shopping-cart");
}

#[test]
fn unknown_strategy_is_rejected() {
    let args = SubmitArgs {
        form: "#f".into(),
        strategy: Some("smoke-signals".into()),
        ..Default::default()
    };
    assert!(build_form_request(&args).is_err());
}

// ============================================================================
// Offline reconcile
// ============================================================================

#[test]
fn preview_of_field_errors() {
    let preview = preview_reconciliation(
        r#"{"error": {"email": "E-Mail Address does not appear to be valid!"}}"#,
        &ReconcileTarget::default(),
    );
    match preview {
        ReconcilePreview::Applied {
            patches,
            annotations,
            fingerprint,
        } => {
            assert!(patches.iter().any(|p| matches!(
                p,
                DomPatch::ShowFieldError { error_id, .. } if error_id == "error-email"
            )));
            assert_eq!(annotations.field_errors.len(), 1);
            assert_eq!(fingerprint.len(), 40);
        }
        other => panic!("expected applied preview, got {:?}", other),
    }
}

#[test]
fn preview_of_redirect_and_html() {
    assert!(matches!(
        preview_reconciliation(r#"{"redirect": "/x"}"#, &ReconcileTarget::default()),
        ReconcilePreview::FollowRedirect { url } if url == "/x"
    ));
    assert!(matches!(
        preview_reconciliation("<html/>", &ReconcileTarget::default()),
        ReconcilePreview::Unstructured { bytes: 7 }
    ));
}

#[test]
fn preview_serializes_with_kind_tag() {
    let preview = preview_reconciliation(r#"{"success": "ok"}"#, &ReconcileTarget::default());
    let json = serde_json::to_value(&preview).unwrap();
    assert_eq!(json["kind"], "applied");
    assert_eq!(json["patches"][0]["op"], "clear_field_errors");
    assert_eq!(json["patches"][2]["kind"], "success");
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.submit.strategies, TransportStrategy::PREFERENCE.to_vec());
    assert_eq!(config.submit.timeout_ms, 10_000);
    assert_eq!(config.submit.idle_wait_ms, 500);
    assert_eq!(config.submit.alert_container, "alert");
    assert!(config.browser.headless);
    assert!(config.trace.file.is_none());
}

#[test]
fn config_load_missing_file_returns_defaults() {
    let config = load_config(Some("/nonexistent/path/config.yaml"));
    assert_eq!(config.submit.timeout_ms, 10_000);
}

#[test]
fn config_partial_yaml() {
    let yaml = r#"
submit:
  strategies: [session-request, native-form]
  timeout_ms: 2500
trace:
  file: submissions.jsonl
"#;
    let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        config.submit.strategies,
        vec![TransportStrategy::SessionRequest, TransportStrategy::NativeForm]
    );
    assert_eq!(config.submit.timeout_ms, 2500);
    assert_eq!(config.submit.idle_wait_ms, 500);
    assert!(config.browser.headless);
    assert_eq!(config.trace.file.as_deref(), Some("submissions.jsonl"));

    let submitter = config.submit.to_submitter_config();
    assert_eq!(submitter.timeout_ms, 2500);
    assert_eq!(submitter.alert_container, "alert");
}

#[test]
fn config_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-reconciler.yaml");
    std::fs::write(&path, "browser:\n  headless: false\n").unwrap();

    let config = load_config(path.to_str());
    assert!(!config.browser.headless);
    assert_eq!(config.submit.timeout_ms, 10_000);
}

#[test]
fn config_malformed_yaml_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "submit: [not, a, map").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.submit.idle_wait_ms, 500);
}
