//! The installer driven end to end by a scripted recipe server.

use recipe_kit::config::{DownloaderConfig, Options};
use recipe_kit::configurator::Configurator;
use recipe_kit::downloader::Downloader;
use recipe_kit::installer::RecipeInstaller;
use recipe_kit::lockfile::{Lock, LockEntry};
use recipe_kit::models::{Autoload, OperationKind, PackageRef};
use recipe_kit::test_utils::{ScriptedTransport, init_test_logging};
use recipe_kit::utils::RetryPolicy;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const LAST_MODIFIED: &str = "Tue, 02 Jan 2018 03:04:05 GMT";

fn installer(
    root: &Path,
    cache: &Path,
    transport: &ScriptedTransport,
) -> RecipeInstaller<ScriptedTransport> {
    let config = DownloaderConfig {
        endpoint: "https://recipes.example.org".to_string(),
        cafile: None,
        project_id: None,
        allow_contrib: false,
        repositories: Vec::new(),
        cache_dir: cache.to_path_buf(),
    };
    let downloader = Downloader::new(transport.clone(), &config)
        .with_retry_policy(RetryPolicy::new(2, Duration::ZERO));
    let lock = Lock::load(&root.join("recipes.lock")).unwrap();
    RecipeInstaller::new(downloader, Configurator::new(Options::new(root)), lock)
}

fn server_answer() -> Value {
    json!({
        "manifests": {
            "acme/console": {
                "manifest": {
                    "copy-from-recipe": {"bin/": "%BIN_DIR%/", "config/": "%CONFIG_DIR%/"},
                    "env": {"APP_DEBUG": true}
                },
                "files": {
                    "bin/console": {"contents": "#!/usr/bin/env php\n", "executable": true},
                    "config/packages/console.yaml": {"contents": "console: ~\n", "executable": false}
                },
                "ref": "c0ffee"
            }
        }
    })
}

fn bundle(root: &Path, operation: OperationKind) -> PackageRef {
    let install_path = root.join("vendor/acme/debug-bundle");
    fs::create_dir_all(install_path.join("src")).unwrap();
    fs::write(install_path.join("src/AcmeDebugBundle.php"), "<?php\n").unwrap();
    PackageRef::new("acme/debug-bundle", operation, "3.2.0")
        .with_package_type("symfony-bundle")
        .with_install_path(install_path)
        .with_autoload(Autoload {
            psr4: vec![
                ("Acme\\DebugBundle\\Tests\\".to_string(), "tests/".to_string()),
                ("Acme\\DebugBundle\\".to_string(), "src/".to_string()),
            ],
            psr0: Vec::new(),
        })
}

#[tokio::test]
async fn test_batch_install_then_removal() {
    init_test_logging(None);
    let root = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let transport = ScriptedTransport::new();
    transport.push_json(200, server_answer());
    transport.push_json(200, server_answer());

    let mut installer = installer(root.path(), cache.path(), &transport);
    let report = installer
        .apply(&[
            PackageRef::new("acme/console", OperationKind::Install, "1.4.0"),
            bundle(root.path(), OperationKind::Install),
        ])
        .await
        .unwrap();

    assert_eq!(report.configured, vec!["acme/console", "acme/debug-bundle"]);
    assert_eq!(fs::read_to_string(root.path().join("bin/console")).unwrap(), "#!/usr/bin/env php\n");
    assert!(root.path().join("config/packages/console.yaml").is_file());
    assert!(fs::read_to_string(root.path().join(".env")).unwrap().contains("APP_DEBUG=1\n"));
    assert_eq!(
        fs::read_to_string(root.path().join("config/bundles.php")).unwrap(),
        "<?php\n\nreturn [\n    Acme\\DebugBundle\\AcmeDebugBundle::class => ['all' => true],\n];\n"
    );
    assert_eq!(
        installer.lock().get("acme/console"),
        Some(&LockEntry::new("1.4.0", Some("c0ffee".to_string())))
    );

    installer
        .apply(&[
            PackageRef::new("acme/console", OperationKind::Uninstall, "1.4.0"),
            bundle(root.path(), OperationKind::Uninstall),
        ])
        .await
        .unwrap();

    assert!(!root.path().join("bin").exists());
    assert!(!root.path().join("config/packages").exists());
    assert_eq!(fs::read_to_string(root.path().join(".env")).unwrap(), "");
    assert_eq!(
        fs::read_to_string(root.path().join("config/bundles.php")).unwrap(),
        "<?php\n\nreturn [\n];\n"
    );
    assert!(installer.lock().is_empty());

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].url,
        "https://recipes.example.org/p/acme,console,i1.4.0;acme,debug-bundle,i3.2.0"
    );
    assert_eq!(
        requests[1].url,
        "https://recipes.example.org/p/acme,console,r1.4.0;acme,debug-bundle,r3.2.0"
    );
}

#[tokio::test]
async fn test_cached_recipes_survive_an_outage() {
    let root = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let transport = ScriptedTransport::new();
    transport.push_json_with_headers(200, &[("Last-Modified", LAST_MODIFIED)], server_answer());

    let package = PackageRef::new("acme/console", OperationKind::Install, "1.4.0");
    installer(root.path(), cache.path(), &transport).apply(std::slice::from_ref(&package)).await.unwrap();
    fs::remove_file(root.path().join("recipes.lock")).unwrap();

    transport.push_error("connection refused");
    transport.push_status(503);
    let mut offline = installer(root.path(), cache.path(), &transport);
    let report = offline.apply(&[package]).await.unwrap();

    assert_eq!(report.configured, vec!["acme/console"]);
    assert!(offline.downloader().is_degraded());
    assert_eq!(offline.downloader().degraded_warnings(), 1);
    assert_eq!(transport.remaining(), 0);

    let conditional = &transport.requests()[1];
    assert_eq!(conditional.header("If-Modified-Since"), Some(LAST_MODIFIED));
}
