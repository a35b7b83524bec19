use predicates::prelude::*;
use serde_json::json;

use super::common::TestProject;
use super::plant_cached_response;

const INSTALLED: &str = r#"{
    "packages": [
        {"name": "acme/log", "version": "1.0.0", "type": "library", "install-path": "../acme/log"},
        {"name": "acme/mailer", "version": "2.0.0", "type": "library", "install-path": "../acme/mailer"}
    ]
}"#;

fn locked_project(packages: &[&str]) -> TestProject {
    let project = TestProject::new().unwrap();
    let entries: Vec<_> = packages.iter().map(|name| json!({"name": name})).collect();
    project
        .write("composer.json", r#"{"name": "acme/app", "extra": {"recipes": {"docker": false}}}"#)
        .unwrap();
    project
        .write("composer.lock", &json!({"packages": entries, "packages-dev": []}).to_string())
        .unwrap();
    project
}

#[test]
fn test_nothing_to_sync() {
    let project = locked_project(&["acme/log"]);
    project.write("recipes.lock", r#"{"acme/log": {"version": "1.0.0"}}"#).unwrap();

    project
        .rkit()
        .arg("sync-recipes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to sync"));
}

#[test]
fn test_missing_package_fails_before_any_change() {
    let project = locked_project(&["acme/log", "acme/ghost"]);
    project.write("vendor/composer/installed.json", INSTALLED).unwrap();

    project
        .rkit()
        .arg("sync-recipes")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Package acme/ghost is not installed"));
    assert!(!project.exists("recipes.lock"));
}

#[test]
fn test_applies_cached_recipes_in_degraded_mode() {
    let project = locked_project(&["acme/log", "acme/mailer"]);
    project.write("vendor/composer/installed.json", INSTALLED).unwrap();
    project.write("recipes.lock", r#"{"acme/log": {"version": "1.0.0"}}"#).unwrap();
    project.write(".env", "APP_ENV=dev\n").unwrap();
    plant_cached_response(
        &project,
        "p/acme,mailer,i2.0.0",
        json!({
            "manifests": {
                "acme/mailer": {
                    "manifest": {
                        "env": {"#1": "Mailer transport", "MAILER_DSN": "null://null"},
                        "makefile": ["mail:", "\t@%BIN_DIR%/console mailer:test"]
                    },
                    "ref": "0a1b2c3d"
                }
            }
        }),
    );

    project
        .rkit()
        .arg("sync-recipes")
        .assert()
        .success()
        .stdout(predicate::str::contains("configured acme/mailer"))
        .stderr(predicate::str::contains("loaded from the local cache"));

    assert_eq!(
        project.read(".env").unwrap(),
        "APP_ENV=dev\n\n###> acme/mailer ###\n# Mailer transport\nMAILER_DSN=null://null\n###< acme/mailer ###\n"
    );
    assert_eq!(
        project.read("Makefile").unwrap(),
        "\n###> acme/mailer ###\nmail:\n\t@bin/console mailer:test\n###< acme/mailer ###\n"
    );

    let lock: serde_json::Value =
        serde_json::from_str(&project.read("recipes.lock").unwrap()).unwrap();
    assert_eq!(lock["acme/mailer"], json!({"version": "2.0.0", "ref": "0a1b2c3d"}));
    assert_eq!(lock["acme/log"], json!({"version": "1.0.0"}));

    // A second run finds nothing left to do.
    project
        .rkit()
        .arg("fix-recipes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to sync"));
}

#[test]
fn test_force_without_server_or_cache_fails() {
    let project = locked_project(&["acme/log"]);
    project.write("vendor/composer/installed.json", INSTALLED).unwrap();
    project.write("recipes.lock", r#"{"acme/log": {"version": "1.0.0"}}"#).unwrap();

    project
        .rkit()
        .args(["sync-recipes", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not fetch"));
    assert_eq!(
        project.read("recipes.lock").unwrap(),
        r#"{"acme/log": {"version": "1.0.0"}}"#
    );
}

#[test]
fn test_missing_host_lock_is_reported() {
    let project = TestProject::new().unwrap();
    project
        .rkit()
        .arg("sync-recipes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("composer.lock"));
}
