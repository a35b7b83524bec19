use predicates::prelude::*;
use serde_json::json;

use super::common::TestProject;
use super::plant_cached_response;

#[test]
fn test_canonical_names_need_no_server() {
    let project = TestProject::new().unwrap();
    project
        .rkit()
        .args(["resolve", "acme/log", "ext-intl", "acme/log"])
        .assert()
        .success()
        .stdout("acme/log\next-intl\n");
}

#[test]
fn test_aliases_and_keywords_from_cached_tables() {
    let project = TestProject::new().unwrap();
    plant_cached_response(&project, "aliases.json", json!({"orm": "doctrine/orm", "cli": "symfony/console"}));
    plant_cached_response(
        &project,
        "versions.json",
        json!({"splits": {"symfony/console": true}, "lts": "5.4", "next": "6.1"}),
    );

    project
        .rkit()
        .args(["resolve", "orm", "cli:next", "symfony/console:lts", "doctrine/orm:^2.10"])
        .assert()
        .success()
        .stdout("doctrine/orm\nsymfony/console:^6.1@dev\nsymfony/console:^5.4\ndoctrine/orm:^2.10\n")
        .stderr(predicate::str::contains("loaded from the local cache"));
}

#[test]
fn test_unknown_alias_suggests_close_matches() {
    let project = TestProject::new().unwrap();
    plant_cached_response(&project, "aliases.json", json!({"orm": "doctrine/orm", "ormfixtures": "doctrine/doctrine-fixtures-bundle"}));

    project
        .rkit()
        .args(["resolve", "ormm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"ormm\" is not a valid alias"))
        .stderr(predicate::str::contains("Did you mean this:"))
        .stderr(predicate::str::contains("\"doctrine/orm\", supported aliases: \"orm\""));
}

#[test]
fn test_unreachable_server_without_cache_fails() {
    let project = TestProject::new().unwrap();
    project
        .rkit()
        .args(["resolve", "orm"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Could not fetch http://127.0.0.1:9/aliases.json"))
        .stderr(predicate::str::contains("RECIPES_ENDPOINT"));
}

#[test]
fn test_resolve_requires_arguments() {
    let project = TestProject::new().unwrap();
    project.rkit().arg("resolve").assert().failure();
}
