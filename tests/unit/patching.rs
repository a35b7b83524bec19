//! Several recipes sharing the same project files.

use recipe_kit::config::Options;
use recipe_kit::configurator::Configurator;
use recipe_kit::configurator::markers::{self, MarkerStyle};
use recipe_kit::models::{OperationKind, PackageRef, Recipe};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FILES: [(&str, &str); 6] = [
    (".env.dist", "# defaults\nAPP_ENV=dev\nAPP_SECRET=\n"),
    (".env", "APP_ENV=dev\nAPP_SECRET=s3cr3t\n"),
    (
        "phpunit.xml.dist",
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<phpunit bootstrap=\"vendor/autoload.php\">\n    <php>\n        <ini name=\"error_reporting\" value=\"-1\" />\n    </php>\n</phpunit>\n",
    ),
    (
        "docker-compose.yml",
        "version: '3.4'\n\nservices:\n  app:\n    build: .\n\nnetworks:\n  default:\n    name: app\n",
    ),
    (
        "config/services.yaml",
        "parameters:\n    locale: en\n\nservices:\n    _defaults:\n        autowire: true\n",
    ),
    ("Makefile", "all:\n\t@echo all\n"),
];

fn recipe(name: &str, manifest: Value) -> Recipe {
    let package = PackageRef::new(name, OperationKind::Install, "1.0.0");
    let manifest: Map<String, Value> = serde_json::from_value(manifest).unwrap();
    Recipe::with_manifest(&package, manifest)
}

fn database() -> Recipe {
    recipe(
        "acme/database",
        json!({
            "env": {"#1": "Database connection", "DATABASE_URL": "postgresql://app@db:5432/app"},
            "docker-compose": {
                "services": ["db:", "  image: postgres:16-alpine", "  volumes:", "    - db-data:/var/lib/postgresql/data"],
                "volumes": ["db-data: {}"]
            },
            "container": {"database.charset": "utf8mb4"},
            "makefile": ["db:", "\t@%BIN_DIR%/console doctrine:database:create"]
        }),
    )
}

fn cache() -> Recipe {
    recipe(
        "acme/cache",
        json!({
            "env": {"CACHE_DSN": "redis://cache:6379", "CACHE_SECRET": "%generate(secret)%"},
            "docker-compose": {
                "docker-compose.yml": {
                    "services": ["cache:", "  image: redis:7-alpine", "  volumes:", "    - cache-data:/data"],
                    "volumes": ["cache-data: {}"]
                }
            },
            "container": {"cache.ttl": 3600, "cache.pools": ["app", "system"]}
        }),
    )
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    for (path, contents) in FILES {
        let target = temp.path().join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(target, contents).unwrap();
    }
    temp
}

fn assert_pristine(root: &Path) {
    for (path, contents) in FILES {
        assert_eq!(fs::read_to_string(root.join(path)).unwrap(), contents, "{path} was not restored");
    }
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

#[test]
fn test_reverting_in_install_order_restores_every_file() {
    let temp = project();
    let mut configurator = Configurator::new(Options::new(temp.path()).with_docker(true));

    configurator.install(&database()).unwrap();
    configurator.install(&cache()).unwrap();

    let compose = read(temp.path(), "docker-compose.yml");
    assert!(markers::is_marked(&compose, MarkerStyle::Yaml, "acme/database"));
    assert!(markers::is_marked(&compose, MarkerStyle::Yaml, "acme/cache"));
    assert!(compose.contains("\nnetworks:\n  default:\n    name: app\n"));
    assert!(read(temp.path(), "phpunit.xml.dist").contains("<!-- ###+ acme/cache ### -->"));

    configurator.unconfigure(&database()).unwrap();
    assert!(!markers::is_marked(&read(temp.path(), ".env"), MarkerStyle::Env, "acme/database"));
    assert!(markers::is_marked(&read(temp.path(), ".env"), MarkerStyle::Env, "acme/cache"));

    configurator.unconfigure(&cache()).unwrap();
    assert_pristine(temp.path());
}

#[test]
fn test_reverting_in_reverse_order_restores_every_file() {
    let temp = project();
    let mut configurator = Configurator::new(Options::new(temp.path()).with_docker(true));

    configurator.install(&database()).unwrap();
    configurator.install(&cache()).unwrap();
    configurator.unconfigure(&cache()).unwrap();
    configurator.unconfigure(&database()).unwrap();

    assert_pristine(temp.path());
}

#[test]
fn test_reinstalling_is_a_no_op() {
    let temp = project();
    let mut configurator = Configurator::new(Options::new(temp.path()).with_docker(true));

    configurator.install(&cache()).unwrap();
    let snapshot: Vec<String> = FILES.iter().map(|(path, _)| read(temp.path(), path)).collect();

    configurator.install(&cache()).unwrap();
    let again: Vec<String> = FILES.iter().map(|(path, _)| read(temp.path(), path)).collect();
    assert_eq!(snapshot, again);
}

#[test]
fn test_one_secret_shared_by_both_env_files() {
    let temp = project();
    let mut configurator = Configurator::new(Options::new(temp.path()));
    configurator.install(&cache()).unwrap();

    let secret = |path: &str| {
        read(temp.path(), path)
            .lines()
            .find_map(|line| line.strip_prefix("CACHE_SECRET=").map(str::to_string))
            .unwrap()
    };
    assert_eq!(secret(".env"), secret(".env.dist"));
    assert_eq!(secret(".env").len(), 32);
}

#[test]
fn test_docker_disabled_leaves_compose_untouched() {
    let temp = project();
    let mut configurator = Configurator::new(Options::new(temp.path()));
    configurator.install(&database()).unwrap();

    assert_eq!(read(temp.path(), "docker-compose.yml"), FILES[3].1);
    assert!(read(temp.path(), ".env").contains("DATABASE_URL=postgresql://app@db:5432/app"));
}
