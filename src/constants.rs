//! Global constants used throughout the recipe-kit codebase.
//!
//! Wire limits, retry parameters, default locations and the names of the
//! environment variables the tool reads. Keeping them in one place makes the
//! protocol-level numbers easy to audit.

use std::time::Duration;

/// Endpoint used when neither the environment, the project nor the global
/// configuration names one.
pub const DEFAULT_ENDPOINT: &str = "https://recipes.example.org";

/// Maximum byte length of one batch segment in a `/p/<batch>` request path.
pub const MAX_BATCH_SEGMENT_BYTES: usize = 1000;

/// Total number of attempts for one HTTP request, including the first one.
pub const FETCH_ATTEMPTS: usize = 3;

/// Fixed pause between two attempts of the same request.
pub const FETCH_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Header correlating every request of one process on the server side.
pub const SESSION_HEADER: &str = "Package-Session";

/// Header carrying the project identity token.
pub const PROJECT_HEADER: &str = "Project";

/// Header enabling recipes from contributed (non-official) sources.
pub const ALLOW_CONTRIB_HEADER: &str = "Allow-Contrib";

/// Header listing extra recipe repositories, `;`-separated.
pub const REPOSITORIES_HEADER: &str = "Repositories";

/// Placeholder value replaced by a fresh random secret in env payloads.
pub const GENERATE_SECRET_PLACEHOLDER: &str = "%generate(secret)%";

/// Package type whose packages get a synthesized `bundles` manifest when the
/// recipe server has no recipe for them.
pub const BUNDLE_PACKAGE_TYPE: &str = "symfony-bundle";

/// Default name of the recipe lock file, next to the host manifest.
pub const LOCK_FILE_NAME: &str = "recipes.lock";

/// Name of the host package manifest carrying project metadata.
pub const HOST_MANIFEST_NAME: &str = "composer.json";

/// Environment variable overriding the recipe endpoint.
pub const ENDPOINT_ENV: &str = "RECIPES_ENDPOINT";

/// Environment variable naming a custom CA bundle.
pub const CAFILE_ENV: &str = "RECIPES_CAFILE";

/// Environment variable overriding the lock file location.
pub const LOCKFILE_ENV: &str = "RECIPES_LOCKFILE";

/// Environment variable overriding the cache root directory.
pub const CACHE_DIR_ENV: &str = "RECIPES_CACHE_DIR";

/// Environment variable overriding the global config file location.
pub const CONFIG_PATH_ENV: &str = "RECIPES_CONFIG_PATH";

/// Docker Compose file-list variable.
pub const COMPOSE_FILE_ENV: &str = "COMPOSE_FILE";

/// Separator override for [`COMPOSE_FILE_ENV`].
pub const COMPOSE_PATH_SEPARATOR_ENV: &str = "COMPOSE_PATH_SEPARATOR";
