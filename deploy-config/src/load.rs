use config::{Environment as EnvironmentSource, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory which contains the layered configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// File which contains the settings shared by all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable overrides, e.g. `APP_APPLICATION__PORT=5000`.
const ENV_VAR_PREFIX: &str = "APP";

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("an io error occurred while loading the config: {0}")]
    Io(#[from] std::io::Error),

    #[error("the configuration could not be built: {0}")]
    Config(#[from] config::ConfigError),
}

/// Marker trait for top-level configuration structs.
///
/// `LIST_PARSE_KEYS` names the keys whose environment variable override is a
/// comma-separated list rather than a scalar value.
pub trait Config: DeserializeOwned {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

/// Loads the configuration for the current [`Environment`].
///
/// Settings are read from `configuration/base.yaml`, then from the
/// environment-specific file (e.g. `configuration/prod.yaml`), and finally
/// from `APP_`-prefixed environment variables, with later sources overriding
/// earlier ones. Nested fields are addressed with a `__` separator.
pub fn load_config<C: Config>() -> Result<C, LoadConfigError> {
    let environment = Environment::load()?;

    let configuration_directory = std::env::current_dir()?.join(CONFIGURATION_DIR);
    let environment_file = format!("{environment}.yaml");

    let mut env_source = EnvironmentSource::with_prefix(ENV_VAR_PREFIX)
        .prefix_separator("_")
        .separator("__");
    if !C::LIST_PARSE_KEYS.is_empty() {
        env_source = env_source.try_parsing(true).list_separator(",");
        for key in C::LIST_PARSE_KEYS {
            env_source = env_source.with_list_parse_key(key);
        }
    }

    let settings = config::Config::builder()
        .add_source(File::from(configuration_directory.join(BASE_CONFIG_FILE)).required(false))
        .add_source(File::from(configuration_directory.join(environment_file)).required(false))
        .add_source(env_source)
        .build()?;

    Ok(settings.try_deserialize::<C>()?)
}
