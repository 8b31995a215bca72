use serde::Deserialize;

use crate::error::Error;
use crate::smtp::{AuthMechanism, Security};

pub const DEFAULT_PATH: &str = "/etc/mailutil/mailutil.toml";
const ENV_PREFIX: &str = "MAILUTIL";

/// Defaults for the command-line sender. Every field can be overridden
/// by a flag.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub server: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default)]
    pub security: Security,

    pub mechanism: Option<AuthMechanism>,
}

/// Loads settings from a TOML file and merges them with any environment
/// variables prefixed with MAILUTIL_ (e.g., MAILUTIL_SERVER).
///
/// The file is optional when `path` is not given; an explicitly requested
/// file must exist.
pub fn load_settings(path: Option<&str>) -> Result<Settings, Error> {
    let mut settings = config::Config::default();

    let file = match path {
        Some(path) => config::File::with_name(path).required(true),
        None => config::File::with_name(DEFAULT_PATH).required(false),
    };

    settings
        .merge(file)?
        .merge(config::Environment::with_prefix(ENV_PREFIX))?;

    Ok(settings.try_into::<Settings>()?)
}
