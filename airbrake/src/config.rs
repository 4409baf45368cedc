//! Provider configuration
//!
//! Values come from the provider block first and fall back to environment
//! variables. A block value that is set (even to an empty string) wins.

use std::env;

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://api.airbrake.io/api/v4/";

pub const ENV_BASE_URL: &str = "AIRBRAKE_BASE_URL";
pub const ENV_EMAIL: &str = "AIRBRAKE_EMAIL";
pub const ENV_PASSWORD: &str = "AIRBRAKE_PASSWORD";
pub const ENV_API_KEY: &str = "AIRBRAKE_API_KEY";

/// Fully resolved provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Always ends with `/`
    pub base_url: String,
    pub credentials: Credentials,
}

struct Setting {
    attribute: &'static str,
    env_var: &'static str,
    label: &'static str,
}

const BASE_URL: Setting = Setting {
    attribute: "base_url",
    env_var: ENV_BASE_URL,
    label: "base URL",
};
const EMAIL: Setting = Setting {
    attribute: "email",
    env_var: ENV_EMAIL,
    label: "user email",
};
const PASSWORD: Setting = Setting {
    attribute: "password",
    env_var: ENV_PASSWORD,
    label: "password",
};
const API_KEY: Setting = Setting {
    attribute: "api_key",
    env_var: ENV_API_KEY,
    label: "API key",
};

impl ProviderConfig {
    /// Resolve the provider block against the environment.
    ///
    /// Unknown block values and incomplete credentials are reported as
    /// attribute diagnostics; no network call happens here.
    pub fn resolve(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = vec![];

        let api_key = read_block_value(config, &API_KEY, &mut diagnostics);
        let email = read_block_value(config, &EMAIL, &mut diagnostics);
        let password = read_block_value(config, &PASSWORD, &mut diagnostics);
        let base_url = read_block_value(config, &BASE_URL, &mut diagnostics);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let api_key = api_key.unwrap_or_else(|| from_env(&API_KEY));
        let email = email.unwrap_or_else(|| from_env(&EMAIL));
        let password = password.unwrap_or_else(|| from_env(&PASSWORD));
        let base_url = base_url
            .or_else(|| Some(from_env(&BASE_URL)).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if api_key.is_empty() && (email.is_empty() || password.is_empty()) {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Airbrake credentials",
                    format!(
                        "Set api_key, or both email and password, in the provider block or via {}, {} and {}. \
                         If they are already set, ensure the values are not empty.",
                        ENV_API_KEY, ENV_EMAIL, ENV_PASSWORD
                    ),
                )
                .with_attribute(AttributePath::new(API_KEY.attribute)),
            );
            return Err(diagnostics);
        }

        Ok(Self {
            base_url: with_trailing_slash(base_url),
            credentials: Credentials {
                email,
                password,
                api_key,
            },
        })
    }
}

/// `Some` when the block sets the attribute, `None` when it is absent or null
fn read_block_value(
    config: &DynamicValue,
    setting: &Setting,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let path = AttributePath::new(setting.attribute);
    match config.get(&path) {
        None | Some(Dynamic::Null) => None,
        Some(Dynamic::String(value)) => Some(value.clone()),
        Some(value) if value.is_unknown() => {
            diagnostics.push(
                Diagnostic::error(
                    format!("Unknown Airbrake {}", setting.label),
                    format!(
                        "The provider cannot create the Airbrake API client because the {} is not known yet. \
                         Apply the source of the value first, set it statically in the configuration, \
                         or use the {} environment variable.",
                        setting.label, setting.env_var
                    ),
                )
                .with_attribute(path),
            );
            None
        }
        Some(_) => {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid Airbrake {}", setting.label),
                    format!("{} must be a string", setting.attribute),
                )
                .with_attribute(path),
            );
            None
        }
    }
}

fn from_env(setting: &Setting) -> String {
    env::var(setting.env_var).unwrap_or_default()
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
