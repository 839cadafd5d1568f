use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_IDENTITY_URL: &str = "identity-url";
pub const ARG_ANON_KEY: &str = "anon-key";
pub const ARG_SERVICE_KEY: &str = "service-key";

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub anon_key: SecretString,
    pub service_key: SecretString,
}

impl Options {
    /// Parse identity service arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes empty env vars through, treat them as missing
        let required = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            url: required(ARG_IDENTITY_URL)?,
            anon_key: SecretString::from(required(ARG_ANON_KEY)?),
            service_key: SecretString::from(required(ARG_SERVICE_KEY)?),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDENTITY_URL)
                .long(ARG_IDENTITY_URL)
                .help("Base URL of the hosted identity and data service")
                .env("GATEHOUSE_IDENTITY_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ANON_KEY)
                .long(ARG_ANON_KEY)
                .help("Public (anon) API key, sent on calls made on behalf of visitors")
                .env("GATEHOUSE_ANON_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SERVICE_KEY)
                .long(ARG_SERVICE_KEY)
                .help("Privileged service key, used for code exchange and user administration")
                .env("GATEHOUSE_SERVICE_KEY")
                .hide_env_values(true)
                .required(true),
        )
}
