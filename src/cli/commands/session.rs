use crate::{
    api::{
        GatePolicy, PathAccess, PathMatching,
        gate::{DEFAULT_LANDING_PATH, DEFAULT_LOGIN_PATH},
    },
    session::CookieSameSite,
};
use clap::{Arg, ArgMatches, Command, builder::PossibleValuesParser};

pub const ARG_RESET_REDIRECT_URL: &str = "reset-redirect-url";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_COOKIE_SAME_SITE: &str = "cookie-same-site";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_LANDING_PATH: &str = "landing-path";
pub const ARG_GATE_MATCHING: &str = "gate-matching";
pub const ARG_ALLOWED_ORIGIN: &str = "allowed-origin";

const PRODUCTION: &str = "production";

#[derive(Debug)]
pub struct Options {
    pub reset_redirect_url: String,
    pub environment: String,
    pub same_site: CookieSameSite,
    pub login_path: String,
    pub landing_path: String,
    pub matching: PathMatching,
    pub allowed_origin: Option<String>,
}

impl Options {
    /// Parse session and gate arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a path does not start with `/`, a value is unknown,
    /// or the landing page is guest-only (signed-in visitors would loop).
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let path = |id: &str, default: &str| -> anyhow::Result<String> {
            let value = get_non_empty(id).unwrap_or_else(|| default.to_string());
            if value.starts_with('/') {
                Ok(value)
            } else {
                anyhow::bail!("--{id} must start with '/': {value}")
            }
        };

        let same_site = get_non_empty(ARG_COOKIE_SAME_SITE).unwrap_or_else(|| "lax".to_string());
        let same_site = CookieSameSite::parse(&same_site)
            .ok_or_else(|| anyhow::anyhow!("invalid --{ARG_COOKIE_SAME_SITE}: {same_site}"))?;

        let matching = get_non_empty(ARG_GATE_MATCHING).unwrap_or_else(|| "prefix".to_string());
        let matching = PathMatching::parse(&matching)
            .ok_or_else(|| anyhow::anyhow!("invalid --{ARG_GATE_MATCHING}: {matching}"))?;

        let login_path = path(ARG_LOGIN_PATH, DEFAULT_LOGIN_PATH)?;
        let landing_path = path(ARG_LANDING_PATH, DEFAULT_LANDING_PATH)?;
        let gate = GatePolicy::new(login_path.clone(), landing_path.clone()).with_matching(matching);
        if gate.classify(&landing_path) == PathAccess::GuestOnly {
            anyhow::bail!(
                "--{ARG_LANDING_PATH} {landing_path} is guest-only, signed-in visitors would be redirected forever"
            );
        }

        Ok(Self {
            reset_redirect_url: get_non_empty(ARG_RESET_REDIRECT_URL)
                .unwrap_or_else(|| DEFAULT_LANDING_PATH.to_string()),
            environment: get_non_empty(ARG_ENVIRONMENT)
                .unwrap_or_else(|| "development".to_string())
                .to_lowercase(),
            same_site,
            login_path,
            landing_path,
            matching,
            allowed_origin: get_non_empty(ARG_ALLOWED_ORIGIN),
        })
    }

    /// Cookies are only marked `Secure` in production.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.environment == PRODUCTION
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESET_REDIRECT_URL)
                .long(ARG_RESET_REDIRECT_URL)
                .help("Where email links land after a successful exchange")
                .env("GATEHOUSE_RESET_REDIRECT_URL")
                .default_value(DEFAULT_LANDING_PATH),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment, `production` enables Secure cookies")
                .env("GATEHOUSE_ENV")
                .default_value("development"),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAME_SITE)
                .long(ARG_COOKIE_SAME_SITE)
                .help("SameSite attribute of the session cookies (`none` forces Secure)")
                .env("GATEHOUSE_COOKIE_SAME_SITE")
                .default_value("lax")
                .ignore_case(true)
                .value_parser(PossibleValuesParser::new(["strict", "lax", "none"])),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Login page visitors without a session are sent to")
                .env("GATEHOUSE_LOGIN_PATH")
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_LANDING_PATH)
                .long(ARG_LANDING_PATH)
                .help("Landing page signed-in visitors are sent to from guest-only pages")
                .env("GATEHOUSE_LANDING_PATH")
                .default_value(DEFAULT_LANDING_PATH),
        )
        .arg(
            Arg::new(ARG_GATE_MATCHING)
                .long(ARG_GATE_MATCHING)
                .help("How allow-list prefixes match: `prefix` (starts_with) or `segment` (path boundary)")
                .env("GATEHOUSE_GATE_MATCHING")
                .default_value("prefix")
                .ignore_case(true)
                .value_parser(PossibleValuesParser::new(["prefix", "segment"])),
        )
        .arg(
            Arg::new(ARG_ALLOWED_ORIGIN)
                .long(ARG_ALLOWED_ORIGIN)
                .help("Frontend origin allowed to call the API with credentials (CORS disabled when unset)")
                .env("GATEHOUSE_ALLOWED_ORIGIN"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let vars: [(&str, Option<&str>); 7] = [
            ("GATEHOUSE_RESET_REDIRECT_URL", None),
            ("GATEHOUSE_ENV", None),
            ("GATEHOUSE_COOKIE_SAME_SITE", None),
            ("GATEHOUSE_LOGIN_PATH", None),
            ("GATEHOUSE_LANDING_PATH", None),
            ("GATEHOUSE_GATE_MATCHING", None),
            ("GATEHOUSE_ALLOWED_ORIGIN", None),
        ];
        temp_env::with_vars(vars, || {
            let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
            let options = Options::parse(&matches)?;
            assert_eq!(options.reset_redirect_url, "/dashboard");
            assert_eq!(options.same_site, CookieSameSite::Lax);
            assert_eq!(options.login_path, "/login");
            assert_eq!(options.landing_path, "/dashboard");
            assert_eq!(options.matching, PathMatching::Prefix);
            assert_eq!(options.allowed_origin, None);
            assert!(!options.secure_cookies());
            Ok(())
        })
    }

    #[test]
    fn production_from_env() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("GATEHOUSE_ENV", Some("Production")),
                ("GATEHOUSE_COOKIE_SAME_SITE", Some("strict")),
                ("GATEHOUSE_GATE_MATCHING", Some("segment")),
            ],
            || {
                let matches = with_args(Command::new("test")).get_matches_from(vec!["test"]);
                let options = Options::parse(&matches)?;
                assert!(options.secure_cookies());
                assert_eq!(options.same_site, CookieSameSite::Strict);
                assert_eq!(options.matching, PathMatching::Segment);
                Ok(())
            },
        )
    }

    #[test]
    fn relative_paths_are_rejected() {
        temp_env::with_var("GATEHOUSE_LOGIN_PATH", None::<&str>, || {
            let matches = with_args(Command::new("test"))
                .get_matches_from(vec!["test", "--login-path", "login"]);
            let result = Options::parse(&matches);
            assert!(result.is_err());
        });
    }

    #[test]
    fn choices_ignore_case() -> anyhow::Result<()> {
        temp_env::with_vars(
            [
                ("GATEHOUSE_COOKIE_SAME_SITE", Some("Lax")),
                ("GATEHOUSE_GATE_MATCHING", Some("SEGMENT")),
            ],
            || {
                let matches = with_args(Command::new("test")).try_get_matches_from(vec!["test"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.same_site, CookieSameSite::Lax);
                assert_eq!(options.matching, PathMatching::Segment);
                Ok(())
            },
        )
    }

    #[test]
    fn guest_only_landing_path_is_rejected() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_LOGIN_PATH", None::<&str>),
                ("GATEHOUSE_LANDING_PATH", None),
                ("GATEHOUSE_GATE_MATCHING", None),
            ],
            || {
                for landing in ["/login", "/register/done", "/entrar"] {
                    let matches = with_args(Command::new("test")).get_matches_from(vec![
                        "test",
                        "--login-path",
                        "/entrar",
                        "--landing-path",
                        landing,
                    ]);
                    let result = Options::parse(&matches);
                    assert!(result.is_err(), "{landing}");
                }

                let matches = with_args(Command::new("test"))
                    .get_matches_from(vec!["test", "--landing-path", "/facturas"]);
                assert!(Options::parse(&matches).is_ok());
            },
        );
    }

    #[test]
    fn invalid_same_site_is_refused_by_clap() {
        temp_env::with_var("GATEHOUSE_COOKIE_SAME_SITE", None::<&str>, || {
            let result = with_args(Command::new("test"))
                .try_get_matches_from(vec!["test", "--cookie-same-site", "sometimes"]);
            assert!(result.is_err());
        });
    }
}
