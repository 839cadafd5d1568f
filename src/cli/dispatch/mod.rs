//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, currently always the
//! server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{identity, session};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let identity_opts = identity::Options::parse(matches)?;
    let session_opts = session::Options::parse(matches)?;
    let secure_cookies = session_opts.secure_cookies();

    Ok(Action::Server(Args {
        port,
        identity_url: identity_opts.url,
        anon_key: identity_opts.anon_key,
        service_key: identity_opts.service_key,
        reset_redirect_url: session_opts.reset_redirect_url,
        secure_cookies,
        same_site: session_opts.same_site,
        login_path: session_opts.login_path,
        landing_path: session_opts.landing_path,
        gate_matching: session_opts.matching,
        allowed_origin: session_opts.allowed_origin,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::PathMatching, session::CookieSameSite};

    #[test]
    fn server_args_from_env() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", Some("9000")),
                ("GATEHOUSE_IDENTITY_URL", Some("https://project.example.co")),
                ("GATEHOUSE_ANON_KEY", Some("anon")),
                ("GATEHOUSE_SERVICE_KEY", Some("service")),
                ("GATEHOUSE_ENV", Some("production")),
                ("GATEHOUSE_COOKIE_SAME_SITE", None),
                ("GATEHOUSE_GATE_MATCHING", None),
                ("GATEHOUSE_LOGIN_PATH", None),
                ("GATEHOUSE_LANDING_PATH", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["gatehouse"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 9000);
                    assert_eq!(args.identity_url, "https://project.example.co");
                    assert!(args.secure_cookies);
                    assert_eq!(args.same_site, CookieSameSite::Lax);
                    assert_eq!(args.gate_matching, PathMatching::Prefix);
                    assert_eq!(args.login_path, "/login");
                }
            },
        );
    }

    #[test]
    fn relative_landing_path_is_rejected() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_IDENTITY_URL", Some("https://project.example.co")),
                ("GATEHOUSE_ANON_KEY", Some("anon")),
                ("GATEHOUSE_SERVICE_KEY", Some("service")),
                ("GATEHOUSE_LANDING_PATH", Some("dashboard")),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["gatehouse"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err.to_string().contains("--landing-path"));
                }
            },
        );
    }
}
