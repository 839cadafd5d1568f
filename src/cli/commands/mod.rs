pub mod identity;
pub mod logging;
pub mod session;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("gatehouse")
        .about("Session gate and token exchange for the back office")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEHOUSE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = identity::with_args(command);
    let command = session::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED_ENV: [&str; 3] = [
        "GATEHOUSE_IDENTITY_URL",
        "GATEHOUSE_ANON_KEY",
        "GATEHOUSE_SERVICE_KEY",
    ];

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "gatehouse");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Session gate and token exchange for the back office".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_port_and_identity() {
        temp_env::with_vars(REQUIRED_ENV.map(|key| (key, None::<&str>)), || {
            let matches = new().get_matches_from(vec![
                "gatehouse",
                "--port",
                "9090",
                "--identity-url",
                "https://project.example.co",
                "--anon-key",
                "anon",
                "--service-key",
                "service",
            ]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
            assert_eq!(
                matches
                    .get_one::<String>(identity::ARG_IDENTITY_URL)
                    .map(String::as_str),
                Some("https://project.example.co")
            );
        });
    }

    #[test]
    fn test_identity_url_required() {
        temp_env::with_vars(REQUIRED_ENV.map(|key| (key, None::<&str>)), || {
            let result = new().try_get_matches_from(vec!["gatehouse"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_env_configuration() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", Some("8443")),
                ("GATEHOUSE_IDENTITY_URL", Some("https://project.example.co")),
                ("GATEHOUSE_ANON_KEY", Some("anon")),
                ("GATEHOUSE_SERVICE_KEY", Some("service")),
            ],
            || {
                let matches = new().get_matches_from(vec!["gatehouse"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8443));
            },
        );
    }
}
