//! Map parsed CLI arguments to the action the binary runs.

use crate::api::gate::GatePolicy;
use crate::cli::{
    actions::{server::Args, Action},
    commands::{access, ARG_MAX_CONNECTIONS},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let globals = GlobalArgs {
        gate_policy: matches
            .get_one::<GatePolicy>(access::ARG_GATE_POLICY)
            .copied()
            .unwrap_or_default(),
        token_secret: matches
            .get_one::<String>(access::ARG_TOKEN_SECRET)
            .cloned()
            .map(SecretString::from),
        strict_ownership: matches.get_flag(access::ARG_STRICT_OWNERSHIP),
        allowed_origin: matches.get_one::<String>(access::ARG_ALLOWED_ORIGIN).cloned(),
        max_connections: matches
            .get_one::<u32>(ARG_MAX_CONNECTIONS)
            .copied()
            .unwrap_or(5),
    };

    globals.validate()?;

    Ok(Action::Server(Args { port, dsn, globals }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OwnershipMode;

    fn matches_from(args: &[&str]) -> clap::ArgMatches {
        crate::cli::commands::new().get_matches_from(args.iter().copied())
    }

    #[test]
    fn token_policy_without_secret_is_rejected() {
        temp_env::with_vars(
            [
                ("COMICFORGE_TOKEN_SECRET", None::<&str>),
                ("COMICFORGE_GATE_POLICY", None::<&str>),
            ],
            || {
                let matches = matches_from(&[
                    "comicforge",
                    "--dsn",
                    "postgres://localhost/comicforge",
                    "--gate-policy",
                    "token",
                ]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --token-secret"));
                }
            },
        );
    }

    #[test]
    fn server_action_carries_configuration() -> Result<()> {
        temp_env::with_vars(
            [
                ("COMICFORGE_TOKEN_SECRET", None::<&str>),
                ("COMICFORGE_GATE_POLICY", None::<&str>),
                ("COMICFORGE_STRICT_OWNERSHIP", None::<&str>),
                ("COMICFORGE_PORT", None::<&str>),
            ],
            || {
                let matches = matches_from(&[
                    "comicforge",
                    "--dsn",
                    "postgres://localhost/comicforge",
                    "--gate-policy",
                    "token",
                    "--token-secret",
                    "k",
                    "--strict-ownership",
                ]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://localhost/comicforge");
                assert_eq!(args.globals.gate_policy, GatePolicy::Token);

                let config = args.globals.api_config()?;
                assert_eq!(config.ownership, OwnershipMode::Strict);
                Ok(())
            },
        )
    }
}
