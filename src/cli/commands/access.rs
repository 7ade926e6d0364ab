//! Identity and ownership flags: which caller credential is trusted and how
//! owner-scoped mutations report a miss.

use clap::{builder::BoolishValueParser, Arg, ArgAction, Command};

use crate::api::gate::GatePolicy;

pub const ARG_GATE_POLICY: &str = "gate-policy";
pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_STRICT_OWNERSHIP: &str = "strict-ownership";
pub const ARG_ALLOWED_ORIGIN: &str = "allowed-origin";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GATE_POLICY)
                .long(ARG_GATE_POLICY)
                .help("Caller identity source: header (X-User-Id) or token (Authorization: Bearer)")
                .env("COMICFORGE_GATE_POLICY")
                .default_value("header")
                .value_parser(clap::value_parser!(GatePolicy)),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC key for session tokens, required with --gate-policy token")
                .long_help(
                    "HMAC key for session tokens. Required with --gate-policy token. Without it a random key is generated per process, so tokens do not survive a restart.",
                )
                .env("COMICFORGE_TOKEN_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_STRICT_OWNERSHIP)
                .long(ARG_STRICT_OWNERSHIP)
                .help("Return 404 when an archive or remove matches none of the caller's rows")
                .env("COMICFORGE_STRICT_OWNERSHIP")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_ALLOWED_ORIGIN)
                .long(ARG_ALLOWED_ORIGIN)
                .help("Only allow this CORS origin, e.g. https://comicforge.dev (default: any)")
                .env("COMICFORGE_ALLOWED_ORIGIN"),
        )
}
