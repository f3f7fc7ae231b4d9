use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("konto")
        .about("Konto identity core client")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("core-url")
                .short('c')
                .long("core-url")
                .help("Core base URL, example: https://konto.example.com/api/auth")
                .env("KONTO_CORE_URL")
                .required(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("KONTO_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("otp")
                .about("Email OTP flows")
                .subcommand_required(true)
                .subcommand(
                    Command::new("send")
                        .about("Ask the core to mail a one-time code")
                        .arg(
                            Arg::new("email")
                                .help("Recipient address")
                                .required(true),
                        )
                        .arg(
                            Arg::new("type")
                                .short('t')
                                .long("type")
                                .help("Purpose: email-verification, sign-in or forget-password")
                                .default_value("email-verification"),
                        ),
                )
                .subcommand(
                    Command::new("verify")
                        .about("Verify an email with a received code")
                        .arg(
                            Arg::new("email")
                                .help("Address the code was sent to")
                                .required(true),
                        )
                        .arg(Arg::new("code").help("One-time code").required(true)),
                ),
        )
        .subcommand(
            Command::new("session").about("Fetch and show the canonical session"),
        )
        .subcommand(
            Command::new("avatar")
                .about("Avatar uploads")
                .subcommand_required(true)
                .subcommand(
                    Command::new("upload")
                        .about("Upload an image and print its delivery URL")
                        .arg(
                            Arg::new("file")
                                .help("Path to the image")
                                .required(true)
                                .value_parser(clap::value_parser!(PathBuf)),
                        )
                        .arg(
                            Arg::new("user-id")
                                .long("user-id")
                                .help("Target account, defaults to the session's own"),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a previously uploaded avatar")
                        .arg(
                            Arg::new("image-id")
                                .help("Identifier returned by upload")
                                .required(true),
                        ),
                ),
        )
}
