use std::process::ExitCode;

use clap::Parser;
use qms_sdk::{ErrorKind, LedgerError, SdkError, TypeError};
use tracing::Level;

mod cli;
mod commands;
mod config;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match commands::run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = error_kind(&err);
            eprintln!("{kind}: {err:#}");
            ExitCode::from(kind.exit_code())
        }
    }
}

fn error_kind(err: &anyhow::Error) -> ErrorKind {
    if let Some(err) = err.downcast_ref::<SdkError>() {
        err.kind()
    } else if let Some(err) = err.downcast_ref::<LedgerError>() {
        err.kind()
    } else if err.downcast_ref::<config::ConfigError>().is_some() {
        ErrorKind::Config
    } else if err.downcast_ref::<TypeError>().is_some() {
        ErrorKind::Validation
    } else {
        ErrorKind::Io
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_keep_their_kind() {
        let err = anyhow::Error::new(LedgerError::NotFound("B1".into()));
        assert_eq!(error_kind(&err), ErrorKind::NotFound);
        let err = anyhow::Error::new(LedgerError::Connection("refused".into()));
        assert_eq!(error_kind(&err), ErrorKind::Connection);
    }

    #[test]
    fn untyped_errors_are_not_reported_as_connection_failures() {
        let err = anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(error_kind(&err), ErrorKind::Io);
        assert_eq!(error_kind(&err).exit_code(), 1);
    }
}
