use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use qms_sdk::{FingerprintMode, FingerprintScope};

#[derive(Parser)]
#[command(
    name = "qms",
    about = "Tamper-evident manufacturing batch records on a ledger node",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML config file (defaults to ./qms.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
#[command(rename_all = "snake_case")]
pub enum Command {
    /// Create a new batch record
    CreateBatch(CreateBatchArgs),
    /// Append a QC test result with a precomputed data hash
    AppendQcTestWithHash(QcHashArgs),
    /// Append a QC test result, hashing its raw data file
    AppendQcTestWithFile(QcFileArgs),
    /// Set the release status (pending, released, hold)
    UpdateReleaseStatus(StatusArgs),
    /// Change the expiration date
    UpdateExpirationDate(DateArgs),
    /// Append a deviation id
    AppendDeviation(IdArgs),
    /// Append a CAPA id
    AppendCapa(IdArgs),
    /// Append an OOS investigation id
    AppendOos(IdArgs),
    /// Show the current record as JSON
    GetFullBatchRecord(KeyArgs),
    /// Show the current record in readable form
    PrintFullBatchRecord(KeyArgs),
    /// Show every version of a batch record
    GetBatchHistory(KeyArgs),
    /// Show field changes between consecutive versions
    GetBatchChanges(KeyArgs),
    /// List every key on the stream
    ListAllBatches,
    /// Find batches expiring in YYYY, YYYY-MM, or YYYY-MM-DD
    GetBatchesByExpiration(ExpirationArgs),
    GetReleaseStatus(KeyArgs),
    GetExpirationDate(KeyArgs),
    GetManufactureDate(KeyArgs),
    GetQcTests(KeyArgs),
    GetDeviations(KeyArgs),
    GetCapa(KeyArgs),
    GetOosInvestigations(KeyArgs),
    /// Compute a fingerprint of the current record
    Fingerprint(FingerprintArgs),
    /// Compare the current record with a fingerprint (scope:mode:hex)
    VerifyFingerprint(VerifyFingerprintArgs),
    /// Compute a fingerprint and publish it on the batch's stream
    RecordFingerprint(FingerprintArgs),
    /// Check every published fingerprint against the current record
    VerifyRecordedFingerprints(KeyArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    pub batch_key: String,
}

#[derive(Args)]
pub struct CreateBatchArgs {
    pub batch_key: String,
    /// YYYY-MM-DD
    pub manufacture_date: String,
    /// YYYY-MM-DD
    pub expiration_date: String,
}

#[derive(Args)]
pub struct QcHashArgs {
    pub batch_key: String,
    pub test_name: String,
    pub test_result: String,
    pub test_hash: String,
}

#[derive(Args)]
pub struct QcFileArgs {
    pub batch_key: String,
    pub test_name: String,
    pub test_result: String,
    pub file_path: PathBuf,
}

#[derive(Args)]
pub struct StatusArgs {
    pub batch_key: String,
    pub new_status: String,
}

#[derive(Args)]
pub struct DateArgs {
    pub batch_key: String,
    pub new_expiration_date: String,
}

#[derive(Args)]
pub struct IdArgs {
    pub batch_key: String,
    pub id: String,
}

#[derive(Args)]
pub struct ExpirationArgs {
    pub expiration: String,
}

#[derive(Args)]
pub struct FingerprintArgs {
    pub batch_key: String,
    #[arg(long, default_value = "record")]
    pub scope: FingerprintScope,
    #[arg(long, default_value = "order-dependent")]
    pub mode: FingerprintMode,
}

#[derive(Args)]
pub struct VerifyFingerprintArgs {
    pub batch_key: String,
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create_batch() {
        let cli = Cli::try_parse_from(["qms", "create_batch", "BATCH123", "2023-10-01", "2025-10-01"])
            .unwrap();
        if let Command::CreateBatch(args) = cli.command {
            assert_eq!(args.batch_key, "BATCH123");
            assert_eq!(args.manufacture_date, "2023-10-01");
            assert_eq!(args.expiration_date, "2025-10-01");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_qc_with_file() {
        let cli = Cli::try_parse_from([
            "qms", "append_qc_test_with_file", "B1", "Sterility Test", "Pass", "/data/run.csv",
        ])
        .unwrap();
        if let Command::AppendQcTestWithFile(args) = cli.command {
            assert_eq!(args.test_name, "Sterility Test");
            assert_eq!(args.file_path, PathBuf::from("/data/run.csv"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_snake_case_getters() {
        for name in [
            "get_full_batch_record",
            "print_full_batch_record",
            "get_batch_history",
            "get_batch_changes",
            "get_release_status",
            "get_expiration_date",
            "get_manufacture_date",
            "get_qc_tests",
            "get_deviations",
            "get_capa",
            "get_oos_investigations",
            "verify_recorded_fingerprints",
        ] {
            assert!(Cli::try_parse_from(["qms", name, "B1"]).is_ok(), "{name}");
        }
    }

    #[test]
    fn parse_list_all_batches() {
        let cli = Cli::try_parse_from(["qms", "list_all_batches"]).unwrap();
        assert!(matches!(cli.command, Command::ListAllBatches));
    }

    #[test]
    fn parse_fingerprint_defaults() {
        let cli = Cli::try_parse_from(["qms", "fingerprint", "B1"]).unwrap();
        if let Command::Fingerprint(args) = cli.command {
            assert_eq!(args.scope, FingerprintScope::Record);
            assert_eq!(args.mode, FingerprintMode::OrderDependent);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_fingerprint_options() {
        let cli = Cli::try_parse_from([
            "qms", "record_fingerprint", "B1", "--scope", "qc_tests", "--mode", "order-independent",
        ])
        .unwrap();
        if let Command::RecordFingerprint(args) = cli.command {
            assert_eq!(args.scope, FingerprintScope::QcTests);
            assert_eq!(args.mode, FingerprintMode::OrderIndependent);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn reject_unknown_scope() {
        assert!(Cli::try_parse_from(["qms", "fingerprint", "B1", "--scope", "everything"]).is_err());
    }

    #[test]
    fn missing_positional_is_rejected() {
        assert!(Cli::try_parse_from(["qms", "append_capa", "B1"]).is_err());
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "qms", "get_capa", "B1", "--format", "json", "--verbose", "--config", "/etc/qms.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/qms.toml")));
    }
}
