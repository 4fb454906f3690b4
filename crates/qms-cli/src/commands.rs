use std::io::Write;

use anyhow::Context;
use colored::Colorize;
use qms_sdk::{
    BatchKey, BatchRecord, BatchRegistry, Fingerprint, LedgerReader, LedgerWriter, RpcLedger,
    SdkError, WriteReceipt,
};
use serde::Serialize;
use serde_json::json;

use crate::cli::*;
use crate::config::QmsConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = QmsConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    let rpc = config.rpc_config()?;
    tracing::debug!(?rpc, "connecting to ledger node");
    let registry = BatchRegistry::with_policy(RpcLedger::new(rpc), config.transition_policy());

    let stdout = std::io::stdout();
    let mut out = Output::new(cli.format, stdout.lock());
    execute(&registry, cli.command, &mut out)
}

/// Where command results go, and in which form.
pub struct Output<W> {
    format: OutputFormat,
    w: W,
}

impl<W: Write> Output<W> {
    pub fn new(format: OutputFormat, w: W) -> Self {
        Self { format, w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(value).context("serializing output")?;
        writeln!(self.w, "{text}")?;
        Ok(())
    }

    fn line(&mut self, text: impl std::fmt::Display) -> anyhow::Result<()> {
        writeln!(self.w, "{text}")?;
        Ok(())
    }
}

pub fn execute<L, W>(
    registry: &BatchRegistry<L>,
    command: Command,
    out: &mut Output<W>,
) -> anyhow::Result<()>
where
    L: LedgerReader + LedgerWriter,
    W: Write,
{
    match command {
        Command::CreateBatch(a) => {
            let receipt =
                registry.create_batch(&a.batch_key, &a.manufacture_date, &a.expiration_date)?;
            written(out, &receipt, "Created batch")
        }
        Command::AppendQcTestWithHash(a) => {
            let receipt = registry.append_qc_test_with_hash(
                &a.batch_key,
                &a.test_name,
                &a.test_result,
                &a.test_hash,
            )?;
            written(out, &receipt, "Appended QC test to")
        }
        Command::AppendQcTestWithFile(a) => {
            let receipt = registry.append_qc_test_with_file(
                &a.batch_key,
                &a.test_name,
                &a.test_result,
                &a.file_path,
            )?;
            written(out, &receipt, "Appended QC test to")
        }
        Command::UpdateReleaseStatus(a) => {
            let receipt = registry.update_release_status(&a.batch_key, &a.new_status)?;
            written(out, &receipt, "Updated release status of")
        }
        Command::UpdateExpirationDate(a) => {
            let receipt = registry.update_expiration_date(&a.batch_key, &a.new_expiration_date)?;
            written(out, &receipt, "Updated expiration date of")
        }
        Command::AppendDeviation(a) => {
            let receipt = registry.append_deviation(&a.batch_key, &a.id)?;
            written(out, &receipt, "Appended deviation to")
        }
        Command::AppendCapa(a) => {
            let receipt = registry.append_capa(&a.batch_key, &a.id)?;
            written(out, &receipt, "Appended CAPA to")
        }
        Command::AppendOos(a) => {
            let receipt = registry.append_oos(&a.batch_key, &a.id)?;
            written(out, &receipt, "Appended OOS investigation to")
        }
        Command::GetFullBatchRecord(a) => {
            let record = registry.full_record(&a.batch_key)?;
            out.json(&record)
        }
        Command::PrintFullBatchRecord(a) => {
            let record = registry.full_record(&a.batch_key)?;
            if out.is_json() {
                out.json(&record)
            } else {
                print_record(out, &record)
            }
        }
        Command::GetBatchHistory(a) => cmd_history(registry, &a.batch_key, out),
        Command::GetBatchChanges(a) => cmd_changes(registry, &a.batch_key, out),
        Command::ListAllBatches => {
            let keys = registry.list_all_batches()?;
            if out.is_json() {
                return out.json(&keys);
            }
            if keys.is_empty() {
                return out.line("No batches found.");
            }
            out.line(format!("{} batch(es):", keys.len()))?;
            for key in keys {
                out.line(format!("  {}", key.as_str().yellow()))?;
            }
            Ok(())
        }
        Command::GetBatchesByExpiration(a) => {
            let records = registry.batches_by_expiration(&a.expiration)?;
            if out.is_json() {
                return out.json(&records);
            }
            if records.is_empty() {
                return out.line(format!("No batches expire in {}.", a.expiration));
            }
            out.line(format!("Batches expiring in {}:", a.expiration.bold()))?;
            for r in &records {
                out.line(format!(
                    "  {}  expires {}  ({})",
                    r.batch_number.as_str().yellow(),
                    r.expiration_date,
                    r.release_status
                ))?;
            }
            Ok(())
        }
        Command::GetReleaseStatus(a) => {
            let status = registry.release_status(&a.batch_key)?;
            scalar(out, "release_status", status)
        }
        Command::GetExpirationDate(a) => {
            let date = registry.expiration_date(&a.batch_key)?;
            scalar(out, "expiration_date", date)
        }
        Command::GetManufactureDate(a) => {
            let date = registry.manufacture_date(&a.batch_key)?;
            scalar(out, "manufacture_date", date)
        }
        Command::GetQcTests(a) => {
            let tests = registry.qc_tests(&a.batch_key)?;
            if out.is_json() {
                return out.json(&tests);
            }
            if tests.is_empty() {
                return out.line("No QC tests have been recorded.");
            }
            for t in &tests {
                out.line(format!("  - {}: {}", t.test_name.bold(), t.test_result))?;
                out.line(format!("    hash {}", t.test_hash.dimmed()))?;
            }
            Ok(())
        }
        Command::GetDeviations(a) => {
            let ids = registry.deviations(&a.batch_key)?;
            id_list(out, &ids, "No deviations recorded.")
        }
        Command::GetCapa(a) => {
            let ids = registry.capa(&a.batch_key)?;
            id_list(out, &ids, "No CAPA records found.")
        }
        Command::GetOosInvestigations(a) => {
            let ids = registry.oos_investigations(&a.batch_key)?;
            id_list(out, &ids, "No OOS investigations recorded.")
        }
        Command::Fingerprint(a) => {
            let fingerprint = registry.fingerprint(&a.batch_key, a.scope, a.mode)?;
            if out.is_json() {
                out.json(&fingerprint)
            } else {
                out.line(fingerprint)
            }
        }
        Command::VerifyFingerprint(a) => {
            let expected: Fingerprint = a.fingerprint.parse().map_err(SdkError::from)?;
            registry.ensure_fingerprint(&a.batch_key, &expected)?;
            if out.is_json() {
                out.json(&json!({ "batch_number": a.batch_key.trim(), "matches": true }))
            } else {
                out.line(format!("{} Fingerprint matches current record", "✓".green().bold()))
            }
        }
        Command::RecordFingerprint(a) => {
            let recorded = registry.record_fingerprint(&a.batch_key, a.scope, a.mode)?;
            if out.is_json() {
                return out.json(&recorded);
            }
            out.line(format!(
                "{} Recorded fingerprint for {} at seq {}",
                "✓".green().bold(),
                recorded.receipt.key.as_str().yellow(),
                recorded.receipt.seq
            ))?;
            out.line(format!("  {}", recorded.fingerprint))
        }
        Command::VerifyRecordedFingerprints(a) => {
            let checks = registry.verify_recorded_fingerprints(&a.batch_key)?;
            if out.is_json() {
                out.json(&checks)?;
            } else if checks.is_empty() {
                out.line("No fingerprints recorded.")?;
            } else {
                for check in &checks {
                    let verdict = if check.matches() {
                        "match".green()
                    } else {
                        "MISMATCH".red().bold()
                    };
                    out.line(format!("  seq {:>4}  {}  {}", check.seq, verdict, check.recorded))?;
                }
            }
            match checks.into_iter().find(|c| !c.matches()) {
                Some(stale) => Err(SdkError::FingerprintMismatch {
                    key: a.batch_key.trim().to_string(),
                    expected: stale.recorded,
                    actual: stale.current,
                }
                .into()),
                None => Ok(()),
            }
        }
    }
}

fn written<W: Write>(out: &mut Output<W>, receipt: &WriteReceipt, verb: &str) -> anyhow::Result<()> {
    if out.is_json() {
        return out.json(receipt);
    }
    out.line(format!(
        "{} {verb} {} (seq {})",
        "✓".green().bold(),
        receipt.key.as_str().yellow(),
        receipt.seq
    ))
}

fn scalar<W: Write>(
    out: &mut Output<W>,
    field: &str,
    value: impl std::fmt::Display,
) -> anyhow::Result<()> {
    if out.is_json() {
        out.json(&json!({ field: value.to_string() }))
    } else {
        out.line(value)
    }
}

fn id_list<W: Write>(out: &mut Output<W>, ids: &[String], empty: &str) -> anyhow::Result<()> {
    if out.is_json() {
        return out.json(ids);
    }
    if ids.is_empty() {
        return out.line(empty);
    }
    for id in ids {
        out.line(format!("  - {id}"))?;
    }
    Ok(())
}

fn print_record<W: Write>(out: &mut Output<W>, record: &BatchRecord) -> anyhow::Result<()> {
    out.line(format!("Batch Number: {}", record.batch_number.as_str().bold()))?;
    out.line(format!("Manufacture Date: {}", record.manufacture_date))?;
    out.line(format!("Expiration Date: {}", record.expiration_date))?;
    out.line(format!("Release Status: {}", record.release_status.as_str().cyan()))?;

    out.line("\nQC Test Results:")?;
    if record.qc_tests.is_empty() {
        out.line("  No QC tests have been recorded.")?;
    }
    for test in &record.qc_tests {
        out.line(format!("  - Test Name: {}", test.test_name))?;
        out.line(format!("    Result: {}", test.test_result))?;
        out.line(format!("    Hash: {}", test.test_hash))?;
    }

    let sections: [(&str, &[String], &str); 3] = [
        ("Deviations", &record.deviations, "No deviations recorded."),
        ("CAPA Records", &record.capa, "No CAPA records found."),
        ("OOS Investigations", &record.oos_investigations, "No OOS investigations recorded."),
    ];
    for (title, items, empty) in sections {
        out.line(format!("\n{title}:"))?;
        if items.is_empty() {
            out.line(format!("  {empty}"))?;
        }
        for item in items {
            out.line(format!("  - {item}"))?;
        }
    }
    Ok(())
}

fn cmd_history<L, W>(registry: &BatchRegistry<L>, key: &str, out: &mut Output<W>) -> anyhow::Result<()>
where
    L: LedgerReader + LedgerWriter,
    W: Write,
{
    let key = BatchKey::new(key).map_err(SdkError::from)?;
    let rebuilt = registry.reconstruct(&key)?;
    let versions = rebuilt.versions();
    if out.is_json() {
        return out.json(&json!({
            "batch_number": key,
            "versions": versions,
            "changes": rebuilt.history,
            "anomalies": rebuilt.anomalies,
        }));
    }

    out.line(format!("History of batch {}:", key.as_str().yellow()))?;
    for v in &versions {
        out.line(format!(
            "\nVersion {} (seq {}, {}):",
            v.version.to_string().bold(),
            v.seq,
            v.kind
        ))?;
        out.json(&v.record)?;
    }
    for anomaly in &rebuilt.anomalies {
        out.line(format!(
            "{} seq {} not applied: {} ({})",
            "!".yellow().bold(),
            anomaly.seq,
            anomaly.kind,
            anomaly.detail
        ))?;
    }
    Ok(())
}

fn cmd_changes<L, W>(registry: &BatchRegistry<L>, key: &str, out: &mut Output<W>) -> anyhow::Result<()>
where
    L: LedgerReader + LedgerWriter,
    W: Write,
{
    let key = BatchKey::new(key).map_err(SdkError::from)?;
    let rebuilt = registry.reconstruct(&key)?;
    let versions = rebuilt.versions();
    let changes = rebuilt.changes();
    if out.is_json() {
        return out.json(&json!({
            "batch_number": key,
            "initial": versions.first(),
            "changes": changes,
        }));
    }

    out.line(format!("Changes in batch {}:", key.as_str().yellow()))?;
    if let Some(initial) = versions.first() {
        out.line(format!("\nInitial Version (Version {}):", initial.version))?;
        out.json(&initial.record)?;
    }
    for diff in &changes {
        if diff.fields.is_empty() {
            out.line(format!(
                "\nNo changes from Version {} to Version {} ({}).",
                diff.from_version, diff.to_version, diff.kind
            ))?;
            continue;
        }
        out.line(format!(
            "\nChanges from Version {} to Version {}:",
            diff.from_version, diff.to_version
        ))?;
        for field in &diff.fields {
            out.line(format!("  - {}:", field.field.bold()))?;
            out.line(format!("    Old: {}", field.old))?;
            out.line(format!("    New: {}", field.new))?;
        }
    }
    Ok(())
}
