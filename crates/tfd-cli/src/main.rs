use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use tfd_authority_http::HttpAuthority;
use tfd_authority_paper::PaperAuthority;
use tfd_filing::{
    attempt_id_for, filing_reference_for, AuthorityClient, FilingGateway, FilingSlotClaim,
    FilingSubmission, LifecycleEvent, TransactionLifecycle,
};
use tfd_intake::{apply_submission, issue_party_link, parse_submission};
use tfd_reconcile::reconcile;
use tfd_rules::{catalog_v2026_1, evaluate, DeterminationFacts};
use tfd_schemas::{AttemptOutcome, Determination, PartyRecord, PartyRole, TransactionRecord};

#[derive(Parser)]
#[command(name = "tfd")]
#[command(about = "Transfer disclosure filing desk CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exemption catalog against a transaction file
    Determine {
        /// Path to a transaction JSON file
        #[arg(long)]
        transaction: PathBuf,
    },

    /// Merge party submissions into the canonical collection model
    Reconcile {
        /// Path to a transaction JSON file
        #[arg(long)]
        transaction: PathBuf,

        /// Path to a party submissions JSON file
        #[arg(long)]
        parties: PathBuf,
    },

    /// Run document preflight and print the findings
    Preflight {
        #[arg(long)]
        transaction: PathBuf,

        #[arg(long)]
        parties: PathBuf,
    },

    /// Build the filing document XML
    Build {
        #[arg(long)]
        transaction: PathBuf,

        #[arg(long)]
        parties: PathBuf,

        /// Write the document here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run the full pipeline and submit the filing to the authority
    File {
        #[arg(long)]
        transaction: PathBuf,

        #[arg(long)]
        parties: PathBuf,

        /// Layered config paths in merge order; supplies authority settings
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Submit to this authority URL instead of the paper adapter
        #[arg(long)]
        authority_url: Option<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> override...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a JSONL audit log
    Verify {
        /// Path to the audit log
        #[arg(long)]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Production injects env
    // vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Determine { transaction } => run_determine(&transaction),

        Commands::Reconcile { transaction, parties } => run_reconcile(&transaction, &parties),

        Commands::Preflight { transaction, parties } => run_preflight(&transaction, &parties),

        Commands::Build { transaction, parties, out } => {
            run_build(&transaction, &parties, out.as_deref())
        }

        Commands::File {
            transaction,
            parties,
            config_paths,
            authority_url,
        } => {
            // The HTTP adapter uses reqwest's blocking client, which refuses
            // to run on a runtime worker thread.
            tokio::task::spawn_blocking(move || {
                run_file(&transaction, &parties, &config_paths, authority_url.as_deref())
            })
            .await?
        }

        Commands::ConfigHash { paths } => run_config_hash(&paths),

        Commands::Db { cmd } => run_db(cmd).await,

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => run_audit_verify(&path),
        },
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// One collected party in the fixture file: the slot it fills plus the
/// payload exactly as the collection surface would post it.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartyFixture {
    role: PartyRole,
    created_seq: u32,
    payload: Value,
}

fn load_transaction(path: &Path) -> Result<TransactionRecord> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read transaction file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse transaction file {}", path.display()))
}

/// Parse the party fixture file and run every entry through intake, the
/// same path live submissions take.
fn load_party_log(tx: &TransactionRecord, path: &Path) -> Result<Vec<PartyRecord>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read parties file {}", path.display()))?;
    let fixtures: Vec<PartyFixture> =
        serde_json::from_str(&raw).with_context(|| format!("parse parties file {}", path.display()))?;

    let mut log = Vec::with_capacity(fixtures.len());
    for (i, fx) in fixtures.into_iter().enumerate() {
        let parsed = parse_submission(&fx.payload)
            .map_err(|e| anyhow::anyhow!("party entry {} rejected at intake: {e}", i + 1))?;
        let mut record = issue_party_link(tx.transaction_id, fx.role, fx.created_seq);
        apply_submission(&mut record, parsed, fx.payload, Utc::now());
        log.push(record);
    }
    Ok(log)
}

/// Evaluate the current catalog against the transaction and stamp the
/// evaluation time, exactly as a live determination run would.
fn fresh_determination(tx: &TransactionRecord) -> Determination {
    let catalog = catalog_v2026_1();
    let mut determination = evaluate(&catalog, &DeterminationFacts::from_transaction(tx));
    determination.evaluated_at_utc = Some(Utc::now());
    determination
}

fn run_determine(transaction: &Path) -> Result<()> {
    let tx = load_transaction(transaction)?;
    let determination = fresh_determination(&tx);

    info!(
        file_number = %tx.file_number,
        status = determination.status.as_str(),
        catalog_version = %determination.catalog_version,
        "determination evaluated"
    );
    println!("{}", serde_json::to_string_pretty(&determination)?);
    Ok(())
}

fn run_reconcile(transaction: &Path, parties: &Path) -> Result<()> {
    let tx = load_transaction(transaction)?;
    let log = load_party_log(&tx, parties)?;
    let (model, report) = reconcile(&log, None);

    info!(
        parties_synced = report.parties_synced,
        changed_fields = report.changed_fields,
        warnings = report.warnings.len(),
        "collection model reconciled"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "model": model, "report": report }))?
    );
    Ok(())
}

fn run_preflight(transaction: &Path, parties: &Path) -> Result<()> {
    let mut tx = load_transaction(transaction)?;
    let log = load_party_log(&tx, parties)?;
    tx.determination = fresh_determination(&tx);
    let (model, _) = reconcile(&log, None);

    let report = tfd_docgen::run_preflight(&tx, &model);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.passed() {
        bail!("preflight failed with {} fatal finding(s)", report.fatal_count());
    }
    Ok(())
}

fn run_build(transaction: &Path, parties: &Path, out: Option<&Path>) -> Result<()> {
    let mut tx = load_transaction(transaction)?;
    let log = load_party_log(&tx, parties)?;
    tx.determination = fresh_determination(&tx);
    let (model, _) = reconcile(&log, None);

    match tfd_docgen::build(&tx, &model) {
        Ok(document) => {
            match out {
                Some(path) => {
                    fs::write(path, &document.xml)
                        .with_context(|| format!("write document {}", path.display()))?;
                    println!(
                        "document_written=true path={} bytes={}",
                        path.display(),
                        document.xml.len()
                    );
                }
                None => print!("{}", document.xml),
            }
            Ok(())
        }
        Err(refused) => {
            println!("{}", serde_json::to_string_pretty(&refused.report)?);
            bail!(
                "document refused: {} fatal preflight finding(s)",
                refused.report.fatal_count()
            );
        }
    }
}

fn run_file(
    transaction: &Path,
    parties: &Path,
    config_paths: &[String],
    authority_url: Option<&str>,
) -> Result<()> {
    let mut tx = load_transaction(transaction)?;
    let log = load_party_log(&tx, parties)?;
    let catalog = catalog_v2026_1();

    // Optional layered config: authority settings + catalog pin check.
    let filing_cfg = if config_paths.is_empty() {
        None
    } else {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        let loaded = tfd_config::load_layered_yaml(&path_refs)?;
        let cfg = tfd_config::FilingConfig::from_config_json(&loaded.config_json)?;
        cfg.ensure_catalog_pin(catalog.version())?;
        info!(config_hash = %loaded.config_hash, "layered config loaded");
        Some(cfg)
    };

    tx.determination = fresh_determination(&tx);

    let (model, report) = reconcile(&log, None);

    let mut lifecycle = TransactionLifecycle::new(tx.transaction_id);
    lifecycle.apply(&LifecycleEvent::CollectionOpened, None)?;
    lifecycle.apply(&LifecycleEvent::CollectionCompleted, None)?;
    tx.phase = lifecycle.phase;

    let submit_timeout_ms = filing_cfg.as_ref().map_or(10_000, |c| c.submit_timeout_ms);
    let max_attempts = filing_cfg.as_ref().map_or(5, |c| c.max_filing_attempts);
    let freshness_bound_ms = filing_cfg
        .as_ref()
        .map_or(3_600_000, |c| c.reconcile_freshness_bound_ms);
    let api_key = filing_cfg.as_ref().and_then(|c| c.resolve_authority_api_key());
    let target_url = authority_url
        .map(str::to_string)
        .or_else(|| filing_cfg.as_ref().map(|c| c.authority_base_url.clone()));

    let authority: Arc<dyn AuthorityClient> = match &target_url {
        Some(url) => {
            info!(authority_url = %url, "submitting to the HTTP authority");
            Arc::new(HttpAuthority::new(url, submit_timeout_ms, api_key))
        }
        None => {
            info!("submitting to the paper authority");
            Arc::new(PaperAuthority::new())
        }
    };
    let gateway = FilingGateway::new(authority, freshness_bound_ms, max_attempts, || {
        Utc::now().timestamp_millis()
    });
    gateway.record_reconcile_result(report.is_clean());

    let document = match gateway.prepare_submission(&tx, &model, &[]) {
        Ok(document) => document,
        Err(refusal) => {
            warn!(file_number = %tx.file_number, %refusal, "filing refused");
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "refused": refusal.to_string() }))?
            );
            bail!("filing refused: {refusal}");
        }
    };

    // One-shot run: this process holds the only attempt slot.
    let attempt_no = 1;
    let claim = FilingSlotClaim::from_claimed_slot(
        attempt_id_for(tx.transaction_id, attempt_no),
        filing_reference_for(tx.transaction_id, attempt_no),
        attempt_no,
    );
    lifecycle.apply(&LifecycleEvent::SubmissionDispatched, None)?;

    let submission = FilingSubmission {
        filing_reference: claim.filing_reference.clone(),
        transaction_id: tx.transaction_id,
        attempt_no,
        xml: document.xml,
    };
    let outcome = gateway.dispatch(&claim, &submission);

    let event = match &outcome {
        AttemptOutcome::Accepted { .. } => LifecycleEvent::AuthorityAccepted,
        AttemptOutcome::Rejected { .. } => LifecycleEvent::AuthorityRejected,
        AttemptOutcome::TransientFailure { .. } => LifecycleEvent::SubmissionFailedTransient,
        AttemptOutcome::Pending => bail!("dispatch returned a pending outcome"),
    };
    lifecycle.apply(&event, None)?;
    info!(
        filing_reference = %claim.filing_reference,
        phase = lifecycle.phase.as_str(),
        "filing attempt resolved"
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "attemptNo": attempt_no,
            "filingReference": claim.filing_reference,
            "outcome": outcome,
            "phase": lifecycle.phase.as_str(),
        }))?
    );
    Ok(())
}

fn run_config_hash(paths: &[String]) -> Result<()> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = tfd_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

async fn run_db(cmd: DbCmd) -> Result<()> {
    let pool = tfd_db::connect_from_env().await?;
    match cmd {
        DbCmd::Status => {
            let s = tfd_db::status(&pool).await?;
            println!(
                "db_ok={} has_transactions_table={}",
                s.ok, s.has_transactions_table
            );
        }
        DbCmd::Migrate => {
            tfd_db::migrate(&pool).await?;
            println!("migrations_applied=true");
        }
    }
    Ok(())
}

fn run_audit_verify(path: &Path) -> Result<()> {
    match tfd_audit::verify_hash_chain(path)? {
        tfd_audit::VerifyResult::Valid { lines } => {
            println!("chain_valid=true lines={lines}");
            Ok(())
        }
        tfd_audit::VerifyResult::Broken { line, reason } => {
            println!("chain_valid=false line={line}");
            bail!("audit chain broken at line {line}: {reason}");
        }
    }
}
