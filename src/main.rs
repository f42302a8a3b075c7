use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use aegis_triage::client::{Collaborator, HttpCollaborator};
use aegis_triage::config::Settings;
use aegis_triage::directory::PatientDirectory;
use aegis_triage::intake::{self, AssessmentIntake};
use aegis_triage::models::NewPatient;
use aegis_triage::polling::PollingController;
use aegis_triage::schema::{Domain, FieldKind};
use aegis_triage::{queue, report};

#[derive(Parser)]
#[command(name = "aegis-triage")]
#[command(about = "Clinical triage intake and live queue dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered patients, newest first
    Patients,
    /// Register a new patient
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: String,
        /// Male or Female
        #[arg(long)]
        gender: String,
    },
    /// Show the field schema of an assessment domain
    Fields {
        #[arg(long)]
        domain: Domain,
    },
    /// Submit an assessment to the scoring service
    Assess {
        #[arg(long)]
        domain: Domain,
        /// Defaults to the most recently registered patient
        #[arg(long)]
        patient: Option<Uuid>,
        /// Field value as name=value; repeatable
        #[arg(long = "field", conflicts_with = "csv")]
        fields: Vec<String>,
        /// Submit every row of a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Fetch the current triage queue
    Queue {
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Poll the queue and resources until interrupted
    Dashboard {
        /// Stop after this many refresh cycles
        #[arg(long)]
        cycles: Option<usize>,
    },
    /// Write a markdown dashboard report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

enum DashboardEvent {
    Snapshot(String),
    Degraded(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aegis_triage=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid AEGIS_* configuration")?;
    let collaborator: Arc<dyn Collaborator> =
        Arc::new(HttpCollaborator::new(&settings).context("failed to create API client")?);

    match cli.command {
        Commands::Patients => {
            let mut directory = PatientDirectory::new();
            directory
                .refresh(collaborator.as_ref())
                .await
                .context("failed to list patients")?;

            if directory.patients().is_empty() {
                println!("No patients registered.");
                return Ok(());
            }
            let selected = directory.selected_id();
            for patient in directory.patients() {
                println!("{}", report::render_patient(patient, Some(patient.id) == selected));
            }
        }
        Commands::Register { name, age, gender } => {
            let form = NewPatient::from_form(&name, &age, &gender)?;
            let mut directory = PatientDirectory::new();
            let created = directory
                .register(collaborator.as_ref(), &form)
                .await
                .context("failed to create patient")?;
            println!("Registered and selected:");
            println!("{}", report::render_patient(&created, true));
        }
        Commands::Fields { domain } => {
            println!("{} ({} fields, POST {})", domain.label(), domain.fields().len(), domain.endpoint());
            for spec in domain.fields() {
                let kind = match spec.kind {
                    FieldKind::Integer => "int",
                    FieldKind::Float => "float",
                };
                let codes = spec
                    .codes
                    .map(|codes| format!(" one of [{}]", codes.join(", ")))
                    .unwrap_or_default();
                let default = if spec.default.is_empty() {
                    String::new()
                } else {
                    format!(" (default {})", spec.default)
                };
                println!("- {}: {kind}{codes}{default}", spec.name);
            }
        }
        Commands::Assess {
            domain,
            patient,
            fields,
            csv,
        } => {
            let selected = resolve_patient(collaborator.as_ref(), domain, patient).await?;
            match csv {
                Some(path) => assess_batch(collaborator.as_ref(), domain, selected, &path).await?,
                None => {
                    let mut intake = AssessmentIntake::new(domain);
                    for pair in &fields {
                        let (name, value) = pair
                            .split_once('=')
                            .with_context(|| format!("expected name=value, got {pair:?}"))?;
                        intake.set_field(name.trim(), value)?;
                    }
                    let result = intake.submit(collaborator.as_ref(), selected).await?;
                    print!("{}", report::render_result(domain, &result));
                }
            }
        }
        Commands::Queue { csv } => {
            let entries = queue::fetch_queue(collaborator.as_ref())
                .await
                .context("failed to fetch triage queue")?;

            if let Some(path) = csv {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                queue::write_csv(&entries, file)?;
                println!("Exported {} queue entries to {}.", entries.len(), path.display());
                return Ok(());
            }

            let stats = queue::summarize(&entries);
            println!(
                "{} waiting, {} critical, avg wait {:.0} min",
                stats.total_count, stats.critical_count, stats.average_wait_minutes
            );
            for entry in &entries {
                println!(
                    "- {} ({}) {:.0}% {} waiting {} min",
                    entry.name,
                    entry.disease_type.as_deref().unwrap_or("-"),
                    entry.risk_score * 100.0,
                    entry.category_label(),
                    entry.wait_time_minutes
                );
            }
        }
        Commands::Dashboard { cycles } => {
            run_dashboard(collaborator, &settings, cycles).await;
        }
        Commands::Report { out } => {
            let controller = PollingController::new(collaborator, settings.poll_interval());
            controller.refresh().await;
            let snapshot = controller
                .snapshot()
                .context("dashboard refresh failed; no consistent snapshot to report")?;
            let report = report::build_report(&snapshot, controller.degraded().as_deref());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// The patient an assessment will reference, captured before anything is sent.
async fn resolve_patient(
    collaborator: &dyn Collaborator,
    domain: Domain,
    requested: Option<Uuid>,
) -> anyhow::Result<Option<Uuid>> {
    if requested.is_none() && !domain.requires_patient() {
        return Ok(None);
    }

    let mut directory = PatientDirectory::new();
    directory
        .refresh(collaborator)
        .await
        .context("failed to list patients")?;
    if let Some(id) = requested {
        directory.select(id)?;
    }
    Ok(directory.selected_id())
}

async fn assess_batch(
    collaborator: &dyn Collaborator,
    domain: Domain,
    selected: Option<Uuid>,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rows = intake::read_batch(domain, file)?;
    let mut failed = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let mut intake = AssessmentIntake::new(domain);
        let outcome = match intake.set_fields(row.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
            Ok(()) => intake.submit(collaborator, row.patient_id.or(selected)).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => {
                println!("Row {}:", index + 1);
                print!("{}", report::render_result(domain, &result));
            }
            Err(err) => {
                failed += 1;
                println!("Row {}: {}", index + 1, err.user_message());
            }
        }
    }

    println!("Submitted {} of {} rows.", rows.len() - failed, rows.len());
    Ok(())
}

async fn run_dashboard(collaborator: Arc<dyn Collaborator>, settings: &Settings, cycles: Option<usize>) {
    let controller = PollingController::new(collaborator, settings.poll_interval());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let error_tx = tx.clone();

    controller.start(
        move |snapshot| {
            let _ = tx.send(DashboardEvent::Snapshot(report::build_report(snapshot, None)));
        },
        move |err| {
            let _ = error_tx.send(DashboardEvent::Degraded(err.user_message()));
        },
    );

    let mut seen = 0usize;
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(DashboardEvent::Snapshot(rendered)) => println!("{rendered}"),
                    Some(DashboardEvent::Degraded(message)) => println!("DEGRADED: {message}"),
                    None => break,
                }
                seen += 1;
                if cycles.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.stop();
}
