use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use schoolhub_api::RecordStoreClient;
use schoolhub_engine::{
    Advance, HttpRecordStore, SubmissionAssembler, SubmissionError, Wizard, WizardError, WizardSession, parse_intake_file,
    student_registration,
};
use schoolhub_types::FieldKind;
use schoolhub_util::{SchoolHubConfig, load_config};
use tracing::{debug, info};

mod answers;

use answers::Answers;

#[derive(Debug, Parser)]
#[command(name = "schoolhub", version, about = "SchoolHub intake wizard")]
struct Cli {
    /// Intake definition (YAML or JSON) to use instead of the built-in student registration.
    #[arg(long, global = true, value_name = "FILE")]
    intake: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print each step of the intake and the fields it collects.
    Steps,
    /// Fill the intake from an answers file, step by step, and submit it.
    Register {
        /// YAML file with `fields:` and `attachments:` maps.
        #[arg(long, value_name = "FILE")]
        answers: PathBuf,
        /// Print the assembled payload instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config().context("load configuration")?;
    let wizard = build_wizard(cli.intake.as_deref(), &config)?;

    match cli.command {
        Command::Steps => {
            print_steps(&wizard);
            Ok(())
        }
        Command::Register { answers, dry_run } => register(&wizard, &config, &answers, dry_run).await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_wizard(intake: Option<&Path>, config: &SchoolHubConfig) -> Result<Wizard> {
    let options = config.intake_options();
    let wizard = match intake {
        Some(path) => Wizard::from_definition(&parse_intake_file(path)?, &options),
        None => student_registration(&options),
    };
    wizard.context("intake definition is invalid")
}

fn print_steps(wizard: &Wizard) {
    let schema = wizard.schema();
    for (index, step) in wizard.partition().steps().iter().enumerate() {
        println!("{}. {} ({})", index + 1, step.title, step.id);
        for field in &step.fields {
            let label = schema.label(field).unwrap_or(field);
            let kind = schema.kind(field).map(kind_name).unwrap_or("unknown");
            println!("   - {field}: {label} [{kind}]");
        }
    }
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "text",
        FieldKind::Date => "date",
        FieldKind::Choice => "choice",
        FieldKind::Number => "number",
        FieldKind::Attachment => "attachment",
    }
}

async fn register(wizard: &Wizard, config: &SchoolHubConfig, answers_path: &Path, dry_run: bool) -> Result<()> {
    let answers = Answers::load(answers_path)?;
    let known: Vec<&str> = wizard.schema().names().collect();
    let unknown = answers.unknown_names(&known);
    if !unknown.is_empty() {
        bail!("answers reference unknown fields: {}", unknown.join(", "));
    }

    let mut session = wizard.start_session();
    loop {
        let step = session.current_step();
        fill_step(wizard, &mut session, &answers, step).await?;
        match wizard.advance(&mut session) {
            Ok(Advance::Moved(next)) => debug!(step = next, "moved to next step"),
            Ok(Advance::ReadyToSubmit) => break,
            Err(WizardError::StepGate(gate)) => {
                for (field, message) in &gate.failures {
                    eprintln!("  {field}: {message}");
                }
                bail!("{gate}");
            }
            Err(error) => return Err(error.into()),
        }
    }

    let assembler = SubmissionAssembler::new(wizard);
    if dry_run {
        let pending = assembler.prepare(&mut session)?;
        println!("{}", serde_json::to_string_pretty(&pending.payload.summary())?);
        return Ok(());
    }

    let client = RecordStoreClient::from_env(&config.api_base)?;
    let store = HttpRecordStore::new(client, config.register_path.clone());
    match assembler.submit(&mut session, &store).await {
        Ok(record) => {
            info!(record = %record, "registration accepted");
            println!("Registered record {record}");
            Ok(())
        }
        Err(SubmissionError::Invalid { failures, earliest_step }) => {
            for (field, message) in &failures {
                eprintln!("  {field}: {message}");
            }
            bail!("submission blocked; first invalid step is {}", earliest_step + 1)
        }
        Err(error) => Err(error.into()),
    }
}

/// Apply every answer belonging to `step`: text input first, then staged files.
async fn fill_step(wizard: &Wizard, session: &mut WizardSession, answers: &Answers, step: usize) -> Result<()> {
    let fields = wizard.fields_of(step).unwrap_or_default();
    for field in fields {
        if let Some(raw) = answers.fields.get(field) {
            wizard.set_input(session, field, raw)?;
        }
    }
    for field in fields {
        if let Some(path) = answers.attachments.get(field) {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read attachment for '{field}': {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| field.clone());
            wizard.stage_attachment(session, field, &file_name, bytes)?;
        }
    }
    Ok(())
}
