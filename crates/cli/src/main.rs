use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use epr_core::{
    Demographics, Interpretation, NewMedication, NewObservation, NonEmptyText, SeedOutcome,
    Services, Sex, ShardableUuid,
};

#[derive(Parser)]
#[command(name = "epr")]
#[command(about = "Mock EPR command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo patients if the store is empty
    Seed,
    /// List all patients
    List,
    /// Register a patient
    CreatePatient {
        /// 10-digit national identifier
        nhs_number: String,
        /// M, F or Other
        #[arg(long)]
        sex: Sex,
        /// Age band, e.g. 26-35
        #[arg(long)]
        age_band: String,
    },
    /// Find a patient by national identifier
    Lookup {
        nhs_number: String,
    },
    /// Delete a patient with their observations and medications
    DeletePatient {
        patient_id: ShardableUuid,
    },
    /// Record an observation
    AddObservation {
        patient_id: ShardableUuid,
        /// Test type, e.g. HbA1c
        kind: String,
        value: f64,
        unit: String,
        /// NORMAL, ABNORMAL or CRITICAL
        #[arg(long, default_value = "NORMAL")]
        interpretation: Interpretation,
        /// Date performed (YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = parse_date)]
        performed: Option<DateTime<Utc>>,
    },
    /// Record a medication
    AddMedication {
        patient_id: ShardableUuid,
        drug_name: String,
        dose: String,
        /// Start date (YYYY-MM-DD); defaults to now
        #[arg(long, value_parser = parse_date)]
        start: Option<DateTime<Utc>>,
        /// Stop date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        stop: Option<DateTime<Utc>>,
    },
    /// Generate random observations for a patient
    Simulate {
        patient_id: ShardableUuid,
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// Write a CSV export archive
    Export {
        /// Restrict the export to one patient
        #[arg(long)]
        patient: Option<ShardableUuid>,
    },
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("expected a date as YYYY-MM-DD, got '{raw}'"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    api_shared::init_tracing("epr_core=warn")?;

    let cli = Cli::parse();
    let cfg = api_shared::core_config_from_env()?;
    let services = Services::open(&cfg).context("failed to open record store")?;

    match cli.command {
        Commands::Seed => match services.seed_demo_data()? {
            SeedOutcome::AlreadySeeded => println!("Store already holds patients; nothing seeded."),
            SeedOutcome::Seeded(pseudonyms) => {
                println!("Seeded {} patients: {}", pseudonyms.len(), pseudonyms.join(", "));
            }
        },
        Commands::List => {
            let patients = services.patients.list_patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for p in patients {
                println!(
                    "{}  {}  sex={} age_band={} created={}",
                    p.pseudonym,
                    p.id,
                    p.sex,
                    p.age_band,
                    p.created_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::CreatePatient {
            nhs_number,
            sex,
            age_band,
        } => {
            let demographics = Demographics {
                sex,
                age_band: NonEmptyText::new(&age_band)?,
            };
            match services.patients.create_patient(&nhs_number, demographics) {
                Ok(p) => println!("Created {} ({})", p.pseudonym, p.id),
                Err(e) if e.is_duplicate() => {
                    anyhow::bail!("a patient with this identifier already exists")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Lookup { nhs_number } => {
            match services.patients.find_patient_by_identifier(&nhs_number)? {
                Some(p) => println!("{} ({})", p.pseudonym, p.id),
                None => println!("No patient with that identifier."),
            }
        }
        Commands::DeletePatient { patient_id } => {
            services.patients.delete_patient(&patient_id)?;
            println!("Deleted patient {patient_id}");
        }
        Commands::AddObservation {
            patient_id,
            kind,
            value,
            unit,
            interpretation,
            performed,
        } => {
            let obs = services.clinical.add_observation(NewObservation {
                patient_id,
                kind: NonEmptyText::new(&kind)?,
                value,
                unit: NonEmptyText::new(&unit)?,
                interpretation,
                performed_date: performed.unwrap_or_else(Utc::now),
            })?;
            println!("Recorded observation {}", obs.id);
        }
        Commands::AddMedication {
            patient_id,
            drug_name,
            dose,
            start,
            stop,
        } => {
            let med = services.clinical.add_medication(NewMedication {
                patient_id,
                drug_name: NonEmptyText::new(&drug_name)?,
                dose: NonEmptyText::new(&dose)?,
                start_date: start.unwrap_or_else(Utc::now),
                stop_date: stop,
            })?;
            println!("Recorded medication {}", med.id);
        }
        Commands::Simulate { patient_id, count } => {
            let created = services.simulator.simulate(&patient_id, count)?;
            println!("Created {} observations", created.len());
        }
        Commands::Export { patient } => {
            let job = services.exports.create_export(patient.as_ref())?;
            let (_, path) = services.exports.export_archive(&job.id)?;
            println!("Export {} {}: {}", job.id, job.status, path.display());
        }
    }

    Ok(())
}
