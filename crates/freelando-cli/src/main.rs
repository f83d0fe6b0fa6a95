//! freelando CLI
//!
//! Fills the registration wizard step by step against a draft kept on disk.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use freelando_forms::{collation_key, FormRegistry, ValidationErrors};
use freelando_signup::{
    region_choices, signup_registry, AreaOfWorkPage, ConfirmationPage, DraftStore, FileStorage,
    GeographyLookup, PersonalDataPage, PhotoUpload, ProfilePage, RegisteredEmails,
    RetryingGeography, SignupDeps, StaticGeography, StepOutcome, SKILLS,
};

/// Freelancer registration wizard.
#[derive(Parser)]
#[command(name = "freelando")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the saved draft.
    #[arg(short, long, env = "FREELANDO_DRAFT_DIR", default_value = ".freelando")]
    draft_dir: PathBuf,

    /// Simulated latency of the email registry, in milliseconds.
    #[arg(long, env = "FREELANDO_EMAIL_LATENCY_MS", default_value_t = 0)]
    email_latency_ms: u64,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the draft as JSON.
    Show,

    /// List the regions that can be chosen.
    Regions,

    /// List the cities of a region.
    Cities {
        /// Region code, e.g. SP.
        region: String,
    },

    /// Fill a step and try to leave it.
    Step(StepArgs),

    /// Show the collected data for confirmation.
    Confirm,

    /// Discard the draft.
    Reset,
}

#[derive(Args)]
struct StepArgs {
    /// Which step to fill.
    #[arg(value_enum)]
    step: StepName,

    /// Field values, as name=value.
    #[arg(short, long = "set", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Skills to toggle (profile step).
    #[arg(long = "skill")]
    skills: Vec<String>,

    /// Languages to add as name=level (profile step).
    #[arg(long = "language", value_parser = parse_assignment)]
    languages: Vec<(String, String)>,

    /// Image to use as profile photo (profile step).
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Go back instead of forward. Saves without validating.
    #[arg(short, long)]
    back: bool,

    /// Print the step as HTML after applying the values.
    #[arg(long)]
    html: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StepName {
    Area,
    Personal,
    Profile,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn print_outcome(outcome: &StepOutcome) -> ExitCode {
    match outcome {
        StepOutcome::Moved(step) => {
            println!("Saved. Continue at {}", step.path());
            ExitCode::SUCCESS
        }
        StepOutcome::Blocked(errors) => {
            print_errors(errors);
            ExitCode::FAILURE
        }
    }
}

fn print_errors(errors: &ValidationErrors) {
    println!("\nThe step is incomplete:");
    println!("{:-<60}", "");
    print!("{errors}");
    println!();
}

/// Applies a step's arguments to its page, then leaves the page.
async fn run_step(
    args: StepArgs,
    registry: &FormRegistry<SignupDeps>,
    deps: &SignupDeps,
    geography: Arc<dyn GeographyLookup>,
    draft: &DraftStore,
) -> anyhow::Result<StepOutcome> {
    let StepArgs {
        step,
        set,
        skills,
        languages,
        photo,
        back,
        html,
    } = args;

    let outcome = match step {
        StepName::Area => {
            if back {
                anyhow::bail!("The area step is the first one.");
            }
            let mut page = AreaOfWorkPage::open(registry, deps, draft)?;
            for (name, value) in set {
                page.set(&name, value)?;
            }
            let outcome = page.next(draft).await?;
            if html {
                println!("{}", page.render());
            }
            outcome
        }

        StepName::Personal => {
            let mut page = PersonalDataPage::open(registry, deps, geography, draft).await?;
            page.load_cities().await?;

            // The region goes first so the city can be chosen among its options.
            let (region, rest): (Vec<_>, Vec<_>) =
                set.into_iter().partition(|(name, _)| name == "estado");
            for (_, value) in region {
                page.select_region(&value.to_uppercase())?;
                page.load_cities().await?;
            }
            for (name, value) in rest {
                page.set(&name, value)?;
            }

            let outcome = if back {
                page.previous(draft)?
            } else {
                page.next(draft).await?
            };
            if html {
                println!("{}", page.render());
            }
            outcome
        }

        StepName::Profile => {
            let mut page = ProfilePage::open(registry, deps, draft)?;
            for (name, value) in set {
                page.set(&name, value)?;
            }
            for skill in &skills {
                if !SKILLS.iter().any(|s| *s == skill.as_str()) {
                    warn!("Unknown skill {skill}. Choose one of: {}.", SKILLS.join(", "));
                } else if page.toggle_skill(skill)? {
                    info!("{skill} selected.");
                } else {
                    info!("{skill} is no longer selected.");
                }
            }
            for (name, level) in &languages {
                page.add_language(name, level)?;
            }
            if let Some(path) = photo {
                page.set_photo(&PhotoUpload::read(&path).await?)?;
            }
            info!("{} characters left in the summary.", page.remaining_characters());

            let outcome = if back {
                page.previous(draft)?
            } else {
                page.next(draft).await?
            };
            if html {
                println!("{}", page.render());
            }
            outcome
        }
    };
    Ok(outcome)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let geography: Arc<dyn GeographyLookup> =
        Arc::new(RetryingGeography::new(StaticGeography::brazil()));
    let deps = SignupDeps {
        email_lookup: Arc::new(
            RegisteredEmails::new().with_latency(Duration::from_millis(cli.email_latency_ms)),
        ),
    };
    let registry = signup_registry();
    let draft = DraftStore::open(FileStorage::new(&cli.draft_dir))?;

    match cli.command {
        Commands::Show => {
            println!("{}", serde_json::to_string_pretty(&draft.get())?);
        }

        Commands::Regions => {
            let regions = geography.list_regions().await?;
            for choice in region_choices(&regions) {
                println!("{}  {}", choice.value, choice.label);
            }
        }

        Commands::Cities { region } => {
            let mut cities = geography.list_localities(&region.to_uppercase()).await?;
            cities.sort_by_cached_key(|c| collation_key(&c.name));
            if cities.is_empty() {
                info!("No cities known for {region}.");
            }
            for city in cities {
                println!("{}", city.name);
            }
        }

        Commands::Step(args) => {
            let outcome = run_step(args, &registry, &deps, geography, &draft).await?;
            return Ok(print_outcome(&outcome));
        }

        Commands::Confirm => {
            let page = ConfirmationPage::open(&draft);
            println!("{}", serde_json::to_string_pretty(page.summary())?);
        }

        Commands::Reset => {
            draft.clear()?;
            info!("Draft discarded.");
        }
    }

    Ok(ExitCode::SUCCESS)
}
