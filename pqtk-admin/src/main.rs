//! pqtk-admin - Perceptual Quality Toolkit command-line client
//!
//! Manages experiments, listening-test setups, audio samples and results on a
//! PQTK backend. Notices are printed to stderr after each command.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pqtk_admin::builder::LoadOutcome;
use pqtk_admin::catalog::Catalog;
use pqtk_admin::ranking::{Library, SortOrder};
use pqtk_admin::results::{aggregate, feedback};
use pqtk_admin::{
    submission, ApiClient, BuilderError, CatalogError, ClientError, ExperimentBuilder,
    LibraryError, SubmitError, UploadCandidate, UploadQueue,
};
use pqtk_common::config::{
    config_file_path, load_toml_config_or_default, write_toml_config, ClientSettings,
    ConfigOverrides, TomlConfig,
};
use pqtk_common::events::{drain, Notice, NoticeBus, NoticeLevel};
use pqtk_common::models::{ResultsList, TestType};
use pqtk_common::validation::parse_json;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pqtk-admin")]
#[command(about = "Perceptual Quality Toolkit administration client")]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides PQTK_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// File holding the bearer token (overrides PQTK_TOKEN_FILE)
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// Config file (defaults to PQTK_CONFIG or ~/.config/pqtk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error or a full EnvFilter directive)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in as administrator and store the token
    Login {
        #[arg(long, env = "PQTK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List, create and delete experiments
    #[command(subcommand)]
    Experiments(ExperimentsCommand),
    /// Inspect and edit an experiment's test setup
    #[command(subcommand)]
    Setup(SetupCommand),
    /// Experiment sample pool
    #[command(subcommand)]
    Samples(SamplesCommand),
    /// Aggregated results, exports and submissions
    #[command(subcommand)]
    Results(ResultsCommand),
    /// Shared sample library and ranking
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Print the resolved configuration or write a config file
    Config {
        /// Write the resolved settings to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ExperimentsCommand {
    List,
    Create { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum SetupCommand {
    /// Print the setup as JSON
    Show { experiment: String },
    /// Replace the setup with a setup.json file and save it
    Upload { experiment: String, file: PathBuf },
    /// Append an empty AB test and save
    AddTest { experiment: String },
    /// Delete a test (later tests are renumbered) and save
    DeleteTest { experiment: String, test_number: u32 },
    /// Edit one test and save it
    EditTest(EditTestArgs),
    /// Change the description and/or end text and save
    Describe {
        experiment: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        end_text: Option<String>,
    },
}

#[derive(Args, Debug)]
struct EditTestArgs {
    experiment: String,
    test_number: u32,
    /// Switch the test type first (AB, ABX, MUSHRA, APE)
    #[arg(long = "type")]
    test_type: Option<TestType>,
    /// Toggle a sample by asset path
    #[arg(long = "sample")]
    samples: Vec<String>,
    /// Add a question (AB/ABX) or axis (APE)
    #[arg(long = "question")]
    questions: Vec<String>,
    /// Remove a question or axis
    #[arg(long = "remove-question")]
    remove_questions: Vec<String>,
    /// MUSHRA reference asset path
    #[arg(long)]
    reference: Option<String>,
    /// Toggle a MUSHRA anchor by asset path
    #[arg(long = "anchor")]
    anchors: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum SamplesCommand {
    /// List the experiment's sample pool and tests with missing files
    List { experiment: String },
    /// Upload audio files and/or copy library samples into the pool
    Upload {
        experiment: String,
        files: Vec<PathBuf>,
        /// Library sample id to copy into the experiment
        #[arg(long = "from-library")]
        library_ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ResultsCommand {
    /// Print aggregated charts as text
    Show { experiment: String },
    /// Download CSV exports (one test, or the zip of all tests)
    Export {
        experiment: String,
        #[arg(long)]
        test: Option<u32>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Submit a participant's results from a JSON file
    Submit { experiment: String, file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum LibraryCommand {
    List {
        #[arg(long, default_value = "desc")]
        sort: SortOrder,
    },
    Rate { sample_id: String, rating: u8 },
    Upload { files: Vec<PathBuf> },
    Delete { sample_id: String },
    /// Save a library sample's audio to a local directory
    Download {
        filename: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(config_file_path);
    let toml_config = load_toml_config_or_default(config_path.as_deref());
    let overrides = ConfigOverrides {
        api_base_url: cli.api_url.clone(),
        token_file: cli.token_file.clone(),
        log_level: cli.log_level.clone(),
    };
    let settings = ClientSettings::resolve(&overrides, &toml_config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&settings.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!(
        "pqtk-admin v{} using {}",
        env!("CARGO_PKG_VERSION"),
        settings.api_base_url
    );

    let notices = NoticeBus::default();
    let mut rx = notices.subscribe();

    let outcome = run(cli.command, &settings, config_path, notices).await;

    for notice in drain(&mut rx) {
        print_notice(&notice);
    }

    if let Err(e) = &outcome {
        if matches!(client_error(e), Some(ClientError::Unauthorized)) {
            eprintln!("Not authorized: run `pqtk-admin login` first");
        }
    }
    outcome
}

/// The transport error underneath a command failure, if any
fn client_error(e: &anyhow::Error) -> Option<&ClientError> {
    if let Some(c) = e.downcast_ref::<ClientError>() {
        return Some(c);
    }
    if let Some(BuilderError::Client(c) | BuilderError::SaveFailed(c)) = e.downcast_ref::<BuilderError>() {
        return Some(c);
    }
    if let Some(CatalogError::Client(c)) = e.downcast_ref::<CatalogError>() {
        return Some(c);
    }
    if let Some(LibraryError::Client(c)) = e.downcast_ref::<LibraryError>() {
        return Some(c);
    }
    if let Some(SubmitError::Client(c)) = e.downcast_ref::<SubmitError>() {
        return Some(c);
    }
    None
}

fn print_notice(notice: &Notice) {
    let time = notice.timestamp.format("%H:%M:%S");
    match notice.level {
        NoticeLevel::Success | NoticeLevel::Info => eprintln!("[{}] {}", time, notice.message),
        level => eprintln!("[{}] {}: {}", time, level, notice.message),
    }
}

async fn run(
    command: Command,
    settings: &ClientSettings,
    config_path: Option<PathBuf>,
    notices: NoticeBus,
) -> Result<()> {
    if let Command::Config { init } = command {
        return show_config(settings, config_path, init);
    }

    let mut client = ApiClient::from_settings(settings).context("Failed to create API client")?;

    match command {
        Command::Login { password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            client.login(&password).await?;
            notices.success("Logged in");
        }
        Command::Logout => {
            client.logout()?;
            notices.info("Logged out");
        }
        Command::Whoami => {
            let user = client.current_user().await?;
            println!(
                "{} <{}> active={}",
                user.username.as_deref().unwrap_or("-"),
                user.email.as_deref().unwrap_or("-"),
                user.is_active
            );
        }
        Command::Experiments(cmd) => experiments(&client, cmd, notices).await?,
        Command::Setup(cmd) => setup(&client, cmd, notices).await?,
        Command::Samples(cmd) => samples(&client, cmd, notices).await?,
        Command::Results(cmd) => results(&client, cmd, notices).await?,
        Command::Library(cmd) => library(&client, cmd, notices).await?,
        Command::Config { .. } => {}
    }
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn show_config(settings: &ClientSettings, config_path: Option<PathBuf>, init: bool) -> Result<()> {
    println!("config file:  {}", display_path(config_path.as_ref()));
    println!("api_base_url: {}", settings.api_base_url);
    println!("token_file:   {}", settings.token_file.display());
    println!("timeout:      {}s", settings.request_timeout.as_secs());
    println!("log level:    {}", settings.log_level);

    if init {
        let path = config_path.ok_or_else(|| anyhow!("No config file location available"))?;
        let config = TomlConfig {
            api_base_url: Some(settings.api_base_url.clone()),
            token_file: Some(settings.token_file.clone()),
            request_timeout_secs: Some(settings.request_timeout.as_secs()),
            logging: pqtk_common::config::LoggingConfig {
                level: settings.log_level.clone(),
            },
        };
        write_toml_config(&config, &path)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string())
}

async fn experiments(client: &ApiClient, cmd: ExperimentsCommand, notices: NoticeBus) -> Result<()> {
    let mut catalog = Catalog::fetch(client, notices).await?;
    match cmd {
        ExperimentsCommand::List => {
            for name in catalog.experiments() {
                println!("{}", name);
            }
        }
        ExperimentsCommand::Create { name } => {
            catalog.create(&name).await?;
        }
        ExperimentsCommand::Delete { name } => {
            catalog.delete(&name).await?;
        }
    }
    Ok(())
}

/// Load, apply `edit`, then save
async fn edit_and_save(
    client: &ApiClient,
    experiment: &str,
    notices: NoticeBus,
    edit: impl FnOnce(&mut ExperimentBuilder) -> Result<(), BuilderError>,
) -> Result<()> {
    let mut builder = ExperimentBuilder::new(notices.clone());
    if builder.load(client, experiment).await? == LoadOutcome::Fallback {
        notices.info(format!("Starting a new setup for {}", experiment));
    }
    edit(&mut builder)?;

    notices.info("Saving replaces the stored setup; existing results for this experiment become invalid");
    builder.save(client).await?;
    Ok(())
}

async fn setup(client: &ApiClient, cmd: SetupCommand, notices: NoticeBus) -> Result<()> {
    match cmd {
        SetupCommand::Show { experiment } => {
            let mut builder = ExperimentBuilder::new(notices);
            builder.load(client, &experiment).await?;
            if let Some(setup) = builder.setup() {
                println!("{}", serde_json::to_string_pretty(setup)?);
            }
        }
        SetupCommand::Upload { experiment, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            edit_and_save(client, &experiment, notices, |b| b.upload_setup(&bytes)).await?;
        }
        SetupCommand::AddTest { experiment } => {
            edit_and_save(client, &experiment, notices, |b| b.add_test().map(|_| ())).await?;
        }
        SetupCommand::DeleteTest {
            experiment,
            test_number,
        } => {
            edit_and_save(client, &experiment, notices, |b| b.delete_test(test_number)).await?;
        }
        SetupCommand::EditTest(args) => {
            let experiment = args.experiment.clone();
            edit_and_save(client, &experiment, notices, |b| apply_test_edits(b, &args)).await?;
        }
        SetupCommand::Describe {
            experiment,
            description,
            end_text,
        } => {
            if description.is_none() && end_text.is_none() {
                bail!("Nothing to change: pass --description and/or --end-text");
            }
            edit_and_save(client, &experiment, notices, |b| {
                if let Some(text) = &description {
                    b.set_description(text)?;
                }
                if let Some(text) = &end_text {
                    b.set_end_text(text)?;
                }
                Ok(())
            })
            .await?;
        }
    }
    Ok(())
}

fn apply_test_edits(
    builder: &mut ExperimentBuilder,
    args: &EditTestArgs,
) -> Result<(), BuilderError> {
    builder.select_test(args.test_number)?;
    if let Some(test_type) = args.test_type {
        builder.change_type(test_type)?;
    }
    for sample in &args.samples {
        builder.toggle_sample(sample)?;
    }
    for text in &args.remove_questions {
        builder.remove_prompt(text)?;
    }
    for text in &args.questions {
        builder.add_prompt(text)?;
    }
    if let Some(reference) = &args.reference {
        builder.set_reference(reference)?;
    }
    for anchor in &args.anchors {
        builder.toggle_anchor(anchor)?;
    }
    builder.commit()
}

async fn samples(client: &ApiClient, cmd: SamplesCommand, notices: NoticeBus) -> Result<()> {
    match cmd {
        SamplesCommand::List { experiment } => {
            let mut builder = ExperimentBuilder::new(notices.clone());
            builder.load(client, &experiment).await?;
            for path in builder.check_samples(client).await? {
                println!("{}", path);
            }
        }
        SamplesCommand::Upload {
            experiment,
            files,
            library_ids,
        } => {
            let pool = client.list_experiment_samples(&experiment).await?;
            let mut queue = UploadQueue::for_experiment(&experiment, &pool, notices.clone());
            queue.offer(read_candidates(&files).await?);
            for id in &library_ids {
                queue.toggle_existing(id);
            }
            if queue.is_empty() {
                bail!("No acceptable samples to upload");
            }
            let added = client
                .upload_experiment_samples(&experiment, &queue.into_batch())
                .await?;
            for path in &added {
                println!("{}", path);
            }
            notices.success("Samples uploaded successfully!");
        }
    }
    Ok(())
}

async fn read_candidates(files: &[PathBuf]) -> Result<Vec<UploadCandidate>> {
    let mut candidates = Vec::with_capacity(files.len());
    for file in files {
        let candidate = UploadCandidate::from_path(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        candidates.push(candidate);
    }
    Ok(candidates)
}

async fn results(client: &ApiClient, cmd: ResultsCommand, notices: NoticeBus) -> Result<()> {
    match cmd {
        ResultsCommand::Show { experiment } => {
            let list = client.fetch_results(&experiment).await?;
            let charts = aggregate(&list);
            if charts.is_empty() {
                notices.info(format!("No results for {} yet", experiment));
            }
            for chart in &charts {
                println!("{}", chart);
            }
            for (number, text) in feedback(&list) {
                println!("feedback (test {}): {}", number, text);
            }
        }
        ResultsCommand::Export {
            experiment,
            test,
            out,
        } => {
            let path = match test {
                Some(number) => {
                    let setup = client.fetch_setup(&experiment).await?;
                    let test_type = setup
                        .find_test(number)
                        .map(|t| t.test_type())
                        .ok_or_else(|| anyhow!("Test #{} does not exist", number))?;
                    submission::download_test_csv(client, &experiment, number, test_type, &out).await?
                }
                None => submission::download_all_csv(client, &experiment, &out).await?,
            };
            notices.success(format!("Saved {}", path.display()));
        }
        ResultsCommand::Submit { experiment, file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let list: ResultsList =
                parse_json(&bytes).map_err(|report| anyhow!("Invalid results file: {}", report))?;
            let run_id = submission::submit(client, &experiment, list).await?;
            notices.success(format!("Results submitted (run {})", run_id));
        }
    }
    Ok(())
}

async fn library(client: &ApiClient, cmd: LibraryCommand, notices: NoticeBus) -> Result<()> {
    let mut library = Library::fetch(client, notices).await?;
    match cmd {
        LibraryCommand::List { sort } => {
            for sample in library.sorted(sort) {
                let rating = if sample.is_rated() {
                    format!("{:.2}", sample.rating)
                } else {
                    "unrated".to_string()
                };
                println!("{:>6}  {:<40} {}", sample.sample_id, sample.name, rating);
            }
        }
        LibraryCommand::Rate { sample_id, rating } => {
            library.rate(&sample_id, rating).await?;
        }
        LibraryCommand::Upload { files } => {
            let mut queue = library.upload_queue();
            queue.offer(read_candidates(&files).await?);
            library.upload(queue).await?;
        }
        LibraryCommand::Delete { sample_id } => {
            library.delete(&sample_id).await?;
        }
        LibraryCommand::Download { filename, out } => {
            let bytes = client.download_sample(&filename).await?;
            let local = PathBuf::from(&filename);
            let path = out.join(local.file_name().unwrap_or(local.as_os_str()));
            tokio::fs::create_dir_all(&out)
                .await
                .with_context(|| format!("Failed to create {}", out.display()))?;
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "Downloaded sample");
        }
    }
    Ok(())
}
