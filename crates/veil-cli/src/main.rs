//! veil: share files through an untrusted blob store
//!
//! Local commands:
//!   seal <file>          - encrypt to a file named by its self-describing name
//!   open <sealed-file>   - decrypt a sealed file
//!   inspect <name>       - decode an artifact name (no secret needed)
//!   keygen               - print a random share secret
//!
//! Store commands:
//!   upload <file>        - seal, upload, publish, print the share link
//!   download <link>      - fetch and open a shared artifact
//!   list                 - list encrypted artifacts in the store
//!   delete <object-id>   - remove an artifact from the store

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use veil_core::config::{StorageBackend, VeilConfig};
use veil_core::{ObjectId, Policy};
use veil_crypto::{artifact, codec, generate_secret, AccessContext, KdfParams, ShareLocator};
use veil_storage::{DownloadLedger, OpendalStore, S3Credentials, Store};

/// Shortest secret accepted from a user
const MIN_SECRET_LEN: usize = 4;

/// Length of secrets from `keygen` and `--generate-secret`
const DEFAULT_SECRET_LEN: usize = 20;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "veil",
    version,
    about = "Encrypted file sharing over untrusted storage",
    long_about = "veil: encrypt files client-side and share them with a short secret"
)]
struct Cli {
    /// Path to config.toml
    #[arg(long, short = 'c', env = "VEIL_CONFIG", default_value = "~/.config/veil/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "VEIL_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "VEIL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file locally; the output file is named by its encoded name
    Seal {
        file: PathBuf,
        /// Directory for the sealed file (default: current directory)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        secret: SecretArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Decrypt a sealed file produced by `seal`
    Open {
        sealed: PathBuf,
        /// Output path (default: original name in the current directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
        /// Secret (prompted if omitted)
        #[arg(long, env = "VEIL_SECRET", hide_env_values = true)]
        secret: Option<String>,
        /// Your ISO 3166 region code, for region-restricted artifacts
        #[arg(long, env = "VEIL_REGION")]
        region: Option<String>,
    },

    /// Decode an artifact name and print its metadata
    Inspect {
        name: String,
    },

    /// Print a random share secret
    Keygen {
        #[arg(long, short = 'n', default_value_t = DEFAULT_SECRET_LEN)]
        length: usize,
    },

    /// Seal a file, upload it, and print its share link
    Upload {
        file: PathBuf,
        #[command(flatten)]
        secret: SecretArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Download and decrypt the artifact behind a share link
    Download {
        link: String,
        /// Output path (default: original name in the current directory)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(long)]
        force: bool,
        /// Your ISO 3166 region code, for region-restricted artifacts
        #[arg(long, env = "VEIL_REGION")]
        region: Option<String>,
    },

    /// List encrypted artifacts in the store
    List,

    /// Delete an artifact from the store
    Delete {
        object_id: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Args, Debug)]
struct SecretArgs {
    /// Secret (prompted if omitted)
    #[arg(long, env = "VEIL_SECRET", hide_env_values = true, conflicts_with = "generate_secret")]
    secret: Option<String>,
    /// Generate a random secret and print it to stderr
    #[arg(long)]
    generate_secret: bool,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Deny access after this instant (RFC 3339)
    #[arg(long, value_parser = parse_rfc3339, conflicts_with = "expires_in_hours")]
    expires_at: Option<DateTime<Utc>>,
    /// Deny access this many hours from now
    #[arg(long)]
    expires_in_hours: Option<u32>,
    /// Deny access after this many downloads (tracked per client)
    #[arg(long)]
    max_downloads: Option<u32>,
    /// Delete after the first download
    #[arg(long)]
    self_destruct: bool,
    /// Allowed ISO 3166 region code (repeatable)
    #[arg(long = "allow-country")]
    allow_country: Vec<String>,
}

impl PolicyArgs {
    fn to_policy(&self, now: DateTime<Utc>) -> Result<Policy> {
        let expires_at = match (self.expires_at, self.expires_in_hours) {
            (Some(at), _) => Some(at),
            (None, Some(hours)) => Some(
                ChronoDuration::try_hours(i64::from(hours))
                    .and_then(|d| now.checked_add_signed(d))
                    .with_context(|| format!("--expires-in-hours {hours} is out of range"))?,
            ),
            (None, None) => None,
        };
        Ok(Policy {
            expires_at,
            max_downloads: self.max_downloads,
            self_destruct: self.self_destruct,
            allowed_countries: self
                .allow_country
                .iter()
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
        })
    }
}

fn parse_rfc3339(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let (config, found) = load_config(&config_path).await?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    if !found {
        tracing::warn!("config file not found: {}  (using defaults)", config_path.display());
    }

    match cli.command {
        Commands::Seal { file, out_dir, secret, policy } => {
            cmd_seal(&config, &file, out_dir.as_deref(), &secret, &policy).await
        }
        Commands::Open { sealed, out, force, secret, region } => {
            cmd_open(&config, &sealed, out.as_deref(), force, secret, region).await
        }
        Commands::Inspect { name } => cmd_inspect(&name),
        Commands::Keygen { length } => cmd_keygen(length),
        Commands::Upload { file, secret, policy } => {
            cmd_upload(&config, &file, &secret, &policy).await
        }
        Commands::Download { link, out, force, region } => {
            cmd_download(&config, &link, out.as_deref(), force, region).await
        }
        Commands::List => cmd_list(&config).await,
        Commands::Delete { object_id } => cmd_delete(&config, &object_id).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

// ── Config + logging ──────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<(VeilConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = VeilConfig::from_toml(&content)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((VeilConfig::default(), false))
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

fn kdf_params(config: &VeilConfig) -> KdfParams {
    KdfParams {
        iterations: config.crypto.pbkdf2_iterations,
    }
}

// ── Store from config + environment credentials ───────────────────────────────

fn open_store(config: &VeilConfig) -> Result<OpendalStore> {
    let creds = match (
        std::env::var("AWS_ACCESS_KEY_ID").or_else(|_| std::env::var("VEIL_ACCESS_KEY_ID")),
        std::env::var("AWS_SECRET_ACCESS_KEY").or_else(|_| std::env::var("VEIL_SECRET_ACCESS_KEY")),
    ) {
        (Ok(access_key_id), Ok(secret_access_key)) => Some(S3Credentials {
            access_key_id,
            secret_access_key,
        }),
        _ => None,
    };

    let mut storage = config.storage.clone();
    storage.root = expand_tilde(&storage.root);
    if storage.backend == StorageBackend::Memory {
        tracing::warn!("memory storage backend: objects vanish when veil exits");
    }

    let op = veil_storage::build_operator(&storage, creds.as_ref())
        .context("building storage operator")?;
    Ok(OpendalStore::new(op, &storage.prefix))
}

fn open_ledger(config: &VeilConfig) -> Result<DownloadLedger> {
    let path = expand_tilde(&config.ledger.path);
    DownloadLedger::open(&path).with_context(|| format!("opening download ledger: {}", path.display()))
}

// ── Secrets ───────────────────────────────────────────────────────────────────

/// Resolve the secret for sealing: flag/env, generated, or prompted twice.
fn sealing_secret(args: &SecretArgs) -> Result<SecretString> {
    if args.generate_secret {
        let secret = generate_secret(DEFAULT_SECRET_LEN);
        eprintln!("Generated secret: {}", secret.expose_secret());
        return Ok(secret);
    }
    let secret = match &args.secret {
        Some(s) => s.clone(),
        None => {
            let first = rpassword::prompt_password("Secret: ").context("reading secret")?;
            let again = rpassword::prompt_password("Confirm secret: ").context("reading secret")?;
            if first != again {
                anyhow::bail!("secrets do not match");
            }
            first
        }
    };
    check_secret(secret)
}

fn opening_secret(arg: Option<String>) -> Result<SecretString> {
    let secret = match arg {
        Some(s) => s,
        None => rpassword::prompt_password("Secret: ").context("reading secret")?,
    };
    check_secret(secret)
}

fn check_secret(secret: String) -> Result<SecretString> {
    if secret.chars().count() < MIN_SECRET_LEN {
        anyhow::bail!("secret must be at least {MIN_SECRET_LEN} characters");
    }
    Ok(SecretString::from(secret))
}

// ── Progress + output helpers ─────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Where to write a recovered file. The original name comes from an
/// untrusted object name, so only its final component is used.
fn output_path(out: Option<&Path>, original_name: &str) -> PathBuf {
    if let Some(p) = out {
        return p.to_path_buf();
    }
    Path::new(original_name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("veil-download.bin"))
}

async fn write_output(path: &Path, bytes: &[u8], force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("{} has no file name", path.display()))
}

fn describe_policy(policy: &Policy) -> String {
    if policy.is_unrestricted() {
        return "unrestricted".into();
    }
    let mut parts = Vec::new();
    if let Some(t) = policy.expires_at {
        parts.push(format!("expires {}", t.to_rfc3339()));
    }
    if let Some(n) = policy.max_downloads {
        parts.push(format!("max {n} downloads"));
    }
    if policy.self_destruct {
        parts.push("self-destruct".into());
    }
    if !policy.allowed_countries.is_empty() {
        let countries: Vec<&str> = policy.allowed_countries.iter().map(String::as_str).collect();
        parts.push(format!("regions {}", countries.join(",")));
    }
    parts.join(", ")
}

// ── `veil seal` / `veil open` ─────────────────────────────────────────────────

async fn cmd_seal(
    config: &VeilConfig,
    file: &Path,
    out_dir: Option<&Path>,
    secret_args: &SecretArgs,
    policy_args: &PolicyArgs,
) -> Result<()> {
    let secret = sealing_secret(secret_args)?;
    let name = file_name_of(file)?;
    let plaintext = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let policy = policy_args.to_policy(Utc::now())?;
    let params = kdf_params(config);

    let pb = make_spinner("seal");
    pb.set_message("deriving key");
    let prepared = tokio::task::spawn_blocking(move || {
        artifact::prepare_upload(&plaintext, &name, &secret, &policy, &params)
    })
    .await
    .context("seal task panicked")??;
    pb.finish_and_clear();

    let dir = out_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let dest = dir.join(&prepared.encoded_name);
    write_output(&dest, &prepared.ciphertext, false).await?;

    println!("{}", dest.display());
    Ok(())
}

async fn cmd_open(
    config: &VeilConfig,
    sealed: &Path,
    out: Option<&Path>,
    force: bool,
    secret: Option<String>,
    region: Option<String>,
) -> Result<()> {
    let encoded_name = file_name_of(sealed)?;
    let mut ctx = AccessContext::new(Utc::now());
    ctx.region = region;
    // fail on a bad name or denied policy before asking for the secret
    artifact::inspect(&encoded_name, &ctx)?;

    let secret = opening_secret(secret)?;
    let ciphertext = tokio::fs::read(sealed)
        .await
        .with_context(|| format!("reading {}", sealed.display()))?;
    let params = kdf_params(config);

    let pb = make_spinner("open");
    pb.set_message("deriving key");
    let opened = tokio::task::spawn_blocking(move || {
        artifact::complete_download(&encoded_name, &ciphertext, &secret, &ctx, &params)
    })
    .await
    .context("open task panicked")??;
    pb.finish_and_clear();

    let dest = output_path(out, &opened.original_name);
    write_output(&dest, &opened.plaintext, force).await?;
    println!("{}", dest.display());
    Ok(())
}

// ── `veil inspect` / `veil keygen` ────────────────────────────────────────────

fn cmd_inspect(name: &str) -> Result<()> {
    let meta = codec::decode(name)?;
    println!("name:      {}", meta.original_name);
    println!("salt:      {}", hex(meta.salt.as_bytes()));
    println!("nonce:     {}", hex(meta.nonce.as_bytes()));
    println!("policy:    {}", describe_policy(&meta.policy));
    println!(
        "json:      {}",
        serde_json::to_string(&meta.policy).context("serializing policy")?
    );
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn cmd_keygen(length: usize) -> Result<()> {
    if length < MIN_SECRET_LEN {
        anyhow::bail!("length must be at least {MIN_SECRET_LEN}");
    }
    println!("{}", generate_secret(length).expose_secret());
    Ok(())
}

// ── `veil upload` / `veil download` ───────────────────────────────────────────

async fn cmd_upload(
    config: &VeilConfig,
    file: &Path,
    secret_args: &SecretArgs,
    policy_args: &PolicyArgs,
) -> Result<()> {
    let store = open_store(config)?;
    let secret = sealing_secret(secret_args)?;
    let name = file_name_of(file)?;
    let plaintext = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let policy = policy_args.to_policy(Utc::now())?;

    let pb = make_spinner("upload");
    pb.set_message(name.clone());
    let result = veil_storage::upload_artifact(
        &store,
        plaintext,
        &name,
        &secret,
        &policy,
        &kdf_params(config),
        &config.share.base_origin,
    )
    .await;
    pb.finish_and_clear();
    let upload = result.context("upload failed")?;

    tracing::debug!(
        object_id = %upload.object_id,
        link = %veil_crypto::locator::redact(&upload.locator),
        "share link ready"
    );
    println!("{}", upload.locator);
    Ok(())
}

async fn cmd_download(
    config: &VeilConfig,
    link: &str,
    out: Option<&Path>,
    force: bool,
    region: Option<String>,
) -> Result<()> {
    let locator = ShareLocator::parse(link)?;
    let store = open_store(config)?;
    let mut ledger = open_ledger(config)?;

    let mut ctx = AccessContext::new(Utc::now()).with_downloads(ledger.count(&locator.object_id));
    ctx.region = region;

    let pb = make_spinner("download");
    pb.set_message(locator.object_id.to_string());
    let result = veil_storage::download_artifact(&store, &locator, &ctx, &kdf_params(config)).await;
    pb.finish_and_clear();
    let download = result?;

    let dest = output_path(out, &download.original_name);
    write_output(&dest, &download.plaintext, force).await?;

    ledger.record(&download.object_id);
    ledger.flush()?;

    if download.destroyed {
        eprintln!("This file has self-destructed and is no longer available.");
    }
    println!("{}", dest.display());
    Ok(())
}

// ── `veil list` / `veil delete` ───────────────────────────────────────────────

async fn cmd_list(config: &VeilConfig) -> Result<()> {
    let store = open_store(config)?;
    let artifacts = veil_storage::list_artifacts(&store).await?;

    if artifacts.is_empty() {
        println!("No encrypted artifacts found.");
        return Ok(());
    }

    println!("{:<38} {:<32} POLICY", "OBJECT ID", "NAME");
    for a in &artifacts {
        println!(
            "{:<38} {:<32} {}",
            a.object_id,
            a.metadata.original_name,
            describe_policy(&a.metadata.policy)
        );
    }
    Ok(())
}

async fn cmd_delete(config: &VeilConfig, object_id: &str) -> Result<()> {
    let store = open_store(config)?;
    let id = ObjectId::new(object_id);
    store.delete_object(&id).await?;

    let mut ledger = open_ledger(config)?;
    ledger.forget(&id);
    ledger.flush()?;

    println!("Deleted {id}");
    Ok(())
}

// ── `veil config show` ────────────────────────────────────────────────────────

fn cmd_config_show(config: &VeilConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("serializing config")?
    );
    Ok(())
}
