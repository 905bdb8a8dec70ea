mod config;
mod flows;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};

use libs::{
    ApiClient, ApiConfig, Error,
    camera::{FacingMode, Platform},
    client::PhotoFile,
    error,
    qr::{self, QrVariant, UploadQr},
    session::{SessionKind, SessionStore},
    util,
};

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "livewall", version, about = "Share a moment on the LiveWall")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a photo and/or a message for moderation.
    Upload(UploadArgs),
    /// Photographer sign in.
    Login(LoginArgs),
    Logout,
    /// Send many photos at once as the signed in photographer.
    Batch(BatchArgs),
    /// Print or export the QR code that leads to the upload page.
    Qr(QrArgs),
}

#[derive(Parser, Debug)]
struct UploadArgs {
    #[arg(long, conflicts_with = "camera")]
    photo: Option<PathBuf>,
    /// Take the photo with the kiosk camera, front lens unless told otherwise.
    #[arg(long, num_args = 0..=1, default_missing_value = "user")]
    camera: Option<FacingMode>,
    #[arg(long)]
    message: Option<String>,
}

#[derive(Parser, Debug)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "LIVEWALL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Image files or directories of images.
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Added to every photo of the batch.
    #[arg(long)]
    message: Option<String>,
}

#[derive(Parser, Debug)]
struct QrArgs {
    #[arg(long, default_value = "full")]
    variant: QrVariant,
    #[arg(long, conflicts_with = "png")]
    svg: Option<PathBuf>,
    #[arg(long)]
    png: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    util::init_tracing();

    let args = Args::parse();
    let cfg = Config::from_env().context("reading LIVEWALL_* environment")?;

    let client = ApiClient::new(ApiConfig::new(&cfg.api_url))?;
    let session = SessionStore::new(&util::get_config_dir()?, SessionKind::Photographer);

    match args.command {
        Commands::Qr(qr) => run_qr(&cfg, qr),
        Commands::Upload(upload) => run_upload(&client, &cfg, upload).await,
        Commands::Login(login) => {
            let user = client
                .login(&login.username, &login.password)
                .await
                .map_err(|e| anyhow!("{}", e.user_message("Login failed")))?;
            session.save(&user)?;
            println!("Welcome, {}", user.username);
            Ok(())
        }
        Commands::Logout => {
            session.clear()?;
            println!("Logged out");
            Ok(())
        }
        Commands::Batch(batch) => {
            let photographer = session.require()?;
            let selection = flows::select_batch(&batch.files).await;
            for (path, why) in &selection.skipped {
                println!("skipped {}: {why}", path.display());
            }
            let sent = flows::batch(&client, &photographer, &selection, batch.message)
                .await
                .map_err(|e| {
                    tracing::warn!("batch upload failed: {e:#}");
                    let friendly = match e.downcast_ref::<Error>() {
                        Some(Error::Validation(_)) | None => None,
                        Some(other) => Some(other.user_message(error::UPLOAD_FAILED).to_string()),
                    };
                    friendly.map_or(e, |msg| anyhow!(msg))
                })?;
            println!("Uploaded {sent} photo(s)");
            Ok(())
        }
    }
}

async fn run_upload(client: &ApiClient, cfg: &Config, args: UploadArgs) -> Result<()> {
    let photo = match (args.photo, args.camera) {
        (Some(path), _) => Some(PhotoFile::read(&path).await?),
        (None, Some(facing)) => {
            let platform = Platform {
                mobile: cfg.mobile,
                secure_context: ApiConfig::new(&cfg.site_url).is_secure_origin(),
            };
            match flows::capture(cfg.camera(), facing, platform).await {
                Ok(photo) => Some(photo),
                Err(e) => {
                    tracing::warn!("camera capture failed: {e}");
                    bail!("{}", e.user_message());
                }
            }
        }
        (None, None) => None,
    };

    match flows::visitor_upload(client, photo, args.message).await {
        Ok(()) => {
            println!("Upload successful");
            Ok(())
        }
        Err(Error::Validation(msg)) => bail!(msg),
        Err(e) => {
            tracing::warn!("upload failed: {e}");
            bail!(error::UPLOAD_FAILED)
        }
    }
}

fn run_qr(cfg: &Config, args: QrArgs) -> Result<()> {
    let url = qr::upload_url(cfg.qr_url.as_deref(), &cfg.site_url);
    let code = UploadQr::new(url, args.variant)?;

    if let Some(path) = args.svg {
        std::fs::write(&path, code.to_svg()).with_context(|| format!("writing {path:?}"))?;
        println!("Wrote {}", path.display());
        return Ok(());
    }
    if let Some(path) = args.png {
        code.to_luma()
            .save(&path)
            .with_context(|| format!("writing {path:?}"))?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    for line in code.caption().iter().take(qr::HEADLINE.len()) {
        println!("{line}");
    }
    println!("{}", code.to_terminal());
    println!("{}", qr::CALL_TO_ACTION);
    println!("{}", code.url());
    if code.variant().has_caption() {
        println!("{}", qr::POWERED_BY);
    }
    Ok(())
}
