mod config;
mod panel;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::{Mutex, Notify};

use libs::{
    ApiClient, ApiConfig,
    models::{
        DisplayedFilter, ListQuery, ModerationAction, NewUser, Role, StatusFilter, UploadStatus,
        User, UserUpdate,
    },
    poll::Poller,
    session::{SessionKind, SessionStore},
    util,
};

use config::Config;
use panel::{ItemAction, Panel};

#[derive(Parser, Debug)]
#[command(name = "livewall-admin", version, about = "LiveWall moderation panel")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and keep the admin session on disk.
    Login(LoginArgs),
    Logout,
    /// Bootstrap an admin account with the server's creation secret.
    CreateAdmin(CreateAdminArgs),
    #[command(flatten)]
    Panel(PanelCommands),
}

/// Everything that needs a stored admin session.
#[derive(Subcommand, Debug)]
enum PanelCommands {
    /// Show uploads with counts per status.
    List(ListArgs),
    Approve { id: String },
    Reject { id: String },
    Schedule {
        id: String,
        /// RFC 3339 time, e.g. 2025-03-02T18:30:00Z.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Take a scheduled upload live now.
    Activate { id: String },
    Delete { id: String },
    /// One request for many uploads.
    Bulk(BulkArgs),
    /// Re-list on an interval until interrupted.
    Watch(ListArgs),
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Parser, Debug)]
struct LoginArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "LIVEWALL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Parser, Debug)]
struct CreateAdminArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "LIVEWALL_PASSWORD", hide_env_values = true)]
    password: String,
    /// Falls back to LIVEWALL_ADMIN_SECRET.
    #[arg(long)]
    secret: Option<String>,
}

#[derive(Parser, Debug, Clone)]
struct ListArgs {
    /// pending, approved, scheduled or rejected; all when omitted.
    #[arg(long)]
    status: Option<UploadStatus>,
    #[arg(long, value_enum)]
    displayed: Option<DisplayedArg>,
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

impl ListArgs {
    fn filter(&self) -> StatusFilter {
        self.status.map_or(StatusFilter::All, StatusFilter::Only)
    }

    fn query(&self) -> ListQuery {
        ListQuery {
            status: self.filter(),
            displayed: self.displayed.map(Into::into),
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DisplayedArg {
    Displayed,
    NotDisplayed,
}

impl From<DisplayedArg> for DisplayedFilter {
    fn from(d: DisplayedArg) -> Self {
        match d {
            DisplayedArg::Displayed => DisplayedFilter::Displayed,
            DisplayedArg::NotDisplayed => DisplayedFilter::NotDisplayed,
        }
    }
}

#[derive(Parser, Debug)]
struct BulkArgs {
    #[arg(value_enum)]
    action: BulkAction,
    ids: Vec<String>,
    /// Select every upload with this status instead of listing ids.
    #[arg(long, conflicts_with = "ids")]
    all: Option<UploadStatus>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BulkAction {
    Approve,
    Reject,
    Schedule,
}

impl From<BulkAction> for ModerationAction {
    fn from(a: BulkAction) -> Self {
        match a {
            BulkAction::Approve => ModerationAction::Approve,
            BulkAction::Reject => ModerationAction::Reject,
            BulkAction::Schedule => ModerationAction::Schedule,
        }
    }
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    List,
    Show {
        id: String,
    },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long, env = "LIVEWALL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Photographer)]
        role: RoleArg,
    },
    Update {
        id: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RoleArg {
    Photographer,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Photographer => Role::Photographer,
            RoleArg::Admin => Role::Admin,
        }
    }
}

fn print_user(user: &User) {
    println!(
        "{:<26} {:<20} {:<13} {}",
        user.id,
        user.username,
        user.role.as_str(),
        if user.active { "active" } else { "inactive" }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    util::init_tracing();

    let args = Args::parse();
    let cfg = Config::from_env().context("reading LIVEWALL_* environment")?;
    let client = ApiClient::new(ApiConfig::new(&cfg.api_url))?;
    let session = SessionStore::new(&util::get_config_dir()?, SessionKind::Admin);

    match args.command {
        Commands::Login(login) => run_login(&client, &session, login).await,
        Commands::Logout => {
            session.clear()?;
            println!("Logged out");
            Ok(())
        }
        Commands::CreateAdmin(create) => run_create_admin(&client, &cfg, create).await,
        Commands::Panel(command) => {
            let user = session.require()?;
            tracing::debug!(admin = %user.username, "session ok");
            run_panel(client, &cfg, command).await
        }
    }
}

async fn run_login(client: &ApiClient, session: &SessionStore, args: LoginArgs) -> Result<()> {
    let user = client
        .login(&args.username, &args.password)
        .await
        .map_err(|e| anyhow!("{}", e.user_message("Login failed")))?;
    session.save(&user)?;
    println!("Logged in as {}", user.username);
    Ok(())
}

async fn run_create_admin(client: &ApiClient, cfg: &Config, args: CreateAdminArgs) -> Result<()> {
    let Some(secret) = args.secret.or_else(|| cfg.admin_secret.clone()) else {
        bail!("an admin secret is required (--secret or LIVEWALL_ADMIN_SECRET)");
    };
    client
        .create_admin(&args.username, &args.password, &secret)
        .await
        .map_err(|e| anyhow!("{}", e.user_message("Failed to create admin")))?;
    println!("Admin user created successfully");
    Ok(())
}

async fn run_panel(client: ApiClient, cfg: &Config, command: PanelCommands) -> Result<()> {
    match command {
        PanelCommands::List(list) => {
            let mut panel = Panel::new(client, list.query());
            panel.refresh().await?;
            println!("{}", panel.summary());
            print!("{}", panel.table(StatusFilter::All));
        }
        PanelCommands::Approve { id } => item(client, &id, ItemAction::Approve).await?,
        PanelCommands::Reject { id } => item(client, &id, ItemAction::Reject).await?,
        PanelCommands::Schedule { id, at } => item(client, &id, ItemAction::Schedule(at)).await?,
        PanelCommands::Activate { id } => item(client, &id, ItemAction::Activate).await?,
        PanelCommands::Delete { id } => item(client, &id, ItemAction::Delete).await?,
        PanelCommands::Bulk(bulk) => {
            let mut panel = Panel::new(client, ListQuery::default());
            match bulk.all {
                Some(status) => {
                    panel.refresh().await?;
                    panel.select_filtered(StatusFilter::Only(status));
                }
                None => bulk.ids.iter().for_each(|id| panel.select(id.as_str())),
            }
            let count = panel.selection().len();
            if panel.bulk_action(bulk.action.into()).await? {
                println!("{} {count} upload(s)", ModerationAction::from(bulk.action));
                println!("{}", panel.summary());
            } else {
                println!("Nothing selected");
            }
        }
        PanelCommands::Watch(list) => watch(client, cfg, list).await?,
        PanelCommands::Users(users) => run_users(&client, users).await?,
    }
    Ok(())
}

async fn item(client: ApiClient, id: &str, action: ItemAction) -> Result<()> {
    let mut panel = Panel::new(client, ListQuery::default());
    if let Err(e) = panel.refresh().await {
        tracing::warn!("listing unavailable, sending without a status check: {e:#}");
    }
    panel.item_action(id, action).await?;
    println!("Done. {}", panel.summary());
    Ok(())
}

async fn watch(client: ApiClient, cfg: &Config, list: ListArgs) -> Result<()> {
    let filter = list.filter();
    let panel = Arc::new(Mutex::new(Panel::new(client, list.query())));

    let shutdown = Arc::new(Notify::new());
    tokio::spawn(util::listen_for_shutdown(shutdown.clone()));

    Poller::new(cfg.refresh_interval())
        .run(shutdown, move || {
            let panel = panel.clone();
            async move {
                let mut panel = panel.lock().await;
                match panel.refresh().await {
                    Ok(()) => {
                        println!("{} {}", Utc::now().format("%H:%M:%S"), panel.summary());
                        print!("{}", panel.table(filter));
                    }
                    Err(e) => tracing::warn!("refresh failed: {e:#}"),
                }
            }
        })
        .await;
    Ok(())
}

async fn run_users(client: &ApiClient, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::List => {
            let users = client.list_users().await?;
            if users.is_empty() {
                println!("No users yet");
            }
            users.iter().for_each(print_user);
        }
        UserCommands::Show { id } => print_user(&client.get_user(&id).await?),
        UserCommands::Create {
            username,
            password,
            role,
        } => {
            let new = NewUser {
                username,
                password,
                role: Some(role.into()),
            };
            let user = client
                .create_user(&new)
                .await
                .map_err(|e| anyhow!("{}", e.user_message("Failed to create user")))?;
            print_user(&user);
        }
        UserCommands::Update {
            id,
            username,
            password,
            active,
        } => {
            let update = UserUpdate {
                username,
                password,
                active,
            };
            print_user(&client.update_user(&id, &update).await?);
        }
        UserCommands::Delete { id } => {
            client.delete_user(&id).await?;
            println!("Deleted user {id}");
        }
    }
    Ok(())
}
