use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use lostfound_admin::prelude::*;
use lostfound_admin::views::{DetailStatus, StatusFilter, NOT_FOUND_MESSAGE};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lostfound-admin", version)]
#[command(about = "Lost & Found admin console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Operator email
    #[arg(long, env = "LOSTFOUND_EMAIL", global = true)]
    email: Option<String>,

    /// Operator password
    #[arg(long, env = "LOSTFOUND_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Output debug logs to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List items
    Items {
        /// Only items in this status (lost, found, claimed, unknown)
        #[arg(long)]
        status: Option<StatusFilter>,
        /// Case-insensitive text to look for in title, description, location and contact
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one item
    Show { token: String },
    /// Apply the status action offered for an item
    Mark { token: String },
    /// Create an item
    Create(ItemArgs),
    /// Edit an item; only the given fields change
    Edit {
        token: String,
        #[command(flatten)]
        fields: ItemArgs,
    },
    /// Delete an item by record key
    Delete {
        key: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List registered users
    Users,
    /// Item counts per status
    Stats,
    /// Follow the items collection until interrupted
    Watch,
    /// Address token for a record key
    Encode { key: String },
    /// Record key behind an address token
    Decode { token: String },
}

#[derive(Args, Debug, Default)]
struct ItemArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// 1/lost, 2/found or 3/claimed
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_phone: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    image: Option<String>,
}

impl ItemArgs {
    fn apply_to(&self, view: &mut ItemFormView) {
        let fields = [
            (FormField::Title, &self.title),
            (FormField::Description, &self.description),
            (FormField::Status, &self.status),
            (FormField::Location, &self.location),
            (FormField::ContactName, &self.contact_name),
            (FormField::ContactPhone, &self.contact_phone),
            (FormField::ContactEmail, &self.contact_email),
            (FormField::Image, &self.image),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                view.set(field, value.as_str());
            }
        }
    }
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn sign_in(admin: &LostFoundAdmin, cli: &Cli) -> anyhow::Result<SessionContext> {
    let email = cli
        .email
        .as_deref()
        .context("operator email not provided via --email or LOSTFOUND_EMAIL")?;
    let password = cli
        .password
        .as_deref()
        .context("operator password not provided via --password or LOSTFOUND_PASSWORD")?;
    admin
        .sign_in(email, password)
        .await
        .with_context(|| format!("Sign-in failed for {}", email))
}

fn print_items(view: &ItemsListView) {
    if let Some(message) = view.empty_message() {
        println!("{}", message);
        return;
    }
    println!(
        "{:<24} {:<8} {:<20} {:<16} {:<10} TOKEN",
        "TITLE", "STATUS", "LOCATION", "CONTACT", "DATE"
    );
    for row in view.rows() {
        println!(
            "{:<24} {:<8} {:<20} {:<16} {:<10} {}",
            row.title(),
            row.status_label(),
            row.location(),
            row.contact(),
            row.date(),
            row.token.as_deref().unwrap_or("-")
        );
    }
}

fn print_item(view: &ItemDetailView) -> anyhow::Result<()> {
    let item = match view.status() {
        DetailStatus::Ready(item) => item,
        DetailStatus::NotFound => bail!(NOT_FOUND_MESSAGE),
        DetailStatus::Failed(message) => bail!("{}", message),
        DetailStatus::Loading => bail!("Item did not load"),
    };
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    println!("{} [{}]", item.title(), item.status_label());
    println!("{}", text(&item.description));
    if let Some(location) = &item.location {
        println!("Location:      {}", location);
    }
    println!("Reported:      {}", item.created_display());
    println!("Contact name:  {}", text(&item.contact_name));
    println!("Contact phone: {}", text(&item.contact_phone));
    if let Some(email) = &item.contact_email {
        println!("Contact email: {}", email);
    }
    if let Some(image) = &item.image {
        println!("Image:         {}", image);
    }
    if let Some(action) = view.offered_action() {
        println!("Action:        {}", action);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug);

    // Codec commands work offline
    match &cli.command {
        Commands::Encode { key } => {
            let codec = IdCodec::new(&config_secret());
            println!("{}", codec.encode(key)?);
            return Ok(());
        }
        Commands::Decode { token } => {
            let codec = IdCodec::new(&config_secret());
            println!("{}", codec.decode(token)?);
            return Ok(());
        }
        _ => {}
    }

    let admin = LostFoundAdmin::from_env().context("Failed to configure console")?;
    let context = sign_in(&admin, &cli).await?;

    match cli.command {
        Commands::Items { status, search } => {
            let mut view = ItemsListView::open(&context).await?;
            view.refresh().await;
            view.set_status_filter(status);
            if let Some(search) = search {
                view.set_search(&search);
            }
            if let Some(error) = &view.state().error {
                bail!("{}", error);
            }
            print_items(&view);
        }
        Commands::Show { token } => {
            let mut view = ItemDetailView::open(&context, &token).await;
            view.refresh().await;
            print_item(&view)?;
        }
        Commands::Mark { token } => {
            let mut view = ItemDetailView::open(&context, &token).await;
            view.refresh().await;
            print_item(&view)?;
            let action = view.advance().await?;
            println!("{}: done", action);
        }
        Commands::Create(fields) => {
            let mut view = ItemFormView::create(&context);
            fields.apply_to(&mut view);
            let (_, key) = view.submit().await?;
            println!("Created {} ({})", key, context.codec().encode(&key)?);
        }
        Commands::Edit { token, fields } => {
            let mut view = ItemFormView::edit(&context, &token).await;
            if let Some(error) = &view.state().error {
                bail!("{}", error);
            }
            fields.apply_to(&mut view);
            let (_, key) = view.submit().await?;
            println!("Saved {}", key);
        }
        Commands::Delete { key, yes } => {
            let mut view = ItemsListView::open(&context).await?;
            view.refresh().await;
            view.request_delete(&key)?;
            let title = view
                .pending_delete()
                .map(|row| row.title().to_string())
                .unwrap_or_default();
            if !yes {
                view.cancel_delete();
                println!(
                    "Would delete '{}' ({}). This cannot be undone; pass --yes to confirm.",
                    title, key
                );
                return Ok(());
            }
            view.confirm_delete().await?;
            println!("Deleted '{}' ({})", title, key);
        }
        Commands::Users => {
            let mut view = UsersListView::open(&context).await?;
            view.refresh().await;
            if let Some(message) = view.empty_message() {
                println!("{}", message);
            } else {
                println!("{:<24} {:<32} {:<14} ITEMS POSTED", "NAME", "EMAIL", "REGISTERED ON");
                for row in view.rows() {
                    println!(
                        "{:<24} {:<32} {:<14} {}",
                        row.name(),
                        row.email(),
                        row.registered(),
                        row.items_posted()
                    );
                }
            }
        }
        Commands::Stats => {
            let mut view = StatsView::open(&context).await?;
            view.refresh().await;
            let counts = view.counts();
            for status in ItemStatus::ALL {
                println!("{:<8} {}", status.label(), counts.count(Some(status)));
            }
            println!("{:<8} {}", "Unknown", counts.unknown);
            println!("{:<8} {}", "Total", counts.total());
        }
        Commands::Watch => {
            let mut view = ItemsListView::open(&context).await?;
            loop {
                tokio::select! {
                    more = view.refresh() => {
                        if !more {
                            println!("Stream ended");
                            break;
                        }
                        print_items(&view);
                        println!();
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
        Commands::Encode { .. } | Commands::Decode { .. } => unreachable!(),
    }

    Ok(())
}

fn config_secret() -> String {
    std::env::var("LOSTFOUND_URL_SECRET").unwrap_or_else(|_| ConsoleOptions::default().url_secret)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
