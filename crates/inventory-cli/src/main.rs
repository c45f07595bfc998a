use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use inventory_core::keystore::{lookup_cipher_key, KeyLookup};
use inventory_core::{load_settings, save_settings, AppContext, InventoryConfig, NewItem};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted inventory store", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory; overrides config and INVENTORY_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the key pair and database if missing
    Init,
    /// Show configuration and key state without opening the database
    Status,
    /// Inspect or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Manage inventory items
    Items {
        #[command(subcommand)]
        action: ItemsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    Set { field: String, value: String },
}

#[derive(Subcommand, Debug)]
enum ItemsCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value_t = 1)]
        quantity: i64,
        /// Blank supplier fields take the stored defaults when
        /// enable_default_fields is on
        #[arg(long, default_value = "")]
        supplier: String,
        #[arg(long, default_value = "")]
        supplier_email: String,
        #[arg(long, default_value = "")]
        supplier_phone: String,
    },
    Remove { id: i64 },
    /// Print an item as shareable text
    Share { id: i64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = InventoryConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    if let Commands::Status = cli.command {
        return status_command(config);
    }

    let ctx = AppContext::new(config).context("creating application context")?;
    let result = match cli.command {
        Commands::Init => init_command(&ctx),
        Commands::Settings { action } => settings_command(&ctx, action),
        Commands::Items { action } => items_command(&ctx, action),
        Commands::Status => Ok(()),
    };
    ctx.shutdown().context("closing database")?;
    result
}

fn init_command(ctx: &AppContext) -> Result<()> {
    let db = ctx.database().context("opening encrypted database")?;
    println!("Database: {}", db.path().display());
    println!("Schema version: {}", db.schema_version());
    println!("Key fingerprint: {}", db.key_fingerprint());
    println!("Items: {}", db.item_count()?);
    Ok(())
}

fn status_command(config: InventoryConfig) -> Result<()> {
    let db_path = config.database_path()?;
    let alias = config.keystore.alias.clone();
    let ctx = AppContext::new(config).context("creating application context")?;
    let keystore = ctx.bootstrapper().keystore();

    let key_state = match keystore.load() {
        Err(e) => format!("unavailable ({e})"),
        Ok(()) => match lookup_cipher_key(keystore.as_ref(), &alias) {
            KeyLookup::Found(key) => format!("present ({})", key.fingerprint()),
            KeyLookup::NotFound => "absent".to_string(),
            KeyLookup::WrongType(kind) => format!("wrong entry type ({kind:?})"),
            KeyLookup::Corrupt(e) => format!("corrupt ({e})"),
            KeyLookup::Failed(e) => format!("error ({e})"),
        },
    };

    println!("Keystore backend: {}", keystore.name());
    println!("Key alias: {alias}");
    println!("Key: {key_state}");
    println!(
        "Database: {} ({})",
        db_path.display(),
        if db_path.exists() { "exists" } else { "missing" }
    );
    println!("Schema version: {}", ctx.config().database.schema_version);
    ctx.shutdown()?;
    Ok(())
}

fn settings_command(ctx: &AppContext, action: SettingsCommand) -> Result<()> {
    let db = ctx.database().context("opening encrypted database")?;
    let mut settings = load_settings(&db)?;
    match action {
        SettingsCommand::Show => {}
        SettingsCommand::Set { field, value } => {
            settings.set_field(&field, &value)?;
            save_settings(&db, &settings)?;
            info!(%field, "setting updated");
        }
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn items_command(ctx: &AppContext, action: ItemsCommand) -> Result<()> {
    let db = ctx.database().context("opening encrypted database")?;
    match action {
        ItemsCommand::List => {
            let settings = load_settings(&db)?;
            for item in db.all_items()? {
                let item = settings.present(item);
                println!(
                    "{:>5}  {:<30} {:>10.2}  x{}",
                    item.id, item.name, item.price, item.quantity
                );
                if !item.supplier_name.is_empty() {
                    println!(
                        "       supplier: {} <{}> {}",
                        item.supplier_name, item.supplier_email, item.supplier_phone
                    );
                }
            }
        }
        ItemsCommand::Add {
            name,
            price,
            quantity,
            supplier,
            supplier_email,
            supplier_phone,
        } => {
            let settings = load_settings(&db)?;
            let item = settings.apply_defaults(NewItem::new(name, price, quantity).with_supplier(
                supplier,
                supplier_email,
                supplier_phone,
            ));
            let id = db.insert_item(&item)?;
            println!("Added item {id}");
        }
        ItemsCommand::Remove { id } => {
            if !db.delete_item(id)? {
                return Err(anyhow!("no item with id {id}"));
            }
            println!("Removed item {id}");
        }
        ItemsCommand::Share { id } => {
            let settings = load_settings(&db)?;
            if !settings.sharing_allowed() {
                return Err(anyhow!("sharing is disabled in settings"));
            }
            let item = db
                .get_item(id)?
                .ok_or_else(|| anyhow!("no item with id {id}"))?;
            let item = settings.present(item);
            println!("Item: {}", item.name);
            println!("Price: {:.2}", item.price);
            println!("Quantity in stock: {}", item.quantity);
            println!("Supplier: {}", item.supplier_name);
            println!("Email: {}", item.supplier_email);
            println!("Phone: {}", item.supplier_phone);
        }
    }
    Ok(())
}
