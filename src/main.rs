//! Feira CLI - manage and query the street-market database

use clap::{Args, Parser, Subcommand, ValueEnum};
use feira::config::{self, FeiraConfig};
use feira::ui::{self, Icons};
use feira::{FeiraStore, NewProduct, NewUser, NewVendor, SchemaManager, UserRole};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "feira")]
#[command(version)]
#[command(about = "Data access for a local street-market (feira livre) marketplace")]
#[command(long_about = r#"
Feira manages the marketplace database: schema creation, users, vendor
stalls, products, carts and reviews.

Example usage:
  feira init --seed
  feira user add --email ana@exemplo.com --password-hash abc --name Ana
  feira products --category 1
  feira cart add --user-id 1 --product-id 3 --quantity 2
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables and indexes (safe to re-run)
    Init {
        /// Insert the sample categories
        #[arg(long)]
        seed: bool,
    },

    /// Show table and row counts
    Stats,

    /// Create or look up users
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Register a vendor stall for an existing user
    Vendor(VendorArgs),

    /// Create products or list categories
    Product {
        #[command(subcommand)]
        action: ProductCommand,
    },

    /// List active products, best rated first
    Products {
        /// Restrict to one category id
        #[arg(short, long)]
        category: Option<i64>,

        /// Search latitude (accepted, not yet applied)
        #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
        lat: f64,

        /// Search longitude (accepted, not yet applied)
        #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
        lon: f64,

        /// Search radius in km (accepted, not yet applied)
        #[arg(long, default_value = "10")]
        radius: f64,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Add to or show a user's cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },

    /// Rate a vendor or a product
    Review {
        #[command(subcommand)]
        action: ReviewCommand,
    },

    /// Write a config file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password_hash: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
        /// cliente, feirante or admin
        #[arg(long)]
        role: Option<String>,
    },
    Find {
        #[arg(long)]
        email: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Args)]
struct VendorArgs {
    #[arg(long)]
    user_id: i64,
    /// Stall name
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    /// e.g. 07:00-13:00
    #[arg(long)]
    hours: Option<String>,
    #[arg(long)]
    days: Option<String>,
}

#[derive(Subcommand)]
enum ProductCommand {
    Add {
        #[arg(long)]
        vendor_id: i64,
        #[arg(long)]
        category_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "0")]
        stock: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },
    Categories,
}

#[derive(Subcommand)]
enum CartCommand {
    Add {
        #[arg(long)]
        user_id: i64,
        #[arg(long)]
        product_id: i64,
        #[arg(short, long, default_value = "1")]
        quantity: i64,
    },
    Show {
        #[arg(long)]
        user_id: i64,
    },
}

#[derive(Subcommand)]
enum ReviewCommand {
    Vendor {
        #[arg(long)]
        vendor_id: i64,
        #[arg(long)]
        user_id: i64,
        /// 0 to 5
        #[arg(long)]
        rating: f64,
        #[arg(long)]
        comment: Option<String>,
    },
    Product {
        #[arg(long)]
        product_id: i64,
        #[arg(long)]
        user_id: i64,
        /// 0 to 5
        #[arg(long)]
        rating: f64,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write feira.toml pointing at the current database
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?;
    let database = config::resolve_database(cli.database, file_config.as_ref());
    tracing::debug!("Using database {}", database.display());

    match cli.command {
        Commands::Init { seed } => {
            config::ensure_db_dir(&database)?;
            let mut manager = SchemaManager::new(&database);
            let result = manager.initialize(seed);
            manager.close()?;
            result?;

            ui::success("Schema ready");
            ui::info("Database", &database.display().to_string());
        }

        Commands::Stats => {
            let store = FeiraStore::new(&database);
            let stats = store.stats()?;
            ui::header(&format!("Feira statistics ({})", database.display()));
            println!("{}", ui::stats_table(&stats));
            if stats.tables < stats.expected_tables {
                ui::warn("Schema incomplete, run `feira init`");
            }
        }

        Commands::User { action } => run_user(&FeiraStore::new(&database), action)?,

        Commands::Vendor(args) => {
            let store = FeiraStore::new(&database);
            let vendor = NewVendor {
                user_id: args.user_id,
                stall_name: args.name,
                description: args.description,
                opening_hours: args.hours,
                operating_days: args.days,
            };
            let id = store.create_vendor(&vendor)?;
            ui::success(&format!("Vendor created with id {}", id));
        }

        Commands::Product { action } => {
            let store = FeiraStore::new(&database);
            match action {
                ProductCommand::Add {
                    vendor_id,
                    category_id,
                    name,
                    price,
                    stock,
                    description,
                    lat,
                    lon,
                } => {
                    let product = NewProduct {
                        vendor_id,
                        category_id,
                        name,
                        description,
                        price,
                        stock,
                        latitude: lat,
                        longitude: lon,
                    };
                    let id = store.create_product(&product)?;
                    ui::success(&format!("Product created with id {}", id));
                }
                ProductCommand::Categories => {
                    let categories = store.list_categories()?;
                    if categories.is_empty() {
                        ui::warn("No categories; run `feira init --seed`");
                    } else {
                        println!("{}", ui::categories_table(&categories));
                    }
                }
            }
        }

        Commands::Products { category, lat, lon, radius, format } => {
            let store = FeiraStore::new(&database);
            let products = store.list_products_by_location(lat, lon, radius, category)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&products)?),
                Format::Text if products.is_empty() => ui::warn("No products found"),
                Format::Text => {
                    ui::header(&format!("{} products", products.len()));
                    println!("{}", ui::products_table(&products));
                    println!(
                        "{}",
                        ui::dim(&format!("{} location filter not applied yet", Icons::PIN))
                    );
                }
            }
        }

        Commands::Cart { action } => {
            let store = FeiraStore::new(&database);
            match action {
                CartCommand::Add { user_id, product_id, quantity } => {
                    let line = store.add_to_cart(user_id, product_id, quantity)?;
                    ui::success(&format!(
                        "{} {} x{} in cart {}",
                        Icons::CART,
                        line.product_name,
                        line.quantity,
                        line.cart_id
                    ));
                }
                CartCommand::Show { user_id } => {
                    let lines = store.cart_lines(user_id)?;
                    if lines.is_empty() {
                        ui::warn("Cart is empty");
                    } else {
                        let total: f64 = lines.iter().map(|l| l.unit_price * l.quantity as f64).sum();
                        println!("{}", ui::cart_table(&lines));
                        ui::summary_row("Total:", &format!("R$ {:.2}", total));
                    }
                }
            }
        }

        Commands::Review { action } => {
            let store = FeiraStore::new(&database);
            let id = match action {
                ReviewCommand::Vendor { vendor_id, user_id, rating, comment } => {
                    store.review_vendor(vendor_id, user_id, rating, comment.as_deref())?
                }
                ReviewCommand::Product { product_id, user_id, rating, comment } => {
                    store.review_product(product_id, user_id, rating, comment.as_deref())?
                }
            };
            ui::success(&format!("{} Review {} saved", Icons::STAR, id));
        }

        Commands::Config { action } => match action {
            ConfigCommand::Init { force } => {
                let path = cli.config.unwrap_or_else(config::default_config_path);
                let contents = FeiraConfig {
                    database: Some(database.display().to_string()),
                };
                config::write_config(&path, &contents, force)?;
                ui::success(&format!("Wrote {}", path.display()));
            }
        },
    }

    Ok(())
}

fn run_user(store: &FeiraStore, action: UserCommand) -> anyhow::Result<()> {
    match action {
        UserCommand::Add { email, password_hash, name, phone, lat, lon, role } => {
            let role = role.as_deref().map(str::parse::<UserRole>).transpose()?;
            let user = NewUser {
                email,
                password_hash,
                name,
                phone,
                latitude: lat,
                longitude: lon,
                role,
            };
            match store.create_user(&user) {
                Ok(id) => ui::success(&format!("{} User created with id {}", Icons::PERSON, id)),
                Err(e) if e.is_duplicate() => {
                    ui::error("Email already registered");
                    return Err(e.into());
                }
                Err(e) => {
                    ui::error("Could not create user, try again");
                    return Err(e.into());
                }
            }
        }
        UserCommand::Find { email, format } => match store.find_user_by_email(&email)? {
            Some(user) => match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                Format::Text => {
                    ui::header(&user.name);
                    ui::summary_row("ID:", &user.id.to_string());
                    ui::summary_row("Email:", &user.email);
                    ui::summary_row("Role:", user.role.as_str());
                    ui::summary_row("Phone:", user.phone.as_deref().unwrap_or("-"));
                    if let (Some(lat), Some(lon)) = (user.latitude, user.longitude) {
                        ui::summary_row("Location:", &format!("{}, {}", lat, lon));
                    }
                    ui::summary_row("Active:", &user.active.to_string());
                    ui::summary_row("Created:", &user.created_at.to_string());
                }
            },
            None => ui::warn(&format!("No user with email {}", email)),
        },
    }
    Ok(())
}
