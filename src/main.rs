//! Pokédex command line
//!
//! Browse the public catalog and manage your own collection on the
//! personal backend.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pokedex::config::{default_session_path, DEFAULT_BACKEND_URL, DEFAULT_CATALOG_URL};
use pokedex::formatters::{
    format_catalog_page, format_collection_page, format_detail, format_summaries,
};
use pokedex::{
    ApiError, ApiResult, CollectionBrowser, CollectionQuery, Config, Pokedex, Registration, SortBy,
    SortDir,
};

/// Pokédex client for the public catalog and your personal collection
#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(version, about, long_about = None)]
struct Args {
    /// Personal backend base URL
    #[arg(long, env = "POKEDEX_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Public catalog base URL
    #[arg(long, env = "POKEDEX_CATALOG_URL", default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,

    /// Session file (default: ~/.local/share/pokedex/session.json)
    #[arg(long, env = "POKEDEX_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "POKEDEX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Forget the stored session
    Logout,
    /// List all Pokémon types
    Types,
    /// List Pokémon of one type
    ByType { name: String },
    /// Page through the public catalog
    Catalog {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show one Pokémon, from your collection if caught
    Show { id: u32 },
    /// List your collection
    Mine {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// One of 5, 10, 20, 50
        #[arg(long, default_value_t = 10)]
        page_size: u32,
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
        /// name or caughtAt
        #[arg(long, default_value = "caughtAt")]
        sort_by: SortBy,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        sort_dir: SortDir,
    },
    /// Add a Pokémon to your collection
    Catch { id: u32 },
    /// Remove a Pokémon from your collection
    Release { id: u32 },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::default()
        .with_backend_url(&args.backend_url)
        .with_catalog_url(&args.catalog_url)
        .with_session_path(args.session_file.clone().or_else(default_session_path));

    let dex = match Pokedex::new(&config) {
        Ok(dex) => dex,
        Err(e) => {
            log::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&dex, args.command).await {
        log::error!("{}", e);
        eprintln!("Error: {e}");
        if e.is_unauthorized() {
            eprintln!("Sign in with `pokedex login --email <EMAIL>`");
        }
        std::process::exit(1);
    }
}

async fn run(dex: &Pokedex, command: Command) -> ApiResult<()> {
    match command {
        Command::Login { email, password } => {
            dex.login(&email, &password).await?;
            println!("Signed in as {email}");
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            let registration = Registration {
                email,
                password,
                confirm_password,
                username,
            };
            dex.register(&registration).await?;
            println!("Registered {}. Sign in with `pokedex login`.", registration.email);
        }
        Command::Logout => {
            dex.logout()?;
            println!("Signed out");
        }
        Command::Types => {
            let types = dex.catalog().list_types()?.data().await?;
            for name in types.iter() {
                println!("{name}");
            }
        }
        Command::ByType { name } => {
            let members = dex.catalog().list_by_type(&name)?.data().await?;
            print!("{}", format_summaries(&members));
        }
        Command::Catalog { limit, offset } => {
            let page = dex.catalog().list_page(limit, offset)?.data().await?;
            print!("{}", format_catalog_page(&page, limit, offset));
        }
        Command::Show { id } => {
            let resolved = dex.resolve_detail(id).await?;
            print!("{}", format_detail(&resolved));
        }
        Command::Mine {
            page,
            page_size,
            search,
            sort_by,
            sort_dir,
        } => {
            require_session(dex)?;
            let query = CollectionQuery::default()
                .page(page)
                .page_size(page_size)
                .search(search.as_deref())
                .sort(sort_by, sort_dir);
            let browser = CollectionBrowser::with_query(query)?;
            let page = browser.subscribe(dex.collection())?.data().await?;
            print!("{}", format_collection_page(&page, browser.query()));
        }
        Command::Catch { id } => {
            require_session(dex)?;
            let receipt = dex.catch_by_id(id).await?;
            println!("Caught #{}", receipt.id);
        }
        Command::Release { id } => {
            require_session(dex)?;
            let receipt = dex.collection().release(id).await?;
            match receipt.total {
                Some(total) => println!("Released #{} ({} left)", receipt.id, total),
                None => println!("Released #{}", receipt.id),
            }
        }
    }
    Ok(())
}

/// Personal views need a session; without one, send the user to `login`.
fn require_session(dex: &Pokedex) -> ApiResult<()> {
    if dex.is_authenticated() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("not signed in".to_string()))
    }
}

