//! LibraryCard CLI
//!
//! Catalog books from the terminal against a LibraryCard server.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use librarycard::{
    catalog::{self, Selection},
    error::{AppError, Result},
    models::{
        Book, BookMetadata, Config, NewLocation, ProfileUpdate, RegisterRequest, User, UserRole,
    },
    services::{LibraryClient, MetadataClient, VisionClient},
    storage::{
        AUTH_TOKEN_KEY, CURRENT_USER_KEY, ConsentGatedStorage, ConsentPreferences,
        LAST_LOCATION_KEY, LAST_SHELF_KEY, LocalStore, StorageCategory,
    },
    utils::{isbn, truncate},
    validation,
};

/// LibraryCard - personal library cataloging
#[derive(Parser, Debug)]
#[command(name = "librarycard", version, about = "Catalog your books with LibraryCard")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "librarycard.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one or more ISBNs
    Lookup {
        #[arg(required = true)]
        isbns: Vec<String>,

        /// Print the merged metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search Google Books by free text
    Search { query: String },

    /// Find ISBNs in a photo of a cover or barcode
    Scan {
        image: PathBuf,

        /// Also look up each ISBN found
        #[arg(long)]
        lookup: bool,
    },

    /// Sign in and remember the session
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
        /// Cloudflare Turnstile token, when the server requires one
        #[arg(long)]
        turnstile: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Create an account
    Register {
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        turnstile: Option<String>,
    },

    /// Update the signed-in user's profile
    Profile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    #[command(subcommand)]
    Password(PasswordCommand),

    #[command(subcommand)]
    Books(BooksCommand),

    #[command(subcommand)]
    Locations(LocationsCommand),

    #[command(subcommand)]
    Shelves(ShelvesCommand),

    #[command(subcommand)]
    Invites(InvitesCommand),

    #[command(subcommand)]
    Admin(AdminCommand),

    #[command(subcommand)]
    Consent(ConsentCommand),

    /// Validate the configuration file
    Validate,
}

/// Password checks and changes
#[derive(Subcommand, Debug)]
enum PasswordCommand {
    /// Report which strength rules a password meets
    Check { password: String },
    /// Email a reset link
    ResetRequest { email: String },
    /// Set a new password with an emailed token
    Reset {
        token: String,
        password: String,
        confirm: String,
    },
    /// Change the signed-in user's password
    Change {
        current: String,
        new: String,
        confirm: String,
    },
}

#[derive(Args, Debug)]
struct ShelfArgs {
    /// Target shelf (defaults to the last shelf used)
    #[arg(long)]
    shelf: Option<i64>,

    #[arg(long = "tag")]
    tags: Vec<String>,
}

/// Books in your locations
#[derive(Subcommand, Debug)]
enum BooksCommand {
    List {
        #[arg(long)]
        location: Option<i64>,
    },
    /// Look up an ISBN and add it to a shelf
    Add {
        isbn: String,
        #[command(flatten)]
        target: ShelfArgs,
        /// Add even if the library already has this edition
        #[arg(long)]
        force: bool,
    },
    /// Look up several ISBNs and add the new ones
    BulkAdd {
        #[arg(required = true)]
        isbns: Vec<String>,
        #[command(flatten)]
        target: ShelfArgs,
    },
    Checkout { id: i64 },
    Return { id: i64 },
    Move { id: i64, shelf: i64 },
    Remove { id: i64 },
    /// Ask an admin to remove a book
    RequestRemoval {
        id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum LocationsCommand {
    List,
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: i64 },
    Leave { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ShelvesCommand {
    List {
        /// Defaults to the last location used
        #[arg(long)]
        location: Option<i64>,
    },
    Create { location: i64, name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum InvitesCommand {
    List { location: i64 },
    Send { location: i64, email: String },
    Revoke { id: i64 },
    Accept { token: String },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    Users,
    SetRole { id: i64, role: String },
    DeleteUser { id: i64 },
    Locations,
    Transfer { location: i64, owner: i64 },
    Removals,
    Approve { id: i64 },
    Deny { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ConsentCommand {
    Show,
    Set {
        /// Allow remembering the last shelf and location
        #[arg(long)]
        functional: bool,
        #[arg(long)]
        analytics: bool,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Shared state for one CLI invocation.
struct App {
    config: Config,
    storage: ConsentGatedStorage<LocalStore>,
}

impl App {
    fn new(config: Config) -> Self {
        let storage = ConsentGatedStorage::new(LocalStore::new(&config.storage.dir));
        Self { config, storage }
    }

    fn metadata(&self) -> Result<MetadataClient> {
        MetadataClient::new(&self.config.metadata, &self.config.api.user_agent)
    }

    /// API client carrying the stored session token, if any.
    async fn api(&self) -> Result<LibraryClient> {
        let mut client = LibraryClient::new(&self.config.api)?;
        client.set_token(
            self.storage
                .get(StorageCategory::Essential, AUTH_TOKEN_KEY)
                .await?,
        );
        Ok(client)
    }

    async fn save_session(&self, token: &str, user: &User) -> Result<()> {
        self.storage
            .set(StorageCategory::Essential, AUTH_TOKEN_KEY, token)
            .await?;
        self.storage
            .set_json(StorageCategory::Essential, CURRENT_USER_KEY, user)
            .await?;
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        self.storage.remove(AUTH_TOKEN_KEY).await?;
        self.storage.remove(CURRENT_USER_KEY).await?;
        Ok(())
    }

    /// Resolve a shelf argument, falling back to the remembered one.
    async fn shelf_or_last(&self, shelf: Option<i64>) -> Result<i64> {
        if let Some(id) = shelf {
            self.storage
                .set_json(StorageCategory::Functional, LAST_SHELF_KEY, &id)
                .await?;
            return Ok(id);
        }
        self.storage
            .get_json(StorageCategory::Functional, LAST_SHELF_KEY)
            .await?
            .ok_or_else(|| AppError::validation("No shelf given (use --shelf)"))
    }

    async fn location_or_last(&self, location: Option<i64>) -> Result<i64> {
        if let Some(id) = location {
            self.storage
                .set_json(StorageCategory::Functional, LAST_LOCATION_KEY, &id)
                .await?;
            return Ok(id);
        }
        self.storage
            .get_json(StorageCategory::Functional, LAST_LOCATION_KEY)
            .await?
            .ok_or_else(|| AppError::validation("No location given (use --location)"))
    }
}

/// Read a secret from stdin when it was not passed as an argument.
fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_metadata(meta: &BookMetadata) {
    println!("{}  {}", meta.isbn, meta.title);
    if !meta.authors.is_empty() {
        println!("    by {}", meta.authors.join(", "));
    }
    if let Some(year) = meta.published_year() {
        println!("    published {}", year);
    }
    if !meta.enrichment.enhanced_genres.is_empty() {
        println!("    genres: {}", meta.enrichment.enhanced_genres.join(", "));
    }
    if let Some(series) = &meta.enrichment.series {
        println!("    series: {}", series);
    }
    if let Some(description) = &meta.description {
        println!("    {}", truncate(description, 160));
    }
}

fn print_book(book: &Book) {
    let status = if book.is_checked_out() { "out" } else { "in" };
    println!(
        "{:>6}  [{}] {} by {}{}",
        book.id,
        status,
        book.title,
        book.author_line(),
        book.primary_genre()
            .map(|g| format!(" ({})", g))
            .unwrap_or_default()
    );
}

async fn run_lookup(app: &App, isbns: Vec<String>, json: bool) -> Result<()> {
    let metadata = app.metadata()?;
    let mut found = Vec::new();

    for (raw, result) in metadata.lookup_many(&isbns).await {
        match result {
            Ok(Some(meta)) => found.push(meta),
            Ok(None) => log::warn!("No metadata found for {}", raw),
            Err(e) => log::error!("{}", e),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        found.iter().for_each(print_metadata);
    }
    Ok(())
}

async fn run_scan(app: &App, image: &Path, lookup: bool) -> Result<()> {
    let bytes = tokio::fs::read(image).await?;
    let vision = VisionClient::new(&app.config.vision, &app.config.api.user_agent)?;
    let isbns = vision.detect_isbns(&bytes).await?;

    if isbns.is_empty() {
        log::warn!("No ISBN found in {}", image.display());
        return Ok(());
    }
    if lookup {
        return run_lookup(app, isbns, false).await;
    }
    for found in isbns {
        println!("{}", found);
    }
    Ok(())
}

async fn run_books(app: &App, command: BooksCommand) -> Result<()> {
    let api = app.api().await?;

    match command {
        BooksCommand::List { location } => {
            let books = api.list_books(location).await?;
            log::info!("{} book(s)", books.len());
            books.iter().for_each(print_book);
        }

        BooksCommand::Add {
            isbn: raw,
            target,
            force,
        } => {
            let normalized = isbn::parse(&raw)?;
            let shelf_id = app.shelf_or_last(target.shelf).await?;
            let meta = app
                .metadata()?
                .lookup_isbn(&normalized)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No metadata for ISBN {}", normalized)))?;

            if !force {
                let library = api.list_books(None).await?;
                if let Some(existing) = catalog::find_duplicate(&meta, &library) {
                    log::warn!(
                        "'{}' is already in your library (book {}). Use --force to add anyway.",
                        existing.title,
                        existing.id
                    );
                    return Ok(());
                }
            }

            let book = api.add_book(&meta.into_new_book(shelf_id, target.tags)).await?;
            log::info!("Added '{}' to shelf {}", book.title, shelf_id);
            print_book(&book);
        }

        BooksCommand::BulkAdd { isbns, target } => {
            let shelf_id = app.shelf_or_last(target.shelf).await?;
            let mut selection = Selection::new();
            for (raw, result) in app.metadata()?.lookup_many(&isbns).await {
                match result {
                    Ok(Some(meta)) => {
                        selection.select(meta);
                    }
                    Ok(None) => log::warn!("No metadata found for {}", raw),
                    Err(e) => log::error!("{}", e),
                }
            }
            if selection.is_empty() {
                return Err(AppError::validation("Nothing to add"));
            }

            let report = catalog::bulk_add(&api, shelf_id, selection.take(), &target.tags).await?;
            for item in &report.failed {
                log::error!("Failed to add '{}': {}", item.title, item.error);
            }
            log::info!("{}", report.summary());
        }

        BooksCommand::Checkout { id } => print_book(&api.checkout_book(id).await?),
        BooksCommand::Return { id } => print_book(&api.return_book(id).await?),
        BooksCommand::Move { id, shelf } => print_book(&api.move_book(id, shelf).await?),

        BooksCommand::Remove { id } => {
            api.delete_book(id).await?;
            log::info!("Deleted book {}", id);
        }

        BooksCommand::RequestRemoval { id, reason } => {
            let request = api.request_removal(id, reason.as_deref()).await?;
            log::info!(
                "Removal request {} for book {} is {}",
                request.id,
                request.book_id,
                request.status.as_str()
            );
        }
    }
    Ok(())
}

async fn run_locations(app: &App, command: LocationsCommand) -> Result<()> {
    let api = app.api().await?;

    match command {
        LocationsCommand::List => {
            for location in api.list_locations().await? {
                println!("{:>6}  {}", location.id, location.name);
            }
        }
        LocationsCommand::Create { name, description } => {
            let location = api
                .create_location(&NewLocation { name, description })
                .await?;
            app.location_or_last(Some(location.id)).await?;
            log::info!("Created location {} ({})", location.name, location.id);
        }
        LocationsCommand::Delete { id } => {
            api.delete_location(id).await?;
            log::info!("Deleted location {}", id);
        }
        LocationsCommand::Leave { id } => {
            api.leave_location(id).await?;
            log::info!("Left location {}", id);
        }
    }
    Ok(())
}

async fn run_shelves(app: &App, command: ShelvesCommand) -> Result<()> {
    let api = app.api().await?;

    match command {
        ShelvesCommand::List { location } => {
            let location_id = app.location_or_last(location).await?;
            for shelf in api.list_shelves(location_id).await? {
                println!("{:>6}  {}", shelf.id, shelf.name);
            }
        }
        ShelvesCommand::Create { location, name } => {
            let shelf = api.create_shelf(location, &name).await?;
            app.shelf_or_last(Some(shelf.id)).await?;
            log::info!("Created shelf {} ({})", shelf.name, shelf.id);
        }
        ShelvesCommand::Rename { id, name } => {
            let shelf = api.rename_shelf(id, &name).await?;
            log::info!("Renamed shelf {} to {}", shelf.id, shelf.name);
        }
        ShelvesCommand::Delete { id } => {
            api.delete_shelf(id).await?;
            log::info!("Deleted shelf {}", id);
        }
    }
    Ok(())
}

async fn run_invites(app: &App, command: InvitesCommand) -> Result<()> {
    let api = app.api().await?;

    match command {
        InvitesCommand::List { location } => {
            let now = chrono::Utc::now();
            for invite in api.list_invitations(location).await? {
                println!(
                    "{:>6}  {}  {}  expires {}",
                    invite.id,
                    invite.invited_email,
                    invite.status(now).as_str(),
                    invite.expires_at.format("%Y-%m-%d")
                );
            }
        }
        InvitesCommand::Send { location, email } => {
            let invite = api.invite(location, &email).await?;
            log::info!("Invited {} (invitation {})", invite.invited_email, invite.id);
        }
        InvitesCommand::Revoke { id } => {
            api.revoke_invitation(id).await?;
            log::info!("Revoked invitation {}", id);
        }
        InvitesCommand::Accept { token } => {
            let location = api.accept_invitation(&token).await?;
            log::info!("Joined {}", location.name);
        }
    }
    Ok(())
}

async fn run_admin(app: &App, command: AdminCommand) -> Result<()> {
    let api = app.api().await?;

    match command {
        AdminCommand::Users => {
            for entry in api.list_users().await? {
                println!(
                    "{:>6}  {:<6} {}  ({} books, {} locations)",
                    entry.user.id,
                    entry.user.user_role.as_str(),
                    entry.user.email,
                    entry.books_added,
                    entry.locations_joined
                );
            }
        }
        AdminCommand::SetRole { id, role } => {
            let role = UserRole::parse(&role)
                .ok_or_else(|| AppError::validation(format!("Unknown role '{}'", role)))?;
            let updated = api.set_user_role(id, role).await?;
            log::info!("{} is now {}", updated.user.email, updated.user.user_role.as_str());
        }
        AdminCommand::DeleteUser { id } => {
            api.delete_user(id).await?;
            log::info!("Deleted user {}", id);
        }
        AdminCommand::Locations => {
            for location in api.list_all_locations().await? {
                println!(
                    "{:>6}  {}  (owner {})",
                    location.id, location.name, location.owner_id
                );
            }
        }
        AdminCommand::Transfer { location, owner } => {
            let location = api.transfer_ownership(location, owner).await?;
            log::info!("{} now belongs to user {}", location.name, location.owner_id);
        }
        AdminCommand::Removals => {
            for request in api.list_removal_requests().await? {
                println!(
                    "{:>6}  {:<8} book {} '{}'  {}",
                    request.id,
                    request.status.as_str(),
                    request.book_id,
                    request.book_title.as_deref().unwrap_or("?"),
                    request.reason.as_deref().unwrap_or("")
                );
            }
        }
        AdminCommand::Approve { id } => {
            let request = api.approve_removal(id).await?;
            log::info!("Approved removal request {}", request.id);
        }
        AdminCommand::Deny { id } => {
            let request = api.deny_removal(id).await?;
            log::info!("Denied removal request {}", request.id);
        }
    }
    Ok(())
}

async fn run_password(app: &App, command: PasswordCommand) -> Result<()> {
    match command {
        PasswordCommand::Check { password } => {
            let failures = validation::password_failures(&password);
            for rule in validation::PasswordRule::ALL {
                let mark = if failures.contains(&rule) { "✗" } else { "✓" };
                println!("{} {}", mark, rule);
            }
            if !failures.is_empty() {
                return Err(AppError::validation("Password is too weak"));
            }
        }
        PasswordCommand::ResetRequest { email } => {
            app.api().await?.request_password_reset(&email).await?;
            log::info!("If {} has an account, a reset email is on its way", email);
        }
        PasswordCommand::Reset {
            token,
            password,
            confirm,
        } => {
            app.api()
                .await?
                .reset_password(&token, &password, &confirm)
                .await?;
            log::info!("Password reset. You can now log in.");
        }
        PasswordCommand::Change {
            current,
            new,
            confirm,
        } => {
            app.api()
                .await?
                .change_password(&current, &new, &confirm)
                .await?;
            log::info!("Password changed");
        }
    }
    Ok(())
}

async fn run_consent(app: &App, command: ConsentCommand) -> Result<()> {
    match command {
        ConsentCommand::Show => {
            let prefs = app.storage.consent().await?;
            println!("essential:  {}", prefs.essential);
            println!("functional: {}", prefs.functional);
            println!("analytics:  {}", prefs.analytics);
            if let Some(at) = prefs.updated_at {
                println!("updated:    {}", at.to_rfc3339());
            }
        }
        ConsentCommand::Set {
            functional,
            analytics,
        } => {
            app.storage
                .set_consent(&ConsentPreferences::new(functional, analytics))
                .await?;
            log::info!("Consent saved");
        }
    }
    Ok(())
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Lookup { isbns, json } => run_lookup(app, isbns, json).await?,

        Command::Search { query } => {
            let results = app.metadata()?.search(&query).await?;
            log::info!("{} result(s) for '{}'", results.len(), query);
            results.iter().for_each(print_metadata);
        }

        Command::Scan { image, lookup } => run_scan(app, &image, lookup).await?,

        Command::Login {
            email,
            password,
            turnstile,
        } => {
            let password = password_or_prompt(password)?;
            let mut api = app.api().await?;
            let session = api.login(&email, &password, turnstile).await?;
            app.save_session(&session.token, &session.user).await?;
            log::info!("Welcome, {}", session.user.display_name());
        }

        Command::Logout => {
            app.clear_session().await?;
            log::info!("Signed out");
        }

        Command::Whoami => {
            let user = match app.api().await?.current_user().await {
                Ok(user) => user,
                Err(e) if e.is_unauthorized() => {
                    app.clear_session().await?;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            app.storage
                .set_json(StorageCategory::Essential, CURRENT_USER_KEY, &user)
                .await?;
            println!(
                "{} <{}> ({})",
                user.display_name(),
                user.email,
                user.user_role.as_str()
            );
        }

        Command::Register {
            email,
            first_name,
            last_name,
            password,
            turnstile,
        } => {
            let request = RegisterRequest {
                email,
                password: password_or_prompt(password)?,
                first_name,
                last_name,
                turnstile_token: turnstile,
            };
            let mut api = app.api().await?;
            let session = api.register(&request).await?;
            app.save_session(&session.token, &session.user).await?;
            log::info!("Account created for {}", session.user.email);
        }

        Command::Profile {
            first_name,
            last_name,
            email,
        } => {
            let update = ProfileUpdate {
                first_name,
                last_name,
                email,
            };
            let user = app.api().await?.update_profile(&update).await?;
            app.storage
                .set_json(StorageCategory::Essential, CURRENT_USER_KEY, &user)
                .await?;
            log::info!("Profile updated for {}", user.display_name());
        }

        Command::Password(command) => run_password(app, command).await?,
        Command::Books(command) => run_books(app, command).await?,
        Command::Locations(command) => run_locations(app, command).await?,
        Command::Shelves(command) => run_shelves(app, command).await?,
        Command::Invites(command) => run_invites(app, command).await?,
        Command::Admin(command) => run_admin(app, command).await?,
        Command::Consent(command) => run_consent(app, command).await?,

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = app.config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = loaded
        .unwrap_or_else(|e| {
            log::debug!(
                "Config load failed from {}: {}. Using defaults.",
                cli.config.display(),
                e
            );
            Config::default()
        })
        .with_env_overrides();
    log::debug!("API base URL: {}", config.api.base_url);

    let app = App::new(config);
    run(&app, cli.command).await
}
