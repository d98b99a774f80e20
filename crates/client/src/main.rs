//! isperp - command-line client for the ISP ERP backend.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use isperp_auth::{Credentials, LoginOutcome, Navigation, SessionEvent, SetupOutcome, gate};
use isperp_client::config::{
    ENV_API_URL, ENV_HTTP_TIMEOUT_SECS, ENV_LOG_FORMAT, ENV_SESSION_FILE,
};
use isperp_client::{ClientConfig, ClientContext, CustomerSearch};
use isperp_core::customer::Customer;
use isperp_core::{CustomerDraft, CustomerId, SetupRequest, SetupStep, cpf};

/// isperp - ISP ERP client
#[derive(Parser, Debug)]
#[command(name = "isperp")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = ENV_API_URL)]
    api_url: Option<String>,

    /// Session file shared by every client of this user
    #[arg(long, env = ENV_SESSION_FILE)]
    session_file: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = ENV_HTTP_TIMEOUT_SECS)]
    timeout_secs: Option<u64>,

    /// Log format (json, pretty)
    #[arg(long, env = ENV_LOG_FORMAT)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// CPF utilities (offline)
    #[command(subcommand)]
    Cpf(CpfCommands),

    #[command(flatten)]
    Backend(BackendCommands),
}

/// Commands that talk to the backend or the session file.
#[derive(Subcommand, Debug)]
enum BackendCommands {
    /// Show setup and session state
    Status,

    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "ISPERP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the persisted session
    Logout,

    /// Print the logged-in user
    Whoami,

    /// Resolve a page path against the current state
    Route {
        /// Path, e.g. /customers/edit/3
        path: String,
    },

    /// Run the first-run setup wizard
    Setup(SetupArgs),

    /// Customer management
    #[command(subcommand)]
    Customers(CustomerCommands),

    /// Follow session changes made by other clients until Ctrl-C
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

#[derive(Subcommand, Debug)]
enum CpfCommands {
    /// Exit non-zero unless the CPF is valid
    Validate { value: String },
    /// Apply the xxx.xxx.xxx-xx mask
    Format { value: String },
}

#[derive(Subcommand, Debug)]
enum CustomerCommands {
    /// List customers
    #[command(alias = "ls")]
    List {
        /// Include inactive customers
        #[arg(long)]
        all: bool,
        /// Filter by name
        #[arg(long, conflicts_with = "cpf")]
        name: Option<String>,
        /// Filter by CPF
        #[arg(long)]
        cpf: Option<String>,
    },

    /// Show one customer
    Show { id: CustomerId },

    /// Create a customer
    Create(CustomerArgs),

    /// Replace a customer's data
    Update {
        id: CustomerId,
        #[command(flatten)]
        data: CustomerArgs,
    },

    /// Delete a customer
    Delete { id: CustomerId },

    /// Mark a customer active
    Activate { id: CustomerId },

    /// Mark a customer inactive
    Deactivate { id: CustomerId },
}

#[derive(Args, Debug)]
struct CustomerArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    cpf: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long, default_value = "")]
    zip_code: String,
    #[arg(long)]
    inactive: bool,
}

impl CustomerArgs {
    fn into_draft(self) -> CustomerDraft {
        CustomerDraft {
            name: self.name,
            cpf: self.cpf,
            email: self.email,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            active: !self.inactive,
        }
    }
}

#[derive(Args, Debug)]
struct SetupArgs {
    #[arg(long)]
    admin_name: String,
    #[arg(long)]
    admin_email: String,
    #[arg(long, env = "ISPERP_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,
    #[arg(long)]
    company_name: String,
    #[arg(long, default_value = "")]
    company_cnpj: String,
    #[arg(long, default_value = "")]
    company_address: String,
    #[arg(long, default_value = "")]
    company_phone: String,
    #[arg(long, default_value = "")]
    company_email: String,
    #[arg(long, default_value = "")]
    company_website: String,
    #[arg(long)]
    site_title: String,
    #[arg(long, default_value = "")]
    site_description: String,
    #[arg(long)]
    primary_color: Option<String>,
    #[arg(long)]
    secondary_color: Option<String>,
}

impl SetupArgs {
    fn into_request(self) -> SetupRequest {
        let defaults = SetupRequest::default();
        SetupRequest {
            confirm_password: self.admin_password.clone(),
            admin_name: self.admin_name,
            admin_email: self.admin_email,
            admin_password: self.admin_password,
            company_name: self.company_name,
            company_cnpj: self.company_cnpj,
            company_address: self.company_address,
            company_phone: self.company_phone,
            company_email: self.company_email,
            company_website: self.company_website,
            site_title: self.site_title,
            site_description: self.site_description,
            primary_color: self.primary_color.unwrap_or(defaults.primary_color),
            secondary_color: self.secondary_color.unwrap_or(defaults.secondary_color),
        }
    }
}

impl Cli {
    /// Flags win over the environment; both go through the same validation.
    fn config(&self) -> Result<ClientConfig> {
        let api_url = self.api_url.clone();
        let session_file = self
            .session_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let timeout = self.timeout_secs.map(|s| s.to_string());
        let log_format = self.log_format.clone();

        ClientConfig::from_lookup(|key| match key {
            ENV_API_URL => api_url.clone(),
            ENV_SESSION_FILE => session_file.clone(),
            ENV_HTTP_TIMEOUT_SECS => timeout.clone(),
            ENV_LOG_FORMAT => log_format.clone(),
            _ => None,
        })
        .context("invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    isperp_observability::init(config.log_format);

    match cli.command {
        Commands::Cpf(cmd) => run_cpf(cmd),
        Commands::Backend(command) => {
            let ctx = ClientContext::new(config).context("failed to build client")?;
            run(&ctx, command).await
        }
    }
}

fn run_cpf(cmd: CpfCommands) -> Result<()> {
    match cmd {
        CpfCommands::Validate { value } => {
            if cpf::validate(&value) {
                println!("{} is valid", cpf::format(&value));
                Ok(())
            } else {
                bail!("{value} is not a valid CPF")
            }
        }
        CpfCommands::Format { value } => {
            println!("{}", cpf::format(&value));
            Ok(())
        }
    }
}

async fn run(ctx: &ClientContext, command: BackendCommands) -> Result<()> {
    let state = ctx.gate.start().await;
    tracing::debug!(?state, "gate resolved");

    match command {
        BackendCommands::Status => {
            let body = serde_json::json!({
                "apiUrl": ctx.config.api_url,
                "setupCompleted": ctx.gate.setup_completed(),
                "routeState": format!("{state:?}"),
                "session": ctx.auth().snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        BackendCommands::Login { email, password } => {
            let credentials = Credentials::new(email, password);
            match ctx.auth().login(&credentials).await.context("login failed")? {
                LoginOutcome::Authenticated(user) => {
                    let role = user.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                    println!("logged in as {} ({role})", user.name);
                }
                LoginOutcome::Rejected { message } => bail!("login rejected: {message}"),
            }
        }

        BackendCommands::Logout => {
            ctx.auth().logout();
            println!("logged out");
        }

        BackendCommands::Whoami => match ctx.auth().user() {
            Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            None => bail!("not logged in"),
        },

        BackendCommands::Route { path } => match gate::settle(&path, ctx.gate.state()) {
            Navigation::Render(route) => println!("{route}"),
            Navigation::Redirect(route) => println!("{path} -> {route}"),
            Navigation::NotFound => bail!("{path}: not found"),
            Navigation::Loading => bail!("{path}: still loading"),
        },

        BackendCommands::Setup(args) => {
            let request = args.into_request();
            for step in SetupStep::ALL {
                request
                    .validate_step(step)
                    .map_err(|e| anyhow::anyhow!("{}: {e}", step.title()))?;
            }
            match ctx.gate.perform_setup(&request).await? {
                SetupOutcome::Completed => println!("setup completed"),
                SetupOutcome::Rejected { message } => bail!("setup rejected: {message}"),
            }
        }

        BackendCommands::Customers(cmd) => {
            require_session(ctx)?;
            run_customers(ctx, cmd).await?;
        }

        BackendCommands::Watch { interval_ms } => watch(ctx, Duration::from_millis(interval_ms)).await?,
    }
    Ok(())
}

fn require_session(ctx: &ClientContext) -> Result<()> {
    if ctx.auth().is_authenticated() {
        Ok(())
    } else {
        bail!("not logged in; run `isperp login` first")
    }
}

async fn run_customers(ctx: &ClientContext, cmd: CustomerCommands) -> Result<()> {
    let api = &ctx.customers;
    match cmd {
        CustomerCommands::List { all, name, cpf } => {
            let customers = match (name, cpf) {
                (Some(term), _) => api.search(CustomerSearch::Name, &term).await?,
                (_, Some(term)) => api.search(CustomerSearch::Cpf, &term).await?,
                _ => api.list(all).await?,
            };
            for customer in &customers {
                print_customer_line(customer);
            }
        }
        CustomerCommands::Show { id } => match api.get(id).await? {
            Some(customer) => println!("{}", serde_json::to_string_pretty(&customer)?),
            None => bail!("customer {id} not found"),
        },
        CustomerCommands::Create(args) => {
            let created = api.create(&args.into_draft()).await?;
            print_customer_line(&created);
        }
        CustomerCommands::Update { id, data } => {
            let updated = api.update(id, &data.into_draft()).await?;
            print_customer_line(&updated);
        }
        CustomerCommands::Delete { id } => {
            api.delete(id).await?;
            println!("customer {id} deleted");
        }
        CustomerCommands::Activate { id } => api.set_active(id, true).await?,
        CustomerCommands::Deactivate { id } => api.set_active(id, false).await?,
    }
    Ok(())
}

fn print_customer_line(customer: &Customer) {
    let status = if customer.active { "active" } else { "inactive" };
    println!(
        "{:>6}  {}  {}  {}",
        customer.id,
        cpf::format(&customer.cpf),
        status,
        customer.name
    );
}

async fn watch(ctx: &ClientContext, interval: Duration) -> Result<()> {
    let mut events = ctx.auth().subscribe();
    let auth_watcher = ctx.auth().watch_store();
    let file_watcher = ctx.store.watch(interval);
    tracing::info!(path = %ctx.store.path().display(), "watching session file");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(SessionEvent::Invalidated) => println!("session ended by another client"),
                Some(SessionEvent::Replaced { user }) => {
                    let name = user.map(|u| u.name).unwrap_or_else(|| "-".into());
                    println!("session replaced by another client ({name})");
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    ctx.store.shutdown();
    ctx.auth().shutdown();
    let (auth, file) = tokio::join!(auth_watcher, file_watcher);
    for (name, result) in [("session store", auth), ("session file", file)] {
        if let Err(err) = result {
            tracing::warn!(watcher = name, error = %err, "watcher did not stop cleanly");
        }
    }
    Ok(())
}
