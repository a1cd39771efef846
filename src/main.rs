use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use depot::AgentRole;
use depot::api::types::{Customer, InventoryItem, Order, ReturnRequest, Vehicle, Worker};
use depot::api::{ApiClient, AuthEvent, ChatbotApi, FormError, ListQuery, Resource, SessionEvents, WmsApi, auth};
use depot::controller::ChatController;
use depot::core::config::{CliOverrides, ResolvedConfig, load_config, resolve};
use depot::core::conversation::MessageRole;
use depot::core::session::{SessionStore, TokenStore};
use depot::core::storage::{FileStorage, MemoryStorage, Storage};
use depot::core::transform::{
    customer_row, format_relative_time, inventory_row, order_row, return_row, vehicle_row, worker_row,
};
use depot::core::validate::CustomerForm;

#[derive(Parser)]
#[command(name = "depot", about = "Warehouse management client with an AI assistant")]
struct Args {
    /// Who is using the client; keys saved sessions and preferences
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Assistant persona for chat
    #[arg(short, long, global = true, value_enum)]
    role: Option<AgentRole>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store a bearer token
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List records of a resource
    List {
        #[arg(value_enum)]
        resource: Resource,
        #[arg(long, default_value_t = 0)]
        skip: u32,
        #[arg(long, default_value_t = depot::api::wms::DEFAULT_PAGE_SIZE)]
        limit: u32,
        /// Extra query filters as key=value
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Fetch one record
    Get {
        #[arg(value_enum)]
        resource: Resource,
        id: String,
    },
    /// Create or edit a customer; the form is checked before sending
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Chat with the assistant
    Chat,
}

#[derive(Subcommand)]
enum CustomerAction {
    Create {
        #[command(flatten)]
        form: CustomerArgs,
    },
    Update {
        id: String,
        #[command(flatten)]
        form: CustomerArgs,
    },
}

#[derive(clap::Args)]
struct CustomerArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

impl From<CustomerArgs> for CustomerForm {
    fn from(args: CustomerArgs) -> Self {
        CustomerForm {
            name: args.name,
            email: args.email,
            phone: args.phone,
            address: args.address,
        }
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to depot.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("depot.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let cli = CliOverrides {
        username: args.user.clone(),
        role: args.role,
    };
    let config = resolve(&file_config, &cli);
    info!("Depot starting up as {} ({:?})", config.username, config.default_role);

    if let Err(e) = run(args, config).await {
        error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn open_storage(config: &ResolvedConfig) -> Arc<dyn Storage> {
    let dir = config
        .storage_dir
        .clone()
        .map(Ok)
        .unwrap_or_else(FileStorage::default_dir);
    match dir.and_then(FileStorage::open) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            warn!("Storage unavailable, keeping state in memory: {}", e);
            Arc::new(MemoryStorage::new())
        }
    }
}

/// Prints a sign-in prompt whenever a backend rejects the token.
fn watch_session(mut events: broadcast::Receiver<AuthEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SessionExpired) => {
                    eprintln!("Your session has expired. Run `depot login <username>` to sign in again.");
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Missed {} auth events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn run(args: Args, config: ResolvedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&config);
    let tokens = TokenStore::new(storage.clone());
    let events = SessionEvents::new();
    watch_session(events.subscribe());

    let wms_client = ApiClient::with_timeout(
        &config.wms_base_url,
        tokens.clone(),
        events.clone(),
        config.request_timeout,
    );

    match args.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ").await?,
            };
            let user = auth::login(&wms_client, &username, &password).await?;
            println!("Signed in as {}", user.username);
        }
        Command::Logout => {
            auth::logout(&wms_client);
            println!("Signed out");
        }
        Command::Whoami => {
            let user = auth::current_user(&wms_client).await?;
            print_json(&user)?;
        }
        Command::List {
            resource,
            skip,
            limit,
            filters,
        } => {
            let wms = WmsApi::new(wms_client);
            let query = filters
                .into_iter()
                .fold(ListQuery::page(skip, limit), |q, (k, v)| q.filter(k, v));
            list(&wms, resource, &query).await?;
        }
        Command::Get { resource, id } => {
            let wms = WmsApi::new(wms_client);
            get(&wms, resource, &id).await?;
        }
        Command::Customer { action } => {
            let wms = WmsApi::new(wms_client);
            let result = match action {
                CustomerAction::Create { form } => wms.create_customer(&form.into()).await,
                CustomerAction::Update { id, form } => wms.update_customer(&id, &form.into()).await,
            };
            match result {
                Ok(customer) => print_json(&customer_row(&customer))?,
                Err(FormError::Invalid(errors)) => {
                    for e in &errors {
                        eprintln!("{e}");
                    }
                    return Err(format!("{} field(s) need fixing", errors.len()).into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Chat => {
            let chat_client = ApiClient::with_timeout(
                &config.chatbot_base_url,
                tokens,
                events,
                config.request_timeout,
            );
            let backend = Arc::new(ChatbotApi::with_chat_path(chat_client, &config.chat_path));
            let sessions = SessionStore::new(storage);
            chat(backend, sessions, &config, args.role).await?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn rows<T, R, F>(wms: &WmsApi, resource: Resource, query: &ListQuery, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    T: DeserializeOwned,
    R: Serialize,
    F: Fn(&T) -> R,
{
    let records: Vec<T> = wms.list(resource, query).await?;
    let rows: Vec<R> = records.iter().map(f).collect();
    print_json(&rows)?;
    Ok(())
}

async fn list(wms: &WmsApi, resource: Resource, query: &ListQuery) -> Result<(), Box<dyn std::error::Error>> {
    let now = chrono::Utc::now();
    match resource {
        Resource::Inventory => rows(wms, resource, query, inventory_row).await,
        Resource::Orders => rows(wms, resource, query, |o: &Order| order_row(o, now)).await,
        Resource::Returns => rows(wms, resource, query, |r: &ReturnRequest| return_row(r, now)).await,
        Resource::Vehicles => rows(wms, resource, query, vehicle_row).await,
        Resource::Customers => rows(wms, resource, query, customer_row).await,
        Resource::Workers => rows(wms, resource, query, worker_row).await,
    }
}

async fn get(wms: &WmsApi, resource: Resource, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let now = chrono::Utc::now();
    match resource {
        Resource::Inventory => print_json(&inventory_row(&wms.get::<InventoryItem>(resource, id).await?))?,
        Resource::Orders => print_json(&order_row(&wms.get::<Order>(resource, id).await?, now))?,
        Resource::Returns => print_json(&return_row(&wms.get::<ReturnRequest>(resource, id).await?, now))?,
        Resource::Vehicles => print_json(&vehicle_row(&wms.get::<Vehicle>(resource, id).await?))?,
        Resource::Customers => print_json(&customer_row(&wms.get::<Customer>(resource, id).await?))?,
        Resource::Workers => print_json(&worker_row(&wms.get::<Worker>(resource, id).await?))?,
    }
    Ok(())
}

async fn prompt(label: &str) -> std::io::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(lines.next_line().await?.unwrap_or_default().trim().to_string())
}

const CHAT_HELP: &str = "Commands: /new, /history, /load <id>, /delete <id>, /role <name>, /quit";

async fn chat(
    backend: Arc<ChatbotApi>,
    sessions: SessionStore,
    config: &ResolvedConfig,
    cli_role: Option<AgentRole>,
) -> std::io::Result<()> {
    let mut ctrl = ChatController::new(backend, sessions, &config.username, config.default_role);
    ctrl.set_quick_history_limit(config.quick_history_limit);
    ctrl.restore();
    ctrl.settle().await;
    if let Some(role) = cli_role {
        ctrl.select_role(role);
    }
    ctrl.toggle_chat().await;

    println!("Chatting as {} with the {}.", config.username, ctrl.state().agent_role.label());
    println!("{CHAT_HELP}");
    if let Some(e) = &ctrl.state().error {
        println!("! {e}");
    }
    if let Some(id) = &ctrl.state().conversation_id {
        println!("Resumed conversation {id}.");
        print_transcript(&ctrl, 0);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome = match cmd {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{CHAT_HELP}");
                Ok(())
            }
            "/new" => {
                ctrl.start_new_conversation();
                println!("Started a new conversation.");
                Ok(())
            }
            "/history" => {
                let result = ctrl.load_quick_history().await;
                print_history(&ctrl);
                result
            }
            "/load" => {
                let result = ctrl.load_conversation(rest).await;
                if result.is_ok() {
                    print_transcript(&ctrl, 0);
                }
                result
            }
            "/delete" => ctrl.delete_conversation(rest).await,
            "/role" => {
                match AgentRole::parse(rest) {
                    Some(role) => {
                        ctrl.select_role(role);
                        println!("Now talking to the {}.", role.label());
                    }
                    None => println!("Unknown role `{rest}`."),
                }
                Ok(())
            }
            _ => {
                let before = ctrl.state().messages.len();
                let result = ctrl.send_message(line).await;
                if result.is_ok() {
                    print_transcript(&ctrl, before + 1);
                }
                result
            }
        };
        if let Err(e) = outcome {
            println!("! {e}");
        }
    }

    ctrl.cancel_all();
    Ok(())
}

fn print_transcript(ctrl: &ChatController, from: usize) {
    for message in ctrl.state().messages.iter().skip(from) {
        let who = match message.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "assistant",
        };
        println!("{who}: {}", message.content);
    }
}

fn print_history(ctrl: &ChatController) {
    let now = chrono::Utc::now();
    if ctrl.state().conversations.is_empty() {
        println!("No conversations yet.");
    }
    for summary in &ctrl.state().conversations {
        let when = summary
            .last_activity
            .map(|t| format_relative_time(t, now))
            .unwrap_or_default();
        println!("{}  [{}]  {}  {}", summary.id, summary.role.as_str(), summary.title, when);
    }
}
