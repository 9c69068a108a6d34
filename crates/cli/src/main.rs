mod config;
mod error;
mod parse;

use std::path::{Path, PathBuf};

use alloy_primitives::{Address, B256, Bytes, U256};
use chrono::{Local, TimeZone};
use clap::{Args, Parser, Subcommand};
use evmscript::script::{decode_calls, encode_calls};
use evmscript::{Action, RUN_SCRIPT_ROLE, SCRIPT_RUNNER_APP_ID, ScriptRunnerCall};
use kernel::{AclCall, BaseArgs, Dao, KernelCall, Namespace, ProxyKind};
use runtime::{Runtime, abi};
use serde::{Deserialize, Serialize};
use storage::{Event, EventFilter, StateStore};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "keel.toml";
const DEPLOYMENT_KEY: &str = "keel.deployment";

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Permissioned organizations on a local state file", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// State file, overriding `storage.path`
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap an organization with a script registry and a script runner
    Init {
        /// Address holding every root permission
        #[arg(long)]
        root: Address,
    },
    /// Manage permissions
    #[command(subcommand)]
    Acl(AclCommand),
    /// Read and write the kernel's app registry
    #[command(subcommand)]
    Apps(AppsCommand),
    /// Build, inspect and run calls scripts
    #[command(subcommand)]
    Script(ScriptCommand),
    /// Show the event log
    Logs {
        /// Filter by event kind (set_permission, set_app, script_result, ...)
        #[arg(short, long)]
        kind: Option<String>,
        /// Only events emitted by this address
        #[arg(short, long)]
        emitter: Option<Address>,
        /// Show only the last N events
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Who sends a mutating command. Defaults to the root address.
#[derive(Args)]
struct Sender {
    #[arg(long = "from")]
    from: Option<Address>,
}

/// `(entity, app, role)` of one permission.
#[derive(Args)]
struct Target {
    entity: Address,
    app: Address,
    /// Role name or 0x hash
    #[arg(value_parser = parse::role)]
    role: B256,
}

#[derive(Subcommand)]
enum AclCommand {
    /// Create a permission and its manager
    Create {
        #[command(flatten)]
        target: Target,
        manager: Address,
        #[command(flatten)]
        sender: Sender,
    },
    /// Grant a permission, optionally with params
    Grant {
        #[command(flatten)]
        target: Target,
        /// `<id>:<op>:<value>` or `oracle:<address>`; the first is the root
        #[arg(short, long = "param", value_parser = parse::param)]
        params: Vec<acl::Param>,
        #[command(flatten)]
        sender: Sender,
    },
    /// Revoke a permission
    Revoke {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        sender: Sender,
    },
    /// Show or change the manager of a role
    Manager {
        app: Address,
        #[arg(value_parser = parse::role)]
        role: B256,
        /// Hand the role to a new manager
        #[arg(long, conflicts_with_all = ["remove", "burn"])]
        set: Option<Address>,
        /// Leave the role without a manager
        #[arg(long, conflicts_with = "burn")]
        remove: bool,
        /// Freeze the role forever
        #[arg(long)]
        burn: bool,
        #[command(flatten)]
        sender: Sender,
    },
    /// Check whether an address may perform a role
    Check {
        who: Address,
        app: Address,
        #[arg(value_parser = parse::role)]
        role: B256,
        /// Positional arguments of the request
        #[arg(short, long = "arg")]
        args: Vec<U256>,
    },
    /// Show a stored permission and its manager
    Show {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Subcommand)]
enum AppsCommand {
    /// Look up a registry entry
    Get {
        /// core, base or app
        namespace: Namespace,
        /// App id as a 0x hash or package name
        #[arg(value_parser = parse::app_id)]
        app_id: B256,
    },
    /// Write a registry entry
    Set {
        namespace: Namespace,
        #[arg(value_parser = parse::app_id)]
        app_id: B256,
        app: Address,
        #[command(flatten)]
        sender: Sender,
    },
}

#[derive(Subcommand)]
enum ScriptCommand {
    /// Encode actions into a calls script
    Encode {
        /// `<target>=<json payload>`, in execution order
        #[arg(short, long = "call", value_parser = parse::action)]
        calls: Vec<Action>,
    },
    /// List the actions of a calls script
    Decode {
        #[arg(value_parser = parse::bytes)]
        script: Bytes,
    },
    /// Run a script through the organization's script runner
    Run {
        #[arg(value_parser = parse::bytes)]
        script: Bytes,
        /// Abort if any action targets this address
        #[arg(long)]
        ban: Vec<Address>,
        #[command(flatten)]
        sender: Sender,
    },
}

/// Addresses recorded by `keel init`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Deployment {
    root: Address,
    kernel: Address,
    acl: Address,
    script_registry: Address,
    script_runner: Address,
}

impl Deployment {
    fn dao(&self) -> Dao {
        Dao {
            kernel: self.kernel,
            acl: self.acl,
        }
    }

    fn sender(&self, sender: &Sender) -> Address {
        sender.from.unwrap_or(self.root)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let db_path = cli.db.unwrap_or_else(|| config.storage.path.clone());

    match cli.command {
        Commands::Init { root } => cmd_init(&open_runtime(&db_path, &config)?, &db_path, root),
        Commands::Acl(command) => {
            let rt = open_runtime(&db_path, &config)?;
            cmd_acl(&rt, &deployment(&rt, &db_path)?, command)
        }
        Commands::Apps(command) => {
            let rt = open_runtime(&db_path, &config)?;
            cmd_apps(&rt, &deployment(&rt, &db_path)?, command)
        }
        Commands::Script(ScriptCommand::Encode { calls }) => {
            println!("{}", encode_calls(&calls)?);
            Ok(())
        }
        Commands::Script(ScriptCommand::Decode { script }) => cmd_decode(&script),
        Commands::Script(ScriptCommand::Run {
            script,
            ban,
            sender,
        }) => {
            let rt = open_runtime(&db_path, &config)?;
            let deployment = deployment(&rt, &db_path)?;
            let output: Bytes = rt.send(
                deployment.sender(&sender),
                deployment.script_runner,
                &ScriptRunnerCall::ExecuteWithBan {
                    script,
                    banned: ban,
                },
            )?;
            println!("Script executed. Output: {output}");
            Ok(())
        }
        Commands::Logs {
            kind,
            emitter,
            limit,
        } => cmd_logs(&open_runtime(&db_path, &config)?, kind, emitter, limit),
    }
}

fn open_runtime(path: &Path, config: &Config) -> Result<Runtime> {
    let store = StateStore::open(path)?;
    let mut rt = Runtime::new(store, config.runtime.clone())?;
    Dao::install(&mut rt);
    evmscript::install(&mut rt);
    Ok(rt)
}

fn deployment(rt: &Runtime, path: &Path) -> Result<Deployment> {
    rt.store()
        .meta(DEPLOYMENT_KEY)?
        .ok_or_else(|| Error::NotInitialized {
            path: path.to_path_buf(),
        })
}

fn cmd_init(rt: &Runtime, path: &Path, root: Address) -> Result<()> {
    if let Some(existing) = rt.store().meta::<Deployment>(DEPLOYMENT_KEY)? {
        return Err(Error::AlreadyInitialized {
            path: path.to_path_buf(),
            kernel: existing.kernel,
        });
    }

    let dao = Dao::create(rt, root)?;
    let scripts = evmscript::install_script_registry(rt, &dao, root)?;

    let base = rt.deploy(root, evmscript::codes::SCRIPT_RUNNER, &abi::encode(&BaseArgs::default())?)?;
    let script_runner = dao.new_app_instance(
        rt,
        root,
        *SCRIPT_RUNNER_APP_ID,
        base,
        abi::encode(&ScriptRunnerCall::Initialize)?.into(),
        false,
        ProxyKind::Upgradeable,
    )?;
    dao.create_permission(rt, root, root, script_runner, *RUN_SCRIPT_ROLE, root)?;

    let deployment = Deployment {
        root,
        kernel: dao.kernel,
        acl: dao.acl,
        script_registry: scripts.registry,
        script_runner,
    };
    rt.store().set_meta(DEPLOYMENT_KEY, &deployment)?;
    info!(kernel = %dao.kernel, path = %path.display(), "organization initialized");

    println!("State file:      {}", path.display());
    println!("Kernel:          {}", deployment.kernel);
    println!("ACL:             {}", deployment.acl);
    println!("Script registry: {}", deployment.script_registry);
    println!("Script runner:   {}", deployment.script_runner);
    Ok(())
}

fn cmd_acl(rt: &Runtime, deployment: &Deployment, command: AclCommand) -> Result<()> {
    let dao = deployment.dao();
    match command {
        AclCommand::Create {
            target,
            manager,
            sender,
        } => {
            dao.create_permission(
                rt,
                deployment.sender(&sender),
                target.entity,
                target.app,
                target.role,
                manager,
            )?;
            println!("Permission created.");
        }
        AclCommand::Grant {
            target,
            params,
            sender,
        } => {
            let Target { entity, app, role } = target;
            let call = if params.is_empty() {
                AclCall::GrantPermission { entity, app, role }
            } else {
                AclCall::GrantPermissionP {
                    entity,
                    app,
                    role,
                    params,
                }
            };
            rt.send::<_, ()>(deployment.sender(&sender), dao.acl, &call)?;
            println!("Permission granted.");
        }
        AclCommand::Revoke { target, sender } => {
            let Target { entity, app, role } = target;
            rt.send::<_, ()>(
                deployment.sender(&sender),
                dao.acl,
                &AclCall::RevokePermission { entity, app, role },
            )?;
            println!("Permission revoked.");
        }
        AclCommand::Manager {
            app,
            role,
            set,
            remove,
            burn,
            sender,
        } => {
            let from = deployment.sender(&sender);
            let call = match (set, remove, burn) {
                (Some(new_manager), _, _) => Some(AclCall::SetPermissionManager {
                    new_manager,
                    app,
                    role,
                }),
                (None, true, _) => Some(AclCall::RemovePermissionManager { app, role }),
                (None, false, true) => Some(AclCall::BurnPermissionManager { app, role }),
                (None, false, false) => None,
            };
            if let Some(call) = call {
                rt.send::<_, ()>(from, dao.acl, &call)?;
            }
            let manager: Address =
                rt.view(from, dao.acl, &AclCall::GetPermissionManager { app, role })?;
            println!("Manager: {}", describe_manager(manager));
        }
        AclCommand::Check {
            who,
            app,
            role,
            args,
        } => {
            let allowed = dao.has_permission(rt, who, app, role, &args)?;
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
        AclCommand::Show { target } => {
            let Target { entity, app, role } = target;
            let permission: acl::Permission =
                rt.view(entity, dao.acl, &AclCall::GetPermission { entity, app, role })?;
            let manager: Address =
                rt.view(entity, dao.acl, &AclCall::GetPermissionManager { app, role })?;
            println!("Permission: {}", serde_json::to_string_pretty(&permission)?);
            println!("Manager:    {}", describe_manager(manager));
        }
    }
    Ok(())
}

fn describe_manager(manager: Address) -> String {
    if manager.is_zero() {
        "none".to_string()
    } else if manager == acl::BURN_ENTITY {
        "burned".to_string()
    } else {
        manager.to_string()
    }
}

fn cmd_apps(rt: &Runtime, deployment: &Deployment, command: AppsCommand) -> Result<()> {
    match command {
        AppsCommand::Get { namespace, app_id } => {
            let app: Address = rt.view(
                deployment.root,
                deployment.kernel,
                &KernelCall::GetApp {
                    namespace: namespace.id(),
                    app_id,
                },
            )?;
            if app.is_zero() {
                println!("No app registered under {namespace}/{app_id}");
            } else {
                let code = rt.code_name(app)?.unwrap_or_default();
                println!("{app} ({code})");
            }
        }
        AppsCommand::Set {
            namespace,
            app_id,
            app,
            sender,
        } => {
            rt.send::<_, ()>(
                deployment.sender(&sender),
                deployment.kernel,
                &KernelCall::SetApp {
                    namespace: namespace.id(),
                    app_id,
                    app,
                },
            )?;
            println!("App set.");
        }
    }
    Ok(())
}

fn cmd_decode(script: &[u8]) -> Result<()> {
    let actions = decode_calls(script)?;
    if actions.is_empty() {
        println!("Empty script.");
        return Ok(());
    }
    for (i, action) in actions.iter().enumerate() {
        match std::str::from_utf8(&action.payload) {
            Ok(text) => println!("{i:>3}  {}  {text}", action.target),
            Err(_) => println!("{i:>3}  {}  {}", action.target, action.payload),
        }
    }
    Ok(())
}

fn cmd_logs(
    rt: &Runtime,
    kind: Option<String>,
    emitter: Option<Address>,
    limit: Option<usize>,
) -> Result<()> {
    let mut filter = EventFilter::default();
    if let Some(kind) = kind {
        filter = filter.kind(kind);
    }
    if let Some(emitter) = emitter {
        filter = filter.emitter(emitter);
    }
    let mut events = rt.events(&filter)?;
    if let Some(limit) = limit {
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
    }

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }
    for event in &events {
        print_event(event)?;
    }
    Ok(())
}

fn print_event(event: &Event) -> Result<()> {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");
    let mut body = serde_json::to_value(&event.kind)?;
    if let Some(fields) = body.as_object_mut() {
        fields.remove("kind");
    }
    println!(
        "[{time}] #{:<5} {:<26} {}  {body}",
        event.block,
        event.kind.name(),
        event.emitter
    );
    Ok(())
}
