use clap::{Args, Parser, Subcommand};
use membership_approval::api::{self, AppState};
use membership_approval::build_services;
use membership_approval::config::Config;
use membership_approval::error::{Error, Result};
use membership_approval::identity::{Claims, Principal};
use membership_approval::logger;
use membership_approval::service::{ListFilter, SubmitRequest};
use membership_approval::state::{Application, MemberType, Standing, Status};
use std::fs;

#[derive(Parser)]
#[command(name = "membership-approval")]
#[command(about = "Membership approval workflow - block, district and state sign-off")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: "human" or "json"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Data directory path
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Identity the command acts as, standing in for verified token claims.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Principal id (admin id, or user id for members)
    #[arg(id = "actor_id", long = "as-id")]
    pub id: String,

    /// Role: block_admin, district_admin, state_admin, super_admin or member
    #[arg(id = "actor_role", long = "as-role")]
    pub role: String,

    /// Display name recorded on approval slots
    #[arg(id = "actor_name", long = "as-name")]
    pub name: Option<String>,

    #[arg(id = "scope_state", long = "scope-state")]
    pub state: Option<String>,

    #[arg(id = "scope_district", long = "scope-district")]
    pub district: Option<String>,

    #[arg(id = "scope_block", long = "scope-block")]
    pub block: Option<String>,
}

impl ActorArgs {
    fn principal(&self) -> Result<Principal> {
        Principal::from_claims(Claims {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            state: self.state.clone(),
            district: self.district.clone(),
            block: self.block.clone(),
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the data directory
    Init,

    /// Submit an application as the acting member
    Submit {
        /// "aspirant" or "business"
        #[arg(long)]
        member_type: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        district: String,

        #[arg(long)]
        block: String,

        #[arg(long)]
        city: String,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Approve an application at the acting admin's level
    Approve {
        id: String,

        #[arg(short, long)]
        remarks: Option<String>,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Reject an application at the acting admin's level
    Reject {
        id: String,

        #[arg(short, long)]
        remarks: Option<String>,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Show a single application
    Show {
        id: String,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// List applications visible to the acting principal
    List {
        /// Exact status, e.g. pending_district_approval
        #[arg(long)]
        status: Option<String>,

        /// Standing from the actor's level: upstream, awaiting, passed, rejected
        #[arg(long)]
        standing: Option<String>,

        /// Free-text search over id, city, district and block
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Dashboard counts for the acting principal
    Stats {
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Run the HTTP API
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,

        /// Keep applications in memory only
        #[arg(long)]
        in_memory: bool,
    },
}

/// Format output based on format type
fn format_output<T: serde::Serialize + std::fmt::Debug>(data: &T, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(data)
            .map_err(|e| Error::Storage(format!("Failed to serialize JSON: {}", e))),
        _ => Ok(format!("{:#?}", data)),
    }
}

fn summary_line(app: &Application) -> String {
    format!(
        "{}  {:<26} {}/{}/{}  {:?}",
        app.application_id, app.status, app.state, app.district, app.block, app.member_type
    )
}

fn parse_arg<T>(value: Option<&str>, what: &str, parse: fn(&str) -> Option<T>) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown {} '{}'", what, raw))),
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.set_data_dir(std::path::PathBuf::from(dir));
    }
    if let Some(format) = cli.format {
        config.set_output_format(format);
    }
    if let Some(level) = cli.log_level {
        config.set_log_level(level);
    }
    logger::init(config.get_log_level());

    let format = config.get_output_format().to_string();

    match cli.command {
        Commands::Init => {
            fs::create_dir_all(config.get_data_dir())
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
            println!("Initialized data directory at: {}", config.get_data_dir().display());
            Ok(())
        }

        Commands::Submit {
            member_type,
            state,
            district,
            block,
            city,
            actor,
        } => {
            let (applications, _) = build_services(&config, false)?;
            let member_type = parse_arg(Some(member_type.as_str()), "member type", MemberType::parse)?
                .ok_or_else(|| Error::InvalidInput("Member type is required".to_string()))?;
            let principal = actor.principal()?;
            let app = applications.submit(
                &principal,
                SubmitRequest {
                    member_type,
                    state,
                    district,
                    block,
                    city,
                },
            )?;
            if format == "json" {
                println!("{}", format_output(&app, &format)?);
            } else {
                println!("✓ Application submitted: {}", app.application_id);
            }
            Ok(())
        }

        Commands::Approve { id, remarks, actor } => {
            let (applications, _) = build_services(&config, false)?;
            let app = applications.approve(&actor.principal()?, &id, remarks)?;
            if format == "json" {
                println!("{}", format_output(&app, &format)?);
            } else {
                println!("✓ Approved {}; now {}", app.application_id, app.status);
            }
            Ok(())
        }

        Commands::Reject { id, remarks, actor } => {
            let (applications, _) = build_services(&config, false)?;
            let app = applications.reject(&actor.principal()?, &id, remarks)?;
            if format == "json" {
                println!("{}", format_output(&app, &format)?);
            } else {
                println!("✓ Rejected {}", app.application_id);
            }
            Ok(())
        }

        Commands::Show { id, actor } => {
            let (_, listing) = build_services(&config, false)?;
            let app = listing.get(&actor.principal()?, &id)?;
            println!("{}", format_output(&app, &format)?);
            Ok(())
        }

        Commands::List {
            status,
            standing,
            search,
            actor,
        } => {
            let (_, listing) = build_services(&config, false)?;
            let filter = ListFilter {
                status: parse_arg(status.as_deref(), "status", Status::parse)?,
                standing: parse_arg(standing.as_deref(), "standing", Standing::parse)?,
                search,
                ..ListFilter::default()
            };
            let apps = listing.list(&actor.principal()?, &filter)?;
            if format == "json" {
                println!("{}", format_output(&apps, &format)?);
            } else if apps.is_empty() {
                println!("No applications");
            } else {
                for app in &apps {
                    println!("{}", summary_line(app));
                }
            }
            Ok(())
        }

        Commands::Stats { actor } => {
            let (_, listing) = build_services(&config, false)?;
            let stats = listing.stats(&actor.principal()?)?;
            println!("{}", format_output(&stats, &format)?);
            Ok(())
        }

        Commands::Serve { bind, in_memory } => {
            if let Some(addr) = bind {
                config.set_bind_addr(addr);
            }
            let (applications, listing) = build_services(&config, in_memory)?;
            let state = AppState::new(applications, listing);
            api::serve(state, config.get_bind_addr()).await
        }
    }
}
