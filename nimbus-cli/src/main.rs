use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{LevelFilter, debug};
use serde_json::json;

use nimbus_core::provider::{Provider, Timeouts, parse_duration};
use nimbus_core::resource::{Resource, ResourceId, State, Value};
use nimbus_core::schema::AttributeSchema;
use nimbus_provider_sbercloud::resources::SECGROUP;
use nimbus_provider_sbercloud::schemas;
use nimbus_provider_sbercloud::{ProviderConfig, SbercloudProvider};

/// Local name given to the security group handled by a command
const RESOURCE_NAME: &str = "main";

#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Manage SberCloud networking security groups", long_about = None)]
struct Cli {
    /// Provider settings file (JSON); SBC_* environment variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the provider region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Log remote calls and polling steps
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Group(GroupCommand),
    /// Print the security group schema
    Schema,
}

#[derive(Subcommand)]
enum GroupCommand {
    /// Create a security group
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        enterprise_project_id: Option<String>,

        /// Remove the rules the cloud adds to every new group
        #[arg(long)]
        delete_default_rules: bool,
    },
    /// Show the current state of a security group
    Read { id: String },
    /// Change the name and/or description of a security group
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a security group, retrying while it is in use
    Delete {
        id: String,

        /// How long to keep retrying (e.g. 30s, 10m, 1h)
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },
    /// Adopt an existing security group
    Import { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match cli.command {
        Commands::Schema => {
            print_schema();
            Ok(())
        }
        Commands::Group(command) => {
            run_group_command(command, cli.config.as_deref(), cli.region.as_deref()).await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_config(path: Option<&Path>, region: Option<&str>) -> Result<ProviderConfig, String> {
    let mut config = match path {
        Some(path) => ProviderConfig::from_file(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?,
        None => ProviderConfig::from_env().map_err(|e| e.to_string())?,
    };
    if let Some(region) = region {
        config.region = region.to_string();
    }
    debug!("Using provider config: {:?}", config);
    Ok(config)
}

async fn run_group_command(
    command: GroupCommand,
    config: Option<&Path>,
    region: Option<&str>,
) -> Result<(), String> {
    let provider = SbercloudProvider::new(load_config(config, region)?);
    let id = ResourceId::new(SECGROUP, RESOURCE_NAME);

    let state = match command {
        GroupCommand::Create {
            name,
            description,
            enterprise_project_id,
            delete_default_rules,
        } => {
            let resource = create_resource(
                name,
                description,
                enterprise_project_id,
                delete_default_rules,
            );
            validate_resource(&resource)?;
            provider.create(&resource).await
        }
        GroupCommand::Read { id: identifier } => {
            let state = provider
                .read(&known_state(&id, &identifier))
                .await
                .map_err(|e| e.to_string())?;
            if !state.exists {
                return Err(format!("Security group {} not found", identifier));
            }
            Ok(state)
        }
        GroupCommand::Update {
            id: identifier,
            name,
            description,
        } => {
            let current = provider
                .read(&known_state(&id, &identifier))
                .await
                .map_err(|e| e.to_string())?;
            if !current.exists {
                return Err(format!("Security group {} not found", identifier));
            }
            let desired = desired_resource(&current, name, description);
            validate_resource(&desired)?;
            provider.update(&current, &desired).await
        }
        GroupCommand::Delete {
            id: identifier,
            timeout,
        } => {
            let timeouts = Timeouts {
                delete: timeout,
                ..Default::default()
            };
            provider
                .delete(&known_state(&id, &identifier), &timeouts)
                .await
                .map_err(|e| e.to_string())?;
            println!("{} Security group {} deleted", "✓".green(), identifier);
            return Ok(());
        }
        GroupCommand::Import { id: identifier } => provider.import(&id, &identifier).await,
    }
    .map_err(|e| e.to_string())?;

    let output = serde_json::to_string_pretty(&state_to_json(&state))
        .map_err(|e| format!("Failed to render state: {}", e))?;
    println!("{}", output);
    Ok(())
}

fn known_state(id: &ResourceId, identifier: &str) -> State {
    State::existing(id.clone(), Default::default()).with_identifier(identifier)
}

fn create_resource(
    name: String,
    description: Option<String>,
    enterprise_project_id: Option<String>,
    delete_default_rules: bool,
) -> Resource {
    let mut resource = Resource::new(SECGROUP, RESOURCE_NAME).with_attribute("name", name);
    if let Some(description) = description {
        resource = resource.with_attribute("description", description);
    }
    if let Some(enterprise_project_id) = enterprise_project_id {
        resource = resource.with_attribute("enterprise_project_id", enterprise_project_id);
    }
    if delete_default_rules {
        resource = resource.with_attribute("delete_default_rules", true);
    }
    resource
}

/// Desired resource for an update: current name/description with the given overrides
fn desired_resource(current: &State, name: Option<String>, description: Option<String>) -> Resource {
    let mut resource = Resource::new(SECGROUP, current.id.name.clone());
    for key in ["name", "description"] {
        if let Some(value) = current.attributes.get(key) {
            resource.attributes.insert(key.to_string(), value.clone());
        }
    }
    if let Some(name) = name {
        resource = resource.with_attribute("name", name);
    }
    if let Some(description) = description {
        resource = resource.with_attribute("description", description);
    }
    resource
}

fn validate_resource(resource: &Resource) -> Result<(), String> {
    let Some(schema) = schemas::all_schemas()
        .into_iter()
        .find(|s| s.resource_type == resource.id.resource_type)
    else {
        return Ok(());
    };

    schema.validate(&resource.attributes).map_err(|errors| {
        errors
            .iter()
            .map(|error| format!("{}: {}", resource.id, error))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn print_schema() {
    for schema in schemas::all_schemas() {
        println!("{}", schema.resource_type.bold());
        if let Some(description) = &schema.description {
            println!("  {}", description);
        }

        let mut attributes: Vec<&AttributeSchema> = schema.attributes.values().collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));
        for attr in attributes {
            println!(
                "  {:<22} {:<10} {}",
                attr.name.cyan(),
                attr.attr_type.to_string(),
                attribute_flags(attr).dimmed()
            );
        }
    }
}

fn attribute_flags(attr: &AttributeSchema) -> String {
    let mut flags = Vec::new();
    if attr.required {
        flags.push("required".to_string());
    }
    if attr.optional {
        flags.push("optional".to_string());
    }
    if attr.computed {
        flags.push("computed".to_string());
    }
    if attr.force_new {
        flags.push("forces replacement".to_string());
    }
    if let Some(message) = &attr.deprecated {
        flags.push(format!("deprecated: {}", message));
    }
    flags.join(", ")
}

fn state_to_json(state: &State) -> serde_json::Value {
    let attributes: serde_json::Map<_, _> = state
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();
    json!({
        "resource": state.id.to_string(),
        "id": state.identifier,
        "exists": state.exists,
        "attributes": attributes,
    })
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => {
            let obj: serde_json::Map<_, _> = map
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}
