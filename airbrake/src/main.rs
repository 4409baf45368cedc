use std::env;
use std::error::Error;
use std::process::ExitCode;

use airbrake::data_sources::PROJECT_DATA_SOURCE_TYPE;
use airbrake::resources::PROJECT_RESOURCE_TYPE;
use airbrake::AirbrakeProvider;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::ConfigureProviderRequest;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceWithConfigure, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::{has_errors, DataSource, DataSourceWithConfigure, Provider, Resource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: terraform-provider-airbrake <create|read|update|delete|import <id>|lookup <name>>\n\
    State documents are read as JSON from stdin; update expects {\"prior_state\": ..., \"planned_state\": ...}.";

enum Command {
    Create,
    Read,
    Update,
    Delete,
    Import(String),
    Lookup(String),
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let command = args.next().ok_or_else(|| USAGE.to_string())?;
        let command = match command.as_str() {
            "create" => Command::Create,
            "read" => Command::Read,
            "update" => Command::Update,
            "delete" => Command::Delete,
            "import" => Command::Import(args.next().ok_or_else(|| USAGE.to_string())?),
            "lookup" => Command::Lookup(args.next().ok_or_else(|| USAGE.to_string())?),
            other => return Err(format!("unknown command '{}'\n{}", other, USAGE)),
        };
        Ok(command)
    }

    fn reads_stdin(&self) -> bool {
        !matches!(self, Command::Import(_) | Command::Lookup(_))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let command = Command::parse(env::args().skip(1))?;

    let input = if command.reads_stdin() {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        DynamicValue::decode_json(&buf)?
    } else {
        DynamicValue::null()
    };

    let mut provider = AirbrakeProvider::new();
    let configured = provider
        .configure(ConfigureProviderRequest {
            terraform_version: String::new(),
            config: DynamicValue::null(),
        })
        .await;
    if report(&configured.diagnostics) {
        return Ok(ExitCode::FAILURE);
    }

    let (state, diagnostics) = match command {
        Command::Lookup(name) => {
            let factory = provider
                .data_sources()
                .remove(PROJECT_DATA_SOURCE_TYPE)
                .ok_or("project data source is not registered")?;
            let mut data_source: Box<dyn DataSourceWithConfigure> = factory();
            let configure = data_source
                .configure(ConfigureDataSourceRequest {
                    provider_data: configured.provider_data,
                })
                .await;
            if report(&configure.diagnostics) {
                return Ok(ExitCode::FAILURE);
            }

            let mut config = DynamicValue::object();
            config.set_string(&AttributePath::new("name"), name)?;
            let response = data_source
                .read(ReadDataSourceRequest {
                    type_name: PROJECT_DATA_SOURCE_TYPE.to_string(),
                    config,
                })
                .await;
            (Some(response.state), response.diagnostics)
        }
        command => {
            let factory = provider
                .resources()
                .remove(PROJECT_RESOURCE_TYPE)
                .ok_or("project resource is not registered")?;
            let mut resource: Box<dyn ResourceWithConfigure> = factory();
            let configure = resource
                .configure(ConfigureResourceRequest {
                    provider_data: configured.provider_data,
                })
                .await;
            if report(&configure.diagnostics) {
                return Ok(ExitCode::FAILURE);
            }

            run_resource(resource.as_ref(), command, input).await?
        }
    };

    let failed = report(&diagnostics);
    if let Some(state) = state {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&state.encode_json()?).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_resource(
    resource: &dyn ResourceWithConfigure,
    command: Command,
    input: DynamicValue,
) -> Result<(Option<DynamicValue>, Vec<Diagnostic>), Box<dyn Error + Send + Sync>> {
    let type_name = PROJECT_RESOURCE_TYPE.to_string();

    let outcome = match command {
        Command::Create => {
            let response = resource
                .create(CreateResourceRequest {
                    type_name,
                    planned_state: input.clone(),
                    config: input,
                })
                .await;
            (Some(response.new_state), response.diagnostics)
        }
        Command::Read => {
            let response = resource
                .read(ReadResourceRequest {
                    type_name,
                    current_state: input,
                })
                .await;
            (response.new_state, response.diagnostics)
        }
        Command::Update => {
            let prior_state = section(&input, "prior_state")?;
            let planned_state = section(&input, "planned_state")?;
            let response = resource
                .update(UpdateResourceRequest {
                    type_name,
                    prior_state,
                    planned_state: planned_state.clone(),
                    config: planned_state,
                })
                .await;
            (Some(response.new_state), response.diagnostics)
        }
        Command::Delete => {
            let response = resource
                .delete(DeleteResourceRequest {
                    type_name,
                    prior_state: input,
                })
                .await;
            (None, response.diagnostics)
        }
        Command::Import(id) => {
            let response = resource
                .import_state(ImportResourceStateRequest { type_name, id })
                .await;
            let state = response
                .imported_resources
                .into_iter()
                .next()
                .map(|imported| imported.state);
            (state, response.diagnostics)
        }
        Command::Lookup(_) => return Err(USAGE.into()),
    };

    Ok(outcome)
}

fn section(input: &DynamicValue, name: &str) -> Result<DynamicValue, String> {
    input
        .get(&AttributePath::new(name))
        .cloned()
        .map(DynamicValue::new)
        .ok_or_else(|| format!("update input has no '{}' document", name))
}

/// Print diagnostics to stderr; true when any of them is an error
fn report(diagnostics: &[Diagnostic]) -> bool {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
    has_errors(diagnostics)
}
