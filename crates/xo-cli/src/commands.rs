//! Subcommand execution against a connected client.

use std::io::Write;
use std::time::Duration;

use tracing::debug;
use xo_client::{parse_duration, NotFoundError, XoClient};
use xo_proto::{Host, Network, Pool, PowerState, ResourceSet, StorageRepository, Template, Vm, XoObject};

use crate::cli::{Commands, FindArgs, HostsArgs, KindArg, ResourceSetCommands, VmCommands};
use crate::error::CliError;
use crate::output::{HostList, Message, ObjectList, OutputFormat, ResourceSetList, Summarize};

/// Run one subcommand and write its result.
///
/// # Errors
///
/// Returns an error if the arguments are inconsistent, the server call
/// fails or the output cannot be written.
pub async fn execute<W: Write>(
    client: &XoClient,
    writer: &mut W,
    format: &OutputFormat,
    command: &Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Whoami => format.write(writer, &client.user())?,
        Commands::Find(args) => {
            let list = find(client, args).await?;
            format.write(writer, &list)?;
        }
        Commands::Hosts(args) => {
            let list = hosts(client, args).await?;
            format.write(writer, &list)?;
        }
        Commands::Vm { command } => vm(client, writer, format, command).await?,
        Commands::ResourceSet {
            command: ResourceSetCommands::List,
        } => {
            let resource_sets = client.get_all::<ResourceSet>().await?;
            format.write(writer, &ResourceSetList { resource_sets })?;
        }
    }
    Ok(())
}

async fn find(client: &XoClient, args: &FindArgs) -> Result<ObjectList, CliError> {
    validate_find(args)?;
    let tags = args.tags.clone();

    match args.kind {
        KindArg::Network => {
            let query = Network {
                id: args.id.clone(),
                name_label: args.name.clone(),
                pool_id: args.pool.clone(),
                ..Network::default()
            };
            list(client, &query).await
        }
        KindArg::Host => {
            let query = Host {
                id: args.id.clone(),
                name_label: args.name.clone(),
                pool_id: args.pool.clone(),
                ..Host::default()
            };
            let found = list(client, &query).await?;
            restrict_to_pool(found, &args.pool, &query)
        }
        KindArg::Pool => {
            let query = Pool {
                id: args.id.clone(),
                name_label: args.name.clone(),
                ..Pool::default()
            };
            list(client, &query).await
        }
        KindArg::Vm => {
            let query = Vm {
                id: args.id.clone(),
                name_label: args.name.clone(),
                pool_id: args.pool.clone(),
                tags,
                ..Vm::default()
            };
            let found = list(client, &query).await?;
            restrict_to_pool(found, &args.pool, &query)
        }
        KindArg::Template => {
            let query = Template {
                id: args.id.clone(),
                name_label: args.name.clone(),
                pool_id: args.pool.clone(),
                ..Template::default()
            };
            list(client, &query).await
        }
        KindArg::Sr => {
            let query = StorageRepository {
                id: args.id.clone(),
                name_label: args.name.clone(),
                pool_id: args.pool.clone(),
                tags,
                ..StorageRepository::default()
            };
            list(client, &query).await
        }
    }
}

async fn list<T: XoObject + Summarize>(client: &XoClient, query: &T) -> Result<ObjectList, CliError> {
    let objects = client.find_objects(query).await?;
    debug!(kind = %T::KIND, count = objects.len(), "found objects");
    Ok(ObjectList {
        kind: T::KIND.to_string(),
        objects: objects.iter().map(Summarize::summary).collect(),
    })
}

/// Drop rows outside `pool`; an emptied list is reported as not found.
fn restrict_to_pool<T: XoObject>(
    mut found: ObjectList,
    pool: &str,
    query: &T,
) -> Result<ObjectList, CliError> {
    if pool.is_empty() {
        return Ok(found);
    }
    found.objects.retain(|row| row.pool_id == pool);
    if found.objects.is_empty() {
        return Err(CliError::NotFound(NotFoundError {
            kind: T::KIND,
            query: query.describe(),
        }));
    }
    Ok(found)
}

/// Reject flag combinations the chosen kind cannot match on.
fn validate_find(args: &FindArgs) -> Result<(), CliError> {
    if args.id.is_empty() && args.name.is_empty() && args.tags.is_empty() {
        return Err(CliError::InvalidArgument(
            "one of --id, --name or --tag is required".to_string(),
        ));
    }
    if !args.tags.is_empty() && !matches!(args.kind, KindArg::Vm | KindArg::Sr) {
        return Err(CliError::InvalidArgument(format!(
            "--tag is only supported for vm and sr, not {}",
            kind_name(args.kind)
        )));
    }
    if !args.pool.is_empty() && args.kind == KindArg::Pool {
        return Err(CliError::InvalidArgument(
            "--pool cannot be used when searching pools".to_string(),
        ));
    }
    Ok(())
}

const fn kind_name(kind: KindArg) -> &'static str {
    match kind {
        KindArg::Network => "network",
        KindArg::Host => "host",
        KindArg::Pool => "pool",
        KindArg::Vm => "vm",
        KindArg::Template => "template",
        KindArg::Sr => "sr",
    }
}

async fn hosts(client: &XoClient, args: &HostsArgs) -> Result<HostList, CliError> {
    let hosts = client
        .get_sorted_hosts(&args.pool, &args.sort_by, args.order.into())
        .await?;
    Ok(HostList { hosts })
}

async fn vm<W: Write>(
    client: &XoClient,
    writer: &mut W,
    format: &OutputFormat,
    command: &VmCommands,
) -> Result<(), CliError> {
    let (id, wait, timeout, target) = match command {
        VmCommands::Start { id, wait, timeout } => {
            client.start_vm(id).await?;
            (id, *wait, timeout, PowerState::Running)
        }
        VmCommands::Stop {
            id,
            force,
            wait,
            timeout,
        } => {
            client.stop_vm(id, *force).await?;
            (id, *wait, timeout, PowerState::Halted)
        }
    };

    if !wait {
        let verb = if target == PowerState::Running {
            "started"
        } else {
            "stopped"
        };
        return format.write(writer, &Message::success(format!("VM {id} {verb}")));
    }

    let timeout = wait_timeout(timeout)?;
    let vm = client.wait_for_vm_power_state(id, target, timeout).await?;
    format.write(writer, &vm)
}

fn wait_timeout(input: &str) -> Result<Duration, CliError> {
    let timeout = parse_duration(input).map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    if timeout.is_zero() {
        return Err(CliError::InvalidArgument(format!(
            "wait timeout must be positive, got '{input}'"
        )));
    }
    Ok(timeout)
}
