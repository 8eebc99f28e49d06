//! Command-line argument parsing with clap.

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use xo_client::{RawConfig, SortOrder};

/// Xen Orchestra command-line client.
#[derive(Parser, Debug, Clone)]
#[command(name = "xo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Xen Orchestra URL (`ws`, `wss`, `http` or `https`).
    #[arg(long, env = "XOA_URL")]
    pub url: Option<String>,

    /// Login.
    #[arg(short, long, env = "XOA_USER")]
    pub username: Option<String>,

    /// Password.
    #[arg(short, long, env = "XOA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Authentication token, instead of username and password.
    #[arg(long, env = "XOA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long, env = "XOA_INSECURE", value_parser = BoolishValueParser::new())]
    pub insecure: bool,

    /// Reconnect and retry on connection loss (`none` or `backoff`).
    #[arg(long, env = "XOA_RETRY_MODE")]
    pub retry_mode: Option<String>,

    /// Upper bound on time spent retrying, e.g. `5m`.
    #[arg(long, env = "XOA_RETRY_MAX_TIME")]
    pub retry_max_time: Option<String>,

    /// Per-request timeout, e.g. `30s`. Unset waits indefinitely.
    #[arg(long, env = "XOA_REQUEST_TIMEOUT")]
    pub request_timeout: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Connection settings as given on the command line or in the environment.
    #[must_use]
    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            token: self.token.clone(),
            insecure: self.insecure.then_some(true),
            retry_mode: self.retry_mode.clone(),
            retry_max_time: self.retry_max_time.clone(),
            request_timeout: self.request_timeout.clone(),
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the signed-in user.
    Whoami,

    /// Look up objects by id, name or tags.
    Find(FindArgs),

    /// List hosts, optionally restricted to one pool.
    Hosts(HostsArgs),

    /// Virtual machine power operations.
    Vm {
        /// VM subcommand to execute.
        #[command(subcommand)]
        command: VmCommands,
    },

    /// Resource set commands.
    ResourceSet {
        /// Resource set subcommand to execute.
        #[command(subcommand)]
        command: ResourceSetCommands,
    },
}

/// Object kinds `find` can search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// XAPI networks.
    Network,
    /// Physical hosts.
    Host,
    /// Resource pools.
    Pool,
    /// Virtual machines.
    Vm,
    /// VM templates.
    Template,
    /// Storage repositories.
    Sr,
}

/// Arguments for the find command.
#[derive(Args, Debug, Clone)]
pub struct FindArgs {
    /// Kind of object to search.
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Object id.
    #[arg(long, default_value = "")]
    pub id: String,

    /// Object name label.
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// Restrict name matches to one pool.
    #[arg(long, default_value = "")]
    pub pool: String,

    /// Match objects carrying all of these tags.
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for the hosts command.
#[derive(Args, Debug, Clone)]
pub struct HostsArgs {
    /// Pool id; all pools when omitted.
    #[arg(long, default_value = "")]
    pub pool: String,

    /// Field to order by, dotted for nested fields (`memory.size`).
    #[arg(long, default_value = "name_label")]
    pub sort_by: String,

    /// Sort direction.
    #[arg(long, value_enum, default_value_t = OrderArg::Asc)]
    pub order: OrderArg,
}

/// Sort direction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrderArg {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => Self::Asc,
            OrderArg::Desc => Self::Desc,
        }
    }
}

/// VM subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum VmCommands {
    /// Boot a VM.
    Start {
        /// VM id.
        id: String,

        /// Block until the VM reports `Running`.
        #[arg(short, long)]
        wait: bool,

        /// How long to wait, e.g. `5m`.
        #[arg(long, default_value = "5m")]
        timeout: String,
    },

    /// Shut a VM down.
    Stop {
        /// VM id.
        id: String,

        /// Hard shutdown instead of a clean one.
        #[arg(long)]
        force: bool,

        /// Block until the VM reports `Halted`.
        #[arg(short, long)]
        wait: bool,

        /// How long to wait, e.g. `5m`.
        #[arg(long, default_value = "5m")]
        timeout: String,
    },
}

/// Resource set subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ResourceSetCommands {
    /// List resource sets with their limits.
    List,
}
