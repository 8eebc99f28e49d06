//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use xo_proto::{Host, Network, Pool, ResourceSet, StorageRepository, Template, User, Vm};

use crate::cli::Format;
use crate::error::CliError;

const MIB: u64 = 1024 * 1024;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Render a value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for User {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "ID:          {}", self.id)?;
        writeln!(writer, "Email:       {}", self.email)?;
        writeln!(writer, "Permission:  {}", self.permission)?;
        if !self.groups.is_empty() {
            writeln!(writer, "Groups:      {}", self.groups.join(", "))?;
        }
        Ok(())
    }
}

impl TableDisplay for Vm {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "ID:           {}", self.id)?;
        writeln!(writer, "Name:         {}", self.name_label)?;
        writeln!(writer, "Power state:  {}", self.power_state)?;
        writeln!(writer, "Pool:         {}", self.pool_id)?;
        writeln!(writer, "vCPUs:        {}", self.cpus.number)?;
        writeln!(writer, "Memory:       {} MiB", self.memory.size / MIB)?;
        if !self.tags.is_empty() {
            writeln!(writer, "Tags:         {}", self.tags.join(", "))?;
        }
        Ok(())
    }
}

/// One line of `find` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRow {
    /// Object id.
    pub id: String,
    /// Display name.
    pub name_label: String,
    /// Owning pool, empty for pools themselves.
    pub pool_id: String,
    /// Kind-specific detail (power state, bridge, SR type...).
    pub detail: String,
}

/// Objects that can be listed by `find`.
pub trait Summarize {
    /// The object reduced to one row.
    fn summary(&self) -> ObjectRow;
}

impl Summarize for Network {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: self.pool_id.clone(),
            detail: self.bridge.clone(),
        }
    }
}

impl Summarize for Host {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: self.pool_id.clone(),
            detail: self.address.clone(),
        }
    }
}

impl Summarize for Pool {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: String::new(),
            detail: self.master.clone(),
        }
    }
}

impl Summarize for Vm {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: self.pool_id.clone(),
            detail: self.power_state.to_string(),
        }
    }
}

impl Summarize for Template {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: self.pool_id.clone(),
            detail: if self.is_default_template {
                "default".to_string()
            } else {
                String::new()
            },
        }
    }
}

impl Summarize for StorageRepository {
    fn summary(&self) -> ObjectRow {
        ObjectRow {
            id: self.id.clone(),
            name_label: self.name_label.clone(),
            pool_id: self.pool_id.clone(),
            detail: self.sr_type.clone(),
        }
    }
}

/// Result of `find`.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectList {
    /// Kind searched.
    pub kind: String,
    /// Matching objects.
    pub objects: Vec<ObjectRow>,
}

impl TableDisplay for ObjectList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{:<36}  {:<24}  {:<36}  {}",
            "ID", "NAME", "POOL", "DETAIL"
        )?;
        writeln!(writer, "{}", "─".repeat(110))?;
        for row in &self.objects {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<36}  {}",
                row.id,
                truncate(&row.name_label, 24),
                row.pool_id,
                row.detail
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} {}(s)", self.objects.len(), self.kind)?;
        Ok(())
    }
}

/// Result of `hosts`.
#[derive(Debug, Clone, Serialize)]
pub struct HostList {
    /// Hosts, in the requested order.
    pub hosts: Vec<Host>,
}

impl TableDisplay for HostList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{:<36}  {:<20}  {:<15}  {:>5}  {:>18}",
            "ID", "NAME", "ADDRESS", "CORES", "MEMORY (MiB)"
        )?;
        writeln!(writer, "{}", "─".repeat(100))?;
        for host in &self.hosts {
            let memory = format!("{}/{}", host.memory.usage / MIB, host.memory.size / MIB);
            writeln!(
                writer,
                "{:<36}  {:<20}  {:<15}  {:>5}  {:>18}",
                host.id,
                truncate(&host.name_label, 20),
                host.address,
                host.cpus.cores,
                memory
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} host(s)", self.hosts.len())?;
        Ok(())
    }
}

/// Result of `resource-set list`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSetList {
    /// Every resource set visible to the user.
    pub resource_sets: Vec<ResourceSet>,
}

impl TableDisplay for ResourceSetList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.resource_sets.is_empty() {
            writeln!(writer, "No resource sets")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<12}  {:<24}  {:>8}  {:>7}  {}",
            "ID", "NAME", "SUBJECTS", "OBJECTS", "LIMITS (available/total)"
        )?;
        writeln!(writer, "{}", "─".repeat(90))?;
        for set in &self.resource_sets {
            let limits: Vec<String> = set
                .limits
                .iter()
                .map(|(kind, limit)| format!("{kind}={}/{}", limit.available, limit.total))
                .collect();
            writeln!(
                writer,
                "{:<12}  {:<24}  {:>8}  {:>7}  {}",
                set.id,
                truncate(&set.name, 24),
                set.subjects.len(),
                set.objects.len(),
                limits.join(" ")
            )?;
        }
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Truncate to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use xo_proto::{HostMemory, PowerState, ResourceLimit};

    fn host(id: &str, name: &str) -> Host {
        Host {
            id: id.to_string(),
            name_label: name.to_string(),
            address: "10.0.0.1".to_string(),
            memory: HostMemory {
                usage: 2048 * MIB,
                size: 65536 * MIB,
            },
            ..Host::default()
        }
    }

    #[test_case("hello", 10, "hello" ; "short")]
    #[test_case("hello", 5, "hello" ; "exact")]
    #[test_case("hello world", 8, "hello..." ; "long")]
    #[test_case("hello", 3, "hel" ; "very short max")]
    #[test_case("réseau-prod", 8, "résea..." ; "multibyte")]
    fn truncate_cases(input: &str, max: usize, expected: &str) {
        assert_eq!(truncate(input, max), expected);
    }

    #[test]
    fn message_table_and_json() {
        let msg = Message::success("VM vm-1 started");
        let table = OutputFormat::new(Format::Table).to_string(&msg).expect("table");
        assert_eq!(table, "✓ VM vm-1 started\n");

        let json = OutputFormat::new(Format::Json).to_string(&msg).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "VM vm-1 started");
    }

    #[test]
    fn host_list_table_shows_memory_in_mib() {
        let list = HostList {
            hosts: vec![host("h1", "node-a"), host("h2", "node-b")],
        };
        let out = OutputFormat::new(Format::Table).to_string(&list).expect("table");
        assert!(out.contains("node-a"));
        assert!(out.contains("2048/65536"));
        assert!(out.contains("Total: 2 host(s)"));
    }

    #[test]
    fn host_list_json_uses_wire_names() {
        let list = HostList {
            hosts: vec![Host {
                pool_id: "pool-a".to_string(),
                ..host("h1", "node-a")
            }],
        };
        let json = OutputFormat::new(Format::Json).to_string(&list).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["hosts"][0]["$poolId"], "pool-a");
    }

    #[test]
    fn object_list_from_vm_summaries() {
        let vm = Vm {
            id: "vm-1".to_string(),
            name_label: "web".to_string(),
            power_state: PowerState::Running,
            pool_id: "pool-a".to_string(),
            ..Vm::default()
        };
        let list = ObjectList {
            kind: "Vm".to_string(),
            objects: vec![vm.summary()],
        };
        let out = OutputFormat::new(Format::Table).to_string(&list).expect("table");
        assert!(out.contains("Running"));
        assert!(out.contains("Total: 1 Vm(s)"));
    }

    #[test]
    fn empty_resource_set_list() {
        let list = ResourceSetList {
            resource_sets: vec![],
        };
        let out = OutputFormat::new(Format::Table).to_string(&list).expect("table");
        assert_eq!(out, "No resource sets\n");
    }

    #[test]
    fn resource_set_limits_rendered() {
        let set = ResourceSet {
            id: "rs-1".to_string(),
            name: "team".to_string(),
            limits: [(
                "cpus".to_string(),
                ResourceLimit {
                    available: 2,
                    total: 8,
                },
            )]
            .into_iter()
            .collect(),
            ..ResourceSet::default()
        };
        let list = ResourceSetList {
            resource_sets: vec![set],
        };
        let out = OutputFormat::new(Format::Table).to_string(&list).expect("table");
        assert!(out.contains("cpus=2/8"));
    }

    #[test]
    fn user_table_lists_groups() {
        let user = User {
            id: "u-1".to_string(),
            email: "admin@example.com".to_string(),
            permission: "admin".to_string(),
            groups: vec!["ops".to_string(), "dev".to_string()],
        };
        let out = OutputFormat::new(Format::Table).to_string(&user).expect("table");
        assert!(out.contains("admin@example.com"));
        assert!(out.contains("ops, dev"));
    }
}
