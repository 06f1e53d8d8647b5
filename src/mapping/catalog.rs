// ABOUTME: Registry of field tables for every engine entity.
// ABOUTME: Built once, validated acyclic, shared read-only.

use nonempty::nonempty;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::field::{FieldSpec, FieldTable};
use super::transforms::*;

/// Whether a table maps wire objects to domain objects or the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decode,
    Encode,
}

/// Identifies a field table in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Container,
    ContainerConfig,
    ContainerInspect,
    ContainerState,
    Device,
    ExecInspect,
    HistoryEntry,
    HostConfig,
    Image,
    ImageInspect,
    Info,
    NetworkSettings,
    Port,
    RestartPolicy,
    Version,
    ContainerConfigRequest,
    DeviceRequest,
    HostConfigRequest,
    RestartPolicyRequest,
}

impl Table {
    pub const ALL: [Table; 19] = [
        Table::Container,
        Table::ContainerConfig,
        Table::ContainerInspect,
        Table::ContainerState,
        Table::Device,
        Table::ExecInspect,
        Table::HistoryEntry,
        Table::HostConfig,
        Table::Image,
        Table::ImageInspect,
        Table::Info,
        Table::NetworkSettings,
        Table::Port,
        Table::RestartPolicy,
        Table::Version,
        Table::ContainerConfigRequest,
        Table::DeviceRequest,
        Table::HostConfigRequest,
        Table::RestartPolicyRequest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Container => "container",
            Table::ContainerConfig => "container-config",
            Table::ContainerInspect => "container-inspect",
            Table::ContainerState => "container-state",
            Table::Device => "device",
            Table::ExecInspect => "exec-inspect",
            Table::HistoryEntry => "history-entry",
            Table::HostConfig => "host-config",
            Table::Image => "image",
            Table::ImageInspect => "image-inspect",
            Table::Info => "info",
            Table::NetworkSettings => "network-settings",
            Table::Port => "port",
            Table::RestartPolicy => "restart-policy",
            Table::Version => "version",
            Table::ContainerConfigRequest => "container-config-request",
            Table::DeviceRequest => "device-request",
            Table::HostConfigRequest => "host-config-request",
            Table::RestartPolicyRequest => "restart-policy-request",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Table::ContainerConfigRequest
            | Table::DeviceRequest
            | Table::HostConfigRequest
            | Table::RestartPolicyRequest => Direction::Encode,
            _ => Direction::Decode,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Errors from catalog validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("table {0} registered twice")]
    DuplicateTable(Table),

    #[error("table {from} nests unregistered table {missing}")]
    MissingTable { from: Table, missing: Table },

    #[error("table {from} nests {nested}, which maps in the other direction")]
    DirectionMismatch { from: Table, nested: Table },

    #[error("nested tables form a cycle: {}", format_path(.0))]
    Cycle(Vec<Table>),
}

fn format_path(path: &[Table]) -> String {
    path.iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Every field table, keyed by [`Table`].
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Table, FieldTable>,
}

static STANDARD: LazyLock<Catalog> = LazyLock::new(|| Catalog {
    tables: index(standard_tables()),
});

impl Catalog {
    /// Build a catalog, checking that nested references resolve, keep their
    /// direction and never lead back to an ancestor.
    pub fn new(tables: Vec<FieldTable>) -> Result<Self, CatalogError> {
        let mut indexed = HashMap::with_capacity(tables.len());
        for table in tables {
            let id = table.id();
            if indexed.insert(id, table).is_some() {
                return Err(CatalogError::DuplicateTable(id));
            }
        }

        for table in indexed.values() {
            for nested in table.nested_tables() {
                let Some(target) = indexed.get(&nested) else {
                    return Err(CatalogError::MissingTable {
                        from: table.id(),
                        missing: nested,
                    });
                };
                if target.id().direction() != table.id().direction() {
                    return Err(CatalogError::DirectionMismatch {
                        from: table.id(),
                        nested,
                    });
                }
            }
        }

        let catalog = Self { tables: indexed };
        catalog.check_acyclic()?;
        Ok(catalog)
    }

    /// The process-wide catalog of engine entities.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    pub fn get(&self, table: Table) -> Option<&FieldTable> {
        self.tables.get(&table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn check_acyclic(&self) -> Result<(), CatalogError> {
        let mut done = Vec::new();
        let mut ids: Vec<Table> = self.tables.keys().copied().collect();
        ids.sort_by_key(|t| t.name());
        for id in ids {
            let mut path = Vec::new();
            self.visit(id, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        id: Table,
        path: &mut Vec<Table>,
        done: &mut Vec<Table>,
    ) -> Result<(), CatalogError> {
        if done.contains(&id) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|t| *t == id) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(id);
            return Err(CatalogError::Cycle(cycle));
        }
        path.push(id);
        if let Some(table) = self.tables.get(&id) {
            for nested in table.nested_tables() {
                self.visit(nested, path, done)?;
            }
        }
        path.pop();
        done.push(id);
        Ok(())
    }
}

fn index(tables: Vec<FieldTable>) -> HashMap<Table, FieldTable> {
    tables.into_iter().map(|t| (t.id(), t)).collect()
}

/// Field tables for the engine's entities.
pub fn standard_tables() -> Vec<FieldTable> {
    vec![
        FieldTable::new(
            Table::Container,
            vec![
                FieldSpec::new("id", "Id"),
                FieldSpec::new("image", "Image"),
                FieldSpec::new("image_id", "ImageID"),
                FieldSpec::aliased("command", nonempty!["Command", "Cmd"]),
                FieldSpec::new("created", "Created").with(from_unix_time),
                FieldSpec::new("names", "Names"),
                FieldSpec::new("state", "State"),
                FieldSpec::new("status", "Status"),
                FieldSpec::new("ports", "Ports").nested_list(Table::Port),
                FieldSpec::new("labels", "Labels"),
                FieldSpec::new("size_rw", "SizeRw"),
                FieldSpec::new("size_root_fs", "SizeRootFs"),
            ],
        ),
        FieldTable::new(
            Table::ContainerConfig,
            vec![
                FieldSpec::new("attach_stderr", "AttachStderr"),
                FieldSpec::new("attach_stdin", "AttachStdin"),
                FieldSpec::new("attach_stdout", "AttachStdout"),
                FieldSpec::aliased("cmd", nonempty!["Cmd", "Command"]),
                FieldSpec::new("cpu_shares", "CpuShares"),
                FieldSpec::new("cpuset", "Cpuset"),
                FieldSpec::new("domainname", "Domainname"),
                FieldSpec::new("entrypoint", "Entrypoint"),
                FieldSpec::new("env", "Env").with(from_env),
                FieldSpec::new("exposed_ports", "ExposedPorts").with(from_exposed_ports),
                FieldSpec::new("hostname", "Hostname"),
                FieldSpec::new("image", "Image"),
                FieldSpec::new("labels", "Labels"),
                FieldSpec::new("mac_address", "MacAddress"),
                FieldSpec::new("memory", "Memory"),
                FieldSpec::new("memory_swap", "MemorySwap"),
                FieldSpec::new("network_disabled", "NetworkDisabled"),
                FieldSpec::new("on_build", "OnBuild"),
                FieldSpec::new("open_stdin", "OpenStdin"),
                FieldSpec::new("port_specs", "PortSpecs"),
                FieldSpec::new("stdin_once", "StdinOnce"),
                FieldSpec::new("tty", "Tty"),
                FieldSpec::new("user", "User"),
                FieldSpec::new("volumes", "Volumes").with(from_volumes),
                FieldSpec::new("volumes_from", "VolumesFrom").with(from_volumes_from),
                FieldSpec::new("working_dir", "WorkingDir"),
            ],
        ),
        FieldTable::new(
            Table::ContainerInspect,
            vec![
                FieldSpec::new("app_armor_profile", "AppArmorProfile"),
                FieldSpec::new("applied_volumes_from", "AppliedVolumesFrom"),
                FieldSpec::new("args", "Args"),
                FieldSpec::new("config", "Config").nested(Table::ContainerConfig),
                FieldSpec::new("created", "Created").with(from_iso_time),
                FieldSpec::new("driver", "Driver"),
                FieldSpec::new("exec_driver", "ExecDriver"),
                FieldSpec::aliased("exec_ids", nonempty!["ExecIDs", "ExecIds"]),
                FieldSpec::new("host_config", "HostConfig").nested(Table::HostConfig),
                FieldSpec::new("hostname_path", "HostnamePath"),
                FieldSpec::new("hosts_path", "HostsPath"),
                FieldSpec::aliased("id", nonempty!["Id", "ID"]),
                FieldSpec::new("image", "Image"),
                FieldSpec::new("mount_label", "MountLabel"),
                FieldSpec::new("name", "Name"),
                FieldSpec::new("network_settings", "NetworkSettings")
                    .nested(Table::NetworkSettings),
                FieldSpec::new("path", "Path"),
                FieldSpec::new("process_label", "ProcessLabel"),
                FieldSpec::new("resolv_conf_path", "ResolvConfPath"),
                FieldSpec::new("restart_count", "RestartCount"),
                FieldSpec::new("state", "State").nested(Table::ContainerState),
                FieldSpec::new("update_dns", "UpdateDns"),
                FieldSpec::new("volumes", "Volumes").with(from_volumes),
                FieldSpec::new("volumes_rw", "VolumesRW"),
            ],
        ),
        FieldTable::new(
            Table::ContainerState,
            vec![
                FieldSpec::new("error", "Error"),
                FieldSpec::new("exit_code", "ExitCode"),
                FieldSpec::new("finished_at", "FinishedAt").with(from_iso_time),
                FieldSpec::new("oom_killed", "OOMKilled"),
                FieldSpec::new("paused", "Paused"),
                FieldSpec::new("pid", "Pid"),
                FieldSpec::new("restarting", "Restarting"),
                FieldSpec::new("running", "Running"),
                FieldSpec::new("started_at", "StartedAt").with(from_iso_time),
                FieldSpec::new("status", "Status"),
            ],
        ),
        FieldTable::new(
            Table::Device,
            vec![
                FieldSpec::new("path_on_host", "PathOnHost"),
                FieldSpec::new("path_in_container", "PathInContainer"),
                FieldSpec::new("cgroup_permissions", "CgroupPermissions"),
            ],
        ),
        FieldTable::new(
            Table::ExecInspect,
            vec![
                FieldSpec::new("container", "Container").nested(Table::ContainerInspect),
                FieldSpec::new("container_id", "ContainerID"),
                FieldSpec::new("exit_code", "ExitCode"),
                FieldSpec::aliased("id", nonempty!["ID", "Id"]),
                FieldSpec::new("open_stderr", "OpenStderr"),
                FieldSpec::new("open_stdin", "OpenStdin"),
                FieldSpec::new("open_stdout", "OpenStdout"),
                FieldSpec::new("pid", "Pid"),
                FieldSpec::new("process_config", "ProcessConfig"),
                FieldSpec::new("running", "Running"),
            ],
        ),
        FieldTable::new(
            Table::HistoryEntry,
            vec![
                FieldSpec::new("id", "Id"),
                FieldSpec::new("created", "Created").with(from_unix_time),
                FieldSpec::new("created_by", "CreatedBy"),
                FieldSpec::new("tags", "Tags"),
                FieldSpec::new("size", "Size"),
                FieldSpec::new("comment", "Comment"),
            ],
        ),
        FieldTable::new(
            Table::HostConfig,
            vec![
                FieldSpec::new("binds", "Binds"),
                FieldSpec::new("cap_add", "CapAdd"),
                FieldSpec::new("cap_drop", "CapDrop"),
                FieldSpec::new("container_id_file", "ContainerIDFile"),
                FieldSpec::new("devices", "Devices").nested_list(Table::Device),
                FieldSpec::new("dns", "Dns"),
                FieldSpec::new("dns_search", "DnsSearch"),
                FieldSpec::new("extra_hosts", "ExtraHosts").with(from_colon_pairs),
                FieldSpec::new("ipc_mode", "IpcMode"),
                FieldSpec::new("links", "Links").with(from_colon_pairs),
                FieldSpec::new("lxc_conf", "LxcConf"),
                FieldSpec::new("network_mode", "NetworkMode"),
                FieldSpec::new("port_bindings", "PortBindings").with(from_port_bindings),
                FieldSpec::new("privileged", "Privileged"),
                FieldSpec::new("readonly_rootfs", "ReadonlyRootfs"),
                FieldSpec::new("publish_all_ports", "PublishAllPorts"),
                FieldSpec::new("restart_policy", "RestartPolicy").nested(Table::RestartPolicy),
                FieldSpec::new("security_opt", "SecurityOpt"),
                FieldSpec::new("volumes_from", "VolumesFrom").with(from_volumes_from),
            ],
        ),
        FieldTable::new(
            Table::Image,
            vec![
                FieldSpec::new("repo_tags", "RepoTags"),
                FieldSpec::new("repo_digests", "RepoDigests"),
                FieldSpec::new("id", "Id"),
                FieldSpec::new("parent_id", "ParentId"),
                FieldSpec::new("created", "Created").with(from_unix_time),
                FieldSpec::new("size", "Size"),
                FieldSpec::new("virtual_size", "VirtualSize"),
                FieldSpec::new("labels", "Labels"),
            ],
        ),
        FieldTable::new(
            Table::ImageInspect,
            vec![
                FieldSpec::new("architecture", "Architecture"),
                FieldSpec::new("author", "Author"),
                FieldSpec::new("comment", "Comment"),
                FieldSpec::new("config", "Config").nested(Table::ContainerConfig),
                FieldSpec::new("container", "Container"),
                FieldSpec::new("container_config", "ContainerConfig")
                    .nested(Table::ContainerConfig),
                FieldSpec::new("created", "Created").with(from_iso_time),
                FieldSpec::new("docker_version", "DockerVersion"),
                FieldSpec::aliased("id", nonempty!["Id", "ID"]),
                FieldSpec::new("os", "Os"),
                FieldSpec::aliased("parent", nonempty!["Parent", "ParentId"]),
                FieldSpec::new("repo_digests", "RepoDigests"),
                FieldSpec::new("repo_tags", "RepoTags"),
                FieldSpec::new("size", "Size"),
                FieldSpec::new("virtual_size", "VirtualSize"),
            ],
        ),
        FieldTable::new(
            Table::Info,
            vec![
                FieldSpec::new("containers", "Containers"),
                FieldSpec::new("images", "Images"),
                FieldSpec::new("driver", "Driver"),
                FieldSpec::new("driver_status", "DriverStatus"),
                FieldSpec::new("execution_driver", "ExecutionDriver"),
                FieldSpec::new("kernel_version", "KernelVersion"),
                FieldSpec::new("ncpu", "NCPU"),
                FieldSpec::new("memory_total", "MemTotal"),
                FieldSpec::new("name", "Name"),
                FieldSpec::new("id", "ID"),
                FieldSpec::new("debug", "Debug"),
                FieldSpec::new("n_fd", "NFd"),
                FieldSpec::new("n_goroutines", "NGoroutines"),
                FieldSpec::new("n_events_listener", "NEventsListener"),
                FieldSpec::new("init_path", "InitPath"),
                FieldSpec::new("init_sha1", "InitSha1"),
                FieldSpec::new("index_server_address", "IndexServerAddress"),
                FieldSpec::new("memory_limit", "MemoryLimit"),
                FieldSpec::new("swap_limit", "SwapLimit"),
                FieldSpec::new("ipv4_forwarding", "IPv4Forwarding"),
                FieldSpec::new("labels", "Labels"),
                FieldSpec::new("docker_root_dir", "DockerRootDir"),
                FieldSpec::new("operating_system", "OperatingSystem"),
                FieldSpec::new("server_version", "ServerVersion"),
                FieldSpec::new("architecture", "Architecture"),
            ],
        ),
        FieldTable::new(
            Table::NetworkSettings,
            vec![
                FieldSpec::new("bridge", "Bridge"),
                FieldSpec::new("gateway", "Gateway"),
                FieldSpec::new("global_ipv6_address", "GlobalIPv6Address"),
                FieldSpec::new("global_ipv6_prefix_len", "GlobalIPv6PrefixLen"),
                FieldSpec::new("ipv6_gateway", "IPv6Gateway"),
                FieldSpec::new("ip_address", "IPAddress"),
                FieldSpec::new("ip_prefix_len", "IPPrefixLen"),
                FieldSpec::new("link_local_ipv6_address", "LinkLocalIPv6Address"),
                FieldSpec::new("link_local_ipv6_prefix_len", "LinkLocalIPv6PrefixLen"),
                FieldSpec::new("mac_address", "MacAddress"),
                FieldSpec::new("networks", "Networks"),
                FieldSpec::new("port_mapping", "PortMapping"),
                FieldSpec::new("ports", "Ports").with(from_port_bindings),
                FieldSpec::new("sandbox_id", "SandboxID"),
            ],
        ),
        FieldTable::new(
            Table::Port,
            vec![
                FieldSpec::new("ip", "IP"),
                FieldSpec::new("private_port", "PrivatePort"),
                FieldSpec::new("public_port", "PublicPort"),
                FieldSpec::new("protocol", "Type"),
            ],
        ),
        FieldTable::new(
            Table::RestartPolicy,
            vec![
                FieldSpec::new("maximum_retry_count", "MaximumRetryCount"),
                FieldSpec::new("name", "Name"),
            ],
        ),
        FieldTable::new(
            Table::Version,
            vec![
                FieldSpec::new("api_version", "ApiVersion"),
                FieldSpec::new("arch", "Arch"),
                FieldSpec::new("git_commit", "GitCommit"),
                FieldSpec::new("go_version", "GoVersion"),
                FieldSpec::new("kernel_version", "KernelVersion"),
                FieldSpec::new("os", "Os"),
                FieldSpec::new("version", "Version"),
            ],
        ),
        FieldTable::new(
            Table::ContainerConfigRequest,
            vec![
                FieldSpec::new("attach_stdin", "AttachStdin"),
                FieldSpec::new("attach_stdout", "AttachStdout"),
                FieldSpec::new("attach_stderr", "AttachStderr"),
                FieldSpec::new("cmd", "Cmd"),
                FieldSpec::new("command", "Cmd"),
                FieldSpec::new("cpu_shares", "CpuShares"),
                FieldSpec::new("cpuset", "Cpuset"),
                FieldSpec::new("domainname", "Domainname"),
                FieldSpec::new("entrypoint", "Entrypoint"),
                FieldSpec::new("env", "Env").with(to_env),
                FieldSpec::new("exposed_ports", "ExposedPorts").with(to_exposed_ports),
                FieldSpec::new("host_config", "HostConfig").nested(Table::HostConfigRequest),
                FieldSpec::new("hostname", "Hostname"),
                FieldSpec::new("image", "Image"),
                FieldSpec::new("labels", "Labels"),
                FieldSpec::new("mac_address", "MacAddress"),
                FieldSpec::new("memory", "Memory"),
                FieldSpec::new("memory_swap", "MemorySwap"),
                FieldSpec::new("network_disabled", "NetworkDisabled"),
                FieldSpec::new("open_stdin", "OpenStdin"),
                FieldSpec::new("security_opts", "SecurityOpts"),
                FieldSpec::new("stdin_once", "StdinOnce"),
                FieldSpec::new("tty", "Tty"),
                FieldSpec::new("volumes", "Volumes").with(to_volumes),
                FieldSpec::new("working_dir", "WorkingDir"),
                FieldSpec::new("user", "User"),
            ],
        ),
        FieldTable::new(
            Table::DeviceRequest,
            vec![
                FieldSpec::new("path_on_host", "PathOnHost"),
                FieldSpec::new("path_in_container", "PathInContainer"),
                FieldSpec::new("cgroup_permissions", "CgroupPermissions"),
            ],
        ),
        FieldTable::new(
            Table::HostConfigRequest,
            vec![
                FieldSpec::new("binds", "Binds").with(to_binds),
                FieldSpec::new("links", "Links").with(to_links),
                FieldSpec::new("lxc_conf", "LxcConf"),
                FieldSpec::new("port_bindings", "PortBindings").with(to_port_bindings),
                FieldSpec::new("publish_all_ports", "PublishAllPorts"),
                FieldSpec::new("privileged", "Privileged"),
                FieldSpec::new("readonly_rootfs", "ReadonlyRootfs"),
                FieldSpec::new("dns", "Dns"),
                FieldSpec::new("dns_search", "DnsSearch"),
                FieldSpec::new("extra_hosts", "ExtraHosts").with(to_extra_hosts),
                FieldSpec::new("volumes_from", "VolumesFrom").with(to_volumes_from),
                FieldSpec::new("cap_add", "CapAdd"),
                FieldSpec::new("cap_drop", "CapDrop"),
                FieldSpec::new("restart_policy", "RestartPolicy")
                    .nested(Table::RestartPolicyRequest),
                FieldSpec::new("network_mode", "NetworkMode"),
                FieldSpec::new("devices", "Devices").nested_list(Table::DeviceRequest),
            ],
        ),
        FieldTable::new(
            Table::RestartPolicyRequest,
            vec![
                FieldSpec::new("maximum_retry_count", "MaximumRetryCount"),
                FieldSpec::new("name", "Name"),
            ],
        ),
    ]
}
