//! Control-plane client seam.
//!
//! The console talks to the datapath daemon only through [`ControlPlane`].
//! [`OfflineControlPlane`] keeps a simulated pipeline in memory so the console
//! can be driven without a running daemon.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dpctl_shell::ShellError;
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_TCP_PORT: u16 = 10514;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("Not connected to the daemon")]
    Disconnected,
    #[error("Worker ID {0} does not exist")]
    NoSuchWorker(i64),
    #[error("Worker ID {0} already exists")]
    WorkerExists(i64),
    #[error("Port \"{0}\" does not exist")]
    NoSuchPort(String),
    #[error("Module \"{0}\" does not exist")]
    NoSuchModule(String),
    #[error("Driver \"{0}\" does not exist")]
    NoSuchDriver(String),
    #[error("Module class \"{0}\" does not exist")]
    NoSuchMclass(String),
    #[error("Name \"{0}\" is already in use")]
    NameInUse(String),
    #[error("Output gate {gate} of module \"{module}\" is already connected")]
    GateInUse { module: String, gate: i64 },
    #[error("{0}")]
    Invalid(String),
    #[error("control-plane state lock poisoned")]
    Poisoned,
}

pub type ControlResult<T> = Result<T, ControlError>;

impl From<ControlError> for ShellError {
    fn from(err: ControlError) -> Self {
        ShellError::command(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub wid: i64,
    pub core: i64,
    pub running: bool,
    pub num_tcs: usize,
    pub silent_drops: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub name: String,
    pub driver: String,
    pub mac_addr: String,
    pub args: BTreeMap<String, Json>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputGate {
    pub ogate: i64,
    pub peer: String,
    pub igate: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub name: String,
    pub mclass: String,
    pub args: Option<Json>,
    pub ogates: Vec<OutputGate>,
}

/// A module class or port driver: a name and a one-line help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcInfo {
    pub name: String,
    pub wid: i64,
    pub policy: String,
}

/// Operations the console needs from the daemon.
pub trait ControlPlane {
    fn is_connected(&self) -> bool;

    /// `(host, port)` of the current connection.
    fn peer(&self) -> Option<(String, u16)>;

    fn connect(&self, host: &str, port: u16) -> ControlResult<()>;
    fn disconnect(&self);
    fn set_debug(&self, enabled: bool) -> ControlResult<()>;

    fn list_workers(&self) -> ControlResult<Vec<WorkerInfo>>;
    fn add_worker(&self, wid: i64, core: i64) -> ControlResult<()>;
    fn destroy_worker(&self, wid: i64) -> ControlResult<()>;

    fn list_drivers(&self) -> ControlResult<Vec<ClassInfo>>;
    fn list_ports(&self) -> ControlResult<Vec<PortInfo>>;
    /// Returns the name of the new port, generated when `name` is `None`.
    fn create_port(
        &self,
        driver: &str,
        name: Option<&str>,
        args: BTreeMap<String, Json>,
    ) -> ControlResult<String>;
    fn destroy_port(&self, name: &str) -> ControlResult<()>;

    fn list_mclasses(&self) -> ControlResult<Vec<ClassInfo>>;
    fn list_modules(&self) -> ControlResult<Vec<ModuleInfo>>;
    /// Returns the name of the new module, generated when `name` is `None`.
    fn create_module(&self, mclass: &str, name: Option<&str>, args: Option<Json>) -> ControlResult<String>;
    fn destroy_module(&self, name: &str) -> ControlResult<()>;
    fn connect_modules(&self, from: &str, to: &str, ogate: i64, igate: i64) -> ControlResult<()>;

    /// Traffic classes, optionally restricted to one worker.
    fn list_tcs(&self, wid: Option<i64>) -> ControlResult<Vec<TcInfo>>;
}

const DRIVERS: &[(&str, &str)] = &[
    ("PCAPPort", "libpcap live packet capture port"),
    ("PMDPort", "DPDK poll mode driver"),
    ("UnixSocketPort", "packet exchange via a UNIX domain socket"),
    ("VPort", "Virtual port for Linux host"),
];

const MCLASSES: &[(&str, &str)] = &[
    ("Bypass", "bypasses packets without any processing"),
    ("PortInc", "receives packets from a port"),
    ("PortOut", "sends packets to a port"),
    ("Queue", "terminates current task and enqueue packets for new task"),
    ("Sink", "discards all packets"),
    ("Source", "infinitely generates packets with dummy data"),
];

#[derive(Debug, Default)]
struct Pipeline {
    peer: Option<(String, u16)>,
    debug: bool,
    workers: BTreeMap<i64, WorkerInfo>,
    ports: BTreeMap<String, PortInfo>,
    modules: BTreeMap<String, ModuleInfo>,
    next_mac: u32,
}

impl Pipeline {
    fn connected(&mut self) -> ControlResult<&mut Self> {
        if self.peer.is_none() {
            return Err(ControlError::Disconnected);
        }
        Ok(self)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.ports.contains_key(name) || self.modules.contains_key(name)
    }

    /// First free `{stem}{n}`.
    fn fresh_name(&self, stem: &str) -> String {
        let stem = stem.to_lowercase();
        let mut n = 0usize;
        loop {
            let candidate = format!("{stem}{n}");
            if !self.name_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// In-memory daemon stand-in. Starts connected to the default peer.
#[derive(Debug)]
pub struct OfflineControlPlane {
    state: RwLock<Pipeline>,
}

impl Default for OfflineControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineControlPlane {
    pub fn new() -> Self {
        let pipeline = Pipeline {
            peer: Some((DEFAULT_HOST.to_string(), DEFAULT_TCP_PORT)),
            ..Pipeline::default()
        };
        Self {
            state: RwLock::new(pipeline),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.read().map(|s| s.debug).unwrap_or(false)
    }

    fn read(&self) -> ControlResult<RwLockReadGuard<'_, Pipeline>> {
        self.state.read().map_err(|_| ControlError::Poisoned)
    }

    fn write(&self) -> ControlResult<RwLockWriteGuard<'_, Pipeline>> {
        self.state.write().map_err(|_| ControlError::Poisoned)
    }

    fn read_connected(&self) -> ControlResult<RwLockReadGuard<'_, Pipeline>> {
        let state = self.read()?;
        if state.peer.is_none() {
            return Err(ControlError::Disconnected);
        }
        Ok(state)
    }
}

fn check_name(name: &str) -> ControlResult<()> {
    let mut chars = name.chars();
    let head_ok = chars.next().is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
    if head_ok && chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ControlError::Invalid(format!("Invalid name \"{name}\"")))
    }
}

fn class_list(table: &[(&str, &str)]) -> Vec<ClassInfo> {
    table
        .iter()
        .map(|(name, help)| ClassInfo {
            name: (*name).to_string(),
            help: (*help).to_string(),
        })
        .collect()
}

impl ControlPlane for OfflineControlPlane {
    fn is_connected(&self) -> bool {
        self.read().map(|s| s.peer.is_some()).unwrap_or(false)
    }

    fn peer(&self) -> Option<(String, u16)> {
        self.read().ok().and_then(|s| s.peer.clone())
    }

    fn connect(&self, host: &str, port: u16) -> ControlResult<()> {
        let mut state = self.write()?;
        info!(host, port, "connected");
        state.peer = Some((host.to_string(), port));
        Ok(())
    }

    fn disconnect(&self) {
        if let Ok(mut state) = self.write() {
            state.peer = None;
        }
    }

    fn set_debug(&self, enabled: bool) -> ControlResult<()> {
        self.write()?.connected()?.debug = enabled;
        Ok(())
    }

    fn list_workers(&self) -> ControlResult<Vec<WorkerInfo>> {
        Ok(self.read_connected()?.workers.values().cloned().collect())
    }

    fn add_worker(&self, wid: i64, core: i64) -> ControlResult<()> {
        if wid < 0 || core < 0 {
            return Err(ControlError::Invalid(format!(
                "Invalid worker ID {wid} or core {core}"
            )));
        }
        let mut guard = self.write()?;
        let state = guard.connected()?;
        if state.workers.contains_key(&wid) {
            return Err(ControlError::WorkerExists(wid));
        }
        debug!(wid, core, "add worker");
        state.workers.insert(
            wid,
            WorkerInfo {
                wid,
                core,
                running: true,
                num_tcs: 1,
                silent_drops: 0,
            },
        );
        Ok(())
    }

    fn destroy_worker(&self, wid: i64) -> ControlResult<()> {
        let mut guard = self.write()?;
        guard
            .connected()?
            .workers
            .remove(&wid)
            .map(|_| ())
            .ok_or(ControlError::NoSuchWorker(wid))
    }

    fn list_drivers(&self) -> ControlResult<Vec<ClassInfo>> {
        self.read_connected()?;
        Ok(class_list(DRIVERS))
    }

    fn list_ports(&self) -> ControlResult<Vec<PortInfo>> {
        Ok(self.read_connected()?.ports.values().cloned().collect())
    }

    fn create_port(
        &self,
        driver: &str,
        name: Option<&str>,
        args: BTreeMap<String, Json>,
    ) -> ControlResult<String> {
        if !DRIVERS.iter().any(|(d, _)| *d == driver) {
            return Err(ControlError::NoSuchDriver(driver.to_string()));
        }
        let mut guard = self.write()?;
        let state = guard.connected()?;
        let name = match name {
            Some(name) => {
                check_name(name)?;
                if state.name_taken(name) {
                    return Err(ControlError::NameInUse(name.to_string()));
                }
                name.to_string()
            }
            None => state.fresh_name(driver),
        };

        state.next_mac += 1;
        let mac = state.next_mac.to_be_bytes();
        let mac_addr = format!("02:00:{:02x}:{:02x}:{:02x}:{:02x}", mac[0], mac[1], mac[2], mac[3]);
        debug!(driver, name = %name, "create port");
        state.ports.insert(
            name.clone(),
            PortInfo {
                name: name.clone(),
                driver: driver.to_string(),
                mac_addr,
                args,
            },
        );
        Ok(name)
    }

    fn destroy_port(&self, name: &str) -> ControlResult<()> {
        let mut guard = self.write()?;
        guard
            .connected()?
            .ports
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ControlError::NoSuchPort(name.to_string()))
    }

    fn list_mclasses(&self) -> ControlResult<Vec<ClassInfo>> {
        self.read_connected()?;
        Ok(class_list(MCLASSES))
    }

    fn list_modules(&self) -> ControlResult<Vec<ModuleInfo>> {
        Ok(self.read_connected()?.modules.values().cloned().collect())
    }

    fn create_module(&self, mclass: &str, name: Option<&str>, args: Option<Json>) -> ControlResult<String> {
        if !MCLASSES.iter().any(|(m, _)| *m == mclass) {
            return Err(ControlError::NoSuchMclass(mclass.to_string()));
        }
        let mut guard = self.write()?;
        let state = guard.connected()?;
        let name = match name {
            Some(name) => {
                check_name(name)?;
                if state.name_taken(name) {
                    return Err(ControlError::NameInUse(name.to_string()));
                }
                name.to_string()
            }
            None => state.fresh_name(mclass),
        };
        debug!(mclass, name = %name, "create module");
        state.modules.insert(
            name.clone(),
            ModuleInfo {
                name: name.clone(),
                mclass: mclass.to_string(),
                args,
                ogates: Vec::new(),
            },
        );
        Ok(name)
    }

    fn destroy_module(&self, name: &str) -> ControlResult<()> {
        let mut guard = self.write()?;
        let state = guard.connected()?;
        if state.modules.remove(name).is_none() {
            return Err(ControlError::NoSuchModule(name.to_string()));
        }
        for module in state.modules.values_mut() {
            module.ogates.retain(|g| g.peer != name);
        }
        Ok(())
    }

    fn connect_modules(&self, from: &str, to: &str, ogate: i64, igate: i64) -> ControlResult<()> {
        let mut guard = self.write()?;
        let state = guard.connected()?;
        if !state.modules.contains_key(to) {
            return Err(ControlError::NoSuchModule(to.to_string()));
        }
        let module = state
            .modules
            .get_mut(from)
            .ok_or_else(|| ControlError::NoSuchModule(from.to_string()))?;
        if module.ogates.iter().any(|g| g.ogate == ogate) {
            return Err(ControlError::GateInUse {
                module: from.to_string(),
                gate: ogate,
            });
        }
        module.ogates.push(OutputGate {
            ogate,
            peer: to.to_string(),
            igate,
        });
        module.ogates.sort_by_key(|g| g.ogate);
        Ok(())
    }

    fn list_tcs(&self, wid: Option<i64>) -> ControlResult<Vec<TcInfo>> {
        let state = self.read_connected()?;
        if let Some(wid) = wid {
            if !state.workers.contains_key(&wid) {
                return Err(ControlError::NoSuchWorker(wid));
            }
        }
        Ok(state
            .workers
            .values()
            .filter(|w| wid.map_or(true, |id| id == w.wid))
            .map(|w| TcInfo {
                name: format!("!default_rr_{}", w.wid),
                wid: w.wid,
                policy: "round_robin".to_string(),
            })
            .collect())
    }
}
