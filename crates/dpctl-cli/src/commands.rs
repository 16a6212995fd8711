//! The console's command set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::io::Write as _;
use std::rc::Rc;

use dpctl_shell::{
    CommandTable, CommandTableBuilder, InternalError, Session, ShellError, ShellResult, Value,
};

use crate::control::{ControlPlane, ModuleInfo, PortInfo, TcInfo, WorkerInfo, DEFAULT_HOST, DEFAULT_TCP_PORT};

pub const BANNER: &str = "Type \"help\" for more information.";

/// Entries shown by `history`.
const HISTORY_SHOWN: usize = 100;

/// Handler context: the daemon connection.
pub struct Console {
    control: Rc<dyn ControlPlane>,
}

impl Console {
    pub fn new(control: Rc<dyn ControlPlane>) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &dyn ControlPlane {
        self.control.as_ref()
    }
}

type Args<'a> = &'a [Value];

/// `host:port $ ` while connected, `<disconnected> $ ` otherwise.
pub fn prompt(console: &Console) -> String {
    match console.control().peer() {
        Some((host, port)) => format!("{host}:{port} $ "),
        None => "<disconnected> $ ".to_string(),
    }
}

pub fn command_table() -> Result<CommandTable<Console>, InternalError> {
    register(CommandTable::builder()).build()
}

pub fn register(builder: CommandTableBuilder<Console>) -> CommandTableBuilder<Console> {
    builder
        .command("help", "List available commands", help)
        .command("quit", "Quit CLI", quit)
        .command("history", "Show command history", history)
        .command("debug ENABLE_DISABLE", "Enable/disable debug messages", debug)
        .command("daemon connect [HOST] [TCP_PORT]", "Connect to the daemon", daemon_connect)
        .command("daemon disconnect", "Disconnect from the daemon", daemon_disconnect)
        .command("add worker WORKER_ID CORE", "Create a worker", add_worker)
        .command("add port DRIVER [NEW_PORT] [PORT_ARGS...]", "Add a new port", add_port)
        .command("add module MCLASS [NEW_MODULE] [MODULE_ARGS...]", "Add a new module", add_module)
        .command(
            "add connection MODULE MODULE [OGATE] [IGATE]",
            "Add a connection between two modules",
            add_connection,
        )
        .command("delete worker WORKER_ID...", "Delete a worker", delete_worker)
        .command("delete port PORT", "Delete a port", delete_port)
        .command("delete module MODULE", "Delete a module", delete_module)
        .command("show worker", "Show the status of all worker threads", show_worker_all)
        .command(
            "show worker WORKER_ID...",
            "Show the status of specified worker threads",
            show_worker_list,
        )
        .command("show port", "Show the status of all ports", show_port_all)
        .command("show port PORT...", "Show the status of specified ports", show_port_list)
        .command("show module", "Show the status of all modules", show_module_all)
        .command("show module MODULE...", "Show the status of specified modules", show_module_list)
        .command("show mclass", "Show all module classes", show_mclass)
        .command("show driver", "Show all port drivers", show_driver)
        .command("show tc", "Show the list of traffic classes", show_tc_all)
        .command("show tc worker WORKER_ID...", "Show the list of traffic classes", show_tc_workers)
}

fn emit(session: &mut Session<Console>, text: &str) -> ShellResult<()> {
    let out = session.out();
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| ShellError::command(format!("Cannot write output: {e}")))
}

fn arg<'a>(args: Args<'a>, index: usize) -> ShellResult<&'a Value> {
    args.get(index)
        .ok_or_else(|| InternalError::new(format!("missing argument #{index}")).into())
}

fn int_arg(args: Args<'_>, index: usize) -> ShellResult<i64> {
    arg(args, index)?
        .as_int()
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not an integer")).into())
}

fn str_arg<'a>(args: Args<'a>, index: usize) -> ShellResult<&'a str> {
    arg(args, index)?
        .as_str()
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not a string")).into())
}

/// `None` when the optional token was left out.
fn opt_str_arg<'a>(args: Args<'a>, index: usize) -> ShellResult<Option<&'a str>> {
    let value = arg(args, index)?;
    if value.is_absent() {
        return Ok(None);
    }
    value
        .as_str()
        .map(Some)
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not a string")).into())
}

fn opt_int_arg(args: Args<'_>, index: usize) -> ShellResult<Option<i64>> {
    let value = arg(args, index)?;
    if value.is_absent() {
        return Ok(None);
    }
    value
        .as_int()
        .map(Some)
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not an integer")).into())
}

fn int_list_arg<'a>(args: Args<'a>, index: usize) -> ShellResult<&'a [i64]> {
    arg(args, index)?
        .as_int_list()
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not an integer list")).into())
}

fn str_list_arg<'a>(args: Args<'a>, index: usize) -> ShellResult<&'a [String]> {
    arg(args, index)?
        .as_list()
        .ok_or_else(|| InternalError::new(format!("argument #{index} is not a list")).into())
}

fn help(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let mut text = String::new();
    for c in session.commands() {
        let _ = writeln!(text, "  {:<50}{}", c.syntax, c.description);
    }
    emit(session, &text)
}

fn quit(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    session.request_stop();
    Ok(())
}

fn history(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    if !session.interactive() {
        return Err(ShellError::command("History is only kept in interactive mode"));
    }
    // The last entry is this very command.
    let len = session.history().len();
    let begin = len.saturating_sub(HISTORY_SHOWN).max(1);
    let mut text = String::new();
    for i in begin..len {
        let _ = writeln!(text, "{i:5}  {}", session.history()[i - 1]);
    }
    emit(session, &text)
}

fn debug(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let flag = str_arg(args, 0)?;
    session.ctx().control().set_debug(flag == "enable")?;
    Ok(())
}

fn daemon_connect(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let host = opt_str_arg(args, 0)?.unwrap_or(DEFAULT_HOST);
    let port = match opt_int_arg(args, 1)? {
        None => DEFAULT_TCP_PORT,
        Some(port) => u16::try_from(port)
            .map_err(|_| ShellError::command(format!("Invalid TCP port {port}")))?,
    };
    session.ctx().control().connect(host, port)?;
    Ok(())
}

fn daemon_disconnect(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    session.ctx().control().disconnect();
    Ok(())
}

fn add_worker(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let wid = int_arg(args, 0)?;
    let core = int_arg(args, 1)?;
    session.ctx().control().add_worker(wid, core)?;
    Ok(())
}

fn add_port(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let driver = str_arg(args, 0)?;
    let name = opt_str_arg(args, 1)?;
    let port_args = match arg(args, 2)? {
        Value::Absent => BTreeMap::new(),
        Value::Map(map) => map.clone(),
        other => {
            return Err(InternalError::new(format!("port arguments bound as {other:?}")).into())
        }
    };
    let created = session.ctx().control().create_port(driver, name, port_args)?;
    if name.is_none() {
        emit(session, &format!("  The new port \"{created}\" has been created\n"))?;
    }
    Ok(())
}

fn add_module(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let mclass = str_arg(args, 0)?;
    let name = opt_str_arg(args, 1)?;
    let module_args = arg(args, 2)?.as_json().cloned();
    let created = session.ctx().control().create_module(mclass, name, module_args)?;
    if name.is_none() {
        emit(session, &format!("  The new module \"{created}\" has been created\n"))?;
    }
    Ok(())
}

fn add_connection(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let from = str_arg(args, 0)?;
    let to = str_arg(args, 1)?;
    let ogate = opt_int_arg(args, 2)?.unwrap_or(0);
    let igate = opt_int_arg(args, 3)?.unwrap_or(0);
    session.ctx().control().connect_modules(from, to, ogate, igate)?;
    Ok(())
}

fn delete_worker(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    for &wid in int_list_arg(args, 0)? {
        session.ctx().control().destroy_worker(wid)?;
    }
    Ok(())
}

fn delete_port(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    session.ctx().control().destroy_port(str_arg(args, 0)?)?;
    Ok(())
}

fn delete_module(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    session.ctx().control().destroy_module(str_arg(args, 0)?)?;
    Ok(())
}

fn worker_table(workers: &[&WorkerInfo]) -> String {
    let mut text = format!(
        "  {:>10}{:>10}{:>10}{:>10}{:>16}\n",
        "Worker ID", "Status", "CPU core", "# of TCs", "Deadend pkts"
    );
    for w in workers {
        let status = if w.running { "RUNNING" } else { "PAUSED" };
        let _ = writeln!(
            text,
            "  {:>10}{:>10}{:>10}{:>10}{:>16}",
            w.wid, status, w.core, w.num_tcs, w.silent_drops
        );
    }
    text
}

fn show_worker_all(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let workers = session.ctx().control().list_workers()?;
    if workers.is_empty() {
        return Err(ShellError::command("There is no active worker thread to show."));
    }
    let text = worker_table(&workers.iter().collect::<Vec<_>>());
    emit(session, &text)
}

fn show_worker_list(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let wids = int_list_arg(args, 0)?;
    let workers = session.ctx().control().list_workers()?;
    if let Some(missing) = wids.iter().find(|wid| !workers.iter().any(|w| w.wid == **wid)) {
        return Err(ShellError::command(format!("Worker ID {missing} does not exist")));
    }
    let selected: Vec<_> = workers.iter().filter(|w| wids.contains(&w.wid)).collect();
    emit(session, &worker_table(&selected))
}

fn port_entry(port: &PortInfo) -> String {
    let mut text = format!(
        "  {:<12} Driver {:<10} HWaddr {}\n",
        port.name, port.driver, port.mac_addr
    );
    if !port.args.is_empty() {
        let args: Vec<String> = port.args.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let _ = writeln!(text, "  {:<12} Args {}", "", args.join(", "));
    }
    text
}

fn show_port_all(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let ports = session.ctx().control().list_ports()?;
    if ports.is_empty() {
        return Err(ShellError::command("There is no active port to show."));
    }
    let text = ports.iter().map(port_entry).collect::<Vec<_>>().join("\n");
    emit(session, &text)
}

fn show_port_list(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let names = str_list_arg(args, 0)?;
    let ports = session.ctx().control().list_ports()?;
    let mut text = String::new();
    for name in names {
        let port = ports
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| ShellError::command(format!("Port \"{name}\" does not exist")))?;
        text.push_str(&port_entry(port));
    }
    emit(session, &text)
}

fn module_entry(module: &ModuleInfo, all: &[ModuleInfo]) -> String {
    let desc = module.args.as_ref().map(ToString::to_string).unwrap_or_default();
    let mut text = format!("  {}::{}({})\n", module.name, module.mclass, desc);

    let mut inputs: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for upstream in all {
        for gate in upstream.ogates.iter().filter(|g| g.peer == module.name) {
            inputs
                .entry(gate.igate)
                .or_default()
                .push(format!("{}:{} ->", upstream.name, gate.ogate));
        }
    }
    if !inputs.is_empty() {
        text.push_str("    Input gates:\n");
        for (igate, sources) in &inputs {
            let _ = writeln!(text, "      {igate:5}: {}", sources.join(", "));
        }
    }

    if !module.ogates.is_empty() {
        text.push_str("    Output gates:\n");
        for gate in &module.ogates {
            let _ = writeln!(text, "      {:5}: -> {}:{}", gate.ogate, gate.igate, gate.peer);
        }
    }
    text
}

fn show_module_all(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let modules = session.ctx().control().list_modules()?;
    if modules.is_empty() {
        return Err(ShellError::command("There is no active module to show."));
    }
    let text: String = modules.iter().map(|m| module_entry(m, &modules)).collect();
    emit(session, &text)
}

fn show_module_list(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let names = str_list_arg(args, 0)?;
    let modules = session.ctx().control().list_modules()?;
    let mut text = String::new();
    for name in names {
        let module = modules
            .iter()
            .find(|m| &m.name == name)
            .ok_or_else(|| ShellError::command(format!("Module \"{name}\" does not exist")))?;
        text.push_str(&module_entry(module, &modules));
    }
    emit(session, &text)
}

fn show_mclass(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let mut text = String::new();
    for class in session.ctx().control().list_mclasses()? {
        let _ = writeln!(text, "{:<16} {}", class.name, class.help);
    }
    emit(session, &text)
}

fn show_driver(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let mut text = String::new();
    for driver in session.ctx().control().list_drivers()? {
        let _ = writeln!(text, "{:<16} {}", driver.name, driver.help);
    }
    emit(session, &text)
}

fn tc_tree(tcs: &[TcInfo]) -> String {
    let wids: BTreeSet<i64> = tcs.iter().map(|tc| tc.wid).collect();
    let mut text = String::new();
    for wid in wids {
        let _ = writeln!(text, "  <worker {wid}>");
        let classes: Vec<_> = tcs.iter().filter(|tc| tc.wid == wid).collect();
        for (i, tc) in classes.iter().enumerate() {
            let branch = if i + 1 == classes.len() { "+--" } else { "|--" };
            let _ = writeln!(text, "    {branch} {:<30} {}", tc.name, tc.policy);
        }
    }
    text
}

fn show_tc_all(session: &mut Session<Console>, _: Args<'_>) -> ShellResult<()> {
    let tcs = session.ctx().control().list_tcs(None)?;
    if tcs.is_empty() {
        return Err(ShellError::command("There is no traffic class to show."));
    }
    emit(session, &tc_tree(&tcs))
}

fn show_tc_workers(session: &mut Session<Console>, args: Args<'_>) -> ShellResult<()> {
    let mut text = String::new();
    for &wid in int_list_arg(args, 0)? {
        let tcs = session.ctx().control().list_tcs(Some(wid))?;
        text.push_str(&tc_tree(&tcs));
    }
    emit(session, &text)
}
