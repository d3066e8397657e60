//! Debugger session: the long-lived owner of everything values depend on
//!
//! The session owns the type system, the stop epoch, the attached process and
//! the host scratch arena. Value objects never reach into the session; they
//! are handed an [`ExecutionContext`] snapshot on every recompute.

use crate::config::Config;
use crate::logging;
use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};
use valuescope_core::{Address, ExecutionContext, ProcessContext, StopId, ValueObject};
use valuescope_platform::TargetArch;
use valuescope_process::{ImageMap, MemoryAccess, ProcessMemory, RegionMemory, RegisterContext};
use valuescope_types::{TypeHandle, TypeSystem};

pub struct ValueSession {
    config: Config,
    type_system: Arc<TypeSystem>,
    stop_id: StopId,
    target: Option<TargetArch>,
    process: Option<ProcessContext>,
    pid: Option<u32>,
    registers: Option<Arc<dyn RegisterContext>>,
    host: Arc<RegionMemory>,
}

impl Default for ValueSession {
    fn default() -> Self {
        Self::new_with_config(Config::default())
    }
}

impl ValueSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session from `config`, installing the `[general]` logging
    /// setup first when it is enabled
    pub fn new_with_config(config: Config) -> Self {
        if let Err(e) = logging::initialize_from_config(&config.general) {
            warn!("Failed to initialize logging: {:#}", e);
        }
        let host = Arc::new(RegionMemory::with_alloc_base(
            "host scratch",
            config.values.host_scratch_base,
        ));
        Self {
            config,
            type_system: Arc::new(TypeSystem::new()),
            stop_id: StopId::default(),
            target: None,
            process: None,
            pid: None,
            registers: None,
            host,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the session's type system
    pub fn type_system(&self) -> Arc<TypeSystem> {
        self.type_system.clone()
    }

    pub fn stop_id(&self) -> StopId {
        self.stop_id
    }

    pub fn target(&self) -> Option<TargetArch> {
        self.target
    }

    pub fn is_attached(&self) -> bool {
        self.process.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn bump_stop(&mut self) -> StopId {
        self.stop_id = self.stop_id.next();
        self.stop_id
    }

    /// Attach to a process described by an image map and a memory reader.
    /// Counts as a stop: every value recomputes on its next access.
    pub fn attach(
        &mut self,
        images: ImageMap,
        memory: Arc<dyn MemoryAccess>,
        arch: TargetArch,
    ) -> StopId {
        info!(
            "Attaching to {} with {} images ({}, {}-byte addresses)",
            memory.describe(),
            images.len(),
            arch.byte_order,
            arch.address_size
        );
        self.process = Some(ProcessContext::new(Arc::new(images), memory));
        self.target = Some(arch);
        self.bump_stop()
    }

    /// Attach to a live process by PID
    pub fn attach_pid(&mut self, pid: u32) -> Result<StopId> {
        let images = ImageMap::from_pid(pid)
            .with_context(|| format!("Failed to build image map for PID {pid}"))?;
        let arch = match Self::process_arch(pid) {
            Ok(arch) => arch,
            Err(e) => {
                warn!(
                    "Could not determine architecture of PID {}: {:#}, assuming host",
                    pid, e
                );
                TargetArch::host()
            }
        };
        let memory = ProcessMemory::new(pid)
            .with_process_vm_readv(self.config.process.use_process_vm_readv);
        let stop = self.attach(images, Arc::new(memory), arch);
        self.pid = Some(pid);
        Ok(stop)
    }

    fn process_arch(pid: u32) -> Result<TargetArch> {
        let data = fs::read(format!("/proc/{pid}/exe"))?;
        let obj = object::File::parse(&data[..])?;
        Ok(TargetArch::from_object(&obj)?)
    }

    /// Drop the process. Values keep their last bytes but become invalid
    /// until a process is attached again.
    pub fn detach(&mut self) -> StopId {
        if self.process.take().is_some() {
            let who = self
                .pid
                .map_or_else(|| "process".to_string(), |pid| format!("PID {pid}"));
            info!("Detached from {}", who);
        }
        self.pid = None;
        self.registers = None;
        self.bump_stop()
    }

    /// The inferior stopped again: bump the epoch and forget the previous
    /// stop's registers
    pub fn notify_stop(&mut self) -> StopId {
        self.registers = None;
        let stop = self.bump_stop();
        info!("Inferior stopped ({})", stop);
        stop
    }

    /// Registers for the current stop
    pub fn set_registers(&mut self, registers: Arc<dyn RegisterContext>) {
        self.registers = Some(registers);
    }

    /// Snapshot of everything a recompute may consult
    pub fn execution_context(&self) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(self.stop_id)
            .with_host(self.host.clone())
            .with_options(self.config.values.value_options());
        ctx.target = self.target;
        ctx.process = self.process.clone();
        ctx.registers = self.registers.clone();
        ctx
    }

    pub fn create_variable(
        &self,
        name: impl Into<String>,
        type_desc: TypeHandle,
        address: Address,
    ) -> ValueObject {
        ValueObject::new_memory(name, type_desc, address, &self.execution_context())
    }

    pub fn create_register_value(&self, dwarf_reg: u16, type_desc: TypeHandle) -> ValueObject {
        ValueObject::new_register(dwarf_reg, type_desc, &self.execution_context())
    }

    /// Copy `bytes` into host scratch memory and wrap them as a value
    pub fn create_expression_result(
        &self,
        name: impl Into<String>,
        type_desc: TypeHandle,
        bytes: &[u8],
    ) -> Result<ValueObject> {
        let size = type_desc.byte_size();
        if bytes.len() as u64 != size {
            anyhow::bail!(
                "Expression result of type {} needs {} bytes, got {}",
                type_desc.name(),
                size,
                bytes.len()
            );
        }
        let address = self.host.allocate(bytes);
        Ok(ValueObject::new_expression_result(name, type_desc, address))
    }

    pub fn create_constant(
        &self,
        name: impl Into<String>,
        type_desc: TypeHandle,
        value: u64,
    ) -> ValueObject {
        ValueObject::new_constant(name, type_desc, value)
    }
}
