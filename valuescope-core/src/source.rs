//! Value sources
//!
//! The closed set of places a value can come from. Each variant decides only
//! two things: the location a new value starts in, and how that location is
//! refreshed on every recompute. Caching, materialization, change detection
//! and child expansion are shared by all of them in [`crate::ValueObject`].

use crate::address::Address;
use crate::context::{ExecutionContext, ProcessContext};
use crate::errors::{Result, ValueError};
use crate::location::ValueLocation;
use crate::materializer::ValueData;
use crate::resolver::{self, Resolution};
use tracing::{debug, trace};
use valuescope_platform::dwarf_reg_to_name;
use valuescope_types::TypeDescriptor;

/// Coarse classification reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    VariableGlobal,
    Register,
    ExpressionResult,
    Constant,
    Child,
}

/// Where a child's parent currently is, captured when the child is handed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentBase {
    /// Parent lives at an address; members are offsets from it
    Location(ValueLocation),
    /// Parent is a scalar; members are byte ranges of its encoding
    Encoded(ValueData),
    /// Parent has no location at all
    NoLocation,
    /// Parent failed to compute
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Memory {
        address: Address,
    },
    Register {
        dwarf_reg: u16,
    },
    ExpressionResult {
        host_address: u64,
    },
    Constant {
        value: u64,
    },
    Child {
        member_offset: u64,
        parent_base: Option<ParentBase>,
    },
}

/// Result of refreshing a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refreshed {
    Location(ValueLocation),
    NoLocation,
}

impl ValueSource {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ValueSource::Memory { .. } => ValueKind::VariableGlobal,
            ValueSource::Register { .. } => ValueKind::Register,
            ValueSource::ExpressionResult { .. } => ValueKind::ExpressionResult,
            ValueSource::Constant { .. } => ValueKind::Constant,
            ValueSource::Child { .. } => ValueKind::Child,
        }
    }

    /// Register name from the platform table, `r<N>` when unknown
    pub fn register_name(dwarf_reg: u16) -> String {
        dwarf_reg_to_name(dwarf_reg)
            .map(str::to_string)
            .unwrap_or_else(|| format!("r{dwarf_reg}"))
    }

    /// Location a freshly created value starts in
    pub(crate) fn initial_location(&self, process: Option<&ProcessContext>) -> ValueLocation {
        match self {
            ValueSource::Memory { address } => memory_initial_location(address, process),
            ValueSource::Register { .. } => ValueLocation::Scalar(0),
            ValueSource::ExpressionResult { host_address } => {
                ValueLocation::HostAddress(*host_address)
            }
            ValueSource::Constant { value } => ValueLocation::Scalar(*value),
            ValueSource::Child { .. } => ValueLocation::Scalar(0),
        }
    }

    /// Location for this recompute, given the one currently held
    pub(crate) fn refresh(
        &self,
        current: ValueLocation,
        type_desc: &dyn TypeDescriptor,
        ctx: &ExecutionContext,
    ) -> Result<Refreshed> {
        match self {
            ValueSource::Memory { address } => refresh_memory(address, current, ctx),
            ValueSource::Register { dwarf_reg } => refresh_register(*dwarf_reg, ctx),
            ValueSource::ExpressionResult { host_address } => Ok(Refreshed::Location(
                ValueLocation::HostAddress(*host_address),
            )),
            ValueSource::Constant { value } => {
                Ok(Refreshed::Location(ValueLocation::Scalar(*value)))
            }
            ValueSource::Child {
                member_offset,
                parent_base,
            } => refresh_child(*member_offset, parent_base.as_ref(), type_desc),
        }
    }
}

fn memory_initial_location(address: &Address, process: Option<&ProcessContext>) -> ValueLocation {
    if let Ok(Resolution::Loaded(load_address)) = resolver::resolve(address, process) {
        return ValueLocation::LoadAddress(load_address);
    }
    match address.file_address() {
        Some(module_address) => ValueLocation::FileAddress(module_address.address),
        None => ValueLocation::Scalar(address.offset()),
    }
}

fn refresh_memory(
    address: &Address,
    current: ValueLocation,
    ctx: &ExecutionContext,
) -> Result<Refreshed> {
    if !address.is_valid() {
        return Ok(Refreshed::NoLocation);
    }
    let ValueLocation::FileAddress(_) = current else {
        return Ok(Refreshed::Location(current));
    };
    if !ctx.has_process() {
        return Ok(Refreshed::Location(current));
    }
    match resolver::resolve(address, ctx.process.as_ref())? {
        Resolution::Loaded(load_address) => {
            debug!("Promoting {} to load address 0x{:x}", address, load_address);
            Ok(Refreshed::Location(
                current
                    .promoted(load_address)
                    .unwrap_or(ValueLocation::LoadAddress(load_address)),
            ))
        }
        Resolution::NotAvailable => {
            trace!("{} not loaded yet, staying at file address", address);
            Ok(Refreshed::Location(current))
        }
    }
}

fn refresh_register(dwarf_reg: u16, ctx: &ExecutionContext) -> Result<Refreshed> {
    let register = ValueSource::register_name(dwarf_reg);
    let Some(registers) = &ctx.registers else {
        return Err(ValueError::RegisterUnavailable {
            register,
            reason: "no register context for this stop".to_string(),
        });
    };
    let value = registers
        .read_register(dwarf_reg)
        .map_err(|e| ValueError::RegisterUnavailable {
            register: register.clone(),
            reason: format!("{e:#}"),
        })?;
    trace!("Register {} = {:#x}", register, value);
    Ok(Refreshed::Location(ValueLocation::Scalar(value)))
}

fn refresh_child(
    member_offset: u64,
    parent_base: Option<&ParentBase>,
    type_desc: &dyn TypeDescriptor,
) -> Result<Refreshed> {
    match parent_base {
        None => Err(ValueError::Internal(
            "child recomputed before its parent location was assigned".to_string(),
        )),
        Some(ParentBase::NoLocation) => Ok(Refreshed::NoLocation),
        Some(ParentBase::Unavailable(reason)) => Err(ValueError::ParentUnavailable(reason.clone())),
        Some(ParentBase::Location(location)) => location
            .offset_by(member_offset)
            .map(Refreshed::Location)
            .ok_or_else(|| {
                ValueError::Internal(format!(
                    "scalar parent location {location} used as an address base"
                ))
            }),
        Some(ParentBase::Encoded(data)) => {
            let size = type_desc.byte_size();
            let value = usize::try_from(member_offset)
                .ok()
                .zip(usize::try_from(size).ok())
                .and_then(|(offset, len)| data.decode_range(offset, len))
                .ok_or_else(|| {
                    ValueError::Internal(format!(
                        "member at offset {} ({} bytes) lies outside the {} byte parent scalar",
                        member_offset,
                        size,
                        data.len()
                    ))
                })?;
            Ok(Refreshed::Location(ValueLocation::Scalar(value)))
        }
    }
}
