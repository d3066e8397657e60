//! The long-lived, cached value object
//!
//! A `ValueObject` is what clients hold on to. It owns its location, the last
//! bytes it materialized, a validity flag, a changed flag and, for aggregates,
//! lazily created children. All of that is rewritten only by [`ValueObject::update_value`].
//!
//! Recompute is not reentrant; callers driving one object from several threads
//! must serialize access to it.

use crate::address::Address;
use crate::change::{self, ValueSnapshot};
use crate::context::{ExecutionContext, StopId};
use crate::errors::{Result, ValueError};
use crate::location::{LocationKind, ValueLocation};
use crate::materializer::{self, DeferReason, Materialized, ValueData};
use crate::source::{ParentBase, Refreshed, ValueKind, ValueSource};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, error, trace};
use valuescope_platform::TargetArch;
use valuescope_types::TypeHandle;

/// What the last successful recompute actually produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataState {
    /// Bytes came from memory or from an encoded scalar
    Read,
    /// Aggregate: the location is the value
    AddressOnly,
    /// Address-backed scalar that could not be read yet
    Unread(DeferReason),
    /// The value has no location; nothing to read
    NoLocation,
}

#[derive(Debug)]
pub struct ValueObject {
    name: String,
    type_desc: TypeHandle,
    source: ValueSource,
    location: ValueLocation,
    data: ValueData,
    arch: TargetArch,
    valid: bool,
    changed: bool,
    error: Option<ValueError>,
    data_state: Option<DataState>,
    last_update: Option<StopId>,
    needs_update: bool,
    snapshot: Option<ValueSnapshot>,
    /// Children handed out so far, keyed by member index
    children: BTreeMap<usize, ValueObject>,
}

impl ValueObject {
    fn with_source(
        name: String,
        type_desc: TypeHandle,
        source: ValueSource,
        location: ValueLocation,
        arch: TargetArch,
    ) -> Self {
        trace!(
            "New {:?} value '{}' of type {} at {}",
            source.value_kind(),
            name,
            type_desc.name(),
            location
        );
        Self {
            name,
            type_desc,
            source,
            location,
            data: ValueData::empty(arch),
            arch,
            valid: false,
            changed: false,
            error: None,
            data_state: None,
            last_update: None,
            needs_update: true,
            snapshot: None,
            children: BTreeMap::new(),
        }
    }

    /// Variable backed by target memory. Starts at a load address if the
    /// context can already resolve `address`, at its file address otherwise,
    /// or as a scalar holding the raw offset.
    pub fn new_memory(
        name: impl Into<String>,
        type_desc: TypeHandle,
        address: Address,
        ctx: &ExecutionContext,
    ) -> Self {
        let source = ValueSource::Memory { address };
        let location = source.initial_location(ctx.process.as_ref());
        Self::with_source(
            name.into(),
            type_desc,
            source,
            location,
            ctx.target.unwrap_or_default(),
        )
    }

    /// Register-backed scalar, named after the register
    pub fn new_register(dwarf_reg: u16, type_desc: TypeHandle, ctx: &ExecutionContext) -> Self {
        let source = ValueSource::Register { dwarf_reg };
        let location = source.initial_location(None);
        Self::with_source(
            ValueSource::register_name(dwarf_reg),
            type_desc,
            source,
            location,
            ctx.target.unwrap_or_default(),
        )
    }

    /// Synthesized value living in debugger scratch memory
    pub fn new_expression_result(
        name: impl Into<String>,
        type_desc: TypeHandle,
        host_address: u64,
    ) -> Self {
        let source = ValueSource::ExpressionResult { host_address };
        let location = source.initial_location(None);
        Self::with_source(name.into(), type_desc, source, location, TargetArch::host())
    }

    pub fn new_constant(name: impl Into<String>, type_desc: TypeHandle, value: u64) -> Self {
        let source = ValueSource::Constant { value };
        let location = source.initial_location(None);
        Self::with_source(name.into(), type_desc, source, location, TargetArch::host())
    }

    fn new_child(
        name: String,
        type_desc: TypeHandle,
        member_offset: u64,
        arch: TargetArch,
    ) -> Self {
        let source = ValueSource::Child {
            member_offset,
            parent_base: None,
        };
        let location = source.initial_location(None);
        Self::with_source(name, type_desc, source, location, arch)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_desc
    }

    pub fn type_name(&self) -> String {
        self.type_desc.name()
    }

    pub fn byte_size(&self) -> u64 {
        self.type_desc.byte_size()
    }

    pub fn is_aggregate(&self) -> bool {
        self.type_desc.is_aggregate()
    }

    pub fn value_kind(&self) -> ValueKind {
        self.source.value_kind()
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    pub fn location(&self) -> ValueLocation {
        self.location
    }

    pub fn location_kind(&self) -> LocationKind {
        self.location.kind()
    }

    /// Load address, once the value lives in the process
    pub fn load_address(&self) -> Option<u64> {
        match self.location {
            ValueLocation::LoadAddress(address) => Some(address),
            _ => None,
        }
    }

    /// Byte order and address width of the last recompute
    pub fn arch(&self) -> TargetArch {
        self.arch
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the last recompute produced a different value than the one
    /// before it. Only meaningful right after a recompute.
    pub fn value_did_change(&self) -> bool {
        self.changed
    }

    pub fn error(&self) -> Option<&ValueError> {
        self.error.as_ref()
    }

    pub fn data_state(&self) -> Option<DataState> {
        self.data_state
    }

    /// Cached bytes, only while the value is valid
    pub fn data(&self) -> Option<&ValueData> {
        self.valid.then_some(&self.data)
    }

    /// Cached bytes regardless of validity
    pub fn raw_data(&self) -> &ValueData {
        &self.data
    }

    pub fn value_as_unsigned(&self) -> Option<u64> {
        self.data()?.as_unsigned()
    }

    pub fn value_as_signed(&self) -> Option<i64> {
        self.data()?.as_signed()
    }

    /// Every value this core produces is in scope for the stop it was
    /// computed for; scoping belongs to the frame layer.
    pub fn is_in_scope(&self) -> bool {
        true
    }

    pub fn last_update(&self) -> Option<StopId> {
        self.last_update
    }

    pub fn needs_update(&self, ctx: &ExecutionContext) -> bool {
        self.needs_update || self.last_update != Some(ctx.stop_id)
    }

    /// Force the next `update_if_needed` to recompute, for this value and
    /// every child handed out so far
    pub fn invalidate(&mut self) {
        self.needs_update = true;
        for child in self.children.values_mut() {
            child.invalidate();
        }
    }

    /// Recompute only if the stop epoch moved or the value was invalidated
    pub fn update_if_needed(&mut self, ctx: &ExecutionContext) -> Result<bool> {
        if !self.needs_update(ctx) {
            return Ok(self.valid);
        }
        self.update_value(ctx)
    }

    /// Recompute location, bytes and changed flag from scratch.
    ///
    /// Unreadable values are not errors here: they come back as `Ok(false)`
    /// with the reason in [`ValueObject::error`] and the previous bytes left
    /// untouched. `Err` is reserved for internal consistency failures.
    pub fn update_value(&mut self, ctx: &ExecutionContext) -> Result<bool> {
        self.valid = false;
        self.error = None;
        self.changed = false;
        if let Some(target) = ctx.target {
            self.arch = target;
        }
        let previous = self.snapshot.take();

        match self.recompute(ctx) {
            Ok(state) => self.data_state = Some(state),
            Err(err) if err.is_internal() => {
                self.snapshot = previous;
                self.error = Some(err.clone());
                self.needs_update = true;
                return Err(surface_internal(&self.name, err));
            }
            Err(err) => {
                debug!("Value '{}' unavailable at {}: {}", self.name, ctx.stop_id, err);
                self.error = Some(err);
            }
        }

        self.valid = self.error.is_none();
        let current = ValueSnapshot {
            location: self.location,
            bytes: self.data.bytes().to_vec(),
            valid: self.valid,
        };
        self.changed = change::changed(previous.as_ref(), &current, self.is_aggregate());
        self.snapshot = Some(current);
        self.last_update = Some(ctx.stop_id);
        self.needs_update = false;

        trace!(
            "Updated '{}' at {}: {} valid={} changed={}",
            self.name,
            ctx.stop_id,
            self.location,
            self.valid,
            self.changed
        );
        Ok(self.valid)
    }

    fn recompute(&mut self, ctx: &ExecutionContext) -> Result<DataState> {
        let location = match self
            .source
            .refresh(self.location, self.type_desc.as_ref(), ctx)?
        {
            Refreshed::Location(location) => location,
            Refreshed::NoLocation => {
                self.data = ValueData::empty(self.arch);
                return Ok(DataState::NoLocation);
            }
        };

        if self.location.kind() == LocationKind::LoadAddress
            && location.kind() == LocationKind::FileAddress
        {
            return Err(ValueError::Internal(format!(
                "location of '{}' regressed from {} to {}",
                self.name, self.location, location
            )));
        }
        self.location = location;

        match materializer::extract(&self.location, self.type_desc.as_ref(), self.arch, ctx)? {
            Materialized::Bytes(data) => {
                self.data = data;
                Ok(DataState::Read)
            }
            Materialized::AddressOnly => Ok(DataState::AddressOnly),
            Materialized::Deferred(reason) => Ok(DataState::Unread(reason)),
        }
    }

    /// Declared member count for aggregates, zero for everything else
    pub fn num_children(&self) -> usize {
        if self.type_desc.is_aggregate() {
            self.type_desc.child_count()
        } else {
            0
        }
    }

    /// Children created so far
    pub fn materialized_children(&self) -> usize {
        self.children.len()
    }

    fn child_base(&self) -> ParentBase {
        if let Some(err) = &self.error {
            return ParentBase::Unavailable(err.to_string());
        }
        if self.data_state == Some(DataState::NoLocation) {
            return ParentBase::NoLocation;
        }
        match self.location {
            ValueLocation::Scalar(_) => ParentBase::Encoded(self.data.clone()),
            location => ParentBase::Location(location),
        }
    }

    /// Child at `index`, created on first access and rebased on this value's
    /// current location every time it is handed out
    pub fn child_at_index(
        &mut self,
        index: usize,
        ctx: &ExecutionContext,
    ) -> Result<Option<&mut ValueObject>> {
        let count = self.num_children();
        if index >= count {
            return Ok(None);
        }
        self.update_if_needed(ctx)?;
        let base = self.child_base();
        let arch = self.arch;

        let child = match self.children.entry(index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let Some(member) = self.type_desc.child_at(index) else {
                    return Err(surface_internal(
                        &self.name,
                        ValueError::Internal(format!(
                            "type {} reports {} children but has no member at index {}",
                            self.type_desc.name(),
                            count,
                            index
                        )),
                    ));
                };
                trace!("Creating child {} of '{}'", index, self.name);
                entry.insert(ValueObject::new_child(
                    member.name,
                    member.type_desc,
                    member.byte_offset,
                    arch,
                ))
            }
        };
        child.rebase(base);
        child.update_if_needed(ctx)?;
        Ok(Some(child))
    }

    /// Child whose member name is `name`
    pub fn child_member_with_name(
        &mut self,
        name: &str,
        ctx: &ExecutionContext,
    ) -> Result<Option<&mut ValueObject>> {
        if !self.type_desc.is_aggregate() {
            return Ok(None);
        }
        match self.type_desc.child_index_of(name) {
            Some(index) => self.child_at_index(index, ctx),
            None => Ok(None),
        }
    }

    fn rebase(&mut self, base: ParentBase) {
        if let ValueSource::Child { parent_base, .. } = &mut self.source {
            if parent_base.as_ref() != Some(&base) {
                trace!("Rebasing child '{}' onto {:?}", self.name, base);
                *parent_base = Some(base);
                self.needs_update = true;
            }
        }
    }
}

/// Log a broken invariant and hand it back to the caller. Aborts debug builds.
fn surface_internal(name: &str, err: ValueError) -> ValueError {
    error!("Value '{}': {}", name, err);
    debug_assert!(!err.is_internal(), "{err}");
    err
}
