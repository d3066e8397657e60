//! Session-owned type system handle
//!
//! Interns types structurally so that every value of a given type shares one
//! [`TypeHandle`]. Types are bucketed by display name; inside a bucket a type
//! is reused only if its whole layout is equal, so anonymous aggregates or
//! same-named types from different compilation units never alias each other.
//! Member and element types are interned on the way in, which makes the same
//! member type one shared handle across every parent that uses it.

use crate::descriptor::TypeHandle;
use crate::type_info::{StructMember, TypeInfo};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

type Buckets = HashMap<String, Vec<Arc<TypeInfo>>>;

#[derive(Debug, Default)]
pub struct TypeSystem {
    by_name: RwLock<Buckets>,
}

impl TypeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Buckets> {
        match self.by_name.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Buckets> {
        match self.by_name.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Intern a `TypeInfo`, returning the existing handle if a structurally
    /// equal type was registered before.
    pub fn register(&self, type_info: TypeInfo) -> TypeHandle {
        let mut buckets = self.write();
        intern(&mut buckets, type_info)
    }

    /// First type registered under `name`
    pub fn find(&self, name: &str) -> Option<TypeHandle> {
        self.read()
            .get(name)
            .and_then(|bucket| bucket.first())
            .map(|handle| handle.clone() as TypeHandle)
    }

    /// Every distinct layout registered under `name`, in registration order
    pub fn find_all(&self, name: &str) -> Vec<TypeHandle> {
        self.read().get(name).map_or_else(Vec::new, |bucket| {
            bucket
                .iter()
                .map(|handle| handle.clone() as TypeHandle)
                .collect()
        })
    }

    /// Number of distinct types, member types included
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn intern(buckets: &mut Buckets, type_info: TypeInfo) -> Arc<TypeInfo> {
    let type_info = share_children(buckets, type_info);
    let name = type_info.type_name();
    let bucket = buckets.entry(name).or_default();
    if let Some(existing) = bucket.iter().find(|known| ***known == type_info) {
        trace!("Type '{}' already interned", type_info);
        return existing.clone();
    }
    debug!(
        "Interning type '{}' ({} bytes, layout {} under this name)",
        type_info,
        type_info.size(),
        bucket.len() + 1
    );
    let handle = Arc::new(type_info);
    bucket.push(handle.clone());
    handle
}

fn intern_shared(buckets: &mut Buckets, type_info: Arc<TypeInfo>) -> Arc<TypeInfo> {
    intern(buckets, Arc::unwrap_or_clone(type_info))
}

fn share_members(buckets: &mut Buckets, members: Vec<StructMember>) -> Vec<StructMember> {
    members
        .into_iter()
        .map(|member| StructMember {
            member_type: intern_shared(buckets, member.member_type),
            ..member
        })
        .collect()
}

/// Replace member and element types by their interned handles
fn share_children(buckets: &mut Buckets, type_info: TypeInfo) -> TypeInfo {
    match type_info {
        TypeInfo::StructType {
            name,
            size,
            members,
        } => TypeInfo::StructType {
            name,
            size,
            members: share_members(buckets, members),
        },
        TypeInfo::UnionType {
            name,
            size,
            members,
        } => TypeInfo::UnionType {
            name,
            size,
            members: share_members(buckets, members),
        },
        TypeInfo::ArrayType {
            element_type,
            element_count,
            total_size,
        } => TypeInfo::ArrayType {
            element_type: intern_shared(buckets, element_type),
            element_count,
            total_size,
        },
        TypeInfo::TypedefType {
            name,
            underlying_type,
        } => TypeInfo::TypedefType {
            name,
            underlying_type: Box::new(share_children(buckets, *underlying_type)),
        },
        TypeInfo::QualifiedType {
            qualifier,
            underlying_type,
        } => TypeInfo::QualifiedType {
            qualifier,
            underlying_type: Box::new(share_children(buckets, *underlying_type)),
        },
        other => other,
    }
}
