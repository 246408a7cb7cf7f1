//! Thread-safe storage for definitions.
//!
//! Every definition kind lives in its own `DashMap` keyed by a handle
//! allocated from an atomic counter. Lookups hand out `Arc`s so no map
//! shard stays locked while a caller works with a definition.

use crate::generics::{GenericInstance, GenericParameter};
use crate::members::MemberDefinition;
use crate::namespaces::UnitNamespace;
use crate::types::NamedTypeDefinition;
use dashmap::DashMap;
use srcmodel_common::{GenericParamId, InstanceId, MemberDefId, NamespaceDefId, TypeDefId, TypeRef};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// First handle value handed out; `0` is the invalid handle.
const FIRST_VALID: u32 = 1;

pub struct DefinitionStore {
    types: DashMap<TypeDefId, Arc<NamedTypeDefinition>>,
    namespaces: DashMap<NamespaceDefId, Arc<UnitNamespace>>,
    members: DashMap<MemberDefId, Arc<MemberDefinition>>,
    generic_params: DashMap<GenericParamId, Arc<GenericParameter>>,
    instances: DashMap<InstanceId, Arc<GenericInstance>>,
    /// Interning table for generic instances.
    instance_keys: DashMap<(TypeDefId, Vec<TypeRef>), InstanceId>,
    next_type: AtomicU32,
    next_namespace: AtomicU32,
    next_member: AtomicU32,
    next_generic_param: AtomicU32,
    next_instance: AtomicU32,
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionStore {
    pub fn new() -> Self {
        DefinitionStore {
            types: DashMap::new(),
            namespaces: DashMap::new(),
            members: DashMap::new(),
            generic_params: DashMap::new(),
            instances: DashMap::new(),
            instance_keys: DashMap::new(),
            next_type: AtomicU32::new(FIRST_VALID),
            next_namespace: AtomicU32::new(FIRST_VALID),
            next_member: AtomicU32::new(FIRST_VALID),
            next_generic_param: AtomicU32::new(FIRST_VALID),
            next_instance: AtomicU32::new(FIRST_VALID),
        }
    }

    /// Register a type definition built by `make` around a fresh handle.
    pub fn register_type(
        &self,
        make: impl FnOnce(TypeDefId) -> NamedTypeDefinition,
    ) -> Arc<NamedTypeDefinition> {
        let id = TypeDefId(self.next_type.fetch_add(1, Ordering::SeqCst));
        let def = Arc::new(make(id));
        trace!(type_def = id.0, "DefinitionStore::register_type");
        self.types.insert(id, Arc::clone(&def));
        def
    }

    pub fn register_namespace(
        &self,
        make: impl FnOnce(NamespaceDefId) -> UnitNamespace,
    ) -> Arc<UnitNamespace> {
        let id = NamespaceDefId(self.next_namespace.fetch_add(1, Ordering::SeqCst));
        let def = Arc::new(make(id));
        trace!(namespace_def = id.0, "DefinitionStore::register_namespace");
        self.namespaces.insert(id, Arc::clone(&def));
        def
    }

    pub fn register_member(
        &self,
        make: impl FnOnce(MemberDefId) -> MemberDefinition,
    ) -> Arc<MemberDefinition> {
        let id = MemberDefId(self.next_member.fetch_add(1, Ordering::SeqCst));
        let def = Arc::new(make(id));
        trace!(member_def = id.0, kind = ?def.kind, "DefinitionStore::register_member");
        self.members.insert(id, Arc::clone(&def));
        def
    }

    pub fn register_generic_param(
        &self,
        make: impl FnOnce(GenericParamId) -> GenericParameter,
    ) -> Arc<GenericParameter> {
        let id = GenericParamId(self.next_generic_param.fetch_add(1, Ordering::SeqCst));
        let def = Arc::new(make(id));
        trace!(generic_param = id.0, "DefinitionStore::register_generic_param");
        self.generic_params.insert(id, Arc::clone(&def));
        def
    }

    /// The interned instance of `generic` applied to `args`.
    pub fn intern_instance(&self, generic: TypeDefId, args: Vec<TypeRef>) -> InstanceId {
        let key = (generic, args);
        if let Some(id) = self.instance_keys.get(&key) {
            return *id;
        }
        *self
            .instance_keys
            .entry(key.clone())
            .or_insert_with(|| {
                let id = InstanceId(self.next_instance.fetch_add(1, Ordering::SeqCst));
                trace!(instance = id.0, generic = generic.0, "DefinitionStore::intern_instance");
                self.instances.insert(
                    id,
                    Arc::new(GenericInstance {
                        id,
                        generic: key.0,
                        args: key.1,
                    }),
                );
                id
            })
    }

    pub fn type_def(&self, id: TypeDefId) -> Option<Arc<NamedTypeDefinition>> {
        self.types.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn namespace(&self, id: NamespaceDefId) -> Option<Arc<UnitNamespace>> {
        self.namespaces.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn member(&self, id: MemberDefId) -> Option<Arc<MemberDefinition>> {
        self.members.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn generic_param(&self, id: GenericParamId) -> Option<Arc<GenericParameter>> {
        self.generic_params.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn instance(&self, id: InstanceId) -> Option<Arc<GenericInstance>> {
        self.instances.get(&id).map(|r| Arc::clone(r.value()))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }
}

impl std::fmt::Debug for DefinitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionStore")
            .field("types", &self.types.len())
            .field("namespaces", &self.namespaces.len())
            .field("members", &self.members.len())
            .field("generic_params", &self.generic_params.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
