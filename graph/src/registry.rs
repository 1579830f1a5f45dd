use std::collections::HashMap;
use std::sync::Arc;

use basalt_core::gpu::{GpuBackend, ResourceHandle};

use crate::error::{GraphError, GraphResult};
use crate::identifier::ResourceIdentifier;
use crate::resource::GraphResource;

/// Synthesizes resources on demand for a set of advertised identifiers.
pub trait ResourceProvider<B: GpuBackend>: Send + Sync {
    fn supported_keys(&self) -> Vec<ResourceIdentifier>;
    fn provide(&self, id: &ResourceIdentifier) -> Option<Arc<GraphResource<B>>>;

    fn supported_resolver_keys(&self) -> Vec<ResourceIdentifier> {
        Vec::new()
    }
    fn provide_resolver(&self, _id: &ResourceIdentifier) -> Option<Arc<dyn ResourceResolver<B>>> {
        None
    }
}

/// Expands one identifier into a set of resources determined at query time,
/// e.g. "every buffer participating in phase N".
pub trait ResourceResolver<B: GpuBackend>: Send + Sync {
    fn resolve(&self) -> Vec<Arc<GraphResource<B>>>;
}

struct Slot<B: GpuBackend> {
    generation: u32,
    resource: Option<Arc<GraphResource<B>>>,
}

/// Owns every resource the graph knows about and maps identifiers to them
/// through three layers: the direct map, then providers, then resolvers.
/// Handles are generational; a stale handle resolves to `None` after the
/// slot is updated or freed.
pub struct ResourceRegistry<B: GpuBackend> {
    slots: Vec<Slot<B>>,
    free: Vec<u32>,
    by_identifier: HashMap<ResourceIdentifier, ResourceHandle>,
    by_global_id: HashMap<u64, ResourceHandle>,
    providers: Vec<Arc<dyn ResourceProvider<B>>>,
    provider_map: HashMap<ResourceIdentifier, Arc<dyn ResourceProvider<B>>>,
    resolver_map: HashMap<ResourceIdentifier, Arc<dyn ResourceResolver<B>>>,
}

impl<B: GpuBackend> Default for ResourceRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GpuBackend> ResourceRegistry<B> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_identifier: HashMap::new(),
            by_global_id: HashMap::new(),
            providers: Vec::new(),
            provider_map: HashMap::new(),
            resolver_map: HashMap::new(),
        }
    }

    fn allocate(&mut self, resource: Arc<GraphResource<B>>) -> ResourceHandle {
        let global_id = resource.global_id();
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.resource = Some(resource);
            ResourceHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                resource: Some(resource),
            });
            ResourceHandle::new(index, 1)
        };
        self.by_global_id.insert(global_id, handle);
        handle
    }

    /// Claims `id`. Registering the same resource again is a no-op;
    /// registering a different resource under a claimed id fails.
    pub fn register(
        &mut self,
        id: &ResourceIdentifier,
        resource: Arc<GraphResource<B>>,
    ) -> GraphResult<ResourceHandle> {
        if let Some(&existing) = self.by_identifier.get(id) {
            let same = self
                .resolve(existing)
                .map(|r| r.global_id() == resource.global_id())
                .unwrap_or(false);
            if same {
                return Ok(existing);
            }
            return Err(GraphError::AlreadyExists(id.clone()));
        }
        let handle = self.allocate(resource);
        self.by_identifier.insert(id.clone(), handle);
        Ok(handle)
    }

    /// Upserts `id`. An existing slot is reused with a bumped generation so
    /// stale handles for the previous resource stop resolving.
    pub fn register_or_update(
        &mut self,
        id: &ResourceIdentifier,
        resource: Arc<GraphResource<B>>,
    ) -> ResourceHandle {
        if let Some(&existing) = self.by_identifier.get(id) {
            let slot = &mut self.slots[existing.index as usize];
            if let Some(old) = slot.resource.take() {
                self.by_global_id.remove(&old.global_id());
            }
            slot.generation += 1;
            let handle = ResourceHandle::new(existing.index, slot.generation);
            self.by_global_id.insert(resource.global_id(), handle);
            slot.resource = Some(resource);
            self.by_identifier.insert(id.clone(), handle);
            handle
        } else {
            let handle = self.allocate(resource);
            self.by_identifier.insert(id.clone(), handle);
            handle
        }
    }

    /// Issues a handle for a resource with no identifier. Re-registering
    /// the same resource returns the existing handle.
    pub fn register_anonymous(&mut self, resource: Arc<GraphResource<B>>) -> ResourceHandle {
        if let Some(&existing) = self.by_global_id.get(&resource.global_id()) {
            return existing;
        }
        self.allocate(resource)
    }

    pub fn handle_for_id(&self, id: &ResourceIdentifier) -> Option<ResourceHandle> {
        self.by_identifier.get(id).copied()
    }

    pub fn handle_for_resource(&self, resource: &GraphResource<B>) -> Option<ResourceHandle> {
        self.by_global_id.get(&resource.global_id()).copied()
    }

    pub fn handle_for_global_id(&self, global_id: u64) -> Option<ResourceHandle> {
        self.by_global_id.get(&global_id).copied()
    }

    pub fn resolve(&self, handle: ResourceHandle) -> Option<&Arc<GraphResource<B>>> {
        if !handle.is_valid() {
            return None;
        }
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.resource.as_ref()
    }

    /// Direct-map lookup only; no provider consultation.
    pub fn get_shared(&self, id: &ResourceIdentifier) -> Option<Arc<GraphResource<B>>> {
        self.handle_for_id(id)
            .and_then(|h| self.resolve(h))
            .cloned()
    }

    pub fn remove(&mut self, handle: ResourceHandle) -> Option<Arc<GraphResource<B>>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let resource = slot.resource.take()?;
        slot.generation += 1;
        self.free.push(handle.index);
        self.by_global_id.remove(&resource.global_id());
        self.by_identifier.retain(|_, h| *h != handle);
        Some(resource)
    }

    /// Registers a provider and immediately materializes everything it
    /// advertises, including its resolvers.
    pub fn register_provider(
        &mut self,
        provider: Arc<dyn ResourceProvider<B>>,
    ) -> GraphResult<()> {
        let keys = provider.supported_keys();
        for key in &keys {
            if self.provider_map.contains_key(key) {
                return Err(GraphError::AlreadyExists(key.clone()));
            }
        }
        for key in &keys {
            self.provider_map.insert(key.clone(), provider.clone());
        }
        self.providers.push(provider.clone());

        for key in &keys {
            match provider.provide(key) {
                Some(resource) => {
                    self.register_or_update(key, resource);
                }
                None => {
                    log::warn!("provider returned nothing for advertised key `{}`", key);
                }
            }
        }

        for key in provider.supported_resolver_keys() {
            match provider.provide_resolver(&key) {
                Some(resolver) => self.register_resolver(&key, resolver)?,
                None => {
                    log::warn!("provider returned no resolver for advertised key `{}`", key);
                }
            }
        }
        Ok(())
    }

    /// Registers a resolver and anonymously registers everything it
    /// currently expands to.
    pub fn register_resolver(
        &mut self,
        id: &ResourceIdentifier,
        resolver: Arc<dyn ResourceResolver<B>>,
    ) -> GraphResult<()> {
        if self.resolver_map.contains_key(id) {
            return Err(GraphError::AlreadyExists(id.clone()));
        }
        for resource in resolver.resolve() {
            self.register_anonymous(resource);
        }
        self.resolver_map.insert(id.clone(), resolver);
        Ok(())
    }

    pub fn resolver_for(&self, id: &ResourceIdentifier) -> Option<Arc<dyn ResourceResolver<B>>> {
        self.resolver_map.get(id).cloned()
    }

    pub fn providers(&self) -> &[Arc<dyn ResourceProvider<B>>] {
        &self.providers
    }

    /// Full lookup chain: direct map, then provider (whose result is
    /// registered before answering).
    pub fn request_shared(
        &mut self,
        id: &ResourceIdentifier,
        allow_failure: bool,
    ) -> GraphResult<Option<Arc<GraphResource<B>>>> {
        if let Some(cached) = self.get_shared(id) {
            return Ok(Some(cached));
        }
        if let Some(provider) = self.provider_map.get(id).cloned() {
            return match provider.provide(id) {
                Some(resource) => {
                    self.register_or_update(id, resource.clone());
                    Ok(Some(resource))
                }
                None => Err(GraphError::ProviderFailed(id.clone())),
            };
        }
        if allow_failure {
            Ok(None)
        } else {
            Err(GraphError::MissingProvider(id.clone()))
        }
    }

    pub fn request_handle(
        &mut self,
        id: &ResourceIdentifier,
        allow_failure: bool,
    ) -> GraphResult<Option<ResourceHandle>> {
        if let Some(handle) = self.handle_for_id(id) {
            return Ok(Some(handle));
        }
        match self.request_shared(id, allow_failure)? {
            Some(_) => Ok(self.handle_for_id(id)),
            None => Ok(None),
        }
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<GraphResource<B>>> {
        self.slots.iter().filter_map(|s| s.resource.as_ref())
    }
}
