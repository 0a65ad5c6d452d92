//! Remote object registry
//!
//! Proxies are keyed by node, then by object identifier. Adding a proxy
//! for an identifier that is already known replaces the old one.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use enl_core::{ClassEoj, EnlResult, Eoj, NodeId};

use crate::RemoteObjectRef;

/// Registry of remote object proxies
#[derive(Default)]
pub struct RemoteRegistry {
    nodes: RwLock<HashMap<NodeId, BTreeMap<Eoj, RemoteObjectRef>>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        RemoteRegistry::default()
    }

    /// Insert a proxy, returning the one it replaced
    pub fn add(&self, object: RemoteObjectRef) -> Option<RemoteObjectRef> {
        let (node, eoj) = (object.node(), object.eoj());
        let previous = self.nodes.write().entry(node).or_default().insert(eoj, object);
        debug!(%node, %eoj, replaced = previous.is_some(), "remote object added");
        previous
    }

    /// Known proxy for `(node, eoj)`, or the one built by `create`
    ///
    /// Lookup and insertion happen under one write lock, so concurrent
    /// callers all receive the proxy the registry keeps. The flag is true
    /// when `create` ran.
    pub fn get_or_insert_with<F>(
        &self,
        node: NodeId,
        eoj: Eoj,
        create: F,
    ) -> EnlResult<(RemoteObjectRef, bool)>
    where
        F: FnOnce() -> EnlResult<RemoteObjectRef>,
    {
        if let Some(object) = self.get(node, eoj) {
            return Ok((object, false));
        }

        let mut nodes = self.nodes.write();
        let objects = nodes.entry(node).or_default();
        if let Some(object) = objects.get(&eoj) {
            return Ok((object.clone(), false));
        }
        let object = create()?;
        objects.insert(eoj, object.clone());
        debug!(%node, %eoj, "remote object created");
        Ok((object, true))
    }

    pub fn get(&self, node: NodeId, eoj: Eoj) -> Option<RemoteObjectRef> {
        self.nodes.read().get(&node)?.get(&eoj).cloned()
    }

    /// Every proxy known at a node
    pub fn get_at_node(&self, node: NodeId) -> Vec<RemoteObjectRef> {
        self.nodes
            .read()
            .get(&node)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every proxy of a class at a node
    pub fn get_with_class(&self, node: NodeId, class: ClassEoj) -> Vec<RemoteObjectRef> {
        self.nodes
            .read()
            .get(&node)
            .map(|objects| {
                objects
                    .values()
                    .filter(|o| o.eoj().class_eoj() == class)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn remove(&self, node: NodeId, eoj: Eoj) -> Option<RemoteObjectRef> {
        let mut nodes = self.nodes.write();
        let objects = nodes.get_mut(&node)?;
        let removed = objects.remove(&eoj);
        if objects.is_empty() {
            nodes.remove(&node);
        }
        removed
    }

    /// Nodes with at least one proxy
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RemoteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRegistry")
            .field("objects", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RemoteObject, Transaction, TransactionConfig, TransactionManager};
    use enl_core::EnlError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    struct Unreachable;

    impl TransactionManager for Unreachable {
        fn local_node(&self) -> NodeId {
            NodeId::new(1)
        }

        fn create(&self, _config: TransactionConfig) -> EnlResult<Box<dyn Transaction>> {
            Err(EnlError::Transport("unreachable".into()))
        }
    }

    fn proxy(node: u64, eoj: Eoj) -> RemoteObjectRef {
        Arc::new(RemoteObject::new(NodeId::new(node), eoj, Arc::new(Unreachable)))
    }

    #[test]
    fn test_add_and_lookup() {
        let registry = RemoteRegistry::new();
        let light = Eoj::new(0x02, 0x90, 0x01);
        assert!(registry.add(proxy(2, light)).is_none());
        assert!(registry.get(NodeId::new(2), light).is_some());
        assert!(registry.get(NodeId::new(3), light).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let registry = RemoteRegistry::new();
        let light = Eoj::new(0x02, 0x90, 0x01);
        let first = proxy(2, light);
        let second = proxy(2, light);
        registry.add(first.clone());
        let replaced = registry.add(second.clone()).unwrap();
        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&registry.get(NodeId::new(2), light).unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_class_and_node_queries() {
        let registry = RemoteRegistry::new();
        registry.add(proxy(2, Eoj::new(0x02, 0x90, 0x01)));
        registry.add(proxy(2, Eoj::new(0x02, 0x90, 0x02)));
        registry.add(proxy(2, Eoj::new(0x01, 0x30, 0x01)));
        registry.add(proxy(3, Eoj::new(0x02, 0x90, 0x01)));

        assert_eq!(registry.get_at_node(NodeId::new(2)).len(), 3);
        assert_eq!(registry.get_with_class(NodeId::new(2), ClassEoj::new(0x02, 0x90)).len(), 2);
        assert!(registry.get_with_class(NodeId::new(4), ClassEoj::new(0x02, 0x90)).is_empty());
        assert_eq!(registry.nodes().len(), 2);

        assert!(registry.remove(NodeId::new(3), Eoj::new(0x02, 0x90, 0x01)).is_some());
        assert_eq!(registry.nodes(), vec![NodeId::new(2)]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_get_or_insert_keeps_existing() {
        let registry = RemoteRegistry::new();
        let light = Eoj::new(0x02, 0x90, 0x01);
        let first = proxy(2, light);
        registry.add(first.clone());

        let (found, created) = registry
            .get_or_insert_with(NodeId::new(2), light, || Ok(proxy(2, light)))
            .unwrap();
        assert!(!created);
        assert!(Arc::ptr_eq(&found, &first));

        // a failed build leaves nothing behind
        let other = Eoj::new(0x02, 0x90, 0x02);
        let result = registry.get_or_insert_with(NodeId::new(2), other, || {
            Err(EnlError::InvalidTimeout)
        });
        assert!(result.is_err());
        assert!(registry.get(NodeId::new(2), other).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_get_or_insert_builds_once() {
        const THREADS: usize = 8;
        let light = Eoj::new(0x02, 0x90, 0x01);

        for _ in 0..50 {
            let registry = Arc::new(RemoteRegistry::new());
            let builds = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let registry = registry.clone();
                    let builds = builds.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        registry
                            .get_or_insert_with(NodeId::new(2), light, || {
                                builds.fetch_add(1, Ordering::SeqCst);
                                Ok(proxy(2, light))
                            })
                            .unwrap()
                            .0
                    })
                })
                .collect();

            let returned: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let kept = registry.get(NodeId::new(2), light).unwrap();
            assert!(returned.iter().all(|r| Arc::ptr_eq(r, &kept)));
            assert_eq!(builds.load(Ordering::SeqCst), 1);
        }
    }
}
