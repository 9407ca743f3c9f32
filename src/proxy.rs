//! Single-slot handles for the input source and listener proxy chains.
//!
//! A handle owns the head of a chain. Installing a proxy splices it in at the
//! head; uninstalling walks the forward links and splices the node out from
//! any position. Chain faults never panic the host: an unset handle or a node
//! that is no longer linked is logged and reported as `false`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::source::{InputListener, InputSource};

/// Owns the head of an input source chain.
#[derive(Default)]
pub struct InputHandle {
    slot: Mutex<Option<Arc<dyn InputSource>>>,
}

impl InputHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the handle at the raw backend adapter. Host startup calls this
    /// once, before any proxy is installed.
    pub fn init(&self, root: Arc<dyn InputSource>) {
        *self.slot.lock() = Some(root);
    }

    /// Unsets the handle. Any still-installed proxies are dropped with it.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// The current chain head, through which all reads go.
    pub fn current(&self) -> Option<Arc<dyn InputSource>> {
        self.slot.lock().clone()
    }

    /// Splices a proxy in at the head. Fails (with a warning) when the handle
    /// is unset, since the proxy would have nothing to delegate to.
    pub fn install(&self, node: Arc<dyn InputSource>) -> bool {
        let mut slot = self.slot.lock();
        let Some(head) = slot.clone() else {
            warn!("cannot install input proxy: handle is unset");
            return false;
        };
        node.set_proxied(Some(head));
        *slot = Some(node);
        true
    }

    /// Removes a previously installed proxy from anywhere in the chain,
    /// splicing its delegate into its place. Identity is by allocation, not
    /// by value. Returns false (with a warning) when the node is not linked.
    pub fn uninstall(&self, node: &Arc<dyn InputSource>) -> bool {
        let mut slot = self.slot.lock();
        let Some(head) = slot.clone() else {
            warn!("cannot uninstall input proxy: handle is unset");
            return false;
        };
        if Arc::ptr_eq(&head, node) {
            *slot = node.proxied();
            node.set_proxied(None);
            return true;
        }
        let mut current = head;
        while let Some(next) = current.proxied() {
            if Arc::ptr_eq(&next, node) {
                current.set_proxied(node.proxied());
                node.set_proxied(None);
                return true;
            }
            current = next;
        }
        warn!("cannot uninstall input proxy: node is not in the chain");
        false
    }
}

/// Owns the head of a listener chain. Same contract as [`InputHandle`],
/// replicated for the listener seam.
#[derive(Default)]
pub struct ListenerHandle {
    slot: Mutex<Option<Arc<dyn InputListener>>>,
}

impl ListenerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application's listener. Unlike the input handle this may stay
    /// unset; dispatch is simply skipped then.
    pub fn set(&self, listener: Option<Arc<dyn InputListener>>) {
        *self.slot.lock() = listener;
    }

    pub fn current(&self) -> Option<Arc<dyn InputListener>> {
        self.slot.lock().clone()
    }

    /// Splices a listener proxy in at the head. An empty chain is a valid
    /// install target: the proxy becomes the head with no delegate.
    pub fn install(&self, node: Arc<dyn InputListener>) -> bool {
        let mut slot = self.slot.lock();
        node.set_proxied_listener(slot.clone());
        *slot = Some(node);
        true
    }

    pub fn uninstall(&self, node: &Arc<dyn InputListener>) -> bool {
        let mut slot = self.slot.lock();
        let Some(head) = slot.clone() else {
            warn!("cannot uninstall listener proxy: handle is unset");
            return false;
        };
        if Arc::ptr_eq(&head, node) {
            *slot = node.proxied_listener();
            node.set_proxied_listener(None);
            return true;
        }
        let mut current = head;
        while let Some(next) = current.proxied_listener() {
            if Arc::ptr_eq(&next, node) {
                current.set_proxied_listener(node.proxied_listener());
                node.set_proxied_listener(None);
                return true;
            }
            current = next;
        }
        warn!("cannot uninstall listener proxy: node is not in the chain");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Node {
        tag: i32,
        next: Mutex<Option<Arc<dyn InputSource>>>,
    }

    impl Node {
        fn arc(tag: i32) -> Arc<dyn InputSource> {
            Arc::new(Node {
                tag,
                next: Mutex::new(None),
            })
        }
    }

    impl InputSource for Node {
        fn pointer_x(&self, _pointer: usize) -> i32 {
            self.tag
        }

        fn proxied(&self) -> Option<Arc<dyn InputSource>> {
            self.next.lock().clone()
        }

        fn set_proxied(&self, delegate: Option<Arc<dyn InputSource>>) {
            *self.next.lock() = delegate;
        }
    }

    fn chain_tags(handle: &InputHandle) -> Vec<i32> {
        let mut tags = Vec::new();
        let mut current = handle.current();
        while let Some(node) = current {
            tags.push(node.pointer_x(0));
            current = node.proxied();
        }
        tags
    }

    #[test]
    fn install_splices_at_head() {
        let handle = InputHandle::new();
        handle.init(Node::arc(0));
        assert!(handle.install(Node::arc(1)));
        assert!(handle.install(Node::arc(2)));
        assert_eq!(chain_tags(&handle), vec![2, 1, 0]);
    }

    #[test]
    fn install_on_unset_handle_fails() {
        let handle = InputHandle::new();
        assert!(!handle.install(Node::arc(1)));
        assert!(handle.current().is_none());
    }

    #[test]
    fn uninstall_lower_node_keeps_upper_linked() {
        let handle = InputHandle::new();
        handle.init(Node::arc(0));
        let lower = Node::arc(1);
        let upper = Node::arc(2);
        handle.install(lower.clone());
        handle.install(upper.clone());

        assert!(handle.uninstall(&lower));
        assert_eq!(chain_tags(&handle), vec![2, 0]);
        assert!(lower.proxied().is_none());
    }

    #[test]
    fn uninstall_head_promotes_delegate() {
        let handle = InputHandle::new();
        handle.init(Node::arc(0));
        let head = Node::arc(1);
        handle.install(head.clone());

        assert!(handle.uninstall(&head));
        assert_eq!(chain_tags(&handle), vec![0]);
    }

    #[test]
    fn uninstall_missing_node_reports_false() {
        let handle = InputHandle::new();
        handle.init(Node::arc(0));
        let stray = Node::arc(9);
        assert!(!handle.uninstall(&stray));
        assert_eq!(chain_tags(&handle), vec![0]);
    }

    #[test]
    fn uninstall_is_by_identity_not_value() {
        let handle = InputHandle::new();
        handle.init(Node::arc(0));
        let installed = Node::arc(1);
        handle.install(installed.clone());

        let twin = Node::arc(1);
        assert!(!handle.uninstall(&twin));
        assert!(handle.uninstall(&installed));
    }

    #[test]
    fn reads_through_head_reach_the_root_by_default() {
        struct Passthrough {
            next: Mutex<Option<Arc<dyn InputSource>>>,
        }
        impl InputSource for Passthrough {
            fn proxied(&self) -> Option<Arc<dyn InputSource>> {
                self.next.lock().clone()
            }
            fn set_proxied(&self, delegate: Option<Arc<dyn InputSource>>) {
                *self.next.lock() = delegate;
            }
        }

        let handle = InputHandle::new();
        handle.init(Node::arc(42));
        handle.install(Arc::new(Passthrough {
            next: Mutex::new(None),
        }));
        let head = handle.current().unwrap();
        assert_eq!(head.pointer_x(0), 42);
    }
}
