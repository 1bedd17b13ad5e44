//! The reconciliation algorithm.
//!
//! One pass over the current array decides, per key: create, update, skip,
//! or (afterwards) remove. Reordering is a single forward sweep that moves
//! existing targets into place; a target already in the right relative
//! position is left untouched.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use crate::value::Value;

/// Stable identity of one logical list item, extracted by
/// [`ListRenderer::key`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ListKey(String);

impl ListKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ListKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListKey({:?})", self.0)
    }
}

/// An externally owned, ordered collection of opaque render targets.
///
/// Contract: `insert_before` with a target that is already a child must
/// relocate it (DOM `insertBefore` semantics); `anchor: None` appends.
pub trait TargetContainer {
    /// Opaque, cheap-clone handle to one child.
    type Target: Clone;

    fn first_child(&self) -> Option<Self::Target>;
    fn next_sibling(&self, target: &Self::Target) -> Option<Self::Target>;
    fn insert_before(&mut self, target: Self::Target, anchor: Option<&Self::Target>);
    fn remove(&mut self, target: &Self::Target);

    /// Whether two handles denote the same child.
    fn target_eq(a: &Self::Target, b: &Self::Target) -> bool;
}

/// Caller-supplied rendering policy for one list binding.
pub trait ListRenderer<C: TargetContainer> {
    /// Extract the item's stable key. Must be comparable across passes.
    fn key(&self, item: &Value) -> ListKey;

    /// Build a fresh render target for a key seen for the first time.
    fn create_target(&mut self, container: &mut C, item: &Value) -> C::Target;

    /// Runs exactly once per key lifetime, right after `create_target`.
    fn mounted(&mut self, _item: &Value, _target: &C::Target, _index: usize) {}

    /// Runs when the item reference for a key changes (and on first
    /// render). Skipped entirely when the item is strictly equal to the
    /// previously seen one.
    fn update(&mut self, _item: &Value, _target: &C::Target, _index: usize, _first_render: bool) {}

    /// Runs after a target was detached because its key disappeared.
    fn removed(&mut self, _key: &ListKey, _target: &C::Target) {}
}

struct Entry<T> {
    target: T,
    last_item: Value,
}

/// Reconciles an array value against a [`TargetContainer`], keyed by a
/// [`ListRenderer`].
pub struct KeyedList<C, R>
where
    C: TargetContainer,
    R: ListRenderer<C>,
{
    container: C,
    renderer: R,
    entries: IndexMap<ListKey, Entry<C::Target>>,
    view_hook: Option<Box<dyn crate::list::ViewStateHook<C> + Send>>,
}

impl<C, R> KeyedList<C, R>
where
    C: TargetContainer,
    R: ListRenderer<C>,
{
    pub fn new(container: C, renderer: R) -> Self {
        Self {
            container,
            renderer,
            entries: IndexMap::new(),
            view_hook: None,
        }
    }

    /// Attach a view-state preservation strategy (focus, scroll), captured
    /// before and restored after every pass. Off by default.
    pub fn with_view_hook(
        mut self,
        hook: impl crate::list::ViewStateHook<C> + Send + 'static,
    ) -> Self {
        self.view_hook = Some(Box::new(hook));
        self
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bring the container in sync with `items`.
    pub fn reconcile(&mut self, items: &[Value]) {
        if let Some(hook) = self.view_hook.as_mut() {
            hook.capture(&self.container);
        }

        // Key every item in order. Duplicate keys are an anomaly: warn and
        // let the last occurrence win, in both the map and the order.
        let mut order: Vec<(ListKey, Value)> = Vec::with_capacity(items.len());
        for item in items {
            let key = self.renderer.key(item);
            if let Some(pos) = order.iter().position(|(existing, _)| *existing == key) {
                warn!(key = %key, "duplicate key in list; last occurrence wins");
                order.remove(pos);
            }
            order.push((key, item.clone()));
        }

        // Create new targets, update changed items.
        for (index, (key, item)) in order.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(key) {
                if !entry.last_item.strict_eq(item) {
                    entry.last_item = item.clone();
                    let target = entry.target.clone();
                    self.renderer.update(item, &target, index, false);
                }
            } else {
                let target = self.renderer.create_target(&mut self.container, item);
                self.entries.insert(
                    key.clone(),
                    Entry {
                        target: target.clone(),
                        last_item: item.clone(),
                    },
                );
                self.renderer.mounted(item, &target, index);
                self.renderer.update(item, &target, index, true);
            }
        }

        // Reorder: walk a desired-position cursor over the children. A
        // target already under the cursor is in place; anything else is
        // moved (or inserted) right before it.
        let mut cursor = self.container.first_child();
        for (key, _) in &order {
            let Some(entry) = self.entries.get(key) else {
                continue;
            };
            let target = entry.target.clone();
            match cursor.take() {
                Some(current) if C::target_eq(&current, &target) => {
                    cursor = self.container.next_sibling(&current);
                }
                other => {
                    self.container.insert_before(target, other.as_ref());
                    cursor = other;
                }
            }
        }

        // Detach targets whose keys disappeared and purge their entries.
        let live: HashSet<&ListKey> = order.iter().map(|(key, _)| key).collect();
        let dead: Vec<ListKey> = self
            .entries
            .keys()
            .filter(|key| !live.contains(*key))
            .cloned()
            .collect();
        for key in dead {
            if let Some(entry) = self.entries.shift_remove(&key) {
                self.container.remove(&entry.target);
                self.renderer.removed(&key, &entry.target);
            }
        }

        if let Some(hook) = self.view_hook.as_mut() {
            hook.restore(&mut self.container);
        }
    }
}
