//! Dynamic content bridge.
//!
//! A [`ForEach`] turns a reactive sequence of application items into rows or
//! sections. Its [`ForEachListener`] subscribes to the source, maps every item
//! to the declared element type on each emission and republishes the mapped
//! sequence on its own output, which list builders watch to trigger a rebuild.
//!
//! ```
//! use std::sync::Arc;
//! use horizon_trellis::{ForEach, RowNode};
//! use horizon_trellis_core::{Value, ViewKind};
//!
//! let contacts = Arc::new(Value::new(vec!["Ada", "Grace"]));
//! let rows: ForEach<RowNode> = ForEach::new(&contacts, |name: &&str| {
//!     let name = name.to_string();
//!     RowNode::new(move |scene| scene.create_named_view(ViewKind::Composite, name.clone()))
//! });
//!
//! assert_eq!(rows.len(), 2);
//! contacts.update(|items| items.push("Edsger"));
//! assert_eq!(rows.len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

use horizon_trellis_core::{Subscription, Value};

use crate::targets;

/// Mirrors a reactive source through a mapping into its own output.
pub struct ForEachListener<E> {
    output: Arc<Value<Vec<E>>>,
    _source: Subscription,
}

impl<E: Clone + Send + Sync + 'static> ForEachListener<E> {
    /// Subscribe to `source`, publishing `map` of its items.
    ///
    /// The output starts with the source's current items.
    pub fn new<T, F>(source: &Value<Vec<T>>, map: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) -> E + Send + Sync + 'static,
    {
        let map = Arc::new(map);
        let initial: Vec<E> = source.with(|items| items.iter().map(|item| map(item)).collect());
        let output = Arc::new(Value::new(initial));

        let weak_output = Arc::downgrade(&output);
        let subscription = source.subscribe(move |items: &Vec<T>| {
            let Some(output) = weak_output.upgrade() else {
                return;
            };
            let mapped: Vec<E> = items.iter().map(|item| map(item)).collect();
            tracing::trace!(target: targets::FOR_EACH, items = mapped.len(), "for-each contents changed");
            output.set(mapped);
        });

        Self {
            output,
            _source: subscription,
        }
    }

    /// The mapped items.
    pub fn items(&self) -> Vec<E> {
        self.output.get()
    }

    /// Number of mapped items.
    pub fn len(&self) -> usize {
        self.output.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The reactive output the list builder observes.
    pub fn output(&self) -> &Value<Vec<E>> {
        &self.output
    }

    /// Observe republished contents until the guard is dropped.
    pub fn on_contents_changed<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&Vec<E>) + Send + Sync + 'static,
    {
        self.output.subscribe(slot)
    }
}

impl<E> fmt::Debug for ForEachListener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForEachListener").finish_non_exhaustive()
    }
}

/// A declared for-each entry producing elements of type `E`.
///
/// Cloning shares the listener.
pub struct ForEach<E> {
    listener: Arc<ForEachListener<E>>,
}

impl<E> Clone for ForEach<E> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
        }
    }
}

impl<E: Clone + Send + Sync + 'static> ForEach<E> {
    /// Map every item of `source` to an element.
    pub fn new<T, F>(source: &Value<Vec<T>>, map: F) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) -> E + Send + Sync + 'static,
    {
        Self {
            listener: Arc::new(ForEachListener::new(source, map)),
        }
    }

    /// The current elements.
    pub fn items(&self) -> Vec<E> {
        self.listener.items()
    }

    pub fn len(&self) -> usize {
        self.listener.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listener.is_empty()
    }

    pub fn listener(&self) -> &Arc<ForEachListener<E>> {
        &self.listener
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_maps_initial_and_updated_items() {
        let source = Value::new(vec![1, 2, 3]);
        let each = ForEach::new(&source, |n: &i32| n * 10);

        assert_eq!(each.items(), vec![10, 20, 30]);
        source.set(vec![4]);
        assert_eq!(each.items(), vec![40]);
        assert!(!each.is_empty());
    }

    #[test]
    fn test_republishes_on_output() {
        let source = Value::new(vec!["a".to_string()]);
        let each = ForEach::new(&source, |s: &String| s.len());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let _guard = each
            .listener()
            .on_contents_changed(move |items| s.lock().push(items.clone()));

        source.set(vec!["bb".into(), "ccc".into()]);
        assert_eq!(*seen.lock(), vec![vec![2, 3]]);
    }

    #[test]
    fn test_dropping_listener_detaches_from_source() {
        let source = Value::new(vec![1]);
        let each = ForEach::new(&source, |n: &i32| *n);
        assert_eq!(source.changed().connection_count(), 1);

        drop(each);
        assert_eq!(source.changed().connection_count(), 0);
        source.set(vec![2]);
    }
}
