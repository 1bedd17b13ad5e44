//! Integration tests for the reactive runtime.
//!
//! These exercise the pieces together: store batching feeding effects,
//! computed values layered on stores, and the list reconciler driven
//! through a live store binding.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use weft_core::{
    bind_computed_list, bind_list, is_reactive, Computed, Effect, KeyedList, ListKey,
    ListRenderer, Store, TargetContainer, TaskQueue, Value,
};

fn store_with_queue(initial: Value) -> (Store, Arc<TaskQueue>) {
    let queue = Arc::new(TaskQueue::new());
    let store = Store::builder()
        .scheduler(queue.clone())
        .build(initial)
        .unwrap();
    (store, queue)
}

// ---------------------------------------------------------------------------
// Store + effect + computed flows
// ---------------------------------------------------------------------------

#[test]
fn writes_batch_and_effects_dedupe_across_one_flush() {
    let (store, queue) = store_with_queue(Value::map([("first", "Ada"), ("last", "Lovelace")]));

    let renders = Arc::new(AtomicI32::new(0));
    let rendered = Arc::new(Mutex::new(String::new()));

    let renders_clone = renders.clone();
    let rendered_clone = rendered.clone();
    let s = store.clone();
    let _effect = Effect::new(move || {
        renders_clone.fetch_add(1, Ordering::SeqCst);
        let full = format!("{} {}", s.get("first"), s.get("last"));
        *rendered_clone.lock() = full;
    });
    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(*rendered.lock(), "Ada Lovelace");

    store.set("first", "Grace");
    store.set("last", "Hopper");
    queue.drain();

    // Two dependencies changed, one flush, one re-run.
    assert_eq!(renders.load(Ordering::SeqCst), 2);
    assert_eq!(*rendered.lock(), "Grace Hopper");
}

#[test]
fn computed_feeds_effects_through_its_subscription() {
    let (store, queue) = store_with_queue(Value::map([("items", Value::list([1, 2, 3]))]));

    let s = store.clone();
    let total = Computed::new(move || {
        let sum: f64 = s
            .get("items")
            .as_list()
            .map(|items| items.iter().filter_map(Value::as_num).sum())
            .unwrap_or(f64::NAN);
        Value::Num(sum)
    });
    assert_eq!(total.value().unwrap(), Value::Num(6.0));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = total.subscribe(move |value| {
        seen_clone.lock().push(value.clone());
    });

    store.set("items", Value::list([10, 20]));
    queue.drain();

    assert_eq!(total.value().unwrap(), Value::Num(30.0));
    assert_eq!(*seen.lock(), vec![Value::Num(6.0), Value::Num(30.0)]);
}

#[test]
fn effect_reading_two_stores_runs_once_per_flush() {
    // Documented tradeoff: batching is per instance, so two stores changed
    // in one turn deliver two separate re-runs.
    let queue = Arc::new(TaskQueue::new());
    let a = Store::builder()
        .scheduler(queue.clone())
        .build(Value::map([("x", 0)]))
        .unwrap();
    let b = Store::builder()
        .scheduler(queue.clone())
        .build(Value::map([("y", 0)]))
        .unwrap();

    let runs = Arc::new(AtomicI32::new(0));
    let runs_clone = runs.clone();
    let (a2, b2) = (a.clone(), b.clone());
    let _effect = Effect::new(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        let _ = a2.get("x");
        let _ = b2.get("y");
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    a.set("x", 1);
    b.set("y", 1);
    queue.drain();

    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn explicit_deps_effect_observes_named_keys_only() {
    let (store, queue) = store_with_queue(Value::map([("url", "/home"), ("title", "Home")]));

    let logged = Arc::new(Mutex::new(Vec::new()));
    let logged_clone = logged.clone();
    let s = store.clone();
    let _analytics = Effect::with_deps(
        move || {
            // Reads the title too, but only url changes should re-run this.
            let line = format!("{} ({})", s.get("url"), s.get("title"));
            logged_clone.lock().push(line);
        },
        &[(store.clone(), &["url"])],
    );
    assert_eq!(logged.lock().len(), 1);

    store.set("title", "Welcome");
    queue.drain();
    assert_eq!(logged.lock().len(), 1);

    store.set("url", "/about");
    queue.drain();
    assert_eq!(logged.lock().len(), 2);
    assert_eq!(logged.lock()[1], "/about (Welcome)");
}

#[test]
fn nested_stores_stay_independent() {
    let (outer, outer_queue) = store_with_queue(Value::map([("profile", Value::Undefined)]));
    let (inner, inner_queue) = store_with_queue(Value::map([("name", "ada")]));

    outer.set("profile", inner.clone());
    outer_queue.drain();

    let fetched = outer.get("profile");
    assert!(is_reactive(&fetched));
    let plain = outer.get("missing");
    assert!(!is_reactive(&plain));

    // Writing into the nested store batches on the nested store's queue,
    // not the outer one.
    let names = Arc::new(Mutex::new(Vec::new()));
    let names_clone = names.clone();
    let nested = fetched.as_store().unwrap().clone();
    let _sub = nested.subscribe("name", move |value| {
        names_clone.lock().push(value.to_string());
    });

    nested.set("name", "grace");
    // The outer store saw nothing; the write batched on the inner store.
    assert_eq!(outer_queue.drain(), 0);
    inner_queue.drain();
    assert_eq!(*names.lock(), vec!["ada".to_string(), "grace".to_string()]);
}

#[test]
fn store_snapshot_serializes_to_json() {
    let store = Store::new(Value::map([
        ("title", Value::from("weft")),
        ("tags", Value::list(["reactive", "core"])),
    ]))
    .unwrap();

    let json = serde_json::to_string(&Value::Map(Arc::new(store.snapshot()))).unwrap();
    assert_eq!(json, r#"{"title":"weft","tags":["reactive","core"]}"#);
}

// ---------------------------------------------------------------------------
// Reconciler driven through the store
// ---------------------------------------------------------------------------

/// Minimal ordered container standing in for a DOM parent node.
#[derive(Clone, Debug)]
struct Widget {
    id: u64,
    text: Arc<Mutex<String>>,
}

#[derive(Default)]
struct Panel {
    children: Vec<Widget>,
}

impl TargetContainer for Panel {
    type Target = Widget;

    fn first_child(&self) -> Option<Widget> {
        self.children.first().cloned()
    }

    fn next_sibling(&self, target: &Widget) -> Option<Widget> {
        let pos = self.children.iter().position(|w| w.id == target.id)?;
        self.children.get(pos + 1).cloned()
    }

    fn insert_before(&mut self, target: Widget, anchor: Option<&Widget>) {
        self.children.retain(|w| w.id != target.id);
        let pos = anchor
            .and_then(|a| self.children.iter().position(|w| w.id == a.id))
            .unwrap_or(self.children.len());
        self.children.insert(pos, target);
    }

    fn remove(&mut self, target: &Widget) {
        self.children.retain(|w| w.id != target.id);
    }

    fn target_eq(a: &Widget, b: &Widget) -> bool {
        a.id == b.id
    }
}

#[derive(Default)]
struct TodoRenderer {
    next_id: u64,
    updates: Arc<AtomicI32>,
    order_log: Arc<Mutex<Vec<Vec<u64>>>>,
}

impl TodoRenderer {
    fn item(id: &str, text: &str) -> Value {
        Value::map([("id", id), ("text", text)])
    }

    fn field<'a>(item: &'a Value, field: &str) -> &'a str {
        item.as_map()
            .and_then(|map| map.get(field))
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

impl ListRenderer<Panel> for TodoRenderer {
    fn key(&self, item: &Value) -> ListKey {
        Self::field(item, "id").into()
    }

    fn create_target(&mut self, _panel: &mut Panel, _item: &Value) -> Widget {
        self.next_id += 1;
        Widget {
            id: self.next_id,
            text: Arc::new(Mutex::new(String::new())),
        }
    }

    fn update(&mut self, item: &Value, target: &Widget, _index: usize, _first_render: bool) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *target.text.lock() = Self::field(item, "text").to_string();
    }
}

fn panel_texts(panel: &Panel) -> Vec<String> {
    panel.children.iter().map(|w| w.text.lock().clone()).collect()
}

fn panel_ids(panel: &Panel) -> Vec<u64> {
    panel.children.iter().map(|w| w.id).collect()
}

#[test]
fn bound_list_tracks_store_changes_end_to_end() {
    let (store, queue) = store_with_queue(Value::map([(
        "todos",
        Value::list([
            TodoRenderer::item("a", "write tests"),
            TodoRenderer::item("b", "ship it"),
        ]),
    )]));

    let updates = Arc::new(AtomicI32::new(0));
    let renderer = TodoRenderer {
        updates: updates.clone(),
        ..TodoRenderer::default()
    };

    // Keep a window into the panel via a shared probe updated per pass.
    let probe: Arc<Mutex<(Vec<String>, Vec<u64>)>> = Arc::new(Mutex::new((vec![], vec![])));
    let probe_clone = probe.clone();
    let list = KeyedList::new(Panel::default(), renderer).with_view_hook(
        weft_core::FnViewState::new(
            |_: &Panel| {},
            move |panel: &mut Panel| {
                *probe_clone.lock() = (panel_texts(panel), panel_ids(panel));
            },
        ),
    );

    let _binding = bind_list(&store, "todos", list);

    // First render happened synchronously on subscribe.
    assert_eq!(probe.lock().0, vec!["write tests", "ship it"]);
    assert_eq!(updates.load(Ordering::SeqCst), 2);
    let initial_ids = probe.lock().1.clone();

    // Reorder with the same item references: targets move, no updates.
    let current = store.get("todos");
    let items = current.as_list().unwrap();
    store.set("todos", Value::list([items[1].clone(), items[0].clone()]));
    queue.drain();

    assert_eq!(probe.lock().0, vec!["ship it", "write tests"]);
    assert_eq!(probe.lock().1, vec![initial_ids[1], initial_ids[0]]);
    assert_eq!(updates.load(Ordering::SeqCst), 2);

    // Replace one item reference: exactly one update call.
    let current = store.get("todos");
    let items = current.as_list().unwrap();
    store.set(
        "todos",
        Value::list([items[0].clone(), TodoRenderer::item("a", "write more tests")]),
    );
    queue.drain();

    assert_eq!(probe.lock().0, vec!["ship it", "write more tests"]);
    assert_eq!(updates.load(Ordering::SeqCst), 3);
}

#[test]
fn bound_list_survives_duplicate_keys() {
    let (store, queue) = store_with_queue(Value::map([(
        "todos",
        Value::list([
            TodoRenderer::item("a", "one"),
            TodoRenderer::item("a", "two"),
        ]),
    )]));

    let probe: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
    let probe_clone = probe.clone();
    let list = KeyedList::new(Panel::default(), TodoRenderer::default()).with_view_hook(
        weft_core::FnViewState::new(
            |_: &Panel| {},
            move |panel: &mut Panel| *probe_clone.lock() = panel_texts(panel),
        ),
    );
    let _binding = bind_list(&store, "todos", list);

    // Warned, not crashed; the last occurrence won.
    assert_eq!(*probe.lock(), vec!["two"]);

    store.set(
        "todos",
        Value::list([TodoRenderer::item("a", "three")]),
    );
    queue.drain();
    assert_eq!(*probe.lock(), vec!["three"]);
}

#[test]
fn computed_bound_list_rerenders_on_derived_change() {
    let (store, queue) = store_with_queue(Value::map([
        (
            "todos",
            Value::list([
                TodoRenderer::item("a", "keep"),
                TodoRenderer::item("b", "drop"),
            ]),
        ),
        ("filter", Value::from("keep")),
    ]));

    let s = store.clone();
    let filtered = Computed::new(move || {
        let wanted = s.get("filter");
        let wanted = wanted.as_str().unwrap_or("");
        let items: Vec<Value> = s
            .get("todos")
            .as_list()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| TodoRenderer::field(item, "text").contains(wanted))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Value::list(items)
    });

    let probe: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
    let probe_clone = probe.clone();
    let list = KeyedList::new(Panel::default(), TodoRenderer::default()).with_view_hook(
        weft_core::FnViewState::new(
            |_: &Panel| {},
            move |panel: &mut Panel| *probe_clone.lock() = panel_texts(panel),
        ),
    );
    let _binding = bind_computed_list(&filtered, list);

    assert_eq!(*probe.lock(), vec!["keep"]);

    store.set("filter", "drop");
    queue.drain();
    assert_eq!(*probe.lock(), vec!["drop"]);

    store.set("filter", "");
    queue.drain();
    assert_eq!(*probe.lock(), vec!["keep", "drop"]);
}
