//! End-to-end rendering scenarios against the in-memory host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_fiber::prelude::*;
use spark_fiber::{
    EffectTag, HostOp, HostSnapshot, LISTENER_PREFIX, NodeId, StepDeadline, Unbounded,
};

// =============================================================================
// Helpers
// =============================================================================

fn setup() -> (Renderer<MemoryHost>, Rc<ManualScheduler>, NodeId) {
    let scheduler = Rc::new(ManualScheduler::new());
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    (Renderer::new(host, scheduler.clone()), scheduler, container)
}

fn element(tag: &str, children: Vec<HostSnapshot>) -> HostSnapshot {
    HostSnapshot::Element {
        tag: tag.to_string(),
        properties: Default::default(),
        listeners: Vec::new(),
        children,
    }
}

fn text_node(value: &str) -> HostSnapshot {
    HostSnapshot::Text(value.to_string())
}

thread_local! {
    static UPDATER: RefCell<Option<Updater>> = const { RefCell::new(None) };
    static GREETS: Cell<usize> = const { Cell::new(0) };
}

fn stored_updater() -> Updater {
    UPDATER.with(|slot| slot.borrow().clone()).expect("component mounted")
}

/// Renders `<div>{count}</div>` and hands its updater to the test.
struct Counter;

impl Component for Counter {
    fn create(_props: &Props) -> Self {
        Counter
    }

    fn initial_state(&self) -> State {
        state(json!({ "count": 0 }))
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        let count = cx.state()["count"].as_i64().unwrap_or_default();
        Ok(vec![h("div").child(count).build()])
    }

    fn did_mount(&mut self, cx: &Context<'_>) {
        UPDATER.with(|slot| *slot.borrow_mut() = Some(cx.updater().clone()));
    }
}

/// Renders every state key as `key=value`, sorted.
struct Pairs;

impl Component for Pairs {
    fn create(_props: &Props) -> Self {
        Pairs
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        let line: Vec<String> = cx.state().iter().map(|(k, v)| format!("{k}={v}")).collect();
        Ok(vec![h("p").child(line.join(",")).build()])
    }

    fn did_mount(&mut self, cx: &Context<'_>) {
        UPDATER.with(|slot| *slot.borrow_mut() = Some(cx.updater().clone()));
    }
}

/// Button that increments its own count when clicked.
struct ClickCounter;

impl Component for ClickCounter {
    fn create(_props: &Props) -> Self {
        ClickCounter
    }

    fn initial_state(&self) -> State {
        state(json!({ "clicks": 0 }))
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        let clicks = cx.state()["clicks"].as_i64().unwrap_or_default();
        let updater = cx.updater().clone();
        Ok(vec![
            h("button")
                .on("click", move |_| updater.set_state(json!({ "clicks": clicks + 1 })))
                .child(format!("clicked {clicks}"))
                .build(),
        ])
    }
}

fn greeting(props: &Props) -> anyhow::Result<Vec<Element>> {
    GREETS.with(|n| n.set(n.get() + 1));
    let name = props.str("name").unwrap_or("nobody");
    Ok(vec![h("span").child(format!("hello {name}")).build()])
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_initial_render_builds_nested_tree() {
    let (mut renderer, _, container) = setup();
    renderer.render(h("div").child(h("span").child("hi")), &container);
    renderer.run_until_idle().unwrap();

    assert_eq!(
        renderer.host().snapshot_children(container),
        vec![element("div", vec![element("span", vec![text_node("hi")])])]
    );
}

#[test]
fn test_state_merge_updates_in_place() {
    let (mut renderer, _, container) = setup();
    renderer.render(component::<Counter>(), &container);
    renderer.run_until_idle().unwrap();
    assert_eq!(renderer.host().text_content(container), "0");
    renderer.host_mut().clear_ops();

    stored_updater().set_state(json!({ "count": 1 }));
    let report = renderer.run_until_idle().unwrap().remove(0);

    assert_eq!(report.count(EffectTag::Insert), 0);
    assert_eq!(report.count(EffectTag::Delete), 0);
    assert!(report.names(EffectTag::Update).contains(&"div"));
    assert_eq!(renderer.host().text_content(container), "1");

    let ops = renderer.host().ops();
    assert!(!ops.is_empty());
    assert!(ops.iter().all(HostOp::is_configuration));
}

#[test]
fn test_type_change_deletes_then_inserts() {
    let (mut renderer, _, container) = setup();
    renderer.render_children(vec![h("a").build(), h("b").build(), h("c").build()], &container);
    renderer.run_until_idle().unwrap();

    renderer.render_children(vec![h("a").build(), h("d").build()], &container);
    let report = renderer.run_until_idle().unwrap().remove(0);

    let effects: Vec<(EffectTag, &str)> = report
        .effects
        .iter()
        .map(|record| (record.effect, record.name.as_str()))
        .collect();
    assert_eq!(
        effects,
        vec![
            (EffectTag::Delete, "b"),
            (EffectTag::Delete, "c"),
            (EffectTag::Update, "a"),
            (EffectTag::Insert, "d"),
        ]
    );
    assert_eq!(
        renderer.host().snapshot_children(container),
        vec![element("a", vec![]), element("d", vec![])]
    );
}

fn app(label: &str) -> Element {
    h("div")
        .attr("id", "app")
        .child(h("h1").child(label))
        .child(component::<Counter>())
        .child(function("greeting", greeting).attr("name", label))
        .child(h("ul").children(["x", "y", "z"].iter().map(|item| h("li").child(*item))))
        .build()
}

fn run_sliced(renderer: &mut Renderer<MemoryHost>) -> CommitReport {
    loop {
        if let Some(report) = renderer.perform_work(&StepDeadline::new(1)).unwrap() {
            return report;
        }
        assert!(renderer.has_pass_in_flight());
    }
}

#[test]
fn test_interrupted_pass_matches_uninterrupted() {
    let (mut sliced, _, sliced_root) = setup();
    let (mut whole, _, whole_root) = setup();

    sliced.render(app("first"), &sliced_root);
    whole.render(app("first"), &whole_root);

    // Nothing is attached until the final slice commits.
    assert!(sliced.perform_work(&StepDeadline::new(1)).unwrap().is_none());
    assert!(sliced.host().children(sliced_root).is_empty());

    let sliced_report = run_sliced(&mut sliced);
    let whole_report = whole.perform_work(&Unbounded).unwrap().unwrap();

    assert_eq!(sliced_report.effects, whole_report.effects);
    assert_eq!(sliced_report.units_of_work, whole_report.units_of_work);
    assert_eq!(sliced_report.slices, sliced_report.units_of_work);
    assert_eq!(whole_report.slices, 1);
    assert_eq!(
        sliced.host().snapshot_children(sliced_root),
        whole.host().snapshot_children(whole_root)
    );

    // Same for an update pass.
    sliced.render(app("second"), &sliced_root);
    whole.render(app("second"), &whole_root);
    let sliced_report = run_sliced(&mut sliced);
    let whole_report = whole.perform_work(&Unbounded).unwrap().unwrap();

    assert_eq!(sliced_report.effects, whole_report.effects);
    assert_eq!(
        sliced.host().snapshot_children(sliced_root),
        whole.host().snapshot_children(whole_root)
    );
}

#[test]
fn test_scheduler_drives_to_completion() {
    let (mut renderer, scheduler, container) = setup();
    renderer.render(app("scheduled"), &container);

    let mut callbacks = 0;
    while scheduler.take_request() {
        callbacks += 1;
        renderer.perform_work(&StepDeadline::new(3)).unwrap();
    }

    assert!(callbacks > 1);
    assert!(renderer.is_idle());
    assert_eq!(renderer.host().text_content(container), "scheduled0hello scheduledxyz");
}

#[test]
fn test_recommit_is_idempotent() {
    let (mut renderer, _, container) = setup();
    let page = h("main")
        .attr("class", "page")
        .child(h("input").attr("value", "abc").on("input", |_| {}))
        .child(h("p").attr("title", "t").child("body"))
        .build();

    renderer.render(page.clone(), &container);
    renderer.run_until_idle().unwrap();
    renderer.host_mut().clear_ops();

    renderer.render(page, &container);
    let report = renderer.run_until_idle().unwrap().remove(0);

    assert!(report.effects.iter().all(|record| record.effect == EffectTag::Update));
    assert!(renderer.host().ops().is_empty());
}

#[test]
fn test_rebuilt_leaves_with_equal_values_are_untouched() {
    let (mut renderer, _, container) = setup();
    let on_input: Listener = Rc::new(|_| {});
    let form = || {
        h("form")
            .child(h("input").attr("value", "abc").listener("onInput", on_input.clone()))
            .child(h("hr").attr("class", "sep"))
            .child(h("label").child("Name"))
            .build()
    };

    renderer.render(form(), &container);
    renderer.run_until_idle().unwrap();
    renderer.host_mut().clear_ops();

    renderer.render(form(), &container);
    renderer.run_until_idle().unwrap();
    assert!(renderer.host().ops().is_empty());
}

#[test]
fn test_state_merges_are_monotonic() {
    let (mut renderer, _, container) = setup();
    renderer.render(component::<Pairs>(), &container);
    renderer.run_until_idle().unwrap();

    let updater = stored_updater();
    updater.set_state(json!({ "a": 1, "b": 1 }));
    updater.set_state(json!({ "b": 2 }));
    renderer.run_until_idle().unwrap();

    assert_eq!(renderer.host().text_content(container), "a=1,b=2");
}

#[test]
fn test_listener_schedules_update() {
    let (mut renderer, _, container) = setup();
    renderer.render(component::<ClickCounter>(), &container);
    renderer.run_until_idle().unwrap();

    let button = renderer.host().find_by_tag(container, "button")[0];
    assert_eq!(renderer.host().dispatch(button, &Event::new("click")), 1);
    renderer.run_until_idle().unwrap();
    assert_eq!(renderer.host().text_content(container), "clicked 1");

    // The listener was swapped for the one closing over the new count.
    let button = renderer.host().find_by_tag(container, "button")[0];
    assert_eq!(renderer.host().listener_count(button, "click"), 1);
    renderer.host().dispatch(button, &Event::new("click"));
    renderer.run_until_idle().unwrap();
    assert_eq!(renderer.host().text_content(container), "clicked 2");
}

#[test]
fn test_builder_and_explicit_listener_keys_both_attach() {
    let hits = Rc::new(Cell::new(0));
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let config = RendererConfig::default()
        .with_min_time_remaining(Duration::ZERO)
        .with_frame_budget(Duration::from_millis(4));
    let mut renderer = Renderer::with_config(host, Rc::new(ManualScheduler::new()), config);

    let on_click = hits.clone();
    let on_key: Listener = {
        let hits = hits.clone();
        Rc::new(move |_| hits.set(hits.get() + 10))
    };
    renderer.render(
        h("button")
            .on("click", move |_| on_click.set(on_click.get() + 1))
            .listener(format!("{LISTENER_PREFIX}KeyDown"), on_key),
        &container,
    );
    renderer.run_until_idle().unwrap();

    let button = renderer.host().find_by_tag(container, "button")[0];
    assert_eq!(renderer.host().listener_count(button, "click"), 1);
    assert_eq!(renderer.host().listener_count(button, "keydown"), 1);
    assert_eq!(renderer.host().dispatch(button, &Event::new("click")), 1);
    assert_eq!(renderer.host().dispatch(button, &Event::new("keydown")), 1);
    assert_eq!(hits.get(), 11);
    assert!(renderer.host().property(button, "onClick").is_none());
}

#[test]
fn test_function_component_bails_out_on_same_props() {
    GREETS.with(|n| n.set(0));
    let (mut renderer, _, container) = setup();
    let greet = function("greeting", greeting).attr("name", "ada").build();

    renderer.render(h("div").child(greet.clone()), &container);
    renderer.run_until_idle().unwrap();
    renderer.render(h("div").child(greet), &container);
    renderer.run_until_idle().unwrap();
    assert_eq!(GREETS.with(Cell::get), 1);

    renderer.render(h("div").child(function("greeting", greeting).attr("name", "bob")), &container);
    renderer.run_until_idle().unwrap();
    assert_eq!(GREETS.with(Cell::get), 2);
    assert_eq!(renderer.host().text_content(container), "hello bob");
}

#[test]
fn test_unmount_clears_container_and_drops_stale_updates() {
    let (mut renderer, _, container) = setup();
    renderer.render(component::<Counter>(), &container);
    renderer.run_until_idle().unwrap();
    let updater = stored_updater();

    renderer.unmount(&container);
    renderer.run_until_idle().unwrap();
    assert!(renderer.host().children(container).is_empty());
    assert_eq!(renderer.instance_count(), 0);

    updater.set_state(json!({ "count": 5 }));
    let reports = renderer.run_until_idle().unwrap();
    assert!(reports.is_empty());
    assert!(renderer.is_idle());
}

#[test]
fn test_replaced_nodes_are_recycled() {
    let (mut renderer, _, container) = setup();
    for round in 0..10usize {
        let tag = if round % 2 == 0 { "a" } else { "b" };
        renderer.render(h(tag).child(round), &container);
        renderer.run_until_idle().unwrap();
        assert_eq!(renderer.host().node_count(), 3);
        assert!(renderer.host().capacity() <= 5);
    }
    assert_eq!(renderer.host().text_content(container), "9");

    renderer.unmount(&container);
    renderer.run_until_idle().unwrap();
    assert_eq!(renderer.host().node_count(), 1);
}

#[test]
fn test_roots_are_independent() {
    let (mut renderer, _, left) = setup();
    let right = renderer.host_mut().create_container("right");

    renderer.render(h("p").child("left"), &left);
    renderer.render(h("p").child("right"), &right);
    let reports = renderer.run_until_idle().unwrap();
    assert_eq!(reports.len(), 2);
    assert_ne!(reports[0].root, reports[1].root);

    renderer.unmount(&left);
    renderer.run_until_idle().unwrap();
    assert_eq!(renderer.host().text_content(left), "");
    assert_eq!(renderer.host().text_content(right), "right");
}
