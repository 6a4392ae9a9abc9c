//! Basic Example - Render a static page into the terminal host
//!
//! Builds a small tree with a function component and a stateful component,
//! drives the renderer one frame-sized slice at a time, then paints the
//! result with colors and attributes.
//!
//! Run with: RUST_LOG=spark_fiber=trace cargo run --example basic

use std::io;
use std::rc::Rc;

use spark_fiber::prelude::*;

fn badge(props: &Props) -> anyhow::Result<Vec<Element>> {
    let label = props.str("label").unwrap_or("?");
    Ok(vec![h("span").attr("color", "cyan").attr("bold", true).child(label).build()])
}

struct Stats;

impl Component for Stats {
    fn create(_props: &Props) -> Self {
        Stats
    }

    fn initial_state(&self) -> State {
        state(json!({ "fibers": "incremental", "commits": "atomic" }))
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        Ok(vec![
            h("ul")
                .children(
                    cx.state()
                        .iter()
                        .map(|(key, value)| h("li").child(format!("{key}: {}", value.as_str().unwrap_or_default()))),
                )
                .build(),
        ])
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let scheduler = Rc::new(ManualScheduler::new());
    let mut host = TerminalHost::new();
    let screen = host.create_container();
    let mut renderer = Renderer::new(host, scheduler.clone());

    renderer.render(
        h("section")
            .child(h("h1").attr("underline", true).child("spark-fiber"))
            .child(h("p").child("A retained tree, reconciled in slices."))
            .child(function("badge", badge).attr("label", "demo"))
            .child(component::<Stats>()),
        &screen,
    );

    let mut commits = 0;
    while scheduler.take_request() {
        let deadline = IdleDeadline::for_frame(renderer.config());
        if let Some(report) = renderer.perform_work(&deadline)? {
            commits += 1;
            log::info!(
                "committed {} effects after {} units in {} slice(s)",
                report.effects.len(),
                report.units_of_work,
                report.slices
            );
        }
    }

    renderer.host().paint(screen, &mut io::stdout())?;
    println!("commits: {commits}");
    Ok(())
}
