//! Todo Example - Interactive list driven by terminal key events
//!
//! Demonstrates:
//! - Stateful components merging partial state from listeners
//! - Host events dispatched from crossterm input
//! - A ticking timer component updating independently
//! - Frame-budgeted work slices between input polls
//!
//! Keys: type to edit, Enter adds, Backspace edits, Delete drops the oldest
//! item, Esc quits.
//!
//! Run with: cargo run --example todo

use std::io::{self, Write, stdout};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEventKind, poll, read};
use crossterm::execute;
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use spark_fiber::prelude::*;
use spark_fiber::NodeId;

// =============================================================================
// Components
// =============================================================================

struct App;

impl App {
    fn items(state: &State) -> Vec<String> {
        state
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Component for App {
    fn create(_props: &Props) -> Self {
        App
    }

    fn initial_state(&self) -> State {
        state(json!({ "items": ["try spark-fiber"], "draft": "" }))
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        let items = Self::items(cx.state());
        let draft = cx.state()["draft"].as_str().unwrap_or_default().to_string();
        let count = items.len();

        let on_key = {
            let updater = cx.updater().clone();
            let items = items.clone();
            let draft = draft.clone();
            move |event: &Event| match event.value_str() {
                Some("Enter") if !draft.trim().is_empty() => {
                    let mut items = items.clone();
                    items.push(draft.trim().to_string());
                    updater.set_state(json!({ "items": items, "draft": "" }));
                }
                Some("Backspace") => {
                    let mut draft = draft.clone();
                    draft.pop();
                    updater.set_state(json!({ "draft": draft }));
                }
                Some("Delete") if !items.is_empty() => {
                    updater.set_state(json!({ "items": items[1..] }));
                }
                Some(key) if key.chars().count() == 1 => {
                    updater.set_state(json!({ "draft": format!("{draft}{key}") }));
                }
                _ => {}
            }
        };

        Ok(vec![
            h("section")
                .child(h("h1").attr("bold", true).attr("color", "green").child("Todos"))
                .child(h("ul").children(items.iter().map(|item| h("li").child(item))))
                .child(
                    h("div")
                        .child(h("input").attr("value", draft).on("key", on_key))
                        .child(h("span").attr("dim", true).child(format!(" {count} item(s)"))),
                )
                .child(component::<Timer>())
                .build(),
        ])
    }

    fn did_mount(&mut self, _cx: &Context<'_>) {
        log::info!("todo app mounted");
    }
}

/// Counts seconds; the event loop delivers `tick` events to its node.
struct Timer;

impl Component for Timer {
    fn create(_props: &Props) -> Self {
        Timer
    }

    fn initial_state(&self) -> State {
        state(json!({ "seconds": 0 }))
    }

    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
        let seconds = cx.state()["seconds"].as_i64().unwrap_or_default();
        let updater = cx.updater().clone();
        Ok(vec![
            h("footer")
                .attr("italic", true)
                .on("tick", move |_| updater.set_state(json!({ "seconds": seconds + 1 })))
                .child(format!("up {seconds}s, esc quits"))
                .build(),
        ])
    }
}

// =============================================================================
// Terminal
// =============================================================================

/// Restores the terminal however `main` exits.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

fn key_name(code: KeyCode) -> Option<String> {
    match code {
        KeyCode::Char(c) => Some(c.to_string()),
        KeyCode::Enter => Some("Enter".into()),
        KeyCode::Backspace => Some("Backspace".into()),
        KeyCode::Delete => Some("Delete".into()),
        _ => None,
    }
}

fn send(renderer: &Renderer<TerminalHost>, screen: NodeId, tag: &str, event: &Event) {
    for node in renderer.host().tree().find_by_tag(screen, tag) {
        renderer.host().dispatch(node, event);
    }
}

fn redraw(renderer: &Renderer<TerminalHost>, screen: NodeId) -> io::Result<()> {
    let mut out = stdout();
    execute!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    renderer.host().paint(screen, &mut out)?;
    out.flush()
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let scheduler = Rc::new(ManualScheduler::new());
    let mut host = TerminalHost::new();
    let screen = host.create_container();
    let mut renderer = Renderer::with_config(
        host,
        scheduler.clone(),
        RendererConfig::default().with_frame_budget(Duration::from_millis(8)),
    );
    renderer.render(component::<App>(), &screen);

    let _guard = TerminalGuard::enter()?;
    let mut last_tick = Instant::now();

    loop {
        let mut dirty = false;
        while scheduler.take_request() {
            let deadline = IdleDeadline::for_frame(renderer.config());
            dirty |= renderer.perform_work(&deadline)?.is_some();
        }
        if dirty {
            redraw(&renderer, screen)?;
        }

        if last_tick.elapsed() >= Duration::from_secs(1) {
            last_tick = Instant::now();
            send(&renderer, screen, "footer", &Event::new("tick"));
        }

        if !poll(Duration::from_millis(50))? {
            continue;
        }
        if let CrosstermEvent::Key(key) = read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Esc {
                break;
            }
            if let Some(name) = key_name(key.code) {
                send(&renderer, screen, "input", &Event::with_value("key", name));
            }
        }
    }

    Ok(())
}
