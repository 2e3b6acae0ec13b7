//! Minimal counter wiring: one store, one provider, two connected views.
//!
//! The count view renders only when the count moves, the header view renders
//! on any visible change, and a batched round collapses three dispatches
//! into a single repaint of each.
//!
//! Run with: cargo run -p statewire --example counter

use statewire::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct AppState {
    count: i64,
    label: String,
}

enum Action {
    Add(i64),
    Rename(String),
}

type AppStore = MemoryStore<AppState, Action>;

fn app_store() -> AppStore {
    MemoryStore::new(
        AppState {
            count: 0,
            label: "counter".to_owned(),
        },
        |state, action| match action {
            Action::Add(0) => None,
            Action::Add(delta) => Some(AppState {
                count: state.count + delta,
                ..state.clone()
            }),
            Action::Rename(label) => Some(AppState {
                label: label.clone(),
                ..state.clone()
            }),
        },
    )
}

struct CountLine;

impl View for CountLine {
    type Props = i64;

    fn render(&mut self, props: &i64) {
        println!("count  -> {props}");
    }
}

struct HeaderLine;

impl View for HeaderLine {
    type Props = String;

    fn render(&mut self, props: &String) {
        println!("header -> {props}");
    }
}

fn main() -> BindResult<()> {
    let provider = Provider::new(app_store());
    provider.mount()?;

    let count = connect(|state: &AppState, _props: &(), _store: &AppStore| state.count)
        .wrap(CountLine, ())?;
    count.mount()?;

    let header = connect(|state: &AppState, _props: &(), _store: &AppStore| {
        format!("{} #{}", state.label, state.count)
    })
    .wrap(HeaderLine, ())?;
    header.mount()?;

    println!("-- three dispatches --");
    provider.store().dispatch(Action::Add(1));
    provider.store().dispatch(Action::Add(1));
    provider.store().dispatch(Action::Rename("clicks".to_owned()));

    println!("-- one batched round --");
    batch(|| {
        provider.store().dispatch(Action::Add(10));
        provider.store().dispatch(Action::Add(-3));
        provider.store().dispatch(Action::Rename("total".to_owned()));
    });

    println!("-- store swap --");
    provider.set_store(app_store());

    Ok(())
}
