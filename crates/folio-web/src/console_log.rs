#![forbid(unsafe_code)]

//! Tracing layer that writes one line per event to the browser console.
//!
//! Lines read `LEVEL target: message key=value ...`. The browser stamps its
//! own time, so none is printed. On wasm the sink is [`BrowserConsole`],
//! which maps each level to the matching `console.*` method; tests plug in a
//! capturing sink instead.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Fallback directive when the configured filter does not parse.
pub const DEFAULT_FILTER: &str = "warn";

/// Destination for formatted log lines.
pub trait ConsoleSink: Send + Sync + 'static {
    fn write_line(&self, level: Level, line: &str);
}

/// `console.error` / `warn` / `info` / `debug` / `log`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConsole;

impl ConsoleSink for BrowserConsole {
    #[cfg(target_arch = "wasm32")]
    fn write_line(&self, level: Level, line: &str) {
        use wasm_bindgen::JsValue;
        use web_sys::console;

        let line = JsValue::from_str(line);
        match level {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::info_1(&line),
            Level::DEBUG => console::debug_1(&line),
            Level::TRACE => console::log_1(&line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write_line(&self, _level: Level, line: &str) {
        eprintln!("{line}");
    }
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl EventVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_owned(), value));
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}

/// Tracing layer formatting events for a [`ConsoleSink`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleLayer<W> {
    sink: W,
    show_target: bool,
}

impl<W: ConsoleSink> ConsoleLayer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            show_target: true,
        }
    }

    /// Builder: set whether to print the event target (module path).
    #[must_use]
    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    fn format(&self, event: &Event<'_>) -> String {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = String::new();
        let _ = write!(line, "{:<5}", metadata.level().as_str());
        if self.show_target {
            let _ = write!(line, " {}:", metadata.target());
        }
        if let Some(message) = visitor.message {
            line.push(' ');
            line.push_str(&message);
        }
        for (key, value) in &visitor.fields {
            let _ = write!(line, " {key}={value}");
        }
        line
    }
}

impl<S, W> Layer<S> for ConsoleLayer<W>
where
    S: Subscriber,
    W: ConsoleSink,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.sink.write_line(*event.metadata().level(), &self.format(event));
    }
}

/// Parse `directive`, falling back to [`DEFAULT_FILTER`] when it is invalid.
pub fn filter_from(directive: &str) -> (EnvFilter, bool) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_FILTER), false),
    }
}

/// Install the global subscriber writing to the browser console.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init(directive: &str) {
    let (filter, valid) = filter_from(directive);
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(ConsoleLayer::new(BrowserConsole))
        .try_init()
        .is_ok();
    if installed && !valid {
        tracing::warn!(directive, "invalid log filter; using {DEFAULT_FILTER}");
    }
}
