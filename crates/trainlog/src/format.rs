//! Event formatters for the console and file sinks.

use crate::markup;
use colored::Colorize;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Field marking an `ERROR` event as critical.
pub const CRITICAL_FIELD: &str = "critical";

/// Collects the message and the remaining fields of an event.
#[derive(Default)]
struct EventFields {
    message: String,
    critical: bool,
    extra: String,
}

impl EventFields {
    fn collect(event: &Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }
}

impl Visit for EventFields {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == CRITICAL_FIELD {
            self.critical = value;
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{:?}", value);
            }
            // metadata attached to records bridged from the `log` crate
            name if name.starts_with("log.") => {}
            name => {
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }
}

/// File sink format: the message only, one line per record.
#[derive(Clone, Copy, Debug)]
pub struct PlainFormat {
    strip_markup: bool,
}

impl PlainFormat {
    pub fn new(strip_markup: bool) -> Self {
        Self { strip_markup }
    }
}

impl<S, N> FormatEvent<S, N> for PlainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let fields = EventFields::collect(event);
        let message = if self.strip_markup {
            markup::strip(&fields.message)
        } else {
            fields.message.as_str().into()
        };
        writeln!(writer, "{}{}", message, fields.extra)
    }
}

/// Console sink format: optional time/level/target prefixes and a message
/// with markup rendered (or stripped when the writer has no ANSI support).
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleFormat {
    pub show_time: bool,
    pub show_level: bool,
    pub show_target: bool,
    pub markup: bool,
}

fn level_label(level: &Level, critical: bool, ansi: bool) -> String {
    if critical && *level == Level::ERROR {
        let padded = format!("{:<8}", "CRITICAL");
        return if ansi { padded.red().bold().to_string() } else { padded };
    }
    let padded = format!("{:<8}", level.as_str());
    if !ansi {
        return padded;
    }
    match *level {
        Level::ERROR => padded.red().to_string(),
        Level::WARN => padded.yellow().to_string(),
        Level::INFO => padded.green().to_string(),
        Level::DEBUG => padded.blue().to_string(),
        Level::TRACE => padded.purple().to_string(),
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();
        let fields = EventFields::collect(event);
        let meta = event.metadata();

        if self.show_time {
            let now = chrono::Local::now().format("[%X]").to_string();
            if ansi {
                write!(writer, "{} ", now.dimmed())?;
            } else {
                write!(writer, "{} ", now)?;
            }
        }
        if self.show_level {
            write!(writer, "{} ", level_label(meta.level(), fields.critical, ansi))?;
        }

        let message = match (self.markup, ansi) {
            (true, true) => markup::render(&fields.message),
            (true, false) => markup::strip(&fields.message).into_owned(),
            (false, _) => fields.message,
        };
        write!(writer, "{}{}", message, fields.extra)?;

        if self.show_target {
            write!(writer, " ({})", meta.target())?;
        }
        writeln!(writer)
    }
}
