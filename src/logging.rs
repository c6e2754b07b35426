use slog::{o, Discard, Drain, Logger};

/// Asynchronous logger writing to the terminal.
#[must_use]
pub fn terminal() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

/// Logger which drops every record.
#[must_use]
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}
