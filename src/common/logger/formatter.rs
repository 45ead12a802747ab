use core::fmt as core_fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields},
    },
    registry::LookupSpan,
};

/// Resident set size of this process, read from procfs. Zero elsewhere.
pub fn get_ram_usage() -> String {
    let rss_kb = std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    if rss_kb < 1024.0 {
        format!("{:.2} KB", rss_kb)
    } else if rss_kb < 1024.0 * 1024.0 {
        format!("{:.2} MB", rss_kb / 1024.0)
    } else {
        format!("{:.2} GB", rss_kb / (1024.0 * 1024.0))
    }
}

/// Numeric part of the current thread's id, e.g. `7` for `ThreadId(7)`.
fn thread_number() -> String {
    format!("{:?}", std::thread::current().id())
        .trim_start_matches("ThreadId(")
        .trim_end_matches(')')
        .to_string()
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// `[rss] [timestamp] LEVEL tid target:line > message`
pub struct CustomFormatter {
    use_ansi: bool,
}

impl CustomFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }
}

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let (reset, bold, dim) = if self.use_ansi {
            ("\x1b[0m", "\x1b[1m", "\x1b[2m")
        } else {
            ("", "", "")
        };

        let format = time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        );
        let timestamp = time::OffsetDateTime::now_local()
            .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
            .format(&format)
            .unwrap_or_else(|_| "Unknown Time".to_string());

        write!(writer, "{}[{}] [{}]{} ", dim, get_ram_usage(), timestamp, reset)?;

        let metadata = event.metadata();
        let level = metadata.level();
        if self.use_ansi {
            write!(writer, "{}{}{: <5}{} ", level_color(level), bold, level.as_str(), reset)?;
        } else {
            write!(writer, "{: <5} ", level.as_str())?;
        }

        write!(writer, "{}t{}{} ", dim, thread_number(), reset)?;

        let line = metadata
            .line()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "??".to_string());
        write!(writer, "{}{}:{}{} > ", dim, metadata.target(), line, reset)?;

        ctx.format_fields(writer.by_ref(), event)?;
        write!(writer, "{}", reset)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_number_is_numeric() {
        let id = thread_number();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_digit()), "{}", id);
    }
}
