use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer, Registry};

use crate::config::CONFIG;
use crate::utils::timing::TIMING_TARGET;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Which events a sink receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogStream {
    /// Everything except timing lines, at the configured level.
    General,
    /// Only the timing target.
    Timing,
}

impl LogStream {
    fn targets(self, level: LevelFilter) -> Targets {
        match self {
            LogStream::General => Targets::new()
                .with_default(level)
                .with_target(TIMING_TARGET, LevelFilter::OFF)
                .with_target("hyper", LevelFilter::WARN)
                .with_target("hyper_util", LevelFilter::WARN)
                .with_target("reqwest", LevelFilter::WARN),
            LogStream::Timing => Targets::new()
                .with_default(LevelFilter::OFF)
                .with_target(TIMING_TARGET, LevelFilter::INFO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// One daily-rolled file under the logs directory.
#[derive(Debug, Clone, Copy)]
struct LogSink {
    file_name: &'static str,
    stream: LogStream,
    format: LogFormat,
}

const LOG_SINKS: [LogSink; 4] = [
    LogSink {
        file_name: "insight.log",
        stream: LogStream::General,
        format: LogFormat::Text,
    },
    LogSink {
        file_name: "timing.log",
        stream: LogStream::Timing,
        format: LogFormat::Text,
    },
    LogSink {
        file_name: "insight.jsonl",
        stream: LogStream::General,
        format: LogFormat::Json,
    },
    LogSink {
        file_name: "timing.jsonl",
        stream: LogStream::Timing,
        format: LogFormat::Json,
    },
];

pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

impl LogSink {
    fn open(&self, logs_dir: &Path, level: LevelFilter) -> (BoxedLayer, WorkerGuard) {
        let appender = tracing_appender::rolling::daily(logs_dir, self.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let filter = self.stream.targets(level);
        let layer = match self.format {
            LogFormat::Text => fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        };
        (layer, guard)
    }
}

/// Installs stdout plus every file in [`LOG_SINKS`]. Request and model
/// timings go to their own files only. Keep the guards alive for the life of
/// the process or buffered lines are lost.
pub fn init_logging() -> LoggingGuards {
    let logs_dir: &Path = &CONFIG.logs_dir;
    if let Err(err) = fs::create_dir_all(logs_dir) {
        eprintln!("Failed to create logs directory {}: {err}", logs_dir.display());
    }
    let level = parse_log_level(&CONFIG.log_level);

    let mut layers: Vec<BoxedLayer> = vec![fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(LogStream::General.targets(level))
        .boxed()];
    let mut guards = Vec::with_capacity(LOG_SINKS.len());
    for sink in &LOG_SINKS {
        let (layer, guard) = sink.open(logs_dir, level);
        layers.push(layer);
        guards.push(guard);
    }

    tracing_subscriber::registry().with(layers).init();
    LoggingGuards { _guards: guards }
}
