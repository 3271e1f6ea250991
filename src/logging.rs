use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, flashcard_id = $id:expr) => {
        tracing::debug!(
            operation = $operation,
            flashcard_id = %$id,
            "API operation started"
        );
    };
    ($operation:expr, category = $category:expr) => {
        tracing::debug!(
            operation = $operation,
            category = %$category,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, flashcard_id = $id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            flashcard_id = %$id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::debug!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, flashcard_id = $id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            flashcard_id = %$id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Database Operation Logging Macros
// ============================================================================

/// Log database operation performance and results
#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            result_count = $count,
            duration_ms = $duration,
            "Database operation completed"
        );
    };
    (debug, $operation:expr, flashcard_id = $id:expr, retries = $retries:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            flashcard_id = %$id,
            retries = $retries,
            "Database write retried after a concurrent change"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "database",
            operation = $operation,
            "Database operation: {}", $msg
        );
    };
}

// ============================================================================
// Study Session Logging Macros
// ============================================================================

/// Log client-side session transitions and background failures
#[macro_export]
macro_rules! log_session_event {
    (transition, $event:expr, cursor = $cursor:expr, total = $total:expr) => {
        tracing::debug!(
            component = "session",
            event = $event,
            cursor = $cursor,
            total = $total,
            "Study session transition"
        );
    };
    (reconcile, $event:expr, flashcard_id = $id:expr, applied = $applied:expr) => {
        tracing::debug!(
            component = "session",
            event = $event,
            flashcard_id = %$id,
            applied = $applied,
            "Working set reconciled"
        );
    };
    (background_failure, $event:expr, flashcard_id = $id:expr, error = $error:expr) => {
        tracing::warn!(
            component = "session",
            event = $event,
            flashcard_id = %$id,
            error = %$error,
            "Background request failed"
        );
    };
    (background_failure, $event:expr, error = $error:expr) => {
        tracing::error!(
            component = "session",
            event = $event,
            error = %$error,
            "Background task did not finish"
        );
    };
    (warn, $event:expr, error = $error:expr) => {
        tracing::warn!(
            component = "session",
            event = $event,
            error = %$error,
            "Session warning"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

/// Install the global subscriber: console output and a daily-rotated file,
/// each switchable from configuration. The returned guard must be held for
/// the life of the process or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig, file_name: &str) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .boxed()
    });

    let mut guard = None;
    let file_layer = if config.file_enabled {
        if let Err(e) = std::fs::create_dir_all(&config.log_directory) {
            eprintln!("Warning: Could not create logs directory: {}", e);
        }
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, file_name);
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        // No ANSI colors for files
        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking_file)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
