use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

type LogHook = Arc<dyn Fn(&LogRecord) + Send + Sync>;

static LOG_HOOK: OnceCell<LogHook> = OnceCell::new();

pub struct LoggingGuard {
    _guard: Option<DefaultGuard>,
}

#[derive(Clone, Debug)]
pub struct LoggingOptions {
    /// Filter used when neither `RUST_LOG` nor `NUMBRIDGE_LOG` is set.
    pub default_filter: String,
    /// Also write human-readable lines to stderr.
    pub stderr: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            stderr: false,
        }
    }
}

/// Install a callback that receives every log record. Only the first call wins.
pub fn set_log_hook<F>(hook: F)
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    let _ = LOG_HOOK.set(Arc::new(hook));
}

pub fn init_logging(opts: LoggingOptions) -> LoggingGuard {
    // Route log:: macros from the library crates into tracing
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("NUMBRIDGE_LOG"))
        .or_else(|_| EnvFilter::try_new(&opts.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let build_subscriber = || {
        let stderr_layer = opts.stderr.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
        });
        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(LogBridgeLayer)
            .with(stderr_layer)
    };

    let guard = match tracing::subscriber::set_global_default(build_subscriber()) {
        Ok(()) => None,
        Err(_) => Some(tracing::subscriber::set_default(build_subscriber())),
    };

    LoggingGuard { _guard: guard }
}

/// Run `f` inside a span describing one native call.
pub fn with_call_span<T>(library: &str, function: &str, f: impl FnOnce() -> T) -> T {
    let span = tracing::debug_span!("native_call", library = %library, function = %function);
    let _enter = span.enter();
    f()
}

struct LogBridgeLayer;

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let Some(hook) = LOG_HOOK.get() else {
            return;
        };

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        // tracing-log carries the original log target in a `log.target` field
        let target = visitor
            .log_target
            .take()
            .unwrap_or_else(|| event.metadata().target().to_string());

        let record = LogRecord {
            ts: now_rfc3339(),
            level: event.metadata().level().to_string(),
            target,
            message: visitor
                .message
                .unwrap_or_else(|| event.metadata().name().to_string()),
            span_id: current_span_id(),
            fields: visitor
                .fields
                .filter(|obj| obj.as_object().map(|m| !m.is_empty()).unwrap_or(false)),
        };

        hook(&record);
    }
}

fn current_span_id() -> Option<String> {
    tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string())
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    log_target: Option<String>,
    fields: Option<JsonValue>,
}

impl JsonVisitor {
    fn insert(&mut self, name: &str, entry: JsonValue) {
        if name.starts_with("log.") {
            return;
        }
        let obj = self
            .fields
            .get_or_insert_with(|| JsonValue::Object(Default::default()));
        if let JsonValue::Object(map) = obj {
            map.insert(name.to_string(), entry);
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(text),
            name => self.insert(name, JsonValue::String(text)),
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "log.target" => self.log_target = Some(value.to_string()),
            name => self.insert(name, JsonValue::String(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field.name(), JsonValue::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::info;

    #[test]
    fn log_hook_receives_record() {
        let captured: Arc<Mutex<Vec<LogRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let c = captured.clone();
            move |rec: &LogRecord| {
                c.lock().unwrap().push(rec.clone());
            }
        };
        set_log_hook(hook);
        let _guard = init_logging(LoggingOptions::default());

        info!(rows = 3u64, "marshaled matrix");
        log::warn!(target: "numbridge_ffi", "fallback path");

        let items = captured.lock().unwrap();
        let rec = items
            .iter()
            .find(|r| r.message.contains("marshaled matrix"))
            .expect("tracing record");
        assert_eq!(rec.level, "INFO");
        assert_eq!(
            rec.fields.as_ref().and_then(|f| f.get("rows")).and_then(|v| v.as_u64()),
            Some(3)
        );
        let bridged = items
            .iter()
            .find(|r| r.message.contains("fallback path"))
            .expect("log record");
        assert_eq!(bridged.target, "numbridge_ffi");
    }
}
