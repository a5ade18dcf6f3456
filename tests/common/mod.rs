#![allow(dead_code)]

pub mod tracing_util {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt;

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Installs a thread-local fmt subscriber capturing everything at TRACE.
    pub struct TestTracing {
        logs: LogBuffer,
        _guard: DefaultGuard,
    }

    impl TestTracing {
        pub fn init() -> Self {
            let logs = LogBuffer::default();
            let writer = logs.clone();
            let subscriber = fmt()
                .with_max_level(tracing::Level::TRACE)
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);
            Self {
                logs,
                _guard: guard,
            }
        }

        pub fn output(&self) -> String {
            String::from_utf8_lossy(&self.logs.0.lock().unwrap()).into_owned()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.output().contains(needle)
        }
    }
}

pub mod handlers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use actionrouter::action::{ActionTarget, ParamType, Value};

    pub fn text(value: &Option<Value>) -> Option<&str> {
        value.as_ref().and_then(Value::as_str)
    }

    /// A handler without parameters returning a fixed string.
    pub fn returning(type_name: &str, result: &'static str) -> ActionTarget {
        ActionTarget::from_fn(type_name, Vec::new(), move |_| Ok(Some(Value::from(result))))
    }

    /// A handler returning `result` and counting its calls.
    pub fn counted(type_name: &str, result: &'static str) -> (ActionTarget, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let target = ActionTarget::from_fn(type_name, Vec::new(), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Value::from(result)))
        });
        (target, calls)
    }

    /// A handler returning its first string argument, or `"none"`.
    pub fn echo(type_name: &str) -> ActionTarget {
        ActionTarget::from_fn(type_name, vec![ParamType::of::<String>()], |args| {
            let text = args[0].as_ref().and_then(Value::as_str).unwrap_or("none");
            Ok(Some(Value::new(text.to_string())))
        })
    }

    /// A handler that always fails.
    pub fn failing(type_name: &str, message: &'static str) -> ActionTarget {
        ActionTarget::from_fn(type_name, Vec::new(), move |_| Err(anyhow::anyhow!(message)))
    }
}
