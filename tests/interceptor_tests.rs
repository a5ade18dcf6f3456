use std::sync::{Arc, Mutex};

use actionrouter::action::{ActionTarget, ParamType, Value};
use actionrouter::interceptor::{self, Interceptor, MetricsInterceptor, TracingInterceptor};
use actionrouter::router::RouteDefinition;
use actionrouter::{DispatchError, Dispatcher, DispatcherConfig};

mod common;
use common::handlers::{failing, returning, text};
use common::tracing_util::TestTracing;

fn passthrough() -> Arc<dyn Interceptor> {
    interceptor::from_fn(|ctx| Ok(ctx.invoke()?))
}

fn recording(order: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Arc<dyn Interceptor> {
    let order = Arc::clone(order);
    interceptor::from_fn(move |ctx| {
        order.lock().unwrap().push(name);
        Ok(ctx.invoke()?)
    })
}

#[test]
fn test_metrics_interceptor_counts_outcomes() {
    let metrics = Arc::new(MetricsInterceptor::new());
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .add_interceptor("metrics", Arc::clone(&metrics) as Arc<dyn Interceptor>)
        .unwrap();
    dispatcher
        .add_interceptor("deny", interceptor::from_fn(|_ctx| Ok(None)))
        .unwrap();
    dispatcher
        .add_route(RouteDefinition::new("/ok", returning("ok", "fine")).interceptor("metrics"))
        .unwrap();
    dispatcher
        .add_route(RouteDefinition::new("/fail", failing("fail", "boom")).interceptor("metrics"))
        .unwrap();
    dispatcher
        .add_route(
            RouteDefinition::new("/blocked", returning("blocked", "hidden"))
                .interceptors(["metrics", "deny"]),
        )
        .unwrap();

    assert!(dispatcher.invoke_action("/ok", Vec::new()).is_ok());
    assert!(dispatcher.invoke_action("/ok", Vec::new()).is_ok());
    assert!(dispatcher.invoke_action("/fail", Vec::new()).is_err());
    assert!(dispatcher.invoke_action("/blocked", Vec::new()).unwrap().is_none());

    assert_eq!(metrics.invocations(), 4);
    assert_eq!(metrics.failures(), 1);
    assert_eq!(metrics.short_circuits(), 1);
    assert!(metrics.average_latency() <= std::time::Duration::from_secs(1));
}

#[test]
fn test_metrics_interceptor_starts_at_zero() {
    let metrics = MetricsInterceptor::default();
    assert_eq!(metrics.invocations(), 0);
    assert_eq!(metrics.average_latency(), std::time::Duration::ZERO);
}

#[test]
fn test_tracing_interceptor_wraps_the_action_in_a_span() {
    let tracing = TestTracing::init();
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .add_interceptor("tracing", Arc::new(TracingInterceptor))
        .unwrap();
    dispatcher
        .add_route(RouteDefinition::new("/traced", returning("traced#show", "ok")).interceptor("tracing"))
        .unwrap();
    dispatcher
        .add_route(RouteDefinition::new("/broken", failing("broken#show", "kaput")).interceptor("tracing"))
        .unwrap();

    dispatcher.invoke_action("/traced", Vec::new()).unwrap();
    assert!(dispatcher.invoke_action("/broken", Vec::new()).is_err());

    let output = tracing.output();
    assert!(output.contains("action{"), "no action span in:\n{output}");
    assert!(output.contains("handler=traced#show"));
    assert!(output.contains("Action failed"));
    assert!(output.contains("kaput"));
}

#[test]
fn test_nested_stacks_expand_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::default();
    for name in ["a", "b", "c"] {
        dispatcher.add_interceptor(name, recording(&order, name)).unwrap();
    }
    dispatcher.add_interceptor_stack("ab", ["a", "b"]).unwrap();
    dispatcher.add_interceptor_stack("all", ["ab", "c"]).unwrap();

    let route = dispatcher
        .add_route(RouteDefinition::new("/x", returning("x", "ok")).interceptors(["all", "a"]))
        .unwrap();
    let names: Vec<&str> = route.interceptors().iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["a", "b", "c", "a"]);

    dispatcher.invoke_action("/x", Vec::new()).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c", "a"]);
}

#[test]
fn test_unknown_interceptor_names_fail_registration() {
    let mut dispatcher = Dispatcher::default();
    dispatcher.add_interceptor("known", passthrough()).unwrap();

    assert!(matches!(
        dispatcher.add_interceptor_stack("stack", ["known", "ghost"]),
        Err(DispatchError::MissingInterceptor { ref name }) if name == "ghost"
    ));
    let err = dispatcher
        .add_route(RouteDefinition::new("/x", returning("x", "ok")).interceptor("phantom"))
        .unwrap_err();
    assert!(matches!(err, DispatchError::MissingInterceptor { ref name } if name == "phantom"));
    assert!(dispatcher.route_table().is_empty());
}

#[test]
fn test_default_stack_applies_to_routes_without_interceptors() {
    let config = DispatcherConfig {
        default_stack: Some("defaults".to_string()),
        ..DispatcherConfig::default()
    };
    let mut dispatcher = Dispatcher::new(config).unwrap();
    dispatcher.add_interceptor("audit", passthrough()).unwrap();
    dispatcher.add_interceptor("explicit", passthrough()).unwrap();
    dispatcher.add_interceptor_stack("defaults", ["audit"]).unwrap();

    let implicit = dispatcher
        .add_route(RouteDefinition::new("/implicit", returning("i", "ok")))
        .unwrap();
    let explicit = dispatcher
        .add_route(RouteDefinition::new("/explicit", returning("e", "ok")).interceptor("explicit"))
        .unwrap();

    assert_eq!(implicit.interceptors().len(), 1);
    assert_eq!(implicit.interceptors()[0].name(), "audit");
    assert_eq!(explicit.interceptors().len(), 1);
    assert_eq!(explicit.interceptors()[0].name(), "explicit");
}

#[test]
fn test_unregistered_default_stack_is_skipped_with_a_warning() {
    let tracing = TestTracing::init();
    let config = DispatcherConfig {
        default_stack: Some("missing".to_string()),
        ..DispatcherConfig::default()
    };
    let mut dispatcher = Dispatcher::new(config).unwrap();
    let route = dispatcher
        .add_route(RouteDefinition::new("/plain", returning("p", "ok")))
        .unwrap();
    assert!(route.interceptors().is_empty());
    assert!(tracing.contains("Default interceptor stack is not registered"));
}

#[derive(Debug, PartialEq)]
struct User {
    name: String,
}

#[test]
fn test_interceptors_supply_extra_handler_arguments() {
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .add_interceptor(
            "session",
            interceptor::from_fn(|ctx| {
                let name = ctx.capture("user").unwrap_or("anonymous").to_string();
                ctx.add_supplementary(Value::new(User { name }));
                Ok(ctx.invoke()?)
            }),
        )
        .unwrap();

    let greet = ActionTarget::from_fn(
        "greet",
        vec![ParamType::of::<String>(), ParamType::of::<User>()],
        |args| {
            let greeting = args[0].as_ref().and_then(Value::as_str).unwrap_or("hi");
            let user = args[1]
                .as_ref()
                .and_then(|v| v.downcast_ref::<User>())
                .ok_or_else(|| anyhow::anyhow!("no user bound"))?;
            Ok(Some(Value::new(format!("{greeting} {}", user.name))))
        },
    );
    dispatcher
        .add_route(RouteDefinition::new("/greet/{user}", greet).interceptor("session"))
        .unwrap();

    let value = dispatcher
        .invoke_action("/greet/ada", vec![Value::from("hello")])
        .unwrap();
    assert_eq!(text(&value), Some("hello ada"));
}

#[test]
fn test_interceptor_sees_the_handler_result_after_continuing() {
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .add_interceptor(
            "shout",
            interceptor::from_fn(|ctx| {
                assert!(ctx.result().is_none());
                ctx.invoke()?;
                let loud = ctx
                    .result()
                    .and_then(Value::as_str)
                    .map(str::to_uppercase)
                    .map(Value::new);
                Ok(loud)
            }),
        )
        .unwrap();
    dispatcher
        .add_route(RouteDefinition::new("/quiet", returning("quiet", "psst")).interceptor("shout"))
        .unwrap();

    let value = dispatcher.invoke_action("/quiet", Vec::new()).unwrap();
    assert_eq!(text(&value), Some("PSST"));
}

#[test]
fn test_remaining_interceptors_count_down() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::default();
    for name in ["first", "second"] {
        let seen = Arc::clone(&seen);
        dispatcher
            .add_interceptor(
                name,
                interceptor::from_fn(move |ctx| {
                    seen.lock().unwrap().push(ctx.remaining_interceptors());
                    Ok(ctx.invoke()?)
                }),
            )
            .unwrap();
    }
    dispatcher
        .add_route(RouteDefinition::new("/n", returning("n", "ok")).interceptors(["first", "second"]))
        .unwrap();

    dispatcher.invoke_action("/n", Vec::new()).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 0]);
}
