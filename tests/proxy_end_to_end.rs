use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use latency_proxy::{
    Interface, LatencyMonitored, LatencyReport, Method, MonitorConfig, MonitorError, TimeUnit,
};

// ─── Fixture ─────────────────────────────────────────────────────

trait Widget {
    fn foo(&self) -> Result<(), String>;
    fn bar(&self, n: i32) -> Result<i32, String>;
}

const FOO: Method = Method::new("it::Widget", "foo", &[]);
const BAR: Method = Method::new("it::Widget", "bar", &["i32"]);
static WIDGET: Interface = Interface::new("it::Widget", &[FOO, BAR]);

struct Sleepy;

impl Widget for Sleepy {
    fn foo(&self) -> Result<(), String> {
        thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn bar(&self, n: i32) -> Result<i32, String> {
        if n < 0 {
            return Err(format!("negative input {n}"));
        }
        thread::sleep(Duration::from_millis(2));
        Ok(n * 2)
    }
}

impl<S: Widget> Widget for LatencyMonitored<S> {
    fn foo(&self) -> Result<(), String> {
        self.invoke(&FOO, |s| s.foo())
    }

    fn bar(&self, n: i32) -> Result<i32, String> {
        self.invoke(&BAR, |s| s.bar(n))
    }
}

fn proxy(config: MonitorConfig) -> LatencyMonitored<Sleepy> {
    LatencyMonitored::new(Sleepy, &[WIDGET], config).unwrap()
}

// ─── Scenarios ───────────────────────────────────────────────────

#[test]
fn two_methods_two_keys() {
    let widget = proxy(
        MonitorConfig::default()
            .with_sample_size(3)
            .with_unit(TimeUnit::Microseconds),
    );

    for _ in 0..3 {
        widget.foo().unwrap();
    }
    assert_eq!(widget.bar(5).unwrap(), 10);

    let registry = widget.registry();
    let keys = registry.list_keys();
    assert_eq!(
        keys,
        BTreeSet::from(["bar(i32)".to_string(), "foo()".to_string()])
    );

    // Three ~1ms samples fill the buffer exactly.
    let foo = registry.get_average("foo()").unwrap();
    assert!(foo >= 1_000, "foo average was {foo}us");
    assert!(foo < 100_000, "foo average was {foo}us");

    // One ~2ms sample spread over three slots.
    let bar = registry.get_average("bar(i32)").unwrap();
    assert!(bar >= 2_000 / 3, "bar average was {bar}us");
    assert_eq!(registry.get("bar(i32)").unwrap().samples_recorded(), 1);
}

#[test]
fn lazy_keys_appear_on_first_call() {
    let widget = proxy(MonitorConfig::default().with_eager_monitors(false));
    let registry = widget.registry();
    let mut changes = registry.subscribe();

    assert!(registry.list_keys().is_empty());
    widget.foo().unwrap();
    widget.foo().unwrap();

    assert_eq!(registry.list_keys().len(), 1);
    let event = changes.try_recv().unwrap();
    assert_eq!(event.key_added, "foo()");
    assert_eq!(event.keys, vec!["foo()".to_string()]);
    assert!(changes.try_recv().is_err(), "second call must not notify");
}

#[test]
fn failing_call_records_nothing_and_keeps_its_error() {
    let widget = proxy(MonitorConfig::default().with_eager_monitors(false));

    let err = widget.bar(-1).unwrap_err();
    assert_eq!(err, "negative input -1");

    // The key may exist, but no sample was taken for it.
    let recorded = widget
        .registry()
        .get("bar(i32)")
        .map(|m| m.samples_recorded())
        .unwrap_or(0);
    assert_eq!(recorded, 0);
}

#[test]
fn unknown_key_is_a_distinct_not_found() {
    let widget = proxy(MonitorConfig::default());
    let registry = widget.registry();

    assert_eq!(
        registry.get_average("baz()"),
        Err(MonitorError::AttributeNotFound("baz()".into()))
    );
    assert_eq!(registry.latency_value("baz()", true).unwrap(), "");
    assert!(registry.latency_value("baz()", false).is_err());
}

#[test]
fn zero_sample_size_fails_at_construction() {
    let err = LatencyMonitored::new(Sleepy, &[WIDGET], MonitorConfig::default().with_sample_size(0))
        .unwrap_err();
    assert!(matches!(err, MonitorError::InvalidConfiguration(_)));
}
