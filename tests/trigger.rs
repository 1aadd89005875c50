//! Integration tests for the `#[trigger]` attribute.
//!
//! Everything here goes through the global registry, so tests run serially.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serial_test::serial;
use tripwire::{
    CallRecord, Error, Registry, Result, action, enter_debugger_on_error, make_trigger, trigger,
};

static FIB_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_fib(_: &CallRecord) -> Result<()> {
    FIB_CALLS.fetch_add(1, Ordering::SeqCst);
    Ok(())
}

#[trigger(action = count_fib)]
fn fib(n: u64) -> Result<u64> {
    Ok(if n == 0 { 1 } else { n * fib(n - 1)? })
}

#[test]
#[serial]
fn test_fib_fires_once_per_recursive_call() {
    let before = FIB_CALLS.load(Ordering::SeqCst);
    assert_eq!(fib(5).unwrap(), 120);
    assert_eq!(FIB_CALLS.load(Ordering::SeqCst) - before, 6);
}

static FIB2_LOG: Mutex<Vec<(usize, u64)>> = Mutex::new(Vec::new());

fn is_even(record: &CallRecord) -> bool {
    record.arg::<u64>(0).is_some_and(|n| n % 2 == 0)
}

fn log_as(tag: usize, record: &CallRecord) -> Result<()> {
    let n = *record.arg::<u64>(0).ok_or_else(|| Error::external("missing n"))?;
    FIB2_LOG.lock().unwrap().push((tag, n));
    Ok(())
}

#[trigger(
    actions = [
        |r: &CallRecord| log_as(1, r),
        |r: &CallRecord| log_as(2, r),
        |r: &CallRecord| log_as(3, r),
        |r: &CallRecord| log_as(4, r),
    ],
    conditions = [is_even]
)]
fn fib2(n: u64) -> Result<u64> {
    Ok(if n == 0 { 1 } else { n * fib2(n - 1)? })
}

#[test]
#[serial]
fn test_list_form_fires_each_action_in_order_when_conditions_hold() {
    FIB2_LOG.lock().unwrap().clear();
    assert_eq!(fib2(5).unwrap(), 120);

    let log = FIB2_LOG.lock().unwrap();
    let expected: Vec<(usize, u64)> = [4u64, 2, 0]
        .iter()
        .flat_map(|&n| (1..=4).map(move |tag| (tag, n)))
        .collect();
    assert_eq!(*log, expected);
}

static ORDER: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn note_call(record: &CallRecord) -> Result<()> {
    ORDER.lock().unwrap().push(format!("action {record}"));
    Ok(())
}

#[trigger(action = note_call)]
fn side_effect(x: i32) -> Result<i32> {
    ORDER.lock().unwrap().push(format!("body {x}"));
    Ok(x)
}

#[test]
#[serial]
fn test_action_runs_before_body() {
    ORDER.lock().unwrap().clear();
    assert_eq!(side_effect(3).unwrap(), 3);
    assert_eq!(*ORDER.lock().unwrap(), vec!["action side_effect(3)", "body 3"]);
}

static SCALE_LOG: Mutex<Vec<(u32, u32)>> = Mutex::new(Vec::new());

fn remember_scale(record: &CallRecord) -> Result<()> {
    let x = *record.arg::<u32>(0).unwrap();
    let factor = *record.kwarg::<u32>("factor").unwrap();
    SCALE_LOG.lock().unwrap().push((x, factor));
    Ok(())
}

#[trigger(action = remember_scale, name = "scale")]
fn scaled(x: u32, #[kwarg] factor: u32) -> Result<u32> {
    Ok(x * factor)
}

#[test]
#[serial]
fn test_kwargs_are_recorded_by_name() {
    SCALE_LOG.lock().unwrap().clear();
    assert_eq!(scaled(4, 3).unwrap(), 12);
    assert_eq!(*SCALE_LOG.lock().unwrap(), vec![(4, 3)]);
    assert_eq!(SCALED.name(), "scale");
}

#[trigger]
fn plain(x: u8) -> Result<u8> {
    Ok(x)
}

static PLAIN_CALLS: AtomicUsize = AtomicUsize::new(0);

#[test]
#[serial]
fn test_register_against_static_trigger_and_suppress() {
    static REGISTERED: std::sync::Once = std::sync::Once::new();
    REGISTERED.call_once(|| {
        make_trigger(
            |_: &CallRecord| -> Result<()> {
                PLAIN_CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            &[PLAIN.id().clone()],
        );
    });
    let before = PLAIN_CALLS.load(Ordering::SeqCst);

    plain(1).unwrap();
    assert_eq!(PLAIN_CALLS.load(Ordering::SeqCst) - before, 1);

    let global = Registry::global();
    global.suppressed(|| plain(2)).unwrap();
    assert_eq!(PLAIN_CALLS.load(Ordering::SeqCst) - before, 1);
    assert!(!global.is_suppressed());

    plain(3).unwrap();
    assert_eq!(PLAIN_CALLS.load(Ordering::SeqCst) - before, 2);
}

#[derive(Debug)]
enum MathError {
    Tripwire(Error),
    DivisionByZero,
}

impl From<Error> for MathError {
    fn from(e: Error) -> Self {
        MathError::Tripwire(e)
    }
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::Tripwire(e) => write!(f, "{e}"),
            MathError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

static DIV_RUNS: AtomicUsize = AtomicUsize::new(0);

#[trigger(action = enter_debugger_on_error)]
fn div(a: u32, b: u32) -> std::result::Result<u32, MathError> {
    DIV_RUNS.fetch_add(1, Ordering::SeqCst);
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

#[test]
#[serial]
fn test_replay_on_error_with_custom_error_type() {
    let before = DIV_RUNS.load(Ordering::SeqCst);
    assert_eq!(div(6, 3).unwrap(), 2);
    assert_eq!(DIV_RUNS.load(Ordering::SeqCst) - before, 2);

    // the default sink only logs, so the real call still fails normally
    assert!(matches!(div(1, 0), Err(MathError::DivisionByZero)));
    assert_eq!(DIV_RUNS.load(Ordering::SeqCst) - before, 4);
}

static GUARDED_RUNS: AtomicUsize = AtomicUsize::new(0);

fn refuse_odd(record: &CallRecord) -> Result<()> {
    match record.arg::<u32>(0) {
        Some(n) if n % 2 == 1 => Err(Error::external(format!("{n} is odd"))),
        _ => Ok(()),
    }
}

#[trigger(action = refuse_odd)]
fn guarded(n: u32) -> Result<u32> {
    GUARDED_RUNS.fetch_add(1, Ordering::SeqCst);
    Ok(n)
}

#[test]
#[serial]
fn test_failing_action_prevents_the_body() {
    let before = GUARDED_RUNS.load(Ordering::SeqCst);
    assert!(matches!(guarded(3), Err(Error::External(ref m)) if &**m == "3 is odd"));
    assert_eq!(GUARDED_RUNS.load(Ordering::SeqCst), before);

    // the refusing consumer is still alive and lets even numbers through
    assert_eq!(guarded(4).unwrap(), 4);
    assert!(guarded(5).is_err());
    assert_eq!(GUARDED_RUNS.load(Ordering::SeqCst), before + 1);
}

static WATCH_LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

#[trigger]
fn watched(x: u32) -> Result<u32> {
    Ok(x + 1)
}

#[trigger]
fn also_watched(x: u32) -> Result<u32> {
    Ok(x * 2)
}

#[action(
    triggers = [WATCHED, ALSO_WATCHED],
    conditions = [|r: &CallRecord| r.arg::<u32>(0).is_some_and(|x| *x > 0)]
)]
fn watch(record: &CallRecord) -> Result<()> {
    WATCH_LOG.lock().unwrap().push(record.to_string());
    Ok(())
}

#[test]
#[serial]
fn test_action_binds_itself_to_triggers_declared_elsewhere() {
    WATCH_LOG.lock().unwrap().clear();
    assert_eq!(watched(1).unwrap(), 2);
    assert!(WATCH_LOG.lock().unwrap().is_empty());

    // bound inside a suppression scope, live once the scope ends
    let global = Registry::global();
    global.suppressed(|| {
        WATCH.bind();
        watched(1).unwrap();
    });
    WATCH.bind();
    assert!(WATCH.is_bound());
    assert!(WATCH_LOG.lock().unwrap().is_empty());

    assert_eq!(watched(1).unwrap(), 2);
    assert_eq!(also_watched(3).unwrap(), 6);
    assert_eq!(watched(0).unwrap(), 1);
    assert_eq!(*WATCH_LOG.lock().unwrap(), vec!["watched(1)", "also_watched(3)"]);
    assert_eq!(WATCH.name(), "watch");
}
