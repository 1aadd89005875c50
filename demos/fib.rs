use std::sync::atomic::{AtomicUsize, Ordering};

use tripwire::{CallRecord, Result, action, enter_debugger, trigger};

static CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_call(_: &CallRecord) -> Result<()> {
    CALLS.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

fn print_call(record: &CallRecord) -> Result<()> {
    println!("{record}");
    Ok(())
}

fn is_even(record: &CallRecord) -> bool {
    record.arg::<u64>(0).is_some_and(|n| n % 2 == 0)
}

#[trigger(action = count_call)]
fn fib(n: u64) -> Result<u64> {
    Ok(if n == 0 { 1 } else { n * fib(n - 1)? })
}

#[trigger(actions = [print_call, print_call, print_call, print_call], conditions = [is_even])]
fn fib2(n: u64) -> Result<u64> {
    Ok(if n == 0 { 1 } else { n * fib2(n - 1)? })
}

#[action(triggers = [FIB], conditions = [|r: &CallRecord| r.arg::<u64>(0) == Some(&0)])]
fn bottom_reached(record: &CallRecord) -> Result<()> {
    println!("reached the bottom: {record}");
    Ok(())
}

#[trigger(action = enter_debugger)]
fn enter_debugger_when_called() -> Result<u32> {
    Ok(10)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    BOTTOM_REACHED.bind();
    println!("fib(10) = {} after {} calls", fib(10)?, CALLS.load(Ordering::Relaxed));
    println!("fib2(10) = {}", fib2(10)?);
    println!("enter_debugger_when_called() = {}", enter_debugger_when_called()?);
    Ok(())
}
