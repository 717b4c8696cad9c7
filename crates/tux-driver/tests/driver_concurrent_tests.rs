//! 多线程并发测试
//!
//! 多个调用方线程同时入队和读取状态，IO 线程并发下发，验证无丢失、单线程内保序、读不阻塞。

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tux_driver::*;
use tux_protocol::TuxFrame;

const VERBS: [(&str, &str); 4] = [
    ("open_eyes", "TUX_CMD:EYES:OPEN"),
    ("close_mouth", "TUX_CMD:MOUTH:CLOSE"),
    ("flippers_up", "TUX_CMD:FLIPPERS:UP"),
    ("stop_spinning", "TUX_CMD:SPINNING:OFF"),
];

fn running_driver(capacity: usize) -> (Arc<TuxDriver>, SimHandle) {
    let sim = SimulatedLink::new();
    let handle = sim.handle();
    let driver = TuxDriverBuilder::new()
        .link(sim)
        .stack_capacity(capacity)
        .poll_interval(Duration::from_millis(1))
        .log_level(LogLevel::None)
        .build();
    driver.start().unwrap();
    (Arc::new(driver), handle)
}

/// 多个线程并发入队，所有命令都被下发且没有重复
#[test]
fn test_concurrent_push_dispatches_everything() {
    let (driver, handle) = running_driver(512);
    let per_thread = 50;

    let pushers: Vec<_> = VERBS
        .into_iter()
        .map(|(verb, _)| {
            let driver = driver.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    driver.push(verb, 0.0).unwrap();
                }
            })
        })
        .collect();
    for pusher in pushers {
        pusher.join().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.sent().len() < VERBS.len() * per_thread && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    let sent: Vec<String> = handle
        .sent()
        .into_iter()
        .filter_map(|frame| match frame {
            TuxFrame::Command(instruction) => Some(instruction.to_string()),
            TuxFrame::SoundReflash(_) => None,
        })
        .collect();
    assert_eq!(sent.len(), VERBS.len() * per_thread);
    for (_, wire) in VERBS {
        assert_eq!(sent.iter().filter(|s| s.as_str() == wire).count(), per_thread);
    }
    assert_eq!(driver.metrics().commands_pushed, (VERBS.len() * per_thread) as u64);
}

/// 栈容量在并发入队时不被突破
#[test]
fn test_concurrent_push_respects_capacity() {
    let (driver, _handle) = running_driver(16);

    let pushers: Vec<_> = (0..4)
        .map(|_| {
            let driver = driver.clone();
            thread::spawn(move || {
                let mut accepted = 0usize;
                for _ in 0..10 {
                    match driver.push("open_eyes", 60.0) {
                        Ok(()) => accepted += 1,
                        Err(DriverError::StackOverflow { capacity }) => assert_eq!(capacity, 16),
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
                accepted
            })
        })
        .collect();
    let accepted: usize = pushers.into_iter().map(|p| p.join().unwrap()).sum();

    assert_eq!(accepted, 16);
    assert_eq!(driver.pending_commands(), 16);
    assert_eq!(driver.metrics().stack_overflows, 40 - 16);
}

/// 读取状态不会被 IO 线程阻塞
#[test]
fn test_concurrent_status_reads() {
    let (driver, handle) = running_driver(512);

    let readers: Vec<_> = (0..8)
        .map(|_| {
            let driver = driver.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let all = driver.all_status_text();
                    assert!(all.len() <= 8182);
                    assert_eq!(all.lines().count(), 41);
                    let value = driver.status_value("mouth_position");
                    assert!(["UNDEFINED", "OPEN", "CLOSE"].contains(&value.as_str()));
                }
            })
        })
        .collect();

    for i in 0..100 {
        let verb = if i % 2 == 0 { "open_mouth" } else { "close_mouth" };
        driver.push(verb, 0.0).unwrap();
        thread::yield_now();
    }
    for reader in readers {
        reader.join().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.sent().len() < 100 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(handle.sent().len(), 100);
}

/// start / stop 可以从多个线程同时调用
#[test]
fn test_concurrent_lifecycle_calls() {
    let (driver, _handle) = running_driver(512);

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let driver = driver.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    if i % 2 == 0 {
                        driver.stop().unwrap();
                    } else {
                        driver.start().unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    driver.start().unwrap();
    assert!(driver.is_running());
    driver.stop().unwrap();
    assert_eq!(driver.state(), LifecycleState::Stopped);
}
