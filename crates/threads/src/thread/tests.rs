use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, mpsc};

use super::*;

fn start(registry: &ThreadRegistry, id: WellKnownId) -> WellKnownThread {
	WellKnownThread::start(registry, ThreadSpec::new(id)).expect("thread starts")
}

fn thread_name_on(registry: &ThreadRegistry, id: WellKnownId) -> Option<String> {
	registry
		.post_with_reply(id, || std::thread::current().name().map(str::to_owned))
		.expect("target is registered")
		.blocking_recv()
		.expect("task ran")
}

#[test]
fn work_runs_on_the_named_thread() {
	let registry = ThreadRegistry::new();
	let mut db = start(&registry, WellKnownId::Database);
	assert_eq!(db.name(), "xeno-db");
	assert!(db.is_running());
	assert_eq!(thread_name_on(&registry, WellKnownId::Database).as_deref(), Some("xeno-db"));

	let reg = registry.clone();
	let on_db = registry
		.post_with_reply(WellKnownId::Database, move || (reg.current_id(), reg.currently_on(WellKnownId::Database)))
		.expect("database is registered")
		.blocking_recv()
		.expect("task ran");
	assert_eq!(on_db, (Some(WellKnownId::Database), true));

	db.stop().expect("clean stop");
	assert!(!db.is_running());
	assert!(!registry.is_registered(WellKnownId::Database));
	db.stop().expect("second stop is a no-op");
}

#[test]
fn spec_overrides_name() {
	let registry = ThreadRegistry::new();
	let spec = ThreadSpec::new(WellKnownId::FileIo).name("custom-file").stack_size(256 * 1024);
	assert_eq!(spec.stack_size, Some(256 * 1024));
	let _file = WellKnownThread::start(&registry, spec).expect("thread starts");
	assert_eq!(thread_name_on(&registry, WellKnownId::FileIo).as_deref(), Some("custom-file"));
}

#[test]
fn ui_spec_falls_back_to_the_label() {
	assert_eq!(ThreadSpec::new(WellKnownId::Ui).resolved_name(), "ui");
}

#[test]
fn stop_runs_queued_work_first() {
	let registry = ThreadRegistry::new();
	let mut io = start(&registry, WellKnownId::NetworkIo);
	let ran = Arc::new(AtomicUsize::new(0));
	for _ in 0..16 {
		let ran = Arc::clone(&ran);
		assert!(registry.post_task(WellKnownId::NetworkIo, move || {
			ran.fetch_add(1, Ordering::SeqCst);
		}));
	}
	io.stop().expect("clean stop");
	assert_eq!(ran.load(Ordering::SeqCst), 16);
	assert!(!registry.post_task(WellKnownId::NetworkIo, || {}));
}

#[test]
fn panicking_task_is_reported_on_stop() {
	let registry = ThreadRegistry::new();
	let mut launcher = start(&registry, WellKnownId::ProcessLaunch);
	assert!(registry.post_task(WellKnownId::ProcessLaunch, || panic!("kaboom")));

	let err = launcher.stop().expect_err("loop panicked");
	assert!(matches!(
		&err,
		ThreadError::Panicked { id: WellKnownId::ProcessLaunch, message: Some(message) } if message.contains("kaboom")
	));
	assert!(!registry.is_registered(WellKnownId::ProcessLaunch));
}

#[test]
#[should_panic(expected = "already registered")]
fn starting_a_registered_identifier_is_fatal() {
	let registry = ThreadRegistry::new();
	let _first = start(&registry, WellKnownId::RendererSupport);
	let _second = start(&registry, WellKnownId::RendererSupport);
}

#[test]
fn posting_downward_is_safe_while_higher_threads_tear_down() {
	const ROUNDS: usize = 2_000;
	const HIGHER: [WellKnownId; 4] = [
		WellKnownId::RendererSupport,
		WellKnownId::FileIo,
		WellKnownId::ProcessLaunch,
		WellKnownId::NetworkIo,
	];

	let registry = ThreadRegistry::new();
	let ui = MessageLoop::new("ui");
	let ui_record = ThreadRecord::new(&registry, WellKnownId::Ui, ui.handle());
	let mut db = start(&registry, WellKnownId::Database);
	let higher: Vec<_> = HIGHER.iter().map(|id| start(&registry, *id)).collect();

	let ran = Arc::new(AtomicUsize::new(0));
	let barrier = Arc::new(Barrier::new(2));
	let (done_tx, done_rx) = mpsc::channel();

	let reg = registry.clone();
	let task_ran = Arc::clone(&ran);
	let task_barrier = Arc::clone(&barrier);
	assert!(registry.post_task(WellKnownId::Database, move || {
		task_barrier.wait();
		let mut failures = 0_usize;
		for _ in 0..ROUNDS {
			for target in [WellKnownId::Ui, WellKnownId::Database] {
				let ran = Arc::clone(&task_ran);
				if !reg.post_task(target, move || {
					ran.fetch_add(1, Ordering::SeqCst);
				}) {
					failures += 1;
				}
			}
			for target in HIGHER {
				let _ = reg.post_task(target, || {});
			}
		}
		let _ = done_tx.send(failures);
	}));

	barrier.wait();
	for mut thread in higher.into_iter().rev() {
		thread.stop().expect("clean stop");
	}
	let failures = done_rx.recv().expect("poster finished");
	assert_eq!(failures, 0);

	db.stop().expect("clean stop");
	ui.run_until_idle();
	drop(ui_record);
	assert_eq!(ran.load(Ordering::SeqCst), 2 * ROUNDS);
	assert!(registry.snapshot().is_empty());
}

#[test]
fn stop_completes_while_a_task_runs_a_nested_loop() {
	let registry = ThreadRegistry::new();
	let db = start(&registry, WellKnownId::Database);
	let lp = Arc::clone(db.message_loop());
	let (entered_tx, entered_rx) = mpsc::channel();
	assert!(registry.post_task(WellKnownId::Database, move || {
		let _ = entered_tx.send(());
		// Leaves time for stop to queue its quit task behind this one.
		std::thread::sleep(Duration::from_millis(100));
		lp.run_until_idle();
	}));
	entered_rx.recv().expect("task started");

	let (done_tx, done_rx) = mpsc::channel();
	let stopper = std::thread::spawn(move || {
		let mut db = db;
		let _ = done_tx.send(db.stop().is_ok());
	});
	assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true), "stop did not return");
	stopper.join().unwrap();
	assert!(!registry.is_registered(WellKnownId::Database));
}
