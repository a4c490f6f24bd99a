#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    use tether_core::*;
    use web_time::{Duration, Instant};

    use crate::*;

    struct SlowBootstrap(Duration);

    impl NativeBootstrap for SlowBootstrap {
        fn toolkit(&self) -> &str {
            "slow"
        }

        fn bootstrap(&self) -> Result<(), BootstrapError> {
            thread::sleep(self.0);
            Ok(())
        }
    }

    struct NoDisplay;

    impl NativeBootstrap for NoDisplay {
        fn toolkit(&self) -> &str {
            "gtk"
        }

        fn bootstrap(&self) -> Result<(), BootstrapError> {
            Err(BootstrapError::fatal("cannot open display"))
        }
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig::new()
            .poll_interval(Duration::from_millis(5))
            .thread_name("test-ui")
    }

    #[test]
    fn test_spawned_ui_thread_runs_work() {
        let ui = spawn_ui_thread(config(), Headless).unwrap();
        let d = ui.dispatcher().clone();
        assert_eq!(d.state(), DispatcherState::Running);

        let name = d
            .invoke(|| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("test-ui"));

        ui.shutdown().unwrap();
        assert_eq!(d.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_drop_stops_the_thread() {
        let d = {
            let ui = spawn_ui_thread(config(), Headless).unwrap();
            ui.dispatcher().clone()
        };
        assert_eq!(d.state(), DispatcherState::Stopped);
    }

    #[test]
    fn test_fatal_bootstrap_fails_spawn() {
        let err = spawn_ui_thread(config(), NoDisplay).err().unwrap();
        let root = err.downcast_ref::<DispatchError>();
        assert!(matches!(root, Some(DispatchError::NativeBootstrap { .. })));
    }

    #[test]
    fn test_slow_startup_times_out_without_waiting_for_bootstrap() {
        let cfg = config().startup_timeout(Duration::from_millis(20));
        let started = Instant::now();
        let err = spawn_ui_thread(cfg, SlowBootstrap(Duration::from_secs(3)))
            .err()
            .unwrap();
        let elapsed = started.elapsed();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::StartupTimeout { .. })
        ));
        assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    }

    #[test]
    fn test_run_on_current_thread_returns_setup_state() {
        let runs = Arc::new(AtomicU32::new(0));
        let r = runs.clone();

        let result = thread::spawn(move || {
            run_on_current_thread(config(), Headless, |d| {
                let worker = d.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        let r = r.clone();
                        worker
                            .invoke(move || r.fetch_add(1, Ordering::SeqCst))
                            .unwrap();
                    }
                    worker.stop();
                });
                Ok("setup-state")
            })
        })
        .join()
        .unwrap();

        assert_eq!(result.unwrap(), "setup-state");
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_failed_setup_stops_dispatcher() {
        let err = thread::spawn(|| {
            run_on_current_thread(config(), Headless, |_| -> anyhow::Result<()> {
                anyhow::bail!("no main window")
            })
        })
        .join()
        .unwrap()
        .unwrap_err();
        assert_eq!(err.to_string(), "no main window");
    }
}
