use web_time::Instant;

use tether_core::{Dispatcher, DispatcherState, DispatcherStats, Event, ListenerRef};

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub at: Instant,
    pub toolkit: String,
    pub state: DispatcherState,
    pub degraded: bool,
    pub stats: DispatcherStats,
    pub widgets: usize,
}

/// Work done between two snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rates {
    pub executed_per_sec: f32,
    pub enqueued_per_sec: f32,
    pub new_panics: u64,
}

/// Samples a dispatcher (and optionally a widget count) for HUD-style
/// reporting while debugging UI-thread stalls.
pub struct Monitor {
    dispatcher: Dispatcher,
    last: Option<Snapshot>,
}

impl Monitor {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            last: None,
        }
    }

    pub fn sample(&mut self, widgets: usize) -> Snapshot {
        let snap = Snapshot {
            at: Instant::now(),
            toolkit: self.dispatcher.toolkit().to_string(),
            state: self.dispatcher.state(),
            degraded: self.dispatcher.is_degraded(),
            stats: self.dispatcher.stats(),
            widgets,
        };
        self.last = Some(snap.clone());
        snap
    }

    /// Samples and compares with the previous sample, if any.
    pub fn tick(&mut self, widgets: usize) -> (Snapshot, Option<Rates>) {
        let prev = self.last.take();
        let now = self.sample(widgets);
        let rates = prev.map(|p| rates_between(&p, &now));
        (now, rates)
    }
}

pub fn rates_between(prev: &Snapshot, now: &Snapshot) -> Rates {
    let dt = (now.at - prev.at).as_secs_f32();
    let per_sec = |a: u64, b: u64| {
        if dt > 0.0 {
            b.saturating_sub(a) as f32 / dt
        } else {
            0.0
        }
    };
    Rates {
        executed_per_sec: per_sec(prev.stats.executed, now.stats.executed),
        enqueued_per_sec: per_sec(prev.stats.enqueued, now.stats.enqueued),
        new_panics: now.stats.panics.saturating_sub(prev.stats.panics),
    }
}

impl Snapshot {
    /// One-line summary, e.g. for a status bar or a periodic log line.
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("{} {:?}", self.toolkit, self.state),
            format!("queued: {}", self.stats.queued),
            format!("run: {}", self.stats.executed),
            format!("inline: {}", self.stats.fast_path),
            format!("widgets: {}", self.widgets),
        ];
        if self.stats.panics > 0 {
            lines.push(format!("panics: {}", self.stats.panics));
        }
        if self.degraded {
            lines.push("degraded".to_string());
        }
        lines.join("  |  ")
    }
}

/// A listener that logs every event it sees at `debug`. Attach it to the
/// event types under investigation.
pub fn trace_listener(label: impl Into<String>) -> ListenerRef {
    let label = label.into();
    ListenerRef::new(move |e: &mut Event| {
        let kind = e.widget.as_ref().map_or("?", |w| w.kind());
        log::debug!(
            "[{label}] {:?} on {kind} at ({}, {}) mask={:?} doit={}",
            e.event_type,
            e.x,
            e.y,
            e.state_mask,
            e.doit
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{EventDispatch, EventType};

    #[test]
    fn test_report_lists_counters() {
        let d = Dispatcher::headless();
        d.initialize().unwrap();
        d.invoke(|| ()).unwrap();

        let mut monitor = Monitor::new(d.clone());
        let snap = monitor.sample(3);
        let line = snap.report();
        assert!(line.starts_with("headless Ready"));
        assert!(line.contains("inline: 1"));
        assert!(line.contains("widgets: 3"));
        assert!(!line.contains("panics"));
        d.stop();
    }

    #[test]
    fn test_tick_reports_rates_after_first_sample() {
        let d = Dispatcher::headless();
        let mut monitor = Monitor::new(d);
        let (_, first) = monitor.tick(0);
        assert!(first.is_none());
        let (_, second) = monitor.tick(0);
        assert_eq!(second.map(|r| r.new_panics), Some(0));
    }

    #[test]
    fn test_trace_listener_is_transparent() {
        let events = EventDispatch::new();
        events
            .add_listener(EventType::MouseDown, trace_listener("probe"))
            .unwrap();
        let mut e = Event::new(EventType::MouseDown).at(4, 2);
        let outcome = events.notify(EventType::MouseDown, &mut e);
        assert_eq!(outcome.invoked, 1);
        assert!(e.doit);
    }
}
