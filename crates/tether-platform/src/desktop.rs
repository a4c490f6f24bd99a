//! winit integration: the event loop owns the UI thread and the dispatcher is
//! drained whenever work arrives.

use std::sync::Mutex;

use tether_core::*;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::WindowId;

/// User event posted to the winit loop when the dispatcher has new work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wake;

pub struct WinitBootstrap {
    proxy: Mutex<Option<EventLoopProxy<Wake>>>,
}

impl WinitBootstrap {
    pub fn new(proxy: EventLoopProxy<Wake>) -> Self {
        Self {
            proxy: Mutex::new(Some(proxy)),
        }
    }
}

impl NativeBootstrap for WinitBootstrap {
    fn toolkit(&self) -> &str {
        "winit"
    }

    fn wake(&self) {
        if let Ok(guard) = self.proxy.lock() {
            if let Some(proxy) = guard.as_ref() {
                // Closed loop: nothing left to wake.
                let _ = proxy.send_event(Wake);
            }
        }
    }

    fn shutdown(&self) {
        if let Ok(mut guard) = self.proxy.lock() {
            guard.take();
        }
    }
}

struct Pump {
    dispatcher: Dispatcher,
}

impl Pump {
    fn drain(&self, el: &ActiveEventLoop) {
        match self.dispatcher.drain_pending() {
            Ok(true) => {
                log::info!("dispatcher stopped; leaving winit loop");
                el.exit();
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("dispatcher drain failed: {e}");
                el.exit();
            }
        }
    }
}

impl ApplicationHandler<Wake> for Pump {
    fn resumed(&mut self, el: &ActiveEventLoop) {
        el.set_control_flow(ControlFlow::Wait);
        // Work queued during setup.
        self.drain(el);
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: WindowId, _event: WindowEvent) {
        // Windows belong to widget bindings, which route their own events.
    }

    fn user_event(&mut self, el: &ActiveEventLoop, _event: Wake) {
        self.drain(el);
    }
}

/// Builds a winit event loop on the calling thread, makes it the UI thread,
/// runs `setup`, and pumps the dispatcher from the loop until stopped.
pub fn run_desktop_loop<T>(
    config: DispatcherConfig,
    setup: impl FnOnce(&Dispatcher) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let event_loop = EventLoop::<Wake>::with_user_event().build()?;
    let dispatcher = Dispatcher::new(config, WinitBootstrap::new(event_loop.create_proxy()));
    dispatcher.initialize()?;

    let state = match setup(&dispatcher) {
        Ok(state) => state,
        Err(e) => {
            dispatcher.stop();
            return Err(e);
        }
    };

    dispatcher.attach_native_loop()?;
    let mut pump = Pump {
        dispatcher: dispatcher.clone(),
    };
    event_loop.run_app(&mut pump)?;

    // The loop can also end on its own (last window closed, OS quit).
    if dispatcher.state() != DispatcherState::Stopped {
        dispatcher.stop();
        dispatcher.drain_pending()?;
    }
    Ok(state)
}
