//! A worker thread "clicks" a button by raising native notifications on the
//! UI thread; the button's listener bumps a counter shown by a label.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;

use tether_core::prelude::*;
use tether_devtools::{Monitor, trace_listener};
use tether_platform::run_on_current_thread;

const BUTTON: NativeHandle = NativeHandle::from_raw(0x1001);
const LABEL: NativeHandle = NativeHandle::from_raw(0x1002);

thread_local! {
    static DISPLAY: RefCell<Option<Display>> = const { RefCell::new(None) };
}

fn with_display<R>(f: impl FnOnce(&Display) -> R) -> Option<R> {
    DISPLAY.with(|d| d.borrow().as_ref().map(f))
}

fn build(display: &Display) -> anyhow::Result<()> {
    let button = Widget::new(display, "Button")?;
    let label = Widget::new(display, "Label")?;
    display.attach_native(&button, BUTTON)?;
    display.attach_native(&label, LABEL)?;

    let count = Rc::new(Cell::new(0u32));
    button.set_data(Some(count.clone() as Rc<dyn Any>))?;
    button.add_listener(EventType::Selection, trace_listener("button"))?;
    button.on(EventType::Selection, move |e: &mut Event| {
        count.set(count.get() + 1);
        let Some(display) = e.widget.as_ref().map(|w| w.display().clone()) else {
            return;
        };
        let text = format!("clicked {} times", count.get());
        display.route(
            LABEL,
            EventType::Modify,
            Event::new(EventType::Modify).text_change(text, 0, 0),
        );
    })?;
    label.on(EventType::Modify, |e: &mut Event| log::info!("label: {}", e.text))?;
    Ok(())
}

fn clicks() -> u32 {
    with_display(|d| {
        d.find_widget(BUTTON)
            .and_then(|w| w.data())
            .and_then(|data| data.downcast_ref::<Cell<u32>>().map(Cell::get))
    })
    .flatten()
    .unwrap_or(0)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let display = run_on_current_thread(DispatcherConfig::from_env(), Headless, |dispatcher| {
        let display = Display::new(dispatcher.clone())?;
        build(&display)?;
        DISPLAY.with(|d| *d.borrow_mut() = Some(display.clone()));

        let worker = dispatcher.clone();
        thread::Builder::new().name("worker".into()).spawn(move || {
            for _ in 0..5 {
                let routed = worker.invoke(|| {
                    with_display(|d| {
                        d.route(BUTTON, EventType::Selection, Event::new(EventType::Selection))
                            .is_some()
                    })
                    .unwrap_or(false)
                });
                if !matches!(routed, Ok(true)) {
                    log::warn!("click was not delivered: {routed:?}");
                }
            }
            match worker.invoke(clicks) {
                Ok(n) => log::info!("worker observed {n} clicks"),
                Err(e) => log::error!("could not read counter: {e}"),
            }
            let mut monitor = Monitor::new(worker.clone());
            let widgets = worker
                .invoke(|| with_display(|d| d.registry().len()).unwrap_or(0))
                .unwrap_or(0);
            log::info!("{}", monitor.sample(widgets).report());
            worker.stop();
        })?;
        Ok(display)
    })?;

    display.dispose();
    DISPLAY.with(|d| d.borrow_mut().take());
    Ok(())
}
