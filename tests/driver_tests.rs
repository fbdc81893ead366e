use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::Level;
use parking_lot::Mutex;
use pird::{
    DriverConfig, DriverLogger, EventCallback, LogSink, MockGpio, Mode, PirOptions, SensorDriver,
    SensorEvent,
};
use serde_json::json;

type Events = Arc<Mutex<Vec<SensorEvent>>>;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl LogSink for RecordingSink {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

fn recorder() -> (EventCallback, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (Arc::new(move |event| sink.lock().push(event)), events)
}

fn sample_gpio() -> MockGpio {
    MockGpio::new()
        .with_chip(0, "raspberrypi-exp-gpio")
        .with_chip(1, "pinctrl-bcm2711")
}

fn build(
    json: &str,
    gpio_unsupported: bool,
    gpio: &MockGpio,
) -> (SensorDriver, Events, Arc<RecordingSink>) {
    let (callback, events) = recorder();
    let sink = Arc::new(RecordingSink::default());
    let log = DriverLogger::new(sink.clone(), false);
    let options: PirOptions = serde_json::from_str(json).expect("valid options json");
    let config = DriverConfig::resolve(options, gpio_unsupported, &log);
    let driver = SensorDriver::from_config(config, Arc::new(gpio.clone()), callback, log);
    (driver, events, sink)
}

#[tokio::test(start_paused = true)]
async fn disabled_line_never_touches_hardware() {
    let gpio = sample_gpio().with_values(&[1, 1, 1]);
    let (driver, events, sink) = build(r#"{ "gpio": 0 }"#, false, &gpio);

    driver.start();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!driver.is_running());
    assert!(events.lock().is_empty());
    assert!(gpio.probed().is_empty());
    assert_eq!(gpio.reads(), 0);
    assert!(
        sink.lines
            .lock()
            .iter()
            .any(|(level, msg)| *level == Level::Info && msg == "Disabled.")
    );
}

#[tokio::test(start_paused = true)]
async fn unsupported_platform_never_starts() {
    let gpio = sample_gpio();
    let (driver, events, _) = build(r#"{ "gpio": 21 }"#, true, &gpio);

    assert!(driver.config().is_disabled());
    driver.start();
    assert!(!driver.is_running());
    assert!(events.lock().is_empty());
    assert!(gpio.probed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_without_start_is_silent() {
    let gpio = sample_gpio();
    let (driver, events, _) = build("{}", false, &gpio);

    driver.stop();
    driver.stop();
    assert!(events.lock().is_empty());
    assert!(!gpio.is_released());
}

#[tokio::test(start_paused = true)]
async fn double_stop_emits_stopped_once() {
    let gpio = sample_gpio();
    let (driver, events, _) = build("{}", false, &gpio);

    driver.start();
    driver.stop();
    driver.stop();

    assert_eq!(
        *events.lock(),
        vec![SensorEvent::Started, SensorEvent::Stopped]
    );
    assert!(gpio.is_released());
}

#[tokio::test(start_paused = true)]
async fn start_while_running_is_ignored() {
    let gpio = sample_gpio();
    let (driver, events, _) = build("{}", false, &gpio);

    driver.start();
    driver.start();

    assert_eq!(*events.lock(), vec![SensorEvent::Started]);
    assert_eq!(gpio.probed(), vec![0, 1]);
    driver.stop();
}

#[tokio::test(start_paused = true)]
async fn invalid_mode_falls_back_to_direct_line() {
    let gpio = sample_gpio().with_values(&[1]);
    let (driver, events, sink) = build(r#"{ "mode": 42 }"#, false, &gpio);

    assert_eq!(driver.config().mode, Mode::DirectLine);
    assert!(
        sink.lines
            .lock()
            .iter()
            .any(|(level, msg)| *level == Level::Warn && msg.contains("mode: 42"))
    );

    driver.start();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        *events.lock(),
        vec![SensorEvent::Started, SensorEvent::Detected]
    );
    assert_eq!(gpio.requested(), Some((1, 21)));
    driver.stop();
}

#[tokio::test(start_paused = true)]
async fn callback_may_stop_the_driver() {
    let gpio = sample_gpio().with_values(&[1]);
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<OnceLock<Arc<SensorDriver>>> = Arc::new(OnceLock::new());

    let callback: EventCallback = {
        let events = events.clone();
        let slot = slot.clone();
        Arc::new(move |event| {
            let started = event == SensorEvent::Started;
            events.lock().push(event);
            if started && let Some(driver) = slot.get() {
                driver.stop();
            }
        })
    };

    let log = DriverLogger::default();
    let config = DriverConfig::resolve(PirOptions::default(), false, &log);
    let driver = Arc::new(SensorDriver::from_config(
        config,
        Arc::new(gpio.clone()),
        callback,
        log,
    ));
    let _ = slot.set(driver.clone());

    driver.start();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!driver.is_running());
    assert!(gpio.is_released());
    assert_eq!(gpio.reads(), 0);
    assert_eq!(
        *events.lock(),
        vec![SensorEvent::Started, SensorEvent::Stopped]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_from_another_thread_between_started_and_polling() {
    let gpio = sample_gpio().with_values(&[1, 1, 1, 1]);
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let slot: Arc<OnceLock<Arc<SensorDriver>>> = Arc::new(OnceLock::new());

    let callback: EventCallback = {
        let events = events.clone();
        let slot = slot.clone();
        Arc::new(move |event| {
            let started = event == SensorEvent::Started;
            events.lock().push(event);
            if started && let Some(driver) = slot.get() {
                // a foreign thread lands its stop() before start() arms the poller
                let driver = driver.clone();
                std::thread::spawn(move || driver.stop())
                    .join()
                    .expect("stop thread");
            }
        })
    };

    let log = DriverLogger::default();
    let options: PirOptions =
        serde_json::from_str(r#"{ "poll_interval_ms": 20 }"#).expect("valid options json");
    let config = DriverConfig::resolve(options, false, &log);
    let driver = Arc::new(SensorDriver::from_config(
        config,
        Arc::new(gpio.clone()),
        callback,
        log,
    ));
    let _ = slot.set(driver.clone());

    driver.start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!driver.is_running());
    assert!(gpio.is_released());
    assert_eq!(gpio.reads(), 0);
    assert_eq!(
        *events.lock(),
        vec![SensorEvent::Started, SensorEvent::Stopped]
    );
}

#[test]
fn events_serialize_as_tagged_json() {
    assert_eq!(
        serde_json::to_value(SensorEvent::Detected).expect("serialize"),
        json!({ "event": "detected" })
    );
    assert_eq!(
        serde_json::to_value(SensorEvent::Error("No Chip Found".into())).expect("serialize"),
        json!({ "event": "error", "message": "No Chip Found" })
    );
}
