pub mod bus;
pub mod event;

pub use bus::{EventBus, SubscriptionId};
pub use event::{Event, EventData, EventType};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let start = std::time::Instant::now();
        while !cond() && start.elapsed() < Duration::from_secs(2) {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn delivers_to_subscriber_in_fifo_order() {
        let bus = EventBus::new();
        bus.start().unwrap();

        let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        bus.subscribe(EventType::EcgPeak, move |event| {
            if let EventData::EcgPeak { bpm, .. } = event.data {
                received_clone.lock().push(bpm as u32);
            }
        });

        for bpm in [60, 61, 62, 63] {
            bus.publish(EventData::EcgPeak {
                amplitude: 1.0,
                dir: 1,
                bpm: bpm as f32,
            });
        }

        wait_until(|| received.lock().len() == 4);
        assert_eq!(*received.lock(), vec![60, 61, 62, 63]);

        bus.stop().unwrap();
    }

    #[test]
    fn at_most_once_per_subscription() {
        let bus = EventBus::new();
        bus.start().unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let id = bus.subscribe(EventType::VoiceNoise, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(EventData::VoiceNoise { snr_db: 10.0 });
        wait_until(|| count.load(Ordering::SeqCst) == 1);

        bus.unsubscribe(EventType::VoiceNoise, id);
        bus.publish(EventData::VoiceNoise { snr_db: 10.0 });
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        bus.stop().unwrap();
    }

    #[test]
    fn panicking_subscriber_does_not_stop_dispatch() {
        let bus = EventBus::new();
        bus.start().unwrap();

        bus.subscribe(EventType::EcgError, |_| panic!("boom"));

        let recovered = Arc::new(AtomicUsize::new(0));
        let recovered_clone = Arc::clone(&recovered);
        bus.subscribe(EventType::EcgError, move |_| {
            recovered_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(EventData::EcgError {
            message: "test".into(),
        });
        wait_until(|| recovered.load(Ordering::SeqCst) == 1);
        assert_eq!(recovered.load(Ordering::SeqCst), 1);
        assert!(bus.is_running());

        bus.stop().unwrap();
    }

    #[test]
    fn shutdown_flushes_pending_events() {
        let bus = EventBus::new();
        bus.start().unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        bus.subscribe(EventType::PlaybackStart, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10 {
            bus.publish(EventData::PlaybackStart {
                command: "JUMP".into(),
            });
        }
        bus.stop().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}
