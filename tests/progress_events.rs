use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use cubenames::{
    ComposeError, ComposerConfig, DisplayProperties, ProgressEvent, SerialNumber, SerialResolver,
};

/// Resolver that takes a few milliseconds per item so a short-interval
/// bridge observes intermediate counts.
struct SlowResolver {
    delay: Duration,
}

impl SerialResolver for SlowResolver {
    fn resolve(&self, cube_id: &str) -> Result<SerialNumber, ComposeError> {
        std::thread::sleep(self.delay);
        Ok(format!("SN::{cube_id}"))
    }
}

fn drain_until_finished(events: &mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut seen = Vec::new();
    loop {
        match events.recv_timeout(Duration::from_secs(10)) {
            Ok(event) => {
                let finished = event == ProgressEvent::Finished;
                seen.push(event);
                if finished {
                    return seen;
                }
            }
            Err(_) => panic!("timed out waiting for composition to finish"),
        }
    }
}

#[test]
fn events_are_ordered_monotonic_and_bounded() {
    let total = 20usize;
    let service = DisplayProperties::with_config(
        Arc::new(SlowResolver {
            delay: Duration::from_millis(2),
        }),
        ComposerConfig {
            poll_interval: Duration::from_millis(5),
        },
    );
    let events = service.subscribe();

    let ids: Vec<String> = (0..total).map(|idx| format!("/a/{idx}.img")).collect();
    service.set_cube_list(ids);
    let seen = drain_until_finished(&events);

    // The range announcement comes first and exactly once.
    assert_eq!(
        seen.first(),
        Some(&ProgressEvent::RangeChanged { min: 0, max: total })
    );
    let range_count = seen
        .iter()
        .filter(|event| matches!(event, ProgressEvent::RangeChanged { .. }))
        .count();
    assert_eq!(range_count, 1);

    // Progress values never decrease and never exceed the announced max.
    let changes: Vec<usize> = seen
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Changed(count) => Some(*count),
            _ => None,
        })
        .collect();
    assert!(!changes.is_empty());
    assert!(changes.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(changes.iter().all(|count| *count <= total));
    assert_eq!(changes.last(), Some(&total));

    // Finished terminates the stream, exactly once.
    assert_eq!(seen.last(), Some(&ProgressEvent::Finished));
    let finished_count = seen
        .iter()
        .filter(|event| **event == ProgressEvent::Finished)
        .count();
    assert_eq!(finished_count, 1);

    // By the time Finished is observed, the result is readable.
    assert_eq!(
        service.get_serial_number("/a/0.img").as_deref(),
        Some("SN::/a/0.img")
    );
}

#[test]
fn an_empty_batch_still_announces_its_range_and_finishes() {
    let service = DisplayProperties::with_config(
        Arc::new(SlowResolver {
            delay: Duration::from_millis(1),
        }),
        ComposerConfig {
            poll_interval: Duration::from_millis(5),
        },
    );
    let events = service.subscribe();

    service.set_cube_list(Vec::new());
    let seen = drain_until_finished(&events);

    assert_eq!(
        seen.first(),
        Some(&ProgressEvent::RangeChanged { min: 0, max: 0 })
    );
    assert_eq!(seen.last(), Some(&ProgressEvent::Finished));
    assert!(seen
        .iter()
        .all(|event| !matches!(event, ProgressEvent::Changed(_))));
    assert!(service.keymap().is_empty());
}

#[test]
fn late_subscribers_only_see_later_jobs() {
    let service = DisplayProperties::with_config(
        Arc::new(SlowResolver {
            delay: Duration::from_millis(1),
        }),
        ComposerConfig {
            poll_interval: Duration::from_millis(5),
        },
    );

    let early = service.subscribe();
    service.set_cube_list(vec!["/a/1.img".to_string()]);
    // Finished is the bridge's last emission, so after observing it the
    // first job can produce no further events.
    drain_until_finished(&early);

    let events = service.subscribe();
    assert!(events.try_recv().is_err());

    service.set_cube_list(vec!["/b/2.img".to_string()]);
    let seen = drain_until_finished(&events);
    assert_eq!(
        seen.first(),
        Some(&ProgressEvent::RangeChanged { min: 0, max: 1 })
    );
}
