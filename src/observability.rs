use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("composer.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("composer.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("composer.client.request_duration_seconds");

pub(crate) static SESSION_CREATIONS: Counter = Counter::new("composer.session.creations");
pub(crate) static SESSION_CREATION_FAILURES: Counter =
    Counter::new("composer.session.creation_failures");
pub(crate) static SESSION_REUSES: Counter = Counter::new("composer.session.reuses");

pub(crate) static STREAM_BYTES: Counter = Counter::new("composer.stream.bytes");
pub(crate) static STREAM_FRAMES: Counter = Counter::new("composer.stream.frames");
pub(crate) static STREAM_MALFORMED_FRAMES: Counter =
    Counter::new("composer.stream.malformed_frames");
pub(crate) static STREAM_DURATION: Moments = Moments::new("composer.stream.duration_seconds");

pub(crate) static SEND_REQUESTS: Counter = Counter::new("composer.send.requests");
pub(crate) static SEND_FAILURES: Counter = Counter::new("composer.send.failures");
pub(crate) static SEND_CANCELLATIONS: Counter = Counter::new("composer.send.cancellations");
pub(crate) static SEND_QUEUE_WAIT: Moments = Moments::new("composer.send.queue_wait_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&SESSION_CREATIONS);
    collector.register_counter(&SESSION_CREATION_FAILURES);
    collector.register_counter(&SESSION_REUSES);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_MALFORMED_FRAMES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SEND_REQUESTS);
    collector.register_counter(&SEND_FAILURES);
    collector.register_counter(&SEND_CANCELLATIONS);
    collector.register_moments(&SEND_QUEUE_WAIT);
}
