use std::thread;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_channel::{ChannelBuilder, Payload};
use tracing::info;

fn main() {
    tracing_subscriber::fmt::init();

    let rx = ChannelBuilder::new()
        .with_buffer_size(Some(256))
        .with_timestamps(true)
        .install()
        .expect("failed to install channel exporter");

    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        while let Ok(message) = rx.recv_timeout(Duration::from_millis(250)) {
            received += 1;
            match message.payload() {
                Payload::Reset => info!(metric = message.metric_name(), "reset"),
                payload => info!(metric = message.metric_name(), %payload, "update"),
            }
        }
        received
    });

    for i in 0..10u32 {
        counter!("demo.loops").increment(1);
        gauge!("demo.depth", "shard" => "a").set(f64::from(i % 4));
        histogram!("demo.sleep_ms").record(25.0);
        thread::sleep(Duration::from_millis(25));
    }

    // The installed recorder holds the sender for the life of the process, so the consumer stops
    // once the channel has been idle for a while rather than on disconnect.
    let received = consumer.join().expect("consumer thread panicked");
    info!(received, "consumer finished");
}
