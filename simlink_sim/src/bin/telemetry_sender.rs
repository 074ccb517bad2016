// simlink_sim/src/bin/telemetry_sender.rs

//! Publishes a fixed set of sample values on the telemetry channel, one
//! cycle per interval, so subscribers can be tested without a scene.
//!
//! `cargo run --bin telemetry_sender -- --bind 127.0.0.1:5556`

use std::time::Duration;

use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*};
use clap::Parser;
use simlink_core::transport::{TelemetryPublisher, TelemetryValue};

#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about = "Publishes sample telemetry values", long_about = None)]
struct SenderCli {
    /// Address subscribers connect to.
    #[arg(short, long, default_value = "127.0.0.1:5556")]
    bind: String,

    /// Pause between publish cycles, in milliseconds.
    #[arg(short, long, default_value_t = 3000)]
    interval_ms: u64,

    /// Stop after this many cycles. Runs forever if omitted.
    #[arg(short, long)]
    cycles: Option<u64>,
}

#[derive(Resource)]
struct SampleSender {
    publisher: TelemetryPublisher,
    next_id: i32,
    cycles_done: u64,
}

/// One cycle worth of titled sample values, one of each payload type.
fn sample_values() -> Vec<(&'static str, TelemetryValue)> {
    vec![
        ("temperature", TelemetryValue::Float(23.5)),
        ("counter", TelemetryValue::Int(42)),
        ("pi_value", TelemetryValue::Double(std::f64::consts::PI)),
        ("is_ready", TelemetryValue::Bool(true)),
        ("sensor_readings", TelemetryValue::Floats(vec![1.1, 2.2, 3.3, 4.4])),
        ("device_counters", TelemetryValue::Ints(vec![10, 20, 30, 40, 50])),
        (
            "precise_measurements",
            TelemetryValue::Doubles(vec![1.5, 2.5, 3.5, 4.5]),
        ),
        (
            "text_messages",
            TelemetryValue::Strings(
                ["hello", "world", "from", "rust"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
        ),
    ]
}

fn main() -> AppExit {
    let cli = SenderCli::parse();
    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level: bevy::log::Level::INFO,
        filter: "info,simlink_core=debug".to_string(),
        ..default()
    });

    let publisher = match TelemetryPublisher::bind(cli.bind.as_str()) {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("Failed to bind telemetry publisher on {}: {}", cli.bind, e);
            return AppExit::error();
        }
    };

    let interval = Duration::from_millis(cli.interval_ms);
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(interval)))
        .insert_resource(SampleSender {
            publisher,
            next_id: 0,
            cycles_done: 0,
        })
        .insert_resource(cli)
        .add_systems(Update, publish_cycle);

    info!("Telemetry sender started");
    app.run()
}

fn publish_cycle(
    mut sender: ResMut<SampleSender>,
    cli: Res<SenderCli>,
    mut exit: EventWriter<AppExit>,
) {
    for (title, value) in sample_values() {
        let id = sender.next_id;
        let delivered = sender.publisher.publish(id, title, &value);
        debug!("Sent '{}' (id {}) to {} subscribers", title, id, delivered);
        sender.next_id = sender.next_id.wrapping_add(1);
    }
    sender.cycles_done += 1;
    info!(
        "Cycle {} published, {} subscribers connected",
        sender.cycles_done,
        sender.publisher.subscriber_count()
    );

    if cli.cycles.is_some_and(|limit| sender.cycles_done >= limit) {
        exit.write(AppExit::Success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_core::transport::TelemetrySubscriber;

    #[test]
    fn test_cycle_covers_every_payload_type() {
        let values = sample_values();
        assert_eq!(values.len(), 8);
        assert!(values
            .iter()
            .any(|(_, v)| matches!(v, TelemetryValue::Strings(s) if s.len() == 4)));
    }

    #[test]
    fn test_subscriber_receives_one_cycle() {
        let publisher = TelemetryPublisher::bind("127.0.0.1:0").unwrap();
        let addr = publisher.local_addr().unwrap();
        let mut subscriber = TelemetrySubscriber::connect(addr)
            .unwrap()
            .with_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let mut app = App::new();
        app.insert_resource(SampleSender {
            publisher,
            next_id: 0,
            cycles_done: 0,
        })
        .insert_resource(SenderCli::parse_from(["telemetry_sender", "--cycles", "1"]))
        .add_event::<AppExit>()
        .add_systems(Update, publish_cycle);

        // The listener is non-blocking; give the connect a moment to land.
        std::thread::sleep(Duration::from_millis(50));
        app.update();

        let first = subscriber.recv().unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.title, "temperature");
        assert_eq!(first.as_f32s(), vec![23.5]);
        let second = subscriber.recv().unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(second.payload, 42i32.to_le_bytes().to_vec());
        assert_eq!(app.world().resource::<SampleSender>().cycles_done, 1);
    }
}
