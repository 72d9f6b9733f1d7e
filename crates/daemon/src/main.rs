use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Arg, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imu_daemon::link::{router, Link};
use imu_daemon::{config, control, streaming};
use imu_sensor::{DriverError, ImuBus, MockBus, Mpu6050, RppalBus, RunGate, Sampler, QUEUE_DEPTH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imu_daemon=info,imu_sensor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("IMU daemon starting...");

    // --- Argument Parsing ---
    let matches = Command::new("imu_daemon")
        .about("Dual-IMU acquisition and streaming daemon")
        .arg(
            Arg::new("mock")
                .long("mock")
                .action(clap::ArgAction::SetTrue)
                .help("Use a mock sensor bus instead of real hardware"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .default_value("imu_daemon.json")
                .help("Path to the configuration file"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").expect("has a default");
    let config = config::load_config(config_path);

    // --- Bus selection ---
    let mut bus: Box<dyn ImuBus> = if matches.get_flag("mock") {
        tracing::info!("using mock sensor bus");
        Box::new(MockBus::new())
    } else {
        Box::new(RppalBus::new(config.i2c_bus)?)
    };

    let sensor_a = Mpu6050::new(config.sensor_a_addr);
    let sensor_b = Mpu6050::new(config.sensor_b_addr);

    // --- Startup validation gate ---
    // Wake both sensors, then self-test. A sensor that fails validation is
    // fatal to the pipeline: nothing else starts.
    for sensor in [&sensor_a, &sensor_b] {
        if let Err(e) = sensor.wake(bus.as_mut()) {
            tracing::error!("failed to wake sensor 0x{:02X}: {}", sensor.addr(), e);
        }
    }
    for sensor in [&sensor_a, &sensor_b] {
        if let Err(e) = sensor.validate(bus.as_mut()) {
            failure_indication_loop(e);
        }
    }
    tracing::info!("both sensors validated");

    // --- Pipeline wiring ---
    let gate = Arc::new(RunGate::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (packet_tx, packet_rx) = flume::bounded(QUEUE_DEPTH);
    let (event_tx, event_rx) = flume::bounded(16);

    let sampler = Sampler::new(
        bus,
        sensor_a,
        sensor_b,
        gate.clone(),
        packet_tx,
        shutdown.clone(),
    );
    let sampler_handle = sampler.spawn()?;

    let link = Arc::new(Link::new(event_tx));
    tokio::spawn(control::run(event_rx, gate.clone(), link.clone()));
    tokio::spawn(streaming::run(packet_rx, link.clone()));

    // --- Link server ---
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(link).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // --- Graceful Shutdown ---
    tracing::info!("shutdown signal received, stopping acquisition...");
    shutdown.store(true, Ordering::Relaxed);
    let _ = sampler_handle.join();
    tracing::info!("IMU daemon stopped gracefully.");

    Ok(())
}

/// Startup validation failed: refuse to start the pipeline and keep the
/// failure visible until the process is restarted.
fn failure_indication_loop(error: DriverError) -> ! {
    loop {
        tracing::error!("sensor validation failed: {}; pipeline not started", error);
        std::thread::sleep(Duration::from_secs(1));
    }
}
