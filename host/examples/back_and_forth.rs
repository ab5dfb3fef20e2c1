//! Swings one servo between two goals inside its angle limits, printing where it is along the way.
//!
//! ```text
//! cargo run --example back_and_forth -- /dev/ttyUSB0 1
//! ```

use {
    anyhow::Context,
    embassy_futures::block_on,
    env_logger::Env,
    std::time::Duration,
    sts_host::config::Config,
    sts_packet::Id,
};

const SWINGS: usize = 4;
const SPEED: i32 = 1_000;
const POLLS_PER_SWING: usize = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let mut args = std::env::args().skip(1);
    let mut config = Config::default();
    if let Some(port) = args.next() {
        config.port = port;
    }
    let id = match args.next() {
        Some(id) => Id::new(id.parse().context("Servo ID must be a number")?)?,
        None => Id::new(1)?,
    };

    let link = sts_host::open(&config)?;
    let servo = link.servo(id);
    let result = (|| -> anyhow::Result<()> {
        let limits = block_on(servo.load_limits())?;
        let (low, high) = if limits.is_multi_turn() {
            (-2_048, 2_048)
        } else {
            let quarter = (limits.max - limits.min) / 4;
            (limits.min + quarter, limits.max - quarter)
        };
        log::info!("Servo {id}: limits {limits}, swinging between {low} and {high}");
        let _ack = block_on(servo.set_torque(true))?;
        for swing in 0..SWINGS {
            let goal = if swing % 2 == 0 { high } else { low };
            let _ack = block_on(servo.set_position(goal, SPEED, 0))?;
            for _ in 0..POLLS_PER_SWING {
                std::thread::sleep(POLL_INTERVAL);
                let reading = block_on(servo.read_position_speed())?;
                println!("{reading}");
            }
        }
        Ok(())
    })();
    block_on(link.shutdown())?;
    result
}
