/*!
Command-line access to Feetech STS servos on one serial bus.

```text
sts --port /dev/ttyUSB0 ping 1 2 3
sts move 1 2048 --speed 500
sts configure 1 --mode position --min 0 --max 4095
RUST_LOG=trace sts monitor 1 2 --skip-when-busy
```
*/

use {
    anyhow::{Context, Result},
    clap::{ArgAction, Parser, Subcommand, ValueEnum},
    embassy_futures::block_on,
    env_logger::Env,
    std::{
        io::BufRead,
        path::PathBuf,
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    },
    sts_driver::{Acquire, Configuration, Polled},
    sts_host::{Link, config::Config},
    sts_packet::{
        Id, Limits, Pid,
        control_table::{self, Item, OperatingMode, Register},
    },
};

#[derive(Parser)]
#[command(name = "sts")]
#[command(about = "Command Feetech STS serial bus servos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML file with `port`, `baud_rate`, `timeout_ms`, `settle_us`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baud_rate: Option<u32>,

    /// How long to wait for each reply, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause after each write, in microseconds
    #[arg(long)]
    settle_us: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that servos answer and report their model numbers
    Ping {
        #[arg(required = true, value_parser = parse_id)]
        ids: Vec<Id>,
    },
    /// Read one control-table register
    Read {
        #[arg(value_parser = parse_id)]
        id: Id,
        register: RegisterName,
    },
    /// Write one control-table register (EEPROM registers need `unlock` first)
    Write {
        #[arg(value_parser = parse_id)]
        id: Id,
        register: RegisterName,
        value: u16,
        /// Read the register back and fail on mismatch
        #[arg(long)]
        verify: bool,
    },
    /// Move to a goal position, checked against the servo's angle limits
    Move {
        #[arg(value_parser = parse_id)]
        id: Id,
        #[arg(allow_negative_numbers = true)]
        goal: i32,
        /// Zero means as fast as possible
        #[arg(long, default_value_t = 0)]
        speed: i32,
        #[arg(long, default_value_t = 0)]
        acceleration: u8,
    },
    Torque {
        #[arg(value_parser = parse_id)]
        id: Id,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Show the PID gains, or set all three
    Pid {
        #[arg(value_parser = parse_id)]
        id: Id,
        #[arg(requires_all = ["i", "d"])]
        p: Option<i64>,
        i: Option<i64>,
        d: Option<i64>,
    },
    /// Show the status register and present position
    Status {
        #[arg(value_parser = parse_id)]
        id: Id,
    },
    /// Set operating mode and angle limits (both zero for multi-turn)
    Configure {
        #[arg(value_parser = parse_id)]
        id: Id,
        #[arg(long, value_enum)]
        mode: Mode,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        min: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        max: i32,
    },
    ChangeId {
        #[arg(value_parser = parse_id)]
        old: Id,
        #[arg(value_parser = parse_id)]
        new: Id,
    },
    /// Poll position and speed in the background.
    /// Meanwhile, `<id> <goal>` lines on stdin move servos.
    Monitor {
        #[arg(required = true, value_parser = parse_id)]
        ids: Vec<Id>,
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        /// Skip a poll instead of waiting when a command is in flight
        #[arg(long)]
        skip_when_busy: bool,
    },
    /// Unlock EEPROM writes
    Unlock {
        #[arg(value_parser = parse_id)]
        id: Id,
    },
    Lock {
        #[arg(value_parser = parse_id)]
        id: Id,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Position,
    Wheel,
    Pwm,
    Step,
}

impl From<Mode> for OperatingMode {
    #[inline]
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Position => Self::Position,
            Mode::Wheel => Self::Wheel,
            Mode::Pwm => Self::Pwm,
            Mode::Step => Self::Step,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RegisterName {
    ModelNumber,
    Id,
    BaudRate,
    MinAngleLimit,
    MaxAngleLimit,
    Mode,
    TorqueEnable,
    Acceleration,
    GoalPosition,
    GoalTime,
    GoalSpeed,
    PidP,
    PidI,
    PidD,
    Lock,
    PresentPosition,
    PresentSpeed,
    PresentLoad,
    PresentVoltage,
    PresentTemperature,
    Status,
    Moving,
}

impl RegisterName {
    #[inline]
    const fn register(self) -> Register {
        use control_table as ct;
        match self {
            Self::ModelNumber => ct::ModelNumber::REGISTER,
            Self::Id => ct::Id::REGISTER,
            Self::BaudRate => ct::BaudRate::REGISTER,
            Self::MinAngleLimit => ct::MinAngleLimit::REGISTER,
            Self::MaxAngleLimit => ct::MaxAngleLimit::REGISTER,
            Self::Mode => ct::Mode::REGISTER,
            Self::TorqueEnable => ct::TorqueEnable::REGISTER,
            Self::Acceleration => ct::Acceleration::REGISTER,
            Self::GoalPosition => ct::GoalPosition::REGISTER,
            Self::GoalTime => ct::GoalTime::REGISTER,
            Self::GoalSpeed => ct::GoalSpeed::REGISTER,
            Self::PidP => ct::PidP::REGISTER,
            Self::PidI => ct::PidI::REGISTER,
            Self::PidD => ct::PidD::REGISTER,
            Self::Lock => ct::Lock::REGISTER,
            Self::PresentPosition => ct::PresentPosition::REGISTER,
            Self::PresentSpeed => ct::PresentSpeed::REGISTER,
            Self::PresentLoad => ct::PresentLoad::REGISTER,
            Self::PresentVoltage => ct::PresentVoltage::REGISTER,
            Self::PresentTemperature => ct::PresentTemperature::REGISTER,
            Self::Status => ct::Status::REGISTER,
            Self::Moving => ct::Moving::REGISTER,
        }
    }
}

fn parse_id(s: &str) -> Result<Id, String> {
    let raw: u8 = s.parse().map_err(|e| format!("{e}"))?;
    Id::new(raw).map_err(|e| e.to_string())
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(ref port) = self.port {
            config.port.clone_from(port);
        }
        if let Some(baud_rate) = self.baud_rate {
            config.baud_rate = baud_rate;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(settle_us) = self.settle_us {
            config.settle_us = settle_us;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.config()?;
    log::debug!("{config:?}");
    let link = sts_host::open(&config).context("Failed to open the servo bus")?;

    let result = run(&link, cli.command);
    let closed = block_on(link.shutdown()).context("Failed to shut down the servo bus");
    result.and(closed)
}

fn run(link: &Link, command: Command) -> Result<()> {
    match command {
        Command::Ping { ids } => {
            for id in ids {
                match block_on(link.ping(id)) {
                    Ok(ping) => match ping.model_number {
                        Some(model) => println!("{id}: model {model}"),
                        None => println!("{id}: present"),
                    },
                    Err(e) => println!("{id}: {e}"),
                }
            }
        }
        Command::Read { id, register } => {
            let register = register.register();
            let value = block_on(link.read(id, register))
                .with_context(|| format!("Failed to read {register} from servo {id}"))?;
            println!("{value}");
        }
        Command::Write {
            id,
            register,
            value,
            verify,
        } => {
            let register = register.register();
            if register.eeprom {
                log::info!("{register} is EEPROM-backed; it only sticks after `unlock`");
            }
            if verify {
                block_on(link.write_verified(id, register, value))
            } else {
                block_on(link.write(id, register, value)).map(drop)
            }
            .with_context(|| format!("Failed to write {value} to {register} on servo {id}"))?;
        }
        Command::Move {
            id,
            goal,
            speed,
            acceleration,
        } => {
            let limits = block_on(link.load_limits(id))
                .with_context(|| format!("Failed to read angle limits of servo {id}"))?;
            log::debug!("Servo {id}: limits {limits}");
            let _ack = block_on(link.set_position(id, goal, speed, acceleration))
                .with_context(|| format!("Failed to move servo {id}"))?;
        }
        Command::Torque { id, enabled } => {
            let _ack = block_on(link.set_torque(id, enabled))
                .with_context(|| format!("Failed to set torque on servo {id}"))?;
        }
        Command::Pid {
            id,
            p: Some(p),
            i: Some(i),
            d: Some(d),
        } => {
            let pid = Pid::new(p, i, d)?;
            let _ack = block_on(link.set_pid(id, pid))
                .with_context(|| format!("Failed to set PID gains on servo {id}"))?;
        }
        Command::Pid { id, .. } => {
            let pid = block_on(link.read_pid(id))
                .with_context(|| format!("Failed to read PID gains of servo {id}"))?;
            println!("{pid}");
        }
        Command::Status { id } => {
            let status = block_on(link.read_status(id))
                .with_context(|| format!("Failed to read the status of servo {id}"))?;
            let reading = block_on(link.read_position_speed(id))
                .with_context(|| format!("Failed to read the position of servo {id}"))?;
            println!("{id}: {status}; {reading}");
        }
        Command::Configure { id, mode, min, max } => {
            let configuration = Configuration {
                mode: mode.into(),
                limits: Limits { min, max },
            };
            block_on(link.reconfigure(id, configuration))
                .with_context(|| format!("Failed to configure servo {id}"))?;
        }
        Command::ChangeId { old, new } => {
            let ping = block_on(link.change_id(old, new))
                .with_context(|| format!("Failed to move servo {old} to ID {new}"))?;
            println!("{new}: {ping:?}");
        }
        Command::Monitor {
            ids,
            interval_ms,
            skip_when_busy,
        } => monitor(link, &ids, Duration::from_millis(interval_ms), skip_when_busy)?,
        Command::Unlock { id } => {
            let _ack = block_on(link.unlock(id))
                .with_context(|| format!("Failed to unlock servo {id}"))?;
        }
        Command::Lock { id } => {
            let _ack = block_on(link.lock(id))
                .with_context(|| format!("Failed to lock servo {id}"))?;
        }
    }
    Ok(())
}

/// Polls on a background thread while stdin drives foreground moves, both through the same link.
fn monitor(link: &Link, ids: &[Id], interval: Duration, skip_when_busy: bool) -> Result<()> {
    let acquire = if skip_when_busy {
        Acquire::Skip
    } else {
        Acquire::Blocking
    };
    for &id in ids {
        let _limits = block_on(link.load_limits(id))
            .with_context(|| format!("Failed to read angle limits of servo {id}"))?;
    }
    let done = AtomicBool::new(false);
    std::thread::scope(|scope| {
        let _poller = scope.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                for &id in ids {
                    match block_on(link.poll_position_speed(id, acquire)) {
                        Ok(Polled::Done(reading)) => println!("{id}: {reading}"),
                        Ok(Polled::Skipped) => log::debug!("Servo {id}: poll skipped"),
                        Err(e) => log::warn!("Servo {id}: {e}"),
                    }
                }
                std::thread::sleep(interval);
            }
        });
        let result = foreground(link);
        done.store(true, Ordering::Relaxed);
        result
    })
}

fn foreground(link: &Link) -> Result<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let mut words = line.split_whitespace();
        let (Some(id), Some(goal), None) = (words.next(), words.next(), words.next()) else {
            if !line.trim().is_empty() {
                log::warn!("Expected `<id> <goal>`, got {line:?}");
            }
            continue;
        };
        let id = match parse_id(id) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };
        let Ok(goal) = goal.parse::<i32>() else {
            log::warn!("Invalid goal {goal:?}");
            continue;
        };
        if let Err(e) = block_on(link.set_position(id, goal, 0, 0)) {
            log::warn!("Servo {id}: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "sts",
            "--port",
            "/dev/ttyACM1",
            "--timeout-ms",
            "50",
            "ping",
            "1",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.port, "/dev/ttyACM1");
        assert_eq!(config.timeout_ms, 50);
        assert_eq!(config.baud_rate, 1_000_000);
    }

    #[test]
    fn broadcast_id_is_refused() {
        assert!(Cli::try_parse_from(["sts", "ping", "254"]).is_err());
        assert!(Cli::try_parse_from(["sts", "ping", "253"]).is_ok());
    }

    #[test]
    fn negative_goal() {
        let cli = Cli::try_parse_from(["sts", "move", "1", "-1500", "--speed", "300"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Move {
                goal: -1500,
                speed: 300,
                acceleration: 0,
                ..
            }
        ));
    }

    #[test]
    fn pid_needs_all_three_gains() {
        assert!(Cli::try_parse_from(["sts", "pid", "1", "32"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["sts", "pid", "1"]).unwrap().command,
            Command::Pid { p: None, .. }
        ));
    }

    #[test]
    fn every_register_name_resolves() {
        for name in RegisterName::value_variants() {
            let register = name.register();
            assert!(!register.description.is_empty(), "{name:?}");
        }
    }
}
