use clap::Parser;
use core::cell::RefCell;
use embassy_executor::{Executor, Spawner};
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin, PinState};
use embedded_hal::i2c::{ErrorKind, ErrorType as I2cErrorType, I2c, NoAcknowledgeSource, Operation};
use embedded_hal_bus::i2c::RefCellDevice;
use mbr_core::mk_static;
use mbr_core::utils::controllers::{
    alarm::{Note, TonePlayer},
    display::{show_level, MatrixDisplay, MATRIX_SIZE},
    i2c::{register, MotorBoard},
    AlarmController, LightingController, MotionController,
};
use mbr_core::utils::sensors::{
    ultrasonic::MAX_RANGE_CM, DistanceSensor, PulseTimer, ReflectanceArray,
};
use mbr_core::utils::{Delay, RobotConfig, SystemCommand, SystemController, Timer, COMMAND_CHANNEL};
use smart_leds_trait::{SmartLedsWrite, RGB8};
use static_cell::StaticCell;
use std::convert::Infallible;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON file overriding robot parameters
    #[clap(long)]
    config: Option<PathBuf>,
    /// simulate a switched-off motor board (every transfer is NACKed)
    #[clap(long)]
    absent: bool,
    /// raw line sensor byte answered by the simulated board (active low)
    #[clap(long, default_value = "0xFF", value_parser = parse_byte)]
    ir_raw: u8,
    /// echo pulse width of the simulated range finder, none = no echo
    #[clap(long)]
    echo_us: Option<u32>,
    /// pause between two commands
    #[clap(long, default_value_t = 250)]
    step_ms: u64,
    /// JSON commands, e.g. '{"ct":"m","mc":"arc_left","r":0.2}'
    commands: Vec<String>,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid byte {s:?}: {e}"))
}

/// Motor board stand-in that decodes and logs every frame.
struct SimBoard {
    address: u8,
    absent: bool,
    ir_raw: u8,
}

impl I2cErrorType for SimBoard {
    type Error = ErrorKind;
}

impl I2c for SimBoard {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.absent || address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.on_write(bytes),
                Operation::Read(buf) => buf.fill(self.ir_raw),
            }
        }
        Ok(())
    }
}

impl SimBoard {
    fn on_write(
        &self,
        bytes: &[u8],
    ) {
        match *bytes {
            [register::MOTORS, ld, ls, rd, rs] => {
                info!("motors: left dir={} speed={} | right dir={} speed={}", ld, ls, rd, rs)
            }
            [reg @ (0x00 | 0x02), dir, speed] => {
                info!("motor {}: dir={} speed={}", reg / 2, dir, speed)
            }
            [register::LED_LEFT, v] => info!("left LED {}", if v != 0 { "on" } else { "off" }),
            [register::LED_RIGHT, v] => info!("right LED {}", if v != 0 { "on" } else { "off" }),
            [register::LINE_STATUS] => debug!("line sensor selected"),
            [] => debug!("probe"),
            _ => warn!("unknown frame {:02X?}", bytes),
        }
    }
}

/// RGB strip driver that logs to console.
struct ConsoleStrip;

impl SmartLedsWrite for ConsoleStrip {
    type Error = Infallible;
    type Color = RGB8;

    fn write<T, I>(
        &mut self,
        iterator: T,
    ) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let pixels: Vec<RGB8> = iterator.into_iter().map(Into::into).collect();
        info!("RGB: {:?}", pixels);
        Ok(())
    }
}

/// Buzzer that logs instead of playing.
struct ConsoleBuzzer;

impl TonePlayer for ConsoleBuzzer {
    fn play(
        &mut self,
        melody: &'static [Note],
        repeat: bool,
    ) {
        info!(notes = melody.len(), repeat, "buzzer: melody");
    }

    fn pitch(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
    ) {
        info!("buzzer: {} Hz for {} ms", frequency_hz, duration_ms);
    }

    fn stop(&mut self) {
        info!("buzzer: stop");
    }
}

struct ConsoleTrigger;

impl PinErrorType for ConsoleTrigger {
    type Error = Infallible;
}

impl OutputPin for ConsoleTrigger {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("trigger low");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("trigger high");
        Ok(())
    }
}

/// Echo line answering with a fixed pulse width.
struct SimEcho {
    width_us: Option<u32>,
}

impl PulseTimer for SimEcho {
    fn pulse_width_us(
        &mut self,
        _level: PinState,
        timeout_us: u32,
    ) -> Option<u32> {
        self.width_us.filter(|&us| us <= timeout_us)
    }
}

/// LED matrix printed as text.
#[derive(Default)]
struct ConsoleMatrix {
    cells: [[u8; MATRIX_SIZE]; MATRIX_SIZE],
}

impl MatrixDisplay for ConsoleMatrix {
    fn clear(&mut self) {
        self.cells = Default::default();
    }

    fn set_pixel(
        &mut self,
        x: usize,
        y: usize,
        brightness: u8,
    ) {
        self.cells[y][x] = brightness;
    }
}

impl ConsoleMatrix {
    fn render(&self) {
        for row in &self.cells {
            let line: String = row.iter().map(|&b| if b > 0 { '#' } else { '.' }).collect();
            info!("matrix |{}|", line);
        }
    }
}

type Board = RefCellDevice<'static, SimBoard>;
type Robot = SystemController<Board, ConsoleStrip, ConsoleBuzzer, Delay, ConsoleTrigger, SimEcho>;

#[embassy_executor::task]
async fn command_task(robot: &'static mut Robot) -> ! {
    robot.command_ch().await
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
    config: RobotConfig,
) {
    let i2c_bus = mk_static!(
        RefCell<SimBoard>,
        RefCell::new(SimBoard {
            address: config.motor_address,
            absent: opts.absent,
            ir_raw: opts.ir_raw,
        })
    );
    let board = || MotorBoard::with_address(RefCellDevice::new(i2c_bus), config.motor_address);

    if !board().probe() {
        warn!("continuing without motor board, bus commands will fail");
    }

    let robot = mk_static!(
        Robot,
        SystemController::new(
            MotionController::new(board(), &config),
            LightingController::new(board(), ConsoleStrip),
            AlarmController::new(ConsoleBuzzer, Delay, &config),
            DistanceSensor::new(
                ConsoleTrigger,
                SimEcho {
                    width_us: opts.echo_us,
                },
                Delay,
            ),
            ReflectanceArray::new(board()),
        )
    );

    if let Err(e) = robot.reset_outputs() {
        error!("could not reset outputs: {}", e);
    }

    let reading = robot.distance.measure_cm();
    info!(cm = ?reading.cm(), "startup range check");
    let mut matrix = ConsoleMatrix::default();
    match show_level(&mut matrix, f32::from(reading.raw()), f32::from(MAX_RANGE_CM)) {
        Ok(_) => matrix.render(),
        Err(e) => error!("level display failed: {}", e),
    }

    if let Err(e) = spawner.spawn(command_task(robot)) {
        error!("failed to spawn command task: {:?}", e);
        return;
    }

    for raw in &opts.commands {
        match SystemCommand::from_json(raw.as_bytes()) {
            Ok(cmd) => COMMAND_CHANNEL.send(cmd).await,
            Err(e) => error!("skipping {:?}: {}", raw, e),
        }
        Timer::after_millis(opts.step_ms).await;
    }
    info!("all commands sent");
}

fn load_config(path: Option<&PathBuf>) -> Result<RobotConfig, String> {
    let Some(path) = path else {
        return Ok(RobotConfig::default());
    };
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("{}: {e}", path.display()))
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let config = match load_config(opts.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid config: {}", e);
            std::process::exit(2);
        }
    };
    info!(?config, "starting mock MCU");

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        if let Err(e) = spawner.spawn(main_task(spawner, opts, config)) {
            error!("failed to spawn main task: {:?}", e);
        }
    });
}
