use core::cell::{Cell, RefCell};
use std::rc::Rc;

use embedded_hal::{
    delay::DelayNs,
    digital::PinState as Level,
    i2c::{ErrorKind, NoAcknowledgeSource},
};
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_mock::eh1::{
    digital::{Mock as PinMock, State as PinState, Transaction as PinTrans},
    i2c::{Mock as I2cMock, Transaction as I2cTrans},
};
use mbr_core::utils::{
    controllers::{
        alarm::{AlarmController, Note, TonePlayer, ALARM_MELODY},
        i2c::{MotorBoard, Wheel},
        leds::{LightingController, StripPosition},
        motion::MotionController,
        SensorReading, SystemCommand, SystemController,
    },
    error::{DeviceError, ParameterError},
    sensors::{DistanceReading, DistanceSensor, IrChannel, PulseTimer, ReflectanceArray},
    RobotConfig,
};
use smart_leds_trait::{SmartLedsWrite, RGB8};

/// Default I2C address of the motor board.
pub const BOARD: u8 = 0x10;

const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}
/// Create a read transaction for the given I2C address and expected data.
pub fn read(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::read(addr, data)
}
/// Create a write that the bus does not acknowledge.
pub fn nack(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data).with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
}

/// Strip driver that records every refresh.
#[derive(Clone, Default)]
struct RecordingStrip {
    frames: Rc<RefCell<Vec<Vec<RGB8>>>>,
}

impl SmartLedsWrite for RecordingStrip {
    type Error = ();
    type Color = RGB8;

    fn write<T, I>(
        &mut self,
        iterator: T,
    ) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        self.frames
            .borrow_mut()
            .push(iterator.into_iter().map(Into::into).collect());
        Ok(())
    }
}

/// Strip driver whose every refresh fails.
#[derive(Clone, Default)]
struct FailingStrip {
    attempts: Rc<Cell<usize>>,
}

impl SmartLedsWrite for FailingStrip {
    type Error = ();
    type Color = RGB8;

    fn write<T, I>(
        &mut self,
        _iterator: T,
    ) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        self.attempts.set(self.attempts.get() + 1);
        Err(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ToneEvent {
    Play { notes: usize, repeat: bool },
    Pitch(u32, u32),
    Stop,
}

#[derive(Clone, Default)]
struct RecordingTone {
    events: Rc<RefCell<Vec<ToneEvent>>>,
}

impl TonePlayer for RecordingTone {
    fn play(
        &mut self,
        melody: &'static [Note],
        repeat: bool,
    ) {
        self.events.borrow_mut().push(ToneEvent::Play {
            notes: melody.len(),
            repeat,
        });
    }

    fn pitch(
        &mut self,
        frequency_hz: u32,
        duration_ms: u32,
    ) {
        self.events
            .borrow_mut()
            .push(ToneEvent::Pitch(frequency_hz, duration_ms));
    }

    fn stop(&mut self) {
        self.events.borrow_mut().push(ToneEvent::Stop);
    }
}

/// Delay that only adds up the requested time.
#[derive(Clone, Default)]
struct RecordingDelay {
    total_ns: Rc<Cell<u64>>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
    }
}

/// Echo line that always reports the same pulse.
#[derive(Clone, Default)]
struct FixedEcho {
    width_us: Option<u32>,
    timeout_seen: Rc<Cell<Option<u32>>>,
}

impl PulseTimer for FixedEcho {
    fn pulse_width_us(
        &mut self,
        level: Level,
        timeout_us: u32,
    ) -> Option<u32> {
        assert_eq!(level, Level::High);
        self.timeout_seen.set(Some(timeout_us));
        self.width_us
    }
}

fn motion(mock: &I2cMock) -> MotionController<I2cMock> {
    MotionController::new(MotorBoard::new(mock.clone()), &RobotConfig::default())
}

#[test]
fn test_default_left_arc_frame() {
    let expectations = [write(BOARD, vec![0x00, 0, 20, 0, 50])];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    assert_eq!(ctrl.speed(), 50);
    ctrl.arc_left(0.2).unwrap();
    mock.done();
}

#[test]
fn test_stop_after_turns() {
    let expectations = [
        write(BOARD, vec![0x00, 0, 50, 0, 20]),
        write(BOARD, vec![0x00, 1, 50, 0, 50]),
        write(BOARD, vec![0x00, 0, 0, 0, 0]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    ctrl.arc_right(0.2).unwrap();
    ctrl.rotate_left().unwrap();
    ctrl.stop().unwrap();
    mock.done();
}

#[test]
fn test_straight_and_rotate_use_magnitude() {
    let expectations = [
        write(BOARD, vec![0x00, 0, 80, 0, 80]),
        write(BOARD, vec![0x00, 1, 80, 1, 80]),
        write(BOARD, vec![0x00, 0, 80, 1, 80]),
        write(BOARD, vec![0x00, 1, 80, 1, 32]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    ctrl.set_speed(-80);
    ctrl.forward().unwrap();
    ctrl.backward().unwrap();
    ctrl.rotate_right().unwrap();
    // Reversing right arc: outer left wheel at 80, inner right wheel at floor(0.405 * 80).
    ctrl.arc_right(0.2).unwrap();
    mock.done();
}

#[test]
fn test_speed_clamp_and_reset() {
    let expectations = [
        write(BOARD, vec![0x00, 0, 255, 0, 255]),
        write(BOARD, vec![0x00, 0, 50, 0, 50]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    ctrl.set_speed(300);
    assert_eq!(ctrl.speed(), 255);
    ctrl.forward().unwrap();
    ctrl.set_speed(-300);
    assert_eq!(ctrl.speed(), -255);
    ctrl.reset_speed();
    ctrl.forward().unwrap();
    mock.done();
}

#[test]
fn test_tight_arc_stops_inner_wheel() {
    let expectations = [write(BOARD, vec![0x00, 0, 0, 0, 50])];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    ctrl.arc_left(0.05).unwrap();
    mock.done();
}

#[test]
fn test_invalid_radius_writes_nothing() {
    let mut mock = I2cMock::new(&[]);
    let mut ctrl = motion(&mock);
    let err = ctrl.arc_right(0.0).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::InvalidParameter(ParameterError::ArcRadius(_))
    ));
    assert!(ctrl.arc_left(-1.0).is_err());
    mock.done();
}

#[test]
fn test_single_wheel_frames() {
    let expectations = [
        write(BOARD, vec![0x02, 1, 40]),
        write(BOARD, vec![0x00, 0, 255]),
        write(BOARD, vec![0x00, 0, 0]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    ctrl.rotate_wheel(Wheel::Right, -40).unwrap();
    ctrl.rotate_wheel(Wheel::Left, 1_000).unwrap();
    ctrl.rotate_wheel(Wheel::Left, 0).unwrap();
    assert_eq!(ctrl.speed(), 50);
    mock.done();
}

#[test]
fn test_absent_board_reports_bus_unavailable() {
    let expectations = [nack(BOARD, vec![0x00, 0, 50, 0, 50])];
    let mut mock = I2cMock::new(&expectations);
    let mut ctrl = motion(&mock);
    let err = ctrl.forward().unwrap_err();
    assert!(matches!(
        err,
        DeviceError::BusUnavailable(ErrorKind::NoAcknowledge(_))
    ));
    mock.done();
}

#[test]
fn test_probe() {
    let expectations = [write(BOARD, vec![]), nack(BOARD, vec![])];
    let mut mock = I2cMock::new(&expectations);
    let mut board = MotorBoard::new(mock.clone());
    assert!(board.probe());
    assert!(!board.probe());
    mock.done();
}

#[test]
fn test_reflectance_read_inverts() {
    let expectations = [
        write(BOARD, vec![0x1D]),
        read(BOARD, vec![0xFF]),
        write(BOARD, vec![0x1D]),
        read(BOARD, vec![0x00]),
        write(BOARD, vec![0x1D]),
        read(BOARD, vec![0b1111_0111]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let mut line = ReflectanceArray::new(MotorBoard::new(mock.clone()));
    assert_eq!(line.read().unwrap().channels(), [false; 5]);
    assert_eq!(line.read().unwrap().channels(), [true; 5]);
    assert!(line.read_channel(IrChannel::InnerLeft).unwrap());
    mock.done();
}

#[test]
fn test_reflectance_bus_failure() {
    let expectations = [nack(BOARD, vec![0x1D])];
    let mut mock = I2cMock::new(&expectations);
    let mut line = ReflectanceArray::new(MotorBoard::new(mock.clone()));
    assert!(matches!(
        line.read(),
        Err(DeviceError::BusUnavailable(_))
    ));
    mock.done();
}

#[test]
fn test_discrete_leds() {
    let expectations = [
        write(BOARD, vec![0x0B, 1]),
        write(BOARD, vec![0x0C, 1]),
        write(BOARD, vec![0x0B, 1]),
        write(BOARD, vec![0x0C, 1]),
        write(BOARD, vec![0x0B, 0]),
        write(BOARD, vec![0x0C, 0]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let strip = RecordingStrip::default();
    let mut lights = LightingController::new(MotorBoard::new(mock.clone()), strip.clone());
    lights.set_left_led(true).unwrap();
    lights.set_right_led(true).unwrap();
    lights.set_both_leds(true).unwrap();
    lights.clear_leds().unwrap();
    assert!(strip.frames.borrow().is_empty());
    mock.done();
}

#[test]
fn test_strip_positions_refresh_whole_strip() {
    let mut mock = I2cMock::new(&[]);
    let strip = RecordingStrip::default();
    let mut lights = LightingController::new(MotorBoard::new(mock.clone()), strip.clone());
    let blue = RGB8 { r: 0, g: 0, b: 200 };
    let green = RGB8 { r: 0, g: 90, b: 0 };

    lights.set_all(blue).unwrap();
    lights.set_front_right(green).unwrap();
    lights.set_back_left(RED).unwrap();
    lights.set_pixel(StripPosition::FrontLeft, green).unwrap();
    lights.clear_all().unwrap();

    let frames = strip.frames.borrow();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[0], vec![blue; 4]);
    assert_eq!(frames[1], vec![blue, blue, blue, green]);
    assert_eq!(frames[2], vec![blue, RED, blue, green]);
    assert_eq!(frames[3], vec![green, RED, blue, green]);
    assert_eq!(frames[4], vec![OFF; 4]);
    assert_eq!(lights.pixels(), &[OFF; 4]);
    mock.done();
}

#[test]
fn test_sound_alarm_blinks_and_plays() {
    let config = RobotConfig {
        alarm_cycles: 2,
        ..RobotConfig::default()
    };
    let mut expectations = Vec::new();
    for _ in 0..2 {
        expectations.push(write(BOARD, vec![0x0B, 1]));
        expectations.push(write(BOARD, vec![0x0C, 1]));
        expectations.push(write(BOARD, vec![0x0B, 0]));
        expectations.push(write(BOARD, vec![0x0C, 0]));
    }
    let mut mock = I2cMock::new(&expectations);
    let strip = RecordingStrip::default();
    let tone = RecordingTone::default();
    let delay = RecordingDelay::default();
    let mut lights = LightingController::new(MotorBoard::new(mock.clone()), strip.clone());
    let mut alarm = AlarmController::new(tone.clone(), delay.clone(), &config);

    alarm.sound_alarm(&mut lights).unwrap();

    assert_eq!(
        *tone.events.borrow(),
        vec![ToneEvent::Play {
            notes: ALARM_MELODY.len(),
            repeat: false
        }]
    );
    assert_eq!(
        *strip.frames.borrow(),
        vec![vec![RED; 4], vec![OFF; 4], vec![RED; 4], vec![OFF; 4]]
    );
    // 2 cycles of 100 ms on + 100 ms off
    assert_eq!(delay.total_ns.get(), 400_000_000);
    mock.done();
}

#[test]
fn test_alarm_stops_on_bus_failure() {
    let expectations = [
        nack(BOARD, vec![0x0B, 1]),
        write(BOARD, vec![0x0B, 0]),
        write(BOARD, vec![0x0C, 0]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let strip = RecordingStrip::default();
    let delay = RecordingDelay::default();
    let mut lights = LightingController::new(MotorBoard::new(mock.clone()), strip.clone());
    let mut alarm =
        AlarmController::new(RecordingTone::default(), delay.clone(), &RobotConfig::default());

    assert!(matches!(
        alarm.sound_alarm(&mut lights),
        Err(DeviceError::BusUnavailable(_))
    ));
    assert_eq!(*strip.frames.borrow(), vec![vec![OFF; 4]]);
    assert_eq!(delay.total_ns.get(), 0);
    mock.done();
}

#[test]
fn test_alarm_switches_leds_off_when_strip_fails() {
    let expectations = [
        write(BOARD, vec![0x0B, 1]),
        write(BOARD, vec![0x0C, 1]),
        write(BOARD, vec![0x0B, 0]),
        write(BOARD, vec![0x0C, 0]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let strip = FailingStrip::default();
    let delay = RecordingDelay::default();
    let mut lights = LightingController::new(MotorBoard::new(mock.clone()), strip.clone());
    let mut alarm =
        AlarmController::new(RecordingTone::default(), delay.clone(), &RobotConfig::default());

    assert!(matches!(
        alarm.sound_alarm(&mut lights),
        Err(DeviceError::StripUnavailable(()))
    ));
    // RED refresh, then the OFF refresh on the way out
    assert_eq!(strip.attempts.get(), 2);
    assert_eq!(lights.pixels(), &[OFF; 4]);
    assert_eq!(delay.total_ns.get(), 0);
    mock.done();
}

#[test]
fn test_beep_and_siren() {
    let tone = RecordingTone::default();
    let mut alarm = AlarmController::new(
        tone.clone(),
        RecordingDelay::default(),
        &RobotConfig::default(),
    );
    alarm.beep(440);
    alarm.set_siren(true);
    alarm.set_siren(false);
    assert_eq!(
        *tone.events.borrow(),
        vec![
            ToneEvent::Pitch(440, 100),
            ToneEvent::Play {
                notes: ALARM_MELODY.len(),
                repeat: true
            },
            ToneEvent::Stop,
        ]
    );
}

#[test]
fn test_distance_echo() {
    let expectations = [
        PinTrans::set(PinState::High),
        PinTrans::set(PinState::Low),
    ];
    let mut trigger = PinMock::new(&expectations);
    let echo = FixedEcho {
        width_us: Some(1000),
        ..FixedEcho::default()
    };
    let mut sensor = DistanceSensor::new(trigger.clone(), echo.clone(), RecordingDelay::default());
    let reading = sensor.measure_cm();
    assert_eq!(reading.cm(), Some(16));
    assert_eq!(echo.timeout_seen.get(), Some(7434));
    trigger.done();
}

#[test]
fn test_distance_no_echo_is_sentinel() {
    let expectations = [
        PinTrans::set(PinState::High),
        PinTrans::set(PinState::Low),
    ];
    let mut trigger = PinMock::new(&expectations);
    let mut sensor = DistanceSensor::new(
        trigger.clone(),
        FixedEcho::default(),
        RecordingDelay::default(),
    );
    let reading = sensor.measure_cm();
    assert_eq!(reading, DistanceReading::NO_ECHO);
    assert_eq!(reading.raw(), 255);
    trigger.done();
}

type TestController<'a> = SystemController<
    RefCellDevice<'a, I2cMock>,
    RecordingStrip,
    RecordingTone,
    RecordingDelay,
    PinMock,
    FixedEcho,
>;

fn system<'a>(
    bus: &'a RefCell<I2cMock>,
    trigger: &PinMock,
    strip: &RecordingStrip,
) -> TestController<'a> {
    let config = RobotConfig::default();
    SystemController::new(
        MotionController::new(MotorBoard::new(RefCellDevice::new(bus)), &config),
        LightingController::new(MotorBoard::new(RefCellDevice::new(bus)), strip.clone()),
        AlarmController::new(RecordingTone::default(), RecordingDelay::default(), &config),
        DistanceSensor::new(
            trigger.clone(),
            FixedEcho {
                width_us: Some(2000),
                ..FixedEcho::default()
            },
            RecordingDelay::default(),
        ),
        ReflectanceArray::new(MotorBoard::new(RefCellDevice::new(bus))),
    )
}

#[test]
fn test_system_controller_shares_bus() {
    let expectations = [
        write(BOARD, vec![0x00, 0, 0, 0, 0]),
        write(BOARD, vec![0x0B, 0]),
        write(BOARD, vec![0x0C, 0]),
        write(BOARD, vec![0x00, 0, 100, 0, 100]),
        write(BOARD, vec![0x0C, 1]),
        write(BOARD, vec![0x1D]),
        read(BOARD, vec![0b1111_1011]),
    ];
    let i2c_bus = RefCell::new(I2cMock::new(&expectations));
    let mut trigger = PinMock::new(&[
        PinTrans::set(PinState::High),
        PinTrans::set(PinState::Low),
    ]);
    let strip = RecordingStrip::default();
    let mut sys = system(&i2c_bus, &trigger, &strip);

    sys.reset_outputs().unwrap();
    for json in [
        r#"{"ct":"m","mc":"set_speed","s":100}"#,
        r#"{"ct":"m","mc":"forward"}"#,
        r#"{"ct":"l","lc":"led","side":"right","on":true}"#,
        r#"{"ct":"l","lc":"rgb","r":1,"g":2,"b":3}"#,
    ] {
        let cmd = SystemCommand::from_json(json.as_bytes()).unwrap();
        assert_eq!(sys.execute(cmd).unwrap(), None);
    }

    let line = sys
        .execute(SystemCommand::from_json(br#"{"ct":"s","sc":"reflectance"}"#).unwrap())
        .unwrap();
    match line {
        Some(SensorReading::Reflectance(sample)) => {
            assert_eq!(sample.channels(), [false, false, true, false, false]);
        }
        other => panic!("unexpected reading {other:?}"),
    }

    let distance = sys
        .execute(SystemCommand::from_json(br#"{"ct":"s","sc":"distance"}"#).unwrap())
        .unwrap();
    assert_eq!(
        distance,
        Some(SensorReading::Distance(DistanceReading::from_echo_us(2000)))
    );

    assert_eq!(
        *strip.frames.borrow(),
        vec![vec![OFF; 4], vec![RGB8 { r: 1, g: 2, b: 3 }; 4]]
    );
    drop(sys);
    trigger.done();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_system_controller_fails_open() {
    let expectations = [
        nack(BOARD, vec![0x00, 0, 50, 0, 50]),
        write(BOARD, vec![0x00, 0, 0, 0, 0]),
    ];
    let i2c_bus = RefCell::new(I2cMock::new(&expectations));
    let mut trigger = PinMock::new(&[]);
    let strip = RecordingStrip::default();
    let mut sys = system(&i2c_bus, &trigger, &strip);

    let forward = SystemCommand::from_json(br#"{"ct":"m","mc":"forward"}"#).unwrap();
    assert!(matches!(
        sys.execute(forward),
        Err(DeviceError::BusUnavailable(_))
    ));
    let stop = SystemCommand::from_json(br#"{"ct":"m","mc":"stop"}"#).unwrap();
    assert_eq!(sys.execute(stop).unwrap(), None);

    drop(sys);
    trigger.done();
    i2c_bus.borrow_mut().done();
}
