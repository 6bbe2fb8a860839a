//! # Input Controller
//!
//! Turns stick samples and button edges into frames on the link.
//!
//! ## Joystick path
//!
//! ```text
//! sample -> rotate -90deg -> deadzone? -> CoordinateMapper -> LowPassFilter (x, y)
//!        -> ChangeGate -> PacketEncoder -> Transmitter
//! ```
//!
//! A sample below the deadzone bypasses mapper, filter and gate: the center
//! frame is sent once when the stick enters the deadzone (edge-triggered)
//! and both filters are reset to the center.
//!
//! A physical stick held still reports nothing, so the last sample is kept
//! and fed through the pipeline again on every [`ControlEvent::Resample`].
//! That lets the filter settle on a held position and delivers the final
//! position of a movement the gate cut short.
//!
//! ## Button path
//!
//! Every press/release edge is encoded and sent immediately; repeated
//! events for the same state are swallowed by the [`ButtonTable`].

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::input::buttons::ButtonTable;
use crate::input::filter::LowPassFilter;
use crate::input::gate::{ChangeGate, SendState};
use crate::input::geometry::{rotate_ui_angle, Direction, JoystickSample};
use crate::input::mapper::{CenterMode, Coordinate, CoordinateMapper};
use crate::link::transmitter::Transmitter;
use crate::protocol::encoder::PacketEncoder;
use crate::protocol::frame::{ButtonId, Packet, AXIS_CENTER};

/// One input event from whatever drives the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Stick sample in UI angle convention
    Joystick(JoystickSample),
    Button { button: ButtonId, pressed: bool },
    /// Capture a new stick center (calibrated mode only)
    Recalibrate,
    /// Run the last stick sample through the pipeline again
    Resample,
}

/// Collapse a backlog of events into what is still worth sending
///
/// Only the newest joystick sample survives, at its own position in the
/// sequence; button edges and recalibration requests are kept in order.
#[must_use]
pub fn coalesce_events(events: Vec<ControlEvent>) -> Vec<ControlEvent> {
    let is_stick = |event: &ControlEvent| matches!(event, ControlEvent::Joystick(_));
    let newest_stick = events.iter().rposition(is_stick);

    events
        .into_iter()
        .enumerate()
        .filter(|(i, event)| !is_stick(event) || Some(*i) == newest_stick)
        .map(|(_, event)| event)
        .collect()
}

/// Joystick and button orchestration
///
/// Owned by the single input task; all methods take `&mut self`.
#[derive(Debug)]
pub struct InputController {
    transmitter: Arc<Transmitter>,
    encoder: PacketEncoder,
    mapper: CoordinateMapper,
    filter_x: LowPassFilter,
    filter_y: LowPassFilter,
    gate: ChangeGate,
    buttons: ButtonTable,
    center_mode: CenterMode,
    center: Coordinate,
    calibrated: bool,
    avoid_prefix_collisions: bool,
    held: Option<JoystickSample>,
}

impl InputController {
    #[must_use]
    pub fn new(config: &Config, transmitter: Arc<Transmitter>) -> Self {
        let joystick = &config.joystick;

        Self {
            transmitter,
            encoder: PacketEncoder::new(config.protocol),
            mapper: CoordinateMapper::new(joystick.deadzone_percent, joystick.invert_x),
            filter_x: LowPassFilter::new(joystick.filter_alpha),
            filter_y: LowPassFilter::new(joystick.filter_alpha),
            gate: ChangeGate::new(
                std::time::Duration::from_millis(joystick.min_update_interval_ms),
                joystick.change_threshold,
            ),
            buttons: ButtonTable::new(),
            center_mode: joystick.center_mode,
            center: Coordinate::CENTER,
            calibrated: false,
            avoid_prefix_collisions: joystick.avoid_prefix_collisions,
            held: None,
        }
    }

    /// Current neutral position
    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.center
    }

    /// Last joystick frame handed to the transmitter
    #[must_use]
    pub fn send_state(&self) -> &SendState {
        self.gate.state()
    }

    #[must_use]
    pub fn buttons(&self) -> &ButtonTable {
        &self.buttons
    }

    /// Dispatch one event
    ///
    /// # Errors
    ///
    /// See [`on_joystick_sample`](Self::on_joystick_sample) and
    /// [`on_button_event`](Self::on_button_event).
    pub async fn handle(&mut self, event: ControlEvent) -> Result<Option<Packet>> {
        match event {
            ControlEvent::Joystick(sample) => self.on_joystick_sample_at(sample, Instant::now()).await,
            ControlEvent::Button { button, pressed } => self.on_button_event(button, pressed).await,
            ControlEvent::Recalibrate => {
                self.recalibrate();
                Ok(None)
            }
            ControlEvent::Resample => self.resample_at(Instant::now()).await,
        }
    }

    /// Feed the last stick sample through the pipeline again
    ///
    /// Does nothing before the first sample or after [`neutralize`](Self::neutralize).
    ///
    /// # Errors
    ///
    /// As for [`on_joystick_sample`](Self::on_joystick_sample).
    pub async fn resample_at(&mut self, now: Instant) -> Result<Option<Packet>> {
        match self.held {
            Some(sample) => self.on_joystick_sample_at(sample, now).await,
            None => Ok(None),
        }
    }

    /// Process one stick sample
    ///
    /// # Arguments
    ///
    /// * `angle` - UI angle in degrees (screen up = 180)
    /// * `power` - Deflection percent, 0-100
    ///
    /// # Returns
    ///
    /// The packet that was sent, or `None` if the sample was gated.
    ///
    /// # Errors
    ///
    /// - `Encoding` if the filtered position collides with a prefix (nothing is sent)
    /// - The transmitter's error if the send failed
    pub async fn on_joystick_sample(&mut self, angle: u16, power: u8) -> Result<Option<Packet>> {
        self.on_joystick_sample_at(JoystickSample::new(angle, power), Instant::now())
            .await
    }

    /// [`on_joystick_sample`](Self::on_joystick_sample) with an explicit timestamp
    pub async fn on_joystick_sample_at(
        &mut self,
        sample: JoystickSample,
        now: Instant,
    ) -> Result<Option<Packet>> {
        self.held = Some(sample);
        let angle = rotate_ui_angle(sample.angle);
        let power = sample.power.min(100);

        if self.mapper.in_deadzone(power) {
            if self.center_mode == CenterMode::Calibrated && !self.calibrated {
                self.capture_center(angle, power);
            }
            return self.send_center(now).await;
        }

        let target = self.mapper.to_xy(angle, power, self.center);
        let mut position = Coordinate::new(
            self.filter_x.filter(i32::from(target.x)),
            self.filter_y.filter(i32::from(target.y)),
        );
        if self.avoid_prefix_collisions {
            position = self.steer_clear(position);
        }

        if !self.gate.accepts(position, now) {
            return Ok(None);
        }

        debug!(
            "Stick {} {}% -> ({}, {})",
            Direction::classify(angle, power),
            power,
            position.x,
            position.y
        );

        let packet = self.encode_joystick(position, power)?;
        self.gate.record(position, power, now);
        self.transmit(packet).await
    }

    /// Process a button edge
    ///
    /// # Returns
    ///
    /// The packet that was sent, or `None` for a duplicate state.
    ///
    /// # Errors
    ///
    /// The transmitter's error if the send failed. The button is still
    /// recorded with its new state.
    pub async fn on_button_event(&mut self, button: ButtonId, pressed: bool) -> Result<Option<Packet>> {
        let Some(state) = self.buttons.transition(button, pressed) else {
            debug!("Ignoring repeated {} {}", button, if pressed { "press" } else { "release" });
            return Ok(None);
        };

        let packet = self.encoder.encode_button(button, state).map_err(|e| {
            error!("Refusing to send {} frame: {}", button, e);
            e
        })?;
        debug!("Button {} {:?}", button, state);
        self.transmit(packet).await
    }

    /// Forget the captured center; the next sample inside the deadzone
    /// captures a new one. No effect in fixed mode.
    pub fn recalibrate(&mut self) {
        if self.center_mode == CenterMode::Calibrated {
            info!("Recalibrating stick center");
            self.calibrated = false;
            self.center = Coordinate::CENTER;
        }
    }

    /// Release every pressed button and recenter the stick
    ///
    /// Used on shutdown so the vehicle is not left moving.
    ///
    /// # Errors
    ///
    /// The first send error; later frames are still attempted.
    pub async fn neutralize(&mut self) -> Result<()> {
        self.held = None;
        let mut pressed: Vec<ButtonId> = self.buttons.pressed().collect();
        pressed.sort();

        let mut first_error = None;
        for button in pressed {
            if let Err(e) = self.on_button_event(button, false).await {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.send_center(Instant::now()).await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn capture_center(&mut self, angle: u16, power: u8) {
        let mut center = self.mapper.to_xy(angle, power, Coordinate::CENTER);
        if self.avoid_prefix_collisions {
            center = self.steer_clear(center);
        }
        self.center = center;
        self.calibrated = true;
        info!("Stick center calibrated at ({}, {})", center.x, center.y);
    }

    /// Edge-triggered center frame, bypassing the interval gate
    async fn send_center(&mut self, now: Instant) -> Result<Option<Packet>> {
        let center = self.center;
        self.filter_x.reset(center.x);
        self.filter_y.reset(center.y);

        if self.gate.is_last_sent(center, 0) {
            return Ok(None);
        }

        debug!("Stick centered");
        let packet = self.encode_joystick(center, 0)?;
        self.gate.record(center, 0, now);
        self.transmit(packet).await
    }

    fn encode_joystick(&self, position: Coordinate, power: u8) -> Result<Packet> {
        self.encoder
            .encode_joystick(position.x, position.y, power)
            .map_err(|e| {
                error!("Refusing to send joystick frame: {}", e);
                e
            })
    }

    /// Step each axis toward the center until it no longer equals a prefix
    fn steer_clear(&self, position: Coordinate) -> Coordinate {
        Coordinate::new(self.steer_axis(position.x), self.steer_axis(position.y))
    }

    fn steer_axis(&self, mut value: u8) -> u8 {
        // AXIS_CENTER is never a prefix, so this ends within 128 steps
        while self.encoder.is_prefix(value) && value != AXIS_CENTER {
            if value > AXIS_CENTER {
                value -= 1;
            } else {
                value += 1;
            }
        }
        value
    }

    async fn transmit(&self, packet: Packet) -> Result<Option<Packet>> {
        self.transmitter.send(&packet).await?;
        Ok(Some(packet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZergPadError;
    use crate::link::mocks::MockLink;
    use crate::link::signal::LinkSignal;
    use crate::link::transmitter::TransmitterOptions;
    use crate::link::{Link, MockConnector};
    use std::io;
    use std::time::Duration;

    async fn setup(config: &Config) -> (MockLink, InputController) {
        let link = MockLink::new();
        let handle = link.clone();
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(move |_| Ok(Box::new(handle.clone()) as Box<dyn Link>));

        let tx = Transmitter::connect(
            Arc::new(connector),
            TransmitterOptions::from(&config.link),
            PacketEncoder::new(config.protocol),
            LinkSignal::new(),
        )
        .await
        .unwrap();

        (link, InputController::new(config, Arc::new(tx)))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn sample(angle: u16, power: u8) -> JoystickSample {
        JoystickSample::new(angle, power)
    }

    #[tokio::test]
    async fn test_first_sample_shows_filter_warm_up() {
        let (link, mut controller) = setup(&Config::default()).await;

        // UI 90 = screen right = mapper 0. Raw target x is 127 + 126 = 253,
        // the filter starts at 127: 0.25 * 253 + 0.75 * 127 = 158.5 -> 159
        let packet = controller
            .on_joystick_sample_at(sample(90, 100), Instant::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(packet.as_bytes(), &[0xF1, 159, 127, 100]);
        assert_eq!(link.get_written_data(), vec![vec![0xF1, 159, 127, 100]]);
    }

    #[tokio::test]
    async fn test_filter_converges_toward_target() {
        let (_link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        // Stop before the filter reaches 240 (0xF0), which would collide with a prefix
        let mut last_x = 127;
        for i in 0..7u64 {
            if let Some(packet) = controller
                .on_joystick_sample_at(sample(90, 100), t0 + ms(60 * i))
                .await
                .unwrap()
            {
                let x = packet.as_bytes()[1];
                assert!(x > last_x);
                last_x = x;
            }
        }
        assert!(last_x > 225, "x only reached {}", last_x);
    }

    #[tokio::test]
    async fn test_held_stick_settles_after_quick_flick() {
        let mut config = Config::default();
        config.joystick.avoid_prefix_collisions = true;
        let (link, mut controller) = setup(&config).await;
        let t0 = Instant::now();

        // Flick to full right within 30ms: only the first sample clears the gate
        for (i, power) in [40u8, 80, 100, 100].into_iter().enumerate() {
            controller
                .on_joystick_sample_at(sample(90, power), t0 + ms(10 * i as u64))
                .await
                .unwrap();
        }
        assert_eq!(link.get_written_data(), vec![vec![0xF1, 140, 127, 40]]);

        // The pad goes quiet while the stick is held; resampling walks on
        for tick in 1..=40u64 {
            controller.resample_at(t0 + ms(30 + 50 * tick)).await.unwrap();
        }

        let written = link.get_written_data();
        let last = written.last().unwrap();
        assert!(written.len() > 4);
        // The gate holds back anything within 5 of the last frame
        assert!(last[1] >= 248, "held full-right stick left at x={}", last[1]);
        assert_eq!(&last[2..], &[127, 100]);
    }

    #[tokio::test]
    async fn test_resample_before_first_sample_sends_nothing() {
        let (link, mut controller) = setup(&Config::default()).await;
        assert!(controller.resample_at(Instant::now()).await.unwrap().is_none());
        assert!(controller.handle(ControlEvent::Resample).await.unwrap().is_none());
        assert!(link.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_resample_of_centered_stick_is_silent() {
        let (link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        controller.on_joystick_sample_at(JoystickSample::released(), t0).await.unwrap();
        for tick in 1..=5u64 {
            assert!(controller.resample_at(t0 + ms(50 * tick)).await.unwrap().is_none());
        }
        assert_eq!(link.get_written_data(), vec![vec![0xF1, 127, 127, 0]]);
    }

    #[tokio::test]
    async fn test_no_resample_after_neutralize() {
        let (link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        controller.on_joystick_sample_at(sample(90, 100), t0).await.unwrap();
        controller.neutralize().await.unwrap();
        let before = link.get_written_data().len();

        assert!(controller.resample_at(t0 + ms(500)).await.unwrap().is_none());
        assert_eq!(link.get_written_data().len(), before);
    }

    #[test]
    fn test_coalesce_keeps_newest_stick_and_every_button() {
        let press = ControlEvent::Button { button: ButtonId::A, pressed: true };
        let release = ControlEvent::Button { button: ButtonId::A, pressed: false };
        let events = vec![
            ControlEvent::Joystick(sample(90, 30)),
            press,
            ControlEvent::Joystick(sample(90, 60)),
            ControlEvent::Recalibrate,
            ControlEvent::Joystick(sample(180, 90)),
            release,
        ];

        assert_eq!(
            coalesce_events(events),
            vec![
                press,
                ControlEvent::Recalibrate,
                ControlEvent::Joystick(sample(180, 90)),
                release,
            ]
        );
    }

    #[test]
    fn test_coalesce_without_stick_samples() {
        let events = vec![
            ControlEvent::Button { button: ButtonId::B, pressed: true },
            ControlEvent::Button { button: ButtonId::B, pressed: false },
        ];
        assert_eq!(coalesce_events(events.clone()), events);
        assert!(coalesce_events(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_deadzone_sends_center_for_any_angle() {
        let (link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        let first = controller.on_joystick_sample_at(sample(123, 10), t0).await.unwrap();
        assert_eq!(first.unwrap().as_bytes(), &[0xF1, 127, 127, 0]);

        // Already centered: edge-triggered, nothing more is sent
        for (i, angle) in [0u16, 45, 200, 359].into_iter().enumerate() {
            let result = controller
                .on_joystick_sample_at(sample(angle, 14), t0 + ms(100 * (i as u64 + 1)))
                .await
                .unwrap();
            assert!(result.is_none());
        }
        assert_eq!(link.get_written_data().len(), 1);
    }

    #[tokio::test]
    async fn test_release_recenters_immediately_and_resets_filter() {
        let (link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        controller.on_joystick_sample_at(sample(90, 100), t0).await.unwrap();

        // Within the interval, but the center transition bypasses the gate
        let center = controller
            .on_joystick_sample_at(JoystickSample::released(), t0 + ms(10))
            .await
            .unwrap();
        assert_eq!(center.unwrap().as_bytes(), &[0xF1, 127, 127, 0]);

        // Filter was reset, so the next push warms up from the center again
        let again = controller
            .on_joystick_sample_at(sample(90, 100), t0 + ms(100))
            .await
            .unwrap();
        assert_eq!(again.unwrap().as_bytes(), &[0xF1, 159, 127, 100]);
        assert_eq!(link.get_written_data().len(), 3);
    }

    #[tokio::test]
    async fn test_samples_within_interval_gated() {
        let (link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        assert!(controller.on_joystick_sample_at(sample(90, 100), t0).await.unwrap().is_some());
        assert!(controller
            .on_joystick_sample_at(sample(270, 100), t0 + ms(20))
            .await
            .unwrap()
            .is_none());
        assert_eq!(link.get_written_data().len(), 1);
    }

    #[tokio::test]
    async fn test_small_movement_gated() {
        let (_link, mut controller) = setup(&Config::default()).await;
        let t0 = Instant::now();

        controller.on_joystick_sample_at(sample(90, 100), t0).await.unwrap();
        // Same direction, tiny power change: filtered x moves well under 5 units
        let result = controller
            .on_joystick_sample_at(sample(90, 16), t0 + ms(100))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_forward_is_low_y() {
        let mut config = Config::default();
        config.joystick.filter_alpha = 1.0;
        let (_link, mut controller) = setup(&config).await;

        // UI 180 = screen up = forward
        let packet = controller
            .on_joystick_sample_at(sample(180, 100), Instant::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.as_bytes(), &[0xF1, 127, 1, 100]);
    }

    #[tokio::test]
    async fn test_invert_x() {
        let mut config = Config::default();
        config.joystick.invert_x = true;
        let (_link, mut controller) = setup(&config).await;

        // Raw x becomes 127 - 126 = 1; 0.25 * 1 + 0.75 * 127 = 95.5 -> 96
        let packet = controller
            .on_joystick_sample_at(sample(90, 100), Instant::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.as_bytes(), &[0xF1, 96, 127, 100]);
    }

    #[tokio::test]
    async fn test_three_byte_frames_without_power() {
        let mut config = Config::default();
        config.protocol.include_power = false;
        let (link, mut controller) = setup(&config).await;

        controller.on_joystick_sample_at(sample(0, 0), Instant::now()).await.unwrap();
        assert_eq!(link.get_written_data(), vec![vec![0xF1, 127, 127]]);
    }

    #[tokio::test]
    async fn test_calibrated_center_captured_from_first_low_sample() {
        let mut config = Config::default();
        config.joystick.center_mode = CenterMode::Calibrated;
        let (link, mut controller) = setup(&config).await;
        let t0 = Instant::now();

        // Resting stick reads 10% to the right: 127 + round(12.6) = 140
        let packet = controller.on_joystick_sample_at(sample(90, 10), t0).await.unwrap();
        assert_eq!(packet.unwrap().as_bytes(), &[0xF1, 140, 127, 0]);
        assert_eq!(controller.center(), Coordinate::new(140, 127));

        // Later low samples elsewhere keep the captured center
        controller.on_joystick_sample_at(sample(270, 10), t0 + ms(100)).await.unwrap();
        assert_eq!(controller.center(), Coordinate::new(140, 127));

        // Full right from 140 clamps at 255; filter starts at 140:
        // 0.25 * 255 + 0.75 * 140 = 168.75 -> 169
        let packet = controller
            .on_joystick_sample_at(sample(90, 100), t0 + ms(200))
            .await
            .unwrap();
        assert_eq!(packet.unwrap().as_bytes(), &[0xF1, 169, 127, 100]);
        assert_eq!(link.get_written_data().len(), 2);
    }

    #[tokio::test]
    async fn test_recalibrate_captures_again() {
        let mut config = Config::default();
        config.joystick.center_mode = CenterMode::Calibrated;
        let (_link, mut controller) = setup(&config).await;
        let t0 = Instant::now();

        controller.on_joystick_sample_at(sample(90, 10), t0).await.unwrap();
        controller.recalibrate();
        assert_eq!(controller.center(), Coordinate::CENTER);

        // UI 270 = screen left: 127 - 13 = 114
        let packet = controller
            .on_joystick_sample_at(sample(270, 10), t0 + ms(100))
            .await
            .unwrap();
        assert_eq!(packet.unwrap().as_bytes(), &[0xF1, 114, 127, 0]);
    }

    #[tokio::test]
    async fn test_recalibrate_no_effect_in_fixed_mode() {
        let (_link, mut controller) = setup(&Config::default()).await;
        controller.on_joystick_sample_at(sample(90, 10), Instant::now()).await.unwrap();
        controller.recalibrate();
        assert_eq!(controller.center(), Coordinate::CENTER);
    }

    #[tokio::test]
    async fn test_prefix_collision_reported_not_sent() {
        let mut config = Config::default();
        config.joystick.filter_alpha = 1.0;
        let (link, mut controller) = setup(&config).await;

        // 90% right: 127 + round(113.4) = 240 = 0xF0
        let result = controller.on_joystick_sample_at(sample(90, 90), Instant::now()).await;

        assert!(matches!(result, Err(ZergPadError::Encoding(_))));
        assert!(link.get_written_data().is_empty());
        assert_eq!(*controller.send_state(), SendState::default());
    }

    #[tokio::test]
    async fn test_prefix_collision_avoided_when_enabled() {
        let mut config = Config::default();
        config.joystick.filter_alpha = 1.0;
        config.joystick.avoid_prefix_collisions = true;
        let (_link, mut controller) = setup(&config).await;

        let packet = controller
            .on_joystick_sample_at(sample(90, 90), Instant::now())
            .await
            .unwrap();
        assert_eq!(packet.unwrap().as_bytes(), &[0xF1, 239, 127, 90]);
    }

    #[tokio::test]
    async fn test_button_press_then_release() {
        let (link, mut controller) = setup(&Config::default()).await;

        controller.on_button_event(ButtonId::A, true).await.unwrap();
        controller.on_button_event(ButtonId::A, false).await.unwrap();

        assert_eq!(
            link.get_written_data(),
            vec![vec![0xF0, 0x01, 0x7F], vec![0xF0, 0x01, 0x00]]
        );
    }

    #[tokio::test]
    async fn test_repeated_press_sent_once() {
        let (link, mut controller) = setup(&Config::default()).await;

        assert!(controller.on_button_event(ButtonId::X, true).await.unwrap().is_some());
        assert!(controller.on_button_event(ButtonId::X, true).await.unwrap().is_none());

        assert_eq!(link.get_written_data(), vec![vec![0xF0, 0x03, 0x7F]]);
    }

    #[tokio::test]
    async fn test_release_without_press_ignored() {
        let (link, mut controller) = setup(&Config::default()).await;
        assert!(controller.on_button_event(ButtonId::R, false).await.unwrap().is_none());
        assert!(link.get_written_data().is_empty());
    }

    #[tokio::test]
    async fn test_buttons_bypass_joystick_gate() {
        let (link, mut controller) = setup(&Config::default()).await;

        controller.on_joystick_sample(90, 100).await.unwrap();
        controller.on_button_event(ButtonId::Start, true).await.unwrap();

        assert_eq!(link.get_written_data().len(), 2);
    }

    #[tokio::test]
    async fn test_handle_dispatches_events() {
        let (link, mut controller) = setup(&Config::default()).await;

        controller
            .handle(ControlEvent::Button { button: ButtonId::B, pressed: true })
            .await
            .unwrap();
        controller
            .handle(ControlEvent::Joystick(JoystickSample::released()))
            .await
            .unwrap();

        assert_eq!(
            link.get_written_data(),
            vec![vec![0xF0, 0x02, 0x7F], vec![0xF1, 127, 127, 0]]
        );
    }

    #[tokio::test]
    async fn test_handle_recalibrate_event() {
        let mut config = Config::default();
        config.joystick.center_mode = CenterMode::Calibrated;
        let (link, mut controller) = setup(&config).await;

        controller.on_joystick_sample(90, 10).await.unwrap();
        assert_eq!(controller.center(), Coordinate::new(140, 127));

        let result = controller.handle(ControlEvent::Recalibrate).await.unwrap();
        assert!(result.is_none());
        assert_eq!(controller.center(), Coordinate::CENTER);
        assert_eq!(link.get_written_data().len(), 1);
    }

    #[tokio::test]
    async fn test_neutralize_releases_buttons_and_centers() {
        let (link, mut controller) = setup(&Config::default()).await;

        controller.on_button_event(ButtonId::L, true).await.unwrap();
        controller.on_button_event(ButtonId::A, true).await.unwrap();
        controller.on_joystick_sample(90, 100).await.unwrap();

        controller.neutralize().await.unwrap();

        let written = link.get_written_data();
        assert_eq!(
            &written[3..],
            &[
                vec![0xF0, 0x01, 0x00],
                vec![0xF0, 0x07, 0x00],
                vec![0xF1, 127, 127, 0],
            ]
        );
        assert_eq!(controller.buttons().pressed().count(), 0);
    }

    #[tokio::test]
    async fn test_neutralize_when_idle_sends_center_once() {
        let (link, mut controller) = setup(&Config::default()).await;
        controller.neutralize().await.unwrap();
        controller.neutralize().await.unwrap();
        assert_eq!(link.get_written_data(), vec![vec![0xF1, 127, 127, 0]]);
    }

    #[tokio::test]
    async fn test_send_failure_propagates() {
        let (link, mut controller) = setup(&Config::default()).await;
        link.set_write_error(io::ErrorKind::BrokenPipe);

        let result = controller.on_button_event(ButtonId::Y, true).await;
        assert!(matches!(result, Err(ZergPadError::SendFailed { .. })));
    }
}
