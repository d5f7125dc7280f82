//! Top-level application state machine.
//!
//! ```text
//!  Init ──────────────► Running ─────────────────────────► Shutdown
//!  open frames          per frame:                          stop audio
//!  decode song            audio events → overlay input      release camera
//!  start playback         → frame → landmarks → classifier  summary
//!  landmarks, overlay     → actions → MixerControl → print
//!                         → render
//! ```
//!
//! [`MainLoop`] owns everything the video thread touches. It only talks to
//! the audio side through [`MixerControl`] (snapshots out) and the
//! [`AudioEvent`] channel (errors and end-of-track in).

use std::fmt;
use std::sync::mpsc;

use crossbeam_channel::Receiver;

use audio_fx::{actions_for, decode_file, Action, AudioEvent, AudioOutput, MixerControl, MixerState};
use hand_gesture::{DualClassifier, HandObservation};

use crate::camera::FrameSource;
use crate::cli::CliArgs;
use crate::config::{AppConfig, CameraConfig};
use crate::error::AppError;
use crate::landmarks::{LandmarkSource, SimInput};
use crate::overlay::{Overlay, OverlayInput, OverlaySink, OverlayView};
use crate::status::{self, AppliedGesture, Trigger};

/// Applied gestures kept for the overlay.
const RECENT_MAX: usize = 8;

// ════════════════════════════════════════════════════════════════════════════
// Phases and shutdown reasons
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase { Init, Running, Shutdown }

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Q, Escape or the window was closed.
    UserQuit,
    /// A non-looping song finished.
    EndOfTrack,
    /// Too many consecutive bad frames.
    CameraFailed(String),
    /// The output stream reported an error.
    AudioFailed(String),
}

impl ShutdownReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::UserQuit | ShutdownReason::EndOfTrack => 0,
            ShutdownReason::CameraFailed(_) => 2,
            ShutdownReason::AudioFailed(_)  => 3,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::UserQuit        => f.write_str("user quit"),
            ShutdownReason::EndOfTrack      => f.write_str("end of track"),
            ShutdownReason::CameraFailed(e) => write!(f, "camera failure: {}", e),
            ShutdownReason::AudioFailed(e)  => write!(f, "audio failure: {}", e),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MainLoop
// ════════════════════════════════════════════════════════════════════════════

pub struct MainLoop {
    // ── inputs ────────────────────────────────────────────────────────────
    frames:       Box<dyn FrameSource>,
    landmarks:    Box<dyn LandmarkSource>,
    overlay:      Box<dyn OverlaySink>,
    audio_events: Receiver<AudioEvent>,

    // ── gesture → mixer ───────────────────────────────────────────────────
    classifier:   DualClassifier,
    control:      MixerControl,

    // ── bookkeeping ───────────────────────────────────────────────────────
    phase:        AppPhase,
    max_failures: u32,
    failures:     u32,
    frames_seen:  u64,
    applied:      u64,
    recent:       Vec<String>,
    last_hands:   Vec<HandObservation>,
}

impl MainLoop {
    pub fn new(
        frames:       Box<dyn FrameSource>,
        landmarks:    Box<dyn LandmarkSource>,
        overlay:      Box<dyn OverlaySink>,
        audio_events: Receiver<AudioEvent>,
        classifier:   DualClassifier,
        control:      MixerControl,
        max_failures: u32,
    ) -> Self {
        MainLoop {
            frames,
            landmarks,
            overlay,
            audio_events,
            classifier,
            control,
            phase:        AppPhase::Running,
            max_failures: max_failures.max(1),
            failures:     0,
            frames_seen:  0,
            applied:      0,
            recent:       Vec::with_capacity(RECENT_MAX + 1),
            last_hands:   Vec::new(),
        }
    }

    pub fn phase(&self)            -> AppPhase   { self.phase }
    pub fn state(&self)            -> MixerState { self.control.state() }
    pub fn failures(&self)         -> u32        { self.failures }
    pub fn frames_processed(&self) -> u64        { self.frames_seen }
    pub fn gestures_applied(&self) -> u64        { self.applied }
    pub fn snapshots_published(&self) -> u64     { self.control.published() }

    /// Run until something asks for shutdown.
    pub fn run_until_shutdown(&mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = self.step() {
                self.phase = AppPhase::Shutdown;
                log::info!("Shutting down: {}", reason);
                return reason;
            }
        }
    }

    /// One iteration of the running phase.
    pub fn step(&mut self) -> Option<ShutdownReason> {
        // 1. Audio side
        if let Ok(event) = self.audio_events.try_recv() {
            return Some(match event {
                AudioEvent::StreamError(e) => ShutdownReason::AudioFailed(e),
                AudioEvent::EndOfTrack     => ShutdownReason::EndOfTrack,
            });
        }

        // 2. Window input
        if self.overlay.poll() == OverlayInput::Quit {
            return Some(ShutdownReason::UserQuit);
        }

        // 3. Frame (blocks until one is ready)
        let frame = match self.frames.read_frame() {
            Ok(frame) => frame,
            Err(e)    => return self.bad_frame(&e.to_string()),
        };

        // 4. Landmarks
        let hands = match self.landmarks.detect(&frame) {
            Ok(hands) => hands,
            Err(e)    => return self.bad_frame(&e.to_string()),
        };
        self.failures = 0;
        self.frames_seen += 1;

        // 5. Gestures → mixer
        let applied = self.apply_gestures(&hands);
        let state = self.control.state();
        for line in status::frame_report(&applied, &state) {
            println!("{}", line);
        }
        for a in &applied {
            self.recent.push(a.short());
        }
        if self.recent.len() > RECENT_MAX {
            let excess = self.recent.len() - RECENT_MAX;
            self.recent.drain(..excess);
        }
        self.last_hands = hands;

        // 6. Render
        let view = OverlayView {
            frame:    &frame,
            hands:    &self.last_hands,
            state,
            limits:   self.control.limits(),
            recent:   &self.recent,
            source:   self.landmarks.name(),
            failures: self.failures,
        };
        self.overlay.render(&view);

        None
    }

    fn bad_frame(&mut self, why: &str) -> Option<ShutdownReason> {
        self.failures += 1;
        log::warn!("Skipping frame ({}/{}): {}", self.failures, self.max_failures, why);
        if self.failures >= self.max_failures {
            Some(ShutdownReason::CameraFailed(format!(
                "{} consecutive bad frames, last: {}",
                self.failures, why
            )))
        } else {
            None
        }
    }

    fn apply_gestures(&mut self, hands: &[HandObservation]) -> Vec<AppliedGesture> {
        let signals = self.classifier.process(hands);

        // Triggers and actions come out of a signal in the same order
        let mut fired = Vec::new();
        for signal in &signals {
            let triggers = Trigger::from_signal(signal);
            for (trigger, action) in triggers.into_iter().zip(actions_for(signal)) {
                fired.push((signal.side, trigger, action));
            }
        }
        if fired.is_empty() {
            self.control.apply_all(&[]);
            return Vec::new();
        }

        let actions: Vec<Action> = fired.iter().map(|(_, _, a)| *a).collect();
        let changes = self.control.apply_all(&actions);
        self.applied += changes.len() as u64;

        fired
            .into_iter()
            .zip(changes)
            .map(|((side, trigger, _), change)| AppliedGesture { side, trigger, change })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Init / shutdown
// ════════════════════════════════════════════════════════════════════════════

/// How this build gets its hands, for the banner.
pub fn mode_description() -> &'static str {
    if cfg!(feature = "leap") {
        "LeapMotion hardware"
    } else if cfg!(feature = "onnx") {
        "Webcam + ONNX hand landmarks"
    } else if cfg!(feature = "camera") {
        "Webcam + keyboard-simulated hands  (use --features onnx for tracking)"
    } else {
        "Keyboard simulation  (use --features onnx or leap for real hands)"
    }
}

#[cfg(feature = "camera")]
fn open_frames(config: &CameraConfig) -> Result<Box<dyn FrameSource>, AppError> {
    Ok(Box::new(crate::camera::NokhwaCamera::open(config)?))
}

#[cfg(not(feature = "camera"))]
fn open_frames(config: &CameraConfig) -> Result<Box<dyn FrameSource>, AppError> {
    Ok(Box::new(crate::camera::PacedBlankSource::new(
        config.width as usize,
        config.height as usize,
        config.fps,
    )))
}

#[cfg(feature = "leap")]
fn open_landmarks(_config: &AppConfig) -> Result<(Box<dyn LandmarkSource>, Option<mpsc::Sender<SimInput>>), AppError> {
    Ok((Box::new(crate::leap::LeapLandmarkSource::open()?), None))
}

#[cfg(all(feature = "onnx", not(feature = "leap")))]
fn open_landmarks(config: &AppConfig) -> Result<(Box<dyn LandmarkSource>, Option<mpsc::Sender<SimInput>>), AppError> {
    Ok((Box::new(crate::onnx::OnnxLandmarkSource::load(&config.model)?), None))
}

#[cfg(not(any(feature = "onnx", feature = "leap")))]
fn open_landmarks(_config: &AppConfig) -> Result<(Box<dyn LandmarkSource>, Option<mpsc::Sender<SimInput>>), AppError> {
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    Ok((Box::new(crate::landmarks::SimLandmarkSource::new(sim_rx)), Some(sim_tx)))
}

/// Run the whole application: init, main loop, shutdown.
pub fn run(args: &CliArgs, mut config: AppConfig) -> Result<ShutdownReason, AppError> {
    if let Some(index) = args.camera {
        config.camera.index = index;
    }
    if args.no_loop {
        config.audio.loop_playback = false;
    }

    // ── Init ──────────────────────────────────────────────────────────────
    log::info!("Phase: {:?}", AppPhase::Init);
    let frames = open_frames(&config.camera)?;
    log::info!("Frames: {}", frames.describe());

    let track = decode_file(&args.song)?;
    println!(
        "  Song: {}  ({:.1} s, {} Hz)",
        args.song.display(),
        track.duration().as_secs_f64(),
        track.sample_rate
    );

    let initial = MixerState::default();
    let (mut output, publisher) = AudioOutput::start(track, &config.audio, initial)?;
    println!("  Output: {} ({} Hz, {} ch)", output.device_name(), output.sample_rate(), output.channels());

    let (landmarks, sim_tx) = open_landmarks(&config)?;
    log::info!("Landmarks: {}", landmarks.name());
    let overlay = Overlay::new(&config.overlay, sim_tx).map_err(AppError::Window)?;

    let control = MixerControl::new(initial, config.audio.limits.clone(), publisher);
    let mut main_loop = MainLoop::new(
        frames,
        landmarks,
        Box::new(overlay),
        output.events(),
        DualClassifier::new(config.gesture.clone()),
        control,
        config.camera.max_consecutive_failures,
    );

    println!();
    status::print_legend();

    // ── Running ───────────────────────────────────────────────────────────
    log::info!("Phase: {:?}", main_loop.phase());
    let reason = main_loop.run_until_shutdown();

    // ── Shutdown ──────────────────────────────────────────────────────────
    println!();
    println!("Cleaning up...");
    output.stop();
    let final_state = main_loop.state();
    let (frames_seen, applied) = (main_loop.frames_processed(), main_loop.gestures_applied());
    drop(main_loop);

    for line in status::summary_lines(frames_seen, applied, &final_state) {
        println!("  {}", line);
    }
    if reason.exit_code() != 0 {
        eprintln!("Stopped: {}", reason);
    }
    println!("Done!");
    Ok(reason)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    use audio_fx::{snapshot_channel, MixerLimits, SnapshotReceiver};
    use hand_gesture::{GestureConfig, HandSide};

    use crate::camera::{CameraError, Frame};
    use crate::landmarks::LandmarkError;

    const FRAME_MS: u64 = 33;

    // ── fakes ─────────────────────────────────────────────────────────────

    /// Good frames unless the script says otherwise.
    struct ScriptedFrames {
        bad: VecDeque<bool>,
        n:   u64,
    }

    impl FrameSource for ScriptedFrames {
        fn read_frame(&mut self) -> Result<Frame, CameraError> {
            let n = self.n;
            self.n += 1;
            if self.bad.pop_front().unwrap_or(false) {
                return Err(CameraError::Capture("scripted".into()));
            }
            Ok(Frame::blank(4, 3, Duration::from_millis(n * FRAME_MS)))
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    /// Hand positions `(side, x, y)` per frame; `None` is a detector error.
    struct ScriptedHands {
        script: VecDeque<Option<Vec<(HandSide, f32, f32)>>>,
    }

    impl LandmarkSource for ScriptedHands {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>, LandmarkError> {
            match self.script.pop_front() {
                Some(Some(hands)) => Ok(hands
                    .into_iter()
                    .map(|(side, x, y)| HandObservation::synthetic(side, x, y, 0.0, 0.1, frame.timestamp))
                    .collect()),
                Some(None) => Err(LandmarkError::Inference("scripted".into())),
                None => Ok(Vec::new()),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct CountingOverlay {
        polls:      Rc<Cell<u32>>,
        renders:    Rc<Cell<u32>>,
        quit_after: Option<u32>,
    }

    impl OverlaySink for CountingOverlay {
        fn poll(&mut self) -> OverlayInput {
            self.polls.set(self.polls.get() + 1);
            match self.quit_after {
                Some(n) if self.polls.get() > n => OverlayInput::Quit,
                _ => OverlayInput::Continue,
            }
        }

        fn render(&mut self, _view: &OverlayView<'_>) {
            self.renders.set(self.renders.get() + 1);
        }
    }

    struct Rig {
        main:     MainLoop,
        snaps:    SnapshotReceiver,
        audio_tx: crossbeam_channel::Sender<AudioEvent>,
        renders:  Rc<Cell<u32>>,
    }

    fn rig(
        bad_frames: &[bool],
        hands: Vec<Option<Vec<(HandSide, f32, f32)>>>,
        quit_after: Option<u32>,
        max_failures: u32,
    ) -> Rig {
        let renders = Rc::new(Cell::new(0));
        let overlay = CountingOverlay { polls: Rc::new(Cell::new(0)), renders: renders.clone(), quit_after };
        let (publisher, snaps) = snapshot_channel(16, MixerState::default());
        let control = MixerControl::new(MixerState::default(), MixerLimits::default(), publisher);
        let (audio_tx, audio_rx) = crossbeam_channel::bounded(4);
        let main = MainLoop::new(
            Box::new(ScriptedFrames { bad: bad_frames.iter().copied().collect(), n: 0 }),
            Box::new(ScriptedHands { script: hands.into_iter().collect() }),
            Box::new(overlay),
            audio_rx,
            DualClassifier::new(GestureConfig::default()),
            control,
            max_failures,
        );
        Rig { main, snaps, audio_tx, renders }
    }

    fn left(y: f32) -> (HandSide, f32, f32) {
        (HandSide::Left, 0.3, y)
    }

    fn right(y: f32) -> (HandSide, f32, f32) {
        (HandSide::Right, 0.7, y)
    }

    // ── frame failures ────────────────────────────────────────────────────

    #[test]
    fn single_bad_frame_is_skipped() {
        let mut r = rig(&[false, true, false], vec![], None, 30);
        assert_eq!(r.main.step(), None);
        assert_eq!(r.main.step(), None);
        assert_eq!(r.main.failures(), 1);
        assert_eq!(r.main.step(), None);
        assert_eq!(r.main.failures(), 0);
        assert_eq!(r.main.frames_processed(), 2);
        assert_eq!(r.renders.get(), 2);
    }

    #[test]
    fn consecutive_bad_frames_are_fatal() {
        let mut r = rig(&[true; 30], vec![], None, 30);
        for _ in 0..29 {
            assert_eq!(r.main.step(), None);
        }
        let reason = r.main.step().unwrap();
        assert!(matches!(reason, ShutdownReason::CameraFailed(_)));
        assert_eq!(reason.exit_code(), 2);
        assert_eq!(r.main.frames_processed(), 0);
    }

    #[test]
    fn landmark_error_counts_as_bad_frame() {
        let mut r = rig(&[], vec![None, None], None, 2);
        assert_eq!(r.main.step(), None);
        assert!(matches!(r.main.step(), Some(ShutdownReason::CameraFailed(_))));
    }

    // ── gestures → mixer ──────────────────────────────────────────────────

    #[test]
    fn no_hands_means_no_drift() {
        let mut r = rig(&[], vec![], None, 30);
        for _ in 0..20 {
            assert_eq!(r.main.step(), None);
        }
        assert_eq!(r.main.state(), MixerState::default());
        assert_eq!(r.main.snapshots_published(), 0);
        assert_eq!(r.snaps.latest(), MixerState::default());
    }

    #[test]
    fn left_up_over_three_frames_is_one_bass_step() {
        let script = vec![Some(vec![left(0.5)]), Some(vec![left(0.47)]), Some(vec![left(0.44)])];
        let mut r = rig(&[], script, None, 30);
        for _ in 0..3 {
            r.main.step();
        }
        let state = r.main.state();
        assert_eq!(state.bass_db, 2.0);
        assert_eq!(MixerState { bass_db: 0.0, ..state }, MixerState::default());
        assert_eq!(r.main.gestures_applied(), 1);
        assert_eq!(r.main.snapshots_published(), 1);
    }

    #[test]
    fn still_right_hand_changes_nothing() {
        let script = (0..10).map(|_| Some(vec![right(0.6)])).collect();
        let mut r = rig(&[], script, None, 30);
        for _ in 0..10 {
            r.main.step();
        }
        assert_eq!(r.main.state(), MixerState::default());
        assert_eq!(r.main.gestures_applied(), 0);
    }

    #[test]
    fn simultaneous_hands_publish_one_snapshot() {
        let script = vec![
            Some(vec![left(0.5), right(0.5)]),
            Some(vec![left(0.47), right(0.53)]),
        ];
        let mut r = rig(&[], script, None, 30);
        r.main.step();
        r.main.step();

        let state = r.main.state();
        assert_eq!(state.bass_db, 2.0);
        assert_eq!(state.volume_db, -3.0);
        assert_eq!(r.main.gestures_applied(), 2);
        assert_eq!(r.main.snapshots_published(), 1);
        assert_eq!(r.snaps.latest(), state);
    }

    // ── shutdown ──────────────────────────────────────────────────────────

    #[test]
    fn audio_error_stops_before_reading_a_frame() {
        let mut r = rig(&[], vec![], None, 30);
        r.audio_tx.send(AudioEvent::StreamError("device unplugged".into())).unwrap();
        let reason = r.main.step().unwrap();
        assert_eq!(reason, ShutdownReason::AudioFailed("device unplugged".into()));
        assert_eq!(reason.exit_code(), 3);
        assert_eq!(r.main.frames_processed(), 0);
    }

    #[test]
    fn end_of_track_is_a_clean_exit() {
        let mut r = rig(&[], vec![], None, 30);
        r.main.step();
        r.audio_tx.send(AudioEvent::EndOfTrack).unwrap();
        let reason = r.main.step().unwrap();
        assert_eq!(reason, ShutdownReason::EndOfTrack);
        assert_eq!(reason.exit_code(), 0);
    }

    #[test]
    fn overlay_quit_ends_the_run() {
        let mut r = rig(&[], vec![], Some(3), 30);
        assert_eq!(r.main.phase(), AppPhase::Running);
        let reason = r.main.run_until_shutdown();
        assert_eq!(reason, ShutdownReason::UserQuit);
        assert_eq!(r.main.phase(), AppPhase::Shutdown);
        assert_eq!(r.main.frames_processed(), 3);
        assert_eq!(r.renders.get(), 3);
    }
}
