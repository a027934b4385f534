mod logging_backend;

use std::{path::Path, time::Duration};
use xrscene_common::{
    HAND_LEFT_PATH, HAND_RIGHT_PATH, Hand, MOTION_CONTROLLER_PROFILE_PATH, Pose,
    TOUCH_CONTROLLER_PROFILE_PATH, anyhow::Result, glam::Vec3, info, show_err, warn,
};
use xrscene_interaction::{
    FrameTime, JointLocation, XrRuntime,
    mock::{MockRuntime, ObjectArena},
};
use xrscene_scenes::{
    ControllerActionsScene, HandTrackingScene, MenuScene, PauseScene, XrApp,
};
use xrscene_session::{SETTINGS_FNAME, Settings, load_settings};

const FRAME_INTERVAL: Duration = Duration::from_millis(11);
const MAX_FRAMES: u64 = 2000;

enum Step {
    Connect(&'static str, &'static str),
    Disconnect(&'static str),
    Input(&'static str, f32),
    InputPose(&'static str, Pose),
    ViewPose(Pose),
    Palm(Hand, Option<JointLocation>),
    RequestExit,
}

fn palm(x: f32) -> Option<JointLocation> {
    Some(JointLocation {
        pose: Pose::from_translation(Vec3::new(x, 1.2, -0.3)),
        radius: 0.03,
    })
}

// Frame index and the device change applied before that frame
fn timeline() -> Vec<(u64, Step)> {
    use Step::*;

    vec![
        (0, ViewPose(Pose::from_translation(Vec3::new(0.0, 1.6, 0.0)))),
        (0, Connect(HAND_LEFT_PATH, TOUCH_CONTROLLER_PROFILE_PATH)),
        (0, Connect(HAND_RIGHT_PATH, TOUCH_CONTROLLER_PROFILE_PATH)),
        (
            0,
            InputPose(
                "/user/hand/left/input/grip/pose",
                Pose::from_translation(Vec3::new(-0.2, 1.1, -0.3)),
            ),
        ),
        (
            0,
            InputPose(
                "/user/hand/right/input/grip/pose",
                Pose::from_translation(Vec3::new(0.2, 1.1, -0.3)),
            ),
        ),
        (10, Input("/user/hand/left/input/trigger/value", 0.8)),
        (20, Input("/user/hand/left/input/trigger/value", 0.0)),
        (30, Palm(Hand::Left, palm(-0.3))),
        (30, Palm(Hand::Right, palm(0.0))),
        (40, Palm(Hand::Left, palm(-0.05))),
        (50, Palm(Hand::Left, palm(-0.3))),
        (60, Disconnect(HAND_RIGHT_PATH)),
        (70, Connect(HAND_RIGHT_PATH, MOTION_CONTROLLER_PROFILE_PATH)),
        (80, Input("/user/hand/left/input/menu/click", 1.0)),
        (81, Input("/user/hand/left/input/menu/click", 0.0)),
        (90, Input("/user/hand/left/input/menu/click", 1.0)),
        (91, Input("/user/hand/left/input/menu/click", 0.0)),
        (120, RequestExit),
    ]
}

fn apply_step(runtime: &mut MockRuntime, step: &Step) -> Result<()> {
    match step {
        Step::Connect(path, profile) => runtime.connect(path, profile),
        Step::Disconnect(path) => runtime.disconnect(path),
        Step::Input(path, value) => runtime.set_input(path, *value),
        Step::InputPose(path, pose) => runtime.set_pose(path, *pose),
        Step::ViewPose(pose) => runtime.set_view_pose(Some(*pose)),
        Step::Palm(hand, location) => runtime.set_palm(*hand, *location),
        Step::RequestExit => runtime.request_exit_session()?,
    }

    Ok(())
}

// Returns the number of frames run
fn run(settings: Settings) -> Result<u64> {
    let hand_tracking = settings.extensions.hand_tracking;

    let mut app = XrApp::new(MockRuntime::new(), ObjectArena::new(), settings);
    app.add_scene(true, ControllerActionsScene::new)?;
    if hand_tracking {
        app.add_scene(true, HandTrackingScene::new)?;
    }
    app.add_scene(false, |_| Ok(PauseScene::new()))?;
    app.add_scene(true, MenuScene::new)?;
    app.start()?;

    let timeline = timeline();
    let mut frame_time = FrameTime::default();
    while app.is_running() && frame_time.frame_index < MAX_FRAMES {
        for (_, step) in timeline
            .iter()
            .filter(|(frame_index, _)| *frame_index == frame_time.frame_index)
        {
            apply_step(app.runtime_mut(), step)?;
        }

        app.tick(&frame_time)?;

        frame_time = frame_time.next(FRAME_INTERVAL + app.throttle_delay());
    }

    info!(
        "Ran {} frames over {:?}",
        frame_time.frame_index, frame_time.elapsed
    );

    Ok(frame_time.frame_index)
}

fn main() {
    let (settings, load_error) = match load_settings(Path::new(SETTINGS_FNAME)) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    if let Err(e) = logging_backend::init_logging(&settings.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }
    if let Some(e) = load_error {
        warn!("Using default settings. {e:#}");
    }

    show_err(run(settings));
}
