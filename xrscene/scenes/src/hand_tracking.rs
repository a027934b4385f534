use crate::{Scene, SceneContext, SetupContext};
use xrscene_common::{
    HAND_INTERACTION_PROFILE_PATH, Hand, MOTION_CONTROLLER_PROFILE_PATH,
    SIMPLE_CONTROLLER_PROFILE_PATH, anyhow::Result, debug, glam::Vec3, info,
};
use xrscene_interaction::{
    Action, ActionBinding, ActionType, DeclaredAction, ExpansionContext, FrameTime,
    HandJointsMotionRange, JointLocation, ObjectId, StateChangeDetector,
    compile_bindings, priorities,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandDisplayMode {
    #[default]
    Joints,
    Hidden,
}

impl HandDisplayMode {
    fn toggled(self) -> Self {
        match self {
            HandDisplayMode::Joints => HandDisplayMode::Hidden,
            HandDisplayMode::Hidden => HandDisplayMode::Joints,
        }
    }
}

fn next_motion_range(motion_range: HandJointsMotionRange) -> HandJointsMotionRange {
    match motion_range {
        HandJointsMotionRange::Unobstructed => HandJointsMotionRange::ConformingToController,
        HandJointsMotionRange::ConformingToController => HandJointsMotionRange::Unobstructed,
    }
}

#[derive(Clone, Copy, Debug)]
struct ClapSample {
    left: Option<JointLocation>,
    right: Option<JointLocation>,
    distance_threshold_m: f32,
}

// Palms closer than the threshold, measured between their surfaces
fn palms_touching(sample: ClapSample) -> bool {
    match (sample.left, sample.right) {
        (Some(left), Some(right)) => {
            let distance = left.pose.position.distance(right.pose.position);
            distance - left.radius - right.radius < sample.distance_threshold_m
        }
        _ => false,
    }
}

fn log_clap() {
    debug!("Clap detected");
}

type ClapDetector = StateChangeDetector<fn(ClapSample) -> bool, fn()>;

struct HandData {
    hand: Hand,
    palm_object: ObjectId,
    palm: Option<JointLocation>,
}

/// Shows the tracked palm of each hand as an axis scaled by the palm radius. A clap toggles the
/// display and the motion range action switches between unobstructed and controller-conforming
/// joints.
pub struct HandTrackingScene {
    motion_range_action: Action,
    motion_range: HandJointsMotionRange,
    display_mode: HandDisplayMode,
    hands: [HandData; 2],
    clap_detector: ClapDetector,
}

impl HandTrackingScene {
    pub fn new(ctx: &mut SetupContext) -> Result<Self> {
        let action_set = ctx.actions.create_action_set(
            &mut *ctx.runtime,
            "hand_tracking_scene_actions",
            "Hand Tracking Scene Actions",
            priorities::DEFAULT,
        )?;

        let motion_range_action = ctx.actions.create_action(
            &mut *ctx.runtime,
            action_set,
            "motion_range_mode_change_action",
            "Motion Range Mode Change Action",
            ActionType::Boolean,
            &[],
        )?;

        let mut bindings = vec![
            ActionBinding::new(MOTION_CONTROLLER_PROFILE_PATH, "trigger/value"),
            ActionBinding::new(SIMPLE_CONTROLLER_PROFILE_PATH, "select/click"),
        ];
        if ctx.settings.extensions.hand_interaction {
            bindings.push(ActionBinding::new(
                HAND_INTERACTION_PROFILE_PATH,
                "select/value",
            ));
        }

        let declared = [DeclaredAction {
            action: motion_range_action.clone(),
            bindings,
        }];
        compile_bindings(&declared, &ExpansionContext::Hands).submit(ctx.actions)?;

        let objects = &mut *ctx.objects;
        let hands = [Hand::Left, Hand::Right].map(|hand| {
            let palm_object = objects.create_object(None);
            objects.set_visible(palm_object, false);

            HandData {
                hand,
                palm_object,
                palm: None,
            }
        });

        Ok(Self {
            motion_range_action,
            motion_range: HandJointsMotionRange::Unobstructed,
            display_mode: HandDisplayMode::Joints,
            hands,
            clap_detector: StateChangeDetector::new(
                palms_touching as fn(ClapSample) -> bool,
                log_clap as fn(),
            ),
        })
    }

    pub fn motion_range(&self) -> HandJointsMotionRange {
        self.motion_range
    }

    pub fn display_mode(&self) -> HandDisplayMode {
        self.display_mode
    }

    pub fn palm_object(&self, hand: Hand) -> ObjectId {
        match hand {
            Hand::Left => self.hands[0].palm_object,
            Hand::Right => self.hands[1].palm_object,
        }
    }
}

impl Scene for HandTrackingScene {
    fn name(&self) -> &str {
        "Hand tracking"
    }

    fn on_update(&mut self, ctx: &mut SceneContext, frame_time: &FrameTime) -> Result<()> {
        let time = frame_time.predicted_display_time;

        let state = self.motion_range_action.boolean_state(&*ctx.runtime, None)?;
        if state.is_active && state.changed_since_last_sync && state.current_state {
            self.motion_range = next_motion_range(self.motion_range);
            info!("Hand joints motion range: {:?}", self.motion_range);
        }

        for data in &mut self.hands {
            data.palm = ctx
                .runtime
                .locate_palm(data.hand, self.motion_range, time)?;

            let visible = match data.palm {
                Some(palm) if self.display_mode == HandDisplayMode::Joints => {
                    ctx.objects.set_pose(data.palm_object, palm.pose);
                    ctx.objects
                        .set_scale(data.palm_object, Vec3::splat(palm.radius));
                    true
                }
                _ => false,
            };
            ctx.objects.set_visible(data.palm_object, visible);
        }

        let clapped = self.clap_detector.update(ClapSample {
            left: self.hands[0].palm,
            right: self.hands[1].palm,
            distance_threshold_m: ctx.settings.gestures.clap_distance_m,
        });
        if clapped {
            self.display_mode = self.display_mode.toggled();
            info!("Hand display mode: {:?}", self.display_mode);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_utils::Harness;
    use xrscene_common::{HAND_LEFT_PATH, Pose};
    use xrscene_session::Settings;

    fn palm_at(x: f32) -> Option<JointLocation> {
        Some(JointLocation {
            pose: Pose::from_translation(Vec3::new(x, 1.2, -0.3)),
            radius: 0.03,
        })
    }

    fn harness() -> (Harness, HandTrackingScene) {
        let mut harness = Harness::new(Settings::default());
        let scene = harness.setup(HandTrackingScene::new);
        harness.attach();

        (harness, scene)
    }

    #[test]
    fn clap_threshold_accounts_for_palm_radius() {
        let sample = |left_x: f32| ClapSample {
            left: palm_at(left_x),
            right: palm_at(0.0),
            distance_threshold_m: 0.02,
        };

        // 7cm apart with 3cm radii leaves a 1cm gap
        assert!(palms_touching(sample(-0.07)));
        assert!(!palms_touching(sample(-0.09)));
        assert!(!palms_touching(ClapSample {
            right: None,
            ..sample(0.0)
        }));
    }

    #[test]
    fn palms_are_shown_scaled_by_radius() {
        let (mut harness, mut scene) = harness();
        harness.runtime.set_palm(Hand::Left, palm_at(-0.2));
        harness.tick(&mut scene);

        let left = harness.objects.object(scene.palm_object(Hand::Left)).unwrap();
        assert!(left.visible);
        assert_eq!(left.scale, Vec3::splat(0.03));
        assert!(
            !harness
                .objects
                .object(scene.palm_object(Hand::Right))
                .unwrap()
                .visible
        );
    }

    #[test]
    fn each_clap_toggles_display_mode() {
        let (mut harness, mut scene) = harness();
        harness.runtime.set_palm(Hand::Left, palm_at(-0.3));
        harness.runtime.set_palm(Hand::Right, palm_at(0.0));
        harness.tick(&mut scene);

        let clap = |harness: &mut Harness, scene: &mut HandTrackingScene| {
            harness.runtime.set_palm(Hand::Left, palm_at(-0.05));
            harness.tick(scene);
            harness.runtime.set_palm(Hand::Left, palm_at(-0.3));
            harness.tick(scene);
        };

        clap(&mut harness, &mut scene);
        assert_eq!(scene.display_mode(), HandDisplayMode::Hidden);
        let left = harness.objects.object(scene.palm_object(Hand::Left)).unwrap();
        assert!(!left.visible);

        clap(&mut harness, &mut scene);
        assert_eq!(scene.display_mode(), HandDisplayMode::Joints);
    }

    #[test]
    fn palms_touching_from_the_start_is_not_a_clap() {
        let (mut harness, mut scene) = harness();
        harness.runtime.set_palm(Hand::Left, palm_at(-0.05));
        harness.runtime.set_palm(Hand::Right, palm_at(0.0));

        harness.tick(&mut scene);
        harness.tick(&mut scene);

        assert_eq!(scene.display_mode(), HandDisplayMode::Joints);
    }

    #[test]
    fn trigger_press_cycles_motion_range() {
        let (mut harness, mut scene) = harness();
        harness
            .runtime
            .connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        harness.tick(&mut scene);
        assert_eq!(scene.motion_range(), HandJointsMotionRange::Unobstructed);

        harness
            .runtime
            .set_input("/user/hand/left/input/trigger/value", 1.0);
        harness.tick(&mut scene);
        assert_eq!(
            scene.motion_range(),
            HandJointsMotionRange::ConformingToController
        );
        assert_eq!(
            harness.runtime.last_motion_range(),
            Some(HandJointsMotionRange::ConformingToController)
        );

        // Holding does not cycle again
        harness.tick(&mut scene);
        assert_eq!(
            scene.motion_range(),
            HandJointsMotionRange::ConformingToController
        );

        harness
            .runtime
            .set_input("/user/hand/left/input/trigger/value", 0.0);
        harness.tick(&mut scene);
        harness
            .runtime
            .set_input("/user/hand/left/input/trigger/value", 1.0);
        harness.tick(&mut scene);
        assert_eq!(scene.motion_range(), HandJointsMotionRange::Unobstructed);
    }
}
