use crate::{ActionType, DeclaredAction, ProfileState, XrRuntime, read_component_value};
use std::{fmt::Write, time::Duration};
use xrscene_common::{
    HAND_LEFT_PATH, Pose,
    anyhow::Result,
    glam::{Quat, Vec3},
    info,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

/// Scene graph operations provided by the rendering engine.
pub trait SceneObjects {
    fn create_object(&mut self, parent: Option<ObjectId>) -> ObjectId;
    fn remove_object(&mut self, object: ObjectId);
    fn set_pose(&mut self, object: ObjectId, pose: Pose);
    fn set_scale(&mut self, object: ObjectId, scale: Vec3);
    fn set_visible(&mut self, object: ObjectId, visible: bool);
    fn set_fill_mode(&mut self, object: ObjectId, fill_mode: FillMode);
    fn set_text(&mut self, object: ObjectId, text: &str);
}

const COMPONENT_X_OFFSET: f32 = 0.1;
const COMPONENT_Z_START: f32 = -0.073;
const COMPONENT_Z_STEP: f32 = 0.0096 * 1.47;
const VALUE_BAR_UNIT: f32 = 0.0021;
const TEXT_X_OFFSET: f32 = 0.05;
const TEXT_SCALE: f32 = 0.1;

pub fn component_placement(top_level_path: &str, index: usize) -> Vec3 {
    let x = if top_level_path == HAND_LEFT_PATH {
        -COMPONENT_X_OFFSET
    } else {
        COMPONENT_X_OFFSET
    };

    Vec3::new(x, 0.0, COMPONENT_Z_START + index as f32 * COMPONENT_Z_STEP)
}

/// Slide bar growing along x with the value. Returns the bar pose and scale.
pub fn value_bar_transform(value: f32) -> (Pose, Vec3) {
    let u = VALUE_BAR_UNIT;
    let scale = (1.0 + 10.0 * value) * u;
    let offset = (1.0 + 5.0 * value) * u;

    (
        Pose::from_translation(Vec3::new(offset, 0.0, 0.0)),
        Vec3::new(scale, u, u),
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentData {
    // Index into the declared action table
    pub action_index: usize,
    pub component_path: String,
    pub value: f32,
    pub is_active: bool,
    pub placement: ObjectId,
    pub value_bar: ObjectId,
}

/// Visualization of the components bound for one top level user path. Rebuilt from scratch on
/// every interaction profile transition.
pub struct ControllerComponents {
    top_level_path: String,
    root: ObjectId,
    components: Vec<ComponentData>,
    text: String,
    text_object: Option<ObjectId>,
    rebuild_count: usize,
}

impl ControllerComponents {
    pub fn new(top_level_path: &str, root: ObjectId) -> Self {
        Self {
            top_level_path: top_level_path.into(),
            root,
            components: vec![],
            text: String::new(),
            text_object: None,
            rebuild_count: 0,
        }
    }

    pub fn top_level_path(&self) -> &str {
        &self.top_level_path
    }

    pub fn components(&self) -> &[ComponentData] {
        &self.components
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn text_object(&self) -> Option<ObjectId> {
        self.text_object
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    fn clear(&mut self, objects: &mut dyn SceneObjects) {
        for component in self.components.drain(..) {
            objects.remove_object(component.value_bar);
            objects.remove_object(component.placement);
        }
        if let Some(text_object) = self.text_object.take() {
            objects.remove_object(text_object);
        }
        self.text.clear();
    }

    pub fn rebuild(
        &mut self,
        objects: &mut dyn SceneObjects,
        actions: &[DeclaredAction],
        profile: &ProfileState,
    ) {
        self.rebuild_count += 1;

        self.clear(objects);

        let Some(profile_path) = profile.profile() else {
            info!("{}: {}", self.top_level_path, profile.display_name());
            return;
        };

        for (action_index, declared) in actions.iter().enumerate() {
            if declared.action.action_type == ActionType::Vibration {
                continue;
            }

            let Some(binding) = declared
                .bindings
                .iter()
                .find(|binding| binding.matches(profile_path, &self.top_level_path))
            else {
                continue;
            };

            let placement = objects.create_object(Some(self.root));
            objects.set_pose(
                placement,
                Pose::from_translation(component_placement(
                    &self.top_level_path,
                    self.components.len(),
                )),
            );

            let value_bar = objects.create_object(Some(placement));
            let (pose, scale) = value_bar_transform(0.0);
            objects.set_pose(value_bar, pose);
            objects.set_scale(value_bar, scale);
            objects.set_fill_mode(value_bar, FillMode::Wireframe);

            self.components.push(ComponentData {
                action_index,
                component_path: binding.component_path.clone(),
                value: 0.0,
                is_active: false,
                placement,
                value_bar,
            });
        }

        if self.components.is_empty() {
            info!("{}: {profile_path} has no bound components", self.top_level_path);
            return;
        }

        let mut text = format!("{profile_path}\n");
        for component in &self.components {
            write!(
                text,
                "\n{}:\n{}, {}\n",
                component.component_path,
                self.top_level_path,
                actions[component.action_index].action.name
            )
            .ok();
        }
        info!("{}: {text}", self.top_level_path);

        let text_object = objects.create_object(Some(self.root));
        let x = if self.top_level_path == HAND_LEFT_PATH {
            -TEXT_X_OFFSET
        } else {
            TEXT_X_OFFSET
        };
        objects.set_pose(
            text_object,
            Pose {
                orientation: Quat::from_xyzw(-0.707, 0.0, 0.0, 0.707).normalize(),
                position: Vec3::new(x, -0.01, 0.0),
            },
        );
        objects.set_scale(text_object, Vec3::splat(TEXT_SCALE));
        objects.set_text(text_object, &text);

        self.text = text;
        self.text_object = Some(text_object);
    }

    /// Sample every component and update its value bar.
    pub fn update_values(
        &mut self,
        runtime: &dyn XrRuntime,
        objects: &mut dyn SceneObjects,
        actions: &[DeclaredAction],
        time: Duration,
    ) -> Result<()> {
        for component in &mut self.components {
            let sample = read_component_value(
                runtime,
                &actions[component.action_index].action,
                &self.top_level_path,
                time,
            )?;

            component.value = sample.value;
            component.is_active = sample.is_active;

            let (pose, scale) = value_bar_transform(sample.value);
            objects.set_pose(component.value_bar, pose);
            objects.set_scale(component.value_bar, scale);
            objects.set_fill_mode(
                component.value_bar,
                if sample.is_active {
                    FillMode::Solid
                } else {
                    FillMode::Wireframe
                },
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ActionBinding, ActionContext, ExpansionContext, InteractionProfileResolver,
        compile_bindings,
        mock::{MockRuntime, ObjectArena, ObjectOp},
        priorities,
    };
    use xrscene_common::{
        HAND_RIGHT_PATH, MOTION_CONTROLLER_PROFILE_PATH, SIMPLE_CONTROLLER_PROFILE_PATH,
        TOUCH_CONTROLLER_PROFILE_PATH,
    };

    struct Fixture {
        runtime: MockRuntime,
        objects: ObjectArena,
        context: ActionContext,
        actions: Vec<DeclaredAction>,
    }

    fn fixture() -> Fixture {
        let mut runtime = MockRuntime::new();
        let mut context = ActionContext::new();
        let set = context
            .create_action_set(&mut runtime, "components_test", "Test", priorities::DEFAULT)
            .unwrap();
        let hands = [HAND_LEFT_PATH, HAND_RIGHT_PATH];

        let mut declare = |name: &str, action_type, bindings| DeclaredAction {
            action: context
                .create_action(&mut runtime, set, name, name, action_type, &hands)
                .unwrap(),
            bindings,
        };

        let actions = vec![
            declare(
                "select",
                ActionType::Boolean,
                vec![ActionBinding::new(SIMPLE_CONTROLLER_PROFILE_PATH, "select/click")],
            ),
            declare(
                "trigger_value",
                ActionType::Float,
                vec![
                    ActionBinding::new(MOTION_CONTROLLER_PROFILE_PATH, "trigger/value"),
                    ActionBinding::new(TOUCH_CONTROLLER_PROFILE_PATH, "trigger/value"),
                ],
            ),
            declare(
                "x",
                ActionType::Boolean,
                vec![ActionBinding::with_subaction(
                    TOUCH_CONTROLLER_PROFILE_PATH,
                    "x/click",
                    HAND_LEFT_PATH,
                )],
            ),
            declare(
                "haptics",
                ActionType::Vibration,
                vec![ActionBinding::new(MOTION_CONTROLLER_PROFILE_PATH, "haptic")],
            ),
        ];

        compile_bindings(&actions, &ExpansionContext::Hands)
            .submit(&mut context)
            .unwrap();
        context.attach(&mut runtime, &[]).unwrap();

        Fixture {
            runtime,
            objects: ObjectArena::new(),
            context,
            actions,
        }
    }

    #[test]
    fn rebuild_creates_matching_components() {
        let mut f = fixture();
        let root = f.objects.create_object(None);
        let mut left = ControllerComponents::new(HAND_LEFT_PATH, root);
        let mut right = ControllerComponents::new(HAND_RIGHT_PATH, root);
        let touch = ProfileState::Resolved(TOUCH_CONTROLLER_PROFILE_PATH.into());

        left.rebuild(&mut f.objects, &f.actions, &touch);
        right.rebuild(&mut f.objects, &f.actions, &touch);

        assert_eq!(
            left.components()
                .iter()
                .map(|c| c.component_path.as_str())
                .collect::<Vec<_>>(),
            ["trigger/value", "x/click"]
        );
        // x is bound to the left hand only
        assert_eq!(right.components().len(), 1);

        let second = f.objects.object(left.components()[1].placement).unwrap();
        assert!((second.pose.position.x + 0.1).abs() < 1e-6);
        assert!((second.pose.position.z - (-0.073 + 0.0096 * 1.47)).abs() < 1e-6);

        assert!(left.text().starts_with(TOUCH_CONTROLLER_PROFILE_PATH));
        assert!(left.text().contains("x/click:\n/user/hand/left, x"));
        assert!(left.text_object().is_some());
    }

    #[test]
    fn transition_removes_old_components_before_creating_new_ones() {
        let mut f = fixture();
        let root = f.objects.create_object(None);
        let mut left = ControllerComponents::new(HAND_LEFT_PATH, root);

        left.rebuild(
            &mut f.objects,
            &f.actions,
            &ProfileState::Resolved(TOUCH_CONTROLLER_PROFILE_PATH.into()),
        );
        let old_objects = f.objects.live_objects().len();
        let log_start = f.objects.log().len();

        left.rebuild(
            &mut f.objects,
            &f.actions,
            &ProfileState::Resolved(SIMPLE_CONTROLLER_PROFILE_PATH.into()),
        );

        let ops = &f.objects.log()[log_start..];
        let first_created = ops
            .iter()
            .position(|op| matches!(op, ObjectOp::Created(_)))
            .unwrap();
        let last_removed = ops
            .iter()
            .rposition(|op| matches!(op, ObjectOp::Removed(_)))
            .unwrap();
        assert!(last_removed < first_created);
        // 2 components with 2 objects each plus the text
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, ObjectOp::Removed(_)))
                .count(),
            5
        );
        assert!(old_objects > f.objects.live_objects().len());
        assert_eq!(left.components().len(), 1);
        assert_eq!(left.rebuild_count(), 2);
    }

    #[test]
    fn removed_controller_clears_components_and_reads_inactive() {
        let mut f = fixture();
        let root = f.objects.create_object(None);
        let mut left = ControllerComponents::new(HAND_LEFT_PATH, root);
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH]);

        f.runtime
            .connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        f.runtime.set_input("/user/hand/left/input/trigger/value", 0.5);
        for transition in resolver.update(&f.runtime).unwrap() {
            left.rebuild(&mut f.objects, &f.actions, &transition.current);
        }
        f.context.sync(&mut f.runtime).unwrap();
        left.update_values(&f.runtime, &mut f.objects, &f.actions, Duration::ZERO)
            .unwrap();
        assert_eq!(left.components().len(), 1);
        assert!(left.components()[0].is_active);
        assert_eq!(left.components()[0].value, 0.5);
        let bar = f.objects.object(left.components()[0].value_bar).unwrap();
        assert_eq!(bar.fill_mode, FillMode::Solid);

        f.runtime.disconnect(HAND_LEFT_PATH);
        resolver.mark_dirty();
        for transition in resolver.update(&f.runtime).unwrap() {
            left.rebuild(&mut f.objects, &f.actions, &transition.current);
        }
        f.context.sync(&mut f.runtime).unwrap();
        left.update_values(&f.runtime, &mut f.objects, &f.actions, Duration::ZERO)
            .unwrap();

        assert!(left.components().is_empty());
        assert!(left.text_object().is_none());
        assert_eq!(resolver.display_name(HAND_LEFT_PATH), "No interaction profile");

        let trigger = &f.actions[1].action;
        let value =
            read_component_value(&f.runtime, trigger, HAND_LEFT_PATH, Duration::ZERO).unwrap();
        assert!(!value.is_active);
        assert_eq!(value.value, 0.0);
    }

    #[test]
    fn unchanged_profile_does_not_rebuild() {
        let mut f = fixture();
        let root = f.objects.create_object(None);
        let mut left = ControllerComponents::new(HAND_LEFT_PATH, root);
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH]);

        // Nothing connected, the first pass resolves to no profile
        for _ in 0..3 {
            resolver.mark_dirty();
            for transition in resolver.update(&f.runtime).unwrap() {
                left.rebuild(&mut f.objects, &f.actions, &transition.current);
            }
        }

        assert_eq!(left.rebuild_count(), 0);
    }

    #[test]
    fn value_bar_grows_with_value() {
        let (pose, scale) = value_bar_transform(1.0);

        assert!((scale.x - 11.0 * 0.0021).abs() < 1e-6);
        assert!((pose.position.x - 6.0 * 0.0021).abs() < 1e-6);
        assert_eq!(scale.y, 0.0021);
    }
}
