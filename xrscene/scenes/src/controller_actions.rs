use crate::{Scene, SceneContext, SetupContext};
use xrscene_common::{
    HAND_LEFT_PATH, HAND_PATHS, HAND_RIGHT_PATH, Hand,
    INDEX_CONTROLLER_PROFILE_PATH as INDEX, MOTION_CONTROLLER_PROFILE_PATH as MOTION, Pose,
    SIMPLE_CONTROLLER_PROFILE_PATH as SIMPLE, TOUCH_CONTROLLER_PROFILE_PATH as TOUCH,
    TRACKER_ROLE_PATHS, TRACKER_ROLES, ToAny, VIVE_CONTROLLER_PROFILE_PATH as VIVE,
    VIVE_TRACKER_PROFILE_PATH as TRACKER,
    anyhow::Result,
    glam::Vec3,
    info,
};
use xrscene_interaction::{
    ActionBinding, ActionType, ControllerComponents, DeclaredAction, ExpansionContext, FrameTime,
    InteractionProfileResolver, NO_INTERACTION_PROFILE, ObjectId, RuntimeEvent, SceneObjects,
    compile_bindings, priorities,
};

const ACTION_SET_NAME: &str = "controller_actions_scene_actionset";

const AXIS_SCALE: Vec3 = Vec3::splat(0.05);
const AIM_RAY_SCALE: Vec3 = Vec3::new(0.001, 0.001, 2.0);

fn wildcard(profile: &str, component: &str) -> ActionBinding {
    ActionBinding::new(profile, component)
}

fn only(profile: &str, component: &str, subaction_path: &str) -> ActionBinding {
    ActionBinding::with_subaction(profile, component, subaction_path)
}

struct ActionInfo {
    name: String,
    action_type: ActionType,
    bindings: Vec<ActionBinding>,
}

impl ActionInfo {
    fn new(name: &str, action_type: ActionType, bindings: Vec<ActionBinding>) -> Self {
        Self {
            name: name.into(),
            action_type,
            bindings,
        }
    }
}

fn input_actions() -> Vec<ActionInfo> {
    use ActionType::{Boolean, Float};

    [
        ("select", Boolean, vec![wildcard(SIMPLE, "select/click")]),
        (
            "trigger_value",
            Float,
            vec![
                wildcard(MOTION, "trigger/value"),
                wildcard(TOUCH, "trigger/value"),
                wildcard(VIVE, "trigger/value"),
                wildcard(INDEX, "trigger/value"),
            ],
        ),
        (
            "trigger_click",
            Boolean,
            vec![
                wildcard(MOTION, "trigger/value"),
                wildcard(TOUCH, "trigger/value"),
                wildcard(VIVE, "trigger/click"),
                wildcard(INDEX, "trigger/click"),
                wildcard(TRACKER, "trigger/click"),
            ],
        ),
        (
            "trigger_touch",
            Boolean,
            vec![
                wildcard(TOUCH, "trigger/touch"),
                wildcard(INDEX, "trigger/touch"),
            ],
        ),
        (
            "squeeze_value",
            Float,
            vec![
                wildcard(TOUCH, "squeeze/value"),
                wildcard(INDEX, "squeeze/value"),
            ],
        ),
        (
            "squeeze_click",
            Boolean,
            vec![
                wildcard(MOTION, "squeeze/click"),
                wildcard(TOUCH, "squeeze/value"),
                wildcard(VIVE, "squeeze/click"),
                wildcard(INDEX, "squeeze/value"),
                wildcard(TRACKER, "squeeze/click"),
            ],
        ),
        ("squeeze_force", Float, vec![wildcard(INDEX, "squeeze/force")]),
        (
            "thumbstick_x",
            Float,
            vec![
                wildcard(MOTION, "thumbstick/x"),
                wildcard(TOUCH, "thumbstick/x"),
                wildcard(INDEX, "thumbstick/x"),
            ],
        ),
        (
            "thumbstick_y",
            Float,
            vec![
                wildcard(MOTION, "thumbstick/y"),
                wildcard(TOUCH, "thumbstick/y"),
                wildcard(INDEX, "thumbstick/y"),
            ],
        ),
        (
            "thumbstick_click",
            Float,
            vec![
                wildcard(MOTION, "thumbstick/click"),
                wildcard(TOUCH, "thumbstick/click"),
                wildcard(INDEX, "thumbstick/click"),
            ],
        ),
        (
            "thumbstick_touch",
            Boolean,
            vec![
                wildcard(TOUCH, "thumbstick/touch"),
                wildcard(INDEX, "thumbstick/touch"),
            ],
        ),
        ("thumbrest_touch", Boolean, vec![wildcard(TOUCH, "thumbrest/touch")]),
        (
            "trackpad_x",
            Float,
            vec![
                wildcard(MOTION, "trackpad/x"),
                wildcard(VIVE, "trackpad/x"),
                wildcard(INDEX, "trackpad/x"),
                wildcard(TRACKER, "trackpad/x"),
            ],
        ),
        (
            "trackpad_y",
            Float,
            vec![
                wildcard(MOTION, "trackpad/y"),
                wildcard(VIVE, "trackpad/y"),
                wildcard(INDEX, "trackpad/y"),
                wildcard(TRACKER, "trackpad/y"),
            ],
        ),
        (
            "trackpad_touch",
            Float,
            vec![
                wildcard(MOTION, "trackpad/touch"),
                wildcard(VIVE, "trackpad/touch"),
                wildcard(INDEX, "trackpad/touch"),
                wildcard(TRACKER, "trackpad/touch"),
            ],
        ),
        ("trackpad_force", Float, vec![wildcard(INDEX, "trackpad/force")]),
        (
            "trackpad_click",
            Float,
            vec![
                wildcard(MOTION, "trackpad/click"),
                wildcard(VIVE, "trackpad/click"),
                wildcard(TRACKER, "trackpad/click"),
            ],
        ),
        (
            "a",
            Boolean,
            vec![
                only(TOUCH, "a/click", HAND_RIGHT_PATH),
                wildcard(INDEX, "a/click"),
            ],
        ),
        (
            "a_touch",
            Boolean,
            vec![
                only(TOUCH, "a/touch", HAND_RIGHT_PATH),
                wildcard(INDEX, "a/touch"),
            ],
        ),
        (
            "b",
            Boolean,
            vec![
                only(TOUCH, "b/click", HAND_RIGHT_PATH),
                wildcard(INDEX, "b/click"),
            ],
        ),
        (
            "b_touch",
            Boolean,
            vec![
                only(TOUCH, "b/touch", HAND_RIGHT_PATH),
                wildcard(INDEX, "b/touch"),
            ],
        ),
        ("x", Boolean, vec![only(TOUCH, "x/click", HAND_LEFT_PATH)]),
        ("x_touch", Boolean, vec![only(TOUCH, "x/touch", HAND_LEFT_PATH)]),
        ("y", Boolean, vec![only(TOUCH, "y/click", HAND_LEFT_PATH)]),
        ("y_touch", Boolean, vec![only(TOUCH, "y/touch", HAND_LEFT_PATH)]),
        (
            "menu",
            Boolean,
            vec![
                wildcard(SIMPLE, "menu/click"),
                wildcard(MOTION, "menu/click"),
                only(TOUCH, "menu/click", HAND_LEFT_PATH),
                wildcard(VIVE, "menu/click"),
                wildcard(TRACKER, "menu/click"),
            ],
        ),
        (
            "system",
            Boolean,
            vec![
                only(TOUCH, "system/click", HAND_RIGHT_PATH),
                wildcard(VIVE, "system/click"),
                wildcard(INDEX, "system/click"),
                wildcard(TRACKER, "system/click"),
            ],
        ),
        ("system_touch", Boolean, vec![wildcard(INDEX, "system/touch")]),
    ]
    .into_iter()
    .map(|(name, action_type, bindings)| ActionInfo::new(name, action_type, bindings))
    .collect()
}

fn hand_pose_bindings(component: &str, hand: Hand) -> Vec<ActionBinding> {
    [SIMPLE, MOTION, TOUCH, VIVE, INDEX]
        .into_iter()
        .map(|profile| only(profile, component, hand.path()))
        .collect()
}

fn hand_name(hand: Hand) -> &'static str {
    match hand {
        Hand::Left => "left",
        Hand::Right => "right",
    }
}

// Root object that follows a pose action
struct PoseRoot {
    action_index: usize,
    root: ObjectId,
}

struct ControllerData {
    components: ControllerComponents,
    grip: PoseRoot,
    aim: Option<PoseRoot>,
    palm: Option<PoseRoot>,
}

impl ControllerData {
    fn pose_roots(&self) -> impl Iterator<Item = &PoseRoot> {
        [Some(&self.grip), self.aim.as_ref(), self.palm.as_ref()]
            .into_iter()
            .flatten()
    }
}

fn create_axis(objects: &mut dyn SceneObjects, parent: ObjectId) {
    let axis = objects.create_object(Some(parent));
    objects.set_scale(axis, AXIS_SCALE);
}

/// Lists the components bound by the current interaction profile of every hand and tracker role,
/// with a value bar per component, and shows the aim, grip and palm poses.
pub struct ControllerActionsScene {
    actions: Vec<DeclaredAction>,
    controllers: Vec<ControllerData>,
    resolver: InteractionProfileResolver,
}

impl ControllerActionsScene {
    pub fn new(ctx: &mut SetupContext) -> Result<Self> {
        let extensions = ctx.settings.extensions.clone();

        let mut top_level_paths = HAND_PATHS.to_vec();
        if extensions.vive_trackers {
            top_level_paths.extend(TRACKER_ROLE_PATHS);
        }

        let mut infos = input_actions();
        for hand in [Hand::Left, Hand::Right] {
            let name = hand_name(hand);
            infos.push(ActionInfo::new(
                &format!("{name}_aim"),
                ActionType::Pose,
                hand_pose_bindings("aim/pose", hand),
            ));
            infos.push(ActionInfo::new(
                &format!("{name}_grip"),
                ActionType::Pose,
                hand_pose_bindings("grip/pose", hand),
            ));
            if extensions.palm_pose {
                infos.push(ActionInfo::new(
                    &format!("{name}_palm"),
                    ActionType::Pose,
                    hand_pose_bindings("palm_ext/pose", hand),
                ));
            }
        }
        if extensions.vive_trackers {
            for (role, path) in TRACKER_ROLES.iter().zip(TRACKER_ROLE_PATHS) {
                infos.push(ActionInfo::new(
                    &format!("{role}_pose"),
                    ActionType::Pose,
                    vec![only(TRACKER, "grip/pose", path)],
                ));
            }
        }

        let action_set = ctx.actions.create_action_set(
            &mut *ctx.runtime,
            ACTION_SET_NAME,
            ACTION_SET_NAME,
            priorities::DEFAULT,
        )?;

        let actions = infos
            .into_iter()
            .map(|info| {
                let action = ctx.actions.create_action(
                    &mut *ctx.runtime,
                    action_set,
                    &info.name,
                    &info.name,
                    info.action_type,
                    &top_level_paths,
                )?;

                Ok(DeclaredAction {
                    action,
                    bindings: info.bindings,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = compile_bindings(&actions, &ExpansionContext::Hands);
        if extensions.vive_trackers {
            for path in TRACKER_ROLE_PATHS {
                table.merge(compile_bindings(
                    &actions,
                    &ExpansionContext::Tracker((*path).into()),
                ));
            }
        }
        table.submit(ctx.actions)?;

        let find_action = |name: &str| {
            actions
                .iter()
                .position(|declared| declared.action.name == name)
                .to_any()
        };

        let grip_action_names = [Hand::Left, Hand::Right]
            .map(|hand| format!("{}_grip", hand_name(hand)))
            .into_iter()
            .chain(TRACKER_ROLES.iter().map(|role| format!("{role}_pose")));

        let objects = &mut *ctx.objects;
        let mut controllers = vec![];
        for (path, grip_action) in top_level_paths.iter().zip(grip_action_names) {
            let grip = PoseRoot {
                action_index: find_action(&grip_action)?,
                root: create_pose_root(objects),
            };

            let hand = Hand::from_path(path);

            let aim = match hand {
                Some(hand) => {
                    let root = create_pose_root(objects);
                    let ray = objects.create_object(Some(root));
                    objects.set_pose(ray, Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)));
                    objects.set_scale(ray, AIM_RAY_SCALE);

                    Some(PoseRoot {
                        action_index: find_action(&format!("{}_aim", hand_name(hand)))?,
                        root,
                    })
                }
                None => None,
            };

            let palm = match hand {
                Some(hand) if extensions.palm_pose => Some(PoseRoot {
                    action_index: find_action(&format!("{}_palm", hand_name(hand)))?,
                    root: create_pose_root(objects),
                }),
                _ => None,
            };

            controllers.push(ControllerData {
                components: ControllerComponents::new(path, grip.root),
                grip,
                aim,
                palm,
            });
        }

        Ok(Self {
            actions,
            controllers,
            resolver: InteractionProfileResolver::new(top_level_paths.iter().copied()),
        })
    }

    fn controller(&self, top_level_path: &str) -> Option<&ControllerData> {
        self.controllers
            .iter()
            .find(|controller| controller.components.top_level_path() == top_level_path)
    }

    pub fn actions(&self) -> &[DeclaredAction] {
        &self.actions
    }

    pub fn components(&self, top_level_path: &str) -> Option<&ControllerComponents> {
        self.controller(top_level_path)
            .map(|controller| &controller.components)
    }

    pub fn grip_root(&self, top_level_path: &str) -> Option<ObjectId> {
        self.controller(top_level_path)
            .map(|controller| controller.grip.root)
    }

    pub fn aim_root(&self, top_level_path: &str) -> Option<ObjectId> {
        self.controller(top_level_path)
            .and_then(|controller| controller.aim.as_ref())
            .map(|aim| aim.root)
    }

    pub fn profile_display_name(&self, top_level_path: &str) -> &str {
        self.resolver.display_name(top_level_path)
    }
}

// Hidden until its pose is valid
fn create_pose_root(objects: &mut dyn SceneObjects) -> ObjectId {
    let root = objects.create_object(None);
    objects.set_visible(root, false);
    create_axis(objects, root);

    root
}

impl Scene for ControllerActionsScene {
    fn name(&self) -> &str {
        "Controller actions"
    }

    fn on_event(&mut self, ctx: &mut SceneContext, event: &RuntimeEvent) -> Result<()> {
        match event {
            RuntimeEvent::InteractionProfileChanged => {
                self.resolver.mark_dirty();

                let profile = |path: &str| -> Result<String> {
                    Ok(ctx
                        .runtime
                        .current_interaction_profile(path)?
                        .unwrap_or_else(|| NO_INTERACTION_PROFILE.into()))
                };
                info!(
                    "Interaction profile changed. Left: {}, right: {}",
                    profile(HAND_LEFT_PATH)?,
                    profile(HAND_RIGHT_PATH)?
                );
            }
            RuntimeEvent::ViveTrackerConnected {
                persistent_path,
                role_path,
            } => {
                info!(
                    "Vive tracker connected. Persistent path: {}, role path: {}",
                    persistent_path.as_deref().unwrap_or("NULL"),
                    role_path.as_deref().unwrap_or("NULL")
                );
            }
            RuntimeEvent::SessionStateChanged(_) => (),
        }

        Ok(())
    }

    fn on_update(&mut self, ctx: &mut SceneContext, frame_time: &FrameTime) -> Result<()> {
        let time = frame_time.predicted_display_time;

        for transition in self.resolver.update(&*ctx.runtime)? {
            if let Some(controller) = self.controllers.iter_mut().find(|controller| {
                controller.components.top_level_path() == transition.top_level_path
            }) {
                controller
                    .components
                    .rebuild(&mut *ctx.objects, &self.actions, &transition.current);
            }
        }

        for controller in &mut self.controllers {
            for pose_root in controller.pose_roots() {
                let state = self.actions[pose_root.action_index].action.pose_state(
                    &*ctx.runtime,
                    None,
                    time,
                )?;

                match state.pose {
                    Some(pose) => {
                        ctx.objects.set_pose(pose_root.root, pose);
                        ctx.objects.set_visible(pose_root.root, true);
                    }
                    None => ctx.objects.set_visible(pose_root.root, false),
                }
            }

            controller
                .components
                .update_values(&*ctx.runtime, &mut *ctx.objects, &self.actions, time)?;
        }

        Ok(())
    }
}
