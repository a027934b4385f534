use crate::{AppCommand, Scene, SceneContext, SceneInfo, SetupContext};
use xrscene_common::{
    HAND_INTERACTION_PROFILE_PATH, HAND_LEFT_PATH, HAND_PATHS, HAND_RIGHT_PATH, Hand,
    MOTION_CONTROLLER_PROFILE_PATH, Pose, SIMPLE_CONTROLLER_PROFILE_PATH,
    TOUCH_CONTROLLER_PROFILE_PATH,
    anyhow::Result,
    debug,
    glam::{Quat, Vec3},
    info, is_hand_interaction_profile,
};
use xrscene_interaction::{
    Action, ActionBinding, ActionSetId, ActionType, DeclaredAction, ExpansionContext, FrameTime,
    HapticVibration, InteractionProfileResolver, ObjectId, RuntimeEvent, SceneObjects,
    compile_bindings, priorities,
};
use xrscene_session::MenuConfig;

const POINTER_RAY_SCALE: Vec3 = Vec3::new(0.006, 0.006, 10.01);
// Gap between a button and its label
const TEXT_GAP: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuTarget {
    Scene(usize),
    Exit,
    // Leaves the frame loop without ending the session
    HardExit,
    NewSwapchain,
}

impl MenuTarget {
    pub fn command(self) -> AppCommand {
        match self {
            MenuTarget::Scene(index) => AppCommand::ActivateMenuItem(index),
            MenuTarget::Exit => AppCommand::RequestExitSession,
            MenuTarget::HardExit => AppCommand::ForceStop,
            MenuTarget::NewSwapchain => AppCommand::RecreateSwapchains,
        }
    }
}

fn button_dimensions(config: &MenuConfig) -> Vec3 {
    let size = config.item_size_m;
    Vec3::new(size * 3.0, size, size / 5.0)
}

/// Pose of a menu item, on a plane `distance_m` in front of the viewer and rotated about the
/// vertical axis to face it.
pub fn menu_item_pose(view: Pose, index: usize, config: &MenuConfig) -> Pose {
    let columns = config.columns.max(1) as usize;
    let size = config.item_size_m;
    let h = config.horizontal_spacing_m;
    let v = config.vertical_spacing_m;

    let x = (index % columns) as f32 * (h + size) - size / 2.0 - h * columns as f32 / 2.0;
    let y = -((index / columns) as f32 * (v + size) - size / 2.0);

    let plane = view.transform_point(Vec3::new(0.0, 0.0, -1.0));
    let angle = f32::atan2(
        view.position.x - plane.x,
        view.position.z - plane.z,
    );
    let orientation = Quat::from_rotation_y(angle);

    Pose {
        orientation,
        position: view.position + orientation * Vec3::new(x, y, -config.distance_m),
    }
}

/// Distance from the pointer ray to the item, measured in the pointer plane.
pub fn pointer_distance(pointer: Pose, item: Pose) -> f32 {
    let local = pointer.inverse().transform_point(item.position);

    f32::hypot(local.x, local.y)
}

/// Whether the palm normal of the grip points up in view space, within the configured angle.
pub fn palm_facing_up(view: Pose, grip: Pose, hand: Hand, min_cos: f32) -> bool {
    let normal = match hand {
        Hand::Left => Vec3::X,
        Hand::Right => Vec3::NEG_X,
    };

    (view.inverse() * grip).transform_vector(normal).y > min_cos
}

struct MenuItem {
    target: MenuTarget,
    text: String,
    button: ObjectId,
    text_object: ObjectId,
    placement: Option<Pose>,
}

struct Pointer {
    hand: Hand,
    root: ObjectId,
}

pub struct MenuScene {
    menu_set: ActionSetId,
    toggle_action: Action,
    grip_action: Action,
    pointer_action: Action,
    select_action: Action,
    haptic_action: Action,
    resolver: InteractionProfileResolver,
    items: Vec<MenuItem>,
    items_created: bool,
    pointers: [Pointer; 2],
    open: bool,
}

impl MenuScene {
    pub fn new(ctx: &mut SetupContext) -> Result<Self> {
        let actions = &mut *ctx.actions;
        let runtime = &mut *ctx.runtime;

        // The menu set is only active while the menu is open. The toggle set keeps the default
        // priority so its grip pose does not hide the grip poses of other scenes.
        let menu_set =
            actions.create_action_set(runtime, "menu_actions", "Menu Actions", priorities::MENU)?;
        let toggle_set = actions.create_action_set(
            runtime,
            "menu_toggle_actions",
            "Menu toggle actions",
            priorities::DEFAULT,
        )?;
        actions.action_set_mut(menu_set)?.set_active(false);

        let subaction_paths = [HAND_RIGHT_PATH, HAND_LEFT_PATH];
        let mut create = |set, name, display_name, action_type| {
            actions.create_action(
                runtime,
                set,
                name,
                display_name,
                action_type,
                &subaction_paths,
            )
        };

        let toggle_action = create(toggle_set, "menu_toggle", "Menu Toggle", ActionType::Boolean)?;
        let grip_action = create(toggle_set, "menu_grip", "Menu Grip", ActionType::Pose)?;
        let pointer_action = create(menu_set, "menu_pointer", "Menu Pointer", ActionType::Pose)?;
        let select_action = create(menu_set, "menu_select", "Menu Select", ActionType::Boolean)?;
        let haptic_action =
            create(menu_set, "menu_haptics", "Menu Haptics", ActionType::Vibration)?;

        let motion = MOTION_CONTROLLER_PROFILE_PATH;
        let simple = SIMPLE_CONTROLLER_PROFILE_PATH;
        let touch = TOUCH_CONTROLLER_PROFILE_PATH;

        let mut toggle_bindings = vec![
            ActionBinding::new(motion, "menu/click"),
            ActionBinding::new(simple, "menu/click"),
            ActionBinding::with_subaction(touch, "menu/click", HAND_LEFT_PATH),
        ];
        let mut grip_bindings = vec![
            ActionBinding::new(motion, "grip/pose"),
            ActionBinding::new(simple, "grip/pose"),
            ActionBinding::new(touch, "grip/pose"),
        ];
        if ctx.settings.extensions.hand_interaction {
            // Pinch and release with the palm up
            toggle_bindings.push(ActionBinding::new(
                HAND_INTERACTION_PROFILE_PATH,
                "select/value",
            ));
            grip_bindings.push(ActionBinding::new(HAND_INTERACTION_PROFILE_PATH, "grip/pose"));
        }

        let declared = [
            DeclaredAction {
                action: toggle_action.clone(),
                bindings: toggle_bindings,
            },
            DeclaredAction {
                action: grip_action.clone(),
                bindings: grip_bindings,
            },
            DeclaredAction {
                action: pointer_action.clone(),
                bindings: vec![
                    ActionBinding::new(motion, "aim/pose"),
                    ActionBinding::new(simple, "aim/pose"),
                    ActionBinding::new(touch, "aim/pose"),
                ],
            },
            DeclaredAction {
                action: select_action.clone(),
                bindings: vec![
                    ActionBinding::new(motion, "trigger/value"),
                    ActionBinding::new(simple, "select/click"),
                    ActionBinding::with_subaction(touch, "a/click", HAND_RIGHT_PATH),
                    ActionBinding::with_subaction(touch, "b/click", HAND_RIGHT_PATH),
                    ActionBinding::with_subaction(touch, "x/click", HAND_LEFT_PATH),
                    ActionBinding::with_subaction(touch, "y/click", HAND_LEFT_PATH),
                ],
            },
            DeclaredAction {
                action: haptic_action.clone(),
                bindings: vec![
                    ActionBinding::new(motion, "haptic"),
                    ActionBinding::new(simple, "haptic"),
                    ActionBinding::new(touch, "haptic"),
                ],
            },
        ];
        compile_bindings(&declared, &ExpansionContext::Hands).submit(actions)?;

        let config = &ctx.settings.menu;
        let pointers = [Hand::Left, Hand::Right].map(|hand| {
            let root = ctx.objects.create_object(None);
            let ray = ctx.objects.create_object(Some(root));
            ctx.objects.set_pose(
                ray,
                Pose::from_translation(Vec3::new(0.0, 0.0, -5.0 + config.distance_m)),
            );
            ctx.objects.set_scale(ray, POINTER_RAY_SCALE);
            ctx.objects.set_visible(root, false);

            Pointer { hand, root }
        });

        Ok(Self {
            menu_set,
            toggle_action,
            grip_action,
            pointer_action,
            select_action,
            haptic_action,
            resolver: InteractionProfileResolver::new(HAND_PATHS),
            items: vec![],
            items_created: false,
            pointers,
            open: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn targets(&self) -> Vec<MenuTarget> {
        self.items.iter().map(|item| item.target).collect()
    }

    pub fn item_object(&self, target: MenuTarget) -> Option<ObjectId> {
        self.items
            .iter()
            .find(|item| item.target == target)
            .map(|item| item.button)
    }

    fn create_items(&mut self, objects: &mut dyn SceneObjects, scenes: &[SceneInfo], own: usize) {
        let targets = scenes
            .iter()
            .filter(|info| info.index != own)
            .map(|info| MenuTarget::Scene(info.index))
            .chain([
                MenuTarget::Exit,
                MenuTarget::HardExit,
                MenuTarget::NewSwapchain,
            ]);

        for target in targets {
            let text = item_text(target, scenes);

            let button = objects.create_object(None);
            objects.set_visible(button, false);

            let text_object = objects.create_object(Some(button));
            objects.set_text(text_object, &text);

            self.items.push(MenuItem {
                target,
                text,
                button,
                text_object,
                placement: None,
            });
        }

        self.items_created = true;
    }

    fn should_toggle(&self, ctx: &SceneContext, frame_time: &FrameTime) -> Result<bool> {
        let using_hand_interaction = HAND_PATHS.iter().any(|path| {
            self.resolver
                .state(path)
                .and_then(|state| state.profile())
                .is_some_and(is_hand_interaction_profile)
        });

        let released = |state: xrscene_interaction::ActionState<bool>| {
            state.changed_since_last_sync && !state.current_state
        };

        if !using_hand_interaction {
            return Ok(released(
                self.toggle_action.boolean_state(&*ctx.runtime, None)?,
            ));
        }

        let time = frame_time.predicted_display_time;
        let Some(view) = ctx.runtime.locate_view(time)? else {
            return Ok(false);
        };
        for hand in [Hand::Left, Hand::Right] {
            let path = Some(hand.path());
            if !released(self.toggle_action.boolean_state(&*ctx.runtime, path)?) {
                continue;
            }

            let grip = self.grip_action.pose_state(&*ctx.runtime, path, time)?;
            if let Some(grip) = grip.pose
                && palm_facing_up(
                    view,
                    grip,
                    hand,
                    ctx.settings.gestures.palm_up_min_cos(),
                )
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn set_open(&mut self, ctx: &mut SceneContext, open: bool) -> Result<()> {
        self.open = open;
        ctx.actions.action_set_mut(self.menu_set)?.set_active(open);

        for item in &mut self.items {
            item.placement = None;
        }

        debug!("Menu open: {open}");

        Ok(())
    }
}

fn item_text(target: MenuTarget, scenes: &[SceneInfo]) -> String {
    match target {
        MenuTarget::Scene(index) => scenes
            .get(index)
            .map(|info| {
                info.menu
                    .as_ref()
                    .map(|menu| menu.text.clone())
                    .unwrap_or_else(|| info.name.clone())
            })
            .unwrap_or_default(),
        MenuTarget::Exit => "Exit".into(),
        MenuTarget::HardExit => "Hard Exit".into(),
        MenuTarget::NewSwapchain => "New Swapchain".into(),
    }
}

impl Scene for MenuScene {
    fn name(&self) -> &str {
        "Menu"
    }

    fn on_event(&mut self, _: &mut SceneContext, event: &RuntimeEvent) -> Result<()> {
        if let RuntimeEvent::InteractionProfileChanged = event {
            self.resolver.mark_dirty();
        }

        Ok(())
    }

    fn on_update(&mut self, ctx: &mut SceneContext, frame_time: &FrameTime) -> Result<()> {
        let time = frame_time.predicted_display_time;
        let config = ctx.settings.menu.clone();

        self.resolver.update(&*ctx.runtime)?;

        if !self.items_created {
            self.create_items(&mut *ctx.objects, ctx.scenes, ctx.scene_index);
        }

        if self.should_toggle(ctx, frame_time)? {
            self.set_open(ctx, !self.open)?;
        }

        if self.open
            && self.items.iter().any(|item| item.placement.is_none())
            && let Some(view) = ctx.runtime.locate_view(time)?
        {
            for (index, item) in self.items.iter_mut().enumerate() {
                item.placement = Some(menu_item_pose(view, index, &config));
            }
        }

        // Closest item within reach, per hand
        let mut hovered = [None::<(usize, f32)>; 2];
        for (hand_index, pointer) in self.pointers.iter().enumerate() {
            let aim = self
                .pointer_action
                .pose_state(&*ctx.runtime, Some(pointer.hand.path()), time)?;

            let pointer_pose = aim
                .pose
                .filter(|_| self.open)
                .map(|aim| aim * Pose::from_translation(Vec3::new(0.0, 0.0, -config.distance_m)));

            match pointer_pose {
                Some(pose) => {
                    ctx.objects.set_pose(pointer.root, pose);
                    ctx.objects.set_visible(pointer.root, true);

                    for (item_index, item) in self.items.iter().enumerate() {
                        let Some(placement) = item.placement else {
                            continue;
                        };

                        let distance = pointer_distance(pose, placement);
                        if distance < config.item_size_m / 2.0
                            && hovered[hand_index].is_none_or(|(_, closest)| distance < closest)
                        {
                            hovered[hand_index] = Some((item_index, distance));
                        }
                    }
                }
                None => ctx.objects.set_visible(pointer.root, false),
            }
        }

        let dimensions = button_dimensions(&config);
        for (item_index, item) in self.items.iter_mut().enumerate() {
            ctx.objects
                .set_visible(item.button, self.open && item.placement.is_some());

            if let MenuTarget::Scene(_) = item.target {
                let text = item_text(item.target, ctx.scenes);
                if text != item.text {
                    ctx.objects.set_text(item.text_object, &text);
                    item.text = text;
                }
            }

            let Some(placement) = item.placement else {
                continue;
            };
            ctx.objects.set_pose(item.button, placement);

            let enabled = match item.target {
                MenuTarget::Scene(index) => ctx.scenes.get(index).is_some_and(|info| info.active),
                _ => true,
            };
            let scale = if hovered.iter().flatten().any(|(index, _)| *index == item_index) {
                config.hover_scale
            } else if enabled {
                1.0
            } else {
                config.disabled_scale
            };
            ctx.objects.set_scale(item.button, dimensions * scale);
            ctx.objects.set_pose(
                item.text_object,
                Pose::from_translation(Vec3::new(0.0, 0.0, dimensions.z / 2.0 + TEXT_GAP)),
            );
        }

        for (pointer, hovered) in self.pointers.iter().zip(hovered) {
            let Some((item_index, _)) = hovered else {
                continue;
            };

            let path = Some(pointer.hand.path());
            let select = self.select_action.boolean_state(&*ctx.runtime, path)?;
            if select.changed_since_last_sync && select.current_state {
                let item = &self.items[item_index];
                info!("Menu item \"{}\" selected", item.text);

                ctx.push_command(item.target.command());
                self.haptic_action.apply_haptic_feedback(
                    &mut *ctx.runtime,
                    path,
                    &HapticVibration::new().amplitude(1.0),
                )?;
            }
        }

        Ok(())
    }
}
