use xrscene_common::anyhow::Result;
use xrscene_interaction::{ActionContext, FrameTime, RuntimeEvent, SceneObjects, XrRuntime};
use xrscene_session::Settings;

/// Menu entry advertised by a scene. Selecting it calls `Scene::on_menu_activated`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuDescriptor {
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppCommand {
    ToggleScene(usize),
    ActivateMenuItem(usize),
    RequestExitSession,
    // Leave the frame loop without ending the session
    ForceStop,
    RecreateSwapchains,
    // Extra CPU time per frame, in multiples of 11ms
    ThrottleFrameLoop(u32),
    PauseProjectionLayers(bool),
}

/// Snapshot of a scene, taken before each scene callback.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneInfo {
    pub index: usize,
    pub name: String,
    pub active: bool,
    pub menu: Option<MenuDescriptor>,
}

/// Everything a scene may touch while it is being constructed.
pub struct SetupContext<'a> {
    pub runtime: &'a mut dyn XrRuntime,
    pub objects: &'a mut dyn SceneObjects,
    pub actions: &'a mut ActionContext,
    pub settings: &'a Settings,
}

pub struct SceneContext<'a> {
    pub runtime: &'a mut dyn XrRuntime,
    pub objects: &'a mut dyn SceneObjects,
    pub actions: &'a mut ActionContext,
    pub settings: &'a Settings,
    pub scenes: &'a [SceneInfo],
    pub scene_index: usize,
    commands: &'a mut Vec<AppCommand>,
}

impl<'a> SceneContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: &'a mut dyn XrRuntime,
        objects: &'a mut dyn SceneObjects,
        actions: &'a mut ActionContext,
        settings: &'a Settings,
        scenes: &'a [SceneInfo],
        scene_index: usize,
        commands: &'a mut Vec<AppCommand>,
    ) -> Self {
        Self {
            runtime,
            objects,
            actions,
            settings,
            scenes,
            scene_index,
            commands,
        }
    }

    /// Applied by the app after the current pass, in push order.
    pub fn push_command(&mut self, command: AppCommand) {
        self.commands.push(command);
    }
}

pub trait Scene {
    fn name(&self) -> &str;

    fn on_update(&mut self, ctx: &mut SceneContext, frame_time: &FrameTime) -> Result<()>;

    // Every scene receives every event, active or not
    fn on_event(&mut self, _ctx: &mut SceneContext, _event: &RuntimeEvent) -> Result<()> {
        Ok(())
    }

    fn on_active_changed(&mut self, _ctx: &mut SceneContext, _active: bool) {}

    fn menu(&self) -> Option<MenuDescriptor> {
        None
    }

    fn on_menu_activated(&mut self, ctx: &mut SceneContext) -> Result<()> {
        let index = ctx.scene_index;
        ctx.push_command(AppCommand::ToggleScene(index));

        Ok(())
    }
}
