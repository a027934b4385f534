use crate::{AppCommand, Scene, SceneContext, SceneInfo, SetupContext};
use std::time::Duration;
use xrscene_common::{
    anyhow::{Result, bail},
    debug, info, warn,
};
use xrscene_interaction::{
    ActionContext, FrameTime, RuntimeEvent, SceneObjects, SessionState, XrRuntime,
};
use xrscene_session::Settings;

const THROTTLE_STEP: Duration = Duration::from_millis(11);

struct SceneEntry {
    scene: Box<dyn Scene>,
    active: bool,
}

/// Owns the runtime, the scene graph and every scene. Scenes must be added before `start()`,
/// since action sets are frozen once attached.
pub struct XrApp<R, O> {
    runtime: R,
    objects: O,
    actions: ActionContext,
    settings: Settings,
    scenes: Vec<SceneEntry>,
    commands: Vec<AppCommand>,
    running: bool,
    throttle_factor: u32,
    projection_layers_paused: bool,
    swapchain_generation: u64,
}

impl<R: XrRuntime, O: SceneObjects> XrApp<R, O> {
    pub fn new(runtime: R, objects: O, settings: Settings) -> Self {
        Self {
            runtime,
            objects,
            actions: ActionContext::new(),
            settings,
            scenes: vec![],
            commands: vec![],
            running: false,
            throttle_factor: 0,
            projection_layers_paused: false,
            swapchain_generation: 0,
        }
    }

    pub fn add_scene<S: Scene + 'static>(
        &mut self,
        active: bool,
        factory: impl FnOnce(&mut SetupContext) -> Result<S>,
    ) -> Result<usize> {
        if self.actions.is_attached() {
            bail!("Cannot add a scene after the action sets are attached");
        }

        // A failing factory must not leave a half declared action set behind
        let checkpoint = self.actions.checkpoint();
        let scene = match factory(&mut SetupContext {
            runtime: &mut self.runtime,
            objects: &mut self.objects,
            actions: &mut self.actions,
            settings: &self.settings,
        }) {
            Ok(scene) => scene,
            Err(e) => {
                self.actions.rollback(checkpoint);
                return Err(e);
            }
        };
        debug!("Added scene {} (active: {active})", scene.name());

        self.scenes.push(SceneEntry {
            scene: Box::new(scene),
            active,
        });

        Ok(self.scenes.len() - 1)
    }

    pub fn start(&mut self) -> Result<()> {
        self.actions
            .attach(&mut self.runtime, &self.settings.interaction_profile_filter)?;
        self.running = true;

        info!("Started with {} scenes", self.scenes.len());

        Ok(())
    }

    pub fn tick(&mut self, frame_time: &FrameTime) -> Result<()> {
        if !self.running {
            return Ok(());
        }

        while let Some(event) = self.runtime.poll_event()? {
            if let RuntimeEvent::SessionStateChanged(state) = &event {
                debug!("Session state changed to {state:?}");
                if matches!(state, SessionState::Exiting | SessionState::LossPending) {
                    self.running = false;
                }
            }

            let infos = self.scene_infos();
            for index in 0..self.scenes.len() {
                self.call_scene(index, &infos, |scene, ctx| scene.on_event(ctx, &event))?;
            }
        }
        if !self.running {
            info!("Session ended");
            return Ok(());
        }

        self.actions.sync(&mut self.runtime)?;

        let infos = self.scene_infos();
        for index in 0..self.scenes.len() {
            if self.scenes[index].active {
                self.call_scene(index, &infos, |scene, ctx| scene.on_update(ctx, frame_time))?;
            }
        }

        // Commands can queue more commands
        while !self.commands.is_empty() {
            for command in std::mem::take(&mut self.commands) {
                self.apply_command(command)?;
            }
        }

        Ok(())
    }

    fn call_scene<T>(
        &mut self,
        index: usize,
        infos: &[SceneInfo],
        f: impl FnOnce(&mut dyn Scene, &mut SceneContext) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = SceneContext::new(
            &mut self.runtime,
            &mut self.objects,
            &mut self.actions,
            &self.settings,
            infos,
            index,
            &mut self.commands,
        );

        f(self.scenes[index].scene.as_mut(), &mut ctx)
    }

    fn apply_command(&mut self, command: AppCommand) -> Result<()> {
        debug!("Applying {command:?}");

        match command {
            AppCommand::ToggleScene(index) => {
                let Some(entry) = self.scenes.get_mut(index) else {
                    warn!("No scene at index {index}");
                    return Ok(());
                };
                entry.active = !entry.active;
                let active = entry.active;
                info!("Scene {} active: {active}", entry.scene.name());

                let infos = self.scene_infos();
                self.call_scene(index, &infos, |scene, ctx| {
                    scene.on_active_changed(ctx, active);
                    Ok(())
                })?;
            }
            AppCommand::ActivateMenuItem(index) => {
                if index >= self.scenes.len() {
                    warn!("No scene at index {index}");
                    return Ok(());
                }

                let infos = self.scene_infos();
                self.call_scene(index, &infos, |scene, ctx| scene.on_menu_activated(ctx))?;
            }
            AppCommand::RequestExitSession => self.runtime.request_exit_session()?,
            AppCommand::ForceStop => {
                info!("Frame loop stopped");
                self.running = false;
            }
            AppCommand::RecreateSwapchains => self.swapchain_generation += 1,
            AppCommand::ThrottleFrameLoop(factor) => self.throttle_factor = factor,
            AppCommand::PauseProjectionLayers(paused) => self.projection_layers_paused = paused,
        }

        Ok(())
    }

    pub fn scene_infos(&self) -> Vec<SceneInfo> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(index, entry)| SceneInfo {
                index,
                name: entry.scene.name().into(),
                active: entry.active,
                menu: entry.scene.menu(),
            })
            .collect()
    }

    pub fn scene_active(&self, index: usize) -> Option<bool> {
        self.scenes.get(index).map(|entry| entry.active)
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn actions(&self) -> &ActionContext {
        &self.actions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn throttle_factor(&self) -> u32 {
        self.throttle_factor
    }

    // Extra time the frame loop should spend per frame
    pub fn throttle_delay(&self) -> Duration {
        THROTTLE_STEP * self.throttle_factor
    }

    pub fn projection_layers_paused(&self) -> bool {
        self.projection_layers_paused
    }

    pub fn swapchain_generation(&self) -> u64 {
        self.swapchain_generation
    }
}
