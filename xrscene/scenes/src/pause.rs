use crate::{AppCommand, MenuDescriptor, Scene, SceneContext};
use std::time::Duration;
use xrscene_common::{anyhow::Result, info};
use xrscene_interaction::FrameTime;

const PAUSE_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PauseMode {
    #[default]
    None,
    // Extra CPU time after waiting for the frame, without submitting
    ExtraOneFrame,
    ExtraTwoFrames,
    ExtraThreeFrames,
    ExtraFourFrames,
    Extra5s,
    // Keep submitting the last rendered frame
    Pause5s,
    // Render every other frame, submit every frame
    SkipOneFrame,
}

impl PauseMode {
    pub fn next(self) -> Self {
        match self {
            PauseMode::None => PauseMode::ExtraOneFrame,
            PauseMode::ExtraOneFrame => PauseMode::ExtraTwoFrames,
            PauseMode::ExtraTwoFrames => PauseMode::ExtraThreeFrames,
            PauseMode::ExtraThreeFrames => PauseMode::ExtraFourFrames,
            PauseMode::ExtraFourFrames => PauseMode::Extra5s,
            PauseMode::Extra5s => PauseMode::Pause5s,
            PauseMode::Pause5s => PauseMode::SkipOneFrame,
            PauseMode::SkipOneFrame => PauseMode::None,
        }
    }

    // In multiples of 11ms
    pub fn throttle_factor(self) -> u32 {
        match self {
            PauseMode::ExtraOneFrame => 1,
            PauseMode::ExtraTwoFrames => 2,
            PauseMode::ExtraThreeFrames => 3,
            PauseMode::ExtraFourFrames => 4,
            PauseMode::Extra5s => 455,
            PauseMode::None | PauseMode::Pause5s | PauseMode::SkipOneFrame => 0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PauseMode::None => "Frame throttle (None)",
            PauseMode::ExtraOneFrame => "Extra 11ms (no submit)",
            PauseMode::ExtraTwoFrames => "Extra 22ms (no submit)",
            PauseMode::ExtraThreeFrames => "Extra 33ms (no submit)",
            PauseMode::ExtraFourFrames => "Extra 44ms (no submit)",
            PauseMode::Extra5s => "Extra 5s (no submit)",
            PauseMode::Pause5s => "Pause 5 secs (submit)",
            PauseMode::SkipOneFrame => "Skip one frame (submit)",
        }
    }
}

#[derive(Default)]
struct PauseTimer {
    skipped_first_frame: bool,
    start: Option<Duration>,
    done: bool,
}

/// Throttles the frame loop or pauses the projection layers. Each menu activation moves to the
/// next mode.
#[derive(Default)]
pub struct PauseScene {
    mode: PauseMode,
    menu_text: String,
    timer: PauseTimer,
}

impl PauseScene {
    pub fn new() -> Self {
        Self {
            menu_text: PauseMode::None.description().into(),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> PauseMode {
        self.mode
    }
}

impl Scene for PauseScene {
    fn name(&self) -> &str {
        "Pause"
    }

    fn on_update(&mut self, ctx: &mut SceneContext, frame_time: &FrameTime) -> Result<()> {
        match self.mode {
            PauseMode::SkipOneFrame => {
                ctx.push_command(AppCommand::PauseProjectionLayers(
                    frame_time.frame_index % 2 != 0,
                ));
            }
            PauseMode::Pause5s => {
                let timer = &mut self.timer;
                if !timer.skipped_first_frame {
                    timer.skipped_first_frame = true;
                } else if let Some(start) = timer.start {
                    if !timer.done && frame_time.elapsed.saturating_sub(start) >= PAUSE_DURATION {
                        ctx.push_command(AppCommand::PauseProjectionLayers(false));
                        self.menu_text = "Pause done".into();
                        timer.done = true;
                    }
                } else {
                    timer.start = Some(frame_time.elapsed);
                    ctx.push_command(AppCommand::PauseProjectionLayers(true));
                }
            }
            _ => (),
        }

        Ok(())
    }

    fn menu(&self) -> Option<MenuDescriptor> {
        Some(MenuDescriptor {
            text: self.menu_text.clone(),
        })
    }

    fn on_menu_activated(&mut self, ctx: &mut SceneContext) -> Result<()> {
        self.mode = self.mode.next();
        self.menu_text = self.mode.description().into();
        self.timer = PauseTimer::default();

        ctx.push_command(AppCommand::PauseProjectionLayers(false));
        ctx.push_command(AppCommand::ThrottleFrameLoop(self.mode.throttle_factor()));

        info!("Pause mode: {}", self.menu_text);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_utils::Harness;
    use xrscene_session::Settings;

    fn activate(harness: &mut Harness, scene: &mut PauseScene) {
        harness.with_context(scene, |scene, ctx| scene.on_menu_activated(ctx));
    }

    #[test]
    fn menu_cycles_through_every_mode() {
        let mut harness = Harness::new(Settings::default());
        let mut scene = PauseScene::new();
        assert_eq!(scene.menu().unwrap().text, "Frame throttle (None)");

        activate(&mut harness, &mut scene);
        assert_eq!(scene.mode(), PauseMode::ExtraOneFrame);
        assert_eq!(
            harness.commands,
            [
                AppCommand::PauseProjectionLayers(false),
                AppCommand::ThrottleFrameLoop(1)
            ]
        );

        for _ in 0..4 {
            activate(&mut harness, &mut scene);
        }
        assert_eq!(scene.mode(), PauseMode::Extra5s);
        assert_eq!(
            harness.commands.last(),
            Some(&AppCommand::ThrottleFrameLoop(455))
        );
        assert_eq!(scene.menu().unwrap().text, "Extra 5s (no submit)");

        for _ in 0..3 {
            activate(&mut harness, &mut scene);
        }
        assert_eq!(scene.mode(), PauseMode::None);
    }

    #[test]
    fn skip_one_frame_pauses_odd_frames() {
        let mut harness = Harness::new(Settings::default());
        let mut scene = PauseScene::new();
        scene.mode = PauseMode::SkipOneFrame;
        harness.attach();

        for _ in 0..4 {
            harness.tick(&mut scene);
        }

        assert_eq!(
            harness.commands,
            [false, true, false, true].map(AppCommand::PauseProjectionLayers)
        );
    }

    #[test]
    fn pause_lasts_five_seconds_after_the_first_frame() {
        let mut harness = Harness::new(Settings::default());
        let mut scene = PauseScene::new();
        scene.mode = PauseMode::Pause5s;
        harness.attach();

        // First frame only updates the description
        harness.tick(&mut scene);
        assert!(harness.commands.is_empty());

        harness.tick(&mut scene);
        assert_eq!(harness.commands, [AppCommand::PauseProjectionLayers(true)]);

        // 11ms frames, 5s is reached after 455 more frames
        for _ in 0..454 {
            harness.tick(&mut scene);
        }
        assert_eq!(harness.commands.len(), 1);

        harness.tick(&mut scene);
        assert_eq!(
            harness.commands,
            [
                AppCommand::PauseProjectionLayers(true),
                AppCommand::PauseProjectionLayers(false)
            ]
        );
        assert_eq!(scene.menu().unwrap().text, "Pause done");
    }
}
