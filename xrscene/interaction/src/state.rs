use crate::{
    Action, ActionState, ActionType, HapticVibration, InteractionError, PoseState, XrRuntime,
};
use std::time::Duration;
use xrscene_common::{anyhow::Result, glam::Vec2};

impl Action {
    fn check_type(&self, expected: ActionType) -> Result<()> {
        if self.action_type != expected {
            return Err(InteractionError::ActionTypeMismatch {
                action: self.name.clone(),
                expected,
                found: self.action_type,
            }
            .into());
        }

        Ok(())
    }

    pub fn boolean_state(
        &self,
        runtime: &dyn XrRuntime,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<bool>> {
        self.check_type(ActionType::Boolean)?;
        runtime.boolean_state(self.handle, subaction_path)
    }

    pub fn float_state(
        &self,
        runtime: &dyn XrRuntime,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<f32>> {
        self.check_type(ActionType::Float)?;
        runtime.float_state(self.handle, subaction_path)
    }

    pub fn vector2_state(
        &self,
        runtime: &dyn XrRuntime,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<Vec2>> {
        self.check_type(ActionType::Vector2)?;
        runtime.vector2_state(self.handle, subaction_path)
    }

    pub fn pose_state(
        &self,
        runtime: &dyn XrRuntime,
        subaction_path: Option<&str>,
        time: Duration,
    ) -> Result<PoseState> {
        self.check_type(ActionType::Pose)?;
        runtime.pose_state(self.handle, subaction_path, time)
    }

    pub fn apply_haptic_feedback(
        &self,
        runtime: &mut dyn XrRuntime,
        subaction_path: Option<&str>,
        vibration: &HapticVibration,
    ) -> Result<()> {
        self.check_type(ActionType::Vibration)?;
        runtime.apply_haptic_feedback(self.handle, subaction_path, vibration)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComponentValue {
    pub value: f32,
    pub is_active: bool,
    // Always false for poses
    pub changed_since_last_sync: bool,
}

/// Read one action as a single display scalar. Inactive inputs always read as zero.
pub fn read_component_value(
    runtime: &dyn XrRuntime,
    action: &Action,
    subaction_path: &str,
    time: Duration,
) -> Result<ComponentValue> {
    let subaction_path = Some(subaction_path);

    let (value, is_active, changed_since_last_sync) = match action.action_type {
        ActionType::Boolean => {
            let state = action.boolean_state(runtime, subaction_path)?;
            let value = if state.current_state { 1.0 } else { 0.0 };
            (value, state.is_active, state.changed_since_last_sync)
        }
        ActionType::Float => {
            let state = action.float_state(runtime, subaction_path)?;
            (
                state.current_state,
                state.is_active,
                state.changed_since_last_sync,
            )
        }
        ActionType::Vector2 => {
            let state = action.vector2_state(runtime, subaction_path)?;
            (
                state.current_state.length(),
                state.is_active,
                state.changed_since_last_sync,
            )
        }
        ActionType::Pose => {
            let state = action.pose_state(runtime, subaction_path, time)?;
            let value = if state.is_active { 1.0 } else { 0.0 };
            (value, state.is_active, false)
        }
        ActionType::Vibration => {
            return Err(InteractionError::ActionTypeMismatch {
                action: action.name.clone(),
                expected: ActionType::Float,
                found: ActionType::Vibration,
            }
            .into());
        }
    };

    if is_active {
        Ok(ComponentValue {
            value,
            is_active,
            changed_since_last_sync,
        })
    } else {
        Ok(ComponentValue::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionContext, SuggestedBinding, mock::MockRuntime, priorities};
    use xrscene_common::{HAND_LEFT_PATH, HAND_RIGHT_PATH, MOTION_CONTROLLER_PROFILE_PATH};

    struct Fixture {
        runtime: MockRuntime,
        context: ActionContext,
        trigger: Action,
        click: Action,
        stick: Action,
        grip: Action,
    }

    fn fixture() -> Fixture {
        let mut runtime = MockRuntime::new();
        let mut context = ActionContext::new();
        let set = context
            .create_action_set(&mut runtime, "state_test", "Test", priorities::DEFAULT)
            .unwrap();
        let hands = [HAND_LEFT_PATH, HAND_RIGHT_PATH];

        let trigger = context
            .create_action(&mut runtime, set, "trigger", "Trigger", ActionType::Float, &hands)
            .unwrap();
        let click = context
            .create_action(&mut runtime, set, "click", "Click", ActionType::Boolean, &hands)
            .unwrap();
        let stick = context
            .create_action(&mut runtime, set, "stick", "Stick", ActionType::Vector2, &hands)
            .unwrap();
        let grip = context
            .create_action(&mut runtime, set, "grip", "Grip", ActionType::Pose, &hands)
            .unwrap();

        let mut bindings = vec![];
        for hand in hands {
            bindings.push(SuggestedBinding::new(
                trigger.handle,
                format!("{hand}/input/trigger/value"),
            ));
            bindings.push(SuggestedBinding::new(
                click.handle,
                format!("{hand}/input/trigger/value"),
            ));
            bindings.push(SuggestedBinding::new(
                stick.handle,
                format!("{hand}/input/thumbstick"),
            ));
            bindings.push(SuggestedBinding::new(
                grip.handle,
                format!("{hand}/input/grip/pose"),
            ));
        }
        context
            .suggest_interaction_profile_bindings(MOTION_CONTROLLER_PROFILE_PATH, bindings)
            .unwrap();
        context.attach(&mut runtime, &[]).unwrap();

        Fixture {
            runtime,
            context,
            trigger,
            click,
            stick,
            grip,
        }
    }

    #[test]
    fn component_values_per_type() {
        let mut f = fixture();
        f.runtime
            .connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        f.runtime.set_input("/user/hand/left/input/trigger/value", 0.75);
        f.runtime
            .set_vector2_input("/user/hand/left/input/thumbstick", Vec2::new(0.6, 0.8));
        f.runtime.set_pose(
            "/user/hand/left/input/grip/pose",
            xrscene_common::Pose::IDENTITY,
        );
        f.context.sync(&mut f.runtime).unwrap();

        let read = |action: &Action| {
            read_component_value(&f.runtime, action, HAND_LEFT_PATH, Duration::ZERO).unwrap()
        };

        assert_eq!(read(&f.trigger).value, 0.75);
        assert_eq!(read(&f.click).value, 1.0);
        assert!((read(&f.stick).value - 1.0).abs() < 1e-5);
        assert_eq!(
            read(&f.grip),
            ComponentValue {
                value: 1.0,
                is_active: true,
                changed_since_last_sync: false
            }
        );
    }

    #[test]
    fn unbound_hand_reads_inactive_zero() {
        let mut f = fixture();
        f.runtime
            .connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        f.runtime.set_input("/user/hand/right/input/trigger/value", 1.0);
        f.context.sync(&mut f.runtime).unwrap();

        let value =
            read_component_value(&f.runtime, &f.trigger, HAND_RIGHT_PATH, Duration::ZERO).unwrap();

        assert_eq!(value, ComponentValue::default());
    }

    #[test]
    fn typed_read_rejects_other_types() {
        let f = fixture();

        let err = f.trigger.boolean_state(&f.runtime, None).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InteractionError>(),
            Some(InteractionError::ActionTypeMismatch { .. })
        ));
    }

    #[test]
    fn changed_flag_follows_syncs() {
        let mut f = fixture();
        f.runtime
            .connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        f.context.sync(&mut f.runtime).unwrap();

        f.runtime.set_input("/user/hand/left/input/trigger/value", 1.0);
        f.context.sync(&mut f.runtime).unwrap();
        let state = f.click.boolean_state(&f.runtime, Some(HAND_LEFT_PATH)).unwrap();
        assert!(state.current_state && state.changed_since_last_sync);

        f.context.sync(&mut f.runtime).unwrap();
        let state = f.click.boolean_state(&f.runtime, Some(HAND_LEFT_PATH)).unwrap();
        assert!(state.current_state && !state.changed_since_last_sync);
    }
}
