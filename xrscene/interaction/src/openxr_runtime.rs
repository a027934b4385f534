use crate::{
    ActionHandle, ActionSetHandle, ActionState, ActionType, HandJointsMotionRange,
    HapticVibration, JointLocation, PoseState, RuntimeError, RuntimeEvent, SessionState,
    SuggestedBinding, XrRuntime,
};
use openxr as xr;
use std::{collections::HashMap, time::Duration};
use xrscene_common::{
    Hand, Pose, debug, error,
    anyhow::Result,
    glam::{Quat, Vec2, Vec3},
    warn,
};

fn to_pose(p: xr::Posef) -> Pose {
    Pose {
        orientation: Quat::from_xyzw(
            p.orientation.x,
            p.orientation.y,
            p.orientation.z,
            p.orientation.w,
        ),
        position: Vec3::new(p.position.x, p.position.y, p.position.z),
    }
}

fn to_xr_time(timestamp: Duration) -> xr::Time {
    xr::Time::from_nanos(timestamp.as_nanos() as _)
}

fn to_runtime_error(result: xr::sys::Result, subject: &str) -> RuntimeError {
    match result {
        xr::sys::Result::ERROR_HANDLE_INVALID => RuntimeError::InvalidHandle,
        xr::sys::Result::ERROR_NAME_DUPLICATED => RuntimeError::NameDuplicated(subject.into()),
        xr::sys::Result::ERROR_NAME_INVALID => RuntimeError::NameInvalid(subject.into()),
        xr::sys::Result::ERROR_PATH_INVALID => RuntimeError::PathInvalid(subject.into()),
        xr::sys::Result::ERROR_PATH_UNSUPPORTED => RuntimeError::PathUnsupported(subject.into()),
        xr::sys::Result::ERROR_ACTIONSETS_ALREADY_ATTACHED => {
            RuntimeError::ActionSetsAlreadyAttached
        }
        xr::sys::Result::ERROR_ACTIONSET_NOT_ATTACHED => RuntimeError::ActionSetNotAttached,
        xr::sys::Result::ERROR_ACTION_TYPE_MISMATCH => RuntimeError::ActionTypeMismatch,
        xr::sys::Result::ERROR_SESSION_NOT_RUNNING => RuntimeError::SessionNotRunning,
        other => RuntimeError::Other(format!("{subject}: {other:?}")),
    }
}

fn path_to_string(xr_instance: &xr::Instance, path: xr::Path) -> Option<String> {
    if path == xr::Path::NULL {
        return None;
    }

    match xr_instance.path_to_string(path) {
        Ok(path) => Some(path),
        Err(e) => {
            error!("Cannot convert path to string: {e:?}");
            None
        }
    }
}

trait XrResultExt<T> {
    fn or_runtime_err(self, subject: &str) -> Result<T>;
}

impl<T> XrResultExt<T> for xr::Result<T> {
    fn or_runtime_err(self, subject: &str) -> Result<T> {
        self.map_err(|e| to_runtime_error(e, subject).into())
    }
}

enum TypedAction {
    Boolean(xr::Action<bool>),
    Float(xr::Action<f32>),
    Vector2(xr::Action<xr::Vector2f>),
    Pose(xr::Action<xr::Posef>),
    Vibration(xr::Action<xr::Haptic>),
}

impl TypedAction {
    fn binding(&self, path: xr::Path) -> xr::Binding<'_> {
        match self {
            TypedAction::Boolean(action) => xr::Binding::new(action, path),
            TypedAction::Float(action) => xr::Binding::new(action, path),
            TypedAction::Vector2(action) => xr::Binding::new(action, path),
            TypedAction::Pose(action) => xr::Binding::new(action, path),
            TypedAction::Vibration(action) => xr::Binding::new(action, path),
        }
    }
}

/// Runtime backed by an OpenXR session. Action spaces for pose actions are created together with
/// the action, one per declared subaction path plus one for the aggregated pose.
pub struct OpenXrRuntime<G: xr::Graphics> {
    xr_instance: xr::Instance,
    xr_session: xr::Session<G>,
    reference_space: xr::Space,
    view_space: xr::Space,
    action_sets: Vec<xr::ActionSet>,
    actions: Vec<TypedAction>,
    pose_spaces: HashMap<(ActionHandle, Option<String>), xr::Space>,
    hand_trackers: [Option<xr::HandTracker>; 2],
    event_storage: xr::EventDataBuffer,
}

impl<G: xr::Graphics> OpenXrRuntime<G> {
    pub fn new(
        xr_instance: xr::Instance,
        xr_session: xr::Session<G>,
        reference_space: xr::Space,
        hand_tracking: bool,
    ) -> Result<Self> {
        let view_space = xr_session
            .create_reference_space(xr::ReferenceSpaceType::VIEW, xr::Posef::IDENTITY)
            .or_runtime_err("view space")?;

        let create_hand_tracker = |hand| {
            if !hand_tracking {
                return None;
            }
            match xr_session.create_hand_tracker(hand) {
                Ok(tracker) => Some(tracker),
                Err(e) => {
                    warn!("Hand tracking unavailable: {e:?}");
                    None
                }
            }
        };
        let hand_trackers = [
            create_hand_tracker(xr::Hand::LEFT),
            create_hand_tracker(xr::Hand::RIGHT),
        ];

        Ok(Self {
            xr_instance,
            xr_session,
            reference_space,
            view_space,
            action_sets: vec![],
            actions: vec![],
            pose_spaces: HashMap::new(),
            hand_trackers,
            event_storage: xr::EventDataBuffer::new(),
        })
    }

    pub fn instance(&self) -> &xr::Instance {
        &self.xr_instance
    }

    pub fn session(&self) -> &xr::Session<G> {
        &self.xr_session
    }

    fn path(&self, path: Option<&str>) -> Result<xr::Path> {
        match path {
            Some(path) => self.xr_instance.string_to_path(path).or_runtime_err(path),
            None => Ok(xr::Path::NULL),
        }
    }

    fn action(&self, handle: ActionHandle) -> Result<&TypedAction> {
        Ok(self
            .actions
            .get(handle.0 as usize)
            .ok_or(RuntimeError::InvalidHandle)?)
    }

    fn action_set(&self, handle: ActionSetHandle) -> Result<&xr::ActionSet> {
        Ok(self
            .action_sets
            .get(handle.0 as usize)
            .ok_or(RuntimeError::InvalidHandle)?)
    }

    fn locate_space(&self, space: &xr::Space, time: Duration) -> Result<Option<Pose>> {
        let location = space
            .locate(&self.reference_space, to_xr_time(time))
            .or_runtime_err("locate space")?;

        let valid =
            xr::SpaceLocationFlags::ORIENTATION_VALID | xr::SpaceLocationFlags::POSITION_VALID;
        Ok(location
            .location_flags
            .contains(valid)
            .then(|| to_pose(location.pose)))
    }
}

impl<G: xr::Graphics> XrRuntime for OpenXrRuntime<G> {
    fn create_action_set(
        &mut self,
        name: &str,
        display_name: &str,
        priority: u32,
    ) -> Result<ActionSetHandle> {
        let action_set = self
            .xr_instance
            .create_action_set(name, display_name, priority)
            .or_runtime_err(name)?;
        self.action_sets.push(action_set);

        Ok(ActionSetHandle(self.action_sets.len() as u64 - 1))
    }

    fn create_action(
        &mut self,
        action_set: ActionSetHandle,
        name: &str,
        display_name: &str,
        action_type: ActionType,
        subaction_paths: &[String],
    ) -> Result<ActionHandle> {
        let xr_paths = subaction_paths
            .iter()
            .map(|path| self.path(Some(path)))
            .collect::<Result<Vec<_>>>()?;

        let set = self.action_set(action_set)?;
        let action = match action_type {
            ActionType::Boolean => TypedAction::Boolean(
                set.create_action(name, display_name, &xr_paths)
                    .or_runtime_err(name)?,
            ),
            ActionType::Float => TypedAction::Float(
                set.create_action(name, display_name, &xr_paths)
                    .or_runtime_err(name)?,
            ),
            ActionType::Vector2 => TypedAction::Vector2(
                set.create_action(name, display_name, &xr_paths)
                    .or_runtime_err(name)?,
            ),
            ActionType::Pose => TypedAction::Pose(
                set.create_action(name, display_name, &xr_paths)
                    .or_runtime_err(name)?,
            ),
            ActionType::Vibration => TypedAction::Vibration(
                set.create_action(name, display_name, &xr_paths)
                    .or_runtime_err(name)?,
            ),
        };
        let handle = ActionHandle(self.actions.len() as u64);

        if let TypedAction::Pose(pose_action) = &action {
            let keys = subaction_paths
                .iter()
                .map(|path| Some(path.clone()))
                .chain([None]);
            for key in keys {
                let xr_path = self.path(key.as_deref())?;
                let space = pose_action
                    .create_space(self.xr_session.clone(), xr_path, xr::Posef::IDENTITY)
                    .or_runtime_err(name)?;
                self.pose_spaces.insert((handle, key), space);
            }
        }

        self.actions.push(action);

        Ok(handle)
    }

    fn suggest_interaction_profile_bindings(
        &mut self,
        interaction_profile: &str,
        bindings: &[SuggestedBinding],
    ) -> Result<()> {
        let profile_path = self.path(Some(interaction_profile))?;

        let xr_bindings = bindings
            .iter()
            .map(|binding| {
                let path = self.path(Some(&binding.path))?;
                Ok(self.action(binding.action)?.binding(path))
            })
            .collect::<Result<Vec<_>>>()?;

        self.xr_instance
            .suggest_interaction_profile_bindings(profile_path, &xr_bindings)
            .or_runtime_err(interaction_profile)
    }

    fn attach_action_sets(&mut self, action_sets: &[ActionSetHandle]) -> Result<()> {
        let sets = action_sets
            .iter()
            .map(|handle| self.action_set(*handle))
            .collect::<Result<Vec<_>>>()?;

        self.xr_session
            .attach_action_sets(&sets)
            .or_runtime_err("attach action sets")
    }

    fn sync_actions(&mut self, active_action_sets: &[ActionSetHandle]) -> Result<()> {
        let active_sets = active_action_sets
            .iter()
            .map(|handle| Ok(xr::ActiveActionSet::new(self.action_set(*handle)?)))
            .collect::<Result<Vec<_>>>()?;

        self.xr_session
            .sync_actions(&active_sets)
            .or_runtime_err("sync actions")
    }

    fn current_interaction_profile(&self, top_level_path: &str) -> Result<Option<String>> {
        let path = self.path(Some(top_level_path))?;
        let profile = self
            .xr_session
            .current_interaction_profile(path)
            .or_runtime_err(top_level_path)?;

        Ok(path_to_string(&self.xr_instance, profile))
    }

    fn boolean_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<bool>> {
        let TypedAction::Boolean(action) = self.action(action)? else {
            return Err(RuntimeError::ActionTypeMismatch.into());
        };
        let state = action
            .state(&self.xr_session, self.path(subaction_path)?)
            .or_runtime_err("boolean state")?;

        Ok(ActionState {
            current_state: state.current_state,
            changed_since_last_sync: state.changed_since_last_sync,
            is_active: state.is_active,
        })
    }

    fn float_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<f32>> {
        let TypedAction::Float(action) = self.action(action)? else {
            return Err(RuntimeError::ActionTypeMismatch.into());
        };
        let state = action
            .state(&self.xr_session, self.path(subaction_path)?)
            .or_runtime_err("float state")?;

        Ok(ActionState {
            current_state: state.current_state,
            changed_since_last_sync: state.changed_since_last_sync,
            is_active: state.is_active,
        })
    }

    fn vector2_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<Vec2>> {
        let TypedAction::Vector2(action) = self.action(action)? else {
            return Err(RuntimeError::ActionTypeMismatch.into());
        };
        let state = action
            .state(&self.xr_session, self.path(subaction_path)?)
            .or_runtime_err("vector2 state")?;

        Ok(ActionState {
            current_state: Vec2::new(state.current_state.x, state.current_state.y),
            changed_since_last_sync: state.changed_since_last_sync,
            is_active: state.is_active,
        })
    }

    fn pose_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        time: Duration,
    ) -> Result<PoseState> {
        let TypedAction::Pose(pose_action) = self.action(action)? else {
            return Err(RuntimeError::ActionTypeMismatch.into());
        };
        let is_active = pose_action
            .is_active(&self.xr_session, self.path(subaction_path)?)
            .or_runtime_err("pose state")?;
        if !is_active {
            return Ok(PoseState::default());
        }

        let key = (action, subaction_path.map(String::from));
        let pose = match self.pose_spaces.get(&key) {
            Some(space) => self.locate_space(space, time)?,
            None => return Err(RuntimeError::PathUnsupported(key.1.unwrap_or_default()).into()),
        };

        Ok(PoseState { is_active, pose })
    }

    fn apply_haptic_feedback(
        &mut self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        vibration: &HapticVibration,
    ) -> Result<()> {
        let TypedAction::Vibration(action) = self.action(action)? else {
            return Err(RuntimeError::ActionTypeMismatch.into());
        };

        let duration = vibration
            .duration
            .map(|d| xr::Duration::from_nanos(d.as_nanos() as _))
            .unwrap_or(xr::Duration::MIN_HAPTIC);
        let xr_vibration = xr::HapticVibration::new()
            .amplitude(vibration.amplitude)
            .duration(duration)
            // Zero lets the runtime pick the frequency
            .frequency(vibration.frequency.unwrap_or(0.0));

        action
            .apply_feedback(&self.xr_session, self.path(subaction_path)?, &xr_vibration)
            .or_runtime_err("haptic feedback")
    }

    fn locate_view(&self, time: Duration) -> Result<Option<Pose>> {
        self.locate_space(&self.view_space, time)
    }

    fn locate_palm(
        &self,
        hand: Hand,
        motion_range: HandJointsMotionRange,
        time: Duration,
    ) -> Result<Option<JointLocation>> {
        let Some(tracker) = &self.hand_trackers[hand as usize] else {
            return Ok(None);
        };
        if motion_range == HandJointsMotionRange::ConformingToController {
            // openxrs does not expose the motion range chain, the runtime default is used
            debug!("Conforming motion range requested for {hand:?}");
        }

        let Some(joints) = self
            .reference_space
            .locate_hand_joints(tracker, to_xr_time(time))
            .or_runtime_err("hand joints")?
        else {
            return Ok(None);
        };

        let palm = joints[xr::HandJoint::PALM.into_raw() as usize];
        let valid =
            xr::SpaceLocationFlags::ORIENTATION_VALID | xr::SpaceLocationFlags::POSITION_VALID;

        Ok(palm.location_flags.contains(valid).then(|| JointLocation {
            pose: to_pose(palm.pose),
            radius: palm.radius,
        }))
    }

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>> {
        loop {
            let Some(event) = self
                .xr_instance
                .poll_event(&mut self.event_storage)
                .or_runtime_err("poll event")?
            else {
                return Ok(None);
            };

            let event = match event {
                xr::Event::InteractionProfileChanged(_) => RuntimeEvent::InteractionProfileChanged,
                xr::Event::SessionStateChanged(event) => {
                    let state = match event.state() {
                        xr::SessionState::IDLE => SessionState::Idle,
                        xr::SessionState::READY => SessionState::Ready,
                        xr::SessionState::SYNCHRONIZED => SessionState::Synchronized,
                        xr::SessionState::VISIBLE => SessionState::Visible,
                        xr::SessionState::FOCUSED => SessionState::Focused,
                        xr::SessionState::STOPPING => SessionState::Stopping,
                        xr::SessionState::LOSS_PENDING => SessionState::LossPending,
                        xr::SessionState::EXITING => SessionState::Exiting,
                        other => {
                            debug!("Ignoring session state {other:?}");
                            continue;
                        }
                    };
                    RuntimeEvent::SessionStateChanged(state)
                }
                xr::Event::ViveTrackerConnectedHTCX(event) => {
                    let paths = event.paths();
                    RuntimeEvent::ViveTrackerConnected {
                        persistent_path: path_to_string(&self.xr_instance, paths.persistent_path),
                        role_path: path_to_string(&self.xr_instance, paths.role_path),
                    }
                }
                xr::Event::EventsLost(event) => {
                    error!("OpenXR: lost {} events!", event.lost_event_count());
                    continue;
                }
                _ => continue,
            };

            return Ok(Some(event));
        }
    }

    fn request_exit_session(&mut self) -> Result<()> {
        self.xr_session
            .request_exit()
            .or_runtime_err("request exit")
    }
}
