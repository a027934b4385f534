use crate::{
    ActionHandle, ActionSetHandle, ActionState, ActionType, HandJointsMotionRange,
    HapticVibration, JointLocation, PoseState, RuntimeError, RuntimeEvent, SessionState,
    SuggestedBinding, XrRuntime,
};
use std::{
    cell::Cell,
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    time::Duration,
};
use xrscene_common::{
    Hand, Pose, anyhow::Result, glam::Vec2, is_top_level_user_path, is_tracker_role_path,
    profile_kind,
};

// Boolean actions bound to analog inputs read as pressed above this value
const BOOLEAN_THRESHOLD: f32 = 0.5;

struct MockActionSet {
    name: String,
    priority: u32,
}

struct MockAction {
    action_set: usize,
    name: String,
    action_type: ActionType,
    subaction_paths: Vec<String>,
}

#[derive(Clone, Debug, Default)]
struct SyncedState {
    value: Vec2,
    is_active: bool,
    changed: bool,
    // Input paths that fed this state on the last sync
    sources: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HapticRecord {
    pub action: ActionHandle,
    pub subaction_path: Option<String>,
    pub vibration: HapticVibration,
}

/// Runtime double with scripted devices. A connected device is bound to its interaction profile
/// only if the application suggested bindings for that profile, like a conformant runtime would.
#[derive(Default)]
pub struct MockRuntime {
    action_sets: Vec<MockActionSet>,
    actions: Vec<MockAction>,
    suggested: HashMap<String, Vec<SuggestedBinding>>,
    suggestion_calls: HashMap<String, usize>,
    attached: bool,
    attached_sets: HashSet<usize>,
    // Top level path -> interaction profile of the physical device
    devices: BTreeMap<String, String>,
    inputs: HashMap<String, f32>,
    vector2_inputs: HashMap<String, Vec2>,
    poses: HashMap<String, Pose>,
    view_pose: Option<Pose>,
    palms: HashMap<Hand, JointLocation>,
    last_motion_range: Cell<Option<HandJointsMotionRange>>,
    events: VecDeque<RuntimeEvent>,
    synced: HashMap<(ActionHandle, Option<String>), SyncedState>,
    haptics: Vec<HapticRecord>,
    profile_queries: Cell<usize>,
    sync_count: usize,
    exit_requested: bool,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, top_level_path: &str, interaction_profile: &str) {
        self.devices
            .insert(top_level_path.into(), interaction_profile.into());

        if is_tracker_role_path(top_level_path) {
            let role = top_level_path.rsplit('/').next().unwrap_or_default();
            self.events.push_back(RuntimeEvent::ViveTrackerConnected {
                persistent_path: Some(format!("/devices/htc/vive_tracker_htcx/{role}")),
                role_path: Some(top_level_path.into()),
            });
        }
        if self.attached {
            self.events
                .push_back(RuntimeEvent::InteractionProfileChanged);
        }
    }

    pub fn disconnect(&mut self, top_level_path: &str) {
        if self.devices.remove(top_level_path).is_some() && self.attached {
            self.events
                .push_back(RuntimeEvent::InteractionProfileChanged);
        }
    }

    pub fn set_input(&mut self, input_path: &str, value: f32) {
        self.inputs.insert(input_path.into(), value);
    }

    pub fn set_vector2_input(&mut self, input_path: &str, value: Vec2) {
        self.vector2_inputs.insert(input_path.into(), value);
    }

    pub fn set_pose(&mut self, input_path: &str, pose: Pose) {
        self.poses.insert(input_path.into(), pose);
    }

    pub fn clear_pose(&mut self, input_path: &str) {
        self.poses.remove(input_path);
    }

    pub fn set_view_pose(&mut self, pose: Option<Pose>) {
        self.view_pose = pose;
    }

    pub fn set_palm(&mut self, hand: Hand, location: Option<JointLocation>) {
        match location {
            Some(location) => self.palms.insert(hand, location),
            None => self.palms.remove(&hand),
        };
    }

    pub fn push_event(&mut self, event: RuntimeEvent) {
        self.events.push_back(event);
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn action_set_names(&self) -> Vec<&str> {
        self.action_sets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn suggestion_calls(&self, interaction_profile: &str) -> usize {
        self.suggestion_calls
            .get(interaction_profile)
            .copied()
            .unwrap_or(0)
    }

    pub fn suggested_bindings(&self, interaction_profile: &str) -> Vec<SuggestedBinding> {
        self.suggested
            .get(interaction_profile)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attached_action_set_names(&self) -> Vec<&str> {
        self.action_sets
            .iter()
            .enumerate()
            .filter(|(index, _)| self.attached_sets.contains(index))
            .map(|(_, set)| set.name.as_str())
            .collect()
    }

    pub fn profile_queries(&self) -> usize {
        self.profile_queries.get()
    }

    pub fn sync_count(&self) -> usize {
        self.sync_count
    }

    pub fn haptics(&self) -> &[HapticRecord] {
        &self.haptics
    }

    pub fn last_motion_range(&self) -> Option<HandJointsMotionRange> {
        self.last_motion_range.get()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn action(&self, handle: ActionHandle) -> Result<&MockAction> {
        Ok(self
            .actions
            .get(handle.0 as usize)
            .ok_or(RuntimeError::InvalidHandle)?)
    }

    fn action_set_index(&self, handle: ActionSetHandle) -> Result<usize> {
        let index = handle.0 as usize;
        if index < self.action_sets.len() {
            Ok(index)
        } else {
            Err(RuntimeError::InvalidHandle.into())
        }
    }

    fn bound_profile(&self, top_level_path: &str) -> Option<&str> {
        let profile = self.devices.get(top_level_path)?;

        self.suggested
            .get(profile)
            .is_some_and(|bindings| !bindings.is_empty())
            .then_some(profile.as_str())
    }

    // Bindings of the currently bound profile of each connected device
    fn live_bindings(&self) -> impl Iterator<Item = (&str, &SuggestedBinding)> {
        self.devices.keys().flat_map(move |top_level_path| {
            self.bound_profile(top_level_path)
                .and_then(|profile| self.suggested.get(profile))
                .into_iter()
                .flatten()
                .filter(move |binding| {
                    binding
                        .path
                        .strip_prefix(top_level_path.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
                })
                .map(move |binding| (top_level_path.as_str(), binding))
        })
    }

    fn evaluate(
        &self,
        action_index: usize,
        subaction_path: Option<&str>,
        claims: &HashMap<String, u32>,
    ) -> SyncedState {
        let action = &self.actions[action_index];
        let priority = self.action_sets[action.action_set].priority;
        let handle = ActionHandle(action_index as u64);

        // An input bound by a higher priority active set is hidden from this one
        let sources = self
            .live_bindings()
            .filter(|(top_level_path, binding)| {
                binding.action == handle
                    && subaction_path.is_none_or(|path| path == *top_level_path)
                    && claims
                        .get(&binding.path)
                        .is_none_or(|claimed| *claimed <= priority)
            })
            .map(|(_, binding)| binding.path.clone())
            .collect::<Vec<_>>();

        let input = |path: &String| self.inputs.get(path).copied().unwrap_or(0.0);
        let value = match action.action_type {
            ActionType::Boolean => {
                let pressed = sources.iter().any(|path| input(path) > BOOLEAN_THRESHOLD);
                Vec2::new(if pressed { 1.0 } else { 0.0 }, 0.0)
            }
            ActionType::Float => {
                let value = sources
                    .iter()
                    .map(input)
                    .fold(0.0_f32, |acc, v| if v.abs() > acc.abs() { v } else { acc });
                Vec2::new(value, 0.0)
            }
            ActionType::Vector2 => sources
                .iter()
                .filter_map(|path| self.vector2_inputs.get(path).copied())
                .fold(Vec2::ZERO, |acc, v| {
                    if v.length() > acc.length() { v } else { acc }
                }),
            ActionType::Pose | ActionType::Vibration => Vec2::ZERO,
        };

        SyncedState {
            value,
            is_active: !sources.is_empty(),
            changed: false,
            sources,
        }
    }

    fn synced_state(
        &self,
        action: ActionHandle,
        expected: ActionType,
        subaction_path: Option<&str>,
    ) -> Result<SyncedState> {
        if !self.attached {
            return Err(RuntimeError::ActionSetNotAttached.into());
        }
        let mock_action = self.action(action)?;
        if mock_action.action_type != expected {
            return Err(RuntimeError::ActionTypeMismatch.into());
        }
        if let Some(path) = subaction_path {
            if !mock_action.subaction_paths.iter().any(|p| p == path) {
                return Err(RuntimeError::PathUnsupported(path.into()).into());
            }
        }

        Ok(self
            .synced
            .get(&(action, subaction_path.map(String::from)))
            .cloned()
            .unwrap_or_default())
    }
}

impl XrRuntime for MockRuntime {
    fn create_action_set(
        &mut self,
        name: &str,
        _display_name: &str,
        priority: u32,
    ) -> Result<ActionSetHandle> {
        if self.attached {
            return Err(RuntimeError::ActionSetsAlreadyAttached.into());
        }
        if self.action_sets.iter().any(|set| set.name == name) {
            return Err(RuntimeError::NameDuplicated(name.into()).into());
        }

        self.action_sets.push(MockActionSet {
            name: name.into(),
            priority,
        });

        Ok(ActionSetHandle(self.action_sets.len() as u64 - 1))
    }

    fn create_action(
        &mut self,
        action_set: ActionSetHandle,
        name: &str,
        _display_name: &str,
        action_type: ActionType,
        subaction_paths: &[String],
    ) -> Result<ActionHandle> {
        if self.attached {
            return Err(RuntimeError::ActionSetsAlreadyAttached.into());
        }
        let set_index = self.action_set_index(action_set)?;
        if self
            .actions
            .iter()
            .any(|a| a.action_set == set_index && a.name == name)
        {
            return Err(RuntimeError::NameDuplicated(name.into()).into());
        }
        if let Some(path) = subaction_paths
            .iter()
            .find(|path| !is_top_level_user_path(path))
        {
            return Err(RuntimeError::PathUnsupported(path.clone()).into());
        }

        self.actions.push(MockAction {
            action_set: set_index,
            name: name.into(),
            action_type,
            subaction_paths: subaction_paths.to_vec(),
        });

        Ok(ActionHandle(self.actions.len() as u64 - 1))
    }

    fn suggest_interaction_profile_bindings(
        &mut self,
        interaction_profile: &str,
        bindings: &[SuggestedBinding],
    ) -> Result<()> {
        if self.attached {
            return Err(RuntimeError::ActionSetsAlreadyAttached.into());
        }
        if profile_kind(interaction_profile).is_none() {
            return Err(RuntimeError::PathUnsupported(interaction_profile.into()).into());
        }
        for binding in bindings {
            self.action(binding.action)?;
            if !binding.path.starts_with("/user/") {
                return Err(RuntimeError::PathUnsupported(binding.path.clone()).into());
            }
        }

        // A later suggestion for the same profile replaces the previous one
        self.suggested
            .insert(interaction_profile.into(), bindings.to_vec());
        *self
            .suggestion_calls
            .entry(interaction_profile.into())
            .or_default() += 1;

        Ok(())
    }

    fn attach_action_sets(&mut self, action_sets: &[ActionSetHandle]) -> Result<()> {
        if self.attached {
            return Err(RuntimeError::ActionSetsAlreadyAttached.into());
        }
        let indices = action_sets
            .iter()
            .map(|handle| self.action_set_index(*handle))
            .collect::<Result<HashSet<_>>>()?;

        self.attached_sets = indices;
        self.attached = true;

        Ok(())
    }

    fn sync_actions(&mut self, active_action_sets: &[ActionSetHandle]) -> Result<()> {
        if !self.attached {
            return Err(RuntimeError::ActionSetNotAttached.into());
        }
        let active = active_action_sets
            .iter()
            .map(|handle| self.action_set_index(*handle))
            .collect::<Result<HashSet<_>>>()?;
        if !active.is_subset(&self.attached_sets) {
            return Err(RuntimeError::ActionSetNotAttached.into());
        }

        let mut claims = HashMap::<String, u32>::new();
        for (_, binding) in self.live_bindings() {
            let Some(action) = self.actions.get(binding.action.0 as usize) else {
                continue;
            };
            if active.contains(&action.action_set) {
                let priority = self.action_sets[action.action_set].priority;
                let claim = claims.entry(binding.path.clone()).or_insert(priority);
                *claim = (*claim).max(priority);
            }
        }

        let mut updates = vec![];
        for (index, action) in self.actions.iter().enumerate() {
            let handle = ActionHandle(index as u64);
            let keys = action
                .subaction_paths
                .iter()
                .map(|path| Some(path.clone()))
                .chain([None]);

            for key in keys {
                let mut state = if active.contains(&action.action_set) {
                    self.evaluate(index, key.as_deref(), &claims)
                } else {
                    SyncedState::default()
                };

                let previous = self
                    .synced
                    .get(&(handle, key.clone()))
                    .filter(|previous| previous.is_active)
                    .map(|previous| previous.value)
                    .unwrap_or(Vec2::ZERO);
                state.changed = state.is_active && state.value != previous;

                updates.push(((handle, key), state));
            }
        }

        self.synced.extend(updates);
        self.sync_count += 1;

        Ok(())
    }

    fn current_interaction_profile(&self, top_level_path: &str) -> Result<Option<String>> {
        if !self.attached {
            return Err(RuntimeError::ActionSetNotAttached.into());
        }
        if !is_top_level_user_path(top_level_path) {
            return Err(RuntimeError::PathUnsupported(top_level_path.into()).into());
        }
        self.profile_queries.set(self.profile_queries.get() + 1);

        Ok(self.bound_profile(top_level_path).map(String::from))
    }

    fn boolean_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<bool>> {
        let state = self.synced_state(action, ActionType::Boolean, subaction_path)?;

        Ok(ActionState {
            current_state: state.value.x > 0.0,
            changed_since_last_sync: state.changed,
            is_active: state.is_active,
        })
    }

    fn float_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<f32>> {
        let state = self.synced_state(action, ActionType::Float, subaction_path)?;

        Ok(ActionState {
            current_state: state.value.x,
            changed_since_last_sync: state.changed,
            is_active: state.is_active,
        })
    }

    fn vector2_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<Vec2>> {
        let state = self.synced_state(action, ActionType::Vector2, subaction_path)?;

        Ok(ActionState {
            current_state: state.value,
            changed_since_last_sync: state.changed,
            is_active: state.is_active,
        })
    }

    fn pose_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        _time: Duration,
    ) -> Result<PoseState> {
        let state = self.synced_state(action, ActionType::Pose, subaction_path)?;
        let pose = state
            .sources
            .iter()
            .find_map(|path| self.poses.get(path).copied());

        Ok(PoseState {
            is_active: state.is_active,
            pose: pose.filter(|_| state.is_active),
        })
    }

    fn apply_haptic_feedback(
        &mut self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        vibration: &HapticVibration,
    ) -> Result<()> {
        self.synced_state(action, ActionType::Vibration, subaction_path)?;

        self.haptics.push(HapticRecord {
            action,
            subaction_path: subaction_path.map(String::from),
            vibration: *vibration,
        });

        Ok(())
    }

    fn locate_view(&self, _time: Duration) -> Result<Option<Pose>> {
        Ok(self.view_pose)
    }

    fn locate_palm(
        &self,
        hand: Hand,
        motion_range: HandJointsMotionRange,
        _time: Duration,
    ) -> Result<Option<JointLocation>> {
        self.last_motion_range.set(Some(motion_range));

        Ok(self.palms.get(&hand).copied())
    }

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>> {
        Ok(self.events.pop_front())
    }

    fn request_exit_session(&mut self) -> Result<()> {
        self.exit_requested = true;
        self.events
            .push_back(RuntimeEvent::SessionStateChanged(SessionState::Stopping));
        self.events
            .push_back(RuntimeEvent::SessionStateChanged(SessionState::Exiting));

        Ok(())
    }
}
