use std::{fmt::Display, time::Duration};
use xrscene_common::{Hand, Pose, anyhow::Result, glam::Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    Boolean,
    Float,
    Vector2,
    Pose,
    Vibration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionSetHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuggestedBinding {
    pub action: ActionHandle,
    pub path: String,
}

impl SuggestedBinding {
    pub fn new(action: ActionHandle, path: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionState<T> {
    pub current_state: T,
    pub changed_since_last_sync: bool,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoseState {
    pub is_active: bool,
    // None when the pose is not tracked this frame
    pub pose: Option<Pose>,
}

/// Haptic pulse description. A missing duration maps to the runtime minimum, a missing frequency
/// lets the runtime pick its optimal one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HapticVibration {
    pub amplitude: f32,
    pub duration: Option<Duration>,
    pub frequency: Option<f32>,
}

impl HapticVibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn frequency(mut self, frequency: f32) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointLocation {
    pub pose: Pose,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandJointsMotionRange {
    #[default]
    Unobstructed,
    ConformingToController,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeEvent {
    InteractionProfileChanged,
    SessionStateChanged(SessionState),
    ViveTrackerConnected {
        persistent_path: Option<String>,
        role_path: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    pub predicted_display_time: Duration,
    // Time since the first frame
    pub elapsed: Duration,
    pub delta: Duration,
    pub frame_index: u64,
}

impl FrameTime {
    pub fn next(&self, delta: Duration) -> Self {
        Self {
            predicted_display_time: self.predicted_display_time + delta,
            elapsed: self.elapsed + delta,
            delta,
            frame_index: self.frame_index + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    InvalidHandle,
    NameDuplicated(String),
    NameInvalid(String),
    PathInvalid(String),
    PathUnsupported(String),
    ActionSetsAlreadyAttached,
    ActionSetNotAttached,
    ActionTypeMismatch,
    SessionNotRunning,
    Other(String),
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::InvalidHandle => write!(f, "Invalid handle"),
            RuntimeError::NameDuplicated(name) => write!(f, "Name {name} already in use"),
            RuntimeError::NameInvalid(name) => write!(f, "Name {name} is invalid"),
            RuntimeError::PathInvalid(path) => write!(f, "Path {path} is invalid"),
            RuntimeError::PathUnsupported(path) => write!(f, "Path {path} is unsupported"),
            RuntimeError::ActionSetsAlreadyAttached => write!(f, "Action sets already attached"),
            RuntimeError::ActionSetNotAttached => write!(f, "Action set not attached"),
            RuntimeError::ActionTypeMismatch => write!(f, "Action type mismatch"),
            RuntimeError::SessionNotRunning => write!(f, "Session not running"),
            RuntimeError::Other(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The XR runtime as seen by the interaction subsystem. Paths are passed as strings and converted
/// by the implementation. Every call is synchronous and never blocks on input.
pub trait XrRuntime {
    fn create_action_set(
        &mut self,
        name: &str,
        display_name: &str,
        priority: u32,
    ) -> Result<ActionSetHandle>;

    fn create_action(
        &mut self,
        action_set: ActionSetHandle,
        name: &str,
        display_name: &str,
        action_type: ActionType,
        subaction_paths: &[String],
    ) -> Result<ActionHandle>;

    fn suggest_interaction_profile_bindings(
        &mut self,
        interaction_profile: &str,
        bindings: &[SuggestedBinding],
    ) -> Result<()>;

    fn attach_action_sets(&mut self, action_sets: &[ActionSetHandle]) -> Result<()>;

    fn sync_actions(&mut self, active_action_sets: &[ActionSetHandle]) -> Result<()>;

    fn current_interaction_profile(&self, top_level_path: &str) -> Result<Option<String>>;

    fn boolean_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<bool>>;

    fn float_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<f32>>;

    fn vector2_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
    ) -> Result<ActionState<Vec2>>;

    fn pose_state(
        &self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        time: Duration,
    ) -> Result<PoseState>;

    fn apply_haptic_feedback(
        &mut self,
        action: ActionHandle,
        subaction_path: Option<&str>,
        vibration: &HapticVibration,
    ) -> Result<()>;

    fn locate_view(&self, time: Duration) -> Result<Option<Pose>>;

    fn locate_palm(
        &self,
        hand: Hand,
        motion_range: HandJointsMotionRange,
        time: Duration,
    ) -> Result<Option<JointLocation>>;

    fn poll_event(&mut self) -> Result<Option<RuntimeEvent>>;

    fn request_exit_session(&mut self) -> Result<()>;
}
