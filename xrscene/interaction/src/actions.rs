use crate::{ActionHandle, ActionSetHandle, ActionType, RuntimeError, SuggestedBinding, XrRuntime};
use std::{
    collections::{BTreeMap, HashSet},
    fmt::Display,
};
use xrscene_common::{anyhow::Result, debug, is_top_level_user_path, warn};

pub mod priorities {
    pub const DEFAULT: u32 = 0;
    pub const MENU: u32 = 1;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    DuplicateActionSetName(String),
    DuplicateActionName { action_set: String, action: String },
    InvalidName(String),
    InvalidSubactionPath(String),
    AlreadyAttached,
    ActionTypeMismatch {
        action: String,
        expected: ActionType,
        found: ActionType,
    },
}

impl Display for InteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionError::DuplicateActionSetName(name) => {
                write!(f, "Action set {name} already exists")
            }
            InteractionError::DuplicateActionName { action_set, action } => {
                write!(f, "Action {action} already exists in action set {action_set}")
            }
            InteractionError::InvalidName(name) => {
                write!(f, "\"{name}\" is not a valid action or action set name")
            }
            InteractionError::InvalidSubactionPath(path) => {
                write!(f, "{path} is not a top level user path")
            }
            InteractionError::AlreadyAttached => {
                write!(f, "Action sets are already attached to the session")
            }
            InteractionError::ActionTypeMismatch {
                action,
                expected,
                found,
            } => write!(f, "Action {action} is {found:?}, expected {expected:?}"),
        }
    }
}

impl std::error::Error for InteractionError {}

// Same character set the runtime accepts for action and action set names
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionSetId(usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub handle: ActionHandle,
    pub action_set: ActionSetId,
    pub name: String,
    pub action_type: ActionType,
    pub subaction_paths: Vec<String>,
}

pub struct ActionSet {
    handle: ActionSetHandle,
    name: String,
    priority: u32,
    active: bool,
    action_names: HashSet<String>,
}

impl ActionSet {
    pub fn handle(&self) -> ActionSetHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Declarations made since [`ActionContext::checkpoint`], dropped again by
/// [`ActionContext::rollback`].
pub struct ActionCheckpoint {
    action_set_count: usize,
    action_names: Vec<HashSet<String>>,
    suggested_bindings: BTreeMap<String, Vec<SuggestedBinding>>,
}

/// Owns every action set of the application. Scenes declare actions and suggest bindings here
/// during construction, then the whole context is attached to the session once.
#[derive(Default)]
pub struct ActionContext {
    action_sets: Vec<ActionSet>,
    suggested_bindings: BTreeMap<String, Vec<SuggestedBinding>>,
    attached: bool,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_action_set(
        &mut self,
        runtime: &mut dyn XrRuntime,
        name: &str,
        display_name: &str,
        priority: u32,
    ) -> Result<ActionSetId> {
        if self.attached {
            return Err(InteractionError::AlreadyAttached.into());
        }
        if !is_valid_name(name) {
            return Err(InteractionError::InvalidName(name.into()).into());
        }
        if self.action_sets.iter().any(|set| set.name == name) {
            return Err(InteractionError::DuplicateActionSetName(name.into()).into());
        }

        let handle = runtime.create_action_set(name, display_name, priority)?;

        self.action_sets.push(ActionSet {
            handle,
            name: name.into(),
            priority,
            active: true,
            action_names: HashSet::new(),
        });

        Ok(ActionSetId(self.action_sets.len() - 1))
    }

    pub fn create_action(
        &mut self,
        runtime: &mut dyn XrRuntime,
        action_set_id: ActionSetId,
        name: &str,
        display_name: &str,
        action_type: ActionType,
        subaction_paths: &[&str],
    ) -> Result<Action> {
        if self.attached {
            return Err(InteractionError::AlreadyAttached.into());
        }
        if !is_valid_name(name) {
            return Err(InteractionError::InvalidName(name.into()).into());
        }
        if let Some(path) = subaction_paths
            .iter()
            .find(|path| !is_top_level_user_path(path))
        {
            return Err(InteractionError::InvalidSubactionPath((*path).into()).into());
        }

        let action_set = self
            .action_sets
            .get_mut(action_set_id.0)
            .ok_or(RuntimeError::InvalidHandle)?;
        if action_set.action_names.contains(name) {
            return Err(InteractionError::DuplicateActionName {
                action_set: action_set.name.clone(),
                action: name.into(),
            }
            .into());
        }

        let subaction_paths = subaction_paths
            .iter()
            .map(|path| (*path).to_owned())
            .collect::<Vec<_>>();

        let handle = runtime.create_action(
            action_set.handle,
            name,
            display_name,
            action_type,
            &subaction_paths,
        )?;

        action_set.action_names.insert(name.into());

        Ok(Action {
            handle,
            action_set: action_set_id,
            name: name.into(),
            action_type,
            subaction_paths,
        })
    }

    pub fn action_set(&self, id: ActionSetId) -> Result<&ActionSet> {
        Ok(self.action_sets.get(id.0).ok_or(RuntimeError::InvalidHandle)?)
    }

    pub fn action_set_mut(&mut self, id: ActionSetId) -> Result<&mut ActionSet> {
        Ok(self
            .action_sets
            .get_mut(id.0)
            .ok_or(RuntimeError::InvalidHandle)?)
    }

    pub fn action_sets(&self) -> &[ActionSet] {
        &self.action_sets
    }

    /// Accumulate binding suggestions for a profile. Nothing reaches the runtime until
    /// [`ActionContext::attach`], because the runtime only keeps the last suggestion per profile.
    pub fn suggest_interaction_profile_bindings(
        &mut self,
        interaction_profile: &str,
        bindings: impl IntoIterator<Item = SuggestedBinding>,
    ) -> Result<()> {
        if self.attached {
            return Err(InteractionError::AlreadyAttached.into());
        }

        let entry = self
            .suggested_bindings
            .entry(interaction_profile.into())
            .or_default();
        for binding in bindings {
            if !entry.contains(&binding) {
                entry.push(binding);
            }
        }

        Ok(())
    }

    pub fn suggested_bindings(&self, interaction_profile: &str) -> &[SuggestedBinding] {
        self.suggested_bindings
            .get(interaction_profile)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn suggested_profiles(&self) -> impl Iterator<Item = &str> {
        self.suggested_bindings.keys().map(String::as_str)
    }

    /// Submit one suggestion per interaction profile, then attach all action sets. When
    /// `profile_filter` is not empty, profiles outside of it are not suggested.
    pub fn attach(&mut self, runtime: &mut dyn XrRuntime, profile_filter: &[String]) -> Result<()> {
        if self.attached {
            return Err(InteractionError::AlreadyAttached.into());
        }

        for (profile, bindings) in &self.suggested_bindings {
            if bindings.is_empty() {
                continue;
            }
            if !profile_filter.is_empty() && !profile_filter.contains(profile) {
                debug!("Skipping bindings for filtered out profile {profile}");
                continue;
            }

            if let Err(e) = runtime.suggest_interaction_profile_bindings(profile, bindings) {
                match e.downcast_ref::<RuntimeError>() {
                    Some(RuntimeError::PathUnsupported(_)) => {
                        warn!("Interaction profile {profile} is not supported by the runtime")
                    }
                    _ => return Err(e),
                }
            }
        }

        let handles = self
            .action_sets
            .iter()
            .map(|set| set.handle)
            .collect::<Vec<_>>();
        runtime.attach_action_sets(&handles)?;

        self.attached = true;

        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn checkpoint(&self) -> ActionCheckpoint {
        ActionCheckpoint {
            action_set_count: self.action_sets.len(),
            action_names: self
                .action_sets
                .iter()
                .map(|set| set.action_names.clone())
                .collect(),
            suggested_bindings: self.suggested_bindings.clone(),
        }
    }

    /// Forget the action sets, actions and binding suggestions declared after `checkpoint`. The
    /// runtime objects stay alive but are never suggested, attached or synced.
    pub fn rollback(&mut self, checkpoint: ActionCheckpoint) {
        if self.attached {
            warn!("Cannot roll back declarations after attach");
            return;
        }

        for set in self.action_sets.drain(checkpoint.action_set_count..) {
            debug!("Discarding action set {}", set.name);
        }
        for (set, action_names) in self.action_sets.iter_mut().zip(checkpoint.action_names) {
            set.action_names = action_names;
        }
        self.suggested_bindings = checkpoint.suggested_bindings;
    }

    pub fn sync(&self, runtime: &mut dyn XrRuntime) -> Result<()> {
        let active_sets = self
            .action_sets
            .iter()
            .filter(|set| set.active)
            .map(|set| set.handle)
            .collect::<Vec<_>>();

        runtime.sync_actions(&active_sets)
    }
}
