use crate::{Action, ActionContext, ActionType, SuggestedBinding};
use std::collections::BTreeMap;
use xrscene_common::{
    HAND_PATHS, TopLevelKind, anyhow::Result, is_hand_path, is_tracker_role_path, profile_kind,
};

/// Declarative binding of an action to a component of an interaction profile. A missing
/// subaction path expands to every path of the current expansion context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionBinding {
    pub interaction_profile: String,
    // e.g. "trigger/click"
    pub component_path: String,
    pub subaction_path: Option<String>,
}

impl ActionBinding {
    pub fn new(interaction_profile: &str, component_path: &str) -> Self {
        Self {
            interaction_profile: interaction_profile.into(),
            component_path: component_path.into(),
            subaction_path: None,
        }
    }

    pub fn with_subaction(
        interaction_profile: &str,
        component_path: &str,
        subaction_path: &str,
    ) -> Self {
        Self {
            interaction_profile: interaction_profile.into(),
            component_path: component_path.into(),
            subaction_path: Some(subaction_path.into()),
        }
    }

    pub fn matches(&self, interaction_profile: &str, top_level_path: &str) -> bool {
        self.interaction_profile == interaction_profile
            && self
                .subaction_path
                .as_deref()
                .is_none_or(|path| path == top_level_path)
    }
}

/// An action together with its declared bindings, in declaration order.
#[derive(Clone, Debug)]
pub struct DeclaredAction {
    pub action: Action,
    pub bindings: Vec<ActionBinding>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpansionContext {
    Hands,
    Tracker(String),
}

impl ExpansionContext {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ExpansionContext::Hands => HAND_PATHS.to_vec(),
            ExpansionContext::Tracker(role_path) => vec![role_path.as_str()],
        }
    }

    pub fn kind(&self) -> TopLevelKind {
        match self {
            ExpansionContext::Hands => TopLevelKind::Hands,
            ExpansionContext::Tracker(_) => TopLevelKind::ViveTracker,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        match self {
            ExpansionContext::Hands => is_hand_path(path),
            ExpansionContext::Tracker(role_path) => {
                is_tracker_role_path(path) && path == role_path
            }
        }
    }
}

pub fn binding_path(action_type: ActionType, subaction_path: &str, component_path: &str) -> String {
    let direction = if action_type == ActionType::Vibration {
        "output"
    } else {
        "input"
    };

    format!("{subaction_path}/{direction}/{component_path}")
}

/// Concrete bindings grouped by interaction profile, deduplicated, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingTable {
    profiles: BTreeMap<String, Vec<SuggestedBinding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interaction_profile: &str, binding: SuggestedBinding) {
        let bindings = self
            .profiles
            .entry(interaction_profile.into())
            .or_default();
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
    }

    pub fn merge(&mut self, other: BindingTable) {
        for (profile, bindings) in other.profiles {
            for binding in bindings {
                self.push(&profile, binding);
            }
        }
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn bindings(&self, interaction_profile: &str) -> &[SuggestedBinding] {
        self.profiles
            .get(interaction_profile)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.profiles.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn submit(self, action_context: &mut ActionContext) -> Result<()> {
        for (profile, bindings) in self.profiles {
            action_context.suggest_interaction_profile_bindings(&profile, bindings)?;
        }

        Ok(())
    }
}

/// Expand declared bindings into concrete binding paths for one expansion context. Hand and
/// tracker contexts never mix: profiles, wildcards and explicit paths of the other family are
/// skipped.
pub fn compile_bindings(actions: &[DeclaredAction], context: &ExpansionContext) -> BindingTable {
    let mut table = BindingTable::new();

    for declared in actions {
        let action = &declared.action;

        for binding in &declared.bindings {
            if profile_kind(&binding.interaction_profile)
                .is_some_and(|kind| kind != context.kind())
            {
                continue;
            }

            match &binding.subaction_path {
                Some(subaction_path) => {
                    if context.contains(subaction_path) {
                        table.push(
                            &binding.interaction_profile,
                            SuggestedBinding::new(
                                action.handle,
                                binding_path(
                                    action.action_type,
                                    subaction_path,
                                    &binding.component_path,
                                ),
                            ),
                        );
                    }
                }
                None => {
                    for path in context.paths() {
                        if !action.subaction_paths.is_empty()
                            && !action.subaction_paths.iter().any(|p| p == path)
                        {
                            continue;
                        }

                        table.push(
                            &binding.interaction_profile,
                            SuggestedBinding::new(
                                action.handle,
                                binding_path(action.action_type, path, &binding.component_path),
                            ),
                        );
                    }
                }
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionHandle, ActionSetId, priorities};
    use crate::mock::MockRuntime;
    use xrscene_common::{
        HAND_LEFT_PATH, HAND_RIGHT_PATH, MOTION_CONTROLLER_PROFILE_PATH,
        SIMPLE_CONTROLLER_PROFILE_PATH, TOUCH_CONTROLLER_PROFILE_PATH, TRACKER_ROLE_PATHS,
        TRACKER_WAIST_PATH, VIVE_TRACKER_PROFILE_PATH,
    };

    fn make_action(
        context: &mut ActionContext,
        runtime: &mut MockRuntime,
        set: ActionSetId,
        name: &str,
        action_type: ActionType,
        subaction_paths: &[&str],
    ) -> Action {
        context
            .create_action(runtime, set, name, name, action_type, subaction_paths)
            .unwrap()
    }

    fn all_paths() -> Vec<&'static str> {
        let mut paths = vec![HAND_LEFT_PATH, HAND_RIGHT_PATH];
        paths.extend(TRACKER_ROLE_PATHS);
        paths
    }

    fn setup() -> (MockRuntime, ActionContext, ActionSetId) {
        let mut runtime = MockRuntime::new();
        let mut context = ActionContext::new();
        let set = context
            .create_action_set(&mut runtime, "bindings_test", "Test", priorities::DEFAULT)
            .unwrap();

        (runtime, context, set)
    }

    #[test]
    fn select_wildcard_expands_to_both_hands() {
        let (mut runtime, mut context, set) = setup();
        let select = make_action(
            &mut context,
            &mut runtime,
            set,
            "select",
            ActionType::Boolean,
            &all_paths(),
        );
        let handle = select.handle;

        let actions = [DeclaredAction {
            action: select,
            bindings: vec![ActionBinding::new(SIMPLE_CONTROLLER_PROFILE_PATH, "select/click")],
        }];

        let table = compile_bindings(&actions, &ExpansionContext::Hands);

        assert_eq!(table.profiles().collect::<Vec<_>>(), [SIMPLE_CONTROLLER_PROFILE_PATH]);
        assert_eq!(
            table.bindings(SIMPLE_CONTROLLER_PROFILE_PATH),
            [
                SuggestedBinding::new(handle, "/user/hand/left/input/select/click"),
                SuggestedBinding::new(handle, "/user/hand/right/input/select/click"),
            ]
        );
    }

    #[test]
    fn wildcard_is_filtered_by_declared_subaction_paths() {
        let (mut runtime, mut context, set) = setup();
        let right_only = make_action(
            &mut context,
            &mut runtime,
            set,
            "right_only",
            ActionType::Float,
            &[HAND_RIGHT_PATH],
        );

        let actions = [DeclaredAction {
            action: right_only,
            bindings: vec![ActionBinding::new(MOTION_CONTROLLER_PROFILE_PATH, "trigger/value")],
        }];

        let table = compile_bindings(&actions, &ExpansionContext::Hands);

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.bindings(MOTION_CONTROLLER_PROFILE_PATH)[0].path,
            "/user/hand/right/input/trigger/value"
        );
    }

    #[test]
    fn explicit_subaction_compiles_to_one_path() {
        let (mut runtime, mut context, set) = setup();
        let a = make_action(
            &mut context,
            &mut runtime,
            set,
            "a",
            ActionType::Boolean,
            &all_paths(),
        );

        let actions = [DeclaredAction {
            action: a,
            bindings: vec![ActionBinding::with_subaction(
                TOUCH_CONTROLLER_PROFILE_PATH,
                "a/click",
                HAND_RIGHT_PATH,
            )],
        }];

        let table = compile_bindings(&actions, &ExpansionContext::Hands);

        assert_eq!(table.len(), 1);
        assert_eq!(
            table.bindings(TOUCH_CONTROLLER_PROFILE_PATH)[0].path,
            "/user/hand/right/input/a/click"
        );
    }

    #[test]
    fn hand_and_tracker_contexts_do_not_mix() {
        let (mut runtime, mut context, set) = setup();
        let menu = make_action(
            &mut context,
            &mut runtime,
            set,
            "menu",
            ActionType::Boolean,
            &all_paths(),
        );
        let waist_pose = make_action(
            &mut context,
            &mut runtime,
            set,
            "waist_pose",
            ActionType::Pose,
            &all_paths(),
        );

        let actions = [
            DeclaredAction {
                action: menu,
                bindings: vec![
                    ActionBinding::new(SIMPLE_CONTROLLER_PROFILE_PATH, "menu/click"),
                    ActionBinding::new(VIVE_TRACKER_PROFILE_PATH, "menu/click"),
                ],
            },
            DeclaredAction {
                action: waist_pose,
                bindings: vec![ActionBinding::with_subaction(
                    VIVE_TRACKER_PROFILE_PATH,
                    "grip/pose",
                    TRACKER_WAIST_PATH,
                )],
            },
        ];

        let hands = compile_bindings(&actions, &ExpansionContext::Hands);
        assert_eq!(hands.profiles().collect::<Vec<_>>(), [SIMPLE_CONTROLLER_PROFILE_PATH]);
        assert_eq!(hands.len(), 2);

        let waist = compile_bindings(&actions, &ExpansionContext::Tracker(TRACKER_WAIST_PATH.into()));
        assert_eq!(waist.profiles().collect::<Vec<_>>(), [VIVE_TRACKER_PROFILE_PATH]);
        assert_eq!(
            waist
                .bindings(VIVE_TRACKER_PROFILE_PATH)
                .iter()
                .map(|b| b.path.as_str())
                .collect::<Vec<_>>(),
            [
                "/user/vive_tracker_htcx/role/waist/input/menu/click",
                "/user/vive_tracker_htcx/role/waist/input/grip/pose",
            ]
        );

        // The waist pose binding belongs to another role
        let chest = compile_bindings(
            &actions,
            &ExpansionContext::Tracker("/user/vive_tracker_htcx/role/chest".into()),
        );
        assert_eq!(chest.len(), 1);
    }

    #[test]
    fn vibration_binds_to_output() {
        let (mut runtime, mut context, set) = setup();
        let haptics = make_action(
            &mut context,
            &mut runtime,
            set,
            "haptics",
            ActionType::Vibration,
            &[HAND_LEFT_PATH, HAND_RIGHT_PATH],
        );

        let actions = [DeclaredAction {
            action: haptics,
            bindings: vec![ActionBinding::new(SIMPLE_CONTROLLER_PROFILE_PATH, "haptic")],
        }];

        let table = compile_bindings(&actions, &ExpansionContext::Hands);

        assert_eq!(
            table.bindings(SIMPLE_CONTROLLER_PROFILE_PATH)[1].path,
            "/user/hand/right/output/haptic"
        );
    }

    #[test]
    fn merge_deduplicates() {
        let action = ActionHandle(7);
        let mut a = BindingTable::new();
        a.push(
            SIMPLE_CONTROLLER_PROFILE_PATH,
            SuggestedBinding::new(action, "/user/hand/left/input/select/click"),
        );
        let mut b = a.clone();
        b.push(
            SIMPLE_CONTROLLER_PROFILE_PATH,
            SuggestedBinding::new(action, "/user/hand/right/input/select/click"),
        );

        a.merge(b);

        assert_eq!(a.len(), 2);
    }
}
