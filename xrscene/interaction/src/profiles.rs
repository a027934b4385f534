use crate::XrRuntime;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use xrscene_common::anyhow::Result;

pub const NO_INTERACTION_PROFILE: &str = "No interaction profile";

/// Shared invalidation flag. Can be marked from any thread, and is consumed with a single
/// test-and-clear so that any number of marks between two consumers yield one pass.
#[derive(Clone, Debug, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    pub fn new(dirty: bool) -> Self {
        Self(Arc::new(AtomicBool::new(dirty)))
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileState {
    Unresolved,
    Resolved(String),
    None,
}

impl ProfileState {
    pub fn profile(&self) -> Option<&str> {
        match self {
            ProfileState::Resolved(profile) => Some(profile),
            ProfileState::Unresolved | ProfileState::None => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.profile().unwrap_or(NO_INTERACTION_PROFILE)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileTransition {
    pub top_level_path: String,
    pub previous: ProfileState,
    pub current: ProfileState,
}

struct TrackedPath {
    path: String,
    state: ProfileState,
}

pub struct InteractionProfileResolver {
    paths: Vec<TrackedPath>,
    dirty: DirtyFlag,
}

impl InteractionProfileResolver {
    // Starts dirty, the first update resolves every path
    pub fn new<S: Into<String>>(top_level_paths: impl IntoIterator<Item = S>) -> Self {
        Self {
            paths: top_level_paths
                .into_iter()
                .map(|path| TrackedPath {
                    path: path.into(),
                    state: ProfileState::Unresolved,
                })
                .collect(),
            dirty: DirtyFlag::new(true),
        }
    }

    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    pub fn mark_dirty(&self) {
        self.dirty.mark();
    }

    /// Re-query every tracked path if the dirty flag was set since the last call. Returns the
    /// paths whose interaction profile changed.
    pub fn update(&mut self, runtime: &dyn XrRuntime) -> Result<Vec<ProfileTransition>> {
        if !self.dirty.take() {
            return Ok(vec![]);
        }

        self.requery(runtime)
    }

    /// Re-query every tracked path now, whether or not a change was signaled. A pending mark is
    /// consumed so the next `update` does not query again.
    pub fn force_refresh(&mut self, runtime: &dyn XrRuntime) -> Result<Vec<ProfileTransition>> {
        self.dirty.take();

        self.requery(runtime)
    }

    fn requery(&mut self, runtime: &dyn XrRuntime) -> Result<Vec<ProfileTransition>> {
        let mut transitions = vec![];
        for tracked in &mut self.paths {
            let current = match runtime.current_interaction_profile(&tracked.path)? {
                Some(profile) => ProfileState::Resolved(profile),
                None => ProfileState::None,
            };

            let previous = std::mem::replace(&mut tracked.state, current.clone());
            if previous.profile() != current.profile() {
                transitions.push(ProfileTransition {
                    top_level_path: tracked.path.clone(),
                    previous,
                    current,
                });
            }
        }

        Ok(transitions)
    }

    pub fn state(&self, top_level_path: &str) -> Option<&ProfileState> {
        self.paths
            .iter()
            .find(|tracked| tracked.path == top_level_path)
            .map(|tracked| &tracked.state)
    }

    pub fn display_name(&self, top_level_path: &str) -> &str {
        self.state(top_level_path)
            .map(ProfileState::display_name)
            .unwrap_or(NO_INTERACTION_PROFILE)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|tracked| tracked.path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionContext, ActionType, SuggestedBinding, mock::MockRuntime, priorities};
    use std::thread;
    use xrscene_common::{
        HAND_LEFT_PATH, HAND_RIGHT_PATH, MOTION_CONTROLLER_PROFILE_PATH,
        SIMPLE_CONTROLLER_PROFILE_PATH,
    };

    fn attached_runtime() -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let mut context = ActionContext::new();
        let set = context
            .create_action_set(&mut runtime, "profiles_test", "Test", priorities::DEFAULT)
            .unwrap();
        let select = context
            .create_action(
                &mut runtime,
                set,
                "select",
                "Select",
                ActionType::Boolean,
                &[HAND_LEFT_PATH, HAND_RIGHT_PATH],
            )
            .unwrap();

        for (profile, component) in [
            (SIMPLE_CONTROLLER_PROFILE_PATH, "select/click"),
            (MOTION_CONTROLLER_PROFILE_PATH, "trigger/value"),
        ] {
            context
                .suggest_interaction_profile_bindings(
                    profile,
                    [
                        SuggestedBinding::new(
                            select.handle,
                            format!("/user/hand/left/input/{component}"),
                        ),
                        SuggestedBinding::new(
                            select.handle,
                            format!("/user/hand/right/input/{component}"),
                        ),
                    ],
                )
                .unwrap();
        }
        context.attach(&mut runtime, &[]).unwrap();

        runtime
    }

    #[test]
    fn dirty_flag_is_consumed_once() {
        let flag = DirtyFlag::new(false);
        flag.mark();
        flag.mark();
        flag.mark();

        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn dirty_flag_marks_from_other_threads() {
        let flag = DirtyFlag::new(false);

        let handles = (0..4)
            .map(|_| {
                let flag = flag.clone();
                thread::spawn(move || flag.mark())
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(flag.take());
        assert!(!flag.is_set());
    }

    #[test]
    fn many_notifications_requery_once_per_tick() {
        let mut runtime = attached_runtime();
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH]);

        resolver.update(&runtime).unwrap();
        assert_eq!(runtime.profile_queries(), 1);

        runtime.connect(HAND_LEFT_PATH, SIMPLE_CONTROLLER_PROFILE_PATH);
        for _ in 0..5 {
            resolver.mark_dirty();
        }

        let transitions = resolver.update(&runtime).unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(runtime.profile_queries(), 2);

        // Nothing pending
        assert!(resolver.update(&runtime).unwrap().is_empty());
        assert_eq!(runtime.profile_queries(), 2);
    }

    #[test]
    fn unchanged_profile_has_no_transition() {
        let mut runtime = attached_runtime();
        runtime.connect(HAND_RIGHT_PATH, SIMPLE_CONTROLLER_PROFILE_PATH);
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH, HAND_RIGHT_PATH]);

        let transitions = resolver.update(&runtime).unwrap();
        assert_eq!(
            transitions,
            [ProfileTransition {
                top_level_path: HAND_RIGHT_PATH.into(),
                previous: ProfileState::Unresolved,
                current: ProfileState::Resolved(SIMPLE_CONTROLLER_PROFILE_PATH.into()),
            }]
        );
        assert_eq!(resolver.state(HAND_LEFT_PATH), Some(&ProfileState::None));

        assert!(resolver.force_refresh(&runtime).unwrap().is_empty());
    }

    #[test]
    fn forced_refresh_queries_without_a_change_signal() {
        let mut runtime = attached_runtime();
        runtime.connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH]);
        resolver.update(&runtime).unwrap();

        runtime.disconnect(HAND_LEFT_PATH);
        // No event was observed, so a plain update keeps the cached profile
        assert!(resolver.update(&runtime).unwrap().is_empty());
        assert_eq!(
            resolver.display_name(HAND_LEFT_PATH),
            MOTION_CONTROLLER_PROFILE_PATH
        );

        let transitions = resolver.force_refresh(&runtime).unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].current, ProfileState::None);

        resolver.mark_dirty();
        resolver.force_refresh(&runtime).unwrap();
        let queries = runtime.profile_queries();
        assert!(resolver.update(&runtime).unwrap().is_empty());
        assert_eq!(runtime.profile_queries(), queries);
    }

    #[test]
    fn paths_resolve_independently() {
        let mut runtime = attached_runtime();
        runtime.connect(HAND_LEFT_PATH, MOTION_CONTROLLER_PROFILE_PATH);
        runtime.connect(HAND_RIGHT_PATH, SIMPLE_CONTROLLER_PROFILE_PATH);
        let mut resolver = InteractionProfileResolver::new([HAND_LEFT_PATH, HAND_RIGHT_PATH]);
        resolver.update(&runtime).unwrap();

        runtime.disconnect(HAND_LEFT_PATH);
        resolver.mark_dirty();
        let transitions = resolver.update(&runtime).unwrap();

        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].top_level_path, HAND_LEFT_PATH);
        assert_eq!(transitions[0].current, ProfileState::None);
        assert_eq!(resolver.display_name(HAND_LEFT_PATH), NO_INTERACTION_PROFILE);
        assert_eq!(
            resolver.display_name(HAND_RIGHT_PATH),
            SIMPLE_CONTROLLER_PROFILE_PATH
        );
    }
}
