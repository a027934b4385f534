use once_cell::sync::Lazy;
use std::collections::HashMap;

macro_rules! interaction_profile {
    ($ty:ident, $path:expr) => {
        paste::paste! {
            pub const [<$ty _PROFILE_PATH>]: &str = concat!("/interaction_profiles/", $path);
        }
    };
}

interaction_profile!(SIMPLE_CONTROLLER, "khr/simple_controller");
interaction_profile!(MOTION_CONTROLLER, "microsoft/motion_controller");
interaction_profile!(TOUCH_CONTROLLER, "oculus/touch_controller");
interaction_profile!(VIVE_CONTROLLER, "htc/vive_controller");
interaction_profile!(INDEX_CONTROLLER, "valve/index_controller");
interaction_profile!(VIVE_TRACKER, "htc/vive_tracker_htcx");
interaction_profile!(HAND_INTERACTION, "microsoft/hand_interaction");
interaction_profile!(HAND_INTERACTION_EXT, "ext/hand_interaction_ext");

macro_rules! devices {
    ($(($name:ident, $path:expr),)*) => {
        paste::paste! {
            $(
                pub const [<$name _PATH>]: &str = $path;
            )*

            pub const DEVICE_PATHS: &[&str] = &[$([<$name _PATH>],)*];
        }
    };
}

devices! {
    (HEAD, "/user/head"),
    (HAND_LEFT, "/user/hand/left"),
    (HAND_RIGHT, "/user/hand/right"),
    (GAMEPAD, "/user/gamepad"),
    (VIVE_TRACKER_ROOT, "/user/vive_tracker_htcx"),
}

pub const HAND_PATHS: [&str; 2] = [HAND_LEFT_PATH, HAND_RIGHT_PATH];

const TRACKER_ROLE_PREFIX: &str = "/user/vive_tracker_htcx/role/";

macro_rules! tracker_roles {
    ($(($name:ident, $role:literal),)*) => {
        paste::paste! {
            $(
                pub const [<TRACKER_ $name _PATH>]: &str =
                    concat!("/user/vive_tracker_htcx/role/", $role);
            )*

            pub const TRACKER_ROLES: &[&str] = &[$($role,)*];
            pub const TRACKER_ROLE_PATHS: &[&str] = &[$([<TRACKER_ $name _PATH>],)*];
        }
    };
}

tracker_roles! {
    (HANDHELD_OBJECT, "handheld_object"),
    (LEFT_FOOT, "left_foot"),
    (RIGHT_FOOT, "right_foot"),
    (LEFT_SHOULDER, "left_shoulder"),
    (RIGHT_SHOULDER, "right_shoulder"),
    (LEFT_ELBOW, "left_elbow"),
    (RIGHT_ELBOW, "right_elbow"),
    (LEFT_KNEE, "left_knee"),
    (RIGHT_KNEE, "right_knee"),
    (WAIST, "waist"),
    (CHEST, "chest"),
    (CAMERA, "camera"),
    (KEYBOARD, "keyboard"),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn path(self) -> &'static str {
        match self {
            Hand::Left => HAND_LEFT_PATH,
            Hand::Right => HAND_RIGHT_PATH,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            HAND_LEFT_PATH => Some(Hand::Left),
            HAND_RIGHT_PATH => Some(Hand::Right),
            _ => None,
        }
    }
}

/// Which family of top level user paths an interaction profile can be bound to. Hands and vive
/// tracker roles never share a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopLevelKind {
    Hands,
    ViveTracker,
}

pub struct InteractionProfileInfo {
    pub path: &'static str,
    pub kind: TopLevelKind,
    pub is_hand_interaction: bool,
}

pub static INTERACTION_PROFILE_INFO: Lazy<HashMap<&str, InteractionProfileInfo>> = Lazy::new(|| {
    [
        (SIMPLE_CONTROLLER_PROFILE_PATH, TopLevelKind::Hands, false),
        (MOTION_CONTROLLER_PROFILE_PATH, TopLevelKind::Hands, false),
        (TOUCH_CONTROLLER_PROFILE_PATH, TopLevelKind::Hands, false),
        (VIVE_CONTROLLER_PROFILE_PATH, TopLevelKind::Hands, false),
        (INDEX_CONTROLLER_PROFILE_PATH, TopLevelKind::Hands, false),
        (HAND_INTERACTION_PROFILE_PATH, TopLevelKind::Hands, true),
        (HAND_INTERACTION_EXT_PROFILE_PATH, TopLevelKind::Hands, true),
        (VIVE_TRACKER_PROFILE_PATH, TopLevelKind::ViveTracker, false),
    ]
    .into_iter()
    .map(|(path, kind, is_hand_interaction)| {
        (
            path,
            InteractionProfileInfo {
                path,
                kind,
                is_hand_interaction,
            },
        )
    })
    .collect()
});

pub fn profile_kind(profile_path: &str) -> Option<TopLevelKind> {
    INTERACTION_PROFILE_INFO
        .get(profile_path)
        .map(|info| info.kind)
}

pub fn is_hand_interaction_profile(profile_path: &str) -> bool {
    INTERACTION_PROFILE_INFO
        .get(profile_path)
        .is_some_and(|info| info.is_hand_interaction)
}

pub fn is_hand_path(path: &str) -> bool {
    Hand::from_path(path).is_some()
}

pub fn is_tracker_role_path(path: &str) -> bool {
    path.strip_prefix(TRACKER_ROLE_PREFIX)
        .is_some_and(|role| TRACKER_ROLES.contains(&role))
}

pub fn is_top_level_user_path(path: &str) -> bool {
    DEVICE_PATHS.iter().any(|device| *device == path) || is_tracker_role_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_role_paths() {
        assert_eq!(TRACKER_ROLE_PATHS.len(), 13);
        assert_eq!(
            TRACKER_WAIST_PATH,
            "/user/vive_tracker_htcx/role/waist"
        );
        assert!(is_tracker_role_path(TRACKER_KEYBOARD_PATH));
        assert!(!is_tracker_role_path("/user/vive_tracker_htcx/role/tail"));
        assert!(!is_tracker_role_path(HAND_LEFT_PATH));
    }

    #[test]
    fn profile_kinds() {
        assert_eq!(
            profile_kind(SIMPLE_CONTROLLER_PROFILE_PATH),
            Some(TopLevelKind::Hands)
        );
        assert_eq!(
            profile_kind(VIVE_TRACKER_PROFILE_PATH),
            Some(TopLevelKind::ViveTracker)
        );
        assert_eq!(profile_kind("/interaction_profiles/acme/glove"), None);
        assert!(is_hand_interaction_profile(HAND_INTERACTION_EXT_PROFILE_PATH));
        assert!(!is_hand_interaction_profile(TOUCH_CONTROLLER_PROFILE_PATH));

        // Runtime paths arrive as owned strings
        let queried = String::from("/interaction_profiles/valve/index_controller");
        assert_eq!(profile_kind(&queried), Some(TopLevelKind::Hands));
    }

    #[test]
    fn top_level_paths() {
        assert!(is_top_level_user_path("/user/hand/right"));
        assert!(is_top_level_user_path("/user/head"));
        assert!(is_top_level_user_path(TRACKER_CHEST_PATH));
        assert!(!is_top_level_user_path("/user/hand/right/input/select/click"));
        assert_eq!(Hand::from_path(HAND_LEFT_PATH), Some(Hand::Left));
        assert_eq!(Hand::Right.path(), "/user/hand/right");
    }
}
