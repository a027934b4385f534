use crate::{FillMode, ObjectId, SceneObjects};
use std::collections::BTreeMap;
use xrscene_common::{Pose, glam::Vec3};

#[derive(Clone, Debug, PartialEq)]
pub struct MockObject {
    pub parent: Option<ObjectId>,
    pub pose: Pose,
    pub scale: Vec3,
    pub visible: bool,
    pub fill_mode: FillMode,
    pub text: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectOp {
    Created(ObjectId),
    Removed(ObjectId),
}

/// Scene graph that keeps every object in a map and records creation and removal order.
#[derive(Default)]
pub struct ObjectArena {
    next_id: u64,
    objects: BTreeMap<ObjectId, MockObject>,
    log: Vec<ObjectOp>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: ObjectId) -> Option<&MockObject> {
        self.objects.get(&id)
    }

    pub fn live_objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn children(&self, parent: ObjectId) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|(_, object)| object.parent == Some(parent))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn log(&self) -> &[ObjectOp] {
        &self.log
    }

    pub fn find_by_text(&self, text: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.text.as_deref() == Some(text))
            .map(|(id, _)| *id)
    }

    fn with_object(&mut self, id: ObjectId, f: impl FnOnce(&mut MockObject)) {
        if let Some(object) = self.objects.get_mut(&id) {
            f(object);
        }
    }
}

impl SceneObjects for ObjectArena {
    fn create_object(&mut self, parent: Option<ObjectId>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);

        self.objects.insert(
            id,
            MockObject {
                parent,
                pose: Pose::IDENTITY,
                scale: Vec3::ONE,
                visible: true,
                fill_mode: FillMode::Solid,
                text: None,
            },
        );
        self.log.push(ObjectOp::Created(id));

        id
    }

    fn remove_object(&mut self, object: ObjectId) {
        if self.objects.remove(&object).is_some() {
            self.log.push(ObjectOp::Removed(object));
        }
    }

    fn set_pose(&mut self, object: ObjectId, pose: Pose) {
        self.with_object(object, |o| o.pose = pose);
    }

    fn set_scale(&mut self, object: ObjectId, scale: Vec3) {
        self.with_object(object, |o| o.scale = scale);
    }

    fn set_visible(&mut self, object: ObjectId, visible: bool) {
        self.with_object(object, |o| o.visible = visible);
    }

    fn set_fill_mode(&mut self, object: ObjectId, fill_mode: FillMode) {
        self.with_object(object, |o| o.fill_mode = fill_mode);
    }

    fn set_text(&mut self, object: ObjectId, text: &str) {
        self.with_object(object, |o| o.text = Some(text.into()));
    }
}
