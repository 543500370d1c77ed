//! CPU-side sprite scene with dirty tracking for GPU mirrors.
//!
//! Instance data lives in one device buffer shared by every frame, so a
//! single flag guards it. Uniform data is copied into one buffer per frame
//! in flight and carries one dirty bit per frame.

use sprig_core::limits::MAX_INSTANCES;
use sprig_core::{BoundedList, DirtyFlag, FrameDirtyFlags, SpriteInstance};

use crate::camera::ProjView;

/// Sink for scene data that changed since the last sync.
pub trait FrameUploader {
    type Error;

    /// Replace the instance buffer contents.
    fn upload_instances(&mut self, instances: &[SpriteInstance]) -> Result<(), Self::Error>;

    /// Write the uniform buffer of `frame`.
    fn upload_uniforms(&mut self, frame: usize, data: &ProjView) -> Result<(), Self::Error>;
}

/// What a [`SpriteScene::sync`] call uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub instances: bool,
    pub uniforms: bool,
}

impl SyncReport {
    pub const fn is_empty(&self) -> bool {
        !self.instances && !self.uniforms
    }
}

/// Sprite instances plus the camera uniform payload.
#[derive(Debug, Clone)]
pub struct SpriteScene {
    instances: BoundedList<SpriteInstance>,
    proj_view: ProjView,
    instances_dirty: DirtyFlag,
    uniforms_dirty: FrameDirtyFlags,
}

impl SpriteScene {
    /// Create an empty scene for `frames_in_flight` frames. Everything
    /// starts dirty.
    pub fn new(frames_in_flight: usize) -> sprig_core::Result<Self> {
        Ok(Self {
            instances: BoundedList::new("sprite instances", MAX_INSTANCES),
            proj_view: ProjView::default(),
            instances_dirty: DirtyFlag::dirty(),
            uniforms_dirty: FrameDirtyFlags::new(frames_in_flight)?,
        })
    }

    /// Add an instance and return its index.
    pub fn push_instance(&mut self, instance: SpriteInstance) -> sprig_core::Result<usize> {
        self.instances.push(instance)?;
        self.instances_dirty.mark();
        Ok(self.instances.len() - 1)
    }

    pub fn instances(&self) -> &[SpriteInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&SpriteInstance> {
        self.instances.get(index)
    }

    /// Mutate an instance in place. The instance buffer is flagged only if
    /// the closure actually changed it.
    pub fn update_instance<F>(&mut self, index: usize, f: F) -> sprig_core::Result<()>
    where
        F: FnOnce(&mut SpriteInstance),
    {
        let len = self.instances.len();
        let slot = self
            .instances
            .as_mut_slice()
            .get_mut(index)
            .ok_or_else(|| sprig_core::Error::OutOfBounds(format!("instance {index} of {len}")))?;
        let before = *slot;
        f(slot);
        if *slot != before {
            self.instances_dirty.mark();
        }
        Ok(())
    }

    pub fn proj_view(&self) -> &ProjView {
        &self.proj_view
    }

    /// Replace the uniform payload, flagging every frame if it changed.
    pub fn set_proj_view(&mut self, proj_view: ProjView) {
        if proj_view != self.proj_view {
            self.proj_view = proj_view;
            self.uniforms_dirty.mark_all();
        }
    }

    pub fn instances_dirty(&self) -> bool {
        self.instances_dirty.is_dirty()
    }

    pub fn uniforms_dirty(&self, frame: usize) -> bool {
        self.uniforms_dirty.is_dirty(frame)
    }

    /// Upload whatever changed for `frame` and clear the matching flags.
    ///
    /// A failed upload leaves its flag set so the next frame retries.
    pub fn sync<U: FrameUploader>(&mut self, frame: usize, uploader: &mut U) -> Result<SyncReport, U::Error> {
        let mut report = SyncReport::default();

        if self.instances_dirty.take() {
            if let Err(e) = uploader.upload_instances(&self.instances) {
                self.instances_dirty.mark();
                return Err(e);
            }
            report.instances = true;
        }

        if self.uniforms_dirty.is_dirty(frame) {
            uploader.upload_uniforms(frame, &self.proj_view)?;
            self.uniforms_dirty.take(frame);
            report.uniforms = true;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[derive(Default)]
    struct RecordingUploader {
        instance_uploads: Vec<Vec<SpriteInstance>>,
        uniform_uploads: Vec<usize>,
        fail: bool,
    }

    impl FrameUploader for RecordingUploader {
        type Error = &'static str;

        fn upload_instances(&mut self, instances: &[SpriteInstance]) -> Result<(), Self::Error> {
            if self.fail {
                return Err("upload failed");
            }
            self.instance_uploads.push(instances.to_vec());
            Ok(())
        }

        fn upload_uniforms(&mut self, frame: usize, _data: &ProjView) -> Result<(), Self::Error> {
            if self.fail {
                return Err("upload failed");
            }
            self.uniform_uploads.push(frame);
            Ok(())
        }
    }

    fn scene_with_two_sprites() -> SpriteScene {
        let mut scene = SpriteScene::new(2).unwrap();
        scene
            .push_instance(SpriteInstance::new(Vec3::ZERO, Vec3::ONE, 0))
            .unwrap();
        scene
            .push_instance(SpriteInstance::new(Vec3::ZERO, Vec3::splat(0.5), 4))
            .unwrap();
        scene
    }

    #[test]
    fn second_sync_without_changes_uploads_nothing() {
        let mut scene = scene_with_two_sprites();
        let mut uploader = RecordingUploader::default();

        let first = scene.sync(0, &mut uploader).unwrap();
        assert!(first.instances && first.uniforms);

        let second = scene.sync(0, &mut uploader).unwrap();
        assert!(second.is_empty());
        assert_eq!(uploader.instance_uploads.len(), 1);
        assert_eq!(uploader.uniform_uploads, vec![0]);
    }

    #[test]
    fn uniform_change_reaches_each_frame_once() {
        let mut scene = scene_with_two_sprites();
        let mut uploader = RecordingUploader::default();
        scene.sync(0, &mut uploader).unwrap();
        scene.sync(1, &mut uploader).unwrap();
        uploader.uniform_uploads.clear();

        let mut proj_view = *scene.proj_view();
        proj_view.user1 = [1.0, 2.0];
        scene.set_proj_view(proj_view);

        for frame in [0, 1, 0, 1] {
            scene.sync(frame, &mut uploader).unwrap();
        }
        assert_eq!(uploader.uniform_uploads, vec![0, 1]);
    }

    #[test]
    fn unchanged_instance_edit_does_not_flag() {
        let mut scene = scene_with_two_sprites();
        let mut uploader = RecordingUploader::default();
        scene.sync(0, &mut uploader).unwrap();

        scene.update_instance(1, |i| i.texture_index = 4).unwrap();
        assert!(!scene.instances_dirty());

        scene.update_instance(1, |i| i.texture_index = 7).unwrap();
        assert!(scene.instances_dirty());
        scene.sync(0, &mut uploader).unwrap();
        assert_eq!(uploader.instance_uploads[1][1].texture_index, 7);
    }

    #[test]
    fn failed_upload_is_retried() {
        let mut scene = scene_with_two_sprites();
        let mut uploader = RecordingUploader {
            fail: true,
            ..RecordingUploader::default()
        };
        assert!(scene.sync(0, &mut uploader).is_err());
        assert!(scene.instances_dirty());
        assert!(scene.uniforms_dirty(0));

        uploader.fail = false;
        let report = scene.sync(0, &mut uploader).unwrap();
        assert!(report.instances && report.uniforms);
    }

    #[test]
    fn unusable_frame_counts_are_errors() {
        assert!(SpriteScene::new(0).is_err());
        assert!(SpriteScene::new(33).is_err());
        assert!(SpriteScene::new(32).is_ok());
    }

    #[test]
    fn instance_capacity_is_enforced() {
        let mut scene = SpriteScene::new(1).unwrap();
        for _ in 0..MAX_INSTANCES {
            scene.push_instance(SpriteInstance::default()).unwrap();
        }
        assert!(scene.push_instance(SpriteInstance::default()).is_err());
        assert!(scene.update_instance(MAX_INSTANCES, |_| {}).is_err());
    }
}
