//! 资源状态追踪
//!
//! 记录每个资源最近一次声明的状态。声明与上一次不同的状态时，
//! 生成一条待提交的状态转换；`flush` 把所有待提交的转换合并为一个 barrier batch。

use slotmap::SecondaryMap;

use crate::barrier::{BarrierBatch, BufferBarrierDesc, ImageBarrierDesc};
use crate::command_recorder::CommandRecorder;
use crate::handles::GpuResourceHandle;
use crate::resource_state::{ImageState, ResourceState};
use crate::resource_table::{ResourceKind, ResourceTable};

#[derive(Clone, Debug)]
struct PendingTransition {
    handle: GpuResourceHandle,
    /// 本次 batch 开始之前的状态
    src: ResourceState,
    dst: ResourceState,
    aspect: ash::vk::ImageAspectFlags,
}

#[derive(Default)]
pub struct BarrierTracker {
    /// 每个资源最近一次声明的状态；没有记录时使用资源表中的初始状态
    states: SecondaryMap<GpuResourceHandle, ResourceState>,
    pending: Vec<PendingTransition>,
}

// new & init
impl BarrierTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

// getters
impl BarrierTracker {
    /// 资源最近一次声明的状态
    pub fn current_state(&self, table: &ResourceTable, handle: GpuResourceHandle) -> ResourceState {
        match self.states.get(handle) {
            Some(state) => *state,
            None => table.resource(handle).initial_state,
        }
    }

    pub fn current_image_state(&self, table: &ResourceTable, handle: GpuResourceHandle) -> ImageState {
        match self.current_state(table, handle) {
            ResourceState::Image(state) => state,
            ResourceState::Buffer(_) => panic!("resource {} is a buffer, not an image", table.resource(handle).name),
        }
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

// 状态声明
impl BarrierTracker {
    /// 声明资源接下来的使用方式
    ///
    /// 与最近一次声明的状态相同时什么都不做；否则记录一次状态转换，等待 `flush`。
    /// 同一个资源在一次 flush 之前多次声明时，合并为一条转换。
    ///
    /// # Panics
    /// 句柄不在资源表中，或者状态类型（image / buffer）与资源不符
    pub fn declare_usage(&mut self, table: &ResourceTable, handle: GpuResourceHandle, state: impl Into<ResourceState>) {
        let state = state.into();
        let resource = table
            .get(handle)
            .unwrap_or_else(|| panic!("declare usage on unknown resource handle: {handle:?}"));

        let aspect = match (&resource.kind, &state) {
            (ResourceKind::Image(desc), ResourceState::Image(_)) => desc.aspect,
            (ResourceKind::Buffer(_), ResourceState::Buffer(_)) => ash::vk::ImageAspectFlags::empty(),
            _ => panic!("declared state {state:?} does not match the kind of resource {}", resource.name),
        };

        let current = self.states.get(handle).copied().unwrap_or(resource.initial_state);
        if current == state {
            return;
        }

        match self.pending.iter().position(|transition| transition.handle == handle) {
            Some(index) => {
                if self.pending[index].src == state {
                    self.pending.remove(index);
                } else {
                    self.pending[index].dst = state;
                }
            }
            None => self.pending.push(PendingTransition {
                handle,
                src: current,
                dst: state,
                aspect,
            }),
        }
        self.states.insert(handle, state);
    }

    /// 把所有待提交的转换作为一个 barrier batch 录制；没有待提交的转换时不录制任何命令
    pub fn flush(&mut self, recorder: &mut CommandRecorder) {
        if self.pending.is_empty() {
            return;
        }

        let mut batch = BarrierBatch::new();
        for transition in self.pending.drain(..) {
            match (transition.src, transition.dst) {
                (ResourceState::Image(src), ResourceState::Image(dst)) => {
                    batch.add_image_barrier(
                        ImageBarrierDesc::new(transition.handle, src, dst).with_aspect(transition.aspect),
                    );
                }
                (ResourceState::Buffer(src), ResourceState::Buffer(dst)) => {
                    batch.add_buffer_barrier(BufferBarrierDesc::new(transition.handle, src, dst));
                }
                _ => unreachable!("transition kind is checked in declare_usage"),
            }
        }
        log::trace!("{}: flush {} barriers", recorder.label(), batch.len());
        recorder.pipeline_barrier(batch);
    }

    /// 直接设定资源的状态，不生成 barrier
    ///
    /// 用于手动录制了 barrier 的场景（mip 链生成），或者资源被替换（新 acquire 的 swapchain image）
    pub fn assume_state(&mut self, handle: GpuResourceHandle, state: impl Into<ResourceState>) {
        assert!(
            self.pending.iter().all(|transition| transition.handle != handle),
            "assume state while a transition of the same resource is pending"
        );
        self.states.insert(handle, state.into());
    }

    /// 资源被销毁后移除记录
    pub fn forget(&mut self, handle: GpuResourceHandle) {
        self.pending.retain(|transition| transition.handle != handle);
        self.states.remove(handle);
    }
}
