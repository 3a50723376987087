//! frames in flight 的录制上下文
//!
//! 每个 slot 持有一个 `CommandRecorder` 和上一次提交的完成信号，按轮转顺序使用。

use toyframe_gfx::command_recorder::{CommandList, CommandRecorder};
use toyframe_gfx::device::GpuDevice;
use toyframe_gfx::sync::CompletionSignal;

pub struct FrameSlot {
    index: usize,
    recorder: CommandRecorder,
    /// 上一次提交的完成信号；被观察到完成之后清空
    pending: Option<CompletionSignal>,
}

impl FrameSlot {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn pending(&self) -> Option<CompletionSignal> {
        self.pending
    }

    /// # Panics
    /// 上一次提交的完成信号还没有被观察到
    pub fn begin_recording(&mut self, label: impl Into<String>) -> &mut CommandRecorder {
        assert!(
            self.pending.is_none(),
            "frame slot {} reused before its previous submission completed",
            self.index
        );
        self.recorder.reset(label);
        &mut self.recorder
    }

    pub fn finish(&mut self) -> CommandList {
        self.recorder.finish()
    }

    pub fn mark_submitted(&mut self, signal: CompletionSignal) {
        self.pending = Some(signal);
    }
}

pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    current: usize,
}

// new & init
impl FrameSlots {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "at least one frame in flight");
        Self {
            slots: (0..count)
                .map(|index| FrameSlot {
                    index,
                    recorder: CommandRecorder::new(format!("slot-{index}")),
                    pending: None,
                })
                .collect(),
            current: 0,
        }
    }
}

// getters
impl FrameSlots {
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut FrameSlot {
        &mut self.slots[self.current]
    }

    pub fn slot(&self, index: usize) -> &FrameSlot {
        &self.slots[index]
    }
}

// update
impl FrameSlots {
    /// 阻塞等待当前 slot 上一次的提交完成
    pub fn wait_current(&mut self, device: &mut dyn GpuDevice) {
        let slot = &mut self.slots[self.current];
        if let Some(signal) = slot.pending.take() {
            log::trace!("slot {} waits for {:?}", slot.index, signal);
            device.wait_for(signal);
        }
    }

    /// 切换到下一个 slot
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    /// 设备空闲之后，所有提交都已经完成
    pub fn mark_all_complete(&mut self) {
        self.slots.iter_mut().for_each(|slot| slot.pending = None);
    }
}
