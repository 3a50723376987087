pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    slot_count: usize,
}
// new & init
impl FrameCounter {
    pub fn new(slot_count: usize) -> Self {
        Self { frame_id: 0, slot_count }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// A, B, C ...
    #[inline]
    pub fn frame_label(&self) -> char {
        let slot = (self.frame_id % self.slot_count as u64) as u8;
        (b'A' + slot % 26) as char
    }

    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}
