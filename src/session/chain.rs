//! # 图片缓冲链
//!
//! ## 设计思路
//!
//! 编辑会话只持有三块缓冲：`original`（本次上传，不可变）、`current`（最新结果）、
//! `previous`（被替换前的一份）。所有“释放”都收敛在本类型内部：
//! 被替换即释放、重置即释放、`release()` 全部释放、`Drop` 兜底。
//!
//! 缓冲使用 `Bytes`（引用计数），`original` 与 `current` 可共享同一块内存。

use bytes::Bytes;

#[derive(Debug, Default)]
pub struct ImageChain {
    original: Option<Bytes>,
    current: Option<Bytes>,
    previous: Option<Bytes>,
    released: u64,
}

fn same_buffer(a: &Bytes, b: &Bytes) -> bool {
    a.as_ptr() == b.as_ptr() && a.len() == b.len()
}

impl ImageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 载入新上传的图片，先释放旧链上的全部缓冲。
    pub fn load(&mut self, original: Bytes) {
        self.release();
        self.current = Some(original.clone());
        self.original = Some(original);
    }

    /// 用处理结果替换 `current`，旧 `current` 退为 `previous`。
    pub fn replace_current(&mut self, next: Bytes) {
        let old_current = self.current.replace(next);
        let old_previous = std::mem::replace(&mut self.previous, old_current);
        self.release_one(old_previous);
    }

    /// 回退到上一份结果；没有 `previous` 时返回 `false`。
    pub fn restore_previous(&mut self) -> bool {
        let Some(previous) = self.previous.take() else {
            return false;
        };
        let old_current = self.current.replace(previous);
        self.release_one(old_current);
        true
    }

    /// `current` 回到原图，`previous` 一并释放。
    pub fn reset_to_original(&mut self) {
        let Some(original) = self.original.clone() else {
            return;
        };
        let old_current = self.current.replace(original);
        self.release_one(old_current);
        let old_previous = self.previous.take();
        self.release_one(old_previous);
    }

    /// 释放全部缓冲，返回本次释放的（去重后）缓冲数量。
    pub fn release(&mut self) -> usize {
        let count = self.live_buffers();
        self.original = None;
        self.current = None;
        self.previous = None;
        self.released += count as u64;
        count
    }

    fn release_one(&mut self, buffer: Option<Bytes>) {
        let Some(buffer) = buffer else {
            return;
        };
        let still_referenced = [&self.original, &self.current, &self.previous]
            .into_iter()
            .flatten()
            .any(|held| same_buffer(held, &buffer));
        if !still_referenced {
            self.released += 1;
        }
    }

    pub fn original(&self) -> Option<&Bytes> {
        self.original.as_ref()
    }

    pub fn current(&self) -> Option<&Bytes> {
        self.current.as_ref()
    }

    pub fn previous(&self) -> Option<&Bytes> {
        self.previous.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_none()
    }

    /// `current` 是否已不同于原图。
    pub fn is_modified(&self) -> bool {
        match (&self.original, &self.current) {
            (Some(original), Some(current)) => !same_buffer(original, current),
            _ => false,
        }
    }

    /// 当前持有的不同缓冲数量。
    pub fn live_buffers(&self) -> usize {
        let mut held: Vec<&Bytes> = Vec::with_capacity(3);
        for buffer in [&self.original, &self.current, &self.previous].into_iter().flatten() {
            if !held.iter().any(|existing| same_buffer(existing, buffer)) {
                held.push(buffer);
            }
        }
        held.len()
    }

    /// 累计释放的缓冲数量（诊断用）。
    pub fn released_count(&self) -> u64 {
        self.released
    }
}

impl Drop for ImageChain {
    fn drop(&mut self) {
        let count = self.release();
        if count > 0 {
            log::debug!("🧹 会话结束，释放 {count} 块图片缓冲（累计 {}）", self.released);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(tag: &str) -> Bytes {
        Bytes::from(tag.as_bytes().to_vec())
    }

    #[test]
    fn load_shares_original_and_current() {
        let mut chain = ImageChain::new();
        chain.load(buf("orig"));

        assert_eq!(chain.live_buffers(), 1);
        assert!(!chain.is_modified());
    }

    #[test]
    fn replace_keeps_one_previous_and_releases_older() {
        let mut chain = ImageChain::new();
        chain.load(buf("orig"));

        chain.replace_current(buf("r1"));
        assert!(chain.is_modified());
        assert_eq!(chain.previous().map(|b| b.as_ref()), Some(b"orig".as_ref()));
        assert_eq!(chain.released_count(), 0);

        chain.replace_current(buf("r2"));
        assert_eq!(chain.previous().map(|b| b.as_ref()), Some(b"r1".as_ref()));
        assert_eq!(chain.live_buffers(), 3);

        chain.replace_current(buf("r3"));
        assert_eq!(chain.released_count(), 1);
        assert_eq!(chain.live_buffers(), 3);
    }

    #[test]
    fn reset_returns_to_original_and_drops_previous() {
        let mut chain = ImageChain::new();
        chain.load(buf("orig"));
        chain.replace_current(buf("r1"));
        chain.replace_current(buf("r2"));

        chain.reset_to_original();

        assert_eq!(chain.current().map(|b| b.as_ref()), Some(b"orig".as_ref()));
        assert!(chain.previous().is_none());
        assert!(!chain.is_modified());
        assert_eq!(chain.live_buffers(), 1);
    }

    #[test]
    fn restore_previous_swaps_back() {
        let mut chain = ImageChain::new();
        chain.load(buf("orig"));
        chain.replace_current(buf("r1"));

        assert!(chain.restore_previous());
        assert!(!chain.is_modified());
        assert!(!chain.restore_previous());
    }

    #[test]
    fn drop_releases_every_held_buffer() {
        let original = buf("original");
        let result = buf("result");

        let mut chain = ImageChain::new();
        chain.load(original.clone());
        chain.replace_current(result.clone());
        assert!(!original.is_unique());
        assert!(!result.is_unique());

        drop(chain);

        assert!(original.is_unique());
        assert!(result.is_unique());
    }

    #[test]
    fn release_empties_chain() {
        let mut chain = ImageChain::new();
        chain.load(buf("orig"));
        chain.replace_current(buf("r1"));

        assert_eq!(chain.release(), 2);
        assert!(chain.is_empty());
        assert_eq!(chain.live_buffers(), 0);
    }
}
