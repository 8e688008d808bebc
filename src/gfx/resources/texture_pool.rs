//! Bounded cache of uploaded GPU textures.
//!
//! Entries are keyed by [`Texture::source_key`] and evicted in insertion order
//! (FIFO), not by access recency. An evicted entry's GPU texture is deleted
//! before the entry leaves the pool.

use std::collections::{HashMap, VecDeque};

use crate::gfx::rendering::context::{GraphicsContext, RenderError, TextureHandle};

use super::texture::Texture;

pub const DEFAULT_POOL_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub uploads: usize,
    pub evictions: usize,
}

#[derive(Debug)]
pub struct TexturePool {
    capacity: usize,
    handles: HashMap<String, TextureHandle>,
    order: VecDeque<String>,
    stats: PoolStats,
}

impl Default for TexturePool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl TexturePool {
    /// Creates a pool holding at most `capacity` textures (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            handles: HashMap::new(),
            order: VecDeque::new(),
            stats: PoolStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Returns the GPU texture for `texture`, uploading it on first use.
    ///
    /// A pooled texture is returned without re-upload unless its data changed
    /// since the last upload (for example an async load that just resolved),
    /// in which case the old GPU texture is replaced in place.
    pub fn acquire(
        &mut self,
        texture: &Texture,
        ctx: &mut dyn GraphicsContext,
    ) -> Result<TextureHandle, RenderError> {
        texture.poll_load();
        let key = texture.source_key();

        if let Some(&handle) = self.handles.get(&key) {
            if !texture.needs_upload() {
                return Ok(handle);
            }
            let fresh = ctx.create_texture(&texture.upload_pixels())?;
            ctx.delete_texture(handle);
            self.handles.insert(key.clone(), fresh);
            self.stats.uploads += 1;
            texture.mark_uploaded();
            log::debug!("Re-uploaded texture '{}'", key);
            return Ok(fresh);
        }

        if self.handles.len() >= self.capacity {
            self.evict_oldest(ctx);
        }

        let handle = ctx.create_texture(&texture.upload_pixels())?;
        self.handles.insert(key.clone(), handle);
        self.order.push_back(key.clone());
        self.stats.uploads += 1;
        texture.mark_uploaded();
        log::debug!("Pooled texture '{}' ({}/{})", key, self.len(), self.capacity);
        Ok(handle)
    }

    fn evict_oldest(&mut self, ctx: &mut dyn GraphicsContext) {
        let Some(oldest) = self.order.front().cloned() else {
            return;
        };
        if let Some(&handle) = self.handles.get(&oldest) {
            ctx.delete_texture(handle);
        }
        self.handles.remove(&oldest);
        self.order.pop_front();
        self.stats.evictions += 1;
        log::debug!("Evicted texture '{}' from pool", oldest);
    }

    /// Drops one entry, releasing its GPU texture.
    pub fn remove(&mut self, key: &str, ctx: &mut dyn GraphicsContext) -> bool {
        let Some(handle) = self.handles.remove(key) else {
            return false;
        };
        ctx.delete_texture(handle);
        self.order.retain(|k| k != key);
        true
    }

    /// Releases every pooled GPU texture.
    pub fn clear(&mut self, ctx: &mut dyn GraphicsContext) {
        for key in self.order.drain(..) {
            if let Some(handle) = self.handles.remove(&key) {
                ctx.delete_texture(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::context::mock::{Call, MockContext};

    #[test]
    fn test_reacquire_does_not_reupload() {
        let mut ctx = MockContext::new();
        let mut pool = TexturePool::new(4);
        let texture = Texture::from_pixels("brick", vec![255; 4], 1, 1);

        let first = pool.acquire(&texture, &mut ctx).unwrap();
        let second = pool.acquire(&texture, &mut ctx).unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.stats().uploads, 1);
        assert_eq!(ctx.count(|c| matches!(c, Call::CreateTexture(..))), 1);
    }

    #[test]
    fn test_overflow_evicts_first_inserted_before_removal() {
        let mut ctx = MockContext::new();
        let mut pool = TexturePool::new(DEFAULT_POOL_CAPACITY);
        let textures: Vec<Texture> = (0..=DEFAULT_POOL_CAPACITY)
            .map(|i| Texture::new(format!("tex{}", i)))
            .collect();

        let mut handles = Vec::new();
        for texture in &textures {
            handles.push(pool.acquire(texture, &mut ctx).unwrap());
        }

        assert_eq!(pool.stats().evictions, 1);
        assert_eq!(pool.len(), DEFAULT_POOL_CAPACITY);
        assert!(!pool.contains("tex0"));
        assert!(pool.contains("tex1"));
        assert!(pool.contains(&format!("tex{}", DEFAULT_POOL_CAPACITY)));
        assert_eq!(ctx.live_textures, DEFAULT_POOL_CAPACITY);

        // The first texture's GPU resource is deleted before the new upload
        let delete_at = ctx
            .calls
            .iter()
            .position(|c| *c == Call::DeleteTexture(handles[0]))
            .unwrap();
        let last_create = ctx
            .calls
            .iter()
            .rposition(|c| matches!(c, Call::CreateTexture(..)))
            .unwrap();
        assert!(delete_at < last_create);
    }

    #[test]
    fn test_reacquiring_pooled_key_at_capacity_does_not_evict() {
        let mut ctx = MockContext::new();
        let mut pool = TexturePool::new(2);
        let a = Texture::new("a");
        let b = Texture::new("b");
        pool.acquire(&a, &mut ctx).unwrap();
        pool.acquire(&b, &mut ctx).unwrap();
        pool.acquire(&a, &mut ctx).unwrap();

        assert_eq!(pool.stats().evictions, 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_resolved_load_replaces_handle() {
        let mut ctx = MockContext::new();
        let mut pool = TexturePool::new(4);
        let (texture, sender) = Texture::loading("async");

        let placeholder = pool.acquire(&texture, &mut ctx).unwrap();
        sender
            .send(Ok(crate::gfx::resources::texture::PixelData {
                data: vec![1, 2, 3, 4],
                width: 1,
                height: 1,
            }))
            .unwrap();
        let loaded = pool.acquire(&texture, &mut ctx).unwrap();

        assert_ne!(placeholder, loaded);
        assert!(ctx.calls.contains(&Call::DeleteTexture(placeholder)));
        assert_eq!(ctx.live_textures, 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut ctx = MockContext::new();
        let mut pool = TexturePool::new(4);
        for key in ["x", "y", "z"] {
            pool.acquire(&Texture::new(key), &mut ctx).unwrap();
        }
        assert!(pool.remove("y", &mut ctx));
        assert!(!pool.remove("y", &mut ctx));
        pool.clear(&mut ctx);

        assert!(pool.is_empty());
        assert_eq!(ctx.live_textures, 0);
    }
}
