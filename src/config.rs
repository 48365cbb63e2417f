use anyhow::{bail, Context, Result};

pub const DEFAULT_NUM_FRAMES: usize = 1024;

// Environment override for the pool size
pub const NUM_FRAMES_ENV: &str = "GEODE_BUFFER_FRAMES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    pub num_frames: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            num_frames: DEFAULT_NUM_FRAMES,
        }
    }
}

impl BufferConfig {
    pub fn with_num_frames(mut self, num_frames: usize) -> Self {
        self.num_frames = num_frames;
        self
    }

    /// Defaults, overridden by `GEODE_BUFFER_FRAMES` when it is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = BufferConfig::default();

        if let Some(raw) = lookup(NUM_FRAMES_ENV) {
            config.num_frames = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {} value {:?}", NUM_FRAMES_ENV, raw))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_frames == 0 {
            bail!("buffer pool needs at least one frame");
        }
        Ok(())
    }
}
