use crc32fast::Hasher;

/// Derive a short, stable seed from arbitrary content using CRC32
pub fn content_seed(content: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Sequential block ID generator scoped to one document
///
/// IDs look like `<seed>-<n>`. The generator never hands out an ID the
/// caller reports as taken, so explicit IDs already present in a document
/// are left alone.
#[derive(Clone, Debug)]
pub struct BlockIdGenerator {
    seed: String,
    count: u32,
}

impl BlockIdGenerator {
    pub fn new(content: &str) -> Self {
        Self {
            seed: content_seed(content),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate the next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Generate the next sequential ID not rejected by `is_taken`
    pub fn next_unused(&mut self, is_taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.new_id();
            if !is_taken(&id) {
                return id;
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
