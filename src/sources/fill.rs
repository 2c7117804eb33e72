use crate::collective::RankContext;
use crate::errors::Result;
use crate::sources::SegmentSource;
use async_trait::async_trait;

/// Deterministic demo producer: worker `r` contributes `base_len + r`
/// elements, all equal to `r + 1`.
///
/// Rank-dependent sizes keep the segments non-uniform, so the offset math
/// is exercised even by the default run.
pub struct DeterministicFill {
    base_len: u64,
}

impl DeterministicFill {
    pub fn new(base_len: u64) -> Self {
        Self { base_len }
    }
}

#[async_trait]
impl SegmentSource<i32> for DeterministicFill {
    async fn produce(&self, ctx: &RankContext) -> Result<Vec<i32>> {
        let len = self.base_len + ctx.rank() as u64;
        let value = ctx.rank() as i32 + 1;
        Ok(vec![value; len as usize])
    }
}
