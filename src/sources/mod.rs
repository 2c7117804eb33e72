pub mod fill;

use crate::collective::RankContext;
use crate::dataset::Element;
use crate::errors::Result;

/// External boundary supplying each worker's local segment.
///
/// The coordination core treats produced buffers as opaque: the buffer's
/// length is the size the worker reports in the exchange, and its contents
/// are what the worker writes into its region.
#[async_trait::async_trait]
pub trait SegmentSource<T>: Send + Sync
where
    T: Element,
{
    async fn produce(&self, ctx: &RankContext) -> Result<Vec<T>>;
}
