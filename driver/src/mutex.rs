use {core::ops::DerefMut, embassy_sync::blocking_mutex::raw::RawMutex};

#[expect(
    async_fn_in_trait,
    reason = "futures are polled in place by an executor on the calling thread"
)]
pub trait Mutex {
    type Item;
    fn new(item: Self::Item) -> Self;
    async fn lock(&self) -> impl DerefMut<Target = Self::Item>;
    /// `None` if someone else holds the lock right now.
    fn try_lock(&self) -> Option<impl DerefMut<Target = Self::Item>>;
}

impl<R: RawMutex, Item> Mutex for embassy_sync::mutex::Mutex<R, Item> {
    type Item = Item;

    #[inline(always)]
    fn new(item: Item) -> Self {
        embassy_sync::mutex::Mutex::new(item)
    }

    #[inline(always)]
    async fn lock(&self) -> impl DerefMut<Target = Self::Item> {
        embassy_sync::mutex::Mutex::lock(self).await
    }

    #[inline(always)]
    fn try_lock(&self) -> Option<impl DerefMut<Target = Self::Item>> {
        embassy_sync::mutex::Mutex::try_lock(self).ok()
    }
}
