/// Use this to define a unique type which will be used as a key to retrieve
/// an independent rng instance from a [`RngStore`](crate::random::RngStore).
///
/// ```
/// use episim::define_rng;
/// use episim::random::RngStore;
///
/// define_rng!(CoinRng);
///
/// let mut rngs = RngStore::new(42);
/// let heads = rngs.sample_uniform(CoinRng) < 0.5;
/// # let _ = heads;
/// ```
#[macro_export]
macro_rules! define_rng {
    ($vis:vis $random_id:ident) => {
        #[derive(Copy, Clone)]
        $vis struct $random_id;

        impl $crate::random::RngId for $random_id {
            type RngType = $crate::rand::rngs::SmallRng;

            fn get_name() -> &'static str {
                stringify!($random_id)
            }
        }
    };
}
pub use define_rng;
