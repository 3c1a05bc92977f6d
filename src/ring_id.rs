use std::{cmp::Ordering, fmt::{Debug, Display}, hash::Hash};
use serde::{Serialize, Deserialize};

/// A RingId is a point around the ring. Node identifiers and store keys share
/// this type so a key can be placed between two nodes.
/// Ordering is plain integer ordering; the ring wraps from the largest live
/// identifier back to the smallest.
pub trait RingId: Copy + Ord + Hash + Sync + Send + Serialize + for<'de> Deserialize<'de> + 'static + Debug + Display{

	/// Tests if self is in the range (lower, upper], wrapping past the
	/// maximum when lower >= upper.
	/// The range (x, x] is the whole ring: a lone node covers everything.
	fn is_between(&self, lower: &Self, upper: &Self) -> bool {
		match lower.cmp(upper){
			Ordering::Less => (self > lower) && (self <= upper),
			Ordering::Equal => true,
			Ordering::Greater => (self > lower) || (self <= upper),
		}
	}

}


macro_rules! impl_ring_id {
	($($t:ty),*) => {
		$(impl RingId for $t {})*
	};
}

impl_ring_id!(u16, u32, u64, i32, i64);
