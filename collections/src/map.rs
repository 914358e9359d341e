use std::collections::HashMap;

use ahash::RandomState;

/// A `HashMap` hashed with `ahash` rather than `SipHash`, used for the hot
/// routing tables (server child lookup by remote endpoint, port tables,
/// address-to-network maps) — the same choice of hasher the teacher makes
/// for its own keyed collections (`collections::map::Map`).
pub type FastMap<K, V> = HashMap<K, V, RandomState>;

pub fn new<K, V>() -> FastMap<K, V> {
	FastMap::default()
}
