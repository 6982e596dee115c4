//! Metrics definitions for the flag store.

#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub const CACHE_GET_HIT: MetricDef = MetricDef {
    name: "cache.get.hit",
    description: "Number of cache reads that found a value",
};

pub const CACHE_GET_MISS: MetricDef = MetricDef {
    name: "cache.get.miss",
    description: "Number of cache reads for keys that were never set",
};

pub const CACHE_ERRORS: MetricDef = MetricDef {
    name: "cache.errors",
    description: "Number of cache requests that failed",
};

pub const SEED_WRITES: MetricDef = MetricDef {
    name: "seed.writes",
    description: "Number of flags written during seeding",
};

// All counters for now. Keep this table in sync when adding definitions.
pub const ALL_METRICS: &[MetricDef] = &[CACHE_GET_HIT, CACHE_GET_MISS, CACHE_ERRORS, SEED_WRITES];
