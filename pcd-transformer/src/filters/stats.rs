//! Streaming per-dimension statistics.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use pcd_core::pointcloud::buffer::PointBuffer;
use pcd_core::pointcloud::dimension::Dimension;
use pcd_core::pointcloud::metadata::{BoundingVolume, Metadata};
use pcd_core::pointcloud::schema::Schema;
use pcd_core::stage::{
    BufferProcessor, FilterRandomIterator, FilterSequentialIterator, IteratorKind,
    RandomIterator, SequentialIterator, Stage,
};
use pcd_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsOptions {
    pub num_bins: usize,
    pub sample_size: usize,
    pub cache_size: usize,
    pub seed: u64,
    /// Dimension names to summarize. Empty means every dimension.
    pub dimensions: Vec<String>,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            num_bins: 20,
            sample_size: 1000,
            cache_size: 1000,
            seed: 0,
            dimensions: Vec::new(),
        }
    }
}

impl StatsOptions {
    pub fn validate(&self) -> Result<()> {
        if self.num_bins == 0 {
            return Err(Error::Config("num_bins must be at least 1".to_string()));
        }
        if self.cache_size == 0 {
            return Err(Error::Config("cache_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub center: f64,
    pub density: f64,
}

#[derive(Debug, Clone)]
struct Bins {
    min: f64,
    max: f64,
    width: f64,
    // underflow, num_bins regular bins, overflow
    counts: Vec<u64>,
    total: u64,
}

impl Bins {
    fn spanning(values: &[f64], num_bins: usize) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut bins = Self {
            min,
            max,
            width: (max - min) / num_bins as f64,
            counts: vec![0; num_bins + 2],
            total: 0,
        };
        for value in values {
            bins.insert(*value);
        }
        bins
    }

    fn insert(&mut self, value: f64) {
        let num_bins = self.counts.len() - 2;
        let slot = if value < self.min {
            0
        } else if self.width == 0.0 {
            if value == self.min {
                1
            } else {
                num_bins + 1
            }
        } else {
            let offset = ((value - self.min) / self.width) as usize;
            if offset < num_bins {
                1 + offset
            } else if value <= self.max {
                // the cached maximum closes the last bin
                num_bins
            } else {
                num_bins + 1
            }
        };
        self.counts[slot] += 1;
        self.total += 1;
    }

    fn density(&self) -> Vec<HistogramBin> {
        self.counts
            .iter()
            .enumerate()
            .map(|(slot, count)| HistogramBin {
                center: self.min + (slot as f64 - 0.5) * self.width,
                density: *count as f64 / self.total as f64,
            })
            .collect()
    }
}

/// Fixed-bin density estimate. The first `cache_size` values are kept and
/// decide the bin range; after that the bins are fixed and values outside
/// them land in the under/overflow bins.
#[derive(Debug, Clone)]
pub struct Histogram {
    num_bins: usize,
    cache_size: usize,
    cache: Vec<f64>,
    bins: Option<Bins>,
}

impl Histogram {
    pub fn new(num_bins: usize, cache_size: usize) -> Self {
        Self {
            num_bins,
            cache_size,
            cache: Vec::new(),
            bins: None,
        }
    }

    pub fn insert(&mut self, value: f64) {
        match &mut self.bins {
            Some(bins) => bins.insert(value),
            None => {
                self.cache.push(value);
                if self.cache.len() >= self.cache_size {
                    self.bins = Some(Bins::spanning(&self.cache, self.num_bins));
                    self.cache = Vec::new();
                }
            }
        }
    }

    /// Bin centers with the share of values in each bin, under and
    /// overflow bins included. Before the cache fills, the bins span the
    /// values cached so far.
    pub fn density(&self) -> Vec<HistogramBin> {
        match &self.bins {
            Some(bins) => bins.density(),
            None if self.cache.is_empty() => Vec::new(),
            None => Bins::spanning(&self.cache, self.num_bins).density(),
        }
    }

    pub fn reset(&mut self) {
        self.cache.clear();
        self.bins = None;
    }
}

/// Running summary of one dimension.
#[derive(Debug, Clone)]
pub struct Summary {
    count: u64,
    minimum: f64,
    maximum: f64,
    mean: f64,
    histogram: Histogram,
    sample: Vec<f64>,
    sample_size: usize,
    seen: u64,
    rng: StdRng,
}

impl Summary {
    pub fn new(options: &StatsOptions) -> Self {
        Self {
            count: 0,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
            mean: 0.0,
            histogram: Histogram::new(options.num_bins, options.cache_size),
            sample: Vec::with_capacity(options.sample_size.min(4096)),
            sample_size: options.sample_size,
            seen: 0,
            rng: StdRng::seed_from_u64(options.seed),
        }
    }

    pub fn insert(&mut self, value: f64) {
        self.count += 1;
        self.minimum = self.minimum.min(value);
        self.maximum = self.maximum.max(value);
        self.mean += (value - self.mean) / self.count as f64;
        self.histogram.insert(value);

        // reservoir sampling, algorithm R
        self.seen += 1;
        if self.sample.len() < self.sample_size {
            self.sample.push(value);
        } else if self.sample_size > 0 {
            let slot = self.rng.random_range(0..self.seen);
            if slot < self.sample_size as u64 {
                self.sample[slot as usize] = value;
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn average(&self) -> f64 {
        self.mean
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    /// Clears count, extremes, mean and histogram. The sample collected so
    /// far is kept.
    pub fn reset(&mut self) {
        self.count = 0;
        self.minimum = f64::INFINITY;
        self.maximum = f64::NEG_INFINITY;
        self.mean = 0.0;
        self.histogram.reset();
    }
}

impl Serialize for Summary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Summary", 6)?;
        state.serialize_field("count", &self.count)?;
        state.serialize_field("minimum", &self.minimum)?;
        state.serialize_field("maximum", &self.maximum)?;
        state.serialize_field("average", &self.mean)?;
        state.serialize_field("histogram", &self.histogram.density())?;
        state.serialize_field("sample", &self.sample)?;
        state.end()
    }
}

/// Summaries keyed by dimension identity. Schema changes between buffers
/// keep feeding the same summary for the same dimension.
#[derive(Debug, Clone)]
pub struct StatsResults {
    options: StatsOptions,
    summaries: Vec<(Dimension, Summary)>,
}

impl StatsResults {
    pub fn new(options: StatsOptions) -> Self {
        Self {
            options,
            summaries: Vec::new(),
        }
    }

    /// Looks a summary up by dimension name or uuid.
    pub fn summary(&self, key: &str) -> Option<&Summary> {
        self.summaries
            .iter()
            .find(|(d, _)| d.name() == key || d.id() == key)
            .map(|(_, s)| s)
    }

    pub fn reset(&mut self) {
        for (_, summary) in &mut self.summaries {
            summary.reset();
        }
    }

    fn summary_index(&mut self, dimension: &Dimension) -> usize {
        if let Some(i) = self
            .summaries
            .iter()
            .position(|(d, _)| d.id() == dimension.id())
        {
            return i;
        }
        self.summaries
            .push((dimension.clone(), Summary::new(&self.options)));
        self.summaries.len() - 1
    }
}

impl Serialize for StatsResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.summaries.iter().map(|(d, s)| (d.name(), s)))
    }
}

fn lock(results: &Mutex<StatsResults>) -> MutexGuard<'_, StatsResults> {
    results.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Feeds every point of every buffer into one [`Summary`] per dimension.
/// The results may be shared with a [`Stats`] stage so they stay reachable
/// when the iterator is buried inside a longer chain.
#[derive(Debug)]
pub struct StatsCollector {
    results: Arc<Mutex<StatsResults>>,
    // (buffer position, summary index)
    bound: Vec<(usize, usize)>,
    dimensions: Vec<String>,
}

impl StatsCollector {
    pub fn new(options: StatsOptions) -> Self {
        Self::sharing(Arc::new(Mutex::new(StatsResults::new(options))))
    }

    fn sharing(results: Arc<Mutex<StatsResults>>) -> Self {
        let dimensions = lock(&results).options.dimensions.clone();
        Self {
            results,
            bound: Vec::new(),
            dimensions,
        }
    }

    /// A copy of the summary for a dimension name or uuid as it stands now.
    pub fn summary(&self, key: &str) -> Option<Summary> {
        lock(&self.results).summary(key).cloned()
    }

    pub fn results(&self) -> StatsResults {
        lock(&self.results).clone()
    }

    pub fn reset(&self) {
        lock(&self.results).reset();
    }
}

impl Serialize for StatsCollector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        lock(&self.results).serialize(serializer)
    }
}

impl BufferProcessor for StatsCollector {
    fn bind(&mut self, schema: &Schema) -> Result<()> {
        let mut results = lock(&self.results);
        let mut bound = Vec::new();
        if self.dimensions.is_empty() {
            for layout in schema.dimensions() {
                bound.push((layout.position, results.summary_index(&layout.dimension)));
            }
        } else {
            for name in &self.dimensions {
                let layout = schema
                    .get(name)
                    .ok_or_else(|| Error::MissingDimension(name.clone()))?;
                bound.push((layout.position, results.summary_index(&layout.dimension)));
            }
        }
        log::debug!("collecting statistics for {} dimensions", bound.len());
        self.bound = bound;
        Ok(())
    }

    fn process(&mut self, buffer: &mut PointBuffer) -> Result<()> {
        let mut results = lock(&self.results);
        for index in 0..buffer.count() {
            for &(position, summary) in &self.bound {
                let value = buffer.get_scaled(position, index);
                results.summaries[summary].1.insert(value);
            }
        }
        Ok(())
    }
}

pub type StatsIterator<'a> = FilterSequentialIterator<'a, StatsCollector>;
pub type StatsRandomIterator<'a> = FilterRandomIterator<'a, StatsCollector>;

/// Pass-through stage that summarizes the points flowing through it.
/// Every iterator it creates feeds the same summaries, which stay
/// queryable through [`Stats::summary`] however the stage is chained.
pub struct Stats<'a> {
    upstream: &'a dyn Stage,
    options: StatsOptions,
    results: Arc<Mutex<StatsResults>>,
}

impl<'a> Stats<'a> {
    pub const NAME: &'static str = "filters.stats";

    pub fn new(upstream: &'a dyn Stage, options: StatsOptions) -> Result<Self> {
        options.validate()?;
        let schema = upstream.schema();
        for name in &options.dimensions {
            if schema.index_of(name).is_none() {
                return Err(Error::UnknownDimension(name.clone()));
            }
        }
        let results = Arc::new(Mutex::new(StatsResults::new(options.clone())));
        Ok(Self {
            upstream,
            options,
            results,
        })
    }

    pub fn options(&self) -> &StatsOptions {
        &self.options
    }

    /// A copy of the summary for a dimension name or uuid, reflecting every
    /// point pulled through this stage so far.
    pub fn summary(&self, key: &str) -> Option<Summary> {
        lock(&self.results).summary(key).cloned()
    }

    pub fn results(&self) -> StatsResults {
        lock(&self.results).clone()
    }

    /// Clears count, extremes, mean and histogram of every summary. Samples
    /// are kept.
    pub fn reset(&self) {
        lock(&self.results).reset();
    }

    pub fn stats_iterator(&self) -> Result<StatsIterator<'a>> {
        let upstream = self.upstream.sequential_iterator()?;
        Ok(FilterSequentialIterator::new(
            upstream,
            StatsCollector::sharing(self.results.clone()),
        ))
    }

    pub fn stats_random_iterator(&self) -> Result<StatsRandomIterator<'a>> {
        let upstream = self.upstream.random_iterator()?;
        Ok(FilterRandomIterator::new(
            upstream,
            StatsCollector::sharing(self.results.clone()),
        ))
    }
}

impl Stage for Stats<'_> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn num_points(&self) -> u64 {
        self.upstream.num_points()
    }

    fn schema(&self) -> Arc<Schema> {
        self.upstream.schema()
    }

    fn bounds(&self) -> Option<BoundingVolume> {
        self.upstream.bounds()
    }

    fn metadata(&self) -> Metadata {
        self.upstream.metadata()
    }

    fn supports_iterator(&self, kind: IteratorKind) -> bool {
        matches!(kind, IteratorKind::Sequential | IteratorKind::Random)
            && self.upstream.supports_iterator(kind)
    }

    fn sequential_iterator(&self) -> Result<Box<dyn SequentialIterator + '_>> {
        Ok(Box::new(self.stats_iterator()?))
    }

    fn random_iterator(&self) -> Result<Box<dyn RandomIterator + '_>> {
        Ok(Box::new(self.stats_random_iterator()?))
    }
}
