use std::time::{SystemTime, UNIX_EPOCH};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::InstrumentError;
use crate::types::Sample;
/// Wall-clock time source in seconds since the Unix epoch.
pub trait Clock {
    fn now(&mut self) -> f64;
}
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&mut self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }
}
/// Something that can take one DC voltage measurement on demand.
pub trait InstrumentSource {
    /// Applies the measurement range and resolution. Calling it twice is harmless.
    fn configure(&mut self, max_range: f64, resolution: f64) -> Result<(), InstrumentError>;
    fn sample(&mut self) -> Result<Sample, InstrumentError>;
    fn describe(&self) -> String;
}
impl<S: InstrumentSource + ?Sized> InstrumentSource for Box<S> {
    fn configure(&mut self, max_range: f64, resolution: f64) -> Result<(), InstrumentError> {
        (**self).configure(max_range, resolution)
    }
    fn sample(&mut self) -> Result<Sample, InstrumentError> {
        (**self).sample()
    }
    fn describe(&self) -> String {
        (**self).describe()
    }
}
/// Stand-in meter for running without hardware: clock time plus a random integer in 1..=10.
pub struct SyntheticSource<C: Clock = SystemClock, R: Rng = StdRng> {
    clock: C,
    rng: R,
}
impl SyntheticSource {
    pub fn new() -> Self {
        Self::with_parts(SystemClock, StdRng::from_entropy())
    }
}
impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}
impl<C: Clock, R: Rng> SyntheticSource<C, R> {
    pub fn with_parts(clock: C, rng: R) -> Self {
        Self { clock, rng }
    }
}
impl<C: Clock, R: Rng> InstrumentSource for SyntheticSource<C, R> {
    fn configure(&mut self, _max_range: f64, _resolution: f64) -> Result<(), InstrumentError> {
        Ok(())
    }
    fn sample(&mut self) -> Result<Sample, InstrumentError> {
        let timestamp = self.clock.now();
        let value = self.rng.gen_range(1..=10) as f64;
        Ok(Sample { timestamp, value })
    }
    fn describe(&self) -> String {
        "Dummy".to_owned()
    }
}
/// Clock that replays a fixed list of timestamps, then keeps returning the last one.
#[cfg(test)]
pub struct ScriptedClock {
    times: std::collections::VecDeque<f64>,
    last: f64,
}
#[cfg(test)]
impl ScriptedClock {
    pub fn new(times: impl IntoIterator<Item = f64>) -> Self {
        Self {
            times: times.into_iter().collect(),
            last: 0.0,
        }
    }
}
#[cfg(test)]
impl Clock for ScriptedClock {
    fn now(&mut self) -> f64 {
        if let Some(t) = self.times.pop_front() {
            self.last = t;
        }
        self.last
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn synthetic_values_are_integers_in_range() {
        let mut source = SyntheticSource::with_parts(
            ScriptedClock::new((0..200).map(|i| i as f64)),
            StdRng::seed_from_u64(7),
        );
        source.configure(100.0, 3.0e-5).unwrap();
        for i in 0..200 {
            let sample = source.sample().unwrap();
            assert_eq!(sample.timestamp, i as f64);
            assert!((1.0..=10.0).contains(&sample.value));
            assert_eq!(sample.value.fract(), 0.0);
        }
    }
    #[test]
    fn boxed_source_delegates() {
        let mut boxed: Box<dyn InstrumentSource> = Box::new(SyntheticSource::with_parts(
            ScriptedClock::new([5.0]),
            StdRng::seed_from_u64(1),
        ));
        assert_eq!(boxed.describe(), "Dummy");
        assert_eq!(boxed.sample().unwrap().timestamp, 5.0);
    }
    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now() > 1.0e9);
    }
}
