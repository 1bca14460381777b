//! 关键帧曲线
//!
//! 采样是阶梯式的：返回第一个时间严格大于 `time` 的关键帧，不做帧间插值。

use crate::{Result, VrmError};

/// 计算采样下标
///
/// - 非循环且超过最后时间：最后一帧
/// - 循环：正时间对最后时间取模；负时间不回绕
fn sample_index(times: &[f32], time: f32, repeat: bool) -> usize {
    let last_index = times.len().saturating_sub(1);
    let last = times.get(last_index).copied().unwrap_or(0.0);

    let mut time = time;
    if repeat {
        if time > 0.0 && last > 0.0 {
            time = time.rem_euclid(last);
        }
    } else if time > last {
        return last_index;
    }

    times
        .iter()
        .position(|&t| t > time)
        .unwrap_or(last_index)
}

fn validate_times(name: &str, times: &[f32]) -> Result<()> {
    if times.is_empty() {
        return Err(VrmError::Animation(format!("{}: empty curve", name)));
    }
    if times.windows(2).any(|w| w[1] < w[0]) {
        return Err(VrmError::Animation(format!("{}: times not ascending", name)));
    }
    Ok(())
}

/// 单值曲线（平移/旋转/缩放）
#[derive(Clone, Debug)]
pub struct Curve<T> {
    pub name: String,
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Copy> Curve<T> {
    /// 创建曲线；时间为空、非升序或与值数量不一致时返回错误
    pub fn new(name: impl Into<String>, times: Vec<f32>, values: Vec<T>) -> Result<Self> {
        let name = name.into();
        validate_times(&name, &times)?;
        if times.len() != values.len() {
            return Err(VrmError::Animation(format!(
                "{}: {} times but {} values",
                name,
                times.len(),
                values.len()
            )));
        }
        Ok(Self { name, times, values })
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn max_seconds(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn get_value(&self, time: f32, repeat: bool) -> T {
        self.values[sample_index(&self.times, time, repeat)]
    }
}

/// Morph 权重曲线：每个关键帧一组 `weights_count` 个权重
#[derive(Clone, Debug)]
pub struct WeightsCurve {
    pub name: String,
    times: Vec<f32>,
    values: Vec<f32>,
    weights_count: usize,
}

impl WeightsCurve {
    /// 创建曲线；`values.len()` 必须是 `times.len()` 的整数倍
    pub fn new(name: impl Into<String>, times: Vec<f32>, values: Vec<f32>) -> Result<Self> {
        let name = name.into();
        validate_times(&name, &times)?;
        if values.is_empty() || values.len() % times.len() != 0 {
            return Err(VrmError::Animation(format!(
                "{}: {} weights not divisible by {} times",
                name,
                values.len(),
                times.len()
            )));
        }
        let weights_count = values.len() / times.len();
        Ok(Self {
            name,
            times,
            values,
            weights_count,
        })
    }

    pub fn weights_count(&self) -> usize {
        self.weights_count
    }

    pub fn max_seconds(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    fn span(&self, index: usize) -> &[f32] {
        let begin = index * self.weights_count;
        &self.values[begin..begin + self.weights_count]
    }

    pub fn get_value(&self, time: f32, repeat: bool) -> &[f32] {
        self.span(sample_index(&self.times, time, repeat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn steps() -> Curve<f32> {
        Curve::new("steps", vec![0.0, 1.0, 2.0], vec![10.0, 20.0, 30.0]).unwrap()
    }

    #[test]
    fn returns_first_exceeding_sample() {
        let c = steps();
        assert_eq!(c.get_value(0.0, false), 20.0);
        assert_eq!(c.get_value(0.5, false), 20.0);
        assert_eq!(c.get_value(1.0, false), 30.0);
        assert_eq!(c.get_value(2.0, false), 30.0);
        assert_eq!(c.get_value(-1.0, false), 10.0);
    }

    #[test]
    fn clamps_after_end_without_repeat() {
        assert_eq!(steps().get_value(100.0, false), 30.0);
    }

    #[test]
    fn repeat_wraps_positive_time_only() {
        let c = steps();
        assert_eq!(c.get_value(2.5, true), c.get_value(0.5, true));
        assert_eq!(c.get_value(-3.0, true), 10.0);
        assert_eq!(c.get_value(-0.5, true), 10.0);
    }

    #[test]
    fn single_key_curve() {
        let c = Curve::new("one", vec![0.0], vec![7.0]).unwrap();
        assert_eq!(c.get_value(5.0, true), 7.0);
        assert_eq!(c.get_value(5.0, false), 7.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Curve::<f32>::new("empty", vec![], vec![]).is_err());
        assert!(Curve::new("len", vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Curve::new("order", vec![1.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(WeightsCurve::new("w", vec![0.0, 1.0], vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn weights_span() {
        let c = WeightsCurve::new("w", vec![0.0, 1.0], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(c.weights_count(), 2);
        assert_eq!(c.get_value(0.5, false), &[0.3, 0.4]);
        assert_eq!(c.get_value(9.0, false), &[0.3, 0.4]);
    }

    fn build(steps: &[u8]) -> Curve<f32> {
        let mut t = 0.0;
        let mut times = Vec::with_capacity(steps.len());
        for s in steps {
            t += (*s as f32 + 1.0) * 0.01;
            times.push(t);
        }
        let values = (0..times.len()).map(|i| i as f32).collect();
        Curve::new("qc", times, values).unwrap()
    }

    #[quickcheck]
    fn sampling_is_idempotent(steps: Vec<u8>, time: u16) -> TestResult {
        if steps.is_empty() {
            return TestResult::discard();
        }
        let c = build(&steps);
        let t = time as f32 * 0.01;
        TestResult::from_bool(c.get_value(t, false).to_bits() == c.get_value(t, false).to_bits())
    }

    #[quickcheck]
    fn repeat_matches_modulo(steps: Vec<u8>, time: u16) -> TestResult {
        if steps.is_empty() {
            return TestResult::discard();
        }
        let c = build(&steps);
        let t = time as f32 * 0.01;
        let wrapped = t % c.max_seconds();
        TestResult::from_bool(c.get_value(t, true) == c.get_value(wrapped, true))
    }
}
